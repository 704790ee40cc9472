//! Command-line interface definitions for keyword_news.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Options that also make sense in CI can be provided via environment variables.

use clap::Parser;

/// Command-line arguments for keyword_news.
///
/// # Examples
///
/// ```sh
/// # All platforms
/// keyword_news 人工智能
///
/// # Selected platforms, written to a directory for publishing
/// keyword_news "rust language" bing,google --output-dir ./api
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Search keyword
    pub keyword: String,

    /// Comma-separated platforms: toutiao, google, bing (default: all)
    #[arg(value_delimiter = ',')]
    pub platforms: Vec<String>,

    /// Optional path to a YAML settings file
    #[arg(short, long, env = "KEYWORD_NEWS_CONFIG")]
    pub config: Option<String>,

    /// Directory receiving results_<run>.json and results_latest.json
    #[arg(short, long, env = "KEYWORD_NEWS_OUTPUT_DIR")]
    pub output_dir: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Deadline for the whole run in seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Maximum results kept per platform
    #[arg(long)]
    pub max_per_platform: Option<usize>,

    /// Print single-line JSON instead of pretty-printed
    #[arg(long)]
    pub compact: bool,
}
