//! # keyword_news
//!
//! Command-line entry point: search news platforms for a keyword and print
//! the merged results as JSON.
//!
//! ## Usage
//!
//! ```sh
//! keyword_news 人工智能 toutiao,google,bing -o ./api
//! ```
//!
//! Logs go to stderr (filter with `RUST_LOG`) so stdout carries only the
//! result document.

use clap::Parser;
use keyword_news::outputs::json;
use keyword_news::utils::run_stamp;
use keyword_news::{Aggregator, Settings};
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::Cli;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("keyword_news starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Settings ----
    let mut settings = match &args.config {
        Some(path) => Settings::load(path).inspect_err(|e| error!(error = %e, "Invalid settings"))?,
        None => Settings::default(),
    };
    if let Some(secs) = args.timeout_secs {
        settings.timeout_secs = secs;
    }
    if let Some(secs) = args.deadline_secs {
        settings.deadline_secs = secs;
    }
    if let Some(max) = args.max_per_platform {
        settings.max_per_platform = max;
    }

    // ---- Validate & search ----
    let aggregator = Aggregator::new(settings)?;
    let request = match aggregator.registry().request(&args.keyword, args.platforms.as_slice()) {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "Rejected search request");
            return Err(e.into());
        }
    };
    let document = aggregator.run(&request).await?;

    // ---- Output ----
    println!("{}", json::render(&document, args.compact)?);

    if let Some(dir) = &args.output_dir {
        let run_id = std::env::var("GITHUB_RUN_ID").ok();
        let run_number = std::env::var("GITHUB_RUN_NUMBER").ok();
        let stamp = run_stamp(run_id.as_deref(), run_number.as_deref(), document.generated_at);
        if let Err(e) = json::write_document(&document, dir, &stamp).await {
            error!(error = %e, "Failed to write result files");
            return Err(e.into());
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        total = document.total,
        failed = ?document.failed_platforms(),
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
