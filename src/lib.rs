//! # keyword_news
//!
//! Searches several news platforms for one keyword and merges the top
//! results into a single JSON document.
//!
//! ## Architecture
//!
//! 1. **Registry**: platform identifiers map to endpoints and extraction chains
//! 2. **Fetching**: one shared HTTP client, browser-like identity, bounded timeouts
//! 3. **Extraction**: structured data, then CSS selectors, then a fallback API
//! 4. **Aggregation**: per-platform isolation, one retry on transient failures,
//!    canonical merge order
//! 5. **Output**: the [`ResultDocument`] as JSON
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use keyword_news::{Aggregator, Settings};
//!
//! let aggregator = Aggregator::new(Settings::default())?;
//! let request = aggregator.registry().request("人工智能", &["bing"])?;
//! let document = aggregator.run(&request).await?;
//! println!("{}", document.total);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod models;
pub mod outputs;
pub mod platforms;
pub mod utils;

pub use aggregator::Aggregator;
pub use config::Settings;
pub use error::{FetchError, ValidationError};
pub use models::{PlatformId, ResultDocument, ResultItem, SearchRequest};
