//! Result sink: serialization and persistence of the [`ResultDocument`].
//!
//! # Submodules
//!
//! - [`json`]: Renders the document and writes run-stamped files
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── results_local_0_20250506_143005.json   # one file per run
//! └── results_latest.json                    # copy of the newest run
//! ```
//!
//! [`ResultDocument`]: crate::models::ResultDocument

pub mod json;
