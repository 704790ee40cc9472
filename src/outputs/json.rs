//! JSON output of the result document.
//!
//! The document is always printed to stdout by the binary. When an output
//! directory is configured it is also written to a run-stamped file plus a
//! `results_latest.json` alias that downstream publishing serves as-is.

use crate::error::SinkError;
use crate::models::ResultDocument;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

pub const LATEST_FILENAME: &str = "results_latest.json";

/// Serialize the document, pretty-printed unless `compact`.
pub fn render(document: &ResultDocument, compact: bool) -> Result<String, SinkError> {
    let json = if compact {
        serde_json::to_string(document)?
    } else {
        serde_json::to_string_pretty(document)?
    };
    Ok(json)
}

/// File name for one run, e.g. `results_local_0_20250506_143005.json`.
pub fn run_filename(stamp: &str) -> String {
    format!("results_{}.json", stamp)
}

/// Write the document to `{output_dir}/results_{stamp}.json` and refresh the latest alias.
///
/// # Returns
///
/// The path of the run-stamped file.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.as_ref().display(), %stamp))]
pub async fn write_document(
    document: &ResultDocument,
    output_dir: impl AsRef<Path>,
    stamp: &str,
) -> Result<PathBuf, SinkError> {
    let output_dir = output_dir.as_ref();
    let json = render(document, false)?;

    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(error = %e, "Failed to create output dir");
        return Err(SinkError::Write {
            path: output_dir.display().to_string(),
            source: e,
        });
    }

    let run_path = output_dir.join(run_filename(stamp));
    let latest_path = output_dir.join(LATEST_FILENAME);
    for path in [&run_path, &latest_path] {
        fs::write(path, &json).await.map_err(|source| SinkError::Write {
            path: path.display().to_string(),
            source,
        })?;
    }

    info!(path = %run_path.display(), total = document.total, "Wrote result document");
    Ok(run_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlatformId, ResultItem, SearchRequest};

    fn document() -> ResultDocument {
        let request = SearchRequest::new("人工智能", [PlatformId::Bing]).unwrap();
        let mut doc = ResultDocument::from_outcomes(&request, vec![]);
        doc.results.push(ResultItem {
            title: "测试标题".to_string(),
            url: "https://example.com/a".to_string(),
            platform: PlatformId::Bing,
        });
        doc.total = doc.results.len();
        doc
    }

    #[test]
    fn test_render_keeps_unicode() {
        let json = render(&document(), true).unwrap();
        assert!(json.contains("人工智能"));
        assert!(json.contains("\"total\":1"));
        assert!(!json.contains('\n'));
    }

    #[test]
    fn test_render_round_trips() {
        let json = render(&document(), false).unwrap();
        let parsed: ResultDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.total, 1);
        assert_eq!(parsed.results[0].platform, PlatformId::Bing);
    }

    #[tokio::test]
    async fn test_write_document_creates_run_and_latest_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("api");

        let path = write_document(&document(), &out, "local_0_20250506_143005")
            .await
            .unwrap();

        assert_eq!(path, out.join("results_local_0_20250506_143005.json"));
        let run = std::fs::read_to_string(&path).unwrap();
        let latest = std::fs::read_to_string(out.join(LATEST_FILENAME)).unwrap();
        assert_eq!(run, latest);
        assert!(run.contains("\"generatedAt\""));
    }

    #[tokio::test]
    async fn test_write_document_reports_unwritable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let err = write_document(&document(), blocker.join("sub"), "s").await.unwrap_err();
        assert!(matches!(err, SinkError::Write { .. }));
    }
}
