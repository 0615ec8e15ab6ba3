//! Input resolution: turn a user-supplied path or URL into a [`PlanDocument`].
//!
//! pdfium is fed from memory, so both local files and downloads end up as a
//! byte buffer. The PDF magic bytes (`%PDF`) are checked here so callers get
//! a meaningful error instead of a pdfium parse failure.

use crate::error::EstimateError;
use crate::output::PlanDocument;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to an in-memory plan document.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<PlanDocument, EstimateError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

/// Reject anything that does not start with `%PDF`.
pub fn validate_pdf(document: &PlanDocument) -> Result<(), EstimateError> {
    if document.bytes.starts_with(b"%PDF") {
        Ok(())
    } else {
        Err(EstimateError::NotAPdf {
            name: document.name.clone(),
            magic: document.bytes.iter().take(4).copied().collect(),
        })
    }
}

/// Read a local file, validating existence, permissions and PDF magic bytes.
async fn read_local(path_str: &str) -> Result<PlanDocument, EstimateError> {
    let path = PathBuf::from(path_str);

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => EstimateError::PermissionDenied { path: path.clone() },
        _ => EstimateError::FileNotFound { path: path.clone() },
    })?;

    let document = PlanDocument::new(display_name(&path), bytes);
    validate_pdf(&document)?;

    debug!("Read local plan: {} ({} bytes)", path.display(), document.bytes.len());
    Ok(document)
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<PlanDocument, EstimateError> {
    info!("Downloading plan from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| EstimateError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            EstimateError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            EstimateError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(EstimateError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| EstimateError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let document = PlanDocument::new(filename_from_url(url), bytes.to_vec());
    validate_pdf(&document)?;

    info!("Downloaded {} bytes", document.bytes.len());
    Ok(document)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Last path segment of the URL if it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/plan.pdf"));
        assert!(is_url("http://example.com/plan.pdf"));
        assert!(!is_url("/tmp/plan.pdf"));
        assert!(!is_url("plan.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn filename_from_url_uses_last_segment() {
        assert_eq!(filename_from_url("https://x.test/a/house.pdf"), "house.pdf");
        assert_eq!(filename_from_url("https://x.test/download/"), "downloaded.pdf");
    }

    #[test]
    fn validate_pdf_checks_magic() {
        assert!(validate_pdf(&PlanDocument::new("ok.pdf", b"%PDF-1.7\n".to_vec())).is_ok());
        let err = validate_pdf(&PlanDocument::new("img.png", b"\x89PNG".to_vec())).unwrap_err();
        assert!(matches!(err, EstimateError::NotAPdf { ref name, .. } if name == "img.png"));
    }

    #[test]
    fn validate_pdf_rejects_empty_upload() {
        assert!(validate_pdf(&PlanDocument::new("empty.pdf", Vec::new())).is_err());
    }

    #[tokio::test]
    async fn read_local_missing_file() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, EstimateError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn read_local_pdf_keeps_file_name() {
        let mut tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        tmp.write_all(b"%PDF-1.4\n%%EOF\n").unwrap();
        let doc = resolve_input(tmp.path().to_str().unwrap(), 5).await.unwrap();
        assert!(doc.name.ends_with(".pdf"));
        assert_eq!(doc.bytes.len(), 15);
    }
}
