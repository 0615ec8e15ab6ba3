//! Error types for the plancost library.
//!
//! Three tiers reflect three distinct failure modes:
//!
//! * [`EstimateError`] is **fatal**: the request cannot proceed (file not
//!   found, not a PDF, provider not configured) or a pipeline stage that the
//!   later stages depend on failed. Returned as `Err(EstimateError)` from the
//!   top-level `estimate*` functions.
//!
//! * [`ExtractionError`] / [`AnalysisError`]: the two stages whose failure
//!   abandons the request. They are wrapped by [`EstimateError::Extraction`]
//!   and [`EstimateError::Analysis`] so callers can tell which stage stopped.
//!
//! * [`PricingError`] is **non-fatal**: one pricing endpoint was unreachable or
//!   returned garbage. Stored in [`crate::output::EstimateReport::warnings`];
//!   the affected category simply prices at zero.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the plancost library.
#[derive(Debug, Error)]
pub enum EstimateError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Plan file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they are not a PDF.
    #[error("'{name}' is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: Vec<u8> },

    /// The quantities file could not be read or parsed.
    #[error("Invalid quantities: {0}")]
    InvalidQuantities(String),

    // ── Stage errors ──────────────────────────────────────────────────────
    /// Text extraction failed; the plan was not analysed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Plan analysis failed; nothing was priced.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the report file.
    #[error("Failed to write report file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EstimateError {
    /// True when the error came out of a pipeline stage rather than from
    /// input validation or configuration.
    pub fn is_stage_failure(&self) -> bool {
        matches!(self, Self::Extraction(_) | Self::Analysis(_))
    }
}

/// Failure of the Document Text Extractor. Terminal for the request.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum ExtractionError {
    /// pdfium could not be loaded.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumUnavailable(String),

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("Failed to extract text from PDF: document is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none was provided.
    #[error("Failed to extract text from PDF: document is encrypted; provide --password")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Failed to extract text from PDF: wrong password")]
    WrongPassword,

    /// pdfium-render returned an error for a specific page.
    #[error("Failed to extract text from PDF: rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The OCR engine could not be started at all.
    #[error("Failed to extract text from PDF: OCR engine '{engine}' is unavailable.\n{hint}")]
    RecognizerUnavailable { engine: String, hint: String },

    /// The OCR engine ran but failed on a page.
    #[error("Failed to extract text from PDF: recognition failed for page {page}: {detail}")]
    RecognitionFailed { page: usize, detail: String },

    /// Every page was recognised but no text came out.
    #[error("No text could be recognised in the plan ({pages} pages scanned)")]
    NoText { pages: usize },
}

/// Failure of the Plan Analyzer. Terminal for the request.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum AnalysisError {
    /// The LLM API returned an error.
    #[error("LLM API error: {message}")]
    Api { message: String },

    /// The call did not finish within the configured timeout.
    #[error("LLM API call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The model answered with nothing.
    #[error("LLM returned an empty analysis")]
    EmptyResponse,
}

/// A non-fatal error for one pricing endpoint.
///
/// Display reads `<label>: <detail>`, e.g.
/// `Error fetching material prices: HTTP 503 Service Unavailable`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{label}: {detail}")]
pub struct PricingError {
    pub label: String,
    pub url: String,
    pub detail: String,
}
