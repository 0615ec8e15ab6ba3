//! # plancost
//!
//! Estimate the cost of building from a construction plan PDF.
//!
//! A plan is rasterised page by page, read with OCR, handed to a language
//! model for a natural-language analysis (rooms, materials, trades), and then
//! priced against live material and labor rates fetched from two HTTP
//! endpoints. The result is an [`EstimateReport`]: the analysis text, a cost
//! table per category, and a grand total.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Extract    pdfium render + tesseract / vision OCR     (fatal on error)
//!  ├─ 2. Analyze    one chat completion, verbatim answer       (fatal on error)
//!  ├─ 3. Price      materials ∥ labor GETs                     (errors → warnings)
//!  ├─ 4. Aggregate  quantity × unit price, subtotals, total
//!  └─ 5. Present    text / Markdown / JSON / HTML
//! ```
//!
//! Quantities are not read from the analysis. They come from
//! [`EstimatorConfig::materials`] and [`EstimatorConfig::labor`], which
//! default to a fixed example set.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use plancost::{estimate, EstimatorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = EstimatorConfig::default();
//!     let report = estimate("house.pdf", &config).await?;
//!     println!("{}", plancost::report::render_text(&report));
//!     for warning in &report.warnings {
//!         eprintln!("warning: {warning}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `plancost` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `web`   | on      | Enables [`server`], the browser upload UI (axum + tower-http) |
//!
//! Library-only users can drop both:
//! ```toml
//! plancost = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod estimate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
#[cfg(feature = "web")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{EstimatorConfig, EstimatorConfigBuilder, OcrEngine};
pub use error::{AnalysisError, EstimateError, ExtractionError, PricingError};
pub use estimate::{
    estimate, estimate_from_bytes, estimate_sync, estimate_to_file, inspect, Estimator,
};
pub use output::{
    AnalysisResult, CostBreakdown, CostLine, DocumentMetadata, EstimateReport, EstimateStats,
    PlanDocument, PlanText, PriceTable, Quantities, QuantitiesFile,
};
pub use pipeline::analyze::PlanAnalyzer;
pub use pipeline::ocr::{TextExtractor, TextRecognizer};
pub use pipeline::pricing::{PriceCategory, PriceSource};
pub use progress::{EstimateProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use report::ReportFormat;
