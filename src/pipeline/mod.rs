//! Pipeline stages for plan cost estimation.
//!
//! Each submodule implements exactly one step. The stages that talk to the
//! outside world sit behind traits ([`ocr::TextExtractor`],
//! [`analyze::PlanAnalyzer`], [`pricing::PriceSource`]) so the orchestration
//! in [`crate::estimate`] can be exercised without pdfium, tesseract, an API
//! key or a network.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ ocr ──▶ postprocess ──▶ analyze ──▶ pricing ──▶ aggregate
//! (path/URL) (pdfium)   (PNG)   (tesseract  (cleanup)       (LLM)     (2× GET,    (pure)
//!                                / vision)                             joined)
//! ```
//!
//! 1. [`input`]: canonicalise the user-supplied path or URL to PDF bytes
//! 2. [`render`]: rasterise every page; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`]: PNG-encode each page for the recogniser
//! 4. [`ocr`]: per-page text recognition, concatenated in page order
//! 5. [`postprocess`]: deterministic cleanup of OCR output
//! 6. [`analyze`]: one chat request to the language model
//! 7. [`pricing`]: material and labor price tables from two endpoints
//! 8. [`aggregate`]: quantity × unit price, subtotals, total

pub mod aggregate;
pub mod analyze;
pub mod encode;
pub mod input;
pub mod ocr;
pub mod postprocess;
pub mod pricing;
pub mod render;
