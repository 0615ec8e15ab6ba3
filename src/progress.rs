//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn EstimateProgressCallback>`] via
//! [`crate::config::EstimatorConfigBuilder::progress_callback`] to observe the
//! request as it moves through
//! `Idle → Extracting → Analyzing → Pricing → Aggregating → Presenting → Idle`.
//!
//! # Example
//!
//! ```rust
//! use plancost::{EstimateProgressCallback, EstimatorConfig, Stage};
//! use std::sync::Arc;
//!
//! struct Log;
//!
//! impl EstimateProgressCallback for Log {
//!     fn on_stage_start(&self, stage: Stage) {
//!         eprintln!("{stage}…");
//!     }
//! }
//!
//! let config = EstimatorConfig::builder()
//!     .progress_callback(Arc::new(Log) as Arc<dyn EstimateProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::PricingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Where a request currently is.
///
/// Extraction or analysis failures go straight back to `Idle`; pricing
/// failures do not leave the normal path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Idle,
    Extracting,
    Analyzing,
    Pricing,
    Aggregating,
    Presenting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Idle => "Idle",
            Stage::Extracting => "Extracting text",
            Stage::Analyzing => "Analyzing plan",
            Stage::Pricing => "Fetching prices",
            Stage::Aggregating => "Aggregating costs",
            Stage::Presenting => "Presenting report",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline as a request moves between stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`: the web
/// server shares one callback across concurrent requests.
pub trait EstimateProgressCallback: Send + Sync {
    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called once per pricing endpoint that failed. The pipeline continues.
    fn on_pricing_error(&self, error: &PricingError) {
        let _ = error;
    }

    /// Called when `stage` failed and the request is abandoned.
    fn on_failed(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl EstimateProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::EstimatorConfig`].
pub type ProgressCallback = Arc<dyn EstimateProgressCallback>;
