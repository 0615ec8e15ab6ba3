//! Request orchestration: document → text → analysis → prices → breakdown.
//!
//! [`Estimator`] owns one implementation of each stage and drives a request
//! through them in order. Extraction and analysis failures end the request;
//! pricing failures degrade it (warnings plus zero costs) but it still
//! completes. Nothing is shared between requests except the stage objects
//! themselves.

use crate::config::EstimatorConfig;
use crate::error::EstimateError;
use crate::output::{DocumentMetadata, EstimateReport, EstimateStats, PlanDocument, Quantities};
use crate::pipeline::aggregate::aggregate;
use crate::pipeline::analyze::{LlmPlanAnalyzer, PlanAnalyzer};
use crate::pipeline::ocr::{PdfTextExtractor, TextExtractor};
use crate::pipeline::pricing::{fetch_all, HttpPriceSource, PriceSource};
use crate::pipeline::{input, render};
use crate::progress::{ProgressCallback, Stage};
use crate::report::{self, ReportFormat};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The estimation pipeline with its stages wired in.
#[derive(Clone)]
pub struct Estimator {
    extractor: Arc<dyn TextExtractor>,
    analyzer: Arc<dyn PlanAnalyzer>,
    prices: Arc<dyn PriceSource>,
    materials: Quantities,
    labor: Quantities,
    progress: Option<ProgressCallback>,
}

impl Estimator {
    /// Wire explicit stage implementations, pricing the example quantities.
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        analyzer: Arc<dyn PlanAnalyzer>,
        prices: Arc<dyn PriceSource>,
    ) -> Self {
        Self {
            extractor,
            analyzer,
            prices,
            materials: Quantities::example_materials(),
            labor: Quantities::example_labor(),
            progress: None,
        }
    }

    pub fn with_quantities(mut self, materials: Quantities, labor: Quantities) -> Self {
        self.materials = materials;
        self.labor = labor;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Build the production pipeline: pdfium + OCR, an LLM analyzer and the
    /// HTTP pricing endpoints from `config`.
    ///
    /// Fails only when no LLM provider can be resolved or the HTTP client
    /// cannot be created.
    pub async fn from_config(config: &EstimatorConfig) -> Result<Self, EstimateError> {
        let provider = resolve_provider(config).await?;
        debug!(
            "Estimator: model={}, ocr={}, materials={}, labor={}",
            config.model_or_default(),
            config.ocr_engine,
            config.materials_url,
            config.labor_url
        );

        let extractor = PdfTextExtractor::from_config(config, Some(Arc::clone(&provider)));
        let analyzer = LlmPlanAnalyzer::new(provider, config);
        let prices = HttpPriceSource::from_config(config)?;

        let mut estimator = Self::new(Arc::new(extractor), Arc::new(analyzer), Arc::new(prices))
            .with_quantities(config.materials.clone(), config.labor.clone());
        if let Some(cb) = &config.progress_callback {
            estimator = estimator.with_progress(Arc::clone(cb));
        }
        Ok(estimator)
    }

    /// Run one request through extraction, analysis, pricing and aggregation.
    pub async fn estimate(&self, document: PlanDocument) -> Result<EstimateReport, EstimateError> {
        let total_start = Instant::now();
        info!("Estimating '{}' ({} bytes)", document.name, document.bytes.len());

        input::validate_pdf(&document)?;

        // ── Extracting ───────────────────────────────────────────────────
        let start = self.begin(Stage::Extracting);
        let plan = match self.extractor.extract(&document).await {
            Ok(plan) => plan,
            Err(e) => return Err(self.fail(Stage::Extracting, e.into())),
        };
        let extraction_ms = self.complete(Stage::Extracting, start);
        info!(
            "Extracted {} characters from {} pages",
            plan.text.len(),
            plan.pages
        );

        // ── Analyzing ────────────────────────────────────────────────────
        let start = self.begin(Stage::Analyzing);
        let analysis = match self.analyzer.analyze(&plan).await {
            Ok(analysis) => analysis,
            Err(e) => return Err(self.fail(Stage::Analyzing, e.into())),
        };
        let analysis_ms = self.complete(Stage::Analyzing, start);

        // ── Pricing ──────────────────────────────────────────────────────
        let start = self.begin(Stage::Pricing);
        let (material_prices, labor_rates, warnings) = fetch_all(self.prices.as_ref()).await;
        for w in &warnings {
            warn!("{}", w);
            if let Some(cb) = &self.progress {
                cb.on_pricing_error(w);
            }
        }
        let pricing_ms = self.complete(Stage::Pricing, start);

        // ── Aggregating ──────────────────────────────────────────────────
        let start = self.begin(Stage::Aggregating);
        let breakdown = aggregate(&self.materials, &self.labor, &material_prices, &labor_rates);
        self.complete(Stage::Aggregating, start);

        let stats = EstimateStats {
            extraction_ms,
            analysis_ms,
            pricing_ms,
            total_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            "Estimate complete: total ${:.2}, {} warnings, {}ms",
            breakdown.total,
            warnings.len(),
            stats.total_ms
        );

        Ok(EstimateReport {
            source: document.name,
            pages: plan.pages,
            analysis,
            breakdown,
            warnings,
            stats,
        })
    }

    /// Render a finished report, reporting the Presenting stage.
    pub fn present(
        &self,
        report: &EstimateReport,
        format: ReportFormat,
    ) -> Result<String, EstimateError> {
        let start = self.begin(Stage::Presenting);
        let rendered = report::render(report, format)?;
        self.complete(Stage::Presenting, start);
        Ok(rendered)
    }

    /// Render a finished report as an HTML page, reporting the Presenting stage.
    pub fn present_html(&self, report: &EstimateReport) -> String {
        let start = self.begin(Stage::Presenting);
        let html = report::render_html(report);
        self.complete(Stage::Presenting, start);
        html
    }

    fn begin(&self, stage: Stage) -> Instant {
        debug!("Stage: {}", stage);
        if let Some(cb) = &self.progress {
            cb.on_stage_start(stage);
        }
        Instant::now()
    }

    fn complete(&self, stage: Stage, start: Instant) -> u64 {
        let elapsed_ms = start.elapsed().as_millis() as u64;
        if let Some(cb) = &self.progress {
            cb.on_stage_complete(stage, elapsed_ms);
        }
        elapsed_ms
    }

    fn fail(&self, stage: Stage, error: EstimateError) -> EstimateError {
        warn!("{} failed: {}", stage, error);
        if let Some(cb) = &self.progress {
            cb.on_failed(stage, &error.to_string());
        }
        error
    }
}

/// Estimate the cost of the plan at `input` (local path or HTTP/HTTPS URL).
///
/// # Errors
/// Input problems, extraction failures and analysis failures are returned as
/// `Err`. Pricing failures are not: they appear in
/// [`EstimateReport::warnings`] and the affected items cost zero.
pub async fn estimate(
    input_str: impl AsRef<str>,
    config: &EstimatorConfig,
) -> Result<EstimateReport, EstimateError> {
    let document = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let estimator = Estimator::from_config(config).await?;
    estimator.estimate(document).await
}

/// Estimate from PDF bytes already in memory (e.g. an upload).
///
/// # Example
/// ```rust,no_run
/// use plancost::{estimate_from_bytes, EstimatorConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("house.pdf")?;
/// let report = estimate_from_bytes("house.pdf", bytes, &EstimatorConfig::default()).await?;
/// println!("Total: ${:.2}", report.breakdown.total);
/// # Ok(())
/// # }
/// ```
pub async fn estimate_from_bytes(
    name: impl Into<String>,
    bytes: Vec<u8>,
    config: &EstimatorConfig,
) -> Result<EstimateReport, EstimateError> {
    let estimator = Estimator::from_config(config).await?;
    estimator.estimate(PlanDocument::new(name, bytes)).await
}

/// Synchronous wrapper around [`estimate`].
///
/// Creates a temporary tokio runtime internally.
pub fn estimate_sync(
    input_str: impl AsRef<str>,
    config: &EstimatorConfig,
) -> Result<EstimateReport, EstimateError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| EstimateError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(estimate(input_str, config))
}

/// Estimate and write the rendered report to `output_path`.
///
/// Uses atomic write (temp file + rename) so a failed run never leaves a
/// partial report behind.
pub async fn estimate_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    format: ReportFormat,
    config: &EstimatorConfig,
) -> Result<EstimateReport, EstimateError> {
    let document = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let estimator = Estimator::from_config(config).await?;
    let report = estimator.estimate(document).await?;
    let rendered = estimator.present(&report, format)?;
    write_atomic(output_path.as_ref(), rendered.as_bytes()).await?;
    Ok(report)
}

/// Write `contents` to `path` via a sibling temp file and a rename.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), EstimateError> {
    let write_err = |e: std::io::Error| EstimateError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, contents).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

/// Read a plan's metadata without OCR, analysis or pricing.
///
/// Needs neither an LLM provider nor network access for local files.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DocumentMetadata, EstimateError> {
    let document = input::resolve_input(input_str.as_ref(), 120).await?;
    input::validate_pdf(&document)?;
    render::extract_metadata(document.bytes, None).await
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, EstimateError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        EstimateError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. `config.provider`, used as-is.
/// 2. `config.provider_name` with `config.model` (default `gpt-4`).
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set.
/// 4. OpenAI, when `OPENAI_API_KEY` is set.
/// 5. [`ProviderFactory::from_env`] auto-detection.
async fn resolve_provider(config: &EstimatorConfig) -> Result<Arc<dyn LLMProvider>, EstimateError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, config.model_or_default());
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        if !key.is_empty() {
            return create_provider("openai", config.model_or_default());
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| EstimateError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
