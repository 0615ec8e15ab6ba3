//! Configuration types for an estimate run.
//!
//! All pipeline behaviour is controlled through [`EstimatorConfig`], built via
//! its [`EstimatorConfigBuilder`]. Every knob lives in one struct so the CLI,
//! the web server and library callers share the same defaults.

use crate::error::EstimateError;
use crate::output::Quantities;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default material price endpoint.
pub const DEFAULT_MATERIALS_URL: &str = "https://api.example.com/materials";

/// Default labor rate endpoint.
pub const DEFAULT_LABOR_URL: &str = "https://api.example.com/labor";

/// Default chat model for plan analysis.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Configuration for an estimate run.
///
/// # Example
/// ```rust
/// use plancost::{EstimatorConfig, OcrEngine};
///
/// let config = EstimatorConfig::builder()
///     .ocr_engine(OcrEngine::Tesseract)
///     .model("gpt-4")
///     .materials_url("https://prices.internal/materials")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct EstimatorConfig {
    // ── Extraction ───────────────────────────────────────────────────────
    /// Which OCR engine reads the rasterised pages. Default: tesseract.
    pub ocr_engine: OcrEngine,

    /// Tesseract language code(s), e.g. "eng" or "eng+fra". Default: "eng".
    pub ocr_language: String,

    /// Tesseract page segmentation mode. Default: 3 (fully automatic).
    pub ocr_psm: u8,

    /// Path to the tesseract binary. Default: "tesseract" (looked up on PATH).
    pub tesseract_bin: PathBuf,

    /// Rendering DPI used when rasterising each page. Range: 72–600. Default: 300.
    ///
    /// Tesseract is trained on ~300 DPI scans; blueprint annotations are small,
    /// so going lower costs recognition accuracy quickly.
    pub dpi: u32,

    /// Cap on the longest rendered edge in pixels. Default: 4000.
    ///
    /// Large-format sheets (A1, ARCH D) at 300 DPI exceed 10 000 px; the cap
    /// keeps memory bounded.
    pub max_rendered_pixels: u32,

    /// Pages recognised at once. Output order is page order regardless. Default: 1.
    pub ocr_concurrency: usize,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    // ── Analysis ─────────────────────────────────────────────────────────
    /// LLM model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the model may generate for the analysis. Default: 2048.
    pub max_tokens: usize,

    /// Custom system prompt for the analyzer. If None, uses the built-in one.
    pub system_prompt: Option<String>,

    /// Abandon the analysis after this many seconds. None waits indefinitely.
    pub analysis_timeout_secs: Option<u64>,

    // ── Pricing ──────────────────────────────────────────────────────────
    /// Endpoint returning `{item: unit_price}` for materials.
    pub materials_url: String,

    /// Endpoint returning `{item: hourly_rate}` for labor.
    pub labor_url: String,

    /// Per-request timeout for the pricing endpoints in seconds. Default: 30.
    pub http_timeout_secs: u64,

    // ── Input ────────────────────────────────────────────────────────────
    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    // ── Quantities ───────────────────────────────────────────────────────
    /// Material quantities to price. Default: [`Quantities::example_materials`].
    pub materials: Quantities,

    /// Labor hours to price. Default: [`Quantities::example_labor`].
    pub labor: Quantities,

    /// Stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            ocr_engine: OcrEngine::default(),
            ocr_language: "eng".to_string(),
            ocr_psm: 3,
            tesseract_bin: PathBuf::from("tesseract"),
            dpi: 300,
            max_rendered_pixels: 4000,
            ocr_concurrency: 1,
            password: None,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 2048,
            system_prompt: None,
            analysis_timeout_secs: None,
            materials_url: DEFAULT_MATERIALS_URL.to_string(),
            labor_url: DEFAULT_LABOR_URL.to_string(),
            http_timeout_secs: 30,
            download_timeout_secs: 120,
            materials: Quantities::example_materials(),
            labor: Quantities::example_labor(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for EstimatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EstimatorConfig")
            .field("ocr_engine", &self.ocr_engine)
            .field("ocr_language", &self.ocr_language)
            .field("ocr_psm", &self.ocr_psm)
            .field("tesseract_bin", &self.tesseract_bin)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("ocr_concurrency", &self.ocr_concurrency)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("analysis_timeout_secs", &self.analysis_timeout_secs)
            .field("materials_url", &self.materials_url)
            .field("labor_url", &self.labor_url)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("materials", &self.materials)
            .field("labor", &self.labor)
            .finish()
    }
}

impl EstimatorConfig {
    /// Create a new builder for `EstimatorConfig`.
    pub fn builder() -> EstimatorConfigBuilder {
        EstimatorConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model the analyzer will ask for.
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`EstimatorConfig`].
pub struct EstimatorConfigBuilder {
    config: EstimatorConfig,
}

impl fmt::Debug for EstimatorConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EstimatorConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl EstimatorConfigBuilder {
    pub fn ocr_engine(mut self, engine: OcrEngine) -> Self {
        self.config.ocr_engine = engine;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn ocr_psm(mut self, psm: u8) -> Self {
        self.config.ocr_psm = psm;
        self
    }

    pub fn tesseract_bin(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_bin = path.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn ocr_concurrency(mut self, n: usize) -> Self {
        self.config.ocr_concurrency = n.max(1);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn analysis_timeout_secs(mut self, secs: u64) -> Self {
        self.config.analysis_timeout_secs = Some(secs);
        self
    }

    pub fn materials_url(mut self, url: impl Into<String>) -> Self {
        self.config.materials_url = url.into();
        self
    }

    pub fn labor_url(mut self, url: impl Into<String>) -> Self {
        self.config.labor_url = url.into();
        self
    }

    pub fn http_timeout_secs(mut self, secs: u64) -> Self {
        self.config.http_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn materials(mut self, q: Quantities) -> Self {
        self.config.materials = q;
        self
    }

    pub fn labor(mut self, q: Quantities) -> Self {
        self.config.labor = q;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EstimatorConfig, EstimateError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(EstimateError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.ocr_concurrency == 0 {
            return Err(EstimateError::InvalidConfig(
                "OCR concurrency must be ≥ 1".into(),
            ));
        }
        if c.ocr_psm > 13 {
            return Err(EstimateError::InvalidConfig(format!(
                "Tesseract page segmentation mode must be 0–13, got {}",
                c.ocr_psm
            )));
        }
        for (name, url) in [("materials", &c.materials_url), ("labor", &c.labor_url)] {
            if reqwest::Url::parse(url).is_err() {
                return Err(EstimateError::InvalidConfig(format!(
                    "{name} pricing URL is not a valid URL: '{url}'"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Engine that turns a rasterised page into text.
///
/// | Engine | Needs | Notes |
/// |--------|-------|-------|
/// | `Tesseract` | `tesseract` on PATH | Offline, free, good on clean drawings (default) |
/// | `Vision` | LLM API key | Reads handwriting and rotated labels better; costs tokens per page |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OcrEngine {
    #[default]
    Tesseract,
    Vision,
}

impl fmt::Display for OcrEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OcrEngine::Tesseract => f.write_str("tesseract"),
            OcrEngine::Vision => f.write_str("vision"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = EstimatorConfig::default();
        assert_eq!(c.ocr_engine, OcrEngine::Tesseract);
        assert_eq!(c.model_or_default(), "gpt-4");
        assert_eq!(c.materials_url, DEFAULT_MATERIALS_URL);
        assert_eq!(c.labor_url, DEFAULT_LABOR_URL);
        assert_eq!(c.materials, Quantities::example_materials());
        assert_eq!(c.labor, Quantities::example_labor());
    }

    #[test]
    fn builder_clamps_dpi_and_concurrency() {
        let c = EstimatorConfig::builder()
            .dpi(5000)
            .ocr_concurrency(0)
            .build()
            .expect("clamped values are valid");
        assert_eq!(c.dpi, 600);
        assert_eq!(c.ocr_concurrency, 1);
    }

    #[test]
    fn builder_rejects_bad_pricing_url() {
        let err = EstimatorConfig::builder()
            .labor_url("not a url")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("labor"), "got: {err}");
    }

    #[test]
    fn builder_rejects_bad_psm() {
        assert!(EstimatorConfig::builder().ocr_psm(14).build().is_err());
    }

    #[test]
    fn debug_hides_provider() {
        let s = format!("{:?}", EstimatorConfig::default());
        assert!(s.contains("provider: None"));
    }
}
