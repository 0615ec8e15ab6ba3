//! CLI binary for plancost.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `EstimatorConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use plancost::estimate::write_atomic;
use plancost::pipeline::input::resolve_input;
use plancost::report::{format_currency, with_default_extension};
use plancost::server::{self, AppState};
use plancost::{
    inspect, EstimateProgressCallback, Estimator, EstimatorConfig, OcrEngine, PricingError,
    ProgressCallback, QuantitiesFile, ReportFormat, Stage,
};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One spinner line that follows the request through its stages, leaving a
/// tick per finished stage above it.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl EstimateProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_prefix(stage.to_string());
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<18} {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        if stage == Stage::Presenting {
            self.bar.finish_and_clear();
        }
    }

    fn on_pricing_error(&self, error: &PricingError) {
        self.bar.println(format!("  {} {}", yellow("⚠"), error));
    }

    fn on_failed(&self, stage: Stage, _error: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {} failed", red("✘"), bold(&stage.to_string()));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Estimate a local plan, report on stdout
  plancost estimate house.pdf

  # Markdown report to a file
  plancost estimate house.pdf --format markdown -o estimate.md

  # Your own quantities instead of the example set
  plancost estimate house.pdf --quantities takeoff.json

  # Plan from a URL, JSON for scripting
  plancost estimate https://example.com/plans/garage.pdf --format json

  # PDF metadata only (no API key needed)
  plancost inspect house.pdf

  # Browser UI on http://127.0.0.1:8501
  plancost serve

QUANTITIES FILE:
  {
    "materials": { "concrete": 100, "steel": 5, "wood": 200 },
    "labor":     { "electrician": 50, "plumber": 40, "carpenter": 60 }
  }
  Either key may be omitted; the example values are used for it.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (or its directory)
  PLANCOST_MATERIALS_URL  Materials price endpoint
  PLANCOST_LABOR_URL      Labor rate endpoint

  A `.env` file in the working directory is loaded first.
"#;

/// Estimate construction costs from plan PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "plancost",
    version,
    about = "Estimate construction costs from plan PDFs",
    long_about = "Extract text from a construction plan PDF with OCR, have a language model \
analyse it, fetch current material prices and labor rates, and print an itemised cost estimate.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PLANCOST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PLANCOST_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline on a plan and print the report.
    Estimate(EstimateArgs),
    /// Print PDF metadata without OCR, analysis or pricing.
    Inspect(InspectArgs),
    /// Start the browser upload UI.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct EstimateArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the report to this file instead of stdout.
    #[arg(short, long, env = "PLANCOST_OUTPUT")]
    output: Option<PathBuf>,

    /// Report format.
    #[arg(long, env = "PLANCOST_FORMAT", value_enum, default_value = "text")]
    format: FormatArg,

    /// Disable the progress spinner.
    #[arg(long, env = "PLANCOST_NO_PROGRESS")]
    no_progress: bool,

    /// HTTP download timeout in seconds (URL inputs).
    #[arg(long, env = "PLANCOST_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Print metadata as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "PLANCOST_ADDR", default_value = "127.0.0.1:8501")]
    addr: SocketAddr,

    /// Largest accepted upload, in megabytes.
    #[arg(long, env = "PLANCOST_MAX_UPLOAD_MB", default_value_t = 25)]
    max_upload_mb: usize,

    #[command(flatten)]
    engine: EngineArgs,
}

/// Flags shared by every command that runs the pipeline.
#[derive(Args, Debug)]
struct EngineArgs {
    /// LLM model ID for plan analysis.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// OCR engine.
    #[arg(long, env = "PLANCOST_OCR", value_enum, default_value = "tesseract")]
    ocr: OcrArg,

    /// Tesseract language(s), e.g. eng or eng+deu.
    #[arg(long, env = "PLANCOST_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// Tesseract page segmentation mode (0–13).
    #[arg(long, env = "PLANCOST_OCR_PSM", default_value_t = 3,
          value_parser = clap::value_parser!(u8).range(0..=13))]
    ocr_psm: u8,

    /// Path to the tesseract executable.
    #[arg(long, env = "PLANCOST_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Rendering DPI (72–600).
    #[arg(long, env = "PLANCOST_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Pages recognised at once.
    #[arg(short, long, env = "PLANCOST_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// PDF user password for encrypted plans.
    #[arg(long, env = "PLANCOST_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom analysis system prompt.
    #[arg(long, env = "PLANCOST_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens.
    #[arg(long, env = "PLANCOST_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PLANCOST_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Give up on the analysis call after this many seconds.
    #[arg(long, env = "PLANCOST_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Materials price endpoint.
    #[arg(long, env = "PLANCOST_MATERIALS_URL", default_value = plancost::config::DEFAULT_MATERIALS_URL)]
    materials_url: String,

    /// Labor rate endpoint.
    #[arg(long, env = "PLANCOST_LABOR_URL", default_value = plancost::config::DEFAULT_LABOR_URL)]
    labor_url: String,

    /// Pricing request timeout in seconds.
    #[arg(long, env = "PLANCOST_HTTP_TIMEOUT", default_value_t = 30)]
    http_timeout: u64,

    /// JSON file with material and labor quantities.
    #[arg(long, env = "PLANCOST_QUANTITIES")]
    quantities: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Text,
    Markdown,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Markdown => ReportFormat::Markdown,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OcrArg {
    Tesseract,
    Vision,
}

impl From<OcrArg> for OcrEngine {
    fn from(v: OcrArg) -> Self {
        match v {
            OcrArg::Tesseract => OcrEngine::Tesseract,
            OcrArg::Vision => OcrEngine::Vision,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers stage feedback, so library INFO logs stay quiet
    // while it is visible.
    let show_progress = match &cli.command {
        Command::Estimate(args) => !cli.quiet && !args.no_progress,
        _ => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Estimate(args) => run_estimate(args, show_progress, cli.quiet).await,
        Command::Inspect(args) => run_inspect(args).await,
        Command::Serve(args) => run_serve(args).await,
    }
}

async fn run_estimate(args: EstimateArgs, show_progress: bool, quiet: bool) -> Result<()> {
    let mut config = build_config(&args.engine).await?;
    config.download_timeout_secs = args.download_timeout;

    let document = resolve_input(&args.input, config.download_timeout_secs)
        .await
        .with_context(|| format!("Failed to read '{}'", args.input))?;
    let mut estimator = Estimator::from_config(&config)
        .await
        .context("Failed to set up the estimator")?;

    // The spinner starts only once the pipeline is about to run.
    if show_progress {
        estimator = estimator.with_progress(CliProgressCallback::new() as ProgressCallback);
    }

    let format: ReportFormat = args.format.into();
    let report = estimator
        .estimate(document)
        .await
        .context("Estimate failed")?;
    let rendered = estimator
        .present(&report, format)
        .context("Failed to render report")?;

    if let Some(path) = args.output.map(|p| with_default_extension(p, format)) {
        write_atomic(&path, rendered.as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !quiet {
            eprintln!("{} Report written to {}", green("✔"), bold(&path.display().to_string()));
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(rendered.as_bytes())
            .context("Failed to write to stdout")?;
        if !rendered.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !quiet {
        eprintln!(
            "   {} total  —  {} in / {} out tokens  —  {}ms",
            bold(&format_currency(report.breakdown.total)),
            dim(&report.analysis.input_tokens.to_string()),
            dim(&report.analysis.output_tokens.to_string()),
            report.stats.total_ms,
        );
        if report.is_degraded() {
            eprintln!(
                "   {} {} price list(s) unavailable; affected items were priced at $0.00",
                yellow("⚠"),
                report.warnings.len()
            );
        }
    }

    Ok(())
}

async fn run_inspect(args: InspectArgs) -> Result<()> {
    let meta = inspect(&args.input)
        .await
        .with_context(|| format!("Failed to inspect '{}'", args.input))?;

    if args.json {
        let json = serde_json::to_string_pretty(&meta).context("Failed to serialise metadata")?;
        println!("{json}");
        return Ok(());
    }

    println!("{}", bold(&args.input));
    println!("  Pages:       {}", meta.page_count);
    println!("  PDF version: {}", meta.pdf_version);
    let fields = [
        ("Title", &meta.title),
        ("Author", &meta.author),
        ("Subject", &meta.subject),
        ("Creator", &meta.creator),
        ("Producer", &meta.producer),
    ];
    for (label, value) in fields {
        if let Some(v) = value {
            println!("  {:<12} {}", format!("{label}:"), v);
        }
    }
    Ok(())
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = build_config(&args.engine).await?;
    let estimator = Estimator::from_config(&config)
        .await
        .context("Failed to set up the estimator")?;
    let state = AppState::with_max_upload_bytes(
        estimator,
        args.max_upload_mb.saturating_mul(1024 * 1024),
    );
    server::serve(args.addr, state)
        .await
        .with_context(|| format!("Server on {} failed", args.addr))
}

/// Map CLI args to `EstimatorConfig`.
async fn build_config(args: &EngineArgs) -> Result<EstimatorConfig> {
    let mut builder = EstimatorConfig::builder()
        .ocr_engine(args.ocr.into())
        .ocr_language(args.ocr_lang.clone())
        .ocr_psm(args.ocr_psm)
        .tesseract_bin(args.tesseract.clone())
        .dpi(args.dpi)
        .ocr_concurrency(args.concurrency)
        .max_tokens(args.max_tokens)
        .temperature(args.temperature)
        .materials_url(args.materials_url.clone())
        .labor_url(args.labor_url.clone())
        .http_timeout_secs(args.http_timeout);

    if let Some(ref model) = args.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref password) = args.password {
        builder = builder.password(password.clone());
    }
    if let Some(secs) = args.api_timeout {
        builder = builder.analysis_timeout_secs(secs);
    }
    if let Some(ref path) = args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref path) = args.quantities {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read quantities from {:?}", path))?;
        let file = QuantitiesFile::from_json(&json)
            .with_context(|| format!("Invalid quantities file {:?}", path))?;
        if let Some(materials) = file.materials {
            builder = builder.materials(materials);
        }
        if let Some(labor) = file.labor {
            builder = builder.labor(labor);
        }
    }
    builder.build().context("Invalid configuration")
}
