//! Document Text Extractor: rasterise a plan and read every page.
//!
//! Two layers of abstraction:
//!
//! * [`TextRecognizer`] reads **one page image**. [`TesseractRecognizer`]
//!   shells out to the `tesseract` binary; [`VisionRecognizer`] asks a
//!   vision LLM to transcribe the page.
//! * [`TextExtractor`] turns **a whole document** into [`PlanText`].
//!   [`PdfTextExtractor`] renders with pdfium, feeds each page to a
//!   recogniser, and concatenates the results in page order.
//!
//! Any failure is terminal for the request. There is no retry.

use crate::config::{EstimatorConfig, OcrEngine};
use crate::error::ExtractionError;
use crate::output::{PlanDocument, PlanText};
use crate::pipeline::{encode, postprocess, render};
use crate::prompts::OCR_SYSTEM_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use futures::stream::{self, StreamExt, TryStreamExt};
use futures::FutureExt;
use image::DynamicImage;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info};

/// Reads the text on one rasterised page.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Short engine name for logs and error messages.
    fn name(&self) -> &str;

    /// Recognise the text on `image`. `page_num` is 1-indexed.
    async fn recognize(&self, page_num: usize, image: &DynamicImage)
        -> Result<String, ExtractionError>;
}

/// Converts a whole plan document into text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, document: &PlanDocument) -> Result<PlanText, ExtractionError>;
}

// ── Tesseract ────────────────────────────────────────────────────────────

/// Runs `tesseract <page.png> stdout -l <lang> --psm <n>` per page.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    pub binary: PathBuf,
    pub language: String,
    pub psm: u8,
}

impl TesseractRecognizer {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>, psm: u8) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
            psm,
        }
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new("tesseract", "eng", 3)
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(
        &self,
        page_num: usize,
        image: &DynamicImage,
    ) -> Result<String, ExtractionError> {
        let png = encode::encode_png(image).map_err(|e| ExtractionError::RecognitionFailed {
            page: page_num,
            detail: format!("PNG encoding failed: {}", e),
        })?;

        // tesseract wants a file; the temp file is removed on drop.
        let mut tmp = tempfile::Builder::new()
            .prefix("plancost-page-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| ExtractionError::RecognitionFailed {
                page: page_num,
                detail: format!("temp file: {}", e),
            })?;
        tmp.write_all(&png)
            .and_then(|_| tmp.flush())
            .map_err(|e| ExtractionError::RecognitionFailed {
                page: page_num,
                detail: format!("temp file write: {}", e),
            })?;

        let output = Command::new(&self.binary)
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.psm.to_string())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ExtractionError::RecognizerUnavailable {
                    engine: "tesseract".to_string(),
                    hint: format!(
                        "'{}' was not found. Install tesseract-ocr or pass --tesseract <PATH>.",
                        self.binary.display()
                    ),
                },
                _ => ExtractionError::RecognitionFailed {
                    page: page_num,
                    detail: format!("failed to run tesseract: {}", e),
                },
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::RecognitionFailed {
                page: page_num,
                detail: format!("tesseract exited with {}: {}", output.status, stderr.trim()),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("Page {}: tesseract read {} chars", page_num, text.len());
        Ok(text)
    }
}

// ── Vision LLM ───────────────────────────────────────────────────────────

/// Transcribes each page with a vision-capable chat model.
pub struct VisionRecognizer {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl VisionRecognizer {
    pub fn new(provider: Arc<dyn LLMProvider>, max_tokens: usize) -> Self {
        Self {
            provider,
            options: CompletionOptions {
                temperature: Some(0.0),
                max_tokens: Some(max_tokens),
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl TextRecognizer for VisionRecognizer {
    fn name(&self) -> &str {
        "vision"
    }

    async fn recognize(
        &self,
        page_num: usize,
        image: &DynamicImage,
    ) -> Result<String, ExtractionError> {
        let image_data =
            encode::encode_page(image).map_err(|e| ExtractionError::RecognitionFailed {
                page: page_num,
                detail: format!("image encoding failed: {}", e),
            })?;

        let messages = vec![
            ChatMessage::system(OCR_SYSTEM_PROMPT),
            ChatMessage::user_with_images("", vec![image_data]),
        ];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| ExtractionError::RecognitionFailed {
                page: page_num,
                detail: format!("vision model error: {}", e),
            })?;

        debug!(
            "Page {}: vision OCR {} input tokens, {} output tokens",
            page_num, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

// ── PDF extractor ────────────────────────────────────────────────────────

/// Renders a PDF with pdfium and reads every page with a [`TextRecognizer`].
pub struct PdfTextExtractor {
    recognizer: Arc<dyn TextRecognizer>,
    render: render::RenderOptions,
    concurrency: usize,
}

impl PdfTextExtractor {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, render: render::RenderOptions) -> Self {
        Self {
            recognizer,
            render,
            concurrency: 1,
        }
    }

    /// Allow up to `n` pages to be recognised at once.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Build the extractor described by `config`. The vision engine reuses the
    /// analysis provider.
    pub fn from_config(config: &EstimatorConfig, provider: Option<Arc<dyn LLMProvider>>) -> Self {
        let recognizer: Arc<dyn TextRecognizer> = match (config.ocr_engine, provider) {
            (OcrEngine::Vision, Some(provider)) => {
                Arc::new(VisionRecognizer::new(provider, config.max_tokens.max(4096)))
            }
            _ => Arc::new(TesseractRecognizer::new(
                config.tesseract_bin.clone(),
                config.ocr_language.clone(),
                config.ocr_psm,
            )),
        };

        let render = render::RenderOptions {
            dpi: config.dpi,
            max_rendered_pixels: config.max_rendered_pixels,
            password: config.password.clone(),
        };

        Self::new(recognizer, render).with_concurrency(config.ocr_concurrency)
    }

    /// Recognise already-rendered pages, returning text in page order.
    pub async fn recognize_pages(
        &self,
        pages: &[(usize, DynamicImage)],
    ) -> Result<PlanText, ExtractionError> {
        let futs: Vec<_> = pages
            .iter()
            .map(|(idx, img)| {
                let idx = *idx;
                let recognizer = Arc::clone(&self.recognizer);
                async move {
                    let raw = recognizer.recognize(idx + 1, img).await?;
                    Ok::<_, ExtractionError>(postprocess::clean_ocr_text(&raw))
                }
                .boxed()
            })
            .collect();

        // `buffered` keeps input order even when pages finish out of order.
        let texts: Vec<String> = stream::iter(futs)
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let text = postprocess::join_pages(texts.iter().map(String::as_str));
        let plan = PlanText {
            text,
            pages: pages.len(),
        };

        if plan.is_blank() {
            return Err(ExtractionError::NoText { pages: plan.pages });
        }
        Ok(plan)
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, document: &PlanDocument) -> Result<PlanText, ExtractionError> {
        let rendered = render::render_pages(document.bytes.clone(), &self.render).await?;
        info!(
            "Rendered {} pages of '{}'; recognising with {}",
            rendered.len(),
            document.name,
            self.recognizer.name()
        );
        self.recognize_pages(&rendered).await
    }
}
