//! PDF rasterisation: render every page to a `DynamicImage` via pdfium.
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which keeps
//! thread-local state and must not run on a Tokio worker thread. All work
//! here goes through `tokio::task::spawn_blocking`.
//!
//! Pages are scaled by `dpi / 72` (PDF user space is 72 points per inch)
//! and then capped at `max_rendered_pixels` on the longest edge, so a sheet
//! of ARCH E paper does not allocate hundreds of megabytes.

use crate::error::{EstimateError, ExtractionError};
use crate::output::DocumentMetadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Render settings for one document.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub dpi: u32,
    pub max_rendered_pixels: u32,
    pub password: Option<String>,
}

/// Rasterise every page of a PDF, in page order.
///
/// # Returns
/// A vector of `(page_index_0based, DynamicImage)` tuples.
pub async fn render_pages(
    bytes: Vec<u8>,
    options: &RenderOptions,
) -> Result<Vec<(usize, DynamicImage)>, ExtractionError> {
    let options = options.clone();

    tokio::task::spawn_blocking(move || render_pages_blocking(bytes, &options))
        .await
        .map_err(|e| ExtractionError::RasterisationFailed {
            page: 0,
            detail: format!("Render task panicked: {}", e),
        })?
}

/// Bind pdfium: `PDFIUM_LIB_PATH` first, then the working directory, then the
/// system library search path.
pub fn bind_pdfium() -> Result<Pdfium, ExtractionError> {
    let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(path) => Pdfium::bind_to_library(PathBuf::from(path)),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ExtractionError::PdfiumUnavailable(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of page rendering.
fn render_pages_blocking(
    bytes: Vec<u8>,
    options: &RenderOptions,
) -> Result<Vec<(usize, DynamicImage)>, ExtractionError> {
    let pdfium = bind_pdfium()?;
    let password = options.password.as_deref();

    let document = pdfium
        .load_pdf_from_byte_vec(bytes, password)
        .map_err(|e| classify_load_error(e, password.is_some()))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(options.dpi as f32 / 72.0)
        .set_maximum_width(options.max_rendered_pixels as i32)
        .set_maximum_height(options.max_rendered_pixels as i32);

    let mut results = Vec::with_capacity(total_pages);

    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            ExtractionError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        results.push((idx, image));
    }

    Ok(results)
}

/// pdfium reports password problems and corruption through the same error
/// type; tell them apart by the debug text.
fn classify_load_error(e: PdfiumError, had_password: bool) -> ExtractionError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if had_password {
            ExtractionError::WrongPassword
        } else {
            ExtractionError::PasswordRequired
        }
    } else {
        ExtractionError::CorruptPdf { detail: err_str }
    }
}

/// Extract document metadata without rendering pages.
pub async fn extract_metadata(
    bytes: Vec<u8>,
    password: Option<&str>,
) -> Result<DocumentMetadata, EstimateError> {
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || extract_metadata_blocking(bytes, pwd.as_deref()))
        .await
        .map_err(|e| EstimateError::Internal(format!("Metadata task panicked: {}", e)))?
        .map_err(EstimateError::from)
}

/// Blocking implementation of metadata extraction.
fn extract_metadata_blocking(
    bytes: Vec<u8>,
    password: Option<&str>,
) -> Result<DocumentMetadata, ExtractionError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_byte_vec(bytes, password)
        .map_err(|e| classify_load_error(e, password.is_some()))?;

    let metadata = document.metadata();
    let pages = document.pages();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: pages.len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}
