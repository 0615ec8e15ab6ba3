//! Image encoding: `DynamicImage` → PNG bytes, or base64 PNG in `ImageData`.
//!
//! PNG rather than JPEG: compression artefacts around thin dimension lines
//! and small annotation text hurt both tesseract and vision models.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!("Encoded page → {} bytes PNG", buf.len());
    Ok(buf)
}

/// Encode a rasterised page as a base64 PNG ready for a vision model.
///
/// `detail: "high"` asks GPT-4-class models for the full tile budget; without
/// it, dimension strings on a drawing sheet are unreadable.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let b64 = STANDARD.encode(encode_png(img)?);
    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}
