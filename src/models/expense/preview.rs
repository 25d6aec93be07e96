//! Turning an accepted document into something the page can display.

use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose};
use image::{ImageFormat, ImageReader};

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),

    #[error("not a JPEG or PNG image")]
    UnsupportedFormat,

    #[error("preview task failed: {0}")]
    Task(String),
}

/// Decode `data` as a JPEG or PNG and render it as a `data:` URL.
///
/// The format is sniffed from the bytes, not trusted from the upload's
/// declared type. Full decoding is CPU-bound; call from a blocking context.
pub fn render_data_url(data: &[u8]) -> Result<String, PreviewError> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    let mime = match reader.format() {
        Some(ImageFormat::Jpeg) => "image/jpeg",
        Some(ImageFormat::Png) => "image/png",
        _ => return Err(PreviewError::UnsupportedFormat),
    };
    reader.decode()?;

    let encoded = general_purpose::STANDARD.encode(data);
    Ok(format!("data:{mime};base64,{encoded}"))
}
