//! Shared fixtures for the expense form tests.
//!
//! # Uploads
//! - `jpeg_upload()` / `png_upload()` - small, genuinely decodable images
//! - `padded_jpeg_upload(size)` - a valid JPEG padded to `size` bytes
//! - `text_upload()`, `oversized_upload()`, `corrupt_png_upload()` - rejection paths

#![allow(dead_code)]

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};

use expense_request::form::FormController;
use expense_request::models::expense::{DocumentUpload, MAX_DOCUMENT_BYTES};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

pub const PURPOSE: &str = "Pembelian ATK";
pub const AMOUNT: &str = "50000";

// ============================================================================
// IMAGE FIXTURES
// ============================================================================

fn encode(format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(16, 16, Rgb([20, 120, 220]));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), format)
        .expect("Failed to encode fixture image");
    buffer
}

pub fn jpeg_bytes() -> Vec<u8> {
    encode(ImageFormat::Jpeg)
}

pub fn png_bytes() -> Vec<u8> {
    encode(ImageFormat::Png)
}

pub fn jpeg_upload() -> DocumentUpload {
    DocumentUpload::new("nota.jpg", "image/jpeg", jpeg_bytes())
}

pub fn png_upload() -> DocumentUpload {
    DocumentUpload::new("kwitansi.png", "image/png", png_bytes())
}

/// Valid JPEG followed by zero padding up to `size` bytes.
pub fn padded_jpeg_upload(size: usize) -> DocumentUpload {
    let mut data = jpeg_bytes();
    data.resize(size.max(data.len()), 0);
    DocumentUpload::new("scan.jpg", "image/jpeg", data)
}

pub fn text_upload() -> DocumentUpload {
    DocumentUpload::new("catatan.txt", "text/plain", b"bukan gambar".to_vec())
}

pub fn oversized_upload() -> DocumentUpload {
    DocumentUpload::new("besar.jpg", "image/jpeg", vec![0u8; MAX_DOCUMENT_BYTES + 1])
}

/// Declared as PNG, but the bytes are not an image.
pub fn corrupt_png_upload() -> DocumentUpload {
    DocumentUpload::new("rusak.png", "image/png", b"\x89PNG but not really".to_vec())
}

// ============================================================================
// FORM SETUP
// ============================================================================

/// Fill every field with valid input. The preview decode is not run.
pub fn fill_valid(form: &mut FormController) {
    form.edit_purpose(PURPOSE).expect("edit purpose");
    form.edit_amount(AMOUNT).expect("edit amount");
    form.select_document(Some(jpeg_upload()))
        .expect("select document")
        .expect("document accepted");
}

/// Let spawned tasks run after the clock moved.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
