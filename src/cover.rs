//! Cover art thumbnails.
//!
//! Submissions embed full-size covers as base64. The report only needs small
//! thumbnails, so each cover is shrunk to fit a square box and re-encoded as PNG.

use std::io::Cursor;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use image::{GenericImageView, ImageFormat};
use thiserror::Error;

#[derive(Error, Debug)]
enum CoverError {
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Shrink a base64 cover to fit within `max_size` × `max_size`, preserving aspect ratio.
/// Images already inside the box keep their size. On any failure the input is returned unchanged.
pub fn shrink_cover(encoded: &str, max_size: u32) -> String {
    match try_shrink(encoded, max_size) {
        Ok(resized) => resized,
        Err(e) => {
            log::warn!("Image processing error: {e}");
            encoded.to_string()
        }
    }
}

fn try_shrink(encoded: &str, max_size: u32) -> Result<String, CoverError> {
    let bytes = BASE64.decode(encoded.trim())?;
    let img = image::load_from_memory(&bytes)?;

    let (width, height) = img.dimensions();
    let img = if width > max_size || height > max_size {
        img.thumbnail(max_size, max_size)
    } else {
        img
    };

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(BASE64.encode(buf.into_inner()))
}
