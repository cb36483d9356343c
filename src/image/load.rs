//! Image loading utilities.

use std::fs;
use std::path::{Path, PathBuf};

use image::{GenericImageView, ImageReader};

use crate::error::{Error, Result};

use super::BgrImage;

/// File name endings accepted when browsing a folder for images.
pub const SUPPORTED_EXTENSIONS: [&str; 5] = [".png", ".jpg", "jpeg", ".tiff", ".bmp"];

/// Load an image from disk into a blue-first buffer.
///
/// Any color type the decoder understands is accepted; alpha is dropped and
/// grayscale is expanded to three equal channels.
///
/// # Errors
///
/// Returns [`Error::InvalidImage`] if the file cannot be read or decoded.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<BgrImage> {
    let path = path.as_ref();

    let invalid = |reason: String| Error::InvalidImage {
        origin: path.display().to_string(),
        reason,
    };

    // Sniff the content so files with missing or misleading extensions still decode
    let img = ImageReader::open(path)
        .and_then(ImageReader::with_guessed_format)
        .map_err(|source| invalid(source.to_string()))?
        .decode()
        .map_err(|source| invalid(source.to_string()))?;

    let (width, height) = img.dimensions();
    tracing::debug!(
        "Decoded {} ({width}x{height}, {:?})",
        path.display(),
        img.color()
    );

    BgrImage::from_rgb(&img.to_rgb8()).map_err(|err| relabel(err, &path.display().to_string()))
}

/// Decode an in-memory encoded image (PNG, JPEG, ...) into a blue-first buffer.
///
/// # Errors
///
/// Returns [`Error::InvalidImage`] if the bytes cannot be decoded.
pub fn decode_image(bytes: &[u8]) -> Result<BgrImage> {
    let img = image::load_from_memory(bytes).map_err(|source| Error::InvalidImage {
        origin: "in-memory buffer".to_string(),
        reason: source.to_string(),
    })?;

    BgrImage::from_rgb(&img.to_rgb8()).map_err(|err| relabel(err, "in-memory buffer"))
}

/// List the image files directly inside `folder`, sorted by file name.
///
/// Only regular files whose lower-cased name ends with one of
/// [`SUPPORTED_EXTENSIONS`] are returned.
///
/// # Errors
///
/// Returns an error if the folder cannot be read.
pub fn list_images<P: AsRef<Path>>(folder: P) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();

    for entry in fs::read_dir(folder.as_ref())? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let name = name.to_lowercase();
        if SUPPORTED_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
            images.push(path);
        }
    }

    images.sort();
    Ok(images)
}

fn relabel(err: Error, origin: &str) -> Error {
    match err {
        Error::InvalidImage { reason, .. } => Error::InvalidImage {
            origin: origin.to_string(),
            reason,
        },
        other => other,
    }
}
