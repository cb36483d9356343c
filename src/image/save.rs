//! Image saving utilities.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat};

use crate::error::{Error, Result};

use super::BgrImage;

/// Save an image to disk.
///
/// The container format is inferred from the extension (PNG when there is
/// none). JPEG output is written with the given quality.
///
/// # Arguments
///
/// * `image` - Image to write
/// * `path` - Output file path
/// * `quality` - JPEG quality (1-100), ignored for other formats
///
/// # Errors
///
/// Returns an error if the image cannot be encoded or written.
pub fn save_image<P: AsRef<Path>>(image: &BgrImage, path: P, quality: u8) -> Result<()> {
    let path = path.as_ref();

    let rgb = DynamicImage::ImageRgb8(image.to_rgb());

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    let saved = match extension.as_deref() {
        Some("jpg" | "jpeg") => {
            let mut output = std::fs::File::create(path)?;
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality);
            rgb.write_with_encoder(encoder)
        }
        Some(_) => rgb.save(path),
        None => rgb.save_with_format(path, ImageFormat::Png),
    };

    saved.map_err(|source| Error::ImageSave {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!("Wrote {}", path.display());
    Ok(())
}

/// Encode an image as PNG bytes, the form handed to display surfaces.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn encode_png(image: &BgrImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .to_rgb()
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|source| Error::ImageSave {
            path: "<memory>".into(),
            source,
        })?;
    Ok(bytes)
}
