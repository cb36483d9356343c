//! Image decoding, encoding, and the blue-first pixel buffer used by the pipeline.

mod load;
mod save;

pub use load::{decode_image, list_images, load_image, SUPPORTED_EXTENSIONS};
pub use save::{encode_png, save_image};

use image::{Rgb, RgbImage};
use ndarray::{Array3, ArrayView3};

use crate::error::{Error, Result};

/// Number of channels in color images.
pub const COLOR_CHANNELS: usize = 3;

/// An 8-bit, 3-channel image stored as a (height, width, channel) array.
///
/// Channel 0 holds blue, channel 1 green, channel 2 red. Height and width are
/// always non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgrImage {
    pixels: Array3<u8>,
}

impl BgrImage {
    /// Wrap a (height, width, 3) array.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidImage`] if the array does not have exactly three
    /// channels or if either spatial dimension is zero.
    pub fn new(pixels: Array3<u8>) -> Result<Self> {
        let (height, width, channels) = pixels.dim();
        if channels != COLOR_CHANNELS {
            return Err(Error::InvalidImage {
                origin: "buffer".to_string(),
                reason: format!("expected {COLOR_CHANNELS} channels, got {channels}"),
            });
        }
        if height == 0 || width == 0 {
            return Err(Error::InvalidImage {
                origin: "buffer".to_string(),
                reason: format!("empty image {width}x{height}"),
            });
        }
        Ok(Self { pixels })
    }

    /// Convert from an RGB image, swapping into blue-first order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidImage`] if the image has a zero dimension.
    pub fn from_rgb(rgb: &RgbImage) -> Result<Self> {
        let (width, height) = rgb.dimensions();
        let pixels = Array3::from_shape_fn((height as usize, width as usize, COLOR_CHANNELS), |(y, x, c)| {
            // Safe: x and y are bounded by the source dimensions
            #[allow(clippy::cast_possible_truncation)]
            let pixel = rgb.get_pixel(x as u32, y as u32);
            pixel[COLOR_CHANNELS - 1 - c]
        });
        Self::new(pixels)
    }

    /// Convert to an RGB image.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_rgb(&self) -> RgbImage {
        let (height, width, _) = self.pixels.dim();
        RgbImage::from_fn(width as u32, height as u32, |x, y| {
            let (x, y) = (x as usize, y as usize);
            Rgb([
                self.pixels[[y, x, 2]],
                self.pixels[[y, x, 1]],
                self.pixels[[y, x, 0]],
            ])
        })
    }

    /// Image height in pixels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.pixels.dim().0
    }

    /// Image width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.pixels.dim().1
    }

    /// Borrow the underlying samples.
    #[must_use]
    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.pixels.view()
    }
}
