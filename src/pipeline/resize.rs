//! Bilinear resampling of multi-channel float planes.

use ndarray::{Array3, ArrayView3};

/// Source taps for one destination coordinate.
#[derive(Debug, Clone, Copy)]
struct Tap {
    lo: usize,
    hi: usize,
    frac: f32,
}

/// Map destination indices to source taps with half-pixel centers.
///
/// Coordinates past either edge are clamped to the border sample.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn taps(src_len: usize, dst_len: usize) -> Vec<Tap> {
    let scale = src_len as f32 / dst_len as f32;
    let last = src_len - 1;

    (0..dst_len)
        .map(|i| {
            let pos = (i as f32 + 0.5).mul_add(scale, -0.5);
            if pos <= 0.0 {
                return Tap { lo: 0, hi: 0, frac: 0.0 };
            }
            // Safe: pos is positive here
            let lo = pos.floor() as usize;
            if lo >= last {
                return Tap {
                    lo: last,
                    hi: last,
                    frac: 0.0,
                };
            }
            Tap {
                lo,
                hi: lo + 1,
                frac: pos - lo as f32,
            }
        })
        .collect()
}

/// Resize a (height, width, channels) array to `height` x `width` with
/// bilinear interpolation.
///
/// Every channel is interpolated independently and no value range is
/// assumed, so Lab and chrominance planes pass through untouched. Resizing to
/// the same size returns an exact copy.
///
/// # Panics
///
/// Panics if the source or the destination has a zero dimension.
#[must_use]
pub fn resize_bilinear(src: ArrayView3<'_, f32>, height: usize, width: usize) -> Array3<f32> {
    let (src_h, src_w, channels) = src.dim();
    assert!(src_h > 0 && src_w > 0, "cannot resize an empty image");
    assert!(height > 0 && width > 0, "cannot resize to an empty image");

    let rows = taps(src_h, height);
    let cols = taps(src_w, width);

    Array3::from_shape_fn((height, width, channels), |(y, x, c)| {
        let Tap { lo: y0, hi: y1, frac: fy } = rows[y];
        let Tap { lo: x0, hi: x1, frac: fx } = cols[x];

        let top = (1.0 - fx).mul_add(src[[y0, x0, c]], fx * src[[y0, x1, c]]);
        let bottom = (1.0 - fx).mul_add(src[[y1, x0, c]], fx * src[[y1, x1, c]]);
        (1.0 - fy).mul_add(top, fy * bottom)
    })
}
