//! Conversion between blue-first sRGB and CIE L*a*b* (D65).
//!
//! Both directions are unclamped: out-of-gamut Lab values come back as sRGB
//! values outside [0, 1], which the caller clamps.

use ndarray::{Array3, ArrayView3, Axis, Zip};
use palette::convert::FromColorUnclamped;
use palette::white_point::D65;
use palette::{Lab, LinSrgb, Srgb};

/// Channels in a Lab image: L, a, b.
pub const LAB_CHANNELS: usize = 3;

/// Convert a blue-first image with samples in [0, 1] to Lab.
///
/// Output channel 0 is L in [0, 100], channels 1 and 2 are a and b.
#[must_use]
pub fn bgr_to_lab(scaled: ArrayView3<'_, f32>) -> Array3<f32> {
    let (height, width, _) = scaled.dim();
    let mut lab = Array3::<f32>::zeros((height, width, LAB_CHANNELS));

    Zip::from(scaled.lanes(Axis(2)))
        .and(lab.lanes_mut(Axis(2)))
        .for_each(|bgr, mut out| {
            let lin: LinSrgb<f32> = Srgb::new(bgr[2], bgr[1], bgr[0]).into_linear();
            let color: Lab<D65, f32> = Lab::from_color_unclamped(lin);
            out[0] = color.l;
            out[1] = color.a;
            out[2] = color.b;
        });

    lab
}

/// Convert Lab back to a blue-first image. Samples are not clamped.
#[must_use]
pub fn lab_to_bgr(lab: ArrayView3<'_, f32>) -> Array3<f32> {
    let (height, width, _) = lab.dim();
    let mut bgr = Array3::<f32>::zeros((height, width, 3));

    Zip::from(lab.lanes(Axis(2)))
        .and(bgr.lanes_mut(Axis(2)))
        .for_each(|color, mut out| {
            let lin = LinSrgb::<f32>::from_color_unclamped(Lab::<D65, f32>::new(
                color[0], color[1], color[2],
            ));
            let srgb: Srgb<f32> = Srgb::from_linear(lin);
            out[0] = srgb.blue;
            out[1] = srgb.green;
            out[2] = srgb.red;
        });

    bgr
}
