//! Colorization network: an opaque backbone plus the rewired output head.
//!
//! The backbone produces raw scores over the quantized chrominance bins. The
//! head turns them into continuous (a, b) values in three named layers:
//!
//! 1. `conv8_313_rh` scales every class score by a per-class factor.
//! 2. `class8_313_rh` applies a softmax across the classes.
//! 3. `class8_ab` is a 1x1 convolution whose kernel is the cluster-center
//!    table, so each output is the probability-weighted mean cluster center.

use std::fmt;

use ndarray::{Array2, Array4, ArrayD, Axis, Ix2, Ix4};

use crate::error::{Error, Result};
use crate::pipeline::ChromaPredictor;

use super::clusters::{AB_CHANNELS, CLUSTER_COUNT};

/// Per-class score scaling layer.
pub const RESCALE_LAYER: &str = "conv8_313_rh";

/// Softmax over the class scores. Has no parameters.
pub const SOFTMAX_LAYER: &str = "class8_313_rh";

/// 1x1 convolution mapping class probabilities to (a, b).
pub const CLASS_AB_LAYER: &str = "class8_ab";

/// Score scaling applied by [`RESCALE_LAYER`], tied to the pretrained weights.
pub const RESCALE_FACTOR: f32 = 2.606;

/// The part of the network loaded from disk.
///
/// Implementations must be safe to call from several threads; the ONNX
/// implementation serializes calls internally.
pub trait Backbone: Send + Sync {
    /// Run a forward pass on a (1, 1, H, W) luminance tensor and return
    /// class scores shaped (1, 313, h, w).
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    fn forward(&self, input: &Array4<f32>) -> Result<Array4<f32>>;
}

/// Network handle shared by every colorization call.
///
/// Only [`ColorNetwork::set_layer_blob`] mutates it, and that happens during
/// initialization before the handle is shared.
pub struct ColorNetwork {
    backbone: Box<dyn Backbone>,
    /// (1, 313) scale factors.
    rescale: Option<Array2<f32>>,
    /// (2, 313) kernel, the (2, 313, 1, 1) blob without its unit axes.
    class_ab: Option<Array2<f32>>,
}

impl ColorNetwork {
    /// Wrap a backbone. The head layers start without weights.
    pub fn new<B: Backbone + 'static>(backbone: B) -> Self {
        Self {
            backbone: Box::new(backbone),
            rescale: None,
            class_ab: None,
        }
    }

    /// Assign the weight blob of a named head layer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownLayer`] for a layer without weights (including
    /// the softmax) and [`Error::ShapeMismatch`] if the blob has the wrong shape.
    pub fn set_layer_blob(&mut self, layer: &str, blob: ArrayD<f32>) -> Result<()> {
        match layer {
            RESCALE_LAYER => {
                let blob = expect_shape(blob, &[1, CLUSTER_COUNT])?
                    .into_dimensionality::<Ix2>()
                    .map_err(|err| shape_error(&err))?;
                self.rescale = Some(blob);
            }
            CLASS_AB_LAYER => {
                let blob = expect_shape(blob, &[AB_CHANNELS, CLUSTER_COUNT, 1, 1])?
                    .into_dimensionality::<Ix4>()
                    .map_err(|err| shape_error(&err))?;
                let kernel = blob.index_axis_move(Axis(3), 0).index_axis_move(Axis(2), 0);
                self.class_ab = Some(kernel);
            }
            _ => {
                return Err(Error::UnknownLayer {
                    layer: layer.to_string(),
                })
            }
        }
        Ok(())
    }

    /// Run the backbone and the head on a (1, 1, H, W) luminance tensor.
    ///
    /// Returns predicted (a, b) planes shaped (1, 2, h, w), where (h, w) is
    /// the spatial size of the backbone's output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LayerNotConfigured`] if a head layer never received
    /// weights, or any error from the backbone.
    pub fn forward(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let rescale = self.rescale.as_ref().ok_or(Error::LayerNotConfigured {
            layer: RESCALE_LAYER,
        })?;
        let class_ab = self.class_ab.as_ref().ok_or(Error::LayerNotConfigured {
            layer: CLASS_AB_LAYER,
        })?;

        let scores = self.backbone.forward(input)?;
        let (batch, classes, height, width) = scores.dim();
        if classes != CLUSTER_COUNT {
            return Err(Error::ShapeMismatch {
                expected: format!("{CLUSTER_COUNT} class scores"),
                actual: format!("{:?}", scores.shape()),
            });
        }
        tracing::debug!("Backbone produced {:?} scores", scores.shape());

        let scale = rescale.row(0).insert_axis(Axis(1));
        let mut ab = Array4::<f32>::zeros((batch, AB_CHANNELS, height, width));

        for (item, mut out) in scores.outer_iter().zip(ab.outer_iter_mut()) {
            // One column per pixel
            let flat = item
                .as_standard_layout()
                .into_owned()
                .into_shape_with_order((CLUSTER_COUNT, height * width))
                .map_err(|err| shape_error(&err))?;

            let mut probs = flat * &scale;
            softmax_columns(&mut probs);

            let pixels = class_ab
                .dot(&probs)
                .into_shape_with_order((AB_CHANNELS, height, width))
                .map_err(|err| shape_error(&err))?;
            out.assign(&pixels);
        }

        Ok(ab)
    }
}

impl fmt::Debug for ColorNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColorNetwork")
            .field(RESCALE_LAYER, &self.rescale.is_some())
            .field(CLASS_AB_LAYER, &self.class_ab.is_some())
            .finish_non_exhaustive()
    }
}

impl ChromaPredictor for ColorNetwork {
    fn predict_ab(&self, luminance: &Array4<f32>) -> Result<Array4<f32>> {
        self.forward(luminance)
    }
}

/// Numerically stable softmax down each column.
fn softmax_columns(scores: &mut Array2<f32>) {
    for mut column in scores.columns_mut() {
        let max = column.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        column.mapv_inplace(|v| (v - max).exp());
        let sum = column.sum();
        column /= sum;
    }
}

fn expect_shape(blob: ArrayD<f32>, expected: &[usize]) -> Result<ArrayD<f32>> {
    if blob.shape() == expected {
        Ok(blob)
    } else {
        Err(Error::ShapeMismatch {
            expected: format!("{expected:?}"),
            actual: format!("{:?}", blob.shape()),
        })
    }
}

fn shape_error(err: &ndarray::ShapeError) -> Error {
    Error::ShapeMismatch {
        expected: "compatible layout".to_string(),
        actual: err.to_string(),
    }
}
