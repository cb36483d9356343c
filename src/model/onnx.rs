//! ONNX Runtime backbone.

use std::path::Path;

use ndarray::Array4;
use ort::session::Session;
use ort::value::Tensor;
use parking_lot::Mutex;

use crate::error::{Error, Result};

use super::clusters::CLUSTER_COUNT;
use super::network::Backbone;

/// Backbone backed by an ONNX Runtime session.
///
/// The runtime's `run` needs exclusive access, so every forward pass goes
/// through one lock per loaded model.
pub struct OnnxBackbone {
    session: Mutex<Session>,
}

impl OnnxBackbone {
    /// Load an ONNX graph. External weight data is resolved relative to the
    /// graph file.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded.
    pub fn load(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |f| f.to_string_lossy().into_owned());

        let session = Session::builder()
            .map_err(|source| Error::ModelLoad {
                name: name.clone(),
                source,
            })?
            .commit_from_file(path)
            .map_err(|source| Error::ModelLoad {
                name: name.clone(),
                source,
            })?;

        tracing::debug!("Loaded ONNX session for {name}");

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl Backbone for OnnxBackbone {
    fn forward(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let input_value =
            Tensor::from_array(input.clone()).map_err(|source| Error::Inference { source })?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|source| Error::Inference { source })?;

        // Get first output
        let output = outputs
            .values()
            .next()
            .ok_or_else(|| Error::ShapeMismatch {
                expected: "class score output".to_string(),
                actual: "no output".to_string(),
            })?;

        let scores = extract_scores(&output)?;
        Ok(scores)
    }
}

/// Copy the class-score output into a (batch, 313, h, w) array.
///
/// Graphs with dynamic output axes may report any shape, so anything that is
/// not a non-empty score grid over every cluster is rejected.
#[allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap
)]
fn extract_scores(value: &ort::value::ValueRef<'_>) -> Result<Array4<f32>> {
    let (shape, data) = value
        .try_extract_tensor::<f32>()
        .map_err(|source| Error::Inference { source })?;

    let dims: Vec<i64> = shape.iter().copied().collect();
    let &[batch, classes, height, width] = dims.as_slice() else {
        return Err(Error::ShapeMismatch {
            expected: "4D class scores".to_string(),
            actual: format!("{dims:?}"),
        });
    };

    if batch <= 0 || classes != CLUSTER_COUNT as i64 || height <= 0 || width <= 0 {
        return Err(Error::ShapeMismatch {
            expected: format!("(1, {CLUSTER_COUNT}, h, w) with non-empty h and w"),
            actual: format!("{dims:?}"),
        });
    }

    // All four axes were checked positive above
    let grid = (batch as usize, classes as usize, height as usize, width as usize);
    Array4::from_shape_vec(grid, data.to_vec()).map_err(|err| Error::ShapeMismatch {
        expected: format!("{dims:?}"),
        actual: err.to_string(),
    })
}
