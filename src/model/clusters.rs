//! Quantized chrominance cluster centers.

use std::path::Path;

use ndarray::{Array2, Array4};
use ndarray_npy::read_npy;

use crate::error::{Error, Result};

/// Number of quantized (a, b) bins the network classifies into.
pub const CLUSTER_COUNT: usize = 313;

/// Chrominance channels per cluster center.
pub const AB_CHANNELS: usize = 2;

/// Read the (313, 2) cluster-center table from a `.npy` file.
///
/// Tables saved as float64, float32, or int64 are all accepted.
///
/// # Errors
///
/// Returns an error if the file cannot be parsed or has the wrong shape.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn load_cluster_table(path: &Path) -> Result<Array2<f32>> {
    let table = read_npy::<_, Array2<f64>>(path)
        .map(|t| t.mapv(|v| v as f32))
        .or_else(|_| read_npy::<_, Array2<f32>>(path))
        .or_else(|_| read_npy::<_, Array2<i64>>(path).map(|t| t.mapv(|v| v as f32)))
        .map_err(|source| Error::ClusterTable {
            path: path.to_path_buf(),
            source,
        })?;

    if table.dim() != (CLUSTER_COUNT, AB_CHANNELS) {
        return Err(Error::ShapeMismatch {
            expected: format!("[{CLUSTER_COUNT}, {AB_CHANNELS}] cluster table"),
            actual: format!("{:?}", table.shape()),
        });
    }

    tracing::debug!("Loaded {} cluster centers", table.nrows());
    Ok(table)
}

/// Reinterpret the cluster list as a 1x1 convolution kernel.
///
/// The (313, 2) table is transposed to (2, 313) and given two trailing unit
/// axes, so output channel `k` (a or b) weights input class `c` by
/// `table[c][k]`.
///
/// # Errors
///
/// Returns an error if the table is not (313, 2).
pub fn cluster_kernel(table: &Array2<f32>) -> Result<Array4<f32>> {
    if table.dim() != (CLUSTER_COUNT, AB_CHANNELS) {
        return Err(Error::ShapeMismatch {
            expected: format!("[{CLUSTER_COUNT}, {AB_CHANNELS}] cluster table"),
            actual: format!("{:?}", table.shape()),
        });
    }

    Ok(Array4::from_shape_fn(
        (AB_CHANNELS, CLUSTER_COUNT, 1, 1),
        |(k, c, _, _)| table[[c, k]],
    ))
}
