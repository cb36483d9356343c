//! Model artifact resolution and network initialization.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;

use crate::error::{Error, Result};

use super::clusters::{cluster_kernel, load_cluster_table, CLUSTER_COUNT};
use super::network::{ColorNetwork, CLASS_AB_LAYER, RESCALE_FACTOR, RESCALE_LAYER};
use super::onnx::OnnxBackbone;

/// Files that make up a colorization model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// ONNX graph describing the network topology.
    Topology,
    /// External initializer data holding the trained weights.
    Weights,
    /// `NumPy` table of quantized (a, b) cluster centers.
    ClusterCenters,
}

impl Artifact {
    /// Get the default filename for this artifact.
    #[must_use]
    pub const fn filename(&self) -> &'static str {
        match self {
            Self::Topology => "colorization.onnx",
            // The ONNX graph references this exact name internally
            Self::Weights => "colorization.onnx_data",
            Self::ClusterCenters => "pts_in_hull.npy",
        }
    }

    /// Approximate size in bytes, quoted when the file has to be fetched.
    #[must_use]
    pub const fn approx_size(&self) -> u64 {
        match self {
            Self::Topology => 50_000,
            Self::Weights => 129_000_000, // ~129 MB
            Self::ClusterCenters => 5_000,
        }
    }

    /// Tell the user how to put the artifact in place.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn remediation(&self, path: &Path, download_source: Option<&str>) -> String {
        let folder = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| ".".to_string(), |p| p.display().to_string());
        let file = path
            .file_name()
            .map_or_else(|| self.filename().to_string(), |f| f.to_string_lossy().into_owned());

        let mut message = match self {
            Self::Weights => format!(
                "the trained weights are a separate download of about {:.0} MB; save them as \"{file}\" in the folder {folder}",
                self.approx_size() as f64 / 1_000_000.0
            ),
            Self::Topology | Self::ClusterCenters => {
                format!("copy \"{file}\" from the model bundle into the folder {folder}")
            }
        };

        if let Some(source) = download_source {
            message.push_str(&format!(" (download: {source})"));
        }
        message
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Topology => "network topology",
            Self::Weights => "network weights",
            Self::ClusterCenters => "cluster-center table",
        };
        f.write_str(name)
    }
}

/// Locations of the three model artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub topology: PathBuf,
    pub weights: PathBuf,
    pub clusters: PathBuf,
    /// Where the weights can be downloaded, quoted when they are missing.
    pub download_source: Option<String>,
}

impl ModelPaths {
    /// Use the default artifact filenames inside `dir`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            topology: dir.join(Artifact::Topology.filename()),
            weights: dir.join(Artifact::Weights.filename()),
            clusters: dir.join(Artifact::ClusterCenters.filename()),
            download_source: None,
        }
    }

    /// Path of a single artifact.
    #[must_use]
    pub fn path(&self, artifact: Artifact) -> &Path {
        match artifact {
            Artifact::Topology => &self.topology,
            Artifact::Weights => &self.weights,
            Artifact::ClusterCenters => &self.clusters,
        }
    }

    /// Check that every artifact is a readable file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceMissing`] for the first artifact that is absent
    /// or unreadable.
    pub fn verify(&self) -> Result<()> {
        for artifact in [Artifact::Topology, Artifact::Weights, Artifact::ClusterCenters] {
            let path = self.path(artifact);
            if !is_readable_file(path) {
                return Err(Error::ResourceMissing {
                    artifact,
                    path: path.to_path_buf(),
                    remediation: artifact.remediation(path, self.download_source.as_deref()),
                });
            }
        }
        Ok(())
    }

    /// Weight data the runtime will actually read: the file named
    /// [`Artifact::Weights`] next to the topology.
    #[must_use]
    pub fn expected_weights(&self) -> PathBuf {
        self.topology.with_file_name(Artifact::Weights.filename())
    }

    /// Check that the weights sit where the runtime resolves them.
    ///
    /// The graph names its external data file, and the runtime looks for it
    /// beside the graph, so any other location would be verified and then
    /// silently ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the weights path is not the
    /// topology's sibling [`Artifact::Weights`] file.
    pub fn check_layout(&self) -> Result<()> {
        let expected = self.expected_weights();
        if self.weights != expected {
            return Err(Error::InvalidParameter {
                name: "weights".to_string(),
                reason: format!(
                    "{} is not read by the runtime; the weights must be {}",
                    self.weights.display(),
                    expected.display()
                ),
            });
        }
        Ok(())
    }
}

fn is_readable_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file()) && fs::File::open(path).is_ok()
}

/// Load the network and rewire its output head onto the cluster centers.
///
/// Every artifact is checked before anything is loaded, so a missing file
/// never leaves a partially configured network behind.
///
/// # Errors
///
/// Returns [`Error::ResourceMissing`] if an artifact is absent,
/// [`Error::InvalidParameter`] if the weights are not beside the topology, or
/// a load error if the graph or cluster table cannot be parsed.
pub fn initialize(paths: &ModelPaths) -> Result<ColorNetwork> {
    paths.verify()?;
    paths.check_layout()?;

    tracing::info!(
        "Loading network from {} with weights {}",
        paths.topology.display(),
        paths.weights.display()
    );
    let backbone = OnnxBackbone::load(&paths.topology)?;

    tracing::info!("Loading cluster centers from {}", paths.clusters.display());
    let table = load_cluster_table(&paths.clusters)?;

    let mut network = ColorNetwork::new(backbone);
    rewire(&mut network, &table)?;

    tracing::info!("Network initialized successfully");
    Ok(network)
}

/// Install the cluster kernel and the fixed rescaling blob on the head layers.
///
/// # Errors
///
/// Returns an error if the table does not hold [`CLUSTER_COUNT`] (a, b) pairs.
pub fn rewire(network: &mut ColorNetwork, table: &Array2<f32>) -> Result<()> {
    let kernel = cluster_kernel(table)?;
    tracing::debug!("Assigning {:?} kernel to {CLASS_AB_LAYER}", kernel.shape());
    network.set_layer_blob(CLASS_AB_LAYER, kernel.into_dyn())?;

    let rescale = Array2::from_elem((1, CLUSTER_COUNT), RESCALE_FACTOR);
    tracing::debug!("Assigning constant {RESCALE_FACTOR} to {RESCALE_LAYER}");
    network.set_layer_blob(RESCALE_LAYER, rescale.into_dyn())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch_all_but(dir: &Path, skip: Artifact) -> ModelPaths {
        let paths = ModelPaths::in_dir(dir);
        for artifact in [Artifact::Topology, Artifact::Weights, Artifact::ClusterCenters] {
            if artifact != skip {
                fs::write(paths.path(artifact), b"stub").unwrap();
            }
        }
        paths
    }

    #[test]
    fn test_missing_weights_is_resource_missing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = touch_all_but(dir.path(), Artifact::Weights);

        match initialize(&paths) {
            Err(Error::ResourceMissing {
                artifact,
                path,
                remediation,
            }) => {
                assert_eq!(artifact, Artifact::Weights);
                assert_eq!(path, paths.weights);
                assert!(remediation.contains("colorization.onnx_data"));
                assert!(remediation.contains(&dir.path().display().to_string()));
            }
            other => panic!("expected ResourceMissing, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_clusters_is_resource_missing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = touch_all_but(dir.path(), Artifact::ClusterCenters);

        let err = paths.verify().unwrap_err();
        assert!(matches!(
            err,
            Error::ResourceMissing {
                artifact: Artifact::ClusterCenters,
                ..
            }
        ));
    }

    #[test]
    fn test_directory_is_not_a_readable_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = touch_all_but(dir.path(), Artifact::Topology);
        paths.topology = dir.path().to_path_buf();

        assert!(matches!(
            paths.verify(),
            Err(Error::ResourceMissing {
                artifact: Artifact::Topology,
                ..
            })
        ));
    }

    #[test]
    fn test_remediation_quotes_download_source() {
        let text = Artifact::Weights.remediation(
            Path::new("model/colorization.onnx_data"),
            Some("https://example.invalid/weights"),
        );
        assert!(text.contains("folder model"));
        assert!(text.contains("https://example.invalid/weights"));
    }

    #[test]
    fn test_weights_elsewhere_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let mut paths = touch_all_but(dir.path(), Artifact::Weights);
        paths.weights = other.path().join(Artifact::Weights.filename());
        fs::write(&paths.weights, b"stub").unwrap();

        assert!(paths.verify().is_ok());
        assert!(matches!(
            initialize(&paths),
            Err(Error::InvalidParameter { ref name, .. }) if name == "weights"
        ));
    }

    #[test]
    fn test_renamed_weights_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = touch_all_but(dir.path(), Artifact::Weights);
        paths.weights = dir.path().join("weights.bin");
        fs::write(&paths.weights, b"stub").unwrap();

        assert!(matches!(
            paths.check_layout(),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_default_layout_accepted() {
        let paths = ModelPaths::in_dir("models");
        assert_eq!(paths.expected_weights(), paths.weights);
        assert!(paths.check_layout().is_ok());
    }

    #[test]
    fn test_all_present_passes_verification() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ModelPaths::in_dir(dir.path());
        for artifact in [Artifact::Topology, Artifact::Weights, Artifact::ClusterCenters] {
            fs::write(paths.path(artifact), b"stub").unwrap();
        }
        assert!(paths.verify().is_ok());
    }
}
