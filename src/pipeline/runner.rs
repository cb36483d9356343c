//! Configured colorization pipeline around a shared network handle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::image::{self, BgrImage};
use crate::model::{self, Artifact, ModelPaths};

use super::engine::{colorize, ChromaPredictor};

/// Configuration for the colorization pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Folder holding the model artifacts under their default names.
    pub model_dir: PathBuf,

    /// Override for the ONNX graph path. The weight data is always read
    /// from beside the graph.
    pub topology: Option<PathBuf>,

    /// Override for the cluster-center table path.
    pub clusters: Option<PathBuf>,

    /// Download location quoted when the weights are missing.
    pub download_source: Option<String>,

    /// Output JPEG quality (1-100).
    pub output_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            topology: None,
            clusters: None,
            download_source: None,
            output_quality: 95,
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.output_quality) {
            return Err(Error::InvalidParameter {
                name: "output_quality".to_string(),
                reason: "must be between 1 and 100".to_string(),
            });
        }

        Ok(())
    }

    /// Resolve artifact paths, applying any per-file overrides.
    #[must_use]
    pub fn model_paths(&self) -> ModelPaths {
        let defaults = ModelPaths::in_dir(&self.model_dir);
        let topology = self.topology.clone().unwrap_or(defaults.topology);
        ModelPaths {
            weights: topology.with_file_name(Artifact::Weights.filename()),
            topology,
            clusters: self.clusters.clone().unwrap_or(defaults.clusters),
            download_source: self.download_source.clone(),
        }
    }
}

/// Platform data folder for model artifacts:
/// - Windows: `%APPDATA%\lumachroma\models`
/// - Linux: `~/.local/share/lumachroma/models`
/// - macOS: `~/Library/Application Support/lumachroma/models`
///
/// Falls back to `./model` when the platform has no data folder.
#[must_use]
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir().map_or_else(
        || PathBuf::from("model"),
        |base| base.join("lumachroma").join("models"),
    )
}

/// Colorization pipeline bound to one network handle.
///
/// Cloning is cheap; clones share the same network.
#[derive(Clone)]
pub struct Pipeline {
    config: Config,
    predictor: Arc<dyn ChromaPredictor>,
}

impl Pipeline {
    /// Load the model named by the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceMissing`] if a model artifact is absent, or a
    /// load error if the model cannot be initialized.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tracing::info!("Initializing pipeline with config: {config:?}");
        let network = model::initialize(&config.model_paths())?;

        Ok(Self {
            config,
            predictor: Arc::new(network),
        })
    }

    /// Use an already constructed predictor instead of loading one.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_predictor(config: Config, predictor: Arc<dyn ChromaPredictor>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, predictor })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Colorize an already decoded image.
    ///
    /// # Errors
    ///
    /// Propagates predictor failures.
    pub fn colorize(&self, image: BgrImage) -> Result<(BgrImage, BgrImage)> {
        colorize(image, &*self.predictor)
    }

    /// Decode and colorize an image file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidImage`] if the file cannot be decoded.
    pub fn colorize_file<P: AsRef<Path>>(&self, path: P) -> Result<(BgrImage, BgrImage)> {
        let path = path.as_ref();
        tracing::info!("Colorizing {}", path.display());
        self.colorize(image::load_image(path)?)
    }

    /// Decode and colorize an encoded in-memory image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidImage`] if the bytes cannot be decoded.
    pub fn colorize_bytes(&self, bytes: &[u8]) -> Result<(BgrImage, BgrImage)> {
        self.colorize(image::decode_image(bytes)?)
    }

    /// Colorize `input_path` and write the result to `output_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding, inference, or saving fails.
    pub fn process<P: AsRef<Path>, Q: AsRef<Path>>(&self, input_path: P, output_path: Q) -> Result<()> {
        let output_path = output_path.as_ref();

        let (_, colorized) = self.colorize_file(input_path)?;

        tracing::info!("Saving output to: {}", output_path.display());
        image::save_image(&colorized, output_path, self.config.output_quality)?;

        tracing::info!("Processing complete");
        Ok(())
    }
}
