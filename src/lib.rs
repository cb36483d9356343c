//! # lumachroma
//!
//! Colorize grayscale photographs with a pretrained network that predicts
//! Lab chrominance from luminance.
//!
//! The image is converted to Lab at its own resolution, its L channel is
//! resampled to the network's 224x224 input, and the predicted (a, b) planes
//! are resampled back and recombined with the full-resolution L.
//!
//! ## Example
//!
//! ```no_run
//! use lumachroma::{Config, Pipeline};
//!
//! # fn main() -> lumachroma::Result<()> {
//! let config = Config::default();
//! let pipeline = Pipeline::new(config)?;
//!
//! pipeline.process("grandparents.jpg", "grandparents_color.png")?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod image;
pub mod model;
pub mod pipeline;
pub mod workbench;

pub use error::{Error, Result};
pub use pipeline::{colorize, ChromaPredictor, Config, Pipeline};
pub use workbench::Workbench;
