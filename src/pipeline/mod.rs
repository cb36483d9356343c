//! Colorization pipeline: Lab conversion, resampling, inference, and recombination.

mod engine;
mod lab;
mod resize;
mod runner;

pub use engine::{
    colorize, ChromaPredictor, NativeLab, NetworkLab, LUMINANCE_MEAN, NETWORK_INPUT_SIZE,
};
pub use lab::{bgr_to_lab, lab_to_bgr};
pub use resize::resize_bilinear;
pub use runner::{default_model_dir, Config, Pipeline};
