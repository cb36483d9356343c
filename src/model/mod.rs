//! Model loading and the colorization network.

mod clusters;
mod loader;
mod network;
mod onnx;

pub use clusters::{cluster_kernel, load_cluster_table, AB_CHANNELS, CLUSTER_COUNT};
pub use loader::{initialize, rewire, Artifact, ModelPaths};
pub use network::{
    Backbone, ColorNetwork, CLASS_AB_LAYER, RESCALE_FACTOR, RESCALE_LAYER, SOFTMAX_LAYER,
};
pub use onnx::OnnxBackbone;
