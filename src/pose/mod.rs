#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
mod preprocess;
pub mod types;

#[cfg(feature = "onnx")]
pub use onnx::HandLandmarkModel;
pub use types::{joints, Handedness, HandLandmarkSet, HandPoseEstimator, Landmark};

#[cfg(feature = "onnx")]
use anyhow::Result;

/// Load the default hand-pose estimator (ONNX hand landmark network)
#[cfg(feature = "onnx")]
pub fn create_default_estimator(model_path: &str) -> Result<Box<dyn HandPoseEstimator>> {
    let model = HandLandmarkModel::new(model_path)?;
    Ok(Box::new(model))
}
