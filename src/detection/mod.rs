mod background;
mod landmarks;
mod motion;
mod motion_skin;
mod preprocess;
pub mod regions;
mod skin;
pub mod types;

pub use landmarks::LandmarkDetector;
pub use motion_skin::MotionSkinDetector;
pub use types::{ActivationDetector, ActiveKeys};

use crate::config::{PipelineConfig, Strategy};
use crate::pose::HandPoseEstimator;
use anyhow::{bail, Result};

/// Build the detector the configuration asks for
///
/// The landmark strategy needs a hand-pose estimator; the motion strategy
/// ignores it.
pub fn create_detector(
    config: &PipelineConfig,
    capture_size: (u32, u32),
    estimator: Option<Box<dyn HandPoseEstimator>>,
) -> Result<Box<dyn ActivationDetector>> {
    match config.strategy {
        Strategy::Motion => Ok(Box::new(MotionSkinDetector::new(capture_size, config)?)),
        Strategy::Landmarks => match estimator {
            Some(estimator) => Ok(Box::new(LandmarkDetector::new(estimator))),
            None => bail!("The landmark strategy needs a hand-pose estimator"),
        },
    }
}
