use super::preprocess::Preprocessor;
use super::types::{joints, HandLandmarkSet, HandPoseEstimator, Handedness, Landmark};
use anyhow::{ensure, Context, Result};
use image::{imageops, RgbImage};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::TensorRef;
use std::path::Path;

/// Network input edge in pixels
const INPUT_SIZE: u32 = 224;
/// Hands scoring below this presence are dropped
const MIN_PRESENCE: f32 = 0.5;

/// MediaPipe-style hand landmark network
///
/// There is no palm detector in front of it, so each half of the frame is
/// assumed to hold at most one hand and is run through the network on its
/// own. Outputs: 21 (x, y, z) landmarks in input pixels, a presence score and
/// a handedness score where > 0.5 means "Right".
pub struct HandLandmarkModel {
    session: Session,
    preprocessor: Preprocessor,
}

impl HandLandmarkModel {
    /// Create a new landmark model from an ONNX file
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let path = model_path.as_ref();

        tracing::info!("Loading hand landmark model from {}", path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        tracing::info!("Hand landmark model loaded successfully");

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(INPUT_SIZE, INPUT_SIZE),
        })
    }

    /// Run the network on one crop; landmarks come back normalized to the crop
    fn infer(&mut self, crop: &RgbImage) -> Result<Option<(Handedness, Vec<Landmark>)>> {
        let input_tensor = self.preprocessor.preprocess(crop);

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input_tensor.view())?])
            .context("Failed to run inference")?;

        let coords: Vec<f32> = outputs[0].try_extract_array::<f32>()?.iter().copied().collect();
        let presence = first_value(outputs[1].try_extract_array::<f32>()?.iter())?;
        let handedness = first_value(outputs[2].try_extract_array::<f32>()?.iter())?;

        if presence < MIN_PRESENCE {
            return Ok(None);
        }
        ensure!(
            coords.len() >= joints::COUNT * 3,
            "Landmark output has {} values, expected {}",
            coords.len(),
            joints::COUNT * 3
        );

        let scale = INPUT_SIZE as f32;
        let landmarks = coords
            .chunks_exact(3)
            .take(joints::COUNT)
            .map(|xyz| Landmark::new(xyz[0] / scale, xyz[1] / scale))
            .collect();
        let side = if handedness > 0.5 {
            Handedness::Right
        } else {
            Handedness::Left
        };

        Ok(Some((side, landmarks)))
    }
}

fn first_value<'a>(mut values: impl Iterator<Item = &'a f32>) -> Result<f32> {
    values.next().copied().context("Empty score output")
}

impl HandPoseEstimator for HandLandmarkModel {
    fn process(&mut self, frame: &RgbImage) -> Result<Vec<HandLandmarkSet>> {
        let _span = tracing::debug_span!("hand_landmarks").entered();

        let (width, height) = frame.dimensions();
        let half = width / 2;
        let mut hands = Vec::with_capacity(2);

        for (offset, crop_width) in [(0, half), (half, width - half)] {
            if crop_width == 0 {
                continue;
            }
            let crop = imageops::crop_imm(frame, offset, 0, crop_width, height).to_image();
            let Some((handedness, local)) = self.infer(&crop)? else {
                continue;
            };

            let mut landmarks = [Landmark::default(); joints::COUNT];
            for (slot, point) in landmarks.iter_mut().zip(local) {
                *slot = Landmark::new(
                    (offset as f32 + point.x * crop_width as f32) / width as f32,
                    point.y,
                );
            }
            hands.push(HandLandmarkSet {
                handedness,
                landmarks,
            });
        }

        Ok(hands)
    }
}
