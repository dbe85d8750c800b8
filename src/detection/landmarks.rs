use super::types::{ActivationDetector, ActiveKeys};
use crate::capture::Frame;
use crate::pose::{joints, HandLandmarkSet, HandPoseEstimator, Handedness};
use anyhow::{Context, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    /// (base, middle, tip) joints used to judge the bend
    fn joints(self) -> (usize, usize, usize) {
        match self {
            Finger::Thumb => (joints::THUMB_CMC, joints::THUMB_IP, joints::THUMB_TIP),
            Finger::Index => (
                joints::INDEX_FINGER_MCP,
                joints::INDEX_FINGER_PIP,
                joints::INDEX_FINGER_TIP,
            ),
            Finger::Middle => (
                joints::MIDDLE_FINGER_MCP,
                joints::MIDDLE_FINGER_PIP,
                joints::MIDDLE_FINGER_TIP,
            ),
            Finger::Ring => (
                joints::RING_FINGER_MCP,
                joints::RING_FINGER_PIP,
                joints::RING_FINGER_TIP,
            ),
            Finger::Pinky => (joints::PINKY_MCP, joints::PINKY_PIP, joints::PINKY_TIP),
        }
    }
}

/// Whether `finger` is folded toward the palm.
///
/// Fingers: the tip sits lower in the image than the middle joint.
/// Thumb: the tip crosses the base joint toward the palm; which side that is
/// follows from where the middle joint lies relative to the base, so
/// mirrored hands work too.
pub fn is_bent(hand: &HandLandmarkSet, finger: Finger) -> bool {
    let (base, middle, tip) = finger.joints();
    let (base, middle, tip) = (hand.joint(base), hand.joint(middle), hand.joint(tip));

    match finger {
        Finger::Thumb => {
            if base.x < middle.x {
                tip.x < base.x
            } else {
                tip.x > base.x
            }
        }
        _ => tip.y > middle.y,
    }
}

/// Global key for a finger: the left hand covers keys 0-4 from pinky to thumb,
/// the right hand keys 5-9 from thumb to pinky.
pub fn key_for(hand: Handedness, finger: Finger) -> usize {
    match (hand, finger) {
        (Handedness::Left, Finger::Pinky) => 0,
        (Handedness::Left, Finger::Ring) => 1,
        (Handedness::Left, Finger::Middle) => 2,
        (Handedness::Left, Finger::Index) => 3,
        (Handedness::Left, Finger::Thumb) => 4,
        (Handedness::Right, Finger::Thumb) => 5,
        (Handedness::Right, Finger::Index) => 6,
        (Handedness::Right, Finger::Middle) => 7,
        (Handedness::Right, Finger::Ring) => 8,
        (Handedness::Right, Finger::Pinky) => 9,
    }
}

/// Keys of every bent finger across all hands
pub fn bent_keys(hands: &[HandLandmarkSet]) -> ActiveKeys {
    hands
        .iter()
        .flat_map(|hand| {
            Finger::ALL
                .into_iter()
                .filter(|&finger| is_bent(hand, finger))
                .map(|finger| key_for(hand.handedness, finger))
        })
        .collect()
}

/// Drives the keyboard from hand landmarks instead of pixels
pub struct LandmarkDetector {
    estimator: Box<dyn HandPoseEstimator>,
}

impl LandmarkDetector {
    pub fn new(estimator: Box<dyn HandPoseEstimator>) -> Self {
        Self { estimator }
    }
}

impl ActivationDetector for LandmarkDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<ActiveKeys>> {
        let _span = tracing::debug_span!("landmarks").entered();

        let hands = self
            .estimator
            .process(&frame.image)
            .context("Hand-pose estimation failed")?;

        let active = bent_keys(&hands);
        tracing::debug!("{} hands, bent keys {:?}", hands.len(), active);
        Ok(Some(active))
    }

    fn name(&self) -> &'static str {
        "landmarks"
    }
}
