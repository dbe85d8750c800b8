use anyhow::Result;
use image::RgbImage;

/// Hand landmark indices (MediaPipe hand landmark model convention)
#[allow(dead_code)]
pub mod joints {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_FINGER_MCP: usize = 5;
    pub const INDEX_FINGER_PIP: usize = 6;
    pub const INDEX_FINGER_DIP: usize = 7;
    pub const INDEX_FINGER_TIP: usize = 8;
    pub const MIDDLE_FINGER_MCP: usize = 9;
    pub const MIDDLE_FINGER_PIP: usize = 10;
    pub const MIDDLE_FINGER_DIP: usize = 11;
    pub const MIDDLE_FINGER_TIP: usize = 12;
    pub const RING_FINGER_MCP: usize = 13;
    pub const RING_FINGER_PIP: usize = 14;
    pub const RING_FINGER_DIP: usize = 15;
    pub const RING_FINGER_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;

    pub const COUNT: usize = 21;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

/// Joint position normalized to the image: x grows right, y grows down
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One detected hand for one frame
#[derive(Clone, Debug)]
pub struct HandLandmarkSet {
    pub handedness: Handedness,
    pub landmarks: [Landmark; joints::COUNT],
}

impl HandLandmarkSet {
    pub fn joint(&self, index: usize) -> Landmark {
        self.landmarks[index]
    }
}

/// Trait for hand-pose estimators
pub trait HandPoseEstimator {
    /// Find the hands in a frame
    ///
    /// Zero hands is a normal result, not an error.
    fn process(&mut self, frame: &RgbImage) -> Result<Vec<HandLandmarkSet>>;
}
