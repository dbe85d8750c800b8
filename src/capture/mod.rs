mod sequence;
#[cfg(feature = "webcam")]
mod webcam;

pub use sequence::ImageSequence;
#[cfg(feature = "webcam")]
pub use webcam::WebcamCapture;

use anyhow::Result;
use image::RgbImage;
use std::time::Duration;

/// One captured time step
#[derive(Clone, Debug)]
pub struct Frame {
    pub image: RgbImage,
    /// Time since the source started producing frames
    pub timestamp: Duration,
}

impl Frame {
    pub fn new(image: RgbImage, timestamp: Duration) -> Self {
        Self { image, timestamp }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Trait for frame sources
pub trait FrameSource {
    /// Produce the next frame, or `None` once the stream has ended
    ///
    /// An `Err` means acquisition failed; the pipeline treats it as fatal.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Get the resolution of produced frames
    fn resolution(&self) -> (u32, u32);
}
