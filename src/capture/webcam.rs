use super::{Frame, FrameSource};
use anyhow::{Context, Result};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;
use std::time::Instant;

pub struct WebcamCapture {
    camera: Camera,
    started: Instant,
    width: u32,
    height: u32,
}

impl WebcamCapture {
    pub fn new(device_index: u32, width: u32, height: u32) -> Result<Self> {
        tracing::info!(
            "Initializing webcam {} at {}x{}",
            device_index,
            width,
            height
        );

        let index = CameraIndex::Index(device_index);
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::HighestResolution(
            Resolution::new(width, height),
        ));

        let mut camera = Camera::new(index, requested).context("Failed to open camera")?;

        camera
            .open_stream()
            .context("Failed to open camera stream")?;

        // The driver may settle on a different mode than requested
        let actual = camera.resolution();
        tracing::info!(
            "Webcam streaming at {}x{}",
            actual.width(),
            actual.height()
        );

        Ok(Self {
            camera,
            started: Instant::now(),
            width: actual.width(),
            height: actual.height(),
        })
    }
}

impl FrameSource for WebcamCapture {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let buffer = self.camera.frame().context("Failed to capture frame")?;
        let timestamp = self.started.elapsed();

        let decoded = buffer
            .decode_image::<RgbFormat>()
            .context("Failed to decode frame")?;

        Ok(Some(Frame::new(decoded, timestamp)))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for WebcamCapture {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            tracing::warn!("Failed to stop camera stream: {}", e);
        }
    }
}
