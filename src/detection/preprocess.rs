use super::regions::KeyLayout;
use image::{imageops, GrayImage, RgbImage};
use std::borrow::Cow;

/// Turns captured frames into the images each detector stage consumes
pub struct Preprocessor {
    capture_strip: (u32, u32),
    analysis_strip: (u32, u32),
    display_size: (u32, u32),
    kernel_size: u32,
    sigma: f32,
}

impl Preprocessor {
    pub fn new(layout: &KeyLayout, kernel_fraction: f32) -> Self {
        let capture_strip = (
            layout.capture_size.0,
            layout.capture.first().map(|r| r.y1 + 1).unwrap_or(0),
        );
        let analysis_strip = layout.labels.dimensions();
        let kernel_size = kernel_size(kernel_fraction, analysis_strip.0);

        Self {
            capture_strip,
            analysis_strip,
            display_size: layout.display_size,
            kernel_size,
            sigma: gaussian_sigma(kernel_size),
        }
    }

    pub fn kernel_size(&self) -> u32 {
        self.kernel_size
    }

    /// Prepare the key strip for motion analysis
    ///
    /// Steps:
    /// 1. Crop the key strip out of the captured frame
    /// 2. Resize to analysis resolution
    /// 3. Convert to grayscale
    /// 4. Gaussian blur to suppress sensor noise
    pub fn analysis_strip(&self, frame: &RgbImage) -> GrayImage {
        let _span = tracing::debug_span!("preprocess").entered();

        let (strip_width, strip_height) = self.capture_strip;
        let strip = imageops::crop_imm(frame, 0, 0, strip_width, strip_height).to_image();

        let strip = if strip.dimensions() != self.analysis_strip {
            imageops::resize(
                &strip,
                self.analysis_strip.0,
                self.analysis_strip.1,
                imageops::FilterType::Triangle,
            )
        } else {
            strip
        };

        let gray = imageops::grayscale(&strip);
        if self.kernel_size > 1 {
            imageops::blur(&gray, self.sigma)
        } else {
            gray
        }
    }

    /// The frame at display resolution, borrowed when no resize is needed
    pub fn display_frame<'a>(&self, frame: &'a RgbImage) -> Cow<'a, RgbImage> {
        if frame.dimensions() == self.display_size {
            Cow::Borrowed(frame)
        } else {
            Cow::Owned(imageops::resize(
                frame,
                self.display_size.0,
                self.display_size.1,
                imageops::FilterType::Triangle,
            ))
        }
    }
}

/// Odd kernel size proportional to the analysis width
fn kernel_size(fraction: f32, width: u32) -> u32 {
    2 * (fraction * width as f32 / 2.0) as u32 + 1
}

/// Sigma a Gaussian of the given kernel size gets when none is specified
fn gaussian_sigma(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}
