use super::background::BackgroundCalibrator;
use super::motion::MotionDetector;
use super::preprocess::Preprocessor;
use super::regions::KeyLayout;
use super::skin::SkinFilter;
use super::types::{ActivationDetector, ActiveKeys};
use crate::capture::Frame;
use crate::config::PipelineConfig;
use crate::error::ConfigError;
use anyhow::Result;
use image::GenericImageView;

/// Background subtraction plus skin check.
///
/// A key is pressed when its analysis strip moved against the background
/// and its display strip holds enough skin-coloured pixels.
pub struct MotionSkinDetector {
    config: PipelineConfig,
    layout: KeyLayout,
    preprocessor: Preprocessor,
    calibrator: BackgroundCalibrator,
    motion: MotionDetector,
    skin: SkinFilter,
}

impl MotionSkinDetector {
    pub fn new(capture_size: (u32, u32), config: &PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let layout = KeyLayout::new(capture_size, config)?;
        let preprocessor = Preprocessor::new(&layout, config.kernel_fraction);

        tracing::info!(
            "Motion detector: {} keys, strip {:?}, blur kernel {}",
            layout.num_keys(),
            layout.labels.dimensions(),
            preprocessor.kernel_size()
        );

        Ok(Self {
            config: config.clone(),
            layout,
            preprocessor,
            calibrator: BackgroundCalibrator::new(
                config.save_check_time,
                config.reset_time,
                config.motion_threshold,
                config.recalibrate,
            ),
            motion: MotionDetector::new(config.motion_threshold),
            skin: SkinFilter::new(config.skin_fraction),
        })
    }

    #[cfg(test)]
    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    /// Re-partition for a new capture size and start calibrating again
    fn relayout(&mut self, capture_size: (u32, u32)) -> Result<(), ConfigError> {
        tracing::info!(
            "Frame size changed from {:?} to {:?}, re-partitioning keys",
            self.layout.capture_size,
            capture_size
        );
        self.layout = KeyLayout::new(capture_size, &self.config)?;
        self.preprocessor = Preprocessor::new(&self.layout, self.config.kernel_fraction);
        self.calibrator.reset();
        Ok(())
    }
}

impl ActivationDetector for MotionSkinDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<ActiveKeys>> {
        let _span = tracing::debug_span!("motion_skin").entered();

        if frame.dimensions() != self.layout.capture_size {
            self.relayout(frame.dimensions())?;
        }

        let strip = self.preprocessor.analysis_strip(&frame.image);
        let Some(reference) = self.calibrator.update(&strip, frame.timestamp) else {
            return Ok(None);
        };

        let num_keys = self.layout.num_keys();
        let moved = self
            .motion
            .detect(&self.layout.labels, reference, &strip, num_keys)?;

        let mut active = ActiveKeys::new();
        if !moved.contains(&true) {
            return Ok(Some(active));
        }

        let display = self.preprocessor.display_frame(&frame.image);
        for rect in &self.layout.display {
            if !moved[rect.index] {
                continue;
            }
            let region = display.view(rect.x0, rect.y0, rect.width(), rect.height());
            if self.skin.is_plausible(&*region) {
                active.insert(rect.index);
            } else {
                tracing::debug!("Key {} moved without skin, ignored", rect.index);
            }
        }

        Ok(Some(active))
    }

    fn reset_state(&mut self) {
        tracing::info!("Resetting background");
        self.calibrator.reset();
    }

    fn name(&self) -> &'static str {
        "motion+skin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::time::Duration;

    const WALL: Rgb<u8> = Rgb([40, 60, 200]);
    const SKIN: Rgb<u8> = Rgb([224, 172, 105]);
    const PAPER: Rgb<u8> = Rgb([255, 255, 255]);

    fn config() -> PipelineConfig {
        PipelineConfig {
            num_keys: 4,
            notes: vec![60, 62, 64, 65],
            key_height: 0.5,
            kernel_fraction: 0.0,
            ..Default::default()
        }
    }

    fn frame_with_patch(x0: u32, colour: Rgb<u8>, millis: u64) -> Frame {
        let mut img = RgbImage::from_pixel(40, 40, WALL);
        for y in 0..10 {
            for x in x0..x0 + 10 {
                img.put_pixel(x, y, colour);
            }
        }
        Frame::new(img, Duration::from_millis(millis))
    }

    fn empty_frame(millis: u64) -> Frame {
        Frame::new(RgbImage::from_pixel(40, 40, WALL), Duration::from_millis(millis))
    }

    #[test]
    fn unbounded_blur_kernel_is_refused() {
        let config = PipelineConfig {
            kernel_fraction: f32::INFINITY,
            ..config()
        };
        assert_eq!(
            MotionSkinDetector::new((40, 40), &config).err(),
            Some(ConfigError::KernelFraction(f32::INFINITY))
        );
    }

    #[test]
    fn first_frame_only_calibrates() {
        let mut detector = MotionSkinDetector::new((40, 40), &config()).unwrap();
        assert_eq!(detector.detect(&empty_frame(0)).unwrap(), None);
        assert_eq!(
            detector.detect(&empty_frame(33)).unwrap(),
            Some(ActiveKeys::new())
        );
    }

    #[test]
    fn finger_over_key_activates_it() {
        let mut detector = MotionSkinDetector::new((40, 40), &config()).unwrap();
        detector.detect(&empty_frame(0)).unwrap();

        let active = detector.detect(&frame_with_patch(20, SKIN, 33)).unwrap();
        assert_eq!(active, Some(ActiveKeys::from([2])));
    }

    #[test]
    fn motion_without_skin_is_ignored() {
        let mut detector = MotionSkinDetector::new((40, 40), &config()).unwrap();
        detector.detect(&empty_frame(0)).unwrap();

        let active = detector.detect(&frame_with_patch(10, PAPER, 33)).unwrap();
        assert_eq!(active, Some(ActiveKeys::new()));
    }

    #[test]
    fn below_the_strip_is_ignored() {
        let mut detector = MotionSkinDetector::new((40, 40), &config()).unwrap();
        detector.detect(&empty_frame(0)).unwrap();

        let mut img = RgbImage::from_pixel(40, 40, WALL);
        for y in 25..35 {
            for x in 0..10 {
                img.put_pixel(x, y, SKIN);
            }
        }
        let active = detector
            .detect(&Frame::new(img, Duration::from_millis(33)))
            .unwrap();
        assert_eq!(active, Some(ActiveKeys::new()));
    }

    #[test]
    fn new_geometry_recalibrates() {
        let mut detector = MotionSkinDetector::new((40, 40), &config()).unwrap();
        detector.detect(&empty_frame(0)).unwrap();

        let bigger = Frame::new(RgbImage::from_pixel(80, 60, WALL), Duration::from_millis(33));
        assert_eq!(detector.detect(&bigger).unwrap(), None);
        assert_eq!(detector.layout().capture_size, (80, 60));
    }
}
