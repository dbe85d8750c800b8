use crate::error::ConfigError;
use std::time::Duration;

/// Which activation detector drives the keyboard for the whole session
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Background subtraction plus skin-colour check per key strip
    Motion,
    /// Finger bend classification from hand landmarks
    Landmarks,
}

/// Static per-session parameters, consumed when the pipeline is built
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub num_keys: usize,
    /// MIDI pitch for each key index
    pub notes: Vec<u8>,
    /// Height of the key strip as a fraction of the frame height
    pub key_height: f32,
    /// Absolute grayscale difference a pixel must exceed to count as motion
    pub motion_threshold: u8,
    /// Fraction of skin-coloured pixels a strip must exceed
    pub skin_fraction: f32,
    /// Gaussian kernel size as a fraction of the analysis width
    pub kernel_fraction: f32,
    pub save_check_time: Duration,
    pub reset_time: Duration,
    /// When false the first frame stays the background for the whole session
    pub recalibrate: bool,
    pub flip: bool,
    /// Width frames are scaled to before motion analysis; `None` keeps capture width
    pub analysis_width: Option<u32>,
    /// Width of the image the skin filter inspects; `None` keeps capture width
    pub display_width: Option<u32>,
    pub debounce_frames: usize,
    pub strategy: Strategy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_keys: 10,
            notes: vec![60, 62, 64, 65, 67, 69, 71, 72, 74, 76],
            key_height: 0.25,
            motion_threshold: 25,
            skin_fraction: 0.02,
            kernel_fraction: 0.02,
            save_check_time: Duration::from_secs(1),
            reset_time: Duration::from_secs(5),
            recalibrate: true,
            flip: true,
            analysis_width: None,
            display_width: None,
            debounce_frames: 1,
            strategy: Strategy::Motion,
        }
    }
}

impl PipelineConfig {
    /// Check everything that does not depend on the frame geometry
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_keys == 0 {
            return Err(ConfigError::NoKeys);
        }
        if self.notes.len() < self.num_keys {
            return Err(ConfigError::ShortPitchMap {
                notes: self.notes.len(),
                num_keys: self.num_keys,
            });
        }
        if !(self.key_height > 0.0 && self.key_height <= 1.0) {
            return Err(ConfigError::EmptyStrip(self.key_height));
        }
        if !(0.0..=1.0).contains(&self.skin_fraction) {
            return Err(ConfigError::SkinFraction(self.skin_fraction));
        }
        if !(0.0..=1.0).contains(&self.kernel_fraction) {
            return Err(ConfigError::KernelFraction(self.kernel_fraction));
        }
        for (name, value) in [
            ("save check time", self.save_check_time),
            ("reset time", self.reset_time),
        ] {
            if value.is_zero() {
                return Err(ConfigError::NonPositive {
                    name,
                    value: value.as_secs_f64(),
                });
            }
        }
        for (name, value) in [
            ("analysis width", self.analysis_width),
            ("display width", self.display_width),
        ] {
            if value == Some(0) {
                return Err(ConfigError::NonPositive { name, value: 0.0 });
            }
        }
        if self.debounce_frames == 0 {
            return Err(ConfigError::EmptyDebounceWindow);
        }
        if self.strategy == Strategy::Landmarks && self.num_keys < 10 {
            return Err(ConfigError::TooFewKeysForHands(self.num_keys));
        }
        Ok(())
    }
}
