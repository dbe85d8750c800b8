use crate::capture::Frame;
use crate::config::PipelineConfig;
use crate::detection::ActivationDetector;
use crate::error::ConfigError;
use crate::keyboard::{Debouncer, KeyStateMachine, NoteEvent};
use anyhow::Result;
use image::imageops;
use std::time::Duration;

/// Frame-synchronous detection core: frame in, note edges out.
///
/// Owns the detector (and through it the background), the optional debounce
/// window and the per-key sounding flags. Nothing here blocks.
pub struct Pipeline {
    detector: Box<dyn ActivationDetector>,
    debouncer: Debouncer,
    keys: KeyStateMachine,
    flip: bool,
    last_timestamp: Duration,
}

impl Pipeline {
    pub fn new(
        config: &PipelineConfig,
        detector: Box<dyn ActivationDetector>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        tracing::info!(
            "Pipeline: {} keys, detector={}, debounce={} frames, flip={}",
            config.num_keys,
            detector.name(),
            config.debounce_frames,
            config.flip
        );

        Ok(Self {
            detector,
            debouncer: Debouncer::new(config.debounce_frames, config.num_keys),
            keys: KeyStateMachine::new(config.num_keys),
            flip: config.flip,
            last_timestamp: Duration::ZERO,
        })
    }

    /// Process one frame and return the note transitions it caused
    pub fn step(&mut self, mut frame: Frame) -> Result<Vec<NoteEvent>> {
        self.last_timestamp = frame.timestamp;
        if self.flip {
            imageops::flip_horizontal_in_place(&mut frame.image);
        }

        let _span = tracing::debug_span!("detect").entered();
        let Some(detected) = self.detector.detect(&frame)? else {
            // a calibration frame starts a new background, older votes no longer apply
            self.debouncer.reset();
            return Ok(Vec::new());
        };

        let active = self.debouncer.filter(detected);
        Ok(self.keys.update(&active, frame.timestamp))
    }

    /// Note-off for every key still sounding; later calls return nothing
    pub fn shutdown(&mut self) -> Vec<NoteEvent> {
        let released = self.keys.shutdown(self.last_timestamp);
        if !released.is_empty() {
            tracing::info!("Releasing {} sounding keys", released.len());
        }
        released
    }

    /// Drop the learned background and release every sounding key
    pub fn recalibrate(&mut self) -> Vec<NoteEvent> {
        self.detector.reset_state();
        self.debouncer.reset();
        self.keys.shutdown(self.last_timestamp)
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }
}
