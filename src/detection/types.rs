use crate::capture::Frame;
use anyhow::Result;
use std::collections::BTreeSet;

/// Key indices judged pressed in one frame
pub type ActiveKeys = BTreeSet<usize>;

/// Trait for activation detectors
/// Motion+skin and hand-landmark geometry are interchangeable behind it;
/// one is chosen when the pipeline is built and kept for the session.
pub trait ActivationDetector {
    /// Process a frame and return the keys pressed in it
    ///
    /// # Returns
    /// * `None` while the detector is calibrating and has no opinion yet
    fn detect(&mut self, frame: &Frame) -> Result<Option<ActiveKeys>>;

    /// Reset internal state
    ///
    /// Call this when:
    /// - Switching cameras
    /// - The scene changed completely
    fn reset_state(&mut self) {
        // Default implementation: no-op for stateless detectors
    }

    /// Short name for logs
    fn name(&self) -> &'static str;
}
