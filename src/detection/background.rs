use super::motion::exceeds;
use image::GrayImage;
use std::time::Duration;

/// Rolling reference frame that motion is measured against.
///
/// Two slots: the *candidate* tracks a recent still scene and the *active*
/// frame is what motion is compared to. The active frame is forcibly replaced
/// every `reset_time`, whether or not a hand is in view; a hand captured this
/// way reads as "no motion" for its key until the next reset.
pub struct BackgroundCalibrator {
    candidate: Option<GrayImage>,
    active: Option<GrayImage>,
    last_check: Duration,
    candidate_set: Duration,
    save_check_time: Duration,
    reset_time: Duration,
    threshold: u8,
    recalibrate: bool,
}

impl BackgroundCalibrator {
    pub fn new(
        save_check_time: Duration,
        reset_time: Duration,
        threshold: u8,
        recalibrate: bool,
    ) -> Self {
        Self {
            candidate: None,
            active: None,
            last_check: Duration::ZERO,
            candidate_set: Duration::ZERO,
            save_check_time,
            reset_time,
            threshold,
            recalibrate,
        }
    }

    /// Feed the blurred analysis strip for time `t`.
    ///
    /// Returns the reference to compare `cur` against, or `None` when this
    /// frame only initialised the background.
    pub fn update(&mut self, cur: &GrayImage, t: Duration) -> Option<&GrayImage> {
        if self.recalibrate {
            self.refresh(cur, t);
        }

        if self.active.is_none() {
            tracing::debug!("Background initialised at {:.3}s", t.as_secs_f64());
            self.active = Some(cur.clone());
            return None;
        }
        self.active.as_ref()
    }

    fn refresh(&mut self, cur: &GrayImage, t: Duration) {
        let Some(candidate) = &self.candidate else {
            self.candidate = Some(cur.clone());
            self.candidate_set = t;
            self.last_check = t;
            return;
        };

        let mut stale = false;
        if t.saturating_sub(self.last_check) >= self.save_check_time {
            stale = differs(candidate, cur, self.threshold);
            self.last_check = t;
        }

        if t.saturating_sub(self.candidate_set) >= self.reset_time {
            tracing::debug!("Forced background reset at {:.3}s", t.as_secs_f64());
            self.active = Some(cur.clone());
            stale = true;
        }

        if stale {
            self.candidate = Some(cur.clone());
            self.candidate_set = t;
        }
    }

    /// Forget both slots, e.g. after the frame geometry changed
    pub fn reset(&mut self) {
        self.candidate = None;
        self.active = None;
        self.last_check = Duration::ZERO;
        self.candidate_set = Duration::ZERO;
    }

    #[cfg(test)]
    pub fn candidate(&self) -> Option<&GrayImage> {
        self.candidate.as_ref()
    }

    #[cfg(test)]
    pub fn active(&self) -> Option<&GrayImage> {
        self.active.as_ref()
    }
}

fn differs(a: &GrayImage, b: &GrayImage, threshold: u8) -> bool {
    a.as_raw()
        .iter()
        .zip(b.as_raw())
        .any(|(&p, &q)| exceeds(p, q, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    const CHECK: Duration = Duration::from_secs(1);
    const RESET: Duration = Duration::from_secs(5);

    fn flat(value: u8) -> GrayImage {
        GrayImage::from_pixel(4, 2, Luma([value]))
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn calibrator() -> BackgroundCalibrator {
        BackgroundCalibrator::new(CHECK, RESET, 25, true)
    }

    #[test]
    fn first_frame_fills_both_slots_and_yields_nothing() {
        let mut cal = calibrator();
        assert!(cal.update(&flat(10), secs(0.0)).is_none());
        assert_eq!(cal.candidate(), Some(&flat(10)));
        assert_eq!(cal.active(), Some(&flat(10)));
    }

    #[test]
    fn second_frame_compares_against_first() {
        let mut cal = calibrator();
        cal.update(&flat(10), secs(0.0));
        assert_eq!(cal.update(&flat(200), secs(0.1)), Some(&flat(10)));
    }

    #[test]
    fn changed_scene_refreshes_candidate_only_after_check_interval() {
        let mut cal = calibrator();
        cal.update(&flat(10), secs(0.0));

        cal.update(&flat(100), secs(0.5));
        assert_eq!(cal.candidate(), Some(&flat(10)));

        cal.update(&flat(100), secs(1.0));
        assert_eq!(cal.candidate(), Some(&flat(100)));
        assert_eq!(cal.active(), Some(&flat(10)));
    }

    #[test]
    fn small_changes_keep_candidate() {
        let mut cal = calibrator();
        cal.update(&flat(10), secs(0.0));
        cal.update(&flat(30), secs(1.0));
        assert_eq!(cal.candidate(), Some(&flat(10)));
    }

    #[test]
    fn forced_reset_replaces_active_frame() {
        let mut cal = calibrator();
        cal.update(&flat(10), secs(0.0));
        cal.update(&flat(12), secs(4.9));
        assert_eq!(cal.active(), Some(&flat(10)));

        assert_eq!(cal.update(&flat(15), secs(5.0)), Some(&flat(15)));
        assert_eq!(cal.candidate(), Some(&flat(15)));
    }

    #[test]
    fn reset_can_capture_a_held_hand() {
        let mut cal = calibrator();
        cal.update(&flat(10), secs(0.0));
        // a hand (bright) sits in view when the reset lands
        assert_eq!(cal.update(&flat(220), secs(5.0)), Some(&flat(220)));
        assert_eq!(cal.update(&flat(220), secs(5.1)), Some(&flat(220)));
    }

    #[test]
    fn frozen_background_never_changes() {
        let mut cal = BackgroundCalibrator::new(CHECK, RESET, 25, false);
        assert!(cal.update(&flat(10), secs(0.0)).is_none());
        cal.update(&flat(200), secs(6.0));
        cal.update(&flat(200), secs(12.0));
        assert_eq!(cal.active(), Some(&flat(10)));
        assert!(cal.candidate().is_none());
    }

    #[test]
    fn reset_returns_to_calibration() {
        let mut cal = calibrator();
        cal.update(&flat(10), secs(0.0));
        cal.reset();
        assert!(cal.update(&flat(50), secs(0.2)).is_none());
        assert_eq!(cal.active(), Some(&flat(50)));
    }
}
