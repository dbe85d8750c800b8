use crate::detection::ActiveKeys;
use std::collections::VecDeque;

/// Majority vote over the last `window` frames.
///
/// A key is reported active when it was detected in more than half of the
/// window. A window of one passes detections through unchanged.
pub struct Debouncer {
    window: usize,
    history: VecDeque<ActiveKeys>,
    counts: Vec<usize>,
}

impl Debouncer {
    pub fn new(window: usize, num_keys: usize) -> Self {
        Self {
            window: window.max(1),
            history: VecDeque::with_capacity(window.max(1)),
            counts: vec![0; num_keys],
        }
    }

    pub fn filter(&mut self, detected: ActiveKeys) -> ActiveKeys {
        if self.window == 1 {
            return detected;
        }

        for &key in &detected {
            if let Some(count) = self.counts.get_mut(key) {
                *count += 1;
            }
        }
        self.history.push_back(detected);

        if self.history.len() > self.window {
            if let Some(expired) = self.history.pop_front() {
                for key in expired {
                    if let Some(count) = self.counts.get_mut(key) {
                        *count -= 1;
                    }
                }
            }
        }

        self.counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count * 2 > self.window)
            .map(|(key, _)| key)
            .collect()
    }

    /// Forget the window, e.g. when the detector starts a new background
    pub fn reset(&mut self) {
        self.history.clear();
        self.counts.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &[usize]) -> ActiveKeys {
        list.iter().copied().collect()
    }

    #[test]
    fn window_of_one_is_transparent() {
        let mut debouncer = Debouncer::new(1, 4);
        assert_eq!(debouncer.filter(keys(&[2])), keys(&[2]));
        assert_eq!(debouncer.filter(keys(&[])), keys(&[]));
    }

    #[test]
    fn single_frame_flicker_is_suppressed() {
        let mut debouncer = Debouncer::new(3, 4);
        assert_eq!(debouncer.filter(keys(&[1])), keys(&[]));
        assert_eq!(debouncer.filter(keys(&[])), keys(&[]));
        assert_eq!(debouncer.filter(keys(&[])), keys(&[]));
    }

    #[test]
    fn sustained_press_turns_on_then_off() {
        let mut debouncer = Debouncer::new(3, 4);
        assert_eq!(debouncer.filter(keys(&[1])), keys(&[]));
        assert_eq!(debouncer.filter(keys(&[1])), keys(&[1]));
        assert_eq!(debouncer.filter(keys(&[])), keys(&[1]));
        assert_eq!(debouncer.filter(keys(&[])), keys(&[]));
    }

    #[test]
    fn reset_forgets_the_window() {
        let mut debouncer = Debouncer::new(3, 4);
        debouncer.filter(keys(&[2]));
        assert_eq!(debouncer.filter(keys(&[2])), keys(&[2]));

        debouncer.reset();
        assert_eq!(debouncer.filter(keys(&[])), keys(&[]));
        assert_eq!(debouncer.filter(keys(&[2])), keys(&[]));
    }
}
