use super::NoteSink;
use crate::keyboard::{NoteName, PitchMap};

/// Logs every note through `tracing` instead of playing it
pub struct LogSink {
    pitches: PitchMap,
}

impl LogSink {
    pub fn new(pitches: PitchMap) -> Self {
        tracing::info!("Logging notes instead of playing them");
        Self { pitches }
    }

    fn describe(&self, key: usize) -> String {
        match self.pitches.pitch(key) {
            Some(pitch) => format!("key {} ({})", key, NoteName(pitch)),
            None => format!("key {}", key),
        }
    }
}

impl NoteSink for LogSink {
    fn note_on(&mut self, key: usize) {
        tracing::info!("note on  {}", self.describe(key));
    }

    fn note_off(&mut self, key: usize) {
        tracing::info!("note off {}", self.describe(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_keys_by_pitch() {
        let sink = LogSink::new(PitchMap::new(vec![60, 64]));
        assert_eq!(sink.describe(1), "key 1 (E4)");
        assert_eq!(sink.describe(5), "key 5");
    }
}
