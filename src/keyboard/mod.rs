//! Per-key sounding state and the note events it produces.

mod debounce;
mod state;

pub use debounce::Debouncer;
pub use state::KeyStateMachine;

use std::fmt;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteAction {
    On,
    Off,
}

/// A key starting or stopping to sound
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteEvent {
    pub key: usize,
    pub action: NoteAction,
    pub timestamp: Duration,
}

impl NoteEvent {
    pub fn on(key: usize, timestamp: Duration) -> Self {
        Self {
            key,
            action: NoteAction::On,
            timestamp,
        }
    }

    pub fn off(key: usize, timestamp: Duration) -> Self {
        Self {
            key,
            action: NoteAction::Off,
            timestamp,
        }
    }
}

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Key index → MIDI pitch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PitchMap {
    notes: Vec<u8>,
}

impl PitchMap {
    pub fn new(notes: Vec<u8>) -> Self {
        Self { notes }
    }

    pub fn pitch(&self, key: usize) -> Option<u8> {
        self.notes.get(key).copied()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Scientific pitch name of a MIDI note, e.g. `C4` for 60
pub struct NoteName(pub u8);

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let octave = self.0 as i32 / 12 - 1;
        write!(f, "{}{}", NOTE_NAMES[self.0 as usize % 12], octave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_names() {
        assert_eq!(NoteName(60).to_string(), "C4");
        assert_eq!(NoteName(61).to_string(), "C#4");
        assert_eq!(NoteName(76).to_string(), "E5");
        assert_eq!(NoteName(0).to_string(), "C-1");
    }

    #[test]
    fn pitch_lookup() {
        let map = PitchMap::new(vec![60, 62]);
        assert_eq!(map.pitch(1), Some(62));
        assert_eq!(map.pitch(2), None);
        assert_eq!(map.len(), 2);
    }
}
