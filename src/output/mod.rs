mod log;
#[cfg(feature = "midi")]
mod midi;

pub use log::LogSink;
#[cfg(feature = "midi")]
pub use midi::MidiSink;

use crate::keyboard::{NoteAction, NoteEvent};

/// Trait for note destinations
///
/// Calls are fire-and-forget: a sink that can block must queue internally
/// rather than stall the frame loop. The pipeline never sends the same
/// transition twice in a row for a key.
pub trait NoteSink {
    /// Start sounding `key`
    fn note_on(&mut self, key: usize);

    /// Stop sounding `key`
    fn note_off(&mut self, key: usize);

    /// Forward one event
    fn dispatch(&mut self, event: &NoteEvent) {
        match event.action {
            NoteAction::On => self.note_on(event.key),
            NoteAction::Off => self.note_off(event.key),
        }
    }
}
