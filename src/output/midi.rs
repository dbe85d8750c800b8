//! MIDI output with its own writer thread.
//!
//! Notes go through a bounded queue so a slow device never stalls the frame
//! loop; when the queue is full the event is dropped with a warning.

use super::NoteSink;
use crate::keyboard::{NoteName, PitchMap};
use anyhow::{anyhow, Result};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};

const QUEUE_CAPACITY: usize = 64;

enum MidiCommand {
    NoteOn(u8),
    NoteOff(u8),
    Quit,
}

/// Raw bytes for a note message on `channel`
fn encode(command: &MidiCommand, channel: u8, velocity: u8) -> Option<[u8; 3]> {
    match *command {
        MidiCommand::NoteOn(pitch) => Some([0x90 | (channel & 0x0F), pitch, velocity]),
        MidiCommand::NoteOff(pitch) => Some([0x80 | (channel & 0x0F), pitch, 0]),
        MidiCommand::Quit => None,
    }
}

pub struct MidiSink {
    pitches: PitchMap,
    tx: SyncSender<MidiCommand>,
    worker: Option<JoinHandle<()>>,
}

impl MidiSink {
    /// Connect to the first output port whose name contains `port_hint`, or
    /// to a software synth / the first port when no hint is given.
    pub fn new(
        pitches: PitchMap,
        port_hint: Option<&str>,
        channel: u8,
        velocity: u8,
    ) -> Result<Self> {
        let midi_out = midir::MidiOutput::new("air-keys")
            .map_err(|e| anyhow!("Failed to initialise MIDI: {}", e))?;

        let ports = midi_out.ports();
        if ports.is_empty() {
            return Err(anyhow!(
                "No MIDI output ports found; start a synthesiser such as `fluidsynth` or `timidity -iA`"
            ));
        }

        let names: Vec<String> = ports
            .iter()
            .map(|p| midi_out.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
            .collect();
        let wanted = |name: &str| {
            let name = name.to_lowercase();
            match port_hint {
                Some(hint) => name.contains(&hint.to_lowercase()),
                None => ["fluid", "timidity", "microsoft", "synth"]
                    .iter()
                    .any(|s| name.contains(s)),
            }
        };
        let port_idx = match names.iter().position(|n| wanted(n)) {
            Some(idx) => idx,
            None if port_hint.is_some() => {
                return Err(anyhow!(
                    "No MIDI port matches {:?}; available: {:?}",
                    port_hint,
                    names
                ));
            }
            None => 0,
        };

        tracing::info!("Opening MIDI port: {}", names[port_idx]);
        let mut conn = midi_out
            .connect(&ports[port_idx], "air-keys-out")
            .map_err(|e| anyhow!("Failed to connect to {}: {}", names[port_idx], e))?;

        let (tx, rx): (SyncSender<MidiCommand>, Receiver<MidiCommand>) =
            mpsc::sync_channel(QUEUE_CAPACITY);
        let worker = thread::Builder::new()
            .name("midi-out".to_string())
            .spawn(move || {
                for command in rx {
                    let Some(bytes) = encode(&command, channel, velocity) else {
                        break;
                    };
                    if let Err(e) = conn.send(&bytes) {
                        tracing::warn!("MIDI send failed: {}", e);
                    }
                }
                let _ = conn.close();
            })?;

        Ok(Self {
            pitches,
            tx,
            worker: Some(worker),
        })
    }

    fn enqueue(&self, key: usize, command: impl FnOnce(u8) -> MidiCommand) {
        let Some(pitch) = self.pitches.pitch(key) else {
            tracing::warn!("No pitch mapped for key {}", key);
            return;
        };
        match self.tx.try_send(command(pitch)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!("MIDI queue full, dropped {}", NoteName(pitch));
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!("MIDI writer stopped, dropped {}", NoteName(pitch));
            }
        }
    }
}

impl NoteSink for MidiSink {
    fn note_on(&mut self, key: usize) {
        self.enqueue(key, MidiCommand::NoteOn);
    }

    fn note_off(&mut self, key: usize) {
        self.enqueue(key, MidiCommand::NoteOff);
    }
}

impl Drop for MidiSink {
    fn drop(&mut self) {
        // blocking send: pending note-offs must reach the device first
        let _ = self.tx.send(MidiCommand::Quit);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("MIDI writer thread panicked");
            }
        }
    }
}
