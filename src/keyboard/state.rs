use super::NoteEvent;
use crate::detection::ActiveKeys;
use std::time::Duration;

/// One "sounding" flag per key; emits exactly one event per edge.
///
/// There is no hysteresis: a single frame's detection flips the state.
pub struct KeyStateMachine {
    sounding: Vec<bool>,
}

impl KeyStateMachine {
    pub fn new(num_keys: usize) -> Self {
        Self {
            sounding: vec![false; num_keys],
        }
    }

    /// Apply this frame's active set and return the edges it caused
    pub fn update(&mut self, active: &ActiveKeys, timestamp: Duration) -> Vec<NoteEvent> {
        if let Some(&stray) = active.range(self.sounding.len()..).next() {
            tracing::warn!("Ignoring active key {} outside the keyboard", stray);
        }

        let mut events = Vec::new();
        for (key, sounding) in self.sounding.iter_mut().enumerate() {
            let pressed = active.contains(&key);
            if pressed && !*sounding {
                *sounding = true;
                events.push(NoteEvent::on(key, timestamp));
            } else if !pressed && *sounding {
                *sounding = false;
                events.push(NoteEvent::off(key, timestamp));
            }
        }
        events
    }

    /// Release every key still sounding; a second call returns nothing
    pub fn shutdown(&mut self, timestamp: Duration) -> Vec<NoteEvent> {
        self.update(&ActiveKeys::new(), timestamp)
    }

    #[cfg(test)]
    pub fn is_sounding(&self, key: usize) -> bool {
        self.sounding.get(key).copied().unwrap_or(false)
    }

    #[cfg(test)]
    pub fn sounding_keys(&self) -> impl Iterator<Item = usize> + '_ {
        self.sounding
            .iter()
            .enumerate()
            .filter_map(|(key, &on)| on.then_some(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::NoteAction;

    fn keys(list: &[usize]) -> ActiveKeys {
        list.iter().copied().collect()
    }

    fn at(frame: u64) -> Duration {
        Duration::from_millis(frame * 33)
    }

    #[test]
    fn one_event_per_edge() {
        let mut machine = KeyStateMachine::new(5);
        let mut events = Vec::new();
        for (frame, active) in [keys(&[2]), keys(&[2]), keys(&[]), keys(&[2])]
            .iter()
            .enumerate()
        {
            events.extend(machine.update(active, at(frame as u64)));
        }

        assert_eq!(
            events,
            vec![
                NoteEvent::on(2, at(0)),
                NoteEvent::off(2, at(2)),
                NoteEvent::on(2, at(3)),
            ]
        );
    }

    #[test]
    fn chords_change_independently() {
        let mut machine = KeyStateMachine::new(4);
        let first = machine.update(&keys(&[0, 3]), at(0));
        assert_eq!(first, vec![NoteEvent::on(0, at(0)), NoteEvent::on(3, at(0))]);

        let second = machine.update(&keys(&[3, 1]), at(1));
        assert_eq!(
            second,
            vec![NoteEvent::off(0, at(1)), NoteEvent::on(1, at(1))]
        );
        assert_eq!(machine.sounding_keys().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn shutdown_releases_sounding_keys_once() {
        let mut machine = KeyStateMachine::new(5);
        machine.update(&keys(&[1, 3]), at(0));

        let released = machine.shutdown(at(1));
        assert_eq!(released.len(), 2);
        assert!(released.iter().all(|e| e.action == NoteAction::Off));
        assert_eq!(
            released.iter().map(|e| e.key).collect::<Vec<_>>(),
            vec![1, 3]
        );

        assert!(machine.shutdown(at(2)).is_empty());
        assert!(!machine.is_sounding(1));
    }

    #[test]
    fn keys_outside_the_keyboard_are_ignored() {
        let mut machine = KeyStateMachine::new(3);
        let events = machine.update(&keys(&[1, 7]), at(0));
        assert_eq!(events, vec![NoteEvent::on(1, at(0))]);
        assert!(!machine.is_sounding(7));
    }
}
