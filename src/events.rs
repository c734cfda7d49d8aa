/// A single MIDI instruction sent to the output sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    NoteOn {
        channel: u8,
        pitch: u8,
        velocity: u8,
    },
    NoteOff {
        channel: u8,
        pitch: u8,
        velocity: u8,
    },
    Control {
        channel: u8,
        controller: u8,
        value: u8,
    },
}

impl Event {
    pub fn channel(&self) -> u8 {
        match *self {
            Event::NoteOn { channel, .. }
            | Event::NoteOff { channel, .. }
            | Event::Control { channel, .. } => channel,
        }
    }

    pub fn is_note_off(&self) -> bool {
        matches!(self, Event::NoteOff { .. })
    }

    /// Raw channel-voice message bytes.
    pub fn to_bytes(&self) -> [u8; 3] {
        match *self {
            Event::NoteOn {
                channel,
                pitch,
                velocity,
            } => [0x90 | (channel & 0x0F), pitch & 0x7F, velocity & 0x7F],
            Event::NoteOff {
                channel,
                pitch,
                velocity,
            } => [0x80 | (channel & 0x0F), pitch & 0x7F, velocity & 0x7F],
            Event::Control {
                channel,
                controller,
                value,
            } => [0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F],
        }
    }
}

/// One time step of output: the events to play now, and the events that
/// silence whatever those started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tick {
    pub events: Vec<Event>,
    pub cleanup: Vec<Event>,
}

impl Tick {
    pub fn new(events: Vec<Event>, cleanup: Vec<Event>) -> Self {
        Self { events, cleanup }
    }

    /// Concatenate events and cleanup of every tick, in iteration order.
    pub fn merge<'a, I>(ticks: I) -> Tick
    where
        I: IntoIterator<Item = &'a Tick>,
    {
        let mut merged = Tick::default();
        for tick in ticks {
            merged.events.extend_from_slice(&tick.events);
            merged.cleanup.extend_from_slice(&tick.cleanup);
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cc(controller: u8, value: u8) -> Event {
        Event::Control {
            channel: 0,
            controller,
            value,
        }
    }

    #[test]
    fn test_encode_note_on() {
        let ev = Event::NoteOn {
            channel: 1,
            pitch: 60,
            velocity: 64,
        };
        assert_eq!(ev.to_bytes(), [0x91, 60, 64]);
    }

    #[test]
    fn test_encode_note_off() {
        let ev = Event::NoteOff {
            channel: 0,
            pitch: 79,
            velocity: 64,
        };
        assert_eq!(ev.to_bytes(), [0x80, 79, 64]);
    }

    #[test]
    fn test_encode_control_change() {
        assert_eq!(cc(21, 42).to_bytes(), [0xB0, 21, 42]);
    }

    #[test]
    fn merge_preserves_order() {
        let a = Tick::new(vec![cc(1, 1)], vec![cc(11, 1)]);
        let b = Tick::new(vec![cc(2, 2)], vec![cc(12, 2)]);

        let merged = Tick::merge([&a, &b]);
        assert_eq!(merged.events, vec![cc(1, 1), cc(2, 2)]);
        assert_eq!(merged.cleanup, vec![cc(11, 1), cc(12, 2)]);

        let reversed = Tick::merge([&b, &a]);
        assert_eq!(reversed.events, vec![cc(2, 2), cc(1, 1)]);
    }

    #[test]
    fn merge_of_nothing_is_empty() {
        let merged = Tick::merge(std::iter::empty());
        assert_eq!(merged, Tick::default());
    }
}
