mod midi;

pub use midi::{MidiPortSink, list_output_ports};

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::error::Result;
use crate::events::Event;

/// Where played events go. The player owns the sink for a whole session and
/// calls `close` exactly once when it is done with it.
pub trait EventSink {
    fn send(&mut self, event: &Event) -> Result<()>;
    fn close(&mut self);
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn send(&mut self, event: &Event) -> Result<()> {
        (**self).send(event)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Logs every event instead of playing it.
#[derive(Debug, Default)]
pub struct LogSink {
    sent: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for LogSink {
    fn send(&mut self, event: &Event) -> Result<()> {
        self.sent += 1;
        info!(target: "tidesong::events", ?event, bytes = ?event.to_bytes());
        Ok(())
    }

    fn close(&mut self) {
        info!("Log sink closed after {} events", self.sent);
    }
}

/// What a `MemorySink` saw, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEntry {
    Sent(Event),
    Closed,
}

/// Records everything it receives. Clones share the same log, so a handle
/// kept outside the player can inspect it afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    log: Arc<Mutex<Vec<SinkEntry>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<SinkEntry> {
        self.log.lock().clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.log
            .lock()
            .iter()
            .filter_map(|entry| match entry {
                SinkEntry::Sent(event) => Some(*event),
                SinkEntry::Closed => None,
            })
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|entry| matches!(entry, SinkEntry::Closed))
            .count()
    }
}

impl EventSink for MemorySink {
    fn send(&mut self, event: &Event) -> Result<()> {
        self.log.lock().push(SinkEntry::Sent(*event));
        Ok(())
    }

    fn close(&mut self) {
        self.log.lock().push(SinkEntry::Closed);
    }
}
