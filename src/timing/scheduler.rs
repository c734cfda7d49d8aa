use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use super::CityTrackSet;
use crate::error::Result;
use crate::events::{Event, Tick};
use crate::output::EventSink;

/// Cloneable stop request. Any clone may cancel; the player notices at its
/// pause between ticks.
#[derive(Debug, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = channel::bounded(1);
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            wake_tx,
            wake_rx,
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let _ = self.wake_tx.try_send(());
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleep for `timeout` unless cancelled first. Returns whether the token
    /// is cancelled.
    pub fn wait(&self, timeout: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        match self.wake_rx.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                self.is_cancelled()
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Running,
    /// Ran out of steps, had nothing to play, or failed.
    Stopped,
    Cancelled,
}

/// Whether tracks wrap around or play through once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayMode {
    #[default]
    Loop,
    /// Each track plays its ticks once; shorter tracks drop out of the merge
    /// and playback stops when the longest one ends.
    Once,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackReport {
    pub state: PlayerState,
    pub ticks: u64,
    pub events_sent: u64,
}

/// Holds the sink for one playback session together with the cleanup owed
/// by the last tick. Dropping it runs that cleanup and releases the sink, so
/// an early return or a panic cannot leave a note hanging.
struct Session<S: EventSink> {
    sink: Option<S>,
    pending_cleanup: Vec<Event>,
    events_sent: u64,
}

impl<S: EventSink> Session<S> {
    fn new(sink: S) -> Self {
        Self {
            sink: Some(sink),
            pending_cleanup: Vec::new(),
            events_sent: 0,
        }
    }

    fn send_all(&mut self, events: &[Event]) -> Result<()> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        for event in events {
            sink.send(event)?;
            self.events_sent += 1;
        }
        Ok(())
    }

    /// The cleanup obligation is taken on before the first event goes out.
    fn play(&mut self, tick: Tick) -> Result<()> {
        self.pending_cleanup = tick.cleanup;
        self.send_all(&tick.events)
    }

    /// Every pending cleanup event is attempted even when one fails; the
    /// first failure is returned afterwards.
    fn flush_cleanup(&mut self) -> Result<()> {
        let cleanup = std::mem::take(&mut self.pending_cleanup);
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        let mut first_error = None;
        for event in &cleanup {
            match sink.send(event) {
                Ok(()) => self.events_sent += 1,
                Err(e) => {
                    warn!("Cleanup event {:?} failed: {}", event, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Flush pending cleanup, then close the sink whatever the flush did.
    fn release(&mut self) -> Result<()> {
        let flushed = self.flush_cleanup();
        if let Some(mut sink) = self.sink.take() {
            sink.close();
        }
        flushed
    }
}

impl<S: EventSink> Drop for Session<S> {
    fn drop(&mut self) {
        if self.sink.is_some() {
            if let Err(e) = self.release() {
                warn!("Cleanup during teardown failed: {}", e);
            }
        }
    }
}

/// Paces a city's merged ticks out to a sink at a fixed interval.
#[derive(Debug)]
pub struct Player {
    interval: Duration,
    max_steps: Option<u64>,
    mode: PlayMode,
    state: PlayerState,
}

impl Player {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_steps: None,
            mode: PlayMode::Loop,
            state: PlayerState::Idle,
        }
    }

    /// Stop after `steps` ticks instead of looping forever.
    pub fn with_max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    pub fn with_mode(mut self, mode: PlayMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Play `tracks` into `sink` until cancelled, out of steps, or the sink
    /// fails. The sink is closed exactly once on every path, after the last
    /// tick's cleanup has been sent.
    pub fn play<S: EventSink>(
        &mut self,
        tracks: &CityTrackSet,
        sink: S,
        cancel: &CancelToken,
    ) -> Result<PlaybackReport> {
        let mut session = Session::new(sink);
        self.state = PlayerState::Running;
        info!(
            "Playing {} ({} tracks, every {:?})",
            tracks.city(),
            tracks.tracks().len(),
            self.interval
        );

        let mut ticks = 0;
        let outcome = self.run(tracks, &mut session, cancel, &mut ticks);
        let released = session.release();

        let report = PlaybackReport {
            state: self.state,
            ticks,
            events_sent: session.events_sent,
        };
        match outcome.and(released) {
            Ok(()) => {
                info!(
                    "Playback of {} ended {:?} after {} ticks",
                    tracks.city(),
                    report.state,
                    ticks
                );
                Ok(report)
            }
            Err(e) => {
                self.state = PlayerState::Stopped;
                Err(e)
            }
        }
    }

    fn run<S: EventSink>(
        &mut self,
        tracks: &CityTrackSet,
        session: &mut Session<S>,
        cancel: &CancelToken,
        ticks: &mut u64,
    ) -> Result<()> {
        let mut step: u64 = 0;
        loop {
            if self.max_steps.is_some_and(|max| step >= max) {
                self.state = PlayerState::Stopped;
                return Ok(());
            }
            let tick = match self.mode {
                PlayMode::Loop => tracks.merged_tick(step),
                PlayMode::Once => tracks.merged_tick_finite(step),
            };
            let Some(tick) = tick else {
                self.state = PlayerState::Stopped;
                return Ok(());
            };

            debug!(step, events = tick.events.len(), "tick");
            let played = session.play(tick);
            *ticks += 1;
            if let Err(e) = played {
                self.state = PlayerState::Stopped;
                return Err(e);
            }
            step += 1;

            if cancel.wait(self.interval) {
                self.state = PlayerState::Cancelled;
                return Ok(());
            }
            session.flush_cleanup()?;
        }
    }
}
