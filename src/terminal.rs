// Keyboard interrupt handling for interactive playback.
//
// Raw mode is needed to see Ctrl-C as a key instead of a signal, which also
// stops the terminal from translating "\n" into "\r\n". Log output goes
// through `CrlfWriter` to keep lines aligned while raw mode is on.
//
// Without a terminal, or when the process is signalled from outside, the
// handler from `install_signal_handler` cancels playback instead.

use std::io::{self, Write};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tracing::{debug, warn};

use crate::error::Result;
use crate::timing::CancelToken;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Listens for q, Esc or Ctrl-C and cancels the token. Restores the terminal
/// when dropped.
pub struct InterruptListener {
    raw_mode: bool,
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl InterruptListener {
    pub fn spawn(cancel: CancelToken) -> Self {
        if let Err(e) = terminal::enable_raw_mode() {
            warn!("No interactive terminal ({}), keyboard stop disabled", e);
            return Self {
                raw_mode: false,
                cancel,
                handle: None,
            };
        }

        let token = cancel.clone();
        let handle = thread::spawn(move || listen(token));
        Self {
            raw_mode: true,
            cancel,
            handle: Some(handle),
        }
    }
}

/// Cancel `cancel` on SIGINT, SIGTERM or SIGHUP. Only one handler may be
/// installed per process.
pub fn install_signal_handler(cancel: CancelToken) -> Result<()> {
    ctrlc::set_handler(move || {
        debug!("Termination signal received");
        cancel.cancel();
    })?;
    Ok(())
}

fn is_stop_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

fn listen(cancel: CancelToken) {
    while !cancel.is_cancelled() {
        match event::poll(POLL_INTERVAL) {
            Ok(true) => match event::read() {
                Ok(TermEvent::Key(key)) if is_stop_key(&key) => {
                    debug!("Stop key pressed");
                    cancel.cancel();
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Reading terminal input failed: {}", e);
                    return;
                }
            },
            Ok(false) => {}
            Err(e) => {
                warn!("Polling terminal input failed: {}", e);
                return;
            }
        }
    }
}

impl Drop for InterruptListener {
    fn drop(&mut self) {
        // Wakes the listener thread so it can exit.
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        if self.raw_mode {
            let _ = terminal::disable_raw_mode();
        }
    }
}

/// Writer that turns bare "\n" into "\r\n".
pub struct CrlfWriter<W: Write> {
    inner: W,
}

impl<W: Write> CrlfWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl CrlfWriter<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> Write for CrlfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut start = 0;
        for (i, &byte) in buf.iter().enumerate() {
            if byte == b'\n' && (i == 0 || buf[i - 1] != b'\r') {
                self.inner.write_all(&buf[start..i])?;
                self.inner.write_all(b"\r\n")?;
                start = i + 1;
            }
        }
        self.inner.write_all(&buf[start..])?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
