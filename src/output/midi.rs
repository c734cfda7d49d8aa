use midir::{MidiOutput, MidiOutputConnection};
use tracing::{info, warn};

use super::EventSink;
use crate::error::{Error, Result};
use crate::events::Event;

/// Names of every MIDI output port currently visible.
pub fn list_output_ports(client_name: &str) -> Result<Vec<String>> {
    let midi_out = MidiOutput::new(client_name).map_err(|e| Error::Midi(e.to_string()))?;
    Ok(midi_out
        .ports()
        .iter()
        .filter_map(|port| midi_out.port_name(port).ok())
        .collect())
}

/// A live MIDI output connection.
pub struct MidiPortSink {
    connection: Option<MidiOutputConnection>,
    port_name: String,
    sent: u64,
}

impl MidiPortSink {
    /// Connect to the first output port whose name contains `pattern`.
    pub fn open(client_name: &str, pattern: &str) -> Result<Self> {
        let midi_out = MidiOutput::new(client_name).map_err(|e| Error::Midi(e.to_string()))?;

        let ports = midi_out.ports();
        let port = ports
            .iter()
            .find(|p| {
                midi_out
                    .port_name(p)
                    .map(|n| n.contains(pattern))
                    .unwrap_or(false)
            })
            .ok_or_else(|| Error::Midi(format!("no output port matching {:?}", pattern)))?;

        let port_name = midi_out
            .port_name(port)
            .map_err(|e| Error::Midi(e.to_string()))?;

        let connection = midi_out
            .connect(port, "tidesong-output")
            .map_err(|e| Error::Midi(e.to_string()))?;

        info!("Opened MIDI output: {}", port_name);
        Ok(Self {
            connection: Some(connection),
            port_name,
            sent: 0,
        })
    }

    /// Publish a new virtual output port other applications can connect to.
    #[cfg(unix)]
    pub fn open_virtual(client_name: &str) -> Result<Self> {
        use midir::os::unix::VirtualOutput;

        let midi_out = MidiOutput::new(client_name).map_err(|e| Error::Midi(e.to_string()))?;
        let connection = midi_out
            .create_virtual(client_name)
            .map_err(|e| Error::Midi(e.to_string()))?;

        info!("Created virtual MIDI output: {}", client_name);
        Ok(Self {
            connection: Some(connection),
            port_name: client_name.to_string(),
            sent: 0,
        })
    }

    #[cfg(not(unix))]
    pub fn open_virtual(_client_name: &str) -> Result<Self> {
        Err(Error::Midi(
            "virtual ports are not supported on this platform, pass --port".to_string(),
        ))
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl EventSink for MidiPortSink {
    fn send(&mut self, event: &Event) -> Result<()> {
        let conn = self
            .connection
            .as_mut()
            .ok_or_else(|| Error::Midi("connection closed".to_string()))?;
        conn.send(&event.to_bytes())
            .map_err(|e| Error::Playback(e.to_string()))?;
        self.sent += 1;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.close();
            info!("Closed MIDI output {} after {} events", self.port_name, self.sent);
        }
    }
}

impl Drop for MidiPortSink {
    fn drop(&mut self) {
        if self.connection.is_some() {
            warn!("MIDI output {} dropped without close", self.port_name);
            self.close();
        }
    }
}
