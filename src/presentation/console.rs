//! Console Renderer
//!
//! Consumer-side view state: the conversation, how written payloads are
//! shown, and which device is on the other end.

use crate::domain::frame::ControlFrame;
use crate::domain::models::{ConnectionState, DisplayMode, TransportEvent};

pub struct ConsoleRenderer {
    history: Vec<String>,
    mode: DisplayMode,
    device_name: Option<String>,
    status: String,
}

impl ConsoleRenderer {
    pub fn new(mode: DisplayMode) -> Self {
        Self {
            history: Vec::new(),
            mode,
            device_name: None,
            status: "not connected".to_string(),
        }
    }

    /// Fold one event into the view. Returns the line to print, if any.
    pub fn apply(&mut self, event: &TransportEvent) -> Option<String> {
        match event {
            TransportEvent::StateChanged(state) => {
                self.status = match state {
                    ConnectionState::Connected => {
                        self.history.clear();
                        format!("connected to {}", self.device_label())
                    }
                    ConnectionState::Connecting => "connecting...".to_string(),
                    ConnectionState::Listen | ConnectionState::None => {
                        "not connected".to_string()
                    }
                };
                Some(format!("[{}]", self.status))
            }
            TransportEvent::DataWritten(bytes) => {
                let line = format!("Me:  {}", self.format_written(bytes));
                Some(self.push(line))
            }
            TransportEvent::DataRead(bytes) => {
                let line = format!(
                    "{}:  {}",
                    self.device_label(),
                    String::from_utf8_lossy(bytes)
                );
                Some(self.push(line))
            }
            TransportEvent::DeviceIdentified(name) => {
                self.device_name = Some(name.clone());
                Some(format!("Connected to {}", name))
            }
            TransportEvent::Notice(text) => Some(text.clone()),
        }
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn set_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    fn format_written(&self, bytes: &[u8]) -> String {
        match self.mode {
            DisplayMode::Hex => match ControlFrame::decode(bytes) {
                Ok(frame) => format!(
                    "{}  (ch {} angle {} speed {})",
                    to_hex_string(bytes),
                    frame.channel(),
                    frame.angle(),
                    frame.speed()
                ),
                Err(_) => to_hex_string(bytes),
            },
            DisplayMode::Text => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    fn device_label(&self) -> &str {
        self.device_name.as_deref().unwrap_or("device")
    }

    fn push(&mut self, line: String) -> String {
        self.history.push(line.clone());
        line
    }
}

/// Lowercase hex, two digits per byte, no separators.
pub fn to_hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
