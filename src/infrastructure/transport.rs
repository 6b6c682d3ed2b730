//! Transport
//!
//! The serial link the frames travel over. Real radio transports live
//! outside this crate; they only need to implement [`Transport`] and
//! report what happens through an [`EventPublisher`].
//!
//! [`LoopbackTransport`] is an in-memory link used by the console shell
//! and the tests. It walks the same state sequence a Bluetooth serial
//! service does:
//!
//! ```text
//! None ──listen()──▶ Listen ──connect()──▶ Connecting ──▶ Connected
//!   ▲                                                        │
//!   └──────────────────────── disconnect() ──────────────────┘
//! ```

use crate::domain::models::{ConnectionState, TransportEvent};
use crate::infrastructure::event_bus::EventPublisher;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Not connected")]
    NotConnected,
    #[error("Write failed: {0}")]
    Write(String),
}

/// What the control session needs from a link.
pub trait Transport: Send + Sync {
    /// Queue `bytes` for the remote device. Fire and forget.
    fn send(&self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Current link state.
    fn connection_state(&self) -> ConnectionState;
}

/// In-memory transport that records writes and optionally echoes them back.
pub struct LoopbackTransport {
    state: AtomicU8,
    echo: AtomicBool,
    device_name: Mutex<Option<String>>,
    written: Mutex<Vec<Vec<u8>>>,
    events: EventPublisher,
}

impl LoopbackTransport {
    pub fn new(events: EventPublisher) -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::None.as_u8()),
            echo: AtomicBool::new(false),
            device_name: Mutex::new(None),
            written: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Echo every write back as a read from the device.
    pub fn set_echo(&self, echo: bool) {
        self.echo.store(echo, Ordering::SeqCst);
    }

    pub fn listen(&self) {
        self.set_state(ConnectionState::Listen);
    }

    /// Pretend the named device accepted the connection.
    pub fn connect(&self, name: &str) {
        info!("Connecting to loopback device {}", name);
        self.set_state(ConnectionState::Connecting);

        *self
            .device_name
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(name.to_string());
        self.emit(TransportEvent::DeviceIdentified(name.to_string()));

        self.set_state(ConnectionState::Connected);
    }

    /// Drop the link as if the device went away.
    pub fn disconnect(&self) {
        if !self.connection_state().is_connected() {
            return;
        }
        info!("Loopback device disconnected");
        self.set_state(ConnectionState::None);
        self.emit(TransportEvent::Notice(
            "Device connection was lost".to_string(),
        ));
    }

    pub fn device_name(&self) -> Option<String> {
        self.device_name
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Every payload sent so far, in order.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.written
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = ConnectionState::from_u8(self.state.swap(state.as_u8(), Ordering::SeqCst));
        if previous != state {
            debug!("Connection state {:?} -> {:?}", previous, state);
            self.emit(TransportEvent::StateChanged(state));
        }
    }

    fn emit(&self, event: TransportEvent) {
        if self.events.publish(event).is_err() {
            warn!("Event bus closed, transport event discarded");
        }
    }
}

impl Transport for LoopbackTransport {
    fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        if !self.connection_state().is_connected() {
            return Err(TransportError::NotConnected);
        }

        self.written
            .lock()
            .map_err(|_| TransportError::Write("write log poisoned".to_string()))?
            .push(bytes.to_vec());

        self.emit(TransportEvent::DataWritten(bytes.to_vec()));
        if self.echo.load(Ordering::SeqCst) {
            self.emit(TransportEvent::DataRead(bytes.to_vec()));
        }
        Ok(())
    }

    fn connection_state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::event_bus::EventBus;

    #[tokio::test]
    async fn test_connect_sequence() {
        let bus = EventBus::new();
        let transport = LoopbackTransport::new(bus.publisher());

        transport.listen();
        transport.connect("toy");
        transport.disconnect();
        bus.close();

        let mut drain = bus.drain().unwrap();
        let mut events = Vec::new();
        while let Some(event) = drain.next().await {
            events.push(event);
        }

        assert_eq!(
            events,
            vec![
                TransportEvent::StateChanged(ConnectionState::Listen),
                TransportEvent::StateChanged(ConnectionState::Connecting),
                TransportEvent::DeviceIdentified("toy".into()),
                TransportEvent::StateChanged(ConnectionState::Connected),
                TransportEvent::StateChanged(ConnectionState::None),
                TransportEvent::Notice("Device connection was lost".into()),
            ]
        );
        assert_eq!(transport.device_name().as_deref(), Some("toy"));
    }

    #[test]
    fn test_send_requires_connection() {
        let bus = EventBus::new();
        let transport = LoopbackTransport::new(bus.publisher());
        assert!(matches!(
            transport.send(&[1, 2, 3]),
            Err(TransportError::NotConnected)
        ));
        assert!(transport.written().is_empty());
    }

    #[tokio::test]
    async fn test_echo() {
        let bus = EventBus::new();
        let transport = LoopbackTransport::new(bus.publisher());
        transport.connect("toy");
        transport.set_echo(true);
        transport.send(b"hi").unwrap();

        let mut drain = bus.drain().unwrap();
        let mut tail = Vec::new();
        while let Some(event) = drain.try_next() {
            tail.push(event);
        }
        assert_eq!(
            &tail[tail.len() - 2..],
            &[
                TransportEvent::DataWritten(b"hi".to_vec()),
                TransportEvent::DataRead(b"hi".to_vec()),
            ]
        );
        assert_eq!(transport.written(), vec![b"hi".to_vec()]);
    }
}
