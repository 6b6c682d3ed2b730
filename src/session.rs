//! Control Session
//!
//! The object a shell talks to. Text and files go through the command
//! parser straight to the transport; accelerometer samples go through the
//! rate gate, the angle converter and the frame encoder first.
//!
//! ```text
//! submit(text) ──▶ parse_line ──────────────────────────────┐
//! submit_sample(x, y, z) ──▶ gate ──▶ angles ──▶ frames ────┼──▶ transport.send
//!                                                           │
//! events() ◀── EventBus ◀── transport / notices ◀───────────┘
//! ```

use crate::domain::angle::{AngleConverter, AngleError};
use crate::domain::command::{self, CommandError, ParsedToken};
use crate::domain::frame::ControlFrame;
use crate::domain::gate::SampleGate;
use crate::domain::models::TransportEvent;
use crate::domain::settings::Settings;
use crate::infrastructure::event_bus::{BusError, EventBus, EventDrain, EventPublisher};
use crate::infrastructure::transport::{Transport, TransportError};
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Channels the hardware documents as valid
pub const DOCUMENTED_CHANNELS: std::ops::RangeInclusive<u8> = 1..=4;

const NOT_CONNECTED_NOTICE: &str = "You are not connected to a device";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Not connected to a device")]
    NotConnected,
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Angle(#[from] AngleError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Session parameters, usually taken from [`Settings`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub speed: u8,
    pub send_interval: Duration,
    /// Channels for the Y and Z tilt frames
    pub sensor_channels: [u8; 2],
    pub clamp_to_documented_range: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for SessionConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            speed: settings.speed,
            send_interval: settings.send_interval(),
            sensor_channels: settings.sensor_channels,
            clamp_to_documented_range: settings.clamp_to_documented_range,
        }
    }
}

/// Result of a text or file submission.
#[derive(Debug, Default)]
pub struct SubmitReport {
    /// Payloads handed to the transport
    pub sent: usize,
    /// Tokens dropped because they did not decode
    pub rejected: Vec<CommandError>,
    /// Payloads not sent because the link dropped mid-batch
    pub unsent: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Y tilt frame and Z tilt frame, in send order
    Sent([ControlFrame; 2]),
    /// Inside the minimum send interval
    Throttled,
    /// Sending has not been started
    Stopped,
}

pub struct ControlSession<T: Transport> {
    transport: Arc<T>,
    bus: Arc<EventBus>,
    notices: EventPublisher,
    gate: SampleGate,
    converter: AngleConverter,
    speed: AtomicU8,
    sensor_channels: [u8; 2],
}

impl<T: Transport> ControlSession<T> {
    pub fn new(transport: Arc<T>, bus: Arc<EventBus>, config: SessionConfig) -> Self {
        for channel in config.sensor_channels {
            if !DOCUMENTED_CHANNELS.contains(&channel) {
                warn!(
                    "Sensor channel {} is outside the documented range {:?}",
                    channel, DOCUMENTED_CHANNELS
                );
            }
        }

        info!(
            "Control session ready (speed {}, interval {:?}, channels {:?})",
            config.speed, config.send_interval, config.sensor_channels
        );

        Self {
            transport,
            notices: bus.publisher(),
            bus,
            gate: SampleGate::new(config.send_interval),
            converter: AngleConverter::new(config.clamp_to_documented_range),
            speed: AtomicU8::new(config.speed),
            sensor_channels: config.sensor_channels,
        }
    }

    /// Send a `;`-separated command line.
    pub fn submit(&self, text: &str) -> Result<SubmitReport, SessionError> {
        self.ensure_connected()?;
        self.send_tokens(command::parse_line(text))
    }

    /// Send every line of a command file. A missing file sends nothing.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<SubmitReport, SessionError> {
        let tokens = command::load_file(path)?;
        self.ensure_connected()?;
        self.send_tokens(tokens)
    }

    /// Feed one accelerometer sample.
    pub fn submit_sample(&self, x: f32, y: f32, z: f32) -> Result<SampleOutcome, SessionError> {
        self.submit_sample_at(x, y, z, Instant::now())
    }

    pub fn submit_sample_at(
        &self,
        x: f32,
        y: f32,
        z: f32,
        now: Instant,
    ) -> Result<SampleOutcome, SessionError> {
        // No notice on the sensor path
        if !self.transport.connection_state().is_connected() {
            return Err(SessionError::NotConnected);
        }
        if !self.gate.is_sending() {
            return Ok(SampleOutcome::Stopped);
        }
        if !self.gate.should_send(now) {
            return Ok(SampleOutcome::Throttled);
        }

        let angles = self.converter.axes_to_angles(x, y, z).inspect_err(|e| {
            debug!("Dropping sample ({}, {}, {}): {}", x, y, z, e);
        })?;

        let speed = self.speed();
        let frames = [
            ControlFrame::encode(self.sensor_channels[0], angles.y_axis, speed),
            ControlFrame::encode(self.sensor_channels[1], angles.z_axis, speed),
        ];
        for frame in &frames {
            self.transport
                .send(&frame.serialize())
                .map_err(|e| match e {
                    TransportError::NotConnected => SessionError::NotConnected,
                    other => SessionError::Transport(other),
                })?;
        }

        debug!(
            "Sample ({:.2}, {:.2}, {:.2}) -> angles {} / {}",
            x, y, z, angles.y_axis, angles.z_axis
        );
        Ok(SampleOutcome::Sent(frames))
    }

    pub fn start(&self) {
        self.gate.start();
    }

    pub fn stop(&self) {
        self.gate.stop();
    }

    pub fn is_sending(&self) -> bool {
        self.gate.is_sending()
    }

    pub fn speed(&self) -> u8 {
        self.speed.load(Ordering::SeqCst)
    }

    /// Takes effect from the next sample on.
    pub fn set_speed(&self, speed: u8) {
        self.speed.store(speed, Ordering::SeqCst);
        info!("Speed set to {}", speed);
    }

    /// Consumer side of the event stream.
    pub fn events(&self) -> Result<EventDrain, SessionError> {
        Ok(self.bus.drain()?)
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Stop sampling and end the event stream once it is drained.
    pub fn close(&self) {
        self.gate.stop();
        self.bus.close();
        info!("Control session closed");
    }

    fn ensure_connected(&self) -> Result<(), SessionError> {
        if self.transport.connection_state().is_connected() {
            return Ok(());
        }
        self.notify(NOT_CONNECTED_NOTICE);
        Err(SessionError::NotConnected)
    }

    fn send_tokens(&self, tokens: Vec<ParsedToken>) -> Result<SubmitReport, SessionError> {
        let mut report = SubmitReport::default();
        let mut link_lost = false;

        for token in tokens {
            match token {
                Ok(token) => {
                    let payload = token.into_payload();
                    if payload.is_empty() {
                        trace!("Skipping empty payload");
                        continue;
                    }
                    if link_lost {
                        report.unsent += 1;
                        continue;
                    }
                    match self.transport.send(&payload) {
                        Ok(()) => report.sent += 1,
                        Err(TransportError::NotConnected) => {
                            warn!("Link dropped after {} payloads", report.sent);
                            self.notify(NOT_CONNECTED_NOTICE);
                            link_lost = true;
                            report.unsent += 1;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Err(e) => {
                    warn!("Skipping malformed token: {}", e);
                    self.notify(&e.to_string());
                    report.rejected.push(e);
                }
            }
        }

        Ok(report)
    }

    fn notify(&self, text: &str) {
        if self
            .notices
            .publish(TransportEvent::Notice(text.to_string()))
            .is_err()
        {
            debug!("Notice dropped, event bus closed: {}", text);
        }
    }
}
