//! # Toy Link
//!
//! Control protocol for a Bluetooth serial toy: a fixed 9-byte command
//! frame, a `;`-separated text/hex command syntax, accelerometer driven
//! angle commands with rate gating, and an event bus that carries link
//! events from the transport to whoever renders them.
//!
//! ## Layout
//!
//! - [`domain`] - frames, commands, angles, gate, settings
//! - [`infrastructure`] - event bus, transport, logging
//! - [`session`] - [`ControlSession`], the object a shell drives
//! - [`presentation`] - console rendering

pub mod domain;
pub mod infrastructure;
pub mod presentation;
pub mod session;

pub use domain::models::{CommandToken, ConnectionState, DisplayMode, TransportEvent};
pub use session::{ControlSession, SampleOutcome, SessionConfig, SessionError, SubmitReport};
