//! Infrastructure Module
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  send()   ┌─────────────┐
//! │ControlSession│──────────▶│  Transport  │
//! └──────▲───────┘           └──────┬──────┘
//!        │ events()                 │ publish()
//!        │                   ┌──────▼──────┐
//!        └───────────────────│  EventBus   │
//!                            └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`event_bus`] - FIFO event channel from transport to consumer
//! - [`transport`] - link abstraction and the in-memory loopback link
//! - [`logging`] - tracing subscriber setup

pub mod event_bus;
pub mod logging;
pub mod transport;

pub use event_bus::{EventBus, EventDrain, EventPublisher};
pub use transport::{LoopbackTransport, Transport};
