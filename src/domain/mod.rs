//! Domain Module
//!
//! Device-independent pieces of the control protocol.
//!
//! ## Modules
//!
//! - [`frame`] - 9-byte control frame encoding
//! - [`command`] - `;`-separated text/hex command parsing
//! - [`angle`] - accelerometer sample to angle bytes
//! - [`gate`] - sensor send rate gate
//! - [`models`] - shared value types
//! - [`settings`] - persisted configuration

pub mod angle;
pub mod command;
pub mod frame;
pub mod gate;
pub mod models;
pub mod settings;
