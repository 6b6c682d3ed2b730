//! Presentation Module
//!
//! - [`console`] - text rendering of transport events
//! - [`shell`] - console shell line syntax

pub mod console;
pub mod shell;

pub use console::ConsoleRenderer;
pub use shell::ShellCommand;
