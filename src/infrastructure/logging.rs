//! Logging setup.
//!
//! stdout belongs to the console conversation, so log lines go to stderr
//! and, when enabled, to a rolling file under `log_dir`. `RUST_LOG`
//! overrides the configured level.

use crate::domain::settings::LogSettings;
use std::str::FromStr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::{DefaultFields, Format};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const FALLBACK_LEVEL: &str = "warn";

/// Flushes the file writer when dropped. Hold it for the life of `main`.
pub struct LoggingGuard {
    _file_writer: Option<WorkerGuard>,
}

pub fn init_logger(settings: &LogSettings) -> anyhow::Result<LoggingGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::from_str(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_LEVEL));

    let console = settings
        .console_logging_enabled
        .then(|| log_layer(settings, std::io::stderr, settings.ansi_colors));

    let (file, file_writer) = if settings.file_logging_enabled {
        let appender = RollingFileAppender::new(
            parse_rotation(&settings.rotation),
            &settings.log_dir,
            &settings.file_name_prefix,
        );
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(log_layer(settings, writer, false)), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;

    tracing::debug!(
        console = settings.console_logging_enabled,
        file = settings.file_logging_enabled,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_writer: file_writer,
    })
}

/// One fmt layer with the display flags from `settings`.
fn log_layer<S, W>(
    settings: &LogSettings,
    writer: W,
    ansi: bool,
) -> fmt::Layer<S, DefaultFields, Format, W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_file(settings.show_file_line)
        .with_line_number(settings.show_file_line)
        .with_thread_ids(settings.show_thread_ids)
        .with_target(settings.show_target)
}

/// Unknown names fall back to daily rotation.
fn parse_rotation(rotation: &str) -> Rotation {
    match rotation.to_lowercase().as_str() {
        "hourly" => Rotation::HOURLY,
        "minutely" => Rotation::MINUTELY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}
