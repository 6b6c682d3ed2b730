use anyhow::{Context, Result};
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use toy_link::domain::settings::SettingsService;
use toy_link::infrastructure::{logging, EventBus, LoopbackTransport};
use toy_link::presentation::{shell, ConsoleRenderer, ShellCommand};
use toy_link::{ControlSession, SampleOutcome, SessionConfig, SessionError, SubmitReport};
use tracing::{error, info, warn};

const DEFAULT_DEVICE_NAME: &str = "loopback";

/// Toy Link - drive a toy controller over an in-memory link
#[derive(Parser, Debug)]
#[command(name = "toy_link")]
#[command(about = "Send toy control frames and text commands over a loopback link", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (default: per-user config directory)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Connect to this device name on startup
    #[arg(long)]
    device: Option<String>,

    /// Echo every write back as a read from the device
    #[arg(long)]
    echo: bool,

    /// Command file to send once connected
    #[arg(long)]
    script: Option<PathBuf>,
}

type Session = ControlSession<LoopbackTransport>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings_service = match &cli.settings {
        Some(path) => SettingsService::open(path.clone()),
        None => SettingsService::new().context("Failed to locate settings")?,
    };
    let settings = settings_service.get().clone();

    let _logging_guard = logging::init_logger(&settings.log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    info!(
        "Starting Toy Link (settings: {})",
        settings_service.path().display()
    );

    let bus = Arc::new(EventBus::new());
    let transport = Arc::new(LoopbackTransport::new(bus.publisher()));
    transport.set_echo(cli.echo || settings.echo);

    let session = ControlSession::new(transport.clone(), bus, SessionConfig::from(&settings));
    let mut events = session.events()?;
    let mut renderer = ConsoleRenderer::new(settings.display_mode);

    transport.listen();
    if let Some(name) = &cli.device {
        transport.connect(name);
    }
    if let Some(script) = &cli.script {
        print_submit(session.load_file(script));
    }

    // Stdin is blocking; read it on its own thread
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });

    println!("{}", shell::HELP);
    let mut input_open = true;

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(event) => {
                    if let Some(line) = renderer.apply(&event) {
                        println!("{}", line);
                    }
                }
                None => break,
            },
            line = line_rx.recv(), if input_open => match line {
                Some(line) => match shell::parse(&line) {
                    Ok(command) => execute(command, &session, &mut renderer, &mut settings_service),
                    Err(message) => eprintln!("{}", message),
                },
                None => {
                    input_open = false;
                    session.close();
                }
            },
        }
    }

    info!("Toy Link exiting");
    Ok(())
}

fn execute(
    command: ShellCommand,
    session: &Session,
    renderer: &mut ConsoleRenderer,
    settings: &mut SettingsService,
) {
    match command {
        ShellCommand::Submit(text) => print_submit(session.submit(&text)),
        ShellCommand::Start => session.start(),
        ShellCommand::Stop => session.stop(),
        ShellCommand::Sample(x, y, z) => match session.submit_sample(x, y, z) {
            Ok(SampleOutcome::Sent(frames)) => {
                for frame in frames {
                    println!(
                        "frame: channel {} angle {} speed {} parity {:#04x}",
                        frame.channel(),
                        frame.angle(),
                        frame.speed(),
                        frame.parity()
                    );
                }
            }
            Ok(SampleOutcome::Throttled) => println!("sample throttled"),
            Ok(SampleOutcome::Stopped) => println!("sending is stopped, use :start"),
            Err(e) => eprintln!("sample dropped: {}", e),
        },
        ShellCommand::Speed(speed) => {
            session.set_speed(speed);
            if let Err(e) = settings.update_speed(speed) {
                warn!("Failed to save speed: {}", e);
            }
        }
        ShellCommand::Load(path) => print_submit(session.load_file(path)),
        ShellCommand::Mode(mode) => {
            renderer.set_mode(mode);
            if let Err(e) = settings.update_display_mode(mode) {
                warn!("Failed to save display mode: {}", e);
            }
        }
        ShellCommand::Clear => renderer.clear(),
        ShellCommand::Connect(name) => session
            .transport()
            .connect(name.as_deref().unwrap_or(DEFAULT_DEVICE_NAME)),
        ShellCommand::Disconnect => session.transport().disconnect(),
        ShellCommand::Help => println!("{}", shell::HELP),
        ShellCommand::Quit => session.close(),
    }
}

fn print_submit(result: Result<SubmitReport, SessionError>) {
    match result {
        Ok(report) => info!(
            "Sent {} payloads, rejected {}, unsent {}",
            report.sent,
            report.rejected.len(),
            report.unsent
        ),
        // Already shown as a notice
        Err(SessionError::NotConnected) => {}
        Err(e) => eprintln!("{}", e),
    }
}
