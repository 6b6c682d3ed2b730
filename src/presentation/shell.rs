//! Console shell line syntax.
//!
//! Lines starting with `:` are shell commands, anything else is sent as a
//! command line.

use crate::domain::models::DisplayMode;
use std::path::PathBuf;

pub const HELP: &str = "\
commands:
  TEXT              send TEXT (';'-separated, 0x.. for hex)
  :start / :stop    start or stop sensor frames
  :sample X Y Z     feed one accelerometer sample
  :speed N          set frame speed (0-255)
  :load PATH        send every line of a command file
  :hex / :text      display written data as hex or text
  :clear            clear the conversation
  :connect [NAME]   connect the loopback device
  :disconnect       drop the loopback connection
  :help             show this help
  :quit             exit";

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Submit(String),
    Start,
    Stop,
    Sample(f32, f32, f32),
    Speed(u8),
    Load(PathBuf),
    Mode(DisplayMode),
    Clear,
    Connect(Option<String>),
    Disconnect,
    Help,
    Quit,
}

pub fn parse(line: &str) -> Result<ShellCommand, String> {
    let Some(rest) = line.strip_prefix(':') else {
        return Ok(ShellCommand::Submit(line.to_string()));
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();
    // Everything after the command name, inner spacing preserved
    let tail = rest
        .trim_start()
        .strip_prefix(name)
        .unwrap_or_default()
        .trim();

    match (name, args.as_slice()) {
        ("start", []) => Ok(ShellCommand::Start),
        ("stop", []) => Ok(ShellCommand::Stop),
        ("sample", [x, y, z]) => Ok(ShellCommand::Sample(
            parse_axis(x)?,
            parse_axis(y)?,
            parse_axis(z)?,
        )),
        ("speed", [value]) => value
            .parse()
            .map(ShellCommand::Speed)
            .map_err(|_| format!("speed must be 0-255, got {:?}", value)),
        ("load", [_, ..]) => Ok(ShellCommand::Load(PathBuf::from(tail))),
        ("hex", []) => Ok(ShellCommand::Mode(DisplayMode::Hex)),
        ("text", []) => Ok(ShellCommand::Mode(DisplayMode::Text)),
        ("clear", []) => Ok(ShellCommand::Clear),
        ("connect", []) => Ok(ShellCommand::Connect(None)),
        ("connect", _) => Ok(ShellCommand::Connect(Some(tail.to_string()))),
        ("disconnect", []) => Ok(ShellCommand::Disconnect),
        ("help", []) => Ok(ShellCommand::Help),
        ("quit" | "exit", []) => Ok(ShellCommand::Quit),
        _ => Err(format!("unknown command {:?}, try :help", line)),
    }
}

fn parse_axis(value: &str) -> Result<f32, String> {
    value
        .parse()
        .map_err(|_| format!("not a number: {:?}", value))
}
