//! Text Command Parser
//!
//! Turns user or file input like `0x0A;hello;0x0B0C` into byte payloads.

use crate::domain::models::CommandToken;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Segment separator
pub const SEPARATOR: char = ';';

/// Prefix marking a hex token
pub const HEX_PREFIX: &str = "0x";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Hex token {token:?} has an odd number of digits")]
    OddHexLength { token: String },

    #[error("Invalid hex byte {pair:?} at byte {index} of {token:?}")]
    InvalidHexByte {
        token: String,
        index: usize,
        pair: String,
    },

    #[error("Command file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read command file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CommandError {
    /// True for errors that only invalidate a single token.
    pub fn is_token_error(&self) -> bool {
        matches!(self, Self::OddHexLength { .. } | Self::InvalidHexByte { .. })
    }
}

pub type ParsedToken = Result<CommandToken, CommandError>;

/// Split a line on `;` and resolve each segment.
///
/// Trailing empty segments are dropped, inner ones are kept as empty
/// `Raw` payloads.
pub fn parse_line(text: &str) -> Vec<ParsedToken> {
    let mut segments: Vec<&str> = text.split(SEPARATOR).collect();
    if segments.len() > 1 {
        while segments.last().is_some_and(|s| s.is_empty()) {
            segments.pop();
        }
    }

    segments.into_iter().map(parse_segment).collect()
}

/// Resolve a single segment.
pub fn parse_segment(segment: &str) -> ParsedToken {
    match segment.strip_prefix(HEX_PREFIX) {
        Some(digits) => decode_hex(segment, digits).map(CommandToken::Hex),
        None => Ok(CommandToken::Raw(segment.as_bytes().to_vec())),
    }
}

fn decode_hex(token: &str, digits: &str) -> Result<Vec<u8>, CommandError> {
    let digits = digits.as_bytes();
    if digits.len() % 2 != 0 {
        return Err(CommandError::OddHexLength {
            token: token.to_string(),
        });
    }

    digits
        .chunks(2)
        .enumerate()
        .map(|(index, pair)| match (hex_digit(pair[0]), hex_digit(pair[1])) {
            (Some(high), Some(low)) => Ok((high << 4) | low),
            _ => Err(CommandError::InvalidHexByte {
                token: token.to_string(),
                index,
                pair: String::from_utf8_lossy(pair).into_owned(),
            }),
        })
        .collect()
}

fn hex_digit(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|d| d as u8)
}

/// Read a command file and parse every line.
///
/// The file is read completely before anything is parsed, so a read
/// failure never yields partial output.
pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<ParsedToken>, CommandError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => CommandError::NotFound(path.to_path_buf()),
        _ => CommandError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let tokens: Vec<ParsedToken> = contents.lines().flat_map(parse_line).collect();
    info!("Loaded {} tokens from {}", tokens.len(), path.display());
    debug!(
        "{} of them malformed",
        tokens.iter().filter(|t| t.is_err()).count()
    );
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ok_tokens(line: &str) -> Vec<CommandToken> {
        parse_line(line).into_iter().map(|t| t.unwrap()).collect()
    }

    #[test]
    fn test_mixed_line() {
        assert_eq!(
            ok_tokens("0x0A;hello;0x0B0C"),
            vec![
                CommandToken::Hex(vec![0x0A]),
                CommandToken::Raw(b"hello".to_vec()),
                CommandToken::Hex(vec![0x0B, 0x0C]),
            ]
        );
    }

    #[test]
    fn test_hex_is_case_insensitive() {
        assert_eq!(ok_tokens("0xfFaB"), vec![CommandToken::Hex(vec![0xFF, 0xAB])]);
    }

    #[test]
    fn test_invalid_hex_fails_whole_token() {
        let parsed = parse_line("0xZZ");
        assert_eq!(parsed.len(), 1);
        match &parsed[0] {
            Err(CommandError::InvalidHexByte { index, pair, .. }) => {
                assert_eq!(*index, 0);
                assert_eq!(pair, "ZZ");
            }
            other => panic!("unexpected: {:?}", other),
        }

        // No partially decoded bytes leak out.
        assert!(matches!(
            parse_segment("0x01G2"),
            Err(CommandError::InvalidHexByte { index: 1, .. })
        ));
    }

    #[test]
    fn test_sign_is_not_a_hex_digit() {
        assert!(parse_segment("0x+F").is_err());
    }

    #[test]
    fn test_odd_hex_length() {
        assert!(matches!(
            parse_segment("0xABC"),
            Err(CommandError::OddHexLength { .. })
        ));
    }

    #[test]
    fn test_bad_token_does_not_affect_neighbours() {
        let parsed = parse_line("abc;0xQ1;0x02");
        assert_eq!(parsed.len(), 3);
        assert!(parsed[0].is_ok());
        assert!(parsed[1].as_ref().is_err_and(|e| e.is_token_error()));
        assert_eq!(parsed[2].as_ref().unwrap(), &CommandToken::Hex(vec![0x02]));
    }

    #[test]
    fn test_empty_segments() {
        assert_eq!(ok_tokens(""), vec![CommandToken::Raw(Vec::new())]);
        assert_eq!(
            ok_tokens("a;;b"),
            vec![
                CommandToken::Raw(b"a".to_vec()),
                CommandToken::Raw(Vec::new()),
                CommandToken::Raw(b"b".to_vec()),
            ]
        );
        assert_eq!(ok_tokens("a;;"), vec![CommandToken::Raw(b"a".to_vec())]);
        assert!(parse_line(";").is_empty());
    }

    #[test]
    fn test_short_segments_do_not_panic() {
        assert_eq!(ok_tokens("0"), vec![CommandToken::Raw(b"0".to_vec())]);
        assert_eq!(ok_tokens("0x"), vec![CommandToken::Hex(Vec::new())]);
        assert_eq!(ok_tokens("é"), vec![CommandToken::Raw("é".as_bytes().to_vec())]);
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0x01;abc").unwrap();
        write!(file, "0xZ1\r\nlast").unwrap();

        let tokens = load_file(file.path()).unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].as_ref().unwrap(), &CommandToken::Hex(vec![0x01]));
        assert_eq!(tokens[1].as_ref().unwrap(), &CommandToken::Raw(b"abc".to_vec()));
        assert!(tokens[2].is_err());
        assert_eq!(tokens[3].as_ref().unwrap(), &CommandToken::Raw(b"last".to_vec()));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.txt");
        match load_file(&missing) {
            Err(CommandError::NotFound(path)) => assert_eq!(path, missing),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
