use serde::{Deserialize, Serialize};

/// Link state as reported by the transport.
///
/// The transport owns and mutates this; the rest of the crate only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    None,
    Listen,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Listen => 1,
            Self::Connecting => 2,
            Self::Connected => 3,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Listen,
            2 => Self::Connecting,
            3 => Self::Connected,
            _ => Self::None,
        }
    }
}

/// Everything the transport side reports to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    StateChanged(ConnectionState),
    DataRead(Vec<u8>),
    DataWritten(Vec<u8>),
    DeviceIdentified(String),
    Notice(String),
}

/// One `;`-separated unit of user or file input, resolved to bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandToken {
    /// Decoded from a `0x`-prefixed string.
    Hex(Vec<u8>),
    /// Literal text, byte for byte.
    Raw(Vec<u8>),
}

impl CommandToken {
    pub fn into_payload(self) -> Vec<u8> {
        match self {
            Self::Hex(bytes) | Self::Raw(bytes) => bytes,
        }
    }
}

/// How outgoing payloads are shown in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Hex,
    Text,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_round_trips_through_u8() {
        for state in [
            ConnectionState::None,
            ConnectionState::Listen,
            ConnectionState::Connecting,
            ConnectionState::Connected,
        ] {
            assert_eq!(ConnectionState::from_u8(state.as_u8()), state);
        }
        assert_eq!(ConnectionState::from_u8(200), ConnectionState::None);
    }

    #[test]
    fn test_token_payload() {
        assert_eq!(CommandToken::Hex(vec![0x0A]).into_payload(), vec![0x0A]);
        assert_eq!(CommandToken::Raw(b"hi".to_vec()).into_payload(), b"hi".to_vec());
    }
}
