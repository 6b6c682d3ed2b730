//! Control Frame
//!
//! Fixed-length binary frame sent to the toy controller.
//!
//! # Frame Structure (9 bytes)
//!
//! ```text
//! [0-1] : Header (0xF0 0xF1)
//! [2]   : Channel (intended 0x01-0x04)
//! [3]   : Angle (intended 0-30)
//! [4]   : Speed (degrees/second)
//! [5]   : Parity, wrapping sum of channel + angle + speed
//! [6]   : Reserved, always 0x00
//! [7-8] : Trailer (0x0D 0x0A)
//! ```

use thiserror::Error;

/// Frame header bytes
pub const HEADER: [u8; 2] = [0xF0, 0xF1];

/// Frame trailer bytes
pub const TRAILER: [u8; 2] = [0x0D, 0x0A];

/// Reserved byte value
pub const RESERVED: u8 = 0x00;

/// Total frame length in bytes
pub const FRAME_LEN: usize = 9;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("Bad frame header: {0:02X?}")]
    BadHeader([u8; 2]),
    #[error("Bad frame trailer: {0:02X?}")]
    BadTrailer([u8; 2]),
    #[error("Reserved byte is {0:#04X}, expected 0x00")]
    BadReserved(u8),
    #[error("Parity mismatch: expected {expected:#04X}, got {actual:#04X}")]
    ParityMismatch { expected: u8, actual: u8 },
}

/// A channel/angle/speed triple. Parity is derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlFrame {
    channel: u8,
    angle: u8,
    speed: u8,
}

impl ControlFrame {
    /// Build a frame. Every byte value is accepted as-is.
    pub fn encode(channel: u8, angle: u8, speed: u8) -> Self {
        Self {
            channel,
            angle,
            speed,
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn angle(&self) -> u8 {
        self.angle
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    pub fn parity(&self) -> u8 {
        parity(self.channel, self.angle, self.speed)
    }

    /// Wire bytes, with parity recomputed here.
    pub fn serialize(&self) -> [u8; FRAME_LEN] {
        [
            HEADER[0],
            HEADER[1],
            self.channel,
            self.angle,
            self.speed,
            self.parity(),
            RESERVED,
            TRAILER[0],
            TRAILER[1],
        ]
    }

    /// Parse and validate a frame read back from the wire.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() != FRAME_LEN {
            return Err(FrameError::InvalidLength {
                expected: FRAME_LEN,
                actual: bytes.len(),
            });
        }

        let header = [bytes[0], bytes[1]];
        if header != HEADER {
            return Err(FrameError::BadHeader(header));
        }

        let trailer = [bytes[7], bytes[8]];
        if trailer != TRAILER {
            return Err(FrameError::BadTrailer(trailer));
        }

        if bytes[6] != RESERVED {
            return Err(FrameError::BadReserved(bytes[6]));
        }

        let frame = Self::encode(bytes[2], bytes[3], bytes[4]);
        let expected = frame.parity();
        if bytes[5] != expected {
            return Err(FrameError::ParityMismatch {
                expected,
                actual: bytes[5],
            });
        }

        Ok(frame)
    }
}

/// Additive checksum, truncated to one byte.
pub fn parity(channel: u8, angle: u8, speed: u8) -> u8 {
    channel.wrapping_add(angle).wrapping_add(speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_layout() {
        let frame = ControlFrame::encode(0x02, 15, 10);
        assert_eq!(
            frame.serialize(),
            [0xF0, 0xF1, 0x02, 0x0F, 0x0A, 0x1B, 0x00, 0x0D, 0x0A]
        );
    }

    #[test]
    fn test_parity_wraps() {
        assert_eq!(parity(0xFF, 0x01, 0x00), 0x00);
        assert_eq!(parity(200, 100, 10), 54);
    }

    #[test]
    fn test_parity_is_order_independent() {
        for (c, a, s) in [(1u8, 30u8, 10u8), (255, 255, 255), (0, 0, 0), (4, 128, 200)] {
            let expected = ((c as u32 + a as u32 + s as u32) % 256) as u8;
            assert_eq!(parity(c, a, s), expected);
            assert_eq!(parity(s, a, c), expected);
            assert_eq!(parity(a, c, s), expected);
        }
    }

    #[test]
    fn test_decode_reproduces_fields() {
        // Sweep every channel and a stride through angle/speed.
        for c in 0..=255u8 {
            for a in (0..=255u8).step_by(17) {
                for s in (0..=255u8).step_by(51) {
                    let bytes = ControlFrame::encode(c, a, s).serialize();
                    let decoded = ControlFrame::decode(&bytes).unwrap();
                    assert_eq!((decoded.channel(), decoded.angle(), decoded.speed()), (c, a, s));
                    assert_eq!(decoded.parity(), bytes[5]);
                }
            }
        }
    }

    #[test]
    fn test_decode_rejects_corruption() {
        let good = ControlFrame::encode(1, 20, 10).serialize();

        assert_eq!(
            ControlFrame::decode(&good[..8]),
            Err(FrameError::InvalidLength {
                expected: 9,
                actual: 8
            })
        );

        let mut bad = good;
        bad[0] = 0xAA;
        assert_eq!(ControlFrame::decode(&bad), Err(FrameError::BadHeader([0xAA, 0xF1])));

        let mut bad = good;
        bad[8] = 0x00;
        assert_eq!(ControlFrame::decode(&bad), Err(FrameError::BadTrailer([0x0D, 0x00])));

        let mut bad = good;
        bad[6] = 0x01;
        assert_eq!(ControlFrame::decode(&bad), Err(FrameError::BadReserved(0x01)));

        let mut bad = good;
        bad[5] = bad[5].wrapping_add(1);
        assert_eq!(
            ControlFrame::decode(&bad),
            Err(FrameError::ParityMismatch {
                expected: 31,
                actual: 32
            })
        );
    }
}
