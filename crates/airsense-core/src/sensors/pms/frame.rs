//! PMS5003T serial frame decoding
//!
//! The sensor streams fixed 32-byte frames in active mode:
//!
//! | offset | size | content                                   |
//! |--------|------|-------------------------------------------|
//! | 0      | 2    | start bytes `0x42 0x4D`                   |
//! | 2      | 2    | frame length, always 28                   |
//! | 4      | 26   | thirteen big-endian data words            |
//! | 30     | 2    | checksum: sum of bytes 0..30              |

use thiserror_no_std::Error;

pub const FRAME_LEN: usize = 32;
const START_1: u8 = 0x42;
const START_2: u8 = 0x4D;
const PAYLOAD_LEN: u16 = 28;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("Invalid frame length: {0}")]
    InvalidLength(u16),
    #[error("Checksum mismatch (expected {expected:#06x}, got {actual:#06x})")]
    Checksum { expected: u16, actual: u16 },
}

/// One decoded PMS5003T frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Frame {
    pub pm01_cf1: u16,
    pub pm25_cf1: u16,
    pub pm10_cf1: u16,
    pub pm01_ae: u16,
    pub pm25_ae: u16,
    pub pm10_ae: u16,
    pub count_03: u16,
    pub count_05: u16,
    pub count_10: u16,
    pub count_25: u16,
    /// Tenths of a degree Celsius.
    pub temperature_raw: i16,
    /// Tenths of a percent.
    pub humidity_raw: u16,
    pub firmware_version: u8,
    pub error_code: u8,
}

impl Frame {
    fn from_bytes(bytes: &[u8; FRAME_LEN]) -> Self {
        let word = |index: usize| {
            let offset = 4 + index * 2;
            u16::from_be_bytes([bytes[offset], bytes[offset + 1]])
        };

        Self {
            pm01_cf1: word(0),
            pm25_cf1: word(1),
            pm10_cf1: word(2),
            pm01_ae: word(3),
            pm25_ae: word(4),
            pm10_ae: word(5),
            count_03: word(6),
            count_05: word(7),
            count_10: word(8),
            count_25: word(9),
            temperature_raw: word(10) as i16,
            humidity_raw: word(11),
            firmware_version: bytes[28],
            error_code: bytes[29],
        }
    }
}

/// Streaming decoder fed one byte at a time from the UART.
#[derive(Debug, Default)]
pub struct FrameParser {
    buf: [u8; FRAME_LEN],
    len: usize,
}

impl FrameParser {
    pub const fn new() -> Self {
        Self {
            buf: [0; FRAME_LEN],
            len: 0,
        }
    }

    /// Drop any partially received frame.
    pub fn reset(&mut self) {
        self.len = 0;
    }

    /// Push one byte. Returns a result once a whole frame has been consumed.
    pub fn push(&mut self, byte: u8) -> Option<Result<Frame, FrameError>> {
        match self.len {
            0 => {
                if byte == START_1 {
                    self.store(byte);
                }
                None
            }
            1 => {
                if byte == START_2 {
                    self.store(byte);
                } else {
                    // A repeated 0x42 may itself be the real start byte.
                    self.len = 0;
                    if byte == START_1 {
                        self.store(byte);
                    }
                }
                None
            }
            3 => {
                self.store(byte);
                let length = u16::from_be_bytes([self.buf[2], self.buf[3]]);
                if length != PAYLOAD_LEN {
                    self.len = 0;
                    return Some(Err(FrameError::InvalidLength(length)));
                }
                None
            }
            _ => {
                self.store(byte);
                if self.len < FRAME_LEN {
                    return None;
                }
                self.len = 0;

                let expected = u16::from_be_bytes([self.buf[30], self.buf[31]]);
                let actual = checksum(&self.buf[..30]);
                if expected != actual {
                    return Some(Err(FrameError::Checksum { expected, actual }));
                }

                Some(Ok(Frame::from_bytes(&self.buf)))
            }
        }
    }

    fn store(&mut self, byte: u8) {
        self.buf[self.len] = byte;
        self.len += 1;
    }
}

fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |sum, &byte| sum.wrapping_add(byte as u16))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a well-formed frame from the thirteen data words.
    pub(crate) fn encode(words: [u16; 13]) -> [u8; FRAME_LEN] {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = START_1;
        bytes[1] = START_2;
        bytes[2..4].copy_from_slice(&PAYLOAD_LEN.to_be_bytes());
        for (i, word) in words.iter().enumerate() {
            bytes[4 + i * 2..6 + i * 2].copy_from_slice(&word.to_be_bytes());
        }
        let sum = checksum(&bytes[..30]);
        bytes[30..].copy_from_slice(&sum.to_be_bytes());
        bytes
    }

    pub(crate) const SAMPLE_WORDS: [u16; 13] = [
        8, 12, 15, 7, 11, 14, 1520, 430, 88, 9, 235, 512, 0x1A00,
    ];

    fn feed(parser: &mut FrameParser, bytes: &[u8]) -> Option<Result<Frame, FrameError>> {
        let mut last = None;
        for &byte in bytes {
            if let Some(result) = parser.push(byte) {
                last = Some(result);
            }
        }
        last
    }

    #[test]
    fn test_decode_frame() {
        let mut parser = FrameParser::new();
        let frame = feed(&mut parser, &encode(SAMPLE_WORDS)).unwrap().unwrap();

        assert_eq!(frame.pm01_ae, 7);
        assert_eq!(frame.pm25_ae, 11);
        assert_eq!(frame.pm10_ae, 14);
        assert_eq!(frame.count_03, 1520);
        assert_eq!(frame.temperature_raw, 235);
        assert_eq!(frame.humidity_raw, 512);
        assert_eq!(frame.firmware_version, 0x1A);
        assert_eq!(frame.error_code, 0);
    }

    #[test]
    fn test_negative_temperature() {
        let mut words = SAMPLE_WORDS;
        words[10] = (-52i16) as u16;

        let mut parser = FrameParser::new();
        let frame = feed(&mut parser, &encode(words)).unwrap().unwrap();

        assert_eq!(frame.temperature_raw, -52);
    }

    #[test]
    fn test_resync_after_garbage() {
        let mut stream = alloc::vec![0x00, 0x42, 0x42, 0x13, 0xFF];
        stream.extend_from_slice(&encode(SAMPLE_WORDS));

        let mut parser = FrameParser::new();
        let frame = feed(&mut parser, &stream).unwrap().unwrap();

        assert_eq!(frame.pm25_ae, 11);
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut bytes = encode(SAMPLE_WORDS);
        bytes[10] ^= 0x01;

        let mut parser = FrameParser::new();
        let result = feed(&mut parser, &bytes).unwrap();

        assert!(matches!(result, Err(FrameError::Checksum { .. })));

        // The parser recovers on the next good frame.
        let frame = feed(&mut parser, &encode(SAMPLE_WORDS)).unwrap();
        assert!(frame.is_ok());
    }

    #[test]
    fn test_invalid_length() {
        let mut parser = FrameParser::new();
        let result = feed(&mut parser, &[0x42, 0x4D, 0x00, 0x14]).unwrap();

        assert_eq!(result, Err(FrameError::InvalidLength(20)));
    }
}
