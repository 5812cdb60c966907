//! Sentence Framer State Machine
//!
//! Scans the raw byte stream for `$...*hh\r\n` frames. Anything that violates
//! the expected byte class at the current state drops the partial sentence and
//! resets to idle; the framer itself never fails.

use crate::framing;
use crate::sentence::CandidateSentence;
use tracing::trace;

/// Maximum payload length in bytes
///
/// NMEA 0183 caps a full sentence at 82 bytes including the `$`, the `*hh`
/// checksum field and the CRLF terminator.
pub const MAX_PAYLOAD_LEN: usize = 79;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    InSentence,
    ChecksumHi,
    ChecksumLo { hi: u8 },
    AwaitCr { checksum: u8 },
    AwaitLf { checksum: u8 },
}

/// Byte-at-a-time sentence framer
pub struct Framer {
    state: State,
    payload: Vec<u8>,
    malformed: u64,
    oversize: u64,
}

impl Framer {
    /// Create a framer in the idle state
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            payload: Vec::with_capacity(MAX_PAYLOAD_LEN),
            malformed: 0,
            oversize: 0,
        }
    }

    /// Feed one byte; returns a framed sentence when one completes
    ///
    /// At most one sentence is produced per byte (on the terminating LF).
    pub fn push_byte(&mut self, byte: u8) -> Option<CandidateSentence> {
        // A start delimiter always begins a fresh sentence, wherever we are.
        if byte == framing::START {
            if !matches!(self.state, State::Idle) {
                trace!("start delimiter inside frame, dropping partial sentence");
                self.malformed += 1;
            }
            self.payload.clear();
            self.state = State::InSentence;
            return None;
        }

        match self.state {
            State::Idle => None,
            State::InSentence => {
                if byte == framing::CHECKSUM {
                    self.state = State::ChecksumHi;
                } else if is_payload_byte(byte) {
                    if self.payload.len() >= MAX_PAYLOAD_LEN {
                        trace!("payload exceeds {} bytes, dropping frame", MAX_PAYLOAD_LEN);
                        self.oversize += 1;
                        self.reset();
                    } else {
                        self.payload.push(byte);
                    }
                } else {
                    self.drop_malformed();
                }
                None
            }
            State::ChecksumHi => {
                match hex_value(byte) {
                    Some(hi) => self.state = State::ChecksumLo { hi },
                    None => self.drop_malformed(),
                }
                None
            }
            State::ChecksumLo { hi } => {
                match hex_value(byte) {
                    Some(lo) => {
                        self.state = State::AwaitCr {
                            checksum: (hi << 4) | lo,
                        }
                    }
                    None => self.drop_malformed(),
                }
                None
            }
            State::AwaitCr { checksum } => {
                if byte == framing::CR {
                    self.state = State::AwaitLf { checksum };
                } else {
                    self.drop_malformed();
                }
                None
            }
            State::AwaitLf { checksum } => {
                if byte == framing::LF {
                    self.state = State::Idle;
                    Some(CandidateSentence {
                        payload: std::mem::take(&mut self.payload),
                        transmitted_checksum: checksum,
                    })
                } else {
                    self.drop_malformed();
                    None
                }
            }
        }
    }

    /// Feed a run of bytes, collecting every completed sentence
    pub fn feed(&mut self, bytes: impl IntoIterator<Item = u8>) -> Vec<CandidateSentence> {
        bytes
            .into_iter()
            .filter_map(|b| self.push_byte(b))
            .collect()
    }

    /// Frames dropped because a byte violated the expected class
    pub fn malformed_count(&self) -> u64 {
        self.malformed
    }

    /// Frames dropped because the payload exceeded [`MAX_PAYLOAD_LEN`]
    pub fn oversize_count(&self) -> u64 {
        self.oversize
    }

    fn drop_malformed(&mut self) {
        self.malformed += 1;
        self.reset();
    }

    fn reset(&mut self) {
        self.payload.clear();
        self.state = State::Idle;
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload bytes are printable ASCII, minus the two delimiters
fn is_payload_byte(byte: u8) -> bool {
    (0x20..=0x7e).contains(&byte) && byte != framing::START && byte != framing::CHECKSUM
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}
