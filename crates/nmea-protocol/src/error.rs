//! NMEA Decode Error Types

use crate::sentence::SentenceKind;
use thiserror::Error;

/// Errors that can occur while decoding a framed sentence
///
/// All of these are per-sentence: the offending sentence is dropped and
/// decoding continues with the next one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Checksum mismatch
    #[error("Checksum mismatch: expected {expected:02X}, got {actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// Sentence kind token not in the supported set
    #[error("Unsupported sentence kind: {0}")]
    UnsupportedKind(String),

    /// Wrong field count or an unparsable field value
    #[error("Field parse error in {kind:?} sentence at field {index}: {reason}")]
    FieldParse {
        kind: SentenceKind,
        index: usize,
        reason: String,
    },
}
