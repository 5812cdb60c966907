//! Framed Sentences and Sentence Kinds

use serde::{Deserialize, Serialize};

/// A framed sentence awaiting checksum verification and decoding
///
/// The payload is everything between the `$` start delimiter and the `*`
/// checksum delimiter, copied out of the byte stream by the framer. The
/// transmitted checksum is the value parsed from the two hex digits after
/// the `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSentence {
    /// Payload bytes (talker/kind token plus comma-separated fields)
    pub payload: Vec<u8>,
    /// Checksum transmitted by the receiver
    pub transmitted_checksum: u8,
}

impl CandidateSentence {
    /// Recompute the checksum as the XOR of all payload bytes
    pub fn computed_checksum(&self) -> u8 {
        self.payload.iter().fold(0, |acc, b| acc ^ b)
    }
}

/// Supported NMEA sentence kinds
///
/// This is a closed set: dispatch on the kind token is exhaustive, and
/// anything outside it decodes to `DecodeError::UnsupportedKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentenceKind {
    /// Global positioning fix data: position, satellites, HDOP, altitude
    Gga,
    /// Recommended minimum: position, speed, course, date and time
    Rmc,
    /// Track made good and ground speed
    Vtg,
}

impl SentenceKind {
    /// Parse a kind from the first comma-separated field of a sentence
    ///
    /// The token is a two-letter talker prefix (GP, GN, GL, ...) followed by
    /// the three-letter kind; only the kind letters matter here.
    pub fn from_token(token: &str) -> Option<Self> {
        if token.len() < 3 {
            return None;
        }
        match &token[token.len() - 3..] {
            "GGA" => Some(SentenceKind::Gga),
            "RMC" => Some(SentenceKind::Rmc),
            "VTG" => Some(SentenceKind::Vtg),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_token_accepts_any_talker() {
        assert_eq!(SentenceKind::from_token("GPGGA"), Some(SentenceKind::Gga));
        assert_eq!(SentenceKind::from_token("GNGGA"), Some(SentenceKind::Gga));
        assert_eq!(SentenceKind::from_token("GLRMC"), Some(SentenceKind::Rmc));
        assert_eq!(SentenceKind::from_token("GPVTG"), Some(SentenceKind::Vtg));
        assert_eq!(SentenceKind::from_token("GPGSV"), None);
        assert_eq!(SentenceKind::from_token("GG"), None);
    }

    #[test]
    fn test_computed_checksum_is_payload_xor() {
        let sentence = CandidateSentence {
            payload: b"GPGGA,123519".to_vec(),
            transmitted_checksum: 0x77,
        };
        assert_eq!(sentence.computed_checksum(), 0x77);
    }
}
