//! Sentence Decoding and Field Extraction
//!
//! Verifies the transmitted checksum, dispatches on the sentence kind and
//! extracts the fields each kind supplies. A sentence whose receiver reports
//! no fix still decodes, but with its position-related fields left unset so
//! a stale position is never mistaken for a fresh one.

use crate::error::DecodeError;
use crate::sentence::{CandidateSentence, SentenceKind};
use crate::KNOTS_TO_KMH;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Fields supplied by a GGA sentence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GgaUpdate {
    /// Fix quality field was non-zero
    pub fix_valid: bool,
    /// Number of satellites in use
    pub satellites: Option<u32>,
    /// Horizontal dilution of precision
    pub hdop: Option<f64>,
    /// Latitude in signed decimal degrees
    pub latitude: Option<f64>,
    /// Longitude in signed decimal degrees
    pub longitude: Option<f64>,
    /// Altitude above mean sea level in meters
    pub altitude_m: Option<f64>,
}

/// Fields supplied by an RMC sentence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RmcUpdate {
    /// Status field was `A` (active)
    pub fix_valid: bool,
    /// UTC date and time of the fix
    pub datetime: Option<NaiveDateTime>,
    /// Latitude in signed decimal degrees
    pub latitude: Option<f64>,
    /// Longitude in signed decimal degrees
    pub longitude: Option<f64>,
    /// Ground speed in km/h (converted from knots)
    pub speed_kmh: Option<f64>,
    /// Course over ground in degrees true
    pub course_deg: Option<f64>,
}

/// Fields supplied by a VTG sentence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VtgUpdate {
    /// Course over ground in degrees true
    pub course_deg: Option<f64>,
    /// Ground speed in km/h
    pub speed_kmh: Option<f64>,
}

/// Decoded result of one sentence, tagged by kind
///
/// Each variant carries only the subset of fix fields its sentence kind
/// supplies; the aggregator merges them into the consolidated fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FixUpdate {
    Gga(GgaUpdate),
    Rmc(RmcUpdate),
    Vtg(VtgUpdate),
}

impl FixUpdate {
    /// The sentence kind this update was decoded from
    pub fn kind(&self) -> SentenceKind {
        match self {
            FixUpdate::Gga(_) => SentenceKind::Gga,
            FixUpdate::Rmc(_) => SentenceKind::Rmc,
            FixUpdate::Vtg(_) => SentenceKind::Vtg,
        }
    }
}

/// Decode a framed sentence into a typed fix update
pub fn decode(sentence: &CandidateSentence) -> Result<FixUpdate, DecodeError> {
    let computed = sentence.computed_checksum();
    if computed != sentence.transmitted_checksum {
        return Err(DecodeError::ChecksumMismatch {
            expected: computed,
            actual: sentence.transmitted_checksum,
        });
    }

    // Field extraction slices at byte offsets; the framer only lets
    // printable ASCII through, so anything else is not an NMEA sentence.
    if !sentence.payload.is_ascii() {
        return Err(DecodeError::UnsupportedKind(
            String::from_utf8_lossy(&sentence.payload).into_owned(),
        ));
    }
    let text = String::from_utf8_lossy(&sentence.payload);
    let fields: Vec<&str> = text.split(',').collect();

    let kind = SentenceKind::from_token(fields[0])
        .ok_or_else(|| DecodeError::UnsupportedKind(fields[0].to_string()))?;

    match kind {
        SentenceKind::Gga => decode_gga(&fields),
        SentenceKind::Rmc => decode_rmc(&fields),
        SentenceKind::Vtg => decode_vtg(&fields),
    }
}

/// GGA: `token,time,lat,N/S,lon,E/W,quality,sats,hdop,alt,M,...`
fn decode_gga(fields: &[&str]) -> Result<FixUpdate, DecodeError> {
    let kind = SentenceKind::Gga;
    check_field_count(kind, fields, 10)?;

    let quality = parse_u32(kind, fields, 6)?.unwrap_or(0);
    let fix_valid = quality > 0;
    let satellites = parse_u32(kind, fields, 7)?;
    let hdop = parse_f64(kind, fields, 8)?;

    let (latitude, longitude, altitude_m) = if fix_valid {
        (
            parse_angle(kind, fields, 2, 3, Axis::Latitude)?,
            parse_angle(kind, fields, 4, 5, Axis::Longitude)?,
            parse_f64(kind, fields, 9)?,
        )
    } else {
        (None, None, None)
    };

    Ok(FixUpdate::Gga(GgaUpdate {
        fix_valid,
        satellites,
        hdop,
        latitude,
        longitude,
        altitude_m,
    }))
}

/// RMC: `token,time,status,lat,N/S,lon,E/W,speed_kn,course,date,...`
fn decode_rmc(fields: &[&str]) -> Result<FixUpdate, DecodeError> {
    let kind = SentenceKind::Rmc;
    check_field_count(kind, fields, 10)?;

    let fix_valid = match fields[2] {
        "A" => true,
        "V" | "" => false,
        other => {
            return Err(field_error(kind, 2, format!("invalid status '{}'", other)));
        }
    };

    // Receivers report date and time even while the fix itself is invalid.
    let time = parse_time(kind, fields, 1)?;
    let date = parse_date(kind, fields, 9)?;
    let datetime = match (date, time) {
        (Some(d), Some(t)) => Some(NaiveDateTime::new(d, t)),
        _ => None,
    };

    let (latitude, longitude, speed_kmh, course_deg) = if fix_valid {
        (
            parse_angle(kind, fields, 3, 4, Axis::Latitude)?,
            parse_angle(kind, fields, 5, 6, Axis::Longitude)?,
            parse_f64(kind, fields, 7)?.map(|knots| knots * KNOTS_TO_KMH),
            parse_f64(kind, fields, 8)?,
        )
    } else {
        (None, None, None, None)
    };

    Ok(FixUpdate::Rmc(RmcUpdate {
        fix_valid,
        datetime,
        latitude,
        longitude,
        speed_kmh,
        course_deg,
    }))
}

/// VTG: `token,course_true,T,course_mag,M,speed_kn,N,speed_kmh,K`
fn decode_vtg(fields: &[&str]) -> Result<FixUpdate, DecodeError> {
    let kind = SentenceKind::Vtg;
    check_field_count(kind, fields, 8)?;

    let course_deg = parse_f64(kind, fields, 1)?;
    // Prefer the km/h field; older receivers only populate knots.
    let speed_kmh = match parse_f64(kind, fields, 7)? {
        Some(kmh) => Some(kmh),
        None => parse_f64(kind, fields, 5)?.map(|knots| knots * KNOTS_TO_KMH),
    };

    Ok(FixUpdate::Vtg(VtgUpdate {
        course_deg,
        speed_kmh,
    }))
}

#[derive(Clone, Copy)]
enum Axis {
    Latitude,
    Longitude,
}

fn check_field_count(
    kind: SentenceKind,
    fields: &[&str],
    minimum: usize,
) -> Result<(), DecodeError> {
    if fields.len() < minimum {
        return Err(field_error(
            kind,
            fields.len(),
            format!("expected at least {} fields, got {}", minimum, fields.len()),
        ));
    }
    Ok(())
}

fn field_error(kind: SentenceKind, index: usize, reason: String) -> DecodeError {
    DecodeError::FieldParse {
        kind,
        index,
        reason,
    }
}

/// Parse a decimal field; an empty field is absent, not an error
fn parse_f64(kind: SentenceKind, fields: &[&str], index: usize) -> Result<Option<f64>, DecodeError> {
    let raw = fields[index];
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|e| field_error(kind, index, format!("'{}': {}", raw, e)))
}

fn parse_u32(kind: SentenceKind, fields: &[&str], index: usize) -> Result<Option<u32>, DecodeError> {
    let raw = fields[index];
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u32>()
        .map(Some)
        .map_err(|e| field_error(kind, index, format!("'{}': {}", raw, e)))
}

/// Parse a `ddmm.mmmm` / `dddmm.mmmm` angle plus its hemisphere letter into
/// signed decimal degrees
fn parse_angle(
    kind: SentenceKind,
    fields: &[&str],
    value_index: usize,
    hemi_index: usize,
    axis: Axis,
) -> Result<Option<f64>, DecodeError> {
    let raw = fields[value_index];
    let hemi = fields[hemi_index];
    if raw.is_empty() || hemi.is_empty() {
        return Ok(None);
    }

    let degree_digits = match axis {
        Axis::Latitude => 2,
        Axis::Longitude => 3,
    };
    if raw.len() <= degree_digits {
        return Err(field_error(
            kind,
            value_index,
            format!("angle '{}' too short", raw),
        ));
    }

    let degrees: f64 = raw[..degree_digits]
        .parse()
        .map_err(|e| field_error(kind, value_index, format!("'{}': {}", raw, e)))?;
    let minutes: f64 = raw[degree_digits..]
        .parse()
        .map_err(|e| field_error(kind, value_index, format!("'{}': {}", raw, e)))?;

    let sign = match (axis, hemi) {
        (Axis::Latitude, "N") | (Axis::Longitude, "E") => 1.0,
        (Axis::Latitude, "S") | (Axis::Longitude, "W") => -1.0,
        _ => {
            return Err(field_error(
                kind,
                hemi_index,
                format!("invalid hemisphere '{}'", hemi),
            ));
        }
    };

    Ok(Some(sign * (degrees + minutes / 60.0)))
}

/// Parse an `hhmmss[.sss]` UTC time field (fraction ignored)
fn parse_time(
    kind: SentenceKind,
    fields: &[&str],
    index: usize,
) -> Result<Option<NaiveTime>, DecodeError> {
    let raw = fields[index];
    if raw.is_empty() {
        return Ok(None);
    }
    let digits = raw.split('.').next().unwrap_or(raw);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(field_error(kind, index, format!("invalid time '{}'", raw)));
    }
    let hour: u32 = digits[0..2].parse().unwrap_or(0);
    let minute: u32 = digits[2..4].parse().unwrap_or(0);
    let second: u32 = digits[4..6].parse().unwrap_or(0);
    NaiveTime::from_hms_opt(hour, minute, second)
        .map(Some)
        .ok_or_else(|| field_error(kind, index, format!("invalid time '{}'", raw)))
}

/// Parse a `ddmmyy` UTC date field
///
/// Two-digit years below 80 map into the 2000s; 80 and above into the 1900s.
fn parse_date(
    kind: SentenceKind,
    fields: &[&str],
    index: usize,
) -> Result<Option<NaiveDate>, DecodeError> {
    let raw = fields[index];
    if raw.is_empty() {
        return Ok(None);
    }
    if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(field_error(kind, index, format!("invalid date '{}'", raw)));
    }
    let day: u32 = raw[0..2].parse().unwrap_or(0);
    let month: u32 = raw[2..4].parse().unwrap_or(0);
    let yy: i32 = raw[4..6].parse().unwrap_or(0);
    let year = if yy < 80 { 2000 + yy } else { 1900 + yy };
    NaiveDate::from_ymd_opt(year, month, day)
        .map(Some)
        .ok_or_else(|| field_error(kind, index, format!("invalid date '{}'", raw)))
}
