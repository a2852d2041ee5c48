//! Facility → engine text frame codec.
//!
//! Wire format (one line, whitespace-separated ASCII tokens):
//! ```text
//!  1A72.34  B71.10  K0.10,0.20,9.90  U12.00
//!  │││      │       │                │
//!  ││└ value└ tag B └ tag K: X,Y,Z   └ tag U: pressure
//!  │└ tag A
//!  └ facility id (first token only)
//! ```
//!
//! | Tag | Channel              |
//! |-----|----------------------|
//! | `A` | thermocouple A       |
//! | `B` | thermocouple B       |
//! | `K` | acceleration X,Y,Z   |
//! | `U` | pressure             |
//!
//! Parsing is all-or-nothing: a single malformed value, or a tag given
//! twice, rejects the whole line. Tokens with an unknown tag are dropped and reported back in
//! [`ParsedFrame::untagged`] without failing the line.

use core::fmt::Write as _;

use chrono::NaiveDateTime;

use crate::error::ParseError;
use crate::sensors::{ChannelKind, Facility};

/// Decoded frame from one facility.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFrame {
    /// Facility that answered.
    pub facility: Facility,
    /// Wall-clock time captured at parse, shared by every value.
    pub at: NaiveDateTime,
    /// Indexed by [`ChannelKind::index`]; `None` when the tag was absent.
    pub values: [Option<f64>; ChannelKind::COUNT],
    /// Tokens dropped for lack of a valid tag.
    pub untagged: Vec<String>,
}

impl ParsedFrame {
    pub fn get(&self, kind: ChannelKind) -> Option<f64> {
        self.values[kind.index()]
    }

    /// Facility to address next: the complement of the responder.
    pub fn next_target(&self) -> Facility {
        self.facility.other()
    }

    /// `(kind, value)` for every tag present, in channel order.
    pub fn readings(&self) -> impl Iterator<Item = (ChannelKind, f64)> + '_ {
        ChannelKind::ALL
            .into_iter()
            .filter_map(|kind| self.get(kind).map(|v| (kind, v)))
    }
}

fn parse_value(text: &str, tag: char) -> Result<f64, ParseError> {
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError::MalformedValue { tag }),
    }
}

fn set_once(slot: &mut Option<f64>, value: f64, tag: char) -> Result<(), ParseError> {
    if slot.replace(value).is_some() {
        return Err(ParseError::DuplicateTag { tag });
    }
    Ok(())
}

/// Decode one received line addressed to `expected`.
///
/// # Errors
///
/// - [`ParseError::UnrecognizedFacility`] if the first token does not
///   start with a known facility id (including an empty line).
/// - [`ParseError::WrongFacility`] if a known facility other than
///   `expected` answered.
/// - [`ParseError::MalformedValue`] if any tagged value is not a finite
///   number, or a `K` token does not carry exactly three sub-values.
/// - [`ParseError::DuplicateTag`] if a tag appears more than once.
pub fn parse_frame(
    line: &str,
    expected: Facility,
    at: NaiveDateTime,
) -> Result<ParsedFrame, ParseError> {
    let mut tokens = line.split_whitespace();

    let first = tokens.next().ok_or(ParseError::UnrecognizedFacility)?;
    let mut chars = first.chars();
    let facility = chars
        .next()
        .and_then(Facility::from_id)
        .ok_or(ParseError::UnrecognizedFacility)?;
    if facility != expected {
        return Err(ParseError::WrongFacility {
            expected,
            got: facility,
        });
    }

    let mut frame = ParsedFrame {
        facility,
        at,
        values: [None; ChannelKind::COUNT],
        untagged: Vec::new(),
    };

    // The remainder of the first token is an ordinary tagged token.
    for token in core::iter::once(chars.as_str()).chain(tokens) {
        let mut chars = token.chars();
        let Some(tag) = chars.next() else {
            continue; // Bare facility id.
        };
        let body = chars.as_str();

        let values = &mut frame.values;
        match tag {
            'A' => set_once(&mut values[ChannelKind::TempA.index()], parse_value(body, tag)?, tag)?,
            'B' => set_once(&mut values[ChannelKind::TempB.index()], parse_value(body, tag)?, tag)?,
            'U' => {
                set_once(&mut values[ChannelKind::Pressure.index()], parse_value(body, tag)?, tag)?;
            }
            'K' => {
                let mut parts = body.split(',');
                let (Some(x), Some(y), Some(z), None) =
                    (parts.next(), parts.next(), parts.next(), parts.next())
                else {
                    return Err(ParseError::MalformedValue { tag });
                };
                let z = parse_value(z, tag)? + facility.z_offset();
                set_once(&mut values[ChannelKind::AccelX.index()], parse_value(x, tag)?, tag)?;
                set_once(&mut values[ChannelKind::AccelY.index()], parse_value(y, tag)?, tag)?;
                set_once(&mut values[ChannelKind::AccelZ.index()], z, tag)?;
            }
            _ => frame.untagged.push(token.to_string()),
        }
    }

    Ok(frame)
}

/// Calibrated values of one complete frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameValues {
    pub temp_a: f64,
    pub temp_b: f64,
    /// X, Y, Z after calibration (facility 1's Z already has gravity removed).
    pub accel: [f64; 3],
    pub pressure: f64,
}

/// Encode `values` the way `facility`'s controller would send them.
///
/// The facility's Z calibration is reversed, so that parsing the result
/// yields `values` again (to two decimals).
pub fn encode_frame(facility: Facility, values: &FrameValues) -> String {
    let raw_z = values.accel[2] - facility.z_offset();
    let mut line = String::with_capacity(48);
    // Writing into a String cannot fail.
    let _ = write!(
        line,
        "{}A{:.2} B{:.2} K{:.2},{:.2},{:.2} U{:.2}",
        facility.id() as char,
        values.temp_a,
        values.temp_b,
        values.accel[0],
        values.accel[1],
        raw_z,
        values.pressure,
    );
    line
}
