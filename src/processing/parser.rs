//! Line codec for the accelerometer event protocol
//!
//! One event per line: an optional label, a colon, then comma-separated
//! values in `x,y,z` order. `accel:12.5,-3,0.2` and `12.5,-3,0.2` are both
//! valid. Values past the third one are kept but do not take part in the
//! 3-axis sample.

use thiserror::Error;

/// Number of values a line must carry
pub const AXES: usize = 3;

const LABEL_SEPARATOR: char = ':';
const VALUE_SEPARATOR: char = ',';

/// Errors that can occur while decoding a protocol line
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("empty line")]
    Empty,
    #[error("expected at least {required} values, got {available}")]
    MissingValues { required: usize, available: usize },
    #[error("field {field} is not a number: {token:?}")]
    InvalidNumber { field: usize, token: String },
    #[error("field {field} is not finite")]
    NonFinite { field: usize },
}

/// Decoded sensor event.
///
/// Only [`parse_line`] builds one, so at least three values are present.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorEvent {
    label: Option<String>,
    values: Vec<f32>,
}

impl SensorEvent {
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// All values in line order, the three axes first
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn x(&self) -> f32 {
        self.values[0]
    }

    pub fn y(&self) -> f32 {
        self.values[1]
    }

    pub fn z(&self) -> f32 {
        self.values[2]
    }
}

/// Parse one protocol line
pub fn parse_line(line: &str) -> Result<SensorEvent, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    let (label, body) = match line.rsplit_once(LABEL_SEPARATOR) {
        Some((label, body)) => {
            let label = label.trim();
            (if label.is_empty() { None } else { Some(label.to_string()) }, body)
        }
        None => (None, line),
    };

    let mut values = Vec::with_capacity(AXES);
    for (field, token) in body.split(VALUE_SEPARATOR).enumerate() {
        let token = token.trim();
        let value: f32 = token.parse().map_err(|_| ParseError::InvalidNumber {
            field,
            token: token.to_string(),
        })?;
        if !value.is_finite() {
            return Err(ParseError::NonFinite { field });
        }
        values.push(value);
    }

    if values.len() < AXES {
        return Err(ParseError::MissingValues {
            required: AXES,
            available: values.len(),
        });
    }

    Ok(SensorEvent { label, values })
}

/// Decode a line, yielding `None` for anything malformed
pub fn decode_line(line: &str) -> Option<SensorEvent> {
    parse_line(line).ok()
}

/// Serialize an event into one protocol line (without the line break)
pub fn encode_line(label: Option<&str>, values: &[f32]) -> String {
    let body = values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");
    match label {
        Some(label) => format!("{}{}{}", label, LABEL_SEPARATOR, body),
        None => body,
    }
}
