//! Readings and the `timestamp,value` wire format
//!
//! A reading is one timestamped temperature sample on one sensor stream.
//! On the wire it travels as UTF-8 text, `"<timestamp>,<value>"`.
//!
//! Parsing is shared by both ends of a channel: the router uses
//! [`parse_value`] on raw source fields and consumers use
//! [`Reading::from_payload`] on delivered messages. Both apply the same
//! numeric rules, so a malformed value is dropped exactly once, wherever it
//! first shows up:
//!
//! - surrounding whitespace is ignored
//! - empty, non-numeric and non-finite values (`NaN`, `inf`) are rejected
//! - fields after the value are ignored
//!
//! Timestamps are opaque text, except that they may not contain the
//! separator. [`Reading::from_field`] rejects those up front, since the
//! consumer would split the payload inside the timestamp.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::constants::PAYLOAD_SEPARATOR;
use crate::errors::{PayloadError, PayloadResult};

/// One timestamped sample
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    /// Source timestamp, carried as text
    pub timestamp: String,
    /// Temperature value, always finite
    pub value: f64,
}

impl Reading {
    /// Create a reading
    pub fn new(timestamp: impl Into<String>, value: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            value,
        }
    }

    /// Build a reading from a raw source value
    ///
    /// Returns an error when `raw_value` is not a usable number; callers treat
    /// that as a gap in the sensor data. A timestamp holding the separator is
    /// rejected as well, because its payload would not parse back.
    pub fn from_field(timestamp: &str, raw_value: &str) -> PayloadResult<Self> {
        if timestamp.contains(PAYLOAD_SEPARATOR) {
            return Err(PayloadError::SeparatorInTimestamp);
        }
        Ok(Self::new(timestamp, parse_value(raw_value)?))
    }

    /// Parse a `timestamp,value` payload
    ///
    /// ```rust
    /// use smokealert_core::{PayloadError, Reading};
    ///
    /// let reading = Reading::from_payload(b"12:00:00, 225.5").unwrap();
    /// assert_eq!(reading.timestamp, "12:00:00");
    /// assert_eq!(reading.value, 225.5);
    ///
    /// assert_eq!(Reading::from_payload(b"12:00:00,"), Err(PayloadError::InvalidNumber));
    /// assert_eq!(Reading::from_payload(b"12:00:00"), Err(PayloadError::MissingValue));
    /// ```
    pub fn from_payload(payload: &[u8]) -> PayloadResult<Self> {
        let text = core::str::from_utf8(payload).map_err(|_| PayloadError::NotUtf8)?;

        let mut fields = text.split(PAYLOAD_SEPARATOR);
        let timestamp = fields.next().unwrap_or_default();
        let raw_value = fields.next().ok_or(PayloadError::MissingValue)?;

        Self::from_field(timestamp, raw_value)
    }

    /// Render the wire payload, `timestamp,value`
    ///
    /// Whole numbers render without a fractional part (`300.0` → `"300"`).
    pub fn to_payload(&self) -> Vec<u8> {
        format!("{}{}{}", self.timestamp, PAYLOAD_SEPARATOR, self.value).into_bytes()
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.timestamp, PAYLOAD_SEPARATOR, self.value)
    }
}

/// Parse one raw value field into a finite `f64`
pub fn parse_value(raw: &str) -> PayloadResult<f64> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| PayloadError::InvalidNumber)?;

    if !value.is_finite() {
        return Err(PayloadError::NonFinite);
    }

    Ok(value)
}
