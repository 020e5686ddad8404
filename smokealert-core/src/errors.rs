//! Error Types for Ingestion and Delivery
//!
//! ## Error Categories
//!
//! Errors fall into two categories with very different handling:
//!
//! ### Payload Errors (recoverable)
//! - `NotUtf8`: Bytes on the wire are not text
//! - `MissingValue`: No `,value` part after the timestamp
//! - `InvalidNumber`: Value field does not parse as a number (empty, garbage)
//! - `NonFinite`: Value parsed but is `NaN` or infinite
//! - `SeparatorInTimestamp`: Timestamp contains `,` and would not survive the
//!   `timestamp,value` wire format
//!
//! A payload error means "this sample does not exist". The router skips the
//! field, the consumer acknowledges and drops the message. Payload errors
//! never reach a detector and never terminate a process.
//!
//! ### Channel Errors (fatal)
//! - `Closed`: Broker connection is gone
//! - `UnknownStream`: Stream was never declared
//! - `NotSubscribed`: Delivery requested before `subscribe`
//! - `InFlightLimit`: Consumer asked for more than it may hold
//! - `UnknownDelivery`: Ack for a tag this channel does not hold
//! - `Poisoned`: Broker state lock was poisoned by a panicking holder
//!
//! Channel errors end the affected process with a non-zero status.
//!
//! ```rust
//! use smokealert_core::{PayloadError, Reading};
//!
//! match Reading::from_payload(b"12:00:00,") {
//!     Ok(reading) => { /* hand to the detector */ }
//!     Err(PayloadError::InvalidNumber) => { /* sensor gap, drop it */ }
//!     Err(_) => { /* other malformed payload, drop it */ }
//! }
//! ```

use alloc::string::String;
use thiserror_no_std::Error;

/// Result type for payload parsing
pub type PayloadResult<T> = Result<T, PayloadError>;

/// Reasons a payload or source field is not a reading
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    /// Payload bytes are not valid UTF-8
    #[error("payload is not valid UTF-8")]
    NotUtf8,

    /// Payload has no value field after the timestamp
    #[error("payload has no value field")]
    MissingValue,

    /// Value field is empty or not a decimal number
    #[error("value field is not a number")]
    InvalidNumber,

    /// Value is NaN or infinite
    #[error("value is not a finite number")]
    NonFinite,

    /// Timestamp contains the payload separator
    #[error("timestamp contains the payload separator")]
    SeparatorInTimestamp,
}

/// Delivery channel failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Broker is shut down or the connection was lost
    #[error("channel closed")]
    Closed,

    /// Stream has not been declared on this broker
    #[error("stream {0} is not declared")]
    UnknownStream(String),

    /// `next_delivery` called before `subscribe`
    #[error("channel has no subscription")]
    NotSubscribed,

    /// Consumer already holds `limit` unacknowledged deliveries
    #[error("in-flight limit of {limit} reached")]
    InFlightLimit {
        /// Configured maximum of unacknowledged deliveries
        limit: usize,
    },

    /// Ack for a delivery tag that is not outstanding on this channel
    #[error("unknown delivery tag {0}")]
    UnknownDelivery(u64),

    /// Shared broker state was poisoned
    #[error("broker state poisoned")]
    Poisoned,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn payload_error_display() {
        assert_eq!(PayloadError::InvalidNumber.to_string(), "value field is not a number");
        assert_eq!(PayloadError::NonFinite.to_string(), "value is not a finite number");
    }

    #[test]
    fn channel_error_display() {
        let err = ChannelError::UnknownStream("01-smoker".into());
        assert_eq!(err.to_string(), "stream 01-smoker is not declared");
        assert_eq!(ChannelError::InFlightLimit { limit: 1 }.to_string(), "in-flight limit of 1 reached");
    }
}
