//! Record sources for the stream router
//!
//! ## Module Organization
//!
//! - Core record type and errors (this file)
//! - `memory` - In-memory source for tests and demos
//! - `file` - CSV file source (requires `std`)

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

#[cfg(feature = "stream-memory")]
pub mod memory;

#[cfg(feature = "stream-file")]
pub mod file;

#[cfg(feature = "stream-memory")]
pub use memory::MemoryStream;

#[cfg(feature = "stream-file")]
pub use file::{CsvStream, CsvStreamStats};

pub use crate::traits::Stream;

/// Errors that can occur while reading records or moving messages
#[derive(Debug, Clone, PartialEq)]
pub enum StreamError<E> {
    /// Transport-level error (I/O, broker connection)
    Transport(E),
    /// End of stream reached
    EndOfStream,
    /// Record has more fields than can be routed
    Overflow,
}

impl<E: fmt::Display> fmt::Display for StreamError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Transport error: {}", e),
            Self::EndOfStream => write!(f, "End of stream"),
            Self::Overflow => write!(f, "Record overflow"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug + fmt::Display> std::error::Error for StreamError<E> {}

/// One source row: a timestamp followed by positional sensor values
///
/// Values are kept as raw text; parsing happens per field in the router so
/// one bad column never spoils the others.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    fields: Vec<String>,
}

impl Record {
    /// Build a record from its fields
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a comma-delimited line into a record
    ///
    /// No quoting rules; use the CSV source for quoted files.
    pub fn from_line(line: &str) -> Self {
        Self::new(line.split(',').map(|field| field.trim_end_matches('\r').to_string()))
    }

    /// Timestamp column, empty if the record has no fields
    pub fn timestamp(&self) -> &str {
        self.fields.first().map(String::as_str).unwrap_or("")
    }

    /// Field by column index
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Number of fields, timestamp included
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the record has no fields at all
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn stream_error_display() {
        let err: StreamError<&str> = StreamError::Transport("connection lost");
        assert_eq!(format!("{}", err), "Transport error: connection lost");

        let err: StreamError<&str> = StreamError::EndOfStream;
        assert_eq!(format!("{}", err), "End of stream");
    }

    #[test]
    fn record_from_line() {
        let record = Record::from_line("12:00:00,300,,180\r");
        assert_eq!(record.len(), 4);
        assert_eq!(record.timestamp(), "12:00:00");
        assert_eq!(record.field(1), Some("300"));
        assert_eq!(record.field(2), Some(""));
        assert_eq!(record.field(3), Some("180"));
        assert_eq!(record.field(4), None);
    }

    #[test]
    fn empty_record() {
        let record = Record::default();
        assert!(record.is_empty());
        assert_eq!(record.timestamp(), "");
    }
}
