//! Memory-based record source for testing and replay
//!
//! Feeds known rows to the router without touching the filesystem:
//! - Unit and integration tests
//! - Replaying a captured cook in-process
//! - Demos with synthetic data

use super::{Record, Stream, StreamError};

/// Memory-based record source over comma-delimited lines
///
/// Unlike the CSV source, no header row is skipped; pass only data rows.
///
/// ## Example
///
/// ```rust
/// use smokealert_core::stream::{MemoryStream, Stream};
///
/// let lines = ["12:00:00,300,225,180", "12:00:30,298,225,181"];
/// let mut stream = MemoryStream::new(&lines);
///
/// while let Ok(record) = stream.poll_next() {
///     assert_eq!(record.len(), 4);
/// }
/// ```
pub struct MemoryStream<'a> {
    /// Lines to stream
    lines: &'a [&'a str],
    /// Current position
    position: usize,
}

impl<'a> MemoryStream<'a> {
    /// Create new memory stream from slice
    pub fn new(lines: &'a [&'a str]) -> Self {
        Self { lines, position: 0 }
    }

    /// Reset to beginning
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Get current position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Check if stream is exhausted
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.lines.len()
    }
}

impl<'a> Stream for MemoryStream<'a> {
    type Item = Record;
    type Error = StreamError<()>;

    fn poll_next(&mut self) -> nb::Result<Self::Item, Self::Error> {
        let line = self
            .lines
            .get(self.position)
            .ok_or(nb::Error::Other(StreamError::EndOfStream))?;

        self.position += 1;
        Ok(Record::from_line(line))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.lines.len() - self.position;
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_stream_basic() {
        let lines = ["12:00:00,300,225,180", "12:00:30,298,,181"];
        let mut stream = MemoryStream::new(&lines);

        assert_eq!(stream.size_hint(), (2, Some(2)));

        let first = stream.poll_next().unwrap();
        assert_eq!(first.timestamp(), "12:00:00");
        assert_eq!(first.field(1), Some("300"));

        assert_eq!(stream.size_hint(), (1, Some(1)));

        let second = stream.poll_next().unwrap();
        assert_eq!(second.field(2), Some(""));

        assert!(stream.is_exhausted());
        assert!(matches!(stream.poll_next(), Err(nb::Error::Other(StreamError::EndOfStream))));
        // sticky
        assert!(matches!(stream.poll_next(), Err(nb::Error::Other(StreamError::EndOfStream))));
    }

    #[test]
    fn memory_stream_reset() {
        let lines = ["a,1"];
        let mut stream = MemoryStream::new(&lines);
        stream.poll_next().unwrap();
        assert_eq!(stream.position(), 1);

        stream.reset();
        assert_eq!(stream.position(), 0);
        assert!(stream.poll_next().is_ok());
    }
}
