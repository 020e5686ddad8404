//! CSV file source for sensor records
//!
//! Reads the multi-column export of a smoker controller:
//!
//! ```csv
//! Time (UTC),Channel1 Smoker Temp,Channel2 Food A Temp,Channel3 Food B Temp
//! 03/23/2022 15:38:00,35,,
//! 03/23/2022 15:38:30,35,,
//! ```
//!
//! The first row is a header and is skipped. Rows may be short or have empty
//! cells; both are passed through as-is and handled per field by the router.
//! Rows that are not valid UTF-8 are skipped and counted; I/O failures end
//! the stream with a transport error.

use std::fs::File;
use std::io;
use std::path::Path;

use super::{Record, Stream, StreamError};

/// Statistics for CSV streaming
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CsvStreamStats {
    /// Data rows returned to the caller
    pub records_read: usize,
    /// Rows skipped because they could not be decoded
    pub parse_errors: usize,
}

/// CSV-backed record stream
///
/// ## Example
///
/// ```rust,no_run
/// use smokealert_core::stream::{CsvStream, Stream};
///
/// let mut stream = CsvStream::open("smoker-temps.csv")?;
/// while let Ok(record) = stream.poll_next() {
///     println!("{} fields at {}", record.len(), record.timestamp());
/// }
/// # Ok::<(), smokealert_core::stream::StreamError<csv::Error>>(())
/// ```
pub struct CsvStream<R = File> {
    reader: csv::Reader<R>,
    /// Reused row buffer
    row: csv::StringRecord,
    /// Whether the reader reported end of input
    eof: bool,
    stats: CsvStreamStats,
}

impl CsvStream<File> {
    /// Open a CSV file with a header row
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StreamError<csv::Error>> {
        let file = File::open(path).map_err(|e| StreamError::Transport(csv::Error::from(e)))?;
        Ok(Self::from_reader(file))
    }
}

impl<R: io::Read> CsvStream<R> {
    /// Stream from any reader; the first row is treated as a header
    pub fn from_reader(reader: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        Self {
            reader,
            row: csv::StringRecord::new(),
            eof: false,
            stats: CsvStreamStats::default(),
        }
    }

    /// Get statistics
    pub fn stats(&self) -> &CsvStreamStats {
        &self.stats
    }
}

impl<R: io::Read> Stream for CsvStream<R> {
    type Item = Record;
    type Error = StreamError<csv::Error>;

    fn poll_next(&mut self) -> nb::Result<Self::Item, Self::Error> {
        loop {
            if self.eof {
                return Err(nb::Error::Other(StreamError::EndOfStream));
            }

            match self.reader.read_record(&mut self.row) {
                Ok(true) => {
                    self.stats.records_read += 1;
                    return Ok(Record::new(self.row.iter()));
                }
                Ok(false) => self.eof = true,
                Err(e) if e.is_io_error() => {
                    return Err(nb::Error::Other(StreamError::Transport(e)));
                }
                Err(e) => {
                    self.stats.parse_errors += 1;
                    log_debug!("skipping undecodable CSV row: {}", e);
                }
            }
        }
    }
}
