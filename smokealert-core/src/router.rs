//! Stream router: one source record in, one message per sensor stream out
//!
//! ## Fan-out
//!
//! ```text
//! record "12:00:00,300,225,180"
//!            │
//!            ├──→ 01-smoker   "12:00:00,300"
//!            ├──→ 02-food-A   "12:00:00,225"
//!            └──→ 03-food-B   "12:00:00,180"
//! ```
//!
//! Each column is parsed on its own. A blank or non-numeric cell drops only
//! that stream's message for the row; the other streams are unaffected and
//! no error escapes the router. A timestamp containing `,` drops the whole
//! row, since no consumer could split its payloads. Publishing in row order keeps every stream
//! ordered independently.
//!
//! The router is a batch job: it declares its streams, walks the source to
//! the end and returns its statistics.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use heapless::Vec as HVec;

use crate::constants::MAX_RECORD_FIELDS;
use crate::events::SensorStream;
use crate::reading::Reading;
use crate::stream::{Record, Stream, StreamError};
use crate::traits::DeliveryChannel;

/// Readings produced from one record, in stream order
pub type FanOut = HVec<(SensorStream, Reading), MAX_RECORD_FIELDS>;

/// Counters for one router run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RouterStats {
    /// Records pulled from the source
    pub records_read: usize,
    /// Messages handed to the delivery channel
    pub messages_published: usize,
    /// Values dropped as blank or non-numeric
    pub values_dropped: usize,
}

impl fmt::Display for RouterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records read, {} messages published, {} values dropped",
            self.records_read, self.messages_published, self.values_dropped
        )
    }
}

/// Failure that ends a router run
#[derive(Debug, Clone, PartialEq)]
pub enum RouteError<S, C> {
    /// Record source failed
    Source(StreamError<S>),
    /// Delivery channel failed
    Channel(C),
}

impl<S: fmt::Display, C: fmt::Display> fmt::Display for RouteError<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source(e) => write!(f, "source: {}", e),
            Self::Channel(e) => write!(f, "channel: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl<S: fmt::Debug + fmt::Display, C: fmt::Debug + fmt::Display> std::error::Error for RouteError<S, C> {}

/// Split one record into readings, skipping unusable values
pub fn fan_out(record: &Record, streams: &[SensorStream]) -> FanOut {
    let mut out = FanOut::new();

    for stream in streams {
        let raw = record.field(stream.field_index()).unwrap_or("");
        match Reading::from_field(record.timestamp(), raw) {
            Ok(reading) => {
                if out.push((*stream, reading)).is_err() {
                    break;
                }
            }
            Err(_e) => {
                log_debug!("{}: dropping value {:?} at {}: {}", stream, raw, record.timestamp(), _e);
            }
        }
    }

    out
}

/// Fans source records out to per-sensor streams
pub struct StreamRouter<C> {
    channel: C,
    streams: HVec<SensorStream, MAX_RECORD_FIELDS>,
    stats: RouterStats,
    #[cfg(feature = "std")]
    record_delay: Option<core::time::Duration>,
}

impl<C: DeliveryChannel> StreamRouter<C> {
    /// Router feeding all three sensor streams
    pub fn new(channel: C) -> Self {
        let mut streams = HVec::new();
        streams.extend(SensorStream::ALL);

        Self {
            channel,
            streams,
            stats: RouterStats::default(),
            #[cfg(feature = "std")]
            record_delay: None,
        }
    }

    /// Router feeding only the given streams
    pub fn with_streams(channel: C, streams: &[SensorStream]) -> Result<Self, StreamError<C::Error>> {
        let streams = HVec::from_slice(streams).map_err(|_| StreamError::Overflow)?;

        Ok(Self {
            channel,
            streams,
            stats: RouterStats::default(),
            #[cfg(feature = "std")]
            record_delay: None,
        })
    }

    /// Sleep between records while running
    #[cfg(feature = "std")]
    pub fn with_record_delay(mut self, delay: core::time::Duration) -> Self {
        self.record_delay = Some(delay).filter(|d| !d.is_zero());
        self
    }

    /// Declare every routed stream on the channel
    pub fn declare_streams(&mut self) -> Result<(), C::Error> {
        for stream in &self.streams {
            self.channel.declare(stream.queue_name())?;
        }
        log_info!("declared {} streams", self.streams.len());
        Ok(())
    }

    /// Publish one record, returning the number of messages sent
    pub fn route(&mut self, record: &Record) -> Result<usize, C::Error> {
        let readings = fan_out(record, &self.streams);

        self.stats.records_read += 1;
        self.stats.values_dropped += self.streams.len() - readings.len();

        for (stream, reading) in &readings {
            self.channel.publish(stream.queue_name(), &reading.to_payload())?;
            self.stats.messages_published += 1;
            log_debug!("sent {} to {}", reading, stream);
        }

        Ok(readings.len())
    }

    /// Declare streams, then route every record until the source ends
    pub fn run<S, E>(&mut self, source: &mut S) -> Result<RouterStats, RouteError<E, C::Error>>
    where
        S: Stream<Item = Record, Error = StreamError<E>>,
    {
        self.run_until(source, &AtomicBool::new(false))
    }

    /// Like [`run`](Self::run), but stop early once `stop` is set
    ///
    /// The flag is checked between records; a record already started is
    /// always published in full.
    pub fn run_until<S, E>(
        &mut self,
        source: &mut S,
        stop: &AtomicBool,
    ) -> Result<RouterStats, RouteError<E, C::Error>>
    where
        S: Stream<Item = Record, Error = StreamError<E>>,
    {
        self.declare_streams().map_err(RouteError::Channel)?;

        while !stop.load(Ordering::Relaxed) {
            match source.poll_next() {
                Ok(record) => {
                    self.route(&record).map_err(RouteError::Channel)?;
                    self.pace();
                }
                Err(nb::Error::WouldBlock) => core::hint::spin_loop(),
                Err(nb::Error::Other(StreamError::EndOfStream)) => break,
                Err(nb::Error::Other(e)) => return Err(RouteError::Source(e)),
            }
        }

        if stop.load(Ordering::Relaxed) {
            log_info!("routing stopped early: {}", self.stats);
            return Ok(self.stats);
        }

        log_info!("routing complete: {}", self.stats);
        Ok(self.stats)
    }

    #[cfg(feature = "std")]
    fn pace(&self) {
        if let Some(delay) = self.record_delay {
            std::thread::sleep(delay);
        }
    }

    #[cfg(not(feature = "std"))]
    fn pace(&self) {}

    /// Counters so far
    pub fn stats(&self) -> RouterStats {
        self.stats
    }

    /// Borrow the channel
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Give the channel back, e.g. to close it
    pub fn into_channel(self) -> C {
        self.channel
    }
}
