//! Per-stream consumer: deliveries in, alerts out
//!
//! A consumer owns one detector and one sink and drives them from one
//! subscription. For every delivery it:
//!
//! 1. parses the payload as `timestamp,value`
//! 2. feeds a valid reading to the detector (malformed payloads skip this)
//! 3. emits any alert to the sink
//! 4. acks the delivery
//!
//! Malformed payloads are acknowledged too: they would fail the same way on
//! every redelivery, so holding them back would only wedge the stream.
//!
//! The loop waits for deliveries in short slices and checks the stop flag in
//! between, so an interrupt ends it cleanly. Any channel error ends it with
//! [`StreamError::Transport`].

use alloc::string::String;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use crate::constants::{DEFAULT_POLL_INTERVAL_MS, MAX_IN_FLIGHT};
use crate::detector::AlertDetector;
use crate::events::AlertEvent;
use crate::reading::Reading;
use crate::sink::AlertSink;
use crate::stream::StreamError;
use crate::traits::DeliveryChannel;

/// Counters for one consumer
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Deliveries processed
    pub received: usize,
    /// Deliveries whose payload was not a reading
    pub malformed: usize,
    /// Alerts emitted
    pub alerts: usize,
    /// Deliveries acknowledged
    pub acknowledged: usize,
}

impl fmt::Display for ConsumerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} received, {} malformed, {} alerts, {} acknowledged",
            self.received, self.malformed, self.alerts, self.acknowledged
        )
    }
}

/// Drives one detector from one stream subscription
pub struct StreamConsumer<D, K> {
    stream: String,
    detector: D,
    sink: K,
    poll_interval: Duration,
    stats: ConsumerStats,
}

impl<D: AlertDetector, K: AlertSink> StreamConsumer<D, K> {
    /// Create a consumer for `stream`
    pub fn new(stream: impl Into<String>, detector: D, sink: K) -> Self {
        Self {
            stream: stream.into(),
            detector,
            sink,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            stats: ConsumerStats::default(),
        }
    }

    /// How long each wait for a delivery lasts before the stop flag is
    /// checked again
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Handle one payload: parse, detect, emit
    ///
    /// Returns the alert raised, if any. A malformed payload is counted and
    /// otherwise ignored; it never reaches the detector.
    pub fn process(&mut self, payload: &[u8]) -> Option<AlertEvent> {
        self.stats.received += 1;

        let reading = match Reading::from_payload(payload) {
            Ok(reading) => reading,
            Err(_e) => {
                self.stats.malformed += 1;
                log_debug!(
                    "{}: dropping malformed payload {:?}: {}",
                    self.stream,
                    String::from_utf8_lossy(payload),
                    _e
                );
                return None;
            }
        };

        let alert = self.detector.on_reading(&reading)?;
        self.sink.emit(&alert);
        self.stats.alerts += 1;
        Some(alert)
    }

    /// Subscribe and process deliveries until `stop` is set
    ///
    /// Holds at most one unacked delivery. Returns the final counters on a
    /// clean stop, or the first channel error.
    pub fn run<C: DeliveryChannel>(
        &mut self,
        channel: &mut C,
        stop: &AtomicBool,
    ) -> Result<ConsumerStats, StreamError<C::Error>> {
        channel.declare(&self.stream).map_err(StreamError::Transport)?;
        channel
            .subscribe(&self.stream, MAX_IN_FLIGHT)
            .map_err(StreamError::Transport)?;
        log_info!("{}: waiting for readings", self.stream);

        while !stop.load(Ordering::Relaxed) {
            let delivery = match channel.next_delivery(self.poll_interval) {
                Ok(delivery) => delivery,
                Err(nb::Error::WouldBlock) => continue,
                Err(nb::Error::Other(e)) => return Err(StreamError::Transport(e)),
            };

            if delivery.redelivered {
                log_debug!("{}: redelivery of tag {}", self.stream, delivery.tag);
            }

            self.process(&delivery.payload);

            channel.ack(delivery.tag).map_err(StreamError::Transport)?;
            self.stats.acknowledged += 1;
        }

        channel.close().map_err(StreamError::Transport)?;
        log_info!("{}: stopped, {}", self.stream, self.stats);
        Ok(self.stats)
    }

    /// Stream this consumer reads
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Detector in use
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Sink in use
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Counters so far
    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    /// Take the detector and sink back
    pub fn into_parts(self) -> (D, K) {
        (self.detector, self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{DropDetector, StallDetector};
    use crate::events::SensorStream;
    use alloc::format;
    use alloc::vec::Vec;

    #[test]
    fn process_raises_smoker_alert() {
        let mut consumer = StreamConsumer::new("01-smoker", DropDetector::smoker(), Vec::new());

        let payloads: [&[u8]; 5] = [b"t1,320", b"t2,315", b"t3,310", b"t4,306", b"t5,300"];
        let mut alerts = payloads.iter().filter_map(|p| consumer.process(p));

        let alert = alerts.next().unwrap();
        assert_eq!(alert.timestamp, "t5");
        assert!(alert.message.starts_with("Smoker alert!"));
        assert!(alerts.next().is_none());
        drop(alerts);

        assert_eq!(consumer.sink().len(), 1);
        assert_eq!(consumer.stats().alerts, 1);
    }

    #[test]
    fn malformed_payload_skips_detector() {
        let mut consumer =
            StreamConsumer::new("02-food-A", StallDetector::food(SensorStream::FoodA), Vec::new());

        assert!(consumer.process(b"12:00:00,").is_none());
        assert!(consumer.process(b"12:00:00,NaN").is_none());
        assert!(consumer.process(&[0xff, 0xfe]).is_none());
        assert!(consumer.process(b"no-comma").is_none());

        assert!(consumer.detector().window().is_empty());
        assert_eq!(consumer.stats().received, 4);
        assert_eq!(consumer.stats().malformed, 4);
    }

    #[test]
    fn stats_display() {
        let stats = ConsumerStats {
            received: 7,
            malformed: 1,
            alerts: 2,
            acknowledged: 7,
        };
        assert_eq!(format!("{}", stats), "7 received, 1 malformed, 2 alerts, 7 acknowledged");
    }
}
