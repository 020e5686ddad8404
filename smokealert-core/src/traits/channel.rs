//! Delivery channel contract
//!
//! A delivery channel is one connection to a message broker that keeps a
//! durable, ordered queue per stream. The router uses it as a producer
//! (`declare` + `publish`), a detector process uses it as a consumer
//! (`declare` + `subscribe` + `next_delivery` + `ack`).
//!
//! ## Delivery Guarantees Expected
//!
//! - **Ordered**: deliveries on one stream arrive in publish order
//! - **At-least-once**: a delivery that is never acked comes back, flagged
//!   `redelivered`, once the holding channel closes
//! - **Bounded in flight**: a subscriber never holds more than
//!   `max_in_flight` unacked deliveries
//! - **Opaque payloads**: the channel never inspects or rejects payload
//!   bytes, garbage included
//!
//! ## Consumer Loop Shape
//!
//! ```text
//! subscribe(stream, 1)
//! loop {
//!     next_delivery(wait) ── WouldBlock ──→ check stop signal, loop
//!          │
//!          ↓ Delivery
//!     process payload (parse, detect, emit)
//!          ↓
//!     ack(tag)
//! }
//! close()
//! ```

use alloc::string::String;
use alloc::vec::Vec;
use core::time::Duration;

/// Per-channel identifier of one delivery, used to ack it
pub type DeliveryTag = u64;

/// One message handed to a consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Tag to pass back to `ack`
    pub tag: DeliveryTag,
    /// Stream the message was published to
    pub stream: String,
    /// Raw payload bytes, expected to be `timestamp,value`
    pub payload: Vec<u8>,
    /// True if this message was delivered before and never acked
    pub redelivered: bool,
}

/// Durable per-stream queue with manual acknowledgment
pub trait DeliveryChannel {
    /// Transport error type
    type Error;

    /// Make sure a durable queue for `stream` exists
    ///
    /// Idempotent; both producers and consumers declare before use.
    fn declare(&mut self, stream: &str) -> Result<(), Self::Error>;

    /// Append a payload to a stream's queue
    fn publish(&mut self, stream: &str, payload: &[u8]) -> Result<(), Self::Error>;

    /// Start consuming `stream`, holding at most `max_in_flight` unacked
    /// deliveries
    fn subscribe(&mut self, stream: &str, max_in_flight: usize) -> Result<(), Self::Error>;

    /// Wait up to `wait` for the next delivery
    ///
    /// Returns `WouldBlock` if nothing arrived in time. That is not an
    /// error; callers loop.
    fn next_delivery(&mut self, wait: Duration) -> nb::Result<Delivery, Self::Error>;

    /// Acknowledge a delivery so it is never redelivered
    fn ack(&mut self, tag: DeliveryTag) -> Result<(), Self::Error>;

    /// Release the connection
    ///
    /// Unacked deliveries go back to their queues.
    fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
