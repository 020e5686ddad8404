//! In-process broker with durable queues and manual acknowledgment
//!
//! ## Overview
//!
//! [`MemoryBroker`] holds one FIFO queue per declared stream. Every
//! [`MemoryChannel`] opened on it behaves like one broker connection:
//!
//! ```text
//!            MemoryBroker (Arc<Mutex<state>> + Condvar)
//!   ┌────────────────────────────────────────────────────┐
//!   │ 01-smoker  [m5 m6 m7]          in flight: 1        │
//!   │ 02-food-A  [m3 m4]             in flight: 0        │
//!   │ 03-food-B  []                  in flight: 0        │
//!   └────────────────────────────────────────────────────┘
//!        ↑ publish                 ↓ next_delivery / ack
//!   router channel           smoker consumer channel
//! ```
//!
//! ## Semantics
//!
//! - Queues outlive channels: a consumer can disconnect and reconnect
//!   without losing undelivered messages, for as long as the broker lives.
//! - Deliveries come out in publish order.
//! - A delivery stays owned by its channel until acked. Closing or dropping
//!   the channel puts unacked deliveries back at the head of the queue they
//!   came from, flagged as redelivered, even if the channel has since
//!   subscribed elsewhere.
//! - `max_in_flight` bounds unacked deliveries per channel; `0` means
//!   unbounded.
//! - [`MemoryBroker::shutdown`] simulates losing the broker: every channel
//!   operation fails with [`ChannelError::Closed`] afterwards.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crate::errors::ChannelError;
use crate::traits::{Delivery, DeliveryChannel, DeliveryTag};

#[derive(Debug, Clone)]
struct Message {
    payload: Vec<u8>,
    redelivered: bool,
}

/// A delivery owned by a channel, remembered with the queue it came from
#[derive(Debug)]
struct Held {
    tag: DeliveryTag,
    stream: String,
    message: Message,
}

#[derive(Debug, Default)]
struct Queue {
    ready: VecDeque<Message>,
    in_flight: usize,
}

#[derive(Debug, Default)]
struct BrokerState {
    queues: HashMap<String, Queue>,
    closed: bool,
}

impl BrokerState {
    fn is_drained(&self) -> bool {
        self.queues
            .values()
            .all(|queue| queue.ready.is_empty() && queue.in_flight == 0)
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<BrokerState>,
    /// Signalled on publish, ack, requeue and shutdown
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, BrokerState>, ChannelError> {
        self.state.lock().map_err(|_| ChannelError::Poisoned)
    }
}

/// Shared in-process broker
///
/// Cloning gives another handle to the same queues.
///
/// ```rust
/// use std::time::Duration;
/// use smokealert_core::{DeliveryChannel, MemoryBroker};
///
/// let broker = MemoryBroker::new();
///
/// let mut producer = broker.channel();
/// producer.declare("01-smoker").unwrap();
/// producer.publish("01-smoker", b"12:00:00,300").unwrap();
///
/// let mut consumer = broker.channel();
/// consumer.subscribe("01-smoker", 1).unwrap();
/// let delivery = consumer.next_delivery(Duration::from_millis(10)).unwrap();
/// assert_eq!(delivery.payload, b"12:00:00,300");
/// consumer.ack(delivery.tag).unwrap();
///
/// assert!(broker.is_drained());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    shared: Arc<Shared>,
}

impl MemoryBroker {
    /// Create a broker with no queues
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new connection to the broker
    pub fn channel(&self) -> MemoryChannel {
        MemoryChannel {
            shared: Arc::clone(&self.shared),
            subscription: None,
            unacked: Vec::new(),
            next_tag: 1,
            closed: false,
        }
    }

    /// Messages waiting for delivery on a stream, `None` if undeclared
    pub fn queue_len(&self, stream: &str) -> Option<usize> {
        let state = self.shared.lock().ok()?;
        state.queues.get(stream).map(|queue| queue.ready.len())
    }

    /// Delivered but unacked messages on a stream, `None` if undeclared
    pub fn in_flight(&self, stream: &str) -> Option<usize> {
        let state = self.shared.lock().ok()?;
        state.queues.get(stream).map(|queue| queue.in_flight)
    }

    /// True when every queue is empty and nothing is in flight
    pub fn is_drained(&self) -> bool {
        self.shared
            .lock()
            .map(|state| state.is_drained())
            .unwrap_or(false)
    }

    /// Block until drained or `timeout` elapses; returns the final state
    pub fn wait_drained(&self, timeout: Duration) -> Result<bool, ChannelError> {
        let guard = self.shared.lock()?;
        let (guard, _) = self
            .shared
            .changed
            .wait_timeout_while(guard, timeout, |state| !state.closed && !state.is_drained())
            .map_err(|_| ChannelError::Poisoned)?;
        Ok(guard.is_drained())
    }

    /// Remove a queue and everything waiting in it
    ///
    /// Returns false if the stream was never declared.
    pub fn delete_queue(&self, stream: &str) -> Result<bool, ChannelError> {
        let mut state = self.shared.lock()?;
        let removed = state.queues.remove(stream).is_some();
        self.shared.changed.notify_all();
        Ok(removed)
    }

    /// Take the broker down; all channels fail from now on
    pub fn shutdown(&self) {
        if let Ok(mut state) = self.shared.lock() {
            state.closed = true;
        }
        self.shared.changed.notify_all();
    }
}

#[derive(Debug, Clone)]
struct Subscription {
    stream: String,
    max_in_flight: usize,
}

/// One connection to a [`MemoryBroker`]
///
/// Holds at most one subscription. Dropping the channel closes it.
#[derive(Debug)]
pub struct MemoryChannel {
    shared: Arc<Shared>,
    subscription: Option<Subscription>,
    unacked: Vec<Held>,
    next_tag: DeliveryTag,
    closed: bool,
}

impl MemoryChannel {
    fn state(&self) -> Result<MutexGuard<'_, BrokerState>, ChannelError> {
        if self.closed {
            return Err(ChannelError::Closed);
        }
        let state = self.shared.lock()?;
        if state.closed {
            return Err(ChannelError::Closed);
        }
        Ok(state)
    }

    /// Deliveries held by this channel and not yet acked
    pub fn unacked(&self) -> usize {
        self.unacked.len()
    }

    /// Put unacked deliveries back at the head of their queues
    fn requeue_unacked(&mut self) -> Result<(), ChannelError> {
        if self.unacked.is_empty() {
            return Ok(());
        }

        let mut state = self.shared.lock()?;
        // Reverse so the oldest delivery of each stream ends up first
        for held in self.unacked.drain(..).rev() {
            // A deleted queue takes its deliveries with it
            if let Some(queue) = state.queues.get_mut(&held.stream) {
                let mut message = held.message;
                message.redelivered = true;
                queue.ready.push_front(message);
                queue.in_flight = queue.in_flight.saturating_sub(1);
            }
        }
        drop(state);
        self.shared.changed.notify_all();
        Ok(())
    }
}

impl DeliveryChannel for MemoryChannel {
    type Error = ChannelError;

    fn declare(&mut self, stream: &str) -> Result<(), Self::Error> {
        let mut state = self.state()?;
        state.queues.entry(stream.to_string()).or_default();
        Ok(())
    }

    fn publish(&mut self, stream: &str, payload: &[u8]) -> Result<(), Self::Error> {
        let mut state = self.state()?;
        let queue = state
            .queues
            .get_mut(stream)
            .ok_or_else(|| ChannelError::UnknownStream(stream.to_string()))?;

        queue.ready.push_back(Message {
            payload: payload.to_vec(),
            redelivered: false,
        });
        drop(state);

        self.shared.changed.notify_all();
        Ok(())
    }

    fn subscribe(&mut self, stream: &str, max_in_flight: usize) -> Result<(), Self::Error> {
        let state = self.state()?;
        if !state.queues.contains_key(stream) {
            return Err(ChannelError::UnknownStream(stream.to_string()));
        }
        drop(state);

        self.subscription = Some(Subscription {
            stream: stream.to_string(),
            max_in_flight: if max_in_flight == 0 { usize::MAX } else { max_in_flight },
        });
        Ok(())
    }

    fn next_delivery(&mut self, wait: Duration) -> nb::Result<Delivery, Self::Error> {
        let subscription = self.subscription.clone().ok_or(ChannelError::NotSubscribed)?;
        if self.unacked.len() >= subscription.max_in_flight {
            return Err(nb::Error::Other(ChannelError::InFlightLimit {
                limit: subscription.max_in_flight,
            }));
        }

        let guard = self.state()?;
        let (mut state, _) = self
            .shared
            .changed
            .wait_timeout_while(guard, wait, |state| {
                !state.closed
                    && state
                        .queues
                        .get(&subscription.stream)
                        .map_or(false, |queue| queue.ready.is_empty())
            })
            .map_err(|_| ChannelError::Poisoned)?;

        if state.closed {
            return Err(nb::Error::Other(ChannelError::Closed));
        }

        let queue = state
            .queues
            .get_mut(&subscription.stream)
            .ok_or_else(|| ChannelError::UnknownStream(subscription.stream.clone()))?;

        let message = queue.ready.pop_front().ok_or(nb::Error::WouldBlock)?;
        queue.in_flight += 1;
        drop(state);

        let tag = self.next_tag;
        self.next_tag += 1;

        let delivery = Delivery {
            tag,
            stream: subscription.stream.clone(),
            payload: message.payload.clone(),
            redelivered: message.redelivered,
        };
        self.unacked.push(Held {
            tag,
            stream: subscription.stream,
            message,
        });
        Ok(delivery)
    }

    fn ack(&mut self, tag: DeliveryTag) -> Result<(), Self::Error> {
        let position = self
            .unacked
            .iter()
            .position(|held| held.tag == tag)
            .ok_or(ChannelError::UnknownDelivery(tag))?;

        let mut state = self.state()?;
        if let Some(queue) = state.queues.get_mut(&self.unacked[position].stream) {
            queue.in_flight = queue.in_flight.saturating_sub(1);
        }
        drop(state);

        self.unacked.remove(position);
        self.shared.changed.notify_all();
        Ok(())
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        if self.closed {
            return Ok(());
        }
        let result = self.requeue_unacked();
        self.closed = true;
        self.subscription = None;
        result
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        if self.close().is_err() {
            log_debug!("memory channel closed with broker state unavailable");
        }
    }
}
