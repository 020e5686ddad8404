//! Network Broker Connectors for SmokeAlert
//!
//! ## Overview
//!
//! The core crate defines the [`DeliveryChannel`] contract and ships an
//! in-process broker. This crate puts the same contract on top of real
//! network brokers so the router and each detector can run as separate
//! processes, possibly on separate machines.
//!
//! ## MQTT
//!
//! **Mapping onto the delivery contract:**
//!
//! | Contract          | MQTT 3.1.1                                       |
//! |-------------------|--------------------------------------------------|
//! | stream            | topic `<prefix><stream>`                         |
//! | durable queue     | persistent session (`clean_session = false`)     |
//! | publish           | QoS 1 publish                                    |
//! | subscribe         | QoS 1 subscription                               |
//! | ack               | manual `PUBACK`                                  |
//! | redelivered       | `DUP` flag                                       |
//!
//! **Limits:**
//! - MQTT has no queue declaration. Messages published before a consumer's
//!   session first subscribed are not retained for it; start consumers
//!   before the producer on a fresh broker.
//! - MQTT 3.1.1 has no receive maximum, so the in-flight bound is enforced
//!   on the client side. The broker may still push more messages; they
//!   wait in the client until earlier deliveries are acked.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use smokealert_connectors::{MqttChannel, MqttConfig};
//! use smokealert_core::DeliveryChannel;
//!
//! let config = MqttConfig::new("broker.local", 1883, "smoker-detector");
//! let mut channel = MqttChannel::connect(&config)?;
//!
//! channel.subscribe("01-smoker", 1)?;
//! if let Ok(delivery) = channel.next_delivery(Duration::from_secs(1)) {
//!     channel.ack(delivery.tag)?;
//! }
//! # Ok::<(), smokealert_connectors::MqttError>(())
//! ```
//!
//! [`DeliveryChannel`]: smokealert_core::DeliveryChannel

#[cfg(feature = "mqtt")]
pub mod mqtt;

// Re-export common types
#[cfg(feature = "mqtt")]
pub use mqtt::{MqttChannel, MqttConfig, MqttError};

/// Connection statistics common to all connectors
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Messages handed to the broker
    pub messages_sent: u64,
    /// Messages the broker confirmed receiving
    pub messages_confirmed: u64,
    /// Deliveries received from the broker
    pub messages_received: u64,
    /// Deliveries acknowledged back to the broker
    pub messages_acked: u64,
    /// Payload bytes sent
    pub bytes_sent: u64,
    /// Last error message
    pub last_error: Option<String>,
}

impl ConnectionStats {
    /// Messages sent but not yet confirmed by the broker
    pub fn unconfirmed(&self) -> u64 {
        self.messages_sent.saturating_sub(self.messages_confirmed)
    }
}
