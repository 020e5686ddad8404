//! MQTT delivery channel
//!
//! Wraps the synchronous `rumqttc` client. The client's event loop runs on a
//! background thread and forwards what the channel cares about over a
//! `std::sync::mpsc` queue:
//!
//! ```text
//!  broker ⇄ rumqttc Connection ── event thread ──→ mpsc ──→ MqttChannel
//!                 ↑                                          │
//!                 └──────────── rumqttc Client ←─────────────┘
//!                        publish / subscribe / ack / disconnect
//! ```
//!
//! The first connection error ends the event thread; the channel reports it
//! on the next call and every call after that. There is no reconnect: a
//! lost broker is a fatal transport error for the process.

use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rumqttc::{Client, ClientError, Connection, Event, MqttOptions, Packet, Publish, QoS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use smokealert_core::{Delivery, DeliveryChannel, DeliveryTag};

use crate::ConnectionStats;

/// MQTT channel errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MqttError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("client request failed: {0}")]
    Client(String),

    #[error("connection closed")]
    Closed,

    #[error("timed out after {0:?} waiting for the broker")]
    Timeout(Duration),

    #[error("channel has no subscription")]
    NotSubscribed,

    #[error("in-flight limit of {limit} reached")]
    InFlightLimit { limit: usize },

    #[error("unknown delivery tag {0}")]
    UnknownDelivery(DeliveryTag),
}

impl From<ClientError> for MqttError {
    fn from(e: ClientError) -> Self {
        Self::Client(e.to_string())
    }
}

/// Broker connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker host name or address
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Client id; also names the persistent session, so keep it stable
    pub client_id: String,
    /// Prepended to stream names to form topics
    pub topic_prefix: String,
    /// Keep-alive interval
    pub keep_alive: Duration,
    /// How long `connect` waits for the broker's CONNACK
    pub connect_timeout: Duration,
    /// How long `close` waits for outstanding publishes to be confirmed
    pub flush_timeout: Duration,
    /// Capacity of the client request queue
    pub request_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "smokealert".to_string(),
            topic_prefix: "smokealert/".to_string(),
            keep_alive: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            flush_timeout: Duration::from_secs(5),
            request_capacity: 64,
        }
    }
}

impl MqttConfig {
    /// Settings for one broker and client id, defaults elsewhere
    pub fn new(host: impl Into<String>, port: u16, client_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: client_id.into(),
            ..Default::default()
        }
    }

    /// Use a different topic prefix
    pub fn with_topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = prefix.into();
        self
    }

    /// Use a different CONNACK timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Topic carrying a stream
    pub fn topic(&self, stream: &str) -> String {
        format!("{}{}", self.topic_prefix, stream)
    }

    /// Stream carried by a topic, if the topic has our prefix
    pub fn stream<'a>(&self, topic: &'a str) -> Option<&'a str> {
        topic.strip_prefix(self.topic_prefix.as_str())
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(false);
        options.set_manual_acks(true);
        options
    }
}

/// What the event thread forwards
#[derive(Debug)]
enum Inbound {
    Connected,
    Publish(Publish),
    Confirmed,
    Failed(String),
}

fn run_event_loop(mut connection: Connection, tx: Sender<Inbound>) {
    for notification in connection.iter() {
        let inbound = match notification {
            Ok(Event::Incoming(Packet::ConnAck(_))) => Inbound::Connected,
            Ok(Event::Incoming(Packet::Publish(publish))) => Inbound::Publish(publish),
            Ok(Event::Incoming(Packet::PubAck(_))) => Inbound::Confirmed,
            Ok(_) => continue,
            Err(e) => {
                let _ = tx.send(Inbound::Failed(e.to_string()));
                break;
            }
        };

        if tx.send(inbound).is_err() {
            break;
        }
    }
    debug!("MQTT event loop stopped");
}

/// [`DeliveryChannel`] over an MQTT broker
pub struct MqttChannel {
    client: Client,
    inbound: Receiver<Inbound>,
    /// Publishes received while waiting for something else
    pending: VecDeque<Publish>,
    config: MqttConfig,
    subscription: Option<(String, usize)>,
    unacked: HashMap<DeliveryTag, Publish>,
    next_tag: DeliveryTag,
    failure: Option<MqttError>,
    stats: ConnectionStats,
}

impl MqttChannel {
    /// Connect and wait for the broker to accept the session
    pub fn connect(config: &MqttConfig) -> Result<Self, MqttError> {
        let (client, connection) = Client::new(config.options(), config.request_capacity);
        let (tx, rx) = mpsc::channel();

        thread::Builder::new()
            .name(format!("mqtt-{}", config.client_id))
            .spawn(move || run_event_loop(connection, tx))
            .map_err(|e| MqttError::Connection(e.to_string()))?;

        let mut channel = Self::from_parts(client, rx, config.clone());
        channel.await_connack()?;

        info!(
            "connected to MQTT broker {}:{} as {}",
            config.host, config.port, config.client_id
        );
        Ok(channel)
    }

    fn from_parts(client: Client, inbound: Receiver<Inbound>, config: MqttConfig) -> Self {
        Self {
            client,
            inbound,
            pending: VecDeque::new(),
            config,
            subscription: None,
            unacked: HashMap::new(),
            next_tag: 1,
            failure: None,
            stats: ConnectionStats::default(),
        }
    }

    fn await_connack(&mut self) -> Result<(), MqttError> {
        let timeout = self.config.connect_timeout;
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.recv(remaining)? {
                Some(Inbound::Connected) => return Ok(()),
                Some(_) => {}
                None => {
                    let _ = self.client.disconnect();
                    return Err(MqttError::Timeout(timeout));
                }
            }
        }
    }

    /// Receive one event, `None` on timeout
    ///
    /// Publishes and confirmations are also recorded here so callers waiting
    /// for one kind of event never lose another.
    fn recv(&mut self, wait: Duration) -> Result<Option<Inbound>, MqttError> {
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }

        match self.inbound.recv_timeout(wait) {
            Ok(Inbound::Failed(reason)) => {
                warn!("MQTT connection lost: {}", reason);
                let e = MqttError::Connection(reason);
                self.stats.last_error = Some(e.to_string());
                self.failure = Some(e.clone());
                Err(e)
            }
            Ok(Inbound::Confirmed) => {
                self.stats.messages_confirmed += 1;
                Ok(Some(Inbound::Confirmed))
            }
            Ok(inbound) => Ok(Some(inbound)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                self.failure = Some(MqttError::Closed);
                Err(MqttError::Closed)
            }
        }
    }

    /// Wait until every publish is confirmed or the flush timeout passes
    pub fn flush(&mut self) -> Result<(), MqttError> {
        let timeout = self.config.flush_timeout;
        let deadline = Instant::now() + timeout;

        while self.stats.unconfirmed() > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.recv(remaining)? {
                Some(Inbound::Publish(publish)) => self.pending.push_back(publish),
                Some(_) => {}
                None => return Err(MqttError::Timeout(timeout)),
            }
        }
        Ok(())
    }

    /// Counters for this connection
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Settings this channel was opened with
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    fn check_open(&self) -> Result<(), MqttError> {
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn deliver(&mut self, publish: Publish) -> Delivery {
        let tag = self.next_tag;
        self.next_tag += 1;
        self.stats.messages_received += 1;

        let stream = self
            .config
            .stream(&publish.topic)
            .unwrap_or(publish.topic.as_str())
            .to_string();

        let delivery = Delivery {
            tag,
            stream,
            payload: publish.payload.to_vec(),
            redelivered: publish.dup,
        };
        self.unacked.insert(tag, publish);
        delivery
    }
}

impl DeliveryChannel for MqttChannel {
    type Error = MqttError;

    /// No-op beyond a liveness check: MQTT topics need no declaration
    fn declare(&mut self, _stream: &str) -> Result<(), Self::Error> {
        self.check_open()
    }

    fn publish(&mut self, stream: &str, payload: &[u8]) -> Result<(), Self::Error> {
        self.check_open()?;

        self.client
            .publish(self.config.topic(stream), QoS::AtLeastOnce, false, payload.to_vec())?;
        self.stats.messages_sent += 1;
        self.stats.bytes_sent += payload.len() as u64;
        Ok(())
    }

    fn subscribe(&mut self, stream: &str, max_in_flight: usize) -> Result<(), Self::Error> {
        self.check_open()?;

        let topic = self.config.topic(stream);
        self.client.subscribe(topic.as_str(), QoS::AtLeastOnce)?;
        debug!("subscribed to {}", topic);

        let limit = if max_in_flight == 0 { usize::MAX } else { max_in_flight };
        self.subscription = Some((stream.to_string(), limit));
        Ok(())
    }

    fn next_delivery(&mut self, wait: Duration) -> nb::Result<Delivery, Self::Error> {
        let limit = match &self.subscription {
            Some((_, limit)) => *limit,
            None => return Err(nb::Error::Other(MqttError::NotSubscribed)),
        };
        if self.unacked.len() >= limit {
            return Err(nb::Error::Other(MqttError::InFlightLimit { limit }));
        }

        if let Some(publish) = self.pending.pop_front() {
            return Ok(self.deliver(publish));
        }

        let deadline = Instant::now() + wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.recv(remaining)? {
                Some(Inbound::Publish(publish)) => return Ok(self.deliver(publish)),
                Some(_) => {}
                None => return Err(nb::Error::WouldBlock),
            }
        }
    }

    fn ack(&mut self, tag: DeliveryTag) -> Result<(), Self::Error> {
        self.check_open()?;

        let publish = self.unacked.remove(&tag).ok_or(MqttError::UnknownDelivery(tag))?;
        self.client.ack(&publish)?;
        self.stats.messages_acked += 1;
        Ok(())
    }

    /// Flush outstanding publishes, then disconnect
    ///
    /// Unacked deliveries stay in the broker session and are redelivered to
    /// the next connection with the same client id.
    fn close(&mut self) -> Result<(), Self::Error> {
        self.check_open()?;

        let flushed = self.flush();
        self.client.disconnect()?;
        self.failure = Some(MqttError::Closed);
        info!(
            "disconnected from MQTT broker: {} sent, {} received",
            self.stats.messages_sent, self.stats.messages_received
        );
        flushed
    }
}

impl Drop for MqttChannel {
    fn drop(&mut self) {
        if self.failure.is_none() {
            let _ = self.client.disconnect();
        }
    }
}
