//! Common test utilities for integration tests
//!
//! This module provides:
//! - Temperature series builders for the smoker and food scenarios
//! - Consumer threads wired to a shared in-memory broker
//! - A drain-then-stop helper for end-to-end runs

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use smokealert_core::{
    AlertDetector, AlertEvent, ConsumerStats, MemoryBroker, StreamConsumer,
};

/// Poll slice used by test consumers
pub const POLL: Duration = Duration::from_millis(5);

/// How long a test waits for the broker to drain
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Timestamps `12:MM:SS` spaced 30 seconds apart
pub fn timestamp(index: usize) -> String {
    let seconds = index * 30;
    format!("12:{:02}:{:02}", seconds / 60 % 60, seconds % 60)
}

/// Payloads `timestamp,value` for a series of values
pub fn payloads(values: &[f64]) -> Vec<String> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| format!("{},{}", timestamp(i), value))
        .collect()
}

/// A source line with smoker, food A and food B columns
pub fn row(index: usize, smoker: &str, food_a: &str, food_b: &str) -> String {
    format!("{},{},{},{}", timestamp(index), smoker, food_a, food_b)
}

/// Running consumer thread
pub struct ConsumerThread {
    handle: JoinHandle<(ConsumerStats, Vec<AlertEvent>)>,
}

impl ConsumerThread {
    /// Consume `stream` on its own channel until `stop` is set
    pub fn spawn<D>(broker: &MemoryBroker, stream: &str, detector: D, stop: Arc<AtomicBool>) -> Self
    where
        D: AlertDetector + Send + 'static,
    {
        let mut channel = broker.channel();
        let stream = stream.to_string();

        let handle = std::thread::spawn(move || {
            let mut consumer = StreamConsumer::new(stream, detector, Vec::new()).with_poll_interval(POLL);
            let stats = consumer.run(&mut channel, &stop).expect("consumer failed");
            let (_, alerts) = consumer.into_parts();
            (stats, alerts)
        });

        Self { handle }
    }

    /// Wait for the thread and return its counters and alerts
    pub fn join(self) -> (ConsumerStats, Vec<AlertEvent>) {
        self.handle.join().expect("consumer panicked")
    }
}

/// Wait until every queue is empty and acked, then raise `stop`
pub fn drain_and_stop(broker: &MemoryBroker, stop: &AtomicBool) {
    let drained = broker.wait_drained(DRAIN_TIMEOUT).expect("broker poisoned");
    stop.store(true, Ordering::Relaxed);
    assert!(drained, "broker did not drain in time");
}
