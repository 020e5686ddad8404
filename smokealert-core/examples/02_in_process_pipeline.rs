//! Example 02: In-Process Pipeline
//!
//! This example demonstrates how to:
//! - Fan records out to the three sensor streams with the router
//! - Run one consumer per stream against the in-memory broker
//! - Stop consumers once every message is acknowledged

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use smokealert_core::{
    sink::ConsoleSink,
    stream::MemoryStream,
    DropDetector, MemoryBroker, SensorStream, StallDetector, StreamConsumer, StreamRouter,
};

fn main() {
    println!("=== SmokeAlert In-Process Pipeline Example ===\n");

    let lines: Vec<String> = (0..24)
        .map(|i| format!("12:{:02}:00,{},{},", i, 300 - 4 * i, 203))
        .collect();
    let lines: Vec<&str> = lines.iter().map(String::as_str).collect();

    let broker = MemoryBroker::new();
    let stop = AtomicBool::new(false);

    let mut router = StreamRouter::new(broker.channel());
    let stats = router.run(&mut MemoryStream::new(&lines)).expect("routing failed");
    println!("Router: {}\n", stats);

    std::thread::scope(|scope| {
        let stop = &stop;

        let mut smoker_channel = broker.channel();
        scope.spawn(move || {
            let mut consumer = StreamConsumer::new(SensorStream::Smoker.queue_name(), DropDetector::smoker(), ConsoleSink)
                .with_poll_interval(Duration::from_millis(20));
            consumer.run(&mut smoker_channel, stop)
        });

        for food in [SensorStream::FoodA, SensorStream::FoodB] {
            let mut channel = broker.channel();
            scope.spawn(move || {
                let mut consumer = StreamConsumer::new(food.queue_name(), StallDetector::food(food), ConsoleSink)
                    .with_poll_interval(Duration::from_millis(20));
                consumer.run(&mut channel, stop)
            });
        }

        let drained = broker.wait_drained(Duration::from_secs(5)).unwrap_or(false);
        stop.store(true, Ordering::Relaxed);
        println!("\nAll messages acknowledged: {}", drained);
    });
}
