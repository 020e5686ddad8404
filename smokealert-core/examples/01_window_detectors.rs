//! Example 01: Window Detectors
//!
//! This example demonstrates how to:
//! - Feed readings to the smoker drop detector and a food stall detector
//! - Tune a rule's threshold
//! - Inspect the window after each reading

use smokealert_core::{
    AlertDetector, DropDetector, DropRule, Reading, SensorStream, StallDetector,
};

fn main() {
    println!("=== SmokeAlert Window Detectors Example ===\n");

    // Fire dying down: 40 degrees lost over five readings
    let mut smoker = DropDetector::smoker();
    for (i, value) in [320.0, 310.0, 300.0, 290.0, 280.0, 282.0].into_iter().enumerate() {
        let reading = Reading::new(format!("12:0{}:00", i), value);
        match smoker.on_reading(&reading) {
            Some(alert) => println!("{}", alert),
            None => println!("{} -> ok ({} in window)", reading, smoker.window().len()),
        }
    }

    println!("\n{}\n", "=".repeat(50));

    // Same readings, more tolerant pit
    let mut tolerant = DropDetector::new("Pit", DropRule::with_threshold(50.0));
    let alerts = [320.0, 310.0, 300.0, 290.0, 280.0]
        .into_iter()
        .filter_map(|value| tolerant.on_reading(&Reading::new("t", value)))
        .count();
    println!("Tolerant detector raised {} alerts", alerts);

    println!("\n{}\n", "=".repeat(50));

    // Brisket plateau: 20 readings within one degree
    let mut food = StallDetector::food(SensorStream::FoodA);
    for i in 0..20 {
        let value = if i % 2 == 0 { 160.0 } else { 160.5 };
        if let Some(alert) = food.on_reading(&Reading::new(format!("reading {}", i + 1), value)) {
            println!("{}", alert);
        }
    }
    println!("Spread over window: {:?}", food.window().spread());
}
