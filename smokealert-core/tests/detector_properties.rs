//! Property tests for the window detectors and the payload boundary

use proptest::prelude::*;
use smokealert_core::{
    AlertDetector, AlertEvent, DropDetector, DropRule, Reading, SensorStream, StallDetector,
    StallRule, StreamConsumer, WindowDetector,
};

fn temperature() -> impl Strategy<Value = f64> {
    (-40.0f64..600.0).prop_map(|t| (t * 10.0).round() / 10.0)
}

/// Payloads that must be dropped without touching the detector
fn garbage() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        Just(b"t,".to_vec()),
        Just(b"t,abc".to_vec()),
        Just(b"garbage".to_vec()),
        Just(b"t,NaN".to_vec()),
        Just(b"t,-inf".to_vec()),
        Just(Vec::new()),
        Just(vec![0xff, 0xfe, b',', b'1']),
    ]
}

/// Smoker readings that cool off often enough to keep the drop rule firing
fn cooling_run() -> impl Strategy<Value = Vec<f64>> {
    (temperature(), prop::collection::vec(-30.0f64..10.0, 5..60)).prop_map(|(start, steps)| {
        steps
            .iter()
            .scan(start, |value, step| {
                *value += step;
                Some(*value)
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn drop_alert_matches_endpoints(values in prop::collection::vec(temperature(), 1..40)) {
        let mut detector = DropDetector::smoker();

        for (i, value) in values.iter().enumerate() {
            let alert = detector.on_reading(&Reading::new(i.to_string(), *value));

            let expected = i >= 4 && values[i - 4] - values[i] > 15.0;
            prop_assert_eq!(alert.is_some(), expected);
            if let Some(alert) = alert {
                prop_assert_eq!(alert.timestamp, i.to_string());
            }
        }
    }

    #[test]
    fn stall_alert_matches_spread(values in prop::collection::vec(220.0f64..223.0, 1..60)) {
        let mut detector = StallDetector::food(SensorStream::FoodB);

        for (i, value) in values.iter().enumerate() {
            let alert = detector.on_reading(&Reading::new(i.to_string(), *value));

            let expected = i >= 19 && {
                let window = &values[i - 19..=i];
                let max = window.iter().cloned().fold(f64::MIN, f64::max);
                let min = window.iter().cloned().fold(f64::MAX, f64::min);
                max - min <= 1.0
            };
            prop_assert_eq!(alert.is_some(), expected);
        }
    }

    #[test]
    fn window_never_exceeds_capacity(values in prop::collection::vec(temperature(), 0..100)) {
        let mut detector = DropDetector::smoker();
        for value in &values {
            detector.on_reading(&Reading::new("t", *value));
            prop_assert!(detector.window().len() <= 5);
        }
        prop_assert_eq!(detector.window().len(), values.len().min(5));
    }

    #[test]
    fn rising_smoker_never_alerts(start in temperature(), steps in prop::collection::vec(0.0f64..50.0, 5..30)) {
        let mut detector = DropDetector::smoker();
        let mut value = start;
        for step in steps {
            value += step;
            prop_assert!(detector.on_reading(&Reading::new("t", value)).is_none());
        }
    }

    #[test]
    fn payload_parse_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        if let Ok(reading) = Reading::from_payload(&bytes) {
            prop_assert!(reading.value.is_finite());
        }
    }

    #[test]
    fn garbage_payloads_leave_alerts_unchanged(
        values in cooling_run(),
        noise in prop::collection::vec((any::<bool>(), garbage()), 60),
    ) {
        let payloads: Vec<String> = values
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{},{}", i, v))
            .collect();

        let mut clean = StreamConsumer::new("01-smoker", DropDetector::smoker(), Vec::<AlertEvent>::new());
        let mut noisy = StreamConsumer::new("01-smoker", DropDetector::smoker(), Vec::<AlertEvent>::new());
        let mut injected = 0;

        for (payload, (inject, junk)) in payloads.iter().zip(&noise) {
            clean.process(payload.as_bytes());

            if *inject {
                prop_assert!(noisy.process(junk).is_none());
                injected += 1;
            }
            noisy.process(payload.as_bytes());

            let clean_window: Vec<f64> = clean.detector().window().iter().collect();
            let noisy_window: Vec<f64> = noisy.detector().window().iter().collect();
            prop_assert_eq!(clean_window, noisy_window);
        }

        prop_assert_eq!(clean.sink(), noisy.sink());
        prop_assert_eq!(noisy.stats().malformed, injected);
        prop_assert_eq!(noisy.stats().alerts, clean.stats().alerts);
    }

    #[test]
    fn custom_threshold_respected(threshold in 1.0f64..50.0, drop in 0.0f64..100.0) {
        let mut detector: WindowDetector<DropRule, 3> =
            WindowDetector::new("Pit", DropRule::with_threshold(threshold));

        detector.on_reading(&Reading::new("a", 300.0));
        detector.on_reading(&Reading::new("b", 300.0));
        let alert = detector.on_reading(&Reading::new("c", 300.0 - drop));

        prop_assert_eq!(alert.is_some(), 300.0 - (300.0 - drop) > threshold);
    }
}

#[test]
fn garbage_between_firing_readings_keeps_alerting() {
    let mut consumer = StreamConsumer::new("01-smoker", DropDetector::smoker(), Vec::<AlertEvent>::new());

    for payload in ["1,320", "2,310", "3,300", "4,290", "5,280"] {
        consumer.process(payload.as_bytes());
    }
    assert_eq!(consumer.sink().len(), 1);

    // Full window, rule firing: junk neither alerts nor shifts the window
    assert!(consumer.process(b"6,").is_none());
    assert!(consumer.process(b"6,inf").is_none());
    let alert = consumer.process(b"7,270").unwrap();

    assert_eq!(alert.timestamp, "7");
    assert_eq!(consumer.detector().window().iter().collect::<Vec<_>>(), vec![310.0, 300.0, 290.0, 280.0, 270.0]);
    assert_eq!(consumer.stats().malformed, 2);
    assert_eq!(consumer.sink().len(), 2);
}

#[test]
fn stall_fires_on_ambient_plateau() {
    // No lower bound on temperature: an unplugged probe stalls too.
    let mut detector: WindowDetector<StallRule, 20> = StallDetector::food(SensorStream::FoodA);
    let alerts: Vec<_> = (0..20)
        .filter_map(|i| detector.on_reading(&Reading::new(i.to_string(), 21.0)))
        .collect();
    assert_eq!(alerts.len(), 1);
}
