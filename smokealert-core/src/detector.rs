//! Sliding-window alert detectors
//!
//! A detector owns one [`SlidingWindow`] and one [`WindowRule`]. Every reading
//! goes through the same steps:
//!
//! 1. push the value into the window (evicting the oldest if full)
//! 2. if the window is not yet full, stop
//! 3. evaluate the rule against the current window
//! 4. if it fires, return an [`AlertEvent`] stamped with the reading's
//!    timestamp
//!
//! Once the window has filled, every subsequent reading re-evaluates the full
//! window, so a condition that persists keeps alerting on each reading.
//!
//! ## Rules
//!
//! | Rule          | Stream | Window | Fires when                    |
//! |---------------|--------|--------|-------------------------------|
//! | [`DropRule`]  | smoker | 5      | `oldest - newest > 15`        |
//! | [`StallRule`] | food   | 20     | `max - min <= 1`              |
//!
//! The drop rule is signed: a rise of the same magnitude never fires. The
//! stall rule has no floor on absolute temperature, so a probe left at
//! ambient temperature reads as stalled too.

use alloc::format;
use alloc::string::String;

use crate::buffer::SlidingWindow;
use crate::constants::{FOOD_STALL_MAX_SPREAD_DEG, FOOD_WINDOW, SMOKER_DROP_THRESHOLD_DEG, SMOKER_WINDOW};
use crate::events::{AlertEvent, DetectorKind, SensorStream};
use crate::reading::Reading;

/// Condition evaluated against a full window
pub trait WindowRule<const N: usize> {
    /// True if the window contents should raise an alert
    ///
    /// Only called on a full window.
    fn evaluate(&self, window: &SlidingWindow<N>) -> bool;

    /// Describe why the rule fired, used as the alert message body
    fn describe(&self, window: &SlidingWindow<N>) -> String;
}

/// Anything that turns readings into alerts
pub trait AlertDetector {
    /// Label carried by raised alerts
    fn label(&self) -> &str;

    /// Feed one reading, returning an alert if the rule fires
    fn on_reading(&mut self, reading: &Reading) -> Option<AlertEvent>;
}

/// Smoker rule: start of window minus end of window exceeds a threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropRule {
    threshold: f64,
}

impl DropRule {
    /// Rule with a custom drop threshold in degrees
    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Drop threshold in degrees
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for DropRule {
    fn default() -> Self {
        Self {
            threshold: SMOKER_DROP_THRESHOLD_DEG,
        }
    }
}

impl<const N: usize> WindowRule<N> for DropRule {
    fn evaluate(&self, window: &SlidingWindow<N>) -> bool {
        match (window.oldest(), window.newest()) {
            (Some(oldest), Some(newest)) => oldest - newest > self.threshold,
            _ => false,
        }
    }

    fn describe(&self, window: &SlidingWindow<N>) -> String {
        let drop = match (window.oldest(), window.newest()) {
            (Some(oldest), Some(newest)) => oldest - newest,
            _ => 0.0,
        };
        format!("Temperature dropped {:.1} degrees over {} readings", drop, N)
    }
}

/// Food rule: spread across the whole window at or below a limit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StallRule {
    max_spread: f64,
}

impl StallRule {
    /// Rule with a custom maximum spread in degrees
    pub fn with_max_spread(max_spread: f64) -> Self {
        Self { max_spread }
    }

    /// Maximum spread in degrees that counts as stalled
    pub fn max_spread(&self) -> f64 {
        self.max_spread
    }
}

impl Default for StallRule {
    fn default() -> Self {
        Self {
            max_spread: FOOD_STALL_MAX_SPREAD_DEG,
        }
    }
}

impl<const N: usize> WindowRule<N> for StallRule {
    fn evaluate(&self, window: &SlidingWindow<N>) -> bool {
        window
            .spread()
            .map(|spread| spread <= self.max_spread)
            .unwrap_or(false)
    }

    fn describe(&self, window: &SlidingWindow<N>) -> String {
        format!(
            "Food stall: temperature held within {:.1} degrees over {} readings",
            window.spread().unwrap_or(0.0),
            N
        )
    }
}

/// Detector pairing one window with one rule
#[derive(Debug, Clone)]
pub struct WindowDetector<R, const N: usize> {
    window: SlidingWindow<N>,
    rule: R,
    label: String,
}

impl<R: WindowRule<N>, const N: usize> WindowDetector<R, N> {
    /// Create a detector with an empty window
    pub fn new(label: impl Into<String>, rule: R) -> Self {
        Self {
            window: SlidingWindow::new(),
            rule,
            label: label.into(),
        }
    }

    /// Current window contents
    pub fn window(&self) -> &SlidingWindow<N> {
        &self.window
    }

    /// Rule in use
    pub fn rule(&self) -> &R {
        &self.rule
    }
}

impl<R: WindowRule<N>, const N: usize> AlertDetector for WindowDetector<R, N> {
    fn label(&self) -> &str {
        &self.label
    }

    fn on_reading(&mut self, reading: &Reading) -> Option<AlertEvent> {
        self.window.push(reading.value);

        if !self.window.is_full() || !self.rule.evaluate(&self.window) {
            return None;
        }

        let alert = AlertEvent {
            detector_label: self.label.clone(),
            timestamp: reading.timestamp.clone(),
            message: format!("{} alert! {}", self.label, self.rule.describe(&self.window)),
        };
        log_warn!("{}", alert);
        Some(alert)
    }
}

/// Smoker detector: 5-reading window, drop rule
pub type DropDetector = WindowDetector<DropRule, SMOKER_WINDOW>;

/// Food detector: 20-reading window, stall rule
pub type StallDetector = WindowDetector<StallRule, FOOD_WINDOW>;

impl WindowDetector<DropRule, SMOKER_WINDOW> {
    /// Default smoker detector
    pub fn smoker() -> Self {
        Self::new(SensorStream::Smoker.label(), DropRule::default())
    }
}

impl WindowDetector<StallRule, FOOD_WINDOW> {
    /// Default food detector for one of the food streams
    pub fn food(stream: SensorStream) -> Self {
        debug_assert_eq!(stream.detector_kind(), DetectorKind::Stall);
        Self::new(stream.label(), StallRule::default())
    }
}
