//! Alert sinks
//!
//! Where raised alerts go. The contract is fire-and-forget: a sink never
//! pushes back on the consumer and never acknowledges anything.

use alloc::vec::Vec;

use crate::events::AlertEvent;

/// Destination for raised alerts
pub trait AlertSink {
    /// Display or record one alert
    fn emit(&mut self, alert: &AlertEvent);
}

/// Collects alerts in memory (tests, replays)
impl AlertSink for Vec<AlertEvent> {
    fn emit(&mut self, alert: &AlertEvent) {
        self.push(alert.clone());
    }
}

impl<S: AlertSink + ?Sized> AlertSink for &mut S {
    fn emit(&mut self, alert: &AlertEvent) {
        (**self).emit(alert);
    }
}

/// Writes alerts through the `log` facade at warn level
#[cfg(feature = "log")]
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[cfg(feature = "log")]
impl AlertSink for LogSink {
    fn emit(&mut self, alert: &AlertEvent) {
        log::warn!(
            target: "smokealert::alert",
            "{} alert at {}: {}",
            alert.detector_label,
            alert.timestamp,
            alert.message
        );
    }
}

/// Prints one line per alert to stdout
#[cfg(feature = "std")]
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

#[cfg(feature = "std")]
impl AlertSink for ConsoleSink {
    fn emit(&mut self, alert: &AlertEvent) {
        println!("{} This occurred at {}", alert.message, alert.timestamp);
    }
}
