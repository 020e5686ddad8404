//! Alert events and the sensor stream catalogue
//!
//! ## Streams
//!
//! A source record carries one timestamp and one value per sensor, in a
//! fixed column order. Each column feeds its own named stream:
//!
//! ```text
//! column:   0          1         2          3
//!           timestamp, smoker,   food A,    food B
//!                      ↓         ↓          ↓
//! stream:              01-smoker 02-food-A  03-food-B
//! detector:            drop      stall      stall
//! ```
//!
//! ## Alerts
//!
//! An [`AlertEvent`] is created by a detector when its rule fires, handed to
//! an alert sink and then discarded. It carries the detector label and the
//! timestamp of the reading that tripped the rule.

use alloc::string::String;
use core::fmt;

use crate::constants::{FOOD_A_STREAM, FOOD_B_STREAM, SMOKER_STREAM};

/// Raised when a detector rule fires
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlertEvent {
    /// Label of the detector that fired ("Smoker", "Food A", ...)
    pub detector_label: String,
    /// Timestamp of the reading that completed the alerting window
    pub timestamp: String,
    /// Human-readable description of the condition
    pub message: String,
}

impl fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} (at {})", self.detector_label, self.message, self.timestamp)
    }
}

/// Which rule a stream is watched with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorKind {
    /// Drastic drop between window start and end
    Drop,
    /// Window spread small enough to count as a plateau
    Stall,
}

/// The three sensor streams fed by one source record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SensorStream {
    /// Smoker chamber temperature
    Smoker,
    /// First food probe
    FoodA,
    /// Second food probe
    FoodB,
}

impl SensorStream {
    /// All streams in source column order
    pub const ALL: [SensorStream; 3] = [SensorStream::Smoker, SensorStream::FoodA, SensorStream::FoodB];

    /// Queue/topic name on the delivery channel
    pub const fn queue_name(&self) -> &'static str {
        match self {
            SensorStream::Smoker => SMOKER_STREAM,
            SensorStream::FoodA => FOOD_A_STREAM,
            SensorStream::FoodB => FOOD_B_STREAM,
        }
    }

    /// Detector label used in alerts
    pub const fn label(&self) -> &'static str {
        match self {
            SensorStream::Smoker => "Smoker",
            SensorStream::FoodA => "Food A",
            SensorStream::FoodB => "Food B",
        }
    }

    /// Column of this stream's value in a source record
    pub const fn field_index(&self) -> usize {
        match self {
            SensorStream::Smoker => 1,
            SensorStream::FoodA => 2,
            SensorStream::FoodB => 3,
        }
    }

    /// Rule the stream is watched with
    pub const fn detector_kind(&self) -> DetectorKind {
        match self {
            SensorStream::Smoker => DetectorKind::Drop,
            SensorStream::FoodA | SensorStream::FoodB => DetectorKind::Stall,
        }
    }

    /// Look a stream up by its queue name
    pub fn from_queue_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stream| stream.queue_name() == name)
    }
}

impl fmt::Display for SensorStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.queue_name())
    }
}
