//! Core alert engine for SmokeAlert
//!
//! Watches a smoker and two food probes by fanning one multi-column source out
//! into independent per-sensor streams and running a sliding-window detector
//! on each stream.
//!
//! Key constraints:
//! - Fixed-size windows, no growth after construction
//! - One in-flight reading per detector, so no locking around window state
//! - Malformed payloads are dropped at the ingestion boundary, never raised
//!
//! ```no_run
//! use smokealert_core::{AlertDetector, DropDetector, Reading};
//!
//! let mut smoker = DropDetector::smoker();
//!
//! for (ts, value) in [("12:00", 320.0), ("12:01", 310.0), ("12:02", 300.0),
//!                     ("12:03", 290.0), ("12:04", 280.0)] {
//!     if let Some(alert) = smoker.on_reading(&Reading::new(ts, value)) {
//!         println!("{}", alert);
//!     }
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

// Macros for optional logging
#[cfg(feature = "log")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "log")]
macro_rules! log_info {
    ($($arg:tt)*) => { log::info!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_info {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "log")]
macro_rules! log_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

pub mod buffer;
pub mod channel;
pub mod constants;
pub mod consumer;
pub mod detector;
pub mod errors;
pub mod events;
pub mod reading;
pub mod router;
pub mod sink;
pub mod stream;
pub mod traits;

// Public API
pub use buffer::SlidingWindow;
pub use consumer::{ConsumerStats, StreamConsumer};
pub use detector::{AlertDetector, DropDetector, DropRule, StallDetector, StallRule, WindowDetector, WindowRule};
pub use errors::{ChannelError, PayloadError};
pub use events::{AlertEvent, SensorStream};
pub use reading::Reading;
pub use router::{RouterStats, StreamRouter};
pub use sink::AlertSink;
pub use traits::{Delivery, DeliveryChannel, DeliveryTag, Stream};

#[cfg(feature = "channel-memory")]
pub use channel::{MemoryBroker, MemoryChannel};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
