//! Delivery channel implementations shipped with the core
//!
//! - `memory` - In-process broker with durable queues and manual acks
//!   (requires `std`). Used by tests and by single-process replays.
//!
//! Network brokers live in `smokealert-connectors`.

#[cfg(feature = "channel-memory")]
pub mod memory;

#[cfg(feature = "channel-memory")]
pub use memory::{MemoryBroker, MemoryChannel};
