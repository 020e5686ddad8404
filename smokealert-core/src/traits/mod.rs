//! Core traits
//!
//! The seams between the alert engine and its collaborators:
//! - [`Stream`] - pull-based source of records (CSV file, memory)
//! - [`DeliveryChannel`] - durable per-stream queue with manual acks

pub mod channel;
pub mod stream;

pub use channel::{Delivery, DeliveryChannel, DeliveryTag};
pub use stream::Stream;
