//! Stream Processing Traits
//!
//! Record sources follow a pull-based model using the `nb` crate: the router
//! asks for the next record when it is ready for one, and the source answers
//! with a record, `WouldBlock`, or an error.
//!
//! ## Common Patterns
//!
//! ```rust
//! use smokealert_core::traits::Stream;
//! use smokealert_core::stream::Record;
//!
//! fn count_records<S>(source: &mut S) -> Result<usize, S::Error>
//! where
//!     S: Stream<Item = Record>,
//! {
//!     let mut count = 0;
//!     loop {
//!         match source.poll_next() {
//!             Ok(_) => count += 1,
//!             Err(nb::Error::WouldBlock) => continue,
//!             Err(nb::Error::Other(e)) => return Err(e),
//!         }
//!     }
//! }
//! ```

/// Core stream trait for record sources
///
/// ## Error Handling
///
/// Streams use a two-level error model:
/// - `nb::Error::WouldBlock` - Temporary unavailability
/// - `nb::Error::Other(E)` - Stream errors, including end of stream
///
/// Finite sources (files, in-memory lists) report exhaustion as an error
/// value (`StreamError::EndOfStream`) and keep reporting it on every
/// further call.
pub trait Stream {
    /// Type of items produced by the stream
    type Item;

    /// Type of errors that can occur
    type Error;

    /// Attempt to pull the next item from the stream
    ///
    /// Returns:
    /// - `Ok(item)` - Next item available
    /// - `Err(nb::Error::WouldBlock)` - No data available yet
    /// - `Err(nb::Error::Other(e))` - Stream error occurred
    fn poll_next(&mut self) -> nb::Result<Self::Item, Self::Error>;

    /// Returns bounds on remaining items
    ///
    /// Default implementation returns `(0, None)` indicating unknown size.
    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, None)
    }
}
