//! Constants for SmokeAlert Core
//!
//! Window sizes, alert thresholds and stream identifiers used by the default
//! smoker/food deployment. Detectors and the router take these as defaults;
//! the rule types accept overrides at construction.

// ===== WINDOW SIZES =====

/// Number of readings in the smoker drop window.
///
/// Five successive readings is a short enough span that a fall of more
/// than [`SMOKER_DROP_THRESHOLD_DEG`] means the fire is going out.
pub const SMOKER_WINDOW: usize = 5;

/// Number of readings in the food stall window.
///
/// Twenty readings is long enough that a flat line reflects the meat
/// plateauing rather than probe noise.
pub const FOOD_WINDOW: usize = 20;

// ===== ALERT THRESHOLDS =====

/// Smoker alert fires when `oldest - newest` is strictly greater than this.
pub const SMOKER_DROP_THRESHOLD_DEG: f64 = 15.0;

/// Food alert fires when `max - min` over the window is at most this.
///
/// There is no lower bound on the absolute temperature, so a probe sitting
/// at ambient temperature also reads as stalled.
pub const FOOD_STALL_MAX_SPREAD_DEG: f64 = 1.0;

// ===== DELIVERY =====

/// Unacknowledged deliveries a consumer may hold at once.
pub const MAX_IN_FLIGHT: usize = 1;

/// Slice a consumer waits for the next delivery before re-checking its
/// stop signal. Not a timeout: an empty slice is not an error.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

// ===== STREAM NAMES =====

/// Queue carrying smoker readings
pub const SMOKER_STREAM: &str = "01-smoker";

/// Queue carrying food A readings
pub const FOOD_A_STREAM: &str = "02-food-A";

/// Queue carrying food B readings
pub const FOOD_B_STREAM: &str = "03-food-B";

// ===== RECORD LIMITS =====

/// Maximum fields considered in one source record (timestamp + values).
///
/// Extra columns are ignored.
pub const MAX_RECORD_FIELDS: usize = 8;

/// Payload field separator on the wire (`timestamp,value`).
///
/// Timestamps cannot contain it: a source timestamp such as a quoted
/// `"Mar 23, 2022"` CSV cell is rejected by the router, so the value is
/// dropped there instead of reaching a consumer as a malformed payload.
pub const PAYLOAD_SEPARATOR: char = ',';
