//! Metric helpers for `fragpool`.
//!
//! This module defines metric names and thin helpers wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to nothing.

/// Name of the counter tracking frames sent and received.
pub const FRAMES_TOTAL: &str = "fragpool_frames_total";
/// Name of the counter tracking frames dropped by the receiver.
pub const FRAMES_DROPPED: &str = "fragpool_frames_dropped_total";
/// Name of the counter tracking messages handed to the caller.
pub const MESSAGES_REASSEMBLED: &str = "fragpool_messages_reassembled_total";
/// Name of the counter tracking pool exhaustion events.
pub const POOL_EXHAUSTED: &str = "fragpool_pool_exhausted_total";

/// Direction of frame processing.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    /// Frames read from the link.
    Inbound,
    /// Frames written to the link.
    Outbound,
}

impl Direction {
    #[cfg_attr(not(feature = "metrics"), expect(dead_code, reason = "metrics disabled"))]
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Record a frame for the given direction.
pub fn inc_frames(direction: Direction) {
    #[cfg(feature = "metrics")]
    metrics::counter!(FRAMES_TOTAL, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record a dropped inbound frame, labelled with why it was dropped.
pub fn inc_dropped(reason: &'static str) {
    #[cfg(feature = "metrics")]
    metrics::counter!(FRAMES_DROPPED, "reason" => reason).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = reason;
}

/// Record a message returned to the caller.
pub fn inc_reassembled() {
    #[cfg(feature = "metrics")]
    metrics::counter!(MESSAGES_REASSEMBLED).increment(1);
}

/// Record a pool exhaustion event.
pub fn inc_pool_exhausted() {
    #[cfg(feature = "metrics")]
    metrics::counter!(POOL_EXHAUSTED).increment(1);
}
