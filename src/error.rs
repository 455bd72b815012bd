//! Error types surfaced by configuration, transmission and reception.
//!
//! Malformed or stale frames never appear here: the receiver drops them,
//! logs the reason and keeps going. Everything in this module is reported to
//! the caller and is recoverable by the caller.

use thiserror::Error;

/// Configuration rejected at construction time.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The header offset counts 8-byte units, so frames must align to them.
    #[error("max frame size {frame_size} is not a multiple of 8")]
    FrameSizeNotMultipleOfEight {
        /// Configured frame size.
        frame_size: usize,
    },
    /// The frame cannot hold a header and at least one payload byte.
    #[error("max frame size {frame_size} is below the minimum of {minimum}")]
    FrameTooSmall {
        /// Configured frame size.
        frame_size: usize,
        /// Smallest accepted frame size.
        minimum: usize,
    },
    /// A pool without slots cannot receive anything.
    #[error("pool size must be at least one slot")]
    EmptyPool,
    /// The last fragment of a full pool would not fit the 13-bit offset.
    #[error("{pool_size} fragments of {frame_size} bytes overflow the 13-bit offset field")]
    OffsetOverflow {
        /// Configured pool size.
        pool_size: usize,
        /// Configured frame size.
        frame_size: usize,
    },
    /// Attempt budgets divide the timeout by the poll interval.
    #[error("poll interval must be non-zero")]
    ZeroPollInterval,
}

/// Invalid arguments passed to the transmit path.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TransmitError {
    /// An empty buffer has no representation on the wire.
    #[error("cannot transmit an empty message")]
    EmptyMessage,
    /// The receiver's pool could never hold every fragment of the message.
    #[error("message of {len} bytes exceeds the {limit} byte limit")]
    MessageTooLarge {
        /// Length of the rejected buffer.
        len: usize,
        /// Largest buffer the configuration can carry.
        limit: usize,
    },
}

/// Failures reported by the receive paths.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ReceiveError {
    /// No message completed within the time or attempt budget. Partial
    /// groups stay in the pool for the next call.
    #[error("no message completed before the receive timeout")]
    Timeout,
    /// No slot could be reclaimed. The pool has already evicted at least one
    /// group or been reset according to the configured policy.
    #[error("reassembly pool exhausted")]
    PoolExhausted,
    /// The reassembled buffer could not be allocated. The group is left in
    /// the pool so a later call can retry.
    #[error("failed to allocate {len} bytes for a reassembled message")]
    AllocationFailure {
        /// Requested buffer length.
        len: usize,
    },
    /// The link reported more bytes than the buffer it was handed.
    #[error("link reported {reported} bytes for a {capacity} byte buffer")]
    TransportInvalid {
        /// Length reported by the link.
        reported: usize,
        /// Capacity of the buffer passed to the link.
        capacity: usize,
    },
}
