//! Inbound side: the blocking and polling receivers and the message they
//! hand back.
//!
//! Both receivers wrap the same engine and pool. [`Receiver`] drives the
//! engine until a message completes or its budget runs out. [`PollReceiver`]
//! advances it by one frame per call and leaves the drain to
//! [`PollReceiver::read_receive`], for hosts that cannot block.

mod blocking;
mod engine;
mod poll;

pub use blocking::Receiver;
use derive_more::Display;
pub use poll::{PollReceiver, PollStatus};

use crate::fragment::MessageId;

/// Why the receiver threw a frame away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum DropReason {
    /// The frame carried no payload after the header.
    #[display("too short")]
    TooShort,
    /// The header combination is invalid.
    #[display("malformed header")]
    Malformed,
    /// The offset does not land on a frame boundary.
    #[display("misaligned offset")]
    Misaligned,
    /// The offset lies beyond what the pool can hold.
    #[display("offset out of range")]
    OutOfRange,
    /// A non-terminal fragment was not a full frame.
    #[display("short fragment")]
    ShortFragment,
    /// A fragment with the same identifier and offset is already held.
    #[display("duplicate")]
    Duplicate,
    /// The fragment contradicts its group, so the whole group was dropped.
    #[display("inconsistent group")]
    Inconsistent,
    /// The pool had no room and the frame matched no held group.
    #[display("pool full")]
    PoolFull,
}

impl DropReason {
    /// Label used for the dropped-frames metric.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TooShort => "too_short",
            Self::Malformed => "malformed",
            Self::Misaligned => "misaligned",
            Self::OutOfRange => "out_of_range",
            Self::ShortFragment => "short_fragment",
            Self::Duplicate => "duplicate",
            Self::Inconsistent => "inconsistent",
            Self::PoolFull => "pool_full",
        }
    }
}

/// Container for a fully reassembled message payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReassembledMessage {
    message_id: MessageId,
    payload: Vec<u8>,
}

impl ReassembledMessage {
    /// Construct a new [`ReassembledMessage`].
    #[must_use]
    pub fn new(message_id: MessageId, payload: Vec<u8>) -> Self {
        Self {
            message_id,
            payload,
        }
    }

    /// Identifier shared by the fragments that formed this message.
    #[must_use]
    pub const fn message_id(&self) -> MessageId { self.message_id }

    /// Borrow the reassembled payload.
    #[must_use]
    pub fn payload(&self) -> &[u8] { self.payload.as_slice() }

    /// Consume the message, returning the owned payload bytes.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> { self.payload }
}
