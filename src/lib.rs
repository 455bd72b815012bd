#![doc(html_root_url = "https://docs.rs/fragpool/latest")]
//! Public API for the `fragpool` library.
//!
//! This crate carries byte messages larger than a link's frame limit. The
//! sender splits a message into frames tagged with a four-byte header; the
//! receiver files incoming frames into a fixed pool of slots and hands back
//! the message once every fragment is present, whatever order they arrived
//! in.
//!
//! The engine is synchronous and owns no I/O. Everything it needs from the
//! outside world goes through [`FrameLink`].

pub mod byte_order;
pub mod clock;
pub mod config;
pub mod error;
pub mod fragment;
pub mod host;
pub mod metrics;
pub mod pool;
pub mod receiver;
pub mod test_helpers;

pub use config::{ExhaustionPolicy, PoolConfig};
pub use error::{ConfigError, ReceiveError, TransmitError};
pub use fragment::{
    FragmentFrame,
    FragmentHeader,
    FragmentKind,
    FragmentOffset,
    Fragmenter,
    Fragments,
    HEADER_LEN,
    MessageId,
};
pub use host::FrameLink;
pub use self::metrics::{FRAMES_DROPPED, FRAMES_TOTAL, MESSAGES_REASSEMBLED, POOL_EXHAUSTED};
pub use pool::{ReassemblyPool, SlotIndex};
pub use receiver::{DropReason, PollReceiver, PollStatus, ReassembledMessage, Receiver};
