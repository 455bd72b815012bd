//! Fragment wire format and the outbound splitter.
//!
//! This module collects the types that describe a single frame on the wire:
//! the four-byte [`FragmentHeader`], its identifier and offset fields, and the
//! [`Fragmenter`] that produces header-tagged frames from a message.

pub mod fragmenter;
pub mod header;
pub mod id;

pub use fragmenter::{FragmentFrame, Fragmenter, Fragments};
pub use header::{
    FragmentHeader,
    FragmentKind,
    FragmentOffset,
    HEADER_LEN,
    HeaderFlags,
    MalformedHeader,
    OFFSET_UNIT,
};
pub use id::MessageId;

#[cfg(test)]
mod tests;
