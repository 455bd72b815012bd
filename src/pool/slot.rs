use derive_more::{Display, From, Into};

use crate::{
    clock::Tick,
    fragment::{FragmentHeader, HEADER_LEN},
};

/// Position of a slot inside a [`ReassemblyPool`](super::ReassemblyPool).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
#[display("{_0}")]
pub struct SlotIndex(usize);

impl SlotIndex {
    /// Wrap a raw index.
    #[must_use]
    pub const fn new(index: usize) -> Self { Self(index) }

    /// Return the raw index.
    #[must_use]
    pub const fn get(self) -> usize { self.0 }
}

/// Storage for one received frame.
#[derive(Debug)]
pub(super) struct Slot {
    raw: Box<[u8]>,
    payload_len: usize,
    is_terminal: bool,
    last_touched: Tick,
}

impl Slot {
    pub(super) fn new(frame_size: usize) -> Self {
        Self {
            raw: vec![0; frame_size].into_boxed_slice(),
            payload_len: 0,
            is_terminal: false,
            last_touched: Tick::Attempt(0),
        }
    }

    pub(super) fn is_free(&self) -> bool { self.payload_len == 0 }

    pub(super) fn raw_mut(&mut self) -> &mut [u8] { &mut self.raw }

    pub(super) fn occupy(&mut self, frame_len: usize, now: Tick) {
        self.payload_len = frame_len.saturating_sub(HEADER_LEN);
        self.is_terminal = false;
        self.last_touched = now;
    }

    pub(super) fn clear(&mut self) {
        self.payload_len = 0;
        self.is_terminal = false;
    }

    pub(super) fn header(&self) -> Option<FragmentHeader> { FragmentHeader::from_frame(&self.raw) }

    pub(super) fn payload(&self) -> &[u8] {
        self.raw
            .get(HEADER_LEN..HEADER_LEN + self.payload_len)
            .unwrap_or_default()
    }

    pub(super) fn payload_len(&self) -> usize { self.payload_len }

    pub(super) fn is_terminal(&self) -> bool { self.is_terminal }

    pub(super) fn mark_terminal(&mut self) { self.is_terminal = true; }

    pub(super) fn last_touched(&self) -> Tick { self.last_touched }
}
