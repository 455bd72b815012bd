#![cfg(any(test, feature = "test-helpers"))]
//! Test-only helpers shared by unit and integration tests.

use std::collections::VecDeque;

use crate::{
    config::PoolConfig,
    fragment::{Fragmenter, MessageId},
    host::FrameLink,
};

/// In-memory [`FrameLink`] driven by a script of inbound frames.
///
/// Outbound frames are recorded rather than delivered; call
/// [`ScriptedLink::loop_back`] to feed them to the receive side. The optional
/// clock only moves when the code under test calls `delay_ms` or a test calls
/// [`ScriptedLink::advance_clock`].
#[derive(Debug, Default)]
pub struct ScriptedLink {
    inbound: VecDeque<Vec<u8>>,
    sent: Vec<Vec<u8>>,
    ids: VecDeque<u16>,
    delays: Vec<u32>,
    clock: Option<u32>,
    overstate_by: usize,
    reads: usize,
}

impl ScriptedLink {
    /// Link without a clock or random source.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Link whose millisecond clock starts at `start`.
    #[must_use]
    pub fn with_clock(start: u32) -> Self {
        Self {
            clock: Some(start),
            ..Self::default()
        }
    }

    /// Queue identifiers returned by `random_id`, in order.
    #[must_use]
    pub fn with_random_ids(mut self, ids: impl IntoIterator<Item = u16>) -> Self {
        self.ids.extend(ids);
        self
    }

    /// Make every read report `extra` more bytes than it copied.
    #[must_use]
    pub fn overstating_lengths(mut self, extra: usize) -> Self {
        self.overstate_by = extra;
        self
    }

    /// Queue one inbound frame.
    pub fn push(&mut self, frame: impl Into<Vec<u8>>) { self.inbound.push_back(frame.into()); }

    /// Queue several inbound frames.
    pub fn extend<I, F>(&mut self, frames: I)
    where
        I: IntoIterator<Item = F>,
        F: Into<Vec<u8>>,
    {
        self.inbound.extend(frames.into_iter().map(Into::into));
    }

    /// Move every recorded outbound frame to the inbound queue.
    pub fn loop_back(&mut self) { self.inbound.extend(self.sent.drain(..)); }

    /// Frames sent so far.
    #[must_use]
    pub fn sent(&self) -> &[Vec<u8>] { &self.sent }

    /// Delays requested so far, in milliseconds.
    #[must_use]
    pub fn delays(&self) -> &[u32] { &self.delays }

    /// Inbound frames not yet read.
    #[must_use]
    pub fn pending(&self) -> usize { self.inbound.len() }

    /// Number of `receive_frame` calls, including empty ones.
    #[must_use]
    pub const fn reads(&self) -> usize { self.reads }

    /// Move the clock forward by `ms`, if there is one.
    pub fn advance_clock(&mut self, ms: u32) {
        if let Some(now) = self.clock.as_mut() {
            *now = now.wrapping_add(ms);
        }
    }
}

impl FrameLink for ScriptedLink {
    fn send_frame(&mut self, frame: &[u8]) { self.sent.push(frame.to_vec()); }

    fn receive_frame(&mut self, buf: &mut [u8]) -> usize {
        self.reads += 1;
        let Some(frame) = self.inbound.pop_front() else {
            return 0;
        };
        let len = frame.len().min(buf.len());
        buf[..len].copy_from_slice(&frame[..len]);
        len + self.overstate_by
    }

    fn random_id(&mut self) -> Option<u16> { self.ids.pop_front() }

    fn delay_ms(&mut self, ms: u32) {
        self.delays.push(ms);
        self.advance_clock(ms);
    }

    fn now_ms(&mut self) -> Option<u32> { self.clock }
}

/// Encode `payload` as the frames a fragmenter for `config` would send
/// under `id`.
///
/// # Panics
///
/// Panics if `config` is invalid or `payload` cannot be fragmented.
#[must_use]
pub fn encode_frames(config: &PoolConfig, id: u16, payload: &[u8]) -> Vec<Vec<u8>> {
    let fragmenter = Fragmenter::new(config).expect("valid configuration");
    fragmenter
        .fragments(MessageId::new(id), payload)
        .expect("payload fits the pool")
        .map(|frame| frame.to_vec())
        .collect()
}

/// Deterministic payload of `len` bytes.
#[must_use]
pub fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| u8::try_from(i % 251).unwrap_or_default()).collect()
}
