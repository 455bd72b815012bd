//! Fixed-capacity storage for fragments awaiting reassembly.
//!
//! [`ReassemblyPool`] owns every receive-side buffer. Each slot holds exactly
//! one frame. Groups are never stored explicitly: a group is the set of
//! occupied slots whose header carries the same [`MessageId`], and the
//! queries below (`slots_for`, `terminal_for`, `is_complete`, ...) derive it
//! on demand with a linear scan. All scans run in ascending slot order, so
//! slot selection and eviction are deterministic.

mod slot;

use log::debug;
pub use slot::SlotIndex;
use slot::Slot;

use crate::{
    clock::{Tick, TimeoutWindow},
    config::PoolConfig,
    error::ReceiveError,
    fragment::{FragmentHeader, FragmentOffset, HEADER_LEN, MessageId},
};

/// Slot pool shared by both receive disciplines.
#[derive(Debug)]
pub struct ReassemblyPool {
    slots: Vec<Slot>,
    frame_size: usize,
    allocation_limit: Option<usize>,
}

impl ReassemblyPool {
    /// Allocate `config.pool_size` slots of `config.max_frame_size` bytes.
    ///
    /// `config` is expected to be validated.
    #[must_use]
    pub fn new(config: &PoolConfig) -> Self {
        let slots = (0..config.pool_size)
            .map(|_| Slot::new(config.max_frame_size))
            .collect();
        Self {
            slots,
            frame_size: config.max_frame_size,
            allocation_limit: None,
        }
    }

    /// Make [`Self::concatenate`] fail for messages longer than `limit`
    /// bytes, simulating an allocator that has run dry. `None` lifts the
    /// limit.
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn set_allocation_limit(&mut self, limit: Option<usize>) { self.allocation_limit = limit; }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize { self.slots.len() }

    /// Number of occupied slots.
    #[must_use]
    pub fn occupied(&self) -> usize { self.slots.iter().filter(|slot| !slot.is_free()).count() }

    /// Whether `slot` holds no frame. Out-of-range indices report free.
    #[must_use]
    pub fn is_free(&self, slot: SlotIndex) -> bool { self.slot(slot).is_none_or(Slot::is_free) }

    /// Return the first free slot in ascending order.
    ///
    /// Occupied slots met during the scan whose age has reached `window` are
    /// freed on the spot and may be returned.
    pub fn acquire_free_slot(&mut self, now: Tick, window: &TimeoutWindow) -> Option<SlotIndex> {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_free() {
                return Some(SlotIndex::new(index));
            }
            if window.has_elapsed(slot.last_touched(), now) {
                debug!(
                    "expiring stale fragment: slot={index}, message_id={:?}",
                    slot.header().map(|header| header.id())
                );
                slot.clear();
                return Some(SlotIndex::new(index));
            }
        }
        None
    }

    /// Whether the frame in `slot` has reached the age limit.
    #[must_use]
    pub fn age_check(&self, slot: SlotIndex, now: Tick, window: &TimeoutWindow) -> bool {
        self.slot(slot)
            .is_some_and(|slot| !slot.is_free() && window.has_elapsed(slot.last_touched(), now))
    }

    /// Free every slot whose age has reached `window`, returning how many
    /// were freed.
    pub fn expire(&mut self, now: Tick, window: &TimeoutWindow) -> usize {
        let mut expired = 0;
        for slot in &mut self.slots {
            if !slot.is_free() && window.has_elapsed(slot.last_touched(), now) {
                slot.clear();
                expired += 1;
            }
        }
        expired
    }

    /// Buffer the link should write the next frame into.
    pub fn buffer_mut(&mut self, slot: SlotIndex) -> Option<&mut [u8]> {
        self.slots.get_mut(slot.get()).map(Slot::raw_mut)
    }

    /// Record that `frame_len` bytes were written into `slot` at `now` and
    /// decode their header.
    ///
    /// Frames with no payload byte after the header leave the slot free and
    /// yield `None`.
    pub fn ingest(&mut self, slot: SlotIndex, frame_len: usize, now: Tick) -> Option<FragmentHeader> {
        let entry = self.slots.get_mut(slot.get())?;
        if frame_len <= HEADER_LEN {
            entry.clear();
            return None;
        }
        entry.occupy(frame_len, now);
        entry.header()
    }

    /// Copy raw frame bytes into the buffer of `slot` without recording
    /// them. Returns `false` when the slot does not exist or the frame does
    /// not fit.
    ///
    /// Follow with [`Self::ingest`] to occupy the slot.
    pub fn copy_into(&mut self, slot: SlotIndex, frame: &[u8]) -> bool {
        let Some(target) = self
            .buffer_mut(slot)
            .and_then(|buffer| buffer.get_mut(..frame.len()))
        else {
            return false;
        };
        target.copy_from_slice(frame);
        true
    }

    /// Copy a complete frame into `slot` and decode its header.
    pub fn place(&mut self, slot: SlotIndex, frame: &[u8], now: Tick) -> Option<FragmentHeader> {
        if !self.copy_into(slot, frame) {
            return None;
        }
        self.ingest(slot, frame.len(), now)
    }

    /// Header of the frame in `slot`, if occupied.
    #[must_use]
    pub fn header(&self, slot: SlotIndex) -> Option<FragmentHeader> {
        self.occupied_slot(slot).and_then(Slot::header)
    }

    /// Payload length of the frame in `slot`; zero when free.
    #[must_use]
    pub fn payload_len(&self, slot: SlotIndex) -> usize {
        self.slot(slot).map_or(0, Slot::payload_len)
    }

    /// Zero-based fragment position of the frame in `slot`.
    #[must_use]
    pub fn fragment_index(&self, slot: SlotIndex) -> Option<usize> {
        self.header(slot)?.offset().fragment_index(self.frame_size)
    }

    /// Occupied slots carrying `id`, in ascending slot order.
    #[must_use]
    pub fn slots_for(&self, id: MessageId) -> Vec<SlotIndex> {
        self.group(id).collect()
    }

    /// Number of occupied slots carrying `id`.
    #[must_use]
    pub fn group_len(&self, id: MessageId) -> usize { self.group(id).count() }

    /// Slot holding the terminal fragment of `id`, if one has arrived.
    #[must_use]
    pub fn terminal_for(&self, id: MessageId) -> Option<SlotIndex> {
        self.group(id)
            .find(|&index| self.slots[index.get()].is_terminal())
    }

    /// Occupied slot other than `except` carrying `id` at `offset`.
    #[must_use]
    pub fn find_fragment(
        &self,
        id: MessageId,
        offset: FragmentOffset,
        except: SlotIndex,
    ) -> Option<SlotIndex> {
        self.group(id).find(|&index| {
            index != except && self.header(index).is_some_and(|header| header.offset() == offset)
        })
    }

    /// Mark `slot` as the terminal fragment of its group.
    pub fn mark_terminal(&mut self, slot: SlotIndex) {
        if let Some(entry) = self.slots.get_mut(slot.get()) {
            entry.mark_terminal();
        }
    }

    /// Number of fragments the group ending in `terminal` consists of.
    #[must_use]
    pub fn expected_count(&self, terminal: SlotIndex) -> usize {
        self.fragment_index(terminal).map_or(0, |index| index + 1)
    }

    /// Whether every fragment of `id` is present.
    #[must_use]
    pub fn is_complete(&self, id: MessageId) -> bool {
        self.terminal_for(id)
            .is_some_and(|terminal| self.group_len(id) == self.expected_count(terminal))
    }

    /// Copy the payloads of `slots` into a new buffer, each at its fragment
    /// position, regardless of the order the slots are listed in.
    ///
    /// The slots are left untouched so the caller can decide when to free
    /// them.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiveError::AllocationFailure`] if the buffer cannot be
    /// allocated.
    pub fn concatenate(&self, slots: &[SlotIndex]) -> Result<Vec<u8>, ReceiveError> {
        let stride = self.frame_size - HEADER_LEN;
        let mut placed: Vec<(usize, &[u8])> = slots
            .iter()
            .filter_map(|&index| {
                let position = self.fragment_index(index)?;
                Some((position * stride, self.slots[index.get()].payload()))
            })
            .collect();
        placed.sort_unstable_by_key(|&(start, _)| start);

        let len = placed
            .iter()
            .map(|(start, payload)| start + payload.len())
            .max()
            .unwrap_or(0);
        if self.allocation_limit.is_some_and(|limit| len > limit) {
            return Err(ReceiveError::AllocationFailure { len });
        }
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|_| ReceiveError::AllocationFailure { len })?;
        buffer.resize(len, 0);
        for (start, payload) in placed {
            if let Some(target) = buffer.get_mut(start..start + payload.len()) {
                target.copy_from_slice(payload);
            }
        }
        Ok(buffer)
    }

    /// Free `slot`.
    pub fn free(&mut self, slot: SlotIndex) {
        if let Some(entry) = self.slots.get_mut(slot.get()) {
            entry.clear();
        }
    }

    /// Free every slot carrying `id`, returning how many were freed.
    pub fn free_all_for(&mut self, id: MessageId) -> usize {
        let members = self.slots_for(id);
        for &slot in &members {
            self.free(slot);
        }
        members.len()
    }

    /// Free every slot.
    pub fn reset(&mut self) { self.slots.iter_mut().for_each(Slot::clear); }

    /// Identifier of the group whose most recent fragment is the oldest.
    ///
    /// Ties go to the group holding the lowest slot index.
    #[must_use]
    pub fn stalest_group(&self) -> Option<MessageId> {
        let mut stalest: Option<(MessageId, Tick)> = None;
        for index in (0..self.slots.len()).map(SlotIndex::new) {
            let Some(header) = self.header(index) else {
                continue;
            };
            let Some(newest) = self.newest_touch(header.id()) else {
                continue;
            };
            if stalest.is_none_or(|(_, current)| newest.is_before(current)) {
                stalest = Some((header.id(), newest));
            }
        }
        stalest.map(|(id, _)| id)
    }

    fn newest_touch(&self, id: MessageId) -> Option<Tick> {
        self.group(id)
            .map(|index| self.slots[index.get()].last_touched())
            .reduce(|newest, tick| if newest.is_before(tick) { tick } else { newest })
    }

    fn group(&self, id: MessageId) -> impl Iterator<Item = SlotIndex> + '_ {
        (0..self.slots.len())
            .map(SlotIndex::new)
            .filter(move |&index| self.header(index).is_some_and(|header| header.id() == id))
    }

    fn slot(&self, slot: SlotIndex) -> Option<&Slot> { self.slots.get(slot.get()) }

    fn occupied_slot(&self, slot: SlotIndex) -> Option<&Slot> {
        self.slot(slot).filter(|entry| !entry.is_free())
    }
}
