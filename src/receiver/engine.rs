//! Single-frame receive step shared by both receive disciplines.
//!
//! [`Engine::step`] reads at most one frame, files it into the pool and
//! reports what happened. The blocking receiver loops over it; the poll
//! receiver calls it once per tick. Pool exhaustion is resolved inside the
//! step by a single salvage read, so neither caller recurses.

use tracing::{debug, trace, warn};

use super::{DropReason, ReassembledMessage};
use crate::{
    clock::{Clock, Tick, TimeoutWindow},
    config::{ExhaustionPolicy, PoolConfig},
    error::ReceiveError,
    fragment::{FragmentHeader, FragmentKind, HEADER_LEN, MessageId},
    host::FrameLink,
    metrics::{self, Direction},
    pool::{ReassemblyPool, SlotIndex},
};

/// What a completed frame unlocked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Completion {
    /// An unfragmented message sitting in one slot.
    Single(SlotIndex),
    /// Every fragment of a group is present.
    Group(MessageId),
}

/// Outcome of one receive step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    /// The link had nothing to deliver.
    Empty,
    /// A frame arrived and was thrown away.
    Discarded(DropReason),
    /// A fragment was stored; its group is still incomplete.
    Pending(MessageId),
    /// A message is ready to be taken.
    Complete(Completion),
}

#[derive(Debug)]
pub(crate) struct Engine {
    config: PoolConfig,
    pool: ReassemblyPool,
    clock: Clock,
    window: TimeoutWindow,
    salvage: Box<[u8]>,
}

impl Engine {
    /// `config` must already be validated.
    pub(crate) fn new(config: PoolConfig) -> Self {
        Self {
            pool: ReassemblyPool::new(&config),
            clock: Clock::default(),
            window: TimeoutWindow::from_config(&config),
            salvage: vec![0; config.max_frame_size].into_boxed_slice(),
            config,
        }
    }

    pub(crate) fn config(&self) -> &PoolConfig { &self.config }

    pub(crate) fn pool(&self) -> &ReassemblyPool { &self.pool }

    pub(crate) fn pool_mut(&mut self) -> &mut ReassemblyPool { &mut self.pool }

    pub(crate) fn now<L: FrameLink + ?Sized>(&self, link: &mut L) -> Tick { self.clock.now(link) }

    /// Wait out the configured poll interval.
    pub(crate) fn pause<L: FrameLink + ?Sized>(&self, link: &mut L) {
        link.delay_ms(self.config.poll_interval_ms());
    }

    /// Read and file at most one frame.
    ///
    /// Only empty reads move the attempt clock, so fragments stored in a
    /// burst never age each other out.
    pub(crate) fn step<L: FrameLink + ?Sized>(&mut self, link: &mut L) -> Result<Step, ReceiveError> {
        let now = self.now(link);
        let (slot, len) = match self.pool.acquire_free_slot(now, &self.window) {
            Some(slot) => {
                let Some(buffer) = self.pool.buffer_mut(slot) else {
                    return Err(ReceiveError::PoolExhausted);
                };
                let capacity = buffer.len();
                let len = link.receive_frame(buffer);
                check_len(len, capacity)?;
                if len == 0 {
                    return Ok(self.idle());
                }
                (slot, len)
            }
            None => match self.salvage(link, now)? {
                Some(placed) => placed,
                None => return Ok(self.idle()),
            },
        };
        metrics::inc_frames(Direction::Inbound);
        trace!(slot = %slot, len, "frame received");
        Ok(self.classify(slot, len, now))
    }

    fn idle(&mut self) -> Step {
        self.clock.advance();
        Step::Empty
    }

    /// Reassemble a completed message and release its slots.
    ///
    /// On allocation failure the slots stay occupied so the caller can retry.
    pub(crate) fn take(&mut self, completion: Completion) -> Result<ReassembledMessage, ReceiveError> {
        let (id, slots) = match completion {
            Completion::Single(slot) => {
                let id = self.pool.header(slot).map(|header| header.id()).unwrap_or_default();
                (id, vec![slot])
            }
            Completion::Group(id) => (id, self.pool.slots_for(id)),
        };
        let payload = self.pool.concatenate(&slots).inspect_err(|err| {
            warn!(message_id = %id, error = %err, "reassembly buffer allocation failed");
        })?;
        for slot in slots {
            self.pool.free(slot);
        }
        metrics::inc_reassembled();
        debug!(message_id = %id, len = payload.len(), "message reassembled");
        Ok(ReassembledMessage::new(id, payload))
    }

    /// Reclaim capacity when no slot is free, following the exhaustion
    /// policy. Returns the slot and length of a salvaged frame worth keeping.
    fn salvage<L: FrameLink + ?Sized>(
        &mut self,
        link: &mut L,
        now: Tick,
    ) -> Result<Option<(SlotIndex, usize)>, ReceiveError> {
        if self.config.exhaustion_policy == ExhaustionPolicy::ResetPool {
            self.pool.reset();
            metrics::inc_pool_exhausted();
            warn!("reassembly pool full; all slots reset, flush the link before retrying");
            return Err(ReceiveError::PoolExhausted);
        }

        let capacity = self.salvage.len();
        let len = link.receive_frame(&mut self.salvage);
        check_len(len, capacity)?;
        if len == 0 {
            return Ok(None);
        }

        let frame = self.salvage.get(..len).unwrap_or_default();
        let held = FragmentHeader::from_frame(frame)
            .filter(|_| len > HEADER_LEN)
            .map(|header| header.id())
            .filter(|&id| self.pool.group_len(id) > 0);

        if let Some(id) = held {
            let freed = self.pool.free_all_for(id);
            warn!(message_id = %id, freed, "reassembly pool full; abandoned partial message");
            let slot = self
                .pool
                .acquire_free_slot(now, &self.window)
                .ok_or(ReceiveError::PoolExhausted)?;
            if !self.pool.copy_into(slot, frame) {
                return Err(ReceiveError::PoolExhausted);
            }
            return Ok(Some((slot, len)));
        }

        metrics::inc_pool_exhausted();
        metrics::inc_dropped(DropReason::PoolFull.as_str());
        match self.pool.stalest_group() {
            Some(victim) => {
                let freed = self.pool.free_all_for(victim);
                warn!(
                    message_id = %victim,
                    freed,
                    "reassembly pool full; evicted stalest partial message"
                );
            }
            None => warn!("reassembly pool full and no group to evict"),
        }
        Err(ReceiveError::PoolExhausted)
    }

    fn classify(&mut self, slot: SlotIndex, len: usize, now: Tick) -> Step {
        let Some(header) = self.pool.ingest(slot, len, now) else {
            return self.discard(slot, None, DropReason::TooShort);
        };
        match header.kind() {
            FragmentKind::Unfragmented => Step::Complete(Completion::Single(slot)),
            FragmentKind::NonTerminal => self.admit(slot, header, false),
            FragmentKind::Terminal => self.admit(slot, header, true),
            FragmentKind::Malformed(reason) => {
                debug!(message_id = %header.id(), %reason, "malformed header");
                self.discard(slot, Some(header.id()), DropReason::Malformed)
            }
        }
    }

    fn admit(&mut self, slot: SlotIndex, header: FragmentHeader, terminal: bool) -> Step {
        let id = header.id();
        let Some(index) = header.offset().fragment_index(self.config.max_frame_size) else {
            return self.discard(slot, Some(id), DropReason::Misaligned);
        };
        if index >= self.config.pool_size {
            return self.discard(slot, Some(id), DropReason::OutOfRange);
        }
        if !terminal && self.pool.payload_len(slot) != self.config.max_payload() {
            return self.discard(slot, Some(id), DropReason::ShortFragment);
        }
        if self.pool.find_fragment(id, header.offset(), slot).is_some() {
            return self.discard(slot, Some(id), DropReason::Duplicate);
        }
        if !self.is_consistent(id, index, terminal) {
            let freed = self.pool.free_all_for(id);
            warn!(message_id = %id, freed, "inconsistent fragment group discarded");
            metrics::inc_dropped(DropReason::Inconsistent.as_str());
            return Step::Discarded(DropReason::Inconsistent);
        }
        if terminal {
            self.pool.mark_terminal(slot);
        }
        if self.pool.is_complete(id) {
            Step::Complete(Completion::Group(id))
        } else {
            Step::Pending(id)
        }
    }

    /// Whether a new fragment at `index` agrees with the group's terminal.
    fn is_consistent(&self, id: MessageId, index: usize, terminal: bool) -> bool {
        match self.pool.terminal_for(id) {
            Some(_) if terminal => false,
            Some(existing) => self
                .pool
                .fragment_index(existing)
                .is_some_and(|last| index < last),
            None if terminal => self.pool.slots_for(id).into_iter().all(|member| {
                self.pool
                    .fragment_index(member)
                    .is_some_and(|position| position <= index)
            }),
            None => true,
        }
    }

    fn discard(&mut self, slot: SlotIndex, id: Option<MessageId>, reason: DropReason) -> Step {
        self.pool.free(slot);
        metrics::inc_dropped(reason.as_str());
        debug!(slot = %slot, message_id = ?id.map(MessageId::get), %reason, "frame discarded");
        Step::Discarded(reason)
    }
}

fn check_len(reported: usize, capacity: usize) -> Result<(), ReceiveError> {
    if reported > capacity {
        return Err(ReceiveError::TransportInvalid { reported, capacity });
    }
    Ok(())
}
