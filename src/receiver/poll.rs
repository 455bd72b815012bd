use tracing::trace;

use super::{
    DropReason,
    ReassembledMessage,
    engine::{Completion, Engine, Step},
};
use crate::{
    config::PoolConfig,
    error::{ConfigError, ReceiveError},
    host::FrameLink,
    pool::ReassemblyPool,
};

/// Result of a single [`PollReceiver::poll`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollStatus {
    /// The link had no frame.
    Idle,
    /// A fragment was stored and its message is still incomplete.
    Pending,
    /// The frame was dropped.
    Discarded(DropReason),
    /// A complete message waits for [`PollReceiver::read_receive`].
    Ready,
}

/// Non-blocking receiver advanced one frame per call.
///
/// Once a message is ready the receiver stops reading from the link until
/// the message is drained with [`PollReceiver::read_receive`].
#[derive(Debug)]
pub struct PollReceiver {
    engine: Engine,
    ready: Option<Completion>,
}

impl PollReceiver {
    /// Create a poll receiver with an empty pool.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` fails validation.
    pub fn new(config: PoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            engine: Engine::new(config),
            ready: None,
        })
    }

    /// Configuration the receiver was built with.
    #[must_use]
    pub fn config(&self) -> &PoolConfig { self.engine.config() }

    /// Inspect the pool.
    #[must_use]
    pub fn pool(&self) -> &ReassemblyPool { self.engine.pool() }

    /// Mutable access to the pool, for hosts that flush or sweep it.
    pub fn pool_mut(&mut self) -> &mut ReassemblyPool { self.engine.pool_mut() }

    /// Whether a complete message is waiting to be read.
    #[must_use]
    pub const fn is_ready(&self) -> bool { self.ready.is_some() }

    /// Read and file at most one frame.
    ///
    /// While a message is ready this returns [`PollStatus::Ready`] without
    /// touching the link.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiveError::PoolExhausted`] when the exhaustion policy had
    /// to drop data, or [`ReceiveError::TransportInvalid`] when the link
    /// misreports a length.
    pub fn poll<L: FrameLink + ?Sized>(&mut self, link: &mut L) -> Result<PollStatus, ReceiveError> {
        if self.ready.is_some() {
            return Ok(PollStatus::Ready);
        }
        Ok(match self.engine.step(link)? {
            Step::Empty => PollStatus::Idle,
            Step::Pending(_) => PollStatus::Pending,
            Step::Discarded(reason) => PollStatus::Discarded(reason),
            Step::Complete(completion) => {
                trace!(?completion, "message ready");
                self.ready = Some(completion);
                PollStatus::Ready
            }
        })
    }

    /// Take the ready message, if any.
    ///
    /// Returns `Ok(None)` when no message is ready.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiveError::AllocationFailure`] if the output buffer
    /// cannot be allocated. The message stays ready and can be read again.
    pub fn read_receive(&mut self) -> Result<Option<ReassembledMessage>, ReceiveError> {
        let Some(completion) = self.ready else {
            return Ok(None);
        };
        let message = self.engine.take(completion)?;
        self.ready = None;
        Ok(Some(message))
    }
}
