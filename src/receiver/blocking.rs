use std::time::Duration;

use tracing::debug;

use super::{
    ReassembledMessage,
    engine::{Completion, Engine, Step},
};
use crate::{
    clock::{Budget, TimeoutWindow},
    config::PoolConfig,
    error::{ConfigError, ReceiveError},
    host::FrameLink,
    pool::ReassemblyPool,
};

/// Consecutive frames that complete nothing, per pool slot, tolerated before
/// one budget unit is charged.
const FRAMES_PER_CHARGE_PER_SLOT: usize = 4;

/// Receiver that blocks until a message completes or the timeout expires.
///
/// The receiver owns its pool; partial messages survive between calls until
/// they complete, expire or are evicted. A completed message whose buffer
/// could not be allocated is retried first on the next call.
///
/// # Examples
///
/// ```
/// use std::collections::VecDeque;
///
/// use fragpool::{FrameLink, Fragmenter, PoolConfig, Receiver};
///
/// #[derive(Default)]
/// struct Loopback(VecDeque<Vec<u8>>);
///
/// impl FrameLink for Loopback {
///     fn send_frame(&mut self, frame: &[u8]) { self.0.push_back(frame.to_vec()); }
///
///     fn receive_frame(&mut self, buf: &mut [u8]) -> usize {
///         let Some(frame) = self.0.pop_front() else {
///             return 0;
///         };
///         buf[..frame.len()].copy_from_slice(&frame);
///         frame.len()
///     }
/// }
///
/// let config = PoolConfig::new(16, 4).expect("valid config");
/// let mut link = Loopback::default();
/// let mut fragmenter = Fragmenter::new(&config).expect("fragmenter");
/// let mut receiver = Receiver::new(config).expect("receiver");
///
/// let message: Vec<u8> = (0..40).collect();
/// fragmenter.transmit(&mut link, &message).expect("transmit");
/// let received = receiver.receive(&mut link).expect("message arrives");
/// assert_eq!(received.payload(), message.as_slice());
/// ```
#[derive(Debug)]
pub struct Receiver {
    engine: Engine,
    completed: Option<Completion>,
}

impl Receiver {
    /// Create a receiver with an empty pool.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` fails validation.
    pub fn new(config: PoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            engine: Engine::new(config),
            completed: None,
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

    /// Receive one message within the configured receive timeout.
    ///
    /// # Errors
    ///
    /// See [`Self::receive_within`].
    pub fn receive<L: FrameLink + ?Sized>(
        &mut self,
        link: &mut L,
    ) -> Result<ReassembledMessage, ReceiveError> {
        let timeout = self.engine.config().receive_timeout;
        self.receive_within(link, timeout)
    }

    /// Receive one message, giving up after `timeout`.
    ///
    /// With a host clock the timeout is wall time. Without one it becomes a
    /// number of empty reads: `timeout / poll_interval`, at least one.
    /// Frames that are stored or discarded without completing a message are
    /// only charged once they run `pool_size * 4` in a row.
    ///
    /// # Errors
    ///
    /// - [`ReceiveError::Timeout`] when no message completed in time. Partial
    ///   messages stay buffered.
    /// - [`ReceiveError::PoolExhausted`] when the pool was full and the
    ///   exhaustion policy had to drop data.
    /// - [`ReceiveError::AllocationFailure`] when the output buffer could not
    ///   be allocated. The message stays buffered and the next call hands it
    ///   out before reading the link.
    /// - [`ReceiveError::TransportInvalid`] when the link misreports a length.
    pub fn receive_within<L: FrameLink + ?Sized>(
        &mut self,
        link: &mut L,
        timeout: Duration,
    ) -> Result<ReassembledMessage, ReceiveError> {
        if let Some(completion) = self.completed {
            return self.deliver(completion);
        }
        let poll_ms = self.engine.config().poll_interval_ms();
        let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        let mut budget = Budget::new(TimeoutWindow::new(millis, poll_ms), self.engine.now(link));
        let frame_limit = self.engine.config().pool_size * FRAMES_PER_CHARGE_PER_SLOT;
        let mut fruitless = 0;

        loop {
            match self.engine.step(link)? {
                Step::Complete(completion) => return self.deliver(completion),
                Step::Empty => {
                    fruitless = 0;
                    budget.charge();
                    if !budget.is_spent(self.engine.now(link)) {
                        self.engine.pause(link);
                    }
                }
                Step::Discarded(_) | Step::Pending(_) => {
                    fruitless += 1;
                    if fruitless >= frame_limit {
                        fruitless = 0;
                        budget.charge();
                    }
                }
            }
            if budget.is_spent(self.engine.now(link)) {
                debug!(timeout_ms = millis, "receive timed out");
                return Err(ReceiveError::Timeout);
            }
        }
    }

    fn deliver(&mut self, completion: Completion) -> Result<ReassembledMessage, ReceiveError> {
        self.completed = Some(completion);
        let message = self.engine.take(completion)?;
        self.completed = None;
        Ok(message)
    }
}
