//! Configuration shared by the fragmenter and both receivers.
//!
//! [`PoolConfig`] fixes the frame geometry and the receive-side resource
//! bounds. Components validate it once when they are built; afterwards the
//! values are read-only.

use std::time::Duration;

use crate::{
    error::ConfigError,
    fragment::{FragmentOffset, HEADER_LEN, OFFSET_UNIT},
};

/// What the receiver does when every slot is occupied by a live fragment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ExhaustionPolicy {
    /// Read one extra frame. If it belongs to a held group, drop that group
    /// and keep the frame; otherwise drop the stalest group and report
    /// exhaustion.
    #[default]
    EvictGroup,
    /// Free every slot and report exhaustion.
    ResetPool,
}

/// Frame geometry, pool size and timing knobs.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use fragpool::{ExhaustionPolicy, PoolConfig};
///
/// let config = PoolConfig::new(64, 4)
///     .expect("valid geometry")
///     .with_receive_timeout(Duration::from_millis(250))
///     .with_exhaustion_policy(ExhaustionPolicy::ResetPool);
/// assert_eq!(config.max_payload(), 60);
/// assert_eq!(config.max_message_len(), 240);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfig {
    /// Largest frame the link carries, header included. Must be a multiple
    /// of 8.
    pub max_frame_size: usize,
    /// Number of receive slots, which is also the most fragments a single
    /// message may use.
    pub pool_size: usize,
    /// Budget for one blocking receive and the age at which a buffered
    /// fragment becomes reclaimable.
    pub receive_timeout: Duration,
    /// Pause after an empty receive attempt.
    pub poll_interval: Duration,
    /// Pause between consecutive outbound fragments.
    pub fragment_pacing: Duration,
    /// Behaviour when the pool is full.
    pub exhaustion_policy: ExhaustionPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_frame_size: 1400,
            pool_size: 10,
            receive_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(10),
            fragment_pacing: Duration::from_millis(1),
            exhaustion_policy: ExhaustionPolicy::EvictGroup,
        }
    }
}

impl PoolConfig {
    /// Smallest frame able to carry a header and some payload.
    pub const MIN_FRAME_SIZE: usize = OFFSET_UNIT;

    /// Build a validated configuration with default timings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the geometry is unusable.
    pub fn new(max_frame_size: usize, pool_size: usize) -> Result<Self, ConfigError> {
        let config = Self {
            max_frame_size,
            pool_size,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Override the receive timeout.
    #[must_use]
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Override the pause after an empty receive attempt.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the pause between outbound fragments.
    #[must_use]
    pub fn with_fragment_pacing(mut self, pacing: Duration) -> Self {
        self.fragment_pacing = pacing;
        self
    }

    /// Override the pool exhaustion policy.
    #[must_use]
    pub fn with_exhaustion_policy(mut self, policy: ExhaustionPolicy) -> Self {
        self.exhaustion_policy = policy;
        self
    }

    /// Check the invariants every component relies on.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let frame_size = self.max_frame_size;
        if frame_size % OFFSET_UNIT != 0 {
            return Err(ConfigError::FrameSizeNotMultipleOfEight { frame_size });
        }
        if frame_size < Self::MIN_FRAME_SIZE {
            return Err(ConfigError::FrameTooSmall {
                frame_size,
                minimum: Self::MIN_FRAME_SIZE,
            });
        }
        if self.pool_size == 0 {
            return Err(ConfigError::EmptyPool);
        }
        if FragmentOffset::for_fragment(self.pool_size - 1, frame_size).is_none() {
            return Err(ConfigError::OffsetOverflow {
                pool_size: self.pool_size,
                frame_size,
            });
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }

    /// Payload bytes carried by a full frame.
    #[must_use]
    pub const fn max_payload(&self) -> usize { self.max_frame_size - HEADER_LEN }

    /// Largest message the pool can reassemble.
    #[must_use]
    pub const fn max_message_len(&self) -> usize { self.pool_size * self.max_payload() }

    pub(crate) fn receive_timeout_ms(&self) -> u32 { millis(self.receive_timeout) }

    pub(crate) fn poll_interval_ms(&self) -> u32 { millis(self.poll_interval) }

    pub(crate) fn fragment_pacing_ms(&self) -> u32 { millis(self.fragment_pacing) }
}

fn millis(duration: Duration) -> u32 { u32::try_from(duration.as_millis()).unwrap_or(u32::MAX) }

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::{ExhaustionPolicy, PoolConfig};
    use crate::error::ConfigError;

    #[test]
    fn default_configuration_is_valid() {
        let config = PoolConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.max_payload(), 1396);
        assert_eq!(config.exhaustion_policy, ExhaustionPolicy::EvictGroup);
    }

    #[rstest]
    #[case(12, 4, ConfigError::FrameSizeNotMultipleOfEight { frame_size: 12 })]
    #[case(1401, 4, ConfigError::FrameSizeNotMultipleOfEight { frame_size: 1401 })]
    #[case(0, 4, ConfigError::FrameTooSmall { frame_size: 0, minimum: 8 })]
    #[case(16, 0, ConfigError::EmptyPool)]
    #[case(1024, 65, ConfigError::OffsetOverflow { pool_size: 65, frame_size: 1024 })]
    fn rejects_unusable_geometry(
        #[case] frame_size: usize,
        #[case] pool_size: usize,
        #[case] expected: ConfigError,
    ) {
        assert_eq!(PoolConfig::new(frame_size, pool_size), Err(expected));
    }

    #[test]
    fn accepts_largest_pool_that_fits_offset_field() {
        // 64 fragments of 1024 bytes end at offset 63 * 128 = 8064 units.
        assert!(PoolConfig::new(1024, 64).is_ok());
        assert!(PoolConfig::new(8, 1).is_ok());
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let config = PoolConfig::default().with_poll_interval(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroPollInterval));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialises_partial_configuration_over_defaults() {
        let json = r#"{ "max_frame_size": 64, "pool_size": 3, "exhaustion_policy": "reset_pool" }"#;
        let config: PoolConfig = serde_json::from_str(json).expect("config parses");
        assert_eq!(config.max_frame_size, 64);
        assert_eq!(config.pool_size, 3);
        assert_eq!(config.exhaustion_policy, ExhaustionPolicy::ResetPool);
        assert_eq!(config.receive_timeout, Duration::from_secs(1));
        assert_eq!(config.validate(), Ok(()));
    }
}
