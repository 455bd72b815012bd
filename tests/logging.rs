//! Log output for conditions an operator needs to see.
//!
//! `tracing` forwards every event to the `log` facade, so the records are
//! captured with `logtest` through the shared [`LoggerHandle`].

use std::time::Duration;

use fragpool::{ExhaustionPolicy, PollReceiver, PoolConfig, ReceiveError};
use fragpool_testing::{LoggerHandle, ScriptedLink, encode_frames, logger, patterned};
use log::Level;
use rstest::rstest;
use serial_test::serial;

fn exhaust(config: PoolConfig) -> Result<(), ReceiveError> {
    let mut receiver = PollReceiver::new(config).expect("receiver");
    let mut link = ScriptedLink::new();
    for id in 1..=5 {
        link.push(encode_frames(&config, id, &patterned(24)).remove(0));
    }
    for _ in 0..5 {
        receiver.poll(&mut link)?;
    }
    Ok(())
}

#[rstest]
#[serial]
fn eviction_is_logged_as_warning(mut logger: LoggerHandle) {
    let config = PoolConfig::new(16, 4).expect("valid config");
    assert_eq!(exhaust(config), Err(ReceiveError::PoolExhausted));
    assert!(logger.contains(Level::Warn, "evicted stalest partial message"));
}

#[rstest]
#[serial]
fn reset_is_logged_as_warning(mut logger: LoggerHandle) {
    let config = PoolConfig::new(16, 4)
        .expect("valid config")
        .with_exhaustion_policy(ExhaustionPolicy::ResetPool);
    assert_eq!(exhaust(config), Err(ReceiveError::PoolExhausted));
    assert!(logger.contains(Level::Warn, "all slots reset"));
}

#[rstest]
#[serial]
fn expiry_is_logged_at_debug(mut logger: LoggerHandle) {
    let config = PoolConfig::new(16, 4)
        .expect("valid config")
        .with_receive_timeout(Duration::from_millis(20));
    let mut receiver = PollReceiver::new(config).expect("receiver");
    let mut link = ScriptedLink::with_clock(0);
    link.push(encode_frames(&config, 1, &patterned(24)).remove(0));
    receiver.poll(&mut link).expect("poll");

    link.advance_clock(20);
    link.push(encode_frames(&config, 2, &patterned(4)).remove(0));
    receiver.poll(&mut link).expect("poll");

    assert!(logger.contains(Level::Debug, "expiring stale fragment"));
}
