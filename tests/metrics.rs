#![cfg(feature = "metrics")]
//! Tests for the counters emitted by the fragmenter and receivers.
//!
//! Each test installs a thread-local `DebuggingRecorder`, so they can run in
//! parallel.

use std::time::Duration;

use fragpool::{
    FRAMES_DROPPED,
    FRAMES_TOTAL,
    Fragmenter,
    MESSAGES_REASSEMBLED,
    POOL_EXHAUSTED,
    PollReceiver,
    PoolConfig,
    ReceiveError,
    Receiver,
};
use fragpool_testing::{ScriptedLink, capture_counters, encode_frames, patterned};
use rstest::{fixture, rstest};

#[fixture]
fn config() -> PoolConfig {
    PoolConfig::new(16, 4)
        .expect("valid config")
        .with_fragment_pacing(Duration::ZERO)
}

#[rstest]
fn round_trip_counts_frames_in_both_directions(config: PoolConfig) {
    let ((), counters) = capture_counters(|| {
        let mut fragmenter = Fragmenter::new(&config).expect("fragmenter");
        let mut receiver = Receiver::new(config).expect("receiver");
        let mut link = ScriptedLink::new();
        fragmenter
            .transmit(&mut link, &patterned(40))
            .expect("transmit");
        link.loop_back();
        receiver.receive(&mut link).expect("message arrives");
    });

    assert_eq!(counters.labelled(FRAMES_TOTAL, "direction", "outbound"), 4);
    assert_eq!(counters.labelled(FRAMES_TOTAL, "direction", "inbound"), 4);
    assert_eq!(counters.total(MESSAGES_REASSEMBLED), 1);
    assert_eq!(counters.total(FRAMES_DROPPED), 0);
}

#[rstest]
#[case(vec![0, 1, 0x40, 0], "too_short")]
#[case(vec![0, 1, 0x60, 0, 9], "malformed")]
#[case(vec![0, 1, 0x20, 0x02, 9], "short_fragment")]
fn dropped_frames_are_labelled(
    config: PoolConfig,
    #[case] frame: Vec<u8>,
    #[case] reason: &str,
) {
    let (_, counters) = capture_counters(|| {
        let mut receiver = PollReceiver::new(config).expect("receiver");
        let mut link = ScriptedLink::new();
        link.push(frame);
        receiver.poll(&mut link).expect("poll")
    });

    assert_eq!(counters.labelled(FRAMES_DROPPED, "reason", reason), 1);
    assert_eq!(counters.total(MESSAGES_REASSEMBLED), 0);
}

#[rstest]
fn exhaustion_is_counted(config: PoolConfig) {
    let (result, counters) = capture_counters(|| {
        let mut receiver = PollReceiver::new(config).expect("receiver");
        let mut link = ScriptedLink::new();
        for id in 1..=5 {
            link.push(encode_frames(&config, id, &patterned(24)).remove(0));
        }
        (0..5).map(|_| receiver.poll(&mut link)).last()
    });

    assert_eq!(result, Some(Err(ReceiveError::PoolExhausted)));
    assert_eq!(counters.total(POOL_EXHAUSTED), 1);
    assert_eq!(counters.labelled(FRAMES_DROPPED, "reason", "pool_full"), 1);
}
