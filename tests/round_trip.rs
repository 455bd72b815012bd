//! End-to-end transfers between a fragmenter and both receivers over a
//! scripted link.

use std::time::Duration;

use fragpool::{Fragmenter, PollReceiver, PollStatus, PoolConfig, Receiver};
use fragpool_testing::{ScriptedLink, encode_frames, patterned, receive_expect};
use rstest::rstest;

#[rstest]
#[case(1)]
#[case(1396)]
#[case(1397)]
#[case(5_000)]
#[case(13_960)]
fn default_geometry_carries_messages_up_to_pool_capacity(#[case] len: usize) {
    let config = PoolConfig::default();
    let mut fragmenter = Fragmenter::new(&config).expect("fragmenter");
    let mut receiver = Receiver::new(config).expect("receiver");
    let mut link = ScriptedLink::new();
    let message = patterned(len);

    fragmenter.transmit(&mut link, &message).expect("transmit");
    assert!(link.sent().iter().all(|frame| frame.len() <= 1400));
    link.loop_back();

    let received = receive_expect!(receiver.receive(&mut link));
    assert_eq!(received.payload(), message.as_slice());
    assert_eq!(receiver.pool().occupied(), 0);
}

#[test]
fn documented_small_frame_layout() {
    let config = PoolConfig::new(16, 4).expect("valid config");
    let frames = encode_frames(&config, 0x0102, &patterned(28));

    let headers: Vec<[u8; 4]> = frames
        .iter()
        .map(|frame| frame[..4].try_into().expect("four header bytes"))
        .collect();
    assert_eq!(
        headers,
        [
            [0x01, 0x02, 0x20, 0x00],
            [0x01, 0x02, 0x20, 0x02],
            [0x01, 0x02, 0x00, 0x04],
        ]
    );
    let lengths: Vec<usize> = frames.iter().map(Vec::len).collect();
    assert_eq!(lengths, [16, 16, 8]);
}

#[test]
fn consecutive_messages_get_consecutive_ids() {
    let config = PoolConfig::new(32, 4)
        .expect("valid config")
        .with_fragment_pacing(Duration::ZERO);
    let mut fragmenter = Fragmenter::new(&config).expect("fragmenter");
    let mut receiver = Receiver::new(config).expect("receiver");
    let mut link = ScriptedLink::new();

    let sent: Vec<_> = (1..=3)
        .map(|n| {
            let id = fragmenter
                .transmit(&mut link, &patterned(n * 30))
                .expect("transmit");
            link.loop_back();
            let received = receive_expect!(receiver.receive(&mut link), "round trip");
            assert_eq!(received.payload(), patterned(n * 30).as_slice());
            received.message_id().get().wrapping_sub(id.get())
        })
        .collect();
    assert_eq!(sent, [0, 0, 0]);
}

#[test]
fn poll_receiver_drains_one_message_at_a_time() {
    let config = PoolConfig::new(64, 8).expect("valid config");
    let mut fragmenter = Fragmenter::new(&config).expect("fragmenter");
    let mut receiver = PollReceiver::new(config).expect("receiver");
    let mut link = ScriptedLink::new();
    let first = patterned(200);
    let second = patterned(10);

    fragmenter.transmit(&mut link, &first).expect("transmit");
    fragmenter.transmit(&mut link, &second).expect("transmit");
    link.loop_back();

    let mut delivered = Vec::new();
    for _ in 0..16 {
        if receiver.poll(&mut link).expect("poll") == PollStatus::Ready {
            let message = receiver
                .read_receive()
                .expect("buffer allocated")
                .expect("message ready");
            delivered.push(message.into_payload());
        }
    }
    assert_eq!(delivered, [first, second]);
}

#[test]
fn link_clock_drives_timeouts() {
    let config = PoolConfig::new(32, 4)
        .expect("valid config")
        .with_receive_timeout(Duration::from_millis(100))
        .with_poll_interval(Duration::from_millis(25));
    let mut receiver = Receiver::new(config).expect("receiver");
    let mut link = ScriptedLink::with_clock(0);

    let err = receiver.receive(&mut link).expect_err("nothing arrives");
    assert_eq!(err, fragpool::ReceiveError::Timeout);
    assert_eq!(link.delays(), [25, 25, 25, 25]);
}
