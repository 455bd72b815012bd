//! Generated checks for fragmentation and reassembly.

use std::time::Duration;

use fragpool::{
    FragmentHeader,
    FragmentKind,
    Fragmenter,
    MessageId,
    PollReceiver,
    PoolConfig,
    Receiver,
};
use fragpool_testing::{ScriptedLink, encode_frames};
use proptest::{
    collection::vec,
    prelude::{Just, Strategy, any},
    prop_assert,
    prop_assert_eq,
    test_runner::{Config as ProptestConfig, RngAlgorithm, TestCaseError, TestRng, TestRunner},
};
use rstest::rstest;

fn deterministic_runner(cases: u32) -> TestRunner {
    let config = ProptestConfig {
        cases,
        ..ProptestConfig::default()
    };
    let rng = TestRng::deterministic_rng(RngAlgorithm::ChaCha);
    TestRunner::new_with_rng(config, rng)
}

fn config(frame_size: usize, pool_size: usize) -> PoolConfig {
    PoolConfig::new(frame_size, pool_size)
        .expect("valid config")
        .with_fragment_pacing(Duration::ZERO)
}

/// A message that fits `config` together with a delivery order for its
/// frames.
fn shuffled_message(config: PoolConfig) -> impl Strategy<Value = (Vec<u8>, Vec<usize>)> {
    (1..=config.max_message_len())
        .prop_flat_map(|len| vec(any::<u8>(), len))
        .prop_flat_map(move |message| {
            let count = message.len().div_ceil(config.max_payload());
            let order = Just((0..count).collect::<Vec<_>>()).prop_shuffle();
            (Just(message), order)
        })
}

#[rstest]
#[case(16, 4, 128)]
#[case(64, 8, 96)]
#[case(1400, 10, 32)]
fn any_delivery_order_reassembles(
    #[case] frame_size: usize,
    #[case] pool_size: usize,
    #[case] cases: u32,
) {
    let config = config(frame_size, pool_size);
    let mut runner = deterministic_runner(cases);

    runner
        .run(&shuffled_message(config), |(message, order)| {
            let frames = encode_frames(&config, 42, &message);
            let mut link = ScriptedLink::new();
            link.extend(order.iter().map(|&index| frames[index].clone()));
            let mut receiver = Receiver::new(config).expect("receiver");

            let received = receiver
                .receive(&mut link)
                .map_err(|err| TestCaseError::fail(format!("receive failed: {err}")))?;
            prop_assert_eq!(received.payload(), message.as_slice());
            prop_assert_eq!(received.message_id(), MessageId::new(42));
            prop_assert_eq!(receiver.pool().occupied(), 0);
            Ok(())
        })
        .expect("every delivery order should reassemble");
}

#[rstest]
#[case(16, 4)]
#[case(1400, 10)]
fn fragments_respect_frame_geometry(#[case] frame_size: usize, #[case] pool_size: usize) {
    let config = config(frame_size, pool_size);
    let mut runner = deterministic_runner(128);
    let lengths = 1..=config.max_message_len();

    runner
        .run(&lengths, |len| {
            let fragmenter = Fragmenter::new(&config).expect("fragmenter");
            let message = vec![0xa5; len];
            let frames: Vec<Vec<u8>> = fragmenter
                .fragments(MessageId::new(1), &message)
                .map_err(|err| TestCaseError::fail(format!("fragmenting failed: {err}")))?
                .map(|frame| frame.to_vec())
                .collect();

            prop_assert_eq!(frames.len(), len.div_ceil(config.max_payload()));
            prop_assert!(frames.len() <= pool_size);
            let mut carried = 0;
            for (index, frame) in frames.iter().enumerate() {
                prop_assert!(frame.len() <= frame_size);
                let header = FragmentHeader::from_frame(frame)
                    .ok_or_else(|| TestCaseError::fail("missing header".to_owned()))?;
                let expected = match (frames.len(), index + 1 == frames.len()) {
                    (1, _) => FragmentKind::Unfragmented,
                    (_, true) => FragmentKind::Terminal,
                    (_, false) => FragmentKind::NonTerminal,
                };
                prop_assert_eq!(header.kind(), expected);
                if frames.len() > 1 {
                    prop_assert_eq!(header.offset().fragment_index(frame_size), Some(index));
                }
                carried += frame.len() - 4;
            }
            prop_assert_eq!(carried, len);
            Ok(())
        })
        .expect("fragments should follow the frame geometry");
}

/// Leftovers from noise become reclaimable once the receive timeout has
/// passed.
#[test]
fn noise_never_prevents_a_later_message() {
    let config = config(16, 4);
    let mut runner = deterministic_runner(128);
    let noise = vec(vec(any::<u8>(), 0..=16), 0..12);

    runner
        .run(&noise, |junk| {
            let mut receiver = PollReceiver::new(config).expect("receiver");
            let mut link = ScriptedLink::with_clock(0);
            link.extend(junk);
            while link.pending() > 0 {
                // Exhaustion is an acceptable outcome for noise.
                let _ = receiver.poll(&mut link);
                if receiver.is_ready() {
                    let _ = receiver.read_receive();
                }
            }

            link.advance_clock(1_000);

            let message: Vec<u8> = (0..=47).collect();
            let mut fragmenter = Fragmenter::with_starting_id(&config, MessageId::new(0xbeef))
                .expect("fragmenter");
            let mut sender = ScriptedLink::new();
            fragmenter
                .transmit(&mut sender, &message)
                .map_err(|err| TestCaseError::fail(format!("transmit failed: {err}")))?;

            let mut received = None;
            for frame in sender.sent() {
                link.push(frame.clone());
                for _ in 0..2 {
                    if let Ok(fragpool::PollStatus::Ready) = receiver.poll(&mut link) {
                        received = receiver.read_receive().ok().flatten();
                    }
                }
            }
            let received =
                received.ok_or_else(|| TestCaseError::fail("message was not delivered".to_owned()))?;
            prop_assert_eq!(received.payload(), message.as_slice());
            Ok(())
        })
        .expect("the pool should always recover from noise");
}
