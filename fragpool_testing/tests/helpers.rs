//! Checks for the shared test helpers themselves.

use fragpool::FrameLink;
use fragpool_testing::{ScriptedLink, capture_counters, patterned};

#[test]
fn scripted_link_replays_frames_in_order() {
    let mut link = ScriptedLink::with_clock(7).with_random_ids([9]);
    link.push(vec![1, 2, 3]);
    link.push(patterned(4));
    let mut buf = [0u8; 8];

    assert_eq!(link.receive_frame(&mut buf), 3);
    assert_eq!(&buf[..3], &[1, 2, 3]);
    assert_eq!(link.receive_frame(&mut buf), 4);
    assert_eq!(link.receive_frame(&mut buf), 0);
    assert_eq!(link.reads(), 3);
    assert_eq!(link.random_id(), Some(9));
    assert_eq!(link.random_id(), None);

    link.delay_ms(5);
    assert_eq!(link.now_ms(), Some(12));
    assert_eq!(link.delays(), [5]);
}

#[test]
fn loop_back_moves_sent_frames_inbound() {
    let mut link = ScriptedLink::new();
    link.send_frame(&[4, 5]);
    assert_eq!(link.pending(), 0);
    link.loop_back();
    assert!(link.sent().is_empty());
    assert_eq!(link.pending(), 1);
    assert_eq!(link.now_ms(), None);
}

#[test]
fn counters_are_captured_per_call() {
    let ((), counters) = capture_counters(|| {
        metrics::counter!("sample_total", "kind" => "a").increment(2);
        metrics::counter!("sample_total", "kind" => "b").increment(1);
    });
    assert_eq!(counters.total("sample_total"), 3);
    assert_eq!(counters.labelled("sample_total", "kind", "a"), 2);
}
