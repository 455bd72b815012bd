//! Utilities for exercising `fragpool` in integration tests.
//!
//! The scripted link and frame builders live in the main crate behind its
//! `test-helpers` feature and are re-exported here next to the log and
//! metrics capture helpers.
//!
//! ```rust
//! use fragpool::{Fragmenter, PoolConfig, Receiver};
//! use fragpool_testing::{ScriptedLink, patterned, receive_expect};
//!
//! let config = PoolConfig::new(32, 4).expect("valid config");
//! let mut link = ScriptedLink::new();
//! let mut fragmenter = Fragmenter::new(&config).expect("fragmenter");
//! fragmenter.transmit(&mut link, &patterned(70)).expect("transmit");
//! link.loop_back();
//!
//! let mut receiver = Receiver::new(config).expect("receiver");
//! let message = receive_expect!(receiver.receive(&mut link));
//! assert_eq!(message.payload(), patterned(70).as_slice());
//! ```

pub mod logging;
pub mod macros;
pub mod metrics;

pub use fragpool::test_helpers::{ScriptedLink, encode_frames, patterned};
pub use logging::{LoggerHandle, logger};
pub use self::metrics::{CounterSnapshot, capture_counters};
