//! Assertion macros shared by integration tests.

/// Unwrap a receive result and panic with the call site on failure.
#[macro_export]
macro_rules! receive_expect {
    ($result:expr) => {{
        $result.expect(concat!("receive failed at ", file!(), ":", line!()))
    }};
    ($result:expr, $msg:expr) => {{
        let m = ::std::format!("{msg} at {}:{}", file!(), line!(), msg = $msg);
        $result.expect(&m)
    }};
}

pub use crate::receive_expect;
