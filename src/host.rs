//! Capabilities the embedding application provides to the engine.
//!
//! [`FrameLink`] is the only way the crate touches the outside world. Only
//! the two frame primitives are required; the remaining methods have inert
//! defaults so a bare serial or radio driver can implement the trait in a few
//! lines.

/// Frame transport and optional timing helpers supplied by the host.
///
/// # Examples
///
/// ```
/// use std::collections::VecDeque;
///
/// use fragpool::FrameLink;
///
/// struct Loopback(VecDeque<Vec<u8>>);
///
/// impl FrameLink for Loopback {
///     fn send_frame(&mut self, frame: &[u8]) { self.0.push_back(frame.to_vec()); }
///
///     fn receive_frame(&mut self, buf: &mut [u8]) -> usize {
///         let Some(frame) = self.0.pop_front() else {
///             return 0;
///         };
///         let len = frame.len().min(buf.len());
///         buf[..len].copy_from_slice(&frame[..len]);
///         len
///     }
/// }
/// ```
pub trait FrameLink {
    /// Transmit one frame. Delivery is best effort and never reported back.
    fn send_frame(&mut self, frame: &[u8]);

    /// Copy one received frame into `buf` and return its length.
    ///
    /// Returning `0` means nothing was available. Implementations may block
    /// for a short, host-defined period before giving up.
    fn receive_frame(&mut self, buf: &mut [u8]) -> usize;

    /// Produce a fresh message identifier.
    ///
    /// Returning `None` makes the fragmenter increment the previous
    /// identifier instead.
    fn random_id(&mut self) -> Option<u16> { None }

    /// Sleep for `ms` milliseconds. Used to pace outbound fragments and to
    /// wait between empty receive attempts.
    fn delay_ms(&mut self, _ms: u32) {}

    /// Return a monotonic millisecond tick that may wrap.
    ///
    /// Returning `None` makes the receiver count attempts instead of
    /// measuring time.
    fn now_ms(&mut self) -> Option<u32> { None }
}

impl<L: FrameLink + ?Sized> FrameLink for &mut L {
    fn send_frame(&mut self, frame: &[u8]) { (**self).send_frame(frame); }

    fn receive_frame(&mut self, buf: &mut [u8]) -> usize { (**self).receive_frame(buf) }

    fn random_id(&mut self) -> Option<u16> { (**self).random_id() }

    fn delay_ms(&mut self, ms: u32) { (**self).delay_ms(ms); }

    fn now_ms(&mut self) -> Option<u32> { (**self).now_ms() }
}
