use derive_more::{Display, From, Into};

/// Identifier shared by every fragment of one logical message.
///
/// The wire format reserves 16 bits for it, so identifiers wrap. Two
/// messages in flight with the same identifier are indistinguishable to the
/// receiver.
///
/// # Examples
///
/// ```
/// use fragpool::fragment::MessageId;
/// let id = MessageId::new(42);
/// assert_eq!(id.get(), 42);
/// assert_eq!(MessageId::new(u16::MAX).wrapping_next(), MessageId::new(0));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, From, Into)]
#[display("{_0}")]
pub struct MessageId(u16);

impl MessageId {
    /// Create a new identifier.
    #[must_use]
    pub const fn new(value: u16) -> Self { Self(value) }

    /// Return the inner numeric identifier.
    #[must_use]
    pub const fn get(self) -> u16 { self.0 }

    /// Return the identifier that follows this one, wrapping at `u16::MAX`.
    #[must_use]
    pub const fn wrapping_next(self) -> Self { Self(self.0.wrapping_add(1)) }
}
