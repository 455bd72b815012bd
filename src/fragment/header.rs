//! Four-byte fragment header codec.
//!
//! Layout, most significant bit first:
//!
//! ```text
//! byte 0..2  identifier (u16, big-endian)
//! byte 2     [reserved:1][UNFRAGMENTED:1][MORE_FRAGMENTS:1][offset 12..8:5]
//! byte 3     [offset 7..0:8]
//! ```
//!
//! The offset counts 8-byte units. Fragment `k` of a message carries the
//! offset `k * frame_size / 8`, where `frame_size` is the full frame length
//! including this header, so the division is exact for any valid frame size.

use std::ops::BitOr;

use derive_more::Display;

use super::MessageId;
use crate::byte_order::{from_wire_u16, to_wire_u16};

/// Encoded header length in bytes.
pub const HEADER_LEN: usize = 4;

/// Number of bytes represented by one offset unit.
pub const OFFSET_UNIT: usize = 8;

const FLAGS_MASK: u8 = 0x60;
const OFFSET_HIGH_MASK: u8 = 0x1f;

/// Flag bits carried in the third header byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct HeaderFlags(u8);

impl HeaderFlags {
    /// No flag set: the terminal fragment of a multi-frame message.
    pub const NONE: Self = Self(0);
    /// The message fitted into a single frame.
    pub const UNFRAGMENTED: Self = Self(0x40);
    /// Further fragments follow this one.
    pub const MORE_FRAGMENTS: Self = Self(0x20);

    /// Extract the flag bits from a raw header byte, ignoring everything else.
    #[must_use]
    pub const fn from_bits_truncate(bits: u8) -> Self { Self(bits & FLAGS_MASK) }

    /// Return the raw flag bits.
    #[must_use]
    pub const fn bits(self) -> u8 { self.0 }

    /// Report whether every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool { self.0 & other.0 == other.0 }
}

impl BitOr for HeaderFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output { Self(self.0 | rhs.0) }
}

/// Thirteen-bit offset field, in units of [`OFFSET_UNIT`] bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{_0}")]
pub struct FragmentOffset(u16);

impl FragmentOffset {
    /// Largest value representable in the header.
    pub const MAX: u16 = 0x1fff;

    /// Offset of the first fragment.
    #[must_use]
    pub const fn zero() -> Self { Self(0) }

    /// Construct an offset, returning `None` when it exceeds 13 bits.
    #[must_use]
    pub const fn new(units: u16) -> Option<Self> {
        if units > Self::MAX {
            None
        } else {
            Some(Self(units))
        }
    }

    /// Offset carried by fragment `index` for frames of `frame_size` bytes.
    ///
    /// Returns `None` when the result does not fit the header field.
    #[must_use]
    pub fn for_fragment(index: usize, frame_size: usize) -> Option<Self> {
        let bytes = index.checked_mul(frame_size)?;
        let units = u16::try_from(bytes / OFFSET_UNIT).ok()?;
        Self::new(units)
    }

    /// Return the raw field value.
    #[must_use]
    pub const fn get(self) -> u16 { self.0 }

    /// Zero-based fragment position this offset denotes for `frame_size`.
    ///
    /// Returns `None` when the offset does not land on a frame boundary, which
    /// no conforming sender produces.
    #[must_use]
    pub fn fragment_index(self, frame_size: usize) -> Option<usize> {
        let bytes = usize::from(self.0) * OFFSET_UNIT;
        if frame_size == 0 || bytes % frame_size != 0 {
            return None;
        }
        Some(bytes / frame_size)
    }
}

/// Why a header cannot belong to any well-formed message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum MalformedHeader {
    /// `UNFRAGMENTED` and `MORE_FRAGMENTS` are both set.
    #[display("conflicting flags")]
    ConflictingFlags,
    /// A single-frame message claims a nonzero offset.
    #[display("unfragmented frame with offset")]
    UnfragmentedWithOffset,
    /// A terminal fragment sits at offset zero, so it would be its own group.
    #[display("terminal fragment without offset")]
    TerminalWithoutOffset,
}

/// Classification of a decoded header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FragmentKind {
    /// The whole message is in this frame.
    Unfragmented,
    /// A first or middle fragment.
    NonTerminal,
    /// The last fragment of a multi-frame message.
    Terminal,
    /// A header no conforming sender produces.
    Malformed(MalformedHeader),
}

/// Header prefixed to every frame.
///
/// # Examples
///
/// ```
/// use fragpool::fragment::{FragmentHeader, FragmentKind, FragmentOffset, MessageId};
///
/// let offset = FragmentOffset::new(2).expect("offset fits");
/// let header = FragmentHeader::non_terminal(MessageId::new(0x0102), offset);
/// let bytes = header.encode();
/// assert_eq!(bytes, [0x01, 0x02, 0x20, 0x02]);
/// assert_eq!(FragmentHeader::decode(bytes).kind(), FragmentKind::NonTerminal);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FragmentHeader {
    id: MessageId,
    flags: HeaderFlags,
    offset: FragmentOffset,
}

impl FragmentHeader {
    /// Build a header from raw parts without checking their combination.
    #[must_use]
    pub const fn new(id: MessageId, flags: HeaderFlags, offset: FragmentOffset) -> Self {
        Self { id, flags, offset }
    }

    /// Header for a message that fits in one frame.
    #[must_use]
    pub const fn unfragmented(id: MessageId) -> Self {
        Self::new(id, HeaderFlags::UNFRAGMENTED, FragmentOffset::zero())
    }

    /// Header for a fragment that is followed by more.
    #[must_use]
    pub const fn non_terminal(id: MessageId, offset: FragmentOffset) -> Self {
        Self::new(id, HeaderFlags::MORE_FRAGMENTS, offset)
    }

    /// Header for the last fragment of a multi-frame message.
    #[must_use]
    pub const fn terminal(id: MessageId, offset: FragmentOffset) -> Self {
        Self::new(id, HeaderFlags::NONE, offset)
    }

    /// Return the message identifier.
    #[must_use]
    pub const fn id(&self) -> MessageId { self.id }

    /// Return the flag bits.
    #[must_use]
    pub const fn flags(&self) -> HeaderFlags { self.flags }

    /// Return the offset field.
    #[must_use]
    pub const fn offset(&self) -> FragmentOffset { self.offset }

    /// Serialise the header into its four wire bytes.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let [id_high, id_low] = to_wire_u16(self.id.get());
        let [offset_high, offset_low] = to_wire_u16(self.offset.get());
        [
            id_high,
            id_low,
            self.flags.bits() | (offset_high & OFFSET_HIGH_MASK),
            offset_low,
        ]
    }

    /// Parse four wire bytes. Every bit pattern decodes; use [`Self::kind`]
    /// to find out whether the result is meaningful.
    #[must_use]
    pub fn decode(bytes: [u8; HEADER_LEN]) -> Self {
        let [id_high, id_low, control, offset_low] = bytes;
        let offset = from_wire_u16([control & OFFSET_HIGH_MASK, offset_low]);
        Self {
            id: MessageId::new(from_wire_u16([id_high, id_low])),
            flags: HeaderFlags::from_bits_truncate(control),
            offset: FragmentOffset(offset),
        }
    }

    /// Decode the header at the start of `frame`, or `None` if the frame is
    /// shorter than [`HEADER_LEN`].
    #[must_use]
    pub fn from_frame(frame: &[u8]) -> Option<Self> {
        let bytes = frame.first_chunk::<HEADER_LEN>()?;
        Some(Self::decode(*bytes))
    }

    /// Classify the header.
    #[must_use]
    pub fn kind(&self) -> FragmentKind {
        let unfragmented = self.flags.contains(HeaderFlags::UNFRAGMENTED);
        let more = self.flags.contains(HeaderFlags::MORE_FRAGMENTS);
        let at_start = self.offset == FragmentOffset::zero();
        match (unfragmented, more) {
            (true, true) => FragmentKind::Malformed(MalformedHeader::ConflictingFlags),
            (true, false) if at_start => FragmentKind::Unfragmented,
            (true, false) => FragmentKind::Malformed(MalformedHeader::UnfragmentedWithOffset),
            (false, true) => FragmentKind::NonTerminal,
            (false, false) if at_start => {
                FragmentKind::Malformed(MalformedHeader::TerminalWithoutOffset)
            }
            (false, false) => FragmentKind::Terminal,
        }
    }
}
