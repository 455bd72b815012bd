//! Sixteen-bit field conversions for the fragment header.
//!
//! The header holds two 16-bit quantities, the [`MessageId`] in bytes 0 and
//! 1 and the flag-and-offset word in bytes 2 and 3, each with the most
//! significant byte first. The header codec goes through these two functions
//! and nowhere else touches endianness.
//!
//! [`MessageId`]: crate::fragment::MessageId

/// Split a header field into its two wire bytes.
///
/// # Examples
///
/// ```
/// use fragpool::byte_order::to_wire_u16;
///
/// assert_eq!(to_wire_u16(0x1234), [0x12, 0x34]);
/// ```
#[must_use]
pub fn to_wire_u16(value: u16) -> [u8; 2] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Header fields are sent most significant byte first."
    )]
    value.to_be_bytes()
}

/// Join two wire bytes back into a header field.
///
/// # Examples
///
/// ```
/// use fragpool::byte_order::from_wire_u16;
///
/// assert_eq!(from_wire_u16([0x12, 0x34]), 0x1234);
/// ```
#[must_use]
pub fn from_wire_u16(bytes: [u8; 2]) -> u16 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Header fields are sent most significant byte first."
    )]
    u16::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{from_wire_u16, to_wire_u16};

    #[rstest]
    #[case(0x0000, [0x00, 0x00])]
    #[case(0x00ff, [0x00, 0xff])]
    #[case(0xbeef, [0xbe, 0xef])]
    fn header_fields_lead_with_high_byte(#[case] value: u16, #[case] wire: [u8; 2]) {
        assert_eq!(to_wire_u16(value), wire);
        assert_eq!(from_wire_u16(wire), value);
    }
}
