//! CAR archives make use of variable-length integers (varints) for efficient encoding of integer values.
//!
//! This module provides utilities for encoding and decoding varints according to the
//! [multiformats unsigned-varint](https://github.com/multiformats/unsigned-varint) specification,
//! which is also the encoding of protobuf tags, lengths and `uint64` fields.
//!
//! Actually, these varints follow the [LEB128 encoding scheme](https://en.wikipedia.org/wiki/LEB128),
//! with two extra rules: at most 10 bytes (64 bits), and minimal encodings only.

use crate::wire::WireError;

/// Maximum number of bytes of a varint holding a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Unsigned variable-length integer (varint) as used in CAR files.
///
/// This struct represents an unsigned varint, which can be encoded and decoded using LEB128 encoding.
/// To do so,
/// - Use `UnsignedVarint::encode()` to encode the varint into a vector of bytes.
/// - Use `UnsignedVarint::decode(bytes)` to decode a varint from a slice of bytes, which returns
///   the decoded varint and the number of bytes read.
/// - Use `UnsignedVarint::decode_at(buffer, offset)` to decode a varint in the middle of a buffer,
///   which returns the decoded varint and the offset just past it.
///
/// ## Examples
/// ```
/// use navira_ipld::wire::varint::UnsignedVarint;
///
/// let varint = UnsignedVarint(624485);
/// let encoded = varint.encode();
/// assert_eq!(encoded, vec![0xE5, 0x8E, 0x26]);
///
/// let (decoded, bytes_read) = UnsignedVarint::decode(&encoded).unwrap();
/// assert_eq!(decoded, UnsignedVarint(624485));
/// assert_eq!(bytes_read, encoded.len());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnsignedVarint(
    /// The underlying unsigned integer value of the varint.
    pub u64,
);

impl UnsignedVarint {
    /// Encodes the UnsignedVarint into a vector of bytes using LEB128 encoding.
    pub fn encode(self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut bytes);
        bytes
    }

    /// Appends the LEB128 encoding of the varint to `out`.
    pub fn encode_into(self, out: &mut Vec<u8>) {
        let mut value = self.0;
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80; // Set continuation bit
            }
            out.push(byte);
            if value == 0 {
                break;
            }
        }
    }

    /// Number of bytes `encode()` produces for this value.
    pub fn encoded_len(self) -> usize {
        let bits = 64 - self.0.leading_zeros() as usize;
        bits.div_ceil(7).max(1)
    }

    /// Decodes an UnsignedVarint from the start of a slice of bytes.
    ///
    /// ## Returns
    /// - `Ok((UnsignedVarint, bytes_read))` if decoding is successful,
    ///   where `bytes_read` is the number of bytes consumed during decoding.
    /// - `Err(WireError)` if the bytes do not hold a valid varint (see [UnsignedVarint::decode_at]).
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), WireError> {
        Self::decode_at(bytes, 0)
    }

    /// Decodes an UnsignedVarint starting at `offset` inside `buffer`.
    ///
    /// Bytes are read while their high bit is set, the first byte carrying the
    /// least-significant 7 bits.
    ///
    /// ## Returns
    /// - `Ok((UnsignedVarint, new_offset))`, `new_offset` pointing just past the terminating byte.
    /// - `Err(WireError::TruncatedInput)` if the buffer ends before a terminating byte.
    /// - `Err(WireError::VarintOverflow)` if the value does not fit in a `u64`.
    /// - `Err(WireError::NonMinimalVarint)` if the encoding has a trailing zero group.
    pub fn decode_at(buffer: &[u8], offset: usize) -> Result<(Self, usize), WireError> {
        let bytes = buffer
            .get(offset..)
            .ok_or(WireError::TruncatedInput { offset })?;
        let mut result = 0u64;
        let mut shift = 0;
        for (i, &byte) in bytes.iter().enumerate() {
            // The 10th byte may only hold bit 63
            if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
                return Err(WireError::VarintOverflow { offset });
            }
            result |= u64::from(byte & 0x7F) << shift;
            if (byte & 0x80) == 0 {
                if i > 0 && byte == 0 {
                    return Err(WireError::NonMinimalVarint { offset });
                }
                return Ok((UnsignedVarint(result), offset + i + 1));
            }
            shift += 7;
        }
        Err(WireError::TruncatedInput { offset })
    }
}

impl From<u64> for UnsignedVarint {
    fn from(value: u64) -> Self {
        UnsignedVarint(value)
    }
}

impl From<UnsignedVarint> for u64 {
    fn from(varint: UnsignedVarint) -> Self {
        varint.0
    }
}

impl TryFrom<i64> for UnsignedVarint {
    type Error = WireError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(UnsignedVarint)
            .map_err(|_| WireError::ValueOutOfRange(value))
    }
}

#[cfg(test)]
mod tests {
    use super::{MAX_VARINT_LEN, UnsignedVarint};
    use crate::wire::WireError;

    #[test]
    fn test_unsigned_varint_encoding() {
        let varint = UnsignedVarint(624485);
        let expected = vec![0xE5, 0x8E, 0x26];
        assert_eq!(varint.encode(), expected);
        assert_eq!(varint.encoded_len(), 3);
    }

    #[test]
    fn test_unsigned_varint_encoding_decoding() {
        let varint = vec![0xE5, 0x8E, 0x26];
        let (decoded, bytes_read) = UnsignedVarint::decode(&varint).unwrap();
        assert_eq!(decoded, UnsignedVarint(624485));
        assert_eq!(bytes_read, varint.len());
    }

    #[test]
    fn test_unsigned_varint_round_trip() {
        let mut values: Vec<u64> = (0..=65537).collect();
        values.extend([1 << 35, (1 << 56) - 1, 1 << 63, u64::MAX]);
        for i in values {
            let varint = UnsignedVarint(i);
            let encoded = varint.encode();
            assert_eq!(encoded.len(), varint.encoded_len());
            let (decoded, bytes_read) = UnsignedVarint::decode(&encoded).unwrap();
            assert_eq!(varint, decoded);
            assert_eq!(bytes_read, encoded.len());
        }
    }

    #[test]
    fn test_unsigned_varint_max_value() {
        let encoded = UnsignedVarint(u64::MAX).encode();
        assert_eq!(encoded.len(), MAX_VARINT_LEN);
        assert_eq!(encoded[9], 0x01);
    }

    #[test]
    fn test_unsigned_varint_decode_at_offset() {
        let buffer = [0xFF, 0x00, 0xAC, 0x02, 0x07];
        let (decoded, next) = UnsignedVarint::decode_at(&buffer, 2).unwrap();
        assert_eq!(decoded, UnsignedVarint(300));
        assert_eq!(next, 4);
        let (decoded, next) = UnsignedVarint::decode_at(&buffer, next).unwrap();
        assert_eq!(decoded, UnsignedVarint(7));
        assert_eq!(next, buffer.len());
    }

    #[test]
    fn test_unsigned_varint_truncated() {
        assert_eq!(
            UnsignedVarint::decode(&[]),
            Err(WireError::TruncatedInput { offset: 0 })
        );
        assert_eq!(
            UnsignedVarint::decode_at(&[0x01, 0x80, 0x80], 1),
            Err(WireError::TruncatedInput { offset: 1 })
        );
        assert_eq!(
            UnsignedVarint::decode_at(&[0x01], 5),
            Err(WireError::TruncatedInput { offset: 5 })
        );
    }

    #[test]
    fn test_unsigned_varint_overflow() {
        let mut too_long = vec![0xFF; 9];
        too_long.push(0x02);
        assert_eq!(
            UnsignedVarint::decode(&too_long),
            Err(WireError::VarintOverflow { offset: 0 })
        );
        let eleven_bytes = [0x80u8; 11];
        assert!(matches!(
            UnsignedVarint::decode(&eleven_bytes),
            Err(WireError::VarintOverflow { .. })
        ));
    }

    #[test]
    fn test_unsigned_varint_non_minimal() {
        assert_eq!(
            UnsignedVarint::decode(&[0x81, 0x00]),
            Err(WireError::NonMinimalVarint { offset: 0 })
        );
        // A single zero byte is the minimal encoding of 0
        assert_eq!(UnsignedVarint::decode(&[0x00]), Ok((UnsignedVarint(0), 1)));
    }

    #[test]
    fn test_unsigned_varint_from_negative() {
        assert_eq!(
            UnsignedVarint::try_from(-1i64),
            Err(WireError::ValueOutOfRange(-1))
        );
        assert_eq!(UnsignedVarint::try_from(42i64), Ok(UnsignedVarint(42)));
    }

    #[test]
    fn test_unsigned_varint_decode_car_header_size() {
        const CAR_EXTRACT: [u8; 12] = [
            0x38, 0xA2, 0x65, 0x72, 0x6F, 0x6F, 0x74, 0x73, 0x81, 0xD8, 0x2A, 0x58,
        ];
        let (decoded, bytes_read) = UnsignedVarint::decode(&CAR_EXTRACT).unwrap();
        assert_eq!(decoded, UnsignedVarint(56));
        assert_eq!(bytes_read, 1);
    }
}
