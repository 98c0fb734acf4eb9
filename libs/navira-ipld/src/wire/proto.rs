//! Minimal protobuf wire-format codec.
//!
//! This module knows nothing about messages: it splits a buffer into
//! `(field number, value)` pairs and writes them back. Interpreting a field
//! (and deciding what to do with unknown ones) is left to each schema, see
//! [crate::dag::pb] and [crate::dag::unixfs].
//!
//! Supported wire types are varint (0), fixed 64-bit (1) and length-delimited (2).
//! Length-delimited values are exposed as slices of the input, never copied.

use crate::wire::WireError;
use crate::wire::varint::UnsignedVarint;

/// Largest field number allowed by protobuf (2^29 - 1)
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Protobuf wire types supported by this codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Base 128 varint
    Varint = 0,
    /// Fixed 8 bytes, little endian
    Fixed64 = 1,
    /// Varint length followed by that many bytes
    LengthDelimited = 2,
}

impl WireType {
    fn from_tag(tag: u64, offset: usize) -> Result<Self, WireError> {
        match (tag & 0x07) as u8 {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            wire_type => Err(WireError::UnsupportedWireType { wire_type, offset }),
        }
    }
}

/// A decoded field value, borrowing from the input buffer when length-delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Varint(u64),
    Fixed64(u64),
    Bytes(&'a [u8]),
}

impl FieldValue<'_> {
    /// Wire type used to encode this value
    pub fn wire_type(&self) -> WireType {
        match self {
            FieldValue::Varint(_) => WireType::Varint,
            FieldValue::Fixed64(_) => WireType::Fixed64,
            FieldValue::Bytes(_) => WireType::LengthDelimited,
        }
    }
}

/// A single field read from a protobuf message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    /// Field number, as declared in the message schema
    pub number: u32,
    /// Decoded value
    pub value: FieldValue<'a>,
    /// Offset of the field tag in the message buffer
    pub offset: usize,
}

impl<'a> Field<'a> {
    /// Returns the value of a varint field, or an error naming this field if it has another wire type.
    pub fn varint(&self) -> Result<u64, WireError> {
        match self.value {
            FieldValue::Varint(value) => Ok(value),
            other => Err(self.unexpected(WireType::Varint, other.wire_type())),
        }
    }

    /// Returns the value of a length-delimited field, or an error naming this field if it has another wire type.
    pub fn bytes(&self) -> Result<&'a [u8], WireError> {
        match self.value {
            FieldValue::Bytes(bytes) => Ok(bytes),
            other => Err(self.unexpected(WireType::LengthDelimited, other.wire_type())),
        }
    }

    fn unexpected(&self, expected: WireType, actual: WireType) -> WireError {
        WireError::UnexpectedWireType {
            field: self.number,
            expected,
            actual,
        }
    }
}

/// Iterator over the fields of a protobuf message.
///
/// Fields are yielded in encounter order. After the first error, the iterator is exhausted.
///
/// ## Examples
/// ```
/// use navira_ipld::wire::proto::{FieldReader, FieldValue};
///
/// // field 1 = varint 150, field 2 = "hi"
/// let message = [0x08, 0x96, 0x01, 0x12, 0x02, b'h', b'i'];
/// let fields: Vec<_> = FieldReader::new(&message).collect::<Result<_, _>>().unwrap();
/// assert_eq!(fields[0].number, 1);
/// assert_eq!(fields[0].value, FieldValue::Varint(150));
/// assert_eq!(fields[1].value, FieldValue::Bytes(b"hi"));
/// ```
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    buffer: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> FieldReader<'a> {
    /// Creates a reader over a whole message buffer
    pub fn new(buffer: &'a [u8]) -> Self {
        FieldReader {
            buffer,
            offset: 0,
            failed: false,
        }
    }

    fn read_field(&mut self) -> Result<Field<'a>, WireError> {
        let start = self.offset;
        let (tag, offset) = UnsignedVarint::decode_at(self.buffer, start)?;
        let number = u32::try_from(tag.0 >> 3)
            .ok()
            .filter(|number| (1..=MAX_FIELD_NUMBER).contains(number))
            .ok_or(WireError::InvalidFieldNumber { offset: start })?;

        let (value, next) = match WireType::from_tag(tag.0, start)? {
            WireType::Varint => {
                let (value, next) = UnsignedVarint::decode_at(self.buffer, offset)?;
                (FieldValue::Varint(value.0), next)
            }
            WireType::Fixed64 => {
                let raw = self
                    .buffer
                    .get(offset..offset + 8)
                    .ok_or(WireError::TruncatedInput { offset })?;
                let mut le = [0u8; 8];
                le.copy_from_slice(raw);
                (FieldValue::Fixed64(u64::from_le_bytes(le)), offset + 8)
            }
            WireType::LengthDelimited => {
                let (length, data_start) = UnsignedVarint::decode_at(self.buffer, offset)?;
                let end = usize::try_from(length.0)
                    .ok()
                    .and_then(|length| data_start.checked_add(length))
                    .filter(|end| *end <= self.buffer.len())
                    .ok_or(WireError::TruncatedInput { offset: data_start })?;
                (FieldValue::Bytes(&self.buffer[data_start..end]), end)
            }
        };

        self.offset = next;
        Ok(Field {
            number,
            value,
            offset: start,
        })
    }
}

impl<'a> Iterator for FieldReader<'a> {
    type Item = Result<Field<'a>, WireError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.buffer.len() {
            return None;
        }
        let field = self.read_field();
        self.failed = field.is_err();
        Some(field)
    }
}

/// Folds every field of `buffer` into an accumulator.
///
/// `f` receives the accumulator and each field in encounter order, and decides how the
/// enclosing schema interprets it. Wire errors are converted into the caller's error type.
pub fn decode_fields<'a, T, E, F>(buffer: &'a [u8], init: T, mut f: F) -> Result<T, E>
where
    E: From<WireError>,
    F: FnMut(T, Field<'a>) -> Result<T, E>,
{
    FieldReader::new(buffer).try_fold(init, |acc, field| f(acc, field?))
}

/// Appends a field (tag then value) to `out`.
///
/// Length-delimited values are prefixed with their own varint length.
pub fn write_field(out: &mut Vec<u8>, number: u32, value: &FieldValue<'_>) {
    let tag = (u64::from(number) << 3) | value.wire_type() as u64;
    UnsignedVarint(tag).encode_into(out);
    match value {
        FieldValue::Varint(value) => UnsignedVarint(*value).encode_into(out),
        FieldValue::Fixed64(value) => out.extend_from_slice(&value.to_le_bytes()),
        FieldValue::Bytes(bytes) => {
            UnsignedVarint(bytes.len() as u64).encode_into(out);
            out.extend_from_slice(bytes);
        }
    }
}

/// Encodes a single field into a new buffer
pub fn encode_field(number: u32, value: &FieldValue<'_>) -> Vec<u8> {
    let mut out = Vec::new();
    write_field(&mut out, number, value);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_all_wire_types() {
        let mut message = Vec::new();
        write_field(&mut message, 1, &FieldValue::Varint(300));
        write_field(&mut message, 2, &FieldValue::Fixed64(0x0102_0304_0506_0708));
        write_field(&mut message, 3, &FieldValue::Bytes(b"navira"));
        assert_eq!(&message[..3], &[0x08, 0xAC, 0x02]);
        assert_eq!(&message[3..12], &[0x11, 8, 7, 6, 5, 4, 3, 2, 1]);

        let fields: Vec<_> = FieldReader::new(&message)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].value, FieldValue::Varint(300));
        assert_eq!(fields[1].value, FieldValue::Fixed64(0x0102_0304_0506_0708));
        assert_eq!(fields[2].number, 3);
        assert_eq!(fields[2].offset, 12);
        assert_eq!(fields[2].bytes().unwrap(), b"navira");
    }

    #[test]
    fn test_length_delimited_is_a_view() {
        let message = encode_field(2, &FieldValue::Bytes(&[0xAA; 4]));
        let field = FieldReader::new(&message).next().unwrap().unwrap();
        let bytes = field.bytes().unwrap();
        assert_eq!(bytes.as_ptr(), message[2..].as_ptr());
    }

    #[test]
    fn test_fold_fields() {
        let message = [0x08, 0x01, 0x08, 0x02, 0x10, 0x05];
        let sum: Result<u64, WireError> =
            decode_fields(&message, 0, |acc, field| Ok(acc + field.varint()?));
        assert_eq!(sum, Ok(8));
    }

    #[test]
    fn test_unsupported_wire_types() {
        // field 1, fixed32
        let fixed32 = [0x0D, 0x01, 0x02, 0x03, 0x04];
        assert_eq!(
            FieldReader::new(&fixed32).next(),
            Some(Err(WireError::UnsupportedWireType {
                wire_type: 5,
                offset: 0
            }))
        );
        // field 1, start group
        let group = [0x0B];
        assert!(matches!(
            FieldReader::new(&group).next(),
            Some(Err(WireError::UnsupportedWireType { wire_type: 3, .. }))
        ));
    }

    #[test]
    fn test_invalid_field_number() {
        let message = [0x00, 0x01];
        assert_eq!(
            FieldReader::new(&message).next(),
            Some(Err(WireError::InvalidFieldNumber { offset: 0 }))
        );
    }

    #[test]
    fn test_truncated_fields() {
        // length says 5 bytes, only 2 available
        let short_bytes = [0x12, 0x05, 0x01, 0x02];
        assert_eq!(
            FieldReader::new(&short_bytes).next(),
            Some(Err(WireError::TruncatedInput { offset: 2 }))
        );
        let short_fixed = [0x09, 0x01, 0x02];
        assert_eq!(
            FieldReader::new(&short_fixed).next(),
            Some(Err(WireError::TruncatedInput { offset: 1 }))
        );
        let short_varint = [0x08, 0x80];
        assert_eq!(
            FieldReader::new(&short_varint).next(),
            Some(Err(WireError::TruncatedInput { offset: 1 }))
        );
    }

    #[test]
    fn test_reader_stops_after_error() {
        let message = [0x08, 0x01, 0x0D, 0x00, 0x08, 0x02];
        let mut reader = FieldReader::new(&message);
        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_unexpected_wire_type() {
        let message = encode_field(3, &FieldValue::Bytes(b"x"));
        let field = FieldReader::new(&message).next().unwrap().unwrap();
        assert_eq!(
            field.varint(),
            Err(WireError::UnexpectedWireType {
                field: 3,
                expected: WireType::Varint,
                actual: WireType::LengthDelimited,
            })
        );
    }

    #[test]
    fn test_empty_message() {
        assert!(FieldReader::new(&[]).next().is_none());
    }
}
