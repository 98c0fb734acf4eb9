//! Low-level binary encodings shared by every structure of a CAR archive.
//!
//! - [varint]: unsigned LEB128 integers used for frame lengths, CID prefixes and protobuf tags.
//! - [proto]: a minimal protobuf wire-format reader/writer (no schema knowledge).
//! - [cid]: Content Identifiers (CIDv0 and CIDv1) in their binary and multibase forms.

pub mod cid;
pub mod proto;
pub mod varint;

use proto::WireType;

/// Errors raised while reading or writing varints and protobuf fields.
///
/// Offsets are absolute positions in the buffer handed to the decoder.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// The buffer ended before the value starting at `offset` was complete
    #[error("Truncated input: value at offset {offset} runs past the end of the buffer")]
    TruncatedInput { offset: usize },

    /// A varint does not fit in 64 bits
    #[error("Varint at offset {offset} overflows 64 bits")]
    VarintOverflow { offset: usize },

    /// A negative integer was given where an unsigned varint is expected
    #[error("Value {0} is out of range for an unsigned varint")]
    ValueOutOfRange(i64),

    /// A varint uses more bytes than needed (trailing zero group)
    #[error("Non-minimal varint at offset {offset}")]
    NonMinimalVarint { offset: usize },

    /// Wire type 3, 4 (groups), 5 (fixed32) or an undefined one
    #[error("Unsupported wire type {wire_type} at offset {offset}")]
    UnsupportedWireType { wire_type: u8, offset: usize },

    /// Field number 0, or one larger than protobuf allows
    #[error("Invalid field number at offset {offset}")]
    InvalidFieldNumber { offset: usize },

    /// A known field was encoded with the wrong wire type for its schema
    #[error("Field {field} has wire type {actual:?}, expected {expected:?}")]
    UnexpectedWireType {
        field: u32,
        expected: WireType,
        actual: WireType,
    },
}
