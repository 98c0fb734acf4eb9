//! MerkleDAG payloads carried by CAR blocks.
//!
//! - [pb]: the DAG-PB node format (`PBNode`/`PBLink`), used by every dag-pb block.
//! - [unixfs]: the UnixFS message found inside a `PBNode`'s data field.

pub mod pb;
pub mod unixfs;

use serde::Serializer;

/// Serializes a byte slice as a hexadecimal string.
pub(crate) fn serialize_hex<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&hex::encode(bytes))
}

/// Serializes optional bytes as a hexadecimal string, or `null`.
pub(crate) fn serialize_opt_hex<S, B>(bytes: &Option<B>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    B: AsRef<[u8]>,
{
    match bytes {
        Some(bytes) => serialize_hex(bytes.as_ref(), serializer),
        None => serializer.serialize_none(),
    }
}
