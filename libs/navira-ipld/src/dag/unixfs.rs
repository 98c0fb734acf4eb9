//! UnixFS, the filesystem schema stored in the data field of DAG-PB nodes.
//!
//! ```protobuf
//! message Data {
//!   enum DataType { Raw = 0; Directory = 1; File = 2; Metadata = 3; Symlink = 4; HAMTShard = 5; }
//!   required DataType Type = 1;
//!   optional bytes Data = 2;
//!   optional uint64 filesize = 3;
//!   repeated uint64 blocksizes = 4;
//!   optional uint64 hashType = 5;
//!   optional uint64 fanout = 6;
//! }
//! ```
//!
//! Unlike DAG-PB, the schema is open: unknown field numbers (e.g. `mode`, `mtime`)
//! are skipped so that newer producers can still be read.
//! See [the UnixFS spec](https://github.com/ipfs/specs/blob/main/UNIXFS.md).

use std::borrow::Cow;

use serde::Serialize;

use crate::wire::WireError;
use crate::wire::proto::{self, FieldValue};
use crate::wire::varint::UnsignedVarint;

const DATA_TYPE: u32 = 1;
const DATA_DATA: u32 = 2;
const DATA_FILESIZE: u32 = 3;
const DATA_BLOCKSIZES: u32 = 4;
const DATA_HASH_TYPE: u32 = 5;
const DATA_FANOUT: u32 = 6;

/// Kind of UnixFS node
///
/// Values outside of the known enum are kept as [DataType::Unknown].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataType {
    Raw,
    Directory,
    File,
    Metadata,
    Symlink,
    HamtShard,
    Unknown(u64),
}

impl From<u64> for DataType {
    fn from(value: u64) -> Self {
        match value {
            0 => DataType::Raw,
            1 => DataType::Directory,
            2 => DataType::File,
            3 => DataType::Metadata,
            4 => DataType::Symlink,
            5 => DataType::HamtShard,
            other => DataType::Unknown(other),
        }
    }
}

impl From<DataType> for u64 {
    fn from(data_type: DataType) -> Self {
        match data_type {
            DataType::Raw => 0,
            DataType::Directory => 1,
            DataType::File => 2,
            DataType::Metadata => 3,
            DataType::Symlink => 4,
            DataType::HamtShard => 5,
            DataType::Unknown(other) => other,
        }
    }
}

/// A decoded UnixFS `Data` message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnixFsData<'a> {
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(serialize_with = "crate::dag::serialize_opt_hex")]
    pub data: Option<Cow<'a, [u8]>>,
    pub file_size: Option<u64>,
    pub block_sizes: Vec<u64>,
    pub hash_type: Option<u64>,
    pub fanout: Option<u64>,
}

impl<'a> UnixFsData<'a> {
    /// Creates a message of the given type with no other field set
    pub fn new(data_type: DataType) -> Self {
        UnixFsData {
            data_type,
            data: None,
            file_size: None,
            block_sizes: Vec::new(),
            hash_type: None,
            fanout: None,
        }
    }

    /// Creates a single-block file holding `content`
    pub fn file(content: &'a [u8]) -> Self {
        UnixFsData {
            data: Some(Cow::Borrowed(content)),
            file_size: Some(content.len() as u64),
            ..UnixFsData::new(DataType::File)
        }
    }

    /// Creates a basic (non-sharded) directory
    pub fn directory() -> Self {
        UnixFsData::new(DataType::Directory)
    }

    /// Returns the inline data, if any
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Decodes a UnixFS `Data` message, typically the data field of a [PbNode](crate::dag::pb::PbNode).
    ///
    /// ## Examples
    /// ```
    /// use navira_ipld::dag::unixfs::{DataType, UnixFsData};
    ///
    /// let message = [0x08, 0x02, 0x12, 0x02, b'h', b'i', 0x18, 0x02];
    /// let data = UnixFsData::decode(&message).unwrap();
    /// assert_eq!(data.data_type, DataType::File);
    /// assert_eq!(data.data(), Some(&b"hi"[..]));
    /// assert_eq!(data.file_size, Some(2));
    /// ```
    pub fn decode(bytes: &'a [u8]) -> Result<Self, UnixFsError> {
        let (data_type, message) = proto::decode_fields(
            bytes,
            (None, UnixFsData::new(DataType::Raw)),
            |(mut data_type, mut message): (Option<DataType>, UnixFsData<'a>),
             field|
             -> Result<_, UnixFsError> {
                match field.number {
                    DATA_TYPE => data_type = Some(DataType::from(field.varint()?)),
                    DATA_DATA => message.data = Some(Cow::Borrowed(field.bytes()?)),
                    DATA_FILESIZE => message.file_size = Some(field.varint()?),
                    DATA_BLOCKSIZES => match field.value {
                        FieldValue::Bytes(packed) => read_packed(packed, &mut message.block_sizes)?,
                        _ => message.block_sizes.push(field.varint()?),
                    },
                    DATA_HASH_TYPE => message.hash_type = Some(field.varint()?),
                    DATA_FANOUT => message.fanout = Some(field.varint()?),
                    _ => {}
                }
                Ok((data_type, message))
            },
        )?;

        let data_type = data_type.ok_or(UnixFsError::MissingType)?;
        Ok(UnixFsData {
            data_type,
            ..message
        })
    }

    /// Encodes the message, fields in schema order
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        proto::write_field(
            &mut out,
            DATA_TYPE,
            &FieldValue::Varint(self.data_type.into()),
        );
        if let Some(data) = &self.data {
            proto::write_field(&mut out, DATA_DATA, &FieldValue::Bytes(data));
        }
        if let Some(file_size) = self.file_size {
            proto::write_field(&mut out, DATA_FILESIZE, &FieldValue::Varint(file_size));
        }
        for block_size in &self.block_sizes {
            proto::write_field(&mut out, DATA_BLOCKSIZES, &FieldValue::Varint(*block_size));
        }
        if let Some(hash_type) = self.hash_type {
            proto::write_field(&mut out, DATA_HASH_TYPE, &FieldValue::Varint(hash_type));
        }
        if let Some(fanout) = self.fanout {
            proto::write_field(&mut out, DATA_FANOUT, &FieldValue::Varint(fanout));
        }
        out
    }

    /// Detaches the message from the buffer it was decoded from
    pub fn into_owned(self) -> UnixFsData<'static> {
        UnixFsData {
            data_type: self.data_type,
            data: self.data.map(|data| Cow::Owned(data.into_owned())),
            file_size: self.file_size,
            block_sizes: self.block_sizes,
            hash_type: self.hash_type,
            fanout: self.fanout,
        }
    }
}

/// Reads a packed repeated varint field
fn read_packed(packed: &[u8], out: &mut Vec<u64>) -> Result<(), WireError> {
    let mut offset = 0;
    while offset < packed.len() {
        let (value, next) = UnsignedVarint::decode_at(packed, offset)?;
        out.push(value.0);
        offset = next;
    }
    Ok(())
}

/// Errors related to UnixFS decoding
#[derive(thiserror::Error, Debug)]
pub enum UnixFsError {
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error("UnixFS message without a Type field")]
    MissingType,
}
