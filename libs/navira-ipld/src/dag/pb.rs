//! DAG-PB, the protobuf encoding of MerkleDAG nodes.
//!
//! ```protobuf
//! message PBLink {
//!   optional bytes Hash = 1;   // binary CID of the target
//!   optional string Name = 2;  // UTF-8, unique per node
//!   optional uint64 Tsize = 3; // cumulative size of the target
//! }
//!
//! message PBNode {
//!   repeated PBLink Links = 2;
//!   optional bytes Data = 1;
//! }
//! ```
//!
//! The schema is closed: any other field number is rejected.
//! Links keep their encounter order, which is the directory order for compliant encoders,
//! and are written before the data field, as reference encoders do.

use std::borrow::Cow;

use serde::{Serialize, Serializer};

use crate::wire::WireError;
use crate::wire::cid::{Cid, CidFormatError, encode_display_string};
use crate::wire::proto::{self, FieldValue};

const LINK_HASH: u32 = 1;
const LINK_NAME: u32 = 2;
const LINK_TSIZE: u32 = 3;

const NODE_DATA: u32 = 1;
const NODE_LINKS: u32 = 2;

/// A named, sized link from a DAG-PB node to another block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PbLink<'a> {
    /// Binary CID of the target block
    #[serde(rename = "cid", serialize_with = "serialize_link_target")]
    pub hash: Cow<'a, [u8]>,
    /// Link name (e.g. a file name inside a directory)
    pub name: String,
    /// Cumulative size of the linked subtree
    pub size: u64,
}

impl<'a> PbLink<'a> {
    /// Creates a new link
    pub fn new(hash: impl Into<Cow<'a, [u8]>>, name: impl Into<String>, size: u64) -> Self {
        PbLink {
            hash: hash.into(),
            name: name.into(),
            size,
        }
    }

    /// Creates a link pointing to `cid`
    pub fn to_cid(cid: &Cid, name: impl Into<String>, size: u64) -> PbLink<'static> {
        PbLink::new(cid.to_bytes(), name, size)
    }

    /// Parses the link target as a CID
    pub fn cid(&self) -> Result<Cid, CidFormatError> {
        Cid::from_bytes(&self.hash)
    }

    /// Human readable form of the link target (multibase base32 of the raw hash bytes)
    pub fn target_string(&self) -> String {
        encode_display_string(&self.hash)
    }

    /// Decodes a `PBLink` message.
    ///
    /// The target bytes are borrowed from `bytes`, the name is copied.
    pub fn decode(bytes: &'a [u8]) -> Result<Self, DagPbError> {
        #[derive(Default)]
        struct LinkFields<'b> {
            hash: Option<&'b [u8]>,
            name: Option<String>,
            size: Option<u64>,
        }

        let fields = proto::decode_fields(
            bytes,
            LinkFields::default(),
            |mut acc, field| -> Result<LinkFields<'a>, DagPbError> {
                match field.number {
                    LINK_HASH => acc.hash = Some(field.bytes()?),
                    LINK_NAME => {
                        let name = std::str::from_utf8(field.bytes()?).map_err(|source| {
                            DagPbError::InvalidName {
                                offset: field.offset,
                                source,
                            }
                        })?;
                        acc.name = Some(name.to_owned());
                    }
                    LINK_TSIZE => acc.size = Some(field.varint()?),
                    number => {
                        return Err(DagPbError::UnsupportedField {
                            message: "PBLink",
                            number,
                            offset: field.offset,
                        });
                    }
                }
                Ok(acc)
            },
        )?;

        let hash = fields.hash.ok_or(DagPbError::MissingLinkHash)?;
        Ok(PbLink {
            hash: Cow::Borrowed(hash),
            name: fields.name.unwrap_or_default(),
            size: fields.size.unwrap_or_default(),
        })
    }

    /// Appends the `PBLink` message (without enclosing tag) to `out`
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        proto::write_field(out, LINK_HASH, &FieldValue::Bytes(&self.hash));
        proto::write_field(out, LINK_NAME, &FieldValue::Bytes(self.name.as_bytes()));
        proto::write_field(out, LINK_TSIZE, &FieldValue::Varint(self.size));
    }

    /// Encodes the `PBLink` message
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    /// Detaches the link from the buffer it was decoded from
    pub fn into_owned(self) -> PbLink<'static> {
        PbLink {
            hash: Cow::Owned(self.hash.into_owned()),
            name: self.name,
            size: self.size,
        }
    }
}

/// A MerkleDAG node: optional opaque data plus an ordered list of links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PbNode<'a> {
    /// Opaque data (usually a UnixFS message)
    #[serde(serialize_with = "crate::dag::serialize_opt_hex")]
    pub data: Option<Cow<'a, [u8]>>,
    /// Links, in encoding order
    pub links: Vec<PbLink<'a>>,
}

impl<'a> PbNode<'a> {
    /// Creates a node from its data and links
    pub fn new(data: Option<Cow<'a, [u8]>>, links: Vec<PbLink<'a>>) -> Self {
        PbNode { data, links }
    }

    /// Returns the data bytes, if any
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Decodes a `PBNode` message.
    ///
    /// Fields may come in any order; links are kept in encounter order.
    ///
    /// ## Examples
    /// ```
    /// use navira_ipld::dag::pb::{PbLink, PbNode};
    ///
    /// let node = PbNode::new(
    ///     Some(vec![0x08, 0x01].into()),
    ///     vec![PbLink::new(vec![0x12, 0x20], "a", 1)],
    /// );
    /// let bytes = node.encode();
    /// assert_eq!(PbNode::decode(&bytes).unwrap(), node);
    /// ```
    pub fn decode(bytes: &'a [u8]) -> Result<Self, DagPbError> {
        let (data, links) = proto::decode_fields(
            bytes,
            (None, Vec::new()),
            |(mut data, mut links): (Option<&'a [u8]>, Vec<PbLink<'a>>),
             field|
             -> Result<_, DagPbError> {
                match field.number {
                    NODE_DATA => data = Some(field.bytes()?),
                    NODE_LINKS => {
                        let index = links.len();
                        let link = PbLink::decode(field.bytes()?).map_err(|source| {
                            DagPbError::InvalidLink {
                                index,
                                source: Box::new(source),
                            }
                        })?;
                        links.push(link);
                    }
                    number => {
                        return Err(DagPbError::UnsupportedField {
                            message: "PBNode",
                            number,
                            offset: field.offset,
                        });
                    }
                }
                Ok((data, links))
            },
        )?;

        Ok(PbNode {
            data: data.map(Cow::Borrowed),
            links,
        })
    }

    /// Encodes the node: every link (field 2) first, then the data (field 1) when present.
    ///
    /// A node with `data: None` has no data field at all, while `Some` of an empty slice is
    /// written as an empty field (`0A 00`).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut link_buf = Vec::new();
        for link in &self.links {
            link_buf.clear();
            link.encode_into(&mut link_buf);
            proto::write_field(&mut out, NODE_LINKS, &FieldValue::Bytes(&link_buf));
        }
        if let Some(data) = &self.data {
            proto::write_field(&mut out, NODE_DATA, &FieldValue::Bytes(data));
        }
        out
    }

    /// Detaches the node from the buffer it was decoded from
    pub fn into_owned(self) -> PbNode<'static> {
        PbNode {
            data: self.data.map(|data| Cow::Owned(data.into_owned())),
            links: self.links.into_iter().map(PbLink::into_owned).collect(),
        }
    }
}

fn serialize_link_target<S>(hash: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&encode_display_string(hash))
}

/// Errors related to DAG-PB decoding
#[derive(thiserror::Error, Debug)]
pub enum DagPbError {
    #[error(transparent)]
    Wire(#[from] WireError),
    /// A field number outside of the closed DAG-PB schema
    #[error("Unsupported {message} field number {number} at offset {offset}")]
    UnsupportedField {
        message: &'static str,
        number: u32,
        offset: usize,
    },
    #[error("PBLink without a Hash field")]
    MissingLinkHash,
    #[error("PBLink name at offset {offset} is not valid UTF-8")]
    InvalidName {
        offset: usize,
        #[source]
        source: std::str::Utf8Error,
    },
    #[error("Invalid link #{index}: {source}")]
    InvalidLink {
        index: usize,
        #[source]
        source: Box<DagPbError>,
    },
}
