use crate::car::CarError;
use crate::dag::pb::PbNode;
use crate::validate::{ValidationError, validate_block};
use crate::wire::cid::{CODEC_DAG_PB, CODEC_RAW, Cid};

/// Content multicodecs a block may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// Raw binary (0x55)
    Raw,
    /// MerkleDAG protobuf (0x70)
    DagPb,
}

impl Codec {
    /// Multicodec code
    pub fn code(self) -> u64 {
        match self {
            Codec::Raw => CODEC_RAW,
            Codec::DagPb => CODEC_DAG_PB,
        }
    }

    /// Multicodec name
    pub fn name(self) -> &'static str {
        match self {
            Codec::Raw => "raw",
            Codec::DagPb => "dag-pb",
        }
    }
}

impl TryFrom<u64> for Codec {
    type Error = CarError;

    fn try_from(code: u64) -> Result<Self, Self::Error> {
        match code {
            CODEC_RAW => Ok(Codec::Raw),
            CODEC_DAG_PB => Ok(Codec::DagPb),
            other => Err(CarError::UnsupportedCodec(other)),
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A block decoded from a CAR frame.
///
/// The payload borrows from the frame. For dag-pb blocks, the payload is also
/// decoded as a [PbNode].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<'a> {
    cid: Cid,
    codec: Codec,
    data: &'a [u8],
    node: Option<PbNode<'a>>,
}

impl<'a> Block<'a> {
    /// Decodes a block frame: a CID prefix followed by the payload.
    ///
    /// The block is not validated, see [Block::validate].
    pub fn decode(frame: &'a [u8]) -> Result<Self, CarError> {
        let (cid, cid_size) = Cid::read_bytes(frame)?;
        let codec = Codec::try_from(cid.codec())?;
        let data = &frame[cid_size..];
        let node = match codec {
            Codec::Raw => None,
            Codec::DagPb => Some(
                PbNode::decode(data).map_err(|source| CarError::InvalidNode { cid, source })?,
            ),
        };
        Ok(Block {
            cid,
            codec,
            data,
            node,
        })
    }

    /// Returns the CID of the block
    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    /// Returns the codec of the block
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Returns the payload (the frame without its CID prefix)
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the decoded node of a dag-pb block
    pub fn node(&self) -> Option<&PbNode<'a>> {
        self.node.as_ref()
    }

    /// Consumes the block and returns its decoded node, if any
    pub fn into_node(self) -> Option<PbNode<'a>> {
        self.node
    }

    /// Checks the payload against the hash of the CID
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_block(&self.cid, self.data)
    }
}

/// Decodes a block frame, see [Block::decode]
pub fn decode_block(frame: &[u8]) -> Result<Block<'_>, CarError> {
    Block::decode(frame)
}
