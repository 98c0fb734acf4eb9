//! Content Identifiers (CID) as found in CAR sections and DAG-PB links.
//!
//! Two versions are supported:
//! - CIDv0: a bare SHA2-256 multihash `0x12 0x20 <32 bytes>`, implicitly dag-pb.
//! - CIDv1: `<version=1> <codec> <hash type> <hash length> <hash>`, every prefix
//!   field being an unsigned varint.
//!
//! Only SHA2-256 multihashes (32-byte digests) are accepted.
//!
//! The human readable form is the multibase base32 (lowercase, `b` prefix) encoding
//! of the packed CID, whatever its version.

use std::str::FromStr;

use multibase::Base;
use serde::{Serialize, Serializer};

use crate::wire::WireError;
use crate::wire::varint::UnsignedVarint;

/// Multicodec of raw binary blocks
pub const CODEC_RAW: u64 = 0x55;
/// Multicodec of MerkleDAG protobuf nodes
pub const CODEC_DAG_PB: u64 = 0x70;
/// Multihash code of SHA2-256
pub const SHA2_256: u64 = 0x12;
/// Digest length of SHA2-256, in bytes
pub const SHA2_256_LEN: usize = 32;

const CIDV0_PREFIX: [u8; 2] = [SHA2_256 as u8, SHA2_256_LEN as u8];
const CIDV0_LEN: usize = CIDV0_PREFIX.len() + SHA2_256_LEN;

/// Multibase used to display CIDs
pub const CID_DISPLAY_BASE: Base = Base::Base32Lower;

/// CID version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CidVersion {
    V0,
    V1,
}

impl CidVersion {
    /// Numeric version, as written in a CIDv1 prefix
    pub fn code(self) -> u64 {
        match self {
            CidVersion::V0 => 0,
            CidVersion::V1 => 1,
        }
    }
}

/// A parsed Content Identifier.
///
/// CIDs are immutable values. Two CIDs are equal exactly when their packed forms are.
///
/// ## Examples
/// ```
/// use navira_ipld::wire::cid::{Cid, CidVersion, CODEC_RAW};
///
/// let cid: Cid = "bafkreiaqeb6w3ncofru3zqhkarwhob2hdfdygmnkmkio2njyanhsb46tba".parse().unwrap();
/// assert_eq!(cid.version(), CidVersion::V1);
/// assert_eq!(cid.codec(), CODEC_RAW);
/// assert_eq!(Cid::from_bytes(&cid.to_bytes()).unwrap(), cid);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cid {
    version: CidVersion,
    codec: u64,
    hash_type: u64,
    hash: [u8; SHA2_256_LEN],
}

impl Cid {
    /// Creates a CIDv0 (dag-pb, SHA2-256) from a 32-byte digest
    pub fn new_v0(hash: &[u8]) -> Result<Self, CidFormatError> {
        Ok(Cid {
            version: CidVersion::V0,
            codec: CODEC_DAG_PB,
            hash_type: SHA2_256,
            hash: Self::sha2_256_digest(hash)?,
        })
    }

    /// Creates a CIDv1 with the given multicodec from a 32-byte SHA2-256 digest
    pub fn new_v1(codec: u64, hash: &[u8]) -> Result<Self, CidFormatError> {
        Ok(Cid {
            version: CidVersion::V1,
            codec,
            hash_type: SHA2_256,
            hash: Self::sha2_256_digest(hash)?,
        })
    }

    fn sha2_256_digest(hash: &[u8]) -> Result<[u8; SHA2_256_LEN], CidFormatError> {
        hash.try_into()
            .map_err(|_| CidFormatError::InvalidHashLength(hash.len() as u64))
    }

    /// Returns the CID version
    pub fn version(&self) -> CidVersion {
        self.version
    }

    /// Returns the multicodec of the content
    pub fn codec(&self) -> u64 {
        self.codec
    }

    /// Returns the multihash code of the hash
    pub fn hash_type(&self) -> u64 {
        self.hash_type
    }

    /// Returns the digest bytes
    pub fn hash(&self) -> &[u8; SHA2_256_LEN] {
        &self.hash
    }

    /// Parses a CID at the start of `bytes`.
    ///
    /// ## Returns
    ///
    /// * Ok((Cid, cid_size)) - the CID and the number of bytes it occupies
    /// * Err(CidFormatError) - the prefix is not a supported CID
    pub fn read_bytes(bytes: &[u8]) -> Result<(Self, usize), CidFormatError> {
        // Handle CIDv0 (DagProtobuf, SHA2-256, 32 bytes hash) - prefix Qm...
        if bytes.starts_with(&CIDV0_PREFIX) {
            let hash = bytes
                .get(CIDV0_PREFIX.len()..CIDV0_LEN)
                .ok_or(CidFormatError::TruncatedInput {
                    needed: CIDV0_LEN,
                    available: bytes.len(),
                })?;
            return Ok((Cid::new_v0(hash)?, CIDV0_LEN));
        }

        // Handle CIDv1 (version, multicodec, multihash)
        let (version, offset) = UnsignedVarint::decode_at(bytes, 0)?;
        if version.0 != CidVersion::V1.code() {
            return Err(CidFormatError::UnsupportedVersion(version.0));
        }
        let (codec, offset) = UnsignedVarint::decode_at(bytes, offset)?;
        let (hash_type, offset) = UnsignedVarint::decode_at(bytes, offset)?;
        if hash_type.0 != SHA2_256 {
            return Err(CidFormatError::UnsupportedHashAlgorithm(hash_type.0));
        }
        let (hash_len, offset) = UnsignedVarint::decode_at(bytes, offset)?;
        if hash_len.0 != SHA2_256_LEN as u64 {
            return Err(CidFormatError::InvalidHashLength(hash_len.0));
        }
        let end = offset + SHA2_256_LEN;
        let hash = bytes
            .get(offset..end)
            .ok_or(CidFormatError::TruncatedInput {
                needed: end,
                available: bytes.len(),
            })?;
        Ok((Cid::new_v1(codec.0, hash)?, end))
    }

    /// Parses a CID that spans the whole of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CidFormatError> {
        let (cid, size) = Self::read_bytes(bytes)?;
        if size != bytes.len() {
            return Err(CidFormatError::TrailingBytes(bytes.len() - size));
        }
        Ok(cid)
    }

    /// Creates a CID from the hexadecimal representation of its packed form
    pub fn from_hex(hex_str: &str) -> Result<Self, CidFormatError> {
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Packs the CID into its binary form.
    ///
    /// CIDv0 ignores the codec and hash type, which are fixed for that version.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        match self.version {
            CidVersion::V0 => bytes.extend_from_slice(&CIDV0_PREFIX),
            CidVersion::V1 => {
                UnsignedVarint(CidVersion::V1.code()).encode_into(&mut bytes);
                UnsignedVarint(self.codec).encode_into(&mut bytes);
                UnsignedVarint(self.hash_type).encode_into(&mut bytes);
                UnsignedVarint(SHA2_256_LEN as u64).encode_into(&mut bytes);
            }
        }
        bytes.extend_from_slice(&self.hash);
        bytes
    }

    /// Length of the packed form
    pub fn encoded_len(&self) -> usize {
        match self.version {
            CidVersion::V0 => CIDV0_LEN,
            CidVersion::V1 => {
                UnsignedVarint(CidVersion::V1.code()).encoded_len()
                    + UnsignedVarint(self.codec).encoded_len()
                    + UnsignedVarint(self.hash_type).encoded_len()
                    + UnsignedVarint(SHA2_256_LEN as u64).encoded_len()
                    + SHA2_256_LEN
            }
        }
    }

    /// Returns the hexadecimal representation of the packed CID
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

/// Decodes the human readable form of a CID back to its packed bytes.
///
/// Any multibase prefix known to the `multibase` crate is accepted, as well as
/// the bare base58btc `Qm...` strings IPFS tooling prints for CIDv0.
/// The bytes are not checked to be a valid CID, see [Cid::from_str] for that.
pub fn decode_display_string(text: &str) -> Result<Vec<u8>, CidFormatError> {
    if text.len() == 46 && text.starts_with("Qm") {
        return Ok(Base::Base58Btc.decode(text)?);
    }
    let (_base, bytes) = multibase::decode(text)?;
    Ok(bytes)
}

/// Encodes arbitrary packed CID bytes in the display multibase
pub fn encode_display_string(bytes: &[u8]) -> String {
    multibase::encode(CID_DISPLAY_BASE, bytes)
}

impl std::fmt::Debug for Cid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cid({})", self.to_hex())
    }
}

impl std::fmt::Display for Cid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&encode_display_string(&self.to_bytes()))
    }
}

impl FromStr for Cid {
    type Err = CidFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cid::from_bytes(&decode_display_string(s)?)
    }
}

impl Serialize for Cid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Errors related to CID parsing
#[derive(thiserror::Error, Debug)]
pub enum CidFormatError {
    #[error("Insufficient data for CID: need {needed} bytes, got {available}")]
    TruncatedInput { needed: usize, available: usize },
    #[error("Unsupported CID version {0}")]
    UnsupportedVersion(u64),
    #[error("Unsupported hash algorithm 0x{0:x}, only SHA2-256 is supported")]
    UnsupportedHashAlgorithm(u64),
    #[error("Invalid SHA2-256 hash length {0}, expected 32")]
    InvalidHashLength(u64),
    #[error("{0} unexpected bytes after CID")]
    TrailingBytes(usize),
    #[error("Invalid CID prefix: {0}")]
    Wire(#[from] WireError),
    #[error("Invalid hexadecimal CID: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("Invalid multibase CID: {0}")]
    Multibase(#[from] multibase::Error),
}
