//! Content-addressing integrity check.
//!
//! A block is only trusted once the digest of its payload matches the hash embedded in its CID.

use sha2::{Digest, Sha256};

use crate::wire::cid::{Cid, SHA2_256, SHA2_256_LEN};

/// Computes the digest of `data` with the multihash algorithm `hash_type`.
///
/// Only SHA2-256 is supported.
pub fn digest(hash_type: u64, data: &[u8]) -> Result<[u8; SHA2_256_LEN], ValidationError> {
    if hash_type != SHA2_256 {
        return Err(ValidationError::UnsupportedHashAlgorithm(hash_type));
    }
    let mut out = [0u8; SHA2_256_LEN];
    out.copy_from_slice(&Sha256::digest(data));
    Ok(out)
}

/// Checks that `payload` hashes to the digest embedded in `cid`.
///
/// ## Examples
/// ```
/// use navira_ipld::validate::{digest, validate_block};
/// use navira_ipld::wire::cid::{Cid, CODEC_RAW, SHA2_256};
///
/// let cid = Cid::new_v1(CODEC_RAW, &digest(SHA2_256, b"hi").unwrap()).unwrap();
/// assert!(validate_block(&cid, b"hi").is_ok());
/// assert!(validate_block(&cid, b"ho").is_err());
/// ```
pub fn validate_block(cid: &Cid, payload: &[u8]) -> Result<(), ValidationError> {
    let actual = digest(cid.hash_type(), payload)?;
    if &actual != cid.hash() {
        return Err(ValidationError::HashMismatch {
            cid: *cid,
            expected: hex::encode(cid.hash()),
            actual: hex::encode(actual),
        });
    }
    Ok(())
}

/// Errors related to block validation
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported hash algorithm 0x{0:x}, only SHA2-256 is supported")]
    UnsupportedHashAlgorithm(u64),
    #[error("Hash mismatch for block {cid}: expected {expected}, got {actual}")]
    HashMismatch {
        cid: Cid,
        expected: String,
        actual: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::cid::CODEC_RAW;

    // sha2-256("hi")
    const HI_DIGEST: &str = "8f434346648f6b96df89dda901c5176b10a6d83961dd3c1ac88b59b2dc327aa4";

    #[test]
    fn test_digest() {
        assert_eq!(hex::encode(digest(SHA2_256, b"hi").unwrap()), HI_DIGEST);
        assert_eq!(
            digest(0x13, b"hi"),
            Err(ValidationError::UnsupportedHashAlgorithm(0x13))
        );
    }

    #[test]
    fn test_validate_block() {
        let cid = Cid::new_v1(CODEC_RAW, &hex::decode(HI_DIGEST).unwrap()).unwrap();
        assert_eq!(validate_block(&cid, b"hi"), Ok(()));
    }

    #[test]
    fn test_validate_block_detects_any_byte_flip() {
        let payload = b"Hello, World\n".to_vec();
        let cid = Cid::new_v1(CODEC_RAW, &digest(SHA2_256, &payload).unwrap()).unwrap();
        for i in 0..payload.len() {
            let mut tampered = payload.clone();
            tampered[i] ^= 0x01;
            assert!(matches!(
                validate_block(&cid, &tampered),
                Err(ValidationError::HashMismatch { expected, .. }) if expected == hex::encode(cid.hash())
            ));
        }
        let mut longer = payload.clone();
        longer.push(0);
        assert!(validate_block(&cid, &longer).is_err());
    }
}
