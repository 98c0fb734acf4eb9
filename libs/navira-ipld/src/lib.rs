//! navira-ipld is a Rust library for decoding (and re-encoding) the content-addressed structures
//! found in CAR (Content Addressable aRchive) files: the CAR v1 framing, CIDs, DAG-PB nodes and
//! their UnixFS payloads.
//!
//! The library is sans-IO: every decoder works on an in-memory `&[u8]` and returns either owned
//! values or views borrowing from the input, so that it can be used on top of files, memory maps
//! or network buffers alike. Nothing is logged, nothing is read from disk.
//!
//! The crate is layered the same way the formats are:
//! - [wire]: unsigned varints, the protobuf wire format and CIDs,
//! - [dag]: DAG-PB nodes ([PbNode], [PbLink]) and UnixFS data ([UnixFsData]),
//! - [car]: splitting a CAR file into frames and decoding block frames,
//! - [validate]: checking a block payload against the hash of its CID.
//!
//! ## Usages
//!
//! ### Split a CAR file and verify its blocks
//! ```rust
//! use navira_ipld::{Codec, split_frames};
//!
//! // header frame ("header"), then one raw block holding "hi"
//! let car = hex::decode(
//!     "0668656164657226015512208f434346648f6b96df89dda901c5176b10a6d83961dd3c1ac88b59b2dc327aa46869",
//! ).unwrap();
//!
//! let frames = split_frames(&car).unwrap();
//! assert_eq!(frames[0].data, b"header");
//!
//! for frame in &frames[1..] {
//!     let block = frame.decode_block().unwrap();
//!     block.validate().unwrap();
//!     assert_eq!(block.codec(), Codec::Raw);
//!     println!("Block at offset {}: {}", frame.data_offset, block.cid());
//! }
//!
//! //>> Output:
//! // Block at offset 8: bafkreiepinbumzepnoln7co5vea4kf3lcctnqolb3u6bvsellgznymt2uq
//! ```
//!
//! ### Build a UnixFS directory node
//! ```rust
//! use navira_ipld::{Cid, PbLink, PbNode, UnixFsData};
//!
//! let child: Cid = "bafkreiepinbumzepnoln7co5vea4kf3lcctnqolb3u6bvsellgznymt2uq".parse().unwrap();
//! let directory = UnixFsData::directory().encode();
//! let node = PbNode::new(
//!     Some(directory.into()),
//!     vec![PbLink::to_cid(&child, "hi.txt", 2)],
//! );
//!
//! let bytes = node.encode();
//! let decoded = PbNode::decode(&bytes).unwrap();
//! assert_eq!(decoded.links[0].cid().unwrap(), child);
//! assert_eq!(decoded.data(), Some(&[0x08, 0x01][..]));
//! ```

pub mod car;
pub mod dag;
pub mod validate;
pub mod wire;

pub use car::{Block, CarError, CarFrame, Codec, decode_block, split_frames};
pub use dag::pb::{DagPbError, PbLink, PbNode};
pub use dag::unixfs::{DataType, UnixFsData, UnixFsError};
pub use validate::{ValidationError, validate_block};
pub use wire::WireError;
pub use wire::cid::{Cid, CidFormatError, CidVersion};

pub type Result<T> = std::result::Result<T, Error>;

/// Any error raised by this crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error(transparent)]
    Cid(#[from] CidFormatError),
    #[error(transparent)]
    DagPb(#[from] DagPbError),
    #[error(transparent)]
    UnixFs(#[from] UnixFsError),
    #[error(transparent)]
    Car(#[from] CarError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_CAR: &[u8] = include_bytes!("../res/hello.car");

    /// Walks a CAR buffer the way a consumer would, with `?` on the crate-level error
    fn file_contents(car: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut contents = Vec::new();
        for frame in &split_frames(car)?[1..] {
            let block = frame.decode_block()?;
            block.validate()?;
            if let Some(data) = block.node().and_then(PbNode::data) {
                let unixfs = UnixFsData::decode(data)?;
                if unixfs.data_type == DataType::File {
                    contents.push(unixfs.data().unwrap_or_default().to_vec());
                }
            }
        }
        Ok(contents)
    }

    #[test]
    fn test_error_aggregate() {
        assert_eq!(file_contents(HELLO_CAR).unwrap(), [b"Hello, World\n".to_vec()]);

        let mut tampered = HELLO_CAR.to_vec();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;
        assert!(matches!(
            file_contents(&tampered),
            Err(Error::Validation(ValidationError::HashMismatch { .. }))
        ));

        assert!(matches!(
            file_contents(&HELLO_CAR[..HELLO_CAR.len() - 1]),
            Err(Error::Car(CarError::TruncatedFrame { .. }))
        ));
    }
}
