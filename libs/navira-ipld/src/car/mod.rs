//! CAR v1 framing.
//!
//! A CAR file is a sequence of frames, each one being an unsigned varint length followed by
//! that many bytes. The first frame is the CAR header (kept opaque here); every other frame is
//! a block: `<packed CID><payload>`.
//!
//! Frames borrow from the input buffer, nothing is copied.
//! See [CAR v1 specification](https://ipld.io/specs/transport/car/carv1/) for more details.

pub use block::{Block, Codec, decode_block};
pub use write::{encode_block, write_block, write_frame};

pub mod block;
pub mod write;

use crate::dag::pb::DagPbError;
use crate::wire::WireError;
use crate::wire::cid::{Cid, CidFormatError};
use crate::wire::varint::UnsignedVarint;

/// A length-prefixed frame read from a CAR file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarFrame<'a> {
    /// Declared length of the frame payload
    pub length: u64,
    /// Frame payload (a view into the CAR buffer)
    pub data: &'a [u8],
    /// Offset of the frame in the CAR buffer, i.e. where its length prefix starts
    pub offset: usize,
    /// Offset of the payload in the CAR buffer
    pub data_offset: usize,
}

impl<'a> CarFrame<'a> {
    /// Length of the frame in bytes, including the length prefix
    pub fn total_length(&self) -> usize {
        self.data_offset - self.offset + self.data.len()
    }

    /// Decodes the frame payload as a block (CID prefix, then payload)
    pub fn decode_block(&self) -> Result<Block<'a>, CarError> {
        Block::decode(self.data)
    }
}

/// Iterator over the frames of an in-memory CAR file
///
/// After the first error, the iterator is exhausted.
///
/// ## Examples
/// ```
/// use navira_ipld::car::Frames;
///
/// let car = [0x02, 0xAA, 0xBB, 0x01, 0xCC];
/// let frames: Vec<_> = Frames::new(&car).collect::<Result<_, _>>().unwrap();
/// assert_eq!(frames.len(), 2);
/// assert_eq!(frames[1].data, &[0xCC]);
/// assert_eq!(frames[1].offset, 3);
/// assert_eq!(frames[1].data_offset, 4);
/// ```
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    buffer: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Frames<'a> {
    /// Creates an iterator starting at the beginning of `buffer`
    pub fn new(buffer: &'a [u8]) -> Self {
        Frames {
            buffer,
            offset: 0,
            failed: false,
        }
    }

    fn read_frame(&mut self) -> Result<CarFrame<'a>, CarError> {
        let offset = self.offset;
        let (length, data_offset) = UnsignedVarint::decode_at(self.buffer, offset)?;
        let available = self.buffer.len() - data_offset;
        let end = usize::try_from(length.0)
            .ok()
            .filter(|length| *length <= available)
            .map(|length| data_offset + length)
            .ok_or(CarError::TruncatedFrame {
                offset,
                declared: length.0,
                available,
            })?;
        self.offset = end;
        Ok(CarFrame {
            length: length.0,
            data: &self.buffer[data_offset..end],
            offset,
            data_offset,
        })
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = Result<CarFrame<'a>, CarError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.buffer.len() {
            return None;
        }
        let frame = self.read_frame();
        self.failed = frame.is_err();
        Some(frame)
    }
}

/// Splits a whole CAR file into its frames.
///
/// The first frame is the header, the others are blocks. Fails if a declared frame
/// length runs past the end of the buffer.
pub fn split_frames(buffer: &[u8]) -> Result<Vec<CarFrame<'_>>, CarError> {
    Frames::new(buffer).collect()
}

/// Errors related to CAR framing and block decoding
#[derive(thiserror::Error, Debug)]
pub enum CarError {
    /// The frame length prefix is malformed
    #[error("Invalid frame length: {0}")]
    Wire(#[from] WireError),
    /// A frame declares more bytes than remain in the buffer
    #[error(
        "Truncated frame at offset {offset}: declares {declared} bytes, only {available} available"
    )]
    TruncatedFrame {
        offset: usize,
        declared: u64,
        available: usize,
    },
    /// The block does not start with a supported CID
    #[error("Invalid block CID: {0}")]
    InvalidCid(#[from] CidFormatError),
    /// The block CID uses a multicodec other than raw or dag-pb
    #[error("Unsupported multicodec 0x{0:x}")]
    UnsupportedCodec(u64),
    /// The payload of a dag-pb block is not a valid PBNode
    #[error("Invalid dag-pb node in block {cid}: {source}")]
    InvalidNode {
        cid: Cid,
        #[source]
        source: DagPbError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_CAR: &[u8] = include_bytes!("../../res/hello.car");
    const WEB4_DIRS_CAR: &[u8] = include_bytes!("../../res/web4-dirs.car");

    #[test]
    fn test_split_hello_car() {
        let frames = split_frames(HELLO_CAR).unwrap();
        let lengths: Vec<_> = frames.iter().map(|f| f.length).collect();
        assert_eq!(lengths, [56, 55]);
        for frame in &frames {
            assert_eq!(frame.data.len() as u64, frame.length);
        }
        assert_eq!(frames[0].offset, 0);
        assert_eq!(frames[0].data_offset, 1);
        assert_eq!(frames[1].offset, 57);
        assert_eq!(frames[1].data_offset, 58);
        assert_eq!(frames[1].total_length(), 56);
        assert_eq!(
            frames.iter().map(CarFrame::total_length).sum::<usize>(),
            HELLO_CAR.len()
        );
    }

    #[test]
    fn test_split_web4_dirs_car() {
        let frames = split_frames(WEB4_DIRS_CAR).unwrap();
        let lengths: Vec<_> = frames.iter().map(|f| f.length).collect();
        assert_eq!(lengths, [58, 440, 90, 95]);
        // 440 needs a two-byte length prefix
        assert_eq!(frames[1].offset, 59);
        assert_eq!(frames[1].data_offset, 61);
        assert_eq!(frames[2].offset, 501);
        assert_eq!(frames[3].data_offset, 593);
    }

    #[test]
    fn test_frames_are_views() {
        let frames = split_frames(HELLO_CAR).unwrap();
        assert_eq!(frames[1].data.as_ptr(), HELLO_CAR[58..].as_ptr());
    }

    #[test]
    fn test_truncated_frame() {
        let car = [0x06, b'h', b'e', b'a', b'd', b'e', b'r', 0x10, 0x01, 0x02];
        let mut frames = Frames::new(&car);
        assert!(frames.next().unwrap().is_ok());
        assert!(matches!(
            frames.next(),
            Some(Err(CarError::TruncatedFrame {
                offset: 7,
                declared: 16,
                available: 2
            }))
        ));
        assert!(frames.next().is_none());
        assert!(split_frames(&car).is_err());
    }

    #[test]
    fn test_truncated_length_prefix() {
        let car = [0x01, 0x00, 0x80];
        assert!(matches!(
            split_frames(&car),
            Err(CarError::Wire(WireError::TruncatedInput { offset: 2 }))
        ));
    }

    #[test]
    fn test_huge_declared_length() {
        let mut car = crate::wire::varint::UnsignedVarint(u64::MAX).encode();
        car.extend_from_slice(b"tiny");
        assert!(matches!(
            split_frames(&car),
            Err(CarError::TruncatedFrame {
                offset: 0,
                declared: u64::MAX,
                available: 4
            })
        ));
    }

    #[test]
    fn test_empty_buffer_and_empty_frame() {
        assert!(split_frames(&[]).unwrap().is_empty());
        let frames = split_frames(&[0x00, 0x00]).unwrap();
        assert_eq!(frames.len(), 2);
        assert!(frames[1].data.is_empty());
    }
}
