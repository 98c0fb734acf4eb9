//! Writing CAR frames.
//!
//! These helpers produce the exact byte layout [split_frames](crate::car::split_frames)
//! and [decode_block](crate::car::decode_block) read back.

use crate::wire::cid::Cid;
use crate::wire::varint::UnsignedVarint;

/// Appends a frame (varint length, then `payload`) to `out`.
///
/// Returns the offset of the frame in `out`.
pub fn write_frame(out: &mut Vec<u8>, payload: &[u8]) -> usize {
    let offset = out.len();
    UnsignedVarint(payload.len() as u64).encode_into(out);
    out.extend_from_slice(payload);
    offset
}

/// Appends a block frame (`<packed CID><payload>`) to `out`.
///
/// Returns the offset of the frame in `out`.
pub fn write_block(out: &mut Vec<u8>, cid: &Cid, payload: &[u8]) -> usize {
    let offset = out.len();
    UnsignedVarint((cid.encoded_len() + payload.len()) as u64).encode_into(out);
    out.extend_from_slice(&cid.to_bytes());
    out.extend_from_slice(payload);
    offset
}

/// Encodes a block frame into a new buffer
pub fn encode_block(cid: &Cid, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(cid.encoded_len() + payload.len() + 3);
    write_block(&mut out, cid, payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::car::{Codec, split_frames};
    use crate::dag::pb::PbNode;
    use crate::dag::unixfs::UnixFsData;
    use crate::validate::digest;
    use crate::wire::cid::SHA2_256;

    const HELLO_CAR: &[u8] = include_bytes!("../../res/hello.car");

    #[test]
    fn test_rebuild_hello_car() {
        let frames = split_frames(HELLO_CAR).unwrap();

        let node = PbNode::new(Some(UnixFsData::file(b"Hello, World\n").encode().into()), vec![]);
        let payload = node.encode();
        let cid = Cid::new_v0(&digest(SHA2_256, &payload).unwrap()).unwrap();

        let mut car = Vec::new();
        write_frame(&mut car, frames[0].data);
        let offset = write_block(&mut car, &cid, &payload);
        assert_eq!(offset, frames[1].offset);
        assert_eq!(car, HELLO_CAR);
    }

    #[test]
    fn test_encode_block_round_trip() {
        let cid = Cid::new_v1(0x55, &digest(SHA2_256, b"hi").unwrap()).unwrap();
        let mut car = Vec::new();
        write_frame(&mut car, b"header");
        car.extend_from_slice(&encode_block(&cid, b"hi"));

        let frames = split_frames(&car).unwrap();
        let block = frames[1].decode_block().unwrap();
        assert_eq!(block.cid(), &cid);
        assert_eq!(block.codec(), Codec::Raw);
        assert_eq!(block.data(), b"hi");
        block.validate().unwrap();
    }
}
