//! Printing the content of a CAR file
//!
//! The whole file is read in memory, split into frames and every block frame is decoded
//! (and verified, unless asked otherwise). The first frame is the CAR header, which is
//! only summarized.
//!
//! Two output modes:
//! - **Text** (default): one paragraph per block, with its links and optional UnixFS summary
//! - **JSON** (`--json`): one JSON object per line and per block

use std::io::Write;
use std::path::{Path, PathBuf};

use navira_ipld::{Block, CarFrame, Cid, PbNode, UnixFsData, split_frames};
use serde::Serialize;
use tracing::{debug, warn};

/// Number of header bytes shown in the text dump
const HEADER_PREVIEW: usize = 16;

pub type Result<T> = std::result::Result<T, DumpError>;

/// Errors related to dumping a CAR file
#[derive(thiserror::Error, Debug)]
pub enum DumpError {
    /// The CAR file cannot be read
    #[error("Cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Writing the dump failed
    #[error("Cannot write output: {0}")]
    Output(#[from] std::io::Error),
    /// The block report cannot be serialized
    #[error("Cannot serialize block report: {0}")]
    Json(#[from] serde_json::Error),
    /// The file is not a sequence of frames
    #[error("Invalid CAR file: {0}")]
    Car(#[from] navira_ipld::Error),
    /// The file has no frame at all
    #[error("Empty CAR file: missing header frame")]
    MissingHeader,
    /// A block frame failed to decode or to verify
    #[error("Block #{index} at offset {offset}: {source}")]
    Block {
        index: usize,
        offset: usize,
        #[source]
        source: navira_ipld::Error,
    },
}

/// Output formatting mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

/// What to do with each block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpOptions {
    /// Check every block against the hash of its CID
    pub verify: bool,
    /// Decode the data of dag-pb nodes as UnixFS
    pub unixfs: bool,
    pub mode: OutputMode,
}

impl Default for DumpOptions {
    fn default() -> Self {
        DumpOptions {
            verify: true,
            unixfs: false,
            mode: OutputMode::Text,
        }
    }
}

/// JSON form of a block
#[derive(Debug, Serialize)]
struct BlockReport<'a> {
    offset: usize,
    length: u64,
    codec: &'static str,
    cid: &'a Cid,
    verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    node: Option<&'a PbNode<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unixfs: Option<&'a UnixFsData<'a>>,
}

/// Reads the CAR file at `path` and dumps it to `out`.
///
/// Returns the number of blocks dumped.
pub fn dump_file<W: Write>(path: &Path, options: &DumpOptions, out: &mut W) -> Result<usize> {
    let car = std::fs::read(path).map_err(|source| DumpError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Read {} bytes from {:?}", car.len(), path);
    dump_bytes(&car, options, out)
}

/// Dumps an in-memory CAR file to `out`.
///
/// Stops at the first invalid block. Returns the number of blocks dumped.
pub fn dump_bytes<W: Write>(car: &[u8], options: &DumpOptions, out: &mut W) -> Result<usize> {
    let frames = split_frames(car).map_err(navira_ipld::Error::from)?;
    let (header, blocks) = frames.split_first().ok_or(DumpError::MissingHeader)?;
    debug!("Found a header and {} block frames", blocks.len());
    if !options.verify {
        warn!("Block verification is disabled");
    }

    if options.mode == OutputMode::Text {
        write_header(header, out)?;
    }
    for (index, frame) in blocks.iter().enumerate() {
        dump_block(index + 1, frame, options, out)?;
    }
    out.flush()?;
    Ok(blocks.len())
}

fn write_header<W: Write>(header: &CarFrame<'_>, out: &mut W) -> Result<()> {
    let preview = &header.data[..header.data.len().min(HEADER_PREVIEW)];
    let ellipsis = if preview.len() < header.data.len() {
        "..."
    } else {
        ""
    };
    writeln!(
        out,
        "Header at offset {} with length {}: {}{}",
        header.offset,
        header.length,
        hex::encode(preview),
        ellipsis
    )?;
    Ok(())
}

fn dump_block<W: Write>(
    index: usize,
    frame: &CarFrame<'_>,
    options: &DumpOptions,
    out: &mut W,
) -> Result<()> {
    let failed = |source: navira_ipld::Error| DumpError::Block {
        index,
        offset: frame.offset,
        source,
    };

    let block = frame.decode_block().map_err(|e| failed(e.into()))?;
    if options.verify {
        block.validate().map_err(|e| failed(e.into()))?;
    }
    let unixfs = if options.unixfs {
        block
            .node()
            .and_then(PbNode::data)
            .map(UnixFsData::decode)
            .transpose()
            .map_err(|e| failed(e.into()))?
    } else {
        None
    };
    debug!("Block #{} {} ({} bytes)", index, block.cid(), block.data().len());

    match options.mode {
        OutputMode::Text => write_block_text(frame, &block, unixfs.as_ref(), out),
        OutputMode::Json => {
            let report = BlockReport {
                offset: frame.offset,
                length: frame.length,
                codec: block.codec().name(),
                cid: block.cid(),
                verified: options.verify,
                node: block.node(),
                unixfs: unixfs.as_ref(),
            };
            serde_json::to_writer(&mut *out, &report)?;
            writeln!(out)?;
            Ok(())
        }
    }
}

fn write_block_text<W: Write>(
    frame: &CarFrame<'_>,
    block: &Block<'_>,
    unixfs: Option<&UnixFsData<'_>>,
    out: &mut W,
) -> Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "Block at offset {} with length {}",
        frame.offset, frame.length
    )?;
    writeln!(out, "Codec: 0x{:x} ({})", block.codec().code(), block.codec())?;
    writeln!(out, "CID: {}", block.cid())?;

    if let Some(node) = block.node().filter(|node| !node.links.is_empty()) {
        writeln!(out, "Links:")?;
        for link in &node.links {
            writeln!(
                out,
                "   {} ({}) -> {}",
                link.name,
                link.size,
                link.target_string()
            )?;
        }
    }

    if let Some(unixfs) = unixfs {
        write!(out, "UnixFS: {:?}", unixfs.data_type)?;
        if let Some(file_size) = unixfs.file_size {
            write!(out, ", file size {}", file_size)?;
        }
        if let Some(data) = unixfs.data() {
            write!(out, ", {} bytes of data", data.len())?;
        }
        writeln!(out)?;
    }
    Ok(())
}
