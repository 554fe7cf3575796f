//! The seam to the external archive decoder.
//!
//! Data sets pack their assets into LVL archives, each holding a number of sub-files which are
//! themselves split into typed, numbered chunks. Decoding that container is not done here, an
//! `ArchiveLoader` is plugged into the `ResourceLocator` instead.

use std::fmt;
use std::sync::Arc;

use crate::errors::*;
use crate::vfs::Stream;

/// The four character tag of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkType(pub [u8; 4]);

impl ChunkType {
    pub const ANIM: ChunkType = ChunkType(*b"Anim");
    pub const BITS: ChunkType = ChunkType(*b"Bits");
    pub const FG1: ChunkType = ChunkType(*b"FG1 ");
    pub const PATH: ChunkType = ChunkType(*b"Path");
    pub const VAB_HEADER: ChunkType = ChunkType(*b"VabH");
    pub const VAB_BODY: ChunkType = ChunkType(*b"VabB");
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// An owned copy of the bytes of one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: u32,
    pub kind: ChunkType,
    pub bytes: Arc<Vec<u8>>,
}

impl Chunk {
    pub fn new(id: u32, kind: ChunkType, bytes: Vec<u8>) -> Self {
        Chunk {
            id,
            kind,
            bytes: Arc::new(bytes),
        }
    }
}

/// One sub-file of an archive.
pub trait ArchiveFile: Send + Sync {
    fn name(&self) -> &str;

    fn chunk_count(&self) -> usize;

    fn chunk_by_id(&self, id: u32) -> Option<Chunk>;

    fn chunk_by_index(&self, index: usize) -> Option<Chunk>;

    fn chunk_by_type(&self, kind: ChunkType) -> Option<Chunk>;
}

/// An opened archive. Sub-file names are matched case-insensitively.
pub trait Archive: Send + Sync {
    fn file_by_name(&self, name: &str) -> Option<Arc<dyn ArchiveFile>>;
}

/// Decodes an archive out of a stream opened through the virtual filesystem.
pub trait ArchiveLoader: Send + Sync {
    fn load(&self, name: &str, stream: Box<dyn Stream>) -> Result<Box<dyn Archive>>;
}

impl<F> ArchiveLoader for F
where
    F: Fn(&str, Box<dyn Stream>) -> Result<Box<dyn Archive>> + Send + Sync,
{
    fn load(&self, name: &str, stream: Box<dyn Stream>) -> Result<Box<dyn Archive>> {
        (self)(name, stream)
    }
}
