//! The located resources handed back by `ResourceLocator`.
//!
//! Nothing here is decoded, a located resource only carries the chunks and streams the
//! codecs need together with the attributes telling how to decode them.

use crate::archive::{Archive, Chunk};
use crate::cache::Resource;
use crate::vfs::Stream;

/// A shared handle to an opened archive.
pub type ArchiveHandle = Resource<Box<dyn Archive>>;

pub struct Animation {
    pub name: String,
    pub data_set: String,
    pub lvl: String,
    pub file: String,
    pub id: u32,
    pub blend_mode: u32,
    pub is_psx: bool,
    pub scale_frame_offsets: bool,
    /// Keeps the archive opened while the animation is in use.
    pub archive: ArchiveHandle,
    pub chunk: Resource<Chunk>,
}

#[derive(Debug, Clone)]
pub struct LevelPath {
    pub name: String,
    pub data_set: String,
    pub lvl: String,
    pub file: String,
    pub chunk: Chunk,
    pub collision_offset: u32,
    pub object_indextable_offset: u32,
    pub object_offset: u32,
    pub number_of_screens_x: u32,
    pub number_of_screens_y: u32,
    pub music_theme: Option<String>,
    pub is_ao: bool,
}

pub enum Camera {
    /// The camera of an original data set, with its optional foreground layer.
    Original {
        data_set: String,
        lvl: String,
        bits: Chunk,
        fg1: Option<Chunk>,
    },
    /// A PNG image from a mod, replacing the camera or adding a new one.
    Replacement {
        data_set: String,
        image: Box<dyn Stream>,
    },
    /// An upscaling PNG delta from a mod, to be applied over the original camera.
    Delta {
        data_set: String,
        delta: Box<dyn Stream>,
        original: Box<Camera>,
    },
}

impl Camera {
    /// The data set which supplied this camera.
    pub fn data_set(&self) -> &str {
        match *self {
            Camera::Original { ref data_set, .. } => data_set,
            Camera::Replacement { ref data_set, .. } => data_set,
            Camera::Delta { ref data_set, .. } => data_set,
        }
    }
}

pub struct SoundBank {
    pub name: String,
    pub data_set: String,
    pub lvl: String,
    pub is_psx: bool,
    pub header: Chunk,
    pub body: Chunk,
    /// PC data sets keep the samples of their sound banks in a separated `sounds.dat`.
    pub sounds_dat: Option<Box<dyn Stream>>,
}

pub struct Fmv {
    pub name: String,
    pub data_set: String,
    pub file_name: String,
    pub stream: Box<dyn Stream>,
    pub start_sector: Option<u32>,
    pub end_sector: Option<u32>,
    /// The SRT subtitles shipped with the engine, if any.
    pub subtitles: Option<Box<dyn Stream>>,
}

/// A note of one program of a sound bank.
pub struct SoundEffect {
    pub name: String,
    pub data_set: String,
    pub bank: SoundBank,
    pub program: u32,
    pub note: u32,
    pub min_pitch: i32,
    pub max_pitch: i32,
}

/// A sequence chunk together with the sound bank it is played with.
pub struct Music {
    pub name: String,
    pub data_set: String,
    pub lvl: String,
    pub file: String,
    pub sequence: Chunk,
    pub bank: SoundBank,
}
