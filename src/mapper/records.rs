//! The typed records of a resource catalog.

use serde::Deserialize;

/// Where an animation lives: the sub-file and the chunk id inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimMapping {
    pub file: String,
    pub id: u32,
    pub blend_mode: u32,
}

/// One archive of a data set containing some physical file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSetFileAttributes {
    pub lvl_name: String,
    /// The data set is in the PSX format.
    pub is_psx: bool,
    pub is_ao: bool,
    pub scale_frame_offsets: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PathLocation {
    pub dataset: String,
    pub file_name: String,
}

/// The layout of a level path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PathMapping {
    pub resource_name: String,
    pub id: u32,
    pub collision_offset: u32,
    pub object_indextable_offset: u32,
    pub object_offset: u32,
    pub number_of_screens_x: u32,
    pub number_of_screens_y: u32,
    #[serde(default)]
    pub music_theme: Option<String>,
    pub locations: Vec<PathLocation>,
}

impl PathMapping {
    pub fn location<T: AsRef<str>>(&self, data_set: T) -> Option<&PathLocation> {
        let data_set = data_set.as_ref();
        self.locations.iter().find(|v| v.dataset == data_set)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FmvLocation {
    pub dataset: String,
    pub file_name: String,
    #[serde(default)]
    pub start_sector: Option<u32>,
    #[serde(default)]
    pub end_sector: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FmvMapping {
    pub name: String,
    pub locations: Vec<FmvLocation>,
}

/// A VH/VB pair of one data set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SoundBankMapping {
    pub name: String,
    pub dataset: String,
    pub lvl: String,
    pub vab_header: String,
    pub vab_body: String,
}

/// A sound effect played from a program of a sound bank.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SoundEffectMapping {
    pub name: String,
    pub dataset: String,
    pub sound_bank: String,
    pub program: u32,
    pub note: u32,
    #[serde(default)]
    pub min_pitch: i32,
    #[serde(default)]
    pub max_pitch: i32,
}

/// A sequence stored as one chunk of a file inside an archive, played with a sound bank.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MusicMapping {
    pub name: String,
    pub dataset: String,
    pub lvl: String,
    pub file: String,
    pub index: usize,
    pub sound_bank: String,
}

#[derive(Deserialize)]
pub(crate) struct AnimRecord {
    pub file: String,
    pub id: u32,
    pub anims: Vec<AnimEntry>,
}

#[derive(Deserialize)]
pub(crate) struct AnimEntry {
    pub name: String,
    pub blend_mode: u32,
}

#[derive(Deserialize)]
pub(crate) struct LvlRecord {
    pub data_set_name: String,
    pub is_psx: bool,
    #[serde(default)]
    pub is_ao: bool,
    #[serde(default)]
    pub scale_frame_offsets: bool,
    pub lvls: Vec<LvlEntry>,
}

#[derive(Deserialize)]
pub(crate) struct LvlEntry {
    pub name: String,
    pub files: Vec<String>,
}

#[derive(Deserialize)]
pub(crate) struct PathRecord {
    pub paths: Vec<PathMapping>,
}

#[derive(Deserialize)]
pub(crate) struct FmvRecord {
    pub fmvs: Vec<FmvMapping>,
}

#[derive(Deserialize)]
pub(crate) struct SoundBankRecord {
    pub sound_banks: Vec<SoundBankMapping>,
}

#[derive(Deserialize)]
pub(crate) struct SoundEffectRecord {
    pub sound_effects: Vec<SoundEffectMapping>,
}

#[derive(Deserialize)]
pub(crate) struct MusicRecord {
    pub musics: Vec<MusicMapping>,
}
