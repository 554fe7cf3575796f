//! The `ResourceMapper` translates logical resource names into archive coordinates.
//!
//! A catalog is a JSON array of records. The kind of a record is told apart by the array it
//! carries:
//!
//! ```json
//! [
//!     { "file": "ABEBSIC.BAN", "id": 10, "anims": [{ "name": "AbeWalking", "blend_mode": 1 }] },
//!     { "data_set_name": "AePc", "is_psx": false, "lvls": [{ "name": "R1.LVL", "files": ["ABEBSIC.BAN"] }] },
//!     { "paths": [..] },
//!     { "fmvs": [..] },
//!     { "sound_banks": [..] },
//!     { "sound_effects": [..] },
//!     { "musics": [..] }
//! ]
//! ```
//!
//! File location records are declared per data set, per archive. They are inverted at load
//! into a per file, per data set index, so that every lookup is a hash probe.

pub mod records;
pub use self::records::*;

use serde_json::{Map, Value};
use smallvec::SmallVec;

use crate::errors::*;
use crate::utils::FastHashMap;
use crate::vfs::FileSystem;

/// The archives containing one physical file, per data set.
pub type FileLocations = FastHashMap<String, SmallVec<[DataSetFileAttributes; 2]>>;

#[derive(Debug, Clone, Default)]
pub struct ResourceMapper {
    anims: FastHashMap<String, AnimMapping>,
    files: FastHashMap<String, FileLocations>,
    paths: FastHashMap<String, PathMapping>,
    fmvs: FastHashMap<String, FmvMapping>,
    sound_banks: FastHashMap<String, Vec<SoundBankMapping>>,
    sound_effects: FastHashMap<String, SoundEffectMapping>,
    musics: FastHashMap<String, MusicMapping>,
}

impl ResourceMapper {
    pub fn new() -> Self {
        ResourceMapper::default()
    }

    pub fn from_json<T: AsRef<str>>(json: T) -> Result<Self> {
        let mut mapper = ResourceMapper::new();
        mapper.extend_from_json("resource map", json.as_ref())?;
        Ok(mapper)
    }

    /// Loads the catalog `file` of `fs`.
    pub fn load(fs: &dyn FileSystem, file: &str) -> Result<Self> {
        let mut mapper = ResourceMapper::new();
        mapper.extend_from(fs, file)?;
        Ok(mapper)
    }

    /// Merges the catalog `file` of `fs` into this mapper.
    pub fn extend_from(&mut self, fs: &dyn FileSystem, file: &str) -> Result<()> {
        let json = fs.read_to_string(file)?;
        self.extend_from_json(file, &json)
    }

    /// Merges a catalog into this mapper. Later records replace earlier ones of the same name.
    pub fn extend_from_json(&mut self, file: &str, json: &str) -> Result<()> {
        let records: Vec<Map<String, Value>> =
            serde_json::from_str(json).map_err(|err| Error::config(file, err))?;

        for (index, record) in records.into_iter().enumerate() {
            let malformed = |err: serde_json::Error| {
                Error::config(file, format!("record {}: {}", index, err))
            };

            let is_array = |key: &str| record.get(key).map(Value::is_array).unwrap_or(false);
            let kind = [
                "anims",
                "lvls",
                "paths",
                "fmvs",
                "sound_banks",
                "sound_effects",
                "musics",
            ]
                .iter()
                .cloned()
                .find(|key| is_array(*key));

            let record = Value::Object(record);
            match kind {
                Some("anims") => self.add_anims(serde_json::from_value(record).map_err(malformed)?),
                Some("lvls") => self.add_lvls(serde_json::from_value(record).map_err(malformed)?),
                Some("paths") => {
                    let v: PathRecord = serde_json::from_value(record).map_err(malformed)?;
                    for path in v.paths {
                        self.paths.insert(path.resource_name.clone(), path);
                    }
                }
                Some("fmvs") => {
                    let v: FmvRecord = serde_json::from_value(record).map_err(malformed)?;
                    for fmv in v.fmvs {
                        self.fmvs.insert(fmv.name.clone(), fmv);
                    }
                }
                Some("sound_banks") => {
                    let v: SoundBankRecord = serde_json::from_value(record).map_err(malformed)?;
                    for bank in v.sound_banks {
                        self.sound_banks
                            .entry(bank.name.clone())
                            .or_insert_with(Vec::new)
                            .push(bank);
                    }
                }
                Some("sound_effects") => {
                    let v: SoundEffectRecord = serde_json::from_value(record).map_err(malformed)?;
                    for effect in v.sound_effects {
                        self.sound_effects.insert(effect.name.clone(), effect);
                    }
                }
                Some(_) => {
                    let v: MusicRecord = serde_json::from_value(record).map_err(malformed)?;
                    for music in v.musics {
                        self.musics.insert(music.name.clone(), music);
                    }
                }
                None => debug!("Skips unknown record {} of {:?}.", index, file),
            }
        }

        info!(
            "Resource map {:?} loaded, {} animations, {} files, {} paths.",
            file,
            self.anims.len(),
            self.files.len(),
            self.paths.len()
        );

        Ok(())
    }

    fn add_anims(&mut self, record: AnimRecord) {
        for anim in record.anims {
            let mapping = AnimMapping {
                file: record.file.clone(),
                id: record.id,
                blend_mode: anim.blend_mode,
            };

            self.add_anim_mapping(anim.name, mapping);
        }
    }

    fn add_lvls(&mut self, record: LvlRecord) {
        for lvl in record.lvls {
            for file in &lvl.files {
                let archives = self
                    .files
                    .entry(file.clone())
                    .or_insert_with(FastHashMap::default)
                    .entry(record.data_set_name.clone())
                    .or_insert_with(SmallVec::new);

                if archives.iter().any(|v| v.lvl_name == lvl.name) {
                    continue;
                }

                archives.push(DataSetFileAttributes {
                    lvl_name: lvl.name.clone(),
                    is_psx: record.is_psx,
                    is_ao: record.is_ao,
                    scale_frame_offsets: record.scale_frame_offsets,
                });
            }
        }
    }

    pub fn add_anim_mapping<T: Into<String>>(&mut self, name: T, mapping: AnimMapping) {
        self.anims.insert(name.into(), mapping);
    }

    /// Finds the animation `name`, together with the archives containing its file.
    pub fn find<T: AsRef<str>>(&self, name: T) -> Option<(&AnimMapping, Option<&FileLocations>)> {
        self.anims
            .get(name.as_ref())
            .map(|anim| (anim, self.files.get(&anim.file)))
    }

    #[inline]
    pub fn find_animation<T: AsRef<str>>(&self, name: T) -> Option<&AnimMapping> {
        self.anims.get(name.as_ref())
    }

    /// Returns the archives of `data_set` which contain `file`.
    pub fn find_file_location<T1, T2>(&self, data_set: T1, file: T2) -> &[DataSetFileAttributes]
    where
        T1: AsRef<str>,
        T2: AsRef<str>,
    {
        self.files
            .get(file.as_ref())
            .and_then(|v| v.get(data_set.as_ref()))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the attributes of `file` inside the archive `lvl` of `data_set`.
    pub fn find_file_attributes<T1, T2, T3>(
        &self,
        data_set: T1,
        lvl: T2,
        file: T3,
    ) -> Option<&DataSetFileAttributes>
    where
        T1: AsRef<str>,
        T2: AsRef<str>,
        T3: AsRef<str>,
    {
        let lvl = lvl.as_ref();
        self.find_file_location(data_set, file)
            .iter()
            .find(|v| v.lvl_name == lvl)
    }

    #[inline]
    pub fn find_path<T: AsRef<str>>(&self, name: T) -> Option<&PathMapping> {
        self.paths.get(name.as_ref())
    }

    #[inline]
    pub fn find_fmv<T: AsRef<str>>(&self, name: T) -> Option<&FmvMapping> {
        self.fmvs.get(name.as_ref())
    }

    /// Returns the sound bank `name` of every data set declaring it.
    pub fn find_sound_bank<T: AsRef<str>>(&self, name: T) -> &[SoundBankMapping] {
        self.sound_banks
            .get(name.as_ref())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    #[inline]
    pub fn find_sound_effect<T: AsRef<str>>(&self, name: T) -> Option<&SoundEffectMapping> {
        self.sound_effects.get(name.as_ref())
    }

    #[inline]
    pub fn find_music<T: AsRef<str>>(&self, name: T) -> Option<&MusicMapping> {
        self.musics.get(name.as_ref())
    }

    /// Iterates the names of all mapped animations, in no particular order.
    pub fn animation_names(&self) -> impl Iterator<Item = &str> {
        self.anims.keys().map(|v| v.as_str())
    }
}
