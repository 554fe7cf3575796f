//! The `ResourceLocator` resolves logical names into located resources.
//!
//! For every request the active data sets are walked in priority order. The resource map tells
//! which archives of a data set hold the requested file, and the first archive that opens and
//! contains the file settles the request:
//!
//! ```sh
//! Start -> MapLookup -> WalkActiveDataSets -> TryOpenArchive -> ReadChunk -> Done
//!                    |                      |                 |
//!                    -> Done(None)          -> NextDataSet    -> Done(None)
//! ```
//!
//! A chunk which is missing after its archive and file were found fails the request, later data
//! sets are not tried. Opened archives and animation chunks are shared through the
//! `ResourceCache`, all the other resources are copied out per request.

pub mod resources;
pub use self::resources::{
    Animation, ArchiveHandle, Camera, Fmv, LevelPath, Music, SoundBank, SoundEffect,
};

pub mod prelude {
    pub use super::{
        Animation, Camera, Fmv, LevelPath, Music, ResourceLocator, SoundBank, SoundEffect,
    };
}

use std::sync::{Arc, RwLock};

use crate::archive::{ArchiveLoader, ChunkType};
use crate::cache::{CacheKey, ResourceCache};
use crate::datasets::{ActiveDataSet, DataPaths, PriorityDataSet};
use crate::errors::*;
use crate::mapper::{AnimMapping, ResourceMapper};
use crate::request::Request;
use crate::settings::Settings;
use crate::vfs::{Directory, FileSystem, Stream};

/// The file sound banks of PC data sets keep their samples in.
pub const SOUNDS_DAT: &str = "sounds.dat";

/// Where the engine keeps the subtitles of videos, relative to the game directory.
pub const SUBTITLES_DIR: &str = "data/subtitles";

pub struct ResourceLocator {
    mapper: ResourceMapper,
    data_paths: DataPaths,
    loader: Box<dyn ArchiveLoader>,
    cache: Arc<ResourceCache>,
    active: RwLock<Arc<Vec<ActiveDataSet>>>,
    game_fs: Option<Arc<dyn FileSystem>>,
}

impl ResourceLocator {
    pub fn new<L>(mapper: ResourceMapper, data_paths: DataPaths, loader: L) -> Self
    where
        L: ArchiveLoader + 'static,
    {
        ResourceLocator {
            mapper,
            data_paths,
            loader: Box::new(loader),
            cache: Arc::new(ResourceCache::new()),
            active: RwLock::new(Arc::new(Vec::new())),
            game_fs: None,
        }
    }

    /// Sets the game directory, where engine owned files like subtitles are looked up.
    pub fn with_game_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.game_fs = Some(fs);
        self
    }

    /// Identifies the configured data paths and loads the resource catalogs of `settings`.
    pub fn from_settings<L>(settings: &Settings, loader: L) -> Result<Self>
    where
        L: ArchiveLoader + 'static,
    {
        let data_paths = settings.load_data_paths()?;
        let mapper = settings.load_resource_mapper()?;
        let game_fs = Directory::new(settings.resolve("{GameDir}")?)?;

        Ok(ResourceLocator::new(mapper, data_paths, loader).with_game_fs(Arc::new(game_fs)))
    }

    #[inline]
    pub fn mapper(&self) -> &ResourceMapper {
        &self.mapper
    }

    #[inline]
    pub fn data_paths(&self) -> &DataPaths {
        &self.data_paths
    }

    #[inline]
    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    /// Rebuilds the active data sets out of a resolved priority list. Locates already running
    /// keep using the data sets they started with.
    pub fn set_active_data_paths(&self, priorities: &[PriorityDataSet]) -> Result<()> {
        let active = self.data_paths.activate(priorities)?;
        self.set_active_data_sets(active);
        Ok(())
    }

    /// Replaces the active data sets with an already materialised list.
    pub fn set_active_data_sets(&self, active: Vec<ActiveDataSet>) {
        info!(
            "Active data sets: {:?}.",
            active.iter().map(|v| v.data_set_name.as_str()).collect::<Vec<_>>()
        );

        *self.active.write().unwrap() = Arc::new(active);
    }

    /// A snapshot of the active data sets, in priority order.
    pub fn active_data_paths(&self) -> Arc<Vec<ActiveDataSet>> {
        self.active.read().unwrap().clone()
    }

    fn open_lvl(&self, ds: &ActiveDataSet, lvl: &str) -> Option<ArchiveHandle> {
        if !ds.fs.exists(lvl) {
            debug!("Archive {} does not exist in data set {}.", lvl, ds.data_set_name);
            return None;
        }

        let key = CacheKey::archive(ds.data_set_name.as_str(), lvl);
        let rsp = self.cache.get_or_insert_with(key, || {
            let stream = ds.fs.open(lvl)?;
            self.loader.load(lvl, stream)
        });

        match rsp {
            Ok(archive) => Some(archive),
            Err(err) => {
                warn!(
                    "Could not open archive {} of data set {}: {}",
                    lvl, ds.data_set_name, err
                );
                None
            }
        }
    }

    /// Locates the animation `name` in the first active data set supplying it.
    pub fn locate_animation<T: AsRef<str>>(&self, name: T) -> Option<Animation> {
        let name = name.as_ref();
        let mapping = match self.mapper.find_animation(name) {
            Some(mapping) => mapping,
            None => {
                warn!("Animation {} is not mapped.", name);
                return None;
            }
        };

        let active = self.active_data_paths();
        for ds in active.iter().filter(|v| !v.is_mod) {
            if let Some(rsp) = self.do_locate_animation(ds, name, mapping) {
                return rsp;
            }
        }

        info!("Animation {} is not supplied by any active data set.", name);
        None
    }

    /// Locates the animation `name` in the active data set `data_set` only, bypassing the
    /// priorities.
    pub fn locate_animation_in<T1, T2>(&self, name: T1, data_set: T2) -> Option<Animation>
    where
        T1: AsRef<str>,
        T2: AsRef<str>,
    {
        let name = name.as_ref();
        let data_set = data_set.as_ref();

        let active = self.active_data_paths();
        let ds = active.iter().find(|v| v.data_set_name == data_set)?;
        let mapping = self.mapper.find_animation(name)?;

        self.do_locate_animation(ds, name, mapping)
            .and_then(|rsp| rsp)
    }

    fn do_locate_animation(
        &self,
        ds: &ActiveDataSet,
        name: &str,
        mapping: &AnimMapping,
    ) -> Option<Option<Animation>> {
        for attributes in self.mapper.find_file_location(&ds.data_set_name, &mapping.file) {
            let archive = match self.open_lvl(ds, &attributes.lvl_name) {
                Some(archive) => archive,
                None => continue,
            };

            let file = match archive.file_by_name(&mapping.file) {
                Some(file) => file,
                None => {
                    debug!("{} is not in archive {}.", mapping.file, attributes.lvl_name);
                    continue;
                }
            };

            let key = CacheKey::chunk(
                ds.data_set_name.as_str(),
                attributes.lvl_name.as_str(),
                mapping.file.as_str(),
                mapping.id,
            );

            let chunk = self.cache.get_or_insert_with(key, || {
                file.chunk_by_id(mapping.id).ok_or_else(|| {
                    Error::Archive(format!("{} has no chunk {}", mapping.file, mapping.id))
                })
            });

            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    error!("Animation {} could not be read: {}", name, err);
                    return Some(None);
                }
            };

            info!(
                "{} located in data set {} mapped to {:?} in lvl archive {} in lvl file {} with \
                 lvl file chunk id {}, is psx {}.",
                name,
                ds.data_set_name,
                ds.fs.fs_path(),
                attributes.lvl_name,
                mapping.file,
                mapping.id,
                attributes.is_psx
            );

            return Some(Some(Animation {
                name: name.to_owned(),
                data_set: ds.data_set_name.clone(),
                lvl: attributes.lvl_name.clone(),
                file: mapping.file.clone(),
                id: mapping.id,
                blend_mode: mapping.blend_mode,
                is_psx: attributes.is_psx,
                scale_frame_offsets: attributes.scale_frame_offsets,
                archive,
                chunk,
            }));
        }

        None
    }

    /// Locates the level path `name` in the first active data set supplying it.
    pub fn locate_path<T: AsRef<str>>(&self, name: T) -> Option<LevelPath> {
        let name = name.as_ref();
        let mapping = match self.mapper.find_path(name) {
            Some(mapping) => mapping,
            None => {
                warn!("Path {} is not mapped.", name);
                return None;
            }
        };

        let active = self.active_data_paths();
        for ds in active.iter().filter(|v| !v.is_mod) {
            let location = match mapping.location(&ds.data_set_name) {
                Some(location) => location,
                None => continue,
            };

            let locations = self
                .mapper
                .find_file_location(&ds.data_set_name, &location.file_name);

            for attributes in locations {
                let archive = match self.open_lvl(ds, &attributes.lvl_name) {
                    Some(archive) => archive,
                    None => continue,
                };

                let file = match archive.file_by_name(&location.file_name) {
                    Some(file) => file,
                    None => continue,
                };

                let chunk = match file.chunk_by_id(mapping.id) {
                    Some(chunk) => chunk,
                    None => {
                        error!(
                            "Path {} has no chunk {} in {} of {}.",
                            name, mapping.id, location.file_name, attributes.lvl_name
                        );
                        return None;
                    }
                };

                info!("Path {} located in data set {}.", name, ds.data_set_name);
                return Some(LevelPath {
                    name: name.to_owned(),
                    data_set: ds.data_set_name.clone(),
                    lvl: attributes.lvl_name.clone(),
                    file: location.file_name.clone(),
                    chunk,
                    collision_offset: mapping.collision_offset,
                    object_indextable_offset: mapping.object_indextable_offset,
                    object_offset: mapping.object_offset,
                    number_of_screens_x: mapping.number_of_screens_x,
                    number_of_screens_y: mapping.number_of_screens_y,
                    music_theme: mapping.music_theme.clone(),
                    is_ao: attributes.is_ao,
                });
            }
        }

        info!("Path {} is not supplied by any active data set.", name);
        None
    }

    /// Locates the camera `name`. Mods may supply a full replacement `<name>.png`, or an
    /// upscaling delta `<name>.cam.bmp.png` which is paired with the original camera.
    pub fn locate_camera<T: AsRef<str>>(&self, name: T) -> Option<Camera> {
        let name = name.as_ref();
        info!("Requesting camera {}.", name);

        let rsp = self.do_locate_camera(name, false);
        if rsp.is_none() {
            info!("Camera {} is not supplied by any active data set.", name);
        }

        rsp
    }

    fn do_locate_camera(&self, name: &str, ignore_mods: bool) -> Option<Camera> {
        let replacement = format!("{}.png", name);
        let delta = format!("{}.cam.bmp.png", name);

        let active = self.active_data_paths();
        for ds in active.iter() {
            if ds.is_mod {
                if ignore_mods {
                    continue;
                }

                if ds.fs.exists(&replacement) {
                    match ds.fs.open(&replacement) {
                        Ok(image) => {
                            info!("Loaded new or replacement camera from mod {}.", ds.data_set_name);
                            return Some(Camera::Replacement {
                                data_set: ds.data_set_name.clone(),
                                image,
                            });
                        }
                        Err(err) => warn!("Could not open {}: {}", replacement, err),
                    }
                }

                if ds.fs.exists(&delta) {
                    let original = match self.do_locate_camera(name, true) {
                        Some(original) => original,
                        None => continue,
                    };

                    match ds.fs.open(&delta) {
                        Ok(delta) => {
                            info!("Loaded camera upscaling delta from {}.", ds.data_set_name);
                            return Some(Camera::Delta {
                                data_set: ds.data_set_name.clone(),
                                delta,
                                original: Box::new(original),
                            });
                        }
                        Err(err) => warn!("Could not open {}: {}", delta, err),
                    }
                }

                continue;
            }

            for attributes in self.mapper.find_file_location(&ds.data_set_name, name) {
                let archive = match self.open_lvl(ds, &attributes.lvl_name) {
                    Some(archive) => archive,
                    None => continue,
                };

                let file = match archive.file_by_name(name) {
                    Some(file) => file,
                    None => continue,
                };

                let bits = match file.chunk_by_type(ChunkType::BITS) {
                    Some(bits) => bits,
                    None => {
                        error!("Camera {} of {} has no Bits chunk.", name, ds.data_set_name);
                        return None;
                    }
                };

                let fg1 = file.chunk_by_type(ChunkType::FG1);
                info!(
                    "Loaded original camera from {}, has foreground layer: {}.",
                    ds.data_set_name,
                    fg1.is_some()
                );

                return Some(Camera::Original {
                    data_set: ds.data_set_name.clone(),
                    lvl: attributes.lvl_name.clone(),
                    bits,
                    fg1,
                });
            }
        }

        None
    }

    /// Locates the sound bank `name`. Sound banks are never supplied by mods.
    pub fn locate_sound_bank<T: AsRef<str>>(&self, name: T) -> Option<SoundBank> {
        let name = name.as_ref();
        let mappings = self.mapper.find_sound_bank(name);
        if mappings.is_empty() {
            warn!("Sound bank {} is not mapped.", name);
            return None;
        }

        let active = self.active_data_paths();
        for ds in active.iter().filter(|v| !v.is_mod) {
            for mapping in mappings.iter().filter(|v| v.dataset == ds.data_set_name) {
                let archive = match self.open_lvl(ds, &mapping.lvl) {
                    Some(archive) => archive,
                    None => continue,
                };

                // The VB shares the attributes of its VH.
                let attributes = match self.mapper.find_file_attributes(
                    &ds.data_set_name,
                    &mapping.lvl,
                    &mapping.vab_header,
                ) {
                    Some(attributes) => attributes,
                    None => continue,
                };

                let (header, body) = match (
                    archive.file_by_name(&mapping.vab_header),
                    archive.file_by_name(&mapping.vab_body),
                ) {
                    (Some(header), Some(body)) => (header, body),
                    _ => continue,
                };

                let (header, body) = match (header.chunk_by_index(0), body.chunk_by_index(0)) {
                    (Some(header), Some(body)) => (header, body),
                    _ => {
                        error!("Sound bank {} of {} is empty.", name, ds.data_set_name);
                        return None;
                    }
                };

                let sounds_dat = if ds.fs.exists(SOUNDS_DAT) {
                    match ds.fs.open(SOUNDS_DAT) {
                        Ok(stream) => Some(stream),
                        Err(err) => {
                            warn!("Could not open {} of {}: {}", SOUNDS_DAT, ds.data_set_name, err);
                            None
                        }
                    }
                } else {
                    None
                };

                return Some(SoundBank {
                    name: name.to_owned(),
                    data_set: ds.data_set_name.clone(),
                    lvl: mapping.lvl.clone(),
                    is_psx: attributes.is_psx,
                    header,
                    body,
                    sounds_dat,
                });
            }
        }

        info!("Sound bank {} is not supplied by any active data set.", name);
        None
    }

    /// Locates the video `name` and opens its stream.
    pub fn locate_fmv<T: AsRef<str>>(&self, name: T) -> Option<Fmv> {
        let name = name.as_ref();
        let mapping = match self.mapper.find_fmv(name) {
            Some(mapping) => mapping,
            None => {
                warn!("Fmv {} is not mapped.", name);
                return None;
            }
        };

        let active = self.active_data_paths();
        for ds in active.iter().filter(|v| !v.is_mod) {
            let locations = mapping
                .locations
                .iter()
                .filter(|v| v.dataset == ds.data_set_name);

            for location in locations {
                if !ds.fs.exists(&location.file_name) {
                    continue;
                }

                match ds.fs.open(&location.file_name) {
                    Ok(stream) => {
                        info!("Fmv {} located in data set {}.", name, ds.data_set_name);
                        return Some(Fmv {
                            name: name.to_owned(),
                            data_set: ds.data_set_name.clone(),
                            file_name: location.file_name.clone(),
                            stream,
                            start_sector: location.start_sector,
                            end_sector: location.end_sector,
                            subtitles: self.open_subtitles(name),
                        });
                    }
                    Err(err) => warn!("Could not open {}: {}", location.file_name, err),
                }
            }
        }

        info!("Fmv {} is not supplied by any active data set.", name);
        None
    }

    fn open_subtitles(&self, name: &str) -> Option<Box<dyn Stream>> {
        let fs = self.game_fs.as_ref()?;
        let file = format!("{}/{}.SRT", SUBTITLES_DIR, name);
        if !fs.exists(&file) {
            return None;
        }

        match fs.open(&file) {
            Ok(stream) => Some(stream),
            Err(err) => {
                warn!("Could not open subtitles {}: {}", file, err);
                None
            }
        }
    }

    /// Locates the sound effect `name`, a note of a program in one of the sound banks.
    pub fn locate_sound_effect<T: AsRef<str>>(&self, name: T) -> Option<SoundEffect> {
        let name = name.as_ref();
        let mapping = match self.mapper.find_sound_effect(name) {
            Some(mapping) => mapping,
            None => {
                warn!("Sound effect {} is not mapped.", name);
                return None;
            }
        };

        let active = self.active_data_paths();
        let supplied = active
            .iter()
            .any(|v| !v.is_mod && v.data_set_name == mapping.dataset);

        if supplied {
            if let Some(bank) = self.locate_sound_bank(&mapping.sound_bank) {
                return Some(SoundEffect {
                    name: name.to_owned(),
                    data_set: mapping.dataset.clone(),
                    bank,
                    program: mapping.program,
                    note: mapping.note,
                    min_pitch: mapping.min_pitch,
                    max_pitch: mapping.max_pitch,
                });
            }
        }

        info!("Sound effect {} is not supplied by any active data set.", name);
        None
    }

    /// Locates the music `name`, a sequence chunk played with one of the sound banks.
    pub fn locate_music<T: AsRef<str>>(&self, name: T) -> Option<Music> {
        let name = name.as_ref();
        let mapping = match self.mapper.find_music(name) {
            Some(mapping) => mapping,
            None => {
                warn!("Music {} is not mapped.", name);
                return None;
            }
        };

        let active = self.active_data_paths();
        let candidates = active
            .iter()
            .filter(|v| !v.is_mod && v.data_set_name == mapping.dataset);

        for ds in candidates {
            let archive = match self.open_lvl(ds, &mapping.lvl) {
                Some(archive) => archive,
                None => continue,
            };

            let file = match archive.file_by_name(&mapping.file) {
                Some(file) => file,
                None => continue,
            };

            let bank = match self.locate_sound_bank(&mapping.sound_bank) {
                Some(bank) => bank,
                None => continue,
            };

            let sequence = match file.chunk_by_index(mapping.index) {
                Some(sequence) => sequence,
                None => {
                    error!(
                        "Music {} has no chunk at index {} in {}.",
                        name, mapping.index, mapping.file
                    );
                    return None;
                }
            };

            info!("Music {} located in data set {}.", name, ds.data_set_name);
            return Some(Music {
                name: name.to_owned(),
                data_set: ds.data_set_name.clone(),
                lvl: mapping.lvl.clone(),
                file: mapping.file.clone(),
                sequence,
                bank,
            });
        }

        info!("Music {} is not supplied by any active data set.", name);
        None
    }

    /// Locates the level path `name` on a worker thread.
    pub fn locate_path_async<T: Into<String>>(self: &Arc<Self>, name: T) -> Request<Option<LevelPath>> {
        let locator = self.clone();
        let name = name.into();
        Request::spawn(move || Ok(locator.locate_path(&name)))
    }

    /// Locates the animation `name` on a worker thread.
    pub fn locate_animation_async<T: Into<String>>(
        self: &Arc<Self>,
        name: T,
    ) -> Request<Option<Animation>> {
        let locator = self.clone();
        let name = name.into();
        Request::spawn(move || Ok(locator.locate_animation(&name)))
    }
}
