//! Functions for loading the data configuration.
//!
//! Every configured path may refer to a named directory with a `{Name}` token, which is
//! expanded by `NamedPaths`:
//!
//! ```sh
//! {GameDir}/data/DataSetIds.json => /opt/alive/data/DataSetIds.json
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::datasets::{DataPaths, DataSetIdentities, GameDefinition};
use crate::errors::*;
use crate::mapper::ResourceMapper;
use crate::utils::FastHashMap;
use crate::vfs::{normalize_path, Directory, FileSystem};

/// The maximum number of token expansions in one path, a named path referring to itself would
/// never terminate otherwise.
const MAX_EXPANSIONS: usize = 32;

/// Central registry for named paths. Named paths are directory aliases like `{GameDir}` that
/// could be resolved into full path.
#[derive(Debug, Default, Clone)]
pub struct NamedPaths {
    registry: FastHashMap<String, String>,
}

impl NamedPaths {
    /// Creates a new named path registry.
    pub fn new() -> Self {
        NamedPaths {
            registry: FastHashMap::default(),
        }
    }

    /// Add or replace a named path definition.
    pub fn add<T1, T2>(&mut self, name: T1, fullname: T2) -> Result<()>
    where
        T1: Into<String>,
        T2: Into<String>,
    {
        let name = name.into();
        let fullname = fullname.into();

        if !name.starts_with('{') || !name.ends_with('}') {
            return Err(Error::NamedPath(format!(
                "Named path {:?} MUST be enclosed in braces.",
                name
            )));
        }

        if name.len() < 3 || name[1..name.len() - 1].contains(|c: char| c == '{' || c == '}') {
            return Err(Error::NamedPath(format!(
                "Named path {:?} MUST have a name without braces.",
                name
            )));
        }

        let fullname = normalize_path(fullname);
        let fullname = if fullname.len() > 1 {
            fullname.trim_end_matches('/').to_owned()
        } else {
            fullname
        };

        self.registry.insert(name, fullname);
        Ok(())
    }

    /// Checks if a named path exists.
    #[inline]
    pub fn has<T: AsRef<str>>(&self, name: T) -> bool {
        self.registry.contains_key(name.as_ref())
    }

    /// Expands every named path in the provided string recursively.
    pub fn resolve<T: AsRef<str>>(&self, src: T) -> Result<String> {
        let src = src.as_ref();
        let mut dst = src.to_owned();

        for _ in 0..MAX_EXPANSIONS {
            let begin = match dst.find('{') {
                Some(begin) => begin,
                None => return Ok(normalize_path(dst)),
            };

            let end = dst[begin..]
                .find('}')
                .map(|v| begin + v)
                .ok_or_else(|| Error::NamedPath(format!("Unterminated named path in {:?}.", src)))?;

            let fullname = self.registry.get(&dst[begin..=end]).ok_or_else(|| {
                Error::NamedPath(format!(
                    "Undefined named path {} in {:?}.",
                    &dst[begin..=end],
                    src
                ))
            })?;

            dst.replace_range(begin..=end, fullname);
        }

        Err(Error::NamedPath(format!(
            "Named paths of {:?} are nested too deeply.",
            src
        )))
    }
}

/// A structure containing configuration data for locating game data. All paths may contain
/// `{GameDir}` and `{UserDir}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The installation directory of the engine.
    pub game_dir: String,
    /// The directory of user specific configuration.
    pub user_dir: String,
    /// The catalog of data set identities.
    pub data_set_ids: String,
    /// The candidate paths of data sets the user has installed.
    pub data_paths: String,
    /// Resource catalogs, merged in order.
    pub resource_maps: Vec<String>,
    /// The directory of built-in game definitions.
    pub game_definitions: String,
    /// The directory of mods, one sub-directory each.
    pub mods: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            game_dir: ".".to_owned(),
            user_dir: ".".to_owned(),
            data_set_ids: "{GameDir}/data/DataSetIds.json".to_owned(),
            data_paths: "{UserDir}/DataPaths.json".to_owned(),
            resource_maps: vec![
                "{GameDir}/data/resources.json".to_owned(),
                "{GameDir}/data/paths.json".to_owned(),
            ],
            game_definitions: "{GameDir}/data/GameDefinitions".to_owned(),
            mods: "{GameDir}/Mods".to_owned(),
        }
    }
}

impl Settings {
    pub fn from_json<T: AsRef<str>>(json: T) -> Result<Self> {
        serde_json::from_str(json.as_ref()).map_err(|err| Error::config("settings", err))
    }

    /// The named paths of these settings.
    pub fn named_paths(&self) -> Result<NamedPaths> {
        let mut paths = NamedPaths::new();
        paths.add("{GameDir}", self.game_dir.as_str())?;
        paths.add("{UserDir}", self.user_dir.as_str())?;
        Ok(paths)
    }

    /// Expands the named paths of `path`.
    pub fn resolve<T: AsRef<str>>(&self, path: T) -> Result<String> {
        self.named_paths()?.resolve(path)
    }

    /// Identifies every configured candidate path.
    pub fn load_data_paths(&self) -> Result<DataPaths> {
        let named = self.named_paths()?;

        let (dir, file) = open_parent(&named.resolve(&self.data_set_ids)?)?;
        let ids = DataSetIdentities::load(&dir, &file)?;

        let (dir, file) = open_parent(&named.resolve(&self.data_paths)?)?;
        let mut candidates = Vec::new();
        for v in DataPaths::load_candidates(&dir, &file)? {
            candidates.push(named.resolve(v)?);
        }

        Ok(DataPaths::new(ids, candidates))
    }

    /// Loads and merges all the resource catalogs.
    pub fn load_resource_mapper(&self) -> Result<ResourceMapper> {
        let named = self.named_paths()?;

        let mut mapper = ResourceMapper::new();
        for v in &self.resource_maps {
            let (dir, file) = open_parent(&named.resolve(v)?)?;
            mapper.extend_from(&dir, &file)?;
        }

        Ok(mapper)
    }

    /// Loads the built-in game definitions followed by every mod.
    pub fn load_game_definitions(&self) -> Result<Vec<GameDefinition>> {
        let named = self.named_paths()?;

        let fs = Directory::new(named.resolve(&self.game_definitions)?)?;
        let mut definitions = GameDefinition::load_all(&fs, "")?;

        let mods = named.resolve(&self.mods)?;
        if Path::new(&mods).is_dir() {
            let fs: Arc<dyn FileSystem> = Arc::new(Directory::new(mods)?);
            definitions.extend(GameDefinition::load_mods(fs)?);
        } else {
            debug!("Mods directory {:?} does not exist.", mods);
        }

        Ok(definitions)
    }
}

fn open_parent(path: &str) -> Result<(Directory, String)> {
    let path = Path::new(path);

    let file = path
        .file_name()
        .map(|v| v.to_string_lossy().into_owned())
        .ok_or_else(|| Error::FileNotFound(path.to_string_lossy().into_owned()))?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    Ok((Directory::new(parent)?, file))
}
