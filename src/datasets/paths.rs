use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::errors::*;
use crate::utils::FastHashMap;
use crate::vfs::{self, FileSystem};

use super::{DataSetIdentities, PriorityDataSet};

#[derive(Deserialize)]
#[serde(untagged)]
enum Candidates {
    Bare(Vec<String>),
    Wrapped { paths: Vec<String> },
}

/// One data set of the active, priority-ordered search list.
#[derive(Clone)]
pub struct ActiveDataSet {
    pub data_set_name: String,
    pub is_mod: bool,
    pub fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for ActiveDataSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ActiveDataSet")
            .field("data_set_name", &self.data_set_name)
            .field("is_mod", &self.is_mod)
            .field("fs", &self.fs.fs_path())
            .finish()
    }
}

/// Binds data set identities to the physical paths holding them.
pub struct DataPaths {
    ids: DataSetIdentities,
    paths: FastHashMap<String, String>,
}

impl DataPaths {
    /// Identifies every candidate path. The first path identified as some data set is bound
    /// to it, later ones are ignored.
    pub fn new<I, T>(ids: DataSetIdentities, candidates: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut paths: FastHashMap<String, String> = FastHashMap::default();

        for candidate in candidates {
            let candidate = candidate.as_ref();

            let id = match ids.identify_path(candidate) {
                Some(id) => id,
                None => {
                    warn!("Path {:?} could not be identified.", candidate);
                    continue;
                }
            };

            if let Some(existing) = paths.get(id) {
                info!(
                    "Path {:?} identified as {} but ignoring because we already have {:?}.",
                    candidate, id, existing
                );
                continue;
            }

            info!("Path {:?} identified as {}.", candidate, id);
            paths.insert(id.to_owned(), candidate.to_owned());
        }

        DataPaths { ids, paths }
    }

    /// Parses the candidate list `json` and identifies every path in it.
    pub fn from_json<T: AsRef<str>>(ids: DataSetIdentities, json: T) -> Result<Self> {
        let candidates = DataPaths::parse_candidates("data paths", json.as_ref())?;
        Ok(DataPaths::new(ids, candidates))
    }

    /// Parses a candidate list, either a bare array of paths or the same array wrapped in
    /// `paths`.
    pub fn parse_candidates(file: &str, json: &str) -> Result<Vec<String>> {
        match serde_json::from_str(json).map_err(|err| Error::config(file, err))? {
            Candidates::Bare(paths) => Ok(paths),
            Candidates::Wrapped { paths } => Ok(paths),
        }
    }

    /// Loads the candidate list `file` of `fs`. A missing list means no data set is installed.
    pub fn load_candidates(fs: &dyn FileSystem, file: &str) -> Result<Vec<String>> {
        if !fs.exists(file) {
            warn!("Data paths {:?} does not exist in {:?}.", file, fs.fs_path());
            return Ok(Vec::new());
        }

        let json = fs.read_to_string(file)?;
        DataPaths::parse_candidates(file, &json)
    }

    #[inline]
    pub fn identities(&self) -> &DataSetIdentities {
        &self.ids
    }

    /// Gets the path bound to `identity`.
    #[inline]
    pub fn path_for<T: AsRef<str>>(&self, identity: T) -> Option<&str> {
        self.paths.get(identity.as_ref()).map(|v| v.as_str())
    }

    /// Returns the required identities without a bound path. Meta identities never need one.
    pub fn missing_data_set_paths<I, T>(&self, required: I) -> Vec<String>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut missing = Vec::new();
        for v in required {
            let v = v.as_ref();
            if !self.ids.is_meta(v) && self.path_for(v).is_none() {
                missing.push(v.to_owned());
            }
        }

        missing
    }

    /// Fills in the physical path of every priority entry. Mods are located at the directory
    /// their definition was loaded from.
    pub fn resolve_paths(&self, priorities: &mut [PriorityDataSet]) {
        for v in priorities.iter_mut() {
            v.data_set_path = if v.source.is_mod() {
                Some(v.source.containing_archive().to_owned())
            } else {
                self.path_for(&v.data_set_name).map(|v| v.to_owned())
            };
        }
    }

    /// Materialises the active search list out of `priorities`, preserving their order. Meta
    /// and unbound identities are skipped.
    pub fn activate(&self, priorities: &[PriorityDataSet]) -> Result<Vec<ActiveDataSet>> {
        let mut active = Vec::with_capacity(priorities.len());

        for v in priorities {
            if self.ids.is_meta(&v.data_set_name) {
                debug!("Skips meta data set {}.", v.data_set_name);
                continue;
            }

            let path = match v.data_set_path {
                Some(ref path) => Some(path.as_str()),
                None if v.source.is_mod() => Some(v.source.containing_archive()),
                None => self.path_for(&v.data_set_name),
            };

            let path = match path {
                Some(path) => path,
                None => {
                    warn!("Data set {} has no path, skipping it.", v.data_set_name);
                    continue;
                }
            };

            info!("Activates data set {} at {:?}.", v.data_set_name, path);
            active.push(ActiveDataSet {
                data_set_name: v.data_set_name.clone(),
                is_mod: v.source.is_mod(),
                fs: Arc::from(vfs::open_data_path(path)?),
            });
        }

        Ok(active)
    }
}
