use serde::Deserialize;
use serde_json::{Map, Value};

use crate::errors::*;
use crate::utils::FastHashSet;
use crate::vfs::{self, FileSystem};

/// The file-existence predicates identifying one data set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fingerprint {
    #[serde(default)]
    pub contains_any: Vec<String>,
    #[serde(default)]
    pub contains_all: Vec<String>,
    #[serde(default)]
    pub not_contains: Vec<String>,
}

impl Fingerprint {
    /// A fingerprint without predicates only groups other identities.
    pub fn is_meta(&self) -> bool {
        self.contains_any.is_empty() && self.contains_all.is_empty() && self.not_contains.is_empty()
    }

    pub fn matches(&self, fs: &dyn FileSystem) -> bool {
        if !self.contains_all.iter().all(|v| fs.exists(v)) {
            return false;
        }

        if self.not_contains.iter().any(|v| fs.exists(v)) {
            return false;
        }

        let found_any = self.contains_any.iter().any(|v| fs.exists(v));
        (self.contains_any.is_empty() || found_any) && (!self.contains_all.is_empty() || found_any)
    }
}

/// The catalog of known data set identities, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct DataSetIdentities {
    identities: Vec<(String, Fingerprint)>,
    meta: FastHashSet<String>,
}

impl DataSetIdentities {
    /// Parses a catalog, either the bare `{ "<id>": {..} }` object or the same object wrapped
    /// in `data_set_ids`.
    pub fn from_json<T: AsRef<str>>(json: T) -> Result<Self> {
        DataSetIdentities::parse("data set identities", json.as_ref())
    }

    /// Loads the catalog `file` of `fs`. A missing catalog leaves every path unidentified.
    pub fn load(fs: &dyn FileSystem, file: &str) -> Result<Self> {
        if !fs.exists(file) {
            warn!(
                "Data set identities {:?} does not exist in {:?}.",
                file,
                fs.fs_path()
            );
            return Ok(DataSetIdentities::default());
        }

        let json = fs.read_to_string(file)?;
        DataSetIdentities::parse(file, &json)
    }

    fn parse(file: &str, json: &str) -> Result<Self> {
        let mut root: Map<String, Value> =
            serde_json::from_str(json).map_err(|err| Error::config(file, err))?;

        let catalog = match root.remove("data_set_ids") {
            Some(Value::Object(ids)) => ids,
            Some(_) => return Err(Error::config(file, "data_set_ids is not an object")),
            None => root,
        };

        let mut identities = DataSetIdentities::default();
        for (name, v) in catalog {
            let fingerprint: Fingerprint = serde_json::from_value(v)
                .map_err(|err| Error::config(file, format!("{}: {}", name, err)))?;

            if fingerprint.is_meta() {
                identities.meta.insert(name);
            } else {
                identities.identities.push((name, fingerprint));
            }
        }

        Ok(identities)
    }

    #[inline]
    pub fn is_meta<T: AsRef<str>>(&self, identity: T) -> bool {
        self.meta.contains(identity.as_ref())
    }

    /// Returns the first identity whose fingerprint matches `fs`.
    pub fn identify(&self, fs: &dyn FileSystem) -> Option<&str> {
        self.identities
            .iter()
            .find(|(_, fingerprint)| fingerprint.matches(fs))
            .map(|(name, _)| name.as_str())
    }

    /// Opens `path` with the best-fitting backend and identifies it. A path that could not be
    /// opened is unidentified.
    pub fn identify_path<T: AsRef<str>>(&self, path: T) -> Option<&str> {
        let path = path.as_ref();
        match vfs::open_data_path(path) {
            Ok(fs) => self.identify(&*fs),
            Err(err) => {
                warn!("Could not open data path {:?}: {}", path, err);
                None
            }
        }
    }

    /// The number of identities, including meta ones.
    pub fn len(&self) -> usize {
        self.identities.len() + self.meta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
