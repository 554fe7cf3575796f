use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;

use crate::errors::*;
use crate::utils::{FastHashMap, FastHashSet};
use crate::vfs::{DirectoryLimited, FileSystem};

/// The name of the definition file every mod directory carries.
pub const MOD_DEFINITION_FILE: &str = "GameDefinition.json";

/// The description of a game or a mod.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameDefinition {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "Author")]
    author: String,
    #[serde(rename = "InitialLevel")]
    initial_level: String,
    #[serde(rename = "DatasetName")]
    data_set_name: String,
    #[serde(rename = "Hidden", default)]
    hidden: bool,
    #[serde(rename = "RequiredDatasets", default)]
    required_data_sets: Vec<String>,
    #[serde(skip)]
    is_mod: bool,
    #[serde(skip)]
    containing_archive: String,
}

/// One entry of a resolved priority list.
#[derive(Debug, Clone)]
pub struct PriorityDataSet<'a> {
    pub data_set_name: String,
    /// The physical path, filled in by `DataPaths::resolve_paths`.
    pub data_set_path: Option<String>,
    pub source: &'a GameDefinition,
}

impl<'a> PriorityDataSet<'a> {
    pub fn new<T: Into<String>>(data_set_name: T, source: &'a GameDefinition) -> Self {
        PriorityDataSet {
            data_set_name: data_set_name.into(),
            data_set_path: None,
            source,
        }
    }

    #[inline]
    pub fn is_mod(&self) -> bool {
        self.source.is_mod()
    }
}

/// The expanded dependency graph of a definition.
#[derive(Debug, Clone)]
pub struct Dependencies<'a> {
    /// Data sets in search priority, the root definition first.
    pub data_sets: Vec<PriorityDataSet<'a>>,
    /// Required identities no definition provides.
    pub missing: BTreeSet<String>,
}

impl<'a> Dependencies<'a> {
    pub fn names(&self) -> Vec<&str> {
        self.data_sets
            .iter()
            .map(|v| v.data_set_name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuiltInAndMods<'b, 'a: 'b> {
    pub built_in: Vec<&'b PriorityDataSet<'a>>,
    pub mods: Vec<&'b PriorityDataSet<'a>>,
}

impl GameDefinition {
    pub fn new<T1, T2>(name: T1, data_set_name: T2, required: Vec<String>, is_mod: bool) -> Self
    where
        T1: Into<String>,
        T2: Into<String>,
    {
        GameDefinition {
            name: name.into(),
            description: String::new(),
            author: String::new(),
            initial_level: String::new(),
            data_set_name: data_set_name.into(),
            hidden: false,
            required_data_sets: required,
            is_mod,
            containing_archive: String::new(),
        }
    }

    pub fn from_json<T: AsRef<str>>(json: T, is_mod: bool) -> Result<Self> {
        GameDefinition::parse("game definition", json.as_ref(), is_mod)
    }

    /// Loads the definition `file` of `fs`, the definition is contained by `fs` itself.
    pub fn load(fs: &dyn FileSystem, file: &str, is_mod: bool) -> Result<Self> {
        let json = fs.read_to_string(file)?;

        let mut definition = GameDefinition::parse(file, &json, is_mod)?;
        definition.containing_archive = fs.fs_path().to_owned();
        Ok(definition)
    }

    fn parse(file: &str, json: &str, is_mod: bool) -> Result<Self> {
        let mut definition: GameDefinition =
            serde_json::from_str(json).map_err(|err| Error::config(file, err))?;

        definition.is_mod = is_mod;
        Ok(definition)
    }

    /// Loads every `*.json` definition of the built-in games in `directory`.
    pub fn load_all(fs: &dyn FileSystem, directory: &str) -> Result<Vec<GameDefinition>> {
        let mut definitions = Vec::new();

        for name in fs.enumerate(directory, "*.json")? {
            let file = format!("{}/{}", directory.trim_end_matches('/'), name);
            definitions.push(GameDefinition::load(fs, &file, false)?);
        }

        info!(
            "Loaded {} game definitions from {:?}.",
            definitions.len(),
            directory
        );

        Ok(definitions)
    }

    /// Loads the definition of every mod directory in `mods`. A directory without a definition
    /// is not a mod.
    pub fn load_mods(mods: Arc<dyn FileSystem>) -> Result<Vec<GameDefinition>> {
        let mut definitions = Vec::new();

        for name in mods.enumerate("", "*")? {
            let fs = DirectoryLimited::new(mods.clone(), &name);
            if !fs.exists(MOD_DEFINITION_FILE) {
                continue;
            }

            match GameDefinition::load(&fs, MOD_DEFINITION_FILE, true) {
                Ok(definition) => {
                    info!("Found mod {:?} at {:?}.", definition.name, fs.fs_path());
                    definitions.push(definition);
                }
                Err(err) => warn!("Skips malformed mod at {:?}: {}", fs.fs_path(), err),
            }
        }

        Ok(definitions)
    }

    /// Expands the dependency graph of `root` with a depth-first, pre-order walk.
    ///
    /// Every identity appears at most once, at its first occurrence, which also terminates
    /// cycles. Required identities that no definition in `all` provides are collected into
    /// `Dependencies::missing` rather than failing.
    pub fn get_dependencies<'a, I>(root: &'a GameDefinition, all: I) -> Dependencies<'a>
    where
        I: IntoIterator<Item = &'a GameDefinition>,
    {
        let mut owners: FastHashMap<&'a str, &'a GameDefinition> = FastHashMap::default();
        for v in all {
            owners.entry(v.data_set_name()).or_insert(v);
        }

        let mut data_sets = Vec::new();
        let mut missing = BTreeSet::new();
        let mut visited = FastHashSet::default();
        let mut stack = vec![(root.data_set_name(), Some(root))];

        while let Some((name, owner)) = stack.pop() {
            if visited.contains(name) {
                continue;
            }

            let owner = match owner {
                Some(owner) => owner,
                None => {
                    missing.insert(name.to_owned());
                    continue;
                }
            };

            visited.insert(name);
            data_sets.push(PriorityDataSet::new(name, owner));

            for required in owner.required_data_sets.iter().rev() {
                if !visited.contains(required.as_str()) {
                    let required = required.as_str();
                    stack.push((required, owners.get(required).cloned()));
                }
            }
        }

        Dependencies { data_sets, missing }
    }

    /// Partitions a priority list by whether the owning definition is a mod, preserving the
    /// relative order in both halves.
    pub fn split_in_to_built_in_and_mods<'b, 'a: 'b>(
        data_sets: &'b [PriorityDataSet<'a>],
    ) -> BuiltInAndMods<'b, 'a> {
        let mut sorted = BuiltInAndMods::default();
        for v in data_sets {
            if v.is_mod() {
                sorted.mods.push(v);
            } else {
                sorted.built_in.push(v);
            }
        }

        sorted
    }

    /// Filters out hidden definitions.
    pub fn visible_game_definitions(definitions: &[GameDefinition]) -> Vec<&GameDefinition> {
        definitions.iter().filter(|v| !v.hidden).collect()
    }

    /// Finds the definition owning the data set `name`.
    pub fn find<'a, T: AsRef<str>>(
        definitions: &'a [GameDefinition],
        name: T,
    ) -> Option<&'a GameDefinition> {
        let name = name.as_ref();
        definitions.iter().find(|v| v.data_set_name == name)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn author(&self) -> &str {
        &self.author
    }

    #[inline]
    pub fn initial_level(&self) -> &str {
        &self.initial_level
    }

    #[inline]
    pub fn data_set_name(&self) -> &str {
        &self.data_set_name
    }

    #[inline]
    pub fn required_data_sets(&self) -> &[String] {
        &self.required_data_sets
    }

    #[inline]
    pub fn hidden(&self) -> bool {
        self.hidden
    }

    #[inline]
    pub fn is_mod(&self) -> bool {
        self.is_mod
    }

    /// The path of the backend this definition was loaded from.
    #[inline]
    pub fn containing_archive(&self) -> &str {
        &self.containing_archive
    }
}
