//! # ALIVE data
//!
//! Resolves a logical resource name (an animation, a level path, a camera, a sound bank or a
//! video) into physical bytes, when those bytes may live in any of several overlapping,
//! priority-ordered _data sets_: original installation media images, unpacked directories or mod
//! overlays.
//!
//! # Data sets
//!
//! A data set is one named collection of game assets. Before a data set could be used it must be
//! identified: every candidate path the user has configured is opened through the virtual
//! filesystem and matched against a catalog of fingerprints (`datasets::DataSetIdentities`). A
//! matched path is bound to the identity in the `datasets::DataPaths` table, first match wins.
//!
//! # Definitions
//!
//! A game or a mod is described by a `datasets::GameDefinition`, which names its own data set and
//! the data sets it requires. Expanding the dependency graph of the selected definition gives an
//! ordered, de-duplicated search path, the mod itself always comes first:
//!
//! ```sh
//! mod -> [AePsx, AePc], AePsx -> [AePsxCd1, AePsxCd2]
//! => mod, AePsx, AePsxCd1, AePsxCd2, AePc
//! ```
//!
//! # Resource map
//!
//! The `mapper::ResourceMapper` is parsed from declarative catalogs. It translates a logical name
//! into archive/file/chunk coordinates, and answers which archives of which data set contain a
//! given physical file.
//!
//! # Locator
//!
//! The `locator::ResourceLocator` walks the active data sets in priority order, opens (or reuses)
//! archives through the virtual filesystem and hands back the located chunk. Opened archives and
//! decoded chunks are shared through the `cache::ResourceCache`, which forgets an entry as soon as
//! the last `Resource` handle to it is dropped.
//!
//! The archive container itself is decoded by an external collaborator plugged in through the
//! `archive::ArchiveLoader` trait.

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

pub mod errors;
pub mod utils;

pub mod archive;
pub mod cache;
pub mod datasets;
pub mod locator;
pub mod mapper;
pub mod request;
pub mod settings;
pub mod vfs;

pub mod prelude {
    pub use crate::archive::{Archive, ArchiveFile, ArchiveLoader, Chunk, ChunkType};
    pub use crate::cache::{CacheKey, Resource, ResourceCache};
    pub use crate::datasets::{
        ActiveDataSet, DataPaths, DataSetIdentities, Dependencies, GameDefinition,
        PriorityDataSet,
    };
    pub use crate::errors::{Error, Result};
    pub use crate::locator::prelude::*;
    pub use crate::mapper::ResourceMapper;
    pub use crate::request::Request;
    pub use crate::settings::{NamedPaths, Settings};
    pub use crate::vfs::{DirectoryLimited, Directory, DiscImage, FileSystem, Stream};
}
