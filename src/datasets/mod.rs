//! Identification and prioritisation of data sets.
//!
//! The pipeline runs in three steps:
//!
//! 1. `DataSetIdentities` fingerprints a backend and names the data set it holds.
//! 2. `DataPaths` probes every configured candidate path and binds identities to paths.
//! 3. `GameDefinition::get_dependencies` expands the selected game or mod into an ordered list
//!    of `PriorityDataSet`, which `DataPaths::activate` turns into live `ActiveDataSet` backends.

pub mod definition;
pub use self::definition::{BuiltInAndMods, Dependencies, GameDefinition, PriorityDataSet};

pub mod identity;
pub use self::identity::{DataSetIdentities, Fingerprint};

pub mod paths;
pub use self::paths::{ActiveDataSet, DataPaths};
