//! Commonly used utilities.

pub mod hash;

pub use self::hash::{hash64, FastHashMap, FastHashSet};
