//! Sharing of opened archives and decoded chunks.
//!
//! The `ResourceCache` never owns what it hands out, it only remembers a weak handle per key. A
//! value stays shared as long as any `Resource` referencing it is alive; once the last `Resource`
//! is dropped the slot is purged, and the next request performs a full re-load.

use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Mutex, Weak};

use crate::errors::*;
use crate::utils::FastHashMap;

/// The composite key of a cached value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub data_set: String,
    pub archive: String,
    pub file: Option<String>,
    pub chunk: Option<u32>,
}

impl CacheKey {
    /// The key of an opened archive.
    pub fn archive<T1, T2>(data_set: T1, archive: T2) -> Self
    where
        T1: Into<String>,
        T2: Into<String>,
    {
        CacheKey {
            data_set: data_set.into(),
            archive: archive.into(),
            file: None,
            chunk: None,
        }
    }

    /// The key of one chunk of a sub-file inside an archive.
    pub fn chunk<T1, T2, T3>(data_set: T1, archive: T2, file: T3, chunk: u32) -> Self
    where
        T1: Into<String>,
        T2: Into<String>,
        T3: Into<String>,
    {
        CacheKey {
            data_set: data_set.into(),
            archive: archive.into(),
            file: Some(file.into()),
            chunk: Some(chunk),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.data_set, self.archive)?;

        if let Some(ref file) = self.file {
            write!(f, "/{}", file)?;
        }

        if let Some(chunk) = self.chunk {
            write!(f, "#{}", chunk)?;
        }

        Ok(())
    }
}

type Slot = Weak<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct ResourceCache {
    entries: Mutex<FastHashMap<CacheKey, Slot>>,
}

impl ResourceCache {
    pub fn new() -> Self {
        ResourceCache::default()
    }

    /// Registers `value` under `key`, replacing whatever was remembered before.
    pub fn add<T>(self: &Arc<Self>, key: CacheKey, value: T) -> Resource<T>
    where
        T: Any + Send + Sync,
    {
        let value = Arc::new(value);

        {
            let erased: Arc<dyn Any + Send + Sync> = value.clone();
            let mut entries = self.entries.lock().unwrap();
            entries.insert(key.clone(), Arc::downgrade(&erased));
        }

        Resource::new(self, key, value)
    }

    /// Forgets `key` if nothing references its value anymore. A live value is kept.
    pub fn remove(&self, key: &CacheKey) {
        let mut entries = self.entries.lock().unwrap();

        let dead = entries
            .get(key)
            .map(|slot| slot.upgrade().is_none())
            .unwrap_or(false);

        if dead {
            trace!("Purges cached resource {}.", key);
            entries.remove(key);
        }
    }

    /// Returns the live value of `key`. A dead slot is purged.
    pub fn find<T>(self: &Arc<Self>, key: &CacheKey) -> Option<Resource<T>>
    where
        T: Any + Send + Sync,
    {
        let value = {
            let mut entries = self.entries.lock().unwrap();

            match entries.get(key).map(Weak::upgrade) {
                Some(Some(value)) => value,
                Some(None) => {
                    trace!("Purges cached resource {}.", key);
                    entries.remove(key);
                    return None;
                }
                None => return None,
            }
        };

        match value.downcast::<T>() {
            Ok(value) => Some(Resource::new(self, key.clone(), value)),
            Err(_) => {
                warn!("Cached resource {} has a different type.", key);
                None
            }
        }
    }

    /// Returns the live value of `key`, or constructs it with `func`.
    ///
    /// The construction runs without holding the cache lock. If another thread finished the same
    /// key in the meantime, its value is shared and ours is discarded.
    pub fn get_or_insert_with<T, F>(self: &Arc<Self>, key: CacheKey, func: F) -> Result<Resource<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<T>,
    {
        if let Some(value) = self.find(&key) {
            return Ok(value);
        }

        let value = Arc::new(func()?);

        let existing = {
            let mut entries = self.entries.lock().unwrap();

            let existing = entries
                .get(&key)
                .and_then(Weak::upgrade)
                .and_then(|v| v.downcast::<T>().ok());

            if existing.is_none() {
                let erased: Arc<dyn Any + Send + Sync> = value.clone();
                entries.insert(key.clone(), Arc::downgrade(&erased));
            }

            existing
        };

        Ok(Resource::new(self, key, existing.unwrap_or(value)))
    }

    /// The number of remembered slots, including dead ones not purged yet.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A shared handle to a cached value.
pub struct Resource<T: Any + Send + Sync> {
    value: Option<Arc<T>>,
    key: CacheKey,
    cache: Weak<ResourceCache>,
}

impl<T: Any + Send + Sync> Resource<T> {
    fn new(cache: &Arc<ResourceCache>, key: CacheKey, value: Arc<T>) -> Self {
        Resource {
            value: Some(value),
            key,
            cache: Arc::downgrade(cache),
        }
    }

    #[inline]
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Checks if both handles share the same underlying value.
    pub fn ptr_eq(lhs: &Self, rhs: &Self) -> bool {
        match (&lhs.value, &rhs.value) {
            (Some(l), Some(r)) => Arc::ptr_eq(l, r),
            _ => false,
        }
    }
}

impl<T: Any + Send + Sync> Deref for Resource<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.value {
            Some(ref value) => &**value,
            None => unreachable!(),
        }
    }
}

impl<T: Any + Send + Sync> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Resource {
            value: self.value.clone(),
            key: self.key.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<T: Any + Send + Sync + fmt::Debug> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Resource")
            .field("key", &self.key)
            .field("value", &self.value)
            .finish()
    }
}

impl<T: Any + Send + Sync> Drop for Resource<T> {
    fn drop(&mut self) {
        // The value must be released before the slot is checked.
        drop(self.value.take());

        if let Some(cache) = self.cache.upgrade() {
            cache.remove(&self.key);
        }
    }
}
