use std::sync::Arc;

use crate::errors::*;

use super::{normalize_path, relative_path, FileSystem, Stream};

/// A view of another `FileSystem` limited to one of its sub-directories. Mods unpacked into
/// `Mods/<name>` are read through this.
pub struct DirectoryLimited {
    fs: Arc<dyn FileSystem>,
    base: String,
    fs_path: String,
}

impl DirectoryLimited {
    pub fn new<T: AsRef<str>>(fs: Arc<dyn FileSystem>, directory: T) -> Self {
        let base = relative_path(directory);
        let base = base.trim_end_matches('/').to_owned();
        let fs_path = normalize_path(format!("{}/{}", fs.fs_path(), base));

        DirectoryLimited { fs, base, fs_path }
    }

    fn limit(&self, path: &str) -> String {
        let path = relative_path(path);
        if self.base.is_empty() {
            path
        } else if path.is_empty() {
            self.base.clone()
        } else {
            format!("{}/{}", self.base, path)
        }
    }
}

impl FileSystem for DirectoryLimited {
    #[inline]
    fn open(&self, file: &str) -> Result<Box<dyn Stream>> {
        self.fs.open(&self.limit(file))
    }

    #[inline]
    fn exists(&self, file: &str) -> bool {
        self.fs.exists(&self.limit(file))
    }

    #[inline]
    fn enumerate(&self, directory: &str, filter: &str) -> Result<Vec<String>> {
        self.fs.enumerate(&self.limit(directory), filter)
    }

    #[inline]
    fn fs_path(&self) -> &str {
        &self.fs_path
    }
}
