use std::fs;
use std::path::PathBuf;

use crate::errors::*;

use super::{relative_path, wildcard_match, FileSystem, Stream};

/// A data set unpacked into a host directory.
pub struct Directory {
    root: PathBuf,
    fs_path: String,
}

impl Directory {
    pub fn new<T: Into<PathBuf>>(root: T) -> Result<Self> {
        let root = root.into();
        info!("Creates directory based virtual file system at {:?}.", root);

        let metadata = fs::metadata(&root)?;
        if metadata.is_dir() {
            let fs_path = root.to_string_lossy().into_owned();
            Ok(Directory { root, fs_path })
        } else {
            Err(Error::FileNotFound(format!(
                "{} is not a decent directory",
                root.display()
            )))
        }
    }

    fn expand(&self, file: &str) -> PathBuf {
        self.root.join(relative_path(file))
    }
}

impl FileSystem for Directory {
    fn open(&self, file: &str) -> Result<Box<dyn Stream>> {
        let location = self.expand(file);
        let file = fs::File::open(&location)
            .map_err(|_| Error::FileNotFound(location.to_string_lossy().into_owned()))?;
        Ok(Box::new(file))
    }

    fn exists(&self, file: &str) -> bool {
        self.expand(file).is_file()
    }

    fn enumerate(&self, directory: &str, filter: &str) -> Result<Vec<String>> {
        let location = self.expand(directory);

        let mut names = Vec::new();
        for entry in fs::read_dir(&location)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if wildcard_match(&name, filter) {
                names.push(name);
            }
        }

        names.sort();
        debug!("{} items enumerated from {:?}.", names.len(), location);
        Ok(names)
    }

    #[inline]
    fn fs_path(&self) -> &str {
        &self.fs_path
    }
}
