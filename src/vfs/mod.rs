//! The virtual filesystem that data sets are read through.
//!
//! Every data set is backed by one `FileSystem`. The trait has a pretty simple interface, since
//! data sets are strictly read-only: files could be opened as independent streams, tested for
//! existence and enumerated. Three backends are provided:
//!
//! 1. `Directory`, an unpacked data set in a host directory.
//! 2. `DiscImage`, an ISO9660 image of the original installation media.
//! 3. `DirectoryLimited`, a sub-directory scoped view of another backend.

pub mod dir;
pub use self::dir::Directory;

pub mod disc;
pub use self::disc::DiscImage;

pub mod limited;
pub use self::limited::DirectoryLimited;

use std::io::{Read, Seek};
use std::path::Path;

use glob::{MatchOptions, Pattern};

use crate::errors::*;

/// A readable and seekable byte stream returned by `FileSystem::open`.
pub trait Stream: Read + Seek + Send {}

impl<T: Read + Seek + Send> Stream for T {}

pub trait FileSystem: Send + Sync {
    /// Opens a readable stream of `file`. Every call returns an independent stream.
    fn open(&self, file: &str) -> Result<Box<dyn Stream>>;

    /// Checks if the file exists.
    fn exists(&self, file: &str) -> bool;

    /// Returns the sorted names of entries in `directory` matching the wildcard `filter`.
    fn enumerate(&self, directory: &str, filter: &str) -> Result<Vec<String>>;

    /// The root path of this backend, used in diagnostics.
    fn fs_path(&self) -> &str;

    /// Reads all bytes until EOF of `file`, and placing them into `buf`.
    fn read_to_end(&self, file: &str, buf: &mut Vec<u8>) -> Result<usize> {
        let mut stream = self.open(file)?;
        Ok(stream.read_to_end(buf)?)
    }

    /// Reads `file` into a `String`.
    fn read_to_string(&self, file: &str) -> Result<String> {
        let mut stream = self.open(file)?;
        let mut buf = String::new();
        stream.read_to_string(&mut buf)?;
        Ok(buf)
    }
}

/// Creates the best-fitting backend for a data path: a `Directory` for host directories and a
/// `DiscImage` for anything else.
pub fn open_data_path<T: AsRef<str>>(path: T) -> Result<Box<dyn FileSystem>> {
    let path = path.as_ref();
    if Path::new(path).is_dir() {
        Ok(Box::new(Directory::new(path)?))
    } else {
        Ok(Box::new(DiscImage::new(path)?))
    }
}

/// Normalizes separators of `path`, backslashes are turned into slashes and repeated slashes are
/// collapsed.
pub fn normalize_path<T: AsRef<str>>(path: T) -> String {
    let path = path.as_ref();
    let mut dst = String::with_capacity(path.len());

    for c in path.chars() {
        let c = if c == '\\' { '/' } else { c };
        if c == '/' && dst.ends_with('/') {
            continue;
        }

        dst.push(c);
    }

    dst
}

/// Normalizes `path` and trims any leading `./` or `/`, producing a path relative to the root
/// of a backend.
pub fn relative_path<T: AsRef<str>>(path: T) -> String {
    let mut path = normalize_path(path);
    loop {
        if path.starts_with("./") {
            path.replace_range(0..2, "");
        } else if path.starts_with('/') {
            path.replace_range(0..1, "");
        } else {
            break;
        }
    }

    path
}

/// Case-insensitive wildcard matching, `*` matches any sequence and `?` matches any single
/// character.
pub fn wildcard_match<T1, T2>(name: T1, filter: T2) -> bool
where
    T1: AsRef<str>,
    T2: AsRef<str>,
{
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    match Pattern::new(filter.as_ref()) {
        Ok(pattern) => pattern.matches_with(name.as_ref(), options),
        Err(err) => {
            warn!("Invalid wildcard filter {:?}: {}.", filter.as_ref(), err);
            false
        }
    }
}
