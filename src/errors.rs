//! Errors surfaced while loading configuration and opening backends.
//!
//! A resource which simply does not exist in the current configuration is NOT an error, every
//! `locate_*` operation reports it as `None` instead.

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "{}", _0)]
    IO(#[cause] ::std::io::Error),
    #[fail(display = "{}", _0)]
    Json(#[cause] ::serde_json::Error),
    #[fail(display = "Malformed configuration {}: {}.", file, reason)]
    Config { file: String, reason: String },
    #[fail(display = "File not found: {:?}.", _0)]
    FileNotFound(String),
    #[fail(display = "Malformed disc image: {}.", _0)]
    DiscImage(String),
    #[fail(display = "Archive failure: {}.", _0)]
    Archive(String),
    #[fail(display = "{}", _0)]
    NamedPath(String),
    #[fail(display = "Request aborted: {}.", _0)]
    Request(String),
}

pub type Result<T> = ::std::result::Result<T, Error>;

impl Error {
    /// Creates a `Config` error for the configuration `file`.
    pub fn config<T1, T2>(file: T1, reason: T2) -> Self
    where
        T1: Into<String>,
        T2: ToString,
    {
        Error::Config {
            file: file.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<::std::io::Error> for Error {
    fn from(err: ::std::io::Error) -> Self {
        Error::IO(err)
    }
}

impl From<::serde_json::Error> for Error {
    fn from(err: ::serde_json::Error) -> Self {
        Error::Json(err)
    }
}
