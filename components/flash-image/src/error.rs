use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to create flash image {path:?}")]
    CreateImage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to open flash image {path:?}")]
    OpenImage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("flash image {path:?} has an unsupported size of {len} bytes")]
    ImageSize { path: PathBuf, len: u64 },

    #[error("unable to read {length} bytes at offset {address:#x}")]
    NotReadable { address: usize, length: usize },

    #[error("unable to write {length} bytes at offset {address:#x}")]
    NotWritable { address: usize, length: usize },

    #[error("filesystem error: {0:?}")]
    Filesystem(littlefs2::io::Error),

    #[error("unable to open {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to read {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to read {path:?}: expected {expected} bytes, got {actual}")]
    ShortRead {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("{path:?} cannot be stored in the image")]
    InvalidPath { path: PathBuf },
}

impl From<littlefs2::io::Error> for Error {
    fn from(error: littlefs2::io::Error) -> Self {
        Self::Filesystem(error)
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
