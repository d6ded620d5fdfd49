use std::path::PathBuf;

use crate::fsutil;

/// Errors reading or writing a target file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to encode targets: {0}")]
    Encode(#[source] serde_yaml::Error),
    #[error(transparent)]
    Write(#[from] fsutil::ReplaceError),
    #[error(transparent)]
    FileOpen(#[from] fsutil::FileOpenError),
    #[error("failed to decode target file `{path}`: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
