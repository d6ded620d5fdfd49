use std::path::PathBuf;

use crate::fsutil;

/// Reasons a single rule entry is rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("no job specified")]
    MissingJob,
    #[error("no tags specified")]
    MissingTags,
    #[error("no project specified")]
    MissingProject,
    #[error("no ports specified")]
    MissingPorts,
    #[error("invalid port {0}")]
    InvalidPort(u16),
}

/// Startup-only configuration errors. Any of these keeps the daemon from starting.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    FileOpen(#[from] fsutil::FileOpenError),
    #[error("failed to parse config file `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to validate config entry #{index}: {source}")]
    InvalidRule {
        index: usize,
        #[source]
        source: RuleError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
