use std::path::Path;

use crate::fsutil;

use super::{Error, Result, TargetSet};

/// Serializes `targets` in canonical order.
pub fn encode(targets: &TargetSet) -> Result<String> {
    serde_yaml::to_string(&targets.canonical()).map_err(Error::Encode)
}

/// Parses a target file's contents. `origin` is only used in errors.
pub fn decode(contents: &str, origin: &Path) -> Result<TargetSet> {
    serde_yaml::from_str(contents).map_err(|source| Error::Decode {
        path: origin.to_path_buf(),
        source,
    })
}

/// Atomically replaces `path` with `targets`. On error the previous file is
/// left as it was.
pub fn write(path: impl AsRef<Path>, targets: &TargetSet) -> Result<()> {
    let encoded = encode(targets)?;
    fsutil::replace_file(path, encoded.as_bytes())?;
    Ok(())
}

/// Reads a target file previously produced by [`write`].
pub fn load(path: impl AsRef<Path>) -> Result<TargetSet> {
    let path = path.as_ref();
    let reader = fsutil::open_file_reader(path)?;
    serde_yaml::from_reader(reader).map_err(|source| Error::Decode {
        path: path.to_path_buf(),
        source,
    })
}
