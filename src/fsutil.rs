use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

/// Error that occurs when opening a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to open file `{path}`: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Error that occurs when atomically replacing a file fails.
#[derive(Debug, thiserror::Error)]
pub enum ReplaceError {
    #[error("failed to write temporary file `{path}`: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to rename `{from}` to `{to}`: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Opens a rule or target file for buffered reading.
///
/// # Errors
///
/// Returns a [`FileOpenError`] carrying `path` if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use gcesd::fsutil;
/// let rules = fsutil::open_file_reader("/etc/gcesd/rules.yaml")?;
/// # Ok::<(), fsutil::FileOpenError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileOpenError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileOpenError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Replaces the file at `path` with `contents`.
///
/// The bytes go to a hidden sibling file first, which is synced and then
/// renamed over `path`, so readers see either the old or the new contents.
/// On failure the temporary file is removed and `path` is left untouched.
///
/// # Errors
///
/// Returns [`ReplaceError::Write`] if the temporary file cannot be written and
/// [`ReplaceError::Rename`] if it cannot be moved into place.
pub fn replace_file(path: impl AsRef<Path>, contents: &[u8]) -> Result<(), ReplaceError> {
    let path = path.as_ref();
    let tmp = temp_sibling(path);

    let written = File::create(&tmp).and_then(|mut f| {
        f.write_all(contents)?;
        f.sync_all()
    });
    if let Err(source) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(ReplaceError::Write { path: tmp, source });
    }

    std::fs::rename(&tmp, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp);
        ReplaceError::Rename {
            from: tmp.clone(),
            to: path.to_path_buf(),
            source,
        }
    })
}

/// `dir/name` -> `dir/.name.tmp`
fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_else(|| "output".as_ref()));
    name.push(".tmp");
    path.with_file_name(name)
}
