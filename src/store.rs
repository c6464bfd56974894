//! On-disk persistence for recorded invocations and build state.
//!
//! Values are stored as JSON indented by a single space. Writes land in a
//! temporary sibling file that is renamed over the destination, so a reader
//! never observes a half-written record and re-saving a key replaces it.
//!
//! Absence is not an error: [`load_or_default`] yields `T::default()` for a
//! missing file. A file that exists but does not decode is reported as
//! [`StoreError::Decode`].

use camino::{Utf8Path, Utf8PathBuf};
use miette::Diagnostic;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::io::{self, Write};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::trace;

/// Errors raised while persisting or reading stored state.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    /// The value could not be serialised.
    #[error("failed to encode {path}")]
    #[diagnostic(code(makehelper::store::encode))]
    Encode {
        /// Destination path.
        path: Utf8PathBuf,
        /// Underlying serialiser error.
        #[source]
        source: serde_json::Error,
    },
    /// The destination could not be created or replaced.
    #[error("failed to write {path}")]
    #[diagnostic(code(makehelper::store::write))]
    Write {
        /// Destination path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// An existing file could not be read.
    #[error("failed to read {path}")]
    #[diagnostic(code(makehelper::store::read))]
    Read {
        /// Source path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// An existing file holds content that does not decode.
    #[error("corrupt state file {path}")]
    #[diagnostic(
        code(makehelper::store::decode),
        help("delete the file and rerun the build")
    )]
    Decode {
        /// Source path.
        path: Utf8PathBuf,
        /// Underlying deserialiser error.
        #[source]
        source: serde_json::Error,
    },
}

fn encode<T: Serialize + ?Sized>(path: &Utf8Path, value: &T) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b" ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|source| StoreError::Encode {
            path: path.to_owned(),
            source,
        })?;
    Ok(buf)
}

/// Serialise `value` and write it to `path`, replacing any previous file.
///
/// # Errors
///
/// Returns [`StoreError::Encode`] if serialisation fails and
/// [`StoreError::Write`] if the file cannot be created or renamed into place.
pub fn save<T: Serialize + ?Sized>(path: &Utf8Path, value: &T) -> Result<(), StoreError> {
    let buf = encode(path, value)?;
    let write_err = |source| StoreError::Write {
        path: path.to_owned(),
        source,
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(&buf).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    trace!(path = %path, "saved state file");
    Ok(())
}

/// Load `path`, returning `None` when it does not exist.
///
/// # Errors
///
/// Returns [`StoreError::Read`] if an existing file cannot be read and
/// [`StoreError::Decode`] if its content does not decode into `T`.
pub fn load<T: DeserializeOwned>(path: &Utf8Path) -> Result<Option<T>, StoreError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_owned(),
                source,
            });
        }
    };
    let value = serde_json::from_slice(&data).map_err(|source| StoreError::Decode {
        path: path.to_owned(),
        source,
    })?;
    trace!(path = %path, "loaded state file");
    Ok(Some(value))
}

/// Load `path`, treating a missing file as `T::default()`.
///
/// # Errors
///
/// See [`load`].
pub fn load_or_default<T: DeserializeOwned + Default>(path: &Utf8Path) -> Result<T, StoreError> {
    Ok(load(path)?.unwrap_or_default())
}

/// Delete `path`; a missing file counts as success.
///
/// # Errors
///
/// Returns [`StoreError::Write`] if the file exists but cannot be removed.
pub fn remove(path: &Utf8Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StoreError::Write {
            path: path.to_owned(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[fixture]
    fn dir() -> (TempDir, Utf8PathBuf) {
        let tmp = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8 temp dir");
        (tmp, path)
    }

    #[rstest]
    fn save_uses_single_space_indent(dir: (TempDir, Utf8PathBuf)) {
        let (_tmp, root) = dir;
        let path = root.join("value.json");
        let value = BTreeMap::from([("a", "b")]);
        save(&path, &value).expect("save");
        let text = fs::read_to_string(&path).expect("read");
        assert_eq!(text, "{\n \"a\": \"b\"\n}");
    }

    #[rstest]
    fn save_replaces_existing_file(dir: (TempDir, Utf8PathBuf)) {
        let (_tmp, root) = dir;
        let path = root.join("stage.json");
        save(&path, "a much longer first value").expect("first save");
        save(&path, "short").expect("second save");
        let loaded: Option<String> = load(&path).expect("load");
        assert_eq!(loaded.as_deref(), Some("short"));
    }

    #[rstest]
    fn missing_file_loads_as_default(dir: (TempDir, Utf8PathBuf)) {
        let (_tmp, root) = dir;
        let path = root.join("absent.json");
        let loaded: Option<String> = load(&path).expect("load");
        assert!(loaded.is_none());
        let value: Vec<String> = load_or_default(&path).expect("default");
        assert!(value.is_empty());
    }

    #[rstest]
    fn corrupt_file_is_a_decode_error(dir: (TempDir, Utf8PathBuf)) {
        let (_tmp, root) = dir;
        let path = root.join("broken.json");
        fs::write(&path, "{ not json").expect("write");
        let err = load_or_default::<Vec<String>>(&path).expect_err("corrupt");
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[rstest]
    fn save_into_missing_directory_fails(dir: (TempDir, Utf8PathBuf)) {
        let (_tmp, root) = dir;
        let path = root.join("missing").join("value.json");
        let err = save(&path, "x").expect_err("no parent");
        assert!(matches!(err, StoreError::Write { .. }));
    }

    #[rstest]
    fn remove_tolerates_missing_file(dir: (TempDir, Utf8PathBuf)) {
        let (_tmp, root) = dir;
        let path = root.join("gone.json");
        remove(&path).expect("missing is fine");
        save(&path, "x").expect("save");
        remove(&path).expect("remove");
        assert!(!path.exists());
    }
}
