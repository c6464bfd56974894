//! Build-directory fixtures.

use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

/// Template touching every placeholder the synthesis pass fills.
pub const MAKEFILE_TEMPLATE: &str = "\
# generated for ###<<<ARDUINO_PROJECT_NAME>>>###
BUILD_PATH = ###<<<ARDUINO_BUILD_PATH>>>###
CORE_PATH = ###<<<ARDUINO_CORE_PATH>>>###
SYSTEM_PATH = ###<<<ARDUINO_SYSTEM_PATH>>>###
VARIANT_PATH = ###<<<ARDUINO_VARIANT_PATH>>>###
ARCHIVE = ###<<<ARDUINO_ARCHIVE_FILE>>>###
VARIANT = ###<<<ARDUINO_VARIANT>>>###
VERSION = ###<<<ARDUINO_PLATFORM_VERSION>>>###
CFLAGS = ###<<<ARDUINO_CFLAGS>>>###
CORE_SRCS = \\
###<<<ARDUINO_CORES_SRCS>>>###
VARIANT_SRCS = \\
###<<<ARDUINO_VARIANT_SRCS>>>###
LIB_SRCS = \\
###<<<ARDUINO_LIBRARIES_SRCS>>>###
preproc.includes:
###<<<ARDUINO_PREPROC_INCLUDES_FLAGS>>>###
###<<<ARDUINO_PREPROC_INCLUDES_SOURCE>>>###
###<<<ARDUINO_PREPROC_INCLUDES_OUTFILE>>>###
preproc.macros:
###<<<ARDUINO_PREPROC_MACROS_FLAGS>>>###
###<<<ARDUINO_PREPROC_MACROS_SOURCE>>>###
###<<<ARDUINO_PREPROC_MACROS_OUTFILE>>>###
";

/// A temporary build directory with a UTF-8 path.
#[derive(Debug)]
pub struct BuildDir {
    _dir: TempDir,
    path: Utf8PathBuf,
}

impl BuildDir {
    /// Create an empty build directory.
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("create temp build dir")?;
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|p| anyhow!("temp dir {} is not UTF-8", p.display()))?;
        Ok(Self { _dir: dir, path })
    }

    /// Path of the build directory.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Write [`MAKEFILE_TEMPLATE`] next to the build directory's contents
    /// under `name`, returning its path.
    pub fn write_template(&self, name: &str) -> Result<Utf8PathBuf> {
        let path = self.path.join(name);
        fs::write(&path, MAKEFILE_TEMPLATE).with_context(|| format!("write template {path}"))?;
        Ok(path)
    }

    /// Names of the files currently in the build directory, sorted.
    pub fn file_names(&self) -> Result<Vec<String>> {
        let mut names = fs::read_dir(&self.path)
            .with_context(|| format!("list {}", self.path))?
            .map(|entry| -> Result<String> { Ok(entry?.file_name().to_string_lossy().into_owned()) })
            .collect::<Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }

    /// Number of descriptor files in the build directory.
    pub fn descriptor_count(&self) -> Result<usize> {
        Ok(self
            .file_names()?
            .iter()
            .filter(|name| name.ends_with(".genmf"))
            .count())
    }
}
