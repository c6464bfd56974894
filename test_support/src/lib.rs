//! Test utilities for makehelper integration tests.
//!
//! Provides fake `make` executables, UTF-8 temporary build directories, and
//! a small Makefile template exercising every placeholder.

pub mod fixtures;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub use make_env::MAKE_ENV;

fn write_script(path: &Path, body: &str) -> Result<()> {
    fs::write(path, format!("#!/bin/sh\n{body}\n"))
        .with_context(|| format!("write script {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)
            .with_context(|| format!("stat {}", path.display()))?
            .permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms)
            .with_context(|| format!("chmod {}", path.display()))?;
    }
    Ok(())
}

/// Create a fake `make` executable running the shell snippet `body`.
///
/// Returns the temporary directory and the path to the executable.
pub fn fake_make_script(body: &str) -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new().context("create temp dir for fake make")?;
    let path = dir.path().join("make");
    write_script(&path, body)?;
    Ok((dir, path))
}

/// Create a fake `make` executable that exits with `exit_code`.
pub fn fake_make(exit_code: u8) -> Result<(TempDir, PathBuf)> {
    fake_make_script(&format!("exit {exit_code}"))
}

/// Create a fake `make` that records its arguments, one per line.
///
/// Returns the temporary directory, the executable, and the capture file.
pub fn fake_make_capture() -> Result<(TempDir, PathBuf, PathBuf)> {
    let dir = TempDir::new().context("create temp dir for fake make")?;
    let path = dir.path().join("make");
    let capture = dir.path().join("args.txt");
    write_script(
        &path,
        &format!("printf '%s\\n' \"$@\" > '{}'\nexit 0", capture.display()),
    )?;
    Ok((dir, path, capture))
}

/// Read the arguments recorded by [`fake_make_capture`].
pub fn captured_args(capture: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(capture)
        .with_context(|| format!("read captured args {}", capture.display()))?;
    Ok(text.lines().map(str::to_owned).collect())
}
