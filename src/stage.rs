//! Persisted "current stage" value.
//!
//! The surrounding build announces phase changes with a `stage` recipe. The
//! value applies to every invocation recorded afterwards in the same build
//! directory; descriptors already on disk keep the stage they were saved with.

use crate::descriptor::stage_path;
use crate::store::{self, StoreError};
use camino::Utf8Path;
use tracing::debug;

/// Persist `stage` as the current stage for `build_path`.
///
/// # Errors
///
/// Returns a [`StoreError`] if the stage file cannot be written.
pub fn set(build_path: &Utf8Path, stage: &str) -> Result<(), StoreError> {
    debug!(stage, "setting build stage");
    store::save(&stage_path(build_path), stage)
}

/// Current stage for `build_path`, if one has been set.
///
/// # Errors
///
/// Returns a [`StoreError`] if the stage file exists but cannot be read.
pub fn current(build_path: &Utf8Path) -> Result<Option<String>, StoreError> {
    store::load(&stage_path(build_path))
}
