#![forbid(unsafe_code)]

//! Shared environment constants used across makehelper crates (library,
//! tests, and helpers).

/// Environment variable override for the batch-build (`make`) executable.
///
/// # Examples
///
/// ```
/// use make_env::MAKE_ENV;
/// assert_eq!(MAKE_ENV, "MAKEHELPER_MAKE");
/// ```
pub const MAKE_ENV: &str = "MAKEHELPER_MAKE";

/// Executable invoked when [`MAKE_ENV`] is unset.
pub const DEFAULT_MAKE: &str = "make";
