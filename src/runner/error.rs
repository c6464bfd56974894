//! Error types for the runner module.

use crate::cli::Recipe;
use miette::Diagnostic;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while dispatching a recipe.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// A path option is not valid UTF-8.
    #[error("path {} is not valid UTF-8", path.display())]
    #[diagnostic(code(makehelper::runner::non_utf8_path))]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },
    /// A rendering recipe ran without `--template`.
    #[error("recipe `{recipe}` requires a Makefile template")]
    #[diagnostic(
        code(makehelper::runner::missing_template),
        help("pass the template with --template")
    )]
    MissingTemplate {
        /// Recipe that needed the template.
        recipe: Recipe,
    },
    /// The batch-build tool could not be started.
    #[error("failed to run {}", program.display())]
    #[diagnostic(
        code(makehelper::runner::spawn),
        help("install make or point MAKEHELPER_MAKE at it")
    )]
    Spawn {
        /// Program that failed.
        program: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}
