//! Per-invocation configuration.
//!
//! [`Config`] is assembled once from the parsed [`Cli`] and handed to every
//! component by reference. It is the only place that consults process state
//! (the `make` override variable and the host's parallelism).

use crate::cli::{Cli, Recipe};
use crate::runner::RunnerError;
use camino::{Utf8Path, Utf8PathBuf};
use make_env::{DEFAULT_MAKE, MAKE_ENV};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::Level;

/// Verbosity at which intermediate state survives Makefile synthesis.
pub const RETAIN_STATE_VERBOSITY: u8 = 10;

/// Logging level for a verbosity setting.
///
/// # Examples
/// ```
/// use makehelper::config::log_level;
/// use tracing::Level;
/// assert_eq!(log_level(0), Level::INFO);
/// assert_eq!(log_level(2), Level::DEBUG);
/// assert_eq!(log_level(5), Level::TRACE);
/// ```
#[must_use]
pub const fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::INFO,
        1 | 2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Filesystem roots describing one build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildPaths {
    /// Build output directory holding descriptors and the Makefile.
    pub build: Utf8PathBuf,
    /// Root of the core sources.
    pub core: Utf8PathBuf,
    /// Root of the platform system files.
    pub system: Utf8PathBuf,
    /// Root of the board variant sources.
    pub variant: Utf8PathBuf,
}

/// Fully resolved parameters for one process invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Recipe to perform.
    pub recipe: Recipe,
    /// Stage tag supplied on the command line.
    pub stage: String,
    /// Source file of the invocation.
    pub source: String,
    /// Target file of the invocation.
    pub target: String,
    /// Makefile template, required by the rendering recipes.
    pub template: Option<Utf8PathBuf>,
    /// Build roots.
    pub paths: BuildPaths,
    /// Board variant name.
    pub variant_name: String,
    /// Sketch project name.
    pub project_name: String,
    /// Core archive file name.
    pub archive_file: String,
    /// Platform version string.
    pub platform_version: String,
    /// Parallel jobs handed to `make`.
    pub jobs: NonZeroUsize,
    /// Batch-build executable.
    pub make_program: PathBuf,
    /// Diagnostic verbosity.
    pub verbose: u8,
    /// Trailing arguments.
    pub flags: Vec<String>,
}

impl Config {
    /// Resolve the configuration for `cli`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::NonUtf8Path`] when a path option is not valid
    /// UTF-8.
    pub fn from_cli(cli: &Cli) -> Result<Self, RunnerError> {
        let jobs = cli
            .jobs
            .and_then(NonZeroUsize::new)
            .or_else(|| std::thread::available_parallelism().ok())
            .unwrap_or(NonZeroUsize::MIN);
        let make_program =
            std::env::var_os(MAKE_ENV).map_or_else(|| PathBuf::from(DEFAULT_MAKE), PathBuf::from);
        Ok(Self {
            recipe: cli.recipe,
            stage: cli.stage.clone(),
            source: cli.source.clone(),
            target: cli.target.clone(),
            template: cli.template.as_deref().map(utf8).transpose()?,
            paths: BuildPaths {
                build: utf8(&cli.build_path)?,
                core: Utf8PathBuf::from(cli.core_path.as_str()),
                system: Utf8PathBuf::from(cli.system_path.as_str()),
                variant: Utf8PathBuf::from(cli.variant_path.as_str()),
            },
            variant_name: cli.variant_name.clone(),
            project_name: cli.project_name.clone(),
            archive_file: cli.archive_file.clone(),
            platform_version: cli.platform_version.clone(),
            jobs,
            make_program,
            verbose: cli.verbose,
            flags: cli.flags.clone(),
        })
    }

    /// Directory holding the recorded state for this build.
    #[must_use]
    pub fn build_path(&self) -> &Utf8Path {
        &self.paths.build
    }

    /// Whether intermediate files must survive synthesis.
    #[must_use]
    pub const fn retain_state(&self) -> bool {
        self.verbose >= RETAIN_STATE_VERBOSITY
    }

    /// Template path, or an error naming the recipe that needed it.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::MissingTemplate`] when `--template` was not given.
    pub fn require_template(&self) -> Result<&Utf8Path, RunnerError> {
        self.template
            .as_deref()
            .ok_or(RunnerError::MissingTemplate {
                recipe: self.recipe,
            })
    }
}

fn utf8(path: &Path) -> Result<Utf8PathBuf, RunnerError> {
    Utf8PathBuf::from_path_buf(path.to_path_buf())
        .map_err(|path| RunnerError::NonUtf8Path { path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_legacy(args.iter().copied()).expect("parse cli")
    }

    #[rstest]
    fn config_carries_cli_values() {
        let cli = parse(&[
            "makehelper",
            "--recipe",
            "c.o",
            "--build.path",
            "/tmp/build",
            "--build.core.path=/core",
            "--jobs",
            "3",
            "--",
            "-O2",
        ]);
        let config = Config::from_cli(&cli).expect("config");
        assert_eq!(config.recipe, Recipe::CompileC);
        assert_eq!(config.build_path(), Utf8Path::new("/tmp/build"));
        assert_eq!(config.paths.core, Utf8PathBuf::from("/core"));
        assert_eq!(config.jobs.get(), 3);
        assert_eq!(config.flags, vec!["-O2".to_owned()]);
        assert!(!config.retain_state());
    }

    #[rstest]
    #[case(9, false)]
    #[case(10, true)]
    #[case(12, true)]
    fn retention_follows_verbosity(#[case] level: u8, #[case] retained: bool) {
        let verbose = level.to_string();
        let cli = Cli::parse_from(["makehelper", "--recipe", "makefile", "--verbose", &verbose]);
        let config = Config::from_cli(&cli).expect("config");
        assert_eq!(config.retain_state(), retained);
    }

    #[rstest]
    fn omitted_roots_resolve_to_empty_paths() {
        let cli = parse(&["makehelper", "--recipe", "echo"]);
        let config = Config::from_cli(&cli).expect("config");
        assert_eq!(config.paths.core, Utf8PathBuf::new());
        assert_eq!(config.paths.system, Utf8PathBuf::new());
        assert_eq!(config.paths.variant, Utf8PathBuf::new());
        assert_eq!(config.build_path(), Utf8Path::new("."));
        assert!(config.flags.is_empty());
    }

    #[rstest]
    fn missing_template_is_reported() {
        let cli = parse(&["makehelper", "--recipe", "makefile"]);
        let config = Config::from_cli(&cli).expect("config");
        let err = config.require_template().expect_err("template missing");
        assert!(err.to_string().contains("makefile"));
    }
}
