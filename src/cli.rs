//! Command line interface definition using clap.
//!
//! The build system hands every parameter to `makehelper` as a long option
//! spelled exactly like its `platform.txt` property (`--build.path`,
//! `--build.core.path`, ...). Whatever follows the options is collected
//! verbatim as the invocation's flag tokens.

use clap::{CommandFactory, Parser, ValueEnum};
use std::ffi::OsString;
use std::path::PathBuf;

/// Long option whose single-dash spelling is the preprocessing group marker.
const INCLUDES_OPTION: &str = "includes";

/// Maximum number of jobs accepted by the CLI.
const MAX_JOBS: usize = 64;

fn parse_jobs(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("{s} is not a valid number"))?;
    if (1..=MAX_JOBS).contains(&value) {
        Ok(value)
    } else {
        Err(format!("jobs must be between 1 and {MAX_JOBS}"))
    }
}

/// Build action performed by a single process invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Recipe {
    /// Record a C++ object compile.
    #[value(name = "cpp.o")]
    CompileCpp,
    /// Record a C object compile.
    #[value(name = "c.o")]
    CompileC,
    /// Record an assembler object compile.
    #[value(name = "S.o")]
    CompileAsm,
    /// Record a static archive step.
    #[value(name = "ar")]
    Archive,
    /// Record the final link step.
    #[value(name = "ld")]
    Link,
    /// Persist the current build stage.
    #[value(name = "stage")]
    Stage,
    /// Print the trailing arguments.
    #[value(name = "echo")]
    Echo,
    /// Run the synthesised Makefile.
    #[value(name = "make")]
    Make,
    /// Render and run the include-extraction preprocessing step.
    #[value(name = "preproc.includes")]
    PreprocIncludes,
    /// Render and run the macro-extraction preprocessing step.
    #[value(name = "preproc.macros")]
    PreprocMacros,
    /// Aggregate recorded invocations into the final Makefile.
    #[value(name = "makefile")]
    Makefile,
}

impl Recipe {
    /// Selector spelling used on the command line and in descriptor names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CompileCpp => "cpp.o",
            Self::CompileC => "c.o",
            Self::CompileAsm => "S.o",
            Self::Archive => "ar",
            Self::Link => "ld",
            Self::Stage => "stage",
            Self::Echo => "echo",
            Self::Make => "make",
            Self::PreprocIncludes => "preproc.includes",
            Self::PreprocMacros => "preproc.macros",
            Self::Makefile => "makefile",
        }
    }
}

impl std::fmt::Display for Recipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bridge single-file compiler invocations to a batch Makefile build.
#[derive(Debug, Parser)]
#[command(name = "makehelper", author, version, about, long_about = None)]
pub struct Cli {
    /// Recipe performed by this invocation.
    #[arg(long, value_enum, value_name = "RECIPE")]
    pub recipe: Recipe,

    /// Build stage tag (core, variant, libraries, sketch, ...).
    #[arg(long, value_name = "STAGE", default_value = "")]
    pub stage: String,

    /// Source file of the invocation.
    #[arg(long, value_name = "FILE", default_value = "")]
    pub source: String,

    /// Target file of the invocation.
    #[arg(long, value_name = "FILE", default_value = "")]
    pub target: String,

    /// Makefile template used by the rendering recipes.
    #[arg(long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Build output directory; holds the recorded invocations.
    #[arg(long = "build.path", value_name = "DIR", default_value = ".")]
    pub build_path: PathBuf,

    /// Root directory of the core sources.
    #[arg(long = "build.core.path", value_name = "DIR", default_value = "")]
    pub core_path: String,

    /// Root directory of the platform system files.
    #[arg(long = "build.system.path", value_name = "DIR", default_value = "")]
    pub system_path: String,

    /// Root directory of the board variant sources.
    #[arg(long = "build.variant.path", value_name = "DIR", default_value = "")]
    pub variant_path: String,

    /// Board variant name.
    #[arg(long = "build.variant", value_name = "NAME", default_value = "")]
    pub variant_name: String,

    /// Sketch project name.
    #[arg(long = "project_name", value_name = "NAME", default_value = "")]
    pub project_name: String,

    /// Core archive file name.
    #[arg(long = "archive_file", value_name = "FILE", default_value = "")]
    pub archive_file: String,

    /// Platform version string.
    #[arg(long = "platform.version", value_name = "VERSION", default_value = "")]
    pub platform_version: String,

    /// Platform root directory; accepted for compatibility.
    #[arg(long = "runtime.platform.path", value_name = "DIR", default_value = "")]
    pub platform_path: String,

    /// Host tool directory; accepted for compatibility.
    #[arg(long = "build.usr.bin.path", value_name = "DIR", default_value = "")]
    pub usr_bin_path: String,

    /// Compiler directory; accepted for compatibility.
    #[arg(long = "build.compiler.path", value_name = "DIR", default_value = "")]
    pub compiler_path: String,

    /// Uploader directory; accepted for compatibility.
    #[arg(long = "build.uploader.path", value_name = "DIR", default_value = "")]
    pub uploader_path: String,

    /// Board main-file selector; accepted for compatibility.
    #[arg(long = "contiki.target.main", value_name = "FILE", default_value = "")]
    pub target_main: String,

    /// Include list; accepted for compatibility. Only the double-dash
    /// spelling is an option, as `-includes` marks a preprocessing flag group.
    #[arg(long = "includes", value_name = "FLAGS", default_value = "")]
    pub includes: String,

    /// Set the number of parallel jobs passed to `make`.
    #[arg(long, value_name = "N", value_parser = parse_jobs)]
    pub jobs: Option<usize>,

    /// Diagnostic verbosity level; 10 or above keeps intermediate files.
    #[arg(long, value_name = "LEVEL", default_value_t = 0)]
    pub verbose: u8,

    /// Flag tokens of the recorded invocation, or recipe-specific arguments.
    #[arg(
        value_name = "ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub flags: Vec<String>,
}

impl Cli {
    /// Parse `args` after rewriting single-dash long options.
    ///
    /// # Errors
    ///
    /// Returns the clap error when the arguments are invalid.
    pub fn try_parse_legacy<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalise_legacy_args(args))
    }
}

/// Rewrite `-build.path=x` style options to `--build.path=x`.
///
/// Only names declared on [`Cli`] are rewritten, and rewriting stops at the
/// first `--` or the first argument that is not a recognised option, so
/// compiler flags such as `-I/usr/include` reach the trailing arguments
/// untouched. `-includes` is never rewritten; it opens the preprocessing
/// flag group. The program name is passed through.
#[must_use]
pub fn normalise_legacy_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let command = Cli::command();
    let longs: Vec<String> = command
        .get_arguments()
        .filter_map(|arg| arg.get_long().map(str::to_owned))
        .filter(|long| long != INCLUDES_OPTION)
        .collect();
    let takes_value = |name: &str| name != "help" && name != "version";

    let mut out = Vec::new();
    let mut iter = args.into_iter().map(Into::into);
    if let Some(program) = iter.next() {
        out.push(program);
    }
    let mut expect_value = false;
    let mut options_done = false;
    for arg in iter {
        if options_done {
            out.push(arg);
            continue;
        }
        if expect_value {
            expect_value = false;
            out.push(arg);
            continue;
        }
        let Some(text) = arg.to_str() else {
            options_done = true;
            out.push(arg);
            continue;
        };
        if text == "--" {
            options_done = true;
            out.push(arg);
            continue;
        }
        let bare = text
            .strip_prefix("--")
            .or_else(|| text.strip_prefix('-'))
            .unwrap_or(text);
        let (name, inline_value) = bare
            .split_once('=')
            .map_or((bare, false), |(name, _)| (name, true));
        if text.starts_with('-') && longs.iter().any(|long| long == name) {
            expect_value = !inline_value && takes_value(name);
            out.push(OsString::from(format!("--{bare}")));
        } else {
            options_done = true;
            out.push(arg);
        }
    }
    out
}
