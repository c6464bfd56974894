//! Preprocessing passes run through an intermediate Makefile.
//!
//! Before the main build, macro and include extraction are each run by
//! rendering the template with the pass's flags, source, and output, and
//! asking `make` for the target named after the recipe. The values are
//! stored in the persisted substitution table so the later synthesis pass
//! renders them too.

use crate::config::Config;
use crate::makefile::render_makefile;
use crate::paths::{normalise_flag, to_msys};
use crate::table::{SubstitutionTable, Token};
use anyhow::Result;

/// Marker introducing compiler flag tokens.
pub const INCLUDES_MARKER: &str = "-includes";
/// Marker introducing extra `make` arguments.
pub const MAKE_ARGS_MARKER: &str = "-make-args";

/// Which preprocessing pass to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Include extraction.
    Includes,
    /// Macro extraction.
    Macros,
}

impl Pass {
    /// `make` target and recipe name.
    #[must_use]
    pub const fn target(self) -> &'static str {
        match self {
            Self::Includes => "preproc.includes",
            Self::Macros => "preproc.macros",
        }
    }

    /// Tokens receiving `(flags, source, output)`.
    const fn tokens(self) -> [Token; 3] {
        match self {
            Self::Includes => [
                Token::PreprocIncludesFlags,
                Token::PreprocIncludesSource,
                Token::PreprocIncludesOutfile,
            ],
            Self::Macros => [
                Token::PreprocMacrosFlags,
                Token::PreprocMacrosSource,
                Token::PreprocMacrosOutfile,
            ],
        }
    }
}

/// Trailing arguments split by their markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitArgs {
    /// Compiler flags, with `-I`/`-L` paths normalised.
    pub flags: Vec<String>,
    /// Extra arguments for `make`.
    pub make_args: Vec<String>,
}

/// Split `args` at the [`INCLUDES_MARKER`] and [`MAKE_ARGS_MARKER`] tokens.
///
/// Tokens before the first marker count as compiler flags.
///
/// # Examples
/// ```
/// use makehelper::preproc::split_args;
/// let args: Vec<String> = ["-includes", "-IC:/x", "-DA", "-make-args", "V=1"]
///     .map(String::from)
///     .to_vec();
/// let split = split_args(&args);
/// assert_eq!(split.flags, vec!["-I/c/x", "-DA"]);
/// assert_eq!(split.make_args, vec!["V=1"]);
/// ```
#[must_use]
pub fn split_args(args: &[String]) -> SplitArgs {
    let mut split = SplitArgs::default();
    let mut to_make = false;
    for arg in args {
        match arg.as_str() {
            INCLUDES_MARKER => to_make = false,
            MAKE_ARGS_MARKER => to_make = true,
            _ if to_make => split.make_args.push(arg.clone()),
            _ => split.flags.push(normalise_flag(arg)),
        }
    }
    split
}

/// Tab-indented value as placed under a Makefile rule.
fn indented(value: &str) -> String {
    format!("\t{value}")
}

/// Prepare the Makefile for `pass` and return the `make` arguments to run it.
///
/// # Errors
///
/// Returns an error if no template was given, the persisted table is
/// corrupt, or the Makefile cannot be rendered. A missing template is
/// reported before the table is touched.
pub fn configure(config: &Config, pass: Pass) -> Result<Vec<String>> {
    config.require_template()?;
    let build_path = config.build_path();
    let split = split_args(&config.flags);

    let mut table = SubstitutionTable::load(build_path)?;
    let [flags, source, output] = pass.tokens();
    table
        .set(Token::SystemPath, to_msys(config.paths.system.as_str()))
        .set(Token::VariantPath, to_msys(config.paths.variant.as_str()))
        .set(flags, indented(&split.flags.join(" ")))
        .set(source, indented(&to_msys(&config.source)))
        .set(output, indented(&to_msys(&config.target)))
        .set(Token::Variant, config.variant_name.as_str())
        .set(Token::PlatformVersion, config.platform_version.as_str());
    table.save(build_path)?;
    render_makefile(config, &table)?;

    let mut make_args = vec![
        "-s".to_owned(),
        "-C".to_owned(),
        to_msys(build_path.as_str()),
    ];
    make_args.extend(split.make_args);
    make_args.push(pass.target().to_owned());
    Ok(make_args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Recipe};
    use crate::descriptor::table_path;
    use crate::runner::RunnerError;
    use camino::Utf8PathBuf;
    use rstest::rstest;
    use tempfile::TempDir;

    fn owned(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| (*a).to_owned()).collect()
    }

    #[rstest]
    #[case(&["-DX", "-IC:/a"], &["-DX", "-I/c/a"], &[])]
    #[case(&["-make-args", "-j1", "-includes", "-I/b"], &["-I/b"], &["-j1"])]
    #[case(&["-includes", "-make-args"], &[], &[])]
    fn argument_groups(
        #[case] args: &[&str],
        #[case] flags: &[&str],
        #[case] make_args: &[&str],
    ) {
        let split = split_args(&owned(args));
        assert_eq!(split.flags, owned(flags));
        assert_eq!(split.make_args, owned(make_args));
    }

    #[rstest]
    fn pass_targets_match_recipe_names() {
        assert_eq!(Pass::Includes.target(), Recipe::PreprocIncludes.as_str());
        assert_eq!(Pass::Macros.target(), Recipe::PreprocMacros.as_str());
    }

    #[rstest]
    fn missing_template_leaves_table_untouched() {
        let tmp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8");
        let cli = Cli::try_parse_legacy([
            "mh",
            "--recipe",
            "preproc.macros",
            "--build.path",
            root.as_str(),
            "--",
            "-includes",
            "-DX",
        ])
        .expect("parse");
        let config = Config::from_cli(&cli).expect("config");
        let err = configure(&config, Pass::Macros).expect_err("template missing");
        assert!(matches!(
            err.downcast_ref::<RunnerError>(),
            Some(RunnerError::MissingTemplate { .. })
        ));
        assert!(!table_path(&root).exists());
    }
}
