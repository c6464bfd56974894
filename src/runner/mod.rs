//! Recipe dispatch.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! resolves the [`Config`] and performs the selected recipe. Recipes that
//! hand over to `make` report its exit code as the process exit code.

mod error;
mod process;

pub use error::RunnerError;
pub use process::{exit_code, redact_argument, run_make};

use crate::cli::{Cli, Recipe};
use crate::config::Config;
use crate::descriptor::InvocationKind;
use crate::paths::to_msys;
use crate::preproc::{self, Pass};
use crate::{makefile, recorder, stage};
use anyhow::{Context, Result};
use std::io::{self, Write};
use tracing::{debug, error};

/// Exit code of a recipe that completed without running `make`.
pub const SUCCESS: i32 = 0;

/// Execute the recipe selected by `cli`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the recipe fails.
pub fn run(cli: &Cli) -> Result<i32> {
    let config = Config::from_cli(cli)?;
    execute(&config)
}

/// Execute the recipe described by `config`, returning the exit code.
///
/// # Errors
///
/// Returns an error if recording, rendering, or spawning `make` fails. A
/// non-zero exit from `make` is not an error; it is returned as the code.
pub fn execute(config: &Config) -> Result<i32> {
    debug!(
        recipe = %config.recipe,
        stage = %config.stage,
        source = %config.source,
        target = %config.target,
        "dispatching recipe"
    );
    match config.recipe {
        Recipe::CompileCpp => record(config, InvocationKind::CompileCpp),
        Recipe::CompileC => record(config, InvocationKind::CompileC),
        Recipe::CompileAsm => record(config, InvocationKind::CompileAsm),
        Recipe::Archive => record(config, InvocationKind::Archive),
        Recipe::Link => record(config, InvocationKind::Link),
        Recipe::Stage => {
            stage::set(config.build_path(), &config.stage).context("recording build stage")?;
            Ok(SUCCESS)
        }
        Recipe::Echo => {
            writeln!(io::stdout().lock(), "{}", config.flags.join(" "))
                .context("writing to stdout")?;
            Ok(SUCCESS)
        }
        Recipe::Make => {
            let mut args = vec![
                format!("-j{}", config.jobs),
                "-C".to_owned(),
                to_msys(config.build_path().as_str()),
            ];
            args.extend(config.flags.iter().cloned());
            make(config, &args)
        }
        Recipe::PreprocIncludes => preprocess(config, Pass::Includes),
        Recipe::PreprocMacros => preprocess(config, Pass::Macros),
        Recipe::Makefile => {
            makefile::synthesize(config).context("synthesising Makefile")?;
            Ok(SUCCESS)
        }
    }
}

fn record(config: &Config, kind: InvocationKind) -> Result<i32> {
    recorder::record(config, kind)
        .with_context(|| format!("recording {kind:?} invocation for {}", config.source))?;
    Ok(SUCCESS)
}

fn preprocess(config: &Config, pass: Pass) -> Result<i32> {
    let args = preproc::configure(config, pass)
        .with_context(|| format!("preparing {} pass", pass.target()))?;
    make(config, &args)
}

fn make(config: &Config, args: &[String]) -> Result<i32> {
    let status = run_make(&config.make_program, args)?;
    let code = exit_code(status);
    if code != SUCCESS {
        error!(code, "make exited with failure");
    }
    Ok(code)
}
