//! End-to-end tests of the record, aggregate, and synthesise pipeline.
//!
//! Every recipe is driven through [`runner::execute`] against a temporary
//! build directory, mirroring the sequence of calls a build system makes.

use anyhow::{Context, Result, ensure};
use makehelper::aggregate::AggregateError;
use makehelper::cli::Cli;
use makehelper::config::Config;
use makehelper::descriptor::{STAGE_FILE, TABLE_FILE};
use makehelper::runner::{self, SUCCESS};
use rstest::{fixture, rstest};
use std::fs;
use test_support::fixtures::BuildDir;

const CORE_ROOT: &str = "/hw/cores/arduino";
const VARIANT_ROOT: &str = "/hw/variants/uno";
const TEMPLATE: &str = "Makefile.in";

#[fixture]
fn build() -> BuildDir {
    let build = BuildDir::new().expect("build dir");
    build.write_template(TEMPLATE).expect("template");
    build
}

fn config(build: &BuildDir, args: &[&str]) -> Result<Config> {
    let template = build.path().join(TEMPLATE);
    let mut argv = vec![
        "makehelper",
        "--build.path",
        build.path().as_str(),
        "--build.core.path",
        CORE_ROOT,
        "--build.variant.path",
        VARIANT_ROOT,
        "--build.variant",
        "uno",
        "--platform.version",
        "1.8.6",
        "--template",
        template.as_str(),
    ];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_legacy(argv).context("parse arguments")?;
    Ok(Config::from_cli(&cli)?)
}

fn run(build: &BuildDir, args: &[&str]) -> Result<i32> {
    runner::execute(&config(build, args)?)
}

fn record_blink(build: &BuildDir) -> Result<()> {
    let calls: [&[&str]; 8] = [
        &["--recipe", "stage", "--stage", "core"],
        &[
            "--recipe", "cpp.o", "--source", "/hw/cores/arduino/main.cpp", "--target", "main.o",
            "--", "-Os",
        ],
        &[
            "--recipe", "c.o", "--source", "/hw/variants/uno/pins.c", "--target", "pins.o",
        ],
        &["--recipe", "stage", "--stage", "libraries"],
        &[
            "--recipe", "cpp.o", "--source", "/libs/Servo/Servo.cpp", "--target", "Servo.o",
        ],
        &["--recipe", "stage", "--stage", "sketch"],
        &[
            "--recipe", "cpp.o", "--source", "/sketch/blink.cpp", "--target", "blink.o", "--",
            "-Os", "-I/inc", "-Os",
        ],
        &[
            "--recipe", "ld", "--project_name", "blink", "--archive_file", "core.a",
        ],
    ];
    for call in calls {
        let code = run(build, call)?;
        ensure!(code == SUCCESS, "{call:?} exited with {code}");
    }
    Ok(())
}

#[rstest]
fn synthesis_fills_every_block(build: BuildDir) -> Result<()> {
    record_blink(&build)?;
    ensure!(build.descriptor_count()? == 5, "expected five descriptors");

    run(&build, &["--recipe", "makefile"])?;
    let makefile = fs::read_to_string(build.path().join("Makefile"))?;
    for expected in [
        "# generated for blink\n",
        "ARCHIVE = core.a\n",
        "VARIANT = uno\n",
        "VERSION = 1.8.6\n",
        "CFLAGS = -Os -I/inc\n",
        "CORE_SRCS = \\\n\t/hw/cores/arduino/main.cpp\n",
        "VARIANT_SRCS = \\\n\t/hw/variants/uno/pins.c\n",
        "LIB_SRCS = \\\n\t/libs/Servo/Servo.cpp\n",
    ] {
        ensure!(
            makefile.contains(expected),
            "Makefile should contain {expected:?}, got:\n{makefile}"
        );
    }
    ensure!(
        makefile.contains(&format!("BUILD_PATH = {}\n", build.path())),
        "build path missing"
    );
    ensure!(
        !makefile.contains("blink.cpp"),
        "sketch sources belong to no source block"
    );
    Ok(())
}

#[rstest]
fn synthesis_cleans_intermediate_files(build: BuildDir) -> Result<()> {
    record_blink(&build)?;
    run(&build, &["--recipe", "makefile"])?;
    assert_eq!(build.file_names()?, vec!["Makefile", TEMPLATE]);
    Ok(())
}

#[rstest]
fn high_verbosity_keeps_intermediate_files(build: BuildDir) -> Result<()> {
    record_blink(&build)?;
    run(&build, &["--recipe", "makefile", "--verbose", "10"])?;
    let names = build.file_names()?;
    ensure!(build.descriptor_count()? == 5, "descriptors removed: {names:?}");
    ensure!(names.iter().any(|n| n == STAGE_FILE), "stage removed");
    ensure!(names.iter().any(|n| n == TABLE_FILE), "table removed");
    Ok(())
}

#[rstest]
fn rerunning_synthesis_after_retention_is_stable(build: BuildDir) -> Result<()> {
    record_blink(&build)?;
    run(&build, &["--recipe", "makefile", "--verbose", "10"])?;
    let first = fs::read_to_string(build.path().join("Makefile"))?;
    run(&build, &["--recipe", "makefile"])?;
    let second = fs::read_to_string(build.path().join("Makefile"))?;
    assert_eq!(first, second);
    Ok(())
}

#[rstest]
fn rerecording_a_call_replaces_its_descriptor(build: BuildDir) -> Result<()> {
    let call = [
        "--recipe", "c.o", "--stage", "sketch", "--source", "/s/a.c", "--target", "a.o", "--",
        "-O0",
    ];
    run(&build, &call)?;
    run(&build, &call)?;
    ensure!(build.descriptor_count()? == 1, "duplicate descriptor");
    Ok(())
}

#[rstest]
fn synthesis_without_link_fails(build: BuildDir) -> Result<()> {
    run(
        &build,
        &["--recipe", "c.o", "--stage", "core", "--source", "/hw/cores/arduino/a.c"],
    )?;
    let err = run(&build, &["--recipe", "makefile"]).expect_err("no link call");
    let missing = err
        .chain()
        .any(|e| matches!(
            e.downcast_ref::<AggregateError>(),
            Some(AggregateError::MissingLink { .. })
        ));
    ensure!(missing, "unexpected error: {err:#}");
    ensure!(
        !build.path().join("Makefile").exists(),
        "no Makefile on failure"
    );
    Ok(())
}

#[rstest]
fn corrupt_descriptor_aborts_synthesis(build: BuildDir) -> Result<()> {
    record_blink(&build)?;
    fs::write(build.path().join("broken.c.o.genmf"), "{ not json")?;
    ensure!(
        run(&build, &["--recipe", "makefile"]).is_err(),
        "corrupt descriptor must fail"
    );
    Ok(())
}
