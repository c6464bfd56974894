//! Recording of individual compile, archive, and link calls.

use crate::config::Config;
use crate::descriptor::{BuildContext, Descriptor, InvocationKind};
use crate::stage;
use crate::store::{self, StoreError};
use camino::Utf8PathBuf;
use tracing::debug;

/// Build the descriptor for the invocation described by `config`.
#[must_use]
pub fn describe(config: &Config, kind: InvocationKind) -> Descriptor {
    Descriptor {
        stage: config.stage.clone(),
        recipe: kind,
        source: config.source.clone(),
        target: config.target.clone(),
        flags: config.flags.clone(),
        context: BuildContext {
            build_path: config.paths.build.to_string(),
            core_path: config.paths.core.to_string(),
            system_path: config.paths.system.to_string(),
            variant_path: config.paths.variant.to_string(),
            project_name: config.project_name.clone(),
            archive_file: config.archive_file.clone(),
        },
    }
}

/// Record one invocation, returning the descriptor file written.
///
/// A stage previously set for the build directory takes precedence over the
/// stage given on the command line.
///
/// # Errors
///
/// Returns a [`StoreError`] if the stage file is unreadable or the
/// descriptor cannot be written.
pub fn record(config: &Config, kind: InvocationKind) -> Result<Utf8PathBuf, StoreError> {
    let build_path = config.build_path();
    let mut descriptor = describe(config, kind);
    if let Some(current) = stage::current(build_path)? {
        descriptor.stage = current;
    }
    let path = descriptor.path_in(build_path);
    store::save(&path, &descriptor)?;
    debug!(
        recipe = kind.as_str(),
        stage = %descriptor.stage,
        path = %path,
        "recorded invocation"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use camino::Utf8Path;
    use rstest::rstest;
    use tempfile::TempDir;

    fn config_in(root: &Utf8Path, recipe: &str, stage: &str, source: &str) -> Config {
        let cli = Cli::try_parse_legacy([
            "makehelper",
            "--recipe",
            recipe,
            "--stage",
            stage,
            "--build.path",
            root.as_str(),
            "--source",
            source,
            "--target",
            "/build/out.o",
            "--",
            "-Os",
        ])
        .expect("parse");
        Config::from_cli(&cli).expect("config")
    }

    #[rstest]
    fn persisted_stage_overrides_cli_stage() {
        let tmp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8");
        stage::set(&root, "libraries").expect("set stage");
        let config = config_in(&root, "c.o", "sketch", "/lib/x.c");
        let path = record(&config, InvocationKind::CompileC).expect("record");
        let saved: Descriptor = store::load(&path).expect("load").expect("present");
        assert_eq!(saved.stage, "libraries");
        assert_eq!(saved.flags, vec!["-Os".to_owned()]);
    }

    #[rstest]
    fn re_recording_replaces_the_descriptor() {
        let tmp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8");
        let first = config_in(&root, "cpp.o", "core", "/core/a.cpp");
        let second = config_in(&root, "cpp.o", "sketch", "/core/a.cpp");
        let a = record(&first, InvocationKind::CompileCpp).expect("first");
        let b = record(&second, InvocationKind::CompileCpp).expect("second");
        assert_eq!(a, b);
        let count = std::fs::read_dir(&root).expect("list").count();
        assert_eq!(count, 1);
        let saved: Descriptor = store::load(&b).expect("load").expect("present");
        assert_eq!(saved.stage, "sketch");
    }
}
