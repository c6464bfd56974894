//! Final Makefile synthesis.
//!
//! Runs once, after every compile and link call has been recorded. The
//! recorded descriptors are aggregated, merged into the persisted
//! substitution table, and rendered through the template into
//! `<build_path>/Makefile`. Unless verbosity asks to keep them, the
//! descriptors, stage file, and table are then removed so the build
//! directory returns to its pre-build state.

use crate::aggregate::{Aggregate, SourceRoots, load_recorded, source_block};
use crate::config::Config;
use crate::descriptor::{BuildContext, InvocationKind, stage_path, table_path};
use crate::paths::to_msys;
use crate::store;
use crate::table::{SubstitutionTable, Token};
use crate::template::{Template, UnresolvedPolicy};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tracing::{debug, info, warn};

/// File name of the generated Makefile.
pub const MAKEFILE: &str = "Makefile";

/// Render `table` through the configured template and write the Makefile.
///
/// Any previous Makefile is replaced.
///
/// # Errors
///
/// Returns an error if the template is missing or unreadable, or the
/// Makefile cannot be written.
pub fn render_makefile(config: &Config, table: &SubstitutionTable) -> Result<Utf8PathBuf> {
    let template = Template::from_path(config.require_template()?)?;
    let text = template.render(table, UnresolvedPolicy::PassThrough)?;
    let path = config.build_path().join(MAKEFILE);
    fs::write(&path, text).with_context(|| format!("failed to write {path}"))?;
    info!(path = %path, "generated Makefile");
    Ok(path)
}

/// Pick the configured root, falling back to the link call's copy.
fn root_or<'a>(configured: &'a Utf8Path, recorded: Option<&'a str>) -> &'a Utf8Path {
    match recorded {
        Some(fallback) if configured.as_str().is_empty() => Utf8Path::new(fallback),
        _ => configured,
    }
}

/// Merge the aggregate's values into `table`.
pub fn apply_aggregate(table: &mut SubstitutionTable, aggregate: &Aggregate, config: &Config) {
    let BuildContext {
        build_path,
        core_path,
        system_path,
        variant_path,
        project_name,
        archive_file,
    } = &aggregate.link;
    table
        .set(Token::Cflags, aggregate.sketch_flags.join(" "))
        .set(Token::ProjectName, to_msys(project_name))
        .set(Token::SystemPath, to_msys(system_path))
        .set(Token::BuildPath, to_msys(build_path))
        .set(Token::CorePath, to_msys(core_path))
        .set(Token::VariantPath, to_msys(variant_path))
        .set(Token::ArchiveFile, to_msys(archive_file))
        .set(Token::CoresSrcs, source_block(&aggregate.core_sources))
        .set(Token::VariantSrcs, source_block(&aggregate.variant_sources))
        .set(Token::LibrariesSrcs, source_block(&aggregate.library_sources))
        .set(Token::Variant, config.variant_name.as_str())
        .set(Token::PlatformVersion, config.platform_version.as_str());
}

/// Aggregate the recorded invocations and write the final Makefile.
///
/// # Errors
///
/// Returns an error if no template was given, a descriptor is corrupt, the
/// link call is missing or duplicated, or the Makefile cannot be rendered.
/// A missing template is reported before any state is read or written.
pub fn synthesize(config: &Config) -> Result<Utf8PathBuf> {
    config.require_template()?;
    let build_path = config.build_path();
    let recorded = load_recorded(build_path).context("loading recorded invocations")?;

    let recorded_link = recorded
        .descriptors
        .iter()
        .find(|d| d.recipe == InvocationKind::Link)
        .map(|d| &d.context);
    let roots = SourceRoots {
        core: root_or(&config.paths.core, recorded_link.map(|c| c.core_path.as_str())),
        variant: root_or(
            &config.paths.variant,
            recorded_link.map(|c| c.variant_path.as_str()),
        ),
    };
    let aggregate = Aggregate::build(&recorded.descriptors, roots, build_path)?;
    debug!(
        core = aggregate.core_sources.len(),
        variant = aggregate.variant_sources.len(),
        libraries = aggregate.library_sources.len(),
        flags = aggregate.sketch_flags.len(),
        "aggregated invocations"
    );

    let mut table = SubstitutionTable::load(build_path)?;
    apply_aggregate(&mut table, &aggregate, config);
    table.save(build_path)?;
    let makefile = render_makefile(config, &table)?;

    if config.retain_state() {
        debug!("retaining intermediate files");
    } else {
        let state = [stage_path(build_path), table_path(build_path)];
        for path in recorded.files.iter().chain(&state) {
            if let Err(err) = store::remove(path) {
                warn!(error = %err, "failed to remove intermediate file");
            }
        }
    }
    Ok(makefile)
}
