//! Aggregation of recorded invocations into Makefile variable blocks.
//!
//! Compile descriptors are partitioned by stage and, for the `core` stage,
//! by which root directory the source lives under. Source lists keep the
//! order in which descriptors were loaded; sketch flags are deduplicated in
//! first-seen order.

use crate::descriptor::{BuildContext, Descriptor, InvocationKind, descriptor_pattern};
use crate::paths::{normalise_flag, to_msys};
use crate::store::{self, StoreError};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexSet;
use itertools::Itertools;
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

/// Stage tag of core and variant sources.
pub const STAGE_CORE: &str = "core";
/// Stage tag of library sources.
pub const STAGE_LIBRARIES: &str = "libraries";
/// Stage tag of sketch sources.
pub const STAGE_SKETCH: &str = "sketch";

/// Errors raised while aggregating descriptors.
#[derive(Debug, Error, Diagnostic)]
pub enum AggregateError {
    /// No link invocation was recorded.
    #[error("no link invocation recorded in {build_path}")]
    #[diagnostic(
        code(makehelper::aggregate::missing_link),
        help("the `ld` recipe must run before `makefile`")
    )]
    MissingLink {
        /// Build directory searched.
        build_path: Utf8PathBuf,
    },
    /// More than one link invocation was recorded.
    #[error("{count} link invocations recorded in {build_path}; expected exactly one")]
    #[diagnostic(
        code(makehelper::aggregate::ambiguous_link),
        help("clean the build directory and rebuild")
    )]
    AmbiguousLink {
        /// Build directory searched.
        build_path: Utf8PathBuf,
        /// Number of link descriptors found.
        count: usize,
    },
    /// The descriptor glob pattern was rejected.
    #[error("invalid descriptor pattern {pattern}")]
    #[diagnostic(code(makehelper::aggregate::pattern))]
    Pattern {
        /// Pattern that failed.
        pattern: String,
        /// Underlying glob error.
        #[source]
        source: glob::PatternError,
    },
    /// A directory entry could not be inspected while listing descriptors.
    #[error("failed to list descriptors")]
    #[diagnostic(code(makehelper::aggregate::list))]
    List(#[source] glob::GlobError),
    /// A descriptor path is not valid UTF-8.
    #[error("descriptor path {0} is not valid UTF-8")]
    #[diagnostic(code(makehelper::aggregate::non_utf8))]
    NonUtf8(String),
    /// A descriptor could not be loaded.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

/// Descriptor files found in a build directory, in load order.
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    /// Files the descriptors were read from.
    pub files: Vec<Utf8PathBuf>,
    /// Decoded descriptors, parallel to `files`.
    pub descriptors: Vec<Descriptor>,
}

/// List the descriptor files stored in `build_path`.
///
/// # Errors
///
/// Returns an [`AggregateError`] if the directory cannot be listed.
pub fn descriptor_files(build_path: &Utf8Path) -> Result<Vec<Utf8PathBuf>, AggregateError> {
    let pattern = descriptor_pattern(build_path);
    let entries = glob::glob(&pattern).map_err(|source| AggregateError::Pattern {
        pattern: pattern.clone(),
        source,
    })?;
    entries
        .map(|entry| {
            let path = entry.map_err(AggregateError::List)?;
            Utf8PathBuf::from_path_buf(path)
                .map_err(|p| AggregateError::NonUtf8(p.display().to_string()))
        })
        .collect()
}

/// Load every descriptor stored in `build_path`.
///
/// # Errors
///
/// Returns an [`AggregateError`] if listing fails or a descriptor is corrupt.
pub fn load_recorded(build_path: &Utf8Path) -> Result<Recorded, AggregateError> {
    let files = descriptor_files(build_path)?;
    let mut descriptors = Vec::with_capacity(files.len());
    for file in &files {
        // A descriptor removed between listing and reading is skipped.
        if let Some(descriptor) = store::load::<Descriptor>(file)? {
            descriptors.push(descriptor);
        }
    }
    debug!(count = descriptors.len(), "loaded descriptors");
    Ok(Recorded { files, descriptors })
}

/// Root directories used to split core-stage sources.
#[derive(Debug, Clone, Copy)]
pub struct SourceRoots<'a> {
    /// Core source root.
    pub core: &'a Utf8Path,
    /// Variant source root.
    pub variant: &'a Utf8Path,
}

/// Where a core-stage source belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoreGroup {
    Core,
    Variant,
}

impl SourceRoots<'_> {
    /// Assign `source` to the deepest root containing it.
    fn classify(&self, source: &str) -> Option<CoreGroup> {
        let source = Utf8Path::new(source);
        let depth = |root: &Utf8Path| {
            (!root.as_str().is_empty() && source.starts_with(root))
                .then(|| root.components().count())
        };
        match (depth(self.core), depth(self.variant)) {
            (Some(core), Some(variant)) if variant > core => Some(CoreGroup::Variant),
            (Some(_), _) => Some(CoreGroup::Core),
            (None, Some(_)) => Some(CoreGroup::Variant),
            (None, None) => None,
        }
    }
}

/// Values derived from all recorded descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    /// Normalised core sources.
    pub core_sources: Vec<String>,
    /// Normalised variant sources.
    pub variant_sources: Vec<String>,
    /// Normalised library sources.
    pub library_sources: Vec<String>,
    /// Deduplicated sketch flags.
    pub sketch_flags: Vec<String>,
    /// Context of the single link invocation.
    pub link: BuildContext,
}

impl Aggregate {
    /// Derive the aggregate from `descriptors`.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::MissingLink`] or
    /// [`AggregateError::AmbiguousLink`] unless exactly one link descriptor is
    /// present.
    pub fn build(
        descriptors: &[Descriptor],
        roots: SourceRoots<'_>,
        build_path: &Utf8Path,
    ) -> Result<Self, AggregateError> {
        let link = single_link(descriptors, build_path)?;
        let mut core_sources = Vec::new();
        let mut variant_sources = Vec::new();
        for descriptor in descriptors.iter().filter(|d| d.is_compile_in(STAGE_CORE)) {
            match roots.classify(&descriptor.source) {
                Some(CoreGroup::Core) => core_sources.push(to_msys(&descriptor.source)),
                Some(CoreGroup::Variant) => variant_sources.push(to_msys(&descriptor.source)),
                None => debug!(source = %descriptor.source, "core-stage source outside known roots"),
            }
        }
        let library_sources = descriptors
            .iter()
            .filter(|d| d.is_compile_in(STAGE_LIBRARIES))
            .map(|d| to_msys(&d.source))
            .collect();
        Ok(Self {
            core_sources,
            variant_sources,
            library_sources,
            sketch_flags: sketch_flags(descriptors),
            link: link.context.clone(),
        })
    }
}

fn single_link<'a>(
    descriptors: &'a [Descriptor],
    build_path: &Utf8Path,
) -> Result<&'a Descriptor, AggregateError> {
    let mut links = descriptors
        .iter()
        .filter(|d| d.recipe == InvocationKind::Link);
    match (links.next(), links.count()) {
        (Some(link), 0) => Ok(link),
        (Some(_), extra) => Err(AggregateError::AmbiguousLink {
            build_path: build_path.to_owned(),
            count: extra + 1,
        }),
        (None, _) => Err(AggregateError::MissingLink {
            build_path: build_path.to_owned(),
        }),
    }
}

/// Union of sketch compile flags in first-seen order, with `-I`/`-L` paths
/// normalised before comparison.
#[must_use]
pub fn sketch_flags(descriptors: &[Descriptor]) -> Vec<String> {
    descriptors
        .iter()
        .filter(|d| d.is_compile_in(STAGE_SKETCH))
        .flat_map(|d| d.flags.iter().map(|flag| normalise_flag(flag)))
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Format a source list as the body of a continued Makefile variable.
///
/// # Examples
/// ```
/// use makehelper::aggregate::source_block;
/// let block = source_block(&["/core/a.c".to_owned(), "/core/b.c".to_owned()]);
/// assert_eq!(block, "\t/core/a.c \\\n\t/core/b.c\n");
/// ```
#[must_use]
pub fn source_block(sources: &[String]) -> String {
    format!("\t{}\n", sources.iter().join(" \\\n\t"))
}
