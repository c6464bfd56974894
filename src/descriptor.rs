//! Invocation descriptors and the file names they are stored under.
//!
//! A descriptor captures one compile, archive, or link call. Its file name is
//! derived from `(target, source, kind)` alone, so recording the same logical
//! invocation twice replaces the earlier record instead of adding another.
//!
//! # Examples
//!
//! ```
//! use makehelper::descriptor::{Descriptor, InvocationKind};
//!
//! let mut descriptor = Descriptor::new(InvocationKind::CompileC);
//! descriptor.source = "C:/core/main.c".into();
//! descriptor.target = "C:/build/main.c.o".into();
//! assert_eq!(
//!     descriptor.file_name(),
//!     "C__build_main.c.o_C__core_main.c.c.o.genmf",
//! );
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// Extension shared by every descriptor file.
pub const DESCRIPTOR_EXTENSION: &str = "genmf";
/// File holding the current stage value.
pub const STAGE_FILE: &str = "genmf.stage";
/// File holding the persisted substitution table.
pub const TABLE_FILE: &str = "genmf.preproc";

/// Recorded invocation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvocationKind {
    /// C++ object compile.
    #[serde(rename = "cpp.o")]
    CompileCpp,
    /// C object compile.
    #[serde(rename = "c.o")]
    CompileC,
    /// Assembler object compile.
    #[serde(rename = "S.o")]
    CompileAsm,
    /// Static archive.
    #[serde(rename = "ar")]
    Archive,
    /// Final link.
    #[serde(rename = "ld")]
    Link,
}

impl InvocationKind {
    /// Selector spelling, as used in descriptor file names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CompileCpp => "cpp.o",
            Self::CompileC => "c.o",
            Self::CompileAsm => "S.o",
            Self::Archive => "ar",
            Self::Link => "ld",
        }
    }

    /// Whether this kind produces an object file from a source file.
    #[must_use]
    pub const fn is_compile(self) -> bool {
        matches!(self, Self::CompileCpp | Self::CompileC | Self::CompileAsm)
    }
}

/// Build-context paths carried by every descriptor.
///
/// Only the link descriptor's copy is consulted during synthesis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildContext {
    /// Build output directory.
    pub build_path: String,
    /// Core source root.
    pub core_path: String,
    /// Platform system root.
    pub system_path: String,
    /// Variant source root.
    pub variant_path: String,
    /// Sketch project name.
    pub project_name: String,
    /// Core archive file name.
    pub archive_file: String,
}

/// Persisted record of one compile, archive, or link call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Stage tag in effect when the call was recorded.
    #[serde(default)]
    pub stage: String,
    /// Kind of call.
    pub recipe: InvocationKind,
    /// Source file; meaningful for compiles.
    #[serde(default)]
    pub source: String,
    /// Output file; meaningful for compiles and archives.
    #[serde(default)]
    pub target: String,
    /// Flag tokens in invocation order.
    #[serde(default)]
    pub flags: Vec<String>,
    /// Build-context paths; meaningful for the link call.
    #[serde(flatten)]
    pub context: BuildContext,
}

impl Descriptor {
    /// Create an empty descriptor of `kind`.
    #[must_use]
    pub fn new(kind: InvocationKind) -> Self {
        Self {
            stage: String::new(),
            recipe: kind,
            source: String::new(),
            target: String::new(),
            flags: Vec::new(),
            context: BuildContext::default(),
        }
    }

    /// Whether this descriptor is a compile recorded under `stage`.
    #[must_use]
    pub fn is_compile_in(&self, stage: &str) -> bool {
        self.recipe.is_compile() && self.stage == stage
    }

    /// Deterministic, filesystem-safe file name for this invocation.
    #[must_use]
    pub fn file_name(&self) -> String {
        let stem: String = format!("{}_{}", self.target, self.source)
            .chars()
            .map(|c| if matches!(c, '\\' | '/' | ':') { '_' } else { c })
            .collect();
        format!("{stem}.{}.{DESCRIPTOR_EXTENSION}", self.recipe.as_str())
    }

    /// Location of this descriptor inside `build_path`.
    #[must_use]
    pub fn path_in(&self, build_path: &Utf8Path) -> Utf8PathBuf {
        build_path.join(self.file_name())
    }
}

/// Glob pattern matching every descriptor stored in `build_path`.
#[must_use]
pub fn descriptor_pattern(build_path: &Utf8Path) -> String {
    let escaped = glob::Pattern::escape(build_path.as_str());
    format!("{escaped}/*.{DESCRIPTOR_EXTENSION}")
}

/// Location of the stage file inside `build_path`.
#[must_use]
pub fn stage_path(build_path: &Utf8Path) -> Utf8PathBuf {
    build_path.join(STAGE_FILE)
}

/// Location of the substitution-table file inside `build_path`.
#[must_use]
pub fn table_path(build_path: &Utf8Path) -> Utf8PathBuf {
    build_path.join(TABLE_FILE)
}
