//! Typed substitution tables for Makefile templates.
//!
//! A [`SubstitutionTable`] maps [`Token`]s to replacement text. Only the
//! tokens declared here can be set, so a misspelt key is a compile error
//! rather than a silently unresolved placeholder. The table is persisted in
//! the build directory between the preprocessing passes and final synthesis,
//! which lets values from both phases meet in one rendered Makefile.

use crate::descriptor::table_path;
use crate::store::{self, StoreError};
use camino::Utf8Path;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! tokens {
    ($($(#[$doc:meta])* $variant:ident => $name:literal,)+) => {
        /// Placeholder names understood by the Makefile templates.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum Token {
            $(
                $(#[$doc])*
                #[serde(rename = $name)]
                $variant,
            )+
        }

        impl Token {
            /// Every token, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Placeholder name as written between `<<<` and `>>>`.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }
    };
}

tokens! {
    /// Platform system directory.
    SystemPath => "ARDUINO_SYSTEM_PATH",
    /// Board variant directory.
    VariantPath => "ARDUINO_VARIANT_PATH",
    /// Flags for the include-extraction pass.
    PreprocIncludesFlags => "ARDUINO_PREPROC_INCLUDES_FLAGS",
    /// Source for the include-extraction pass.
    PreprocIncludesSource => "ARDUINO_PREPROC_INCLUDES_SOURCE",
    /// Output of the include-extraction pass.
    PreprocIncludesOutfile => "ARDUINO_PREPROC_INCLUDES_OUTFILE",
    /// Flags for the macro-extraction pass.
    PreprocMacrosFlags => "ARDUINO_PREPROC_MACROS_FLAGS",
    /// Source for the macro-extraction pass.
    PreprocMacrosSource => "ARDUINO_PREPROC_MACROS_SOURCE",
    /// Output of the macro-extraction pass.
    PreprocMacrosOutfile => "ARDUINO_PREPROC_MACROS_OUTFILE",
    /// Deduplicated sketch compile flags.
    Cflags => "ARDUINO_CFLAGS",
    /// Sketch project name.
    ProjectName => "ARDUINO_PROJECT_NAME",
    /// Build output directory.
    BuildPath => "ARDUINO_BUILD_PATH",
    /// Core source root.
    CorePath => "ARDUINO_CORE_PATH",
    /// Core archive file name.
    ArchiveFile => "ARDUINO_ARCHIVE_FILE",
    /// Core source list.
    CoresSrcs => "ARDUINO_CORES_SRCS",
    /// Variant source list.
    VariantSrcs => "ARDUINO_VARIANT_SRCS",
    /// Library source list.
    LibrariesSrcs => "ARDUINO_LIBRARIES_SRCS",
    /// Board variant name.
    Variant => "ARDUINO_VARIANT",
    /// Platform version.
    PlatformVersion => "ARDUINO_PLATFORM_VERSION",
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a placeholder name is not a known [`Token`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown template token '{0}'")]
pub struct UnknownToken(pub String);

impl FromStr for Token {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|token| token.name() == s)
            .ok_or_else(|| UnknownToken(s.to_owned()))
    }
}

/// Replacement text keyed by [`Token`], in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubstitutionTable(IndexMap<Token, String>);

impl SubstitutionTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `token` to `value`, replacing any earlier value.
    pub fn set(&mut self, token: Token, value: impl Into<String>) -> &mut Self {
        self.0.insert(token, value.into());
        self
    }

    /// Replacement text for `token`.
    #[must_use]
    pub fn get(&self, token: Token) -> Option<&str> {
        self.0.get(&token).map(String::as_str)
    }

    /// Replacement text for a raw placeholder name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&str> {
        name.parse().ok().and_then(|token| self.get(token))
    }

    /// Load the table persisted for `build_path`, or an empty one.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the table file exists but is unreadable or
    /// names an unknown token.
    pub fn load(build_path: &Utf8Path) -> Result<Self, StoreError> {
        store::load_or_default(&table_path(build_path))
    }

    /// Persist the table for `build_path`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the table file cannot be written.
    pub fn save(&self, build_path: &Utf8Path) -> Result<(), StoreError> {
        store::save(&table_path(build_path), self)
    }
}
