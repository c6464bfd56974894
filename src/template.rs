//! Line-oriented placeholder substitution for Makefile templates.
//!
//! A placeholder is written `###<<<NAME>>>###`, optionally with whitespace
//! between the hashes and the angle brackets. Each line is scanned for its
//! first placeholder; when the table has a value for that name the
//! placeholder is replaced, otherwise the line is emitted unchanged (or
//! rejected under [`UnresolvedPolicy::Strict`]).
//!
//! # Examples
//!
//! ```
//! use makehelper::table::{SubstitutionTable, Token};
//! use makehelper::template::{Template, UnresolvedPolicy};
//!
//! let template = Template::from_text("CFLAGS = ###<<<ARDUINO_CFLAGS>>>###\n###<<<OTHER>>>###");
//! let mut table = SubstitutionTable::new();
//! table.set(Token::Cflags, "-Os");
//! let out = template.render(&table, UnresolvedPolicy::PassThrough).unwrap();
//! assert_eq!(out, "CFLAGS = -Os\n###<<<OTHER>>>###\n");
//! ```

use crate::table::SubstitutionTable;
use camino::{Utf8Path, Utf8PathBuf};
use miette::Diagnostic;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use thiserror::Error;
use tracing::trace;

/// What to do with a placeholder the table cannot resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnresolvedPolicy {
    /// Emit the line, placeholder included, unchanged.
    #[default]
    PassThrough,
    /// Fail with [`TemplateError::Unresolved`].
    Strict,
}

/// Errors raised while loading or rendering a template.
#[derive(Debug, Error, Diagnostic)]
pub enum TemplateError {
    /// The template file is missing or cannot be opened.
    #[error("cannot open Makefile template {path}")]
    #[diagnostic(
        code(makehelper::template::open),
        help("pass an existing file with --template")
    )]
    Open {
        /// Template path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Reading the template failed part way through.
    #[error("failed reading Makefile template {path} at line {line}")]
    #[diagnostic(code(makehelper::template::read))]
    Read {
        /// Template path.
        path: Utf8PathBuf,
        /// One-based line number that failed.
        line: usize,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A placeholder had no value under [`UnresolvedPolicy::Strict`].
    #[error("unresolved placeholder '{name}' on template line {line}")]
    #[diagnostic(code(makehelper::template::unresolved))]
    Unresolved {
        /// Placeholder name.
        name: String,
        /// One-based line number.
        line: usize,
    },
}

/// Location of a placeholder within a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placeholder<'a> {
    start: usize,
    end: usize,
    name: &'a str,
}

fn skip_whitespace(s: &str) -> &str {
    s.trim_start_matches(char::is_whitespace)
}

/// Find the first `###\s*<<<NAME>>>\s*###` in `line`.
fn find_placeholder(line: &str) -> Option<Placeholder<'_>> {
    let mut offset = 0;
    while let Some(found) = line.get(offset..).and_then(|rest| rest.find("###")) {
        let start = offset + found;
        if let Some(placeholder) = line.get(start..).and_then(|tail| parse_at(line, start, tail)) {
            return Some(placeholder);
        }
        offset = start + 1;
    }
    None
}

fn parse_at<'a>(line: &'a str, start: usize, tail: &'a str) -> Option<Placeholder<'a>> {
    let rest = skip_whitespace(tail.strip_prefix("###")?).strip_prefix("<<<")?;
    let name_len = rest
        .find(|c: char| c == '>' || c.is_whitespace())
        .unwrap_or(rest.len());
    let (name, after_name) = rest.split_at(name_len);
    let after = skip_whitespace(after_name.strip_prefix(">>>")?).strip_prefix("###")?;
    let end = line.len() - after.len();
    Some(Placeholder { start, end, name })
}

/// Substitute the first placeholder of `line`, if the table resolves it.
fn substitute(line: &str, table: &SubstitutionTable) -> Result<String, String> {
    let Some(placeholder) = find_placeholder(line) else {
        return Ok(line.to_owned());
    };
    let Some(value) = table.lookup(placeholder.name) else {
        return Err(placeholder.name.to_owned());
    };
    let (head, _) = line.split_at(placeholder.start);
    let (_, tail) = line.split_at(placeholder.end);
    Ok(format!("{head}{value}{tail}"))
}

/// A Makefile template held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    lines: Vec<String>,
}

impl Template {
    /// Read the template at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Open`] if the file cannot be opened and
    /// [`TemplateError::Read`] if reading a line fails.
    pub fn from_path(path: &Utf8Path) -> Result<Self, TemplateError> {
        let file = File::open(path).map_err(|source| TemplateError::Open {
            path: path.to_owned(),
            source,
        })?;
        let lines = BufReader::new(file)
            .lines()
            .enumerate()
            .map(|(index, line)| {
                line.map_err(|source| TemplateError::Read {
                    path: path.to_owned(),
                    line: index + 1,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        trace!(path = %path, lines = lines.len(), "loaded template");
        Ok(Self { lines })
    }

    /// Build a template from in-memory text.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_owned).collect(),
        }
    }

    /// Render the template with `table`; every output line ends in `\n`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Unresolved`] for an unknown placeholder when
    /// `policy` is [`UnresolvedPolicy::Strict`].
    pub fn render(
        &self,
        table: &SubstitutionTable,
        policy: UnresolvedPolicy,
    ) -> Result<String, TemplateError> {
        let mut out = String::new();
        for (index, line) in self.lines.iter().enumerate() {
            match (substitute(line, table), policy) {
                (Ok(rendered), _) => out.push_str(&rendered),
                (Err(_), UnresolvedPolicy::PassThrough) => out.push_str(line),
                (Err(name), UnresolvedPolicy::Strict) => {
                    return Err(TemplateError::Unresolved {
                        name,
                        line: index + 1,
                    });
                }
            }
            out.push('\n');
        }
        trace!(rendered = %out, "rendered template");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Token;
    use rstest::{fixture, rstest};

    #[fixture]
    fn table() -> SubstitutionTable {
        let mut table = SubstitutionTable::new();
        table
            .set(Token::ProjectName, "bar")
            .set(Token::CoresSrcs, "\t/core/a.c \\\n\t/core/b.c\n");
        table
    }

    #[rstest]
    #[case("###<<<ARDUINO_PROJECT_NAME>>>###", "bar\n")]
    #[case("### <<<ARDUINO_PROJECT_NAME>>>  ###", "bar\n")]
    #[case("NAME := ###<<<ARDUINO_PROJECT_NAME>>>### # tail", "NAME := bar # tail\n")]
    #[case("###<<<ARDUINO_CFLAGS>>>###", "###<<<ARDUINO_CFLAGS>>>###\n")]
    #[case("###<<<FOO>>>###", "###<<<FOO>>>###\n")]
    #[case("plain line", "plain line\n")]
    #[case("#### <<<ARDUINO_PROJECT_NAME>>>###", "#bar\n")]
    #[case("###<<<ARDUINO_PROJECT_NAME >>>###", "###<<<ARDUINO_PROJECT_NAME >>>###\n")]
    fn single_line_rendering(table: SubstitutionTable, #[case] line: &str, #[case] expected: &str) {
        let out = Template::from_text(line)
            .render(&table, UnresolvedPolicy::PassThrough)
            .expect("render");
        assert_eq!(out, expected);
    }

    #[rstest]
    fn only_the_first_placeholder_decides(table: SubstitutionTable) {
        let line = "###<<<FOO>>>### ###<<<ARDUINO_PROJECT_NAME>>>###";
        let out = Template::from_text(line)
            .render(&table, UnresolvedPolicy::PassThrough)
            .expect("render");
        assert_eq!(out, format!("{line}\n"));
    }

    #[rstest]
    fn multi_line_values_are_inserted_verbatim(table: SubstitutionTable) {
        let text = "CORE_SRCS = \\\n###<<<ARDUINO_CORES_SRCS>>>###\nall:";
        let out = Template::from_text(text)
            .render(&table, UnresolvedPolicy::PassThrough)
            .expect("render");
        assert_eq!(out, "CORE_SRCS = \\\n\t/core/a.c \\\n\t/core/b.c\n\nall:\n");
    }

    #[rstest]
    fn strict_policy_rejects_unresolved(table: SubstitutionTable) {
        let err = Template::from_text("ok\n###<<<ARDUINO_VARIANT>>>###")
            .render(&table, UnresolvedPolicy::Strict)
            .expect_err("unresolved");
        assert!(matches!(
            err,
            TemplateError::Unresolved { ref name, line: 2 } if name == "ARDUINO_VARIANT"
        ));
    }

    #[rstest]
    fn missing_template_is_an_open_error() {
        let err = Template::from_path(Utf8Path::new("/nonexistent/Makefile.in"))
            .expect_err("missing");
        assert!(matches!(err, TemplateError::Open { .. }));
    }
}
