//! Path normalisation for the batch-build tool.
//!
//! The generated Makefiles are consumed by an MSYS-style `make`, which only
//! understands forward slashes and spells `C:/dir` as `/c/dir`.

use std::path::MAIN_SEPARATOR;

/// Flag prefixes whose remainder is a filesystem path.
const PATH_FLAG_PREFIXES: [&str; 2] = ["-I", "-L"];

/// Convert `path` to the slash-separated, drive-rooted form used by `make`.
///
/// Native separators become `/`. A leading drive designator (`C:/`) becomes
/// a root directory named after the lower-cased drive letter. Paths shorter
/// than four characters, or without a drive designator, are returned with
/// only the separator conversion applied.
///
/// # Examples
/// ```
/// use makehelper::paths::to_msys;
/// assert_eq!(to_msys("C:/foo/bar"), "/c/foo/bar");
/// assert_eq!(to_msys("/usr/lib"), "/usr/lib");
/// assert_eq!(to_msys("C:/"), "C:/");
/// ```
#[must_use]
pub fn to_msys(path: &str) -> String {
    let slashed = if MAIN_SEPARATOR == '/' {
        path.to_owned()
    } else {
        path.replace(MAIN_SEPARATOR, "/")
    };
    if slashed.len() < 4 {
        return slashed;
    }
    let mut chars = slashed.chars();
    match (chars.next(), chars.as_str().strip_prefix(":/")) {
        (Some(drive), Some(rest)) if drive.is_ascii_alphabetic() => {
            format!("/{}/{rest}", drive.to_ascii_lowercase())
        }
        _ => slashed,
    }
}

/// Normalise the path portion of `-I` and `-L` flags, leaving others intact.
///
/// # Examples
/// ```
/// use makehelper::paths::normalise_flag;
/// assert_eq!(normalise_flag("-ID:/inc"), "-I/d/inc");
/// assert_eq!(normalise_flag("-O2"), "-O2");
/// ```
#[must_use]
pub fn normalise_flag(flag: &str) -> String {
    PATH_FLAG_PREFIXES
        .iter()
        .find_map(|prefix| {
            flag.strip_prefix(prefix)
                .map(|path| format!("{prefix}{}", to_msys(path)))
        })
        .unwrap_or_else(|| flag.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("C:/foo/bar", "/c/foo/bar")]
    #[case("d:/x", "/d/x")]
    #[case("C:/", "C:/")]
    #[case("ab", "ab")]
    #[case("/opt/arduino", "/opt/arduino")]
    #[case("relative/dir", "relative/dir")]
    #[case("1:/not-a-drive", "1:/not-a-drive")]
    fn msys_conversion(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(to_msys(input), expected);
    }

    #[rstest]
    #[case("-IC:/core", "-I/c/core")]
    #[case("-LE:/lib", "-L/e/lib")]
    #[case("-I/usr/include", "-I/usr/include")]
    #[case("-DF_CPU=16000000L", "-DF_CPU=16000000L")]
    #[case("-I", "-I")]
    fn flag_normalisation(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalise_flag(input), expected);
    }
}
