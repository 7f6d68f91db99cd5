//! Input validation utilities.
//!
//! The object store has no notion of an illegal key, so anything that would
//! corrupt the bucket namespace, or later break URL round-tripping, has to be
//! rejected here before it reaches the filesystem.

use crate::constants::ILLEGAL_DIR_NAME_CHARS;
use crate::{ExplorerError, ExplorerResult};

/// Validates a user-supplied directory name.
///
/// Rejects names that are empty, contain a space or a control character, or
/// contain any character of [`ILLEGAL_DIR_NAME_CHARS`]. The denylist covers
/// path separators and `.`, so `..` and nested paths cannot get through.
///
/// # Errors
///
/// Returns `ExplorerError::InvalidName` if the name is rejected.
pub fn validate_dir_name(name: &str) -> ExplorerResult<()> {
    let rejected = name.is_empty()
        || name
            .chars()
            .any(|c| c == ' ' || c.is_control() || ILLEGAL_DIR_NAME_CHARS.contains(c));

    if rejected {
        return Err(ExplorerError::InvalidName {
            name: name.to_string(),
        });
    }

    Ok(())
}

/// Reduces a client-supplied filename to a safe, single path component.
///
/// - non-ASCII characters are dropped
/// - `/` and `\` are treated as whitespace, so directory parts cannot survive
/// - runs of whitespace become a single `_`
/// - everything outside `[A-Za-z0-9_.-]` is removed
/// - leading and trailing `.` and `_` are stripped
///
/// Returns `None` when nothing usable is left, which callers treat as "no file
/// submitted".
pub fn secure_filename(filename: &str) -> Option<String> {
    let ascii: String = filename
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(*c, '_' | '.' | '-'))
        .collect();

    let trimmed = kept.trim_matches(|c: char| c == '.' || c == '_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_names() {
        for name in ["reports", "2024-levees", "north_segment", "A1-b2_C3", "Überschwemmung"] {
            assert!(validate_dir_name(name).is_ok(), "{name} should be accepted");
        }
    }

    #[test]
    fn test_rejects_every_denylisted_character() {
        for c in ILLEGAL_DIR_NAME_CHARS.chars().chain(std::iter::once(' ')) {
            let name = format!("bad{c}name");
            assert!(
                matches!(validate_dir_name(&name), Err(ExplorerError::InvalidName { .. })),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_traversal_and_control_characters() {
        for name in ["..", ".", "a/b", "tab\tname", "line\nbreak", ""] {
            assert!(validate_dir_name(name).is_err(), "{name:?} should be rejected");
        }
    }

    #[test]
    fn test_secure_filename_strips_paths() {
        assert_eq!(
            secure_filename("../../etc/passwd").as_deref(),
            Some("etc_passwd")
        );
        assert_eq!(
            secure_filename("C:\\Users\\ops\\report.csv").as_deref(),
            Some("C_Users_ops_report.csv")
        );
    }

    #[test]
    fn test_secure_filename_cleans_characters() {
        assert_eq!(
            secure_filename("My cool  movie.mov").as_deref(),
            Some("My_cool_movie.mov")
        );
        assert_eq!(secure_filename("résumé (final).pdf").as_deref(), Some("rsum_final.pdf"));
        assert_eq!(secure_filename(".hidden").as_deref(), Some("hidden"));
        assert_eq!(secure_filename("levee.gpkg").as_deref(), Some("levee.gpkg"));
    }

    #[test]
    fn test_secure_filename_empty_results() {
        for name in ["", "   ", "..", "/", "äöü", "__.__"] {
            assert_eq!(secure_filename(name), None, "{name:?}");
        }
    }
}
