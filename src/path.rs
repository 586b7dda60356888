//! Canonical image paths.
//!
//! Paths inside an image are always relative to the image root, use `/` as
//! the separator and never contain `.` or `..` segments. [`canonicalize`]
//! turns caller-supplied paths into that form.

use crate::{Error, Result};

/// Maximum length for image paths (in bytes).
const MAX_PATH_LENGTH: usize = 32768;

/// Canonicalizes an image path.
///
/// Leading slashes are stripped, runs of slashes are collapsed into one and
/// trailing slashes are removed. The empty string denotes the root directory.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if the path:
/// - Contains NUL bytes
/// - Contains `.` or `..` segments
/// - Exceeds the maximum path length
///
/// # Examples
///
/// ```
/// use sqimage::path::canonicalize;
///
/// assert_eq!(canonicalize("//usr///lib/").unwrap(), "usr/lib");
/// assert_eq!(canonicalize("/").unwrap(), "");
/// assert!(canonicalize("usr/../etc").is_err());
/// ```
pub fn canonicalize(s: &str) -> Result<String> {
    if s.contains('\0') {
        return Err(Error::InvalidArgument(format!("{:?}: contains NUL byte", s)));
    }

    if s.len() > MAX_PATH_LENGTH {
        return Err(Error::InvalidArgument(format!(
            "path exceeds maximum length of {} bytes",
            MAX_PATH_LENGTH
        )));
    }

    let mut out = String::with_capacity(s.len());
    for segment in s.split('/').filter(|seg| !seg.is_empty()) {
        if segment == "." || segment == ".." {
            return Err(Error::InvalidArgument(format!(
                "{}: '{}' segment not allowed",
                s, segment
            )));
        }
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(segment);
    }

    Ok(out)
}

/// Returns true if `s` is already in canonical form.
pub fn is_canonical(s: &str) -> bool {
    canonicalize(s).is_ok_and(|c| c == s)
}

/// Splits a canonical path into its parent part and its last segment.
///
/// Returns `None` for the root (empty) path.
pub(crate) fn split_last(path: &str) -> Option<(&str, &str)> {
    if path.is_empty() {
        return None;
    }
    match path.rfind('/') {
        Some(idx) => Some((&path[..idx], &path[idx + 1..])),
        None => Some(("", path)),
    }
}
