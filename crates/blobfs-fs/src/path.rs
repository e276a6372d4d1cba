//! Path canonicalization and prefix arithmetic.
//!
//! The blob store's namespace is flat; everything hierarchical in this
//! crate is derived from these helpers. All prefix logic works on whole
//! path segments, never raw substrings, so `photos/a` is not "under"
//! `photo`.

/// Canonicalize a caller-supplied path: forward slashes, no leading or
/// trailing slash, no empty / `.` segments, `..` resolved. The root is
/// the empty string.
#[must_use]
pub fn clean(name: &str) -> String {
    let normalized = name.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for seg in normalized.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(seg),
        }
    }
    parts.join("/")
}

/// Every strict prefix of a cleaned path, shortest first, starting at
/// the root. `ancestors("a/b/c")` is `["", "a", "a/b"]`. These are the
/// synthesized folder keys that make intermediate directories exist
/// without placeholder rows.
#[must_use]
pub fn ancestors(path: &str) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }
    let parts: Vec<&str> = path.split('/').collect();
    (0..parts.len()).map(|n| parts[..n].join("/")).collect()
}

/// The part of `path` below `dir`, if `path` is strictly under it.
/// `dir` must be cleaned. The root (`""`) contains every non-root path.
#[must_use]
pub fn relative_to<'a>(path: &'a str, dir: &str) -> Option<&'a str> {
    if dir.is_empty() {
        return if path.is_empty() { None } else { Some(path) };
    }
    path.strip_prefix(dir)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|rest| !rest.is_empty())
}

/// Whether `rest` (a [`relative_to`] result) is a direct child, i.e. a
/// single segment.
#[must_use]
pub fn is_single_segment(rest: &str) -> bool {
    !rest.contains('/')
}

/// Lowercased extension of the last path segment, without the dot.
#[must_use]
pub fn extension(path: &str) -> Option<String> {
    let name = path.rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
