//! Helpers to validate and manipulate znode paths.
use super::ErrorKind;
use super::Result;

/// Check that the given string is a valid znode path.
///
/// Valid paths are absolute, have no trailing `/` (except for the root itself)
/// and contain no empty, `.` or `..` segments.
pub fn validate(path: &str) -> Result<()> {
    let invalid = |reason: &'static str| -> Result<()> {
        Err(ErrorKind::InvalidPath(path.to_string(), reason).into())
    };
    if path.is_empty() {
        return invalid("path is empty");
    }
    if !path.starts_with('/') {
        return invalid("path must start with '/'");
    }
    if path == "/" {
        return Ok(());
    }
    if path.ends_with('/') {
        return invalid("path must not end with '/'");
    }
    if path.contains('\0') {
        return invalid("path must not contain null characters");
    }
    for segment in path[1..].split('/') {
        match segment {
            "" => return invalid("path must not contain empty segments"),
            "." | ".." => return invalid("relative segments are not allowed"),
            _ => (),
        }
    }
    Ok(())
}

/// Return the path to the parent of the given path, if any.
///
/// # Example
/// ```
/// assert_eq!(zkfacade::path::parent("/a/b/c"), Some("/a/b"));
/// assert_eq!(zkfacade::path::parent("/a"), Some("/"));
/// assert_eq!(zkfacade::path::parent("/"), None);
/// ```
pub fn parent(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(index) => Some(&path[..index]),
        None => None,
    }
}

/// Return the last segment of the given path.
pub fn name(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => &path[index + 1..],
        None => path,
    }
}
