//! Posix path utilities for declaration-file bookkeeping
//!
//! All paths handled by the resolution engine are slash-separated and
//! root-anchored (leading `/`), regardless of platform.

/// Convert backslashes to forward slashes
#[must_use]
pub fn to_posix(path: &str) -> String {
    path.replace('\\', "/")
}

/// Whether a path is already posix (contains no backslashes)
#[must_use]
pub fn is_posix(path: &str) -> bool {
    !path.contains('\\')
}

/// Directory portion of a posix path, without a trailing slash.
/// The top-level directory is `/`.
#[must_use]
pub fn dirname(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
        None => ".".to_string(),
    }
}

/// Directory portion of a posix path, with a trailing slash
#[must_use]
pub fn dirname_normalized(path: &str) -> String {
    let dir = dirname(path);
    if dir.ends_with('/') {
        dir
    } else {
        format!("{dir}/")
    }
}

/// Final component of a posix path
#[must_use]
pub fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Join a relative posix path onto a base directory and normalize the result
#[must_use]
pub fn posix_join(base: &str, relative: &str) -> String {
    let base = base.trim_end_matches('/');
    normalize_posix(&format!("{base}/{relative}"))
}

/// Remove `.` and `..` segments from a posix path. `..` segments never
/// escape the root of an absolute path.
#[must_use]
pub fn normalize_posix(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Number of path segments below the root; `/` has depth 0
#[must_use]
pub fn path_depth(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_posix() {
        assert_eq!(to_posix("pages\\about\\+config.js"), "pages/about/+config.js");
        assert!(is_posix("pages/about"));
        assert!(!is_posix("pages\\about"));
    }

    #[test]
    fn test_dirname() {
        assert_eq!(dirname("/pages/about/+config.js"), "/pages/about");
        assert_eq!(dirname("/+config.js"), "/");
        assert_eq!(dirname_normalized("/pages/+config.js"), "/pages/");
        assert_eq!(dirname_normalized("/+config.js"), "/");
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("/pages/about/+title.js"), "+title.js");
        assert_eq!(basename("+title.js"), "+title.js");
    }

    #[test]
    fn test_posix_join() {
        assert_eq!(posix_join("/pages/a/", "./Page.js"), "/pages/a/Page.js");
        assert_eq!(posix_join("/pages/a", "../shared/Layout.js"), "/pages/shared/Layout.js");
        assert_eq!(posix_join("/", "Page.js"), "/Page.js");
    }

    #[test]
    fn test_normalize_posix_never_escapes_root() {
        assert_eq!(normalize_posix("/pages/../../Page.js"), "/Page.js");
        assert_eq!(normalize_posix("/pages/./a//b"), "/pages/a/b");
        assert_eq!(normalize_posix("../x"), "../x");
    }

    #[test]
    fn test_path_depth() {
        assert_eq!(path_depth("/"), 0);
        assert_eq!(path_depth("/pages"), 1);
        assert_eq!(path_depth("/pages/about"), 2);
    }
}
