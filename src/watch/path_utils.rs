// src/watch/path_utils.rs

//! Utility functions for path handling.

use std::path::{Component, Path, PathBuf};

/// Lexically clean `path`: drop `.` components, resolve `..` against the
/// preceding component and strip any trailing separator.
///
/// No filesystem access; symlinks are not resolved.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !path.is_absolute() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Same as [`clean_path`] for `/`-separated strings that never touch the
/// local filesystem (remote paths). The result always ends with `/`.
pub fn clean_dir_str(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            p => parts.push(p),
        }
    }

    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{joined}/"),
        (false, true) => "./".to_string(),
        (false, false) => format!("{joined}/"),
    }
}

/// Render a directory with exactly one trailing separator.
pub fn dir_display(path: &Path) -> String {
    let s = path.to_string_lossy();
    if s.ends_with('/') {
        s.into_owned()
    } else {
        format!("{s}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_path_normalizes_separators_and_dots() {
        assert_eq!(clean_path(Path::new("/data/app/")), PathBuf::from("/data/app"));
        assert_eq!(clean_path(Path::new("/data/./x/../app")), PathBuf::from("/data/app"));
        assert_eq!(clean_path(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(clean_path(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn clean_dir_str_always_ends_with_separator() {
        assert_eq!(clean_dir_str("backups/app"), "backups/app/");
        assert_eq!(clean_dir_str("backups//app/"), "backups/app/");
        assert_eq!(clean_dir_str("/srv/./x/../y"), "/srv/y/");
        assert_eq!(clean_dir_str("/"), "/");
        assert_eq!(clean_dir_str("."), "./");
    }

    #[test]
    fn dir_display_adds_one_separator() {
        assert_eq!(dir_display(Path::new("/data/app")), "/data/app/");
        assert_eq!(dir_display(Path::new("/")), "/");
    }
}
