//! Path helpers
//!
//! Conversion of configured system paths into URL prefixes, plus the small
//! file system checks the builder relies on.

use std::path::{Path, PathBuf};

const SLASH: &str = "/";

/// Convert a system path into a web path.
///
/// Backslashes become slashes, every `.` is removed and runs of slashes are
/// collapsed. This only tidies configured paths; containment of request paths
/// is enforced by [`DirFileSystem`](crate::fs::DirFileSystem).
pub fn to_web_path(system_path: &str) -> String {
    let mut web_path = system_path.replace('\\', SLASH).replace('.', "");
    while web_path.contains("//") {
        web_path = web_path.replace("//", SLASH);
    }
    web_path
}

/// Absolute form of `path`, or `path` itself when it cannot be resolved
pub fn abs(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Whether a directory (or file) exists.
///
/// Only a definite "not found" counts as missing; other errors such as
/// permission problems report `true`.
pub fn directory_exists(dir: impl AsRef<Path>) -> bool {
    !matches!(
        std::fs::metadata(dir),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound
    )
}
