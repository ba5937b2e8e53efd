//! Path resolution for user-supplied template and attachment files.

use std::path::{Path, PathBuf};

/// Resolve `path` against `base`. Absolute paths are returned unchanged.
pub fn join_base(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
