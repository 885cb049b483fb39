use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const LEARNLOOP_DIR: &str = ".learnloop";
pub const STORE_FILE: &str = ".learnloop/global-learnings.yaml";
pub const CONFIG_FILE: &str = ".learnloop/config.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn learnloop_dir(root: &Path) -> PathBuf {
    root.join(LEARNLOOP_DIR)
}

pub fn store_path(root: &Path) -> PathBuf {
    root.join(STORE_FILE)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve a possibly-relative path against `root`.
pub fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
