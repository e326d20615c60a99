//! Where Vitrine stores its own data (config, index cache).
//!
//! The product catalog stays wherever the user keeps it. We only store app state here.

use std::path::PathBuf;

/// Returns the directory where Vitrine stores config, the index cache and other app data.
/// On macOS: `~/Library/Application Support/Vitrine/`.
/// Creates the directory if it doesn't exist; returns `None` if we can't determine the path.
pub fn app_data_dir() -> Option<PathBuf> {
    let dir = directories::ProjectDirs::from("app", "Vitrine", "Vitrine")?.data_local_dir().to_path_buf();
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Default location of the index cache: `vectorstore/` under the app data directory.
pub fn default_index_dir() -> PathBuf {
    app_data_dir()
        .map(|d| d.join("vectorstore"))
        .unwrap_or_else(|| PathBuf::from("vectorstore"))
}
