//! Data Directory Layout
//!
//! Resolves the directories Auraforming keeps its files in:
//!
//! ```text
//! <data_dir>/
//!   config.json
//!   agents.sqlite3
//!   uploads/     source PDFs, one per agent
//!   completed/   filled PDFs, one per finalized session
//! ```

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "AURAFORMING_DATA_DIR";

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the default data directory (~/.auraforming/)
pub fn default_data_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".auraforming"))
}

/// Data directory from `AURAFORMING_DATA_DIR`, else the default
pub fn resolve_data_dir() -> AppResult<PathBuf> {
    match std::env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => Ok(PathBuf::from(dir.trim())),
        _ => default_data_dir(),
    }
}

/// Get the config file path (<data_dir>/config.json)
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.json")
}

/// Get the database file path (<data_dir>/agents.sqlite3)
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join("agents.sqlite3")
}

/// Get the uploaded source document directory
pub fn uploads_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("uploads")
}

/// Get the filled document directory
pub fn completed_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("completed")
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Create the data directory and its subdirectories
pub fn ensure_data_layout(data_dir: &Path) -> AppResult<()> {
    ensure_dir(data_dir)?;
    ensure_dir(&uploads_dir(data_dir))?;
    ensure_dir(&completed_dir(data_dir))?;
    Ok(())
}

/// Resolve `candidate` to an existing file inside `root`.
///
/// Returns `None` for missing files, directories, and anything that escapes
/// the root after symlinks and `..` are resolved.
pub fn safe_data_file(root: &Path, candidate: &Path) -> Option<PathBuf> {
    let root = root.canonicalize().ok()?;
    let path = candidate.canonicalize().ok()?;
    (path.starts_with(&root) && path.is_file()).then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let root = Path::new("/tmp/af");
        assert_eq!(config_path(root), root.join("config.json"));
        assert_eq!(database_path(root), root.join("agents.sqlite3"));
        assert_eq!(uploads_dir(root), root.join("uploads"));
        assert_eq!(completed_dir(root), root.join("completed"));
    }

    #[test]
    fn test_ensure_data_layout() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("data");
        ensure_data_layout(&root).unwrap();
        assert!(uploads_dir(&root).is_dir());
        assert!(completed_dir(&root).is_dir());
    }

    #[test]
    fn test_safe_data_file() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("data");
        ensure_data_layout(&root).unwrap();
        let inside = completed_dir(&root).join("a.pdf");
        std::fs::write(&inside, b"%PDF").unwrap();
        let outside = temp.path().join("outside.pdf");
        std::fs::write(&outside, b"%PDF").unwrap();

        assert!(safe_data_file(&root, &inside).is_some());
        assert!(safe_data_file(&root, &outside).is_none());
        assert!(safe_data_file(&root, &completed_dir(&root).join("../../outside.pdf")).is_none());
        assert!(safe_data_file(&root, &root.join("missing.pdf")).is_none());
        assert!(safe_data_file(&root, &uploads_dir(&root)).is_none());
    }
}
