//! Checks on the SQLite file location before the store opens it

use std::fs;
use std::path::{Component, Path};

use super::constants::MEMORY_DB_PATH;
use crate::error::StoreError;

pub fn validate_db_path(db_path: &str) -> Result<(), StoreError> {
    if db_path == MEMORY_DB_PATH {
        return Ok(());
    }
    match path_problem(db_path) {
        Some(problem) => Err(StoreError::InvalidPath(format!(
            "{} ({:?})",
            problem, db_path
        ))),
        None => Ok(()),
    }
}

fn path_problem(db_path: &str) -> Option<&'static str> {
    if db_path.trim().is_empty() {
        return Some("empty path");
    }
    if db_path.chars().any(char::is_control) {
        return Some("control characters in path");
    }

    let path = Path::new(db_path);
    if path.components().any(|c| c == Component::ParentDir) {
        return Some("parent directory traversal is not allowed");
    }
    if path.file_name().is_none() {
        return Some("path has no file name");
    }
    // SQLite creates the file but not its directory.
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return Some("parent directory does not exist");
        }
    }

    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => Some("symlinks are not allowed"),
        Ok(meta) if meta.is_dir() => Some("path is a directory"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{distributions::Alphanumeric, Rng};
    use std::env;

    fn scratch_dir() -> std::path::PathBuf {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        let dir = env::temp_dir().join(format!("bv_path_{}", suffix));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_accepted_paths() {
        let dir = scratch_dir();
        for path in [
            ":memory:".to_string(),
            "client.db".to_string(),
            dir.join("client.db").to_string_lossy().to_string(),
        ] {
            assert!(validate_db_path(&path).is_ok(), "{}", path);
        }
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_rejected_paths() {
        let cases = [
            ("", "empty path"),
            ("  ", "empty path"),
            ("bad\nname.db", "control characters in path"),
            ("bad\0name.db", "control characters in path"),
            ("../up.db", "parent directory traversal is not allowed"),
            ("dir/../up.db", "parent directory traversal is not allowed"),
            ("no-such-dir-bv/client.db", "parent directory does not exist"),
        ];
        for (path, problem) in cases {
            assert_eq!(path_problem(path), Some(problem), "{:?}", path);
            assert!(matches!(
                validate_db_path(path),
                Err(StoreError::InvalidPath(_))
            ));
        }
    }

    #[test]
    fn test_rejects_directory() {
        let dir = scratch_dir();
        assert_eq!(
            path_problem(dir.to_str().unwrap()),
            Some("path is a directory")
        );
        fs::remove_dir_all(&dir).ok();
    }

    #[cfg(unix)]
    #[test]
    fn test_rejects_symlink() {
        let dir = scratch_dir();
        let target = dir.join("target.db");
        let link = dir.join("link.db");
        fs::write(&target, b"test").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert_eq!(
            path_problem(link.to_str().unwrap()),
            Some("symlinks are not allowed")
        );
        fs::remove_dir_all(&dir).ok();
    }
}
