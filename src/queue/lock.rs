// src/queue/lock.rs — Lock directories as a cross-process mutex
//
// A scenario is claimed when `<queue>/<name>/` exists. The first worker
// whose `create_dir` succeeds owns it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub fn lock_path(queue_dir: &Path, scenario: &str) -> PathBuf {
    queue_dir.join(scenario)
}

/// Try to claim `scenario`. `Ok(false)` means another worker got there first.
pub fn try_lock(queue_dir: &Path, scenario: &str) -> std::io::Result<bool> {
    match std::fs::create_dir(lock_path(queue_dir, scenario)) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove a lock directory. `Ok(false)` when it was already gone.
pub fn release(queue_dir: &Path, scenario: &str) -> std::io::Result<bool> {
    match std::fs::remove_dir(lock_path(queue_dir, scenario)) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

pub fn is_locked(queue_dir: &Path, scenario: &str) -> bool {
    lock_path(queue_dir, scenario).is_dir()
}

/// Names of every lock directory currently in the queue. Only a scan hint;
/// `try_lock` is the authority.
pub fn locked_names(queue_dir: &Path) -> std::io::Result<Vec<String>> {
    let entries = match std::fs::read_dir(queue_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_lock_loses() {
        let dir = tempfile::tempdir().unwrap();
        assert!(try_lock(dir.path(), "base").unwrap());
        assert!(!try_lock(dir.path(), "base").unwrap());
        assert!(is_locked(dir.path(), "base"));
    }

    #[test]
    fn test_release_then_relock() {
        let dir = tempfile::tempdir().unwrap();
        try_lock(dir.path(), "base").unwrap();
        assert!(release(dir.path(), "base").unwrap());
        assert!(!release(dir.path(), "base").unwrap());
        assert!(try_lock(dir.path(), "base").unwrap());
    }

    #[test]
    fn test_locked_names_ignores_files() {
        let dir = tempfile::tempdir().unwrap();
        try_lock(dir.path(), "b").unwrap();
        try_lock(dir.path(), "a").unwrap();
        std::fs::write(dir.path().join("w1_running.txt"), "a\n").unwrap();
        assert_eq!(locked_names(dir.path()).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_locked_names_missing_queue() {
        let dir = tempfile::tempdir().unwrap();
        assert!(locked_names(&dir.path().join("nope")).unwrap().is_empty());
    }
}
