// src/queue/journal.rs — Per-worker record of in-flight checkouts

use std::path::{Path, PathBuf};

use crate::infra::errors::SwitchgearError;

/// `<queue>/<job_id>_running.txt`: scenario names this worker has claimed
/// but not finished. Read only by the same identity after a restart.
#[derive(Debug, Clone)]
pub struct RunningJournal {
    path: PathBuf,
    entries: Vec<String>,
}

impl RunningJournal {
    /// Open the journal, reading whatever a previous run left behind. Each
    /// line is one name exactly as written, with no comment handling.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SwitchgearError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => content
                .lines()
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn contains(&self, scenario: &str) -> bool {
        self.entries.iter().any(|e| e == scenario)
    }

    /// Record a claim and persist it before anything else happens.
    pub fn add(&mut self, scenario: &str) -> Result<(), SwitchgearError> {
        self.entries.push(scenario.to_string());
        self.persist()
    }

    pub fn remove(&mut self, scenario: &str) -> Result<(), SwitchgearError> {
        if let Some(pos) = self.entries.iter().position(|e| e == scenario) {
            self.entries.remove(pos);
        }
        self.persist()
    }

    pub fn clear(&mut self) -> Result<(), SwitchgearError> {
        self.entries.clear();
        self.persist()
    }

    /// Replace the file as a whole (write .tmp, rename). An empty journal
    /// is deleted.
    fn persist(&self) -> Result<(), SwitchgearError> {
        if self.entries.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            };
        }

        let tmp_path = self.path.with_extension("txt.tmp");
        let mut content = self.entries.join("\n");
        content.push('\n');
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_persists_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w1_running.txt");
        let mut journal = RunningJournal::open(&path).unwrap();
        journal.add("base").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "base\n");

        let reopened = RunningJournal::open(&path).unwrap();
        assert_eq!(reopened.entries(), &["base".to_string()]);
    }

    #[test]
    fn test_empty_journal_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w1_running.txt");
        let mut journal = RunningJournal::open(&path).unwrap();
        journal.add("base").unwrap();
        journal.remove("base").unwrap();
        assert!(!path.exists());
        assert!(!dir.path().join("w1_running.txt.tmp").exists());
    }

    #[test]
    fn test_remove_only_first_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let mut journal = RunningJournal::open(dir.path().join("j.txt")).unwrap();
        journal.add("a").unwrap();
        journal.add("b").unwrap();
        journal.add("a").unwrap();
        journal.remove("a").unwrap();
        assert_eq!(journal.entries(), &["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_entries_read_back_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w1_running.txt");
        let mut journal = RunningJournal::open(&path).unwrap();
        journal.add("run#2").unwrap();
        journal.add("base").unwrap();

        let reopened = RunningJournal::open(&path).unwrap();
        assert_eq!(
            reopened.entries(),
            &["run#2".to_string(), "base".to_string()]
        );
        assert!(!reopened.contains("run"));
    }

    #[test]
    fn test_clear_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let mut journal = RunningJournal::open(dir.path().join("j.txt")).unwrap();
        journal.clear().unwrap();
        assert!(journal.entries().is_empty());
    }
}
