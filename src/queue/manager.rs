// src/queue/manager.rs — Scenario queue shared by independent workers
//
// Checkout order matters: the name goes into this worker's journal before
// the lock directory is created, so an interrupted checkout can at worst
// cause a re-run after recovery, never a lost scenario.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::journal::RunningJournal;
use super::lock;
use super::scenario::{self, ScenarioDescriptor};
use crate::infra::errors::SwitchgearError;
use crate::infra::paths;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkout {
    /// This worker created the lock directory.
    Won,
    /// Another worker holds the lock; move on.
    Lost,
    /// Explicitly requested scenario, run whether or not it was locked.
    Forced,
}

impl Checkout {
    pub fn should_run(&self) -> bool {
        !matches!(self, Checkout::Lost)
    }
}

/// What one worker did during `run`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSummary {
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
}

pub struct ScenarioQueue {
    list_path: PathBuf,
    queue_dir: PathBuf,
    job_id: String,
    journal: RunningJournal,
    ran: Vec<String>,
    skipped: Vec<String>,
}

impl ScenarioQueue {
    /// Open the queue directory (creating it if needed) and this worker's
    /// journal. Nothing is released until `recover` runs.
    pub fn open(
        list_path: impl Into<PathBuf>,
        queue_dir: impl Into<PathBuf>,
        job_id: &str,
    ) -> Result<Self, SwitchgearError> {
        let queue_dir = queue_dir.into();
        paths::ensure_dir(&queue_dir)?;
        let journal = RunningJournal::open(paths::journal_path(&queue_dir, job_id))?;
        Ok(Self {
            list_path: list_path.into(),
            queue_dir,
            job_id: job_id.to_string(),
            journal,
            ran: Vec::new(),
            skipped: Vec::new(),
        })
    }

    pub fn queue_dir(&self) -> &Path {
        &self.queue_dir
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn journal(&self) -> &RunningJournal {
        &self.journal
    }

    /// Release the locks of scenarios this identity was running when it was
    /// interrupted, then clear the journal. Returns the released names.
    pub fn recover(&mut self) -> Result<Vec<String>, SwitchgearError> {
        let interrupted = self.journal.entries().to_vec();
        let mut released = Vec::new();
        for name in &interrupted {
            if scenario::validate_name(name).is_err() {
                tracing::warn!("Ignoring invalid journal entry '{}'", name);
                continue;
            }
            if lock::release(&self.queue_dir, name)? {
                tracing::info!("Requeued interrupted scenario '{}'", name);
                released.push(name.clone());
            }
        }
        if !interrupted.is_empty() {
            self.journal.clear()?;
        }
        Ok(released)
    }

    /// Journal first, then the lock directory.
    pub fn checkout(&mut self, name: &str, force: bool) -> Result<Checkout, SwitchgearError> {
        self.journal.add(name)?;
        let locked = lock::try_lock(&self.queue_dir, name)?;
        if locked {
            return Ok(Checkout::Won);
        }
        if force {
            tracing::debug!("Scenario '{}' was already locked; running it anyway", name);
            return Ok(Checkout::Forced);
        }
        self.journal.remove(name)?;
        tracing::debug!("Scenario '{}' was claimed by another worker", name);
        Ok(Checkout::Lost)
    }

    /// Drop the journal entry. The lock stays, so the scenario is not
    /// picked up again.
    pub fn mark_completed(&mut self, name: &str) -> Result<(), SwitchgearError> {
        self.journal.remove(name)
    }

    /// Re-read the list and claim the first scenario nobody holds.
    pub fn next_scenario(&mut self) -> Result<Option<ScenarioDescriptor>, SwitchgearError> {
        let scenarios = scenario::load_list(&self.list_path)?;
        let already_run: HashSet<String> =
            lock::locked_names(&self.queue_dir)?.into_iter().collect();

        for candidate in scenarios {
            if !already_run.contains(&candidate.name)
                && self.checkout(&candidate.name, false)? == Checkout::Won
            {
                self.ran.push(candidate.name.clone());
                return Ok(Some(candidate));
            }
            if !self.skipped.contains(&candidate.name) && !self.ran.contains(&candidate.name) {
                tracing::debug!("Skipping {} because it was already run", candidate.name);
                self.skipped.push(candidate.name);
            }
        }
        Ok(None)
    }

    /// Run scenarios until the list is exhausted, or run exactly the
    /// `requested` ones (forced, in the given order).
    ///
    /// A scenario whose runner fails keeps its lock. Errors that terminate
    /// the whole run are returned; others are logged and the worker moves
    /// on.
    pub fn run<F>(
        &mut self,
        requested: &[String],
        mut runner: F,
    ) -> Result<QueueSummary, SwitchgearError>
    where
        F: FnMut(&ScenarioDescriptor) -> Result<(), SwitchgearError>,
    {
        self.recover()?;
        let mut summary = QueueSummary::default();

        if !requested.is_empty() {
            for name in requested {
                let scenario = self.find_requested(name)?;
                self.checkout(&scenario.name, true)?;
                self.run_one(&scenario, &mut runner, &mut summary)?;
            }
            return Ok(summary);
        }

        while let Some(scenario) = self.next_scenario()? {
            self.run_one(&scenario, &mut runner, &mut summary)?;
        }

        summary.skipped = self
            .skipped
            .iter()
            .filter(|name| !self.ran.contains(name))
            .cloned()
            .collect();
        if !summary.skipped.is_empty() && self.ran.is_empty() {
            tracing::info!(
                "Skipping all scenarios because they have already been solved. \
                 To run them again, remove the {} directory or its contents",
                self.queue_dir.display()
            );
        }
        Ok(summary)
    }

    fn find_requested(&self, name: &str) -> Result<ScenarioDescriptor, SwitchgearError> {
        scenario::load_list(&self.list_path)?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| {
                SwitchgearError::config(format!(
                    "Scenario '{}' is not defined in {}",
                    name,
                    self.list_path.display()
                ))
            })
    }

    fn run_one<F>(
        &mut self,
        scenario: &ScenarioDescriptor,
        runner: &mut F,
        summary: &mut QueueSummary,
    ) -> Result<(), SwitchgearError>
    where
        F: FnMut(&ScenarioDescriptor) -> Result<(), SwitchgearError>,
    {
        tracing::info!(
            "Running scenario {} (arguments: {})",
            scenario.name,
            scenario.args.join(" ")
        );
        match runner(scenario) {
            Ok(()) => {
                self.mark_completed(&scenario.name)?;
                summary.completed.push(scenario.name.clone());
                Ok(())
            }
            Err(e) => {
                self.journal.remove(&scenario.name)?;
                if e.terminates_run() {
                    return Err(e);
                }
                tracing::error!(
                    "Scenario {} failed: {} (its lock in {} is kept)",
                    scenario.name,
                    e,
                    self.queue_dir.display()
                );
                summary.failed.push(scenario.name.clone());
                Ok(())
            }
        }
    }
}
