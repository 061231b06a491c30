// tests/queue_test.rs — Integration test: scenario queue with concurrent workers

use std::path::Path;
use std::sync::{Arc, Barrier, Mutex};

use pretty_assertions::assert_eq;

use switchgear::infra::paths;
use switchgear::queue::journal::RunningJournal;
use switchgear::queue::lock;
use switchgear::queue::{Checkout, ScenarioQueue};

fn write_list(dir: &Path, content: &str) {
    std::fs::write(dir.join("scenarios.txt"), content).unwrap();
}

fn worker(dir: &Path, job_id: &str) -> ScenarioQueue {
    ScenarioQueue::open(dir.join("scenarios.txt"), dir.join("queue"), job_id).unwrap()
}

#[test]
fn test_two_workers_split_the_list() {
    let dir = tempfile::tempdir().unwrap();
    write_list(dir.path(), "scen1 --opt 1\nscen2 --opt 2\n");

    let runs = Arc::new(Mutex::new(Vec::new()));
    let start = Barrier::new(2);
    std::thread::scope(|s| {
        for job_id in ["w1", "w2"] {
            let runs = Arc::clone(&runs);
            let start = &start;
            let root = dir.path();
            s.spawn(move || {
                let mut queue = worker(root, job_id);
                start.wait();
                queue
                    .run(&[], |scenario| {
                        runs.lock()
                            .unwrap()
                            .push((scenario.name.clone(), scenario.solve_args()));
                        Ok(())
                    })
                    .unwrap();
            });
        }
    });

    let mut runs = runs.lock().unwrap().clone();
    runs.sort();
    assert_eq!(
        runs,
        vec![
            (
                "scen1".to_string(),
                vec!["--scenario-name", "scen1", "--opt", "1"]
                    .into_iter()
                    .map(String::from)
                    .collect::<Vec<_>>()
            ),
            (
                "scen2".to_string(),
                vec!["--scenario-name", "scen2", "--opt", "2"]
                    .into_iter()
                    .map(String::from)
                    .collect::<Vec<_>>()
            ),
        ]
    );
}

#[test]
fn test_lock_directory_is_mutually_exclusive() {
    let dir = tempfile::tempdir().unwrap();
    let queue_dir = dir.path().join("queue");
    std::fs::create_dir_all(&queue_dir).unwrap();

    let workers = 16;
    let barrier = Barrier::new(workers);
    let winners = Mutex::new(0usize);
    std::thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(|| {
                barrier.wait();
                if lock::try_lock(&queue_dir, "contested").unwrap() {
                    *winners.lock().unwrap() += 1;
                }
            });
        }
    });
    assert_eq!(*winners.lock().unwrap(), 1);
}

#[test]
fn test_many_workers_run_each_scenario_once() {
    let dir = tempfile::tempdir().unwrap();
    let names: Vec<String> = (0..12).map(|i| format!("s{i:02}")).collect();
    write_list(dir.path(), &format!("{}\n", names.join("\n")));

    let runs = Mutex::new(Vec::new());
    let barrier = Barrier::new(4);
    std::thread::scope(|s| {
        for w in 0..4 {
            let runs = &runs;
            let barrier = &barrier;
            let root = dir.path();
            s.spawn(move || {
                let mut queue = worker(root, &format!("w{w}"));
                barrier.wait();
                queue
                    .run(&[], |scenario| {
                        runs.lock().unwrap().push(scenario.name.clone());
                        Ok(())
                    })
                    .unwrap();
            });
        }
    });

    let mut runs = runs.into_inner().unwrap();
    runs.sort();
    assert_eq!(runs, names);
}

#[test]
fn test_crash_recovery_requeues_interrupted_scenario() {
    let dir = tempfile::tempdir().unwrap();
    write_list(dir.path(), "scen1\nscen2\n");
    let queue_dir = dir.path().join("queue");

    // A worker that died while running scen1.
    {
        let mut crashed = worker(dir.path(), "task7");
        assert_eq!(crashed.checkout("scen1", false).unwrap(), Checkout::Won);
    }
    // scen2 finished normally elsewhere.
    lock::try_lock(&queue_dir, "scen2").unwrap();
    assert_eq!(
        RunningJournal::open(paths::journal_path(&queue_dir, "task7"))
            .unwrap()
            .entries(),
        &["scen1".to_string()]
    );

    let mut restarted = worker(dir.path(), "task7");
    let summary = restarted.run(&[], |_| Ok(())).unwrap();
    assert_eq!(summary.completed, vec!["scen1".to_string()]);
    assert!(lock::is_locked(&queue_dir, "scen1"));
    assert!(lock::is_locked(&queue_dir, "scen2"));
    assert!(!paths::journal_path(&queue_dir, "task7").exists());
}

#[test]
fn test_other_identity_does_not_release_locks() {
    let dir = tempfile::tempdir().unwrap();
    write_list(dir.path(), "scen1\n");
    {
        let mut crashed = worker(dir.path(), "task7");
        crashed.checkout("scen1", false).unwrap();
    }

    let mut other = worker(dir.path(), "task8");
    let summary = other.run(&[], |_| panic!("scen1 belongs to task7")).unwrap();
    assert!(summary.completed.is_empty());
    assert_eq!(summary.skipped, vec!["scen1".to_string()]);
}

#[test]
fn test_explicit_scenarios_are_forced() {
    let dir = tempfile::tempdir().unwrap();
    write_list(dir.path(), "scen1 --opt 1\nscen2 --opt 2\n");
    std::fs::create_dir_all(dir.path().join("queue/scen2")).unwrap();

    let mut queue = worker(dir.path(), "w1");
    let mut ran = Vec::new();
    let summary = queue
        .run(&["scen2".to_string(), "scen1".to_string()], |scenario| {
            ran.push(scenario.name.clone());
            Ok(())
        })
        .unwrap();
    assert_eq!(ran, vec!["scen2", "scen1"]);
    assert_eq!(summary.completed, vec!["scen2".to_string(), "scen1".to_string()]);
}

#[test]
fn test_recovery_releases_only_interrupted_names() {
    let dir = tempfile::tempdir().unwrap();
    write_list(dir.path(), "run\nrun-2\n");
    let queue_dir = dir.path().join("queue");

    let mut w0 = worker(dir.path(), "w0");
    assert_eq!(w0.checkout("run", false).unwrap(), Checkout::Won);
    w0.mark_completed("run").unwrap();
    {
        let mut crashed = worker(dir.path(), "w1");
        assert_eq!(crashed.checkout("run-2", false).unwrap(), Checkout::Won);
    }

    let mut restarted = worker(dir.path(), "w1");
    assert_eq!(restarted.recover().unwrap(), vec!["run-2".to_string()]);
    assert!(lock::is_locked(&queue_dir, "run"));
    assert!(!lock::is_locked(&queue_dir, "run-2"));
}

#[test]
fn test_comment_character_in_scenario_name_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_list(dir.path(), "run\n'run#2' --opt 1\n");

    let mut queue = worker(dir.path(), "w1");
    let err = queue
        .run(&[], |_| panic!("no scenario may run from an invalid list"))
        .unwrap_err();
    assert!(err.terminates_run());
    assert!(!lock::is_locked(&dir.path().join("queue"), "run"));
}
