// src/modules/resolver.rs — Final module list from a list file plus edits

use std::path::Path;

use crate::infra::errors::SwitchgearError;
use crate::infra::paths;
use crate::util;

/// One `--include-module(s)` or `--exclude-module(s)` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleEdit {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

/// Read the base module list.
///
/// An explicit path must exist. Without one, `./modules.txt` and then
/// `<inputs_dir>/modules.txt` are tried; finding neither is only a warning.
pub fn read_base_list(
    explicit: Option<&Path>,
    inputs_dir: &Path,
) -> Result<Vec<String>, SwitchgearError> {
    if let Some(path) = explicit {
        return util::read_list_file(path)?.ok_or_else(|| {
            SwitchgearError::config(format!("Module list file {} not found", path.display()))
        });
    }

    for candidate in paths::module_list_candidates(inputs_dir) {
        if let Some(names) = util::read_list_file(&candidate)? {
            tracing::debug!(
                "Read {} modules from {}",
                names.len(),
                candidate.display()
            );
            return Ok(names);
        }
    }

    tracing::warn!(
        "No module list found (tried {} and {}); starting from an empty module list",
        paths::MODULE_LIST_FILE,
        inputs_dir.join(paths::MODULE_LIST_FILE).display()
    );
    Ok(Vec::new())
}

/// Apply edits in order to the base list. Includes append names that are
/// not already present; excluding a name that is not present fails.
pub fn resolve(base: &[String], edits: &[ModuleEdit]) -> Result<Vec<String>, SwitchgearError> {
    let mut modules: Vec<String> = Vec::with_capacity(base.len());
    for name in base {
        if !modules.contains(name) {
            modules.push(name.clone());
        }
    }

    for edit in edits {
        match edit {
            ModuleEdit::Include(names) => {
                for name in names {
                    if !modules.contains(name) {
                        modules.push(name.clone());
                    }
                }
            }
            ModuleEdit::Exclude(names) => {
                for name in names {
                    let pos = modules.iter().position(|m| m == name).ok_or_else(|| {
                        SwitchgearError::ExcludeNotPresent { name: name.clone() }
                    })?;
                    modules.remove(pos);
                }
            }
        }
    }

    Ok(modules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_include_appends_without_duplicates() {
        let base = names(&["timescales", "balancing"]);
        let edits = vec![
            ModuleEdit::Include(names(&["hydro", "timescales"])),
            ModuleEdit::Include(names(&["hydro"])),
        ];
        assert_eq!(
            resolve(&base, &edits).unwrap(),
            names(&["timescales", "balancing", "hydro"])
        );
    }

    #[test]
    fn test_edits_apply_in_order() {
        let base = names(&["a", "b"]);
        let edits = vec![
            ModuleEdit::Exclude(names(&["a"])),
            ModuleEdit::Include(names(&["a"])),
        ];
        assert_eq!(resolve(&base, &edits).unwrap(), names(&["b", "a"]));
    }

    #[test]
    fn test_exclude_absent_name_fails() {
        let err = resolve(&names(&["a"]), &[ModuleEdit::Exclude(names(&["zzz"]))]).unwrap_err();
        assert!(matches!(err, SwitchgearError::ExcludeNotPresent { ref name } if name == "zzz"));
    }

    #[test]
    fn test_duplicate_base_entries_collapse() {
        assert_eq!(
            resolve(&names(&["a", "b", "a"]), &[]).unwrap(),
            names(&["a", "b"])
        );
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let base = names(&["a", "b", "c"]);
        let edits = vec![
            ModuleEdit::Include(names(&["d"])),
            ModuleEdit::Exclude(names(&["b"])),
        ];
        assert_eq!(
            resolve(&base, &edits).unwrap(),
            resolve(&base, &edits).unwrap()
        );
    }

    #[test]
    fn test_explicit_list_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("mods.txt");
        assert!(read_base_list(Some(&missing), dir.path()).is_err());
    }

    #[test]
    fn test_inputs_dir_list_is_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("modules.txt"), "# core\nobjective\n").unwrap();
        // ./modules.txt is looked at first; this test runs from the crate root
        // where no such file exists.
        let list = read_base_list(None, dir.path()).unwrap();
        assert_eq!(list, names(&["objective"]));
    }
}
