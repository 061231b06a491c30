// src/modules/loader.rs — Turn module names into loaded extension modules

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::infra::errors::SwitchgearError;
use crate::modules::builtin::builtin_modules;
use crate::modules::descriptor::ModuleDescriptor;
use crate::modules::extension::ExtensionModule;
use crate::plugins::rhai_host::ScriptHost;

type Factory = Box<dyn Fn() -> Box<dyn ExtensionModule>>;

/// Where module names are looked up: native modules first (built-ins and
/// any registered by the embedding program), then `.rhai` scripts.
pub struct ModuleCatalog {
    natives: Vec<(String, Factory, &'static str)>,
    script_dirs: Vec<PathBuf>,
    host: ScriptHost,
}

impl ModuleCatalog {
    /// Catalog with the built-in modules and the given script directories.
    pub fn new(script_dirs: Vec<PathBuf>) -> Self {
        let mut catalog = Self::empty(script_dirs);
        for (name, constructor) in builtin_modules() {
            let factory: Factory = Box::new(constructor);
            catalog.natives.push((name.to_string(), factory, "builtin"));
        }
        catalog
    }

    /// Catalog with no built-ins.
    pub fn empty(script_dirs: Vec<PathBuf>) -> Self {
        Self {
            natives: Vec::new(),
            script_dirs,
            host: ScriptHost::new(),
        }
    }

    /// Make a native module available under `name`. Replaces an existing
    /// entry of the same name.
    pub fn register_native<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn ExtensionModule> + 'static,
    {
        let factory: Factory = Box::new(factory);
        self.natives.retain(|(n, _, _)| n != name);
        self.natives.push((name.to_string(), factory, "native"));
    }

    pub fn script_dirs(&self) -> &[PathBuf] {
        &self.script_dirs
    }

    /// `<dir>/<name with '.' replaced by '/'>.rhai` in the first script
    /// directory that has it.
    pub fn find_script(&self, name: &str) -> Option<PathBuf> {
        let relative = format!("{}.rhai", name.replace('.', "/"));
        self.script_dirs
            .iter()
            .map(|dir| dir.join(&relative))
            .find(|path| path.is_file())
    }

    /// Every name the catalog can load, for suggestions.
    pub fn known_names(&self) -> Vec<String> {
        let mut names: BTreeSet<String> =
            self.natives.iter().map(|(n, _, _)| n.clone()).collect();
        for dir in &self.script_dirs {
            collect_script_names(dir, "", &mut names);
        }
        names.into_iter().collect()
    }

    fn instantiate(&self, name: &str) -> Result<(Box<dyn ExtensionModule>, String), SwitchgearError> {
        if let Some((_, factory, origin)) = self.natives.iter().find(|(n, _, _)| n == name) {
            let module = factory();
            if module.name() != name {
                return Err(SwitchgearError::config(format!(
                    "Native module registered as '{name}' calls itself '{}'",
                    module.name()
                )));
            }
            return Ok((module, origin.to_string()));
        }
        if let Some(path) = self.find_script(name) {
            let module = self.host.load_module(name, &path)?;
            return Ok((Box::new(module), path.display().to_string()));
        }
        Err(SwitchgearError::UnknownModule {
            name: name.to_string(),
            suggestions: suggest(name, &self.known_names()),
        })
    }

    /// Load every named module once, in order. A package's members are
    /// loaded right after the package. Declared prerequisites must all be
    /// present in the result.
    pub fn load(&self, names: &[String]) -> Result<ModuleSet, SwitchgearError> {
        let mut set = ModuleSet::default();
        for name in names {
            self.load_into(name, &mut set)?;
        }
        set.check_prerequisites()?;

        tracing::info!("Loaded {} modules: {}", set.len(), set.names().join(", "));
        Ok(set)
    }

    fn load_into(&self, name: &str, set: &mut ModuleSet) -> Result<(), SwitchgearError> {
        if set.contains(name) {
            return Ok(());
        }
        let (module, origin) = self.instantiate(name)?;
        let members = module.members();
        tracing::debug!("Loading module '{}' ({})", name, origin);
        set.push(module, origin);
        for member in &members {
            self.load_into(member, set)?;
        }
        Ok(())
    }
}

fn collect_script_names(dir: &Path, prefix: &str, names: &mut BTreeSet<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let qualified = if prefix.is_empty() {
            stem.to_string()
        } else {
            format!("{prefix}.{stem}")
        };
        if path.is_dir() {
            collect_script_names(&path, &qualified, names);
        } else if path.extension().is_some_and(|ext| ext == "rhai") {
            names.insert(qualified);
        }
    }
}

/// Close matches for an unknown module name (Jaro-Winkler).
fn suggest(name: &str, known: &[String]) -> Vec<String> {
    let mut scored: Vec<(&str, f64)> = known
        .iter()
        .map(|k| (k.as_str(), strsim::jaro_winkler(k, name)))
        .filter(|(_, score)| *score > 0.7)
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(5);
    scored.into_iter().map(|(k, _)| k.to_string()).collect()
}

/// The loaded modules, in load order, with their descriptors.
#[derive(Default)]
pub struct ModuleSet {
    modules: Vec<Box<dyn ExtensionModule>>,
    descriptors: Vec<ModuleDescriptor>,
}

impl std::fmt::Debug for ModuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleSet")
            .field("descriptors", &self.descriptors)
            .finish_non_exhaustive()
    }
}

impl ModuleSet {
    /// Wrap already-constructed modules, e.g. in tests. Names must be unique.
    pub fn from_modules(modules: Vec<Box<dyn ExtensionModule>>) -> Result<Self, SwitchgearError> {
        let mut set = Self::default();
        for module in modules {
            if set.contains(module.name()) {
                return Err(SwitchgearError::config(format!(
                    "Module '{}' listed twice",
                    module.name()
                )));
            }
            set.push(module, "native".to_string());
        }
        Ok(set)
    }

    fn push(&mut self, module: Box<dyn ExtensionModule>, origin: String) {
        self.descriptors
            .push(ModuleDescriptor::describe(module.as_ref(), origin));
        self.modules.push(module);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.iter().any(|d| d.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.descriptors.iter().position(|d| d.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.descriptors.iter().map(|d| d.name.clone()).collect()
    }

    pub fn descriptors(&self) -> &[ModuleDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut (dyn ExtensionModule + 'static)> {
        self.modules.get_mut(index).map(|m| m.as_mut())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ExtensionModule> {
        self.modules.iter().map(|m| m.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn ExtensionModule>> {
        self.modules.iter_mut()
    }

    fn check_prerequisites(&self) -> Result<(), SwitchgearError> {
        for descriptor in &self.descriptors {
            for prerequisite in &descriptor.prerequisites {
                if !self.contains(prerequisite) {
                    return Err(SwitchgearError::MissingPrerequisite {
                        module: descriptor.name.clone(),
                        prerequisite: prerequisite.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
