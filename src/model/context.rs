// src/model/context.rs — Assembly context shared by every module during assembly

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::infra::errors::SwitchgearError;
use crate::model::checks::DataCheck;
use crate::model::component::{Component, ComponentKind};

/// Assembly phases. Every module finishes one phase before any module
/// starts the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    #[default]
    Setup,
    DeclareRegistries,
    DeclareComponents,
    DeclareDependentComponents,
    Frozen,
}

impl Phase {
    pub const ASSEMBLY: [Phase; 3] = [
        Phase::DeclareRegistries,
        Phase::DeclareComponents,
        Phase::DeclareDependentComponents,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::DeclareRegistries => "declare-registries",
            Self::DeclareComponents => "declare-components",
            Self::DeclareDependentComponents => "declare-dependent-components",
            Self::Frozen => "frozen",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named, append-only collection filled by any module in phase 2 and
/// consumed whole in phase 3.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Registry {
    pub owner: String,
    pub entries: Vec<RegistryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryEntry {
    pub value: String,
    pub contributor: String,
}

impl Registry {
    pub fn values(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.value.clone()).collect()
    }
}

/// Everything a module may touch while the model is being assembled.
///
/// The assembler moves the context through the phases and tells it which
/// module is currently running, so every error names its module.
#[derive(Debug, Default)]
pub struct AssemblyContext {
    phase: Phase,
    current_module: String,
    registries: BTreeMap<String, Registry>,
    components: Vec<Component>,
    component_index: HashMap<String, usize>,
    checks: Vec<DataCheck>,
    options: BTreeMap<String, String>,
}

impl AssemblyContext {
    pub fn new(options: BTreeMap<String, String>) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_module(&self) -> &str {
        &self.current_module
    }

    pub fn begin_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.current_module.clear();
    }

    pub fn enter_module(&mut self, name: &str) {
        self.current_module = name.to_string();
    }

    /// Module option set with `--set KEY=VALUE`.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn declare_registry(&mut self, name: &str) -> Result<(), SwitchgearError> {
        self.require_phase("declare a registry", &[Phase::DeclareRegistries])?;
        if let Some(existing) = self.registries.get(name) {
            return Err(SwitchgearError::DuplicateRegistry {
                module: self.current_module.clone(),
                registry: name.to_string(),
                owner: existing.owner.clone(),
            });
        }
        self.registries.insert(
            name.to_string(),
            Registry {
                owner: self.current_module.clone(),
                entries: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn register(&mut self, registry: &str, value: &str) -> Result<(), SwitchgearError> {
        self.require_phase("append to a registry", &[Phase::DeclareComponents])?;
        let module = self.current_module.clone();
        let entry = self.registries.get_mut(registry).ok_or_else(|| {
            SwitchgearError::UnknownRegistry {
                module: module.clone(),
                registry: registry.to_string(),
            }
        })?;
        entry.entries.push(RegistryEntry {
            value: value.to_string(),
            contributor: module,
        });
        Ok(())
    }

    /// Final contents of a registry. Only readable once every module has
    /// finished appending.
    pub fn registry(&self, name: &str) -> Result<Vec<String>, SwitchgearError> {
        self.require_phase(
            "read a registry",
            &[Phase::DeclareDependentComponents, Phase::Frozen],
        )?;
        self.registries
            .get(name)
            .map(Registry::values)
            .ok_or_else(|| SwitchgearError::UnknownRegistry {
                module: self.current_module.clone(),
                registry: name.to_string(),
            })
    }

    pub fn add_component(&mut self, mut component: Component) -> Result<(), SwitchgearError> {
        self.require_phase(
            &format!("add {} '{}'", component.kind.as_str(), component.name),
            &[Phase::DeclareComponents, Phase::DeclareDependentComponents],
        )?;
        if let Some(&i) = self.component_index.get(&component.name) {
            return Err(SwitchgearError::DuplicateComponent {
                module: self.current_module.clone(),
                component: component.name,
                owner: self.components[i].owner.clone(),
            });
        }
        component.owner = self.current_module.clone();
        self.component_index
            .insert(component.name.clone(), self.components.len());
        self.components.push(component);
        Ok(())
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.component_index.get(name).map(|&i| &self.components[i])
    }

    /// Ask for the data of `component` to be checked once inputs are loaded.
    pub fn require_data(&mut self, component: &str) -> Result<(), SwitchgearError> {
        self.require_phase(
            "register a data check",
            &[Phase::DeclareComponents, Phase::DeclareDependentComponents],
        )?;
        self.checks.push(DataCheck {
            component: component.to_string(),
            module: self.current_module.clone(),
        });
        Ok(())
    }

    /// End assembly: verify every reference resolves and hand the result
    /// over as an immutable model.
    pub fn freeze(mut self) -> Result<AbstractModel, SwitchgearError> {
        self.phase = Phase::Frozen;

        for component in &self.components {
            for target in component.references() {
                if !self.component_index.contains_key(target) {
                    return Err(SwitchgearError::DanglingReference {
                        module: component.owner.clone(),
                        component: component.name.clone(),
                        target: target.to_string(),
                    });
                }
            }
            if let Some(index) = &component.index {
                if let Some(set) = self.component(index) {
                    if set.kind != ComponentKind::Set {
                        return Err(SwitchgearError::DanglingReference {
                            module: component.owner.clone(),
                            component: component.name.clone(),
                            target: format!("{index} (not a set)"),
                        });
                    }
                }
            }
        }
        for check in &self.checks {
            match self.component(&check.component) {
                Some(c) if c.kind.takes_data() => {}
                _ => {
                    return Err(SwitchgearError::DanglingReference {
                        module: check.module.clone(),
                        component: format!("data check on '{}'", check.component),
                        target: check.component.clone(),
                    })
                }
            }
        }

        Ok(AbstractModel {
            registries: self.registries,
            components: self.components,
            component_index: self.component_index,
            checks: self.checks,
            options: self.options,
        })
    }

    fn require_phase(&self, action: &str, allowed: &[Phase]) -> Result<(), SwitchgearError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(SwitchgearError::PhaseViolation {
                module: self.current_module.clone(),
                action: action.to_string(),
                phase: self.phase.to_string(),
            })
        }
    }
}

/// The composed model: all registries and components, frozen after
/// assembly and handed to the data loader.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AbstractModel {
    pub registries: BTreeMap<String, Registry>,
    pub components: Vec<Component>,
    #[serde(skip)]
    component_index: HashMap<String, usize>,
    #[serde(skip)]
    pub checks: Vec<DataCheck>,
    pub options: BTreeMap<String, String>,
}

impl AbstractModel {
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.component_index.get(name).map(|&i| &self.components[i])
    }

    pub fn components_of(&self, kind: ComponentKind) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(move |c| c.kind == kind)
    }

    pub fn registry(&self, name: &str) -> Option<Vec<String>> {
        self.registries.get(name).map(Registry::values)
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}
