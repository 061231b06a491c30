// src/modules/descriptor.rs — Immutable description of a loaded module

use crate::modules::extension::ExtensionModule;
use crate::plugins::hooks::HookSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub name: String,
    pub prerequisites: Vec<String>,
    pub hooks: HookSet,
    /// Where the module came from: `builtin`, `native` or a script path.
    pub origin: String,
}

impl ModuleDescriptor {
    pub fn describe(module: &dyn ExtensionModule, origin: impl Into<String>) -> Self {
        Self {
            name: module.name().to_string(),
            prerequisites: module.prerequisites(),
            hooks: module.hooks(),
            origin: origin.into(),
        }
    }
}
