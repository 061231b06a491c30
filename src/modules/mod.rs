// src/modules/mod.rs — Extension modules: resolution, loading, built-ins

pub mod arguments;
pub mod builtin;
pub mod descriptor;
pub mod extension;
pub mod loader;
pub mod resolver;

pub use arguments::ArgumentSpec;
pub use extension::{ExtensionModule, Vote};
pub use loader::{ModuleCatalog, ModuleSet};
pub use resolver::ModuleEdit;
