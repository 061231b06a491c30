// src/model/mod.rs — The composed model: components, registries, data

pub mod assembler;
pub mod checks;
pub mod component;
pub mod context;
pub mod data;
pub mod instance;

pub use component::{Component, ComponentKind};
pub use context::{AbstractModel, AssemblyContext, Phase};
pub use data::{DataLoader, JsonDataLoader, ModelData};
pub use instance::{ModelInstance, Solution};
