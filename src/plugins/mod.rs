// src/plugins/mod.rs — Lifecycle hooks and the Rhai host for script modules

pub mod hooks;
pub mod rhai_host;
