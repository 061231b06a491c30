// src/lib.rs — Library root for Switchgear

pub mod cli;
pub mod core;
pub mod infra;
pub mod model;
pub mod modules;
pub mod plugins;
pub mod queue;
pub mod util;
