// src/queue/mod.rs — Filesystem-locked scenario queue

pub mod identity;
pub mod journal;
pub mod lock;
pub mod manager;
pub mod scenario;

pub use manager::{Checkout, QueueSummary, ScenarioQueue};
pub use scenario::ScenarioDescriptor;
