// src/model/instance.rs — A populated model ready for solving

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::context::AbstractModel;
use crate::model::data::ModelData;

/// Values reported by the solver. Indexed variables are keyed `name[key]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub objective: Option<f64>,
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
}

impl Solution {
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// True when at least one value was reported for variable `var`,
    /// either unindexed or under any key.
    pub fn has_values_for(&self, var: &str) -> bool {
        if self.values.contains_key(var) {
            return true;
        }
        let prefix = format!("{var}[");
        self.values
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(k, _)| k.starts_with(&prefix))
    }
}

/// Model plus data plus everything that changes while it is solved.
#[derive(Debug, Clone, Default)]
pub struct ModelInstance {
    pub model: AbstractModel,
    pub data: ModelData,
    pub scenario_name: Option<String>,
    pub outputs_dir: PathBuf,
    /// Round index at every iteration level, outermost first.
    pub iteration_node: Vec<u32>,
    pub iteration_number: u32,
    pub solution: Option<Solution>,
}

impl ModelInstance {
    pub fn new(model: AbstractModel, data: ModelData, outputs_dir: impl Into<PathBuf>) -> Self {
        Self {
            model,
            data,
            outputs_dir: outputs_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_scenario(mut self, name: Option<String>) -> Self {
        self.scenario_name = name;
        self
    }

    pub fn outputs_dir(&self) -> &Path {
        &self.outputs_dir
    }

    /// Iteration node rendered for file names and log lines, e.g. `2_0`.
    pub fn node_label(&self) -> String {
        self.iteration_node
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join("_")
    }

    /// The JSON handed to an external solver.
    pub fn problem_json(&self) -> serde_json::Value {
        serde_json::json!({
            "scenario": self.scenario_name,
            "iteration_node": self.iteration_node,
            "model": self.model,
            "data": self.data,
        })
    }
}
