// src/model/data.rs — Input data for a model and the loader collaborator

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::infra::errors::SwitchgearError;
use crate::infra::paths;
use crate::model::component::{Component, ComponentKind};
use crate::model::context::AbstractModel;

/// Values loaded for one set or param.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentData {
    Set(Vec<String>),
    Indexed(BTreeMap<String, f64>),
    Scalar(f64),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelData {
    values: BTreeMap<String, ComponentData>,
}

impl ModelData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, component: impl Into<String>, data: ComponentData) {
        self.values.insert(component.into(), data);
    }

    pub fn get(&self, component: &str) -> Option<&ComponentData> {
        self.values.get(component)
    }

    /// Members of a set; empty when the set has no data.
    pub fn set_members(&self, set: &str) -> &[String] {
        match self.values.get(set) {
            Some(ComponentData::Set(members)) => members,
            _ => &[],
        }
    }

    pub fn param(&self, name: &str, key: Option<&str>) -> Option<f64> {
        match (self.values.get(name)?, key) {
            (ComponentData::Scalar(v), None) => Some(*v),
            (ComponentData::Indexed(map), Some(key)) => map.get(key).copied(),
            _ => None,
        }
    }

    /// Overwrite a param value. A keyed write turns a missing entry into an
    /// indexed param.
    pub fn set_param(
        &mut self,
        name: &str,
        key: Option<&str>,
        value: f64,
    ) -> Result<(), SwitchgearError> {
        match key {
            None => match self.values.get(name) {
                Some(ComponentData::Indexed(_)) => Err(SwitchgearError::config(format!(
                    "Param '{name}' is indexed; a key is required"
                ))),
                _ => {
                    self.values
                        .insert(name.to_string(), ComponentData::Scalar(value));
                    Ok(())
                }
            },
            Some(key) => {
                let entry = self
                    .values
                    .entry(name.to_string())
                    .or_insert_with(|| ComponentData::Indexed(BTreeMap::new()));
                match entry {
                    ComponentData::Indexed(map) => {
                        map.insert(key.to_string(), value);
                        Ok(())
                    }
                    _ => Err(SwitchgearError::config(format!(
                        "Param '{name}' is not indexed; cannot set key '{key}'"
                    ))),
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Populates a frozen model from external data.
pub trait DataLoader {
    fn load(&self, model: &AbstractModel) -> Result<ModelData, SwitchgearError>;
}

/// Reads `<inputs_dir>/<table>.json`, one JSON object per table mapping
/// component names to values. Sets are arrays, scalar params are numbers
/// and indexed params are objects keyed by set member.
pub struct JsonDataLoader {
    inputs_dir: PathBuf,
}

impl JsonDataLoader {
    pub fn new(inputs_dir: impl Into<PathBuf>) -> Self {
        Self {
            inputs_dir: inputs_dir.into(),
        }
    }

    pub fn inputs_dir(&self) -> &Path {
        &self.inputs_dir
    }

    fn read_table(
        &self,
        table: &str,
    ) -> Result<Option<serde_json::Map<String, serde_json::Value>>, SwitchgearError> {
        let path = self.inputs_dir.join(format!("{table}.json"));
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No input table {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<serde_json::Value>(&content)? {
            serde_json::Value::Object(map) => Ok(Some(map)),
            _ => Err(SwitchgearError::config(format!(
                "Input table {} must be a JSON object",
                path.display()
            ))),
        }
    }
}

impl DataLoader for JsonDataLoader {
    fn load(&self, model: &AbstractModel) -> Result<ModelData, SwitchgearError> {
        let mut by_table: BTreeMap<&str, Vec<&Component>> = BTreeMap::new();
        for component in model.components.iter().filter(|c| c.kind.takes_data()) {
            let table = component
                .table
                .as_deref()
                .unwrap_or(paths::DEFAULT_DATA_TABLE);
            by_table.entry(table).or_default().push(component);
        }

        let mut data = ModelData::new();
        for (table, components) in by_table {
            let Some(rows) = self.read_table(table)? else {
                continue;
            };
            for component in components {
                if let Some(value) = rows.get(&component.name) {
                    data.insert(component.name.clone(), convert(component, table, value)?);
                }
            }
        }

        tracing::debug!(
            "Loaded data for {} components from {}",
            data.len(),
            self.inputs_dir.display()
        );
        Ok(data)
    }
}

fn convert(
    component: &Component,
    table: &str,
    value: &serde_json::Value,
) -> Result<ComponentData, SwitchgearError> {
    use serde_json::Value;

    let bad = || {
        SwitchgearError::config(format!(
            "Table '{table}': unsupported value for {} '{}'",
            component.kind.as_str(),
            component.name
        ))
    };

    match (component.kind, value) {
        (ComponentKind::Set, Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                _ => Err(bad()),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ComponentData::Set),
        (ComponentKind::Param, Value::Number(n)) => {
            n.as_f64().map(ComponentData::Scalar).ok_or_else(bad)
        }
        (ComponentKind::Param, Value::Object(map)) => map
            .iter()
            .map(|(k, v)| v.as_f64().map(|v| (k.clone(), v)).ok_or_else(bad))
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(ComponentData::Indexed),
        _ => Err(bad()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::context::{AssemblyContext, Phase};

    fn sample_model() -> AbstractModel {
        let mut ctx = AssemblyContext::default();
        ctx.begin_phase(Phase::DeclareComponents);
        ctx.enter_module("zones");
        ctx.add_component(Component::set("ZONES").from_table("zones"))
            .unwrap();
        ctx.add_component(
            Component::param("demand")
                .indexed_by("ZONES")
                .from_table("zones"),
        )
        .unwrap();
        ctx.add_component(Component::param("discount_rate")).unwrap();
        ctx.add_component(Component::var("flow").indexed_by("ZONES"))
            .unwrap();
        ctx.freeze().unwrap()
    }

    #[test]
    fn test_json_loader_reads_tables() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("zones.json"),
            r#"{"ZONES": ["north", "south"], "demand": {"north": 10.5, "south": 4}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("data.json"), r#"{"discount_rate": 0.05}"#).unwrap();

        let data = JsonDataLoader::new(dir.path()).load(&sample_model()).unwrap();
        assert_eq!(data.set_members("ZONES"), ["north", "south"]);
        assert_eq!(data.param("demand", Some("north")), Some(10.5));
        assert_eq!(data.param("demand", Some("south")), Some(4.0));
        assert_eq!(data.param("discount_rate", None), Some(0.05));
        assert!(data.get("flow").is_none());
    }

    #[test]
    fn test_missing_table_is_absent_data() {
        let dir = tempfile::tempdir().unwrap();
        let data = JsonDataLoader::new(dir.path()).load(&sample_model()).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_wrong_shape_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("zones.json"), r#"{"ZONES": 3}"#).unwrap();
        let err = JsonDataLoader::new(dir.path())
            .load(&sample_model())
            .unwrap_err();
        assert!(err.to_string().contains("'ZONES'"));
    }

    #[test]
    fn test_set_param_keyed_and_scalar() {
        let mut data = ModelData::new();
        data.set_param("price", Some("north"), 3.0).unwrap();
        data.set_param("rate", None, 0.1).unwrap();
        assert_eq!(data.param("price", Some("north")), Some(3.0));
        assert_eq!(data.param("rate", None), Some(0.1));
        assert!(data.set_param("price", None, 1.0).is_err());
        assert!(data.set_param("rate", Some("x"), 1.0).is_err());
    }
}
