// src/model/checks.rs — Deferred data-integrity checks run after loading

use serde::Serialize;

use crate::infra::errors::SwitchgearError;
use crate::model::component::{Component, ComponentKind};
use crate::model::context::AbstractModel;
use crate::model::data::{ComponentData, ModelData};

/// Number of missing keys quoted in a data-integrity error.
pub const MISSING_SAMPLE_SIZE: usize = 10;

/// A request, made during assembly, that a set or param be fully populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataCheck {
    pub component: String,
    pub module: String,
}

/// Run every registered check against the loaded data. The first failing
/// component is reported.
pub fn validate(model: &AbstractModel, data: &ModelData) -> Result<(), SwitchgearError> {
    for check in &model.checks {
        let Some(component) = model.component(&check.component) else {
            continue;
        };
        check_component(component, data)?;
    }
    Ok(())
}

fn check_component(component: &Component, data: &ModelData) -> Result<(), SwitchgearError> {
    let missing: Vec<String> = match (component.kind, component.index.as_deref()) {
        (ComponentKind::Set, _) => {
            if data.set_members(&component.name).is_empty() {
                return Err(missing_data(component, Vec::new()));
            }
            Vec::new()
        }
        (ComponentKind::Param, None) => {
            if component.default.is_none() && data.param(&component.name, None).is_none() {
                return Err(missing_data(component, Vec::new()));
            }
            Vec::new()
        }
        (ComponentKind::Param, Some(index)) => {
            if component.default.is_some() {
                return Ok(());
            }
            let provided = match data.get(&component.name) {
                Some(ComponentData::Indexed(map)) => Some(map),
                _ => None,
            };
            data.set_members(index)
                .iter()
                .filter(|key| provided.map_or(true, |map| !map.contains_key(key.as_str())))
                .cloned()
                .collect()
        }
        _ => Vec::new(),
    };

    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing_data(component, missing))
    }
}

fn missing_data(component: &Component, mut missing: Vec<String>) -> SwitchgearError {
    let total = missing.len();
    missing.truncate(MISSING_SAMPLE_SIZE);
    SwitchgearError::MissingData {
        component: component.name.clone(),
        table: component.table.clone(),
        total,
        sample: missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::context::{AssemblyContext, Phase};
    use std::collections::BTreeMap;

    fn model_with(components: Vec<Component>, checked: &[&str]) -> AbstractModel {
        let mut ctx = AssemblyContext::default();
        ctx.begin_phase(Phase::DeclareComponents);
        ctx.enter_module("test");
        for c in components {
            ctx.add_component(c).unwrap();
        }
        for name in checked {
            ctx.require_data(name).unwrap();
        }
        ctx.freeze().unwrap()
    }

    #[test]
    fn test_indexed_param_reports_sample_and_total() {
        let model = model_with(
            vec![
                Component::set("GENS").from_table("generators"),
                Component::param("capacity")
                    .indexed_by("GENS")
                    .from_table("generators"),
            ],
            &["capacity"],
        );
        let mut data = ModelData::new();
        let gens: Vec<String> = (0..15).map(|i| format!("g{i:02}")).collect();
        data.insert("GENS", ComponentData::Set(gens));
        let mut caps = BTreeMap::new();
        caps.insert("g00".to_string(), 100.0);
        data.insert("capacity", ComponentData::Indexed(caps));

        match validate(&model, &data).unwrap_err() {
            SwitchgearError::MissingData {
                component,
                table,
                total,
                sample,
            } => {
                assert_eq!(component, "capacity");
                assert_eq!(table.as_deref(), Some("generators"));
                assert_eq!(total, 14);
                assert_eq!(sample.len(), MISSING_SAMPLE_SIZE);
                assert_eq!(sample[0], "g01");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_complete_data_passes() {
        let model = model_with(
            vec![
                Component::set("GENS"),
                Component::param("capacity").indexed_by("GENS"),
                Component::param("rate"),
            ],
            &["GENS", "capacity", "rate"],
        );
        let mut data = ModelData::new();
        data.insert("GENS", ComponentData::Set(vec!["a".into()]));
        let mut caps = BTreeMap::new();
        caps.insert("a".to_string(), 1.0);
        data.insert("capacity", ComponentData::Indexed(caps));
        data.insert("rate", ComponentData::Scalar(0.07));
        validate(&model, &data).unwrap();
    }

    #[test]
    fn test_empty_set_fails() {
        let model = model_with(vec![Component::set("ZONES")], &["ZONES"]);
        let err = validate(&model, &ModelData::new()).unwrap_err();
        assert!(matches!(err, SwitchgearError::MissingData { total: 0, .. }));
    }

    #[test]
    fn test_default_covers_missing_values() {
        let model = model_with(
            vec![
                Component::set("GENS"),
                Component::param("outage").indexed_by("GENS").with_default(0.0),
                Component::param("scale").with_default(1.0),
            ],
            &["outage", "scale"],
        );
        let mut data = ModelData::new();
        data.insert("GENS", ComponentData::Set(vec!["a".into(), "b".into()]));
        validate(&model, &data).unwrap();
    }

    #[test]
    fn test_unchecked_components_are_ignored() {
        let model = model_with(vec![Component::set("ZONES")], &[]);
        validate(&model, &ModelData::new()).unwrap();
    }
}
