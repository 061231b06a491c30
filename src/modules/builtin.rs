// src/modules/builtin.rs — Modules compiled into the binary

use crate::infra::errors::SwitchgearError;
use crate::model::component::Component;
use crate::model::context::AssemblyContext;
use crate::modules::extension::ExtensionModule;
use crate::plugins::hooks::{Hook, HookSet};

pub const OBJECTIVE_MODULE: &str = "objective";
pub const OBJECTIVE_TERMS: &str = "objective_terms";
pub const TOTAL_OBJECTIVE: &str = "total_objective";

/// Owns the objective: other modules register cost terms in
/// `objective_terms` and this module sums all of them.
#[derive(Debug, Default)]
pub struct ObjectiveModule;

impl ExtensionModule for ObjectiveModule {
    fn name(&self) -> &str {
        OBJECTIVE_MODULE
    }

    fn hooks(&self) -> HookSet {
        HookSet::empty()
            .with(Hook::DeclareRegistries)
            .with(Hook::DeclareDependentComponents)
    }

    fn declare_registries(&mut self, ctx: &mut AssemblyContext) -> Result<(), SwitchgearError> {
        ctx.declare_registry(OBJECTIVE_TERMS)
    }

    fn declare_dependent_components(
        &mut self,
        ctx: &mut AssemblyContext,
    ) -> Result<(), SwitchgearError> {
        let terms = ctx.registry(OBJECTIVE_TERMS)?;
        if terms.is_empty() {
            tracing::warn!("No module registered an objective term; the objective is empty");
        }
        ctx.add_component(Component::objective(TOTAL_OBJECTIVE, terms))
    }
}

pub type Constructor = fn() -> Box<dyn ExtensionModule>;

fn objective() -> Box<dyn ExtensionModule> {
    Box::new(ObjectiveModule)
}

/// Name and constructor of every built-in module.
pub fn builtin_modules() -> Vec<(&'static str, Constructor)> {
    vec![(OBJECTIVE_MODULE, objective as Constructor)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::component::ComponentKind;
    use crate::model::context::Phase;

    #[test]
    fn test_objective_sums_registered_terms() {
        let mut module = ObjectiveModule;
        let mut ctx = AssemblyContext::default();

        ctx.begin_phase(Phase::DeclareRegistries);
        ctx.enter_module(OBJECTIVE_MODULE);
        module.declare_registries(&mut ctx).unwrap();

        ctx.begin_phase(Phase::DeclareComponents);
        ctx.enter_module("generators");
        ctx.add_component(Component::expression("fuel_cost", vec![]))
            .unwrap();
        ctx.register(OBJECTIVE_TERMS, "fuel_cost").unwrap();

        ctx.begin_phase(Phase::DeclareDependentComponents);
        ctx.enter_module(OBJECTIVE_MODULE);
        module.declare_dependent_components(&mut ctx).unwrap();

        let model = ctx.freeze().unwrap();
        let objective = model.component(TOTAL_OBJECTIVE).unwrap();
        assert_eq!(objective.kind, ComponentKind::Objective);
        assert_eq!(objective.terms, vec!["fuel_cost".to_string()]);
        assert_eq!(objective.owner, OBJECTIVE_MODULE);
    }

    #[test]
    fn test_builtin_names() {
        let names: Vec<&str> = builtin_modules().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec![OBJECTIVE_MODULE]);
    }
}
