// src/model/assembler.rs — Three-phase model assembly

use std::collections::BTreeMap;

use crate::infra::errors::SwitchgearError;
use crate::model::context::{AbstractModel, AssemblyContext, Phase};
use crate::modules::loader::ModuleSet;

/// Run every module through the three assembly phases and freeze the
/// result. A phase is finished for all modules before the next begins, so
/// phase-3 consumers see every registry entry whatever the load order.
pub fn assemble(
    modules: &mut ModuleSet,
    options: BTreeMap<String, String>,
) -> Result<AbstractModel, SwitchgearError> {
    let mut ctx = AssemblyContext::new(options);

    for phase in Phase::ASSEMBLY {
        ctx.begin_phase(phase);
        for module in modules.iter_mut() {
            ctx.enter_module(module.name());
            match phase {
                Phase::DeclareRegistries => module.declare_registries(&mut ctx)?,
                Phase::DeclareComponents => module.declare_components(&mut ctx)?,
                Phase::DeclareDependentComponents => {
                    module.declare_dependent_components(&mut ctx)?
                }
                Phase::Setup | Phase::Frozen => {}
            }
        }
        tracing::debug!("Assembly phase {} complete", phase);
    }

    let model = ctx.freeze()?;
    tracing::info!(
        "Assembled model: {} components, {} registries",
        model.component_count(),
        model.registries.len()
    );
    Ok(model)
}
