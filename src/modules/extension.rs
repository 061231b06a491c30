// src/modules/extension.rs — The extension module interface
//
// Every hook has a no-op default, so a module implements only the stages
// it takes part in and reports those through `hooks()`.

use crate::core::iterate::IterationContext;
use crate::infra::errors::SwitchgearError;
use crate::model::context::AssemblyContext;
use crate::model::instance::ModelInstance;
use crate::plugins::hooks::HookSet;

/// A hook's opinion on whether its iteration level has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Converged,
    NotConverged,
    Abstain,
}

impl Vote {
    /// Combine votes for one round: any `NotConverged` blocks, abstentions
    /// leave the running result alone.
    pub fn fold(converged: bool, vote: Vote) -> bool {
        match vote {
            Vote::Converged => converged,
            Vote::NotConverged => false,
            Vote::Abstain => converged,
        }
    }
}

impl From<bool> for Vote {
    fn from(converged: bool) -> Self {
        if converged {
            Vote::Converged
        } else {
            Vote::NotConverged
        }
    }
}

impl From<Option<bool>> for Vote {
    fn from(vote: Option<bool>) -> Self {
        vote.map_or(Vote::Abstain, Vote::from)
    }
}

pub trait ExtensionModule {
    fn name(&self) -> &str;

    /// Hooks this module implements.
    fn hooks(&self) -> HookSet;

    /// Modules that must also be part of the module set.
    fn prerequisites(&self) -> Vec<String> {
        Vec::new()
    }

    /// Modules loaded right after this one (package modules).
    fn members(&self) -> Vec<String> {
        Vec::new()
    }

    /// Add this module's own command-line flags to `command`. Parsed values
    /// are readable during assembly through `AssemblyContext::option`,
    /// keyed by argument id.
    fn declare_arguments(&self, command: clap::Command) -> clap::Command {
        command
    }

    fn declare_registries(&mut self, _ctx: &mut AssemblyContext) -> Result<(), SwitchgearError> {
        Ok(())
    }

    fn declare_components(&mut self, _ctx: &mut AssemblyContext) -> Result<(), SwitchgearError> {
        Ok(())
    }

    fn declare_dependent_components(
        &mut self,
        _ctx: &mut AssemblyContext,
    ) -> Result<(), SwitchgearError> {
        Ok(())
    }

    fn pre_solve(&mut self, _instance: &mut ModelInstance) -> Result<(), SwitchgearError> {
        Ok(())
    }

    fn pre_iterate(&mut self, _ctx: &mut IterationContext<'_>) -> Result<Vote, SwitchgearError> {
        Ok(Vote::Abstain)
    }

    fn post_iterate(&mut self, _ctx: &mut IterationContext<'_>) -> Result<Vote, SwitchgearError> {
        Ok(Vote::Abstain)
    }

    fn post_solve(&mut self, _instance: &mut ModelInstance) -> Result<(), SwitchgearError> {
        Ok(())
    }
}
