// src/plugins/hooks.rs — Extension module lifecycle hooks
//
// Each hook point is a stage of a model run where an extension module can
// contribute components or react to intermediate results.

use std::collections::BTreeSet;

/// Hook points in the model lifecycle, in the order a run reaches them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hook {
    DeclareArguments,
    DeclareRegistries,
    DeclareComponents,
    DeclareDependentComponents,
    PreSolve,
    PreIterate,
    PostIterate,
    PostSolve,
}

impl Hook {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeclareArguments => "declare_arguments",
            Self::DeclareRegistries => "declare_registries",
            Self::DeclareComponents => "declare_components",
            Self::DeclareDependentComponents => "declare_dependent_components",
            Self::PreSolve => "pre_solve",
            Self::PreIterate => "pre_iterate",
            Self::PostIterate => "post_iterate",
            Self::PostSolve => "post_solve",
        }
    }

    /// All known hook variants.
    pub fn all() -> &'static [Hook] {
        &[
            Hook::DeclareArguments,
            Hook::DeclareRegistries,
            Hook::DeclareComponents,
            Hook::DeclareDependentComponents,
            Hook::PreSolve,
            Hook::PreIterate,
            Hook::PostIterate,
            Hook::PostSolve,
        ]
    }

    pub fn from_name(name: &str) -> Option<Hook> {
        Self::all().iter().copied().find(|h| h.as_str() == name)
    }
}

impl std::fmt::Display for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The hooks a module actually provides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookSet(BTreeSet<Hook>);

impl HookSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, hook: Hook) -> Self {
        self.0.insert(hook);
        self
    }

    pub fn insert(&mut self, hook: Hook) {
        self.0.insert(hook);
    }

    pub fn contains(&self, hook: Hook) -> bool {
        self.0.contains(&hook)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Hook> + '_ {
        self.0.iter().copied()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|h| h.as_str()).collect()
    }
}

impl FromIterator<Hook> for HookSet {
    fn from_iter<I: IntoIterator<Item = Hook>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
