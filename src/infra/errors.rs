// src/infra/errors.rs — Error types for Switchgear

use thiserror::Error;

/// Coarse classification used by the run drivers to decide what a failure
/// means for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Assembly,
    DataIntegrity,
    SolveOutcome,
    Infeasible,
    Runtime,
}

#[derive(Error, Debug)]
pub enum SwitchgearError {
    // Configuration errors (fatal for the whole run)
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Cannot exclude module '{name}': it is not in the module list")]
    ExcludeNotPresent { name: String },

    #[error("Unknown module '{name}'{}", format_suggestions(.suggestions))]
    UnknownModule {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("Module '{module}' requires '{prerequisite}', which is not loaded")]
    MissingPrerequisite {
        module: String,
        prerequisite: String,
    },

    #[error("Iteration level {level} names module '{module}', which is not loaded")]
    IterationModuleNotLoaded { level: usize, module: String },

    #[error("Iteration plan has {depth} levels; the maximum is {max}")]
    IterationTooDeep { depth: usize, max: usize },

    // Assembly errors (fatal, name the offending module)
    #[error("Module '{module}' used undeclared registry '{registry}'")]
    UnknownRegistry { module: String, registry: String },

    #[error("Module '{module}' re-declared registry '{registry}' (first declared by '{owner}')")]
    DuplicateRegistry {
        module: String,
        registry: String,
        owner: String,
    },

    #[error("Module '{module}' re-defined component '{component}' (first defined by '{owner}')")]
    DuplicateComponent {
        module: String,
        component: String,
        owner: String,
    },

    #[error("Module '{module}' cannot {action} during the {phase} phase")]
    PhaseViolation {
        module: String,
        action: String,
        phase: String,
    },

    #[error("Component '{component}' (module '{module}') refers to unknown component '{target}'")]
    DanglingReference {
        module: String,
        component: String,
        target: String,
    },

    // Data integrity (deferred post-load validation)
    #[error("{}", format_missing_data(.component, .table, .total, .sample))]
    MissingData {
        component: String,
        table: Option<String>,
        total: usize,
        sample: Vec<String>,
    },

    // Solve outcomes
    #[error("Solver returned no usable solution (status '{status}', termination '{termination}')")]
    NoSolution { status: String, termination: String },

    #[error("Model is infeasible (solver '{solver}', termination '{termination}')")]
    Infeasible { solver: String, termination: String },

    #[error("Solver '{solver}' failed: {message}")]
    Solver { solver: String, message: String },

    // Extension scripts
    #[error("Script module '{module}' failed in {hook}: {message}")]
    Script {
        module: String,
        hook: String,
        message: String,
    },

    // Infra
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SwitchgearError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_)
            | Self::ExcludeNotPresent { .. }
            | Self::UnknownModule { .. }
            | Self::MissingPrerequisite { .. }
            | Self::IterationModuleNotLoaded { .. }
            | Self::IterationTooDeep { .. } => ErrorKind::Configuration,
            Self::UnknownRegistry { .. }
            | Self::DuplicateRegistry { .. }
            | Self::DuplicateComponent { .. }
            | Self::PhaseViolation { .. }
            | Self::DanglingReference { .. } => ErrorKind::Assembly,
            Self::MissingData { .. } => ErrorKind::DataIntegrity,
            Self::NoSolution { .. } => ErrorKind::SolveOutcome,
            Self::Infeasible { .. } => ErrorKind::Infeasible,
            Self::Solver { .. }
            | Self::Script { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => ErrorKind::Runtime,
        }
    }

    /// Configuration, assembly and data-integrity failures stop every
    /// remaining scenario, not just the current one.
    pub fn terminates_run(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Configuration | ErrorKind::Assembly | ErrorKind::DataIntegrity
        )
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

fn format_missing_data(
    component: &str,
    table: &Option<String>,
    total: &usize,
    sample: &[String],
) -> String {
    let mut msg = format!(
        "Values are not provided for every element of the mandatory component '{component}'"
    );
    if let Some(table) = table {
        msg.push_str(&format!(" (table '{table}')"));
    }
    if *total > 0 {
        msg.push_str(&format!(
            ". Missing data for {total} values, including: {}",
            sample.join(", ")
        ));
    }
    msg
}
