// src/model/component.rs — Model components contributed by extension modules

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Set,
    Param,
    Var,
    Expression,
    Constraint,
    Objective,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Param => "param",
            Self::Var => "var",
            Self::Expression => "expression",
            Self::Constraint => "constraint",
            Self::Objective => "objective",
        }
    }

    /// Sets and params are populated from input tables.
    pub fn takes_data(&self) -> bool {
        matches!(self, Self::Set | Self::Param)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sense {
    #[default]
    Minimize,
    Maximize,
}

/// One named piece of the composed model.
///
/// The numeric content of expressions and constraints is opaque here; a
/// component only records which other components it is built from, so the
/// assembler can check that every reference resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub kind: ComponentKind,
    /// Module that defined the component.
    pub owner: String,
    /// Name of the set this component is indexed over.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// Components (or registry entries) combined by this component.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub terms: Vec<String>,
    /// Input table the data for a set/param comes from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sense: Option<Sense>,
}

impl Component {
    pub fn new(kind: ComponentKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            owner: String::new(),
            index: None,
            terms: Vec::new(),
            table: None,
            default: None,
            sense: None,
        }
    }

    pub fn set(name: impl Into<String>) -> Self {
        Self::new(ComponentKind::Set, name)
    }

    pub fn param(name: impl Into<String>) -> Self {
        Self::new(ComponentKind::Param, name)
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::new(ComponentKind::Var, name)
    }

    pub fn expression(name: impl Into<String>, terms: Vec<String>) -> Self {
        Self::new(ComponentKind::Expression, name).with_terms(terms)
    }

    pub fn constraint(name: impl Into<String>, terms: Vec<String>) -> Self {
        Self::new(ComponentKind::Constraint, name).with_terms(terms)
    }

    pub fn objective(name: impl Into<String>, terms: Vec<String>) -> Self {
        let mut c = Self::new(ComponentKind::Objective, name).with_terms(terms);
        c.sense = Some(Sense::Minimize);
        c
    }

    pub fn indexed_by(mut self, set: impl Into<String>) -> Self {
        self.index = Some(set.into());
        self
    }

    pub fn from_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_default(mut self, value: f64) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_terms(mut self, terms: Vec<String>) -> Self {
        self.terms = terms;
        self
    }

    pub fn with_sense(mut self, sense: Sense) -> Self {
        self.sense = Some(sense);
        self
    }

    /// Every component name this component depends on.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.index
            .as_deref()
            .into_iter()
            .chain(self.terms.iter().map(String::as_str))
    }
}
