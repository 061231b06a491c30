// src/queue/scenario.rs — Scenario list parsing

use std::path::Path;

use crate::infra::errors::SwitchgearError;

pub const SCENARIO_NAME_FLAG: &str = "--scenario-name";

/// One line of the scenario list: a name plus the `solve` arguments that
/// define it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioDescriptor {
    pub name: String,
    pub args: Vec<String>,
}

impl ScenarioDescriptor {
    /// Parse one list line. The name comes from `--scenario-name` (last one
    /// wins) or, failing that, from a leading bare token, which is then
    /// dropped from the arguments.
    pub fn parse(line: &str) -> Result<Self, SwitchgearError> {
        let mut tokens = shlex::split(line).ok_or_else(|| {
            SwitchgearError::config(format!("Cannot tokenize scenario line: {line}"))
        })?;

        let name = match flag_value(&tokens, SCENARIO_NAME_FLAG) {
            Some(name) => name,
            None => match tokens.first() {
                Some(first) if !first.starts_with('-') => tokens.remove(0),
                _ => {
                    return Err(SwitchgearError::config(format!(
                        "Scenario line has no name (start it with a name or use {SCENARIO_NAME_FLAG}): {line}"
                    )))
                }
            },
        };
        validate_name(&name)?;
        Ok(Self { name, args: tokens })
    }

    /// Back to a list line that parses to the same descriptor.
    pub fn to_line(&self) -> String {
        let mut tokens: Vec<&str> = Vec::with_capacity(self.args.len() + 1);
        if flag_value(&self.args, SCENARIO_NAME_FLAG).is_none() {
            tokens.push(&self.name);
        }
        tokens.extend(self.args.iter().map(String::as_str));
        shlex::try_join(tokens).unwrap_or_else(|_| {
            // Only NUL bytes fail to quote, and those cannot come from a text line.
            format!("{} {}", self.name, self.args.join(" "))
        })
    }

    /// Arguments for this scenario's `solve` run, always carrying
    /// `--scenario-name`.
    pub fn solve_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.args.len() + 2);
        if flag_value(&self.args, SCENARIO_NAME_FLAG).is_none() {
            args.push(SCENARIO_NAME_FLAG.to_string());
            args.push(self.name.clone());
        }
        args.extend(self.args.iter().cloned());
        args
    }
}

/// Value of the last `--flag VALUE` / `--flag=VALUE` in `tokens`.
pub fn flag_value(tokens: &[String], flag: &str) -> Option<String> {
    let mut value = None;
    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        if token == flag {
            if let Some(next) = iter.next() {
                value = Some(next.clone());
            }
        } else if let Some(rest) = token
            .strip_prefix(flag)
            .and_then(|rest| rest.strip_prefix('='))
        {
            value = Some(rest.to_string());
        }
    }
    value
}

/// Scenario names become lock directory names and journal lines.
pub fn validate_name(name: &str) -> Result<(), SwitchgearError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '#'])
        || name.chars().any(char::is_control)
        || name.trim() != name
    {
        return Err(SwitchgearError::config(format!(
            "Invalid scenario name {name:?}: use a plain directory name without '#', \
             control characters or surrounding spaces"
        )));
    }
    Ok(())
}

/// Parse a whole list body. Only whole-line `#` comments are dropped. A
/// repeated name keeps its first
/// position but takes the later definition.
pub fn parse_list(content: &str) -> Result<Vec<ScenarioDescriptor>, SwitchgearError> {
    let mut scenarios: Vec<ScenarioDescriptor> = Vec::new();
    let lines = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));
    for line in lines {
        let scenario = ScenarioDescriptor::parse(line)?;
        match scenarios.iter_mut().find(|s| s.name == scenario.name) {
            Some(existing) => {
                tracing::warn!(
                    "Scenario '{}' is defined more than once; using the last definition",
                    scenario.name
                );
                *existing = scenario;
            }
            None => scenarios.push(scenario),
        }
    }
    Ok(scenarios)
}

/// Read the list file fresh from disk.
pub fn load_list(path: &Path) -> Result<Vec<ScenarioDescriptor>, SwitchgearError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SwitchgearError::config(format!(
            "Cannot read scenario list {}: {e}",
            path.display()
        ))
    })?;
    parse_list(&content)
}
