// src/modules/arguments.rs — Command-line flags declared by extension modules

use std::collections::BTreeMap;

use clap::{Arg, ArgAction, Command};

use crate::infra::errors::SwitchgearError;
use crate::modules::loader::ModuleSet;

/// A flag declared by a script module: `--name VALUE`, or a bare `--name`
/// when `flag` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentSpec {
    pub name: String,
    pub help: Option<String>,
    pub default: Option<String>,
    pub flag: bool,
}

impl ArgumentSpec {
    /// `name` may be given with or without the leading `--`.
    pub fn new(name: &str) -> Result<Self, SwitchgearError> {
        let name = name.strip_prefix("--").unwrap_or(name);
        if name.is_empty()
            || name.starts_with('-')
            || name.contains(|c: char| c == '=' || c.is_whitespace() || c.is_control())
        {
            return Err(SwitchgearError::config(format!(
                "Invalid module argument name {name:?}"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            ..Self::default()
        })
    }

    pub fn to_arg(&self) -> Arg {
        let mut arg = Arg::new(self.name.clone()).long(self.name.clone());
        if let Some(help) = &self.help {
            arg = arg.help(help.clone());
        }
        if self.flag {
            return arg.action(ArgAction::SetTrue);
        }
        arg = arg
            .action(ArgAction::Set)
            .value_name("VALUE")
            .allow_hyphen_values(true);
        match &self.default {
            Some(default) => arg.default_value(default.clone()),
            None => arg,
        }
    }
}

/// One parser holding every loaded module's flags. A flag name claimed by
/// two modules (or twice by one) is a configuration error.
pub fn module_command(modules: &ModuleSet) -> Result<Command, SwitchgearError> {
    let mut command = Command::new("module arguments")
        .no_binary_name(true)
        .disable_help_flag(true)
        .args_override_self(true);
    let mut owners: BTreeMap<String, String> = BTreeMap::new();

    for module in modules.iter() {
        let declared = module.declare_arguments(Command::new(module.name().to_string()));
        for arg in declared.get_arguments() {
            let mut arg = arg.clone();
            if arg.get_long().is_none() && arg.get_short().is_none() {
                let long = arg.get_id().as_str().to_string();
                arg = arg.long(long);
            }
            let mut keys = vec![arg.get_id().as_str().to_string()];
            if let Some(long) = arg.get_long() {
                keys.push(format!("--{long}"));
            }
            for key in keys {
                if let Some(owner) = owners.get(&key) {
                    return Err(SwitchgearError::config(format!(
                        "Module '{}' declares argument '{key}', already declared by '{owner}'",
                        module.name()
                    )));
                }
                owners.insert(key, module.name().to_string());
            }
            command = command.arg(arg);
        }
    }
    Ok(command)
}

/// Parse `tokens` against the modules' flags. Values, defaults included,
/// are keyed by argument id; a repeated value-taking flag keeps the last
/// value, and an appending one joins its values with spaces.
pub fn parse_module_arguments(
    modules: &ModuleSet,
    tokens: &[String],
) -> Result<BTreeMap<String, String>, SwitchgearError> {
    let mut command = module_command(modules)?;
    let matches = command.try_get_matches_from_mut(tokens).map_err(|e| {
        let rendered = e.to_string();
        let first = rendered.lines().next().unwrap_or_default();
        SwitchgearError::config(format!(
            "Module arguments: {}",
            first.trim_start_matches("error: ")
        ))
    })?;

    let mut values = BTreeMap::new();
    for arg in command.get_arguments() {
        let id = arg.get_id().as_str();
        if let Some(raw) = matches.get_raw(id) {
            let raw: Vec<String> = raw.map(|v| v.to_string_lossy().into_owned()).collect();
            values.insert(id.to_string(), raw.join(" "));
        }
    }
    if !values.is_empty() {
        tracing::debug!("Module arguments: {:?}", values);
    }
    Ok(values)
}
