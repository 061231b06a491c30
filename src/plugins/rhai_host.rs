// src/plugins/rhai_host.rs — Rhai scripting host for extension modules
//
// A script module is a `.rhai` file whose functions are named after the
// lifecycle hooks. `declare_arguments` receives an `Arguments` handle once at
// load time, assembly hooks receive a `Model` handle, every other hook
// receives an `Instance` handle. Scripts have no I/O beyond logging.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rhai::{Array, Dynamic, Engine, EvalAltResult, Map, Scope, AST};

use crate::core::iterate::IterationContext;
use crate::infra::errors::SwitchgearError;
use crate::model::component::{Component, ComponentKind, Sense};
use crate::model::context::AssemblyContext;
use crate::model::instance::ModelInstance;
use crate::modules::arguments::ArgumentSpec;
use crate::modules::extension::{ExtensionModule, Vote};
use crate::plugins::hooks::{Hook, HookSet};

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

/// First typed error raised by a host function during one hook call.
type ErrorSlot = Rc<RefCell<Option<SwitchgearError>>>;

fn fail(slot: &ErrorSlot, err: SwitchgearError) -> Box<EvalAltResult> {
    let message = err.to_string();
    let mut slot = slot.borrow_mut();
    if slot.is_none() {
        *slot = Some(err);
    }
    message.into()
}

// ---------------------------------------------------------------------------
// Handles passed to scripts
// ---------------------------------------------------------------------------

/// `Arguments` in scripts: collects the flags a module declares.
#[derive(Clone, Default)]
pub struct ArgumentsHandle {
    specs: Rc<RefCell<Vec<ArgumentSpec>>>,
}

impl ArgumentsHandle {
    fn declare(&self, name: &str, opts: &Map) -> ScriptResult<()> {
        let spec = argument_from_map(name, opts).map_err(|e| -> Box<EvalAltResult> {
            e.to_string().into()
        })?;
        self.specs.borrow_mut().push(spec);
        Ok(())
    }
}

/// `Model` in scripts: the assembly context for the current phase.
#[derive(Clone)]
pub struct ModelHandle {
    ctx: Rc<RefCell<AssemblyContext>>,
    error: ErrorSlot,
}

impl ModelHandle {
    fn apply<T>(
        &self,
        f: impl FnOnce(&mut AssemblyContext) -> Result<T, SwitchgearError>,
    ) -> ScriptResult<T> {
        let result = f(&mut self.ctx.borrow_mut());
        result.map_err(|e| fail(&self.error, e))
    }

    fn add(&self, kind: ComponentKind, name: &str, opts: &Map) -> ScriptResult<()> {
        let component = component_from_map(kind, name, opts).map_err(|e| fail(&self.error, e))?;
        self.apply(|ctx| ctx.add_component(component))
    }

    fn add_with_terms(&self, kind: ComponentKind, name: &str, terms: Array) -> ScriptResult<()> {
        let terms = strings(&terms, "terms").map_err(|e| fail(&self.error, e))?;
        self.apply(|ctx| ctx.add_component(Component::new(kind, name).with_terms(terms)))
    }
}

/// `Instance` in scripts: the populated model during solve and iteration.
#[derive(Clone)]
pub struct InstanceHandle {
    instance: Rc<RefCell<ModelInstance>>,
    level: i64,
    round: i64,
    state: Rc<RefCell<Map>>,
    error: ErrorSlot,
}

impl InstanceHandle {
    fn set_param(&self, name: &str, key: Option<&str>, value: Dynamic) -> ScriptResult<()> {
        let value = number(&value, name).map_err(|e| fail(&self.error, e))?;
        let mut instance = self.instance.borrow_mut();
        match instance.model.component(name) {
            Some(c) if c.kind == ComponentKind::Param => {}
            _ => {
                return Err(fail(
                    &self.error,
                    SwitchgearError::config(format!("set_param: '{name}' is not a param")),
                ))
            }
        }
        instance
            .data
            .set_param(name, key, value)
            .map_err(|e| fail(&self.error, e))
    }
}

fn opt_float(value: Option<f64>) -> Dynamic {
    value.map_or(Dynamic::UNIT, Dynamic::from)
}

// ---------------------------------------------------------------------------
// ScriptHost — compiles script modules
// ---------------------------------------------------------------------------

/// Compiles `.rhai` modules against one shared engine.
pub struct ScriptHost {
    engine: Rc<Engine>,
}

impl ScriptHost {
    pub fn new() -> Self {
        Self {
            engine: Rc::new(create_rhai_engine()),
        }
    }

    pub fn load_module(&self, name: &str, path: &Path) -> Result<ScriptModule, SwitchgearError> {
        let content = std::fs::read_to_string(path)?;
        self.load_module_str(name, path, &content)
    }

    /// Load a module from source text (inline scripts and tests).
    pub fn load_module_str(
        &self,
        name: &str,
        path: &Path,
        content: &str,
    ) -> Result<ScriptModule, SwitchgearError> {
        let ast = self.engine.compile(content).map_err(|e| SwitchgearError::Script {
            module: name.to_string(),
            hook: "compile".into(),
            message: format!("{}: {e}", path.display()),
        })?;

        let hooks = discover_hook_functions(&ast);
        let mut module = ScriptModule {
            name: name.to_string(),
            path: path.to_path_buf(),
            ast,
            engine: Rc::clone(&self.engine),
            hooks,
            prerequisites: Vec::new(),
            members: Vec::new(),
            arguments: Vec::new(),
            state: Rc::new(RefCell::new(Map::new())),
        };
        module.prerequisites = module.metadata_list("prerequisites")?;
        module.members = module.metadata_list("members")?;
        module.arguments = module.declared_arguments()?;

        tracing::debug!(
            "Loaded script module '{}' from {} (hooks: [{}])",
            module.name,
            path.display(),
            module.hooks.names().join(", ")
        );
        Ok(module)
    }
}

impl Default for ScriptHost {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// ScriptModule — an extension module backed by a script
// ---------------------------------------------------------------------------

pub struct ScriptModule {
    name: String,
    path: PathBuf,
    ast: AST,
    engine: Rc<Engine>,
    hooks: HookSet,
    prerequisites: Vec<String>,
    members: Vec<String>,
    arguments: Vec<ArgumentSpec>,
    /// Survives between hook calls; read and written with `state`/`set_state`.
    state: Rc<RefCell<Map>>,
}

impl ScriptModule {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn defines(&self, function: &str) -> bool {
        self.ast.iter_functions().any(|f| f.name == function)
    }

    fn script_error(&self, hook: &str, message: impl Into<String>) -> SwitchgearError {
        SwitchgearError::Script {
            module: self.name.clone(),
            hook: hook.to_string(),
            message: message.into(),
        }
    }

    /// `prerequisites()` / `members()`: optional functions returning names.
    fn metadata_list(&self, function: &str) -> Result<Vec<String>, SwitchgearError> {
        if !self.defines(function) {
            return Ok(Vec::new());
        }
        let mut scope = Scope::new();
        let list = self
            .engine
            .call_fn::<Array>(&mut scope, &self.ast, function, ())
            .map_err(|e| self.script_error(function, e.to_string()))?;
        strings(&list, function).map_err(|e| self.script_error(function, e.to_string()))
    }

    fn declared_arguments(&self) -> Result<Vec<ArgumentSpec>, SwitchgearError> {
        let hook = Hook::DeclareArguments;
        if !self.hooks.contains(hook) {
            return Ok(Vec::new());
        }
        let handle = ArgumentsHandle::default();
        let mut scope = Scope::new();
        self.engine
            .call_fn::<Dynamic>(
                &mut scope,
                &self.ast,
                hook.as_str(),
                (Dynamic::from(handle.clone()),),
            )
            .map_err(|e| self.script_error(hook.as_str(), e.to_string()))?;
        let specs = handle.specs.borrow().clone();
        Ok(specs)
    }

    fn call_hook(&self, hook: Hook, arg: Dynamic, error: &ErrorSlot) -> Result<Dynamic, SwitchgearError> {
        let mut scope = Scope::new();
        let result = self
            .engine
            .call_fn::<Dynamic>(&mut scope, &self.ast, hook.as_str(), (arg,));
        if let Some(err) = error.borrow_mut().take() {
            return Err(err);
        }
        result.map_err(|e| self.script_error(hook.as_str(), e.to_string()))
    }

    fn run_assembly_hook(
        &mut self,
        hook: Hook,
        ctx: &mut AssemblyContext,
    ) -> Result<(), SwitchgearError> {
        if !self.hooks.contains(hook) {
            return Ok(());
        }
        let shared = Rc::new(RefCell::new(std::mem::take(ctx)));
        let error = ErrorSlot::default();
        let handle = ModelHandle {
            ctx: Rc::clone(&shared),
            error: Rc::clone(&error),
        };
        let result = self.call_hook(hook, Dynamic::from(handle), &error);
        *ctx = std::mem::take(&mut *shared.borrow_mut());
        result.map(|_| ())
    }

    fn run_instance_hook(
        &mut self,
        hook: Hook,
        instance: &mut ModelInstance,
        level: usize,
        round: u32,
    ) -> Result<Dynamic, SwitchgearError> {
        if !self.hooks.contains(hook) {
            return Ok(Dynamic::UNIT);
        }
        let shared = Rc::new(RefCell::new(std::mem::take(instance)));
        let error = ErrorSlot::default();
        let handle = InstanceHandle {
            instance: Rc::clone(&shared),
            level: level as i64,
            round: i64::from(round),
            state: Rc::clone(&self.state),
            error: Rc::clone(&error),
        };
        let result = self.call_hook(hook, Dynamic::from(handle), &error);
        *instance = std::mem::take(&mut *shared.borrow_mut());
        result
    }

    fn vote(&self, hook: Hook, value: Dynamic) -> Result<Vote, SwitchgearError> {
        if value.is_unit() {
            return Ok(Vote::Abstain);
        }
        value.as_bool().map(Vote::from).map_err(|type_name| {
            self.script_error(
                hook.as_str(),
                format!("must return true, false or (), got {type_name}"),
            )
        })
    }
}

impl ExtensionModule for ScriptModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn hooks(&self) -> HookSet {
        self.hooks.clone()
    }

    fn prerequisites(&self) -> Vec<String> {
        self.prerequisites.clone()
    }

    fn members(&self) -> Vec<String> {
        self.members.clone()
    }

    fn declare_arguments(&self, command: clap::Command) -> clap::Command {
        self.arguments
            .iter()
            .fold(command, |command, spec| command.arg(spec.to_arg()))
    }

    fn declare_registries(&mut self, ctx: &mut AssemblyContext) -> Result<(), SwitchgearError> {
        self.run_assembly_hook(Hook::DeclareRegistries, ctx)
    }

    fn declare_components(&mut self, ctx: &mut AssemblyContext) -> Result<(), SwitchgearError> {
        self.run_assembly_hook(Hook::DeclareComponents, ctx)
    }

    fn declare_dependent_components(
        &mut self,
        ctx: &mut AssemblyContext,
    ) -> Result<(), SwitchgearError> {
        self.run_assembly_hook(Hook::DeclareDependentComponents, ctx)
    }

    fn pre_solve(&mut self, instance: &mut ModelInstance) -> Result<(), SwitchgearError> {
        self.run_instance_hook(Hook::PreSolve, instance, 0, 0)
            .map(|_| ())
    }

    fn pre_iterate(&mut self, ctx: &mut IterationContext<'_>) -> Result<Vote, SwitchgearError> {
        let value = self.run_instance_hook(Hook::PreIterate, ctx.instance, ctx.level, ctx.round)?;
        self.vote(Hook::PreIterate, value)
    }

    fn post_iterate(&mut self, ctx: &mut IterationContext<'_>) -> Result<Vote, SwitchgearError> {
        let value = self.run_instance_hook(Hook::PostIterate, ctx.instance, ctx.level, ctx.round)?;
        self.vote(Hook::PostIterate, value)
    }

    fn post_solve(&mut self, instance: &mut ModelInstance) -> Result<(), SwitchgearError> {
        self.run_instance_hook(Hook::PostSolve, instance, 0, 0)
            .map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Engine factory
// ---------------------------------------------------------------------------

/// Create the engine shared by all script modules.
pub fn create_rhai_engine() -> Engine {
    let mut engine = Engine::new();

    // Set safety limits
    engine.set_max_expr_depths(64, 32);
    engine.set_max_operations(1_000_000);
    engine.set_max_string_size(1_048_576); // 1MB
    engine.set_max_array_size(100_000);
    engine.set_max_map_size(100_000);

    engine.register_fn("log", |msg: &str| {
        tracing::info!(target: "rhai_script", "{}", msg);
    });
    engine.register_fn("log_debug", |msg: &str| {
        tracing::debug!(target: "rhai_script", "{}", msg);
    });
    engine.register_fn("log_warn", |msg: &str| {
        tracing::warn!(target: "rhai_script", "{}", msg);
    });

    register_arguments_api(&mut engine);
    register_model_api(&mut engine);
    register_instance_api(&mut engine);

    // No filesystem access, no shell exec, no env vars
    engine
}

fn register_arguments_api(engine: &mut Engine) {
    engine.register_type_with_name::<ArgumentsHandle>("Arguments");

    engine.register_fn("declare_argument", |h: &mut ArgumentsHandle, name: &str| {
        h.declare(name, &Map::new())
    });
    engine.register_fn(
        "declare_argument",
        |h: &mut ArgumentsHandle, name: &str, opts: Map| h.declare(name, &opts),
    );
}

fn register_model_api(engine: &mut Engine) {
    engine.register_type_with_name::<ModelHandle>("Model");

    engine.register_fn("declare_registry", |h: &mut ModelHandle, name: &str| {
        h.apply(|ctx| ctx.declare_registry(name))
    });
    engine.register_fn(
        "register",
        |h: &mut ModelHandle, registry: &str, value: &str| h.apply(|ctx| ctx.register(registry, value)),
    );
    engine.register_fn("registry", |h: &mut ModelHandle, name: &str| -> ScriptResult<Array> {
        let values = h.apply(|ctx| ctx.registry(name))?;
        Ok(values.into_iter().map(Dynamic::from).collect())
    });
    engine.register_fn("require_data", |h: &mut ModelHandle, name: &str| {
        h.apply(|ctx| ctx.require_data(name))
    });
    engine.register_fn("option", |h: &mut ModelHandle, key: &str| -> Dynamic {
        h.ctx
            .borrow()
            .option(key)
            .map_or(Dynamic::UNIT, |v| Dynamic::from(v.to_string()))
    });

    for (fn_name, kind) in [
        ("add_set", ComponentKind::Set),
        ("add_param", ComponentKind::Param),
        ("add_var", ComponentKind::Var),
    ] {
        engine.register_fn(fn_name, move |h: &mut ModelHandle, name: &str| {
            h.add(kind, name, &Map::new())
        });
        engine.register_fn(fn_name, move |h: &mut ModelHandle, name: &str, opts: Map| {
            h.add(kind, name, &opts)
        });
    }

    for (fn_name, kind) in [
        ("add_expression", ComponentKind::Expression),
        ("add_constraint", ComponentKind::Constraint),
        ("add_objective", ComponentKind::Objective),
    ] {
        engine.register_fn(fn_name, move |h: &mut ModelHandle, name: &str, terms: Array| {
            h.add_with_terms(kind, name, terms)
        });
        engine.register_fn(fn_name, move |h: &mut ModelHandle, name: &str, opts: Map| {
            h.add(kind, name, &opts)
        });
    }
}

fn register_instance_api(engine: &mut Engine) {
    engine.register_type_with_name::<InstanceHandle>("Instance");

    engine.register_fn("round", |h: &mut InstanceHandle| h.round);
    engine.register_fn("level", |h: &mut InstanceHandle| h.level);
    engine.register_fn("node", |h: &mut InstanceHandle| -> Array {
        h.instance
            .borrow()
            .iteration_node
            .iter()
            .map(|n| Dynamic::from(i64::from(*n)))
            .collect()
    });
    engine.register_fn("scenario", |h: &mut InstanceHandle| -> Dynamic {
        h.instance
            .borrow()
            .scenario_name
            .clone()
            .map_or(Dynamic::UNIT, Dynamic::from)
    });
    engine.register_fn("objective", |h: &mut InstanceHandle| -> Dynamic {
        opt_float(h.instance.borrow().solution.as_ref().and_then(|s| s.objective))
    });
    engine.register_fn("value", |h: &mut InstanceHandle, name: &str| -> Dynamic {
        opt_float(h.instance.borrow().solution.as_ref().and_then(|s| s.value(name)))
    });
    engine.register_fn("param", |h: &mut InstanceHandle, name: &str| -> Dynamic {
        opt_float(h.instance.borrow().data.param(name, None))
    });
    engine.register_fn("param", |h: &mut InstanceHandle, name: &str, key: &str| -> Dynamic {
        opt_float(h.instance.borrow().data.param(name, Some(key)))
    });
    engine.register_fn(
        "set_param",
        |h: &mut InstanceHandle, name: &str, value: Dynamic| h.set_param(name, None, value),
    );
    engine.register_fn(
        "set_param",
        |h: &mut InstanceHandle, name: &str, key: &str, value: Dynamic| {
            h.set_param(name, Some(key), value)
        },
    );
    engine.register_fn("state", |h: &mut InstanceHandle, key: &str| -> Dynamic {
        h.state.borrow().get(key).cloned().unwrap_or(Dynamic::UNIT)
    });
    engine.register_fn("set_state", |h: &mut InstanceHandle, key: &str, value: Dynamic| {
        h.state.borrow_mut().insert(key.into(), value);
    });
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Hooks a script defines, found by function name.
fn discover_hook_functions(ast: &AST) -> HookSet {
    ast.iter_functions()
        .filter_map(|func| Hook::from_name(func.name))
        .collect()
}

fn strings(items: &Array, what: &str) -> Result<Vec<String>, SwitchgearError> {
    items
        .iter()
        .map(|item| {
            item.clone().into_string().map_err(|type_name| {
                SwitchgearError::config(format!("{what}: expected strings, got {type_name}"))
            })
        })
        .collect()
}

fn string(value: &Dynamic, what: &str) -> Result<String, SwitchgearError> {
    value.clone().into_string().map_err(|type_name| {
        SwitchgearError::config(format!("{what}: expected a string, got {type_name}"))
    })
}

fn number(value: &Dynamic, what: &str) -> Result<f64, SwitchgearError> {
    if let Ok(f) = value.as_float() {
        return Ok(f);
    }
    value.as_int().map(|i| i as f64).map_err(|type_name| {
        SwitchgearError::config(format!("{what}: expected a number, got {type_name}"))
    })
}

/// `#{ help: "...", "default": 0, flag: false }`; every key is optional.
fn argument_from_map(name: &str, opts: &Map) -> Result<ArgumentSpec, SwitchgearError> {
    let mut spec = ArgumentSpec::new(name)?;
    for (key, value) in opts {
        match key.as_str() {
            "help" => spec.help = Some(string(value, "help")?),
            "default" => spec.default = Some(value.to_string()),
            "flag" => {
                spec.flag = value.as_bool().map_err(|type_name| {
                    SwitchgearError::config(format!("flag: expected a bool, got {type_name}"))
                })?
            }
            other => {
                return Err(SwitchgearError::config(format!(
                    "Unknown option '{other}' for argument '{name}'"
                )))
            }
        }
    }
    Ok(spec)
}

/// Build a component from a script option map, e.g.
/// `#{ index: "GENS", table: "generators", "default": 0.0 }` (`default` is
/// reserved in Rhai, so it is written as a string key).
fn component_from_map(
    kind: ComponentKind,
    name: &str,
    opts: &Map,
) -> Result<Component, SwitchgearError> {
    let mut component = Component::new(kind, name);
    if kind == ComponentKind::Objective {
        component.sense = Some(Sense::Minimize);
    }
    for (key, value) in opts {
        match key.as_str() {
            "index" => component.index = Some(string(value, "index")?),
            "table" => component.table = Some(string(value, "table")?),
            "default" => component.default = Some(number(value, "default")?),
            "terms" => {
                let terms = value.clone().into_array().map_err(|t| {
                    SwitchgearError::config(format!("terms: expected an array, got {t}"))
                })?;
                component.terms = strings(&terms, "terms")?;
            }
            "sense" => {
                component.sense = Some(match string(value, "sense")?.as_str() {
                    "min" | "minimize" => Sense::Minimize,
                    "max" | "maximize" => Sense::Maximize,
                    other => {
                        return Err(SwitchgearError::config(format!(
                            "sense: expected minimize or maximize, got '{other}'"
                        )))
                    }
                })
            }
            other => {
                return Err(SwitchgearError::config(format!(
                    "Unknown option '{other}' for {} '{name}'",
                    kind.as_str()
                )))
            }
        }
    }
    Ok(component)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
