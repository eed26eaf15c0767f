//! Per-entity script engine lifecycle
//!
//! One [`ScriptHost`] owns one rhai interpreter for one scripted entity:
//! engine, compiled AST, global scope, bindings, import state and the cached
//! set of lifecycle hooks the script chose to define. Restart rebuilds all
//! of it from the retained source and binding set; nothing from the previous
//! interpreter survives, including import markers.

use crate::binding::{apply_bindings, Binding, BindingTable};
use crate::console::{install_commands, CommandSet, ConsoleRequest, RequestQueue};
use crate::error::ScriptError;
use crate::imports::{import_header, BridgeResolver, ImportState, ModuleFetcher};
use crate::logging::ScriptLogger;
use crate::path::{has_script_fn, has_zero_arg_fn, resolve_path, PathValue, Resolution};
use crate::reflect::TypeRegistry;
use rhai::{CallFnOptions, Dynamic, Engine, FnPtr, Scope, AST};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// The fixed, case-sensitive lifecycle callback names a script may define.
/// All are zero-argument; absence is not an error.
pub const LIFECYCLE_HOOKS: [&str; 8] = [
    "Awake",
    "Start",
    "Update",
    "FixedUpdate",
    "LateUpdate",
    "OnEnable",
    "OnDisable",
    "OnDestroy",
];

/// Everything a host needs from its surroundings, injected explicitly so
/// tests can substitute fakes (in-memory fetcher, recording logger, fake
/// clock behind the scheduler).
#[derive(Clone)]
pub struct HostServices {
    pub logger: Arc<dyn ScriptLogger>,
    pub commands: CommandSet,
    pub fetcher: Arc<dyn ModuleFetcher>,
}

struct Interpreter {
    engine: Engine,
    ast: AST,
    /// The script's import header plus its functions, evaluated on every
    /// function call so imported namespaces are reachable from inside hooks.
    /// Top-level statements other than imports are not in here.
    hook_ast: AST,
    scope: Scope<'static>,
    hooks: HashSet<&'static str>,
    registry: Arc<TypeRegistry>,
    table: BindingTable,
    imports: Arc<ImportState>,
    requests: RequestQueue,
}

/// One script engine instance, owned by one scripted entity.
pub struct ScriptHost {
    entity: u64,
    script_name: String,
    source: String,
    bindings: Vec<Binding>,
    services: HostServices,
    interp: Interpreter,
}

impl ScriptHost {
    /// Create a fresh interpreter, apply the bindings (types first, then
    /// instances, caller order, later names win), install the console
    /// commands, execute the script top to bottom and cache the lifecycle
    /// hooks it defined. Side effects of top-level execution — imports,
    /// scheduled callbacks — are fully applied before this returns.
    ///
    /// A script that fails to compile or throws at top level propagates as a
    /// typed error; the entity's scripting is dead but the caller decides
    /// what to do about it.
    pub fn start(
        entity: u64,
        script_name: &str,
        source: &str,
        bindings: Vec<Binding>,
        services: HostServices,
    ) -> Result<Self, ScriptError> {
        let interp = build_interpreter(entity, script_name, source, &bindings, &services)?;
        let mut host = Self {
            entity,
            script_name: script_name.to_string(),
            source: source.to_string(),
            bindings,
            services,
            interp,
        };
        host.drain_requests();
        debug!(
            entity = entity,
            script = host.script_name,
            hooks = host.interp.hooks.len(),
            "Script host started"
        );
        Ok(host)
    }

    /// Tear down the current interpreter and run `start` again with the same
    /// source, bindings and commands. Import markers do not survive.
    pub fn restart(&mut self) -> Result<(), ScriptError> {
        debug!(entity = self.entity, script = self.script_name, "Restarting");
        self.interp = build_interpreter(
            self.entity,
            &self.script_name,
            &self.source,
            &self.bindings,
            &self.services,
        )?;
        self.drain_requests();
        Ok(())
    }

    pub fn entity(&self) -> u64 {
        self.entity
    }

    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    /// Descriptors of every host type visible to this instance.
    pub fn registry(&self) -> &TypeRegistry {
        &self.interp.registry
    }

    /// True if the named module has been imported by this interpreter.
    pub fn has_imported(&self, module: &str) -> bool {
        self.interp.imports.is_imported(module)
    }

    /// True if the script defined the named lifecycle hook.
    pub fn has_hook(&self, hook: &str) -> bool {
        self.interp.hooks.contains(hook)
    }

    /// Invoke a cached lifecycle hook with no arguments. Hooks the script
    /// did not define are silently skipped (`Ok(false)`); most entities only
    /// define a subset.
    ///
    /// Hooks run against the hook AST, which re-establishes the script's
    /// imports without re-running the rest of the top level.
    pub fn invoke_lifecycle(&mut self, hook: &str) -> Result<bool, ScriptError> {
        if !self.interp.hooks.contains(hook) {
            return Ok(false);
        }
        let options = CallFnOptions::new().eval_ast(true).rewind_scope(true);
        let result = self
            .interp
            .engine
            .call_fn_with_options::<Dynamic>(
                options,
                &mut self.interp.scope,
                &self.interp.hook_ast,
                hook,
                (),
            )
            .map(|_| true)
            .map_err(|e| ScriptError::runtime(&self.script_name, e));
        self.drain_requests();
        result
    }

    /// Replace the script-visible value bound under `name`. References
    /// already held by script code keep pointing at the old value.
    pub fn rebind_instance(&mut self, name: &str, value: Dynamic) {
        self.interp
            .table
            .write()
            .unwrap()
            .insert(name.to_string(), value);
    }

    /// Resolve a dot path against the current global state. Never throws; a
    /// miss names the failing segment.
    pub fn resolve(&self, path: &str) -> Resolution {
        resolve_path(
            &self.interp.scope,
            &self.interp.table,
            &self.interp.ast,
            path,
        )
    }

    /// Probe for an optional hook function by path without invoking it.
    pub fn has_callable(&self, path: &str) -> bool {
        self.resolve(path).is_callable()
    }

    /// Resolve a dot path and call it with `args`. An undefined path logs a
    /// warning naming the script, the path and the failing segment, and
    /// returns the `()` sentinel; runtime errors inside the call are logged
    /// through the sink rather than thrown across the bridge.
    pub fn invoke(&mut self, path: &str, args: Vec<Dynamic>) -> Dynamic {
        let resolution = self.resolve(path);
        let result = match resolution {
            Resolution::Undefined { segment, name } => {
                self.services.logger.warn(&format!(
                    "script '{}': path '{path}' is undefined at segment {segment} ('{name}')",
                    self.script_name
                ));
                return Dynamic::UNIT;
            }
            Resolution::Found(PathValue::Function(name)) => {
                let options = CallFnOptions::new().eval_ast(true).rewind_scope(true);
                self.interp.engine.call_fn_with_options::<Dynamic>(
                    options,
                    &mut self.interp.scope,
                    &self.interp.hook_ast,
                    &name,
                    args,
                )
            }
            Resolution::Found(PathValue::Value(value)) => match value.try_cast::<FnPtr>() {
                Some(fn_ptr) => {
                    fn_ptr.call::<Dynamic>(&self.interp.engine, &self.interp.hook_ast, args)
                }
                None => {
                    self.services.logger.warn(&format!(
                        "script '{}': path '{path}' is not callable",
                        self.script_name
                    ));
                    return Dynamic::UNIT;
                }
            },
        };
        self.drain_requests();
        match result {
            Ok(value) => value,
            Err(e) => {
                self.services
                    .logger
                    .error(&format!("{}", ScriptError::runtime(&self.script_name, e)));
                Dynamic::UNIT
            }
        }
    }

    /// Run a scheduled callback that came due for this instance. Failures go
    /// to the sink; a fired callback never aborts the frame.
    pub fn fire(&mut self, fn_ptr: &FnPtr) {
        if let Err(e) = fn_ptr.call::<Dynamic>(&self.interp.engine, &self.interp.hook_ast, ()) {
            self.services
                .logger
                .error(&format!("{}", ScriptError::runtime(&self.script_name, e)));
        }
        self.drain_requests();
    }

    /// Service console requests that could not complete inside a native
    /// call. Runs after every evaluation that may have queued one.
    fn drain_requests(&mut self) {
        let drained: Vec<ConsoleRequest> = self.interp.requests.write().unwrap().drain(..).collect();
        for request in drained {
            match request {
                ConsoleRequest::DumpScope { all } => self.dump_scope(all),
            }
        }
    }

    fn dump_scope(&self, all: bool) {
        let logger = &self.services.logger;
        logger.log(&format!("--- scope of '{}' ---", self.script_name));
        for (name, _constant, value) in self.interp.scope.iter() {
            logger.log(&format!("  {name} = {value}"));
        }
        if all {
            for (name, value) in self.interp.table.read().unwrap().iter() {
                logger.log(&format!("  {name} = {value} (bound)"));
            }
        }
    }
}

/// Build and run one interpreter: engine limits, bindings, resolver,
/// commands, compile, top-level execution, hook caching — in that order, so
/// commands exist before the script runs and script definitions win.
fn build_interpreter(
    entity: u64,
    script_name: &str,
    source: &str,
    bindings: &[Binding],
    services: &HostServices,
) -> Result<Interpreter, ScriptError> {
    let mut engine = Engine::new();

    engine.set_max_expr_depths(100, 100);
    engine.set_max_call_levels(50);
    engine.set_max_operations(1_000_000);
    engine.set_max_string_size(100_000);
    engine.set_max_array_size(10_000);
    engine.set_max_map_size(1_000);
    engine.disable_symbol("eval");

    let (registry, table) = apply_bindings(&mut engine, bindings, &services.logger);
    let registry = Arc::new(registry);

    let imports = ImportState::new(services.fetcher.clone(), services.logger.clone());
    engine.set_module_resolver(BridgeResolver::new(imports.clone()));

    let requests = RequestQueue::default();
    install_commands(
        &mut engine,
        &services.commands,
        registry.clone(),
        requests.clone(),
        entity,
    );

    let ast = engine
        .compile(source)
        .map_err(|e| ScriptError::compile(script_name, e))?;

    let mut scope = Scope::new();
    engine
        .eval_ast_with_scope::<Dynamic>(&mut scope, &ast)
        .map_err(|e| ScriptError::runtime(script_name, e))?;

    // Imports only exist in the evaluation state while the importing
    // statements run, so function calls go through a slim AST carrying the
    // import header plus the script's functions. The guard serves the
    // re-imports from its cache.
    let mut hook_ast = engine
        .compile(import_header(source))
        .map_err(|e| ScriptError::compile(script_name, e))?;
    hook_ast.combine(ast.clone_functions_only());

    let mut hooks = HashSet::new();
    for hook in LIFECYCLE_HOOKS {
        if has_zero_arg_fn(&ast, hook) {
            hooks.insert(hook);
        } else if has_script_fn(&ast, hook) {
            warn!(
                script = script_name,
                hook = hook,
                "Lifecycle hook declared with parameters, ignoring"
            );
        }
    }

    Ok(Interpreter {
        engine,
        ast,
        hook_ast,
        scope,
        hooks,
        registry,
        table,
        imports,
        requests,
    })
}
