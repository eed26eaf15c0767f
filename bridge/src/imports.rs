//! Once-only module imports
//!
//! A script module is fetched and executed at most once per engine instance.
//! The marker is set *before* the module body runs, so circular import
//! graphs terminate: the second entry into a module finds the marker already
//! set and receives the placeholder registered at mark time. Fetch and
//! execution failures are reported through the logging sink and swallowed —
//! a broken module disables only the functionality it would have added.

use crate::config::AssetConfig;
use crate::error::ScriptError;
use crate::logging::ScriptLogger;
use rhai::{Engine, EvalAltResult, Module, ModuleResolver, Position, Scope, Shared};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Supplies module source text by name.
pub trait ModuleFetcher: Send + Sync {
    fn fetch(&self, module: &str) -> Result<String, ScriptError>;
}

/// Extract the top-level `import` statements of a script, one per line.
///
/// Script functions only see imported namespaces while the imports are live
/// in the evaluation state, so the host re-evaluates this header in front of
/// every function call. Re-evaluation is cheap: the guard answers repeat
/// imports from its module cache without fetching. Imports nested inside
/// blocks, strings or comments are skipped.
pub fn import_header(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::new();
    let mut depth = 0usize;
    let mut i = 0;

    let is_ident = |c: char| c.is_alphanumeric() || c == '_';

    while i < chars.len() {
        let c = chars[i];

        if c == '/' && i + 1 < chars.len() && chars[i + 1] == '/' {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '/' && i + 1 < chars.len() && chars[i + 1] == '*' {
            let mut nesting = 1;
            i += 2;
            while i < chars.len() && nesting > 0 {
                if chars[i] == '/' && i + 1 < chars.len() && chars[i + 1] == '*' {
                    nesting += 1;
                    i += 2;
                } else if chars[i] == '*' && i + 1 < chars.len() && chars[i + 1] == '/' {
                    nesting -= 1;
                    i += 2;
                } else {
                    i += 1;
                }
            }
            continue;
        }
        if c == '"' || c == '\'' || c == '`' {
            let quote = c;
            i += 1;
            while i < chars.len() {
                if chars[i] == '\\' {
                    i += 2;
                } else if chars[i] == quote {
                    i += 1;
                    break;
                } else {
                    i += 1;
                }
            }
            continue;
        }

        match c {
            '{' | '(' | '[' => depth += 1,
            '}' | ')' | ']' => depth = depth.saturating_sub(1),
            _ => {}
        }

        let at_word_start = (i == 0 || !is_ident(chars[i - 1]))
            && chars[i..].starts_with(&['i', 'm', 'p', 'o', 'r', 't'])
            && chars.get(i + 6).is_some_and(|c| !is_ident(*c));
        if depth == 0 && at_word_start {
            let start = i;
            while i < chars.len() && chars[i] != ';' {
                i += 1;
            }
            if i < chars.len() {
                i += 1;
            }
            out.extend(chars[start..i].iter());
            out.push('\n');
            continue;
        }

        i += 1;
    }
    out
}

/// Fetcher backed by `.rhai` files under the configured scripts directory.
#[derive(Debug, Clone)]
pub struct FileModuleFetcher {
    config: AssetConfig,
}

impl FileModuleFetcher {
    pub fn new(config: AssetConfig) -> Self {
        Self { config }
    }
}

impl ModuleFetcher for FileModuleFetcher {
    fn fetch(&self, module: &str) -> Result<String, ScriptError> {
        if !AssetConfig::is_valid_name(module) {
            return Err(ScriptError::import(module, "invalid module name"));
        }
        let path = self.config.script_path(module);
        std::fs::read_to_string(&path)
            .map_err(|e| ScriptError::import(module, format!("{}: {e}", path.display())))
    }
}

/// In-memory fetcher for tests and hosts that bundle their scripts.
///
/// Counts fetches per module so callers can assert once-only semantics.
#[derive(Default)]
pub struct MemoryFetcher {
    sources: HashMap<String, String>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, name: &str, source: &str) -> Self {
        self.sources.insert(name.to_string(), source.to_string());
        self
    }

    pub fn fetch_count(&self, module: &str) -> usize {
        self.fetches
            .lock()
            .unwrap()
            .get(module)
            .copied()
            .unwrap_or(0)
    }
}

impl ModuleFetcher for MemoryFetcher {
    fn fetch(&self, module: &str) -> Result<String, ScriptError> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(module.to_string())
            .or_insert(0) += 1;
        self.sources
            .get(module)
            .cloned()
            .ok_or_else(|| ScriptError::import(module, "no such module"))
    }
}

/// Per-interpreter record of already-imported module names.
///
/// Lives exactly as long as the owning engine instance; a restart produces a
/// fresh, empty guard.
#[derive(Debug, Default)]
pub struct ImportGuard {
    imported: HashSet<String>,
}

impl ImportGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_imported(&self, module: &str) -> bool {
        self.imported.contains(module)
    }

    /// Set the marker for `module`; returns false if it was already set.
    pub fn mark(&mut self, module: &str) -> bool {
        self.imported.insert(module.to_string())
    }

    /// Fetch and execute `module` unless it was imported before.
    ///
    /// The marker is set before `fetch`/`execute` run, and stays set on
    /// failure so a broken module is not retried within this interpreter
    /// lifetime. Returns `Ok(None)` for the already-imported no-op case.
    pub fn import_once<T>(
        &mut self,
        module: &str,
        fetch: impl FnOnce(&str) -> Result<String, ScriptError>,
        execute: impl FnOnce(&str) -> Result<T, ScriptError>,
    ) -> Result<Option<T>, ScriptError> {
        if !self.mark(module) {
            debug!(module = module, "Module already imported, skipping");
            return Ok(None);
        }
        let source = fetch(module)?;
        execute(&source).map(Some)
    }
}

/// Shared import state for one engine instance: the guard plus the compiled
/// modules handed back to rhai.
pub struct ImportState {
    guard: Mutex<ImportGuard>,
    modules: Mutex<HashMap<String, Shared<Module>>>,
    fetcher: Arc<dyn ModuleFetcher>,
    logger: Arc<dyn ScriptLogger>,
}

impl ImportState {
    pub fn new(fetcher: Arc<dyn ModuleFetcher>, logger: Arc<dyn ScriptLogger>) -> Arc<Self> {
        Arc::new(Self {
            guard: Mutex::new(ImportGuard::new()),
            modules: Mutex::new(HashMap::new()),
            fetcher,
            logger,
        })
    }

    pub fn is_imported(&self, module: &str) -> bool {
        self.guard.lock().unwrap().is_imported(module)
    }
}

/// Module resolver routing rhai `import` statements through the guard.
///
/// The locks are released while the module body evaluates, so nested imports
/// re-enter `resolve` on the same thread without deadlocking.
pub struct BridgeResolver {
    state: Arc<ImportState>,
}

impl BridgeResolver {
    pub fn new(state: Arc<ImportState>) -> Self {
        Self { state }
    }

    fn load(&self, engine: &Engine, name: &str) -> Result<Module, ScriptError> {
        let source = self.state.fetcher.fetch(name)?;
        let ast = engine
            .compile(&source)
            .map_err(|e| ScriptError::import(name, e.to_string()))?;
        Module::eval_ast_as_new(Scope::new(), &ast, engine)
            .map_err(|e| ScriptError::import(name, e.to_string()))
    }
}

impl ModuleResolver for BridgeResolver {
    fn resolve(
        &self,
        engine: &Engine,
        _source: Option<&str>,
        path: &str,
        _pos: Position,
    ) -> Result<Shared<Module>, Box<EvalAltResult>> {
        // Mark-before-execute; the placeholder is what a circular import sees.
        {
            let mut guard = self.state.guard.lock().unwrap();
            if guard.is_imported(path) {
                let modules = self.state.modules.lock().unwrap();
                return Ok(modules
                    .get(path)
                    .cloned()
                    .unwrap_or_else(|| Shared::new(Module::new())));
            }
            guard.mark(path);
            self.state
                .modules
                .lock()
                .unwrap()
                .insert(path.to_string(), Shared::new(Module::new()));
        }

        debug!(module = path, "Importing module");
        match self.load(engine, path) {
            Ok(module) => {
                let shared: Shared<Module> = Shared::new(module);
                self.state
                    .modules
                    .lock()
                    .unwrap()
                    .insert(path.to_string(), shared.clone());
                Ok(shared)
            }
            Err(e) => {
                // Best-effort: the marker stays set, the import site gets an
                // empty namespace, and the failure goes to the host sink.
                self.state.logger.error(&format!("{e}"));
                Ok(Shared::new(Module::new()))
            }
        }
    }
}
