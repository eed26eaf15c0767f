//! Dot-path resolution into a live interpreter
//!
//! A path like `state.target.pos` names a global plus a chain of property
//! accesses, resolved strictly left to right in a single pass. The first
//! segment is looked up in the script's scope, then in the instance binding
//! table, and — for single-segment paths only — among the script's top-level
//! functions. Remaining segments descend through rhai object maps and host
//! object handles. There is no index/bracket syntax. Resolution never
//! throws: a miss reports exactly which segment failed.

use crate::binding::BindingTable;
use crate::value::HostHandle;
use rhai::{Dynamic, FnPtr, Scope, AST};

/// Successfully resolved path target.
#[derive(Debug, Clone)]
pub enum PathValue {
    /// A concrete value (possibly a function pointer).
    Value(Dynamic),
    /// A top-level script function, called through the AST by name.
    Function(String),
}

/// Outcome of resolving a dot path.
#[derive(Debug, Clone)]
pub enum Resolution {
    Found(PathValue),
    /// Resolution stopped before the path was exhausted.
    Undefined {
        /// Zero-based index of the failing segment.
        segment: usize,
        /// The failing segment itself.
        name: String,
    },
}

impl Resolution {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Resolution::Undefined { .. })
    }

    /// True iff the resolved target can be invoked.
    pub fn is_callable(&self) -> bool {
        match self {
            Resolution::Found(PathValue::Function(_)) => true,
            Resolution::Found(PathValue::Value(value)) => value.is::<FnPtr>(),
            Resolution::Undefined { .. } => false,
        }
    }
}

/// True if the AST defines a top-level script function named `name` (any
/// arity).
pub fn has_script_fn(ast: &AST, name: &str) -> bool {
    ast.iter_functions().any(|f| f.name == name)
}

/// True if the AST defines a zero-argument script function named `name`.
pub fn has_zero_arg_fn(ast: &AST, name: &str) -> bool {
    ast.iter_functions()
        .any(|f| f.name == name && f.params.is_empty())
}

/// Resolve `path` against the interpreter's current global state.
pub fn resolve_path(scope: &Scope, table: &BindingTable, ast: &AST, path: &str) -> Resolution {
    let segments: Vec<&str> = path.split('.').collect();

    let head = segments[0];
    let mut current = match scope.get(head).cloned() {
        Some(value) => value,
        None => match table.read().unwrap().get(head).cloned() {
            Some(value) => value,
            None => {
                if segments.len() == 1 && has_script_fn(ast, head) {
                    return Resolution::Found(PathValue::Function(head.to_string()));
                }
                return Resolution::Undefined {
                    segment: 0,
                    name: head.to_string(),
                };
            }
        },
    };

    for (index, segment) in segments.iter().enumerate().skip(1) {
        let next = descend(&current, segment);
        match next {
            Some(value) => current = value,
            None => {
                return Resolution::Undefined {
                    segment: index,
                    name: segment.to_string(),
                }
            }
        }
    }

    Resolution::Found(PathValue::Value(current))
}

/// Fetch a named property off an intermediate value: map entry or host
/// object member. Anything else ends the descent.
fn descend(value: &Dynamic, segment: &str) -> Option<Dynamic> {
    if segment.is_empty() {
        return None;
    }
    if let Some(map) = value.read_lock::<rhai::Map>() {
        return map.get(segment).cloned();
    }
    if let Some(handle) = value.clone().try_cast::<HostHandle>() {
        return handle.get_member(segment).map(|v| v.into_dynamic());
    }
    None
}
