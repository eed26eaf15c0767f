//! Bridge value model
//!
//! Rhai values are dynamically typed while host objects are statically typed.
//! Everything that crosses the boundary goes through [`BridgeValue`], a small
//! tagged union, so conversion logic lives in exactly one place. Host objects
//! are exposed to scripts as [`HostHandle`]s: cloning a handle shares the
//! underlying object, so mutations made by a script are immediately visible
//! to the host side and vice versa.

use crate::error::ScriptError;
use rhai::Dynamic;
use std::fmt;
use std::sync::Arc;

/// A value crossing the host/script boundary.
#[derive(Debug, Clone)]
pub enum BridgeValue {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A live host object, shared by reference.
    Handle(HostHandle),
    /// Any other script-native value (maps, arrays, function pointers).
    Script(Dynamic),
}

impl BridgeValue {
    pub fn into_dynamic(self) -> Dynamic {
        match self {
            BridgeValue::Unit => Dynamic::UNIT,
            BridgeValue::Bool(v) => Dynamic::from(v),
            BridgeValue::Int(v) => Dynamic::from(v),
            BridgeValue::Float(v) => Dynamic::from(v),
            BridgeValue::Str(v) => Dynamic::from(v),
            BridgeValue::Handle(h) => Dynamic::from(h),
            BridgeValue::Script(d) => d,
        }
    }

    pub fn from_dynamic(value: Dynamic) -> Self {
        if value.is_unit() {
            return BridgeValue::Unit;
        }
        if let Ok(v) = value.as_bool() {
            return BridgeValue::Bool(v);
        }
        if let Ok(v) = value.as_int() {
            return BridgeValue::Int(v);
        }
        if let Ok(v) = value.as_float() {
            return BridgeValue::Float(v);
        }
        let value = match value.clone().try_cast::<HostHandle>() {
            Some(h) => return BridgeValue::Handle(h),
            None => value,
        };
        match value.clone().into_string() {
            Ok(s) => BridgeValue::Str(s),
            Err(_) => BridgeValue::Script(value),
        }
    }

    /// Short description used in log messages.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeValue::Unit => "unit",
            BridgeValue::Bool(_) => "bool",
            BridgeValue::Int(_) => "int",
            BridgeValue::Float(_) => "float",
            BridgeValue::Str(_) => "string",
            BridgeValue::Handle(_) => "host object",
            BridgeValue::Script(_) => "script value",
        }
    }
}

impl fmt::Display for BridgeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeValue::Unit => write!(f, "()"),
            BridgeValue::Bool(v) => write!(f, "{v}"),
            BridgeValue::Int(v) => write!(f, "{v}"),
            BridgeValue::Float(v) => write!(f, "{v}"),
            BridgeValue::Str(v) => write!(f, "{v}"),
            BridgeValue::Handle(h) => write!(f, "[{}]", h.type_name()),
            BridgeValue::Script(d) => write!(f, "{d}"),
        }
    }
}

/// A host object reachable from scripts.
///
/// Implementations use interior mutability (`RwLock` or similar) so that
/// member writes work through the shared handle. `type_name` must match the
/// name the type was bound or described under, so console introspection can
/// find its descriptor.
pub trait HostObject: Send + Sync {
    fn type_name(&self) -> &str;

    /// Read a member; `None` when the member does not exist.
    fn get_member(&self, name: &str) -> Option<BridgeValue>;

    /// Write a member; `false` when the member does not exist or is read-only.
    fn set_member(&self, name: &str, value: BridgeValue) -> bool;

    /// Invoke a named method with already-converted arguments.
    fn call_method(&self, name: &str, args: Vec<BridgeValue>) -> Result<BridgeValue, ScriptError>;
}

/// Shared, script-visible reference to a [`HostObject`].
#[derive(Clone)]
pub struct HostHandle(pub Arc<dyn HostObject>);

impl HostHandle {
    pub fn new(object: Arc<dyn HostObject>) -> Self {
        Self(object)
    }

    pub fn type_name(&self) -> &str {
        self.0.type_name()
    }

    pub fn get_member(&self, name: &str) -> Option<BridgeValue> {
        self.0.get_member(name)
    }

    pub fn set_member(&self, name: &str, value: BridgeValue) -> bool {
        self.0.set_member(name, value)
    }

    pub fn call_method(
        &self,
        name: &str,
        args: Vec<BridgeValue>,
    ) -> Result<BridgeValue, ScriptError> {
        self.0.call_method(name, args)
    }
}

impl fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostHandle({})", self.type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_round_trips() {
        assert!(matches!(
            BridgeValue::from_dynamic(Dynamic::from(3_i64)),
            BridgeValue::Int(3)
        ));
        assert!(matches!(
            BridgeValue::from_dynamic(Dynamic::from(true)),
            BridgeValue::Bool(true)
        ));
        assert!(matches!(
            BridgeValue::from_dynamic(Dynamic::UNIT),
            BridgeValue::Unit
        ));

        let s = BridgeValue::from_dynamic(Dynamic::from("hi".to_string()));
        match s {
            BridgeValue::Str(v) => assert_eq!(v, "hi"),
            other => panic!("expected string, got {}", other.kind()),
        }
    }

    #[test]
    fn script_values_pass_through() {
        let mut map = rhai::Map::new();
        map.insert("x".into(), Dynamic::from(1_i64));
        let value = BridgeValue::from_dynamic(Dynamic::from(map));
        assert!(matches!(value, BridgeValue::Script(_)));
    }
}
