//! Host/script type and instance bindings
//!
//! A binding injects a named host value into an interpreter's global
//! namespace. Type bindings make a host type constructible (and its static
//! surface reachable as `Name::CONST`); instance bindings expose one live
//! host object by reference. Instance bindings live in a shared table served
//! through rhai's variable resolver, so script functions see them as plain
//! globals; the last bind under a name wins, and references already held by
//! script code keep pointing at the old object. The only way to remove a
//! binding is to restart the whole engine instance.

use crate::error::ScriptError;
use crate::logging::ScriptLogger;
use crate::reflect::{TypeDescriptor, TypeRegistry};
use crate::value::{BridgeValue, HostHandle, HostObject};
use rhai::{Dynamic, Engine, EvalAltResult, Module};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Shared name → value table backing instance bindings.
pub type BindingTable = Arc<RwLock<BTreeMap<String, Dynamic>>>;

/// Widest method/constructor arity the bridge dispatches.
pub const MAX_ARITY: usize = 4;

type Constructor = Arc<dyn Fn(Vec<BridgeValue>) -> Result<HostHandle, ScriptError> + Send + Sync>;

/// Exposes a host type into the script namespace under a chosen name.
#[derive(Clone)]
pub struct TypeBinding {
    pub name: String,
    pub descriptor: TypeDescriptor,
    constructor: Option<(usize, Constructor)>,
    statics: Vec<(String, Dynamic)>,
}

impl TypeBinding {
    pub fn new(name: &str, descriptor: TypeDescriptor) -> Self {
        Self {
            name: name.to_string(),
            descriptor,
            constructor: None,
            statics: Vec::new(),
        }
    }

    /// Register a constructor callable as `Name(args...)` from scripts.
    pub fn with_constructor(
        mut self,
        params: usize,
        make: impl Fn(Vec<BridgeValue>) -> Result<HostHandle, ScriptError> + Send + Sync + 'static,
    ) -> Self {
        if params > MAX_ARITY {
            warn!(
                type_name = self.name,
                params = params,
                "Constructor arity exceeds bridge maximum, truncating"
            );
        }
        self.constructor = Some((params.min(MAX_ARITY), Arc::new(make)));
        self
    }

    /// Expose a static constant reachable as `Name::CONST`.
    pub fn with_static(mut self, name: &str, value: impl Into<Dynamic>) -> Self {
        self.statics.push((name.to_string(), value.into()));
        self
    }

    fn install(&self, engine: &mut Engine) {
        if let Some((params, make)) = &self.constructor {
            let type_name = self.name.clone();
            register_constructor(engine, &self.name, *params, make.clone(), type_name);
        }
        if !self.statics.is_empty() {
            let mut module = Module::new();
            for (name, value) in &self.statics {
                module.set_var(name.as_str(), value.clone());
            }
            engine.register_static_module(self.name.as_str(), module.into());
        }
        debug!(name = self.name, "Installed type binding");
    }
}

/// Exposes one named value (usually a live host object) into the namespace.
#[derive(Clone)]
pub struct InstanceBinding {
    pub name: String,
    pub value: Dynamic,
    pub descriptor: Option<TypeDescriptor>,
}

impl InstanceBinding {
    /// Bind a plain script-representable value.
    pub fn value(name: &str, value: impl Into<Dynamic>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            descriptor: None,
        }
    }

    /// Bind a live host object by reference. The descriptor makes its
    /// members reachable from scripts and from console introspection.
    pub fn object(name: &str, object: Arc<dyn HostObject>, descriptor: TypeDescriptor) -> Self {
        Self {
            name: name.to_string(),
            value: Dynamic::from(HostHandle::new(object)),
            descriptor: Some(descriptor),
        }
    }
}

/// A named injection into the interpreter's global namespace.
#[derive(Clone)]
pub enum Binding {
    Type(TypeBinding),
    Instance(InstanceBinding),
}

/// Apply a binding set to a fresh engine: types first, then instances, in
/// caller-supplied order so later bindings under the same name win.
///
/// Returns the descriptor registry for console introspection and the table
/// the variable resolver serves instance bindings from.
pub fn apply_bindings(
    engine: &mut Engine,
    bindings: &[Binding],
    logger: &Arc<dyn ScriptLogger>,
) -> (TypeRegistry, BindingTable) {
    let mut registry = TypeRegistry::new();

    for binding in bindings {
        if let Binding::Type(tb) = binding {
            tb.install(engine);
            registry.insert(tb.descriptor.clone());
        }
    }
    for binding in bindings {
        if let Binding::Instance(ib) = binding {
            if let Some(descriptor) = &ib.descriptor {
                registry.insert(descriptor.clone());
            }
        }
    }

    register_host_object_access(engine, &registry, logger.clone());

    let table: BindingTable = Arc::new(RwLock::new(BTreeMap::new()));
    {
        let mut table = table.write().unwrap();
        for binding in bindings {
            if let Binding::Instance(ib) = binding {
                table.insert(ib.name.clone(), ib.value.clone());
            }
        }
    }

    let resolver_table = table.clone();
    engine.on_var(move |name, _index, _context| {
        Ok(resolver_table.read().unwrap().get(name).cloned())
    });

    (registry, table)
}

fn register_constructor(
    engine: &mut Engine,
    name: &str,
    params: usize,
    make: Constructor,
    type_name: String,
) {
    let build = move |args: Vec<Dynamic>| -> Result<Dynamic, Box<EvalAltResult>> {
        let args = args.into_iter().map(BridgeValue::from_dynamic).collect();
        match make(args) {
            Ok(handle) => Ok(Dynamic::from(handle)),
            Err(e) => Err(format!("{type_name}: {e}").into()),
        }
    };
    match params {
        0 => {
            engine.register_fn(name, move || build(vec![]));
        }
        1 => {
            engine.register_fn(name, move |a: Dynamic| build(vec![a]));
        }
        2 => {
            engine.register_fn(name, move |a: Dynamic, b: Dynamic| build(vec![a, b]));
        }
        3 => {
            engine.register_fn(name, move |a: Dynamic, b: Dynamic, c: Dynamic| {
                build(vec![a, b, c])
            });
        }
        _ => {
            engine.register_fn(
                name,
                move |a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| build(vec![a, b, c, d]),
            );
        }
    }
}

/// Register member access for [`HostHandle`] from the union of all bound
/// descriptors: property getters/setters, method shims dispatched by arity,
/// string indexers for undeclared members, and `to_string`.
///
/// Method shims take the handle receiver by value (an `Arc` clone), so they
/// stay callable on temporaries produced by the variable resolver; mutation
/// happens behind the handle, never through the receiver slot.
fn register_host_object_access(
    engine: &mut Engine,
    registry: &TypeRegistry,
    logger: Arc<dyn ScriptLogger>,
) {
    engine.register_type_with_name::<HostHandle>("HostObject");
    engine.register_fn("to_string", |h: HostHandle| format!("[{}]", h.type_name()));

    engine.register_indexer_get(
        |h: &mut HostHandle, member: &str| -> Result<Dynamic, Box<EvalAltResult>> {
            match h.get_member(member) {
                Some(value) => Ok(value.into_dynamic()),
                None => Err(format!("no member '{member}' on {}", h.type_name()).into()),
            }
        },
    );
    engine.register_indexer_set(
        |h: &mut HostHandle, member: &str, value: Dynamic| -> Result<(), Box<EvalAltResult>> {
            if h.set_member(member, BridgeValue::from_dynamic(value)) {
                Ok(())
            } else {
                Err(format!("cannot write member '{member}' on {}", h.type_name()).into())
            }
        },
    );

    let mut getters = HashSet::new();
    let mut setters = HashSet::new();
    let mut methods = HashSet::new();

    for descriptor in registry.descriptors() {
        for property in descriptor.properties.iter().filter(|p| !p.is_static) {
            if property.readable && getters.insert(property.name.clone()) {
                let member = property.name.clone();
                engine.register_get(property.name.as_str(), move |h: &mut HostHandle| {
                    h.get_member(&member)
                        .map(BridgeValue::into_dynamic)
                        .unwrap_or(Dynamic::UNIT)
                });
            }
            if property.writable && setters.insert(property.name.clone()) {
                let member = property.name.clone();
                let logger = logger.clone();
                engine.register_set(
                    property.name.as_str(),
                    move |h: &mut HostHandle, value: Dynamic| {
                        if !h.set_member(&member, BridgeValue::from_dynamic(value)) {
                            logger.warn(&format!(
                                "write to '{member}' rejected by {}",
                                h.type_name()
                            ));
                        }
                    },
                );
            }
        }
        for field in descriptor.fields.iter().filter(|f| !f.is_static) {
            if getters.insert(field.name.clone()) {
                let member = field.name.clone();
                engine.register_get(field.name.as_str(), move |h: &mut HostHandle| {
                    h.get_member(&member)
                        .map(BridgeValue::into_dynamic)
                        .unwrap_or(Dynamic::UNIT)
                });
            }
        }
        for method in descriptor.methods.iter().filter(|m| !m.is_static) {
            let arity = method.params.len().min(MAX_ARITY);
            if method.params.len() > MAX_ARITY {
                warn!(
                    method = method.name,
                    params = method.params.len(),
                    "Method arity exceeds bridge maximum, truncating"
                );
            }
            if methods.insert((method.name.clone(), arity)) {
                register_method_shim(engine, &method.name, arity);
            }
        }
    }
}

fn dispatch(h: &HostHandle, name: &str, args: Vec<Dynamic>) -> Result<Dynamic, Box<EvalAltResult>> {
    let args = args.into_iter().map(BridgeValue::from_dynamic).collect();
    match h.call_method(name, args) {
        Ok(value) => Ok(value.into_dynamic()),
        Err(e) => Err(format!("{e}").into()),
    }
}

fn register_method_shim(engine: &mut Engine, name: &str, arity: usize) {
    let method = name.to_string();
    match arity {
        0 => {
            engine.register_fn(name, move |h: HostHandle| dispatch(&h, &method, vec![]));
        }
        1 => {
            engine.register_fn(name, move |h: HostHandle, a: Dynamic| {
                dispatch(&h, &method, vec![a])
            });
        }
        2 => {
            engine.register_fn(name, move |h: HostHandle, a: Dynamic, b: Dynamic| {
                dispatch(&h, &method, vec![a, b])
            });
        }
        3 => {
            engine.register_fn(
                name,
                move |h: HostHandle, a: Dynamic, b: Dynamic, c: Dynamic| {
                    dispatch(&h, &method, vec![a, b, c])
                },
            );
        }
        _ => {
            engine.register_fn(
                name,
                move |h: HostHandle, a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| {
                    dispatch(&h, &method, vec![a, b, c, d])
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryLogger;

    #[test]
    fn later_instance_binding_wins() {
        let mut engine = Engine::new();
        let logger: Arc<dyn ScriptLogger> = MemoryLogger::new();
        let bindings = vec![
            Binding::Instance(InstanceBinding::value("speed", 1_i64)),
            Binding::Instance(InstanceBinding::value("speed", 2_i64)),
        ];

        let (_registry, table) = apply_bindings(&mut engine, &bindings, &logger);
        let value = table.read().unwrap().get("speed").cloned().unwrap();
        assert_eq!(value.as_int().unwrap(), 2);
    }

    #[test]
    fn oversized_constructor_is_capped_at_max_arity() {
        struct Hull;
        impl HostObject for Hull {
            fn type_name(&self) -> &str {
                "Hull"
            }
            fn get_member(&self, _name: &str) -> Option<BridgeValue> {
                None
            }
            fn set_member(&self, _name: &str, _value: BridgeValue) -> bool {
                false
            }
            fn call_method(
                &self,
                name: &str,
                _args: Vec<BridgeValue>,
            ) -> Result<BridgeValue, ScriptError> {
                Err(ScriptError::host_call("Hull", name, "no such method"))
            }
        }

        let mut engine = Engine::new();
        let logger: Arc<dyn ScriptLogger> = MemoryLogger::new();
        let bindings = vec![Binding::Type(
            TypeBinding::new("Hull", TypeDescriptor::new("Hull")).with_constructor(6, |args| {
                assert_eq!(args.len(), MAX_ARITY);
                Ok(HostHandle::new(Arc::new(Hull)))
            }),
        )];
        apply_bindings(&mut engine, &bindings, &logger);

        let value = engine.eval::<Dynamic>("Hull(1, 2, 3, 4)").unwrap();
        assert!(value.try_cast::<HostHandle>().is_some());
    }

    #[test]
    fn descriptors_from_both_binding_kinds_reach_registry() {
        let mut engine = Engine::new();
        let logger: Arc<dyn ScriptLogger> = MemoryLogger::new();
        let bindings = vec![
            Binding::Type(TypeBinding::new(
                "Turret",
                TypeDescriptor::new("Turret").method("Fire", &[]),
            )),
            Binding::Instance(InstanceBinding {
                name: "hud".to_string(),
                value: Dynamic::UNIT,
                descriptor: Some(TypeDescriptor::new("Hud").property("visible", "bool", true)),
            }),
        ];

        let (registry, _table) = apply_bindings(&mut engine, &bindings, &logger);
        assert!(registry.get("Turret").is_some());
        assert!(registry.get("Hud").is_some());
        assert!(registry.get("Vehicle").is_none());
    }
}
