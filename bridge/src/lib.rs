//! Embedded scripting bridge for scripted game entities
//!
//! Hosts one Rhai interpreter per scripted entity and wires it to the
//! simulation: named bindings of host types and live objects, once-only
//! module imports, dot-path invocation of script values, a developer
//! console vocabulary, and a shared deferred-callback scheduler. Everything
//! runs single-threaded, driven by the host's frame loop; failures inside
//! scripts degrade that entity's behaviour and are reported through a
//! logging sink instead of unwinding into the simulation.

pub mod binding;
pub mod config;
pub mod console;
pub mod error;
pub mod host;
pub mod imports;
pub mod logging;
pub mod path;
pub mod reflect;
pub mod scheduler;
pub mod value;

pub use binding::{Binding, InstanceBinding, TypeBinding};
pub use config::AssetConfig;
pub use console::{CommandSet, NullScene, SceneDelegate};
pub use error::ScriptError;
pub use host::{HostServices, ScriptHost, LIFECYCLE_HOOKS};
pub use imports::{FileModuleFetcher, ImportGuard, MemoryFetcher, ModuleFetcher};
pub use logging::{MemoryLogger, ScriptLogger, TracingLogger};
pub use path::{PathValue, Resolution};
pub use reflect::{MemberFilter, MemberReport, ReportSection, TypeDescriptor, TypeRegistry};
pub use scheduler::{CallbackScheduler, ScriptCallback, SharedScheduler};
pub use value::{BridgeValue, HostHandle, HostObject};

// Re-export commonly used interpreter types
pub use rhai::{Dynamic, FnPtr};

#[cfg(test)]
mod tests;
