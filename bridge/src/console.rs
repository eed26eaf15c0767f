//! Developer console commands
//!
//! A fixed vocabulary of debugging functions installed into every engine
//! instance's global namespace before the entity script runs, so a script
//! defining a global of the same name wins. Each command delegates to
//! another component: host logging, the scene delegate, the member
//! reflector, or the shared callback scheduler. `Scope` needs the live
//! scope, which is not reachable from inside a native call, so it goes
//! through a deferred request queue the host drains once the current
//! evaluation returns.

use crate::logging::ScriptLogger;
use crate::reflect::{describe, describe_value, MemberFilter, ReportSection, TypeRegistry};
use crate::scheduler::{ScriptCallback, SharedScheduler};
use crate::value::HostHandle;
use rhai::{Dynamic, Engine, FnPtr};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Host-side collaborator behind `FindObject` / `Destroy` / `LookAt` /
/// `Exit`. The bridge does not define how names map to scene objects.
pub trait SceneDelegate: Send + Sync {
    fn find_object(&self, name: &str) -> Option<u64>;
    fn destroy(&self, entity: u64);
    fn look_at(&self, entity: u64);
    fn request_exit(&self);
}

/// Delegate that ignores everything; useful for tests and headless hosts.
#[derive(Debug, Default, Clone)]
pub struct NullScene;

impl SceneDelegate for NullScene {
    fn find_object(&self, _name: &str) -> Option<u64> {
        None
    }
    fn destroy(&self, _entity: u64) {}
    fn look_at(&self, _entity: u64) {}
    fn request_exit(&self) {}
}

/// A command that cannot complete inside the native call and is serviced by
/// the host after the current evaluation returns.
#[derive(Debug, Clone)]
pub enum ConsoleRequest {
    DumpScope { all: bool },
}

/// Deferred console requests, drained by the owning host.
pub type RequestQueue = Arc<RwLock<Vec<ConsoleRequest>>>;

/// The collaborators every command set delegates to.
#[derive(Clone)]
pub struct CommandSet {
    pub logger: Arc<dyn ScriptLogger>,
    pub scene: Arc<dyn SceneDelegate>,
    pub scheduler: SharedScheduler,
}

pub const HELP_TEXT: &str = "\
Available commands:
  Help()                       print this list
  Log(v) LogWarning(v) LogError(v)  write to the host log
  FindObject(name)             scene object id by name, or () when absent
  Destroy(id)                  destroy a scene object
  LookAt(id)                   point the debug camera at a scene object
  Exit()                       ask the host to shut down
  HelpCharp(target, is_static, declared_only, which)
                               describe a bound host type or object
  Scope(all)                   dump script globals; all = include host bindings
  Doc(value, walk_chain)       describe a script value, optionally following
                               its __proto__ chain
  Wait(seconds, callback)      schedule a one-shot callback, returns a handle
  CancelWait(handle)           cancel a scheduled callback";

/// Install the command vocabulary on a fresh engine.
///
/// `owner` is the entity owning this engine instance; scheduled callbacks
/// carry it so the frame driver can dispatch them back here.
pub fn install_commands(
    engine: &mut Engine,
    commands: &CommandSet,
    registry: Arc<TypeRegistry>,
    requests: RequestQueue,
    owner: u64,
) {
    debug!(owner = owner, "Installing console commands");

    let logger = commands.logger.clone();
    engine.register_fn("Help", move || logger.log(HELP_TEXT));

    let logger = commands.logger.clone();
    engine.register_fn("Log", move |value: Dynamic| logger.log(&value.to_string()));
    let logger = commands.logger.clone();
    engine.register_fn("LogWarning", move |value: Dynamic| {
        logger.warn(&value.to_string())
    });
    let logger = commands.logger.clone();
    engine.register_fn("LogError", move |value: Dynamic| {
        logger.error(&value.to_string())
    });

    let scene = commands.scene.clone();
    engine.register_fn("FindObject", move |name: &str| -> Dynamic {
        match scene.find_object(name) {
            Some(id) => Dynamic::from(id as i64),
            None => Dynamic::UNIT,
        }
    });
    let scene = commands.scene.clone();
    engine.register_fn("Destroy", move |id: i64| scene.destroy(id as u64));
    let scene = commands.scene.clone();
    engine.register_fn("LookAt", move |id: i64| scene.look_at(id as u64));
    let scene = commands.scene.clone();
    engine.register_fn("Exit", move || scene.request_exit());

    let logger = commands.logger.clone();
    let types = registry.clone();
    engine.register_fn(
        "HelpCharp",
        move |target: Dynamic, is_static: bool, declared_only: bool, which: &str| {
            let section = which.parse::<ReportSection>().unwrap_or_else(|_| {
                logger.warn(&format!("unknown report section '{which}', showing all"));
                ReportSection::All
            });
            let name = if let Some(handle) = target.clone().try_cast::<HostHandle>() {
                handle.type_name().to_string()
            } else {
                target.to_string()
            };
            match types.get(&name) {
                Some(descriptor) => {
                    let report = describe(descriptor, &MemberFilter::new(is_static, declared_only));
                    logger.log(&report.render(section));
                }
                None => logger.warn(&format!("no bound type named '{name}'")),
            }
        },
    );

    let logger = commands.logger.clone();
    let types = registry;
    engine.register_fn("Doc", move |value: Dynamic, walk_chain: bool| {
        for report in describe_value(&value, walk_chain, &types) {
            logger.log(&report.render(ReportSection::All));
        }
    });

    let queue = requests;
    engine.register_fn("Scope", move |all: bool| {
        queue
            .write()
            .unwrap()
            .push(ConsoleRequest::DumpScope { all });
    });

    let scheduler = commands.scheduler.clone();
    engine.register_fn("Wait", move |seconds: f64, callback: FnPtr| -> String {
        scheduler.wait(
            seconds as f32,
            ScriptCallback {
                owner,
                fn_ptr: callback,
            },
        )
    });
    let scheduler = commands.scheduler.clone();
    engine.register_fn("CancelWait", move |handle: &str| {
        scheduler.cancel(handle);
    });
}
