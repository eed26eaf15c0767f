//! Shared fixtures: a counting host object, a recording scene delegate and
//! a fully faked service set.

use crate::binding::{Binding, InstanceBinding};
use crate::console::{CommandSet, SceneDelegate};
use crate::error::ScriptError;
use crate::host::HostServices;
use crate::imports::MemoryFetcher;
use crate::logging::MemoryLogger;
use crate::reflect::TypeDescriptor;
use crate::scheduler::{CallbackScheduler, SharedScheduler};
use crate::value::{BridgeValue, HostObject};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Host object that counts named events; scripts bump it, tests read it.
#[derive(Default)]
pub struct Probe {
    counts: RwLock<HashMap<String, i64>>,
}

impl Probe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self, key: &str) -> i64 {
        self.counts.read().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new("Probe")
            .method("Bump", &["string"])
            .method("Value", &["string"])
            .property("total", "int", false)
    }

    pub fn binding(self: &Arc<Self>, name: &str) -> Binding {
        Binding::Instance(InstanceBinding::object(
            name,
            self.clone(),
            Self::descriptor(),
        ))
    }
}

impl HostObject for Probe {
    fn type_name(&self) -> &str {
        "Probe"
    }

    fn get_member(&self, name: &str) -> Option<BridgeValue> {
        if name == "total" {
            let total = self.counts.read().unwrap().values().sum();
            return Some(BridgeValue::Int(total));
        }
        self.counts
            .read()
            .unwrap()
            .get(name)
            .map(|v| BridgeValue::Int(*v))
    }

    fn set_member(&self, _name: &str, _value: BridgeValue) -> bool {
        false
    }

    fn call_method(&self, name: &str, args: Vec<BridgeValue>) -> Result<BridgeValue, ScriptError> {
        let key = match args.first() {
            Some(BridgeValue::Str(s)) => s.clone(),
            _ => return Err(ScriptError::host_call("Probe", name, "expected a string key")),
        };
        match name {
            "Bump" => {
                *self.counts.write().unwrap().entry(key).or_insert(0) += 1;
                Ok(BridgeValue::Unit)
            }
            "Value" => Ok(BridgeValue::Int(self.count(&key))),
            other => Err(ScriptError::host_call("Probe", other, "no such method")),
        }
    }
}

/// Scene delegate that records every call for later assertions.
#[derive(Default)]
pub struct RecordingScene {
    pub objects: HashMap<String, u64>,
    pub destroyed: Mutex<Vec<u64>>,
    pub looked_at: Mutex<Vec<u64>>,
    pub exit_requested: AtomicBool,
}

impl RecordingScene {
    pub fn with_object(mut self, name: &str, id: u64) -> Self {
        self.objects.insert(name.to_string(), id);
        self
    }
}

impl SceneDelegate for RecordingScene {
    fn find_object(&self, name: &str) -> Option<u64> {
        self.objects.get(name).copied()
    }

    fn destroy(&self, entity: u64) {
        self.destroyed.lock().unwrap().push(entity);
    }

    fn look_at(&self, entity: u64) {
        self.looked_at.lock().unwrap().push(entity);
    }

    fn request_exit(&self) {
        self.exit_requested.store(true, Ordering::SeqCst);
    }
}

/// Everything a test needs to start a host and observe what it did.
pub struct Harness {
    pub logger: Arc<MemoryLogger>,
    pub scene: Arc<RecordingScene>,
    pub scheduler: SharedScheduler,
    pub fetcher: Arc<MemoryFetcher>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_fetcher(MemoryFetcher::new())
    }

    pub fn with_fetcher(fetcher: MemoryFetcher) -> Self {
        Self {
            logger: MemoryLogger::new(),
            scene: Arc::new(RecordingScene::default()),
            scheduler: Arc::new(CallbackScheduler::new()),
            fetcher: Arc::new(fetcher),
        }
    }

    pub fn with_scene(scene: RecordingScene) -> Self {
        let mut harness = Self::new();
        harness.scene = Arc::new(scene);
        harness
    }

    pub fn services(&self) -> HostServices {
        HostServices {
            logger: self.logger.clone(),
            commands: CommandSet {
                logger: self.logger.clone(),
                scene: self.scene.clone(),
                scheduler: self.scheduler.clone(),
            },
            fetcher: self.fetcher.clone(),
        }
    }
}
