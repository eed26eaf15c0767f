//! Headless demo driving scripted vehicles through the bridge
//!
//! Loads a scene manifest, starts one script host per entity, binds a live
//! `Vehicle` into each script and runs a fixed-step frame loop until a script
//! calls `Exit()` or the frame budget runs out.

use bridge::{
    AssetConfig, Binding, BridgeValue, CallbackScheduler, CommandSet, FileModuleFetcher,
    HostObject, HostServices, InstanceBinding, SceneDelegate, ScriptError, ScriptHost,
    SharedScheduler, TracingLogger, TypeDescriptor,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

const FIXED_DT: f32 = 1.0 / 60.0;
const MAX_FRAMES: u32 = 600;

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[derive(Debug, Default)]
struct VehicleState {
    speed: f64,
    heading: f64,
    armor: i64,
}

/// Simulated vehicle exposed to its controlling script.
struct Vehicle {
    name: String,
    state: RwLock<VehicleState>,
}

impl Vehicle {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            state: RwLock::new(VehicleState {
                armor: 100,
                ..Default::default()
            }),
        })
    }

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new("Vehicle")
            .method("ApplyThrust", &["float"])
            .method("Steer", &["float"])
            .method("TakeDamage", &["int"])
            .property("name", "string", false)
            .property("speed", "float", false)
            .property("heading", "float", true)
            .property("armor", "int", false)
    }
}

impl HostObject for Vehicle {
    fn type_name(&self) -> &str {
        "Vehicle"
    }

    fn get_member(&self, name: &str) -> Option<BridgeValue> {
        let state = self.state.read().unwrap();
        match name {
            "name" => Some(BridgeValue::Str(self.name.clone())),
            "speed" => Some(BridgeValue::Float(state.speed)),
            "heading" => Some(BridgeValue::Float(state.heading)),
            "armor" => Some(BridgeValue::Int(state.armor)),
            _ => None,
        }
    }

    fn set_member(&self, name: &str, value: BridgeValue) -> bool {
        match (name, value) {
            ("heading", BridgeValue::Float(v)) => {
                self.state.write().unwrap().heading = v;
                true
            }
            ("heading", BridgeValue::Int(v)) => {
                self.state.write().unwrap().heading = v as f64;
                true
            }
            _ => false,
        }
    }

    fn call_method(&self, name: &str, args: Vec<BridgeValue>) -> Result<BridgeValue, ScriptError> {
        let number = |v: &BridgeValue| -> Option<f64> {
            match v {
                BridgeValue::Float(f) => Some(*f),
                BridgeValue::Int(i) => Some(*i as f64),
                _ => None,
            }
        };
        match name {
            "ApplyThrust" => {
                let amount = args
                    .first()
                    .and_then(number)
                    .ok_or_else(|| ScriptError::host_call("Vehicle", name, "expected a number"))?;
                let mut state = self.state.write().unwrap();
                state.speed = (state.speed + amount).clamp(0.0, 120.0);
                Ok(BridgeValue::Float(state.speed))
            }
            "Steer" => {
                let degrees = args
                    .first()
                    .and_then(number)
                    .ok_or_else(|| ScriptError::host_call("Vehicle", name, "expected a number"))?;
                let mut state = self.state.write().unwrap();
                state.heading = (state.heading + degrees).rem_euclid(360.0);
                Ok(BridgeValue::Float(state.heading))
            }
            "TakeDamage" => {
                let amount = match args.first() {
                    Some(BridgeValue::Int(v)) => *v,
                    _ => {
                        return Err(ScriptError::host_call("Vehicle", name, "expected an int"));
                    }
                };
                let mut state = self.state.write().unwrap();
                state.armor = (state.armor - amount).max(0);
                Ok(BridgeValue::Int(state.armor))
            }
            other => Err(ScriptError::host_call("Vehicle", other, "no such method")),
        }
    }
}

/// Scene delegate over the demo's entity table.
#[derive(Default)]
struct SandboxScene {
    names: RwLock<HashMap<String, u64>>,
    destroyed: RwLock<Vec<u64>>,
    exit: AtomicBool,
}

impl SandboxScene {
    fn register(&self, name: &str, entity: u64) {
        self.names.write().unwrap().insert(name.to_string(), entity);
    }

    fn take_destroyed(&self) -> Vec<u64> {
        self.destroyed.write().unwrap().drain(..).collect()
    }

    fn exit_requested(&self) -> bool {
        self.exit.load(Ordering::SeqCst)
    }
}

impl SceneDelegate for SandboxScene {
    fn find_object(&self, name: &str) -> Option<u64> {
        self.names.read().unwrap().get(name).copied()
    }

    fn destroy(&self, entity: u64) {
        info!(entity = entity, "Destroy requested");
        self.destroyed.write().unwrap().push(entity);
    }

    fn look_at(&self, entity: u64) {
        info!(entity = entity, "Camera look-at");
    }

    fn request_exit(&self) {
        self.exit.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug, Deserialize)]
struct SceneManifest {
    name: String,
    entities: Vec<EntityEntry>,
}

#[derive(Debug, Deserialize)]
struct EntityEntry {
    name: String,
    script: String,
}

struct Simulation {
    scene: Arc<SandboxScene>,
    scheduler: SharedScheduler,
    hosts: Vec<ScriptHost>,
    vehicles: HashMap<u64, Arc<Vehicle>>,
}

impl Simulation {
    fn load(config: &AssetConfig, scene_name: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let manifest_path = config.scene_path(scene_name);
        let manifest: SceneManifest =
            serde_json::from_str(&std::fs::read_to_string(&manifest_path)?)?;
        info!(
            scene = manifest.name,
            entities = manifest.entities.len(),
            "Loading scene"
        );

        let scene = Arc::new(SandboxScene::default());
        let scheduler: SharedScheduler = Arc::new(CallbackScheduler::new());
        let fetcher = Arc::new(FileModuleFetcher::new(config.clone()));
        let logger = Arc::new(TracingLogger);

        let services = HostServices {
            logger: logger.clone(),
            commands: CommandSet {
                logger,
                scene: scene.clone(),
                scheduler: scheduler.clone(),
            },
            fetcher,
        };

        let mut hosts = Vec::new();
        let mut vehicles = HashMap::new();
        for (index, entry) in manifest.entities.iter().enumerate() {
            let entity = index as u64 + 1;
            let source = std::fs::read_to_string(config.script_path(&entry.script))?;
            let vehicle = Vehicle::new(&entry.name);

            let host = ScriptHost::start(
                entity,
                &entry.script,
                &source,
                vec![Binding::Instance(InstanceBinding::object(
                    "vehicle",
                    vehicle.clone(),
                    Vehicle::descriptor(),
                ))],
                services.clone(),
            )?;

            scene.register(&entry.name, entity);
            vehicles.insert(entity, vehicle);
            hosts.push(host);
        }

        Ok(Self {
            scene,
            scheduler,
            hosts,
            vehicles,
        })
    }

    fn invoke_all(&mut self, hook: &str) {
        for host in &mut self.hosts {
            if let Err(e) = host.invoke_lifecycle(hook) {
                warn!(script = host.script_name(), hook = hook, error = %e, "Hook failed");
            }
        }
    }

    fn run(&mut self) {
        self.invoke_all("Awake");
        self.invoke_all("Start");
        self.invoke_all("OnEnable");

        for frame in 0..MAX_FRAMES {
            self.invoke_all("FixedUpdate");
            self.invoke_all("Update");

            for due in self.scheduler.tick(FIXED_DT) {
                let owner = due.callback.owner;
                match self.hosts.iter_mut().find(|h| h.entity() == owner) {
                    Some(host) => host.fire(&due.callback.fn_ptr),
                    None => warn!(owner = owner, "Callback owner no longer exists"),
                }
            }

            self.invoke_all("LateUpdate");

            for entity in self.scene.take_destroyed() {
                if let Some(index) = self.hosts.iter().position(|h| h.entity() == entity) {
                    let mut host = self.hosts.remove(index);
                    let _ = host.invoke_lifecycle("OnDestroy");
                    self.vehicles.remove(&entity);
                    info!(entity = entity, "Entity destroyed");
                }
            }

            if self.scene.exit_requested() {
                info!(frame = frame, "Exit requested by script");
                break;
            }
        }

        self.invoke_all("OnDisable");
        self.invoke_all("OnDestroy");

        for (entity, vehicle) in &self.vehicles {
            let state = vehicle.state.read().unwrap();
            info!(
                entity = *entity,
                name = %vehicle.name,
                speed = state.speed,
                heading = state.heading,
                armor = state.armor,
                "Final vehicle state"
            );
        }
    }
}

fn main() {
    init_logging();
    info!("Starting scripting sandbox");

    let root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sandbox/assets"));
    let config = AssetConfig::new(root, "scripts".to_string(), "scenes".to_string());

    match Simulation::load(&config, "patrol") {
        Ok(mut simulation) => simulation.run(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load scene");
            std::process::exit(1);
        }
    }
}
