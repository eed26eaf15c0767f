//! Asset path configuration

use std::path::PathBuf;
use tracing::debug;

/// Where script and scene assets live on disk.
#[derive(Debug, Clone)]
pub struct AssetConfig {
    /// Root directory for all assets
    pub asset_root: PathBuf,
    /// Directory name for scripts (relative to asset_root)
    pub scripts_dir: String,
    /// Directory name for scene manifests (relative to asset_root)
    pub scenes_dir: String,
}

impl AssetConfig {
    pub fn new(asset_root: PathBuf, scripts_dir: String, scenes_dir: String) -> Self {
        debug!(
            asset_root = ?asset_root,
            scripts_dir = scripts_dir,
            scenes_dir = scenes_dir,
            "Creating AssetConfig"
        );
        Self {
            asset_root,
            scripts_dir,
            scenes_dir,
        }
    }

    /// True if `name` is a plain module/scene name with no path components.
    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty() && !name.contains("..") && !name.contains('/') && !name.contains('\\')
    }

    /// Full path to a script file.
    pub fn script_path(&self, name: &str) -> PathBuf {
        self.asset_root
            .join(&self.scripts_dir)
            .join(format!("{name}.rhai"))
    }

    /// Full path to a scene manifest.
    pub fn scene_path(&self, name: &str) -> PathBuf {
        self.asset_root
            .join(&self.scenes_dir)
            .join(format!("{name}.json"))
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            scripts_dir: "scripts".to_string(),
            scenes_dir: "scenes".to_string(),
        }
    }
}
