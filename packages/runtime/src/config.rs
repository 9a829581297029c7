use crate::error::RuntimeResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "minibind.config.json";

/// Runtime configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Directory of the file-backed durable store; in-memory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,

    /// Attribute stamped onto code blocks to key their pending handle
    #[serde(default = "default_script_id_attribute")]
    pub script_id_attribute: String,

    /// Tag of executable code blocks
    #[serde(default = "default_script_tag")]
    pub script_tag: String,

    /// Cascade limit for reactive re-evaluation
    #[serde(default = "default_max_update_passes")]
    pub max_update_passes: usize,
}

fn default_script_id_attribute() -> String {
    "data-mini-script-id".to_string()
}

fn default_script_tag() -> String {
    "script".to_string()
}

fn default_max_update_passes() -> usize {
    8
}

impl RuntimeConfig {
    /// Load config from a directory
    pub fn load(cwd: impl AsRef<Path>) -> RuntimeResult<Self> {
        let config_path = cwd.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            Self::load_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_file(path: impl AsRef<Path>) -> RuntimeResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: RuntimeConfig = serde_json::from_str(&content)?;

        // Relative storage paths are relative to the config file
        if let (Some(dir), Some(base)) = (&config.storage_dir, path.as_ref().parent()) {
            if dir.is_relative() {
                config.storage_dir = Some(base.join(dir));
            }
        }
        Ok(config)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            storage_dir: None,
            script_id_attribute: default_script_id_attribute(),
            script_tag: default_script_tag(),
            max_update_passes: default_max_update_passes(),
        }
    }
}
