//! Configuration system.
//!
//! Loads engine configuration from JSON strings/files.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Root configuration shared by client/server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fixed simulation tick rate.
    pub tick_hz: u32,
    /// Root of game data.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Map directory, relative to `data_dir`.
    #[serde(default = "default_maps_dir")]
    pub maps_dir: String,
    /// Resource catalog file, relative to `data_dir`.
    #[serde(default = "default_resources_file")]
    pub resources_file: String,
    /// Map loaded at startup.
    #[serde(default = "default_start_map")]
    pub start_map: String,
    /// Player name (client only).
    #[serde(default = "default_player_name")]
    pub player_name: String,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_maps_dir() -> String {
    "maps".to_string()
}

fn default_resources_file() -> String {
    "resources.json".to_string()
}

fn default_start_map() -> String {
    "demo".to_string()
}

fn default_player_name() -> String {
    "Player".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_hz: 30,
            data_dir: default_data_dir(),
            maps_dir: default_maps_dir(),
            resources_file: default_resources_file(),
            start_map: default_start_map(),
            player_name: default_player_name(),
        }
    }
}

impl EngineConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parse {}", path.display()))
    }

    pub fn maps_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.maps_dir)
    }

    pub fn map_path(&self, map_name: &str) -> PathBuf {
        self.maps_path().join(format!("{map_name}.json"))
    }

    pub fn resources_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.resources_file)
    }
}
