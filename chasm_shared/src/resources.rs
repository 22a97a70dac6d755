//! Game resource catalog.
//!
//! Weapon and item descriptions loaded once at game start and then shared
//! read-only by every player as `Arc<GameResources>`.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::items::ACode;

/// Per-weapon ammo parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponDescription {
    /// Ammo capacity.
    pub limit: u32,
    /// Ammo granted when the weapon itself is picked up.
    pub start: u32,
    /// Ammo per portion of an ammo pickup.
    pub d_am: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDescription {
    pub a_code: ACode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameResources {
    /// Indexed by weapon index.
    pub weapons: Vec<WeaponDescription>,
    /// Indexed by item id.
    pub items: Vec<ItemDescription>,
}

impl GameResources {
    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        serde_json::from_str(s).context("parse game resources")
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let resources =
            Self::from_json_str(&text).with_context(|| format!("load {}", path.display()))?;
        debug!(
            path = %path.display(),
            weapons = resources.weapons.len(),
            items = resources.items.len(),
            "Game resources loaded"
        );
        Ok(resources)
    }

    pub fn item(&self, item_id: u32) -> Option<&ItemDescription> {
        self.items.get(item_id as usize)
    }

    pub fn weapon(&self, weapon_index: usize) -> Option<&WeaponDescription> {
        self.weapons.get(weapon_index)
    }
}
