//! Map data.
//!
//! Only the parts of a level the simulation core needs: the initial
//! positions of movable walls and the player spawn points. Maps are stored as
//! JSON, e.g.
//!
//! ```json
//! {
//!   "name": "demo",
//!   "dynamic_walls": [ { "vert_pos": [ { "x": 1.0, "y": 2.0 }, { "x": 3.0, "y": 4.0 } ] } ],
//!   "spawn_points": [ { "x": 4.0, "y": 4.0, "z": 0.0 } ]
//! }
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::math::{Vec2, Vec3};

/// A movable wall segment in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapWall {
    pub vert_pos: [Vec2; 2],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapData {
    pub name: String,
    #[serde(default)]
    pub dynamic_walls: Vec<MapWall>,
    #[serde(default)]
    pub spawn_points: Vec<Vec3>,
}

impl MapData {
    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        serde_json::from_str(s).context("parse map data")
    }

    /// Loads a map file. An empty `name` is filled from the file stem.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let mut map =
            Self::from_json_str(&text).with_context(|| format!("load {}", path.display()))?;
        if map.name.is_empty() {
            map.name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unknown")
                .to_string();
        }
        debug!(
            map = %map.name,
            dynamic_walls = map.dynamic_walls.len(),
            spawn_points = map.spawn_points.len(),
            "Map file loaded"
        );
        Ok(map)
    }

    /// Where a newly connected player appears.
    pub fn spawn_point(&self) -> Vec3 {
        self.spawn_points.first().copied().unwrap_or(Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_map_with_defaults() {
        let map = MapData::from_json_str(r#"{ "name": "empty" }"#).unwrap();
        assert!(map.dynamic_walls.is_empty());
        assert_eq!(map.spawn_point(), Vec3::ZERO);
    }

    #[test]
    fn parse_walls_and_spawns() {
        let text = r#"{
            "name": "two",
            "dynamic_walls": [
                { "vert_pos": [ { "x": 1.0, "y": 2.0 }, { "x": 3.0, "y": 4.0 } ] }
            ],
            "spawn_points": [ { "x": 4.0, "y": 5.0, "z": 0.0 } ]
        }"#;
        let map = MapData::from_json_str(text).unwrap();
        assert_eq!(map.dynamic_walls.len(), 1);
        assert_eq!(map.dynamic_walls[0].vert_pos[1], Vec2::new(3.0, 4.0));
        assert_eq!(map.spawn_point(), Vec3::new(4.0, 5.0, 0.0));
    }
}
