//! Replicated map state.
//!
//! Client-side mirror of everything on a map that can change at runtime:
//! dynamic walls (doors, lifts) and replicated entities. The server is
//! authoritative; this side only applies what arrives.
//!
//! Replication is best-effort. Messages naming a wall index or entity id
//! this state doesn't know about are ignored, never reported.

use std::{collections::BTreeMap, sync::Arc};

use chasm_shared::{
    angle::MessageAngle,
    map::MapData,
    math::Vec3,
    net::{EntityBirth, EntityDeath, EntityId, EntityState, NetMsg, WallPosition},
};
use tracing::debug;

/// Fixed-point scale of wall coordinates, on the wire and in `DynamicWall`.
pub const WALL_COORD_SCALE: f32 = 256.0;

/// Entity ids at or above this are rejected.
pub const MAX_ENTITIES: u16 = 1024;

/// Wall position in 1/256 world units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DynamicWall {
    pub xy: [[i16; 2]; 2],
    pub z: i16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapEntity {
    pub item_id: u16,
    pub position: Vec3,
    pub angle: MessageAngle,
    pub frame: u16,
}

pub struct MapState {
    map_data: Arc<MapData>,
    /// One entry per movable wall of the map; the length never changes.
    dynamic_walls: Vec<DynamicWall>,
    entities: BTreeMap<EntityId, MapEntity>,
}

impl MapState {
    pub fn new(map_data: Arc<MapData>) -> Self {
        let dynamic_walls = map_data
            .dynamic_walls
            .iter()
            .map(|wall| DynamicWall {
                xy: wall.vert_pos.map(|v| [to_fixed(v.x), to_fixed(v.y)]),
                z: 0,
            })
            .collect();

        Self {
            map_data,
            dynamic_walls,
            entities: BTreeMap::new(),
        }
    }

    pub fn map_data(&self) -> &Arc<MapData> {
        &self.map_data
    }

    pub fn dynamic_walls(&self) -> &[DynamicWall] {
        &self.dynamic_walls
    }

    pub fn entity(&self, id: EntityId) -> Option<&MapEntity> {
        self.entities.get(&id)
    }

    /// Live entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &MapEntity)> {
        self.entities.iter().map(|(id, e)| (*id, e))
    }

    /// Applies any replication message. Returns `false` for messages that
    /// aren't map replication.
    pub fn process_message(&mut self, msg: &NetMsg) -> bool {
        match msg {
            NetMsg::WallPosition(m) => self.process_wall_position(m),
            NetMsg::EntityBirth(m) => self.process_entity_birth(m),
            NetMsg::EntityState(m) => self.process_entity_state(m),
            NetMsg::EntityDeath(m) => self.process_entity_death(m),
            _ => return false,
        }
        true
    }

    pub fn process_wall_position(&mut self, message: &WallPosition) {
        let Some(wall) = self.dynamic_walls.get_mut(message.wall_index as usize) else {
            debug!(wall_index = message.wall_index, "Bad wall index");
            return;
        };

        *wall = DynamicWall {
            xy: message.vertices_xy,
            z: message.z,
        };
    }

    /// A birth for an id that is already alive replaces it: the server only
    /// reuses ids after a death, so we missed that death.
    pub fn process_entity_birth(&mut self, message: &EntityBirth) {
        if message.id.0 >= MAX_ENTITIES {
            debug!(id = message.id.0, "Bad entity id");
            return;
        }

        let entity = MapEntity {
            item_id: message.item_id,
            position: message.position,
            angle: message.angle,
            frame: 0,
        };
        if self.entities.insert(message.id, entity).is_some() {
            debug!(id = message.id.0, "Entity reborn without death");
        }
    }

    pub fn process_entity_state(&mut self, message: &EntityState) {
        let Some(entity) = self.entities.get_mut(&message.id) else {
            debug!(id = message.id.0, "State for unknown entity");
            return;
        };

        entity.position = message.position;
        entity.angle = message.angle;
        entity.frame = message.frame;
    }

    pub fn process_entity_death(&mut self, message: &EntityDeath) {
        self.entities.remove(&message.id);
    }
}

fn to_fixed(coord: f32) -> i16 {
    (coord * WALL_COORD_SCALE) as i16
}
