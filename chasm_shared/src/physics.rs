//! Movement tunables.
//!
//! Shared so a client can predict with the same numbers the server uses.

use serde::{Deserialize, Serialize};

/// Player movement parameters. Speeds in m/s, accelerations in m/s².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    pub max_speed: f32,
    pub acceleration: f32,
    pub deceleration: f32,
    /// Vertical speed added on jump takeoff.
    pub jump_speed_delta: f32,
    /// Gravity; negative.
    pub vertical_acceleration: f32,
    pub max_vertical_speed: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            max_speed: 5.0,
            acceleration: 40.0,
            deceleration: 20.0,
            jump_speed_delta: 3.3,
            vertical_acceleration: -9.8,
            max_vertical_speed: 5.0,
        }
    }
}
