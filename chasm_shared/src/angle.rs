//! Quantized angles for network messages.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

/// Steps in a full turn.
const ANGLE_STEPS: f32 = 65536.0;

/// Rotation angle packed into 16 bits; one full turn is 65536 steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MessageAngle(pub u16);

impl MessageAngle {
    /// Quantizes an angle in radians. Any real angle is accepted and wrapped.
    pub fn from_radians(radians: f32) -> Self {
        let steps = (radians / TAU * ANGLE_STEPS).round() as i64;
        Self(steps.rem_euclid(65536) as u16)
    }

    pub fn to_radians(self) -> f32 {
        f32::from(self.0) * (TAU / ANGLE_STEPS)
    }
}
