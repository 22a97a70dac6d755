//! Input handling.
//!
//! Window and keyboard integration live elsewhere. This module turns a
//! sampled input state into the per-tick `PlayerMove` message.

use chasm_shared::{angle::MessageAngle, net::PlayerMove};

/// User input state at a moment in time.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputState {
    /// -1..=1, positive is forward.
    pub forward: f32,
    /// -1..=1, positive is right.
    pub right: f32,
    /// View yaw in radians, counter-clockwise from +X.
    pub yaw: f32,
    pub jump: bool,
}

impl InputState {
    /// Requested acceleration in 0..=1; diagonal input is not faster.
    pub fn acceleration(self) -> f32 {
        (self.forward * self.forward + self.right * self.right)
            .sqrt()
            .min(1.0)
    }

    /// World-space movement direction in radians.
    pub fn direction(self) -> f32 {
        self.yaw + (-self.right).atan2(self.forward)
    }
}

/// Turns sampled input into a `PlayerMove`.
pub fn build_move(input: InputState) -> PlayerMove {
    let acceleration = input.acceleration();
    PlayerMove {
        acceleration: (acceleration * 255.0).round() as u8,
        angle: if acceleration > 0.0 {
            MessageAngle::from_radians(input.direction())
        } else {
            MessageAngle::from_radians(input.yaw)
        },
        jump_pressed: input.jump,
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    use super::*;

    #[test]
    fn forward_follows_yaw() {
        let mv = build_move(InputState {
            forward: 1.0,
            yaw: FRAC_PI_2,
            ..Default::default()
        });
        assert_eq!(mv.acceleration, 255);
        assert_eq!(mv.angle, MessageAngle(16384));
        assert!(!mv.jump_pressed);
    }

    #[test]
    fn strafe_right_is_clockwise() {
        let mv = build_move(InputState {
            right: 1.0,
            ..Default::default()
        });
        assert_eq!(mv.angle, MessageAngle::from_radians(-FRAC_PI_2));
    }

    #[test]
    fn diagonal_is_clamped() {
        let input = InputState {
            forward: 1.0,
            right: -1.0,
            ..Default::default()
        };
        assert_eq!(build_move(input).acceleration, 255);
        assert!((input.direction() - FRAC_PI_4).abs() < 1e-6);
    }

    #[test]
    fn idle_input() {
        let mv = build_move(InputState {
            jump: true,
            ..Default::default()
        });
        assert_eq!(mv.acceleration, 0);
        assert!(mv.jump_pressed);
    }
}
