//! Avatar vertical kinematics and the jump / double-jump state machine

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use crate::consts::COMBO_TIER_1;
use crate::tuning::Tuning;

/// Which impulse a jump request produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    /// Take-off from the ground
    Ground,
    /// The single mid-air impulse of this flight
    Double,
}

/// The player's avatar (horizontal position is fixed, the world scrolls)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Avatar {
    /// Bottom edge height above the ground (px)
    pub y: f32,
    /// Vertical velocity (px/s, positive is up)
    pub vy: f32,
    pub airborne: bool,
    /// One mid-air jump per flight, restored on landing
    pub double_jump_charge: bool,
}

impl Avatar {
    pub fn new(ground_y: f32) -> Self {
        Self {
            y: ground_y,
            vy: 0.0,
            airborne: false,
            double_jump_charge: true,
        }
    }

    /// Back on the ground, at rest, with the double jump charged
    pub fn reset(&mut self, ground_y: f32) {
        *self = Self::new(ground_y);
    }

    /// Apply gravity for `dt` seconds. Landing restores the double jump.
    pub fn integrate(&mut self, dt: f32, tuning: &Tuning) {
        self.vy -= tuning.gravity * dt;
        self.y += self.vy * dt;

        if self.y <= tuning.ground_y {
            self.y = tuning.ground_y;
            self.vy = 0.0;
            if self.airborne {
                self.airborne = false;
                self.double_jump_charge = true;
            }
        }
    }

    /// Handle a jump request. Grounded jumps always succeed while running;
    /// one extra impulse per flight is allowed once `level` unlocks it.
    pub fn jump(
        &mut self,
        combo: u32,
        level: u32,
        running: bool,
        tuning: &Tuning,
    ) -> Option<JumpKind> {
        if !running {
            return None;
        }

        let base = tuning.initial_jump_velocity * tuning.level_jump_multiplier(level);
        let combo_mul = if combo >= COMBO_TIER_1 {
            tuning.combo_jump_multiplier
        } else {
            1.0
        };
        let jump_velocity = base * combo_mul;

        if !self.airborne {
            self.airborne = true;
            self.vy = jump_velocity;
            Some(JumpKind::Ground)
        } else if level >= tuning.double_jump_unlock_level && self.double_jump_charge {
            self.vy = jump_velocity * tuning.double_jump_boost;
            self.double_jump_charge = false;
            Some(JumpKind::Double)
        } else {
            log::trace!(
                "Jump ignored (level={level}, double_jump_charge={})",
                self.double_jump_charge
            );
            None
        }
    }

    /// World-space bounding box
    pub fn bounds(&self, tuning: &Tuning) -> Rect {
        Rect::from_min_size(
            Vec2::new(tuning.avatar_x, self.y),
            Vec2::new(tuning.avatar_width, tuning.avatar_height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn fly_until_landed(avatar: &mut Avatar, tuning: &Tuning) -> u32 {
        let mut frames = 0;
        while avatar.airborne && frames < 10_000 {
            avatar.integrate(DT, tuning);
            frames += 1;
        }
        frames
    }

    #[test]
    fn test_ground_jump_velocity() {
        let tuning = Tuning::default();
        let mut avatar = Avatar::new(tuning.ground_y);
        assert_eq!(avatar.jump(0, 0, true, &tuning), Some(JumpKind::Ground));
        assert_eq!(avatar.vy, 700.0);
        assert!(avatar.airborne);
    }

    #[test]
    fn test_jump_scaled_by_level_and_combo() {
        let tuning = Tuning::default();
        let mut avatar = Avatar::new(tuning.ground_y);
        avatar.jump(3, 2, true, &tuning);
        assert!((avatar.vy - 700.0 * 1.4 * 1.1).abs() < 1e-3);
    }

    #[test]
    fn test_no_jump_when_not_running() {
        let tuning = Tuning::default();
        let mut avatar = Avatar::new(tuning.ground_y);
        assert_eq!(avatar.jump(0, 0, false, &tuning), None);
        assert!(!avatar.airborne);
        assert_eq!(avatar.vy, 0.0);
    }

    #[test]
    fn test_double_jump_needs_unlock_level() {
        let tuning = Tuning::default();
        let mut avatar = Avatar::new(tuning.ground_y);
        avatar.jump(0, 2, true, &tuning);
        avatar.integrate(DT, &tuning);
        assert_eq!(avatar.jump(0, 2, true, &tuning), None);
        assert!(avatar.double_jump_charge);
    }

    #[test]
    fn test_double_jump_once_per_flight() {
        let tuning = Tuning::default();
        let mut avatar = Avatar::new(tuning.ground_y);
        assert_eq!(avatar.jump(0, 3, true, &tuning), Some(JumpKind::Ground));
        avatar.integrate(DT, &tuning);

        assert_eq!(avatar.jump(0, 3, true, &tuning), Some(JumpKind::Double));
        assert!(!avatar.double_jump_charge);
        let expected = 700.0 * 1.4 * 1.1;
        assert!((avatar.vy - expected).abs() < 1e-3);

        avatar.integrate(DT, &tuning);
        assert_eq!(avatar.jump(0, 3, true, &tuning), None);
    }

    #[test]
    fn test_landing_restores_charge() {
        let tuning = Tuning::default();
        let mut avatar = Avatar::new(tuning.ground_y);
        avatar.jump(0, 3, true, &tuning);
        avatar.integrate(DT, &tuning);
        avatar.jump(0, 3, true, &tuning);

        let frames = fly_until_landed(&mut avatar, &tuning);
        assert!(frames > 0 && frames < 10_000);
        assert_eq!(avatar.y, tuning.ground_y);
        assert_eq!(avatar.vy, 0.0);
        assert!(avatar.double_jump_charge);

        // Exactly one more mid-air jump in the next flight
        avatar.jump(0, 3, true, &tuning);
        avatar.integrate(DT, &tuning);
        assert_eq!(avatar.jump(0, 3, true, &tuning), Some(JumpKind::Double));
        assert_eq!(avatar.jump(0, 3, true, &tuning), None);
    }

    #[test]
    fn test_grounded_integration_stays_on_ground() {
        let tuning = Tuning::default();
        let mut avatar = Avatar::new(tuning.ground_y);
        for _ in 0..10 {
            avatar.integrate(DT, &tuning);
        }
        assert_eq!(avatar.y, tuning.ground_y);
        assert!(!avatar.airborne);
    }
}
