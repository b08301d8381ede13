//! Platform collaborator interfaces
//!
//! The simulation talks to the outside world only through these:
//! - `Presenter`: turns simulation state into visuals
//! - `InputIntent`: discrete intents produced by device input
//! - `FocusGuard`: pause/resume on focus and visibility changes

use glam::Vec2;

use crate::sim::{Coin, Obstacle, ProgressEvent};

/// Fire-and-forget visual effects. Each carries its own lifetime; nothing in
/// the simulation depends on them completing.
#[derive(Debug, Clone, PartialEq)]
pub enum VisualEffect {
    /// Arena shake after an obstacle hit
    HitShake { duration_ms: u32 },
    /// Avatar jump pose
    JumpPose { duration_ms: u32 },
    /// Avatar pulse after a pickup
    CollectPulse { duration_ms: u32 },
    /// "+2s" / "-1s" text floating at a position
    FloatingText {
        at: Vec2,
        text: String,
        positive: bool,
        lifetime_ms: u32,
    },
}

/// Rendering collaborator
pub trait Presenter {
    /// HUD values, pushed once per simulated frame
    fn update_display(&mut self, score: u64, time_remaining: f32, combo: u32);

    /// Level-based arena style
    fn level_style(&mut self, _level: u32) {}

    fn effect(&mut self, _effect: VisualEffect) {}

    /// Current entity positions, after movement and collisions
    fn entities(&mut self, _obstacles: &[Obstacle], _coins: &[Coin]) {}

    fn progress_event(&mut self, _event: &ProgressEvent) {}

    /// Remove leftover entities and hit flags before a new run
    fn reset_scene(&mut self) {}
}

/// Presenter that draws nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn update_display(&mut self, _score: u64, _time_remaining: f32, _combo: u32) {}
}

/// Discrete input intents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputIntent {
    Jump,
    Pause,
    Resume,
}

/// Turns focus/visibility changes into pause/resume intents.
///
/// Only pauses an actively running game, and only resumes a pause it caused
/// itself (a manual pause stays paused when focus returns).
#[derive(Debug, Default, Clone, Copy)]
pub struct FocusGuard {
    paused_by_guard: bool,
}

impl FocusGuard {
    /// Window blurred or tab hidden
    pub fn on_focus_lost(&mut self, game_active: bool) -> Option<InputIntent> {
        if game_active {
            self.paused_by_guard = true;
            Some(InputIntent::Pause)
        } else {
            None
        }
    }

    /// Window focused or tab visible again
    pub fn on_focus_gained(&mut self) -> Option<InputIntent> {
        if std::mem::take(&mut self.paused_by_guard) {
            Some(InputIntent::Resume)
        } else {
            None
        }
    }
}
