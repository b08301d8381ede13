//! Neon Runner - An endless-runner arcade game core
//!
//! Core modules:
//! - `sim`: Simulation (avatar physics, spawning, collisions, progression, game loop)
//! - `tuning`: Data-driven game balance and level rules
//! - `platform`: Presentation and input collaborator interfaces
//! - `ranking`: Score submission and leaderboard retrieval

pub mod platform;
pub mod ranking;
pub mod sim;
pub mod tuning;

pub use ranking::{Leaderboard, RankingService, ScoreSubmission};
pub use sim::{FrameOutcome, Session};
pub use tuning::Tuning;

/// Fixed constants that are not part of the tunable balance
pub mod consts {
    /// Nominal display refresh used by the headless driver (ms per frame)
    pub const FRAME_MS: f64 = 1000.0 / 60.0;

    /// Fallback player name when registration left it blank
    pub const ANONYMOUS_NAME: &str = "Anonymous";
    /// Name shown for leaderboard records without one
    pub const UNKNOWN_NAME: &str = "???";

    /// Vertical band for coin placement: lowest bottom offset (px)
    pub const COIN_SAFE_BOTTOM_MIN: f32 = 50.0;
    /// Keep coins this far below the roof (px)
    pub const COIN_ROOF_CLEARANCE: f32 = 80.0;
    /// Coins never spawn above this fraction of the arena height
    pub const COIN_MAX_HEIGHT_FRACTION: f32 = 0.7;
    /// Horizontal spawn jitter past the right edge for coins (px)
    pub const COIN_SPAWN_JITTER: f32 = 150.0;
    /// Coin edge length (px)
    pub const COIN_SIZE: f32 = 30.0;

    /// Share of the arena crossing time reserved between obstacle spawns
    pub const OBSTACLE_CROSSING_GAP_FRACTION: f32 = 0.2;
    /// Extra random gap between paired obstacles (px)
    pub const PAIRED_GAP_JITTER: f32 = 50.0;
    /// Size multiplier of "large" obstacles
    pub const LARGE_OBSTACLE_SCALE: f32 = 1.5;
    /// Exponent cap for combo-driven obstacle interval tightening
    pub const MAX_RATE_DECREASE_STEPS: u32 = 10;

    /// Combo needed for the first speed/jump tier and paired obstacles
    pub const COMBO_TIER_1: u32 = 3;
    /// Combo needed for the top speed tier and faster coins
    pub const COMBO_TIER_2: u32 = 6;

    /// Floating text is raised this far above the struck entity (px)
    pub const FLOATING_TEXT_RISE: f32 = 10.0;
}

/// Truncate a string to at most `max_chars` characters (char-boundary safe)
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
