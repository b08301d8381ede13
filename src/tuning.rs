//! Game balance and level rules
//!
//! All gameplay numbers live here so they can be overridden from JSON
//! without touching the simulation. Defaults reproduce the shipped game.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::sim::{CoinKind, ObstacleShape};

/// What a level spawns and what it takes to leave it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelRule {
    pub level: u32,
    /// Coin type spawned while on this level (`None`: no coins)
    pub spawn_coin: Option<CoinKind>,
    /// Coins needed to advance (`None`: terminal level, never advances)
    pub coins_to_advance: Option<u32>,
    /// Coin type counted toward advancement
    pub advance_coin: Option<CoinKind>,
}

impl LevelRule {
    /// Counter that has to fill up, and how far, for this level to advance
    pub fn requirement(&self) -> Option<(CoinKind, u32)> {
        Some((self.advance_coin?, self.coins_to_advance?))
    }
}

/// Time bonus (seconds) per coin type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinBonuses {
    pub green: f32,
    pub blue: f32,
    pub violet: f32,
    pub yellow: f32,
    pub white: f32,
}

impl Default for CoinBonuses {
    fn default() -> Self {
        Self {
            green: 1.0,
            blue: 2.0,
            violet: 3.0,
            yellow: 5.0,
            white: 7.0,
        }
    }
}

impl CoinBonuses {
    pub fn get(&self, kind: CoinKind) -> f32 {
        match kind {
            CoinKind::Green => self.green,
            CoinKind::Blue => self.blue,
            CoinKind::Violet => self.violet,
            CoinKind::Yellow => self.yellow,
            CoinKind::White => self.white,
        }
    }
}

/// Durations of display-only effects (ms)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectDurations {
    pub floating_text_ms: u32,
    pub hit_shake_ms: u32,
    pub jump_pose_ms: u32,
    pub collect_pulse_ms: u32,
}

impl Default for EffectDurations {
    fn default() -> Self {
        Self {
            floating_text_ms: 1200,
            hit_shake_ms: 300,
            jump_pose_ms: 200,
            collect_pulse_ms: 200,
        }
    }
}

/// Complete balance sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Arena ===
    pub arena_width: f32,
    pub arena_height: f32,
    /// Left edge of the avatar (px)
    pub avatar_x: f32,
    pub avatar_width: f32,
    pub avatar_height: f32,

    // === Physics ===
    /// Gravity (px/s², pulls toward the ground)
    pub gravity: f32,
    pub initial_jump_velocity: f32,
    /// Jump velocity multiplier once combo reaches tier 1
    pub combo_jump_multiplier: f32,
    /// Extra factor applied to the mid-air impulse
    pub double_jump_boost: f32,
    pub double_jump_unlock_level: u32,
    pub ground_y: f32,

    // === Speed ===
    pub base_speed: f32,
    pub combo3_speed_multiplier: f32,
    pub combo6_speed_multiplier: f32,
    pub boost_speed_multiplier: f32,
    pub boost_duration_s: f32,
    /// Permanent speed multiplier per level (last entry reused past the end)
    pub level_speed_multipliers: Vec<f32>,
    /// Permanent jump multiplier per level (last entry reused past the end)
    pub level_jump_multipliers: Vec<f32>,

    // === Time and score ===
    pub initial_time_s: f32,
    pub max_time_cap_s: f32,
    pub obstacle_hit_penalty_s: f32,
    /// Base points per coin, scaled by combo when applied
    pub coin_score_multiplier: u32,

    // === Obstacle spawning (ms) ===
    pub obstacle_base_interval_ms: f64,
    pub obstacle_min_gap_ms: f64,
    pub obstacle_rate_decrease_factor: f64,
    pub max_consecutive_obstacles: u32,
    pub consecutive_break_multiplier: f64,
    /// Minimum horizontal gap inside a paired obstacle (px)
    pub paired_obstacle_gap_px: f32,
    pub large_obstacle_chance: f64,
    /// Large obstacles appear from this level on
    pub large_obstacle_min_level: u32,
    pub double_obstacle_chance: f64,
    /// Obstacle shapes unlocked per level (last pool reused past the end)
    pub shapes_by_level: Vec<Vec<ObstacleShape>>,

    // === Coin spawning (ms) ===
    pub coin_base_interval_ms: f64,
    pub coin_min_interval_ms: f64,
    pub coin_interval_randomness_ms: f64,
    pub coin_combo6_interval_multiplier: f64,
    pub coin_bonuses: CoinBonuses,

    // === Collision margins (px) ===
    /// Negative shrinks the obstacle hit box
    pub obstacle_hit_margin: f32,
    /// Positive widens the coin pickup box
    pub coin_pickup_margin: f32,

    // === Progression ===
    pub level_rules: Vec<LevelRule>,

    // === Presentation / ranking ===
    pub effects: EffectDurations,
    pub ranking_max_name_length: usize,
    pub ranking_top_n: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        use CoinKind::*;
        use ObstacleShape::*;

        let rule = |level, kind| LevelRule {
            level,
            spawn_coin: Some(kind),
            coins_to_advance: Some(3),
            advance_coin: Some(kind),
        };

        Self {
            arena_width: 800.0,
            arena_height: 400.0,
            avatar_x: 80.0,
            avatar_width: 40.0,
            avatar_height: 40.0,

            gravity: 1800.0,
            initial_jump_velocity: 700.0,
            combo_jump_multiplier: 1.1,
            double_jump_boost: 1.1,
            double_jump_unlock_level: 3,
            ground_y: 0.0,

            base_speed: 420.0,
            combo3_speed_multiplier: 1.2,
            combo6_speed_multiplier: 1.5,
            boost_speed_multiplier: 1.5,
            boost_duration_s: 5.0,
            level_speed_multipliers: vec![1.0, 1.4, 1.4, 1.4, 1.4, 1.4],
            level_jump_multipliers: vec![1.0, 1.0, 1.4, 1.4, 1.4, 1.4],

            initial_time_s: 120.0,
            max_time_cap_s: 150.0,
            obstacle_hit_penalty_s: 1.0,
            coin_score_multiplier: 5,

            obstacle_base_interval_ms: 1800.0,
            obstacle_min_gap_ms: 600.0,
            obstacle_rate_decrease_factor: 0.97,
            max_consecutive_obstacles: 3,
            consecutive_break_multiplier: 1.5,
            paired_obstacle_gap_px: 100.0,
            large_obstacle_chance: 0.3,
            large_obstacle_min_level: 3,
            double_obstacle_chance: 0.4,
            shapes_by_level: vec![
                vec![Square],
                vec![Square, Triangle],
                vec![Square, Triangle, Line, Cube],
                vec![Square, Triangle, Line, Cube, Zeta],
                vec![Square, Triangle, Line, Cube, Zeta, LShape],
            ],

            coin_base_interval_ms: 2500.0,
            coin_min_interval_ms: 1800.0,
            coin_interval_randomness_ms: 1000.0,
            coin_combo6_interval_multiplier: 0.75,
            coin_bonuses: CoinBonuses::default(),

            obstacle_hit_margin: -10.0,
            coin_pickup_margin: 5.0,

            level_rules: vec![
                rule(0, Green),
                rule(1, Blue),
                rule(2, Violet),
                rule(3, Yellow),
                rule(4, White),
                LevelRule {
                    level: 5,
                    spawn_coin: Some(White),
                    coins_to_advance: None,
                    advance_coin: None,
                },
            ],

            effects: EffectDurations::default(),
            ranking_max_name_length: 15,
            ranking_top_n: 20,
        }
    }
}

impl Tuning {
    /// Parse overrides; absent fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse overrides, falling back to the defaults on malformed input
    pub fn from_json_or_default(json: &str) -> Self {
        Self::from_json(json).unwrap_or_else(|e| {
            log::warn!("Malformed tuning, using defaults: {e}");
            Self::default()
        })
    }

    /// Read overrides from a file. Unreadable or malformed files degrade to
    /// the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => {
                log::info!("Loading tuning overrides from {}", path.display());
                Self::from_json_or_default(&json)
            }
            Err(e) => {
                log::warn!("Cannot read tuning {}, using defaults: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Rule governing `level`, if the table defines one
    pub fn rule_for(&self, level: u32) -> Option<&LevelRule> {
        self.level_rules.iter().find(|r| r.level == level)
    }

    /// Highest level the rule table reaches
    pub fn max_level(&self) -> u32 {
        self.level_rules.iter().map(|r| r.level).max().unwrap_or(0)
    }

    pub fn level_speed_multiplier(&self, level: u32) -> f32 {
        clamped_lookup(&self.level_speed_multipliers, level)
            .copied()
            .unwrap_or(1.0)
    }

    pub fn level_jump_multiplier(&self, level: u32) -> f32 {
        clamped_lookup(&self.level_jump_multipliers, level)
            .copied()
            .unwrap_or(1.0)
    }

    /// Shapes available at `level` (empty if the table has none)
    pub fn shape_pool(&self, level: u32) -> &[ObstacleShape] {
        clamped_lookup(&self.shapes_by_level, level)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn boost_duration_ms(&self) -> f64 {
        f64::from(self.boost_duration_s) * 1000.0
    }
}

/// Index into a per-level table, reusing the last entry past its end
fn clamped_lookup<T>(table: &[T], level: u32) -> Option<&T> {
    let last = table.len().checked_sub(1)?;
    table.get((level as usize).min(last))
}
