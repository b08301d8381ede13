//! Collision detection between the avatar and scrolling entities
//!
//! Detection is separated from mutation: `detect_collisions` only reports
//! what happened this frame as a `CollisionDiff` plus the entities to remove
//! and the feedback cues to show. The game loop applies the diff.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::spawn::{Coin, EntityId, Obstacle};
use super::state::CoinKind;
use crate::tuning::Tuning;

/// Axis-aligned bounding box (y grows upward from the ground)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn from_min_size(min: Vec2, size: Vec2) -> Self {
        Self {
            min,
            max: min + size,
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Overlap test with `other` grown by `margin` on every side
    /// (negative margins shrink it).
    pub fn overlaps(&self, other: &Rect, margin: f32) -> bool {
        self.min.x < other.max.x + margin
            && self.max.x > other.min.x - margin
            && self.min.y < other.max.y + margin
            && self.max.y > other.min.y - margin
    }
}

/// Flat score award, scaled by combo when applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreIncrement {
    pub multiplier: u32,
}

/// Coin collected this frame, for progression bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollectedCoin {
    pub kind: CoinKind,
    pub bonus: f32,
}

/// How the combo changes this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ComboDelta {
    /// Add one per coin collected
    Increment(u32),
    /// An obstacle was hit: full progression reset
    Reset,
    #[default]
    None,
}

/// Declarative effects of one frame's collisions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollisionDiff {
    pub score_increments: Vec<ScoreIncrement>,
    /// Seconds added to (or taken from) the countdown
    pub time_delta: f32,
    pub combo_delta: ComboDelta,
    pub boost_activate: bool,
    pub coins_collected: Vec<CollectedCoin>,
}

impl CollisionDiff {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn obstacle_hit(&self) -> bool {
        self.combo_delta == ComboDelta::Reset
    }
}

/// Visual feedback for a collision, anchored at the entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedbackCue {
    ObstacleHit { at: Vec2, penalty: f32 },
    CoinCollected { at: Vec2, bonus: f32 },
}

/// Everything the loop needs after detection
#[derive(Debug, Clone, Default)]
pub struct CollisionOutcome {
    pub diff: CollisionDiff,
    pub hit_obstacles: Vec<EntityId>,
    pub collected_coins: Vec<EntityId>,
    pub cues: Vec<FeedbackCue>,
}

/// Test the avatar against every live entity.
///
/// Obstacles are checked first with a shrunken hit box; any hit suppresses
/// all coin pickups this frame. Coins use a widened pickup box.
pub fn detect_collisions(
    avatar: &Rect,
    obstacles: &[Obstacle],
    coins: &[Coin],
    tuning: &Tuning,
) -> CollisionOutcome {
    let mut out = CollisionOutcome::default();
    let mut reset = false;

    for obstacle in obstacles.iter().filter(|o| !o.detached) {
        let bounds = obstacle.bounds();
        if avatar.overlaps(&bounds, tuning.obstacle_hit_margin) {
            log::debug!("Obstacle {} hit", obstacle.id);
            out.diff.time_delta -= tuning.obstacle_hit_penalty_s;
            reset = true;
            out.hit_obstacles.push(obstacle.id);
            out.cues.push(FeedbackCue::ObstacleHit {
                at: bounds.center(),
                penalty: tuning.obstacle_hit_penalty_s,
            });
        }
    }

    let mut picked = 0;
    if !reset {
        for coin in coins.iter().filter(|c| !c.detached) {
            let bounds = coin.bounds();
            if !avatar.overlaps(&bounds, tuning.coin_pickup_margin) {
                continue;
            }
            log::debug!("Coin {} ({}) collected", coin.id, coin.kind.as_str());
            out.diff.time_delta += coin.bonus;
            picked += 1;
            out.diff.score_increments.push(ScoreIncrement {
                multiplier: tuning.coin_score_multiplier,
            });
            out.diff.coins_collected.push(CollectedCoin {
                kind: coin.kind,
                bonus: coin.bonus,
            });
            if coin.kind.is_boost_eligible() {
                out.diff.boost_activate = true;
            }
            out.collected_coins.push(coin.id);
            out.cues.push(FeedbackCue::CoinCollected {
                at: bounds.center(),
                bonus: coin.bonus,
            });
        }
    }

    out.diff.combo_delta = if reset {
        ComboDelta::Reset
    } else if picked > 0 {
        ComboDelta::Increment(picked)
    } else {
        ComboDelta::None
    };

    out
}
