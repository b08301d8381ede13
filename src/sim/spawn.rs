//! Obstacle and coin spawners
//!
//! Both spawners are self-rescheduling chains: each spawn re-arms the
//! spawner's one-shot task with a delay computed from the *current* speed
//! and combo, so spawn frequency reacts to progression between spawns.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::clock::ScheduledTask;
use super::collision::Rect;
use super::state::CoinKind;
use crate::consts::*;
use crate::tuning::Tuning;

/// Entity identifier, unique within a session
pub type EntityId = u32;

/// Hands out entity IDs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdAllocator {
    next: EntityId,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    pub fn next_id(&mut self) -> EntityId {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        id
    }
}

/// Obstacle silhouettes, unlocked progressively by level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleShape {
    Square,
    Triangle,
    Line,
    Cube,
    Zeta,
    LShape,
}

impl ObstacleShape {
    /// Base size in px (width, height)
    pub fn size(self) -> Vec2 {
        match self {
            ObstacleShape::Square => Vec2::new(40.0, 40.0),
            ObstacleShape::Triangle => Vec2::new(40.0, 40.0),
            ObstacleShape::Line => Vec2::new(20.0, 70.0),
            ObstacleShape::Cube => Vec2::new(50.0, 50.0),
            ObstacleShape::Zeta => Vec2::new(60.0, 40.0),
            ObstacleShape::LShape => Vec2::new(50.0, 60.0),
        }
    }

    /// Whether the silhouette survives scaling to "large" undistorted
    pub fn scales_cleanly(self) -> bool {
        matches!(
            self,
            ObstacleShape::Square | ObstacleShape::Cube | ObstacleShape::Line
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ObstacleShape::Square => "square",
            ObstacleShape::Triangle => "triangle",
            ObstacleShape::Line => "line",
            ObstacleShape::Cube => "cube",
            ObstacleShape::Zeta => "zeta",
            ObstacleShape::LShape => "lshape",
        }
    }
}

/// A ground obstacle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: EntityId,
    pub shape: ObstacleShape,
    pub large: bool,
    /// Left edge (px)
    pub x: f32,
    /// Bottom edge (px)
    pub y: f32,
    /// Removed from the scene by someone else; swept next frame
    pub detached: bool,
}

impl Obstacle {
    pub fn new(id: EntityId, shape: ObstacleShape, large: bool, x: f32, y: f32) -> Self {
        Self {
            id,
            shape,
            large,
            x,
            y,
            detached: false,
        }
    }

    pub fn size(&self) -> Vec2 {
        if self.large {
            self.shape.size() * LARGE_OBSTACLE_SCALE
        } else {
            self.shape.size()
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_min_size(Vec2::new(self.x, self.y), self.size())
    }
}

/// A collectible coin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coin {
    pub id: EntityId,
    pub kind: CoinKind,
    /// Seconds added to the countdown when collected
    pub bonus: f32,
    pub x: f32,
    pub y: f32,
    pub detached: bool,
}

impl Coin {
    pub fn new(id: EntityId, kind: CoinKind, bonus: f32, x: f32, y: f32) -> Self {
        Self {
            id,
            kind,
            bonus,
            x,
            y,
            detached: false,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_min_size(Vec2::new(self.x, self.y), Vec2::splat(COIN_SIZE))
    }
}

/// Milliseconds since the last spawn (infinite before the first one)
fn since_last(last_spawn_ms: Option<f64>, now_ms: f64) -> f64 {
    last_spawn_ms.map_or(f64::INFINITY, |last| now_ms - last)
}

/// Obstacle spawner
#[derive(Debug, Clone, Default)]
pub struct ObstacleSpawner {
    obstacles: Vec<Obstacle>,
    timer: ScheduledTask,
    last_spawn_ms: Option<f64>,
    /// Obstacles spawned in the current run without a breather
    consecutive: u32,
}

impl ObstacleSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all obstacles, cancel the pending spawn, clear counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn obstacles_mut(&mut self) -> &mut [Obstacle] {
        &mut self.obstacles
    }

    /// Place an obstacle directly, bypassing the spawn rules
    pub fn insert(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn timer(&self) -> &ScheduledTask {
        &self.timer
    }

    pub fn cancel(&mut self) {
        self.timer.cancel();
    }

    pub fn fire_if_due(&mut self, now_ms: f64) -> bool {
        self.timer.fire_if_due(now_ms)
    }

    /// Delay until the next obstacle for the given live parameters
    pub fn next_delay_ms(&self, speed: f32, combo: u32, now_ms: f64, tuning: &Tuning) -> f64 {
        let mut base = tuning.obstacle_base_interval_ms;
        if combo >= COMBO_TIER_1 {
            let steps = (combo - 2).min(MAX_RATE_DECREASE_STEPS);
            base *= tuning.obstacle_rate_decrease_factor.powi(steps as i32);
        }
        if self.consecutive >= tuning.max_consecutive_obstacles {
            base *= tuning.consecutive_break_multiplier;
        }

        // Keep obstacles visually apart at the current scroll speed
        let crossing_ms = if speed > 0.0 {
            f64::from(tuning.arena_width / speed) * 1000.0
        } else {
            0.0
        };
        let min_gap =
            crossing_ms * f64::from(OBSTACLE_CROSSING_GAP_FRACTION) + tuning.obstacle_min_gap_ms;

        min_gap.max(base - since_last(self.last_spawn_ms, now_ms))
    }

    /// Arm the next spawn, or cancel if the game is not running.
    /// Returns the chosen delay.
    pub fn schedule(
        &mut self,
        running: bool,
        speed: f32,
        combo: u32,
        now_ms: f64,
        tuning: &Tuning,
    ) -> Option<f64> {
        self.timer.cancel();
        if !running {
            return None;
        }
        let delay = self.next_delay_ms(speed, combo, now_ms, tuning);
        self.timer.arm(now_ms, delay);
        Some(delay)
    }

    /// Spawn one obstacle (sometimes a pair) just past the right edge.
    /// Returns how many were created.
    pub fn spawn<R: Rng>(
        &mut self,
        level: u32,
        combo: u32,
        now_ms: f64,
        ids: &mut IdAllocator,
        rng: &mut R,
        tuning: &Tuning,
    ) -> usize {
        if self.consecutive >= tuning.max_consecutive_obstacles {
            self.consecutive = 0;
        }
        self.last_spawn_ms = Some(now_ms);

        let Some(first) = Self::create(level, tuning.arena_width, ids, rng, tuning) else {
            log::debug!("No obstacle shapes for level {level}, skipping spawn");
            return 0;
        };
        let first_width = first.size().x;
        let first_x = first.x;
        self.obstacles.push(first);
        self.consecutive += 1;
        let mut spawned = 1;

        if combo >= COMBO_TIER_1
            && rng.random::<f64>() < tuning.double_obstacle_chance
            && self.consecutive < tuning.max_consecutive_obstacles
        {
            let gap = tuning.paired_obstacle_gap_px + rng.random::<f32>() * PAIRED_GAP_JITTER;
            let x = first_x + first_width + gap;
            if let Some(second) = Self::create(level, x, ids, rng, tuning) {
                self.obstacles.push(second);
                self.consecutive += 1;
                spawned += 1;
                log::debug!("Paired obstacle spawned");
            }
        }

        spawned
    }

    fn create<R: Rng>(
        level: u32,
        x: f32,
        ids: &mut IdAllocator,
        rng: &mut R,
        tuning: &Tuning,
    ) -> Option<Obstacle> {
        let pool = tuning.shape_pool(level);
        if pool.is_empty() {
            return None;
        }
        let shape = pool[rng.random_range(0..pool.len())];
        let large = shape.scales_cleanly()
            && level >= tuning.large_obstacle_min_level
            && rng.random::<f64>() < tuning.large_obstacle_chance;
        Some(Obstacle::new(ids.next_id(), shape, large, x, tuning.ground_y))
    }

    /// Scroll every obstacle left by `dx` px
    pub fn advance(&mut self, dx: f32) {
        for obstacle in &mut self.obstacles {
            obstacle.x -= dx;
        }
    }

    /// Remove obstacles that scrolled off the left edge or were detached
    pub fn sweep_out_of_bounds(&mut self) -> usize {
        let before = self.obstacles.len();
        self.obstacles
            .retain(|o| !o.detached && o.x + o.size().x >= 0.0);
        before - self.obstacles.len()
    }

    pub fn remove(&mut self, ids: &[EntityId]) {
        if !ids.is_empty() {
            self.obstacles.retain(|o| !ids.contains(&o.id));
        }
    }

    /// Mark an obstacle as removed by an outside party
    pub fn detach(&mut self, id: EntityId) {
        if let Some(o) = self.obstacles.iter_mut().find(|o| o.id == id) {
            o.detached = true;
        }
    }
}

/// Coin spawner
#[derive(Debug, Clone, Default)]
pub struct CoinSpawner {
    coins: Vec<Coin>,
    timer: ScheduledTask,
    last_spawn_ms: Option<f64>,
}

impl CoinSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    pub fn coins_mut(&mut self) -> &mut [Coin] {
        &mut self.coins
    }

    pub fn insert(&mut self, coin: Coin) {
        self.coins.push(coin);
    }

    pub fn timer(&self) -> &ScheduledTask {
        &self.timer
    }

    pub fn cancel(&mut self) {
        self.timer.cancel();
    }

    pub fn fire_if_due(&mut self, now_ms: f64) -> bool {
        self.timer.fire_if_due(now_ms)
    }

    pub fn next_delay_ms<R: Rng>(
        &self,
        combo: u32,
        now_ms: f64,
        rng: &mut R,
        tuning: &Tuning,
    ) -> f64 {
        let mut base = tuning.coin_base_interval_ms;
        if combo >= COMBO_TIER_2 {
            base *= tuning.coin_combo6_interval_multiplier;
        }
        base += rng.random::<f64>() * tuning.coin_interval_randomness_ms;
        tuning
            .coin_min_interval_ms
            .max(base - since_last(self.last_spawn_ms, now_ms))
    }

    pub fn schedule<R: Rng>(
        &mut self,
        running: bool,
        combo: u32,
        now_ms: f64,
        rng: &mut R,
        tuning: &Tuning,
    ) -> Option<f64> {
        self.timer.cancel();
        if !running {
            return None;
        }
        let delay = self.next_delay_ms(combo, now_ms, rng, tuning);
        self.timer.arm(now_ms, delay);
        Some(delay)
    }

    /// Spawn the current level's coin type, if the level has one
    pub fn spawn<R: Rng>(
        &mut self,
        level: u32,
        now_ms: f64,
        ids: &mut IdAllocator,
        rng: &mut R,
        tuning: &Tuning,
    ) -> Option<EntityId> {
        self.last_spawn_ms = Some(now_ms);

        let Some(kind) = tuning.rule_for(level).and_then(|r| r.spawn_coin) else {
            log::debug!("No coin type for level {level}, skipping spawn");
            return None;
        };
        let bonus = tuning.coin_bonuses.get(kind);

        let x = tuning.arena_width + rng.random::<f32>() * COIN_SPAWN_JITTER;
        let height = tuning.arena_height;
        let top = (height * COIN_MAX_HEIGHT_FRACTION)
            .min(height - COIN_ROOF_CLEARANCE)
            .max(COIN_SAFE_BOTTOM_MIN);
        let y = COIN_SAFE_BOTTOM_MIN + rng.random::<f32>() * (top - COIN_SAFE_BOTTOM_MIN);

        let id = ids.next_id();
        log::debug!("Spawning {} coin (+{bonus}s) on level {level}", kind.as_str());
        self.coins.push(Coin::new(id, kind, bonus, x, y));
        Some(id)
    }

    pub fn advance(&mut self, dx: f32) {
        for coin in &mut self.coins {
            coin.x -= dx;
        }
    }

    pub fn sweep_out_of_bounds(&mut self) -> usize {
        let before = self.coins.len();
        self.coins.retain(|c| !c.detached && c.x + COIN_SIZE >= 0.0);
        before - self.coins.len()
    }

    pub fn remove(&mut self, ids: &[EntityId]) {
        if !ids.is_empty() {
            self.coins.retain(|c| !ids.contains(&c.id));
        }
    }

    pub fn detach(&mut self, id: EntityId) {
        if let Some(c) = self.coins.iter_mut().find(|c| c.id == id) {
            c.detached = true;
        }
    }
}
