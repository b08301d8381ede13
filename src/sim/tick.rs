//! Game loop: session lifecycle, per-frame simulation and effect application
//!
//! One `frame()` call per display refresh. Within a frame the order is fixed:
//! countdown, speed, avatar physics, scrolling, out-of-bounds sweep,
//! collision detection, diff application, HUD push, termination check.
//! Spawner timers are independent callbacks (`fire_due_timers`).

use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::avatar::{Avatar, JumpKind};
use super::clock::Clock;
use super::collision::{CollisionDiff, ComboDelta, FeedbackCue, detect_collisions};
use super::spawn::{CoinSpawner, IdAllocator, ObstacleSpawner};
use super::state::ProgressionState;
use crate::consts::{COMBO_TIER_1, COMBO_TIER_2, FLOATING_TEXT_RISE};
use crate::platform::{InputIntent, Presenter, VisualEffect};
use crate::ranking::ScoreSubmission;
use crate::tuning::Tuning;

/// Result of one frame callback
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Frame handled; call again next refresh
    Continue,
    /// The loop is not running; stop requesting frames
    Halted,
    /// Countdown reached zero this frame
    GameOver(ScoreSubmission),
}

/// Horizontal scroll speed (px/s) for the given progression.
/// Combo tiers are exclusive: the highest reached applies.
pub fn current_speed(tuning: &Tuning, level: u32, combo: u32, boost_active: bool) -> f32 {
    let level_mul = tuning.level_speed_multiplier(level);
    let combo_mul = if combo >= COMBO_TIER_2 {
        tuning.combo6_speed_multiplier
    } else if combo >= COMBO_TIER_1 {
        tuning.combo3_speed_multiplier
    } else {
        1.0
    };
    let boost_mul = if boost_active {
        tuning.boost_speed_multiplier
    } else {
        1.0
    };
    tuning.base_speed * level_mul * combo_mul * boost_mul
}

/// What applying a diff changed, for presentation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedEffects {
    pub level_advanced: bool,
    pub progression_reset: bool,
}

/// Apply one frame's collision effects to the progression state.
///
/// Order: time, score (scaled by the combo at this point), coin counters and
/// power-ups, a single level-advance check, combo change or full reset,
/// boost refresh.
pub fn apply_collision_diff(
    state: &mut ProgressionState,
    diff: &CollisionDiff,
    tuning: &Tuning,
    now_ms: f64,
) -> AppliedEffects {
    let mut applied = AppliedEffects::default();

    if diff.time_delta != 0.0 {
        state.set_time_remaining(state.time_remaining() + diff.time_delta);
    }

    let combo_scale = u64::from(state.combo().max(1));
    for increment in &diff.score_increments {
        state.add_score(u64::from(increment.multiplier) * combo_scale);
    }

    if !diff.coins_collected.is_empty() {
        for coin in &diff.coins_collected {
            state.add_coin(coin.kind);
            if coin.kind.power_up().is_some() {
                state.grant_power_up(coin.kind);
            }
        }
        applied.level_advanced = check_level_advance(state, tuning);
    }

    match diff.combo_delta {
        ComboDelta::Reset => {
            log::info!("Obstacle hit: progression reset");
            state.reset_combo();
            state.deactivate_boost();
            state.set_level(0);
            state.reset_all_power_ups();
            applied.progression_reset = true;
        }
        ComboDelta::Increment(n) => {
            for _ in 0..n {
                state.increment_combo();
            }
        }
        ComboDelta::None => {}
    }

    if diff.boost_activate {
        state.activate_boost(now_ms, now_ms + tuning.boost_duration_ms());
    }

    applied
}

/// Advance at most one level if the current rule's counter is full
fn check_level_advance(state: &mut ProgressionState, tuning: &Tuning) -> bool {
    let level = state.level();
    let Some((kind, required)) = tuning.rule_for(level).and_then(|r| r.requirement()) else {
        return false;
    };
    if state.coin_count(kind) < required || level >= state.max_level() {
        return false;
    }
    log::info!(
        "Level up: {} -> {} ({} {} coins)",
        level,
        level + 1,
        state.coin_count(kind),
        kind.as_str()
    );
    state.set_level(level + 1);
    state.reset_coin_count(Some(kind));
    true
}

/// One play session: owns every piece of mutable game state
pub struct Session<C: Clock, P: Presenter> {
    tuning: Tuning,
    clock: C,
    presenter: P,
    rng: Pcg32,
    state: ProgressionState,
    avatar: Avatar,
    obstacles: ObstacleSpawner,
    coins: CoinSpawner,
    ids: IdAllocator,
    /// Scroll speed (px/s) as of the last update
    speed: f32,
    /// Clock reading of the previous frame; `None` until anchored
    last_frame_ms: Option<f64>,
    /// Whether the frame chain wants another callback
    frame_requested: bool,
}

impl<C: Clock, P: Presenter> Session<C, P> {
    pub fn new(tuning: Tuning, clock: C, presenter: P, seed: u64) -> Self {
        let mut state = ProgressionState::new(tuning.max_time_cap_s, tuning.max_level());
        state.initialize(tuning.initial_time_s);
        state.drain_events();
        let avatar = Avatar::new(tuning.ground_y);
        let speed = tuning.base_speed;
        Self {
            tuning,
            clock,
            presenter,
            rng: Pcg32::seed_from_u64(seed),
            state,
            avatar,
            obstacles: ObstacleSpawner::new(),
            coins: CoinSpawner::new(),
            ids: IdAllocator::default(),
            speed,
            last_frame_ms: None,
            frame_requested: false,
        }
    }

    // --- Accessors ---

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn state(&self) -> &ProgressionState {
        &self.state
    }

    /// Direct access for collaborators (and tests) that stage a scenario
    pub fn state_mut(&mut self) -> &mut ProgressionState {
        &mut self.state
    }

    pub fn avatar(&self) -> &Avatar {
        &self.avatar
    }

    pub fn obstacles(&self) -> &ObstacleSpawner {
        &self.obstacles
    }

    pub fn obstacles_mut(&mut self) -> &mut ObstacleSpawner {
        &mut self.obstacles
    }

    pub fn coins(&self) -> &CoinSpawner {
        &self.coins
    }

    pub fn coins_mut(&mut self) -> &mut CoinSpawner {
        &mut self.coins
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn frame_requested(&self) -> bool {
        self.frame_requested
    }

    /// Store the player before starting
    pub fn set_player(&mut self, name: &str, email: &str) {
        self.state.set_player(name, email);
    }

    // --- Lifecycle ---

    /// Begin a new run. No-op while one is in progress.
    pub fn start(&mut self) {
        if self.state.running() {
            return;
        }
        log::info!("Starting run");
        let now = self.clock.now_ms();

        self.state.initialize(self.tuning.initial_time_s);
        self.state.set_running(true);
        self.avatar.reset(self.tuning.ground_y);
        self.obstacles.reset();
        self.coins.reset();
        self.presenter.reset_scene();
        self.presenter.level_style(self.state.level());
        self.presenter.update_display(
            self.state.score(),
            self.state.time_remaining(),
            self.state.combo(),
        );
        self.forward_events();

        self.update_speed(now);
        self.schedule_spawners(now);
        self.last_frame_ms = None;
        self.frame_requested = true;
    }

    pub fn pause(&mut self) {
        if !self.state.running() || self.state.paused() {
            return;
        }
        self.state.set_paused(true);
        self.obstacles.cancel();
        self.coins.cancel();
        log::info!("Paused");
    }

    pub fn resume(&mut self) {
        if !self.state.running() || !self.state.paused() {
            return;
        }
        self.state.set_paused(false);
        // Re-anchor so the paused interval is not simulated
        self.last_frame_ms = None;
        let now = self.clock.now_ms();
        self.update_speed(now);
        self.schedule_spawners(now);
        self.frame_requested = true;
        log::info!("Resumed");
    }

    /// Jump request from input
    pub fn jump(&mut self) -> Option<JumpKind> {
        let kind = self.avatar.jump(
            self.state.combo(),
            self.state.level(),
            self.state.is_active(),
            &self.tuning,
        )?;
        self.presenter.effect(VisualEffect::JumpPose {
            duration_ms: self.tuning.effects.jump_pose_ms,
        });
        Some(kind)
    }

    pub fn handle_input(&mut self, intent: InputIntent) {
        match intent {
            InputIntent::Jump => {
                self.jump();
            }
            InputIntent::Pause => self.pause(),
            InputIntent::Resume => self.resume(),
        }
    }

    /// Run spawner callbacks whose deadline has passed. Each spawn re-arms
    /// its chain with the latest speed and combo.
    pub fn fire_due_timers(&mut self) {
        let now = self.clock.now_ms();
        let running = self.state.is_active();

        if self.obstacles.fire_if_due(now) && running {
            self.obstacles.spawn(
                self.state.level(),
                self.state.combo(),
                now,
                &mut self.ids,
                &mut self.rng,
                &self.tuning,
            );
            self.obstacles
                .schedule(running, self.speed, self.state.combo(), now, &self.tuning);
        }

        if self.coins.fire_if_due(now) && running {
            self.coins
                .spawn(self.state.level(), now, &mut self.ids, &mut self.rng, &self.tuning);
            self.coins
                .schedule(running, self.state.combo(), now, &mut self.rng, &self.tuning);
        }
    }

    /// One display-refresh callback
    pub fn frame(&mut self) -> FrameOutcome {
        if !self.state.running() {
            self.frame_requested = false;
            return FrameOutcome::Halted;
        }

        let now = self.clock.now_ms();
        let Some(last) = self.last_frame_ms.replace(now) else {
            // First frame after start/resume only anchors the clock
            return FrameOutcome::Continue;
        };
        if self.state.paused() {
            return FrameOutcome::Continue;
        }
        let dt = ((now - last).max(0.0) / 1000.0) as f32;

        self.state.set_time_remaining(self.state.time_remaining() - dt);
        self.update_speed(now);
        self.avatar.integrate(dt, &self.tuning);

        let dx = self.speed * dt;
        self.obstacles.advance(dx);
        self.coins.advance(dx);
        self.obstacles.sweep_out_of_bounds();
        self.coins.sweep_out_of_bounds();

        let outcome = detect_collisions(
            &self.avatar.bounds(&self.tuning),
            self.obstacles.obstacles(),
            self.coins.coins(),
            &self.tuning,
        );
        self.obstacles.remove(&outcome.hit_obstacles);
        self.coins.remove(&outcome.collected_coins);
        self.show_feedback(&outcome.cues);

        let level_before = self.state.level();
        apply_collision_diff(&mut self.state, &outcome.diff, &self.tuning, now);
        if self.state.level() != level_before {
            self.presenter.level_style(self.state.level());
        }

        self.presenter.update_display(
            self.state.score(),
            self.state.time_remaining(),
            self.state.combo(),
        );
        self.presenter
            .entities(self.obstacles.obstacles(), self.coins.coins());
        self.forward_events();

        if self.state.time_remaining() <= 0.0 {
            return FrameOutcome::GameOver(self.game_over());
        }
        FrameOutcome::Continue
    }

    /// Timer callbacks, then the frame callback
    pub fn pump(&mut self) -> FrameOutcome {
        self.fire_due_timers();
        self.frame()
    }

    /// End the run and hand back the score for submission
    pub fn game_over(&mut self) -> ScoreSubmission {
        let player = self.state.player();
        let submission = ScoreSubmission::new(
            &player.name,
            &player.email,
            self.state.score(),
            self.tuning.ranking_max_name_length,
        );
        if self.state.running() {
            log::info!("Game over, final score {}", self.state.score());
        }
        self.state.set_running(false);
        self.obstacles.cancel();
        self.coins.cancel();
        self.frame_requested = false;
        self.last_frame_ms = None;
        self.forward_events();
        submission
    }

    // --- Internals ---

    /// Recompute scroll speed, expiring the boost first
    fn update_speed(&mut self, now_ms: f64) {
        let boost = self.state.expire_boost(now_ms);
        self.speed = current_speed(&self.tuning, self.state.level(), self.state.combo(), boost);
    }

    fn schedule_spawners(&mut self, now_ms: f64) {
        let running = self.state.is_active();
        let combo = self.state.combo();
        self.obstacles
            .schedule(running, self.speed, combo, now_ms, &self.tuning);
        self.coins
            .schedule(running, combo, now_ms, &mut self.rng, &self.tuning);
    }

    fn show_feedback(&mut self, cues: &[FeedbackCue]) {
        let fx = &self.tuning.effects;
        for cue in cues {
            match *cue {
                FeedbackCue::ObstacleHit { at, penalty } => {
                    self.presenter.effect(VisualEffect::HitShake {
                        duration_ms: fx.hit_shake_ms,
                    });
                    self.presenter.effect(VisualEffect::FloatingText {
                        at: at + glam::Vec2::Y * FLOATING_TEXT_RISE,
                        text: format!("-{penalty}s"),
                        positive: false,
                        lifetime_ms: fx.floating_text_ms,
                    });
                }
                FeedbackCue::CoinCollected { at, bonus } => {
                    self.presenter.effect(VisualEffect::CollectPulse {
                        duration_ms: fx.collect_pulse_ms,
                    });
                    self.presenter.effect(VisualEffect::FloatingText {
                        at: at + glam::Vec2::Y * FLOATING_TEXT_RISE,
                        text: format!("+{bonus}s"),
                        positive: true,
                        lifetime_ms: fx.floating_text_ms,
                    });
                }
            }
        }
    }

    fn forward_events(&mut self) {
        for event in self.state.drain_events() {
            log::debug!("Progress event: {event:?}");
            self.presenter.progress_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::NullPresenter;
    use crate::sim::clock::ManualClock;
    use crate::sim::collision::{CollectedCoin, ScoreIncrement};
    use crate::sim::spawn::{Coin, EntityId, Obstacle, ObstacleShape};
    use crate::sim::state::{CoinKind, ProgressEvent};
    use proptest::prelude::*;

    const FRAME: f64 = 1000.0 / 60.0;

    /// Records what the session pushed out
    #[derive(Default)]
    struct Recorder {
        displays: Vec<(u64, f32, u32)>,
        styles: Vec<u32>,
        effects: Vec<VisualEffect>,
        events: Vec<ProgressEvent>,
        resets: u32,
        /// Last pushed scene: obstacle and coin positions by ID
        scene_obstacles: Vec<(EntityId, f32)>,
        scene_coins: Vec<(EntityId, f32)>,
    }

    impl Presenter for Recorder {
        fn update_display(&mut self, score: u64, time_remaining: f32, combo: u32) {
            self.displays.push((score, time_remaining, combo));
        }
        fn level_style(&mut self, level: u32) {
            self.styles.push(level);
        }
        fn effect(&mut self, effect: VisualEffect) {
            self.effects.push(effect);
        }
        fn progress_event(&mut self, event: &ProgressEvent) {
            self.events.push(*event);
        }
        fn reset_scene(&mut self) {
            self.resets += 1;
        }
        fn entities(&mut self, obstacles: &[Obstacle], coins: &[Coin]) {
            self.scene_obstacles = obstacles.iter().map(|o| (o.id, o.x)).collect();
            self.scene_coins = coins.iter().map(|c| (c.id, c.x)).collect();
        }
    }

    fn session() -> Session<ManualClock, Recorder> {
        Session::new(Tuning::default(), ManualClock::new(0.0), Recorder::default(), 7)
    }

    /// Start and consume the anchoring frame
    fn started() -> Session<ManualClock, Recorder> {
        let mut s = session();
        s.start();
        assert_eq!(s.frame(), FrameOutcome::Continue);
        s
    }

    fn step(s: &mut Session<ManualClock, Recorder>, ms: f64) -> FrameOutcome {
        s.clock().advance(ms);
        s.frame()
    }

    fn coin_diff(kinds: &[CoinKind]) -> CollisionDiff {
        let tuning = Tuning::default();
        CollisionDiff {
            score_increments: kinds.iter().map(|_| ScoreIncrement { multiplier: 5 }).collect(),
            time_delta: kinds.iter().map(|&k| tuning.coin_bonuses.get(k)).sum(),
            combo_delta: ComboDelta::Increment(kinds.len() as u32),
            boost_activate: kinds.iter().any(|k| k.is_boost_eligible()),
            coins_collected: kinds
                .iter()
                .map(|&kind| CollectedCoin {
                    kind,
                    bonus: tuning.coin_bonuses.get(kind),
                })
                .collect(),
        }
    }

    fn hit_diff() -> CollisionDiff {
        CollisionDiff {
            time_delta: -1.0,
            combo_delta: ComboDelta::Reset,
            ..Default::default()
        }
    }

    fn fresh_state(tuning: &Tuning) -> ProgressionState {
        let mut state = ProgressionState::new(tuning.max_time_cap_s, tuning.max_level());
        state.initialize(tuning.initial_time_s);
        state.set_running(true);
        state
    }

    #[test]
    fn test_speed_scenario() {
        let tuning = Tuning::default();
        let speed = current_speed(&tuning, 1, 4, false);
        assert!((speed - 705.6).abs() < 1e-3);
    }

    #[test]
    fn test_speed_tiers_not_cumulative() {
        let tuning = Tuning::default();
        assert_eq!(current_speed(&tuning, 0, 2, false), 420.0);
        assert!((current_speed(&tuning, 0, 6, false) - 630.0).abs() < 1e-3);
        assert!((current_speed(&tuning, 0, 0, true) - 630.0).abs() < 1e-3);
    }

    #[test]
    fn test_third_green_coin_advances_once() {
        let tuning = Tuning::default();
        let mut state = fresh_state(&tuning);
        apply_collision_diff(
            &mut state,
            &coin_diff(&[CoinKind::Green, CoinKind::Green]),
            &tuning,
            0.0,
        );
        assert_eq!(state.level(), 0);

        // Third and fourth green in the same frame: one level, counter reset
        let applied = apply_collision_diff(
            &mut state,
            &coin_diff(&[CoinKind::Green, CoinKind::Green]),
            &tuning,
            0.0,
        );
        assert!(applied.level_advanced);
        assert_eq!(state.level(), 1);
        assert_eq!(state.coin_count(CoinKind::Green), 0);
    }

    #[test]
    fn test_terminal_level_never_advances() {
        let tuning = Tuning::default();
        let mut state = fresh_state(&tuning);
        state.set_level(5);
        let whites = [CoinKind::White; 10];
        apply_collision_diff(&mut state, &coin_diff(&whites), &tuning, 0.0);
        assert_eq!(state.level(), 5);
        assert_eq!(state.coin_count(CoinKind::White), 10);
    }

    #[test]
    fn test_score_scaled_by_combo_at_application() {
        let tuning = Tuning::default();
        let mut state = fresh_state(&tuning);
        // combo 0 counts as 1
        apply_collision_diff(
            &mut state,
            &coin_diff(&[CoinKind::Green, CoinKind::Green]),
            &tuning,
            0.0,
        );
        assert_eq!(state.score(), 10);
        assert_eq!(state.combo(), 2);
        // Both increments use the combo before this frame's increments
        apply_collision_diff(
            &mut state,
            &coin_diff(&[CoinKind::Blue, CoinKind::Blue]),
            &tuning,
            0.0,
        );
        assert_eq!(state.score(), 10 + 2 * 5 * 2);
        assert_eq!(state.combo(), 4);
    }

    #[test]
    fn test_hit_resets_all_progression() {
        let tuning = Tuning::default();
        let mut state = fresh_state(&tuning);
        state.set_level(4);
        for _ in 0..7 {
            state.increment_combo();
        }
        state.grant_power_up(CoinKind::Violet);
        state.grant_power_up(CoinKind::Yellow);
        state.activate_boost(0.0, 5000.0);
        state.add_score(100);

        let applied = apply_collision_diff(&mut state, &hit_diff(), &tuning, 10.0);
        assert!(applied.progression_reset);
        assert_eq!(state.combo(), 0);
        assert_eq!(state.level(), 0);
        assert!(!state.boost().active);
        assert!(CoinKind::ALL.iter().all(|&k| !state.has_power_up(k)));
        assert_eq!(state.score(), 100);
        assert_eq!(state.time_remaining(), 119.0);
    }

    #[test]
    fn test_power_ups_granted_by_eligible_coins() {
        let tuning = Tuning::default();
        let mut state = fresh_state(&tuning);
        apply_collision_diff(
            &mut state,
            &coin_diff(&[CoinKind::Green, CoinKind::Violet, CoinKind::White]),
            &tuning,
            0.0,
        );
        assert!(!state.has_power_up(CoinKind::Green));
        assert!(state.has_power_up(CoinKind::Violet));
        assert!(state.has_power_up(CoinKind::White));
        assert!(!state.has_power_up(CoinKind::Yellow));
    }

    #[test]
    fn test_time_bonus_clamped_to_cap() {
        let tuning = Tuning::default();
        let mut state = fresh_state(&tuning);
        apply_collision_diff(&mut state, &coin_diff(&[CoinKind::White; 6]), &tuning, 0.0);
        assert_eq!(state.time_remaining(), tuning.max_time_cap_s);
    }

    #[test]
    fn test_boost_refreshes_not_stacks() {
        let tuning = Tuning::default();
        let mut state = fresh_state(&tuning);
        apply_collision_diff(&mut state, &coin_diff(&[CoinKind::Blue]), &tuning, 1000.0);
        assert_eq!(state.boost().end_ms, 6000.0);
        apply_collision_diff(&mut state, &coin_diff(&[CoinKind::Blue]), &tuning, 4000.0);
        assert_eq!(state.boost().end_ms, 9000.0);

        assert!(state.expire_boost(8999.0));
        assert!(!state.expire_boost(9000.0));
    }

    #[test]
    fn test_start_resets_and_arms() {
        let mut s = session();
        s.start();
        assert!(s.state().running());
        assert!(s.frame_requested());
        assert!(s.obstacles().timer().is_armed());
        assert!(s.coins().timer().is_armed());
        assert_eq!(s.presenter().resets, 1);
        assert_eq!(s.presenter().styles, vec![0]);
        assert_eq!(s.speed(), 420.0);

        // Second start while running is ignored
        s.start();
        assert_eq!(s.presenter().resets, 1);
    }

    #[test]
    fn test_first_frame_only_anchors() {
        let mut s = session();
        s.start();
        s.clock().advance(5_000.0);
        assert_eq!(s.frame(), FrameOutcome::Continue);
        assert_eq!(s.state().time_remaining(), 120.0);

        assert_eq!(step(&mut s, 500.0), FrameOutcome::Continue);
        assert!((s.state().time_remaining() - 119.5).abs() < 1e-4);
    }

    #[test]
    fn test_pause_freezes_simulation_and_cancels_spawns() {
        let mut s = started();
        s.pause();
        assert!(s.state().paused());
        assert!(!s.obstacles().timer().is_armed());
        assert!(!s.coins().timer().is_armed());

        for _ in 0..600 {
            assert_eq!(step(&mut s, FRAME), FrameOutcome::Continue);
            s.fire_due_timers();
        }
        assert_eq!(s.state().time_remaining(), 120.0);
        assert!(s.obstacles().obstacles().is_empty());
        assert!(s.coins().coins().is_empty());
    }

    #[test]
    fn test_resume_skips_paused_interval() {
        let mut s = started();
        step(&mut s, 1000.0);
        s.pause();
        s.clock().advance(60_000.0);
        s.resume();
        assert!(s.obstacles().timer().is_armed());
        // Anchor frame, then a normal one
        assert_eq!(step(&mut s, FRAME), FrameOutcome::Continue);
        assert_eq!(step(&mut s, 100.0), FrameOutcome::Continue);
        assert!((s.state().time_remaining() - 118.9).abs() < 1e-3);
    }

    #[test]
    fn test_pause_resume_only_when_applicable() {
        let mut s = session();
        s.pause();
        assert!(!s.state().paused());
        s.resume();
        assert!(!s.state().running());

        s.start();
        s.resume();
        assert!(!s.state().paused());
    }

    #[test]
    fn test_spawners_produce_entities() {
        let mut s = started();
        let (mut saw_obstacle, mut saw_coin) = (false, false);
        for _ in 0..(60 * 10) {
            s.clock().advance(FRAME);
            s.fire_due_timers();
            // Keep the avatar clear of everything
            s.obstacles_mut().obstacles_mut().iter_mut().for_each(|o| o.y = 1000.0);
            s.coins_mut().coins_mut().iter_mut().for_each(|c| c.y = 1000.0);
            s.frame();
            saw_obstacle |= !s.obstacles().obstacles().is_empty();
            saw_coin |= !s.coins().coins().is_empty();
            assert!(s.obstacles().obstacles().iter().all(|o| o.x + o.size().x >= 0.0));
        }
        assert!(saw_obstacle && saw_coin);
        assert!(s.obstacles().timer().is_armed());
        assert!(s.coins().timer().is_armed());
        assert_eq!(s.state().combo(), 0);
    }

    #[test]
    fn test_obstacle_hit_in_frame() {
        let mut s = started();
        s.state_mut().set_level(2);
        s.state_mut().increment_combo();
        let x = s.tuning().avatar_x;
        // An obstacle overlapping the avatar, with a coin on top of it
        let obstacle = Obstacle::new(900, ObstacleShape::Square, false, x, 0.0);
        let coin = Coin::new(901, CoinKind::Blue, 2.0, x, 5.0);
        s.obstacles_mut().insert(obstacle);
        s.coins_mut().insert(coin);

        step(&mut s, FRAME);
        let state = s.state();
        assert_eq!(state.level(), 0);
        assert_eq!(state.combo(), 0);
        assert!(!state.boost().active);
        assert!((state.time_remaining() - (119.0 - 1.0 / 60.0)).abs() < 1e-3);
        assert!(s.obstacles().obstacles().is_empty());
        // Pickup suppressed: the coin is still in the world
        assert_eq!(s.coins().coins().len(), 1);
        assert!(s.presenter().styles.ends_with(&[0]));
        assert!(
            s.presenter()
                .effects
                .iter()
                .any(|e| matches!(e, VisualEffect::HitShake { .. }))
        );
    }

    #[test]
    fn test_presenter_receives_live_entities() {
        let mut s = started();
        let ahead = Obstacle::new(40, ObstacleShape::Line, false, 500.0, 0.0);
        // Already off screen: swept before the scene is pushed
        let gone = Obstacle::new(42, ObstacleShape::Square, false, -45.0, 0.0);
        s.obstacles_mut().insert(ahead);
        s.obstacles_mut().insert(gone);
        let coin = Coin::new(41, CoinKind::Green, 1.0, 600.0, 200.0);
        s.coins_mut().insert(coin);

        step(&mut s, 100.0);
        let dx = 420.0 * 0.1;
        let scene = &s.presenter().scene_obstacles;
        assert_eq!(scene.len(), 1);
        assert_eq!(scene[0].0, 40);
        assert!((scene[0].1 - (500.0 - dx)).abs() < 1e-3);
        assert_eq!(s.presenter().scene_coins.len(), 1);
        assert!((s.presenter().scene_coins[0].1 - (600.0 - dx)).abs() < 1e-3);
        assert_eq!(s.presenter().displays.last().map(|d| d.2), Some(0));
    }

    #[test]
    fn test_coin_pickup_in_frame() {
        let mut s = started();
        let x = s.tuning().avatar_x;
        let coin = Coin::new(500, CoinKind::Blue, 2.0, x, 5.0);
        s.coins_mut().insert(coin);
        step(&mut s, FRAME);
        assert_eq!(s.state().combo(), 1);
        assert_eq!(s.state().score(), 5);
        assert!(s.state().boost().active);
        assert!(s.coins().coins().is_empty());
        assert!(
            s.presenter()
                .events
                .iter()
                .any(|e| matches!(e, ProgressEvent::BoostStarted { .. }))
        );

        // Boost is part of the next speed computation
        step(&mut s, FRAME);
        assert!((s.speed() - 630.0).abs() < 1e-3);
    }

    #[test]
    fn test_jump_requires_active_game() {
        let mut s = session();
        assert_eq!(s.jump(), None);
        s.start();
        assert_eq!(s.jump(), Some(JumpKind::Ground));
        assert!(
            s.presenter()
                .effects
                .iter()
                .any(|e| matches!(e, VisualEffect::JumpPose { .. }))
        );
        s.pause();
        s.handle_input(InputIntent::Jump);
        assert_eq!(s.avatar().vy, 700.0);
    }

    #[test]
    fn test_game_over_when_time_runs_out() {
        let mut s = started();
        s.set_player("Ada", "ada@example.com");
        s.state_mut().set_time_remaining(0.5);
        s.state_mut().add_score(42);

        assert_eq!(step(&mut s, 400.0), FrameOutcome::Continue);
        match step(&mut s, 200.0) {
            FrameOutcome::GameOver(sub) => {
                assert_eq!(sub.name, "Ada");
                assert_eq!(sub.email, "ada@example.com");
                assert_eq!(sub.score, 42);
            }
            other => panic!("expected game over, got {other:?}"),
        }
        assert!(!s.state().running());
        assert!(!s.frame_requested());
        assert!(!s.obstacles().timer().is_armed());
        assert!(!s.coins().timer().is_armed());
        assert_eq!(s.frame(), FrameOutcome::Halted);
    }

    #[test]
    fn test_restart_after_game_over() {
        let mut s = started();
        s.state_mut().add_score(10);
        s.game_over();
        s.start();
        assert!(s.state().running());
        assert_eq!(s.state().score(), 0);
        assert_eq!(s.state().time_remaining(), 120.0);
    }

    #[test]
    fn test_same_seed_same_run() {
        let run = || {
            let mut s = started();
            let mut trace = Vec::new();
            for i in 0..1200 {
                if i % 45 == 0 {
                    s.jump();
                }
                s.clock().advance(FRAME);
                s.pump();
                trace.push((s.state().score(), s.state().combo(), s.obstacles().obstacles().len()));
            }
            trace
        };
        assert_eq!(run(), run());
    }

    proptest! {
        #[test]
        fn prop_bounds_hold(
            seed in any::<u64>(),
            script in proptest::collection::vec((1.0f64..120.0, any::<bool>(), 0u8..20), 1..300),
        ) {
            let mut s = Session::new(Tuning::default(), ManualClock::new(0.0), NullPresenter, seed);
            s.start();
            for (ms, jump, toggle) in script {
                if jump {
                    s.jump();
                }
                match toggle {
                    0 => s.pause(),
                    1 => s.resume(),
                    _ => {}
                }
                s.clock().advance(ms);
                s.pump();
                let state = s.state();
                prop_assert!(state.time_remaining() >= 0.0);
                prop_assert!(state.time_remaining() <= state.time_cap());
                prop_assert!(state.level() <= state.max_level());
                prop_assert!(s.avatar().y >= s.tuning().ground_y);
            }
        }
    }
}
