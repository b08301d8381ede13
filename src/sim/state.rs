//! Progression state and core simulation types
//!
//! `ProgressionState` is the single authoritative record of a run: score,
//! combo, remaining time, level, coin counters, power-up charges and the
//! speed boost window. Every mutator clamps to its valid range and only
//! records a `ProgressEvent` when something actually changed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::ANONYMOUS_NAME;

/// Coin types, one per level colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinKind {
    Green,
    Blue,
    Violet,
    Yellow,
    White,
}

impl CoinKind {
    pub const ALL: [CoinKind; 5] = [
        CoinKind::Green,
        CoinKind::Blue,
        CoinKind::Violet,
        CoinKind::Yellow,
        CoinKind::White,
    ];

    /// Stable index for per-kind tables
    pub fn index(self) -> usize {
        match self {
            CoinKind::Green => 0,
            CoinKind::Blue => 1,
            CoinKind::Violet => 2,
            CoinKind::Yellow => 3,
            CoinKind::White => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CoinKind::Green => "green",
            CoinKind::Blue => "blue",
            CoinKind::Violet => "violet",
            CoinKind::Yellow => "yellow",
            CoinKind::White => "white",
        }
    }

    /// Collecting this coin (re)starts the temporary speed boost
    pub fn is_boost_eligible(self) -> bool {
        matches!(self, CoinKind::Blue | CoinKind::Yellow)
    }

    /// The single-use power-up this coin grants, if any
    pub fn power_up(self) -> Option<PowerUp> {
        match self {
            CoinKind::Violet => Some(PowerUp::Dash),
            CoinKind::Yellow => Some(PowerUp::DoubleJump),
            CoinKind::White => Some(PowerUp::AirCombo),
            CoinKind::Green | CoinKind::Blue => None,
        }
    }
}

/// Single-charge power-ups granted by coins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUp {
    Dash,
    DoubleJump,
    AirCombo,
}

impl PowerUp {
    pub const ALL: [PowerUp; 3] = [PowerUp::Dash, PowerUp::DoubleJump, PowerUp::AirCombo];

    fn index(self) -> usize {
        match self {
            PowerUp::Dash => 0,
            PowerUp::DoubleJump => 1,
            PowerUp::AirCombo => 2,
        }
    }
}

/// Changes worth reporting to telemetry/presentation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProgressEvent {
    PowerUpGranted(PowerUp),
    PowerUpConsumed(PowerUp),
    PowerUpsReset,
    LevelChanged(u32),
    /// Boost switched on, lasting `duration_ms`
    BoostStarted { duration_ms: f64 },
    BoostEnded,
}

/// Temporary speed boost window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Boost {
    pub active: bool,
    /// Clock time (ms) at which the boost lapses
    pub end_ms: f64,
}

/// Player identity attached to the submitted score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub name: String,
    pub email: String,
}

impl Default for PlayerInfo {
    fn default() -> Self {
        Self {
            name: ANONYMOUS_NAME.to_string(),
            email: String::new(),
        }
    }
}

/// Registration form rejections
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerInfoError {
    #[error("a valid email address is required")]
    InvalidEmail,
    #[error("a player name is required")]
    EmptyName,
}

impl PlayerInfo {
    /// Validate registration input: trimmed non-empty name, lower-cased
    /// `local@domain.tld` email without whitespace.
    pub fn validated(name: &str, email: &str) -> Result<Self, PlayerInfoError> {
        let email = email.trim().to_lowercase();
        if !is_plausible_email(&email) {
            return Err(PlayerInfoError::InvalidEmail);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(PlayerInfoError::EmptyName);
        }
        Ok(Self {
            name: name.to_string(),
            email,
        })
    }
}

fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    // Needs a dot with something on both sides, somewhere in the domain
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Authoritative run state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionState {
    running: bool,
    paused: bool,
    score: u64,
    combo: u32,
    /// Seconds left on the countdown
    time_remaining: f32,
    time_cap: f32,
    level: u32,
    max_level: u32,
    coin_counts: [u32; 5],
    power_ups: [bool; 3],
    boost: Boost,
    player: PlayerInfo,
    /// Pending telemetry, drained by the session each frame
    #[serde(skip)]
    events: Vec<ProgressEvent>,
}

impl ProgressionState {
    pub fn new(time_cap: f32, max_level: u32) -> Self {
        Self {
            running: false,
            paused: false,
            score: 0,
            combo: 0,
            time_remaining: 0.0,
            time_cap: time_cap.max(0.0),
            level: 0,
            max_level,
            coin_counts: [0; 5],
            power_ups: [false; 3],
            boost: Boost::default(),
            player: PlayerInfo::default(),
            events: Vec::new(),
        }
    }

    /// Reset every field to session-start defaults (player info is kept)
    pub fn initialize(&mut self, initial_time: f32) {
        self.set_running(false);
        self.set_score(0);
        self.combo = 0;
        self.set_time_remaining(initial_time);
        self.set_level(0);
        self.reset_coin_count(None);
        self.reset_all_power_ups();
        self.deactivate_boost();
        log::debug!("Progression state initialized ({initial_time}s)");
    }

    // --- Getters ---

    /// Running and not paused
    pub fn is_active(&self) -> bool {
        self.running && !self.paused
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn time_remaining(&self) -> f32 {
        self.time_remaining
    }

    pub fn time_cap(&self) -> f32 {
        self.time_cap
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    pub fn coin_count(&self, kind: CoinKind) -> u32 {
        self.coin_counts[kind.index()]
    }

    pub fn boost(&self) -> Boost {
        self.boost
    }

    pub fn player(&self) -> &PlayerInfo {
        &self.player
    }

    /// Whether the coin kind's power-up charge is available.
    /// Kinds without a power-up are never available.
    pub fn has_power_up(&self, kind: CoinKind) -> bool {
        kind.power_up().is_some_and(|p| self.power_ups[p.index()])
    }

    // --- Setters ---

    pub fn set_running(&mut self, running: bool) {
        if self.running != running {
            self.running = running;
            if !running {
                self.paused = false;
            }
            log::debug!("running = {running}");
        }
    }

    /// Pausing is meaningless while not running
    pub fn set_paused(&mut self, paused: bool) {
        if !self.running {
            self.paused = false;
            return;
        }
        if self.paused != paused {
            self.paused = paused;
            log::debug!("paused = {paused}");
        }
    }

    pub fn set_score(&mut self, score: u64) {
        self.score = score;
    }

    pub fn add_score(&mut self, amount: u64) {
        self.score = self.score.saturating_add(amount);
    }

    pub fn increment_combo(&mut self) {
        self.combo = self.combo.saturating_add(1);
    }

    pub fn reset_combo(&mut self) {
        if self.combo > 0 {
            log::debug!("combo reset ({} -> 0)", self.combo);
            self.combo = 0;
        }
    }

    /// Clamped to `[0, time_cap]`
    pub fn set_time_remaining(&mut self, seconds: f32) {
        self.time_remaining = if seconds.is_nan() {
            0.0
        } else {
            seconds.clamp(0.0, self.time_cap)
        };
    }

    /// Replace the level (clamped to the table). No monotonicity here;
    /// callers only regress through the reset-to-zero path.
    pub fn set_level(&mut self, level: u32) {
        let level = level.min(self.max_level);
        if self.level != level {
            self.level = level;
            self.events.push(ProgressEvent::LevelChanged(level));
        }
    }

    pub fn add_coin(&mut self, kind: CoinKind) {
        let count = &mut self.coin_counts[kind.index()];
        *count = count.saturating_add(1);
        log::debug!("coin {} = {}", kind.as_str(), *count);
    }

    /// Zero one counter, or all of them with `None`
    pub fn reset_coin_count(&mut self, kind: Option<CoinKind>) {
        match kind {
            Some(kind) => self.coin_counts[kind.index()] = 0,
            None => self.coin_counts = [0; 5],
        }
    }

    /// Give one charge of the coin's power-up. Not stackable: a second
    /// grant while a charge is outstanding does nothing.
    pub fn grant_power_up(&mut self, kind: CoinKind) {
        let Some(power_up) = kind.power_up() else {
            log::warn!("{} coins do not grant a power-up", kind.as_str());
            return;
        };
        let slot = &mut self.power_ups[power_up.index()];
        if !*slot {
            *slot = true;
            self.events.push(ProgressEvent::PowerUpGranted(power_up));
        }
    }

    pub fn consume_power_up(&mut self, kind: CoinKind) {
        let Some(power_up) = kind.power_up() else {
            log::warn!("{} coins do not grant a power-up", kind.as_str());
            return;
        };
        let slot = &mut self.power_ups[power_up.index()];
        if *slot {
            *slot = false;
            self.events.push(ProgressEvent::PowerUpConsumed(power_up));
        }
    }

    pub fn reset_all_power_ups(&mut self) {
        if self.power_ups.iter().any(|&p| p) {
            self.power_ups = [false; 3];
            self.events.push(ProgressEvent::PowerUpsReset);
        }
    }

    /// Start (or refresh) the boost window. Ignored if `end_ms` is not in
    /// the future.
    pub fn activate_boost(&mut self, now_ms: f64, end_ms: f64) {
        if end_ms <= now_ms {
            return;
        }
        if !self.boost.active {
            self.events.push(ProgressEvent::BoostStarted {
                duration_ms: end_ms - now_ms,
            });
        }
        self.boost = Boost {
            active: true,
            end_ms,
        };
    }

    pub fn deactivate_boost(&mut self) {
        if self.boost.active {
            self.boost = Boost::default();
            self.events.push(ProgressEvent::BoostEnded);
        }
    }

    /// Clear the boost the instant it lapses. Returns whether it is still on.
    pub fn expire_boost(&mut self, now_ms: f64) -> bool {
        if self.boost.active && now_ms >= self.boost.end_ms {
            self.deactivate_boost();
        }
        self.boost.active
    }

    /// Store player info, falling back to defaults for blank values
    pub fn set_player(&mut self, name: &str, email: &str) {
        let name = name.trim();
        self.player = PlayerInfo {
            name: if name.is_empty() {
                ANONYMOUS_NAME.to_string()
            } else {
                name.to_string()
            },
            email: email.trim().to_string(),
        };
        log::info!("Player = {}", self.player.name);
    }

    /// Take the pending progression events
    pub fn drain_events(&mut self) -> Vec<ProgressEvent> {
        std::mem::take(&mut self.events)
    }
}
