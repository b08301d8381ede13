//! Deterministic simulation module
//!
//! All gameplay logic lives here. Given the same seed, tuning, clock readings
//! and inputs, a run replays identically:
//! - Time only comes from the injected `Clock`
//! - Seeded RNG only, owned by the session
//! - Collision effects are computed as a diff, then applied in a fixed order
//! - No rendering or platform dependencies beyond the `Presenter` trait

pub mod avatar;
pub mod clock;
pub mod collision;
pub mod spawn;
pub mod state;
pub mod tick;

pub use avatar::{Avatar, JumpKind};
pub use clock::{Clock, ManualClock, ScheduledTask, SystemClock};
pub use collision::{
    CollectedCoin, CollisionDiff, CollisionOutcome, ComboDelta, FeedbackCue, Rect,
    ScoreIncrement, detect_collisions,
};
pub use spawn::{Coin, CoinSpawner, EntityId, IdAllocator, Obstacle, ObstacleShape, ObstacleSpawner};
pub use state::{
    Boost, CoinKind, PlayerInfo, PlayerInfoError, PowerUp, ProgressEvent, ProgressionState,
};
pub use tick::{AppliedEffects, FrameOutcome, Session, apply_collision_diff, current_speed};
