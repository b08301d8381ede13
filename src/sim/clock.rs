//! Time sources and one-shot scheduled tasks
//!
//! The session never reads wall-clock time directly: it asks a `Clock`.
//! Tests and the headless driver use `ManualClock` and advance it by hand.

use std::cell::Cell;
use std::time::Instant;

/// Millisecond time source
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Clock advanced explicitly by its owner
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms.max(0.0));
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Monotonic clock measured from its creation
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// A cancellable one-shot deadline
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScheduledTask {
    due_ms: Option<f64>,
}

impl ScheduledTask {
    /// Arm (or re-arm) the task to fire `delay_ms` after `now_ms`
    pub fn arm(&mut self, now_ms: f64, delay_ms: f64) {
        self.due_ms = Some(now_ms + delay_ms.max(0.0));
    }

    pub fn cancel(&mut self) {
        self.due_ms = None;
    }

    pub fn is_armed(&self) -> bool {
        self.due_ms.is_some()
    }

    pub fn due_ms(&self) -> Option<f64> {
        self.due_ms
    }

    /// Disarm and return true if the deadline has been reached
    pub fn fire_if_due(&mut self, now_ms: f64) -> bool {
        match self.due_ms {
            Some(due) if now_ms >= due => {
                self.due_ms = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(100.0);
        clock.advance(16.0);
        assert_eq!(clock.now_ms(), 116.0);
        clock.advance(-5.0);
        assert_eq!(clock.now_ms(), 116.0);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::default();
        let first = clock.now_ms();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = clock.now_ms();
        assert!(first >= 0.0);
        assert!(second >= first + 1.0);
    }

    #[test]
    fn test_task_fires_once() {
        let mut task = ScheduledTask::default();
        task.arm(0.0, 500.0);
        assert!(!task.fire_if_due(499.0));
        assert!(task.fire_if_due(500.0));
        assert!(!task.is_armed());
        assert!(!task.fire_if_due(1000.0));
    }

    #[test]
    fn test_cancelled_task_never_fires() {
        let mut task = ScheduledTask::default();
        task.arm(0.0, 10.0);
        task.cancel();
        assert!(!task.fire_if_due(1_000.0));
    }
}
