//! Neon Runner headless driver
//!
//! Plays one run on a manual 60 Hz clock with a simple autopilot, then
//! submits the score to a local ranking store and prints the leaderboard.
//!
//! Usage: `neon-runner [seed] [tuning.json]`

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::path::Path;
    use std::process::ExitCode;

    use neon_runner::consts::FRAME_MS;
    use neon_runner::platform::{FocusGuard, Presenter};
    use neon_runner::ranking::{InMemoryRanking, ResultsGate, submit_and_fetch};
    use neon_runner::sim::{ManualClock, ProgressEvent};
    use neon_runner::{FrameOutcome, Session, Tuning};

    /// Safety net for runs that keep extending their clock
    const MAX_FRAMES: u64 = 60 * 60 * 15;
    /// Log the HUD once per simulated second
    const HUD_LOG_EVERY: u64 = 60;
    /// Simulated focus loss, to exercise pause/resume
    const BLUR_AT_FRAME: u64 = 60 * 20;
    const FOCUS_AT_FRAME: u64 = 60 * 22;

    /// Presenter that writes to the log
    #[derive(Default)]
    struct LogPresenter {
        frames: u64,
    }

    impl Presenter for LogPresenter {
        fn update_display(&mut self, score: u64, time_remaining: f32, combo: u32) {
            self.frames += 1;
            if self.frames % HUD_LOG_EVERY == 0 {
                log::info!("score={score} time={time_remaining:.1}s combo={combo}");
            }
        }

        fn level_style(&mut self, level: u32) {
            log::info!("Arena style -> level {level}");
        }

        fn progress_event(&mut self, event: &ProgressEvent) {
            if let ProgressEvent::PowerUpGranted(p) = event {
                log::info!("Power-up ready: {p:?}");
            }
        }
    }

    /// Jump when the nearest obstacle is about to reach the avatar
    fn autopilot(session: &mut Session<ManualClock, LogPresenter>) {
        let tuning = session.tuning();
        let front = tuning.avatar_x + tuning.avatar_width;
        let lookahead = session.speed() * 0.2;
        let should_jump = !session.avatar().airborne
            && session
                .obstacles()
                .obstacles()
                .iter()
                .any(|o| o.x >= front && o.x - front <= lookahead);
        if should_jump {
            session.jump();
        }
    }

    pub fn run() -> ExitCode {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

        let mut args = std::env::args().skip(1);
        let seed = match args.next().map(|s| s.parse::<u64>()) {
            None => 1,
            Some(Ok(seed)) => seed,
            Some(Err(e)) => {
                log::error!("Invalid seed: {e}");
                return ExitCode::FAILURE;
            }
        };
        let tuning = args
            .next()
            .map_or_else(Tuning::default, |path| Tuning::load_or_default(Path::new(&path)));
        let max_name = tuning.ranking_max_name_length;
        let top_n = tuning.ranking_top_n;

        log::info!("Neon Runner (headless) starting, seed {seed}");
        let mut session =
            Session::new(tuning, ManualClock::new(0.0), LogPresenter::default(), seed);
        session.set_player("Autopilot", "autopilot@localhost");
        session.start();

        let mut focus = FocusGuard::default();
        let mut submission = None;
        for frame in 0..MAX_FRAMES {
            let intent = match frame {
                BLUR_AT_FRAME => focus.on_focus_lost(session.state().is_active()),
                FOCUS_AT_FRAME => focus.on_focus_gained(),
                _ => None,
            };
            if let Some(intent) = intent {
                session.handle_input(intent);
            }

            session.clock().advance(FRAME_MS);
            autopilot(&mut session);
            match session.pump() {
                FrameOutcome::Continue => {}
                FrameOutcome::Halted => break,
                FrameOutcome::GameOver(s) => {
                    submission = Some(s);
                    break;
                }
            }
        }
        let submission = match submission {
            Some(s) => s,
            None => {
                log::warn!("Frame limit reached, ending the run");
                session.game_over()
            }
        };
        println!("Final score: {}", submission.score);

        let ranking = InMemoryRanking::with_entries([
            ("Nova".to_string(), 1200),
            ("Pixel".to_string(), 640),
            ("Vega".to_string(), 215),
        ]);
        let mut gate = ResultsGate::default();
        let token = gate.enter();
        let outcome = submit_and_fetch(&ranking, &submission, max_name, top_n);
        let Some(outcome) = gate.accept(token, outcome) else {
            return ExitCode::SUCCESS;
        };

        if let Some(err) = &outcome.submit_error {
            println!("Score not saved: {err}");
        }
        match outcome.leaderboard {
            Ok(board) if board.is_empty() => println!("Leaderboard is empty"),
            Ok(board) => {
                println!("Top {top_n}");
                for (i, entry) in board.entries.iter().enumerate() {
                    println!("{:>2}. {:<15} {}", i + 1, entry.name, entry.score);
                }
            }
            Err(err) => println!("Leaderboard unavailable: {err}"),
        }
        ExitCode::SUCCESS
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    headless::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is driven by the embedding page on the web
}
