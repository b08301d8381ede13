//! Score submission and leaderboard retrieval
//!
//! The transport is a collaborator behind `RankingService`. At game over the
//! score is submitted and the leaderboard fetched concurrently; both are
//! awaited before the results view is updated, and a result that arrives
//! after the player left that view is dropped.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts::UNKNOWN_NAME;
use crate::truncate_chars;

/// Transport failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankingError {
    /// The service answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never completed
    #[error("transport failure: {0}")]
    Transport(String),

    /// The leaderboard payload was not an array of records
    #[error("unexpected leaderboard format: {0}")]
    Malformed(String),
}

/// The final `(name, email, score)` handed over at game over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub name: String,
    pub email: String,
    pub score: u64,
}

impl ScoreSubmission {
    /// Name is cut to `max_name_chars` characters
    pub fn new(name: &str, email: &str, score: u64, max_name_chars: usize) -> Self {
        Self {
            name: truncate_chars(name, max_name_chars),
            email: email.to_string(),
            score,
        }
    }
}

/// Remote ranking endpoint
pub trait RankingService: Sync {
    fn submit(&self, submission: &ScoreSubmission) -> Result<(), RankingError>;

    /// Raw leaderboard payload, expected to be an array of records
    fn fetch(&self) -> Result<Value, RankingError>;
}

/// A single leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u64,
}

/// Sanitised, sorted leaderboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    /// Build from loosely-typed records.
    ///
    /// Names come from `name` or `nombre`, scores from `score` or `puntaje`
    /// (numbers or numeric strings). Records with negative scores are dropped.
    pub fn from_records(
        payload: &Value,
        max_name_chars: usize,
        top_n: usize,
    ) -> Result<Self, RankingError> {
        let Value::Array(records) = payload else {
            return Err(RankingError::Malformed(format!(
                "expected an array, got {}",
                json_kind(payload)
            )));
        };

        let mut entries: Vec<LeaderboardEntry> = records
            .iter()
            .filter_map(|record| {
                let score = parse_score(field(record, &["score", "puntaje"]))?;
                let name = match field(record, &["name", "nombre"]) {
                    Some(Value::String(s)) if !s.is_empty() => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    _ => UNKNOWN_NAME.to_string(),
                };
                Some(LeaderboardEntry {
                    name: truncate_chars(&name, max_name_chars),
                    score,
                })
            })
            .collect();

        // Stable: equal scores keep server order
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(top_n);
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    /// 1-based rank `score` would take on this board, if it makes the cut
    pub fn potential_rank(&self, score: u64, top_n: usize) -> Option<usize> {
        let rank = self
            .entries
            .iter()
            .position(|e| score > e.score)
            .unwrap_or(self.entries.len())
            + 1;
        (rank <= top_n).then_some(rank)
    }
}

/// First present, non-null field among `keys`
fn field<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| record.get(*k))
        .find(|v| !v.is_null())
}

/// Missing, empty or unparsable scores count as zero; negatives are rejected
fn parse_score(value: Option<&Value>) -> Option<u64> {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse::<f64>().unwrap_or(0.0)
        }
        _ => 0.0,
    };
    if raw.is_nan() || raw < 0.0 {
        return None;
    }
    Some(raw.trunc() as u64)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Joint result of the two end-of-game calls
#[derive(Debug, Clone, PartialEq)]
pub struct RankingOutcome {
    pub leaderboard: Result<Leaderboard, RankingError>,
    pub submit_error: Option<RankingError>,
}

impl RankingOutcome {
    pub fn submitted(&self) -> bool {
        self.submit_error.is_none()
    }
}

/// Submit the score and fetch the leaderboard concurrently, waiting for both.
/// Neither failure short-circuits the other call.
pub fn submit_and_fetch<S: RankingService>(
    service: &S,
    submission: &ScoreSubmission,
    max_name_chars: usize,
    top_n: usize,
) -> RankingOutcome {
    log::info!("Submitting score {} for {}", submission.score, submission.name);

    let (submitted, fetched) = std::thread::scope(|scope| {
        let submit = scope.spawn(|| service.submit(submission));
        let fetch = scope.spawn(|| service.fetch());
        (join(submit), join(fetch))
    });

    let submit_error = submitted.err();
    if let Some(err) = &submit_error {
        log::warn!("Score submission failed: {err}");
    }

    let leaderboard =
        fetched.and_then(|payload| Leaderboard::from_records(&payload, max_name_chars, top_n));
    match &leaderboard {
        Ok(board) => log::info!("Leaderboard received ({} entries)", board.entries.len()),
        Err(err) => log::warn!("Leaderboard unavailable: {err}"),
    }

    RankingOutcome {
        leaderboard,
        submit_error,
    }
}

fn join<T>(
    handle: std::thread::ScopedJoinHandle<'_, Result<T, RankingError>>,
) -> Result<T, RankingError> {
    handle
        .join()
        .unwrap_or_else(|_| Err(RankingError::Transport("request task panicked".into())))
}

/// Token identifying one visit of the results view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultsToken(u64);

/// Guards the results view against late ranking results
#[derive(Debug, Default)]
pub struct ResultsGate {
    generation: u64,
    visible: bool,
}

impl ResultsGate {
    /// The results view was shown
    pub fn enter(&mut self) -> ResultsToken {
        self.generation += 1;
        self.visible = true;
        ResultsToken(self.generation)
    }

    /// The player left the results view (e.g. restarted)
    pub fn leave(&mut self) {
        self.visible = false;
    }

    pub fn is_current(&self, token: ResultsToken) -> bool {
        self.visible && token.0 == self.generation
    }

    /// Pass `outcome` through only if its view is still showing
    pub fn accept<T>(&self, token: ResultsToken, outcome: T) -> Option<T> {
        if self.is_current(token) {
            Some(outcome)
        } else {
            log::info!("Discarding ranking result for a view that is gone");
            None
        }
    }
}

/// Process-local ranking store
#[derive(Debug, Default)]
pub struct InMemoryRanking {
    records: Mutex<Vec<LeaderboardEntry>>,
    fail_submit: bool,
    fail_fetch: bool,
}

impl InMemoryRanking {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated board
    pub fn with_entries(entries: impl IntoIterator<Item = (String, u64)>) -> Self {
        let records = entries
            .into_iter()
            .map(|(name, score)| LeaderboardEntry { name, score })
            .collect();
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Make submit and/or fetch fail with a server error
    pub fn failing(mut self, submit: bool, fetch: bool) -> Self {
        self.fail_submit = submit;
        self.fail_fetch = fetch;
        self
    }

    fn store(&self) -> Result<std::sync::MutexGuard<'_, Vec<LeaderboardEntry>>, RankingError> {
        self.records
            .lock()
            .map_err(|_| RankingError::Transport("ranking store poisoned".into()))
    }
}

impl RankingService for InMemoryRanking {
    fn submit(&self, submission: &ScoreSubmission) -> Result<(), RankingError> {
        if self.fail_submit {
            return Err(RankingError::Http {
                status: 500,
                body: "submission rejected".into(),
            });
        }
        self.store()?.push(LeaderboardEntry {
            name: submission.name.clone(),
            score: submission.score,
        });
        Ok(())
    }

    fn fetch(&self) -> Result<Value, RankingError> {
        if self.fail_fetch {
            return Err(RankingError::Http {
                status: 503,
                body: "ranking unavailable".into(),
            });
        }
        let records = self.store()?;
        serde_json::to_value(&*records).map_err(|e| RankingError::Malformed(e.to_string()))
    }
}
