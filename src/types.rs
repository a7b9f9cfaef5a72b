use chrono::NaiveDate;
use serde::Serialize;

use crate::config::LEVEL_COUNT;

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

/// Problem difficulty tier within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    One,
    Two,
    Three,
}

impl Level {
    pub const ALL: [Level; LEVEL_COUNT] = [Level::One, Level::Two, Level::Three];

    /// Field-name infix used by round result documents (`level_one_final_points`).
    pub fn field_prefix(self) -> &'static str {
        match self {
            Level::One => "level_one",
            Level::Two => "level_two",
            Level::Three => "level_three",
        }
    }

    fn index(self) -> usize {
        match self {
            Level::One => 0,
            Level::Two => 1,
            Level::Three => 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Source records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coder {
    pub coder_id: u64,
    pub handle: String,
}

/// One row of a coder's rating trajectory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingHistoryEntry {
    pub round_id: u64,
    pub short_name: String,
    pub date: NaiveDate,
    pub old_rating: Option<i64>,
    pub new_rating: Option<i64>,
    pub volatility: Option<i64>,
    pub rank: Option<i64>,
    pub percentile: Option<f64>,
}

/// Per-level problem outcome for one competitor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LevelResult {
    pub problem_id: Option<i64>,
    pub submission_points: Option<f64>,
    pub final_points: Option<f64>,
    pub status: Option<String>,
    pub time_elapsed: Option<f64>,
    pub placed: Option<i64>,
    pub language: Option<String>,
}

impl LevelResult {
    /// Final points with absent treated as zero.
    pub fn score(&self) -> f64 {
        self.final_points.unwrap_or(0.0)
    }

    /// A problem counts as solved when its final points are present and nonzero.
    pub fn is_correct(&self) -> bool {
        self.score() != 0.0
    }
}

/// One competitor's row in a round result document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundResultEntry {
    /// Round the document was loaded for. Not a field of the row itself.
    pub round_id: u64,
    pub coder_id: u64,
    pub division: u8,
    pub division_placed: Option<i64>,
    pub challenge_points: Option<f64>,
    pub final_points: Option<f64>,
    pub problems_presented: Option<i64>,
    pub problems_submitted: Option<i64>,
    pub problems_correct: Option<i64>,
    pub levels: [LevelResult; LEVEL_COUNT],
}

impl RoundResultEntry {
    pub fn level(&self, level: Level) -> &LevelResult {
        &self.levels[level.index()]
    }
}

// ---------------------------------------------------------------------------
// Derived stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LevelStats {
    /// In-division competitors with nonzero final points at this level.
    pub correct_submissions: u32,
    /// Mean of the nonzero final points; 0.0 when nobody scored.
    pub average_score: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RoundStats {
    /// In-division competitors, scored or not.
    pub total_participants: u32,
    pub levels: [LevelStats; LEVEL_COUNT],
}

impl RoundStats {
    pub fn level(&self, level: Level) -> &LevelStats {
        &self.levels[level.index()]
    }
}

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

/// A rating history entry joined with the coder's result row for that round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub history: RatingHistoryEntry,
    pub result: RoundResultEntry,
    pub stats: RoundStats,
}

impl Match {
    /// Pairs a history entry with its result row. Stats start zeroed and are
    /// filled by `stats::aggregate`.
    pub(crate) fn join(history: RatingHistoryEntry, result: RoundResultEntry) -> Option<Self> {
        if history.round_id != result.round_id {
            return None;
        }
        Some(Self {
            history,
            result,
            stats: RoundStats::default(),
        })
    }

    pub fn round_id(&self) -> u64 {
        self.history.round_id
    }

    pub fn division(&self) -> u8 {
        self.result.division
    }

    pub fn date(&self) -> NaiveDate {
        self.history.date
    }

    /// The coder's own final points at `level`, absent treated as zero.
    pub fn level_score(&self, level: Level) -> f64 {
        self.result.level(level).score()
    }

    pub(crate) fn with_stats(self, stats: RoundStats) -> Self {
        Self { stats, ..self }
    }
}
