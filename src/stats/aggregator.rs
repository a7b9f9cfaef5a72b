use tracing::debug;

use crate::document::RoundDocument;
use crate::error::{AppError, Result};
use crate::types::{Level, LevelStats, Match, RoundResultEntry, RoundStats};

/// Per-level submission counts and average scores over one division's entries.
/// Zero and absent final points are excluded from both the count and the
/// average but still count as participants.
pub fn compute_round_stats<'a>(
    division: u8,
    entries: impl IntoIterator<Item = &'a RoundResultEntry>,
) -> RoundStats {
    let mut total_participants = 0u32;
    let mut sums = [0.0f64; 3];
    let mut counts = [0u32; 3];

    for entry in entries.into_iter().filter(|e| e.division == division) {
        total_participants += 1;
        for (i, level) in Level::ALL.into_iter().enumerate() {
            let result = entry.level(level);
            if result.is_correct() {
                sums[i] += result.score();
                counts[i] += 1;
            }
        }
    }

    let level_stats = |i: usize| LevelStats {
        correct_submissions: counts[i],
        average_score: average(sums[i], counts[i]),
    };

    RoundStats {
        total_participants,
        levels: [level_stats(0), level_stats(1), level_stats(2)],
    }
}

fn average(sum: f64, count: u32) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / f64::from(count)
    }
}

/// Returns `m` with stats computed over its division in `round`.
pub fn aggregate(m: Match, round: &RoundDocument) -> Result<Match> {
    if round.round_id != m.round_id() {
        return Err(AppError::RoundMismatch {
            expected: m.round_id(),
            found: round.round_id,
        });
    }

    let stats = compute_round_stats(m.division(), &round.entries);
    debug!(
        round_id = m.round_id(),
        division = m.division(),
        participants = stats.total_participants,
        "round stats: L1 {}/{:.1} L2 {}/{:.1} L3 {}/{:.1}",
        stats.levels[0].correct_submissions,
        stats.levels[0].average_score,
        stats.levels[1].correct_submissions,
        stats.levels[1].average_score,
        stats.levels[2].correct_submissions,
        stats.levels[2].average_score,
    );
    Ok(m.with_stats(stats))
}
