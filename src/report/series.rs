use crate::types::{Level, Match};

/// Oldest first. Stable, so same-day matches keep their history order.
pub fn sort_by_date(mut matches: Vec<Match>) -> Vec<Match> {
    matches.sort_by_key(Match::date);
    matches
}

/// Running count of nonzero scores.
pub fn cumulative_correct_counts(scores: &[f64]) -> Vec<u64> {
    scores
        .iter()
        .scan(0u64, |total, &score| {
            *total += u64::from(score != 0.0);
            Some(*total)
        })
        .collect()
}

/// Cumulative solved counts per level over date-ordered matches. The chart
/// plots levels one and two.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSeries {
    /// Zero-based match index.
    pub x: Vec<f64>,
    pub level_one: Vec<u64>,
    pub level_two: Vec<u64>,
    pub level_three: Vec<u64>,
}

impl ReportSeries {
    pub fn from_matches(matches: &[Match]) -> Self {
        let scores = |level: Level| -> Vec<f64> {
            matches.iter().map(|m| m.level_score(level)).collect()
        };
        Self {
            x: (0..matches.len()).map(|i| i as f64).collect(),
            level_one: cumulative_correct_counts(&scores(Level::One)),
            level_two: cumulative_correct_counts(&scores(Level::Two)),
            level_three: cumulative_correct_counts(&scores(Level::Three)),
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn points(&self, level: Level) -> Vec<(f64, f64)> {
        self.x
            .iter()
            .zip(self.counts(level))
            .map(|(&x, &y)| (x, y as f64))
            .collect()
    }

    /// Final cumulative count, i.e. the number of matches solved at `level`.
    pub fn total(&self, level: Level) -> u64 {
        self.counts(level).last().copied().unwrap_or(0)
    }

    fn counts(&self, level: Level) -> &[u64] {
        match level {
            Level::One => &self.level_one,
            Level::Two => &self.level_two,
            Level::Three => &self.level_three,
        }
    }
}
