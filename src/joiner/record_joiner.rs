use tracing::{info, warn};

use crate::document::{parse_coders, parse_rating_history, RoundDocument};
use crate::error::{AppError, Result};
use crate::fetcher::{Fetch, Query};
use crate::stats::aggregate;
use crate::store::{DocKey, DocumentStore};
use crate::types::Match;

/// Joined matches in history-document order, plus the rounds that had no
/// result row for the coder.
#[derive(Debug, Default)]
pub struct JoinOutcome {
    pub matches: Vec<Match>,
    pub skipped_rounds: Vec<u64>,
}

/// Pairs a coder's rating history with their rows in the cached round results.
pub struct RecordJoiner<'a, F> {
    store: &'a DocumentStore,
    fetcher: &'a F,
}

impl<'a, F: Fetch> RecordJoiner<'a, F> {
    pub fn new(store: &'a DocumentStore, fetcher: &'a F) -> Self {
        Self { store, fetcher }
    }

    /// Looks `handle` up in the cached coder directory. The first exact match wins.
    pub fn resolve_coder_id(&self, handle: &str) -> Result<u64> {
        let directory = self.store.load(DocKey::Coders)?;
        parse_coders(&directory)?
            .into_iter()
            .find(|c| c.handle == handle)
            .map(|c| c.coder_id)
            .ok_or_else(|| AppError::CoderNotFound(handle.to_string()))
    }

    /// One stats-enriched Match per history entry, in history order.
    ///
    /// Rounds missing from the cache are fetched once and saved. A round whose
    /// results have no row for the coder is skipped and reported in the outcome.
    pub async fn build_matches(&self, coder_id: u64) -> Result<JoinOutcome> {
        let history = self.fetcher.fetch(Query::RatingHistory { coder_id }).await?;
        let history = parse_rating_history(&history)?;
        info!(coder_id, entries = history.len(), "Rating history loaded");

        let mut outcome = JoinOutcome::default();
        for entry in history {
            let round_id = entry.round_id;
            let round = self.load_round(round_id).await?;

            let result = match round.entry_for(coder_id) {
                Ok(result) => result.clone(),
                Err(e @ AppError::JoinMiss { .. }) => {
                    warn!(round_id, coder_id, "Skipping match: {e}");
                    outcome.skipped_rounds.push(round_id);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let joined = Match::join(entry, result).ok_or(AppError::RoundMismatch {
                expected: round_id,
                found: round.round_id,
            })?;
            outcome.matches.push(aggregate(joined, &round)?);
        }

        Ok(outcome)
    }

    async fn load_round(&self, round_id: u64) -> Result<RoundDocument> {
        let key = DocKey::Round(round_id);
        let bytes = if self.store.exists(key) {
            self.store.load(key)?
        } else {
            info!(round_id, "Round not cached, fetching");
            let body = self.fetcher.fetch(Query::RoundResults { round_id }).await?;
            self.store.save(key, &body)?;
            body
        };
        RoundDocument::parse(round_id, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::fake::FakeFetcher;
    use crate::types::Level;
    use tempfile::{tempdir, TempDir};

    const CODERS: &str = "<dd_coder_list>\
        <row><coder_id>11</coder_id><handle>alice</handle></row>\
        <row><coder_id>22</coder_id><handle>bob</handle></row>\
        <row><coder_id>33</coder_id><handle>bob</handle></row>\
        </dd_coder_list>";

    const HISTORY: &str = "<dd_rating_history>\
        <row><round_id>2</round_id><short_name>SRM 2</short_name><date>2010.02.01</date></row>\
        <row><round_id>1</round_id><short_name>SRM 1</short_name><date>2010.01.01</date></row>\
        <row><round_id>3</round_id><short_name>SRM 3</short_name><date>2010.03.01</date></row>\
        </dd_rating_history>";

    fn round_xml(rows: &[(u64, u8, &str)]) -> String {
        let rows: String = rows
            .iter()
            .map(|(coder, div, l1)| {
                format!(
                    "<row><coder_id>{coder}</coder_id><division>{div}</division>\
                     <level_one_final_points>{l1}</level_one_final_points></row>"
                )
            })
            .collect();
        format!("<dd_round_results>{rows}</dd_round_results>")
    }

    fn store_with_coders() -> (TempDir, DocumentStore) {
        let dir = tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        store.save(DocKey::Coders, CODERS.as_bytes()).unwrap();
        (dir, store)
    }

    #[test]
    fn resolves_first_matching_handle() {
        let (_dir, store) = store_with_coders();
        let fetcher = FakeFetcher::default();
        let joiner = RecordJoiner::new(&store, &fetcher);

        assert_eq!(joiner.resolve_coder_id("alice").unwrap(), 11);
        assert_eq!(joiner.resolve_coder_id("bob").unwrap(), 22);
    }

    #[test]
    fn unknown_handle_is_coder_not_found() {
        let (_dir, store) = store_with_coders();
        let fetcher = FakeFetcher::default();
        let joiner = RecordJoiner::new(&store, &fetcher);

        let err = joiner.resolve_coder_id("Alice").unwrap_err();
        assert!(matches!(err, AppError::CoderNotFound(h) if h == "Alice"));
    }

    #[test]
    fn missing_directory_is_not_found() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        let fetcher = FakeFetcher::default();

        let err = RecordJoiner::new(&store, &fetcher).resolve_coder_id("alice").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn builds_matches_in_history_order_and_skips_misses() {
        let (_dir, store) = store_with_coders();
        store
            .save(DocKey::Round(1), round_xml(&[(11, 1, "100"), (22, 1, "50"), (44, 2, "300")]).as_bytes())
            .unwrap();
        store
            .save(DocKey::Round(2), round_xml(&[(11, 2, "0"), (55, 2, "80")]).as_bytes())
            .unwrap();
        // Round 3 has no row for coder 11.
        store.save(DocKey::Round(3), round_xml(&[(22, 1, "10")]).as_bytes()).unwrap();

        let fetcher = FakeFetcher::default().with(Query::RatingHistory { coder_id: 11 }, HISTORY);
        let outcome = RecordJoiner::new(&store, &fetcher).build_matches(11).await.unwrap();

        let rounds: Vec<_> = outcome.matches.iter().map(Match::round_id).collect();
        assert_eq!(rounds, vec![2, 1]);
        assert_eq!(outcome.skipped_rounds, vec![3]);

        let first = &outcome.matches[0];
        assert_eq!(first.division(), 2);
        assert_eq!(first.history.short_name, "SRM 2");
        assert_eq!(first.stats.total_participants, 2);
        assert_eq!(first.stats.level(Level::One).correct_submissions, 1);
        assert_eq!(first.stats.level(Level::One).average_score, 80.0);

        let second = &outcome.matches[1];
        assert_eq!(second.level_score(Level::One), 100.0);
        assert_eq!(second.stats.total_participants, 2);
        assert_eq!(second.stats.level(Level::One).average_score, 75.0);
    }

    #[tokio::test]
    async fn uncached_round_is_fetched_and_saved() {
        let (_dir, store) = store_with_coders();
        let history = "<h><row><round_id>7</round_id><date>2012.05.05</date></row></h>";
        let round = round_xml(&[(11, 1, "250")]);
        let fetcher = FakeFetcher::default()
            .with(Query::RatingHistory { coder_id: 11 }, history)
            .with(Query::RoundResults { round_id: 7 }, round.clone());

        let outcome = RecordJoiner::new(&store, &fetcher).build_matches(11).await.unwrap();

        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(store.load(DocKey::Round(7)).unwrap(), round.into_bytes());
    }

    #[tokio::test]
    async fn corrupt_round_document_propagates() {
        let (_dir, store) = store_with_coders();
        store.save(DocKey::Round(7), b"<dd_round_results><row>").unwrap();
        let history = "<h><row><round_id>7</round_id><date>2012.05.05</date></row></h>";
        let fetcher = FakeFetcher::default().with(Query::RatingHistory { coder_id: 11 }, history);

        let err = RecordJoiner::new(&store, &fetcher).build_matches(11).await.unwrap_err();
        assert!(matches!(err, AppError::Parse { .. }));
    }

    #[tokio::test]
    async fn history_fetch_failure_propagates() {
        let (_dir, store) = store_with_coders();
        let fetcher = FakeFetcher::default();

        let err = RecordJoiner::new(&store, &fetcher).build_matches(11).await.unwrap_err();
        assert!(matches!(err, AppError::FetchStatus { .. }));
    }
}
