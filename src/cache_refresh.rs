use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::document::parse_round_ids;
use crate::error::Result;
use crate::fetcher::{Fetch, Query};
use crate::store::{DocKey, DocumentStore};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RefreshStats {
    /// Rounds in the remote round directory.
    pub listed: usize,
    pub already_cached: usize,
    pub fetched: usize,
    /// Rounds whose fetch or save failed. They are retried on the next refresh.
    pub skipped: usize,
}

/// Re-download the coder directory into the cache.
pub async fn refresh_coders<F: Fetch>(fetcher: &F, store: &DocumentStore) -> Result<()> {
    let body = fetcher.fetch(Query::CoderList).await?;
    store.save(DocKey::Coders, &body)?;
    info!(bytes = body.len(), "Coder directory refreshed");
    Ok(())
}

/// Download every listed round that is not cached yet.
///
/// Failing to get the round directory itself is an error. Failures on
/// individual rounds are logged, counted in `skipped`, and do not stop the loop.
pub async fn refresh_rounds<F: Fetch>(fetcher: &F, store: &DocumentStore) -> Result<RefreshStats> {
    let listing = fetcher.fetch(Query::RoundList).await?;
    let round_ids = parse_round_ids(&listing)?;
    let cached: BTreeSet<DocKey> = store.list_keys()?;

    let mut stats = RefreshStats {
        listed: round_ids.len(),
        ..RefreshStats::default()
    };

    for round_id in round_ids {
        let key = DocKey::Round(round_id);
        if cached.contains(&key) {
            stats.already_cached += 1;
            continue;
        }

        let saved = match fetcher.fetch(Query::RoundResults { round_id }).await {
            Ok(body) => store.save(key, &body),
            Err(e) => Err(e),
        };
        match saved {
            Ok(()) => stats.fetched += 1,
            Err(e) => {
                warn!(round_id, "Skipping round during refresh: {e}");
                stats.skipped += 1;
            }
        }
    }

    info!(
        listed = stats.listed,
        already_cached = stats.already_cached,
        fetched = stats.fetched,
        skipped = stats.skipped,
        "Round cache refresh complete: {} listed, {} cached, +{} fetched, {} skipped",
        stats.listed,
        stats.already_cached,
        stats.fetched,
        stats.skipped,
    );

    Ok(stats)
}
