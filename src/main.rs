mod cache_refresh;
mod config;
mod document;
mod error;
mod fetcher;
mod joiner;
mod report;
mod stats;
mod store;
mod types;

use std::fs::File;
use std::io::{BufWriter, Write};

use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cache_refresh::{refresh_coders, refresh_rounds};
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::{Fetch, HttpFetcher};
use crate::joiner::RecordJoiner;
use crate::report::{sort_by_date, ReportSeries};
use crate::store::{DocKey, DocumentStore};
use crate::types::{Level, Match};

/// Plot a coder's cumulative solved problems per level across rated matches.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Coder handle, matched exactly against the coder directory
    handle: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cfg, &cli.handle).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config, handle: &str) -> Result<()> {
    // --- Cache setup ---
    let store = DocumentStore::open(&cfg.cache_dir)?;
    let fetcher = HttpFetcher::new(&cfg)?;
    info!("Document cache at {}", store.dir().display());

    let matches = run_with(&cfg, &store, &fetcher, handle).await?;
    let series = ReportSeries::from_matches(&matches);

    // --- Chart ---
    if series.is_empty() {
        warn!("No matches to plot for {handle}");
    } else if cfg.render_chart {
        report::render(&format!("{handle}: cumulative solved problems"), &series)?;
    }

    Ok(())
}

/// Refresh the cache as configured, then join and summarise the coder's
/// matches. Returns them oldest first.
async fn run_with<F: Fetch>(
    cfg: &Config,
    store: &DocumentStore,
    fetcher: &F,
    handle: &str,
) -> Result<Vec<Match>> {
    if cfg.refresh_cache {
        refresh_coders(fetcher, store).await?;
        let stats = refresh_rounds(fetcher, store).await?;
        if stats.skipped > 0 {
            warn!("{} rounds could not be cached this run", stats.skipped);
        }
    } else if !store.exists(DocKey::Coders) {
        info!("Coder directory not cached, fetching");
        refresh_coders(fetcher, store).await?;
    }

    // --- Join history with round results ---
    let joiner = RecordJoiner::new(store, fetcher);
    let coder_id = joiner.resolve_coder_id(handle)?;
    info!(handle, coder_id, "Coder resolved");

    let outcome = joiner.build_matches(coder_id).await?;
    let matches = sort_by_date(outcome.matches);
    for m in &matches {
        log_match(m);
    }

    let series = ReportSeries::from_matches(&matches);
    info!(
        matches = matches.len(),
        skipped = outcome.skipped_rounds.len(),
        level_one_solved = series.total(Level::One),
        level_two_solved = series.total(Level::Two),
        level_three_solved = series.total(Level::Three),
        "Report ready: {} matches ({} skipped), solved L1={} L2={} L3={}",
        matches.len(),
        outcome.skipped_rounds.len(),
        series.total(Level::One),
        series.total(Level::Two),
        series.total(Level::Three),
    );
    if !outcome.skipped_rounds.is_empty() {
        warn!("Rounds without a result row for {handle}: {:?}", outcome.skipped_rounds);
    }

    if let Some(path) = &cfg.matches_json {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &matches)?;
        writer.flush()?;
        info!("Wrote {} matches to {path}", matches.len());
    }

    Ok(matches)
}

fn log_match(m: &Match) {
    let l1 = m.stats.level(Level::One);
    let l2 = m.stats.level(Level::Two);
    debug!(
        round_id = m.round_id(),
        date = %m.date(),
        division = m.division(),
        participants = m.stats.total_participants,
        "{} | L1 {:.2} (div avg {:.2}, {} solved) | L2 {:.2} (div avg {:.2}, {} solved)",
        m.history.short_name,
        m.level_score(Level::One),
        l1.average_score,
        l1.correct_submissions,
        m.level_score(Level::Two),
        l2.average_score,
        l2.correct_submissions,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::fetcher::fake::FakeFetcher;
    use crate::fetcher::Query;
    use tempfile::{tempdir, TempDir};

    const CODERS: &str = "<dd_coder_list>\
        <row><coder_id>11</coder_id><handle>alice</handle></row>\
        </dd_coder_list>";

    // Newest first, as the service may return it.
    const HISTORY: &str = "<dd_rating_history>\
        <row><round_id>2</round_id><short_name>SRM 2</short_name><date>2010.02.01</date></row>\
        <row><round_id>1</round_id><short_name>SRM 1</short_name><date>2010.01.01</date></row>\
        </dd_rating_history>";

    const ROUND_LIST: &str = "<dd_round_list>\
        <row><round_id>1</round_id></row>\
        <row><round_id>2</round_id></row>\
        </dd_round_list>";

    fn round_xml(l1: &str) -> String {
        format!(
            "<dd_round_results><row><coder_id>11</coder_id><division>1</division>\
             <level_one_final_points>{l1}</level_one_final_points></row></dd_round_results>"
        )
    }

    fn test_config() -> Config {
        Config {
            api_url: "http://localhost/tc".to_string(),
            cache_dir: String::new(),
            log_level: "info".to_string(),
            http_timeout_secs: 1,
            refresh_cache: false,
            render_chart: false,
            matches_json: None,
        }
    }

    /// Cache holding both rounds but no coder directory.
    fn cached_rounds() -> (TempDir, DocumentStore) {
        let dir = tempdir().unwrap();
        let store = DocumentStore::open(dir.path().join("data")).unwrap();
        store.save(DocKey::Round(1), round_xml("0").as_bytes()).unwrap();
        store.save(DocKey::Round(2), round_xml("250").as_bytes()).unwrap();
        (dir, store)
    }

    fn service() -> FakeFetcher {
        FakeFetcher::default()
            .with(Query::CoderList, CODERS)
            .with(Query::RoundList, ROUND_LIST)
            .with(Query::RatingHistory { coder_id: 11 }, HISTORY)
    }

    #[tokio::test]
    async fn missing_coder_directory_is_fetched_once() {
        let (_dir, store) = cached_rounds();
        let fetcher = service();

        let matches = run_with(&test_config(), &store, &fetcher, "alice").await.unwrap();

        assert_eq!(matches.len(), 2);
        let directory_fetches = fetcher.calls().iter().filter(|q| **q == Query::CoderList).count();
        assert_eq!(directory_fetches, 1);
        assert_eq!(store.load(DocKey::Coders).unwrap(), CODERS.as_bytes());
        assert!(!fetcher.calls().contains(&Query::RoundList));
    }

    #[tokio::test]
    async fn cached_coder_directory_is_not_refetched() {
        let (_dir, store) = cached_rounds();
        store.save(DocKey::Coders, CODERS.as_bytes()).unwrap();
        let fetcher = service();

        run_with(&test_config(), &store, &fetcher, "alice").await.unwrap();

        assert_eq!(fetcher.calls(), vec![Query::RatingHistory { coder_id: 11 }]);
    }

    #[tokio::test]
    async fn refresh_runs_both_refreshes_before_resolving() {
        let (_dir, store) = cached_rounds();
        store.save(DocKey::Coders, b"<stale/>").unwrap();
        let fetcher = service();
        let cfg = Config {
            refresh_cache: true,
            ..test_config()
        };

        run_with(&cfg, &store, &fetcher, "alice").await.unwrap();

        assert_eq!(
            fetcher.calls(),
            vec![
                Query::CoderList,
                Query::RoundList,
                Query::RatingHistory { coder_id: 11 },
            ]
        );
    }

    #[tokio::test]
    async fn matches_json_is_written_oldest_first() {
        let (dir, store) = cached_rounds();
        let path = dir.path().join("matches.json");
        let cfg = Config {
            matches_json: Some(path.to_string_lossy().into_owned()),
            ..test_config()
        };

        let matches = run_with(&cfg, &store, &service(), "alice").await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains('\n'), "expected pretty-printed JSON");
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        let rounds: Vec<_> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["history"]["round_id"].as_u64().unwrap())
            .collect();
        assert_eq!(rounds, vec![1, 2]);
        assert_eq!(json[1]["result"]["levels"][0]["final_points"], 250.0);
        assert_eq!(matches.iter().map(Match::round_id).collect::<Vec<_>>(), rounds);
    }

    #[tokio::test]
    async fn unknown_handle_fails_the_run() {
        let (_dir, store) = cached_rounds();

        let err = run_with(&test_config(), &store, &service(), "mallory").await.unwrap_err();

        assert!(matches!(err, AppError::CoderNotFound(h) if h == "mallory"));
    }
}
