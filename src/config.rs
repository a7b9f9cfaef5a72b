use crate::error::{AppError, Result};

pub const TC_API_URL: &str = "http://community.topcoder.com/tc?module=BasicData";

/// Directory holding cached round and coder documents.
pub const CACHE_DIR: &str = "data";

/// HTTP request timeout (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Number of problem levels per round.
pub const LEVEL_COUNT: usize = 3;

/// Query names understood by the BasicData endpoint.
pub mod queries {
    pub const CODER_LIST: &str = "dd_coder_list";
    pub const ROUND_LIST: &str = "dd_round_list";
    pub const RATING_HISTORY: &str = "dd_rating_history";
    pub const ROUND_RESULTS: &str = "dd_round_results";
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub cache_dir: String,
    pub log_level: String,
    pub http_timeout_secs: u64,
    /// Re-download the coder directory and every uncached round before running (REFRESH_CACHE)
    pub refresh_cache: bool,
    /// Open the blocking chart window at the end of the run (RENDER_CHART)
    pub render_chart: bool,
    /// Write the joined matches to this path as JSON (MATCHES_JSON)
    pub matches_json: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key → value source; `from_env` passes the process environment.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            api_url: var("TC_API_URL").unwrap_or_else(|| TC_API_URL.to_string()),
            cache_dir: var("CACHE_DIR").unwrap_or_else(|| CACHE_DIR.to_string()),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            http_timeout_secs: var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|| HTTP_TIMEOUT_SECS.to_string())
                .trim()
                .parse::<u64>()
                .map_err(|_| {
                    AppError::Config("HTTP_TIMEOUT_SECS must be a whole number of seconds".to_string())
                })?,
            refresh_cache: parse_flag(var("REFRESH_CACHE"), false),
            render_chart: parse_flag(var("RENDER_CHART"), true),
            matches_json: var("MATCHES_JSON")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        })
    }
}

fn parse_flag(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        assert!(parse_flag(Some("TRUE".into()), false));
        assert!(parse_flag(Some(" yes ".into()), false));
        assert!(!parse_flag(Some("0".into()), true));
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.api_url, TC_API_URL);
        assert_eq!(cfg.cache_dir, CACHE_DIR);
        assert_eq!(cfg.http_timeout_secs, HTTP_TIMEOUT_SECS);
        assert!(!cfg.refresh_cache);
        assert!(cfg.render_chart);
        assert_eq!(cfg.matches_json, None);
    }

    #[test]
    fn reads_overrides() {
        let cfg = Config::from_lookup(lookup(&[
            ("HTTP_TIMEOUT_SECS", "5"),
            ("REFRESH_CACHE", "1"),
            ("RENDER_CHART", "false"),
            ("MATCHES_JSON", " out.json "),
        ]))
        .unwrap();
        assert_eq!(cfg.http_timeout_secs, 5);
        assert!(cfg.refresh_cache);
        assert!(!cfg.render_chart);
        assert_eq!(cfg.matches_json.as_deref(), Some("out.json"));
    }

    #[test]
    fn non_numeric_timeout_is_a_config_error() {
        let err = Config::from_lookup(lookup(&[("HTTP_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("HTTP_TIMEOUT_SECS")));
    }

    #[test]
    fn unknown_or_missing_flag_uses_default() {
        assert!(parse_flag(None, true));
        assert!(!parse_flag(Some("maybe".into()), false));
    }
}
