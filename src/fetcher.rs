use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::config::{queries, Config};
use crate::error::{AppError, Result};

/// The four document queries the BasicData endpoint serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    CoderList,
    RoundList,
    RatingHistory { coder_id: u64 },
    RoundResults { round_id: u64 },
}

impl Query {
    /// Query-string suffix appended to the service base URL.
    pub fn params(&self) -> String {
        match self {
            Query::CoderList => format!("c={}", queries::CODER_LIST),
            Query::RoundList => format!("c={}", queries::ROUND_LIST),
            Query::RatingHistory { coder_id } => {
                format!("c={}&cr={coder_id}", queries::RATING_HISTORY)
            }
            Query::RoundResults { round_id } => {
                format!("c={}&rd={round_id}", queries::ROUND_RESULTS)
            }
        }
    }

    pub fn url(&self, base_url: &str) -> String {
        let sep = if base_url.contains('?') { '&' } else { '?' };
        format!("{}{sep}{}", base_url.trim_end_matches('&'), self.params())
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.params())
    }
}

/// Source of raw documents. One attempt per call.
pub trait Fetch {
    fn fetch(&self, query: Query) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Fetches documents from the remote service over HTTP.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.api_url.clone(),
        })
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, query: Query) -> Result<Vec<u8>> {
        let url = query.url(&self.base_url);
        debug!(%query, "fetching");

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::FetchStatus {
                query: query.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await?;
        debug!(%query, bytes = body.len(), "fetched");
        Ok(body.to_vec())
    }
}
