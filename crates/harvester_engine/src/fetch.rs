use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use harvester_core::{FetchResult, RawArticle, WorkUnit};
use serde::Deserialize;
use url::Url;

use crate::{FailureKind, FetchError};

/// GDELT DOC 2.0 article search endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.gdeltproject.org/api/v2/doc/doc";

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub base_url: String,
    pub max_records: u32,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Upper bound on requests per unit, retries included.
    pub max_attempts: u32,
    /// Multiplied by the attempt number after a 429.
    pub rate_limit_backoff: Duration,
    /// Fixed wait after a malformed body or transport failure.
    pub retry_wait: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_records: 250,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_attempts: 4,
            rate_limit_backoff: Duration::from_secs(35),
            retry_wait: Duration::from_secs(15),
        }
    }
}

/// Executes one logical fetch for a unit. Never fails: remote problems
/// degrade to an empty result.
#[async_trait::async_trait]
pub trait SearchClient: Send + Sync {
    async fn fetch(&self, unit: &WorkUnit) -> FetchResult;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Clone)]
pub struct ReqwestSearchClient {
    settings: FetchSettings,
    base_url: Url,
    client: reqwest::Client,
}

impl ReqwestSearchClient {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(concat!("news-harvester/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(map_reqwest_error)?;
        Ok(Self {
            settings,
            base_url,
            client,
        })
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Full request URL for a unit.
    pub fn request_url(&self, unit: &WorkUnit) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("query", &unit.query)
            .append_pair("mode", "artlist")
            .append_pair("format", "json")
            .append_pair("maxrecords", &self.settings.max_records.to_string())
            .append_pair(
                "startdatetime",
                &unit.window.start.format(TIMESTAMP_FORMAT).to_string(),
            )
            .append_pair(
                "enddatetime",
                &unit.window.end.format(TIMESTAMP_FORMAT).to_string(),
            );
        url
    }

    async fn attempt(&self, url: Url) -> Result<Vec<RawArticle>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(FetchError::new(FailureKind::RateLimited, status.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let parsed: SearchResponse = serde_json::from_slice(&body)
            .map_err(|err| FetchError::new(FailureKind::MalformedBody, err.to_string()))?;
        Ok(parsed.articles)
    }

    fn wait_before_retry(&self, kind: &FailureKind, attempt: u32) -> Duration {
        match kind {
            FailureKind::RateLimited => self.settings.rate_limit_backoff.saturating_mul(attempt),
            _ => self.settings.retry_wait,
        }
    }
}

#[async_trait::async_trait]
impl SearchClient for ReqwestSearchClient {
    async fn fetch(&self, unit: &WorkUnit) -> FetchResult {
        let url = self.request_url(unit);
        let max_attempts = self.settings.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.attempt(url.clone()).await {
                Ok(articles) => {
                    engine_debug!("{unit}: {} articles on attempt {attempt}", articles.len());
                    return FetchResult::complete(articles);
                }
                Err(err) if err.kind.is_transient() => {
                    let wait = self.wait_before_retry(&err.kind, attempt);
                    engine_warn!("    {unit}: {err} (attempt {attempt}/{max_attempts})");
                    if attempt < max_attempts {
                        engine_debug!("    waiting {}s before retry", wait.as_secs_f32());
                        tokio::time::sleep(wait).await;
                    }
                    last_error = Some(err);
                }
                Err(err) => {
                    engine_warn!("    {unit}: {err}; skipping unit");
                    return FetchResult::degraded(err.kind.to_string());
                }
            }
        }

        let exhausted = FailureKind::RetriesExhausted {
            attempts: max_attempts,
        };
        let reason = match last_error {
            Some(err) => format!("{exhausted}; last: {}", err.kind),
            None => exhausted.to_string(),
        };
        engine_warn!("    {unit}: {reason}");
        FetchResult::degraded(reason)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
