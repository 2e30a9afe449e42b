use std::time::{Duration, Instant};

use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::config::{Settings, SourceLocator};
use crate::error::{Error, Result};
use crate::model::Subject;

const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Fetches raw plan pages from the curriculum portal.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    backoff: Duration,
}

impl Fetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(Error::Client)?;

        Ok(Fetcher {
            client,
            base_url: settings.base_url.clone(),
            max_retries: settings.max_retries,
            backoff: Duration::from_millis(settings.backoff_ms),
        })
    }

    /// GET `base_url?lplanid=<id>&lplansc=<token>` and return the body.
    pub async fn fetch(&self, subject: Subject, locator: SourceLocator) -> Result<String> {
        for attempt in 0..self.max_retries {
            match self.fetch_once(locator).await {
                Err(e) if is_retryable(&e) => {
                    let backoff = self.backoff_for(attempt);
                    warn!(
                        "Fetching {} failed (attempt {}/{}): {}, backing off {:.1}s",
                        subject,
                        attempt + 1,
                        self.max_retries,
                        e,
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                }
                result => return result.map_err(|source| Error::Transport { subject, source }),
            }
        }

        self.fetch_once(locator)
            .await
            .map_err(|source| Error::Transport { subject, source })
    }

    /// `backoff * 2^attempt`, capped at `MAX_BACKOFF`.
    fn backoff_for(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.backoff.checked_mul(factor))
            .map_or(MAX_BACKOFF, |backoff| backoff.min(MAX_BACKOFF))
    }

    fn request(&self, locator: SourceLocator) -> reqwest::RequestBuilder {
        self.client
            .get(&self.base_url)
            .query(&[("lplanid", locator.plan_id), ("lplansc", locator.access_token)])
    }

    async fn fetch_once(&self, locator: SourceLocator) -> reqwest::Result<String> {
        debug!(plan_id = locator.plan_id, url = %self.base_url, "Fetching plan page");
        let start = Instant::now();
        let body = self
            .request(locator)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        info!(
            plan_id = locator.plan_id,
            bytes = body.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Fetched plan page"
        );
        Ok(body)
    }
}

fn is_retryable(e: &reqwest::Error) -> bool {
    if e.is_timeout() || e.is_connect() {
        return true;
    }
    matches!(
        e.status(),
        Some(status) if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    )
}
