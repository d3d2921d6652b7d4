//! Surf data fetcher.
//!
//! Queries the providers configured for a location in priority order,
//! normalizes each payload and merges the results into one `SurfReading`. Scheduled
//! refreshes and device-triggered cache misses share this single path.

pub mod providers;
pub mod throttle;

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::{Error, LampServerConfig, Location, PartialReading, ProviderSource, SurfReading};
use tracing::{debug, info, warn};

pub use throttle::ProviderThrottle;

/// Source of canonical surf readings.
#[async_trait]
pub trait SurfFetcher: Send + Sync {
    /// Fetch a fresh reading for `location`.
    ///
    /// Fails with `Error::Upstream` or `Error::Timeout` only when no
    /// provider of the location produced a usable payload.
    async fn fetch(&self, location: &Location) -> Result<SurfReading, Error>;

    /// Check that at least one upstream provider is reachable.
    async fn ping(&self) -> Result<(), Error>;
}

/// Settings for [`HttpSurfFetcher`].
#[derive(Debug, Clone)]
pub struct FetcherOptions {
    pub timeout: Duration,
    pub user_agent: String,
    pub requests_per_minute: u32,
    pub ready_url: Option<String>,
}

impl FetcherOptions {
    pub fn from_config(cfg: &LampServerConfig) -> Self {
        let ready_url = cfg.providers.ready_check_url.clone().or_else(|| {
            cfg.locations
                .iter()
                .flat_map(|l| l.sources_by_priority())
                .map(|s| s.url.clone())
                .next()
        });

        Self {
            timeout: Duration::from_secs(cfg.timing.fetch_timeout_secs),
            user_agent: cfg.providers.user_agent.clone(),
            requests_per_minute: cfg.providers.requests_per_minute,
            ready_url,
        }
    }
}

impl Default for FetcherOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: "SurfLamp-Agent/1.0".into(),
            requests_per_minute: 60,
            ready_url: None,
        }
    }
}

const READY_TIMEOUT: Duration = Duration::from_secs(3);

/// HTTP fetcher backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpSurfFetcher {
    client: reqwest::Client,
    throttle: ProviderThrottle,
    timeout: Duration,
    ready_url: Option<String>,
}

fn format_reqwest_error(err: &reqwest::Error) -> String {
    // Keep chained causes so DNS/TLS/socket failures are visible.
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !cause_msg.is_empty() && !message.contains(&cause_msg) {
            message.push_str(": ");
            message.push_str(&cause_msg);
        }
        source = cause.source();
    }

    message
}

fn summarize_body(raw: &str) -> String {
    const MAX_CHARS: usize = 300;
    let compact = raw.replace(['\n', '\r'], " ");
    if compact.chars().count() > MAX_CHARS {
        let head: String = compact.chars().take(MAX_CHARS).collect();
        format!("{head}...")
    } else {
        compact
    }
}

impl HttpSurfFetcher {
    pub fn new(options: FetcherOptions) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(options.user_agent.as_str())
            .pool_max_idle_per_host(4)
            .timeout(options.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build provider HTTP client: {e}")))?;

        Ok(Self {
            client,
            throttle: ProviderThrottle::per_minute(options.requests_per_minute),
            timeout: options.timeout,
            ready_url: options.ready_url,
        })
    }

    pub fn from_config(cfg: &LampServerConfig) -> Result<Self, Error> {
        Self::new(FetcherOptions::from_config(cfg))
    }

    fn map_send_error(&self, source_name: &str, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                source_name: source_name.to_string(),
                after_ms: self.timeout.as_millis() as u64,
            }
        } else {
            Error::upstream(source_name, format_reqwest_error(&err))
        }
    }

    /// Fetch and normalize a single provider endpoint.
    async fn fetch_source(
        &self,
        location: &Location,
        source: &ProviderSource,
    ) -> Result<PartialReading, Error> {
        let kind = source.resolved_kind().ok_or_else(|| {
            Error::Config(format!(
                "no provider kind for {} source {}",
                location.name, source.url
            ))
        })?;
        let source_name = format!("{} [{}]", location.name, kind.label());

        self.throttle.wait().await;
        debug!("Fetching {}: {}", source_name, source.url);

        let mut request = self.client.get(&source.url);
        if let Some(key) = source.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            request = request.bearer_auth(key);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| self.map_send_error(&source_name, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::upstream(
                &source_name,
                format!("returned {}: {}", status.as_u16(), summarize_body(&body)),
            ));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| self.map_send_error(&source_name, e))?;
        let payload: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            Error::upstream(
                &source_name,
                format!("malformed JSON ({e}): {}", summarize_body(&body)),
            )
        })?;

        providers::normalize(kind, &source_name, &payload, Utc::now())
    }

    /// Query sources in priority order until every metric is filled.
    async fn fetch_merged(&self, location: &Location) -> Result<SurfReading, Error> {
        let sources = location.sources_by_priority();
        if sources.is_empty() {
            return Err(Error::Config(format!(
                "location {} has no provider sources",
                location.name
            )));
        }

        let mut merged = PartialReading::default();
        let mut succeeded = 0usize;
        let mut first_error: Option<Error> = None;

        for source in sources {
            match self.fetch_source(location, source).await {
                Ok(partial) => {
                    merged.fill_from(&partial);
                    succeeded += 1;
                    if merged.is_complete() {
                        debug!("{} complete after {} source(s)", location.name, succeeded);
                        break;
                    }
                }
                Err(e) => {
                    warn!("Provider failed for {}: {}", location.name, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if succeeded == 0 {
            return Err(first_error.unwrap_or_else(|| {
                Error::upstream(&location.name, "no provider returned data")
            }));
        }

        let reading = merged.into_reading(&location.name, Utc::now());
        info!(
            "Fetched {}: wave={:?}m period={:?}s wind={:?}m/s dir={:?}°",
            location.name,
            reading.wave_height_m,
            reading.wave_period_s,
            reading.wind_speed_mps,
            reading.wind_direction_deg
        );
        Ok(reading)
    }
}

#[async_trait]
impl SurfFetcher for HttpSurfFetcher {
    /// The configured timeout bounds the whole fetch, throttle waits and
    /// every source included.
    async fn fetch(&self, location: &Location) -> Result<SurfReading, Error> {
        match tokio::time::timeout(self.timeout, self.fetch_merged(location)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Fetch for {} exceeded {:?}", location.name, self.timeout);
                Err(Error::Timeout {
                    source_name: location.name.clone(),
                    after_ms: self.timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Skips the throttle so readiness polling never spends the provider
    /// budget.
    async fn ping(&self) -> Result<(), Error> {
        let url = self
            .ready_url
            .as_deref()
            .ok_or_else(|| Error::upstream("readiness check", "no provider endpoint configured"))?;

        let ready_timeout = self.timeout.min(READY_TIMEOUT);
        let resp = self
            .client
            .get(url)
            .timeout(ready_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout {
                        source_name: "readiness check".into(),
                        after_ms: ready_timeout.as_millis() as u64,
                    }
                } else {
                    Error::upstream("readiness check", format_reqwest_error(&e))
                }
            })?;

        if resp.status().is_server_error() {
            return Err(Error::upstream(
                "readiness check",
                format!("returned {}", resp.status().as_u16()),
            ));
        }
        Ok(())
    }
}
