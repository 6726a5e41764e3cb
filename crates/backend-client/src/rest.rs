//! REST implementation of [`BudgetBackend`].
//!
//! `RestBudgetBackend` wraps a `reqwest::Client` and translates every
//! trait method into the corresponding HTTP call against the hosted
//! backend's budget functions, with automatic retry + exponential
//! back-off on transient (5xx / timeout / connect) failures.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use ff_domain::budget::{BudgetSettings, BudgetSettingsPatch, ProjectId};
use ff_domain::config::BackendConfig;
use ff_domain::error::{Error, Result};
use ff_domain::trace::TraceEvent;

use crate::provider::BudgetBackend;
use crate::types::{BudgetSettingsDto, SettingsPatchDto, SpendSummaryDto};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A REST client for the hosted backend's budget endpoints.
///
/// Created once and shared; the underlying `reqwest::Client` keeps a
/// connection pool.
#[derive(Debug, Clone)]
pub struct RestBudgetBackend {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    max_retries: u32,
}

impl RestBudgetBackend {
    /// The configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build a new client from the shared `BackendConfig`.
    pub fn new(cfg: &BackendConfig) -> Result<Self> {
        let timeout = Duration::from_millis(cfg.timeout_ms);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("building HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            api_key: cfg.resolve_api_key(),
            timeout,
            max_retries: cfg.max_retries,
        })
    }

    // ── request helpers ──────────────────────────────────────────────

    /// Decorate a `RequestBuilder` with the standard headers.
    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        let trace_id = Uuid::new_v4().to_string();
        let mut rb = rb
            .header("X-Client-Type", "fineflow-guard")
            .header("X-Trace-Id", &trace_id);

        if let Some(ref key) = self.api_key {
            rb = rb.header("apikey", key).bearer_auth(key);
        }
        rb
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL of a per-project endpoint. The id is pushed as one
    /// percent-encoded path segment, so `/`, `?` or `#` inside it can never
    /// address a different endpoint.
    fn project_url(&self, project: &ProjectId, leaf: &str) -> Result<Url> {
        let id = project.as_str();
        // `.` and `..` would be dropped by the segment encoder.
        if id.is_empty() || id == "." || id == ".." {
            return Err(Error::Validation(format!("invalid project id {id:?}")));
        }

        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("invalid backend base_url {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("backend base_url {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(["functions", "v1", "budget", id, leaf]);
        Ok(url)
    }

    async fn parse<T: DeserializeOwned>(endpoint: &str, resp: Response) -> Result<T> {
        let body = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Other(format!("failed to parse {endpoint} response: {e}: {body}")))
    }

    // ── retry engine ─────────────────────────────────────────────────

    /// Execute a request with retry + exponential back-off on transient errors.
    ///
    /// * Retries on 5xx status codes, timeouts and connection errors.
    /// * Does **not** retry on 4xx (client errors are permanent).
    /// * Emits a `TraceEvent::BackendCall` after every attempt.
    async fn execute_with_retry(
        &self,
        endpoint: &str,
        build_request: impl Fn() -> RequestBuilder,
    ) -> Result<Response> {
        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(100 * 2u64.pow(attempt - 1));
                tokio::time::sleep(backoff).await;
            }

            let start = Instant::now();
            let result = self.decorate(build_request()).send().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    TraceEvent::BackendCall {
                        endpoint: endpoint.to_owned(),
                        status,
                        duration_ms,
                    }
                    .emit();

                    if resp.status().is_server_error() {
                        let body = resp.text().await.unwrap_or_default();
                        last_err = Some(Error::Transient(format!(
                            "{endpoint} returned {status}: {body}"
                        )));
                        continue;
                    }

                    if resp.status().is_client_error() {
                        let resp_status = resp.status();
                        let body = resp.text().await.unwrap_or_default();
                        return Err(client_error(endpoint, resp_status, body));
                    }

                    return Ok(resp);
                }
                Err(e) => {
                    let status = e.status().map(|s| s.as_u16()).unwrap_or(0);

                    TraceEvent::BackendCall {
                        endpoint: endpoint.to_owned(),
                        status,
                        duration_ms,
                    }
                    .emit();

                    tracing::debug!(endpoint, attempt, error = %e, "backend request failed");
                    last_err = Some(from_reqwest(e));
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::Transient(format!("{endpoint}: all retries exhausted"))))
    }
}

/// Map a 4xx response onto the domain taxonomy.
fn client_error(endpoint: &str, status: StatusCode, body: String) -> Error {
    match status {
        StatusCode::NOT_FOUND => Error::NotFound(format!("{endpoint}: {body}")),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Auth(format!("{endpoint} auth failed ({status}): {body}"))
        }
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            Error::Validation(format!("{endpoint} rejected payload: {body}"))
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            Error::Transient(format!("{endpoint} returned {status}: {body}"))
        }
        _ => Error::Other(format!("{endpoint} returned {status}: {body}")),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl BudgetBackend for RestBudgetBackend {
    async fn spend_summary(&self, project: &ProjectId) -> Result<SpendSummaryDto> {
        let url = self.project_url(project, "summary")?;
        let endpoint = format!("GET {}", url.path());
        let resp = self
            .execute_with_retry(&endpoint, || self.http.get(url.clone()))
            .await?;
        Self::parse(&endpoint, resp).await
    }

    async fn settings(&self, project: &ProjectId) -> Result<BudgetSettings> {
        let url = self.project_url(project, "settings")?;
        let endpoint = format!("GET {}", url.path());
        let resp = self
            .execute_with_retry(&endpoint, || self.http.get(url.clone()))
            .await?;
        let dto: BudgetSettingsDto = Self::parse(&endpoint, resp).await?;
        Ok(dto.into())
    }

    async fn update_settings(
        &self,
        project: &ProjectId,
        patch: &BudgetSettingsPatch,
    ) -> Result<BudgetSettings> {
        let url = self.project_url(project, "settings")?;
        let endpoint = format!("PUT {}", url.path());
        let body = SettingsPatchDto::from(patch);
        let resp = self
            .execute_with_retry(&endpoint, || self.http.put(url.clone()).json(&body))
            .await?;
        let dto: BudgetSettingsDto = Self::parse(&endpoint, resp).await?;
        Ok(dto.into())
    }

    async fn health(&self) -> Result<serde_json::Value> {
        let url = self.url("/functions/v1/health");
        let resp = self
            .execute_with_retry("GET /functions/v1/health", || self.http.get(url.clone()))
            .await?;
        Self::parse("GET /functions/v1/health", resp).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Anything that failed in transport (timeout, connect, body read) is
/// transient from the caller's point of view.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Transient(format!("timeout: {e}"))
    } else {
        Error::Transient(e.to_string())
    }
}
