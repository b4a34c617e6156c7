use super::traits::{GatewayApi, Sleeper, TokioSleeper};
use super::types::{Created, Envelope, NewList, NewPolicy, RemoteList, RemotePolicy};
use crate::config::{Config, RetryConfig};
use crate::error::{SyncError, SyncResult};
use crate::USER_AGENT;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Retry, backoff and pacing knobs for [`GatewayClient`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_factor: Duration,
    /// Pause after each successful mutating call and between pages.
    pub api_delay: Duration,
    pub page_size: u32,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            backoff_factor: Duration::from_secs(config.backoff_factor_secs),
            api_delay: Duration::from_millis(config.api_delay_ms),
            page_size: config.page_size.max(1),
        }
    }

    /// `backoff_factor * 2^(attempt-1)` for a 1-based attempt number.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.backoff_factor.saturating_mul(1u32 << exp)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Authenticated, retrying client for the account-scoped gateway API.
pub struct GatewayClient {
    http: Client,
    base_url: String,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl GatewayClient {
    pub fn new(
        base_url: impl Into<String>,
        api_token: &str,
        timeout: Duration,
        policy: RetryPolicy,
    ) -> SyncResult<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_token))
            .map_err(|_| SyncError::Config("API token contains invalid characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            policy,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    pub fn from_config(config: &Config) -> SyncResult<Self> {
        Self::new(
            config.gateway_base_url(),
            &config.api.api_token,
            config.request_timeout(),
            RetryPolicy::from_config(&config.retry),
        )
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends one request, retrying connection errors, 5xx and 429.
    ///
    /// Any other response, successful or not, is returned as-is; use
    /// [`GatewayClient::check_response`] to unwrap it.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> SyncResult<Response> {
        let url = self.url(path);
        let attempts = self.policy.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let mut builder = self.http.request(method.clone(), &url);
            if let Some(body) = body {
                builder = builder.json(body);
            }

            let failure = match builder.send().await {
                Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => {
                    SyncError::RateLimited {
                        retry_after: parse_retry_after(resp.headers()),
                    }
                }
                Ok(resp) if resp.status().is_server_error() => {
                    SyncError::Transient(format!("server error {}", resp.status()))
                }
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    let e = SyncError::from(e);
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    e
                }
            };

            last_error = failure.to_string();
            if attempt == attempts {
                break;
            }

            let delay = match failure {
                SyncError::RateLimited {
                    retry_after: Some(after),
                } => after,
                _ => self.policy.backoff(attempt),
            };
            warn!(
                method = %method,
                path,
                attempt,
                delay_secs = delay.as_secs_f64(),
                "{}. Retry {}/{} in {:?}",
                last_error,
                attempt,
                attempts,
                delay
            );
            self.sleeper.sleep(delay).await;
        }

        error!("All retries exhausted for {} {}", method, path);
        Err(SyncError::RetriesExhausted {
            method: method.to_string(),
            path: path.to_string(),
            attempts,
            last_error,
        })
    }

    /// Turns a response into its envelope, failing on non-2xx or `success: false`.
    pub async fn check_response<T: DeserializeOwned>(
        response: Response,
        action: &str,
    ) -> SyncResult<Envelope<T>> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!("Error {}: {} - {}", action, status, text);
            return Err(SyncError::Api {
                action: action.to_string(),
                status: status.as_u16(),
                message: text,
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&text).map_err(|e| SyncError::Decode {
                action: action.to_string(),
                reason: e.to_string(),
            })?;

        if !envelope.success {
            let message = if envelope.errors.is_empty() {
                "success=false".to_string()
            } else {
                envelope
                    .errors
                    .iter()
                    .map(|e| format!("[{}] {}", e.code, e.message))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            error!("API success false during {}: {}", action, message);
            return Err(SyncError::Api {
                action: action.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        Ok(envelope)
    }

    /// Collects every item of a paginated collection, in page order.
    pub async fn paginate<T: DeserializeOwned>(&self, path: &str) -> SyncResult<Vec<T>> {
        let page_size = u64::from(self.policy.page_size);
        let mut items = Vec::new();
        let mut page: u64 = 1;

        loop {
            let page_path = format!("{}?per_page={}&page={}", path, page_size, page);
            let response = self.request(Method::GET, &page_path, None).await?;
            let envelope: Envelope<Vec<T>> =
                Self::check_response(response, &format!("getting {} page {}", path, page))
                    .await?;

            let batch = envelope.result.unwrap_or_default();
            if batch.is_empty() {
                break;
            }
            items.extend(batch);

            let total = envelope
                .result_info
                .and_then(|info| info.total_count)
                .ok_or_else(|| SyncError::Pagination {
                    path: path.to_string(),
                    reason: format!("page {} has items but no total_count", page),
                })?;
            let per_page = envelope
                .result_info
                .and_then(|info| info.per_page)
                .filter(|p| *p > 0)
                .unwrap_or(page_size);

            if page.saturating_mul(per_page) >= total {
                break;
            }
            page += 1;
            self.sleeper.sleep(self.policy.api_delay).await;
        }

        info!(
            "Fetched {} items from {} ({} page(s))",
            items.len(),
            path,
            page
        );
        Ok(items)
    }

    /// POSTs `payload` and returns the id of the created object.
    pub async fn create<P: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &P,
        action: &str,
    ) -> SyncResult<String> {
        let body = serde_json::to_value(payload)?;
        let response = self.request(Method::POST, path, Some(&body)).await?;
        let envelope: Envelope<Created> = Self::check_response(response, action).await?;
        let created = envelope.result.ok_or_else(|| SyncError::Decode {
            action: action.to_string(),
            reason: "response has no result".to_string(),
        })?;
        debug!(id = %created.id, "{} succeeded", action);
        self.sleeper.sleep(self.policy.api_delay).await;
        Ok(created.id)
    }

    pub async fn delete(&self, path: &str, action: &str) -> SyncResult<()> {
        let response = self.request(Method::DELETE, path, None).await?;
        Self::check_response::<serde_json::Value>(response, action).await?;
        self.sleeper.sleep(self.policy.api_delay).await;
        Ok(())
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait::async_trait]
impl GatewayApi for GatewayClient {
    async fn list_lists(&self) -> SyncResult<Vec<RemoteList>> {
        self.paginate("/lists").await
    }

    async fn list_policies(&self) -> SyncResult<Vec<RemotePolicy>> {
        self.paginate("/rules").await
    }

    async fn create_list(&self, list: &NewList) -> SyncResult<String> {
        self.create("/lists", list, &format!("creating list {}", list.name))
            .await
    }

    async fn delete_list(&self, id: &str) -> SyncResult<()> {
        self.delete(&format!("/lists/{}", id), &format!("deleting list {}", id))
            .await
    }

    async fn create_policy(&self, policy: &NewPolicy) -> SyncResult<String> {
        self.create("/rules", policy, &format!("creating policy {}", policy.name))
            .await
    }

    async fn delete_policy(&self, id: &str) -> SyncResult<()> {
        self.delete(&format!("/rules/{}", id), &format!("deleting policy {}", id))
            .await
    }
}
