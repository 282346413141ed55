//! USDA FoodData Central client
//!
//! Implements [`IngredientStore`] over the FDC REST API. Every request goes
//! through [`call_with_retry`], so rate limits, 5xx answers, timeouts and
//! connection failures are retried and then surfaced as [`UpstreamError`].

pub mod models;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::build_info::BuildStamp;
use crate::error::{CalcResult, UpstreamError, UpstreamKind, ValidationError};
use crate::models::{FoodRecord, FoodSummary};
use crate::store::IngredientStore;
use crate::upstream::{call_with_retry, parse_retry_after, AttemptError, RetryPolicy};

pub use models::{FdcFood, FdcSearchFood, FdcSearchResponse};

pub const SERVICE: &str = "FoodData Central";
pub const DEFAULT_BASE_URL: &str = "https://api.nal.usda.gov/fdc/v1";
/// FDC caps `pageSize` at 200
const MAX_PAGE_SIZE: usize = 200;

/// FoodData Central API client
#[derive(Clone)]
pub struct FdcClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl FdcClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, retry: RetryPolicy) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(BuildStamp::current().user_agent())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            retry,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` and decode the body; a 404 is `Ok(None)`
    async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> Result<Option<T>, UpstreamError>
    where
        T: DeserializeOwned + Send,
    {
        let url = format!("{}/{}", self.base_url, path);
        debug!("GET {}", url);

        call_with_retry(&self.retry, SERVICE, || {
            let request = self
                .client
                .get(&url)
                .query(query)
                .query(&[("api_key", self.api_key.as_str())]);
            async move {
                let response = request.send().await.map_err(transport_error)?;
                let status = response.status();

                if status == StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                if !status.is_success() {
                    let retry_after = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| parse_retry_after(v, Utc::now()));
                    let body = response.text().await.unwrap_or_default();
                    return Err(status_error(status, &body).with_retry_after(retry_after));
                }

                response
                    .json::<T>()
                    .await
                    .map(Some)
                    .map_err(|e| AttemptError::new(UpstreamKind::Protocol, format!("invalid JSON: {}", e)))
            }
        })
        .await
    }
}

fn transport_error(e: reqwest::Error) -> AttemptError {
    if e.is_timeout() {
        AttemptError::new(UpstreamKind::Timeout, e.to_string())
    } else {
        AttemptError::new(UpstreamKind::Network, e.to_string())
    }
}

/// Classify a non-success, non-404 status
fn status_error(status: StatusCode, body: &str) -> AttemptError {
    let kind = if status == StatusCode::TOO_MANY_REQUESTS {
        UpstreamKind::RateLimited
    } else if status.is_server_error() {
        UpstreamKind::ServerError(status.as_u16())
    } else {
        UpstreamKind::Protocol
    };
    let snippet: String = body.chars().take(200).collect();
    AttemptError::new(kind, format!("HTTP {}: {}", status.as_u16(), snippet))
}

#[async_trait]
impl IngredientStore for FdcClient {
    async fn search(&self, query: &str, limit: usize) -> CalcResult<Vec<FoodSummary>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ValidationError::Other("search query is empty".to_string()).into());
        }
        let page_size = limit.clamp(1, MAX_PAGE_SIZE);

        let response: Option<FdcSearchResponse> = self
            .get_json(
                "foods/search",
                &[("query", query.to_string()), ("pageSize", page_size.to_string())],
            )
            .await?;

        let foods: Vec<FoodSummary> = response
            .map(|r| r.foods)
            .unwrap_or_default()
            .into_iter()
            .take(page_size)
            .map(FoodSummary::from)
            .collect();
        info!("FDC search '{}' returned {} foods", query, foods.len());
        Ok(foods)
    }

    async fn get_by_id(&self, fdc_id: i64) -> CalcResult<Option<FoodRecord>> {
        let food: Option<FdcFood> = self.get_json(&format!("food/{}", fdc_id), &[]).await?;
        let record = food.map(FdcFood::into_record);
        match &record {
            Some(r) if !r.missing.is_empty() => info!(
                "FDC food #{} lacks {} required nutrient(s)",
                fdc_id,
                r.missing.len()
            ),
            Some(_) => debug!("FDC food #{} loaded", fdc_id),
            None => info!("FDC food #{} not found", fdc_id),
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "").kind,
            UpstreamKind::RateLimited
        );
        assert_eq!(
            status_error(StatusCode::BAD_GATEWAY, "").kind,
            UpstreamKind::ServerError(502)
        );
        let forbidden = status_error(StatusCode::FORBIDDEN, "API_KEY_INVALID");
        assert_eq!(forbidden.kind, UpstreamKind::Protocol);
        assert!(forbidden.message.contains("403"));
        assert!(forbidden.message.contains("API_KEY_INVALID"));
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let client = FdcClient::new("https://example.test/fdc/v1/", "key", RetryPolicy::default());
        assert_eq!(client.base_url(), "https://example.test/fdc/v1");
    }

    #[tokio::test]
    async fn test_empty_search_is_rejected_locally() {
        let client = FdcClient::new("http://127.0.0.1:9", "key", RetryPolicy::default());
        let err = client.search("   ", 10).await.unwrap_err();
        assert!(matches!(err, crate::error::CalcError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let policy = RetryPolicy {
            max_attempts: 2,
            initial_backoff: std::time::Duration::from_millis(1),
            ..Default::default()
        };
        // Port 9 (discard) is closed on test hosts
        let client = FdcClient::new("http://127.0.0.1:9", "key", policy);
        let err = client.get_by_id(1).await.unwrap_err();
        match err {
            crate::error::CalcError::Upstream(e) => {
                assert!(e.is_retryable());
                assert_eq!(e.attempts, 2);
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }
}
