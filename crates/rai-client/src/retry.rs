//! Bounded retry for idempotent compliance API calls.
//!
//! Only requests that are safe to repeat go through [`RetryPolicy::send`]:
//! reads, session patches and deletes. Uploads, analysis starts,
//! re-analysis and overrides are sent exactly once.
//!
//! An attempt is repeated when the request never produced a response
//! (connect failure, timeout, reset) or when a gateway in front of the API
//! answered 502, 503 or 504. Every other status goes back to the caller on
//! the first attempt. A `Retry-After` of whole seconds on a retryable
//! response replaces the computed backoff, capped like any other delay.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};

const BASE_DELAY: Duration = Duration::from_millis(200);
const MAX_DELAY: Duration = Duration::from_secs(5);

/// Gateway statuses that say nothing about the request itself.
pub(crate) fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Attempt budget and backoff schedule for idempotent requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub(crate) fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: BASE_DELAY,
            max_delay: MAX_DELAY,
        }
    }

    #[cfg(test)]
    fn with_delays(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Backoff before retry number `attempt + 1`: doubling from the base
    /// delay, never above the cap.
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn delay_for(&self, attempt: u32, response: Option<&Response>) -> Duration {
        let hinted = response
            .and_then(|r| r.headers().get(RETRY_AFTER))
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        hinted.map_or_else(|| self.backoff(attempt), |d| d.min(self.max_delay))
    }

    /// Send with retries. The last attempt's outcome is returned as is,
    /// including a final 502/503/504 response.
    pub(crate) async fn send<F, Fut>(
        &self,
        endpoint: &str,
        attempt_once: F,
    ) -> Result<Response, reqwest::Error>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
    {
        let mut attempt = 0;
        loop {
            let outcome = attempt_once().await;
            let cause = match &outcome {
                Ok(resp) if is_retryable_status(resp.status()) => {
                    format!("gateway status {}", resp.status().as_u16())
                }
                Ok(_) => return outcome,
                // A request that could not be built fails the same way every time.
                Err(e) if e.is_builder() => return outcome,
                Err(e) => e.to_string(),
            };
            if attempt >= self.max_retries {
                return outcome;
            }
            let delay = self.delay_for(attempt, outcome.as_ref().ok());
            attempt += 1;
            tracing::warn!(
                endpoint,
                attempt,
                max_retries = self.max_retries,
                "compliance API request failed ({cause}); retrying in {delay:?}"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quick(max_retries: u32) -> RetryPolicy {
        RetryPolicy::with_delays(max_retries, Duration::from_millis(1), Duration::from_millis(5))
    }

    async fn get(policy: RetryPolicy, url: String) -> (Result<Response, reqwest::Error>, u32) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(500))
            .build()
            .unwrap();
        let outcome = policy
            .send("/sessions", || {
                counter.fetch_add(1, Ordering::SeqCst);
                client.get(&url).send()
            })
            .await;
        (outcome, calls.load(Ordering::SeqCst))
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = RetryPolicy::new(10);
        assert_eq!(policy.backoff(0), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(800));
        assert_eq!(policy.backoff(8), MAX_DELAY);
        assert_eq!(policy.backoff(40), MAX_DELAY);
    }

    #[test]
    fn only_gateway_statuses_are_retryable() {
        for code in [502, 503, 504] {
            assert!(is_retryable_status(StatusCode::from_u16(code).unwrap()));
        }
        for code in [400, 404, 409, 500, 501] {
            assert!(!is_retryable_status(StatusCode::from_u16(code).unwrap()));
        }
    }

    #[tokio::test]
    async fn unavailable_gateway_is_retried_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let (outcome, calls) = get(quick(3), format!("{}/sessions", server.uri())).await;
        assert_eq!(outcome.unwrap().status(), StatusCode::OK);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn final_gateway_response_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(504))
            .mount(&server)
            .await;

        let (outcome, calls) = get(quick(2), format!("{}/sessions", server.uri())).await;
        assert_eq!(outcome.unwrap().status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let (outcome, calls) = get(quick(3), format!("{}/sessions", server.uri())).await;
        assert_eq!(outcome.unwrap().status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn refused_connection_uses_the_whole_budget() {
        let (outcome, calls) = get(quick(2), "http://127.0.0.1:1/".to_string()).await;
        assert!(outcome.is_err());
        assert_eq!(calls, 3);

        let (_, calls) = get(quick(0), "http://127.0.0.1:1/".to_string()).await;
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn retry_after_hint_is_capped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).insert_header("Retry-After", "120"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let started = std::time::Instant::now();
        let (outcome, calls) = get(quick(1), format!("{}/sessions", server.uri())).await;
        assert_eq!(outcome.unwrap().status(), StatusCode::NO_CONTENT);
        assert_eq!(calls, 2);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
