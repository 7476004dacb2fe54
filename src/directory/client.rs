// src/directory/client.rs - Retrying client for the external institutions directory
use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use log::{debug, error, warn};
use serde_json::Value;
use std::time::Duration;
use url::form_urlencoded;

use crate::directory::transport::HttpTransport;
use crate::models::InstitutionRecord;
use crate::utils::config::DirectoryConfig;

/// Anything that can turn a name into the directory's best candidate.
#[async_trait]
pub trait DirectoryLookup: Send + Sync {
    /// Best candidate for `name`, or None. Never fails: transport problems
    /// are absorbed and reported as a miss.
    async fn search(&self, name: &str) -> Option<InstitutionRecord>;
}

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub struct DirectoryClient<T: HttpTransport> {
    transport: T,
    config: DirectoryConfig,
    rate_limiter: Option<DirectRateLimiter>,
}

impl<T: HttpTransport> DirectoryClient<T> {
    pub fn new(transport: T, config: DirectoryConfig) -> Self {
        let rate_limiter = config
            .rate_limit_per_sec
            .map(|limit| RateLimiter::direct(Quota::per_second(limit)));
        Self {
            transport,
            config,
            rate_limiter,
        }
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// GET `url` with the configured retry budget. Every failure (status,
    /// network, decode, timeout) is retried; an exhausted budget is a miss.
    pub async fn call_api(&self, url: &str) -> Option<Value> {
        let policy = &self.config.retry;
        let total_attempts = policy.total_attempts();
        debug!("calling API: {}", url);

        for attempt in 0..=policy.max_retries {
            if !policy.pre_call_delay.is_zero() {
                tokio::time::sleep(policy.pre_call_delay).await;
            }
            if let Some(limiter) = &self.rate_limiter {
                limiter.until_ready().await;
            }

            match tokio::time::timeout(policy.timeout, self.transport.get_json(url)).await {
                Ok(Ok(body)) => return Some(body),
                Ok(Err(e)) => warn!(
                    "Request error on attempt {}/{}: {:#} for {}",
                    attempt + 1,
                    total_attempts,
                    e,
                    url
                ),
                Err(_) => warn!(
                    "Request timed out after {:?} on attempt {}/{} for {}",
                    policy.timeout,
                    attempt + 1,
                    total_attempts,
                    url
                ),
            }

            if attempt == policy.max_retries {
                break;
            }
            let delay = policy.backoff_delay(attempt);
            warn!("retrying in {:?}", delay);
            tokio::time::sleep(delay).await;
        }

        error!("API call failed in {} attempts for {}", total_attempts, url);
        None
    }

    fn endpoints(&self) -> [&str; 2] {
        [
            self.config.search_endpoint.as_str(),
            self.config.specific_search_endpoint.as_str(),
        ]
    }
}

#[async_trait]
impl<T: HttpTransport> DirectoryLookup for DirectoryClient<T> {
    async fn search(&self, name: &str) -> Option<InstitutionRecord> {
        let encoded = encode_query_value(name);
        for endpoint in self.endpoints() {
            let url = format!("{}{}", endpoint, encoded);
            if let Some(body) = self.call_api(&url).await {
                if let Some(record) = top_candidate(&body, &url) {
                    return Some(record);
                }
            }
        }
        None
    }
}

/// Percent-encodes a name for appending to an endpoint's query string.
pub fn encode_query_value(name: &str) -> String {
    form_urlencoded::byte_serialize(name.trim().as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// First entry of the `results` array. A missing or empty array is a miss.
fn top_candidate(body: &Value, url: &str) -> Option<InstitutionRecord> {
    let first = match body.get("results").and_then(Value::as_array) {
        Some(results) if !results.is_empty() => &results[0],
        _ => {
            debug!("No results for {}", url);
            return None;
        }
    };
    match serde_json::from_value::<InstitutionRecord>(first.clone()) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Unusable top candidate from {}: {}", url, e);
            None
        }
    }
}

/// Lower bound on how long a call that always fails takes to give up.
pub fn minimum_exhaustion_time(config: &DirectoryConfig) -> Duration {
    let attempts = config.retry.total_attempts();
    config
        .retry
        .total_backoff()
        .saturating_add(config.retry.pre_call_delay.saturating_mul(attempts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::RetryPolicy;
    use anyhow::{anyhow, Result};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::num::NonZeroU32;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    /// Replays canned responses in order; fails once the script runs out.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<Value>>>,
        urls: Mutex<Vec<String>>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<Value>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                urls: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn always_failing() -> Self {
            Self::new(Vec::new())
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn get_json(&self, url: &str) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(url.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("503 Service Unavailable")))
        }
    }

    fn fast_config(max_retries: u32, backoff_ms: u64) -> DirectoryConfig {
        DirectoryConfig {
            search_endpoint: "http://dir.test/institutions?search=".to_string(),
            specific_search_endpoint: "http://dir.test/institutions?filter=display_name.search:"
                .to_string(),
            retry: RetryPolicy {
                max_retries,
                timeout: Duration::from_secs(1),
                backoff_base: Duration::from_millis(backoff_ms),
                pre_call_delay: Duration::ZERO,
            },
            rate_limit_per_sec: None,
        }
    }

    fn mit_body() -> Value {
        json!({"results": [
            {"id": "https://openalex.org/I63966007", "display_name": "Massachusetts Institute of Technology"},
            {"id": "https://openalex.org/I2", "display_name": "Other"}
        ]})
    }

    #[tokio::test]
    async fn test_call_api_exhausts_budget_then_misses() {
        let client = DirectoryClient::new(ScriptedTransport::always_failing(), fast_config(3, 5));
        let start = Instant::now();

        let result = client.call_api("http://dir.test/x").await;

        assert!(result.is_none());
        assert_eq!(client.transport.calls.load(Ordering::SeqCst), 4);
        // 5 + 10 + 20 ms of backoff
        assert!(start.elapsed() >= Duration::from_millis(35));
        assert_eq!(minimum_exhaustion_time(client.config()), Duration::from_millis(35));
    }

    #[tokio::test]
    async fn test_call_api_recovers_within_budget() {
        let transport = ScriptedTransport::new(vec![
            Err(anyhow!("connection reset")),
            Err(anyhow!("500 Internal Server Error")),
            Ok(mit_body()),
        ]);
        let client = DirectoryClient::new(transport, fast_config(4, 1));

        let body = client.call_api("http://dir.test/x").await.unwrap();
        assert_eq!(body["results"][0]["display_name"], "Massachusetts Institute of Technology");
        assert_eq!(client.transport.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_slow_response_counts_as_failed_attempt() {
        let mut transport = ScriptedTransport::new(vec![Ok(mit_body())]);
        transport.delay = Duration::from_millis(500);
        let mut config = fast_config(0, 1);
        config.retry.timeout = Duration::from_millis(20);
        let client = DirectoryClient::new(transport, config);

        let start = Instant::now();
        assert!(client.call_api("http://dir.test/x").await.is_none());
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_attempts() {
        let mut config = fast_config(2, 1);
        config.rate_limit_per_sec = NonZeroU32::new(2);
        let client = DirectoryClient::new(ScriptedTransport::always_failing(), config);
        assert!(client.rate_limiter.is_some());

        let start = Instant::now();
        assert!(client.call_api("http://dir.test/x").await.is_none());

        assert_eq!(client.transport.calls.load(Ordering::SeqCst), 3);
        // burst of 2, then the third attempt waits for the next 500 ms cell
        assert!(start.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_search_returns_top_candidate_from_broad_endpoint() {
        let client = DirectoryClient::new(ScriptedTransport::new(vec![Ok(mit_body())]), fast_config(0, 1));

        let record = client.search("MIT").await.unwrap();
        assert_eq!(record.display_name, "Massachusetts Institute of Technology");

        let urls = client.transport.urls.lock().unwrap().clone();
        assert_eq!(urls, vec!["http://dir.test/institutions?search=MIT".to_string()]);
    }

    #[tokio::test]
    async fn test_search_falls_back_to_field_endpoint_on_empty_results() {
        let transport = ScriptedTransport::new(vec![Ok(json!({"results": []})), Ok(mit_body())]);
        let client = DirectoryClient::new(transport, fast_config(0, 1));

        let record = client.search("Mass Inst of Tech").await.unwrap();
        assert_eq!(record.id.as_deref(), Some("https://openalex.org/I63966007"));

        let urls = client.transport.urls.lock().unwrap().clone();
        assert_eq!(
            urls[1],
            "http://dir.test/institutions?filter=display_name.search:Mass%20Inst%20of%20Tech"
        );
    }

    #[tokio::test]
    async fn test_search_misses_when_both_endpoints_fail() {
        let client = DirectoryClient::new(ScriptedTransport::always_failing(), fast_config(1, 1));

        assert!(client.search("Nowhere U").await.is_none());
        assert_eq!(client.transport.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_missing_results_key_is_a_miss_not_a_retry() {
        let transport = ScriptedTransport::new(vec![Ok(json!({"meta": {}})), Ok(json!({"results": "bad"}))]);
        let client = DirectoryClient::new(transport, fast_config(3, 1));

        assert!(client.search("Nowhere U").await.is_none());
        assert_eq!(client.transport.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_encode_query_value() {
        assert_eq!(encode_query_value("Texas A&M"), "Texas%20A%26M");
        assert_eq!(encode_query_value(" C++ Univ "), "C%2B%2B%20Univ");
        assert_eq!(encode_query_value("Université"), "Universit%C3%A9");
    }
}
