//! JSON-over-HTTP calls shared by the embedding and generation providers.
//!
//! # Retry Strategy
//!
//! Retries are opt-in (`max_retries`, default `0`). When enabled:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry; timeouts are reported without retrying
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::time::Duration;

use symmetriq_core::error::RagError;

/// Outcome of a failed call, before it is mapped to a service error.
#[derive(Debug)]
pub(crate) enum CallError {
    Timeout,
    Failed(String),
}

impl CallError {
    /// Map to the pipeline taxonomy for `service`.
    pub(crate) fn into_rag(
        self,
        service: &'static str,
        timeout_secs: u64,
        failed: fn(String) -> RagError,
    ) -> RagError {
        match self {
            CallError::Timeout => RagError::Timeout {
                service,
                secs: timeout_secs,
            },
            CallError::Failed(msg) => failed(msg),
        }
    }
}

/// Build the HTTP client for one service.
///
/// `failed` is that service's error constructor, e.g.
/// [`RagError::EmbeddingService`].
pub(crate) fn build_client(
    timeout_secs: u64,
    failed: fn(String) -> RagError,
) -> Result<reqwest::Client, RagError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| client_error(failed, e))
}

fn client_error(failed: fn(String) -> RagError, err: impl std::fmt::Display) -> RagError {
    failed(format!("failed to build HTTP client: {}", err))
}

/// Send the request produced by `request` and decode a JSON body.
///
/// `label` names the remote service in error messages.
pub(crate) async fn post_json<F>(
    request: F,
    max_retries: u32,
    label: &str,
) -> Result<serde_json::Value, CallError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = backoff_delay(attempt);
            tracing::debug!(label, attempt, ?delay, "retrying request");
            tokio::time::sleep(delay).await;
        }

        match request().send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response.json().await.map_err(|e| {
                        CallError::Failed(format!("{} returned invalid JSON: {}", label, e))
                    });
                }

                let body_text = response.text().await.unwrap_or_default();
                let err = CallError::Failed(format!("{} error {}: {}", label, status, body_text));

                // Rate limited or server error: retry
                if status.as_u16() == 429 || status.is_server_error() {
                    tracing::warn!(label, %status, "transient service error");
                    last_err = Some(err);
                    continue;
                }

                return Err(err);
            }
            Err(e) if e.is_timeout() => return Err(CallError::Timeout),
            Err(e) => {
                tracing::warn!(label, error = %e, "request failed");
                last_err = Some(CallError::Failed(format!(
                    "{} connection error: {}",
                    label, e
                )));
            }
        }
    }

    Err(last_err
        .unwrap_or_else(|| CallError::Failed(format!("{} failed after retries", label))))
}

/// Sleep before retry number `attempt` (1-based).
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 << (attempt - 1).min(5))
}

/// Longest a call with `max_retries` can legitimately take: every attempt
/// running to the per-request timeout plus the backoff sleeps between them.
pub(crate) fn call_budget(timeout_secs: u64, max_retries: u32) -> Duration {
    let attempts = Duration::from_secs(timeout_secs) * (max_retries + 1);
    (1..=max_retries).map(backoff_delay).fold(attempts, |total, d| total + d)
}

/// Bearer token from `var`, if set and non-empty.
pub(crate) fn env_token(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_maps_to_timeout() {
        let err = CallError::Timeout.into_rag("embedding", 30, RagError::EmbeddingService);
        assert!(matches!(
            err,
            RagError::Timeout {
                service: "embedding",
                secs: 30
            }
        ));
    }

    #[test]
    fn test_failure_maps_to_service_error() {
        let err = CallError::Failed("boom".into()).into_rag(
            "generation",
            30,
            RagError::GenerationService,
        );
        assert!(matches!(err, RagError::GenerationService(ref m) if m == "boom"));
    }

    #[test]
    fn test_call_budget_covers_backoff() {
        assert_eq!(call_budget(30, 0), Duration::from_secs(30));
        // 3 attempts of 30s plus sleeps of 1s and 2s.
        assert_eq!(call_budget(30, 2), Duration::from_secs(93));
        // Sleeps cap at 32s from the sixth retry on.
        assert_eq!(call_budget(1, 7), Duration::from_secs(8 + 1 + 2 + 4 + 8 + 16 + 32 + 32));
    }

    #[test]
    fn test_client_error_belongs_to_service() {
        let err = client_error(RagError::EmbeddingService, "no TLS backend");
        assert!(matches!(err, RagError::EmbeddingService(ref m) if m.contains("no TLS backend")));
        let err = client_error(RagError::GenerationService, "no TLS backend");
        assert!(matches!(err, RagError::GenerationService(_)));
        assert!(err.is_service_error());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_failure() {
        let client = build_client(5, RagError::EmbeddingService).unwrap();
        // Port 9 on localhost (discard) is almost never listening.
        let result = post_json(|| client.post("http://127.0.0.1:9/"), 0, "test").await;
        assert!(result.is_err());
    }
}
