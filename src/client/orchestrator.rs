//! One outbound exchange with the vision endpoint: build the URL, send,
//! retry on 429 / transport failure, extract the answer.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use url::Url;

use super::request::GenerateContentRequest;
use super::response::{describe_failure, error_message, extract_text, parse_structured};
use super::retry::RetryPolicy;
use super::transport::{HttpTransport, Transport, TransportResponse};
use crate::error::AnalysisError;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Everything the client needs, injected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL; the model path and `:generateContent` are appended.
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// Why the previous attempt is worth repeating.
enum Retryable {
    RateLimited(String),
    Network(String),
}

impl Retryable {
    fn into_error(self, attempts: u32) -> AnalysisError {
        match self {
            Retryable::RateLimited(message) => AnalysisError::RateLimited { attempts, message },
            Retryable::Network(message) => AnalysisError::Network { attempts, message },
        }
    }
}

/// Stateless client for the `generateContent` endpoint.
pub struct GeminiClient<T: Transport = HttpTransport> {
    transport: T,
    config: ClientConfig,
}

impl GeminiClient<HttpTransport> {
    /// Client backed by reqwest with the given per-request timeout.
    pub fn connect(config: ClientConfig, timeout: Duration) -> Result<Self, AnalysisError> {
        let transport = HttpTransport::new(timeout)
            .map_err(|e| AnalysisError::Precondition(e.message))?;
        Ok(Self::new(transport, config))
    }
}

impl<T: Transport> GeminiClient<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn api_key(&self) -> Result<&str, AnalysisError> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AnalysisError::Precondition(
                    "API key is missing. Set AROGYA_API_KEY or run `arogya key set`.".to_string(),
                )
            })
    }

    /// `{endpoint}/{model}:generateContent?key={api_key}`
    pub fn endpoint_url(&self, api_key: &str) -> Result<Url, AnalysisError> {
        let raw = format!(
            "{}/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );
        let mut url = Url::parse(&raw).map_err(|e| {
            AnalysisError::Precondition(format!("Invalid endpoint URL '{}': {}", raw, e))
        })?;
        url.query_pairs_mut().append_pair("key", api_key);
        Ok(url)
    }

    /// Send the request and return the raw body of the first 2xx answer.
    ///
    /// 429 and transport failures are retried per the configured policy;
    /// any other status ends the call immediately.
    pub async fn send(
        &self,
        request: &GenerateContentRequest,
        cancel: &CancellationToken,
    ) -> Result<String, AnalysisError> {
        let api_key = self.api_key()?;
        let url = self.endpoint_url(api_key)?;
        let body = serde_json::to_value(request).map_err(|e| {
            AnalysisError::Precondition(format!("Failed to serialize request: {}", e))
        })?;

        let policy = self.config.retry;
        let max_attempts = policy.attempts();
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled);
            }

            info!(
                "Sending generateContent request to model '{}' (attempt {}/{})",
                self.config.model,
                attempt + 1,
                max_attempts
            );

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("Request cancelled while in flight");
                    return Err(AnalysisError::Cancelled);
                }
                outcome = self.transport.post_json(url.as_str(), &body) => outcome,
            };

            let retryable = match outcome {
                Ok(response) if response.is_success() => {
                    info!("Received HTTP {} from model '{}'", response.status, self.config.model);
                    return Ok(response.body);
                }
                Ok(response) if response.is_rate_limited() => Retryable::RateLimited(
                    error_message(&response.body).unwrap_or_else(|| "Too Many Requests".to_string()),
                ),
                Ok(TransportResponse { status, body }) => {
                    let message = describe_failure(status, &body);
                    error!("HTTP {} from model '{}': {}", status, self.config.model, message);
                    return Err(AnalysisError::Http { status, message });
                }
                Err(e) => Retryable::Network(e.message),
            };

            attempt += 1;
            if attempt >= max_attempts {
                let err = retryable.into_error(attempt);
                error!("Giving up after {} attempt(s): {}", attempt, err);
                return Err(err);
            }

            let delay = policy.backoff(attempt - 1);
            match &retryable {
                Retryable::RateLimited(_) => {
                    warn!("Rate limit hit, retrying in {}ms", delay.as_millis())
                }
                Retryable::Network(message) => {
                    warn!("Fetch error ({}), retrying in {}ms", message, delay.as_millis())
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("Request cancelled during backoff");
                    return Err(AnalysisError::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Free-form text answer, returned exactly as the endpoint produced it.
    pub async fn generate_text(
        &self,
        request: &GenerateContentRequest,
        cancel: &CancellationToken,
    ) -> Result<String, AnalysisError> {
        let body = self.send(request, cancel).await?;
        extract_text(&body)
    }

    /// Answer parsed as `D`. The text field itself carries JSON, so it is
    /// decoded a second time.
    pub async fn generate_structured<D: DeserializeOwned>(
        &self,
        request: &GenerateContentRequest,
        cancel: &CancellationToken,
    ) -> Result<D, AnalysisError> {
        let text = self.generate_text(request, cancel).await?;
        parse_structured(&text)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use serde::Deserialize;
    use tokio::time::Instant;

    use super::*;
    use crate::client::request::Part;
    use crate::client::transport::TransportError;

    type Scripted = Result<TransportResponse, TransportError>;

    /// Plays back a script; the last entry repeats once the script runs out.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Scripted>>,
        last: Mutex<Option<Scripted>>,
        calls: AtomicU32,
        urls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                calls: AtomicU32::new(0),
                urls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Transport for ScriptedTransport {
        async fn post_json(
            &self,
            url: &str,
            _body: &serde_json::Value,
        ) -> Result<TransportResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(url.to_string());
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(item) => {
                    *self.last.lock().unwrap() = Some(item.clone());
                    item
                }
                None => self
                    .last
                    .lock()
                    .unwrap()
                    .clone()
                    .expect("script must not be empty"),
            }
        }
    }

    fn ok_text(text: &str) -> Scripted {
        let body = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": text}]}}]
        });
        Ok(TransportResponse::new(200, body.to_string()))
    }

    fn status(code: u16) -> Scripted {
        Ok(TransportResponse::new(code, ""))
    }

    fn client(script: Vec<Scripted>, max_attempts: u32) -> GeminiClient<ScriptedTransport> {
        GeminiClient::new(
            ScriptedTransport::new(script),
            ClientConfig {
                api_key: Some("test-key".to_string()),
                retry: RetryPolicy::with_max_attempts(max_attempts),
                ..ClientConfig::default()
            },
        )
    }

    fn prompt() -> GenerateContentRequest {
        GenerateContentRequest::single_turn(vec![Part::text("hello")])
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_rate_limited_makes_exactly_n_attempts() {
        for n in 1..=5u32 {
            let client = client(vec![status(429)], n);
            let result = client.generate_text(&prompt(), &CancellationToken::new()).await;
            assert_eq!(client.transport().calls(), n, "max_attempts = {}", n);
            match result {
                Err(AnalysisError::RateLimited { attempts, .. }) => assert_eq!(attempts, n),
                other => panic!("expected RateLimited, got {:?}", other),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_rate_limits_then_success() {
        let client = client(vec![status(429), status(429), ok_text("Healthy Skin")], 3);
        let start = Instant::now();
        let text = client
            .generate_text(&prompt(), &CancellationToken::new())
            .await
            .unwrap();
        let waited = start.elapsed();

        assert_eq!(text, "Healthy Skin");
        assert_eq!(client.transport().calls(), 3);
        // Two waits: [1s, 2s) and [2s, 3s).
        assert!(waited >= Duration::from_millis(3000), "waited {:?}", waited);
        assert!(waited < Duration::from_millis(5000), "waited {:?}", waited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_errors_are_never_retried() {
        for code in [400u16, 403, 404, 500] {
            let client = client(vec![status(code)], 5);
            let result = client.generate_text(&prompt(), &CancellationToken::new()).await;
            assert_eq!(client.transport().calls(), 1, "status {}", code);
            match result {
                Err(AnalysisError::Http { status, .. }) => assert_eq!(status, code),
                other => panic!("expected Http error, got {:?}", other),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_http_error_carries_server_message() {
        let body = r#"{"error":{"code":403,"message":"Permission denied","status":"PERMISSION_DENIED"}}"#;
        let client = client(vec![Ok(TransportResponse::new(403, body))], 3);
        let err = client
            .generate_text(&prompt(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::Http {
                status: 403,
                message: "Permission denied".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_error_retried_then_reported() {
        let client = client(vec![Err(TransportError::new("connection reset"))], 3);
        let err = client
            .generate_text(&prompt(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(client.transport().calls(), 3);
        assert_eq!(
            err,
            AnalysisError::Network {
                attempts: 3,
                message: "connection reset".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_error_then_success() {
        let client = client(
            vec![Err(TransportError::new("dns failure")), ok_text("Mild redness")],
            3,
        );
        let text = client
            .generate_text(&prompt(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "Mild redness");
        assert_eq!(client.transport().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mixed_failures_report_the_last_one() {
        let rate_limited_last = client(
            vec![Err(TransportError::new("connection reset")), status(429)],
            3,
        );
        let err = rate_limited_last
            .generate_text(&prompt(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(rate_limited_last.transport().calls(), 3);
        assert!(
            matches!(err, AnalysisError::RateLimited { attempts: 3, .. }),
            "got {:?}",
            err
        );

        let network_last = client(
            vec![status(429), status(429), Err(TransportError::new("dns failure"))],
            3,
        );
        let err = network_last
            .generate_text(&prompt(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(network_last.transport().calls(), 3);
        assert_eq!(
            err,
            AnalysisError::Network {
                attempts: 3,
                message: "dns failure".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_response_is_not_retried() {
        let client = client(vec![Ok(TransportResponse::new(200, r#"{"candidates":[]}"#))], 5);
        let err = client
            .generate_text(&prompt(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, AnalysisError::EmptyResponse);
        assert_eq!(client.transport().calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_api_key_makes_no_call() {
        for key in [None, Some("   ".to_string())] {
            let client = GeminiClient::new(
                ScriptedTransport::new(vec![ok_text("unused")]),
                ClientConfig {
                    api_key: key,
                    ..ClientConfig::default()
                },
            );
            let err = client
                .generate_text(&prompt(), &CancellationToken::new())
                .await
                .unwrap_err();
            assert!(matches!(err, AnalysisError::Precondition(_)));
            assert_eq!(client.transport().calls(), 0);
        }
    }

    #[derive(Debug, Deserialize)]
    struct Label {
        label: String,
    }

    #[tokio::test]
    async fn test_structured_mode_parses_text_twice() {
        let client = client(vec![ok_text(r#"{"label":"Acne"}"#)], 3);
        let label: Label = client
            .generate_structured(&prompt(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(label.label, "Acne");
    }

    #[tokio::test]
    async fn test_structured_mode_invalid_json_is_malformed() {
        let client = client(vec![ok_text("not { json")], 3);
        let err = client
            .generate_structured::<Label>(&prompt(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedStructuredResponse { .. }));
        assert_eq!(client.transport().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_stops_retrying() {
        let client = client(vec![status(429)], 5);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let err = client.generate_text(&prompt(), &cancel).await.unwrap_err();
        assert_eq!(err, AnalysisError::Cancelled);
        assert_eq!(client.transport().calls(), 1);
    }

    #[tokio::test]
    async fn test_already_cancelled_makes_no_call() {
        let client = client(vec![ok_text("unused")], 3);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client.generate_text(&prompt(), &cancel).await.unwrap_err();
        assert_eq!(err, AnalysisError::Cancelled);
        assert_eq!(client.transport().calls(), 0);
    }

    #[tokio::test]
    async fn test_endpoint_url_carries_model_and_encoded_key() {
        let client = GeminiClient::new(
            ScriptedTransport::new(vec![ok_text("ok")]),
            ClientConfig {
                endpoint: "https://example.test/v1beta/models/".to_string(),
                model: "gemini-test".to_string(),
                api_key: Some("a b&c".to_string()),
                retry: RetryPolicy::default(),
            },
        );
        client
            .generate_text(&prompt(), &CancellationToken::new())
            .await
            .unwrap();
        let urls = client.transport().urls.lock().unwrap().clone();
        assert_eq!(
            urls,
            vec!["https://example.test/v1beta/models/gemini-test:generateContent?key=a+b%26c".to_string()]
        );
    }

    #[test]
    fn test_invalid_endpoint_is_precondition_failure() {
        let client = GeminiClient::new(
            ScriptedTransport::new(vec![ok_text("unused")]),
            ClientConfig {
                endpoint: "not a url".to_string(),
                ..ClientConfig::default()
            },
        );
        assert!(matches!(
            client.endpoint_url("k"),
            Err(AnalysisError::Precondition(_))
        ));
    }
}
