//! HTTP pipeline for Azure Resource Manager.
//!
//! [`ArmClient`] owns the HTTP connection pool, the credential and the retry
//! policy. Operation modules build a [`Request`] and hand it to
//! [`ArmClient::send`], then decode the [`RawResponse`] themselves.
//!
//! # Examples
//!
//! ```rust,no_run
//! use azure_arm_core::auth::ArmCredential;
//! use azure_arm_core::client::ArmClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ArmClient::builder()
//!     .credential(ArmCredential::access_token("eyJ0eXAi..."))
//!     .build()?;
//! assert_eq!(client.scope(), "https://management.azure.com/.default");
//! # Ok(())
//! # }
//! ```
//!
//! Data-plane services reuse the same pipeline with their own endpoint and
//! scope:
//!
//! ```rust,no_run
//! use azure_arm_core::auth::ArmCredential;
//! use azure_arm_core::client::ArmClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ArmClient::builder()
//!     .endpoint("https://myvault.vault.azure.net")
//!     .scope("https://vault.azure.net/.default")
//!     .credential(ArmCredential::from_env()?)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::auth::ArmCredential;
use crate::error::{ArmError, ArmResult};
use crate::request::{join_path, Request};
use crate::response::RawResponse;
use reqwest::header::AUTHORIZATION;
use reqwest::Client as HttpClient;
use url::Url;

use std::time::Duration;

/// Public-cloud Resource Manager endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// Environment variable overriding the Resource Manager endpoint.
pub const ENV_RESOURCE_MANAGER_ENDPOINT: &str = "AZURE_RESOURCE_MANAGER_ENDPOINT";

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default read/response timeout (60 seconds).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Determines if an HTTP status code represents a retriable error.
///
/// Retriable errors are transient server-side issues that may succeed on retry:
/// - 429 Too Many Requests (throttling)
/// - 500 Internal Server Error
/// - 502 Bad Gateway
/// - 503 Service Unavailable
/// - 504 Gateway Timeout
#[inline]
pub fn is_retriable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Configuration for automatic retry behavior on transient errors.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not counting the initial request).
    pub max_retries: u32,
    /// Initial backoff duration before the first retry.
    /// Subsequent retries use exponential backoff (2^attempt * initial_backoff).
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// A policy that sends each request exactly once.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
        }
    }

    /// Backoff before retry number `attempt` (zero-based), with ±25% jitter.
    fn backoff(&self, attempt: u32) -> Duration {
        let base_backoff = self.initial_backoff * 2_u32.saturating_pow(attempt);
        let jitter = 0.75 + fastrand::f64() * 0.5;
        base_backoff.mul_f64(jitter)
    }
}

/// The pipeline client shared by every ARM and data-plane operation.
///
/// The client is cheaply cloneable and can be shared across threads.
#[derive(Debug, Clone)]
pub struct ArmClient {
    pub(crate) http: HttpClient,
    pub(crate) endpoint: Url,
    pub(crate) credential: ArmCredential,
    pub(crate) scope: String,
    pub(crate) retry_policy: RetryPolicy,
}

/// Builder for constructing an [`ArmClient`].
///
/// Use [`ArmClient::builder()`] to create a new builder.
#[derive(Debug, Default)]
pub struct ArmClientBuilder {
    endpoint: Option<String>,
    credential: Option<ArmCredential>,
    scope: Option<String>,
    http_client: Option<HttpClient>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
}

impl ArmClient {
    /// Create a new builder for configuring an `ArmClient`.
    pub fn builder() -> ArmClientBuilder {
        ArmClientBuilder::default()
    }

    /// Get the base endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Get the token scope requested for every call.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Get the retry policy configuration.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Build a full URL for an API path below the endpoint.
    pub fn url(&self, path: &str) -> ArmResult<Url> {
        join_path(&self.endpoint, path)
    }

    /// Send a request and buffer the response.
    ///
    /// Adds the `Authorization` header and retries on retriable statuses
    /// (429, 500, 502, 503, 504) with jittered exponential backoff. The
    /// final response is returned whatever its status; callers check it
    /// against their own allow-list with [`crate::response::decode`].
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Auth`] if no token can be acquired and
    /// [`ArmError::Transport`] on connection failures or timeouts.
    ///
    /// # Tracing
    ///
    /// Emits a span named `arm::client::send` with fields `method` and `path`.
    #[tracing::instrument(
        name = "arm::client::send",
        skip(self, request),
        fields(method = %request.method(), path = %request.url().path())
    )]
    pub async fn send(&self, request: &Request) -> ArmResult<RawResponse> {
        let auth = self.credential.resolve(&self.scope).await?;

        let mut attempt = 0;
        loop {
            let mut builder = self
                .http
                .request(request.method().to_reqwest(), request.url().clone())
                .headers(request.headers().clone())
                .header(AUTHORIZATION, &auth);
            if let Some(body) = request.body() {
                builder = builder.body(body.clone());
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();

            if !is_retriable_status(status) || attempt >= self.retry_policy.max_retries {
                tracing::debug!(status, attempt, "response received");
                return RawResponse::from_reqwest(request.method(), request.url().clone(), response)
                    .await;
            }

            let backoff = self.retry_policy.backoff(attempt);
            tracing::warn!(
                status,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                "transient failure, retrying"
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }
}

impl ArmClientBuilder {
    /// Set the service endpoint.
    ///
    /// If not set, the builder checks `AZURE_RESOURCE_MANAGER_ENDPOINT` and
    /// falls back to [`DEFAULT_ENDPOINT`].
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the credential to use for authentication.
    ///
    /// If not set, the builder will use [`ArmCredential::from_env()`].
    pub fn credential(mut self, credential: ArmCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Set the token scope.
    ///
    /// Defaults to `<endpoint>/.default`.
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set a custom HTTP client.
    ///
    /// **Note:** If you provide a custom HTTP client, any timeout configuration
    /// via [`connect_timeout`](Self::connect_timeout) or
    /// [`read_timeout`](Self::read_timeout) will be ignored.
    pub fn http_client(mut self, client: HttpClient) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the read timeout.
    ///
    /// Covers the entire request/response cycle including reading the body.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the retry policy for transient errors.
    ///
    /// Defaults to 3 retries with 500ms initial backoff.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Build the `ArmClient`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The endpoint URL is invalid
    /// - No credential is given and none can be read from the environment
    /// - The HTTP client cannot be constructed
    pub fn build(self) -> ArmResult<ArmClient> {
        let http = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .connect_timeout(self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT))
                .timeout(self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT))
                .build()?,
        };

        let endpoint_str = self
            .endpoint
            .or_else(|| {
                std::env::var(ENV_RESOURCE_MANAGER_ENDPOINT)
                    .ok()
                    .filter(|v| !v.is_empty())
            })
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let endpoint = Url::parse(&endpoint_str)
            .map_err(|e| ArmError::invalid_endpoint_with_source("invalid endpoint URL", e))?;
        if endpoint.cannot_be_a_base() {
            return Err(ArmError::InvalidEndpoint {
                message: format!("{endpoint_str} cannot be used as a base URL"),
                source: None,
            });
        }

        let scope = self.scope.unwrap_or_else(|| {
            format!("{}/.default", endpoint.as_str().trim_end_matches('/'))
        });

        let credential = match self.credential {
            Some(credential) => credential,
            None => ArmCredential::from_env()?,
        };

        Ok(ArmClient {
            http,
            endpoint,
            credential,
            scope,
            retry_policy: self.retry_policy.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{HttpMethod, OperationDescriptor, RequestBuilder};
    use serial_test::serial;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PUT_THING: OperationDescriptor = OperationDescriptor {
        name: "ThingsClient.CreateOrUpdate",
        method: HttpMethod::Put,
        path: "/things/{thingName}",
        api_version: "2021-06-01",
        status_codes: &[200, 201],
    };

    fn fast_retries() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_millis(10),
        }
    }

    async fn setup_mock_client(server: &MockServer) -> ArmClient {
        ArmClient::builder()
            .endpoint(server.uri())
            .credential(ArmCredential::access_token("test-token"))
            .retry_policy(fast_retries())
            .build()
            .expect("should build client")
    }

    // -----------------------------------------------------------------------
    // Builder
    // -----------------------------------------------------------------------

    #[test]
    #[serial]
    fn builder_defaults_to_public_cloud() {
        std::env::remove_var(ENV_RESOURCE_MANAGER_ENDPOINT);

        let client = ArmClient::builder()
            .credential(ArmCredential::access_token("test"))
            .build()
            .expect("should build");

        assert_eq!(client.endpoint().as_str(), "https://management.azure.com/");
        assert_eq!(client.scope(), "https://management.azure.com/.default");
    }

    #[test]
    #[serial]
    fn builder_uses_endpoint_from_env() {
        std::env::set_var(ENV_RESOURCE_MANAGER_ENDPOINT, "https://management.usgovcloudapi.net");

        let client = ArmClient::builder()
            .credential(ArmCredential::access_token("test"))
            .build()
            .expect("should build");

        assert_eq!(client.endpoint().as_str(), "https://management.usgovcloudapi.net/");
        assert_eq!(client.scope(), "https://management.usgovcloudapi.net/.default");

        std::env::remove_var(ENV_RESOURCE_MANAGER_ENDPOINT);
    }

    #[test]
    #[serial]
    fn builder_endpoint_overrides_env() {
        std::env::set_var(ENV_RESOURCE_MANAGER_ENDPOINT, "https://env.example.com");

        let client = ArmClient::builder()
            .endpoint("https://explicit.example.com")
            .credential(ArmCredential::access_token("test"))
            .build()
            .expect("should build");

        assert_eq!(client.endpoint().as_str(), "https://explicit.example.com/");

        std::env::remove_var(ENV_RESOURCE_MANAGER_ENDPOINT);
    }

    #[test]
    fn builder_invalid_endpoint_url() {
        let result = ArmClient::builder()
            .endpoint("not a valid url")
            .credential(ArmCredential::access_token("test"))
            .build();

        assert!(matches!(result.unwrap_err(), ArmError::InvalidEndpoint { .. }));
    }

    #[test]
    fn builder_accepts_custom_scope() {
        let client = ArmClient::builder()
            .endpoint("https://myvault.vault.azure.net")
            .scope("https://vault.azure.net/.default")
            .credential(ArmCredential::access_token("test"))
            .build()
            .expect("should build");

        assert_eq!(client.scope(), "https://vault.azure.net/.default");
    }

    #[test]
    fn default_retry_policy() {
        let client = ArmClient::builder()
            .credential(ArmCredential::access_token("test"))
            .endpoint(DEFAULT_ENDPOINT)
            .build()
            .expect("should build");

        assert_eq!(client.retry_policy().max_retries, 3);
        assert_eq!(client.retry_policy().initial_backoff, Duration::from_millis(500));
    }

    #[test]
    fn url_joins_path() {
        let client = ArmClient::builder()
            .endpoint("https://management.azure.com")
            .credential(ArmCredential::access_token("test"))
            .build()
            .expect("should build");

        assert_eq!(
            client.url("subscriptions/sub").unwrap().as_str(),
            "https://management.azure.com/subscriptions/sub"
        );
    }

    #[test]
    fn identifies_retriable_http_errors() {
        for status in [429, 500, 502, 503, 504] {
            assert!(is_retriable_status(status), "{status} should retry");
        }
        for status in [200, 201, 202, 400, 401, 403, 404, 409] {
            assert!(!is_retriable_status(status), "{status} should not retry");
        }
    }

    #[test]
    fn backoff_stays_within_jitter_bounds() {
        let policy = RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
        };
        for _ in 0..20 {
            let backoff = policy.backoff(2);
            assert!(backoff >= Duration::from_millis(300));
            assert!(backoff <= Duration::from_millis(500));
        }
    }

    // -----------------------------------------------------------------------
    // send
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn send_adds_auth_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/things/a"))
            .and(query_param("api-version", "2021-06-01"))
            .and(header("Authorization", "Bearer test-token"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({"size": 3})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": "a"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let request = RequestBuilder::new(&PUT_THING)
            .path_param("thingName", "a")
            .unwrap()
            .json_body(&serde_json::json!({"size": 3}))
            .unwrap()
            .build(client.endpoint())
            .unwrap();

        let response = client.send(&request).await.expect("should succeed");
        assert_eq!(response.status(), 201);
        assert_eq!(response.method(), HttpMethod::Put);
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["id"], "a");
    }

    #[tokio::test]
    async fn send_returns_non_retriable_errors_without_retrying() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let request = Request::get(client.url("/missing").unwrap());
        let response = client.send(&request).await.expect("transport should succeed");

        assert_eq!(response.status(), 404);
        assert_eq!(response.body().as_ref(), b"nope");
    }

    #[tokio::test]
    async fn send_retries_on_503_with_backoff() {
        let server = MockServer::start().await;
        let request_count = Arc::new(AtomicU32::new(0));
        let counter = request_count.clone();

        Mock::given(method("GET"))
            .and(path("/retry-test"))
            .respond_with(move |_req: &wiremock::Request| {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    ResponseTemplate::new(503).set_body_string("Service Unavailable")
                } else {
                    ResponseTemplate::new(200).set_body_string("{}")
                }
            })
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let request = Request::get(client.url("/retry-test").unwrap());

        let start = std::time::Instant::now();
        let response = client.send(&request).await.expect("should succeed");

        assert_eq!(response.status(), 200);
        assert_eq!(request_count.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn send_returns_last_response_when_retries_exhausted() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/throttled"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .expect(4)
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let request = Request::get(client.url("/throttled").unwrap());
        let response = client.send(&request).await.expect("transport should succeed");

        assert_eq!(response.status(), 429);
    }

    #[tokio::test]
    async fn request_times_out_with_configured_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = ArmClient::builder()
            .endpoint(server.uri())
            .credential(ArmCredential::access_token("test"))
            .read_timeout(Duration::from_millis(300))
            .build()
            .expect("should build");

        let err = client
            .send(&Request::get(client.url("/slow").unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, ArmError::Transport(_)), "got {err:?}");
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn send_emits_span() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let _ = client.send(&Request::get(client.url("/span").unwrap())).await;

        assert!(logs_contain("arm::client::send"));
    }
}
