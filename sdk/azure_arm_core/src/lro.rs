//! Long-running operation (LRO) poller.
//!
//! ARM operations that take a while answer the initiating request with
//! `201`/`202` and a polling URL in the `Azure-AsyncOperation` or `Location`
//! header, or expect the caller to re-read the resource itself. [`Poller`]
//! tracks that protocol as an explicit state machine:
//!
//! ```text
//! NotStarted -> Running -> { Succeeded | Failed | Canceled }
//! ```
//!
//! Terminal states never transition again, and a terminal poller answers
//! from its cache without touching the network.
//!
//! A non-terminal poller can be suspended with [`Poller::resume_token`] and
//! rebuilt later, possibly in another process, with
//! [`Poller::from_resume_token`].
//!
//! # Example
//!
//! ```rust,no_run
//! use azure_arm_core::lro::{PollOptions, Poller};
//! use std::time::Duration;
//!
//! # async fn example(mut poller: Poller<serde_json::Value>) -> azure_arm_core::ArmResult<()> {
//! let options = PollOptions::default()
//!     .with_frequency(Duration::from_secs(5))
//!     .with_timeout(Duration::from_secs(600));
//! let resource = poller.poll_until_done(&options).await?;
//! println!("{resource}");
//! # Ok(())
//! # }
//! ```

use crate::client::ArmClient;
use crate::error::{ArmError, ArmResult};
use crate::models::OperationStatusBody;
use crate::request::{HttpMethod, Request};
use crate::response::{error_from_response, RawResponse};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

const HEADER_ASYNC_OPERATION: &str = "azure-asyncoperation";
const HEADER_LOCATION: &str = "location";

/// Status codes a polling endpoint may answer with.
const POLLING_CODES: &[u16] = &[200, 201, 202, 204];

/// Polling interval used when the service sends no `Retry-After`.
pub const DEFAULT_POLL_FREQUENCY: Duration = Duration::from_secs(30);

/// State of a long-running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LroStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl LroStatus {
    /// Map a service status string, case-insensitively.
    ///
    /// Anything that is not a known terminal or not-started value
    /// (`InProgress`, `Accepted`, `Updating`, ...) counts as running.
    pub fn from_service(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("Succeeded") {
            Self::Succeeded
        } else if value.eq_ignore_ascii_case("Failed") {
            Self::Failed
        } else if value.eq_ignore_ascii_case("Canceled") || value.eq_ignore_ascii_case("Cancelled") {
            Self::Canceled
        } else if value.eq_ignore_ascii_case("NotStarted") {
            Self::NotStarted
        } else {
            Self::Running
        }
    }

    /// Returns `true` for `Succeeded`, `Failed` and `Canceled`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    /// Returns `true` for `Failed` and `Canceled`.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Canceled)
    }
}

impl std::fmt::Display for LroStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "NotStarted",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
        };
        f.write_str(s)
    }
}

/// Where the final result of a successful operation is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinalStateVia {
    AzureAsyncOperation,
    Location,
    OriginalUri,
}

/// How the poller learns the operation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollingMethod {
    /// GET the `Azure-AsyncOperation` URL and read its `status` field.
    AsyncOperation,
    /// GET the `Location` URL; `202` means still running.
    Location,
    /// GET the original resource URL and read `provisioningState`.
    RequestUri,
}

/// Result type of operations whose final response carries nothing useful.
///
/// Deserializes from any JSON value, including an empty body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoContent;

impl<'de> Deserialize<'de> for NoContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde::de::IgnoredAny::deserialize(deserializer)?;
        Ok(NoContent)
    }
}

/// Options for [`Poller::poll_until_done`].
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Delay between polls when the service sends no `Retry-After`.
    pub frequency: Duration,
    /// Stops polling with [`ArmError::Cancelled`] once cancelled.
    pub cancellation: Option<CancellationToken>,
    /// Stops polling with [`ArmError::DeadlineExceeded`] once reached.
    pub deadline: Option<Instant>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            frequency: DEFAULT_POLL_FREQUENCY,
            cancellation: None,
            deadline: None,
        }
    }
}

impl PollOptions {
    pub fn with_frequency(mut self, frequency: Duration) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set the deadline to `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    fn check(&self) -> ArmResult<()> {
        if self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(ArmError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ArmError::DeadlineExceeded);
        }
        Ok(())
    }

    async fn sleep(&self, delay: Duration) -> ArmResult<()> {
        let cancelled = async {
            match &self.cancellation {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(ArmError::Cancelled),
            _ = deadline => Err(ArmError::DeadlineExceeded),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

/// Serializable part of the poller; this is the resume token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PollerState {
    poller_type: String,
    method: HttpMethod,
    #[serde(default)]
    polling_method: Option<PollingMethod>,
    #[serde(default)]
    polling_url: Option<String>,
    status: LroStatus,
    #[serde(default)]
    final_get_url: Option<String>,
    #[serde(default)]
    final_state_via: Option<FinalStateVia>,
    original_url: String,
}

impl PollerState {
    fn set_polling(&mut self, method: PollingMethod, url: &str) {
        self.polling_method = Some(method);
        self.polling_url = Some(url.to_string());
    }

    /// Pick up polling and final-GET URLs from a response's headers.
    ///
    /// `initial` enables the checks that only apply to the response of the
    /// initiating request.
    fn apply_headers(&mut self, response: &RawResponse, initial: bool) -> ArmResult<()> {
        let async_op = header_url(response, HEADER_ASYNC_OPERATION)?;
        // An unusable Location is irrelevant while an async-operation URL exists.
        let location = match (header_url(response, HEADER_LOCATION), &async_op) {
            (Ok(url), _) => url,
            (Err(_), Some(_)) => None,
            (Err(e), None) => return Err(e),
        };

        if let Some(url) = &async_op {
            self.set_polling(PollingMethod::AsyncOperation, url);
        } else if let Some(url) = &location {
            self.set_polling(PollingMethod::Location, url);
        }

        let status = response.status();
        match self.method {
            HttpMethod::Put | HttpMethod::Patch => {
                if self.polling_url.is_none() {
                    let original = self.original_url.clone();
                    self.set_polling(PollingMethod::RequestUri, &original);
                }
                if self.final_get_url.is_none() {
                    self.final_get_url = Some(self.original_url.clone());
                }
                if initial && status == 202 && async_op.is_none() && location.is_none() {
                    return Err(ArmError::InvalidPollingUrl(
                        "no Azure-AsyncOperation or Location header in 202 response".into(),
                    ));
                }
            }
            _ => {
                if status == 201 {
                    match &location {
                        Some(url) => {
                            self.set_polling(PollingMethod::Location, url);
                            self.final_get_url = Some(url.clone());
                        }
                        None if initial => {
                            return Err(ArmError::InvalidPollingUrl(
                                "missing Location header in 201 response".into(),
                            ));
                        }
                        None => {}
                    }
                }
                if status == 202 {
                    if let Some(url) = &location {
                        self.final_get_url = Some(url.clone());
                    }
                    if initial && self.polling_url.is_none() {
                        return Err(ArmError::InvalidPollingUrl(
                            "no Azure-AsyncOperation or Location header in 202 response".into(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Whether a 200/201/204 body's provisioning state decides the status.
    fn provisioning_state_applies(&self, status: u16) -> bool {
        match self.method {
            HttpMethod::Put | HttpMethod::Patch => matches!(status, 200 | 201),
            _ => matches!(status, 200 | 204),
        }
    }
}

/// Server-reported reason for a failed or canceled operation.
#[derive(Debug, Clone)]
struct LroFailure {
    code: String,
    message: String,
}

impl LroFailure {
    fn from_body(status: LroStatus, body: &OperationStatusBody) -> Self {
        let error = body.error.clone().unwrap_or_default();
        Self {
            code: error.code.unwrap_or_else(|| status.to_string()),
            message: error
                .message
                .unwrap_or_else(|| format!("the operation finished with status {status}")),
        }
    }

    fn into_error(self, status: LroStatus) -> ArmError {
        ArmError::OperationFailed {
            status,
            code: self.code,
            message: self.message,
        }
    }
}

/// Tracks one long-running operation.
///
/// `T` is the type of the final result; use [`NoContent`] for operations
/// that produce none.
pub struct Poller<T> {
    client: ArmClient,
    state: PollerState,
    last_response: Option<RawResponse>,
    failure: Option<LroFailure>,
    result: Option<T>,
}

impl<T> std::fmt::Debug for Poller<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("poller_type", &self.state.poller_type)
            .field("status", &self.state.status)
            .field("polling_method", &self.state.polling_method)
            .field("polling_url", &self.state.polling_url)
            .finish_non_exhaustive()
    }
}

impl<T> Poller<T> {
    /// Start tracking an operation from the response to its initiating request.
    ///
    /// `poller_type` identifies the operation inside resume tokens.
    ///
    /// # Errors
    ///
    /// - [`ArmError::ResponseStatus`] if the status is not 200, 201, 202 or 204
    /// - [`ArmError::InvalidPollingUrl`] if a required polling header is
    ///   missing or a header URL is not absolute
    /// - [`ArmError::OperationFailed`] if the response already reports failure
    pub fn new(
        client: ArmClient,
        poller_type: impl Into<String>,
        final_state_via: Option<FinalStateVia>,
        response: RawResponse,
    ) -> ArmResult<Self> {
        let method = response.method();
        if !matches!(
            method,
            HttpMethod::Put | HttpMethod::Patch | HttpMethod::Post | HttpMethod::Delete
        ) {
            return Err(ArmError::validation(
                "method",
                format!("{method} does not start a long-running operation"),
            ));
        }

        let body = status_body(&response)?;
        let status = match response.status() {
            200 => body
                .provisioning_state()
                .map_or(LroStatus::Succeeded, LroStatus::from_service),
            201 => body
                .provisioning_state()
                .map_or(LroStatus::Running, LroStatus::from_service),
            202 => LroStatus::Running,
            204 => LroStatus::Succeeded,
            _ => return Err(error_from_response(&response)),
        };
        if status.is_failure() {
            return Err(LroFailure::from_body(status, &body).into_error(status));
        }

        let mut state = PollerState {
            poller_type: poller_type.into(),
            method,
            polling_method: None,
            polling_url: None,
            status,
            final_get_url: None,
            final_state_via,
            original_url: response.url().to_string(),
        };
        state.apply_headers(&response, true)?;

        tracing::debug!(
            poller_type = %state.poller_type,
            %status,
            polling_method = ?state.polling_method,
            "long-running operation started"
        );

        Ok(Self {
            client,
            state,
            last_response: Some(response),
            failure: None,
            result: None,
        })
    }

    /// Rebuild a poller from a token produced by [`Poller::resume_token`].
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::InvalidResumeToken`] if the token is not valid
    /// JSON, belongs to another operation, names an unsupported method,
    /// carries a relative or missing URL, or is already terminal.
    pub fn from_resume_token(client: ArmClient, poller_type: &str, token: &str) -> ArmResult<Self> {
        let invalid = |reason: String| ArmError::InvalidResumeToken(reason);

        let value: serde_json::Value =
            serde_json::from_str(token).map_err(|e| invalid(format!("not valid JSON: {e}")))?;

        match value.get("pollerType").and_then(|v| v.as_str()) {
            Some(found) if found == poller_type => {}
            found => {
                return Err(invalid(format!(
                    "cannot resume from this poller type, expected {poller_type}, received {}",
                    found.unwrap_or("nothing")
                )))
            }
        }
        if value.get("method").is_none() {
            return Err(invalid("token is missing the method property".into()));
        }

        let state: PollerState =
            serde_json::from_value(value).map_err(|e| invalid(format!("malformed token: {e}")))?;

        if !matches!(
            state.method,
            HttpMethod::Put | HttpMethod::Patch | HttpMethod::Post | HttpMethod::Delete
        ) {
            return Err(invalid(format!("unsupported method {}", state.method)));
        }
        if state.status.is_terminal() {
            return Err(invalid(format!("operation already {}", state.status)));
        }

        let polling_url = state
            .polling_url
            .as_deref()
            .ok_or_else(|| invalid("token has no polling URL".into()))?;
        for url in [Some(polling_url), Some(state.original_url.as_str()), state.final_get_url.as_deref()]
            .into_iter()
            .flatten()
        {
            Url::parse(url).map_err(|_| invalid(format!("{url} is not an absolute URL")))?;
        }

        tracing::debug!(poller_type, status = %state.status, "poller resumed");

        Ok(Self {
            client,
            state,
            last_response: None,
            failure: None,
            result: None,
        })
    }

    /// Current status.
    pub fn status(&self) -> LroStatus {
        self.state.status
    }

    /// Returns `true` once a terminal state was reached.
    pub fn is_done(&self) -> bool {
        self.state.status.is_terminal()
    }

    /// Identity of the operation, as stored in resume tokens.
    pub fn poller_type(&self) -> &str {
        &self.state.poller_type
    }

    pub fn polling_method(&self) -> Option<PollingMethod> {
        self.state.polling_method
    }

    pub fn polling_url(&self) -> Option<&str> {
        self.state.polling_url.as_deref()
    }

    /// The most recent response, if any was received by this instance.
    pub fn last_response(&self) -> Option<&RawResponse> {
        self.last_response.as_ref()
    }

    /// Serialize the poller so polling can continue elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::InvalidResumeToken`] if the operation is already
    /// terminal.
    pub fn resume_token(&self) -> ArmResult<String> {
        if self.is_done() {
            return Err(ArmError::InvalidResumeToken(format!(
                "cannot create a resume token from a poller in terminal state {}",
                self.state.status
            )));
        }
        serde_json::to_string(&self.state).map_err(ArmError::Serialization)
    }

    /// Issue one status request and advance the state machine.
    ///
    /// A terminal poller returns its status without any network call. On
    /// error the state is left untouched, so the call can simply be repeated.
    ///
    /// # Tracing
    ///
    /// Emits a span named `arm::lro::poll` with field `poller_type`.
    #[tracing::instrument(
        name = "arm::lro::poll",
        skip(self),
        fields(poller_type = %self.state.poller_type)
    )]
    pub async fn poll(&mut self) -> ArmResult<LroStatus> {
        if self.is_done() {
            tracing::trace!(status = %self.state.status, "already terminal");
            return Ok(self.state.status);
        }

        let url = self
            .state
            .polling_url
            .as_deref()
            .ok_or_else(|| ArmError::InvalidPollingUrl("no polling URL available".into()))?;
        let url = Url::parse(url).map_err(|_| ArmError::InvalidPollingUrl(url.to_string()))?;

        let response = self.client.send(&Request::get(url)).await?;
        if !response.has_status(POLLING_CODES) {
            return Err(error_from_response(&response));
        }

        let body = status_body(&response)?;
        let async_op = self.state.polling_method == Some(PollingMethod::AsyncOperation);

        if async_op && body.status.is_none() {
            return Err(invalid_body(
                &response,
                "missing status property in Azure-AsyncOperation response body",
            ));
        }
        if self.state.method == HttpMethod::Put
            && response.header(HEADER_ASYNC_OPERATION).is_none()
            && response.header(HEADER_LOCATION).is_none()
            && response.is_empty()
        {
            return Err(invalid_body(&response, "the response did not contain a body"));
        }

        let status = match body.status.as_deref() {
            Some(status) if async_op => LroStatus::from_service(status),
            _ if response.status() == 202 => LroStatus::Running,
            _ if self.state.provisioning_state_applies(response.status()) => body
                .provisioning_state()
                .map_or(LroStatus::Succeeded, LroStatus::from_service),
            _ => {
                return Err(ArmError::ResponseStatus {
                    status: response.status(),
                    code: None,
                    message: format!(
                        "unexpected status {} while polling a {} operation",
                        response.status(),
                        self.state.method
                    ),
                    body: String::from_utf8_lossy(response.body()).into_owned(),
                })
            }
        };

        let mut next = self.state.clone();
        next.apply_headers(&response, false)?;
        next.status = status;

        if status.is_failure() {
            self.failure = Some(LroFailure::from_body(status, &body));
        }
        if status != self.state.status {
            tracing::debug!(from = %self.state.status, to = %status, "status changed");
        } else {
            tracing::trace!(%status, "operation still in progress");
        }

        self.state = next;
        self.last_response = Some(response);
        Ok(status)
    }
}

impl<T: DeserializeOwned + Clone> Poller<T> {
    /// The final result of the operation.
    ///
    /// After success this performs at most one GET, then caches the value.
    ///
    /// # Errors
    ///
    /// - [`ArmError::OperationFailed`] if the operation failed or was canceled
    /// - [`ArmError::PollerNotDone`] if it is still running
    #[tracing::instrument(
        name = "arm::lro::result",
        skip(self),
        fields(poller_type = %self.state.poller_type)
    )]
    pub async fn result(&mut self) -> ArmResult<T> {
        if let Some(result) = &self.result {
            return Ok(result.clone());
        }

        match self.state.status {
            LroStatus::Succeeded => {}
            status @ (LroStatus::Failed | LroStatus::Canceled) => {
                let failure = self.failure.clone().unwrap_or_else(|| {
                    LroFailure::from_body(status, &OperationStatusBody::default())
                });
                return Err(failure.into_error(status));
            }
            LroStatus::NotStarted | LroStatus::Running => return Err(ArmError::PollerNotDone),
        }

        let result = self.fetch_result().await?;
        self.result = Some(result.clone());
        Ok(result)
    }

    /// Poll until the operation is terminal, then return [`Poller::result`].
    ///
    /// Waits for the initial response's `Retry-After` first, then between
    /// polls for each response's `Retry-After` or `options.frequency`.
    /// Stopping early never cancels the operation on the server.
    ///
    /// # Errors
    ///
    /// Returns the first polling error, [`ArmError::Cancelled`] or
    /// [`ArmError::DeadlineExceeded`].
    #[tracing::instrument(
        name = "arm::lro::poll_until_done",
        skip(self, options),
        fields(poller_type = %self.state.poller_type)
    )]
    pub async fn poll_until_done(&mut self, options: &PollOptions) -> ArmResult<T> {
        if !self.is_done() {
            if let Some(delay) = self.last_response.as_ref().and_then(RawResponse::retry_after) {
                options.sleep(delay).await?;
            }
        }

        while !self.is_done() {
            options.check()?;
            self.poll().await?;
            if self.is_done() {
                break;
            }

            let delay = self
                .last_response
                .as_ref()
                .and_then(RawResponse::retry_after)
                .unwrap_or(options.frequency);
            tracing::trace!(delay_ms = delay.as_millis() as u64, "waiting before next poll");
            options.sleep(delay).await?;
        }

        if self.sends_final_get() {
            options.check()?;
        }
        self.result().await
    }

    /// The terminal response body that doubles as the result, if any.
    fn reusable_body(&self) -> Option<&RawResponse> {
        let reuses_resource = matches!(self.state.method, HttpMethod::Put | HttpMethod::Patch)
            && self.state.polling_method != Some(PollingMethod::AsyncOperation);
        self.last_response
            .as_ref()
            .filter(|last| reuses_resource && last.has_status(&[200, 201]) && !last.is_empty())
    }

    /// Whether [`Poller::result`] still has to issue a GET.
    fn sends_final_get(&self) -> bool {
        self.result.is_none()
            && self.state.status == LroStatus::Succeeded
            && self.reusable_body().is_none()
            && self.final_result_url().is_some()
    }

    async fn fetch_result(&self) -> ArmResult<T> {
        if let Some(last) = self.reusable_body() {
            return last.json();
        }

        let Some(url) = self.final_result_url() else {
            return match &self.last_response {
                Some(last) => last.json(),
                None => Err(ArmError::InvalidPollingUrl(
                    "missing URL for retrieving result".into(),
                )),
            };
        };

        let url = Url::parse(&url).map_err(|_| ArmError::InvalidPollingUrl(url.clone()))?;
        tracing::debug!(url = %url.path(), "fetching final result");
        let response = self.client.send(&Request::get(url)).await?;
        if !response.has_status(POLLING_CODES) {
            return Err(error_from_response(&response));
        }
        response.json()
    }

    fn final_result_url(&self) -> Option<String> {
        let last_header = |name| {
            self.last_response
                .as_ref()
                .and_then(|r| header_url(r, name).ok().flatten())
        };

        match self.state.final_state_via {
            Some(FinalStateVia::AzureAsyncOperation) => {
                if self.state.polling_method == Some(PollingMethod::AsyncOperation) {
                    self.state.polling_url.clone()
                } else {
                    last_header(HEADER_ASYNC_OPERATION)
                }
            }
            Some(FinalStateVia::Location) => {
                last_header(HEADER_LOCATION).or_else(|| self.state.final_get_url.clone())
            }
            Some(FinalStateVia::OriginalUri) => Some(self.state.original_url.clone()),
            None => self.state.final_get_url.clone(),
        }
    }
}

/// Read a header as an absolute URL. Absent or empty headers yield `None`.
fn header_url(response: &RawResponse, name: &str) -> ArmResult<Option<String>> {
    let Some(value) = response.header(name).map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    Url::parse(value)
        .map(|_| Some(value.to_string()))
        .map_err(|_| ArmError::InvalidPollingUrl(format!("{name} header is not an absolute URL: {value}")))
}

/// Parse a status body. Malformed JSON is an error; non-object JSON is not.
fn status_body(response: &RawResponse) -> ArmResult<OperationStatusBody> {
    if response.is_empty() {
        return Ok(OperationStatusBody::default());
    }
    let value: serde_json::Value = response.json()?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn invalid_body(response: &RawResponse, reason: &str) -> ArmError {
    ArmError::Deserialization {
        source: <serde_json::Error as serde::de::Error>::custom(reason),
        body: String::from_utf8_lossy(response.body()).into_owned(),
    }
}
