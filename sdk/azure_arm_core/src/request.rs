//! Request construction for ARM operations.
//!
//! Every API operation is described once by an [`OperationDescriptor`]. A
//! [`RequestBuilder`] combines the descriptor with typed parameters and
//! produces a [`Request`] ready to be sent by
//! [`ArmClient::send`](crate::client::ArmClient::send).
//!
//! All validation happens here, before any network I/O:
//!
//! ```rust
//! use azure_arm_core::request::{HttpMethod, OperationDescriptor, RequestBuilder};
//! use url::Url;
//!
//! const GET_GROUP: OperationDescriptor = OperationDescriptor {
//!     name: "ResourceGroupsClient.Get",
//!     method: HttpMethod::Get,
//!     path: "/subscriptions/{subscriptionId}/resourcegroups/{resourceGroupName}",
//!     api_version: "2021-04-01",
//!     status_codes: &[200],
//! };
//!
//! let endpoint = Url::parse("https://management.azure.com").unwrap();
//! let request = RequestBuilder::new(&GET_GROUP)
//!     .path_param("subscriptionId", "00000000-0000-0000-0000-000000000000")?
//!     .path_param("resourceGroupName", "my group")?
//!     .build(&endpoint)?;
//!
//! assert!(request.url().as_str().contains("/resourcegroups/my%20group?api-version=2021-04-01"));
//!
//! let err = RequestBuilder::new(&GET_GROUP).path_param("resourceGroupName", "");
//! assert!(err.is_err());
//! # Ok::<(), azure_arm_core::ArmError>(())
//! ```

use crate::error::{ArmError, ArmResult};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use url::Url;

/// HTTP verbs used by ARM operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Put,
    Patch,
    Post,
    Delete,
}

impl HttpMethod {
    /// Returns the verb as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }

    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Head => reqwest::Method::HEAD,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Post => reqwest::Method::POST,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of one API operation.
#[derive(Debug, Clone, Copy)]
pub struct OperationDescriptor {
    /// Operation name, e.g. `"RulesEnginesClient.CreateOrUpdate"`.
    ///
    /// Also identifies the poller type inside resume tokens.
    pub name: &'static str,
    /// HTTP verb.
    pub method: HttpMethod,
    /// URL path template with `{placeholder}` segments.
    pub path: &'static str,
    /// Value of the mandatory `api-version` query parameter.
    pub api_version: &'static str,
    /// Status codes accepted as success.
    pub status_codes: &'static [u16],
}

/// A constraint on a path parameter value.
#[derive(Debug, Clone, Copy)]
pub enum Constraint {
    /// The value must be at least this many characters long.
    MinLength(usize),
    /// The value must be at most this many characters long.
    MaxLength(usize),
    /// The value must satisfy a predicate.
    Pattern {
        /// Human-readable form of the pattern, used in error messages.
        description: &'static str,
        matches: fn(&str) -> bool,
    },
}

impl Constraint {
    fn check(&self, parameter: &str, value: &str) -> ArmResult<()> {
        let len = value.chars().count();
        match *self {
            Self::MinLength(min) if len < min => Err(ArmError::validation(
                parameter,
                format!("length {len} is less than the minimum of {min}"),
            )),
            Self::MaxLength(max) if len > max => Err(ArmError::validation(
                parameter,
                format!("length {len} exceeds the maximum of {max}"),
            )),
            Self::Pattern {
                description,
                matches,
            } if !matches(value) => Err(ArmError::validation(
                parameter,
                format!("value does not match {description}"),
            )),
            _ => Ok(()),
        }
    }
}

/// A fully-formed HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    method: HttpMethod,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Request {
    /// A bare `GET` request, used for polling and next-page links.
    pub fn get(url: Url) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Self {
            method: HttpMethod::Get,
            url,
            headers,
            body: None,
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}

/// Builds a [`Request`] from an [`OperationDescriptor`] and parameters.
#[derive(Debug)]
pub struct RequestBuilder<'a> {
    descriptor: &'a OperationDescriptor,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl<'a> RequestBuilder<'a> {
    /// Start a request for `descriptor`.
    pub fn new(descriptor: &'a OperationDescriptor) -> Self {
        Self {
            descriptor,
            path: descriptor.path.to_string(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Substitute a required path parameter.
    ///
    /// The value is percent-encoded before substitution.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Validation`] if the value is empty or the template
    /// has no `{name}` placeholder.
    pub fn path_param(self, name: &str, value: &str) -> ArmResult<Self> {
        self.path_param_with(name, value, &[])
    }

    /// Substitute a required path parameter after checking `constraints`.
    pub fn path_param_with(
        mut self,
        name: &str,
        value: &str,
        constraints: &[Constraint],
    ) -> ArmResult<Self> {
        if value.is_empty() {
            return Err(ArmError::validation(name, "cannot be empty"));
        }
        for constraint in constraints {
            constraint.check(name, value)?;
        }

        let placeholder = format!("{{{name}}}");
        if !self.path.contains(&placeholder) {
            return Err(ArmError::validation(
                name,
                format!("not present in path template {}", self.descriptor.path),
            ));
        }
        self.path = self.path.replace(&placeholder, &urlencoding::encode(value));
        Ok(self)
    }

    /// Append an optional query parameter. Absent values are skipped.
    pub fn query<V: ToString>(mut self, name: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.query.push((name.to_string(), value.to_string()));
        }
        self
    }

    /// Set a request header.
    pub fn header(mut self, name: HeaderName, value: &str) -> ArmResult<Self> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| ArmError::validation(name.as_str(), e.to_string()))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Serialize `body` as the JSON request payload.
    ///
    /// Read-only wire fields should be marked `#[serde(skip_serializing)]`
    /// on the model so they never reach the service.
    pub fn json_body<T: Serialize + ?Sized>(mut self, body: &T) -> ArmResult<Self> {
        let bytes = serde_json::to_vec(body).map_err(ArmError::Serialization)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(bytes));
        Ok(self)
    }

    /// Produce the request against `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Validation`] if a placeholder was never filled in,
    /// or [`ArmError::InvalidEndpoint`] if the URL cannot be assembled.
    pub fn build(mut self, endpoint: &Url) -> ArmResult<Request> {
        if let Some(start) = self.path.find('{') {
            let name = self.path[start + 1..]
                .split('}')
                .next()
                .unwrap_or_default()
                .to_string();
            return Err(ArmError::validation(name, "required path parameter was not supplied"));
        }

        let mut url = join_path(endpoint, &self.path)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.query {
                pairs.append_pair(name, value);
            }
            pairs.append_pair("api-version", self.descriptor.api_version);
        }

        self.headers
            .insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(Request {
            method: self.descriptor.method,
            url,
            headers: self.headers,
            body: self.body,
        })
    }
}

/// Append `path` to the endpoint's own path, keeping exactly one separator.
pub(crate) fn join_path(endpoint: &Url, path: &str) -> ArmResult<Url> {
    if endpoint.cannot_be_a_base() {
        return Err(ArmError::InvalidEndpoint {
            message: format!("{endpoint} cannot be used as a base URL"),
            source: None,
        });
    }
    let mut url = endpoint.clone();
    let joined = format!(
        "{}/{}",
        endpoint.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url.set_query(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GET_ENGINE: OperationDescriptor = OperationDescriptor {
        name: "RulesEnginesClient.Get",
        method: HttpMethod::Get,
        path: "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/rulesEngines/{rulesEngineName}",
        api_version: "2021-06-01",
        status_codes: &[200],
    };

    fn endpoint() -> Url {
        Url::parse("https://management.azure.com").unwrap()
    }

    fn alphanumeric(value: &str) -> bool {
        value.chars().all(|c| c.is_ascii_alphanumeric())
    }

    #[test]
    fn builds_url_with_api_version() {
        let request = RequestBuilder::new(&GET_ENGINE)
            .path_param("subscriptionId", "sub")
            .unwrap()
            .path_param("resourceGroupName", "rg")
            .unwrap()
            .path_param("rulesEngineName", "engine")
            .unwrap()
            .build(&endpoint())
            .expect("should build");

        assert_eq!(request.method(), HttpMethod::Get);
        assert_eq!(
            request.url().as_str(),
            "https://management.azure.com/subscriptions/sub/resourceGroups/rg/rulesEngines/engine?api-version=2021-06-01"
        );
        assert_eq!(request.headers()[ACCEPT], "application/json");
        assert!(request.body().is_none());
    }

    #[test]
    fn empty_path_param_is_rejected() {
        let err = RequestBuilder::new(&GET_ENGINE)
            .path_param("resourceGroupName", "")
            .unwrap_err();

        match err {
            ArmError::Validation { parameter, reason } => {
                assert_eq!(parameter, "resourceGroupName");
                assert_eq!(reason, "cannot be empty");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn path_params_are_percent_encoded() {
        let request = RequestBuilder::new(&GET_ENGINE)
            .path_param("subscriptionId", "sub")
            .unwrap()
            .path_param("resourceGroupName", "my group/x")
            .unwrap()
            .path_param("rulesEngineName", "e")
            .unwrap()
            .build(&endpoint())
            .unwrap();

        assert!(request
            .url()
            .path()
            .contains("/resourceGroups/my%20group%2Fx/"));
    }

    #[test]
    fn missing_placeholder_value_is_rejected_at_build() {
        let err = RequestBuilder::new(&GET_ENGINE)
            .path_param("subscriptionId", "sub")
            .unwrap()
            .build(&endpoint())
            .unwrap_err();

        assert!(err.to_string().contains("resourceGroupName"));
    }

    #[test]
    fn unknown_placeholder_is_rejected() {
        let err = RequestBuilder::new(&GET_ENGINE)
            .path_param("frontDoorName", "fd")
            .unwrap_err();
        assert!(err.to_string().contains("not present in path template"));
    }

    #[test]
    fn optional_query_params_only_when_present() {
        let request = RequestBuilder::new(&GET_ENGINE)
            .path_param("subscriptionId", "sub")
            .unwrap()
            .path_param("resourceGroupName", "rg")
            .unwrap()
            .path_param("rulesEngineName", "e")
            .unwrap()
            .query("$top", Some(5))
            .query::<&str>("$filter", None)
            .build(&endpoint())
            .unwrap();

        let query = request.url().query().unwrap();
        assert_eq!(query, "%24top=5&api-version=2021-06-01");
    }

    #[test]
    fn constraints_are_checked() {
        let constraints = [
            Constraint::MinLength(2),
            Constraint::MaxLength(5),
            Constraint::Pattern {
                description: "^[a-zA-Z0-9]+$",
                matches: alphanumeric,
            },
        ];

        let short = RequestBuilder::new(&GET_ENGINE).path_param_with("rulesEngineName", "a", &constraints);
        assert!(short.unwrap_err().to_string().contains("minimum of 2"));

        let long = RequestBuilder::new(&GET_ENGINE).path_param_with("rulesEngineName", "abcdef", &constraints);
        assert!(long.unwrap_err().to_string().contains("maximum of 5"));

        let bad = RequestBuilder::new(&GET_ENGINE).path_param_with("rulesEngineName", "a-b", &constraints);
        assert!(bad.unwrap_err().to_string().contains("^[a-zA-Z0-9]+$"));

        assert!(RequestBuilder::new(&GET_ENGINE)
            .path_param_with("rulesEngineName", "abc", &constraints)
            .is_ok());
    }

    #[test]
    fn json_body_skips_read_only_fields() {
        #[derive(Serialize)]
        struct Resource {
            #[serde(skip_serializing)]
            #[allow(dead_code)]
            id: Option<String>,
            location: String,
        }

        let request = RequestBuilder::new(&GET_ENGINE)
            .path_param("subscriptionId", "sub")
            .unwrap()
            .path_param("resourceGroupName", "rg")
            .unwrap()
            .path_param("rulesEngineName", "e")
            .unwrap()
            .json_body(&Resource {
                id: Some("/subscriptions/sub".into()),
                location: "global".into(),
            })
            .unwrap()
            .build(&endpoint())
            .unwrap();

        let body: serde_json::Value = serde_json::from_slice(request.body().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"location": "global"}));
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn join_path_keeps_endpoint_prefix() {
        let endpoint = Url::parse("https://example.com/base/").unwrap();
        let url = join_path(&endpoint, "/subscriptions/x").unwrap();
        assert_eq!(url.as_str(), "https://example.com/base/subscriptions/x");
    }

    #[test]
    fn http_method_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&HttpMethod::Patch).unwrap(), "\"PATCH\"");
        assert_eq!(
            serde_json::from_str::<HttpMethod>("\"DELETE\"").unwrap(),
            HttpMethod::Delete
        );
    }
}
