//! Front Door wire types.
//!
//! Fields the service computes (`id`, `name`, `type`, `resourceState`) are
//! deserialized but never serialized, so a resource read from the service can
//! be sent back unchanged.

use serde::{Deserialize, Serialize};

/// API version of the Front Door management endpoints.
pub const API_VERSION: &str = "2021-06-01";

// ---------------------------------------------------------------------------
// Rules engines
// ---------------------------------------------------------------------------

/// A rules engine configuration attached to a Front Door.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulesEngine {
    /// Resource ID.
    #[serde(default, skip_serializing)]
    pub id: Option<String>,

    /// Resource name.
    #[serde(default, skip_serializing)]
    pub name: Option<String>,

    /// Resource type.
    #[serde(default, rename = "type", skip_serializing)]
    pub resource_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<RulesEngineProperties>,
}

impl RulesEngine {
    /// Create a rules engine body from its rules.
    pub fn with_rules(rules: Vec<RulesEngineRule>) -> Self {
        Self {
            properties: Some(RulesEngineProperties {
                rules,
                resource_state: None,
            }),
            ..Default::default()
        }
    }

    /// `properties.resourceState`, if the service reported one.
    pub fn resource_state(&self) -> Option<ResourceState> {
        self.properties.as_ref().and_then(|p| p.resource_state.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesEngineProperties {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RulesEngineRule>,

    /// Resource status; read-only.
    #[serde(default, skip_serializing)]
    pub resource_state: Option<ResourceState>,
}

/// One rule: conditions plus the actions applied when they match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesEngineRule {
    /// Unique name within the rules engine.
    pub name: String,

    /// Evaluation order; lower runs first.
    pub priority: i32,

    pub action: RulesEngineAction,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_conditions: Vec<RulesEngineMatchCondition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_processing_behavior: Option<MatchProcessingBehavior>,
}

/// Actions run by a matching rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesEngineAction {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub request_header_actions: Vec<HeaderAction>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_header_actions: Vec<HeaderAction>,

    /// Replaces the route configuration of the matched routing rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_configuration_override: Option<RouteConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderAction {
    pub header_action_type: HeaderActionType,
    pub header_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderActionType {
    Append,
    Delete,
    Overwrite,
    /// A value this client does not know yet.
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesEngineMatchCondition {
    pub rules_engine_match_variable: RulesEngineMatchVariable,
    pub rules_engine_operator: RulesEngineOperator,

    #[serde(default)]
    pub rules_engine_match_value: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negate_condition: Option<bool>,

    /// Name of the header, cookie or query parameter, where applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transforms: Vec<Transform>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RulesEngineMatchVariable {
    IsMobile,
    PostArgs,
    QueryString,
    RemoteAddr,
    RequestBody,
    RequestFilename,
    RequestFilenameExtension,
    RequestHeader,
    RequestMethod,
    RequestPath,
    RequestScheme,
    RequestUri,
    /// A value this client does not know yet.
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RulesEngineOperator {
    Any,
    BeginsWith,
    Contains,
    EndsWith,
    Equal,
    GeoMatch,
    GreaterThan,
    GreaterThanOrEqual,
    IPMatch,
    LessThan,
    LessThanOrEqual,
    /// A value this client does not know yet.
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transform {
    Lowercase,
    RemoveNulls,
    Trim,
    Uppercase,
    UrlDecode,
    UrlEncode,
    /// A value this client does not know yet.
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchProcessingBehavior {
    Continue,
    Stop,
    /// A value this client does not know yet.
    #[serde(untagged)]
    Other(String),
}

/// Resource status of a Front Door child resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceState {
    Creating,
    Deleting,
    Disabled,
    Disabling,
    Enabled,
    Enabling,
    /// A value this client does not know yet.
    #[serde(untagged)]
    Other(String),
}

// ---------------------------------------------------------------------------
// Route configuration
// ---------------------------------------------------------------------------

/// Where a routing rule sends traffic, discriminated by `@odata.type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@odata.type")]
pub enum RouteConfiguration {
    #[serde(rename = "#Microsoft.Azure.FrontDoor.Models.FrontdoorForwardingConfiguration")]
    Forwarding(ForwardingConfiguration),
    #[serde(rename = "#Microsoft.Azure.FrontDoor.Models.FrontdoorRedirectConfiguration")]
    Redirect(RedirectConfiguration),
}

/// Forward matching requests to a backend pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardingConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_pool: Option<SubResource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_configuration: Option<CacheConfiguration>,

    /// Path used when building the request forwarded to the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_forwarding_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarding_protocol: Option<ForwardingProtocol>,
}

/// Redirect matching requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_fragment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_query_string: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_protocol: Option<RedirectProtocol>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_type: Option<RedirectType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_duration: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_compression: Option<EnabledState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_parameter_strip_directive: Option<QueryParameterStripDirective>,

    /// Query parameters to include or exclude, comma separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_parameters: Option<String>,
}

/// Reference to another resource by ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubResource {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForwardingProtocol {
    HttpOnly,
    HttpsOnly,
    MatchRequest,
    /// A value this client does not know yet.
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedirectProtocol {
    HttpOnly,
    HttpsOnly,
    MatchRequest,
    /// A value this client does not know yet.
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedirectType {
    Found,
    Moved,
    PermanentRedirect,
    TemporaryRedirect,
    /// A value this client does not know yet.
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnabledState {
    Enabled,
    Disabled,
    /// A value this client does not know yet.
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryParameterStripDirective {
    StripAll,
    StripAllExcept,
    StripNone,
    StripOnly,
    /// A value this client does not know yet.
    #[serde(untagged)]
    Other(String),
}

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// Content to remove from the Front Door cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeParameters {
    /// Paths to purge, e.g. `/pictures/city.png` or `/pictures/*`.
    pub content_paths: Vec<String>,
}

impl PurgeParameters {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            content_paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}
