//! Wire types shared by every ARM client.

use serde::{Deserialize, Serialize};

/// The ARM error envelope: `{"error": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error details returned by the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,
}

/// Body of an `Azure-AsyncOperation` status resource.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationStatusBody {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<ErrorDetail>,
    #[serde(default)]
    pub properties: Option<ProvisioningProperties>,
}

/// The `properties` bag of a tracked resource, reduced to what polling reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisioningProperties {
    #[serde(default, rename = "provisioningState")]
    pub provisioning_state: Option<String>,
}

impl OperationStatusBody {
    /// Lenient parse: a missing or non-object body yields the default.
    pub fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// `properties.provisioningState`, if present.
    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.provisioning_state.as_deref())
    }
}
