//! Front Door endpoint operations.

use azure_arm_core::client::ArmClient;
use azure_arm_core::lro::NoContent;
use azure_arm_core::request::{HttpMethod, OperationDescriptor, RequestBuilder};
use azure_arm_core::response::ensure_status;
use azure_arm_core::{ArmError, ArmResult, Poller};

use crate::models::{PurgeParameters, API_VERSION};
use crate::names;

pub(crate) const PURGE_CONTENT: OperationDescriptor = OperationDescriptor {
    name: "EndpointsClient.PurgeContent",
    method: HttpMethod::Post,
    path: "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Network/frontDoors/{frontDoorName}/purge",
    api_version: API_VERSION,
    status_codes: &[200, 202],
};

/// Client for Front Door endpoint operations in one subscription.
#[derive(Debug, Clone)]
pub struct EndpointsClient {
    client: ArmClient,
    subscription_id: String,
}

impl EndpointsClient {
    pub fn new(client: ArmClient, subscription_id: impl Into<String>) -> Self {
        Self {
            client,
            subscription_id: subscription_id.into(),
        }
    }

    /// Start removing content from the Front Door cache.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `parameters` lists no paths or a name
    /// is invalid; no request is sent in that case.
    #[tracing::instrument(
        name = "frontdoor::endpoints::begin_purge_content",
        skip(self, parameters),
        fields(front_door = %front_door, paths = parameters.content_paths.len())
    )]
    pub async fn begin_purge_content(
        &self,
        resource_group: &str,
        front_door: &str,
        parameters: &PurgeParameters,
    ) -> ArmResult<Poller<NoContent>> {
        if parameters.content_paths.is_empty() {
            return Err(ArmError::validation("contentPaths", "at least one path is required"));
        }

        let request = RequestBuilder::new(&PURGE_CONTENT)
            .path_param("subscriptionId", &self.subscription_id)?
            .path_param_with("resourceGroupName", resource_group, names::RESOURCE_GROUP)?
            .path_param_with("frontDoorName", front_door, names::FRONT_DOOR)?
            .json_body(parameters)?
            .build(self.client.endpoint())?;

        let response = self.client.send(&request).await?;
        ensure_status(&response, PURGE_CONTENT.status_codes)?;
        Poller::new(self.client.clone(), PURGE_CONTENT.name, None, response)
    }

    /// Continue a purge operation from a resume token.
    pub fn resume_purge_content(&self, token: &str) -> ArmResult<Poller<NoContent>> {
        Poller::from_resume_token(self.client.clone(), PURGE_CONTENT.name, token)
    }
}
