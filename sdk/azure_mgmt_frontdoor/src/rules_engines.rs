//! Rules engine configurations of a Front Door.
//!
//! ## Example
//!
//! ```rust,no_run
//! use azure_arm_core::client::ArmClient;
//! use azure_arm_core::PollOptions;
//! use azure_mgmt_frontdoor::models::RulesEngine;
//! use azure_mgmt_frontdoor::rules_engines::RulesEnginesClient;
//!
//! # async fn example(client: ArmClient) -> Result<(), Box<dyn std::error::Error>> {
//! let engines = RulesEnginesClient::new(client, "00000000-0000-0000-0000-000000000000");
//!
//! let mut poller = engines
//!     .begin_create_or_update("my-rg", "my-frontdoor", "mobile", &RulesEngine::with_rules(vec![]))
//!     .await?;
//! let engine = poller.poll_until_done(&PollOptions::default()).await?;
//! println!("created {:?}", engine.id);
//!
//! let mut pager = engines.list_by_front_door("my-rg", "my-frontdoor")?;
//! while let Some(page) = pager.next_page().await {
//!     for engine in page?.items {
//!         println!("{:?}", engine.name);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use azure_arm_core::client::ArmClient;
use azure_arm_core::lro::NoContent;
use azure_arm_core::request::{HttpMethod, OperationDescriptor, RequestBuilder};
use azure_arm_core::response::{decode, ensure_status};
use azure_arm_core::{ArmResult, Pager, Poller};

use crate::models::{RulesEngine, API_VERSION};
use crate::names;

const ENGINE_PATH: &str = "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Network/frontDoors/{frontDoorName}/rulesEngines/{rulesEngineName}";

pub(crate) const GET: OperationDescriptor = OperationDescriptor {
    name: "RulesEnginesClient.Get",
    method: HttpMethod::Get,
    path: ENGINE_PATH,
    api_version: API_VERSION,
    status_codes: &[200],
};

pub(crate) const LIST_BY_FRONT_DOOR: OperationDescriptor = OperationDescriptor {
    name: "RulesEnginesClient.ListByFrontDoor",
    method: HttpMethod::Get,
    path: "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Network/frontDoors/{frontDoorName}/rulesEngines",
    api_version: API_VERSION,
    status_codes: &[200],
};

pub(crate) const CREATE_OR_UPDATE: OperationDescriptor = OperationDescriptor {
    name: "RulesEnginesClient.CreateOrUpdate",
    method: HttpMethod::Put,
    path: ENGINE_PATH,
    api_version: API_VERSION,
    status_codes: &[200, 201, 202],
};

pub(crate) const DELETE: OperationDescriptor = OperationDescriptor {
    name: "RulesEnginesClient.Delete",
    method: HttpMethod::Delete,
    path: ENGINE_PATH,
    api_version: API_VERSION,
    status_codes: &[200, 202, 204],
};

/// Client for the rules engines of Front Doors in one subscription.
#[derive(Debug, Clone)]
pub struct RulesEnginesClient {
    client: ArmClient,
    subscription_id: String,
}

impl RulesEnginesClient {
    pub fn new(client: ArmClient, subscription_id: impl Into<String>) -> Self {
        Self {
            client,
            subscription_id: subscription_id.into(),
        }
    }

    fn builder<'a>(
        &self,
        descriptor: &'a OperationDescriptor,
        resource_group: &str,
        front_door: &str,
    ) -> ArmResult<RequestBuilder<'a>> {
        RequestBuilder::new(descriptor)
            .path_param("subscriptionId", &self.subscription_id)?
            .path_param_with("resourceGroupName", resource_group, names::RESOURCE_GROUP)?
            .path_param_with("frontDoorName", front_door, names::FRONT_DOOR)
    }

    /// Get a rules engine configuration.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty or malformed names before any
    /// request is sent; otherwise any transport or service error.
    #[tracing::instrument(
        name = "frontdoor::rules_engines::get",
        skip(self),
        fields(front_door = %front_door, rules_engine = %rules_engine)
    )]
    pub async fn get(
        &self,
        resource_group: &str,
        front_door: &str,
        rules_engine: &str,
    ) -> ArmResult<RulesEngine> {
        let request = self
            .builder(&GET, resource_group, front_door)?
            .path_param_with("rulesEngineName", rules_engine, names::RULES_ENGINE)?
            .build(self.client.endpoint())?;

        let response = self.client.send(&request).await?;
        tracing::debug!(status = response.status(), "rules engine fetched");
        decode(&response, GET.status_codes)
    }

    /// List the rules engines of a Front Door, one page at a time.
    ///
    /// No request is sent until the first page is requested.
    pub fn list_by_front_door(
        &self,
        resource_group: &str,
        front_door: &str,
    ) -> ArmResult<Pager<RulesEngine>> {
        let request = self
            .builder(&LIST_BY_FRONT_DOOR, resource_group, front_door)?
            .build(self.client.endpoint())?;
        Ok(Pager::new(self.client.clone(), request))
    }

    /// Start creating or replacing a rules engine configuration.
    ///
    /// Returns a poller whose result is the stored configuration.
    #[tracing::instrument(
        name = "frontdoor::rules_engines::begin_create_or_update",
        skip(self, parameters),
        fields(front_door = %front_door, rules_engine = %rules_engine)
    )]
    pub async fn begin_create_or_update(
        &self,
        resource_group: &str,
        front_door: &str,
        rules_engine: &str,
        parameters: &RulesEngine,
    ) -> ArmResult<Poller<RulesEngine>> {
        let request = self
            .builder(&CREATE_OR_UPDATE, resource_group, front_door)?
            .path_param_with("rulesEngineName", rules_engine, names::RULES_ENGINE)?
            .json_body(parameters)?
            .build(self.client.endpoint())?;

        let response = self.client.send(&request).await?;
        ensure_status(&response, CREATE_OR_UPDATE.status_codes)?;
        Poller::new(self.client.clone(), CREATE_OR_UPDATE.name, None, response)
    }

    /// Continue a create-or-update operation from a resume token.
    pub fn resume_create_or_update(&self, token: &str) -> ArmResult<Poller<RulesEngine>> {
        Poller::from_resume_token(self.client.clone(), CREATE_OR_UPDATE.name, token)
    }

    /// Start deleting a rules engine configuration.
    #[tracing::instrument(
        name = "frontdoor::rules_engines::begin_delete",
        skip(self),
        fields(front_door = %front_door, rules_engine = %rules_engine)
    )]
    pub async fn begin_delete(
        &self,
        resource_group: &str,
        front_door: &str,
        rules_engine: &str,
    ) -> ArmResult<Poller<NoContent>> {
        let request = self
            .builder(&DELETE, resource_group, front_door)?
            .path_param_with("rulesEngineName", rules_engine, names::RULES_ENGINE)?
            .build(self.client.endpoint())?;

        let response = self.client.send(&request).await?;
        ensure_status(&response, DELETE.status_codes)?;
        Poller::new(self.client.clone(), DELETE.name, None, response)
    }

    /// Continue a delete operation from a resume token.
    pub fn resume_delete(&self, token: &str) -> ArmResult<Poller<NoContent>> {
        Poller::from_resume_token(self.client.clone(), DELETE.name, token)
    }
}
