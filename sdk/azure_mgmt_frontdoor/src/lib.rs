#![doc = include_str!("../README.md")]

pub mod endpoints;
pub mod models;
mod names;
pub mod rules_engines;

pub use endpoints::EndpointsClient;
pub use rules_engines::RulesEnginesClient;

/// Test utilities shared across modules.
#[cfg(test)]
pub(crate) mod test_utils {
    pub use azure_arm_core::test_support::setup_mock_client;

    /// Subscription used in request paths (not a real subscription).
    pub const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

    /// Path of `rg/frontdoor1/engine1`.
    pub const ENGINE_URL: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.Network/frontDoors/frontdoor1/rulesEngines/engine1";
}
