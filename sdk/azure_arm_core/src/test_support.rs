//! Helpers for testing clients built on this crate against `wiremock`.

use crate::auth::ArmCredential;
use crate::client::{ArmClient, RetryPolicy};
use wiremock::MockServer;

/// Bearer token used by [`setup_mock_client`] (not a real token).
pub const TEST_TOKEN: &str = "test-token";

/// Create a client connected to a mock server.
///
/// Retries are disabled so tests observe every response the server sends.
pub async fn setup_mock_client(server: &MockServer) -> ArmClient {
    ArmClient::builder()
        .endpoint(server.uri())
        .credential(ArmCredential::access_token(TEST_TOKEN))
        .retry_policy(RetryPolicy::none())
        .build()
        .expect("should build client")
}
