//! Credentials for Azure Resource Manager and Key Vault requests.
//!
//! Tokens are produced by `azure_identity`; this module only resolves a
//! credential into an `Authorization` header value for a given scope.

use crate::error::{ArmError, ArmResult};
use azure_core::credentials::{Secret, TokenCredential};
use azure_identity::ClientSecretCredential;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

/// Environment variable holding the Entra ID tenant.
pub const ENV_TENANT_ID: &str = "AZURE_TENANT_ID";

/// Environment variable holding the application (client) ID.
pub const ENV_CLIENT_ID: &str = "AZURE_CLIENT_ID";

/// Environment variable holding the client secret.
pub const ENV_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";

/// Environment variable holding a pre-acquired bearer token.
pub const ENV_ACCESS_TOKEN: &str = "AZURE_ACCESS_TOKEN";

/// Credential types supported by the ARM clients.
#[derive(Clone)]
pub enum ArmCredential {
    /// A bearer token acquired out of band. Sent as-is for every scope.
    AccessToken(SecretString),

    /// Any `azure_core` token credential, e.g. one from `azure_identity`.
    TokenCredential(Arc<dyn TokenCredential>),
}

impl ArmCredential {
    /// Create a credential from the environment.
    ///
    /// Uses a client secret credential when `AZURE_TENANT_ID`,
    /// `AZURE_CLIENT_ID` and `AZURE_CLIENT_SECRET` are all set, otherwise
    /// falls back to a bearer token in `AZURE_ACCESS_TOKEN`. The environment
    /// is only read, never modified.
    pub fn from_env() -> ArmResult<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        if let (Some(tenant_id), Some(client_id), Some(secret)) =
            (var(ENV_TENANT_ID), var(ENV_CLIENT_ID), var(ENV_CLIENT_SECRET))
        {
            return Self::client_secret(tenant_id, client_id, secret);
        }

        if let Some(token) = var(ENV_ACCESS_TOKEN) {
            return Ok(Self::access_token(token));
        }

        Err(ArmError::MissingConfig(
            "credential is required. Set AZURE_TENANT_ID, AZURE_CLIENT_ID and \
             AZURE_CLIENT_SECRET, or AZURE_ACCESS_TOKEN."
                .into(),
        ))
    }

    /// Create a credential from a pre-acquired bearer token.
    pub fn access_token(token: impl Into<String>) -> Self {
        Self::AccessToken(SecretString::from(token.into()))
    }

    /// Create a service principal credential backed by a client secret.
    pub fn client_secret(
        tenant_id: impl AsRef<str>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> ArmResult<Self> {
        let credential = ClientSecretCredential::new(
            tenant_id.as_ref(),
            client_id.into(),
            Secret::new(client_secret.into()),
            None,
        )
        .map_err(|e| ArmError::Auth(format!("failed to create client secret credential: {e}")))?;

        Ok(Self::TokenCredential(credential))
    }

    /// Wrap an arbitrary token credential.
    pub fn token_credential(credential: Arc<dyn TokenCredential>) -> Self {
        Self::TokenCredential(credential)
    }

    /// Resolve the credential to an authorization header value for `scope`.
    pub async fn resolve(&self, scope: &str) -> ArmResult<String> {
        match self {
            Self::AccessToken(token) => Ok(format!("Bearer {}", token.expose_secret())),
            Self::TokenCredential(credential) => {
                let token = credential
                    .get_token(&[scope], None)
                    .await
                    .map_err(|e| ArmError::Auth(format!("failed to acquire token for {scope}: {e}")))?;
                Ok(format!("Bearer {}", token.token.secret()))
            }
        }
    }
}

impl std::fmt::Debug for ArmCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccessToken(_) => write!(f, "ArmCredential::AccessToken(****)"),
            Self::TokenCredential(_) => write!(f, "ArmCredential::TokenCredential"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [ENV_TENANT_ID, ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_ACCESS_TOKEN] {
            std::env::remove_var(name);
        }
    }

    #[tokio::test]
    async fn access_token_resolves_to_bearer_header() {
        let credential = ArmCredential::access_token("abc123");
        let header = credential
            .resolve("https://management.azure.com/.default")
            .await
            .expect("should resolve");
        assert_eq!(header, "Bearer abc123");
    }

    #[test]
    fn debug_output_hides_token() {
        let credential = ArmCredential::access_token("super-secret");
        let debug = format!("{credential:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("****"));
    }

    #[test]
    #[serial]
    fn from_env_prefers_access_token_when_no_service_principal() {
        clear_env();
        std::env::set_var(ENV_ACCESS_TOKEN, "env-token");

        let credential = ArmCredential::from_env().expect("should build");
        assert!(matches!(credential, ArmCredential::AccessToken(_)));

        clear_env();
    }

    #[test]
    #[serial]
    fn from_env_requires_some_credential() {
        clear_env();

        let err = ArmCredential::from_env().unwrap_err();
        assert!(matches!(err, ArmError::MissingConfig(_)));
    }

    #[test]
    #[serial]
    fn from_env_ignores_partial_service_principal() {
        clear_env();
        std::env::set_var(ENV_TENANT_ID, "tenant");
        std::env::set_var(ENV_CLIENT_ID, "client");
        std::env::set_var(ENV_ACCESS_TOKEN, "fallback");

        let credential = ArmCredential::from_env().expect("should build");
        assert!(matches!(credential, ArmCredential::AccessToken(_)));

        clear_env();
    }
}
