//! Access to certificates and secrets in a vault.

use async_trait::async_trait;
use azure_arm_core::client::ArmClient;
use azure_arm_core::request::{HttpMethod, OperationDescriptor, RequestBuilder};
use azure_arm_core::response::decode;
use azure_arm_core::ArmResult;

use crate::config::Config;
use crate::models::{CertificateBundle, SecretBundle};

/// Key Vault data-plane API version.
pub const API_VERSION: &str = "7.4";

/// Token scope for the Key Vault data plane.
pub const KEY_VAULT_SCOPE: &str = "https://vault.azure.net/.default";

const GET_CERTIFICATE: OperationDescriptor = OperationDescriptor {
    name: "KeyVaultClient.GetCertificate",
    method: HttpMethod::Get,
    path: "/certificates/{certificate-name}/{certificate-version}",
    api_version: API_VERSION,
    status_codes: &[200],
};

const GET_LATEST_CERTIFICATE: OperationDescriptor = OperationDescriptor {
    path: "/certificates/{certificate-name}",
    ..GET_CERTIFICATE
};

const GET_SECRET: OperationDescriptor = OperationDescriptor {
    name: "KeyVaultClient.GetSecret",
    method: HttpMethod::Get,
    path: "/secrets/{secret-name}/{secret-version}",
    api_version: API_VERSION,
    status_codes: &[200],
};

const GET_LATEST_SECRET: OperationDescriptor = OperationDescriptor {
    path: "/secrets/{secret-name}",
    ..GET_SECRET
};

/// Read access to a vault.
///
/// An empty `version` selects the latest version.
#[async_trait]
pub trait Vault: Send + Sync {
    /// Name used in error messages.
    fn name(&self) -> &str;

    async fn get_certificate(&self, name: &str, version: &str) -> ArmResult<CertificateBundle>;

    async fn get_secret(&self, name: &str, version: &str) -> ArmResult<SecretBundle>;
}

/// [`Vault`] backed by the Key Vault REST API.
#[derive(Debug, Clone)]
pub struct KeyVaultClient {
    vault_name: String,
    client: ArmClient,
}

impl KeyVaultClient {
    /// Create a client for the vault described by `config`.
    pub fn new(config: &Config) -> ArmResult<Self> {
        let client = ArmClient::builder()
            .endpoint(config.vault_url().as_str())
            .credential(config.credential().clone())
            .scope(KEY_VAULT_SCOPE)
            .build()?;
        Ok(Self::from_client(config.vault_name(), client))
    }

    /// Use an already configured client whose endpoint is the vault URL.
    pub fn from_client(vault_name: impl Into<String>, client: ArmClient) -> Self {
        Self {
            vault_name: vault_name.into(),
            client,
        }
    }
}

#[async_trait]
impl Vault for KeyVaultClient {
    fn name(&self) -> &str {
        &self.vault_name
    }

    #[tracing::instrument(
        name = "keyvault::get_certificate",
        skip(self),
        fields(vault = %self.vault_name)
    )]
    async fn get_certificate(&self, name: &str, version: &str) -> ArmResult<CertificateBundle> {
        let request = if version.is_empty() {
            RequestBuilder::new(&GET_LATEST_CERTIFICATE).path_param("certificate-name", name)?
        } else {
            RequestBuilder::new(&GET_CERTIFICATE)
                .path_param("certificate-name", name)?
                .path_param("certificate-version", version)?
        }
        .build(self.client.endpoint())?;

        let response = self.client.send(&request).await?;
        tracing::debug!(status = response.status(), "certificate fetched");
        decode(&response, GET_CERTIFICATE.status_codes)
    }

    #[tracing::instrument(
        name = "keyvault::get_secret",
        skip(self),
        fields(vault = %self.vault_name)
    )]
    async fn get_secret(&self, name: &str, version: &str) -> ArmResult<SecretBundle> {
        let request = if version.is_empty() {
            RequestBuilder::new(&GET_LATEST_SECRET).path_param("secret-name", name)?
        } else {
            RequestBuilder::new(&GET_SECRET)
                .path_param("secret-name", name)?
                .path_param("secret-version", version)?
        }
        .build(self.client.endpoint())?;

        let response = self.client.send(&request).await?;
        tracing::debug!(status = response.status(), "secret fetched");
        decode(&response, GET_SECRET.status_codes)
    }
}
