//! Vault location and credentials.
//!
//! Values are read from the environment once and then passed explicitly;
//! the process environment is never modified.

use azure_arm_core::auth::ArmCredential;
use azure_arm_core::{ArmError, ArmResult};
use url::Url;

/// Environment variable naming the vault (`myvault`) or its URL.
pub const ENV_KEYVAULT_RESOURCE: &str = "AZURE_KEYVAULT_RESOURCE";

/// Public Azure Key Vault DNS suffix.
pub const DEFAULT_VAULT_SUFFIX: &str = "vault.azure.net";

/// Where the vault is and how to authenticate to it.
#[derive(Debug, Clone)]
pub struct Config {
    vault_name: String,
    vault_url: Url,
    credential: ArmCredential,
}

impl Config {
    /// Build a configuration with a client-secret credential.
    ///
    /// # Errors
    ///
    /// Returns an error if `vault` is empty or an invalid URL, or if the
    /// credential cannot be created.
    pub fn new(
        vault: &str,
        tenant_id: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> ArmResult<Self> {
        let credential = ArmCredential::client_secret(tenant_id, client_id, client_secret)?;
        Self::with_credential(vault, credential)
    }

    /// Build a configuration around an existing credential.
    pub fn with_credential(vault: &str, credential: ArmCredential) -> ArmResult<Self> {
        let (vault_name, vault_url) = parse_vault(vault)?;
        Ok(Self {
            vault_name,
            vault_url,
            credential,
        })
    }

    /// Read `AZURE_KEYVAULT_RESOURCE` and the credential variables.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::MissingConfig`] if the vault is not set, or the
    /// error of [`ArmCredential::from_env`].
    pub fn from_env() -> ArmResult<Self> {
        let vault = std::env::var(ENV_KEYVAULT_RESOURCE)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ArmError::MissingConfig(format!("{ENV_KEYVAULT_RESOURCE} is not set")))?;
        Self::with_credential(&vault, ArmCredential::from_env()?)
    }

    /// Short vault name, used in error messages.
    pub fn vault_name(&self) -> &str {
        &self.vault_name
    }

    pub fn vault_url(&self) -> &Url {
        &self.vault_url
    }

    pub fn credential(&self) -> &ArmCredential {
        &self.credential
    }
}

/// Accept a bare vault name or a vault URL.
fn parse_vault(vault: &str) -> ArmResult<(String, Url)> {
    let vault = vault.trim().trim_end_matches('/');
    if vault.is_empty() {
        return Err(ArmError::validation("vault", "cannot be empty"));
    }

    if vault.contains("://") {
        let url = Url::parse(vault)
            .map_err(|e| ArmError::invalid_endpoint_with_source(format!("invalid vault URL {vault}"), e))?;
        let name = url
            .host_str()
            .and_then(|host| host.split('.').next())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ArmError::validation("vault", format!("{vault} has no host")))?
            .to_string();
        return Ok((name, url));
    }

    if !vault.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ArmError::validation("vault", format!("{vault} is not a valid vault name")));
    }
    let url = Url::parse(&format!("https://{vault}.{DEFAULT_VAULT_SUFFIX}"))
        .map_err(|e| ArmError::invalid_endpoint_with_source(format!("invalid vault name {vault}"), e))?;
    Ok((vault.to_string(), url))
}
