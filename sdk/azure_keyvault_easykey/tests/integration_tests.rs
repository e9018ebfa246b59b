//! Integration tests for azure_keyvault_easykey.
//!
//! These tests require a live Key Vault holding a certificate.
//! Run with: `cargo test --features integration-tests`
//!
//! Required environment variables:
//! - `AZURE_KEYVAULT_RESOURCE`: vault name or URL
//! - `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET`
//!   (or `AZURE_ACCESS_TOKEN` for the vault scope)
//! - `EASYKEY_CERTIFICATE`: name of a certificate with an exportable key

#![cfg(feature = "integration-tests")]

use azure_keyvault_easykey::{Config, EasyKey, KeyVaultClient};

fn get_easykey() -> EasyKey<KeyVaultClient> {
    let config = Config::from_env().expect("config from environment");
    EasyKey::new(KeyVaultClient::new(&config).expect("Failed to build client"))
}

fn certificate_name() -> String {
    std::env::var("EASYKEY_CERTIFICATE").expect("EASYKEY_CERTIFICATE not set")
}

#[tokio::test]
async fn test_certificate_and_key() {
    let easykey = get_easykey();
    let name = certificate_name();

    let der = easykey.certificate(&name, "").await.expect("certificate");
    assert_eq!(der.first(), Some(&0x30));

    let tls = easykey.tls_cert(&name, "", 1, 0).await.expect("tls cert");
    assert_eq!(tls.certificate().contents(), der.as_slice());
}

#[tokio::test]
async fn test_missing_certificate() {
    let err = get_easykey()
        .certificate("easykey-integration-missing", "")
        .await
        .expect_err("missing certificate");
    assert!(err.is_not_found());
}
