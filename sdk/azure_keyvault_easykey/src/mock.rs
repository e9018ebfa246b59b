//! In-memory [`Vault`] for tests.
//!
//! ```rust
//! use azure_keyvault_easykey::{EasyKey, MockVault};
//!
//! # async fn example() {
//! let vault = MockVault::new("vault1").with_secret("private", "", "AQID");
//! vault.fail_on_call("private", 2, 503);
//!
//! let easykey = EasyKey::new(vault);
//! assert_eq!(easykey.private_key("private", "").await.unwrap(), vec![1, 2, 3]);
//! assert!(easykey.private_key("private", "").await.is_err());
//! # }
//! ```

use async_trait::async_trait;
use azure_arm_core::{ArmError, ArmResult};
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::models::{CertificateBundle, SecretBundle};
use crate::vault::Vault;

type Key = (String, String);

#[derive(Debug, Default)]
struct Store {
    certificates: HashMap<Key, CertificateBundle>,
    secrets: HashMap<Key, SecretBundle>,
    calls: HashMap<String, u32>,
    failures: HashMap<String, (u32, u16)>,
}

impl Store {
    /// Count a call for `name`; fail if it is the injected one.
    fn record_call(&mut self, name: &str) -> ArmResult<()> {
        let count = self.calls.entry(name.to_string()).or_default();
        *count += 1;
        match self.failures.get(name) {
            Some(&(nth, status)) if nth == *count => Err(status_error(
                status,
                format!("injected failure on call {nth} for {name}"),
            )),
            _ => Ok(()),
        }
    }
}

/// A vault that keeps certificates and secrets in memory.
///
/// Objects are keyed by name and version; an empty version stands for
/// "latest". Safe to share between tasks.
#[derive(Debug)]
pub struct MockVault {
    name: String,
    store: Mutex<Store>,
}

impl MockVault {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store: Mutex::new(Store::default()),
        }
    }

    /// Store a DER certificate.
    pub fn with_certificate(self, name: &str, version: &str, der: impl Into<Vec<u8>>) -> Self {
        self.insert_certificate(
            name,
            version,
            CertificateBundle {
                cer: der.into(),
                ..Default::default()
            },
        );
        self
    }

    /// Store a secret value.
    pub fn with_secret(self, name: &str, version: &str, value: impl Into<String>) -> Self {
        self.insert_secret(name, version, SecretBundle::new(value));
        self
    }

    pub fn insert_certificate(&self, name: &str, version: &str, bundle: CertificateBundle) {
        self.store
            .lock()
            .certificates
            .insert((name.to_string(), version.to_string()), bundle);
    }

    pub fn insert_secret(&self, name: &str, version: &str, bundle: SecretBundle) {
        self.store
            .lock()
            .secrets
            .insert((name.to_string(), version.to_string()), bundle);
    }

    /// Make the `nth` call (1-based) for `name` fail with HTTP `status`.
    ///
    /// Certificate and secret reads of the same name share one counter.
    pub fn fail_on_call(&self, name: &str, nth: u32, status: u16) {
        self.store
            .lock()
            .failures
            .insert(name.to_string(), (nth, status));
    }

    /// Number of reads of `name` so far, including failed ones.
    pub fn calls(&self, name: &str) -> u32 {
        self.store.lock().calls.get(name).copied().unwrap_or_default()
    }
}

#[async_trait]
impl Vault for MockVault {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_certificate(&self, name: &str, version: &str) -> ArmResult<CertificateBundle> {
        let mut store = self.store.lock();
        store.record_call(name)?;
        store
            .certificates
            .get(&(name.to_string(), version.to_string()))
            .cloned()
            .ok_or_else(|| status_error(404, format!("certificate {name} not found")))
    }

    async fn get_secret(&self, name: &str, version: &str) -> ArmResult<SecretBundle> {
        let mut store = self.store.lock();
        store.record_call(name)?;
        store
            .secrets
            .get(&(name.to_string(), version.to_string()))
            .cloned()
            .ok_or_else(|| status_error(404, format!("secret {name} not found")))
    }
}

fn status_error(status: u16, message: String) -> ArmError {
    ArmError::ResponseStatus {
        status,
        code: None,
        message,
        body: String::new(),
    }
}
