#![doc = include_str!("../README.md")]

pub mod config;
pub mod easykey;
pub mod error;
pub mod mock;
pub mod models;
pub mod pkcs12;
pub mod vault;

pub use config::Config;
pub use easykey::{EasyKey, TlsCertificate};
pub use error::{EasyKeyError, EasyKeyResult};
pub use mock::MockVault;
pub use vault::{KeyVaultClient, Vault};
