//! Certificate and key material from a [`Vault`].

use base64::Engine as _;
use pem::Pem;

use crate::error::{EasyKeyError, EasyKeyResult};
use crate::pkcs12::{self, CERTIFICATE_TAG, PRIVATE_KEY_TAG};
use crate::vault::Vault;

/// A certificate and its private key, as PEM blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct TlsCertificate {
    certificate: Pem,
    private_key: Pem,
}

impl TlsCertificate {
    pub fn certificate(&self) -> &Pem {
        &self.certificate
    }

    pub fn private_key(&self) -> &Pem {
        &self.private_key
    }

    /// The certificate, PEM-encoded.
    pub fn certificate_pem(&self) -> String {
        pem::encode(&self.certificate)
    }

    /// The private key, PEM-encoded.
    pub fn private_key_pem(&self) -> String {
        pem::encode(&self.private_key)
    }
}

/// Reads certificates and secrets from a vault and converts them.
///
/// An empty `version` selects the latest version of an object.
#[derive(Debug)]
pub struct EasyKey<V> {
    vault: V,
}

impl<V: Vault> EasyKey<V> {
    pub fn new(vault: V) -> Self {
        Self { vault }
    }

    pub fn vault(&self) -> &V {
        &self.vault
    }

    /// The DER-encoded certificate `name`.
    ///
    /// # Errors
    ///
    /// - [`EasyKeyError::AccessDenied`] if the vault answers 403
    /// - [`EasyKeyError::Fetch`] if the certificate does not exist or cannot
    ///   be read
    /// - [`EasyKeyError::EmptyContent`] if the certificate has no content
    #[tracing::instrument(name = "easykey::certificate", skip(self), fields(vault = self.vault.name()))]
    pub async fn certificate(&self, name: &str, version: &str) -> EasyKeyResult<Vec<u8>> {
        let bundle = self
            .vault
            .get_certificate(name, version)
            .await
            .map_err(|e| EasyKeyError::from_vault(self.vault.name(), name, e))?;

        if bundle.cer.is_empty() {
            return Err(self.empty(name));
        }
        Ok(bundle.cer)
    }

    /// The base64-decoded value of secret `name`.
    ///
    /// For certificates this is the PKCS#12 archive holding certificate and key.
    ///
    /// # Errors
    ///
    /// As [`EasyKey::certificate`], plus [`EasyKeyError::Decode`] if the
    /// value is not valid base64.
    #[tracing::instrument(name = "easykey::private_key", skip(self), fields(vault = self.vault.name()))]
    pub async fn private_key(&self, name: &str, version: &str) -> EasyKeyResult<Vec<u8>> {
        let bundle = self
            .vault
            .get_secret(name, version)
            .await
            .map_err(|e| EasyKeyError::from_vault(self.vault.name(), name, e))?;

        let value = bundle
            .value
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| self.empty(name))?;

        base64::engine::general_purpose::STANDARD
            .decode(value.trim())
            .map_err(|source| EasyKeyError::Decode {
                vault: self.vault.name().to_string(),
                object: name.to_string(),
                source,
            })
    }

    /// The PEM blocks of the PKCS#12 archive stored as secret `name`.
    ///
    /// Private keys come first, then certificates.
    pub async fn pem(&self, name: &str, version: &str) -> EasyKeyResult<Vec<Pem>> {
        let der = self.private_key(name, version).await?;
        let blocks = pkcs12::decode_to_pem(&der, "").map_err(|reason| EasyKeyError::Pkcs12 {
            vault: self.vault.name().to_string(),
            object: name.to_string(),
            reason,
        })?;
        tracing::debug!(object = name, blocks = blocks.len(), "decoded archive");
        Ok(blocks)
    }

    /// Pair PEM block `cert_block` with PEM block `key_block` of secret `name`.
    ///
    /// Block indices refer to the order returned by [`EasyKey::pem`].
    ///
    /// # Errors
    ///
    /// - [`EasyKeyError::InsufficientPemBlocks`] if the archive holds fewer
    ///   than two blocks
    /// - [`EasyKeyError::PemBlockOutOfRange`] for an index past the end
    /// - [`EasyKeyError::UnexpectedPemBlock`] if a block has the wrong tag
    pub async fn tls_cert(
        &self,
        name: &str,
        version: &str,
        cert_block: usize,
        key_block: usize,
    ) -> EasyKeyResult<TlsCertificate> {
        let blocks = self.pem(name, version).await?;
        self.pair_blocks(name, &blocks, cert_block, key_block)
    }

    fn pair_blocks(
        &self,
        name: &str,
        blocks: &[Pem],
        cert_block: usize,
        key_block: usize,
    ) -> EasyKeyResult<TlsCertificate> {
        if blocks.len() < 2 {
            return Err(EasyKeyError::InsufficientPemBlocks {
                vault: self.vault.name().to_string(),
                object: name.to_string(),
                found: blocks.len(),
            });
        }

        let certificate = self.block(name, blocks, cert_block, CERTIFICATE_TAG, |tag| {
            tag == CERTIFICATE_TAG
        })?;
        let private_key = self.block(name, blocks, key_block, PRIVATE_KEY_TAG, |tag| {
            tag.ends_with(PRIVATE_KEY_TAG)
        })?;

        Ok(TlsCertificate {
            certificate: certificate.clone(),
            private_key: private_key.clone(),
        })
    }

    fn block<'b>(
        &self,
        name: &str,
        blocks: &'b [Pem],
        index: usize,
        expected: &'static str,
        accepts: fn(&str) -> bool,
    ) -> EasyKeyResult<&'b Pem> {
        let block = blocks.get(index).ok_or_else(|| EasyKeyError::PemBlockOutOfRange {
            vault: self.vault.name().to_string(),
            object: name.to_string(),
            index,
            count: blocks.len(),
        })?;

        if !accepts(block.tag()) {
            return Err(EasyKeyError::UnexpectedPemBlock {
                vault: self.vault.name().to_string(),
                object: name.to_string(),
                index,
                expected,
                found: block.tag().to_string(),
            });
        }
        Ok(block)
    }

    fn empty(&self, name: &str) -> EasyKeyError {
        EasyKeyError::EmptyContent {
            vault: self.vault.name().to_string(),
            object: name.to_string(),
        }
    }
}
