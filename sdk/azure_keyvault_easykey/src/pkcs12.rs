//! PKCS#12 archive to PEM conversion.

use p12::PFX;
use pem::Pem;

/// PEM tag of PKCS#8 private keys.
pub const PRIVATE_KEY_TAG: &str = "PRIVATE KEY";

/// PEM tag of X.509 certificates.
pub const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// Decode a PKCS#12 archive into PEM blocks.
///
/// Private keys come first, then certificates, each in archive order. Key
/// Vault exports use an empty `password`.
///
/// # Errors
///
/// Returns a description of the problem if the archive cannot be parsed,
/// the MAC does not verify, or a bag cannot be decrypted.
pub fn decode_to_pem(der: &[u8], password: &str) -> Result<Vec<Pem>, String> {
    let pfx = PFX::parse(der).map_err(|e| format!("malformed archive: {e:?}"))?;
    if !pfx.verify_mac(password) {
        return Err("MAC verification failed".into());
    }

    let keys = pfx
        .key_bags(password)
        .map_err(|e| format!("cannot decrypt key bags: {e:?}"))?;
    let certificates = pfx
        .cert_x509_bags(password)
        .map_err(|e| format!("cannot decrypt certificate bags: {e:?}"))?;

    Ok(keys
        .into_iter()
        .map(|key| Pem::new(PRIVATE_KEY_TAG, key))
        .chain(certificates.into_iter().map(|cert| Pem::new(CERTIFICATE_TAG, cert)))
        .collect())
}
