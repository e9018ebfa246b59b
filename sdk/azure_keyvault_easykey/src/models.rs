//! Key Vault data-plane bundles, reduced to the fields easykey reads.

use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A certificate as returned by `GET /certificates/{name}/{version}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateBundle {
    /// Certificate identifier, ending in the version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Identifier of the key backing the certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Identifier of the secret holding the certificate and key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,

    /// DER-encoded certificate.
    #[serde(default, with = "base64_bytes")]
    pub cer: Vec<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// A secret as returned by `GET /secrets/{name}/{version}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// For certificate-backed secrets, `application/x-pkcs12` or
    /// `application/x-pem-file`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Set when the secret backs a certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed: Option<bool>,
}

impl SecretBundle {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Default::default()
        }
    }
}

mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn certificate_content_is_base64_decoded() {
        let bundle: CertificateBundle = serde_json::from_value(json!({
            "id": "https://vault1.vault.azure.net/certificates/web/abc123",
            "cer": "MIIBAg==",
            "contentType": "application/x-pkcs12"
        }))
        .unwrap();
        assert_eq!(bundle.cer, vec![0x30, 0x82, 0x01, 0x02]);
        assert_eq!(bundle.content_type.as_deref(), Some("application/x-pkcs12"));
    }

    #[test]
    fn missing_or_null_certificate_content_is_empty() {
        let bundle: CertificateBundle = serde_json::from_value(json!({"id": "x"})).unwrap();
        assert!(bundle.cer.is_empty());
        let bundle: CertificateBundle = serde_json::from_value(json!({"cer": null})).unwrap();
        assert!(bundle.cer.is_empty());
    }

    #[test]
    fn invalid_certificate_content_is_rejected() {
        let result = serde_json::from_value::<CertificateBundle>(json!({"cer": "not base64!"}));
        assert!(result.is_err());
    }
}
