use azure_arm_core::ArmError;
use thiserror::Error;

/// Errors returned by [`EasyKey`](crate::EasyKey).
///
/// Every variant names the vault and the object involved.
#[derive(Error, Debug)]
pub enum EasyKeyError {
    /// The vault answered 403.
    #[error("access denied to {object} in vault {vault}: {source}")]
    AccessDenied {
        vault: String,
        object: String,
        #[source]
        source: ArmError,
    },

    /// Any other failure to read the object: not found, connection, bad response.
    #[error("failed to fetch {object} from vault {vault}: {source}")]
    Fetch {
        vault: String,
        object: String,
        #[source]
        source: ArmError,
    },

    /// The object exists but carries no content.
    #[error("{object} in vault {vault} has no content")]
    EmptyContent { vault: String, object: String },

    /// The secret value is not valid base64.
    #[error("{object} in vault {vault} is not valid base64: {source}")]
    Decode {
        vault: String,
        object: String,
        #[source]
        source: base64::DecodeError,
    },

    /// The secret is not a readable PKCS#12 archive.
    #[error("{object} in vault {vault} is not a readable PKCS#12 archive: {reason}")]
    Pkcs12 {
        vault: String,
        object: String,
        reason: String,
    },

    /// The archive decoded to fewer PEM blocks than a certificate and key need.
    #[error("{object} in vault {vault} decoded to {found} PEM block(s), at least 2 are required")]
    InsufficientPemBlocks {
        vault: String,
        object: String,
        found: usize,
    },

    /// A requested PEM block index does not exist.
    #[error("PEM block {index} requested from {object} in vault {vault}, which has {count} block(s)")]
    PemBlockOutOfRange {
        vault: String,
        object: String,
        index: usize,
        count: usize,
    },

    /// A requested PEM block holds the wrong kind of data.
    #[error("PEM block {index} of {object} in vault {vault} is {found}, expected {expected}")]
    UnexpectedPemBlock {
        vault: String,
        object: String,
        index: usize,
        expected: &'static str,
        found: String,
    },
}

/// A specialized Result type for easykey operations.
pub type EasyKeyResult<T> = std::result::Result<T, EasyKeyError>;

impl EasyKeyError {
    /// Classify a vault failure: 403 is access denied, everything else a fetch error.
    pub(crate) fn from_vault(vault: &str, object: &str, source: ArmError) -> Self {
        let (vault, object) = (vault.to_string(), object.to_string());
        if source.status() == Some(403) {
            Self::AccessDenied {
                vault,
                object,
                source,
            }
        } else {
            Self::Fetch {
                vault,
                object,
                source,
            }
        }
    }

    /// Returns `true` if the vault reported that the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Fetch { source, .. } if source.is_not_found())
    }
}
