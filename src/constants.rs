//! # Constants
//!
//! Shared constants used throughout the rotator.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or command-line flags where applicable.

/// Resource type tag for manually supplied secrets
pub const MANUAL_SECRET_TYPE: &str = "manual/secret";

/// Legacy resource type tag for manually supplied secrets
pub const MANUAL_GENERIC_TYPE: &str = "manual/generic";

/// Resource type tag for manually supplied PFX certificates
pub const MANUAL_CERTIFICATE_TYPE: &str = "manual/certificate";

/// Resource type tag for Key Vault certificates issued through a CSR
pub const SSL_CERTIFICATE_TYPE: &str = "azure/keyvault/ssl-certificate";

/// Default content type for plain secrets
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

/// Default content type for PFX certificate blobs
pub const CONTENT_TYPE_PKCS12: &str = "application/x-pkcs12";

/// Default content type for PEM certificates
pub const CONTENT_TYPE_PEM: &str = "application/x-pem-file";

/// Default RSA key size for certificate signing requests
pub const DEFAULT_KEY_STRENGTH: u32 = 2048;

/// Validity of certificates requested through a CSR (months)
pub const CSR_VALIDITY_MONTHS: u32 = 12;

/// Extended key usage OID for TLS server authentication
pub const EKU_SERVER_AUTH: &str = "1.3.6.1.5.5.7.3.1";

/// Issuer name Key Vault uses for externally signed certificates
pub const UNKNOWN_ISSUER: &str = "Unknown";

/// Default Key Vault DNS suffix (public cloud)
pub const DEFAULT_VAULT_DNS_SUFFIX: &str = "vault.azure.net";

/// Key Vault REST API version
pub const KEY_VAULT_API_VERSION: &str = "7.4";

/// OAuth scope requested for Key Vault data plane access
pub const KEY_VAULT_SCOPE: &str = "https://vault.azure.net/.default";

/// Output name carrying the comma separated list of rotated resources
pub const ROTATED_RESOURCES_OUTPUT: &str = "rotated-resources";

/// Wildcard selecting every configured resource
pub const ALL_RESOURCES: &str = "*";

/// Milliseconds in one day, the unit of every expiration setting
pub const MILLIS_PER_DAY: i64 = 86_400_000;
