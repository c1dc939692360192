//! Key Vault REST API request/response payloads (api-version 7.4).
//!
//! References:
//! - [Key Vault REST API](https://learn.microsoft.com/rest/api/keyvault/)

use crate::constants::{
    CONTENT_TYPE_PEM, CONTENT_TYPE_PKCS12, CSR_VALIDITY_MONTHS, EKU_SERVER_AUTH, UNKNOWN_ISSUER,
};
use crate::provider::{CertificateOperationState, CertificateRequestStatus, ItemProperties, KeyStrength};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Response Structures
// ============================================================================

/// Management attributes of a secret or certificate (Unix timestamps)
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Attributes {
    pub enabled: Option<bool>,
    pub exp: Option<i64>,
    pub created: Option<i64>,
    pub updated: Option<i64>,
}

/// `SecretBundle`; the value itself is deliberately not deserialized
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SecretBundle {
    pub id: Option<String>,
    pub content_type: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
}

/// `CertificateBundle`
#[derive(Debug, Deserialize)]
pub(crate) struct CertificateBundle {
    pub id: Option<String>,
    /// Base64url SHA-1 thumbprint
    pub x5t: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
}

/// `CertificateOperation`
#[derive(Debug, Deserialize)]
pub(crate) struct CertificateOperation {
    /// Base64 DER signing request
    pub csr: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub cancellation_requested: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KeyVaultErrorResponse {
    pub error: KeyVaultError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KeyVaultError {
    pub code: String,
    pub message: String,
}

// ============================================================================
// Request Structures
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SetSecretRequest<'a> {
    pub value: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<&'a str>,
    pub attributes: SecretAttributesRequest,
}

#[derive(Debug, Serialize)]
pub(crate) struct SecretAttributesRequest {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImportCertificateRequest {
    /// Base64 PFX
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pwd: Option<String>,
    pub policy: CertificatePolicy,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateCertificateRequest {
    pub policy: CertificatePolicy,
}

#[derive(Debug, Serialize)]
pub(crate) struct MergeCertificateRequest {
    pub x5c: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CertificatePolicy {
    pub key_props: KeyProperties,
    pub secret_props: SecretProperties,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x509_props: Option<X509Properties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<IssuerParameters>,
}

#[derive(Debug, Serialize)]
pub(crate) struct KeyProperties {
    pub exportable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kty: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reuse_key: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SecretProperties {
    pub content_type: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct X509Properties {
    pub subject: String,
    pub sans: SubjectAlternativeNames,
    pub ekus: Vec<&'static str>,
    pub key_usage: Vec<&'static str>,
    pub validity_months: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubjectAlternativeNames {
    pub dns_names: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct IssuerParameters {
    pub name: &'static str,
    pub cert_transparency: bool,
}

impl CertificatePolicy {
    /// Policy for a PFX import: exportable key, PKCS#12 content
    pub fn for_import() -> Self {
        Self {
            key_props: KeyProperties {
                exportable: true,
                kty: None,
                key_size: None,
                reuse_key: None,
            },
            secret_props: SecretProperties {
                content_type: CONTENT_TYPE_PKCS12,
            },
            x509_props: None,
            issuer: None,
        }
    }

    /// Policy for an externally signed TLS server certificate
    pub fn for_csr(subject: &str, key_strength: KeyStrength, dns_names: &[String]) -> Self {
        Self {
            key_props: KeyProperties {
                exportable: true,
                kty: Some("RSA"),
                key_size: Some(key_strength.bits()),
                reuse_key: Some(true),
            },
            secret_props: SecretProperties {
                content_type: CONTENT_TYPE_PEM,
            },
            x509_props: Some(X509Properties {
                subject: subject.to_owned(),
                sans: SubjectAlternativeNames {
                    dns_names: dns_names.to_vec(),
                },
                ekus: vec![EKU_SERVER_AUTH],
                key_usage: vec!["keyEncipherment", "dataEncipherment"],
                validity_months: CSR_VALIDITY_MONTHS,
            }),
            issuer: Some(IssuerParameters {
                name: UNKNOWN_ISSUER,
                cert_transparency: true,
            }),
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

fn timestamp(seconds: Option<i64>) -> Option<DateTime<Utc>> {
    seconds.and_then(|s| DateTime::from_timestamp(s, 0))
}

impl Attributes {
    pub fn to_properties(&self, id: Option<&str>, content_type: Option<&str>) -> ItemProperties {
        ItemProperties {
            id: id.unwrap_or_default().to_owned(),
            enabled: self.enabled.unwrap_or(true),
            content_type: content_type.map(str::to_owned),
            created_on: timestamp(self.created),
            updated_on: timestamp(self.updated),
            expires_on: timestamp(self.exp),
        }
    }
}

impl CertificateOperation {
    pub fn to_state(&self) -> CertificateOperationState {
        let status = match self.status.as_deref().map(str::to_ascii_lowercase).as_deref() {
            _ if self.cancellation_requested => CertificateRequestStatus::Cancelled,
            Some("inprogress") => CertificateRequestStatus::InProgress,
            Some("completed") => CertificateRequestStatus::Completed,
            Some("cancelled") => CertificateRequestStatus::Cancelled,
            _ => CertificateRequestStatus::Failed,
        };
        let csr = self
            .csr
            .as_deref()
            .and_then(|csr| general_purpose::STANDARD.decode(csr).ok());

        CertificateOperationState { status, csr }
    }
}
