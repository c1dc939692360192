//! # Managed Resources
//!
//! Typed description of one managed credential and its rotation policy.
//!
//! [`PartialManagedResource`] is what the configuration file declares: every
//! field is optional and unset fields fall back to the file's `defaults`.
//! [`ManagedResource`] is the fully-populated record a rotator receives after
//! its own type-specific defaults have been applied.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One credential entry as declared in the configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartialManagedResource {
    /// Resource type tag selecting the rotator (e.g. `manual/secret`)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    /// Display name of the resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Azure resource group holding the resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,
    /// Azure resource group holding the Key Vault (informational)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_vault_resource_group: Option<String>,
    /// Key Vault name (or full `https://` URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_vault: Option<String>,
    /// Prefix prepended to the configuration id to build the vault entry name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_vault_secret_prefix: Option<String>,
    /// Lifetime of a newly written credential, in days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_days: Option<i64>,
    /// Width of the rotation window before expiry, in days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_overlap_days: Option<i64>,
    /// Content type stored alongside the credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Whether the supplied value is base64 and must be decoded before writing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decode_base64: Option<bool>,
    /// Certificate signing request settings (CSR-issued certificates only)
    #[serde(
        default,
        alias = "certificateRequest",
        skip_serializing_if = "Option::is_none"
    )]
    pub certificate: Option<PartialCertificateRequest>,
}

/// Certificate signing request settings as declared in the configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartialCertificateRequest {
    /// X.500 subject, e.g. `CN=app.company.com`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Subject alternative DNS names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_names: Option<Vec<String>>,
    /// RSA key size: 2048, 3072 or 4096
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_strength: Option<u32>,
    /// PEM file holding the issuing CA chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_chain_path: Option<PathBuf>,
    /// PEM file holding the externally signed certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_certificate_path: Option<PathBuf>,
}

impl PartialManagedResource {
    /// Layer `self` on top of `defaults`: every field set on `self` wins.
    #[must_use]
    pub fn merged_over(&self, defaults: &Self) -> Self {
        Self {
            resource_type: self
                .resource_type
                .clone()
                .or_else(|| defaults.resource_type.clone()),
            name: self.name.clone().or_else(|| defaults.name.clone()),
            resource_group: self
                .resource_group
                .clone()
                .or_else(|| defaults.resource_group.clone()),
            key_vault_resource_group: self
                .key_vault_resource_group
                .clone()
                .or_else(|| defaults.key_vault_resource_group.clone()),
            key_vault: self.key_vault.clone().or_else(|| defaults.key_vault.clone()),
            key_vault_secret_prefix: self
                .key_vault_secret_prefix
                .clone()
                .or_else(|| defaults.key_vault_secret_prefix.clone()),
            expiration_days: self.expiration_days.or(defaults.expiration_days),
            expiration_overlap_days: self
                .expiration_overlap_days
                .or(defaults.expiration_overlap_days),
            content_type: self
                .content_type
                .clone()
                .or_else(|| defaults.content_type.clone()),
            decode_base64: self.decode_base64.or(defaults.decode_base64),
            certificate: match (&self.certificate, &defaults.certificate) {
                (Some(own), Some(base)) => Some(own.merged_over(base)),
                (own, base) => own.clone().or_else(|| base.clone()),
            },
        }
    }

    /// Resource type tag, empty when unset
    #[must_use]
    pub fn type_tag(&self) -> &str {
        self.resource_type.as_deref().unwrap_or_default()
    }
}

impl PartialCertificateRequest {
    /// Layer `self` on top of `defaults`: every field set on `self` wins.
    #[must_use]
    pub fn merged_over(&self, defaults: &Self) -> Self {
        Self {
            subject: self.subject.clone().or_else(|| defaults.subject.clone()),
            dns_names: self.dns_names.clone().or_else(|| defaults.dns_names.clone()),
            key_strength: self.key_strength.or(defaults.key_strength),
            trust_chain_path: self
                .trust_chain_path
                .clone()
                .or_else(|| defaults.trust_chain_path.clone()),
            issued_certificate_path: self
                .issued_certificate_path
                .clone()
                .or_else(|| defaults.issued_certificate_path.clone()),
        }
    }
}

/// Fully defaulted credential configuration handed to a rotator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub resource_group: String,
    pub key_vault: String,
    pub key_vault_secret_prefix: String,
    /// `None` means newly written credentials carry no expiry
    pub expiration_days: Option<i64>,
    pub expiration_overlap_days: i64,
    pub content_type: String,
    pub decode_base64: bool,
    pub certificate: Option<CertificateRequest>,
}

impl ManagedResource {
    /// Build the record from a partial one, filling the common fields
    ///
    /// `content_type` and `decode_base64` are the rotator's own defaults and
    /// only apply when the configuration left them unset.
    #[must_use]
    pub fn from_partial(
        resource: &PartialManagedResource,
        content_type: &str,
        decode_base64: bool,
    ) -> Self {
        Self {
            resource_type: resource.resource_type.clone().unwrap_or_default(),
            name: resource.name.clone().unwrap_or_default(),
            resource_group: resource.resource_group.clone().unwrap_or_default(),
            key_vault: resource.key_vault.clone().unwrap_or_default(),
            key_vault_secret_prefix: resource
                .key_vault_secret_prefix
                .clone()
                .unwrap_or_default(),
            expiration_days: resource.expiration_days,
            expiration_overlap_days: resource.expiration_overlap_days.unwrap_or(0),
            content_type: resource
                .content_type
                .clone()
                .unwrap_or_else(|| content_type.to_owned()),
            decode_base64: resource.decode_base64.unwrap_or(decode_base64),
            certificate: resource.certificate.as_ref().map(CertificateRequest::from_partial),
        }
    }

    /// Effective vault entry name: `keyVaultSecretPrefix + configurationId`
    #[must_use]
    pub fn secret_name(&self, configuration_id: &str) -> String {
        format!("{}{configuration_id}", self.key_vault_secret_prefix)
    }
}

/// Fully defaulted certificate signing request settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequest {
    pub subject: String,
    pub dns_names: Vec<String>,
    pub key_strength: u32,
    pub trust_chain_path: Option<PathBuf>,
    pub issued_certificate_path: Option<PathBuf>,
}

impl CertificateRequest {
    #[must_use]
    pub fn from_partial(request: &PartialCertificateRequest) -> Self {
        Self {
            subject: request.subject.clone().unwrap_or_default(),
            dns_names: request.dns_names.clone().unwrap_or_default(),
            key_strength: request
                .key_strength
                .unwrap_or(crate::constants::DEFAULT_KEY_STRENGTH),
            trust_chain_path: request
                .trust_chain_path
                .clone()
                .filter(|p| !p.as_os_str().is_empty()),
            issued_certificate_path: request
                .issued_certificate_path
                .clone()
                .filter(|p| !p.as_os_str().is_empty()),
        }
    }
}

impl Default for CertificateRequest {
    fn default() -> Self {
        Self::from_partial(&PartialCertificateRequest::default())
    }
}
