//! # Provider Modules
//!
//! Vault backends the rotators write credentials through.
//!
//! Every backend implements [`VaultBackend`]. Rotators obtain a backend per
//! vault name from the run's [`VaultClientCache`], which asks a
//! [`VaultConnector`] to build one the first time a vault is used.
//!
//! "Exists" queries return `Ok(None)` for a missing entry and only fail on
//! real faults (network, authorization, unexpected API errors).

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::sync::Arc;
use zeroize::Zeroizing;

pub mod azure;
pub mod cache;
pub mod pem;

pub use cache::VaultClientCache;

/// Attributes shared by secrets and certificates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemProperties {
    /// Backend identifier of the current version
    pub id: String,
    pub enabled: bool,
    pub content_type: Option<String>,
    pub created_on: Option<DateTime<Utc>>,
    pub updated_on: Option<DateTime<Utc>>,
    pub expires_on: Option<DateTime<Utc>>,
}

/// A secret stored in the vault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultSecret {
    pub name: String,
    pub properties: ItemProperties,
}

/// A certificate stored in the vault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultCertificate {
    pub name: String,
    /// Hex encoded SHA-1 thumbprint, when the certificate has been issued
    pub thumbprint: Option<String>,
    pub properties: ItemProperties,
}

/// Status of the pending certificate operation for a certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateRequestStatus {
    /// No certificate operation exists
    NotFound,
    /// A CSR was issued and is waiting for the signed certificate
    InProgress,
    Completed,
    Cancelled,
    Failed,
}

/// Snapshot of a certificate operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateOperationState {
    pub status: CertificateRequestStatus,
    /// DER bytes of the signing request, while one is pending
    pub csr: Option<Vec<u8>>,
}

impl CertificateOperationState {
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            status: CertificateRequestStatus::NotFound,
            csr: None,
        }
    }

    /// A CSR has been issued and not yet merged
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.status == CertificateRequestStatus::InProgress
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(
            self.status,
            CertificateRequestStatus::Completed | CertificateRequestStatus::Failed
        )
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status == CertificateRequestStatus::Cancelled
    }
}

/// RSA key sizes a CSR may be requested with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrength {
    Rsa2048,
    Rsa3072,
    Rsa4096,
}

impl KeyStrength {
    #[must_use]
    pub fn bits(self) -> u32 {
        match self {
            Self::Rsa2048 => 2048,
            Self::Rsa3072 => 3072,
            Self::Rsa4096 => 4096,
        }
    }
}

impl TryFrom<u32> for KeyStrength {
    type Error = u32;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            2048 => Ok(Self::Rsa2048),
            3072 => Ok(Self::Rsa3072),
            4096 => Ok(Self::Rsa4096),
            other => Err(other),
        }
    }
}

/// Secret and certificate operations the rotators depend on
#[async_trait]
pub trait VaultBackend: Send + Sync + Debug {
    /// Get a secret's metadata, `None` if it does not exist
    async fn get_secret_if_exists(&self, name: &str) -> Result<Option<VaultSecret>>;

    /// Create or update a secret, producing a new version
    async fn update_secret(
        &self,
        name: &str,
        value: &Zeroizing<String>,
        expires_on: Option<DateTime<Utc>>,
        content_type: Option<&str>,
    ) -> Result<VaultSecret>;

    /// Get a certificate's metadata, `None` if it does not exist
    async fn get_certificate_if_exists(&self, name: &str) -> Result<Option<VaultCertificate>>;

    /// Import a PFX blob as a new certificate version
    async fn import_certificate(
        &self,
        name: &str,
        pfx: &[u8],
        password: Option<&str>,
    ) -> Result<VaultCertificate>;

    /// Read the pending certificate operation, if any
    async fn check_certificate_request(&self, name: &str) -> Result<CertificateOperationState>;

    /// Start a certificate operation that produces a CSR for external signing
    async fn create_csr(
        &self,
        name: &str,
        subject: &str,
        key_strength: KeyStrength,
        dns_names: &[String],
    ) -> Result<CertificateOperationState>;

    /// Merge an externally signed PEM bundle into the pending operation
    async fn merge_certificate(&self, name: &str, pem_bundle: &str) -> Result<VaultCertificate>;
}

/// Builds a backend for a vault name
pub trait VaultConnector: Send + Sync + Debug {
    fn connect(&self, vault_name: &str) -> Result<Arc<dyn VaultBackend>>;
}
