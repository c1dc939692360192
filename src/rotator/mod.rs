//! # Rotators
//!
//! One rotator per resource type. A rotator owns the lifecycle of the
//! credentials of its type:
//!
//! - `initialize`: create the credential if it does not exist yet
//! - `rotate`: replace the credential once it enters its rotation window
//! - `inspect`: read-only status report
//!
//! `initialize` and `rotate` never fail: policy rejections, validation
//! failures and backend faults are all reported through the returned
//! [`RotationResult`].

use crate::config::{ManagedResource, OperationSettings, PartialManagedResource};
use crate::provider::{VaultBackend, VaultClientCache};
use crate::rotation::{Clock, InspectionResult, RotationResult};
use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

pub mod lifecycle;
pub mod manual_certificate;
pub mod manual_secret;
pub mod registry;
pub mod ssl_certificate;

pub use manual_certificate::ManualCertificateRotator;
pub use manual_secret::ManualSecretRotator;
pub use registry::RotatorRegistry;
pub use ssl_certificate::{CertificatePolicyError, SslCertificateRotator};

/// Collaborators shared by every rotator of a run
#[derive(Debug, Clone)]
pub struct RotatorContext {
    pub settings: Arc<OperationSettings>,
    pub vaults: Arc<VaultClientCache>,
    pub clock: Arc<dyn Clock>,
}

impl RotatorContext {
    #[must_use]
    pub fn new(
        settings: OperationSettings,
        vaults: Arc<VaultClientCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            vaults,
            clock,
        }
    }

    /// Backend for the vault a resource lives in
    pub async fn vault(&self, resource: &ManagedResource) -> Result<Arc<dyn VaultBackend>> {
        self.vaults.get(&resource.key_vault).await
    }
}

/// Lifecycle contract implemented by every resource type
#[async_trait]
pub trait Rotator: Send + Sync + Debug {
    /// Resource type tag this rotator handles
    fn resource_type(&self) -> &'static str;

    /// Fill type-specific defaults on top of the configuration defaults
    fn apply_defaults(&self, resource: &PartialManagedResource) -> ManagedResource;

    /// Create the credential unless it already exists (or `force` is set)
    async fn initialize(&self, id: &str, resource: &ManagedResource) -> RotationResult;

    /// Replace the credential if it is due (or `force` is set)
    async fn rotate(&self, id: &str, resource: &ManagedResource) -> RotationResult;

    /// Report the current state of the credential
    async fn inspect(&self, id: &str, resource: &ManagedResource) -> Result<InspectionResult>;
}
