//! # Manual Certificate Rotator
//!
//! Imports an operator-supplied PFX (`secret_value_1`, base64 by default)
//! into a Key Vault certificate. `secret_value_2`, when set, is the PFX
//! password.

use crate::config::{ManagedResource, PartialManagedResource};
use crate::constants::{CONTENT_TYPE_PKCS12, MANUAL_CERTIFICATE_TYPE};
use crate::provider::{VaultBackend, VaultCertificate};
use crate::rotation::{InspectionResult, RotationContext, RotationResult};
use crate::rotator::lifecycle::{self, validate_secret_name, EntryKind, WriteAction, WriteRequest};
use crate::rotator::{Rotator, RotatorContext};
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use tracing::info;
use zeroize::Zeroizing;

#[derive(Debug)]
pub struct ManualCertificateRotator {
    context: RotatorContext,
}

impl ManualCertificateRotator {
    #[must_use]
    pub fn new(context: RotatorContext) -> Self {
        Self { context }
    }

    fn pfx_bytes(&self, resource: &ManagedResource) -> Result<Zeroizing<Vec<u8>>> {
        let value = &self.context.settings.secret_value_1;
        if resource.decode_base64 {
            let bytes = general_purpose::STANDARD
                .decode(value.trim())
                .context("Certificate value is not valid base64")?;
            Ok(Zeroizing::new(bytes))
        } else {
            Ok(Zeroizing::new(value.as_bytes().to_vec()))
        }
    }

    async fn import(&self, request: &WriteRequest<'_>) -> Result<RotationResult> {
        let pfx = self.pfx_bytes(request.resource)?;

        if self.context.settings.what_if {
            info!(resource = %request.id, "what-if: would import certificate {}", request.secret_name);
            return Ok(RotationResult::rotated(
                request.id,
                "what-if",
                RotationContext::WhatIf { expiration: None },
            ));
        }

        let password = Some(self.context.settings.secret_value_2.as_str()).filter(|p| !p.is_empty());
        let certificate = request
            .vault
            .import_certificate(&request.secret_name, &pfx, password)
            .await?;

        Ok(RotationResult::rotated(
            request.id,
            "",
            RotationContext::Written {
                id: certificate.properties.id,
                expiration: certificate.properties.expires_on,
            },
        ))
    }
}

#[async_trait]
impl WriteAction for ManualCertificateRotator {
    async fn perform_initialization(&self, request: &WriteRequest<'_>) -> Result<RotationResult> {
        self.import(request).await
    }

    async fn perform_rotation(&self, request: &WriteRequest<'_>) -> Result<RotationResult> {
        self.import(request).await
    }
}

#[async_trait]
impl Rotator for ManualCertificateRotator {
    fn resource_type(&self) -> &'static str {
        MANUAL_CERTIFICATE_TYPE
    }

    fn apply_defaults(&self, resource: &PartialManagedResource) -> ManagedResource {
        ManagedResource::from_partial(resource, CONTENT_TYPE_PKCS12, true)
    }

    async fn initialize(&self, id: &str, resource: &ManagedResource) -> RotationResult {
        lifecycle::initialize(&self.context, EntryKind::Certificate, self, id, resource).await
    }

    async fn rotate(&self, id: &str, resource: &ManagedResource) -> RotationResult {
        lifecycle::rotate(&self.context, EntryKind::Certificate, self, id, resource).await
    }

    async fn inspect(&self, id: &str, resource: &ManagedResource) -> Result<InspectionResult> {
        let secret_name = resource.secret_name(id);
        validate_secret_name(&secret_name)?;
        let vault = self.context.vault(resource).await?;

        inspect_certificate(vault.as_ref(), self.resource_type(), id, &secret_name, resource).await
    }
}

/// Status report shared by both certificate rotators
pub(crate) async fn inspect_certificate(
    vault: &dyn VaultBackend,
    resource_type: &str,
    id: &str,
    secret_name: &str,
    resource: &ManagedResource,
) -> Result<InspectionResult> {
    let Some(certificate) = vault.get_certificate_if_exists(secret_name).await? else {
        return Ok(InspectionResult::missing(
            id,
            resource_type,
            &resource.name,
            "Certificate not found",
        ));
    };

    let status = vault.check_certificate_request(secret_name).await?;
    let notes = certificate_notes(&certificate, status.is_started(), status.is_completed(), status.is_cancelled());

    let VaultCertificate { properties, .. } = certificate;
    Ok(InspectionResult {
        name: id.to_owned(),
        resource_type: resource_type.to_owned(),
        secret_id: properties.id,
        resource_id: resource.name.clone(),
        notes: notes.to_owned(),
        updated_on: properties.updated_on,
        expires_on: properties.expires_on,
    })
}

fn certificate_notes(
    certificate: &VaultCertificate,
    started: bool,
    completed: bool,
    cancelled: bool,
) -> &'static str {
    if started {
        "Certificate request started"
    } else if completed && certificate.properties.enabled {
        "Certificate valid"
    } else if completed {
        "Certificate expired or disabled"
    } else if cancelled {
        "Certificate cancelled"
    } else if certificate.properties.enabled {
        // imported certificates have no pending operation
        "Certificate valid"
    } else {
        "Certificate expired or disabled"
    }
}
