//! # Manual Secret Rotator
//!
//! Writes an operator-supplied value (`secret_value_1`) into a Key Vault
//! secret. Handles `manual/secret` and its legacy alias `manual/generic`.

use crate::config::{ManagedResource, PartialManagedResource};
use crate::constants::{CONTENT_TYPE_TEXT, MANUAL_SECRET_TYPE};
use crate::rotation::{should_rotate, InspectionResult, RotationContext, RotationResult};
use crate::rotator::lifecycle::{self, validate_secret_name, EntryKind, WriteAction, WriteRequest};
use crate::rotator::{Rotator, RotatorContext};
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use tracing::info;
use zeroize::Zeroizing;

#[derive(Debug)]
pub struct ManualSecretRotator {
    context: RotatorContext,
}

impl ManualSecretRotator {
    #[must_use]
    pub fn new(context: RotatorContext) -> Self {
        Self { context }
    }

    /// Expiry of a value written at `now`, if the resource sets a lifetime
    fn new_expiration(resource: &ManagedResource, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        resource
            .expiration_days
            .map(|days| now + Duration::days(days))
    }

    /// The configured value, base64-decoded when the resource asks for it
    fn secret_value(&self, resource: &ManagedResource) -> Result<Zeroizing<String>> {
        let value = &self.context.settings.secret_value_1;
        if !resource.decode_base64 {
            return Ok(value.clone());
        }

        let bytes = Zeroizing::new(
            general_purpose::STANDARD
                .decode(value.trim())
                .context("Secret value is not valid base64")?,
        );
        let decoded = std::str::from_utf8(&bytes).context("Decoded secret value is not UTF-8")?;
        Ok(Zeroizing::new(decoded.to_owned()))
    }

    async fn write_secret(&self, request: &WriteRequest<'_>) -> Result<RotationResult> {
        let expiration = Self::new_expiration(request.resource, request.now);
        let value = self.secret_value(request.resource)?;

        if self.context.settings.what_if {
            info!(resource = %request.id, "what-if: would write secret {}", request.secret_name);
            return Ok(RotationResult::rotated(
                request.id,
                "what-if",
                RotationContext::WhatIf { expiration },
            ));
        }

        let content_type = Some(request.resource.content_type.as_str()).filter(|c| !c.is_empty());
        let secret = request
            .vault
            .update_secret(&request.secret_name, &value, expiration, content_type)
            .await?;

        Ok(RotationResult::rotated(
            request.id,
            "",
            RotationContext::Written {
                id: secret.properties.id,
                expiration: secret.properties.expires_on.or(expiration),
            },
        ))
    }
}

#[async_trait]
impl WriteAction for ManualSecretRotator {
    async fn perform_initialization(&self, request: &WriteRequest<'_>) -> Result<RotationResult> {
        self.write_secret(request).await
    }

    async fn perform_rotation(&self, request: &WriteRequest<'_>) -> Result<RotationResult> {
        self.write_secret(request).await
    }
}

#[async_trait]
impl Rotator for ManualSecretRotator {
    fn resource_type(&self) -> &'static str {
        MANUAL_SECRET_TYPE
    }

    fn apply_defaults(&self, resource: &PartialManagedResource) -> ManagedResource {
        ManagedResource::from_partial(resource, CONTENT_TYPE_TEXT, false)
    }

    async fn initialize(&self, id: &str, resource: &ManagedResource) -> RotationResult {
        lifecycle::initialize(&self.context, EntryKind::Secret, self, id, resource).await
    }

    async fn rotate(&self, id: &str, resource: &ManagedResource) -> RotationResult {
        lifecycle::rotate(&self.context, EntryKind::Secret, self, id, resource).await
    }

    async fn inspect(&self, id: &str, resource: &ManagedResource) -> Result<InspectionResult> {
        let secret_name = resource.secret_name(id);
        validate_secret_name(&secret_name)?;
        let vault = self.context.vault(resource).await?;

        let Some(secret) = vault.get_secret_if_exists(&secret_name).await? else {
            return Ok(InspectionResult::missing(
                id,
                self.resource_type(),
                &resource.name,
                "Secret not found",
            ));
        };

        let properties = secret.properties;
        let notes = if !properties.enabled {
            "Secret disabled"
        } else if should_rotate(
            properties.expires_on,
            Some(resource.expiration_overlap_days),
            self.context.clock.now(),
        ) {
            "Secret due for rotation"
        } else {
            "Secret valid"
        };

        Ok(InspectionResult {
            name: id.to_owned(),
            resource_type: self.resource_type().to_owned(),
            secret_id: properties.id,
            resource_id: resource.name.clone(),
            notes: notes.to_owned(),
            updated_on: properties.updated_on,
            expires_on: properties.expires_on,
        })
    }
}
