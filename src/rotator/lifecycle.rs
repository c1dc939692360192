//! # Lifecycle Skeleton
//!
//! The "existence check, due check, delegate" flow shared by rotators that
//! write a credential in one step (manual secrets and manual certificates).
//!
//! The variant only supplies its [`WriteAction`]. Everything else, including
//! turning write errors into failed results, happens here once.

use crate::config::ManagedResource;
use crate::provider::VaultBackend;
use crate::rotation::{days_to_expire, should_rotate, RotationContext, RotationResult};
use crate::rotator::RotatorContext;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Kind of vault entry a rotator writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Secret,
    Certificate,
}

impl EntryKind {
    /// Look up the existing entry
    ///
    /// Outer `None`: no entry. Inner `None`: entry without expiry.
    async fn existing_expiry(
        self,
        vault: &dyn VaultBackend,
        secret_name: &str,
    ) -> Result<Option<Option<DateTime<Utc>>>> {
        let expiry = match self {
            Self::Secret => vault
                .get_secret_if_exists(secret_name)
                .await?
                .map(|secret| secret.properties.expires_on),
            Self::Certificate => vault
                .get_certificate_if_exists(secret_name)
                .await?
                .map(|certificate| certificate.properties.expires_on),
        };
        Ok(expiry)
    }
}

/// Everything a write action needs about the resource being processed
#[derive(Debug)]
pub struct WriteRequest<'a> {
    pub id: &'a str,
    pub resource: &'a ManagedResource,
    pub secret_name: String,
    pub vault: Arc<dyn VaultBackend>,
    pub now: DateTime<Utc>,
}

/// Variant-specific write performed once the skeleton decides to act
#[async_trait]
pub trait WriteAction: Send + Sync {
    async fn perform_initialization(&self, request: &WriteRequest<'_>) -> Result<RotationResult>;

    async fn perform_rotation(&self, request: &WriteRequest<'_>) -> Result<RotationResult>;
}

/// Check an effective vault entry name against the Key Vault naming rule
///
/// # Errors
/// Returns an error if the name is empty, too long, or has other characters
/// than alphanumerics and hyphens
pub fn validate_secret_name(secret_name: &str) -> Result<()> {
    let name_regex = Regex::new(r"^[0-9A-Za-z-]{1,127}$")
        .map_err(|e| anyhow::anyhow!("Failed to compile regex: {e}"))?;

    if !name_regex.is_match(secret_name) {
        return Err(anyhow::anyhow!(
            "Secret name '{secret_name}' must be 1-127 characters of alphanumerics and hyphens"
        ));
    }

    Ok(())
}

/// Resolve the entry name and vault of a resource
///
/// Failures are already converted into the result to return.
pub(crate) async fn prepare<'a>(
    context: &RotatorContext,
    id: &'a str,
    resource: &'a ManagedResource,
) -> Result<WriteRequest<'a>, RotationResult> {
    let secret_name = resource.secret_name(id);
    if let Err(e) = validate_secret_name(&secret_name) {
        warn!(resource = %id, "{}", e);
        return Err(RotationResult::failed(id, &e));
    }

    let vault = context
        .vault(resource)
        .await
        .map_err(|e| RotationResult::failed(id, &e))?;

    Ok(WriteRequest {
        id,
        resource,
        secret_name,
        vault,
        now: context.clock.now(),
    })
}

/// Create-if-absent
pub async fn initialize(
    context: &RotatorContext,
    kind: EntryKind,
    action: &dyn WriteAction,
    id: &str,
    resource: &ManagedResource,
) -> RotationResult {
    let request = match prepare(context, id, resource).await {
        Ok(request) => request,
        Err(result) => return result,
    };

    let existing = match kind
        .existing_expiry(request.vault.as_ref(), &request.secret_name)
        .await
        .with_context(|| format!("Failed to look up {}", request.secret_name))
    {
        Ok(existing) => existing,
        Err(e) => return RotationResult::failed(id, &e),
    };

    if existing.is_some() && !context.settings.force {
        debug!(resource = %id, secret.name = %request.secret_name, "Entry exists, skipping initialization");
        return RotationResult::skipped(
            id,
            "Secret already initialized",
            RotationContext::SecretName {
                secret_name: request.secret_name,
            },
        );
    }

    action
        .perform_initialization(&request)
        .await
        .unwrap_or_else(|e| RotationResult::failed(id, &e))
}

/// Rotate-if-due
pub async fn rotate(
    context: &RotatorContext,
    kind: EntryKind,
    action: &dyn WriteAction,
    id: &str,
    resource: &ManagedResource,
) -> RotationResult {
    let request = match prepare(context, id, resource).await {
        Ok(request) => request,
        Err(result) => return result,
    };

    let existing = match kind
        .existing_expiry(request.vault.as_ref(), &request.secret_name)
        .await
        .with_context(|| format!("Failed to look up {}", request.secret_name))
    {
        Ok(existing) => existing,
        Err(e) => return RotationResult::failed(id, &e),
    };

    let Some(expires_on) = existing else {
        return RotationResult::skipped(
            id,
            "Secret was not yet initialized",
            RotationContext::SecretName {
                secret_name: request.secret_name,
            },
        );
    };

    let overlap_days = resource.expiration_overlap_days;
    if !context.settings.force && !should_rotate(expires_on, Some(overlap_days), request.now) {
        debug!(
            resource = %id,
            days_to_expire = ?expires_on.map(|t| days_to_expire(t, request.now)),
            overlap_days,
            "Not in rotation window"
        );
        return RotationResult::skipped(
            id,
            "Not time to rotate yet",
            RotationContext::NotDue {
                expiration: expires_on,
                expiration_overlap_days: overlap_days,
            },
        );
    }

    action
        .perform_rotation(&request)
        .await
        .unwrap_or_else(|e| RotationResult::failed(id, &e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_secret_name() {
        assert!(validate_secret_name("app-db-password").is_ok());
        assert!(validate_secret_name("A1").is_ok());
        assert!(validate_secret_name(&"a".repeat(127)).is_ok());

        assert!(validate_secret_name("").is_err());
        assert!(validate_secret_name(&"a".repeat(128)).is_err());
        assert!(validate_secret_name("has_underscore").is_err());
        assert!(validate_secret_name("has.dot").is_err());
    }
}
