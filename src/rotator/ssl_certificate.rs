//! # Key Vault SSL Certificate Rotator
//!
//! Certificates signed by an external CA, issued in two runs:
//!
//! 1. `initialize` asks Key Vault for a CSR and hands it to the operator
//!    (`RotationContext::Csr`). The private key never leaves the vault.
//! 2. Once the operator has the signed certificate, `rotate` merges it
//!    (trust chain first, then the issued certificate) into the pending
//!    certificate operation.
//!
//! | Call       | Vault state                  | Outcome                              |
//! |------------|------------------------------|--------------------------------------|
//! | initialize | no certificate               | new CSR                              |
//! | initialize | CSR pending, no `force`      | pending CSR returned again           |
//! | initialize | issued, not due, no `force`  | nothing, empty CSR                   |
//! | initialize | issued, due or `force`       | new CSR                              |
//! | rotate     | no certificate               | "No certificate found"               |
//! | rotate     | no CSR pending               | "CSR not generated"                  |
//! | rotate     | CSR pending, not due         | "Not time to rotate yet"             |
//! | rotate     | CSR pending, due or `force`  | merge, thumbprint of new certificate |

use crate::config::{CertificateRequest, ManagedResource, PartialManagedResource};
use crate::constants::{CONTENT_TYPE_PEM, SSL_CERTIFICATE_TYPE};
use crate::provider::pem::csr_to_pem;
use crate::provider::{CertificateOperationState, KeyStrength};
use crate::rotation::{should_rotate, InspectionResult, RotationContext, RotationResult};
use crate::rotator::lifecycle::{prepare, validate_secret_name, WriteRequest};
use crate::rotator::manual_certificate::inspect_certificate;
use crate::rotator::{Rotator, RotatorContext};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

const CSR_IN_PROGRESS: &str = "Certificate request in progress, check for CSR";

/// Reasons a certificate request cannot be built from the configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CertificatePolicyError {
    #[error("Certificate subject is required to request CSR")]
    MissingSubject,
    #[error("Certificate dnsNames must contain at least one name to request CSR")]
    MissingDnsNames,
    #[error("Certificate keyStrength must be 2048, 3072, or 4096")]
    InvalidKeyStrength(u32),
}

/// Validated inputs of a CSR request
#[derive(Debug)]
struct CsrPolicy<'a> {
    subject: &'a str,
    dns_names: &'a [String],
    key_strength: KeyStrength,
}

impl<'a> CsrPolicy<'a> {
    fn from_request(request: Option<&'a CertificateRequest>) -> Result<Self, CertificatePolicyError> {
        let request = request.ok_or(CertificatePolicyError::MissingSubject)?;

        if request.subject.trim().is_empty() {
            return Err(CertificatePolicyError::MissingSubject);
        }
        if request.dns_names.iter().all(|name| name.trim().is_empty()) {
            return Err(CertificatePolicyError::MissingDnsNames);
        }
        let key_strength = KeyStrength::try_from(request.key_strength)
            .map_err(CertificatePolicyError::InvalidKeyStrength)?;

        Ok(Self {
            subject: &request.subject,
            dns_names: &request.dns_names,
            key_strength,
        })
    }
}

#[derive(Debug)]
pub struct SslCertificateRotator {
    context: RotatorContext,
}

impl SslCertificateRotator {
    #[must_use]
    pub fn new(context: RotatorContext) -> Self {
        Self { context }
    }

    fn csr_result(id: &str, rotated: bool, notes: &str, csr: Option<&[u8]>) -> RotationResult {
        RotationResult::new(
            id,
            rotated,
            notes,
            RotationContext::Csr {
                csr: csr.map(csr_to_pem).unwrap_or_default(),
            },
        )
    }

    async fn initialize_inner(&self, request: &WriteRequest<'_>) -> Result<RotationResult> {
        let settings = &self.context.settings;
        let existing = request
            .vault
            .get_certificate_if_exists(&request.secret_name)
            .await
            .with_context(|| format!("Failed to look up certificate {}", request.secret_name))?;

        if let Some(certificate) = existing {
            let due = should_rotate(
                certificate.properties.expires_on,
                Some(request.resource.expiration_overlap_days),
                request.now,
            );
            let operation = request
                .vault
                .check_certificate_request(&request.secret_name)
                .await?;

            if operation.is_started() && !settings.force {
                debug!(resource = %request.id, "Returning pending CSR");
                return Ok(Self::csr_result(
                    request.id,
                    true,
                    CSR_IN_PROGRESS,
                    operation.csr.as_deref(),
                ));
            }

            if !due && !settings.force {
                return Ok(Self::csr_result(request.id, false, "Not time to rotate yet", None));
            }
        }

        self.create_csr(request).await
    }

    async fn create_csr(&self, request: &WriteRequest<'_>) -> Result<RotationResult> {
        let policy = match CsrPolicy::from_request(request.resource.certificate.as_ref()) {
            Ok(policy) => policy,
            Err(e) => {
                warn!(resource = %request.id, "{}", e);
                return Ok(Self::csr_result(request.id, false, &e.to_string(), None));
            }
        };

        if self.context.settings.what_if {
            info!(resource = %request.id, "what-if: would request CSR for {}", request.secret_name);
            return Ok(Self::csr_result(request.id, true, "what-if", None));
        }

        let operation: CertificateOperationState = request
            .vault
            .create_csr(
                &request.secret_name,
                policy.subject,
                policy.key_strength,
                policy.dns_names,
            )
            .await?;

        match operation.csr.as_deref() {
            Some(csr) if !csr.is_empty() => {
                info!(resource = %request.id, "CSR issued for {}", request.secret_name);
                Ok(Self::csr_result(request.id, true, CSR_IN_PROGRESS, Some(csr)))
            }
            _ => Ok(Self::csr_result(
                request.id,
                false,
                "Unknown error getting CSR after create request",
                None,
            )),
        }
    }

    async fn rotate_inner(&self, request: &WriteRequest<'_>) -> Result<RotationResult> {
        let settings = &self.context.settings;
        let Some(certificate) = request
            .vault
            .get_certificate_if_exists(&request.secret_name)
            .await
            .with_context(|| format!("Failed to look up certificate {}", request.secret_name))?
        else {
            return Ok(RotationResult::skipped(
                request.id,
                "No certificate found, initialize first",
                RotationContext::Empty,
            ));
        };

        let due = should_rotate(
            certificate.properties.expires_on,
            Some(request.resource.expiration_overlap_days),
            request.now,
        );
        let operation = request
            .vault
            .check_certificate_request(&request.secret_name)
            .await?;

        if !operation.is_started() {
            return Ok(RotationResult::skipped(
                request.id,
                "CSR not generated, initialize first",
                RotationContext::Empty,
            ));
        }
        if !due && !settings.force {
            return Ok(RotationResult::skipped(
                request.id,
                "Not time to rotate yet, wait for overlap period or try to force",
                RotationContext::NotDue {
                    expiration: certificate.properties.expires_on,
                    expiration_overlap_days: request.resource.expiration_overlap_days,
                },
            ));
        }

        let bundle = match read_certificate_bundle(request.resource.certificate.as_ref()) {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!(resource = %request.id, "{:#}", e);
                return Ok(RotationResult::skipped(
                    request.id,
                    e.to_string(),
                    RotationContext::Error {
                        message: e.to_string(),
                        detail: format!("{e:#}"),
                    },
                ));
            }
        };

        if settings.what_if {
            info!(resource = %request.id, "what-if: would merge certificate into {}", request.secret_name);
            return Ok(RotationResult::rotated(request.id, "what-if", RotationContext::Empty));
        }

        let merged = request
            .vault
            .merge_certificate(&request.secret_name, &bundle)
            .await?;
        info!(resource = %request.id, "Merged signed certificate into {}", request.secret_name);

        Ok(RotationResult::rotated(
            request.id,
            "",
            RotationContext::Merge {
                thumbprint: merged.thumbprint.unwrap_or_default(),
            },
        ))
    }
}

/// Trust chain followed by the issued certificate, as one PEM bundle
fn read_certificate_bundle(request: Option<&CertificateRequest>) -> Result<String> {
    let issued_path = request
        .and_then(|r| r.issued_certificate_path.as_deref())
        .ok_or_else(|| anyhow::anyhow!("Certificate issuedCertificatePath is required to merge"))?;

    let issued = read_pem(issued_path)?;
    if issued.trim().is_empty() {
        anyhow::bail!("Issued certificate file {} is empty", issued_path.display());
    }

    let trust_chain = match request.and_then(|r| r.trust_chain_path.as_deref()) {
        Some(path) => read_pem(path)?,
        None => String::new(),
    };

    let mut bundle = trust_chain;
    if !bundle.is_empty() && !bundle.ends_with('\n') {
        bundle.push('\n');
    }
    bundle.push_str(&issued);
    Ok(bundle)
}

fn read_pem(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read certificate file {}", path.display()))
}

#[async_trait]
impl Rotator for SslCertificateRotator {
    fn resource_type(&self) -> &'static str {
        SSL_CERTIFICATE_TYPE
    }

    fn apply_defaults(&self, resource: &PartialManagedResource) -> ManagedResource {
        let mut managed = ManagedResource::from_partial(resource, CONTENT_TYPE_PEM, false);
        managed.certificate.get_or_insert_with(CertificateRequest::default);
        managed
    }

    async fn initialize(&self, id: &str, resource: &ManagedResource) -> RotationResult {
        let request = match prepare(&self.context, id, resource).await {
            Ok(request) => request,
            Err(result) => return result,
        };

        self.initialize_inner(&request)
            .await
            .unwrap_or_else(|e| RotationResult::failed(id, &e))
    }

    async fn rotate(&self, id: &str, resource: &ManagedResource) -> RotationResult {
        let request = match prepare(&self.context, id, resource).await {
            Ok(request) => request,
            Err(result) => return result,
        };

        self.rotate_inner(&request)
            .await
            .unwrap_or_else(|e| RotationResult::failed(id, &e))
    }

    async fn inspect(&self, id: &str, resource: &ManagedResource) -> Result<InspectionResult> {
        let secret_name = resource.secret_name(id);
        validate_secret_name(&secret_name)?;
        let vault = self.context.vault(resource).await?;

        inspect_certificate(vault.as_ref(), self.resource_type(), id, &secret_name, resource).await
    }
}
