//! # SSL Certificate Rotator Tests
//!
//! The two-phase CSR flow: `initialize` hands out a CSR, `rotate` merges
//! the externally signed certificate back in.

#[cfg(test)]
mod common;

use chrono::Duration;
use common::{at, context, partial, with_policy, Call, MockVault};
use keyvault_rotator::config::{ManagedResource, OperationSettings, PartialCertificateRequest};
use keyvault_rotator::constants::SSL_CERTIFICATE_TYPE;
use keyvault_rotator::provider::CertificateRequestStatus;
use keyvault_rotator::rotation::RotationContext;
use keyvault_rotator::rotator::{Rotator, SslCertificateRotator};
use std::io::Write;
use std::path::PathBuf;

const CSR_PEM: &str = "-----BEGIN CERTIFICATE REQUEST-----\nAQIDBA==\n-----END CERTIFICATE REQUEST-----";
const CHAIN_PEM: &str = "-----BEGIN CERTIFICATE-----\nQ0E=\n-----END CERTIFICATE-----\n";
const ISSUED_PEM: &str = "-----BEGIN CERTIFICATE-----\nTEVBRg==\n-----END CERTIFICATE-----\n";

fn certificate_resource(rotator: &SslCertificateRotator, overlap_days: i64) -> ManagedResource {
    let mut resource = partial(SSL_CERTIFICATE_TYPE);
    resource.certificate = Some(PartialCertificateRequest {
        subject: Some("CN=app.company.com".to_string()),
        dns_names: Some(vec!["app.company.com".to_string()]),
        ..Default::default()
    });
    with_policy(rotator.apply_defaults(&resource), None, overlap_days)
}

fn rotator(vault: &std::sync::Arc<MockVault>, force: bool, what_if: bool, now: chrono::DateTime<chrono::Utc>) -> SslCertificateRotator {
    SslCertificateRotator::new(context(vault, OperationSettings::new(force, what_if), now))
}

fn pem_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write pem");
    file
}

fn create_csr_calls(vault: &MockVault) -> usize {
    vault
        .calls()
        .iter()
        .filter(|call| matches!(call, Call::CreateCsr { .. }))
        .count()
}

#[tokio::test]
async fn test_defaults_for_csr_certificates() {
    let vault = MockVault::new();
    let rotator = rotator(&vault, false, false, at(2023, 1, 2));

    let resource = rotator.apply_defaults(&partial(SSL_CERTIFICATE_TYPE));

    assert_eq!(resource.content_type, "application/x-pem-file");
    assert!(!resource.decode_base64);
    let certificate = resource.certificate.expect("certificate settings are defaulted");
    assert_eq!(certificate.key_strength, 2048);
    assert!(certificate.subject.is_empty());
}

#[tokio::test]
async fn test_initialize_requests_csr_for_new_certificate() {
    let vault = MockVault::new();
    vault.issue_csr(&[1, 2, 3, 4]);
    let rotator = rotator(&vault, false, false, at(2023, 1, 2));
    let resource = certificate_resource(&rotator, 60);

    let result = rotator.initialize("app-cert", &resource).await;

    assert!(result.rotated, "notes: {}", result.notes);
    assert_eq!(result.context.csr(), Some(CSR_PEM));
    assert_eq!(
        vault.write_calls(),
        vec![Call::CreateCsr {
            name: "app-cert".to_string(),
            subject: "CN=app.company.com".to_string(),
            key_strength: 2048,
            dns_names: vec!["app.company.com".to_string()],
        }]
    );
}

#[tokio::test]
async fn test_initialize_due_certificate_issues_csr_once() {
    let vault = MockVault::new();
    vault.add_certificate("app-cert", Some(at(2023, 2, 2)));
    vault.set_operation("app-cert", CertificateRequestStatus::Completed, None);
    vault.issue_csr(&[1, 2, 3, 4]);
    let rotator = rotator(&vault, false, false, at(2023, 1, 2));
    let resource = certificate_resource(&rotator, 60);

    let first = rotator.initialize("app-cert", &resource).await;
    assert!(first.rotated);
    assert_eq!(first.context.csr(), Some(CSR_PEM));

    let second = rotator.initialize("app-cert", &resource).await;
    assert!(second.rotated);
    assert_eq!(second.notes, "Certificate request in progress, check for CSR");
    assert_eq!(second.context.csr(), Some(CSR_PEM));

    assert_eq!(create_csr_calls(&vault), 1);
}

#[tokio::test]
async fn test_initialize_not_due_returns_empty_csr() {
    let vault = MockVault::new();
    vault.add_certificate("app-cert", Some(at(2023, 2, 2)));
    vault.set_operation("app-cert", CertificateRequestStatus::Completed, None);
    let rotator = rotator(&vault, false, false, at(2022, 5, 2));
    let resource = certificate_resource(&rotator, 60);

    let result = rotator.initialize("app-cert", &resource).await;

    assert!(!result.rotated);
    assert_eq!(result.notes, "Not time to rotate yet");
    assert_eq!(result.context.csr(), Some(""));
    assert_eq!(create_csr_calls(&vault), 0);
}

#[tokio::test]
async fn test_initialize_force_requests_csr_even_if_pending() {
    let vault = MockVault::new();
    vault.add_certificate("app-cert", None);
    vault.set_operation("app-cert", CertificateRequestStatus::InProgress, Some(vec![9]));
    vault.issue_csr(&[1, 2, 3, 4]);
    let rotator = rotator(&vault, true, false, at(2023, 1, 2));
    let resource = certificate_resource(&rotator, 60);

    let result = rotator.initialize("app-cert", &resource).await;

    assert!(result.rotated);
    assert_eq!(result.context.csr(), Some(CSR_PEM));
    assert_eq!(create_csr_calls(&vault), 1);
}

#[tokio::test]
async fn test_initialize_rejects_invalid_policy_before_writing() {
    let vault = MockVault::new();
    let rotator = rotator(&vault, false, false, at(2023, 1, 2));
    let base = certificate_resource(&rotator, 60);

    let mut no_subject = base.clone();
    if let Some(certificate) = no_subject.certificate.as_mut() {
        certificate.subject = String::new();
    }
    let mut no_dns = base.clone();
    if let Some(certificate) = no_dns.certificate.as_mut() {
        certificate.dns_names.clear();
    }
    let mut weak_key = base;
    if let Some(certificate) = weak_key.certificate.as_mut() {
        certificate.key_strength = 1024;
    }

    let cases = [
        (no_subject, "Certificate subject is required to request CSR"),
        (no_dns, "Certificate dnsNames must contain at least one name to request CSR"),
        (weak_key, "Certificate keyStrength must be 2048, 3072, or 4096"),
    ];
    for (resource, notes) in cases {
        let result = rotator.initialize("app-cert", &resource).await;
        assert!(!result.rotated);
        assert_eq!(result.notes, notes);
        assert_eq!(result.context.csr(), Some(""));
    }

    assert!(vault.write_calls().is_empty());
}

#[tokio::test]
async fn test_initialize_what_if_does_not_request_csr() {
    let vault = MockVault::new();
    let rotator = rotator(&vault, false, true, at(2023, 1, 2));
    let resource = certificate_resource(&rotator, 60);

    let result = rotator.initialize("app-cert", &resource).await;

    assert!(result.rotated);
    assert_eq!(result.notes, "what-if");
    assert!(vault.write_calls().is_empty());
}

#[tokio::test]
async fn test_initialize_without_csr_in_response_is_reported() {
    let vault = MockVault::new();
    let rotator = rotator(&vault, false, false, at(2023, 1, 2));
    let resource = certificate_resource(&rotator, 60);

    let result = rotator.initialize("app-cert", &resource).await;

    assert!(!result.rotated);
    assert_eq!(result.notes, "Unknown error getting CSR after create request");
}

#[tokio::test]
async fn test_rotate_requires_certificate_and_pending_csr() {
    let vault = MockVault::new();
    let rotator = rotator(&vault, true, false, at(2023, 1, 2));
    let resource = certificate_resource(&rotator, 60);

    let missing = rotator.rotate("app-cert", &resource).await;
    assert!(!missing.rotated);
    assert_eq!(missing.notes, "No certificate found, initialize first");

    vault.add_certificate("app-cert", Some(at(2023, 2, 2)));
    vault.set_operation("app-cert", CertificateRequestStatus::Completed, None);
    let not_started = rotator.rotate("app-cert", &resource).await;
    assert!(!not_started.rotated);
    assert_eq!(not_started.notes, "CSR not generated, initialize first");

    assert!(vault.write_calls().is_empty());
}

#[tokio::test]
async fn test_rotate_waits_for_overlap_window() {
    let vault = MockVault::new();
    vault.add_certificate("app-cert", Some(at(2023, 2, 2)));
    vault.set_operation("app-cert", CertificateRequestStatus::InProgress, Some(vec![1, 2, 3, 4]));
    let rotator = rotator(&vault, false, false, at(2022, 5, 2));
    let resource = certificate_resource(&rotator, 60);

    let result = rotator.rotate("app-cert", &resource).await;

    assert!(!result.rotated);
    assert_eq!(
        result.notes,
        "Not time to rotate yet, wait for overlap period or try to force"
    );
    assert!(vault.write_calls().is_empty());
}

#[tokio::test]
async fn test_rotate_merges_chain_and_issued_certificate() {
    let vault = MockVault::new();
    vault.add_certificate("app-cert", Some(at(2023, 2, 2)));
    vault.set_operation("app-cert", CertificateRequestStatus::InProgress, Some(vec![1, 2, 3, 4]));
    vault.merge_thumbprint("A1B2C3");
    let chain = pem_file(CHAIN_PEM);
    let issued = pem_file(ISSUED_PEM);

    let rotator = rotator(&vault, false, false, at(2023, 1, 2));
    let mut resource = certificate_resource(&rotator, 60);
    if let Some(certificate) = resource.certificate.as_mut() {
        certificate.trust_chain_path = Some(chain.path().to_path_buf());
        certificate.issued_certificate_path = Some(issued.path().to_path_buf());
    }

    let result = rotator.rotate("app-cert", &resource).await;

    assert!(result.rotated, "notes: {}", result.notes);
    assert_eq!(result.context.thumbprint(), Some("A1B2C3"));
    assert_eq!(
        vault.write_calls(),
        vec![Call::MergeCertificate {
            name: "app-cert".to_string(),
            pem_bundle: format!("{CHAIN_PEM}{ISSUED_PEM}"),
        }]
    );
}

#[tokio::test]
async fn test_rotate_first_issuance_needs_force() {
    let vault = MockVault::new();
    vault.add_certificate("app-cert", None);
    vault.set_operation("app-cert", CertificateRequestStatus::InProgress, Some(vec![1, 2, 3, 4]));
    vault.merge_thumbprint("FIRST");
    let issued = pem_file(ISSUED_PEM);

    let mut resource = certificate_resource(&rotator(&vault, false, false, at(2023, 1, 2)), 60);
    if let Some(certificate) = resource.certificate.as_mut() {
        certificate.issued_certificate_path = Some(issued.path().to_path_buf());
    }

    let unforced = rotator(&vault, false, false, at(2023, 1, 2))
        .rotate("app-cert", &resource)
        .await;
    assert!(!unforced.rotated);

    let forced = rotator(&vault, true, false, at(2023, 1, 2))
        .rotate("app-cert", &resource)
        .await;
    assert!(forced.rotated, "notes: {}", forced.notes);
    assert_eq!(forced.context.thumbprint(), Some("FIRST"));
}

#[tokio::test]
async fn test_rotate_rejects_missing_or_empty_certificate_files() {
    let vault = MockVault::new();
    vault.add_certificate("app-cert", Some(at(2023, 2, 2)));
    vault.set_operation("app-cert", CertificateRequestStatus::InProgress, Some(vec![1]));
    let empty = pem_file("");
    let rotator = rotator(&vault, false, false, at(2023, 1, 2));

    let cases = [
        None,
        Some(PathBuf::from("/nonexistent/issued.pem")),
        Some(empty.path().to_path_buf()),
    ];
    for issued_path in cases {
        let mut resource = certificate_resource(&rotator, 60);
        if let Some(certificate) = resource.certificate.as_mut() {
            certificate.issued_certificate_path = issued_path.clone();
        }

        let result = rotator.rotate("app-cert", &resource).await;
        assert!(!result.rotated, "path {issued_path:?}");
        assert!(matches!(result.context, RotationContext::Error { .. }));
    }

    assert!(vault.write_calls().is_empty());
}

#[tokio::test]
async fn test_rotate_what_if_skips_merge() {
    let vault = MockVault::new();
    vault.add_certificate("app-cert", Some(at(2023, 1, 1)));
    vault.set_operation("app-cert", CertificateRequestStatus::InProgress, Some(vec![1]));
    let issued = pem_file(ISSUED_PEM);
    let rotator = rotator(&vault, false, true, at(2023, 1, 2));
    let mut resource = certificate_resource(&rotator, 0);
    if let Some(certificate) = resource.certificate.as_mut() {
        certificate.issued_certificate_path = Some(issued.path().to_path_buf());
    }

    let result = rotator.rotate("app-cert", &resource).await;

    assert!(result.rotated);
    assert_eq!(result.context, RotationContext::Empty);
    assert!(vault.write_calls().is_empty());
}

#[tokio::test]
async fn test_expiry_within_window_is_due() {
    let now = at(2023, 1, 2);
    let vault = MockVault::new();
    vault.add_certificate("app-cert", Some(now + Duration::days(29) + Duration::hours(23)));
    vault.set_operation("app-cert", CertificateRequestStatus::Completed, None);
    vault.issue_csr(&[5, 6]);
    let rotator = rotator(&vault, false, false, now);

    let result = rotator
        .initialize("app-cert", &certificate_resource(&rotator, 30))
        .await;

    assert!(result.rotated);
    assert_eq!(create_csr_calls(&vault), 1);
}
