//! # Operation Tests
//!
//! Operations driving the registered rotators over a configuration file.

#[cfg(test)]
mod common;

use chrono::Duration;
use common::{at, context, partial, Call, MockConnector, MockVault};
use keyvault_rotator::config::{ConfigurationFile, OperationSettings};
use keyvault_rotator::operation::{build_operation, OperationError, OperationKind};
use keyvault_rotator::provider::{CertificateRequestStatus, VaultClientCache};
use keyvault_rotator::rotator::RotatorRegistry;
use std::sync::Arc;

const CONFIGURATION: &str = r#"{
    "defaults": {
        "keyVault": "vault1",
        "expirationDays": 90,
        "expirationOverlapDays": 30
    },
    "resources": {
        "storage1": { "type": "azure/storage-account" },
        "dbPassword": { "type": "manual/secret" },
        "legacyPassword": { "type": "manual/generic" },
        "appCert": {
            "type": "azure/keyvault/ssl-certificate",
            "certificate": { "subject": "CN=app.company.com", "dnsNames": ["app.company.com"] }
        }
    }
}"#;

fn registry(vault: &Arc<MockVault>, settings: OperationSettings) -> Arc<RotatorRegistry> {
    let context = context(vault, settings, at(2023, 1, 2));
    Arc::new(RotatorRegistry::with_default_rotators(&context))
}

fn configuration() -> ConfigurationFile {
    ConfigurationFile::from_json(CONFIGURATION).expect("configuration should parse")
}

fn targets(ids: &[&str]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}

#[test]
fn test_registry_knows_every_supported_type() {
    let vault = MockVault::new();
    let registry = registry(&vault, OperationSettings::new(false, false));

    assert_eq!(
        registry.resource_types(),
        vec![
            "azure/keyvault/ssl-certificate",
            "manual/certificate",
            "manual/generic",
            "manual/secret",
        ]
    );
    assert!(registry.resolve("azure/storage-account").is_none());
}

#[tokio::test]
async fn test_every_registered_rotator_reports_missing_resources() {
    let vault = MockVault::new();
    let registry = registry(&vault, OperationSettings::new(false, false));

    for resource_type in registry.resource_types() {
        let rotator = registry.resolve(resource_type).expect("registered rotator");
        let resource = rotator.apply_defaults(&partial(resource_type));

        let row = rotator
            .inspect("absent", &resource)
            .await
            .unwrap_or_else(|e| panic!("{resource_type} should inspect: {e:#}"));

        assert_eq!(row.name, "absent");
        assert_eq!(row.resource_type, rotator.resource_type());
        assert!(row.notes.ends_with("not found"), "{resource_type}: {}", row.notes);
        assert!(row.secret_id.is_empty());
    }
    assert!(vault.write_calls().is_empty());
}

#[tokio::test]
async fn test_initialize_skips_unsupported_types_and_continues() {
    let vault = MockVault::new();
    vault.issue_csr(&[7, 7]);
    let settings = OperationSettings::new(false, false).with_secret_values("value", "");
    let operation = build_operation(OperationKind::Initialize, registry(&vault, settings));

    let output = operation
        .run(&configuration(), &targets(&["*"]))
        .await
        .expect("initialize should succeed");

    assert_eq!(output.rotated_resources, vec!["dbPassword", "legacyPassword", "appCert"]);
    assert!(output.csr_artifacts.is_empty());
    assert_eq!(vault.write_calls().len(), 3);
}

#[tokio::test]
async fn test_rotate_respects_resource_filter() {
    let vault = MockVault::new();
    let now = at(2023, 1, 2);
    vault.add_secret("dbPassword", Some(now + Duration::days(1)));
    vault.add_secret("legacyPassword", Some(now + Duration::days(1)));
    let settings = OperationSettings::new(false, false).with_secret_values("value", "");
    let operation = build_operation(OperationKind::Rotate, registry(&vault, settings));

    let output = operation
        .run(&configuration(), &targets(&["legacyPassword", "unknown"]))
        .await
        .expect("rotate should succeed");

    assert_eq!(output.rotated_resources, vec!["legacyPassword"]);
    let written: Vec<Call> = vault.write_calls();
    assert_eq!(written.len(), 1);
    assert!(matches!(&written[0], Call::UpdateSecret { name, .. } if name == "legacyPassword"));
}

#[tokio::test]
async fn test_failed_resource_does_not_stop_the_run() {
    let vault = MockVault::new();
    vault.fail_writes("Key Vault API error: Forbidden");
    let settings = OperationSettings::new(false, false).with_secret_values("value", "");
    let operation = build_operation(OperationKind::Initialize, registry(&vault, settings));

    let output = operation
        .run(&configuration(), &targets(&["dbPassword", "legacyPassword"]))
        .await
        .expect("per-resource failures are not fatal");

    assert!(output.rotated_resources.is_empty());
    assert_eq!(vault.write_calls().len(), 2);
}

#[tokio::test]
async fn test_request_csr_collects_artifacts() {
    let vault = MockVault::new();
    vault.issue_csr(&[1, 2, 3, 4]);
    let operation = build_operation(
        OperationKind::RequestCsr,
        registry(&vault, OperationSettings::new(false, false)),
    );

    let output = operation
        .run(&configuration(), &targets(&["appCert"]))
        .await
        .expect("request-csr should succeed");

    assert_eq!(output.rotated_resources, vec!["appCert"]);
    assert_eq!(output.csr_artifacts.len(), 1);
    assert_eq!(output.csr_artifacts[0].resource, "appCert");
    assert!(output.csr_artifacts[0]
        .csr
        .starts_with("-----BEGIN CERTIFICATE REQUEST-----"));
}

#[tokio::test]
async fn test_request_csr_what_if_has_no_artifacts() {
    let vault = MockVault::new();
    let operation = build_operation(
        OperationKind::RequestCsr,
        registry(&vault, OperationSettings::new(false, true)),
    );

    let output = operation
        .run(&configuration(), &targets(&["appCert"]))
        .await
        .expect("request-csr should succeed");

    assert_eq!(output.rotated_resources, vec!["appCert"]);
    assert!(output.csr_artifacts.is_empty());
    assert!(vault.write_calls().is_empty());
}

#[tokio::test]
async fn test_inspect_reports_in_configuration_order() {
    let vault = MockVault::new();
    let now = at(2023, 1, 2);
    vault.add_secret("dbPassword", Some(now + Duration::days(200)));
    vault.add_certificate("appCert", None);
    vault.set_operation("appCert", CertificateRequestStatus::InProgress, Some(vec![1]));
    let operation = build_operation(
        OperationKind::Inspect,
        registry(&vault, OperationSettings::new(false, false)),
    );

    let output = operation
        .run(&configuration(), &[])
        .await
        .expect("inspect should succeed");

    let rows: Vec<(&str, &str)> = output
        .inspection
        .iter()
        .map(|row| (row.name.as_str(), row.notes.as_str()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("dbPassword", "Secret valid"),
            ("legacyPassword", "Secret not found"),
            ("appCert", "Certificate request started"),
        ]
    );
    assert!(output.rotated_resources.is_empty());
    assert!(vault.write_calls().is_empty());
}

#[tokio::test]
async fn test_manual_secret_requires_exactly_one_target() {
    let vault = MockVault::new();
    let operation = build_operation(
        OperationKind::ManualSecret,
        registry(&vault, OperationSettings::new(true, false)),
    );
    let configuration = configuration();

    for bad in [targets(&[]), targets(&["*"]), targets(&["dbPassword", "legacyPassword"])] {
        let error = operation
            .run(&configuration, &bad)
            .await
            .expect_err("should reject target list");
        assert_eq!(error, OperationError::SingleTargetRequired);
        assert_eq!(
            error.to_string(),
            "Manual secret can only operate on a single resource at a time"
        );
    }

    let error = operation
        .run(&configuration, &targets(&["missing"]))
        .await
        .expect_err("should reject unknown resource");
    assert_eq!(error, OperationError::ResourceNotFound("missing".to_string()));
    assert!(vault.calls().is_empty());
}

#[tokio::test]
async fn test_manual_secret_rotates_single_secret() {
    let vault = MockVault::new();
    vault.add_secret("dbPassword", Some(at(2030, 1, 1)));
    let settings = OperationSettings::new(true, false).with_secret_values("new-value", "");
    let operation = build_operation(OperationKind::ManualSecret, registry(&vault, settings));

    let output = operation
        .run(&configuration(), &targets(&["dbPassword"]))
        .await
        .expect("manual-secret should succeed");

    assert_eq!(output.rotated_resources, vec!["dbPassword"]);
    assert_eq!(vault.secret("dbPassword").map(|s| s.properties.expires_on), Some(Some(at(2023, 4, 2))));
}

#[tokio::test]
async fn test_manual_secret_not_rotated_is_not_an_error() {
    let vault = MockVault::new();
    let settings = OperationSettings::new(false, false).with_secret_values("new-value", "");
    let operation = build_operation(OperationKind::ManualSecret, registry(&vault, settings));

    let output = operation
        .run(&configuration(), &targets(&["dbPassword"]))
        .await
        .expect("unrotated secret is reported, not raised");

    assert!(output.rotated_resources.is_empty());
    assert!(vault.write_calls().is_empty());
}

#[tokio::test]
async fn test_vault_cache_connects_once_per_vault() {
    let vault = MockVault::new();
    let connector = MockConnector::new(Arc::clone(&vault));
    let cache = VaultClientCache::new(connector.clone());

    cache.get("Vault1").await.expect("first connect");
    cache.get("vault1").await.expect("cached");
    cache.get("VAULT1").await.expect("cached");
    cache.get("vault2").await.expect("second vault");

    assert_eq!(connector.connect_count(), 2);
    assert_eq!(cache.len().await, 2);
    assert!(cache.get("  ").await.is_err());
}
