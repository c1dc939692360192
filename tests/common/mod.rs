//! Common test utilities for rotator integration tests
//!
//! Provides an in-memory vault that records every backend call, a connector
//! handing it out, and helpers to build rotator contexts pinned to a fixed
//! clock.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use keyvault_rotator::config::{ManagedResource, OperationSettings, PartialManagedResource};
use keyvault_rotator::provider::{
    CertificateOperationState, CertificateRequestStatus, ItemProperties, KeyStrength, VaultBackend,
    VaultCertificate, VaultClientCache, VaultConnector, VaultSecret,
};
use keyvault_rotator::rotation::FixedClock;
use keyvault_rotator::rotator::RotatorContext;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use zeroize::Zeroizing;

/// One recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetSecret(String),
    UpdateSecret {
        name: String,
        value: String,
        expires_on: Option<DateTime<Utc>>,
        content_type: Option<String>,
    },
    GetCertificate(String),
    ImportCertificate {
        name: String,
        pfx: Vec<u8>,
        password: Option<String>,
    },
    CheckCertificateRequest(String),
    CreateCsr {
        name: String,
        subject: String,
        key_strength: u32,
        dns_names: Vec<String>,
    },
    MergeCertificate {
        name: String,
        pem_bundle: String,
    },
}

impl Call {
    /// Whether the call changes the vault
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::UpdateSecret { .. }
                | Self::ImportCertificate { .. }
                | Self::CreateCsr { .. }
                | Self::MergeCertificate { .. }
        )
    }
}

#[derive(Debug, Default)]
struct MockState {
    secrets: HashMap<String, VaultSecret>,
    certificates: HashMap<String, VaultCertificate>,
    operations: HashMap<String, CertificateOperationState>,
    calls: Vec<Call>,
    csr_to_issue: Vec<u8>,
    merge_thumbprint: String,
    failure: Option<String>,
    versions: usize,
}

/// In-memory vault recording every call
#[derive(Debug, Default)]
pub struct MockVault {
    state: Mutex<MockState>,
}

pub fn properties(name: &str, enabled: bool, expires_on: Option<DateTime<Utc>>) -> ItemProperties {
    ItemProperties {
        id: format!("https://mock.vault.azure.net/items/{name}/0"),
        enabled,
        content_type: None,
        created_on: None,
        updated_on: Some(Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap()),
        expires_on,
    }
}

impl MockVault {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock vault lock poisoned")
    }

    pub fn add_secret(&self, name: &str, expires_on: Option<DateTime<Utc>>) {
        self.add_secret_with(name, true, expires_on);
    }

    pub fn add_secret_with(&self, name: &str, enabled: bool, expires_on: Option<DateTime<Utc>>) {
        self.state().secrets.insert(
            name.to_string(),
            VaultSecret {
                name: name.to_string(),
                properties: properties(name, enabled, expires_on),
            },
        );
    }

    pub fn add_certificate(&self, name: &str, expires_on: Option<DateTime<Utc>>) {
        self.add_certificate_with(name, true, expires_on);
    }

    pub fn add_certificate_with(&self, name: &str, enabled: bool, expires_on: Option<DateTime<Utc>>) {
        self.state().certificates.insert(
            name.to_string(),
            VaultCertificate {
                name: name.to_string(),
                thumbprint: Some("0000".to_string()),
                properties: properties(name, enabled, expires_on),
            },
        );
    }

    pub fn set_operation(&self, name: &str, status: CertificateRequestStatus, csr: Option<Vec<u8>>) {
        self.state()
            .operations
            .insert(name.to_string(), CertificateOperationState { status, csr });
    }

    /// CSR bytes returned by the next `create_csr`
    pub fn issue_csr(&self, csr: &[u8]) {
        self.state().csr_to_issue = csr.to_vec();
    }

    /// Thumbprint reported by `merge_certificate`
    pub fn merge_thumbprint(&self, thumbprint: &str) {
        self.state().merge_thumbprint = thumbprint.to_string();
    }

    /// Make every write fail with `message`
    pub fn fail_writes(&self, message: &str) {
        self.state().failure = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn write_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn secret(&self, name: &str) -> Option<VaultSecret> {
        self.state().secrets.get(name).cloned()
    }

    fn record(&self, call: Call) -> Result<()> {
        let mut state = self.state();
        let is_write = call.is_write();
        state.calls.push(call);
        match &state.failure {
            Some(message) if is_write => Err(anyhow::anyhow!("{message}")),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl VaultBackend for MockVault {
    async fn get_secret_if_exists(&self, name: &str) -> Result<Option<VaultSecret>> {
        self.record(Call::GetSecret(name.to_string()))?;
        Ok(self.state().secrets.get(name).cloned())
    }

    async fn update_secret(
        &self,
        name: &str,
        value: &Zeroizing<String>,
        expires_on: Option<DateTime<Utc>>,
        content_type: Option<&str>,
    ) -> Result<VaultSecret> {
        self.record(Call::UpdateSecret {
            name: name.to_string(),
            value: value.to_string(),
            expires_on,
            content_type: content_type.map(str::to_string),
        })?;

        let mut state = self.state();
        state.versions += 1;
        let secret = VaultSecret {
            name: name.to_string(),
            properties: ItemProperties {
                id: format!("https://mock.vault.azure.net/secrets/{name}/{}", state.versions),
                enabled: true,
                content_type: content_type.map(str::to_string),
                created_on: None,
                updated_on: None,
                expires_on,
            },
        };
        state.secrets.insert(name.to_string(), secret.clone());
        Ok(secret)
    }

    async fn get_certificate_if_exists(&self, name: &str) -> Result<Option<VaultCertificate>> {
        self.record(Call::GetCertificate(name.to_string()))?;
        Ok(self.state().certificates.get(name).cloned())
    }

    async fn import_certificate(
        &self,
        name: &str,
        pfx: &[u8],
        password: Option<&str>,
    ) -> Result<VaultCertificate> {
        self.record(Call::ImportCertificate {
            name: name.to_string(),
            pfx: pfx.to_vec(),
            password: password.map(str::to_string),
        })?;

        let certificate = VaultCertificate {
            name: name.to_string(),
            thumbprint: Some("IMPORTED".to_string()),
            properties: properties(name, true, None),
        };
        self.state()
            .certificates
            .insert(name.to_string(), certificate.clone());
        Ok(certificate)
    }

    async fn check_certificate_request(&self, name: &str) -> Result<CertificateOperationState> {
        self.record(Call::CheckCertificateRequest(name.to_string()))?;
        Ok(self
            .state()
            .operations
            .get(name)
            .cloned()
            .unwrap_or_else(CertificateOperationState::not_found))
    }

    async fn create_csr(
        &self,
        name: &str,
        subject: &str,
        key_strength: KeyStrength,
        dns_names: &[String],
    ) -> Result<CertificateOperationState> {
        self.record(Call::CreateCsr {
            name: name.to_string(),
            subject: subject.to_string(),
            key_strength: key_strength.bits(),
            dns_names: dns_names.to_vec(),
        })?;

        let mut state = self.state();
        let operation = CertificateOperationState {
            status: CertificateRequestStatus::InProgress,
            csr: Some(state.csr_to_issue.clone()),
        };
        state.operations.insert(name.to_string(), operation.clone());
        state
            .certificates
            .entry(name.to_string())
            .or_insert_with(|| VaultCertificate {
                name: name.to_string(),
                thumbprint: None,
                properties: properties(name, false, None),
            });
        Ok(operation)
    }

    async fn merge_certificate(&self, name: &str, pem_bundle: &str) -> Result<VaultCertificate> {
        self.record(Call::MergeCertificate {
            name: name.to_string(),
            pem_bundle: pem_bundle.to_string(),
        })?;

        let mut state = self.state();
        state.operations.insert(
            name.to_string(),
            CertificateOperationState {
                status: CertificateRequestStatus::Completed,
                csr: None,
            },
        );
        let certificate = VaultCertificate {
            name: name.to_string(),
            thumbprint: Some(state.merge_thumbprint.clone()),
            properties: properties(name, true, None),
        };
        state
            .certificates
            .insert(name.to_string(), certificate.clone());
        Ok(certificate)
    }
}

/// Connector handing out the same mock vault for every vault name
#[derive(Debug)]
pub struct MockConnector {
    pub vault: Arc<MockVault>,
    pub connects: AtomicUsize,
}

impl MockConnector {
    pub fn new(vault: Arc<MockVault>) -> Arc<Self> {
        Arc::new(Self {
            vault,
            connects: AtomicUsize::new(0),
        })
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl VaultConnector for MockConnector {
    fn connect(&self, _vault_name: &str) -> Result<Arc<dyn VaultBackend>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let backend: Arc<dyn VaultBackend> = Arc::clone(&self.vault) as Arc<dyn VaultBackend>;
        Ok(backend)
    }
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// Rotator context backed by `vault`, with the clock frozen at `now`
pub fn context(vault: &Arc<MockVault>, settings: OperationSettings, now: DateTime<Utc>) -> RotatorContext {
    let connector = MockConnector::new(Arc::clone(vault));
    RotatorContext::new(
        settings,
        Arc::new(VaultClientCache::new(connector)),
        Arc::new(FixedClock(now)),
    )
}

/// Partial resource in vault `vault1` with the given type tag
pub fn partial(resource_type: &str) -> PartialManagedResource {
    PartialManagedResource {
        resource_type: Some(resource_type.to_string()),
        key_vault: Some("vault1".to_string()),
        ..Default::default()
    }
}

/// Defaulted resource with an expiry lifetime and overlap window
pub fn with_policy(mut resource: ManagedResource, expiration_days: Option<i64>, overlap_days: i64) -> ManagedResource {
    resource.expiration_days = expiration_days;
    resource.expiration_overlap_days = overlap_days;
    resource
}
