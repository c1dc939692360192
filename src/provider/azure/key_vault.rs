//! # Azure Key Vault Client
//!
//! Native REST implementation of [`VaultBackend`] for Azure Key Vault.
//!
//! This module provides functionality to:
//! - Read secret and certificate metadata
//! - Create and update secrets
//! - Import PFX certificates
//! - Request CSRs and merge externally signed certificates
//!
//! Requests go through `reqwest` with rustls, so the client works the same
//! against Key Vault and against local HTTP mock servers.

use crate::constants::{DEFAULT_VAULT_DNS_SUFFIX, KEY_VAULT_API_VERSION};
use crate::provider::azure::auth::KeyVaultCredential;
use crate::provider::azure::models::{
    CertificateBundle, CertificateOperation, CertificatePolicy, CreateCertificateRequest,
    ImportCertificateRequest, KeyVaultErrorResponse, MergeCertificateRequest, SecretAttributesRequest,
    SecretBundle, SetSecretRequest,
};
use crate::provider::pem::{certificate_bodies, thumbprint_hex};
use crate::provider::{
    CertificateOperationState, KeyStrength, VaultBackend, VaultCertificate, VaultConnector,
    VaultSecret,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, field, info, info_span, Instrument, Span};
use zeroize::Zeroizing;

/// Build the data-plane URL of a vault
///
/// A name that already is an `https://` URL is used as-is.
#[must_use]
pub fn vault_url(vault_name: &str, dns_suffix: &str) -> String {
    if vault_name.starts_with("https://") {
        vault_name.trim_end_matches('/').to_owned()
    } else {
        format!("https://{vault_name}.{dns_suffix}")
    }
}

/// Creates [`KeyVaultClient`]s that share one HTTP client and credential
#[derive(Debug)]
pub struct AzureKeyVaultConnector {
    http_client: Client,
    credential: Arc<KeyVaultCredential>,
    dns_suffix: String,
    endpoint_override: Option<String>,
}

impl AzureKeyVaultConnector {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(credential: KeyVaultCredential) -> Result<Self> {
        let http_client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            credential: Arc::new(credential),
            dns_suffix: DEFAULT_VAULT_DNS_SUFFIX.to_owned(),
            endpoint_override: None,
        })
    }

    /// DNS suffix for sovereign clouds, e.g. `vault.azure.cn`
    #[must_use]
    pub fn with_dns_suffix(mut self, dns_suffix: impl Into<String>) -> Self {
        self.dns_suffix = dns_suffix.into();
        self
    }

    /// Route every vault to one endpoint (local mock servers)
    #[must_use]
    pub fn with_endpoint_override(mut self, endpoint: Option<String>) -> Self {
        self.endpoint_override = endpoint;
        self
    }
}

impl VaultConnector for AzureKeyVaultConnector {
    fn connect(&self, vault_name: &str) -> Result<Arc<dyn VaultBackend>> {
        let url = match &self.endpoint_override {
            Some(endpoint) => {
                info!(
                    "Routing Key Vault '{}' requests to {}",
                    vault_name, endpoint
                );
                endpoint.trim_end_matches('/').to_owned()
            }
            None => vault_url(vault_name, &self.dns_suffix),
        };

        Ok(Arc::new(KeyVaultClient {
            http_client: self.http_client.clone(),
            vault_url: url,
            vault_name: vault_name.to_owned(),
            credential: Arc::clone(&self.credential),
        }))
    }
}

/// REST client bound to one vault
pub struct KeyVaultClient {
    http_client: Client,
    vault_url: String,
    vault_name: String,
    credential: Arc<KeyVaultCredential>,
}

impl std::fmt::Debug for KeyVaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVaultClient")
            .field("vault_url", &self.vault_url)
            .finish_non_exhaustive()
    }
}

impl KeyVaultClient {
    /// Build an authenticated request against `path` (relative to the vault)
    async fn make_request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::RequestBuilder> {
        let url = format!("{}/{path}", self.vault_url);
        let token = self.credential.bearer_token().await?;

        let mut request = self
            .http_client
            .request(method, &url)
            .query(&[("api-version", KEY_VAULT_API_VERSION)])
            .bearer_auth(token.as_str());

        if let Some(body) = body {
            request = request.json(&body);
        }

        Ok(request)
    }

    /// Send a request, mapping 404 to `None` and other failures to errors
    async fn send_optional<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Option<T>> {
        let response = self
            .make_request(method, path, body)
            .await?
            .send()
            .await
            .with_context(|| format!("Failed to call Key Vault {}", self.vault_name))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::error_response(status, &error_text));
        }

        let parsed = response
            .json::<T>()
            .await
            .context("Failed to parse Key Vault response")?;
        Ok(Some(parsed))
    }

    /// Send a request whose target must exist
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        self.send_optional(method, path, body)
            .await?
            .ok_or_else(|| anyhow::anyhow!("HTTP 404 (status: 404 Not Found): {path}"))
    }

    /// Turn a Key Vault error body into an error
    fn error_response(status: StatusCode, error_text: &str) -> anyhow::Error {
        if let Ok(error_response) = serde_json::from_str::<KeyVaultErrorResponse>(error_text) {
            anyhow::anyhow!(
                "Key Vault API error: {} (code: {}, status: {})",
                error_response.error.message,
                error_response.error.code,
                status.as_u16()
            )
        } else {
            anyhow::anyhow!(
                "HTTP {} (status: {}): {}",
                status.as_u16(),
                status,
                error_text
            )
        }
    }

    fn span(&self, name: &'static str, item: &str) -> Span {
        info_span!(
            "keyvault.request",
            operation = name,
            item.name = item,
            vault.name = %self.vault_name,
            operation.success = field::Empty,
            operation.duration_ms = field::Empty,
        )
    }

    fn record_outcome<T>(span: &Span, start: Instant, result: &Result<T>) {
        span.record("operation.success", result.is_ok());
        span.record(
            "operation.duration_ms",
            u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        );
    }

    fn to_certificate(name: &str, bundle: &CertificateBundle) -> VaultCertificate {
        let thumbprint = bundle.x5t.as_deref().map(|x5t| {
            general_purpose::URL_SAFE_NO_PAD
                .decode(x5t.trim_end_matches('='))
                .map_or_else(|_| x5t.to_owned(), |digest| thumbprint_hex(&digest))
        });

        VaultCertificate {
            name: name.to_owned(),
            thumbprint,
            properties: bundle.attributes.to_properties(bundle.id.as_deref(), None),
        }
    }
}

#[async_trait]
impl VaultBackend for KeyVaultClient {
    async fn get_secret_if_exists(&self, name: &str) -> Result<Option<VaultSecret>> {
        let span = self.span("secret.get", name);
        let start = Instant::now();

        let result = async {
            let bundle: Option<SecretBundle> = self
                .send_optional(Method::GET, &format!("secrets/{name}"), None)
                .await
                .with_context(|| format!("Failed to get secret {name}"))?;
            debug!(found = bundle.is_some(), "GetSecretIfExists({})", name);

            Ok(bundle.map(|bundle| VaultSecret {
                name: name.to_owned(),
                properties: bundle
                    .attributes
                    .to_properties(bundle.id.as_deref(), bundle.content_type.as_deref()),
            }))
        }
        .instrument(span.clone())
        .await;

        Self::record_outcome(&span, start, &result);
        result
    }

    async fn update_secret(
        &self,
        name: &str,
        value: &Zeroizing<String>,
        expires_on: Option<DateTime<Utc>>,
        content_type: Option<&str>,
    ) -> Result<VaultSecret> {
        let span = self.span("secret.set", name);
        let start = Instant::now();

        let result = async {
            info!("Setting Key Vault secret: {}", name);
            let request = SetSecretRequest {
                value: value.as_str(),
                content_type,
                attributes: SecretAttributesRequest {
                    enabled: true,
                    exp: expires_on.map(|t| t.timestamp()),
                },
            };
            let body = serde_json::to_value(&request)?;

            let bundle: SecretBundle = self
                .send(Method::PUT, &format!("secrets/{name}"), Some(body))
                .await
                .with_context(|| format!("Failed to set secret {name}"))?;

            Ok(VaultSecret {
                name: name.to_owned(),
                properties: bundle
                    .attributes
                    .to_properties(bundle.id.as_deref(), bundle.content_type.as_deref()),
            })
        }
        .instrument(span.clone())
        .await;

        Self::record_outcome(&span, start, &result);
        result
    }

    async fn get_certificate_if_exists(&self, name: &str) -> Result<Option<VaultCertificate>> {
        let span = self.span("certificate.get", name);
        let start = Instant::now();

        let result = async {
            let bundle: Option<CertificateBundle> = self
                .send_optional(Method::GET, &format!("certificates/{name}"), None)
                .await
                .with_context(|| format!("Failed to get certificate {name}"))?;
            debug!(found = bundle.is_some(), "GetCertificateIfExists({})", name);

            Ok(bundle.map(|bundle| Self::to_certificate(name, &bundle)))
        }
        .instrument(span.clone())
        .await;

        Self::record_outcome(&span, start, &result);
        result
    }

    async fn import_certificate(
        &self,
        name: &str,
        pfx: &[u8],
        password: Option<&str>,
    ) -> Result<VaultCertificate> {
        let span = self.span("certificate.import", name);
        let start = Instant::now();

        let result = async {
            info!("Importing Key Vault certificate: {}", name);
            let request = ImportCertificateRequest {
                value: general_purpose::STANDARD.encode(pfx),
                pwd: password.map(str::to_owned),
                policy: CertificatePolicy::for_import(),
            };

            let bundle: CertificateBundle = self
                .send(
                    Method::POST,
                    &format!("certificates/{name}/import"),
                    Some(serde_json::to_value(&request)?),
                )
                .await
                .with_context(|| format!("Failed to import certificate {name}"))?;

            Ok(Self::to_certificate(name, &bundle))
        }
        .instrument(span.clone())
        .await;

        Self::record_outcome(&span, start, &result);
        result
    }

    async fn check_certificate_request(&self, name: &str) -> Result<CertificateOperationState> {
        let span = self.span("certificate.pending", name);
        let start = Instant::now();

        let result = async {
            let operation: Option<CertificateOperation> = self
                .send_optional(Method::GET, &format!("certificates/{name}/pending"), None)
                .await
                .with_context(|| format!("Failed to check certificate request {name}"))?;

            let state = operation.map_or_else(CertificateOperationState::not_found, |op| op.to_state());
            debug!(status = ?state.status, "CheckCertificateRequest({})", name);
            Ok(state)
        }
        .instrument(span.clone())
        .await;

        Self::record_outcome(&span, start, &result);
        result
    }

    async fn create_csr(
        &self,
        name: &str,
        subject: &str,
        key_strength: KeyStrength,
        dns_names: &[String],
    ) -> Result<CertificateOperationState> {
        let span = self.span("certificate.create", name);
        let start = Instant::now();

        let result = async {
            info!("Requesting CSR for Key Vault certificate: {} ({})", name, subject);
            let request = CreateCertificateRequest {
                policy: CertificatePolicy::for_csr(subject, key_strength, dns_names),
            };

            let operation: CertificateOperation = self
                .send(
                    Method::POST,
                    &format!("certificates/{name}/create"),
                    Some(serde_json::to_value(&request)?),
                )
                .await
                .with_context(|| format!("Failed to create certificate request {name}"))?;

            let state = operation.to_state();
            if state.csr.is_some() {
                Ok(state)
            } else {
                self.check_certificate_request(name).await
            }
        }
        .instrument(span.clone())
        .await;

        Self::record_outcome(&span, start, &result);
        result
    }

    async fn merge_certificate(&self, name: &str, pem_bundle: &str) -> Result<VaultCertificate> {
        let span = self.span("certificate.merge", name);
        let start = Instant::now();

        let result = async {
            let x5c = certificate_bodies(pem_bundle)
                .with_context(|| format!("Failed to parse certificate chain for {name}"))?;
            info!(
                "Merging {} certificate(s) into Key Vault certificate: {}",
                x5c.len(),
                name
            );

            let bundle: CertificateBundle = self
                .send(
                    Method::POST,
                    &format!("certificates/{name}/pending/merge"),
                    Some(serde_json::to_value(MergeCertificateRequest { x5c })?),
                )
                .await
                .with_context(|| format!("Failed to merge certificate {name}"))?;

            Ok(Self::to_certificate(name, &bundle))
        }
        .instrument(span.clone())
        .await;

        Self::record_outcome(&span, start, &result);
        result
    }
}
