//! # Key Vault Authentication
//!
//! Bearer tokens for the Key Vault data plane, from an Azure identity or a
//! token handed in by the host (e.g. a CI login step).

use crate::constants::KEY_VAULT_SCOPE;
use anyhow::{Context, Result};
use azure_core::credentials::TokenCredential;
use azure_identity::{AzureCliCredential, ManagedIdentityCredential, WorkloadIdentityCredential};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// How the rotator authenticates against Key Vault
#[derive(Clone)]
pub enum AzureAuthConfig {
    /// Managed identity of the host (works automatically on Azure compute)
    ManagedIdentity,
    /// Federated workload identity for the given application (client) id
    WorkloadIdentity { client_id: String },
    /// The signed-in Azure CLI account
    AzureCli,
    /// A pre-acquired bearer token
    AccessToken(Zeroizing<String>),
}

impl fmt::Debug for AzureAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManagedIdentity => f.write_str("ManagedIdentity"),
            Self::WorkloadIdentity { client_id } => f
                .debug_struct("WorkloadIdentity")
                .field("client_id", client_id)
                .finish(),
            Self::AzureCli => f.write_str("AzureCli"),
            Self::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
        }
    }
}

/// Token source shared by every vault client of a run
pub enum KeyVaultCredential {
    Azure(Arc<dyn TokenCredential>),
    Static(Zeroizing<String>),
}

impl fmt::Debug for KeyVaultCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Azure(_) => f.write_str("KeyVaultCredential::Azure"),
            Self::Static(_) => f.write_str("KeyVaultCredential::Static(<redacted>)"),
        }
    }
}

impl KeyVaultCredential {
    /// Build the credential described by `config`
    ///
    /// # Errors
    /// Returns an error if the Azure identity credential cannot be created
    pub fn from_config(config: &AzureAuthConfig) -> Result<Self> {
        let credential: Arc<dyn TokenCredential> = match config {
            AzureAuthConfig::ManagedIdentity => {
                info!("Using Managed Identity authentication");
                ManagedIdentityCredential::new(None)
                    .context("Failed to create ManagedIdentityCredential")?
            }
            AzureAuthConfig::WorkloadIdentity { client_id } => {
                info!(
                    "Using Azure Workload Identity authentication with client ID: {}",
                    client_id
                );
                let options = azure_identity::WorkloadIdentityCredentialOptions {
                    client_id: Some(client_id.clone()),
                    ..Default::default()
                };
                WorkloadIdentityCredential::new(Some(options))
                    .context("Failed to create WorkloadIdentityCredential")?
            }
            AzureAuthConfig::AzureCli => {
                info!("Using Azure CLI authentication");
                AzureCliCredential::new(None).context("Failed to create AzureCliCredential")?
            }
            AzureAuthConfig::AccessToken(token) => {
                if token.trim().is_empty() {
                    anyhow::bail!("Access token authentication selected but no token was provided");
                }
                info!("Using pre-acquired access token");
                return Ok(Self::Static(token.clone()));
            }
        };

        Ok(Self::Azure(credential))
    }

    /// A bearer token for the Key Vault scope
    ///
    /// # Errors
    /// Returns an error if the identity provider refuses to issue a token
    pub async fn bearer_token(&self) -> Result<Zeroizing<String>> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::Azure(credential) => {
                let token = credential
                    .get_token(&[KEY_VAULT_SCOPE], None)
                    .await
                    .context("Failed to acquire Key Vault access token")?;
                debug!("Acquired Key Vault access token");
                Ok(Zeroizing::new(token.token.secret().to_owned()))
            }
        }
    }
}
