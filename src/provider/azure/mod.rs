//! # Azure Key Vault
//!
//! Key Vault data-plane backend.
//!
//! - `auth`: credential selection and bearer tokens
//! - `key_vault`: REST client implementing `VaultBackend`
//! - `models`: request/response payloads

pub mod auth;
pub mod key_vault;
mod models;

// Re-export for convenience
pub use auth::{AzureAuthConfig, KeyVaultCredential};
pub use key_vault::{vault_url, AzureKeyVaultConnector, KeyVaultClient};
