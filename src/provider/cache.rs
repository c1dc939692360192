//! # Vault Client Cache
//!
//! Reuses one backend per vault for the lifetime of a run.

use crate::provider::{VaultBackend, VaultConnector};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Backends keyed by lower-cased vault name
///
/// Entries are written once per key. The lock lets a concurrent caller share
/// the cache, a sequential run never contends on it.
#[derive(Debug)]
pub struct VaultClientCache {
    connector: Arc<dyn VaultConnector>,
    clients: Mutex<HashMap<String, Arc<dyn VaultBackend>>>,
}

impl VaultClientCache {
    #[must_use]
    pub fn new(connector: Arc<dyn VaultConnector>) -> Self {
        Self {
            connector,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Get the cached backend for `vault_name`, connecting on first use
    pub async fn get(&self, vault_name: &str) -> Result<Arc<dyn VaultBackend>> {
        if vault_name.trim().is_empty() {
            anyhow::bail!("No Key Vault configured for resource");
        }

        let key = vault_name.to_lowercase();
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(&key) {
            return Ok(Arc::clone(client));
        }

        debug!(vault.name = %key, "Connecting to Key Vault");
        let client = self
            .connector
            .connect(&key)
            .with_context(|| format!("Failed to create Key Vault client for {key}"))?;
        clients.insert(key, Arc::clone(&client));
        Ok(client)
    }

    /// Number of vaults connected so far
    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }
}
