//! # Configuration File
//!
//! Loads the set of managed resources for a run.
//!
//! The file is JSON or YAML:
//!
//! ```json
//! {
//!   "defaults": { "keyVault": "vault1", "expirationDays": 90, "expirationOverlapDays": 30 },
//!   "resources": {
//!     "db-password": { "type": "manual/secret" },
//!     "app-cert": {
//!       "type": "azure/keyvault/ssl-certificate",
//!       "certificate": { "subject": "CN=app.company.com", "dnsNames": ["app.company.com"] }
//!     }
//!   }
//! }
//! ```
//!
//! Defaults are merged into every resource at load time, so the loaded file
//! is immutable for the rest of the run. Resources keep document order.

use crate::config::resource::PartialManagedResource;
use crate::constants::ALL_RESOURCES;
use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// Parsed configuration: defaults plus resources keyed by configuration id
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationFile {
    /// Values applied to every resource that leaves the field unset
    #[serde(default)]
    pub defaults: PartialManagedResource,
    /// Managed resources keyed by configuration id, in document order
    #[serde(default, deserialize_with = "deserialize_ordered_resources")]
    #[schemars(with = "BTreeMap<String, PartialManagedResource>")]
    pub resources: Vec<(String, PartialManagedResource)>,
}

/// A resource together with its configuration id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifiedManagedResource {
    pub id: String,
    pub resource: PartialManagedResource,
}

impl ConfigurationFile {
    /// Load a configuration file, picking the format from its extension
    ///
    /// `.yaml`/`.yml` are read as YAML, everything else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        let configuration = if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
        .with_context(|| format!("Failed to parse configuration file {}", path.display()))?;

        debug!(
            path = %path.display(),
            resources = configuration.resources.len(),
            "Loaded configuration file"
        );
        Ok(configuration)
    }

    /// Parse JSON configuration and merge defaults into every resource
    pub fn from_json(content: &str) -> Result<Self> {
        let parsed: Self = serde_json::from_str(content).context("Invalid JSON configuration")?;
        Ok(parsed.with_defaults_applied())
    }

    /// Parse YAML configuration and merge defaults into every resource
    pub fn from_yaml(content: &str) -> Result<Self> {
        let parsed: Self = serde_yaml::from_str(content).context("Invalid YAML configuration")?;
        Ok(parsed.with_defaults_applied())
    }

    fn with_defaults_applied(self) -> Self {
        let resources = self
            .resources
            .into_iter()
            .map(|(id, resource)| {
                let merged = resource.merged_over(&self.defaults);
                (id, merged)
            })
            .collect();
        Self {
            defaults: self.defaults,
            resources,
        }
    }

    /// Look up a resource by configuration id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PartialManagedResource> {
        self.resources
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, resource)| resource)
    }

    /// Select the resources named in `targets`, in configuration order
    ///
    /// An empty target list, or one containing `*`, selects every resource.
    /// Targets that are not configured are reported and skipped.
    #[must_use]
    pub fn filter_resources(&self, targets: &[String]) -> Vec<IdentifiedManagedResource> {
        let select_all = targets.is_empty() || targets.iter().any(|t| t == ALL_RESOURCES);

        if !select_all {
            for target in targets {
                if self.get(target).is_none() {
                    warn!(
                        resource = %target,
                        "Resource '{}' was not found in the configuration file",
                        target
                    );
                }
            }
        }

        self.resources
            .iter()
            .filter(|(id, _)| select_all || targets.iter().any(|t| t == id))
            .map(|(id, resource)| IdentifiedManagedResource {
                id: id.clone(),
                resource: resource.clone(),
            })
            .collect()
    }
}

/// Split a resource filter such as `"a, b c"` into individual ids
#[must_use]
pub fn parse_resource_filter(filter: &str) -> Vec<String> {
    filter
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(str::to_owned)
        .collect()
}

fn deserialize_ordered_resources<'de, D>(
    deserializer: D,
) -> Result<Vec<(String, PartialManagedResource)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OrderedResources;

    impl<'de> Visitor<'de> for OrderedResources {
        type Value = Vec<(String, PartialManagedResource)>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a map of configuration id to resource")
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut resources = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((id, resource)) = map.next_entry::<String, PartialManagedResource>()? {
                if resources.iter().any(|(existing, _)| existing == &id) {
                    return Err(serde::de::Error::custom(format!(
                        "duplicate resource id '{id}'"
                    )));
                }
                resources.push((id, resource));
            }
            Ok(resources)
        }
    }

    deserializer.deserialize_map(OrderedResources)
}
