//! # Rotator Registry
//!
//! Maps resource type tags to the rotator handling them. Built once per run.

use crate::constants::MANUAL_GENERIC_TYPE;
use crate::rotator::{
    ManualCertificateRotator, ManualSecretRotator, Rotator, RotatorContext, SslCertificateRotator,
};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct RotatorRegistry {
    rotators: HashMap<String, Arc<dyn Rotator>>,
}

impl RotatorRegistry {
    /// Registry with every supported resource type
    #[must_use]
    pub fn with_default_rotators(context: &RotatorContext) -> Self {
        let mut registry = Self::default();

        let manual_secret: Arc<dyn Rotator> = Arc::new(ManualSecretRotator::new(context.clone()));
        registry.register_as(MANUAL_GENERIC_TYPE, Arc::clone(&manual_secret));
        registry.register(manual_secret);
        registry.register(Arc::new(ManualCertificateRotator::new(context.clone())));
        registry.register(Arc::new(SslCertificateRotator::new(context.clone())));

        registry
    }

    /// Register a rotator under its own type tag, replacing any previous one
    pub fn register(&mut self, rotator: Arc<dyn Rotator>) {
        self.register_as(rotator.resource_type(), rotator);
    }

    /// Register a rotator under an additional type tag
    pub fn register_as(&mut self, resource_type: &str, rotator: Arc<dyn Rotator>) {
        self.rotators.insert(resource_type.to_owned(), rotator);
    }

    /// Rotator for `resource_type`, `None` when the type is not supported
    #[must_use]
    pub fn resolve(&self, resource_type: &str) -> Option<Arc<dyn Rotator>> {
        self.rotators.get(resource_type).map(Arc::clone)
    }

    /// Supported type tags, sorted
    #[must_use]
    pub fn resource_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.rotators.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}
