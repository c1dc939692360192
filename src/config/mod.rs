//! # Configuration
//!
//! Resource model, configuration file loading and run settings.

pub mod file;
pub mod resource;
pub mod settings;

pub use file::{parse_resource_filter, ConfigurationFile, IdentifiedManagedResource};
pub use resource::{
    CertificateRequest, ManagedResource, PartialCertificateRequest, PartialManagedResource,
};
pub use settings::OperationSettings;
