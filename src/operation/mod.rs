//! # Operations
//!
//! An operation walks the configured resources selected by the run's
//! resource filter and drives each resource's rotator. Resources are
//! processed one after another; a failing resource is logged and skipped.
//!
//! - `nothing`: wiring check, touches nothing
//! - `initialize` / `rotate`: lifecycle step on every selected resource
//! - `request-csr`: `initialize`, collecting the CSRs handed out
//! - `inspect`: read-only status table
//! - `manual-secret`: rotate exactly one manual secret

use crate::config::ConfigurationFile;
use crate::rotation::InspectionResult;
use crate::rotator::RotatorRegistry;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

pub mod error;
pub mod inspect;
pub mod manual_secret;
pub mod resource;

pub use error::OperationError;
pub use inspect::InspectOperation;
pub use manual_secret::ManualSecretOperation;
pub use resource::{ResourceOperation, ResourceStep};

/// Operation selected for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OperationKind {
    Nothing,
    Initialize,
    Rotate,
    RequestCsr,
    Inspect,
    ManualSecret,
}

impl OperationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nothing => "nothing",
            Self::Initialize => "initialize",
            Self::Rotate => "rotate",
            Self::RequestCsr => "request-csr",
            Self::Inspect => "inspect",
            Self::ManualSecret => "manual-secret",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A CSR handed out for external signing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsrArtifact {
    /// Configuration id of the certificate
    pub resource: String,
    /// PEM `CERTIFICATE REQUEST`
    pub csr: String,
}

/// Everything a run produces for the host to render
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationOutput {
    /// Ids of resources that reported `rotated`
    pub rotated_resources: Vec<String>,
    /// Inspection rows, in resource order
    pub inspection: Vec<InspectionResult>,
    pub csr_artifacts: Vec<CsrArtifact>,
}

#[async_trait]
pub trait Operation: Send + Sync + fmt::Debug {
    fn kind(&self) -> OperationKind;

    /// Run over the resources selected by `targets` (empty or `*` = all)
    async fn run(
        &self,
        configuration: &ConfigurationFile,
        targets: &[String],
    ) -> Result<OperationOutput, OperationError>;
}

/// Does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NothingOperation;

#[async_trait]
impl Operation for NothingOperation {
    fn kind(&self) -> OperationKind {
        OperationKind::Nothing
    }

    async fn run(
        &self,
        _configuration: &ConfigurationFile,
        _targets: &[String],
    ) -> Result<OperationOutput, OperationError> {
        Ok(OperationOutput::default())
    }
}

/// Build the operation for `kind`
#[must_use]
pub fn build_operation(kind: OperationKind, registry: Arc<RotatorRegistry>) -> Box<dyn Operation> {
    match kind {
        OperationKind::Nothing => Box::new(NothingOperation),
        OperationKind::Initialize => Box::new(ResourceOperation::new(ResourceStep::Initialize, registry)),
        OperationKind::Rotate => Box::new(ResourceOperation::new(ResourceStep::Rotate, registry)),
        OperationKind::RequestCsr => Box::new(ResourceOperation::new(ResourceStep::RequestCsr, registry)),
        OperationKind::Inspect => Box::new(InspectOperation::new(registry)),
        OperationKind::ManualSecret => Box::new(ManualSecretOperation::new(registry)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ValueEnum;

    #[test]
    fn test_operation_names_match_cli_values() {
        for kind in OperationKind::value_variants() {
            let parsed = OperationKind::from_str(kind.as_str(), false).expect("value should parse");
            assert_eq!(parsed, *kind);
        }
    }

    #[tokio::test]
    async fn test_nothing_operation_produces_empty_output() {
        let configuration = ConfigurationFile::from_json(r#"{"resources":{"a":{"type":"manual/secret"}}}"#)
            .expect("configuration should parse");
        let output = NothingOperation
            .run(&configuration, &[])
            .await
            .expect("nothing should succeed");
        assert_eq!(output, OperationOutput::default());
    }
}
