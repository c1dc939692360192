//! # Resource Operations
//!
//! `initialize`, `rotate` and `request-csr`: one lifecycle step per selected
//! resource.

use crate::config::{ConfigurationFile, IdentifiedManagedResource};
use crate::operation::{CsrArtifact, Operation, OperationError, OperationKind, OperationOutput};
use crate::rotation::{RotationContext, RotationResult};
use crate::rotator::{Rotator, RotatorRegistry};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Lifecycle step a [`ResourceOperation`] performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStep {
    Initialize,
    Rotate,
    /// `initialize`, keeping the CSRs it hands out
    RequestCsr,
}

#[derive(Debug)]
pub struct ResourceOperation {
    step: ResourceStep,
    registry: Arc<RotatorRegistry>,
}

impl ResourceOperation {
    #[must_use]
    pub fn new(step: ResourceStep, registry: Arc<RotatorRegistry>) -> Self {
        Self { step, registry }
    }

    async fn perform_single_run(
        &self,
        rotator: &dyn Rotator,
        target: &IdentifiedManagedResource,
    ) -> RotationResult {
        let resource = rotator.apply_defaults(&target.resource);
        match self.step {
            ResourceStep::Initialize | ResourceStep::RequestCsr => {
                rotator.initialize(&target.id, &resource).await
            }
            ResourceStep::Rotate => rotator.rotate(&target.id, &resource).await,
        }
    }
}

#[async_trait]
impl Operation for ResourceOperation {
    fn kind(&self) -> OperationKind {
        match self.step {
            ResourceStep::Initialize => OperationKind::Initialize,
            ResourceStep::Rotate => OperationKind::Rotate,
            ResourceStep::RequestCsr => OperationKind::RequestCsr,
        }
    }

    async fn run(
        &self,
        configuration: &ConfigurationFile,
        targets: &[String],
    ) -> Result<OperationOutput, OperationError> {
        let mut output = OperationOutput::default();

        for target in configuration.filter_resources(targets) {
            let resource_type = target.resource.type_tag();
            let Some(rotator) = self.registry.resolve(resource_type) else {
                warn!(
                    resource = %target.id,
                    "Resource '{}' of type '{}' is not a supported resource type",
                    target.id,
                    resource_type
                );
                continue;
            };

            let span = info_span!("resource", resource = %target.id, operation = %self.kind());
            let result = self
                .perform_single_run(rotator.as_ref(), &target)
                .instrument(span)
                .await;

            if result.rotated {
                info!(resource = %target.id, "Resource '{}' was processed", target.id);
                output.rotated_resources.push(target.id.clone());
            } else if let RotationContext::Error { detail, .. } = &result.context {
                error!(
                    resource = %target.id,
                    error = %detail,
                    "Resource '{}' encountered an error: '{}'",
                    target.id,
                    result.notes
                );
            } else {
                warn!(
                    resource = %target.id,
                    "Resource '{}' was not processed: {}",
                    target.id,
                    result.notes
                );
            }
            debug!(resource = %target.id, context = ?result.context, "Rotation result");

            if self.step == ResourceStep::RequestCsr && result.rotated {
                if let Some(csr) = result.context.csr().filter(|csr| !csr.is_empty()) {
                    output.csr_artifacts.push(CsrArtifact {
                        resource: target.id.clone(),
                        csr: csr.to_owned(),
                    });
                }
            }
        }

        Ok(output)
    }
}
