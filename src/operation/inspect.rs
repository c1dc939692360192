//! # Inspect Operation
//!
//! Read-only status report over the selected resources.

use crate::config::ConfigurationFile;
use crate::operation::{Operation, OperationError, OperationKind, OperationOutput};
use crate::rotator::RotatorRegistry;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, warn};

#[derive(Debug)]
pub struct InspectOperation {
    registry: Arc<RotatorRegistry>,
}

impl InspectOperation {
    #[must_use]
    pub fn new(registry: Arc<RotatorRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Operation for InspectOperation {
    fn kind(&self) -> OperationKind {
        OperationKind::Inspect
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

            let resource = rotator.apply_defaults(&target.resource);
            match rotator.inspect(&target.id, &resource).await {
                Ok(result) => {
                    debug!(resource = %target.id, notes = %result.notes, "Inspected resource");
                    output.inspection.push(result);
                }
                Err(e) => {
                    error!(
                        resource = %target.id,
                        "Resource '{}' encountered an error: '{:#}'",
                        target.id,
                        e
                    );
                }
            }
        }

        Ok(output)
    }
}
