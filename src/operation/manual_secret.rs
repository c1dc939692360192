//! # Manual Secret Operation
//!
//! Rotates a single `manual/secret` resource with the value supplied for
//! this run. Unlike the other operations, bad target arguments fail the run.

use crate::config::ConfigurationFile;
use crate::constants::{ALL_RESOURCES, MANUAL_SECRET_TYPE};
use crate::operation::{Operation, OperationError, OperationKind, OperationOutput};
use crate::rotator::RotatorRegistry;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
pub struct ManualSecretOperation {
    registry: Arc<RotatorRegistry>,
}

impl ManualSecretOperation {
    #[must_use]
    pub fn new(registry: Arc<RotatorRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Operation for ManualSecretOperation {
    fn kind(&self) -> OperationKind {
        OperationKind::ManualSecret
    }

    async fn run(
        &self,
        configuration: &ConfigurationFile,
        targets: &[String],
    ) -> Result<OperationOutput, OperationError> {
        let [target] = targets else {
            return Err(OperationError::SingleTargetRequired);
        };
        if target == ALL_RESOURCES {
            return Err(OperationError::SingleTargetRequired);
        }

        let resource = configuration
            .get(target)
            .ok_or_else(|| OperationError::ResourceNotFound(target.clone()))?;
        let rotator = self
            .registry
            .resolve(MANUAL_SECRET_TYPE)
            .ok_or_else(|| OperationError::RotatorUnavailable(MANUAL_SECRET_TYPE.to_owned()))?;

        let result = rotator
            .rotate(target, &rotator.apply_defaults(resource))
            .await;

        let mut output = OperationOutput::default();
        if result.rotated {
            info!(resource = %target, "Resource '{}' was rotated", target);
            output.rotated_resources.push(target.clone());
        } else {
            warn!(
                resource = %target,
                "Resource '{}' was NOT rotated: {}",
                target,
                result.notes
            );
        }

        Ok(output)
    }
}
