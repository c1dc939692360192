use thiserror::Error;

/// Failures that abort a whole operation
///
/// Per-resource problems never end up here; they are logged and the run
/// continues with the next resource.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OperationError {
    #[error("Manual secret can only operate on a single resource at a time")]
    SingleTargetRequired,

    #[error("Resource '{0}' was not found in the configuration file")]
    ResourceNotFound(String),

    #[error("No rotator is registered for resource type '{0}'")]
    RotatorUnavailable(String),
}
