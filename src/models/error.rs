//! Model registry and dispatch errors.

use thiserror::Error;

/// Failures raised by a capability handler or a model's own lifecycle operations.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The payload does not match the capability's named arguments.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The model is not in a state where the capability can run.
    #[error("Not ready: {0}")]
    NotReady(String),

    /// The handler itself failed.
    #[error("Execution failed: {0}")]
    Execution(String),
}

/// Errors that can occur while creating, looking up, updating or invoking models.
#[derive(Debug, Error)]
pub enum ModelError {
    /// No live record has this id.
    #[error("Model not found: {0}")]
    NotFound(String),

    /// The record exists but does not publish the requested capability.
    #[error("Capability '{capability}' not available on model {id}")]
    CapabilityNotFound { id: String, capability: String },

    /// Model creation with an unsupported kind.
    #[error("Model kind not implemented: {0}")]
    UnknownKind(String),

    /// The specification blob could not be turned into a model.
    #[error("Invalid model specification: {0}")]
    InvalidSpecification(String),

    /// An update patch matched nothing on the record.
    #[error("Nothing to update on model {0}")]
    NoChange(String),

    /// Failure raised by the model while running a capability or an update.
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}
