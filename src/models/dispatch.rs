//! Dispatch Engine: routes a named capability call to a live model.
//!
//! Resolution is deny-by-default: a name is invocable only if the record's
//! published capability table contains it. Nothing on the processing model
//! is reachable any other way.

use serde_json::Value;

use super::capability::{GenericRequest, GenericResponse};
use super::error::ModelError;
use super::registry::ModelRegistry;

/// Invoke `capability` on model `id` with `payload` as named arguments.
///
/// The result is wrapped as `{capability: result}`. Handler failures are
/// returned as `ModelError::Capability` and are never folded into the
/// not-found cases.
pub fn dispatch(
    registry: &ModelRegistry,
    id: &str,
    capability: &str,
    payload: &GenericRequest,
) -> Result<GenericResponse, ModelError> {
    let handle = registry
        .get(id)
        .ok_or_else(|| ModelError::NotFound(id.to_string()))?;
    let mut record = handle.write();

    let entry = record
        .capabilities()
        .get(capability)
        .cloned()
        .ok_or_else(|| ModelError::CapabilityNotFound {
            id: id.to_string(),
            capability: capability.to_string(),
        })?;
    entry.check_arguments(payload)?;

    tracing::debug!(model_id = %id, capability = %capability, "Invoking capability");
    let output: Value = entry.invoke(record.processing_model_mut(), payload)?;

    let mut response = GenericResponse::new();
    response.insert(capability.to_string(), output);
    Ok(response)
}
