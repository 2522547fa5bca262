//! Model registry and capability dispatch.
//!
//! - [`registry::ModelRegistry`] owns live [`record::ModelRecord`]s.
//! - [`kinds::KindRegistry`] maps a model kind to its factory and capability table.
//! - [`dispatch::dispatch`] resolves and invokes a declared capability.

pub mod capability;
pub mod dispatch;
pub mod error;
pub mod kinds;
pub mod lda;
pub mod record;
pub mod registry;

pub use capability::{CapabilityObject, CapabilitySet, GenericRequest, GenericResponse};
pub use dispatch::dispatch;
pub use error::{CapabilityError, ModelError};
pub use kinds::{KindRegistry, ModelFactory};
pub use record::{ModelRecord, ModelSummary};
pub use registry::{ModelHandle, ModelRegistry};
