//! Capability objects and their published capability tables.
//!
//! A capability object is the type-erased processing state of a model
//! record. It implements the fixed lifecycle (`train`, `predict`, `update`)
//! and nothing else is reachable from the outside unless the model kind
//! declares it in a [`CapabilitySet`].
//!
//! The table is built once per kind, with handlers typed against the
//! concrete model:
//!
//! ```ignore
//! let capabilities = CapabilitySet::builder::<LdaModel>()
//!     .capability("train", &["documents"], |model, args| model.train(args))
//!     .capability("getTopics", &["topWords"], |model, args| model.topics(args))
//!     .build();
//! ```
//!
//! Dispatch only ever resolves names through this table, so a method that
//! exists on the model but is not declared here can never be invoked.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::error::CapabilityError;

/// Free-form payload for capability invocation and model specifications.
pub type GenericRequest = Map<String, Value>;

/// Result envelope of a capability invocation, keyed by capability name.
pub type GenericResponse = Map<String, Value>;

/// Lifecycle contract every model kind implements.
pub trait CapabilityObject: Any + Send + Sync {
    /// Train the model with data from `input`.
    fn train(&mut self, input: &GenericRequest) -> Result<Value, CapabilityError>;

    /// Predict something with data from `input`.
    fn predict(&self, input: &GenericRequest) -> Result<Value, CapabilityError>;

    /// Apply the kind-level fields of `patch`.
    ///
    /// Returns how many fields were recognised and applied; unrecognised
    /// keys are ignored. Either all recognised fields apply or none do.
    fn update(&mut self, patch: &GenericRequest) -> Result<usize, CapabilityError>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

type ErasedHandler =
    dyn Fn(&mut dyn CapabilityObject, &GenericRequest) -> Result<Value, CapabilityError> + Send + Sync;

/// One invocable capability: its accepted argument names and its handler.
#[derive(Clone)]
pub struct Capability {
    name: String,
    parameters: Vec<String>,
    handler: Arc<ErasedHandler>,
}

impl Capability {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Named arguments the handler accepts.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Reject payload keys that are not declared arguments of this capability.
    pub fn check_arguments(&self, payload: &GenericRequest) -> Result<(), CapabilityError> {
        let mut unexpected: Vec<&str> = payload
            .keys()
            .filter(|key| !self.parameters.iter().any(|p| p == *key))
            .map(String::as_str)
            .collect();
        if unexpected.is_empty() {
            return Ok(());
        }
        unexpected.sort_unstable();
        Err(CapabilityError::InvalidArguments(format!(
            "{}() got unexpected argument(s): {}",
            self.name,
            unexpected.join(", ")
        )))
    }

    /// Run the handler against a model's processing state.
    pub fn invoke(
        &self,
        model: &mut dyn CapabilityObject,
        payload: &GenericRequest,
    ) -> Result<Value, CapabilityError> {
        (self.handler)(model, payload)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Mapping from capability name to handler. Keys are unique.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet {
    capabilities: HashMap<String, Capability>,
}

impl CapabilitySet {
    /// Start a table whose handlers are typed against model `M`.
    pub fn builder<M: CapabilityObject>() -> CapabilitySetBuilder<M> {
        CapabilitySetBuilder {
            capabilities: HashMap::new(),
            _model: PhantomData,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.capabilities.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// Capability names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.capabilities.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

/// Builder for a [`CapabilitySet`] bound to a concrete model type.
pub struct CapabilitySetBuilder<M> {
    capabilities: HashMap<String, Capability>,
    _model: PhantomData<fn() -> M>,
}

impl<M: CapabilityObject> CapabilitySetBuilder<M> {
    /// Declare an invocable capability. Declaring a name twice replaces the
    /// earlier handler.
    pub fn capability<F>(mut self, name: &str, parameters: &[&str], handler: F) -> Self
    where
        F: Fn(&mut M, &GenericRequest) -> Result<Value, CapabilityError> + Send + Sync + 'static,
    {
        let bound_name = name.to_string();
        let erased: Arc<ErasedHandler> = Arc::new(
            move |model: &mut dyn CapabilityObject,
                  payload: &GenericRequest|
                  -> Result<Value, CapabilityError> {
                let model = model.as_any_mut().downcast_mut::<M>().ok_or_else(|| {
                    CapabilityError::Execution(format!(
                        "capability '{}' invoked on a model of another kind",
                        bound_name
                    ))
                })?;
                handler(model, payload)
            },
        );
        self.capabilities.insert(
            name.to_string(),
            Capability {
                name: name.to_string(),
                parameters: parameters.iter().map(|p| p.to_string()).collect(),
                handler: erased,
            },
        );
        self
    }

    pub fn build(self) -> CapabilitySet {
        CapabilitySet {
            capabilities: self.capabilities,
        }
    }
}

/// Fetch a required named argument.
pub fn required_arg<T: DeserializeOwned>(
    args: &GenericRequest,
    name: &str,
) -> Result<T, CapabilityError> {
    let value = args
        .get(name)
        .ok_or_else(|| CapabilityError::InvalidArguments(format!("missing argument '{}'", name)))?;
    serde_json::from_value(value.clone())
        .map_err(|e| CapabilityError::InvalidArguments(format!("argument '{}': {}", name, e)))
}

/// Fetch an optional named argument; `null` counts as absent.
pub fn optional_arg<T: DeserializeOwned>(
    args: &GenericRequest,
    name: &str,
) -> Result<Option<T>, CapabilityError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => required_arg(args, name).map(Some),
    }
}
