//! Model Registry: owns every live model record.
//!
//! Locking discipline:
//! - the id → record map sits behind one `RwLock`; `create`, `delete` and
//!   `list` take it for the duration of the structural change or snapshot;
//! - each record sits behind its own `RwLock`; `update` and capability
//!   dispatch take only that lock, after releasing the map lock, so a long
//!   running capability never blocks the rest of the registry.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use super::capability::GenericRequest;
use super::error::ModelError;
use super::kinds::KindRegistry;
use super::record::{ModelRecord, ModelSummary, RecordSpecification};

/// Shared handle to one live record.
pub type ModelHandle = Arc<RwLock<ModelRecord>>;

/// Process-wide registry of model records, keyed by unique id.
pub struct ModelRegistry {
    kinds: KindRegistry,
    models: RwLock<HashMap<String, ModelHandle>>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(KindRegistry::with_builtin())
    }
}

impl ModelRegistry {
    pub fn new(kinds: KindRegistry) -> Self {
        Self {
            kinds,
            models: RwLock::new(HashMap::new()),
        }
    }

    /// Kinds that `create` accepts.
    pub fn implemented_kinds(&self) -> Vec<String> {
        self.kinds.names()
    }

    /// Construct a model of `kind` from `specification` and register it.
    pub fn create(
        &self,
        kind: &str,
        specification: GenericRequest,
    ) -> Result<ModelSummary, ModelError> {
        let model_kind = self
            .kinds
            .get(kind)
            .ok_or_else(|| ModelError::UnknownKind(kind.to_string()))?;
        let spec = RecordSpecification::parse(specification)?;
        let processing_model = model_kind.build(&spec.parameters)?;

        let mut models = self.models.write();
        let id = loop {
            let candidate = Uuid::new_v4().to_string();
            if !models.contains_key(&candidate) {
                break candidate;
            }
        };
        let record = ModelRecord::new(
            id.clone(),
            model_kind.name(),
            spec,
            model_kind.capabilities(),
            processing_model,
        );
        let summary = record.summary();
        models.insert(id, Arc::new(RwLock::new(record)));
        drop(models);

        tracing::info!(model_id = %summary.id, kind = %summary.kind, name = %summary.name, "Created model");
        Ok(summary)
    }

    /// Look up a record. No side effects.
    pub fn get(&self, id: &str) -> Option<ModelHandle> {
        self.models.read().get(id).cloned()
    }

    /// Summary of a record, if it exists.
    pub fn summary(&self, id: &str) -> Option<ModelSummary> {
        self.get(id).map(|handle| handle.read().summary())
    }

    /// Snapshot of live ids, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.models.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Remove a record.
    pub fn delete(&self, id: &str) -> Result<(), ModelError> {
        match self.models.write().entry(id.to_string()) {
            Entry::Occupied(entry) => {
                entry.remove();
            }
            Entry::Vacant(_) => return Err(ModelError::NotFound(id.to_string())),
        }
        tracing::info!(model_id = %id, "Deleted model");
        Ok(())
    }

    /// Hand `patch` to the record's own update operation.
    ///
    /// Returns the number of changed fields, or `NoChange` when nothing matched.
    pub fn update(&self, id: &str, patch: &GenericRequest) -> Result<usize, ModelError> {
        let handle = self
            .get(id)
            .ok_or_else(|| ModelError::NotFound(id.to_string()))?;
        let changed = handle.write().update(patch)?;
        tracing::info!(model_id = %id, changed, "Updated model");
        Ok(changed)
    }

    pub fn len(&self) -> usize {
        self.models.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.read().is_empty()
    }
}
