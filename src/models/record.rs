//! Model records: one live model instance and its metadata.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::capability::{CapabilityObject, CapabilitySet, GenericRequest};
use super::error::ModelError;

/// Bounds on a record's display name, in characters.
pub const NAME_MIN_LEN: usize = 1;
pub const NAME_MAX_LEN: usize = 32;

/// Common fields of every model specification. Everything else in the blob
/// is handed to the kind's factory.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSpecification {
    pub name: String,
    pub created_by: String,
    pub description: String,
    #[serde(default)]
    pub creation_parameters: Option<GenericRequest>,
    #[serde(flatten)]
    pub parameters: GenericRequest,
}

impl RecordSpecification {
    pub fn parse(specification: GenericRequest) -> Result<Self, ModelError> {
        let spec: Self = serde_json::from_value(Value::Object(specification))
            .map_err(|e| ModelError::InvalidSpecification(e.to_string()))?;
        validate_name(&spec.name)?;
        Ok(spec)
    }
}

fn validate_name(name: &str) -> Result<(), ModelError> {
    let len = name.chars().count();
    if (NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
        Ok(())
    } else {
        Err(ModelError::InvalidSpecification(format!(
            "name must be between {} and {} characters",
            NAME_MIN_LEN, NAME_MAX_LEN
        )))
    }
}

/// Serializable snapshot of a record's metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub created_by: String,
    pub created_at: f64,
    pub description: String,
    pub creation_parameters: Option<GenericRequest>,
    pub capabilities: Vec<String>,
}

/// A live model instance. Owned exclusively by the registry.
pub struct ModelRecord {
    id: String,
    kind: String,
    name: String,
    created_by: String,
    created_at: f64,
    description: String,
    creation_parameters: Option<GenericRequest>,
    capabilities: Arc<CapabilitySet>,
    processing_model: Box<dyn CapabilityObject>,
}

impl ModelRecord {
    pub(crate) fn new(
        id: String,
        kind: &str,
        spec: RecordSpecification,
        capabilities: Arc<CapabilitySet>,
        processing_model: Box<dyn CapabilityObject>,
    ) -> Self {
        debug_assert!(!id.is_empty(), "record id must not be empty");
        Self {
            id,
            kind: kind.to_string(),
            name: spec.name,
            created_by: spec.created_by,
            created_at: chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0,
            description: spec.description,
            creation_parameters: spec.creation_parameters,
            capabilities,
            processing_model,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn created_at(&self) -> f64 {
        self.created_at
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn creation_parameters(&self) -> Option<&GenericRequest> {
        self.creation_parameters.as_ref()
    }

    /// The published capability table.
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// Names of all invocable capabilities.
    pub fn capability_names(&self) -> Vec<String> {
        self.capabilities.names()
    }

    pub fn processing_model(&self) -> &dyn CapabilityObject {
        self.processing_model.as_ref()
    }

    pub(crate) fn processing_model_mut(&mut self) -> &mut dyn CapabilityObject {
        self.processing_model.as_mut()
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            id: self.id.clone(),
            kind: self.kind.clone(),
            name: self.name.clone(),
            created_by: self.created_by.clone(),
            created_at: self.created_at,
            description: self.description.clone(),
            creation_parameters: self.creation_parameters.clone(),
            capabilities: self.capability_names(),
        }
    }

    /// Apply a patch in place.
    ///
    /// `name` and `description` are handled here; the rest goes to the
    /// processing model. Returns the number of fields changed, or
    /// `NoChange` when the patch matched nothing.
    pub fn update(&mut self, patch: &GenericRequest) -> Result<usize, ModelError> {
        let name = match patch.get("name") {
            Some(Value::String(name)) => {
                validate_name(name)?;
                Some(name.clone())
            }
            Some(_) => {
                return Err(ModelError::InvalidSpecification(
                    "name must be a string".to_string(),
                ))
            }
            None => None,
        };
        let description = match patch.get("description") {
            Some(Value::String(description)) => Some(description.clone()),
            Some(_) => {
                return Err(ModelError::InvalidSpecification(
                    "description must be a string".to_string(),
                ))
            }
            None => None,
        };

        let mut changed = self.processing_model.update(patch)?;
        if let Some(name) = name {
            self.name = name;
            changed += 1;
        }
        if let Some(description) = description {
            self.description = description;
            changed += 1;
        }

        if changed == 0 {
            return Err(ModelError::NoChange(self.id.clone()));
        }
        Ok(changed)
    }
}

impl fmt::Debug for ModelRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRecord")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("capabilities", &self.capabilities.names())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ModelRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::kinds::KindRegistry;
    use serde_json::json;

    fn spec(value: Value) -> GenericRequest {
        value.as_object().cloned().unwrap()
    }

    fn lda_record() -> ModelRecord {
        let kind = KindRegistry::with_builtin().get("lda").unwrap();
        let parsed = RecordSpecification::parse(spec(json!({
            "name": "topics",
            "createdBy": "tester",
            "description": "demo",
            "numTopics": 2
        })))
        .unwrap();
        let model = kind.build(&parsed.parameters).unwrap();
        ModelRecord::new("abc".into(), kind.name(), parsed, kind.capabilities(), model)
    }

    #[test]
    fn test_specification_splits_common_fields() {
        let parsed = RecordSpecification::parse(spec(json!({
            "name": "n",
            "createdBy": "me",
            "description": "d",
            "creationParameters": {"source": "arxiv"},
            "numTopics": 4
        })))
        .unwrap();
        assert_eq!(parsed.name, "n");
        assert_eq!(parsed.created_by, "me");
        assert_eq!(
            parsed.creation_parameters.unwrap().get("source"),
            Some(&json!("arxiv"))
        );
        assert_eq!(parsed.parameters.get("numTopics"), Some(&json!(4)));
        assert!(!parsed.parameters.contains_key("name"));
    }

    #[test]
    fn test_name_length_bounds() {
        let base = |name: &str| {
            spec(json!({"name": name, "createdBy": "me", "description": "d"}))
        };
        assert!(RecordSpecification::parse(base("")).is_err());
        assert!(RecordSpecification::parse(base(&"x".repeat(32))).is_ok());
        assert!(RecordSpecification::parse(base(&"x".repeat(33))).is_err());
        assert!(RecordSpecification::parse(spec(json!({"name": "n"}))).is_err());
    }

    #[test]
    fn test_summary_reflects_record() {
        let record = lda_record();
        let summary = record.summary();
        assert_eq!(summary.id, "abc");
        assert_eq!(summary.kind, "lda");
        assert_eq!(summary.name, "topics");
        assert!(summary.created_at > 0.0);
        assert_eq!(summary.capabilities, record.capability_names());
        assert_eq!(record.to_string(), "abc");
    }

    #[test]
    fn test_update_counts_changed_fields() {
        let mut record = lda_record();
        let changed = record
            .update(&spec(json!({"name": "renamed", "description": "new", "alpha": 0.5})))
            .unwrap();
        assert_eq!(changed, 3);
        assert_eq!(record.name(), "renamed");
        assert_eq!(record.description(), "new");
    }

    #[test]
    fn test_update_without_match_is_no_change() {
        let mut record = lda_record();
        let err = record.update(&spec(json!({"unknown": 1}))).unwrap_err();
        assert!(matches!(err, ModelError::NoChange(id) if id == "abc"));
    }

    #[test]
    fn test_invalid_update_leaves_record_untouched() {
        let mut record = lda_record();
        assert!(record
            .update(&spec(json!({"name": "", "description": "changed"})))
            .is_err());
        assert_eq!(record.name(), "topics");
        assert_eq!(record.description(), "demo");
    }
}
