//! Model kinds: the statically known set of constructible models.
//!
//! Each kind is registered once with a factory. Its capability table is
//! built at registration and shared by every record of that kind.

use std::collections::HashMap;
use std::sync::Arc;

use super::capability::{CapabilityObject, CapabilitySet, GenericRequest};
use super::error::ModelError;
use super::lda::LdaFactory;

/// Constructor for one model kind.
pub trait ModelFactory: Send + Sync {
    /// Kind identifier used in creation requests (e.g. `"lda"`).
    fn kind(&self) -> &str;

    /// Capabilities published by models of this kind.
    fn capabilities(&self) -> CapabilitySet;

    /// Build the processing state from the kind-specific parameters.
    fn build(&self, parameters: &GenericRequest) -> Result<Box<dyn CapabilityObject>, ModelError>;
}

/// A registered kind: its factory plus the capability table built for it.
pub struct ModelKind {
    factory: Box<dyn ModelFactory>,
    capabilities: Arc<CapabilitySet>,
}

impl ModelKind {
    pub fn name(&self) -> &str {
        self.factory.kind()
    }

    pub fn capabilities(&self) -> Arc<CapabilitySet> {
        Arc::clone(&self.capabilities)
    }

    pub fn build(&self, parameters: &GenericRequest) -> Result<Box<dyn CapabilityObject>, ModelError> {
        self.factory.build(parameters)
    }
}

/// Kind name → registered kind.
#[derive(Default)]
pub struct KindRegistry {
    kinds: HashMap<String, Arc<ModelKind>>,
}

impl KindRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in kind.
    pub fn with_builtin() -> Self {
        let mut kinds = Self::new();
        kinds.register(LdaFactory);
        kinds
    }

    /// Register a kind. Registering the same kind name again replaces it.
    pub fn register(&mut self, factory: impl ModelFactory + 'static) {
        let capabilities = Arc::new(factory.capabilities());
        let name = factory.kind().to_string();
        tracing::debug!(kind = %name, capabilities = capabilities.len(), "Registered model kind");
        self.kinds.insert(
            name,
            Arc::new(ModelKind {
                factory: Box::new(factory),
                capabilities,
            }),
        );
    }

    pub fn get(&self, kind: &str) -> Option<Arc<ModelKind>> {
        self.kinds.get(kind).cloned()
    }

    /// Registered kind names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.kinds.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_kinds() {
        let kinds = KindRegistry::with_builtin();
        assert_eq!(kinds.names(), vec!["lda".to_string()]);
        let lda = kinds.get("lda").unwrap();
        assert_eq!(lda.name(), "lda");
        assert!(lda.capabilities().contains("train"));
        assert!(kinds.get("bert").is_none());
    }

    #[test]
    fn test_capability_table_is_shared_across_lookups() {
        let kinds = KindRegistry::with_builtin();
        let a = kinds.get("lda").unwrap().capabilities();
        let b = kinds.get("lda").unwrap().capabilities();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
