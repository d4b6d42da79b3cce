use core::fmt;
use std::sync::Arc;

use xqbridge_schema::{BuiltinClassifier, ValueClassifier};

use crate::compiler::NamespaceMap;

pub const DEFAULT_CONTEXT_VARIABLE: &str = "this";
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Settings shared by every query a [`QueryBridge`](crate::QueryBridge) runs.
#[derive(Clone)]
pub struct BridgeOptions {
    pub context_variable: String,
    pub namespaces: NamespaceMap,
    pub default_element_namespace: Option<String>,
    /// External variables every query may reference.
    pub external_variables: Vec<String>,
    pub cache_capacity: usize,
    pub classifier: Arc<dyn ValueClassifier>,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            context_variable: DEFAULT_CONTEXT_VARIABLE.to_owned(),
            namespaces: NamespaceMap::new(),
            default_element_namespace: None,
            external_variables: Vec::new(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            classifier: Arc::new(BuiltinClassifier),
        }
    }
}

impl BridgeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context_variable(mut self, name: impl Into<String>) -> Self {
        self.context_variable = name.into();
        self
    }

    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    pub fn with_default_element_namespace(mut self, uri: impl Into<String>) -> Self {
        self.default_element_namespace = Some(uri.into());
        self
    }

    pub fn with_external_variable(mut self, name: impl Into<String>) -> Self {
        self.external_variables.push(name.into());
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ValueClassifier>) -> Self {
        self.classifier = classifier;
        self
    }
}

impl fmt::Debug for BridgeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeOptions")
            .field("context_variable", &self.context_variable)
            .field("namespaces", &self.namespaces)
            .field("default_element_namespace", &self.default_element_namespace)
            .field("external_variables", &self.external_variables)
            .field("cache_capacity", &self.cache_capacity)
            .finish_non_exhaustive()
    }
}
