use std::sync::Arc;

use xqbridge_engine::QueryEngine;
use xqbridge_store::{Cursor, Selection};

use crate::binder::VariableBindings;
use crate::cache::{CacheStats, QueryCache, QueryKey};
use crate::compiler::{CompiledQuery, compile_with_variables, find_prolog_boundary};
use crate::error::{BindError, BridgeError, CompileError};
use crate::execution::QueryExecution;
use crate::options::BridgeOptions;

/// Compiles expressions through an engine, caches them and runs them against
/// store cursors.
pub struct QueryBridge<E: QueryEngine> {
    engine: Arc<E>,
    options: BridgeOptions,
    cache: QueryCache<E>,
}

impl<E: QueryEngine> QueryBridge<E> {
    pub fn new(engine: E) -> Self {
        Self::with_options(engine, BridgeOptions::default())
    }

    pub fn with_options(engine: E, options: BridgeOptions) -> Self {
        let cache = QueryCache::new(options.cache_capacity);
        Self { engine: Arc::new(engine), options, cache }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Compiles a path expression, reusing an earlier compilation of the same
    /// text.
    pub fn compile_path(&self, text: &str) -> Result<CompiledQuery<E>, CompileError> {
        self.compile_cached(text, None)
    }

    /// Compiles a full query, locating the end of its prolog first.
    pub fn compile_query(&self, text: &str) -> Result<CompiledQuery<E>, CompileError> {
        self.compile_cached(text, Some(find_prolog_boundary(text)))
    }

    fn compile_cached(&self, text: &str, prolog_boundary: Option<usize>) -> Result<CompiledQuery<E>, CompileError> {
        let key = QueryKey {
            text: text.to_owned(),
            context_variable: self.options.context_variable.clone(),
            prolog_boundary,
            default_element_namespace: self.options.default_element_namespace.clone(),
            namespaces: self.options.namespaces.clone(),
            variables: self.options.external_variables.clone(),
        };
        self.cache.get_or_compile(key, |key| {
            compile_with_variables(
                &self.engine,
                &key.text,
                &key.context_variable,
                &key.namespaces,
                key.default_element_namespace.as_deref(),
                key.prolog_boundary,
                &key.variables,
            )
        })
    }

    /// Prepares one execution of `compiled` at `context`.
    pub fn execute(
        &self,
        compiled: &CompiledQuery<E>,
        context: &Cursor,
        bindings: &VariableBindings,
    ) -> Result<QueryExecution<E>, BindError> {
        let mut execution = QueryExecution::with_classifier(compiled, context, Arc::clone(&self.options.classifier));
        execution.bind(bindings)?;
        Ok(execution)
    }

    /// Compiles `text` as a path expression, runs it at `context` and returns
    /// the results.
    pub fn select(&self, context: &Cursor, text: &str, bindings: &VariableBindings) -> Result<Selection, BridgeError> {
        let compiled = self.compile_path(text)?;
        let mut selection = Selection::new();
        self.execute(&compiled, context, bindings)?.materialize_into(&mut selection)?;
        Ok(selection)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
