use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use lru::LruCache;
use xqbridge_engine::QueryEngine;

use crate::compiler::{CompiledQuery, NamespaceMap};
use crate::error::CompileError;

/// Everything a compiled query depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub text: String,
    pub context_variable: String,
    pub prolog_boundary: Option<usize>,
    pub default_element_namespace: Option<String>,
    pub namespaces: NamespaceMap,
    pub variables: Vec<String>,
}

/// Counters describing cache effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
}

/// Bounded least-recently-used cache of compiled queries.
pub struct QueryCache<E: QueryEngine> {
    entries: Mutex<LruCache<QueryKey, CompiledQuery<E>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<E: QueryEngine> QueryCache<E> {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { entries: Mutex::new(LruCache::new(capacity)), hits: AtomicU64::new(0), misses: AtomicU64::new(0) }
    }

    /// Returns the cached query for `key`, compiling and inserting it on a miss.
    /// The lock is not held while compiling; concurrent misses for one key may
    /// both compile, and the last one wins.
    pub fn get_or_compile<F>(&self, key: QueryKey, compile: F) -> Result<CompiledQuery<E>, CompileError>
    where
        F: FnOnce(&QueryKey) -> Result<CompiledQuery<E>, CompileError>,
    {
        if let Some(found) = self.entries.lock().unwrap_or_else(PoisonError::into_inner).get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(found.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let compiled = compile(&key)?;
        tracing::trace!(text = %key.text, "cached compiled query");
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).put(key, compiled.clone());
        Ok(compiled)
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: self.entries.lock().unwrap_or_else(PoisonError::into_inner).len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use rstest::rstest;
    use std::sync::Arc;
    use xqbridge_engine_mock::{ScriptedEngine, scripts};

    fn key(text: &str) -> QueryKey {
        QueryKey {
            text: text.to_owned(),
            context_variable: "this".to_owned(),
            prolog_boundary: None,
            default_element_namespace: None,
            namespaces: NamespaceMap::new(),
            variables: Vec::new(),
        }
    }

    fn engine() -> Arc<ScriptedEngine> {
        Arc::new(ScriptedEngine::new().with_script("a", scripts::children_named("a")).with_script("b", scripts::children_named("b")))
    }

    fn compile_key(engine: &Arc<ScriptedEngine>) -> impl Fn(&QueryKey) -> Result<CompiledQuery<ScriptedEngine>, CompileError> {
        let engine = Arc::clone(engine);
        move |k| compile(&engine, &k.text, &k.context_variable, &k.namespaces, None, None)
    }

    #[rstest]
    fn hit_returns_same_query() {
        let engine = engine();
        let cache = QueryCache::new(4);
        let first = cache.get_or_compile(key("a"), compile_key(&engine)).unwrap();
        let second = cache.get_or_compile(key("a"), compile_key(&engine)).unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(engine.compile_count(), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, len: 1 });
    }

    #[rstest]
    fn least_recently_used_is_evicted() {
        let engine = engine();
        let cache = QueryCache::new(1);
        cache.get_or_compile(key("a"), compile_key(&engine)).unwrap();
        cache.get_or_compile(key("b"), compile_key(&engine)).unwrap();
        cache.get_or_compile(key("a"), compile_key(&engine)).unwrap();
        assert_eq!(engine.compile_count(), 3);
        assert_eq!(cache.stats().len, 1);
    }

    #[rstest]
    fn failures_are_not_cached() {
        let engine = engine();
        let cache = QueryCache::new(4);
        assert!(cache.get_or_compile(key("unknown"), compile_key(&engine)).is_err());
        assert_eq!(cache.stats().len, 0);
    }
}
