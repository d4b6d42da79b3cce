use thiserror::Error;
use xqbridge_engine::EngineError;
use xqbridge_schema::{ClassificationError, LexicalError};
use xqbridge_store::StoreError;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("cannot compile expression with context variable ${context_variable}: {source}\n{expression}")]
    Engine {
        expression: String,
        context_variable: String,
        #[source]
        source: EngineError,
    },
    #[error("prolog boundary {offset} does not fall on a character boundary of a {len} byte expression")]
    PrologBoundary { offset: usize, len: usize },
}

#[derive(Debug, Error)]
pub enum BindError {
    #[error("variable ${name}: malformed {kind} value")]
    MalformedValue {
        name: String,
        kind: &'static str,
        #[source]
        source: LexicalError,
    },
    #[error("variable ${name} references a node of another store")]
    ForeignStore { name: String },
    #[error("variable ${name} references a node that was removed from its document")]
    DetachedNode { name: String },
    #[error("engine rejected variable ${name}: {source}")]
    Engine {
        name: String,
        #[source]
        source: EngineError,
    },
}

#[derive(Debug, Error)]
pub enum MaterializationError {
    #[error("result node is no longer attached to its document")]
    DetachedNode,
    #[error("cannot build scalar fragment: {0}")]
    Store(#[from] StoreError),
    #[error("cannot type scalar result: {0}")]
    Classification(#[from] ClassificationError),
    #[error("qualified name {{{ns_uri}}}{local} has no prefix to write it with")]
    UnprefixedQName { ns_uri: String, local: String },
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("document was modified after the query was prepared (version {expected}, now {actual})")]
    ConcurrentModification { expected: u64, actual: u64 },
    #[error("context node was removed from its document")]
    ContextDetached,
    #[error("query evaluation failed: {0}")]
    Engine(#[from] EngineError),
    #[error("cannot materialize result item {index}: {source}")]
    Materialization {
        index: usize,
        #[source]
        source: MaterializationError,
    },
}

/// Any failure along compile, bind and materialize.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Exec(#[from] ExecError),
}
