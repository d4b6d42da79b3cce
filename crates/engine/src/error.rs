use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// The expression text is not well formed.
    Syntax,
    /// Static analysis failed: unknown prefix, undeclared variable and the like.
    Static,
    /// Evaluation failed.
    Dynamic,
    /// A bound value has a type the engine cannot accept.
    Type,
}

#[derive(Debug, Clone, Error)]
#[error("{kind:?} error: {message}")]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Syntax, message)
    }

    pub fn static_err(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Static, message)
    }

    pub fn dynamic(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Dynamic, message)
    }
}
