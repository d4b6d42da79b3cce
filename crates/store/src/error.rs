use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error reported by document store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: Option<String>,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: Some(message.into()) }
    }

    pub fn simple(kind: StoreErrorKind) -> Self {
        Self { kind, message: None }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{msg}"),
            None => write!(f, "{:#?}", self.kind),
        }
    }
}

impl Error for StoreError {}

/// Categorises store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// The XML source could not be parsed.
    Parse,
    /// Writing the XML text form failed.
    Serialization,
    /// The cursor points at a node that was removed from its document.
    Detached,
    /// The operation is not defined for the node kind under the cursor.
    UnsupportedOperation,
}
