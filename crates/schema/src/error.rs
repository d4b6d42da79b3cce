use thiserror::Error;
use xqbridge_store::StoreError;

use crate::types::BuiltinSimpleType;

/// Text that is not in the lexical space of the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LexicalError {
    pub message: String,
}

impl LexicalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("'{lexical}' is not a valid {ty}")]
    InvalidLexical {
        ty: BuiltinSimpleType,
        lexical: String,
        #[source]
        source: LexicalError,
    },
    #[error("auto-typing requires locale '{locale}' to be entered")]
    LocaleNotEntered { locale: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}
