//! In-memory, mutable XML document store navigated through cursors.
//!
//! Every document carries a mutation version that is bumped on each change, which
//! lets readers detect concurrent modification without holding locks.

mod cursor;
mod document;
mod error;
mod locale;
mod name;
mod selection;
mod xml;

pub use cursor::{Cursor, CursorKind};
pub use document::{Document, DocumentId, NodeId, Store, StoreId};
pub use error::{StoreError, StoreErrorKind};
pub use locale::{Locale, LocaleGuard};
pub use name::{NodeKind, QName};
pub use selection::Selection;
