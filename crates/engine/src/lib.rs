//! Expression engine capability used by the query bridge.
//!
//! An engine sees store content through [`StoreNode`], a zero-copy view that
//! implements [`XdmNode`]. Engines may wrap nodes in their own layers; the
//! [`Unwrappable`] trait lets the bridge peel those layers off again.

mod context;
mod engine;
mod error;
mod node;
mod xdm;

pub use context::{
    Dialect, DynamicContext, DynamicContextBuilder, NamespaceBindings, StaticContext, StaticContextBuilder,
    XML_NAMESPACE,
};
pub use engine::QueryEngine;
pub use error::{EngineError, EngineErrorKind};
pub use node::{EngineNode, StoreNode, Unwrappable, XdmNode};
pub use xdm::{XdmItem, XdmSequence, XdmValue};
