use crate::context::{DynamicContext, StaticContext};
use crate::error::EngineError;
use crate::node::EngineNode;
use crate::xdm::{XdmSequence, XdmValue};

/// Capability surface of an expression engine.
///
/// The bridge compiles once, binds variables per execution and evaluates once
/// per execution. Implementations must be shareable across threads; a compiled
/// form carries no document affinity.
pub trait QueryEngine: Send + Sync {
    type Node: EngineNode;
    type Compiled: Send + Sync;

    /// Parses and statically checks `text` against `ctx`.
    fn compile(&self, text: &str, ctx: &StaticContext) -> Result<Self::Compiled, EngineError>;

    /// Adds an external variable to `ctx`.
    fn bind_variable(
        &self,
        ctx: &mut DynamicContext<Self::Node>,
        name: &str,
        value: XdmValue<Self::Node>,
    ) -> Result<(), EngineError> {
        ctx.variables.insert(name.to_owned(), value);
        Ok(())
    }

    /// Evaluates a compiled expression and returns the full result sequence.
    fn evaluate(
        &self,
        compiled: &Self::Compiled,
        ctx: &DynamicContext<Self::Node>,
    ) -> Result<XdmSequence<Self::Node>, EngineError>;
}
