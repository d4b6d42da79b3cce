use core::fmt;
use std::mem;
use std::sync::Arc;

use xqbridge_engine::{DynamicContext, QueryEngine, StoreNode, XdmItem, XdmValue};
use xqbridge_schema::{BuiltinClassifier, ValueClassifier};
use xqbridge_store::{Cursor, Selection};

use crate::binder::{VariableBindings, bind_variables};
use crate::compiler::CompiledQuery;
use crate::error::{BindError, ExecError};
use crate::materialize::materialize;

/// One run of a [`CompiledQuery`] against one context node.
///
/// The document version is captured when the execution is created; results
/// are only produced if the document is still at that version when they are
/// requested. Results can be requested once.
pub struct QueryExecution<E: QueryEngine> {
    state: State<E>,
    version: u64,
}

enum State<E: QueryEngine> {
    Fresh(Pending<E>),
    Consumed,
}

struct Pending<E: QueryEngine> {
    compiled: CompiledQuery<E>,
    context: Cursor,
    dynamic: DynamicContext<E::Node>,
    classifier: Arc<dyn ValueClassifier>,
}

impl<E: QueryEngine> QueryExecution<E> {
    /// Prepares an execution without external variables.
    pub fn new(compiled: &CompiledQuery<E>, context: &Cursor) -> Self {
        Self::with_classifier(compiled, context, Arc::new(BuiltinClassifier))
    }

    pub fn with_classifier(
        compiled: &CompiledQuery<E>,
        context: &Cursor,
        classifier: Arc<dyn ValueClassifier>,
    ) -> Self {
        let version = context.document().current_version();
        tracing::debug!(version, expression = compiled.source(), "prepared query execution");
        Self {
            state: State::Fresh(Pending {
                compiled: compiled.clone(),
                context: context.weak(),
                dynamic: DynamicContext::default(),
                classifier,
            }),
            version,
        }
    }

    /// Document version the execution was prepared against.
    pub fn captured_version(&self) -> u64 {
        self.version
    }

    pub fn is_consumed(&self) -> bool {
        matches!(self.state, State::Consumed)
    }

    /// Binds external variables for this run.
    pub fn bind(&mut self, bindings: &VariableBindings) -> Result<(), BindError> {
        let State::Fresh(pending) = &mut self.state else {
            return Ok(());
        };
        let engine = Arc::clone(pending.compiled.engine());
        bind_variables(engine.as_ref(), &mut pending.dynamic, pending.context.document(), bindings)
    }

    /// Evaluates the query and appends one cursor per result item to
    /// `selection`, in result order.
    ///
    /// Returns `Ok(false)` without doing anything if results were already
    /// requested. On failure, items materialized before the failing one stay
    /// in `selection`; the execution is consumed either way.
    pub fn materialize_into(&mut self, selection: &mut Selection) -> Result<bool, ExecError> {
        let State::Fresh(pending) = mem::replace(&mut self.state, State::Consumed) else {
            return Ok(false);
        };
        let Pending { compiled, context, mut dynamic, classifier } = pending;
        let document = context.document().clone();

        let actual = document.current_version();
        if actual != self.version {
            tracing::warn!(expected = self.version, actual, "document modified before query results were read");
            return Err(ExecError::ConcurrentModification { expected: self.version, actual });
        }
        if !context.is_attached() {
            return Err(ExecError::ContextDetached);
        }

        let engine = compiled.engine();
        let focus = E::Node::from(StoreNode::from_cursor(&context));
        engine.bind_variable(&mut dynamic, compiled.context_variable(), XdmValue::Node(focus.clone()))?;
        dynamic.context_item = Some(XdmItem::Node(focus));
        context.release();

        let items = engine.evaluate(compiled.compiled(), &dynamic)?;
        tracing::debug!(count = items.len(), "query evaluated");
        for (index, item) in items.iter().enumerate() {
            let cursor = materialize(item, &document, classifier.as_ref())
                .map_err(|source| ExecError::Materialization { index, source })?;
            selection.push(&cursor);
            cursor.release();
        }
        Ok(true)
    }
}

impl<E: QueryEngine> fmt::Debug for QueryExecution<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryExecution")
            .field("version", &self.version)
            .field("consumed", &self.is_consumed())
            .finish_non_exhaustive()
    }
}

/// Prepares an execution of `compiled` at `context` with `bindings` bound.
pub fn execute<E: QueryEngine>(
    compiled: &CompiledQuery<E>,
    context: &Cursor,
    bindings: &VariableBindings,
) -> Result<QueryExecution<E>, BindError> {
    let mut execution = QueryExecution::new(compiled, context);
    execution.bind(bindings)?;
    Ok(execution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{NamespaceMap, compile};
    use rstest::rstest;
    use xqbridge_engine_mock::{ScriptedEngine, scripts};
    use xqbridge_store::{Document, Store};

    fn setup(script_body: &str, engine: ScriptedEngine) -> (Arc<ScriptedEngine>, CompiledQuery<ScriptedEngine>) {
        let engine = Arc::new(engine);
        let compiled = compile(&engine, script_body, "this", &NamespaceMap::new(), None, None).unwrap();
        (engine, compiled)
    }

    fn doc() -> Document {
        Store::new().parse_document("<r><a>1</a><a>2</a></r>").unwrap()
    }

    #[rstest]
    fn second_request_is_a_no_op() {
        let (engine, compiled) = setup("//a", ScriptedEngine::new().with_script("//a", scripts::descendants_named("a")));
        let doc = doc();
        let mut execution = QueryExecution::new(&compiled, &doc.new_cursor());
        let mut selection = Selection::new();
        assert!(execution.materialize_into(&mut selection).unwrap());
        assert!(!execution.materialize_into(&mut selection).unwrap());
        assert_eq!(selection.len(), 2);
        assert_eq!(engine.evaluation_count(), 1);
    }

    #[rstest]
    fn modification_after_prepare_is_detected() {
        let (engine, compiled) = setup("//a", ScriptedEngine::new().with_script("//a", scripts::descendants_named("a")));
        let doc = doc();
        let cursor = doc.new_cursor();
        let mut execution = QueryExecution::new(&compiled, &cursor);
        cursor.append_text("late").unwrap();

        let mut selection = Selection::new();
        let err = execution.materialize_into(&mut selection).unwrap_err();
        assert!(matches!(err, ExecError::ConcurrentModification { expected, actual } if actual > expected));
        assert!(selection.is_empty());
        assert_eq!(engine.evaluation_count(), 0);
        assert!(execution.is_consumed());
    }

    #[rstest]
    fn weak_cursor_is_released() {
        let (_engine, compiled) = setup(".", ScriptedEngine::new().with_script(".", scripts::context_item()));
        let doc = doc();
        let mut execution = QueryExecution::new(&compiled, &doc.new_cursor());
        assert_eq!(doc.weak_cursor_count(), 1);
        execution.materialize_into(&mut Selection::new()).unwrap();
        assert_eq!(doc.weak_cursor_count(), 0);
    }

    #[rstest]
    fn dropping_unused_execution_releases_cursor() {
        let (_engine, compiled) = setup(".", ScriptedEngine::new().with_script(".", scripts::context_item()));
        let doc = doc();
        let execution = QueryExecution::new(&compiled, &doc.new_cursor());
        assert_eq!(doc.weak_cursor_count(), 1);
        drop(execution);
        assert_eq!(doc.weak_cursor_count(), 0);
    }

    #[rstest]
    fn context_variable_names_the_focus() {
        let (_engine, compiled) = setup("$this", ScriptedEngine::new().with_script("$this", scripts::variable("this")));
        let doc = doc();
        let mut cursor = doc.new_cursor();
        cursor.to_child("r");
        let mut selection = Selection::new();
        QueryExecution::new(&compiled, &cursor).materialize_into(&mut selection).unwrap();
        assert!(selection.get(0).unwrap().is_at_same_position(&cursor));
    }

    #[rstest]
    fn engine_failure_consumes_execution() {
        let (_engine, compiled) = setup("boom", ScriptedEngine::new().with_script("boom", scripts::fail("boom")));
        let doc = doc();
        let mut execution = QueryExecution::new(&compiled, &doc.new_cursor());
        let err = execution.materialize_into(&mut Selection::new()).unwrap_err();
        assert!(matches!(err, ExecError::Engine(_)));
        assert!(!execution.materialize_into(&mut Selection::new()).unwrap());
    }
}
