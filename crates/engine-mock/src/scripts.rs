//! Ready-made scripts for common test expressions.

use xqbridge_engine::{EngineError, EngineErrorKind, XdmItem, XdmNode, XdmSequence};
use xqbridge_schema::AtomicValue;
use xqbridge_store::{NodeKind, QName};

use crate::engine::ScriptContext;
use crate::node::MockNode;

type ScriptResult = Result<XdmSequence<MockNode>, EngineError>;

fn focus(ctx: &ScriptContext<'_>) -> Result<MockNode, EngineError> {
    ctx.context_node().cloned().ok_or_else(|| EngineError::dynamic("context item is absent"))
}

fn element_matches(node: &MockNode, ns: Option<&str>, local: &str) -> bool {
    node.kind() == NodeKind::Element
        && node.name().is_some_and(|name: QName| {
            (local == "*" || name.local == local) && name.ns_uri.as_deref() == ns
        })
}

fn nodes(found: Vec<MockNode>) -> XdmSequence<MockNode> {
    found.into_iter().map(XdmItem::Node).collect()
}

/// `local` over the child axis. Unprefixed names resolve against the default
/// element namespace.
pub fn children_named(local: &str) -> impl Fn(&ScriptContext<'_>) -> ScriptResult + Send + Sync + 'static {
    let local = local.to_owned();
    move |ctx| {
        let ns = ctx.default_element_namespace();
        Ok(nodes(focus(ctx)?.children().into_iter().filter(|n| element_matches(n, ns, &local)).collect()))
    }
}

/// `.//local`, unprefixed.
pub fn descendants_named(local: &str) -> impl Fn(&ScriptContext<'_>) -> ScriptResult + Send + Sync + 'static {
    let local = local.to_owned();
    move |ctx| {
        let ns = ctx.default_element_namespace();
        Ok(nodes(focus(ctx)?.descendants().into_iter().filter(|n| element_matches(n, ns, &local)).collect()))
    }
}

/// `.//prefix:local`, the prefix resolved through the static context.
pub fn qualified_descendants(
    prefix: &str,
    local: &str,
) -> impl Fn(&ScriptContext<'_>) -> ScriptResult + Send + Sync + 'static {
    let (prefix, local) = (prefix.to_owned(), local.to_owned());
    move |ctx| {
        let ns = ctx
            .static_ctx
            .namespaces
            .resolve(&prefix)
            .ok_or_else(|| EngineError::static_err(format!("namespace prefix '{prefix}' is not bound")))?;
        Ok(nodes(focus(ctx)?.descendants().into_iter().filter(|n| element_matches(n, Some(ns), &local)).collect()))
    }
}

/// The context item itself.
pub fn context_item() -> impl Fn(&ScriptContext<'_>) -> ScriptResult + Send + Sync + 'static {
    |ctx| Ok(ctx.dynamic.context_item.clone().into_iter().collect())
}

/// `$name`. Maps and opaque values have no item form and raise a type error.
pub fn variable(name: &str) -> impl Fn(&ScriptContext<'_>) -> ScriptResult + Send + Sync + 'static {
    let name = name.to_owned();
    move |ctx| {
        let value = ctx
            .variable(&name)
            .ok_or_else(|| EngineError::dynamic(format!("variable ${name} is not bound")))?;
        value
            .to_sequence()
            .ok_or_else(|| EngineError::new(EngineErrorKind::Type, format!("${name} is not a sequence")))
    }
}

/// A fixed sequence of atomic values.
pub fn atomics(values: Vec<AtomicValue>) -> impl Fn(&ScriptContext<'_>) -> ScriptResult + Send + Sync + 'static {
    move |_| Ok(values.iter().cloned().map(XdmItem::Atomic).collect())
}

/// A node the engine builds itself.
pub fn synthetic(name: &str, value: &str) -> impl Fn(&ScriptContext<'_>) -> ScriptResult + Send + Sync + 'static {
    let node = MockNode::synthetic(name, value);
    move |_| Ok(vec![XdmItem::Node(node.clone())])
}

/// Runs `inner` and wraps every node it returns in `depth` pass-through layers.
pub fn layered<F>(inner: F, depth: usize) -> impl Fn(&ScriptContext<'_>) -> ScriptResult + Send + Sync + 'static
where
    F: Fn(&ScriptContext<'_>) -> ScriptResult + Send + Sync + 'static,
{
    move |ctx| {
        Ok(inner(ctx)?
            .into_iter()
            .map(|item| match item {
                XdmItem::Node(node) => XdmItem::Node(node.layered(depth)),
                atomic @ XdmItem::Atomic(_) => atomic,
            })
            .collect())
    }
}

/// Always fails with a dynamic error.
pub fn fail(message: &str) -> impl Fn(&ScriptContext<'_>) -> ScriptResult + Send + Sync + 'static {
    let message = message.to_owned();
    move |_| Err(EngineError::dynamic(message.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptedEngine;
    use rstest::rstest;
    use xqbridge_engine::{
        DynamicContextBuilder, EngineNode, QueryEngine, StaticContextBuilder, StoreNode, XdmValue,
    };
    use xqbridge_store::Store;

    fn run(engine: &ScriptedEngine, text: &str, ns: Option<&str>, focus: MockNode) -> XdmSequence<MockNode> {
        let mut builder = StaticContextBuilder::new().with_namespace("p", "urn:p");
        if let Some(ns) = ns {
            builder = builder.with_default_element_namespace(ns);
        }
        let compiled = engine.compile(text, &builder.build()).unwrap();
        let dynamic = DynamicContextBuilder::new().with_context_item(XdmItem::Node(focus)).build();
        engine.evaluate(&compiled, &dynamic).unwrap()
    }

    #[rstest]
    fn unprefixed_names_follow_default_namespace() {
        let doc = Store::new().parse_document(r#"<r xmlns="urn:d"><x/><x/></r>"#).unwrap();
        let focus = MockNode::from(StoreNode::new(doc.clone(), doc.root()));
        let engine = ScriptedEngine::new().with_script(".//x", descendants_named("x"));
        assert_eq!(run(&engine, ".//x", Some("urn:d"), focus.clone()).len(), 2);
        assert_eq!(run(&engine, ".//x", None, focus).len(), 0);
    }

    #[rstest]
    fn prefixed_names_resolve_through_static_context() {
        let doc = Store::new().parse_document(r#"<r xmlns:q="urn:p"><q:x/><x/></r>"#).unwrap();
        let focus = MockNode::from(StoreNode::new(doc.clone(), doc.root()));
        let engine = ScriptedEngine::new().with_script(".//p:x", qualified_descendants("p", "x"));
        assert_eq!(run(&engine, ".//p:x", None, focus).len(), 1);
    }

    #[rstest]
    fn layered_wraps_nodes_only() {
        let doc = Store::new().parse_document("<r><a/></r>").unwrap();
        let focus = MockNode::from(StoreNode::new(doc.clone(), doc.root()));
        let engine = ScriptedEngine::new().with_script("r", layered(children_named("r"), 2));
        let items = run(&engine, "r", None, focus);
        let node = items[0].as_node().unwrap();
        assert!(node.as_store_node().is_none());
        assert!(node.innermost_store().is_some());
    }

    #[rstest]
    fn map_variable_is_a_type_error() {
        let engine = ScriptedEngine::new().with_script("$m", variable("m"));
        let compiled = engine.compile("$m", &StaticContextBuilder::new().with_variable("m").build()).unwrap();
        let dynamic = DynamicContextBuilder::new().with_variable("m", XdmValue::Map(Default::default())).build();
        let err = engine.evaluate(&compiled, &dynamic).unwrap_err();
        assert_eq!(err.kind, EngineErrorKind::Type);
    }
}
