use xqbridge_engine::{EngineNode, StoreNode, XdmItem};
use xqbridge_schema::{AtomicValue, ValueClassifier};
use xqbridge_store::{Cursor, Document};

use crate::error::MaterializationError;

/// Turns one result item into a cursor owned by `owner`'s store.
///
/// Nodes of the store come back as a cursor at that very node, however many
/// pass-through layers the engine put around them. Everything else is written
/// into a fresh fragment, typed, and returned as a cursor on its value.
pub fn materialize<N: EngineNode>(
    item: &XdmItem<N>,
    owner: &Document,
    classifier: &dyn ValueClassifier,
) -> Result<Cursor, MaterializationError> {
    match item {
        XdmItem::Node(node) => match resolve_store_node(node, owner) {
            Some(store_node) => store_node.cursor().ok_or(MaterializationError::DetachedNode),
            None => {
                tracing::trace!(?node, "engine-built node materialized as untyped value");
                materialize_scalar(&AtomicValue::UntypedAtomic(node.string_value()), owner, classifier)
            }
        },
        XdmItem::Atomic(value) => materialize_scalar(value, owner, classifier),
    }
}

/// Peels wrapper layers until a node of `owner`'s store shows up.
fn resolve_store_node<N: EngineNode>(node: &N, owner: &Document) -> Option<StoreNode> {
    let mut current = node.clone();
    loop {
        if let Some(store_node) = current.as_store_node()
            && store_node.document().same_store(owner)
        {
            return Some(store_node.clone());
        }
        current = current.underlying()?;
    }
}

/// Lexical text written into a scalar fragment.
fn render(value: &AtomicValue) -> String {
    match value {
        AtomicValue::Date { date, .. } => date.format("%Y-%m-%d").to_string(),
        AtomicValue::Decimal(d) => d.to_string(),
        AtomicValue::Integer(i) => i.to_string(),
        other => other.lexical(),
    }
}

fn materialize_scalar(
    value: &AtomicValue,
    owner: &Document,
    classifier: &dyn ValueClassifier,
) -> Result<Cursor, MaterializationError> {
    if let AtomicValue::QName(name) = value
        && let Some(ns_uri) = &name.ns_uri
        && name.prefix.as_deref().is_none_or(str::is_empty)
    {
        return Err(MaterializationError::UnprefixedQName { ns_uri: ns_uri.clone(), local: name.local.clone() });
    }
    let _locale = owner.locale().enter();
    let fragment = owner.new_empty_fragment();
    let mut cursor = fragment.new_temp_cursor();
    let text = render(value);
    cursor.set_text(&text)?;
    let hint = classifier.classify(value);
    classifier.auto_type(&cursor, hint)?;
    cursor.advance_to_first_content();
    tracing::trace!(%hint, text = %text, "materialized scalar");
    Ok(cursor)
}
