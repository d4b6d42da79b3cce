use core::fmt;
use std::sync::Arc;

use xqbridge_engine::{EngineNode, StoreNode, Unwrappable, XdmNode};
use xqbridge_store::{NodeKind, QName};

/// Element built by the engine itself, not backed by any store.
#[derive(Debug)]
pub struct SyntheticNode {
    pub name: QName,
    pub value: String,
}

/// Node type of [`ScriptedEngine`](crate::ScriptedEngine).
#[derive(Clone)]
pub enum MockNode {
    Store(StoreNode),
    /// Pass-through layer, as engines add when they decorate nodes.
    Layer(Box<MockNode>),
    Synthetic(Arc<SyntheticNode>),
}

impl MockNode {
    pub fn synthetic(name: &str, value: impl Into<String>) -> Self {
        MockNode::Synthetic(Arc::new(SyntheticNode { name: QName::local(name), value: value.into() }))
    }

    /// Wraps `self` in `depth` pass-through layers.
    pub fn layered(self, depth: usize) -> Self {
        (0..depth).fold(self, |node, _| MockNode::Layer(Box::new(node)))
    }

    /// The store node below all layers, if any.
    pub fn innermost_store(&self) -> Option<&StoreNode> {
        match self {
            MockNode::Store(node) => Some(node),
            MockNode::Layer(inner) => inner.innermost_store(),
            MockNode::Synthetic(_) => None,
        }
    }

    /// Applies `f` to the store node below the layers and re-wraps the results
    /// at the same depth.
    fn map_store(&self, f: impl Fn(&StoreNode) -> Vec<StoreNode>) -> Vec<MockNode> {
        match self {
            MockNode::Store(node) => f(node).into_iter().map(MockNode::Store).collect(),
            MockNode::Layer(inner) => {
                inner.map_store(f).into_iter().map(|n| MockNode::Layer(Box::new(n))).collect()
            }
            MockNode::Synthetic(_) => Vec::new(),
        }
    }
}

impl PartialEq for MockNode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MockNode::Store(a), MockNode::Store(b)) => a == b,
            (MockNode::Layer(a), MockNode::Layer(b)) => a == b,
            (MockNode::Synthetic(a), MockNode::Synthetic(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for MockNode {}

impl fmt::Debug for MockNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MockNode::Store(node) => node.fmt(f),
            MockNode::Layer(inner) => f.debug_tuple("Layer").field(inner).finish(),
            MockNode::Synthetic(node) => f.debug_tuple("Synthetic").field(&node.name.local).finish(),
        }
    }
}

impl XdmNode for MockNode {
    fn kind(&self) -> NodeKind {
        match self {
            MockNode::Store(node) => node.kind(),
            MockNode::Layer(inner) => inner.kind(),
            MockNode::Synthetic(_) => NodeKind::Element,
        }
    }

    fn name(&self) -> Option<QName> {
        match self {
            MockNode::Store(node) => node.name(),
            MockNode::Layer(inner) => inner.name(),
            MockNode::Synthetic(node) => Some(node.name.clone()),
        }
    }

    fn string_value(&self) -> String {
        match self {
            MockNode::Store(node) => node.string_value(),
            MockNode::Layer(inner) => inner.string_value(),
            MockNode::Synthetic(node) => node.value.clone(),
        }
    }

    fn parent(&self) -> Option<Self> {
        self.map_store(|n| n.parent().into_iter().collect()).into_iter().next()
    }

    fn children(&self) -> Vec<Self> {
        self.map_store(|n| n.children())
    }

    fn attributes(&self) -> Vec<Self> {
        self.map_store(|n| n.attributes())
    }
}

impl Unwrappable for MockNode {
    fn underlying(&self) -> Option<Self> {
        match self {
            MockNode::Layer(inner) => Some((**inner).clone()),
            MockNode::Store(_) | MockNode::Synthetic(_) => None,
        }
    }
}

impl From<StoreNode> for MockNode {
    fn from(node: StoreNode) -> Self {
        MockNode::Store(node)
    }
}

impl EngineNode for MockNode {
    fn as_store_node(&self) -> Option<&StoreNode> {
        match self {
            MockNode::Store(node) => Some(node),
            MockNode::Layer(_) | MockNode::Synthetic(_) => None,
        }
    }
}
