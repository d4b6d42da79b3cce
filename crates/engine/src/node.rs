use core::fmt;

use xqbridge_store::{Cursor, Document, NodeId, NodeKind, QName};

/// Read-only node view an engine walks during evaluation.
pub trait XdmNode: Clone + Eq + fmt::Debug + Send + Sync + 'static {
    fn kind(&self) -> NodeKind;
    fn name(&self) -> Option<QName>;
    fn string_value(&self) -> String;

    fn parent(&self) -> Option<Self>;
    fn children(&self) -> Vec<Self>;
    fn attributes(&self) -> Vec<Self>;

    /// Optional hint for document order comparisons.
    fn doc_order_key(&self) -> Option<u64> {
        None
    }

    /// Descendants in document order, excluding `self` and attributes.
    fn descendants(&self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut stack: Vec<Self> = self.children().into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            stack.extend(node.children().into_iter().rev());
            out.push(node);
        }
        out
    }
}

/// Pass-through layer around another node (decorators, proxies, engine wrappers).
pub trait Unwrappable: Sized {
    /// The node one layer down, or `None` if this is not a wrapper.
    fn underlying(&self) -> Option<Self>;
}

/// Node type an engine hands back in its results.
///
/// Store content enters the engine as [`StoreNode`] and may come back wrapped
/// in any number of [`Unwrappable`] layers.
pub trait EngineNode: XdmNode + Unwrappable + From<StoreNode> {
    /// The store node this value is, without unwrapping.
    fn as_store_node(&self) -> Option<&StoreNode>;
}

/// Zero-copy view of a store node.
#[derive(Clone)]
pub struct StoreNode {
    document: Document,
    node: NodeId,
}

impl StoreNode {
    pub fn new(document: Document, node: NodeId) -> Self {
        Self { document, node }
    }

    pub fn from_cursor(cursor: &Cursor) -> Self {
        Self::new(cursor.document().clone(), cursor.node())
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// New pinned cursor at this node, if it is still attached.
    pub fn cursor(&self) -> Option<Cursor> {
        self.document.cursor_at(self.node)
    }

    fn at(&self, node: NodeId) -> Self {
        Self::new(self.document.clone(), node)
    }
}

impl PartialEq for StoreNode {
    fn eq(&self, other: &Self) -> bool {
        self.document.ptr_eq(&other.document) && self.node == other.node
    }
}

impl Eq for StoreNode {}

impl fmt::Debug for StoreNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreNode").field("document", &self.document.id()).field("node", &self.node).finish()
    }
}

impl XdmNode for StoreNode {
    fn kind(&self) -> NodeKind {
        self.document.node_kind(self.node).unwrap_or(NodeKind::Document)
    }

    fn name(&self) -> Option<QName> {
        self.document.node_name(self.node)
    }

    fn string_value(&self) -> String {
        self.document.string_value(self.node)
    }

    fn parent(&self) -> Option<Self> {
        self.document.parent(self.node).map(|p| self.at(p))
    }

    fn children(&self) -> Vec<Self> {
        self.document.children(self.node).into_iter().map(|c| self.at(c)).collect()
    }

    fn attributes(&self) -> Vec<Self> {
        self.document.attributes(self.node).into_iter().map(|a| self.at(a)).collect()
    }

    fn doc_order_key(&self) -> Option<u64> {
        u64::try_from(self.node.index()).ok()
    }
}

impl Unwrappable for StoreNode {
    fn underlying(&self) -> Option<Self> {
        None
    }
}

impl EngineNode for StoreNode {
    fn as_store_node(&self) -> Option<&StoreNode> {
        Some(self)
    }
}
