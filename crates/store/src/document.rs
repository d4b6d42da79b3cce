use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::cursor::{Cursor, CursorKind};
use crate::error::StoreError;
use crate::locale::Locale;
use crate::name::{NodeKind, QName};
use crate::xml;

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a store family. Documents (and fragments) created by the same
/// [`Store`] share its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

/// Position of a node inside its document's arena. Ids stay stable for the
/// lifetime of the document, removed nodes are only detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// A family of documents sharing one locale.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    id: StoreId,
    locale: Locale,
    next_document: AtomicU64,
}

impl Store {
    pub fn new() -> Self {
        Self::with_locale(Locale::default())
    }

    pub fn with_locale(locale: Locale) -> Self {
        let id = StoreId(NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed));
        Self { inner: Arc::new(StoreInner { id, locale, next_document: AtomicU64::new(1) }) }
    }

    pub fn id(&self) -> StoreId {
        self.inner.id
    }

    pub fn locale(&self) -> &Locale {
        &self.inner.locale
    }

    /// Creates an empty document (a document node without children).
    pub fn new_document(&self) -> Document {
        Document::create(self.clone(), self.inner.locale.clone(), false)
    }

    /// Parses `xml` into a new document of this store.
    pub fn parse_document(&self, text: &str) -> Result<Document, StoreError> {
        let document = self.new_document();
        {
            let mut tree = document.write();
            xml::parse_into(&mut tree, text)?;
        }
        tracing::debug!(store = self.inner.id.0, document = document.id().0, "parsed document");
        Ok(document)
    }

    fn next_document_id(&self) -> DocumentId {
        DocumentId(self.inner.next_document.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Store {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Store {}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").field("id", &self.inner.id.0).field("locale", &self.inner.locale).finish()
    }
}

#[derive(Debug)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) name: Option<QName>,
    pub(crate) value: Option<String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) attributes: Vec<NodeId>,
    pub(crate) namespaces: Vec<(Option<String>, String)>,
    pub(crate) type_annotation: Option<QName>,
    pub(crate) detached: bool,
}

impl NodeData {
    pub(crate) fn new(kind: NodeKind, name: Option<QName>, value: Option<String>) -> Self {
        Self {
            kind,
            name,
            value,
            parent: None,
            children: Vec::new(),
            attributes: Vec::new(),
            namespaces: Vec::new(),
            type_annotation: None,
            detached: false,
        }
    }
}

/// Arena holding all nodes of one document; index 0 is the document node.
#[derive(Debug)]
pub(crate) struct Tree {
    nodes: Vec<NodeData>,
}

impl Tree {
    fn new() -> Self {
        Self { nodes: vec![NodeData::new(NodeKind::Document, None, None)] }
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.0)
    }

    /// Live node lookup; detached nodes are reported as errors.
    pub(crate) fn attached(&self, id: NodeId) -> Result<&NodeData, StoreError> {
        match self.get(id) {
            Some(node) if !node.detached => Ok(node),
            _ => Err(detached(id)),
        }
    }

    pub(crate) fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(data);
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn append_child(&mut self, parent: NodeId, mut data: NodeData) -> NodeId {
        data.parent = Some(parent);
        let id = self.push(data);
        if let Some(node) = self.get_mut(parent) {
            node.children.push(id);
        }
        id
    }

    pub(crate) fn append_attribute(&mut self, owner: NodeId, mut data: NodeData) -> NodeId {
        data.parent = Some(owner);
        let id = self.push(data);
        if let Some(node) = self.get_mut(owner) {
            node.attributes.push(id);
        }
        id
    }

    /// Marks `id` and its whole subtree as detached.
    pub(crate) fn detach_subtree(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.get_mut(current) {
                node.detached = true;
                pending.extend(node.children.iter().copied());
                pending.extend(node.attributes.iter().copied());
            }
        }
    }

    pub(crate) fn string_value(&self, id: NodeId) -> String {
        let Some(node) = self.get(id) else {
            return String::new();
        };
        match node.kind {
            NodeKind::Document | NodeKind::Element => {
                let mut out = String::new();
                self.collect_text(id, &mut out);
                out
            }
            _ => node.value.clone().unwrap_or_default(),
        }
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        for child in &node.children {
            if let Some(data) = self.get(*child) {
                match data.kind {
                    NodeKind::Text => out.push_str(data.value.as_deref().unwrap_or_default()),
                    NodeKind::Element => self.collect_text(*child, out),
                    _ => {}
                }
            }
        }
    }

    /// Namespace URI bound to `prefix` in scope at `id` (walking ancestors).
    pub(crate) fn lookup_namespace(&self, id: NodeId, prefix: Option<&str>) -> Option<String> {
        let mut current = Some(id);
        while let Some(cur) = current {
            let node = self.get(cur)?;
            if let Some((_, uri)) = node.namespaces.iter().find(|(p, _)| p.as_deref() == prefix) {
                return Some(uri.clone());
            }
            current = node.parent;
        }
        None
    }
}

pub(crate) fn detached(id: NodeId) -> StoreError {
    StoreError::new(
        crate::error::StoreErrorKind::Detached,
        format!("node {} is no longer part of its document", id.0),
    )
}

/// A mutable XML document (or fragment) with a monotonically increasing
/// mutation version.
///
/// Handles are cheap to clone; all clones refer to the same content.
#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

struct DocumentInner {
    id: DocumentId,
    store: Store,
    locale: Locale,
    fragment: bool,
    tree: RwLock<Tree>,
    version: AtomicU64,
    pinned_cursors: AtomicUsize,
    weak_cursors: AtomicUsize,
}

impl Document {
    fn create(store: Store, locale: Locale, fragment: bool) -> Self {
        let id = store.next_document_id();
        Self {
            inner: Arc::new(DocumentInner {
                id,
                store,
                locale,
                fragment,
                tree: RwLock::new(Tree::new()),
                version: AtomicU64::new(0),
                pinned_cursors: AtomicUsize::new(0),
                weak_cursors: AtomicUsize::new(0),
            }),
        }
    }

    pub fn id(&self) -> DocumentId {
        self.inner.id
    }

    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    pub fn locale(&self) -> &Locale {
        &self.inner.locale
    }

    pub fn is_fragment(&self) -> bool {
        self.inner.fragment
    }

    /// Same document (not merely equal content).
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Documents of one store family can reference each other's nodes.
    pub fn same_store(&self, other: &Document) -> bool {
        self.inner.store == other.inner.store
    }

    /// Version counter bumped by every structural or content change.
    pub fn current_version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Cursor at the document node that pins its position.
    pub fn new_cursor(&self) -> Cursor {
        Cursor::register(self.clone(), NodeId::ROOT, CursorKind::Pinned)
    }

    /// Cursor at the document node that tracks, but does not pin, its position.
    pub fn new_weak_cursor(&self) -> Cursor {
        Cursor::register(self.clone(), NodeId::ROOT, CursorKind::Weak)
    }

    /// Scratch cursor used to build new content.
    pub fn new_temp_cursor(&self) -> Cursor {
        Cursor::register(self.clone(), NodeId::ROOT, CursorKind::Temp)
    }

    /// Pinned cursor at `node`, if the node is attached to this document.
    pub fn cursor_at(&self, node: NodeId) -> Option<Cursor> {
        self.is_attached(node).then(|| Cursor::register(self.clone(), node, CursorKind::Pinned))
    }

    /// Creates an empty fragment in the same store, scoped to this document's locale.
    pub fn new_empty_fragment(&self) -> Document {
        let fragment = Document::create(self.inner.store.clone(), self.inner.locale.clone(), true);
        tracing::trace!(owner = self.inner.id.0, fragment = fragment.id().0, "new empty fragment");
        fragment
    }

    /// Number of live pinned and temp cursors.
    pub fn pinned_cursor_count(&self) -> usize {
        self.inner.pinned_cursors.load(Ordering::Acquire)
    }

    pub fn weak_cursor_count(&self) -> usize {
        self.inner.weak_cursors.load(Ordering::Acquire)
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        self.read().get(node).is_some_and(|data| !data.detached)
    }

    pub fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.read().get(node).map(|data| data.kind.clone())
    }

    pub fn node_name(&self, node: NodeId) -> Option<QName> {
        self.read().get(node).and_then(|data| data.name.clone())
    }

    pub fn string_value(&self, node: NodeId) -> String {
        self.read().string_value(node)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.read().get(node).and_then(|data| data.parent)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.read().get(node).map(|data| data.children.clone()).unwrap_or_default()
    }

    pub fn attributes(&self, node: NodeId) -> Vec<NodeId> {
        self.read().get(node).map(|data| data.attributes.clone()).unwrap_or_default()
    }

    /// Namespace declarations made on `node` itself.
    pub fn namespace_declarations(&self, node: NodeId) -> Vec<(Option<String>, String)> {
        self.read().get(node).map(|data| data.namespaces.clone()).unwrap_or_default()
    }

    pub fn lookup_namespace(&self, node: NodeId, prefix: Option<&str>) -> Option<String> {
        self.read().lookup_namespace(node, prefix)
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Tree> {
        self.inner.tree.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Tree> {
        self.inner.tree.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn bump_version(&self) -> u64 {
        self.inner.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn cursor_opened(&self, kind: CursorKind) {
        self.counter(kind).fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn cursor_released(&self, kind: CursorKind) {
        self.counter(kind).fetch_sub(1, Ordering::AcqRel);
    }

    fn counter(&self, kind: CursorKind) -> &AtomicUsize {
        match kind {
            CursorKind::Weak => &self.inner.weak_cursors,
            CursorKind::Pinned | CursorKind::Temp => &self.inner.pinned_cursors,
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.inner.id.0)
            .field("store", &self.inner.store.id().0)
            .field("fragment", &self.inner.fragment)
            .field("version", &self.current_version())
            .finish()
    }
}
