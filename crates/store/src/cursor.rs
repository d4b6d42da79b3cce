use std::fmt;

use crate::document::{Document, NodeData, NodeId, detached};
use crate::error::{StoreError, StoreErrorKind};
use crate::name::{NodeKind, QName};
use crate::xml;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorKind {
    /// Regular navigation handle.
    Pinned,
    /// Tracks a logical position without preventing mutation of the document.
    Weak,
    /// Scratch handle used while building new content.
    Temp,
}

/// Navigable position handle into a [`Document`].
///
/// A cursor is registered with its document while alive. It is released either
/// explicitly through [`Cursor::release`] or implicitly on drop.
pub struct Cursor {
    document: Document,
    node: NodeId,
    kind: CursorKind,
}

impl Cursor {
    pub(crate) fn register(document: Document, node: NodeId, kind: CursorKind) -> Self {
        document.cursor_opened(kind);
        Self { document, node, kind }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn kind(&self) -> CursorKind {
        self.kind
    }

    pub fn is_weak(&self) -> bool {
        self.kind == CursorKind::Weak
    }

    /// Releases the handle. Content the cursor pointed at is unaffected.
    pub fn release(self) {
        drop(self);
    }

    /// New pinned cursor at the same position.
    pub fn duplicate(&self) -> Cursor {
        Cursor::register(self.document.clone(), self.node, CursorKind::Pinned)
    }

    /// New weak cursor at the same position.
    pub fn weak(&self) -> Cursor {
        Cursor::register(self.document.clone(), self.node, CursorKind::Weak)
    }

    /// Same document and same node.
    pub fn is_at_same_position(&self, other: &Cursor) -> bool {
        self.document.ptr_eq(&other.document) && self.node == other.node
    }

    pub fn is_attached(&self) -> bool {
        self.document.is_attached(self.node)
    }

    pub fn node_kind(&self) -> NodeKind {
        self.document.node_kind(self.node).unwrap_or(NodeKind::Document)
    }

    pub fn name(&self) -> Option<QName> {
        self.document.node_name(self.node)
    }

    /// String value of the node under the cursor.
    pub fn text(&self) -> String {
        self.document.string_value(self.node)
    }

    /// Value of the attribute with the given unqualified name.
    pub fn attribute(&self, local: &str) -> Option<String> {
        let tree = self.document.read();
        let node = tree.get(self.node)?;
        node.attributes.iter().filter_map(|id| tree.get(*id)).find_map(|attr| {
            attr.name
                .as_ref()
                .filter(|name| name.local == local && name.ns_uri.is_none())
                .and(attr.value.clone())
        })
    }

    /// Schema type assigned to this node. Text nodes report the type of their
    /// parent, which owns the typed value.
    pub fn type_annotation(&self) -> Option<QName> {
        let tree = self.document.read();
        let node = tree.get(self.node)?;
        if node.type_annotation.is_some() {
            return node.type_annotation.clone();
        }
        match node.kind {
            NodeKind::Text => node.parent.and_then(|p| tree.get(p)).and_then(|p| p.type_annotation.clone()),
            _ => None,
        }
    }

    pub fn to_parent(&mut self) -> bool {
        self.move_to(self.document.parent(self.node))
    }

    pub fn to_first_child(&mut self) -> bool {
        self.move_to(self.document.children(self.node).first().copied())
    }

    pub fn to_next_sibling(&mut self) -> bool {
        let next = {
            let tree = self.document.read();
            let Some(parent) = tree.get(self.node).and_then(|n| n.parent) else {
                return false;
            };
            tree.get(parent).and_then(|p| {
                let pos = p.children.iter().position(|c| *c == self.node)?;
                p.children.get(pos + 1).copied()
            })
        };
        self.move_to(next)
    }

    /// Moves to the first child element whose local name is `local`.
    pub fn to_child(&mut self, local: &str) -> bool {
        let found = {
            let tree = self.document.read();
            tree.get(self.node).and_then(|node| {
                node.children.iter().copied().find(|id| {
                    tree.get(*id).is_some_and(|c| {
                        c.kind == NodeKind::Element && c.name.as_ref().is_some_and(|n| n.local == local)
                    })
                })
            })
        };
        self.move_to(found)
    }

    /// Moves from a container start onto its first content token. Used to step
    /// past the wrapper of a freshly built fragment onto the value it holds.
    pub fn advance_to_first_content(&mut self) -> bool {
        match self.node_kind() {
            NodeKind::Document | NodeKind::Element => self.to_first_child(),
            _ => false,
        }
    }

    fn move_to(&mut self, target: Option<NodeId>) -> bool {
        match target {
            Some(node) => {
                self.node = node;
                true
            }
            None => false,
        }
    }

    /// Replaces the content of the node under the cursor with `text`.
    pub fn set_text(&self, text: &str) -> Result<(), StoreError> {
        {
            let mut tree = self.document.write();
            let kind = tree.attached(self.node)?.kind.clone();
            match kind {
                NodeKind::Document | NodeKind::Element => {
                    let old = tree.get(self.node).map(|n| n.children.clone()).unwrap_or_default();
                    for child in old {
                        tree.detach_subtree(child);
                    }
                    if let Some(node) = tree.get_mut(self.node) {
                        node.children.clear();
                    }
                    if !text.is_empty() {
                        tree.append_child(self.node, NodeData::new(NodeKind::Text, None, Some(text.to_owned())));
                    }
                }
                _ => {
                    if let Some(node) = tree.get_mut(self.node) {
                        node.value = Some(text.to_owned());
                    }
                }
            }
        }
        self.document.bump_version();
        Ok(())
    }

    /// Appends a new child element and returns a pinned cursor on it.
    pub fn append_element(&self, name: QName) -> Result<Cursor, StoreError> {
        let id = {
            let mut tree = self.document.write();
            self.require_container(&tree, "append_element")?;
            tree.append_child(self.node, NodeData::new(NodeKind::Element, Some(name), None))
        };
        self.document.bump_version();
        Ok(Cursor::register(self.document.clone(), id, CursorKind::Pinned))
    }

    /// Appends a text node to the element or document under the cursor.
    pub fn append_text(&self, text: &str) -> Result<(), StoreError> {
        {
            let mut tree = self.document.write();
            self.require_container(&tree, "append_text")?;
            tree.append_child(self.node, NodeData::new(NodeKind::Text, None, Some(text.to_owned())));
        }
        self.document.bump_version();
        Ok(())
    }

    /// Sets (or replaces) an attribute on the element under the cursor.
    pub fn set_attribute(&self, name: QName, value: &str) -> Result<(), StoreError> {
        {
            let mut tree = self.document.write();
            if tree.attached(self.node)?.kind != NodeKind::Element {
                return Err(unsupported("set_attribute", &NodeKind::Attribute));
            }
            let existing = tree.get(self.node).and_then(|node| {
                node.attributes.iter().copied().find(|id| {
                    tree.get(*id).and_then(|a| a.name.as_ref()).is_some_and(|n| n.matches(&name))
                })
            });
            match existing.and_then(|id| tree.get_mut(id)) {
                Some(attr) => attr.value = Some(value.to_owned()),
                None => {
                    tree.append_attribute(
                        self.node,
                        NodeData::new(NodeKind::Attribute, Some(name), Some(value.to_owned())),
                    );
                }
            }
        }
        self.document.bump_version();
        Ok(())
    }

    /// Removes the node under the cursor (and its subtree) from the document.
    /// The cursor stays on the detached node.
    pub fn remove(&self) -> Result<(), StoreError> {
        {
            let mut tree = self.document.write();
            let parent = tree.attached(self.node)?.parent.ok_or_else(|| {
                StoreError::new(StoreErrorKind::UnsupportedOperation, "the document node cannot be removed")
            })?;
            if let Some(p) = tree.get_mut(parent) {
                p.children.retain(|c| *c != self.node);
                p.attributes.retain(|a| *a != self.node);
            }
            tree.detach_subtree(self.node);
        }
        self.document.bump_version();
        Ok(())
    }

    /// Records the schema type of the node. Annotation is metadata and does not
    /// change the document version.
    pub fn set_type_annotation(&self, type_name: QName) -> Result<(), StoreError> {
        let mut tree = self.document.write();
        tree.attached(self.node)?;
        if let Some(node) = tree.get_mut(self.node) {
            node.type_annotation = Some(type_name);
        }
        Ok(())
    }

    /// XML text of the node under the cursor.
    pub fn xml_text(&self) -> Result<String, StoreError> {
        let tree = self.document.read();
        tree.attached(self.node)?;
        xml::serialize(&tree, self.node)
    }

    fn require_container(&self, tree: &crate::document::Tree, op: &str) -> Result<(), StoreError> {
        let kind = tree.get(self.node).filter(|n| !n.detached).map(|n| n.kind.clone()).ok_or_else(|| detached(self.node))?;
        match kind {
            NodeKind::Document | NodeKind::Element => Ok(()),
            other => Err(unsupported(op, &other)),
        }
    }
}

fn unsupported(op: &str, kind: &NodeKind) -> StoreError {
    StoreError::new(StoreErrorKind::UnsupportedOperation, format!("{op} is not supported on {kind:?} nodes"))
}

impl Clone for Cursor {
    fn clone(&self) -> Self {
        Cursor::register(self.document.clone(), self.node, self.kind)
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        self.document.cursor_released(self.kind);
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("document", &self.document.id())
            .field("node", &self.node.index())
            .field("kind", &self.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;
    use rstest::rstest;

    fn sample() -> Document {
        Store::new()
            .parse_document(r#"<order id="7"><item sku="a">Apple</item><item sku="b">Pear</item></order>"#)
            .expect("sample parses")
    }

    #[rstest]
    fn navigates_children_and_siblings() {
        let doc = sample();
        let mut cursor = doc.new_cursor();
        assert!(cursor.to_first_child());
        assert_eq!(cursor.name().map(|n| n.local), Some("order".to_owned()));
        assert_eq!(cursor.attribute("id").as_deref(), Some("7"));
        assert!(cursor.to_child("item"));
        assert_eq!(cursor.text(), "Apple");
        assert!(cursor.to_next_sibling());
        assert_eq!(cursor.attribute("sku").as_deref(), Some("b"));
        assert!(!cursor.to_next_sibling());
        assert!(cursor.to_parent());
        assert_eq!(cursor.text(), "ApplePear");
    }

    #[rstest]
    fn every_mutation_bumps_version() {
        let doc = sample();
        let mut cursor = doc.new_cursor();
        cursor.to_first_child();
        let v0 = doc.current_version();
        cursor.set_attribute(QName::local("id"), "8").unwrap();
        let v1 = doc.current_version();
        let child = cursor.append_element(QName::local("note")).unwrap();
        let v2 = doc.current_version();
        child.set_text("fragile").unwrap();
        let v3 = doc.current_version();
        child.remove().unwrap();
        let v4 = doc.current_version();
        assert!(v0 < v1 && v1 < v2 && v2 < v3 && v3 < v4);
        assert_eq!(cursor.attribute("id").as_deref(), Some("8"));
    }

    #[rstest]
    fn annotation_does_not_bump_version() {
        let doc = sample();
        let cursor = doc.new_cursor();
        let before = doc.current_version();
        cursor.set_type_annotation(QName::local("marker")).unwrap();
        assert_eq!(doc.current_version(), before);
    }

    #[rstest]
    fn removed_node_rejects_mutation() {
        let doc = sample();
        let mut cursor = doc.new_cursor();
        cursor.to_first_child();
        cursor.to_child("item");
        cursor.remove().unwrap();
        assert!(!cursor.is_attached());
        let err = cursor.set_text("x").unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::Detached);
    }

    #[rstest]
    fn advance_to_first_content_skips_wrapper() {
        let doc = Store::new().new_document();
        let mut cursor = doc.new_temp_cursor();
        cursor.set_text("42").unwrap();
        assert!(cursor.advance_to_first_content());
        assert_eq!(cursor.node_kind(), NodeKind::Text);
        assert_eq!(cursor.text(), "42");
        assert!(!cursor.advance_to_first_content());
    }

    #[rstest]
    fn text_node_reports_parent_annotation() {
        let doc = Store::new().new_document();
        let mut cursor = doc.new_temp_cursor();
        cursor.set_text("1").unwrap();
        cursor.set_type_annotation(QName::local("typed")).unwrap();
        cursor.advance_to_first_content();
        assert_eq!(cursor.type_annotation(), Some(QName::local("typed")));
    }
}
