//! XML text import (via `roxmltree`) and export (via `quick-xml`).

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesPI, BytesStart, BytesText, Event};

use crate::document::{NodeData, NodeId, Tree};
use crate::error::{StoreError, StoreErrorKind};
use crate::name::{NodeKind, QName};

pub(crate) fn parse_into(tree: &mut Tree, text: &str) -> Result<(), StoreError> {
    let parsed = roxmltree::Document::parse(text)
        .map_err(|err| StoreError::new(StoreErrorKind::Parse, format!("invalid XML: {err}")))?;
    for child in parsed.root().children() {
        import_node(tree, NodeId::ROOT, child);
    }
    Ok(())
}

fn import_node(tree: &mut Tree, parent: NodeId, node: roxmltree::Node<'_, '_>) {
    match node.node_type() {
        roxmltree::NodeType::Element => {
            let name = element_name(node);
            let id = tree.append_child(parent, NodeData::new(NodeKind::Element, Some(name), None));
            let declared = declared_namespaces(node);
            if let Some(data) = tree.get_mut(id) {
                data.namespaces = declared;
            }
            for attribute in node.attributes() {
                let name = QName {
                    prefix: attribute.namespace().and_then(|uri| node.lookup_prefix(uri)).map(str::to_owned),
                    local: attribute.name().to_owned(),
                    ns_uri: attribute.namespace().map(str::to_owned),
                };
                tree.append_attribute(
                    id,
                    NodeData::new(NodeKind::Attribute, Some(name), Some(attribute.value().to_owned())),
                );
            }
            for child in node.children() {
                import_node(tree, id, child);
            }
        }
        roxmltree::NodeType::Text => {
            let value = node.text().unwrap_or_default().to_owned();
            tree.append_child(parent, NodeData::new(NodeKind::Text, None, Some(value)));
        }
        roxmltree::NodeType::Comment => {
            let value = node.text().unwrap_or_default().to_owned();
            tree.append_child(parent, NodeData::new(NodeKind::Comment, None, Some(value)));
        }
        roxmltree::NodeType::PI => {
            if let Some(pi) = node.pi() {
                tree.append_child(
                    parent,
                    NodeData::new(
                        NodeKind::ProcessingInstruction,
                        Some(QName::local(pi.target)),
                        Some(pi.value.unwrap_or_default().to_owned()),
                    ),
                );
            }
        }
        roxmltree::NodeType::Root => {}
    }
}

fn element_name(node: roxmltree::Node<'_, '_>) -> QName {
    let tag = node.tag_name();
    QName {
        prefix: tag.namespace().and_then(|uri| node.lookup_prefix(uri)).map(str::to_owned),
        local: tag.name().to_owned(),
        ns_uri: tag.namespace().map(str::to_owned),
    }
}

/// In-scope namespaces of `node` minus those already in scope on its parent.
fn declared_namespaces(node: roxmltree::Node<'_, '_>) -> Vec<(Option<String>, String)> {
    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();
    node.namespaces()
        .filter(|ns| ns.name() != Some("xml"))
        .filter(|ns| !inherited.contains(&(ns.name(), ns.uri())))
        .map(|ns| (ns.name().map(str::to_owned), ns.uri().to_owned()))
        .collect()
}

pub(crate) fn serialize(tree: &Tree, node: NodeId) -> Result<String, StoreError> {
    let Some(data) = tree.get(node) else {
        return Ok(String::new());
    };
    if data.kind == NodeKind::Attribute {
        return Ok(data.value.clone().unwrap_or_default());
    }
    let mut writer = Writer::new(Vec::new());
    write_node(&mut writer, tree, node)?;
    String::from_utf8(writer.into_inner())
        .map_err(|err| StoreError::new(StoreErrorKind::Serialization, err.to_string()))
}

fn write_node(writer: &mut Writer<Vec<u8>>, tree: &Tree, id: NodeId) -> Result<(), StoreError> {
    let Some(node) = tree.get(id) else {
        return Ok(());
    };
    match node.kind {
        NodeKind::Document => {
            for child in &node.children {
                write_node(writer, tree, *child)?;
            }
            Ok(())
        }
        NodeKind::Element => {
            let qualified = node.name.as_ref().map(QName::qualified).unwrap_or_default();
            let mut start = BytesStart::new(qualified.as_str());
            for (prefix, uri) in &node.namespaces {
                let key = match prefix {
                    Some(p) => format!("xmlns:{p}"),
                    None => "xmlns".to_owned(),
                };
                start.push_attribute((key.as_str(), uri.as_str()));
            }
            for attr in node.attributes.iter().filter_map(|a| tree.get(*a)) {
                let key = attr.name.as_ref().map(QName::qualified).unwrap_or_default();
                start.push_attribute((key.as_str(), attr.value.as_deref().unwrap_or_default()));
            }
            if node.children.is_empty() {
                return emit(writer, Event::Empty(start));
            }
            emit(writer, Event::Start(start))?;
            for child in &node.children {
                write_node(writer, tree, *child)?;
            }
            emit(writer, Event::End(BytesEnd::new(qualified.as_str())))
        }
        NodeKind::Text => emit(writer, Event::Text(BytesText::new(node.value.as_deref().unwrap_or_default()))),
        NodeKind::Attribute => Ok(()),
        NodeKind::Comment => {
            emit(writer, Event::Comment(BytesText::new(node.value.as_deref().unwrap_or_default())))
        }
        NodeKind::ProcessingInstruction => {
            let target = node.name.as_ref().map(|n| n.local.as_str()).unwrap_or_default();
            let content = match node.value.as_deref() {
                Some(data) if !data.is_empty() => format!("{target} {data}"),
                _ => target.to_owned(),
            };
            emit(writer, Event::PI(BytesPI::new(content)))
        }
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), StoreError> {
    writer
        .write_event(event)
        .map_err(|err| StoreError::new(StoreErrorKind::Serialization, err.to_string()))
}

#[cfg(test)]
mod tests {
    use crate::Store;
    use rstest::rstest;

    #[rstest]
    #[case("<a/>")]
    #[case(r#"<a x="1"><b>t &amp; u</b><!--c--></a>"#)]
    #[case(r#"<p:a xmlns:p="urn:p"><p:b/></p:a>"#)]
    fn serializes_what_it_parsed(#[case] xml: &str) {
        let doc = Store::new().parse_document(xml).unwrap();
        assert_eq!(doc.new_cursor().xml_text().unwrap(), xml);
    }

    #[rstest]
    fn keeps_namespace_of_elements() {
        let doc = Store::new().parse_document(r#"<root xmlns="urn:d"><x/></root>"#).unwrap();
        let mut cursor = doc.new_cursor();
        cursor.to_first_child();
        cursor.to_first_child();
        let name = cursor.name().unwrap();
        assert_eq!(name.ns_uri.as_deref(), Some("urn:d"));
        assert_eq!(name.prefix, None);
        assert_eq!(doc.lookup_namespace(cursor.node(), None).as_deref(), Some("urn:d"));
    }

    #[rstest]
    fn malformed_input_is_a_parse_error() {
        let err = Store::new().parse_document("<a>").unwrap_err();
        assert_eq!(err.kind, crate::StoreErrorKind::Parse);
    }
}
