// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Document-level operations: node factories, adoption, quirks mode, and
//! the cached live collections.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tendril::StrTendril;
use willow_markup::interface::QuirksMode;
use willow_markup::{LocalName, Namespace, Prefix, QualName};

use crate::collections::{ListPredicate, NodeList};
use crate::exception::DomException;
use crate::node::{detach, Handle, Node, NodeData, NodeKind};

/// Create an empty document node.
pub fn new_document() -> Handle {
    Node::new(NodeData::Document {
        quirks_mode: Cell::new(QuirksMode::NoQuirks),
        live_lists: Default::default(),
    })
}

/// Allocate a node owned by `doc`.
fn new_node(doc: &Handle, data: NodeData) -> Handle {
    let node = Node::new(data);
    *node.owner.borrow_mut() = Some(Rc::downgrade(doc));
    node
}

/// Create an element from a qualified name, in no namespace.
pub fn create_element(doc: &Handle, qname: &str) -> Result<Handle, DomException> {
    create_element_qual(doc, parse_qualified_name(None, qname)?)
}

/// Create an element from a namespace URI and qualified name.
pub fn create_element_ns(
    doc: &Handle,
    ns: Option<&str>,
    qname: &str,
) -> Result<Handle, DomException> {
    create_element_qual(doc, parse_qualified_name(ns, qname)?)
}

pub(crate) fn create_element_qual(doc: &Handle, name: QualName) -> Result<Handle, DomException> {
    let elem = new_node(
        doc,
        NodeData::Element {
            name,
            attrs: Default::default(),
        },
    );
    if let NodeData::Element { ref attrs, .. } = elem.data {
        attrs.set_owner(&elem);
    }
    Ok(elem)
}

pub fn create_text_node(doc: &Handle, contents: StrTendril) -> Handle {
    new_node(
        doc,
        NodeData::Text {
            contents: RefCell::new(contents),
        },
    )
}

pub fn create_cdata_section(doc: &Handle, contents: StrTendril) -> Handle {
    new_node(
        doc,
        NodeData::CData {
            contents: RefCell::new(contents),
        },
    )
}

pub fn create_comment(doc: &Handle, contents: StrTendril) -> Handle {
    new_node(
        doc,
        NodeData::Comment {
            contents: RefCell::new(contents),
        },
    )
}

pub fn create_processing_instruction(
    doc: &Handle,
    target: StrTendril,
    contents: StrTendril,
) -> Result<Handle, DomException> {
    if !is_valid_name(&target) {
        return Err(DomException::InvalidCharacter);
    }
    Ok(new_node(
        doc,
        NodeData::ProcessingInstruction {
            target,
            contents: RefCell::new(contents),
        },
    ))
}

pub fn create_attribute(doc: &Handle, qname: &str) -> Result<Handle, DomException> {
    let name = parse_qualified_name(None, qname)?;
    Ok(new_attr(doc, name))
}

pub fn create_attribute_ns(
    doc: &Handle,
    ns: Option<&str>,
    qname: &str,
) -> Result<Handle, DomException> {
    let name = parse_qualified_name(ns, qname)?;
    Ok(new_attr(doc, name))
}

pub(crate) fn new_attr(doc: &Handle, name: QualName) -> Handle {
    new_node(
        doc,
        NodeData::Attr {
            name,
            specified: Cell::new(true),
            is_id: Cell::new(false),
            owner_element: RefCell::new(None),
        },
    )
}

pub fn create_entity_reference(doc: &Handle, name: &str) -> Result<Handle, DomException> {
    if !is_valid_name(name) {
        return Err(DomException::InvalidCharacter);
    }
    let node = new_node(
        doc,
        NodeData::EntityReference { name: name.into() },
    );
    node.read_only.set(true);
    Ok(node)
}

pub fn create_document_fragment(doc: &Handle) -> Handle {
    new_node(doc, NodeData::Fragment)
}

/// The document's root element, if any.
pub fn document_element(doc: &Handle) -> Option<Handle> {
    doc.children
        .borrow()
        .iter()
        .find(|c| c.kind() == NodeKind::Element)
        .cloned()
}

/// The document's doctype node, if any.
pub fn doctype(doc: &Handle) -> Option<Handle> {
    doc.children
        .borrow()
        .iter()
        .find(|c| c.kind() == NodeKind::Doctype)
        .cloned()
}

pub fn quirks_mode(doc: &Handle) -> QuirksMode {
    match doc.data {
        NodeData::Document { ref quirks_mode, .. } => quirks_mode.get(),
        _ => panic!("not a document node"),
    }
}

pub fn set_quirks_mode(doc: &Handle, mode: QuirksMode) {
    match doc.data {
        NodeData::Document { ref quirks_mode, .. } => quirks_mode.set(mode),
        _ => panic!("not a document node"),
    }
}

/// Move a node (and its whole subtree, attributes included) into `doc`,
/// detaching it from its old position.  Documents and doctypes cannot be
/// adopted.
pub fn adopt_node(doc: &Handle, node: &Handle) -> Result<Handle, DomException> {
    match node.kind() {
        NodeKind::Document | NodeKind::Doctype => return Err(DomException::NotSupported),
        _ => {},
    }
    if node.read_only.get() {
        return Err(DomException::NoModificationAllowed);
    }

    detach(node);
    if let NodeData::Attr { ref owner_element, .. } = node.data {
        *owner_element.borrow_mut() = None;
    }
    rewrite_owner(node, doc);
    Ok(node.clone())
}

fn rewrite_owner(node: &Handle, doc: &Handle) {
    *node.owner.borrow_mut() = Some(Rc::downgrade(doc));
    if let NodeData::Element { ref attrs, .. } = node.data {
        for attr in attrs.snapshot() {
            rewrite_owner(&attr, doc);
        }
    }
    for child in node.children.borrow().iter() {
        rewrite_owner(child, doc);
    }
}

/// A live list of the node's children.
pub fn child_nodes(root: &Handle) -> Rc<NodeList> {
    cached_list(root, ListPredicate::Children)
}

/// A live list of the elements below `root` matching a qualified name
/// (`"*"` for all).  Equivalent queries share one list instance.
pub fn get_elements_by_tag_name(root: &Handle, name: &str) -> Rc<NodeList> {
    cached_list(root, ListPredicate::ByName(name.into()))
}

/// A live list of the elements below `root` matching namespace and local
/// name, either of which may be `"*"`.
pub fn get_elements_by_tag_name_ns(root: &Handle, ns: &str, local: &str) -> Rc<NodeList> {
    cached_list(
        root,
        ListPredicate::ByNamespace {
            ns: ns.into(),
            local: local.into(),
        },
    )
}

fn cached_list(root: &Handle, predicate: ListPredicate) -> Rc<NodeList> {
    let doc = root.owner_document();
    match doc {
        Some(ref doc) => match doc.data {
            NodeData::Document { ref live_lists, .. } => live_lists.get_or_insert(root, predicate),
            _ => NodeList::new(root, predicate),
        },
        None => NodeList::new(root, predicate),
    }
}

/// Split a qualified name into prefix and local name, validating both.
pub(crate) fn parse_qualified_name(
    ns: Option<&str>,
    qname: &str,
) -> Result<QualName, DomException> {
    let (prefix, local) = match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    };

    if local.is_empty() || !is_valid_name(local) {
        return Err(DomException::InvalidCharacter);
    }
    if let Some(prefix) = prefix {
        if prefix.is_empty() || !is_valid_name(prefix) || local.contains(':') {
            return Err(DomException::InvalidCharacter);
        }
        // A prefixed name needs a namespace to resolve against.
        match ns {
            None | Some("") => return Err(DomException::Namespace),
            Some(_) => {},
        }
    }

    Ok(QualName::new(
        prefix.map(Prefix::from),
        Namespace::from(ns.unwrap_or("")),
        LocalName::from(local),
    ))
}

/// XML Name production, restricted to its common ASCII core.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {},
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_names() {
        assert!(parse_qualified_name(None, "div").is_ok());
        assert!(parse_qualified_name(None, "").is_err());
        assert!(parse_qualified_name(None, "1bad").is_err());
        assert_eq!(
            parse_qualified_name(None, "x:y").unwrap_err(),
            DomException::Namespace
        );
        let name = parse_qualified_name(Some("http://www.w3.org/2000/svg"), "svg:rect").unwrap();
        assert_eq!(&*name.local, "rect");
        assert_eq!(name.prefix.as_deref(), Some("svg"));
    }
}
