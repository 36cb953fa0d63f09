// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Element attribute convenience API, layered over `NamedNodeMap`.
//!
//! Attribute nodes hold their value as a child list of text and
//! entity-reference nodes; the string accessors below build and read that
//! form.

use std::cell::RefCell;

use tendril::StrTendril;

use crate::collections::NamedNodeMap;
use crate::document;
use crate::exception::DomException;
use crate::node::{append, Handle, Node, NodeData};

/// The attribute map of an element.
pub fn attributes(elem: &Node) -> Option<&NamedNodeMap> {
    match elem.data {
        NodeData::Element { ref attrs, .. } => Some(attrs),
        _ => None,
    }
}

/// The string value of an attribute node: the concatenated text of its
/// children.
pub fn attr_value(attr: &Handle) -> StrTendril {
    let mut out = StrTendril::new();
    for child in attr.children.borrow().iter() {
        match child.data {
            NodeData::Text { ref contents } => out.push_tendril(&contents.borrow()),
            // Entity references contribute their (read-only) expansion.
            NodeData::EntityReference { .. } => {
                if let Some(text) = child.text_content() {
                    out.push_tendril(&text);
                }
            },
            _ => {},
        }
    }
    out
}

/// Replace an attribute's children with a single text node holding `value`.
pub fn set_attr_value(attr: &Handle, value: StrTendril) -> Result<(), DomException> {
    if attr.read_only.get() {
        return Err(DomException::NoModificationAllowed);
    }
    let old = std::mem::take(&mut *attr.children.borrow_mut());
    for child in old {
        child.parent.set(None);
    }
    let text = Node::new(NodeData::Text {
        contents: RefCell::new(value),
    });
    *text.owner.borrow_mut() = attr.owner.borrow().clone();
    append(attr, text);
    if let NodeData::Attr { ref specified, .. } = attr.data {
        specified.set(true);
    }
    Ok(())
}

/// Get an attribute's value by qualified name.
pub fn get_attribute(elem: &Handle, name: &str) -> Option<StrTendril> {
    attributes(elem)?.get_named_item(name).map(|a| attr_value(&a))
}

/// Get an attribute's value by namespace and local name.
pub fn get_attribute_ns(elem: &Handle, ns: Option<&str>, local: &str) -> Option<StrTendril> {
    attributes(elem)?
        .get_named_item_ns(ns, local)
        .map(|a| attr_value(&a))
}

pub fn has_attribute(elem: &Handle, name: &str) -> bool {
    attributes(elem).map_or(false, |attrs| attrs.get_named_item(name).is_some())
}

pub fn has_attribute_ns(elem: &Handle, ns: Option<&str>, local: &str) -> bool {
    attributes(elem).map_or(false, |attrs| attrs.get_named_item_ns(ns, local).is_some())
}

/// Set an attribute by qualified name, creating the attribute node if
/// needed.
pub fn set_attribute(elem: &Handle, name: &str, value: StrTendril) -> Result<(), DomException> {
    if elem.read_only.get() {
        return Err(DomException::NoModificationAllowed);
    }
    let attrs = attributes(elem).ok_or(DomException::TypeMismatch)?;
    if let Some(existing) = attrs.get_named_item(name) {
        return set_attr_value(&existing, value);
    }
    let doc = elem.owner_document().ok_or(DomException::InvalidState)?;
    let attr = document::create_attribute(&doc, name)?;
    set_attr_value(&attr, value)?;
    attrs.set_named_item(attr)?;
    Ok(())
}

/// Set an attribute by namespace and qualified name.
pub fn set_attribute_ns(
    elem: &Handle,
    ns: Option<&str>,
    qname: &str,
    value: StrTendril,
) -> Result<(), DomException> {
    if elem.read_only.get() {
        return Err(DomException::NoModificationAllowed);
    }
    let attrs = attributes(elem).ok_or(DomException::TypeMismatch)?;
    let parsed = document::parse_qualified_name(ns, qname)?;
    if let Some(existing) = attrs.get_named_item_ns(ns, &parsed.local) {
        return set_attr_value(&existing, value);
    }
    let doc = elem.owner_document().ok_or(DomException::InvalidState)?;
    let attr = document::create_attribute_ns(&doc, ns, qname)?;
    set_attr_value(&attr, value)?;
    attrs.set_named_item_ns(attr)?;
    Ok(())
}

/// Remove an attribute by qualified name; removing a missing attribute is
/// not an error.
pub fn remove_attribute(elem: &Handle, name: &str) -> Result<(), DomException> {
    if elem.read_only.get() {
        return Err(DomException::NoModificationAllowed);
    }
    let attrs = attributes(elem).ok_or(DomException::TypeMismatch)?;
    match attrs.remove_named_item(name) {
        Ok(_) | Err(DomException::NotFound) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Does the element's `class` attribute contain `class_name` as a
/// whitespace-separated word?
pub fn has_class(elem: &Handle, class_name: &str) -> bool {
    match get_attribute(elem, "class") {
        Some(value) => value.split_ascii_whitespace().any(|w| w == class_name),
        None => false,
    }
}

/// The element's `id` attribute, if any.
pub fn element_id(elem: &Handle) -> Option<StrTendril> {
    let attrs = attributes(elem)?;
    // An attribute flagged is_id wins over the literal name "id".
    for attr in attrs.snapshot() {
        if let NodeData::Attr { ref is_id, .. } = attr.data {
            if is_id.get() {
                return Some(attr_value(&attr));
            }
        }
    }
    get_attribute(elem, "id")
}
