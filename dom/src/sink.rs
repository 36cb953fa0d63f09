// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The parser-facing side of the DOM: a [`TreeSink`] implementation that
//! lets the HTML tree builder construct this crate's node graph.
//!
//! The sink performs the raw splices directly; the parser guarantees the
//! hierarchy it builds is legal, so the validating public operations (and
//! their mutation events) are bypassed here.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::mem;
use std::rc::Rc;

use log::debug;
use tendril::StrTendril;
use willow_markup::interface::{NodeOrText, QuirksMode, TreeSink};
use willow_markup::{Attribute, QualName};

use crate::document;
use crate::element::set_attr_value;
use crate::node::{append, detach, get_parent_and_index, Handle, Node, NodeData};

/// The DOM under construction; the result of parsing.
pub struct Dom {
    /// The `Document` itself.
    pub document: Handle,

    /// Errors that occurred during parsing.
    pub errors: RefCell<Vec<Cow<'static, str>>>,
}

impl Default for Dom {
    fn default() -> Dom {
        Dom {
            document: document::new_document(),
            errors: Default::default(),
        }
    }
}

impl Dom {
    fn new_text(&self, text: StrTendril) -> Handle {
        document::create_text_node(&self.document, text)
    }
}

fn append_to_existing_text(prev: &Handle, text: &str) -> bool {
    match prev.data {
        NodeData::Text { ref contents } => {
            contents.borrow_mut().push_slice(text);
            true
        },
        _ => false,
    }
}

impl TreeSink for Dom {
    type Output = Self;
    fn finish(self) -> Self {
        self
    }

    type Handle = Handle;

    fn parse_error(&self, msg: Cow<'static, str>) {
        debug!("parse error: {msg}");
        self.errors.borrow_mut().push(msg);
    }

    fn get_document(&self) -> Handle {
        self.document.clone()
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        document::set_quirks_mode(&self.document, mode);
    }

    fn same_node(&self, x: &Handle, y: &Handle) -> bool {
        Rc::ptr_eq(x, y)
    }

    fn elem_name(&self, target: &Handle) -> QualName {
        match target.data {
            NodeData::Element { ref name, .. } => name.clone(),
            _ => panic!("not an element!"),
        }
    }

    fn create_element(&self, name: QualName, attrs: Vec<Attribute>) -> Handle {
        let elem = document::create_element_qual(&self.document, name)
            .expect("parser-supplied name is always valid");
        if let NodeData::Element { attrs: ref map, .. } = elem.data {
            for attr in attrs {
                let node = document::new_attr(&self.document, attr.name);
                set_attr_value(&node, attr.value).expect("fresh attribute is writable");
                map.set_named_item_ns(node)
                    .expect("fresh attribute cannot be in use");
            }
        }
        elem
    }

    fn create_comment(&self, text: StrTendril) -> Handle {
        document::create_comment(&self.document, text)
    }

    fn create_pi(&self, target: StrTendril, data: StrTendril) -> Handle {
        document::create_processing_instruction(&self.document, target, data)
            .expect("parser-supplied target is always valid")
    }

    fn append(&self, parent: &Handle, child: NodeOrText<Handle>) {
        // Append to an existing Text node if we have one.
        if let NodeOrText::AppendText(text) = &child {
            if let Some(h) = parent.children.borrow().last() {
                if append_to_existing_text(h, text) {
                    return;
                }
            }
        }

        append(
            parent,
            match child {
                NodeOrText::AppendText(text) => self.new_text(text),
                NodeOrText::AppendNode(node) => node,
            },
        );
    }

    fn append_before_sibling(&self, sibling: &Handle, child: NodeOrText<Handle>) {
        let (parent, i) = get_parent_and_index(sibling)
            .expect("append_before_sibling called on node without parent");

        let child = match (child, i) {
            // No previous node.
            (NodeOrText::AppendText(text), 0) => self.new_text(text),

            // Look for a text node before the insertion point.
            (NodeOrText::AppendText(text), i) => {
                let children = parent.children.borrow();
                let prev = &children[i - 1];
                if append_to_existing_text(prev, &text) {
                    return;
                }
                drop(children);
                self.new_text(text)
            },

            // The tree builder promises we won't have a text node after
            // the insertion point.

            // Any other kind of node.
            (NodeOrText::AppendNode(node), _) => node,
        };

        detach(&child);

        child.parent.set(Some(Rc::downgrade(&parent)));
        parent.children.borrow_mut().insert(i, child);
    }

    fn append_based_on_parent_node(
        &self,
        element: &Handle,
        prev_element: &Handle,
        child: NodeOrText<Handle>,
    ) {
        if element.parent_node().is_some() {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        let doctype = Node::new(NodeData::Doctype {
            name,
            public_id,
            system_id,
        });
        *doctype.owner.borrow_mut() = Some(Rc::downgrade(&self.document));
        doctype.read_only.set(true);
        append(&self.document, doctype);
    }

    fn add_attrs_if_missing(&self, target: &Handle, attrs: Vec<Attribute>) {
        let map = match target.data {
            NodeData::Element { ref attrs, .. } => attrs,
            _ => panic!("not an element"),
        };

        let existing_names = map
            .snapshot()
            .iter()
            .map(|attr| match attr.data {
                NodeData::Attr { ref name, .. } => name.clone(),
                _ => panic!("non-attribute in attribute map"),
            })
            .collect::<HashSet<_>>();

        for attr in attrs {
            if existing_names.contains(&attr.name) {
                continue;
            }
            let node = document::new_attr(&self.document, attr.name);
            set_attr_value(&node, attr.value).expect("fresh attribute is writable");
            map.set_named_item_ns(node)
                .expect("fresh attribute cannot be in use");
        }
    }

    fn remove_from_parent(&self, target: &Handle) {
        detach(target);
    }

    fn reparent_children(&self, node: &Handle, new_parent: &Handle) {
        let mut children = node.children.borrow_mut();
        let mut new_children = new_parent.children.borrow_mut();
        for child in children.iter() {
            let previous_parent = child.parent.replace(Some(Rc::downgrade(new_parent)));
            assert!(Rc::ptr_eq(
                node,
                &previous_parent.unwrap().upgrade().expect("dangling weak")
            ));
        }
        new_children.extend(mem::take(&mut *children));
    }
}
