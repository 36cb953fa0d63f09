// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The node graph.
//!
//! Nodes are reference-counted: a parent owns its children through the
//! ordered child list, while parent and owner-document links are weak.
//! Dropping the last external handle to a detached subtree destroys it.
//! The validated mutation operations check every domain error *before*
//! touching a pointer, so a failed operation leaves the tree untouched.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

use tendril::StrTendril;
use willow_markup::interface::QuirksMode;
use willow_markup::QualName;

use crate::collections::{LiveListRegistry, NamedNodeMap};
use crate::events::{fire_mutation_event, EventListenerEntry, DOM_NODE_INSERTED, DOM_NODE_REMOVED};
use crate::exception::DomException;

/// Reference to a DOM node.
pub type Handle = Rc<Node>;

/// Weak reference to a DOM node, used for parent and owner pointers.
pub type WeakHandle = Weak<Node>;

/// The different kinds of nodes in the DOM.
pub enum NodeData {
    /// The `Document` itself - the root node of a document.
    Document {
        /// The document's quirks mode, as set by the parser.
        quirks_mode: Cell<QuirksMode>,
        /// Weak registry of live node lists handed out by this document.
        live_lists: LiveListRegistry,
    },

    /// A lightweight container used as the root of a detached subtree.
    Fragment,

    /// A `DOCTYPE` with name, public id, and system id. See
    /// [document type declaration on wikipedia][dtd wiki].
    ///
    /// [dtd wiki]: https://en.wikipedia.org/wiki/Document_type_declaration
    Doctype {
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    },

    /// A text node.
    Text { contents: RefCell<StrTendril> },

    /// A CDATA section; character data that is never merged with
    /// neighbouring text nodes by `normalize`.
    CData { contents: RefCell<StrTendril> },

    /// A comment.
    Comment { contents: RefCell<StrTendril> },

    /// A Processing instruction.
    ProcessingInstruction {
        target: StrTendril,
        contents: RefCell<StrTendril>,
    },

    /// An element with attributes.
    Element {
        name: QualName,
        attrs: NamedNodeMap,
    },

    /// An attribute.  Its value is the concatenated text of its children,
    /// which are restricted to text and entity-reference nodes.
    Attr {
        name: QualName,
        specified: Cell<bool>,
        is_id: Cell<bool>,
        owner_element: RefCell<Option<WeakHandle>>,
    },

    /// A reference to a named entity.  The subtree below it is read-only.
    EntityReference { name: StrTendril },
}

/// Flat discriminant for `NodeData`, used by the hierarchy rules.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum NodeKind {
    Document,
    Fragment,
    Doctype,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
    Element,
    Attr,
    EntityReference,
}

/// A DOM node.
pub struct Node {
    /// Represents this node's data.
    pub data: NodeData,
    /// Parent node.
    pub parent: Cell<Option<WeakHandle>>,
    /// Child nodes of this node.
    pub children: RefCell<Vec<Handle>>,
    /// The document this node was created by.  `None` only for document
    /// nodes themselves and nodes that have been orphaned by a dropped
    /// document.
    pub owner: RefCell<Option<WeakHandle>>,
    /// Read-only flag; set on doctypes and entity-reference subtrees.
    pub read_only: Cell<bool>,
    /// Event listeners registered on this node, in registration order.
    pub(crate) listeners: RefCell<Vec<EventListenerEntry>>,
}

impl Node {
    /// Create a new node from its contents.
    pub fn new(data: NodeData) -> Handle {
        Rc::new(Node {
            data,
            parent: Cell::new(None),
            children: RefCell::new(Vec::new()),
            owner: RefCell::new(None),
            read_only: Cell::new(false),
            listeners: RefCell::new(Vec::new()),
        })
    }

    /// The flat kind of this node.
    pub fn kind(&self) -> NodeKind {
        match self.data {
            NodeData::Document { .. } => NodeKind::Document,
            NodeData::Fragment => NodeKind::Fragment,
            NodeData::Doctype { .. } => NodeKind::Doctype,
            NodeData::Text { .. } => NodeKind::Text,
            NodeData::CData { .. } => NodeKind::CData,
            NodeData::Comment { .. } => NodeKind::Comment,
            NodeData::ProcessingInstruction { .. } => NodeKind::ProcessingInstruction,
            NodeData::Element { .. } => NodeKind::Element,
            NodeData::Attr { .. } => NodeKind::Attr,
            NodeData::EntityReference { .. } => NodeKind::EntityReference,
        }
    }

    /// The DOM `nodeName` of this node.
    pub fn node_name(&self) -> StrTendril {
        match self.data {
            NodeData::Document { .. } => "#document".into(),
            NodeData::Fragment => "#document-fragment".into(),
            NodeData::Doctype { ref name, .. } => name.clone(),
            NodeData::Text { .. } => "#text".into(),
            NodeData::CData { .. } => "#cdata-section".into(),
            NodeData::Comment { .. } => "#comment".into(),
            NodeData::ProcessingInstruction { ref target, .. } => target.clone(),
            NodeData::Element { ref name, .. } | NodeData::Attr { ref name, .. } => {
                qualified_name(name)
            },
            NodeData::EntityReference { ref name } => name.clone(),
        }
    }

    /// The parent of this node, upgraded to a strong handle.
    pub fn parent_node(&self) -> Option<Handle> {
        let parent = self.parent.take();
        self.parent.set(parent.clone());
        parent.as_ref().and_then(Weak::upgrade)
    }

    /// The document that created this node.  A document is its own owner.
    pub fn owner_document(self: &Rc<Self>) -> Option<Handle> {
        if let NodeData::Document { .. } = self.data {
            return Some(self.clone());
        }
        self.owner.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub fn first_child(&self) -> Option<Handle> {
        self.children.borrow().first().cloned()
    }

    pub fn last_child(&self) -> Option<Handle> {
        self.children.borrow().last().cloned()
    }

    /// The sibling before this node in its parent's child list.
    pub fn previous_sibling(&self) -> Option<Handle> {
        let parent = self.parent_node()?;
        let children = parent.children.borrow();
        let i = children.iter().position(|c| std::ptr::eq(&**c, self))?;
        if i == 0 {
            None
        } else {
            Some(children[i - 1].clone())
        }
    }

    /// The sibling after this node in its parent's child list.
    pub fn next_sibling(&self) -> Option<Handle> {
        let parent = self.parent_node()?;
        let children = parent.children.borrow();
        let i = children.iter().position(|c| std::ptr::eq(&**c, self))?;
        children.get(i + 1).cloned()
    }

    /// The concatenated text of this node, per DOM `textContent`.
    /// `None` for documents and doctypes.
    pub fn text_content(&self) -> Option<StrTendril> {
        match self.data {
            NodeData::Document { .. } | NodeData::Doctype { .. } => None,
            NodeData::Text { ref contents }
            | NodeData::CData { ref contents }
            | NodeData::Comment { ref contents }
            | NodeData::ProcessingInstruction { ref contents, .. } => {
                Some(contents.borrow().clone())
            },
            _ => {
                let mut out = StrTendril::new();
                collect_text(self, &mut out);
                Some(out)
            },
        }
    }

    /// Merge adjacent text siblings and drop empty text nodes, recursively.
    pub fn normalize(&self) {
        let mut i = 0;
        loop {
            let child = match self.children.borrow().get(i) {
                Some(c) => c.clone(),
                None => break,
            };
            if let NodeData::Text { ref contents } = child.data {
                if contents.borrow().is_empty() {
                    self.children.borrow_mut().remove(i);
                    child.parent.set(None);
                    continue;
                }
                // Pull every following text sibling into this one.
                loop {
                    let next = match self.children.borrow().get(i + 1) {
                        Some(n) => n.clone(),
                        None => break,
                    };
                    match next.data {
                        NodeData::Text { contents: ref next_contents } => {
                            contents.borrow_mut().push_tendril(&next_contents.borrow());
                            self.children.borrow_mut().remove(i + 1);
                            next.parent.set(None);
                        },
                        _ => break,
                    }
                }
            } else {
                child.normalize();
            }
            i += 1;
        }
    }

    /// Clone this node; with `deep`, the whole subtree.  Attributes are
    /// copied on elements either way; event listeners are never copied.
    pub fn clone_node(self: &Rc<Self>, deep: bool) -> Handle {
        let data = match self.data {
            NodeData::Document { ref quirks_mode, .. } => NodeData::Document {
                quirks_mode: Cell::new(quirks_mode.get()),
                live_lists: LiveListRegistry::default(),
            },
            NodeData::Fragment => NodeData::Fragment,
            NodeData::Doctype {
                ref name,
                ref public_id,
                ref system_id,
            } => NodeData::Doctype {
                name: name.clone(),
                public_id: public_id.clone(),
                system_id: system_id.clone(),
            },
            NodeData::Text { ref contents } => NodeData::Text {
                contents: RefCell::new(contents.borrow().clone()),
            },
            NodeData::CData { ref contents } => NodeData::CData {
                contents: RefCell::new(contents.borrow().clone()),
            },
            NodeData::Comment { ref contents } => NodeData::Comment {
                contents: RefCell::new(contents.borrow().clone()),
            },
            NodeData::ProcessingInstruction {
                ref target,
                ref contents,
            } => NodeData::ProcessingInstruction {
                target: target.clone(),
                contents: RefCell::new(contents.borrow().clone()),
            },
            NodeData::Element { ref name, ref attrs } => NodeData::Element {
                name: name.clone(),
                attrs: attrs.clone_map(),
            },
            NodeData::Attr {
                ref name,
                ref specified,
                ref is_id,
                ..
            } => NodeData::Attr {
                name: name.clone(),
                specified: Cell::new(specified.get()),
                is_id: Cell::new(is_id.get()),
                owner_element: RefCell::new(None),
            },
            NodeData::EntityReference { ref name } => NodeData::EntityReference {
                name: name.clone(),
            },
        };

        let copy = Node::new(data);
        *copy.owner.borrow_mut() = self.owner.borrow().clone();
        if let NodeData::Element { ref attrs, .. } = copy.data {
            attrs.set_owner(&copy);
        }

        // Attribute children carry the value, so they are copied even for a
        // shallow clone.
        if deep || self.kind() == NodeKind::Attr {
            for child in self.children.borrow().iter() {
                append(&copy, child.clone_node(true));
            }
        }
        copy
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        // Iterative teardown, so huge trees don't recurse through Drop.
        let mut nodes = mem::take(&mut *self.children.borrow_mut());
        while let Some(node) = nodes.pop() {
            let children = mem::take(&mut *node.children.borrow_mut());
            nodes.extend(children);
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Node")
            .field("name", &self.node_name())
            .field("children", &self.children)
            .finish()
    }
}

/// The qualified (prefixed) form of a name.
pub fn qualified_name(name: &QualName) -> StrTendril {
    match name.prefix {
        Some(ref prefix) => {
            let mut out = StrTendril::from_slice(prefix);
            out.push_char(':');
            out.push_slice(&name.local);
            out
        },
        None => StrTendril::from_slice(&name.local),
    }
}

fn collect_text(node: &Node, out: &mut StrTendril) {
    for child in node.children.borrow().iter() {
        match child.data {
            NodeData::Text { ref contents } | NodeData::CData { ref contents } => {
                out.push_tendril(&contents.borrow());
            },
            NodeData::Comment { .. } | NodeData::ProcessingInstruction { .. } => {},
            _ => collect_text(child, out),
        }
    }
}

/// Append a parentless node to another node's children.  This is the raw
/// splice used by the parser sink; it performs no validation and fires no
/// events.
pub(crate) fn append(new_parent: &Handle, child: Handle) {
    let previous_parent = child.parent.replace(Some(Rc::downgrade(new_parent)));
    // Invariant: child cannot have an existing parent.
    assert!(previous_parent.is_none());
    new_parent.children.borrow_mut().push(child);
}

/// If the node has a parent, get it and this node's position in its children.
pub(crate) fn get_parent_and_index(target: &Handle) -> Option<(Handle, usize)> {
    let parent = target.parent_node()?;
    let i = match parent
        .children
        .borrow()
        .iter()
        .enumerate()
        .find(|&(_, child)| Rc::ptr_eq(child, target))
    {
        Some((i, _)) => i,
        None => panic!("have parent but couldn't find in parent's children!"),
    };
    Some((parent, i))
}

/// Detach a node from its parent, if any.  No validation, no events.
pub(crate) fn detach(target: &Handle) {
    if let Some((parent, i)) = get_parent_and_index(target) {
        parent.children.borrow_mut().remove(i);
        target.parent.set(None);
    }
}

/// Is `node` the same as, or an ancestor of, `descendant`?
fn is_inclusive_ancestor(node: &Handle, descendant: &Handle) -> bool {
    let mut cursor = Some(descendant.clone());
    while let Some(n) = cursor {
        if Rc::ptr_eq(&n, node) {
            return true;
        }
        cursor = n.parent_node();
    }
    false
}

/// The kind-compatibility matrix from the hierarchy rules.  Evaluated
/// before any pointer mutation.
fn may_contain(parent: NodeKind, child: NodeKind) -> bool {
    use self::NodeKind::*;
    match parent {
        Document => matches!(child, Element | ProcessingInstruction | Comment | Doctype),
        Fragment | Element | EntityReference => matches!(
            child,
            Element | Text | CData | Comment | ProcessingInstruction | EntityReference
        ),
        Attr => matches!(child, Text | EntityReference),
        Doctype | Text | CData | Comment | ProcessingInstruction => false,
    }
}

fn same_owner(parent: &Handle, child: &Handle) -> bool {
    let parent_doc = parent.owner_document();
    let child_doc = child.owner_document();
    match (parent_doc, child_doc) {
        (Some(a), Some(b)) => Rc::ptr_eq(&a, &b),
        (None, None) => true,
        _ => false,
    }
}

/// Check one prospective child against the hierarchy rules.  `replacing`
/// names a current child about to be displaced (for `replace_child`), which
/// is excluded from the single-element/single-doctype document constraint.
fn check_hierarchy(
    parent: &Handle,
    new_child: &Handle,
    replacing: Option<&Handle>,
) -> Result<(), DomException> {
    let child_kind = new_child.kind();

    if child_kind == NodeKind::Fragment {
        for child in new_child.children.borrow().iter() {
            check_hierarchy(parent, child, replacing)?;
        }
        return Ok(());
    }

    if !may_contain(parent.kind(), child_kind) {
        return Err(DomException::HierarchyRequest);
    }

    if is_inclusive_ancestor(new_child, parent) {
        return Err(DomException::HierarchyRequest);
    }

    // A document holds at most one element and one doctype.
    if parent.kind() == NodeKind::Document
        && matches!(child_kind, NodeKind::Element | NodeKind::Doctype)
    {
        let occupied = parent.children.borrow().iter().any(|c| {
            c.kind() == child_kind
                && !Rc::ptr_eq(c, new_child)
                && replacing.map_or(true, |r| !Rc::ptr_eq(c, r))
        });
        if occupied {
            return Err(DomException::HierarchyRequest);
        }
    }

    Ok(())
}

fn validate_insertion(
    parent: &Handle,
    new_child: &Handle,
    ref_child: Option<&Handle>,
    replacing: Option<&Handle>,
) -> Result<(), DomException> {
    if parent.read_only.get() {
        return Err(DomException::NoModificationAllowed);
    }
    if let Some(old_parent) = new_child.parent_node() {
        if old_parent.read_only.get() {
            return Err(DomException::NoModificationAllowed);
        }
    }
    if !same_owner(parent, new_child) {
        return Err(DomException::WrongDocument);
    }
    check_hierarchy(parent, new_child, replacing)?;
    if let Some(ref_child) = ref_child {
        let is_child = parent
            .children
            .borrow()
            .iter()
            .any(|c| Rc::ptr_eq(c, ref_child));
        if !is_child {
            return Err(DomException::NotFound);
        }
    }
    Ok(())
}

/// Splice an already validated, detached node into `parent` before
/// `ref_child` (or at the end), then fire `DOMNodeInserted`.
fn splice_in(parent: &Handle, new_child: Handle, ref_child: Option<&Handle>) {
    let index = match ref_child {
        Some(r) => parent
            .children
            .borrow()
            .iter()
            .position(|c| Rc::ptr_eq(c, r))
            .expect("reference child vanished during insertion"),
        None => parent.children.borrow().len(),
    };
    new_child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().insert(index, new_child.clone());
    fire_mutation_event(&new_child, DOM_NODE_INSERTED);
}

/// Insert `new_child` into `parent`'s child list before `ref_child`, or at
/// the end when `ref_child` is `None`.  The node is detached from its
/// current parent first.  Fragments are spliced child by child.
///
/// Returns the inserted node.
pub fn insert_before(
    parent: &Handle,
    new_child: &Handle,
    ref_child: Option<&Handle>,
) -> Result<Handle, DomException> {
    // Inserting a node before itself moves it in front of its old next
    // sibling.
    let ref_child = match ref_child {
        Some(r) if Rc::ptr_eq(r, new_child) => new_child.next_sibling(),
        Some(r) => Some(r.clone()),
        None => None,
    };

    validate_insertion(parent, new_child, ref_child.as_ref(), None)?;

    if new_child.kind() == NodeKind::Fragment {
        let children: Vec<Handle> = new_child.children.borrow_mut().drain(..).collect();
        for child in children {
            child.parent.set(None);
            splice_in(parent, child, ref_child.as_ref());
        }
        return Ok(new_child.clone());
    }

    detach(new_child);
    splice_in(parent, new_child.clone(), ref_child.as_ref());
    Ok(new_child.clone())
}

/// Append `new_child` as the last child of `parent`.
pub fn append_child(parent: &Handle, new_child: &Handle) -> Result<Handle, DomException> {
    insert_before(parent, new_child, None)
}

/// Replace `old_child` with `new_child` atomically: both domain checks run
/// before either splice, and mutation events fire only after completion.
///
/// Returns the displaced node.
pub fn replace_child(
    parent: &Handle,
    new_child: &Handle,
    old_child: &Handle,
) -> Result<Handle, DomException> {
    validate_insertion(parent, new_child, Some(old_child), Some(old_child))?;

    let index = parent
        .children
        .borrow()
        .iter()
        .position(|c| Rc::ptr_eq(c, old_child))
        .expect("validated reference child vanished");

    detach(new_child);
    old_child.parent.set(None);
    new_child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut()[index] = new_child.clone();

    fire_mutation_event(old_child, DOM_NODE_REMOVED);
    fire_mutation_event(new_child, DOM_NODE_INSERTED);
    Ok(old_child.clone())
}

/// Remove `old_child` from `parent`.  `DOMNodeRemoved` fires before the
/// splice; if a listener re-removes the node the operation becomes a no-op.
///
/// Returns the removed node.
pub fn remove_child(parent: &Handle, old_child: &Handle) -> Result<Handle, DomException> {
    if parent.read_only.get() {
        return Err(DomException::NoModificationAllowed);
    }
    let is_child = parent
        .children
        .borrow()
        .iter()
        .any(|c| Rc::ptr_eq(c, old_child));
    if !is_child {
        return Err(DomException::NotFound);
    }

    fire_mutation_event(old_child, DOM_NODE_REMOVED);

    // A listener may have detached the node already.
    if let Some((p, i)) = get_parent_and_index(old_child) {
        if Rc::ptr_eq(&p, parent) {
            p.children.borrow_mut().remove(i);
            old_child.parent.set(None);
        }
    }
    Ok(old_child.clone())
}

/// Break a text node in two at a character offset; the right-hand part is
/// inserted as the next sibling.
pub fn split_text(node: &Handle, offset: u32) -> Result<Handle, DomException> {
    if node.read_only.get() {
        return Err(DomException::NoModificationAllowed);
    }
    let (rest, is_cdata) = match node.data {
        NodeData::Text { ref contents } => (split_contents(contents, offset)?, false),
        NodeData::CData { ref contents } => (split_contents(contents, offset)?, true),
        _ => return Err(DomException::NotSupported),
    };

    let right = Node::new(if is_cdata {
        NodeData::CData {
            contents: RefCell::new(rest),
        }
    } else {
        NodeData::Text {
            contents: RefCell::new(rest),
        }
    });
    *right.owner.borrow_mut() = node.owner.borrow().clone();

    if let Some((parent, i)) = get_parent_and_index(node) {
        right.parent.set(Some(Rc::downgrade(&parent)));
        parent.children.borrow_mut().insert(i + 1, right.clone());
    }
    Ok(right)
}

fn split_contents(contents: &RefCell<StrTendril>, offset: u32) -> Result<StrTendril, DomException> {
    let mut contents = contents.borrow_mut();
    let byte_offset = contents
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(contents.len()))
        .nth(offset as usize)
        .ok_or(DomException::IndexSize)? as u32;
    let rest = contents.subtendril(byte_offset, contents.len() as u32 - byte_offset);
    let head = contents.subtendril(0, byte_offset);
    *contents = head;
    Ok(rest)
}

/// Replace the node's content with a single text node (or set the value
/// directly for character-data nodes).
pub fn set_text_content(node: &Handle, value: StrTendril) -> Result<(), DomException> {
    if node.read_only.get() {
        return Err(DomException::NoModificationAllowed);
    }
    match node.data {
        NodeData::Document { .. } | NodeData::Doctype { .. } => {
            Err(DomException::NoModificationAllowed)
        },
        NodeData::Text { ref contents }
        | NodeData::CData { ref contents }
        | NodeData::Comment { ref contents }
        | NodeData::ProcessingInstruction { ref contents, .. } => {
            *contents.borrow_mut() = value;
            Ok(())
        },
        _ => {
            let old = mem::take(&mut *node.children.borrow_mut());
            for child in old {
                child.parent.set(None);
            }
            if !value.is_empty() {
                let text = Node::new(NodeData::Text {
                    contents: RefCell::new(value),
                });
                *text.owner.borrow_mut() = node.owner.borrow().clone();
                append(node, text);
            }
            Ok(())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Handle {
        Node::new(NodeData::Text {
            contents: RefCell::new(s.into()),
        })
    }

    #[test]
    fn hierarchy_matrix() {
        use super::NodeKind::*;
        assert!(may_contain(Document, Element));
        assert!(may_contain(Document, Doctype));
        assert!(!may_contain(Document, Text));
        assert!(may_contain(Element, Text));
        assert!(may_contain(Attr, Text));
        assert!(!may_contain(Attr, Element));
        assert!(!may_contain(Text, Text));
    }

    #[test]
    fn split_text_at_char_boundary() {
        let t = text("héllo");
        let right = split_text(&t, 2).unwrap();
        match (&t.data, &right.data) {
            (NodeData::Text { contents: a }, NodeData::Text { contents: b }) => {
                assert_eq!(&**a.borrow(), "hé");
                assert_eq!(&**b.borrow(), "llo");
            },
            _ => unreachable!(),
        }
        assert!(split_text(&t, 100).is_err());
    }
}
