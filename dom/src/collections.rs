// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Live views over the tree.
//!
//! A `NodeList` stores only a weak root and a predicate; `length` and
//! `item` walk the live tree at call time, so every mutation is implicitly
//! reflected and no snapshot can go stale while event listeners mutate the
//! tree.  The owning document keeps a weak registry so equivalent queries
//! return the same list instance.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tendril::StrTendril;

use crate::exception::DomException;
use crate::node::{qualified_name, Handle, Node, NodeData, WeakHandle};

/// Predicate deciding which nodes below the root belong to a `NodeList`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ListPredicate {
    /// The direct children of the root, of any kind.
    Children,
    /// Descendant elements whose qualified name matches (`"*"` matches
    /// every element).
    ByName(StrTendril),
    /// Descendant elements matching namespace and local name, either of
    /// which may be `"*"`.
    ByNamespace { ns: StrTendril, local: StrTendril },
}

/// A live, lazily evaluated list of nodes.
pub struct NodeList {
    root: WeakHandle,
    predicate: ListPredicate,
}

impl NodeList {
    pub(crate) fn new(root: &Handle, predicate: ListPredicate) -> Rc<NodeList> {
        Rc::new(NodeList {
            root: Rc::downgrade(root),
            predicate,
        })
    }

    /// Number of nodes currently satisfying the predicate.
    pub fn length(&self) -> u32 {
        let mut n = 0;
        self.visit(&mut |_| {
            n += 1;
            true
        });
        n
    }

    /// The `index`-th matching node in tree order, if any.
    pub fn item(&self, index: u32) -> Option<Handle> {
        let mut remaining = index;
        let mut found = None;
        self.visit(&mut |node| {
            if remaining == 0 {
                found = Some(node.clone());
                false
            } else {
                remaining -= 1;
                true
            }
        });
        found
    }

    fn visit(&self, f: &mut dyn FnMut(&Handle) -> bool) {
        let root = match self.root.upgrade() {
            Some(r) => r,
            None => return,
        };
        match self.predicate {
            ListPredicate::Children => {
                for child in root.children.borrow().iter() {
                    if !f(child) {
                        return;
                    }
                }
            },
            _ => {
                visit_subtree(&root, &mut |node| {
                    if self.matches(node) {
                        f(node)
                    } else {
                        true
                    }
                });
            },
        }
    }

    fn matches(&self, node: &Handle) -> bool {
        let name = match node.data {
            NodeData::Element { ref name, .. } => name,
            _ => return false,
        };
        match self.predicate {
            ListPredicate::Children => unreachable!(),
            ListPredicate::ByName(ref wanted) => {
                &**wanted == "*" || qualified_name(name) == *wanted
            },
            ListPredicate::ByNamespace {
                ref ns,
                ref local,
            } => {
                (&**ns == "*" || *name.ns == **ns) && (&**local == "*" || *name.local == **local)
            },
        }
    }
}

/// Pre-order walk of the subtree below `root` (`root` excluded).  The
/// callback returns `false` to stop early.
fn visit_subtree(root: &Handle, f: &mut dyn FnMut(&Handle) -> bool) -> bool {
    for child in root.children.borrow().iter() {
        if !f(child) {
            return false;
        }
        if !visit_subtree(child, f) {
            return false;
        }
    }
    true
}

/// Weak, deduplicating registry of the live lists a document has handed
/// out, keyed by root identity and predicate.
#[derive(Default)]
pub struct LiveListRegistry {
    entries: RefCell<Vec<(*const Node, ListPredicate, Weak<NodeList>)>>,
}

impl LiveListRegistry {
    /// Return the cached list for `(root, predicate)`, or build one.
    pub(crate) fn get_or_insert(&self, root: &Handle, predicate: ListPredicate) -> Rc<NodeList> {
        let root_ptr = Rc::as_ptr(root);
        let mut entries = self.entries.borrow_mut();
        entries.retain(|(_, _, weak)| weak.strong_count() > 0);
        for (ptr, pred, weak) in entries.iter() {
            if *ptr == root_ptr && *pred == predicate {
                if let Some(list) = weak.upgrade() {
                    return list;
                }
            }
        }
        let list = NodeList::new(root, predicate.clone());
        entries.push((root_ptr, predicate, Rc::downgrade(&list)));
        list
    }
}

/// The attribute map of an element: insertion-ordered, with lookup both by
/// qualified name and by `(namespace, local name)`.
#[derive(Default)]
pub struct NamedNodeMap {
    items: RefCell<Vec<Handle>>,
    owner: RefCell<Option<WeakHandle>>,
}

impl NamedNodeMap {
    pub fn new() -> NamedNodeMap {
        NamedNodeMap::default()
    }

    /// Bind this map to the element that owns it.  Called once, right
    /// after the element node is allocated.
    pub(crate) fn set_owner(&self, element: &Handle) {
        *self.owner.borrow_mut() = Some(Rc::downgrade(element));
        for attr in self.items.borrow().iter() {
            if let NodeData::Attr { ref owner_element, .. } = attr.data {
                *owner_element.borrow_mut() = Some(Rc::downgrade(element));
            }
        }
    }

    pub fn length(&self) -> u32 {
        self.items.borrow().len() as u32
    }

    pub fn item(&self, index: u32) -> Option<Handle> {
        self.items.borrow().get(index as usize).cloned()
    }

    /// All attribute nodes, in insertion order.
    pub fn snapshot(&self) -> Vec<Handle> {
        self.items.borrow().clone()
    }

    pub fn get_named_item(&self, name: &str) -> Option<Handle> {
        self.items
            .borrow()
            .iter()
            .find(|attr| &*attr_qualified_name(attr) == name)
            .cloned()
    }

    pub fn get_named_item_ns(&self, ns: Option<&str>, local: &str) -> Option<Handle> {
        let ns = ns.unwrap_or("");
        self.items
            .borrow()
            .iter()
            .find(|attr| {
                let name = attr_name(attr);
                *name.ns == *ns && *name.local == *local
            })
            .cloned()
    }

    /// Insert an attribute keyed by qualified name, returning any displaced
    /// attribute.
    pub fn set_named_item(&self, attr: Handle) -> Result<Option<Handle>, DomException> {
        let key = attr_qualified_name(&attr);
        self.insert(attr, |existing| &*attr_qualified_name(existing) == &*key)
    }

    /// Insert an attribute keyed by `(namespace, local name)`, returning
    /// any displaced attribute.
    pub fn set_named_item_ns(&self, attr: Handle) -> Result<Option<Handle>, DomException> {
        let key = attr_name(&attr).clone();
        self.insert(attr, |existing| {
            let name = attr_name(existing);
            name.ns == key.ns && name.local == key.local
        })
    }

    pub fn remove_named_item(&self, name: &str) -> Result<Handle, DomException> {
        self.remove(|attr| &*attr_qualified_name(attr) == name)
    }

    pub fn remove_named_item_ns(&self, ns: Option<&str>, local: &str) -> Result<Handle, DomException> {
        let ns = ns.unwrap_or("");
        self.remove(|attr| {
            let name = attr_name(attr);
            *name.ns == *ns && *name.local == *local
        })
    }

    fn insert(
        &self,
        attr: Handle,
        same_key: impl Fn(&Handle) -> bool,
    ) -> Result<Option<Handle>, DomException> {
        let owner = self.owner.borrow().as_ref().and_then(Weak::upgrade);
        match attr.data {
            NodeData::Attr { ref owner_element, .. } => {
                let current = owner_element.borrow().as_ref().and_then(Weak::upgrade);
                if let Some(current) = current {
                    let is_ours = owner.as_ref().map_or(false, |o| Rc::ptr_eq(o, &current));
                    if !is_ours {
                        return Err(DomException::InUseAttribute);
                    }
                }
                *owner_element.borrow_mut() = owner.as_ref().map(Rc::downgrade);
            },
            _ => return Err(DomException::TypeMismatch),
        }

        let mut items = self.items.borrow_mut();
        if let Some(i) = items.iter().position(|existing| same_key(existing)) {
            let displaced = std::mem::replace(&mut items[i], attr);
            if let NodeData::Attr { ref owner_element, .. } = displaced.data {
                *owner_element.borrow_mut() = None;
            }
            Ok(Some(displaced))
        } else {
            items.push(attr);
            Ok(None)
        }
    }

    fn remove(&self, same_key: impl Fn(&Handle) -> bool) -> Result<Handle, DomException> {
        let mut items = self.items.borrow_mut();
        match items.iter().position(|attr| same_key(attr)) {
            Some(i) => {
                let removed = items.remove(i);
                if let NodeData::Attr { ref owner_element, .. } = removed.data {
                    *owner_element.borrow_mut() = None;
                }
                Ok(removed)
            },
            None => Err(DomException::NotFound),
        }
    }

    /// Deep-copy the map for `clone_node`; the copies belong to no element
    /// until `set_owner` runs.
    pub(crate) fn clone_map(&self) -> NamedNodeMap {
        let items = self
            .items
            .borrow()
            .iter()
            .map(|attr| attr.clone_node(true))
            .collect();
        NamedNodeMap {
            items: RefCell::new(items),
            owner: RefCell::new(None),
        }
    }
}

fn attr_name(attr: &Handle) -> &willow_markup::QualName {
    match attr.data {
        NodeData::Attr { ref name, .. } => name,
        _ => panic!("not an attribute node"),
    }
}

fn attr_qualified_name(attr: &Handle) -> StrTendril {
    qualified_name(attr_name(attr))
}
