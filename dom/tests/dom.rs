// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::cell::RefCell;
use std::rc::Rc;

use willow_dom::document::{
    adopt_node, child_nodes, create_document_fragment, create_element, create_text_node,
    get_elements_by_tag_name, new_document,
};
use willow_dom::element::{get_attribute, set_attribute};
use willow_dom::events::{add_event_listener, dispatch_event, has_event_listeners, Event};
use willow_dom::node::{
    append_child, insert_before, remove_child, replace_child, split_text, NodeData,
};
use willow_dom::{DomException, Handle, NodeKind};

fn doc_with_root() -> (Handle, Handle) {
    let doc = new_document();
    let root = create_element(&doc, "html").unwrap();
    append_child(&doc, &root).unwrap();
    (doc, root)
}

/// Every child's parent link points back at the node holding it.
fn assert_well_formed(node: &Handle) {
    for child in node.children.borrow().iter() {
        let parent = child.parent_node().expect("child without parent link");
        assert!(Rc::ptr_eq(&parent, node));
        assert_well_formed(child);
    }
}

#[test]
fn text_insertion_and_normalize() {
    let (doc, root) = doc_with_root();
    let p = create_element(&doc, "p").unwrap();
    append_child(&root, &p).unwrap();

    let hello = create_text_node(&doc, "hello".into());
    append_child(&p, &hello).unwrap();
    let world = create_text_node(&doc, " world".into());
    append_child(&p, &world).unwrap();

    assert_eq!(&*p.text_content().unwrap(), "hello world");
    assert_eq!(p.children.borrow().len(), 2);

    p.normalize();
    assert_eq!(p.children.borrow().len(), 1);
    assert_eq!(p.first_child().unwrap().kind(), NodeKind::Text);
    assert_eq!(&*p.text_content().unwrap(), "hello world");
    assert_well_formed(&doc);
}

#[test]
fn live_node_list_reflects_mutations() {
    let (doc, root) = doc_with_root();

    let list = get_elements_by_tag_name(&root, "li");
    assert_eq!(list.length(), 0);

    let a = create_element(&doc, "li").unwrap();
    let b = create_element(&doc, "li").unwrap();
    append_child(&root, &a).unwrap();
    append_child(&root, &b).unwrap();
    assert_eq!(list.length(), 2);
    assert!(Rc::ptr_eq(&list.item(0).unwrap(), &a));
    assert!(Rc::ptr_eq(&list.item(1).unwrap(), &b));

    remove_child(&root, &a).unwrap();
    assert_eq!(list.length(), 1);
    assert!(Rc::ptr_eq(&list.item(0).unwrap(), &b));

    // Equivalent queries share the same instance.
    let again = get_elements_by_tag_name(&root, "li");
    assert!(Rc::ptr_eq(&list, &again));
}

#[test]
fn child_nodes_list_is_live() {
    let (doc, root) = doc_with_root();
    let list = child_nodes(&root);
    assert_eq!(list.length(), 0);
    let text = create_text_node(&doc, "x".into());
    append_child(&root, &text).unwrap();
    assert_eq!(list.length(), 1);
}

#[test]
fn hierarchy_errors_leave_tree_untouched() {
    let (doc, root) = doc_with_root();

    // Text cannot be a child of a document.
    let text = create_text_node(&doc, "x".into());
    assert_eq!(
        append_child(&doc, &text).unwrap_err(),
        DomException::HierarchyRequest
    );
    assert!(text.parent_node().is_none());

    // A second document element is refused.
    let other = create_element(&doc, "html").unwrap();
    assert_eq!(
        append_child(&doc, &other).unwrap_err(),
        DomException::HierarchyRequest
    );

    // A node cannot contain its own ancestor.
    let inner = create_element(&doc, "div").unwrap();
    append_child(&root, &inner).unwrap();
    assert_eq!(
        append_child(&inner, &root).unwrap_err(),
        DomException::HierarchyRequest
    );

    // Nodes from another document are refused without adoption.
    let foreign_doc = new_document();
    let foreign = create_element(&foreign_doc, "div").unwrap();
    assert_eq!(
        append_child(&root, &foreign).unwrap_err(),
        DomException::WrongDocument
    );

    // The reference child must actually be a child.
    let stranger = create_element(&doc, "span").unwrap();
    assert_eq!(
        insert_before(&root, &stranger, Some(&text)).unwrap_err(),
        DomException::NotFound
    );

    assert_well_formed(&doc);
}

#[test]
fn adoption_enables_cross_document_insert() {
    let (_, root) = doc_with_root();
    let doc = root.owner_document().unwrap();

    let foreign_doc = new_document();
    let foreign = create_element(&foreign_doc, "div").unwrap();
    let child = create_text_node(&foreign_doc, "x".into());
    append_child(&foreign, &child).unwrap();

    adopt_node(&doc, &foreign).unwrap();
    append_child(&root, &foreign).unwrap();

    let owner = child.owner_document().unwrap();
    assert!(Rc::ptr_eq(&owner, &doc));
}

#[test]
fn replace_child_returns_old() {
    let (doc, root) = doc_with_root();
    let a = create_element(&doc, "a").unwrap();
    let b = create_element(&doc, "b").unwrap();
    append_child(&root, &a).unwrap();

    let displaced = replace_child(&root, &b, &a).unwrap();
    assert!(Rc::ptr_eq(&displaced, &a));
    assert!(a.parent_node().is_none());
    assert_eq!(root.children.borrow().len(), 1);
    assert!(Rc::ptr_eq(&root.first_child().unwrap(), &b));
}

#[test]
fn fragment_insert_splices_children() {
    let (doc, root) = doc_with_root();
    let fragment = create_document_fragment(&doc);
    let a = create_element(&doc, "a").unwrap();
    let b = create_element(&doc, "b").unwrap();
    append_child(&fragment, &a).unwrap();
    append_child(&fragment, &b).unwrap();

    append_child(&root, &fragment).unwrap();
    assert_eq!(root.children.borrow().len(), 2);
    assert!(fragment.children.borrow().is_empty());
    assert_well_formed(&root);
}

#[test]
fn attributes_round_trip() {
    let (doc, root) = doc_with_root();
    let elem = create_element(&doc, "p").unwrap();
    append_child(&root, &elem).unwrap();

    set_attribute(&elem, "class", "fancy".into()).unwrap();
    set_attribute(&elem, "id", "para".into()).unwrap();
    assert_eq!(get_attribute(&elem, "class").as_deref(), Some("fancy"));
    assert_eq!(get_attribute(&elem, "id").as_deref(), Some("para"));

    // Overwriting keeps the original position and count.
    set_attribute(&elem, "class", "plain".into()).unwrap();
    let attrs = willow_dom::element::attributes(&elem).unwrap();
    assert_eq!(attrs.length(), 2);
    assert_eq!(get_attribute(&elem, "class").as_deref(), Some("plain"));

    assert!(attrs.remove_named_item("class").is_ok());
    assert_eq!(
        attrs.remove_named_item("class").unwrap_err(),
        DomException::NotFound
    );
}

#[test]
fn attribute_in_use_is_refused() {
    let (doc, root) = doc_with_root();
    let a = create_element(&doc, "a").unwrap();
    let b = create_element(&doc, "b").unwrap();
    append_child(&root, &a).unwrap();
    append_child(&root, &b).unwrap();

    let attr = willow_dom::document::create_attribute(&doc, "title").unwrap();
    willow_dom::element::attributes(&a)
        .unwrap()
        .set_named_item(attr.clone())
        .unwrap();
    assert_eq!(
        willow_dom::element::attributes(&b)
            .unwrap()
            .set_named_item(attr)
            .unwrap_err(),
        DomException::InUseAttribute
    );
}

#[test]
fn clone_node_copies_attributes_not_listeners() {
    let (doc, _) = doc_with_root();
    let elem = create_element(&doc, "p").unwrap();
    set_attribute(&elem, "id", "x".into()).unwrap();
    let child = create_text_node(&doc, "hi".into());
    append_child(&elem, &child).unwrap();
    add_event_listener(&elem, "click", false, Rc::new(|_, _| {}));

    let shallow = elem.clone_node(false);
    assert_eq!(get_attribute(&shallow, "id").as_deref(), Some("x"));
    assert!(shallow.children.borrow().is_empty());

    let deep = elem.clone_node(true);
    assert_eq!(deep.children.borrow().len(), 1);
    assert_eq!(&*deep.text_content().unwrap(), "hi");
    assert!(!has_event_listeners(&deep));
}

#[test]
fn split_text_inserts_right_sibling() {
    let (doc, root) = doc_with_root();
    let p = create_element(&doc, "p").unwrap();
    append_child(&root, &p).unwrap();
    let text = create_text_node(&doc, "hello world".into());
    append_child(&p, &text).unwrap();

    let right = split_text(&text, 5).unwrap();
    assert_eq!(p.children.borrow().len(), 2);
    assert!(Rc::ptr_eq(&text.next_sibling().unwrap(), &right));
    assert_eq!(&*p.text_content().unwrap(), "hello world");
}

#[test]
fn event_dispatch_phases() {
    let (doc, root) = doc_with_root();
    let middle = create_element(&doc, "div").unwrap();
    let target = create_element(&doc, "span").unwrap();
    append_child(&root, &middle).unwrap();
    append_child(&middle, &target).unwrap();

    let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

    let log = order.clone();
    add_event_listener(&root, "ping", true, Rc::new(move |_, _| {
        log.borrow_mut().push("root-capture");
    }));
    let log = order.clone();
    add_event_listener(&middle, "ping", true, Rc::new(move |_, _| {
        log.borrow_mut().push("middle-capture");
    }));
    let log = order.clone();
    add_event_listener(&target, "ping", false, Rc::new(move |_, _| {
        log.borrow_mut().push("target");
    }));
    let log = order.clone();
    add_event_listener(&middle, "ping", false, Rc::new(move |_, _| {
        log.borrow_mut().push("middle-bubble");
    }));
    let log = order.clone();
    add_event_listener(&root, "ping", false, Rc::new(move |_, _| {
        log.borrow_mut().push("root-bubble");
    }));

    let mut event = Event::new("ping".into(), true, true);
    assert!(dispatch_event(&target, &mut event));

    assert_eq!(
        &*order.borrow(),
        &[
            "root-capture",
            "middle-capture",
            "target",
            "middle-bubble",
            "root-bubble",
        ]
    );
}

#[test]
fn stop_propagation_and_prevent_default() {
    let (doc, root) = doc_with_root();
    let target = create_element(&doc, "span").unwrap();
    append_child(&root, &target).unwrap();

    let calls = Rc::new(RefCell::new(0u32));

    let n = calls.clone();
    add_event_listener(&target, "ping", false, Rc::new(move |_, event: &mut Event| {
        *n.borrow_mut() += 1;
        event.prevent_default();
        event.stop_immediate_propagation();
    }));
    let n = calls.clone();
    add_event_listener(&target, "ping", false, Rc::new(move |_, _| {
        *n.borrow_mut() += 1;
    }));
    let n = calls.clone();
    add_event_listener(&root, "ping", false, Rc::new(move |_, _| {
        *n.borrow_mut() += 1;
    }));

    let mut event = Event::new("ping".into(), true, true);
    let not_cancelled = dispatch_event(&target, &mut event);
    assert!(!not_cancelled);
    assert_eq!(*calls.borrow(), 1);
}

#[test]
fn mutation_events_fire_synchronously() {
    let (doc, root) = doc_with_root();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let log = seen.clone();
    add_event_listener(&root, "DOMNodeInserted", false, Rc::new(move |_, event: &mut Event| {
        let target = event.target.clone().unwrap();
        log.borrow_mut().push(target.node_name().to_string());
    }));

    let p = create_element(&doc, "p").unwrap();
    append_child(&root, &p).unwrap();
    let q = create_element(&doc, "q").unwrap();
    append_child(&p, &q).unwrap();

    assert_eq!(&*seen.borrow(), &["p".to_string(), "q".to_string()]);
}

#[test]
fn detached_subtree_survives_through_handle() {
    let (doc, root) = doc_with_root();
    let div = create_element(&doc, "div").unwrap();
    append_child(&root, &div).unwrap();
    let text = create_text_node(&doc, "still here".into());
    append_child(&div, &text).unwrap();

    remove_child(&root, &div).unwrap();
    assert!(div.parent_node().is_none());
    assert_eq!(&*div.text_content().unwrap(), "still here");
}

#[test]
fn doctype_nodes_are_read_only() {
    let doc = new_document();
    let doctype = willow_dom::Node::new(NodeData::Doctype {
        name: "html".into(),
        public_id: "".into(),
        system_id: "".into(),
    });
    doctype.read_only.set(true);

    let text = create_text_node(&doc, "x".into());
    assert_eq!(
        append_child(&doctype, &text).unwrap_err(),
        DomException::NoModificationAllowed
    );
}
