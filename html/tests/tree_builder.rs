// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use tendril::StrTendril;
use willow_dom::document::document_element;
use willow_dom::{Dom, Handle, NodeData, NodeKind, SerializableHandle};
use willow_html::serialize::SerializeOpts;
use willow_html::{parse_document, parse_fragment, serialize, ParseOpts};
use willow_markup::interface::QuirksMode;
use willow_markup::{ns, LocalName, QualName};

fn parse(input: &str) -> Dom {
    let parser = parse_document(Dom::default(), ParseOpts::default());
    parser.one(StrTendril::from(input))
}

fn parse_chunked(chunks: &[&str]) -> Dom {
    let parser = parse_document(Dom::default(), ParseOpts::default());
    for chunk in chunks {
        parser.parse_chunk(StrTendril::from(*chunk));
    }
    parser.finish()
}

fn elem_name(node: &Handle) -> String {
    match node.data {
        NodeData::Element { ref name, .. } => name.local.to_string(),
        _ => panic!("not an element"),
    }
}

fn text_of(node: &Handle) -> String {
    match node.data {
        NodeData::Text { ref contents } => contents.borrow().to_string(),
        _ => panic!("not a text node"),
    }
}

/// The `<body>` element of a parsed document.
fn body(dom: &Dom) -> Handle {
    let html = document_element(&dom.document).expect("no document element");
    let result = html
        .children
        .borrow()
        .iter()
        .find(|child| child.kind() == NodeKind::Element && elem_name(child) == "body")
        .cloned()
        .expect("no body element");
    result
}

fn to_html(dom: &Dom) -> String {
    let mut out = Vec::new();
    serialize(
        &mut out,
        &SerializableHandle::from(dom.document.clone()),
        SerializeOpts::default(),
    )
    .unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn builds_implied_html_head_body() {
    let dom = parse("<p>hello</p>");
    let html = document_element(&dom.document).unwrap();
    assert_eq!(elem_name(&html), "html");
    let names: Vec<String> = html
        .children
        .borrow()
        .iter()
        .map(|child| elem_name(child))
        .collect();
    assert_eq!(names, ["head", "body"]);

    let body = body(&dom);
    let p = body.first_child().unwrap();
    assert_eq!(elem_name(&p), "p");
    assert_eq!(&*p.text_content().unwrap(), "hello");
}

#[test]
fn character_tokens_coalesce_into_one_text_node() {
    let dom = parse_chunked(&["<p>hel", "lo wo", "rld</p>"]);
    let body = body(&dom);
    let p = body.first_child().unwrap();
    assert_eq!(p.children.borrow().len(), 1);
    assert_eq!(text_of(&p.first_child().unwrap()), "hello world");
}

#[test]
fn adoption_agency_restructures_misnested_formatting() {
    // <b>1<p>2</b>3</p> must become  body → [b "1", p → [b "2", "3"]]
    let dom = parse("<b>1<p>2</b>3</p>");
    let body = body(&dom);

    let children = body.children.borrow().clone();
    assert_eq!(children.len(), 2);

    let b = &children[0];
    assert_eq!(elem_name(b), "b");
    assert_eq!(&*b.text_content().unwrap(), "1");

    let p = &children[1];
    assert_eq!(elem_name(p), "p");
    let p_children = p.children.borrow().clone();
    assert_eq!(p_children.len(), 2);
    assert_eq!(elem_name(&p_children[0]), "b");
    assert_eq!(&*p_children[0].text_content().unwrap(), "2");
    assert_eq!(text_of(&p_children[1]), "3");
}

#[test]
fn table_text_is_foster_parented() {
    // The stray "A" must land before the table, not inside it.
    let dom = parse("<table>A<tr><td>B</td></tr></table>");
    let body = body(&dom);

    let children = body.children.borrow().clone();
    assert_eq!(children.len(), 2);
    assert_eq!(text_of(&children[0]), "A");
    assert_eq!(elem_name(&children[1]), "table");

    let tbody = children[1].first_child().unwrap();
    assert_eq!(elem_name(&tbody), "tbody");
    let tr = tbody.first_child().unwrap();
    assert_eq!(elem_name(&tr), "tr");
    let td = tr.first_child().unwrap();
    assert_eq!(elem_name(&td), "td");
    assert_eq!(&*td.text_content().unwrap(), "B");
}

#[test]
fn doctype_sets_quirks_mode() {
    let dom = parse("<!DOCTYPE html><p>x</p>");
    assert_eq!(
        willow_dom::document::quirks_mode(&dom.document),
        QuirksMode::NoQuirks
    );

    let dom = parse("<p>x</p>");
    assert_eq!(
        willow_dom::document::quirks_mode(&dom.document),
        QuirksMode::Quirks
    );

    let dom = parse("<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 3.2 Final//EN\"><p>x</p>");
    assert_eq!(
        willow_dom::document::quirks_mode(&dom.document),
        QuirksMode::Quirks
    );
}

#[test]
fn rcdata_elements_hold_markup_as_text() {
    let dom = parse("<title>a<b></title><p>x</p>");
    let html = document_element(&dom.document).unwrap();
    let head = html.first_child().unwrap();
    let title = head.first_child().unwrap();
    assert_eq!(elem_name(&title), "title");
    assert_eq!(&*title.text_content().unwrap(), "a<b>");
}

#[test]
fn raw_text_script_is_not_parsed() {
    let dom = parse("<script>if (a < b) { c(); }</script>");
    let html = document_element(&dom.document).unwrap();
    let head = html.first_child().unwrap();
    let script = head.first_child().unwrap();
    assert_eq!(elem_name(&script), "script");
    assert_eq!(&*script.text_content().unwrap(), "if (a < b) { c(); }");
}

#[test]
fn misnested_list_items_close_each_other() {
    let dom = parse("<ul><li>one<li>two</ul>");
    let body = body(&dom);
    let ul = body.first_child().unwrap();
    let items = ul.children.borrow().clone();
    assert_eq!(items.len(), 2);
    assert_eq!(&*items[0].text_content().unwrap(), "one");
    assert_eq!(&*items[1].text_content().unwrap(), "two");
}

#[test]
fn comments_and_attributes_survive() {
    let dom = parse("<!-- top --><p id=\"x\" class='y z'>t</p>");
    let doc_children = dom.document.children.borrow().clone();
    assert_eq!(doc_children[0].kind(), NodeKind::Comment);

    let body = body(&dom);
    let p = body.first_child().unwrap();
    assert_eq!(
        willow_dom::element::get_attribute(&p, "id").as_deref(),
        Some("x")
    );
    assert_eq!(
        willow_dom::element::get_attribute(&p, "class").as_deref(),
        Some("y z")
    );
}

#[test]
fn parse_errors_are_recorded_but_recoverable() {
    let dom = parse("</p after<b");
    assert!(!dom.errors.borrow().is_empty());
    // The tree is still well-formed with html/head/body in place.
    assert!(document_element(&dom.document).is_some());
}

#[test]
fn stopped_parser_keeps_partial_tree() {
    let parser = parse_document(Dom::default(), ParseOpts::default());
    parser.parse_chunk(StrTendril::from("<p>one</p>"));
    parser.stop();
    parser.parse_chunk(StrTendril::from("<p>two</p>"));
    let dom = parser.finish();

    let body = body(&dom);
    assert_eq!(body.children.borrow().len(), 1);
}

#[test]
fn fragment_parsing_uses_context() {
    let parser = parse_fragment(
        Dom::default(),
        ParseOpts::default(),
        QualName::new(None, ns!(html), LocalName::from("div")),
        vec![],
    );
    let dom = parser.one(StrTendril::from("<li>item</li> tail"));

    let root = document_element(&dom.document).unwrap();
    let children = root.children.borrow().clone();
    assert_eq!(elem_name(&children[0]), "li");
    assert_eq!(text_of(&children[1]), " tail");
}

#[test]
fn serialize_then_reparse_is_stable() {
    let first = parse("<!DOCTYPE html><p class=\"a\">x<b>y</b></p><!--c-->");
    let once = to_html(&first);

    let second = parse(&once);
    let twice = to_html(&second);

    assert_eq!(once, twice);
    assert_eq!(
        once,
        "<!DOCTYPE html><html><head></head><body><p class=\"a\">x<b>y</b></p><!--c--></body></html>"
    );
}

#[test]
fn void_and_escaped_serialization() {
    let dom = parse("<p data-x=\"a&amp;b\">1 &lt; 2<br></p>");
    let html = to_html(&dom);
    assert_eq!(
        html,
        "<html><head></head><body><p data-x=\"a&amp;b\">1 &lt; 2<br></p></body></html>"
    );
}
