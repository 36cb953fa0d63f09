// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Selection-engine tests over a synthetic element tree, exercising the
//! handler-driven design: the engine only sees the tree through
//! `SelectHandler` callbacks.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use willow_css::{
    AttrMatch, Color, Combinator, MediaFlags, Origin, PresentationalHint, PseudoClass,
    PseudoElement, Rule, SelectCtx, SelectHandler, Selector, Specific, Style, Stylesheet,
    TextAlign,
};
use willow_markup::LocalName;

struct TestNode {
    name: LocalName,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(LocalName, String)>,
    parent: RefCell<Weak<TestNode>>,
    children: RefCell<Vec<Rc<TestNode>>>,
}

fn elem(name: &str) -> Rc<TestNode> {
    Rc::new(TestNode {
        name: LocalName::from(name),
        id: None,
        classes: Vec::new(),
        attrs: Vec::new(),
        parent: RefCell::new(Weak::new()),
        children: RefCell::new(Vec::new()),
    })
}

fn elem_with(name: &str, id: Option<&str>, classes: &[&str], attrs: &[(&str, &str)]) -> Rc<TestNode> {
    Rc::new(TestNode {
        name: LocalName::from(name),
        id: id.map(String::from),
        classes: classes.iter().map(|c| c.to_string()).collect(),
        attrs: attrs
            .iter()
            .map(|(name, value)| (LocalName::from(*name), value.to_string()))
            .collect(),
        parent: RefCell::new(Weak::new()),
        children: RefCell::new(Vec::new()),
    })
}

fn append(parent: &Rc<TestNode>, child: &Rc<TestNode>) {
    *child.parent.borrow_mut() = Rc::downgrade(parent);
    parent.children.borrow_mut().push(child.clone());
}

struct TestHandler;

impl TestHandler {
    fn attr<'a>(node: &'a TestNode, name: &LocalName) -> Option<&'a str> {
        node.attrs
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }
}

impl SelectHandler for TestHandler {
    type Node = Rc<TestNode>;

    fn node_name(&self, node: &Self::Node) -> LocalName {
        node.name.clone()
    }

    fn parent_node(&self, node: &Self::Node) -> Option<Self::Node> {
        node.parent.borrow().upgrade()
    }

    fn sibling_node(&self, node: &Self::Node) -> Option<Self::Node> {
        let parent = self.parent_node(node)?;
        let children = parent.children.borrow();
        let i = children
            .iter()
            .position(|child| Rc::ptr_eq(child, node))?;
        if i == 0 {
            None
        } else {
            Some(children[i - 1].clone())
        }
    }

    fn node_has_class(&self, node: &Self::Node, name: &str) -> bool {
        node.classes.iter().any(|class| class == name)
    }

    fn node_has_id(&self, node: &Self::Node, name: &str) -> bool {
        node.id.as_deref() == Some(name)
    }

    fn node_has_attribute(&self, node: &Self::Node, name: &LocalName) -> bool {
        Self::attr(node, name).is_some()
    }

    fn node_has_attribute_equal(&self, node: &Self::Node, name: &LocalName, value: &str) -> bool {
        Self::attr(node, name) == Some(value)
    }

    fn node_has_attribute_dashmatch(
        &self,
        node: &Self::Node,
        name: &LocalName,
        value: &str,
    ) -> bool {
        match Self::attr(node, name) {
            Some(actual) => {
                actual == value
                    || (actual.starts_with(value) && actual[value.len()..].starts_with('-'))
            },
            None => false,
        }
    }

    fn node_has_attribute_includes(
        &self,
        node: &Self::Node,
        name: &LocalName,
        value: &str,
    ) -> bool {
        match Self::attr(node, name) {
            Some(actual) => actual.split_ascii_whitespace().any(|word| word == value),
            None => false,
        }
    }

    fn node_is_first_child(&self, node: &Self::Node) -> bool {
        match self.parent_node(node) {
            Some(parent) =>

                parent
                    .children
                    .borrow()
                    .first()
                    .map_or(false, |first| Rc::ptr_eq(first, node)),
            None => false,
        }
    }
}

/// Presentational-hint variant of the handler: every node claims
/// `align=center`.
struct HintHandler;

impl SelectHandler for HintHandler {
    type Node = Rc<TestNode>;

    fn node_name(&self, node: &Self::Node) -> LocalName {
        TestHandler.node_name(node)
    }
    fn parent_node(&self, node: &Self::Node) -> Option<Self::Node> {
        TestHandler.parent_node(node)
    }
    fn sibling_node(&self, node: &Self::Node) -> Option<Self::Node> {
        TestHandler.sibling_node(node)
    }
    fn node_has_class(&self, node: &Self::Node, name: &str) -> bool {
        TestHandler.node_has_class(node, name)
    }
    fn node_has_id(&self, node: &Self::Node, name: &str) -> bool {
        TestHandler.node_has_id(node, name)
    }
    fn node_has_attribute(&self, node: &Self::Node, name: &LocalName) -> bool {
        TestHandler.node_has_attribute(node, name)
    }
    fn node_has_attribute_equal(&self, node: &Self::Node, name: &LocalName, value: &str) -> bool {
        TestHandler.node_has_attribute_equal(node, name, value)
    }
    fn node_has_attribute_dashmatch(
        &self,
        node: &Self::Node,
        name: &LocalName,
        value: &str,
    ) -> bool {
        TestHandler.node_has_attribute_dashmatch(node, name, value)
    }
    fn node_has_attribute_includes(
        &self,
        node: &Self::Node,
        name: &LocalName,
        value: &str,
    ) -> bool {
        TestHandler.node_has_attribute_includes(node, name, value)
    }
    fn node_is_first_child(&self, node: &Self::Node) -> bool {
        TestHandler.node_is_first_child(node)
    }

    fn node_presentational_hints(&self, _node: &Self::Node) -> Vec<PresentationalHint> {
        vec![PresentationalHint::TextAlign(TextAlign::Center)]
    }
}

const RED: Color = Color(0xff00_00ff);
const GREEN: Color = Color(0x00ff_00ff);
const BLUE: Color = Color(0x0000_ffff);

fn color_rule(selector: Selector, color: Color, important: bool) -> Rule {
    let mut style = Style::new();
    style.set_color(color, important);
    Rule::Style {
        selectors: vec![selector],
        style,
    }
}

fn sheet(origin: Origin, rules: Vec<Rule>) -> Stylesheet {
    let mut sheet = Stylesheet::new(origin, "test.css".into());
    for rule in rules {
        sheet.append_rule(rule);
    }
    sheet
}

fn select(ctx: &SelectCtx, node: &Rc<TestNode>) -> Rc<willow_css::ComputedStyle> {
    ctx.select_style(
        node,
        PseudoElement::None,
        MediaFlags::SCREEN,
        None,
        &TestHandler,
    )
}

#[test]
fn id_specificity_beats_class_and_element() {
    // #x { color: red }  p.c { color: blue }  p { color: green }
    let mut id_sel = Selector::new(None);
    id_sel.append_specific(Specific::Id("x".into()));
    let mut class_sel = Selector::new(Some("p"));
    class_sel.append_specific(Specific::Class("c".into()));
    let elem_sel = Selector::new(Some("p"));

    let mut ctx = SelectCtx::new();
    ctx.append_sheet(&sheet(
        Origin::Author,
        vec![
            color_rule(id_sel, RED, false),
            color_rule(class_sel, BLUE, false),
            color_rule(elem_sel, GREEN, false),
        ],
    ));

    let node = elem_with("p", Some("x"), &["c"], &[]);
    assert_eq!(select(&ctx, &node).color, RED);
}

#[test]
fn author_important_beats_normal_id() {
    // p { color: red !important }  #x { color: blue }
    let p = Selector::new(Some("p"));
    let mut id_sel = Selector::new(None);
    id_sel.append_specific(Specific::Id("x".into()));

    let mut ctx = SelectCtx::new();
    ctx.append_sheet(&sheet(
        Origin::Author,
        vec![color_rule(p, RED, true), color_rule(id_sel, BLUE, false)],
    ));

    let node = elem_with("p", Some("x"), &[], &[]);
    assert_eq!(select(&ctx, &node).color, RED);
}

#[test]
fn later_declaration_wins_ties() {
    let first = Selector::new(Some("p"));
    let second = Selector::new(Some("p"));

    let mut ctx = SelectCtx::new();
    ctx.append_sheet(&sheet(
        Origin::Author,
        vec![color_rule(first, GREEN, false), color_rule(second, BLUE, false)],
    ));

    let node = elem("p");
    assert_eq!(select(&ctx, &node).color, BLUE);
}

#[test]
fn origin_ordering() {
    let node = elem("p");

    // Author normal beats user-agent normal.
    let mut ctx = SelectCtx::new();
    ctx.append_sheet(&sheet(
        Origin::UserAgent,
        vec![color_rule(Selector::new(Some("p")), GREEN, false)],
    ));
    ctx.append_sheet(&sheet(
        Origin::Author,
        vec![color_rule(Selector::new(Some("p")), RED, false)],
    ));
    assert_eq!(select(&ctx, &node).color, RED);

    // User !important beats author !important.
    let mut ctx = SelectCtx::new();
    ctx.append_sheet(&sheet(
        Origin::User,
        vec![color_rule(Selector::new(Some("p")), GREEN, true)],
    ));
    ctx.append_sheet(&sheet(
        Origin::Author,
        vec![color_rule(Selector::new(Some("p")), RED, true)],
    ));
    assert_eq!(select(&ctx, &node).color, GREEN);
}

#[test]
fn inherited_properties_compose_from_parent() {
    let parent_style = {
        let mut ctx = SelectCtx::new();
        ctx.append_sheet(&sheet(
            Origin::Author,
            vec![color_rule(Selector::new(Some("div")), RED, false)],
        ));
        let div = elem("div");
        select(&ctx, &div)
    };
    assert_eq!(parent_style.color, RED);

    // A child with no matching rules inherits color but not background.
    let ctx = SelectCtx::new();
    let child = elem("span");
    let style = ctx.select_style(
        &child,
        PseudoElement::None,
        MediaFlags::SCREEN,
        Some(&parent_style),
        &TestHandler,
    );
    assert_eq!(style.color, RED);
    assert_eq!(style.background_color, Color::TRANSPARENT);
}

#[test]
fn explicit_inherit_pulls_non_inherited_property() {
    let mut style = Style::new();
    style.set_inherit(willow_css::PropertyId::BackgroundColor, false);
    let rule = Rule::Style {
        selectors: vec![Selector::new(Some("span"))],
        style,
    };

    let mut ctx = SelectCtx::new();
    ctx.append_sheet(&sheet(Origin::Author, vec![rule]));

    let mut parent = willow_css::ComputedStyle::initial();
    parent.background_color = GREEN;

    let child = elem("span");
    let style = ctx.select_style(
        &child,
        PseudoElement::None,
        MediaFlags::SCREEN,
        Some(&parent),
        &TestHandler,
    );
    assert_eq!(style.background_color, GREEN);
}

#[test]
fn combinators_walk_the_tree() {
    // div p  { color: red }
    // div > p { color: green }
    // li + p { color: blue }
    let descendant =
        Selector::combine(Combinator::Descendant, Selector::new(Some("div")), Selector::new(Some("p")))
            .unwrap();
    let child =
        Selector::combine(Combinator::Child, Selector::new(Some("div")), Selector::new(Some("p")))
            .unwrap();
    let sibling =
        Selector::combine(Combinator::Sibling, Selector::new(Some("li")), Selector::new(Some("p")))
            .unwrap();

    let mut ctx = SelectCtx::new();
    ctx.append_sheet(&sheet(
        Origin::Author,
        vec![
            color_rule(descendant, RED, false),
            color_rule(child, GREEN, false),
            color_rule(sibling, BLUE, false),
        ],
    ));

    let div = elem("div");
    let section = elem("section");
    let deep_p = elem("p");
    append(&div, &section);
    append(&section, &deep_p);
    // div > section > p: descendant matches, child doesn't.
    // Both have specificity (0,0,2), so source order decides: `div > p`
    // was appended later and would win were it to match.
    assert_eq!(select(&ctx, &deep_p).color, RED);

    let div2 = elem("div");
    let direct_p = elem("p");
    append(&div2, &direct_p);
    // Both descendant and child match at equal specificity; the child
    // rule is later in the sheet.
    assert_eq!(select(&ctx, &direct_p).color, GREEN);

    let parent = elem("div2");
    let li = elem("li");
    let after_li = elem("p");
    append(&parent, &li);
    append(&parent, &after_li);
    assert_eq!(select(&ctx, &after_li).color, BLUE);
}

#[test]
fn attribute_and_pseudo_class_matching() {
    let mut exists = Selector::new(Some("p"));
    exists.append_specific(Specific::Attr {
        name: LocalName::from("title"),
        matcher: AttrMatch::Exists,
    });
    let mut includes = Selector::new(Some("p"));
    includes.append_specific(Specific::Attr {
        name: LocalName::from("rel"),
        matcher: AttrMatch::Includes("up".into()),
    });
    let mut dash = Selector::new(Some("p"));
    dash.append_specific(Specific::Attr {
        name: LocalName::from("lang"),
        matcher: AttrMatch::DashMatch("en".into()),
    });
    let mut first = Selector::new(Some("p"));
    first.append_specific(Specific::Pseudo(PseudoClass::FirstChild));

    let mut ctx = SelectCtx::new();
    ctx.append_sheet(&sheet(
        Origin::Author,
        vec![
            color_rule(exists, RED, false),
            color_rule(includes, GREEN, false),
            color_rule(dash, BLUE, false),
        ],
    ));
    let mut first_sheet = Stylesheet::new(Origin::Author, "first.css".into());
    let mut bold = Style::new();
    bold.set_font_weight(700, false);
    first_sheet.append_rule(Rule::Style {
        selectors: vec![first],
        style: bold,
    });
    ctx.append_sheet(&first_sheet);

    let titled = elem_with("p", None, &[], &[("title", "t")]);
    assert_eq!(select(&ctx, &titled).color, RED);

    let rel = elem_with("p", None, &[], &[("rel", "index up home")]);
    assert_eq!(select(&ctx, &rel).color, GREEN);

    let lang = elem_with("p", None, &[], &[("lang", "en-GB")]);
    assert_eq!(select(&ctx, &lang).color, BLUE);

    let parent = elem("div");
    let a = elem("p");
    let b = elem("p");
    append(&parent, &a);
    append(&parent, &b);
    assert_eq!(select(&ctx, &a).font_weight, 700);
    assert_eq!(select(&ctx, &b).font_weight, 400);
}

#[test]
fn media_filtering() {
    let mut ctx = SelectCtx::new();
    let mut print_sheet = sheet(
        Origin::Author,
        vec![color_rule(Selector::new(Some("p")), RED, false)],
    );
    print_sheet.media = MediaFlags::PRINT;
    ctx.append_sheet(&print_sheet);

    // Nested @media also filters.
    let nested = sheet(
        Origin::Author,
        vec![Rule::Media {
            media: MediaFlags::PRINT,
            rules: vec![color_rule(Selector::new(Some("p")), GREEN, false)],
        }],
    );
    ctx.append_sheet(&nested);

    let node = elem("p");
    let style = select(&ctx, &node);
    assert_eq!(style.color, Color::BLACK);

    let for_print = ctx.select_style(
        &node,
        PseudoElement::None,
        MediaFlags::PRINT,
        None,
        &TestHandler,
    );
    // The sheet-level rule is earlier than the nested one.
    assert_eq!(for_print.color, GREEN);
}

#[test]
fn pseudo_element_styles_are_separate() {
    let mut before = Selector::new(Some("p"));
    before.set_pseudo_element(PseudoElement::Before);

    let mut ctx = SelectCtx::new();
    ctx.append_sheet(&sheet(Origin::Author, vec![color_rule(before, RED, false)]));

    let node = elem("p");
    assert_eq!(select(&ctx, &node).color, Color::BLACK);

    let before_style = ctx.select_style(
        &node,
        PseudoElement::Before,
        MediaFlags::SCREEN,
        None,
        &TestHandler,
    );
    assert_eq!(before_style.color, RED);
}

#[test]
fn identical_styles_are_interned() {
    let mut ctx = SelectCtx::new();
    ctx.append_sheet(&sheet(
        Origin::Author,
        vec![color_rule(Selector::new(Some("p")), RED, false)],
    ));

    let a = elem("p");
    let b = elem("p");
    let style_a = select(&ctx, &a);
    let style_b = select(&ctx, &b);
    assert!(Rc::ptr_eq(&style_a, &style_b));
}

#[test]
fn presentational_hints_lose_to_author_rules() {
    let node = elem("p");

    // Hint alone applies.
    let ctx = SelectCtx::new();
    let style = ctx.select_style(
        &node,
        PseudoElement::None,
        MediaFlags::SCREEN,
        None,
        &HintHandler,
    );
    assert_eq!(style.text_align, TextAlign::Center);

    // Any author rule for the property overrides the hint.
    let mut align = Style::new();
    align.set_text_align(TextAlign::Right, false);
    let mut ctx = SelectCtx::new();
    ctx.append_sheet(&sheet(
        Origin::Author,
        vec![Rule::Style {
            selectors: vec![Selector::new(Some("p"))],
            style: align,
        }],
    ));
    let style = ctx.select_style(
        &node,
        PseudoElement::None,
        MediaFlags::SCREEN,
        None,
        &HintHandler,
    );
    assert_eq!(style.text_align, TextAlign::Right);
}
