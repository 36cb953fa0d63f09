// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Selector matching and the cascade.
//!
//! The engine never touches a tree directly: every question it has about
//! a node goes through a caller-supplied [`SelectHandler`], so any tree
//! representation can be styled.  Selector chains are evaluated right to
//! left; candidate rules are pre-bucketed by the rightmost compound's
//! element name for cheap rejection.

use std::cell::RefCell;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use fxhash::{FxHashMap, FxHasher};
use log::debug;
use willow_markup::LocalName;

use crate::bytecode::{Decl, DeclValue, Style, PROPERTIES};
use crate::computed::ComputedStyle;
use crate::error::CssError;
use crate::media::MediaFlags;
use crate::properties::{self, PresentationalHint, DISPATCH};
use crate::stylesheet::{
    AttrMatch, Combinator, PseudoClass, Rule, Selector, Specific, Stylesheet,
};
use crate::types::{Origin, PseudoElement};

/// Tree access callbacks used during matching.
///
/// The `named_*` variants exist so optimized tree representations can
/// answer directly; the defaults derive them from the primitives.
pub trait SelectHandler {
    type Node: Clone;

    /// The node's (lowercased) element name.
    fn node_name(&self, node: &Self::Node) -> LocalName;

    /// The node's parent element, if any.
    fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;

    /// The element immediately preceding the node among its siblings.
    fn sibling_node(&self, node: &Self::Node) -> Option<Self::Node>;

    /// The parent, only if it carries the given name.
    fn named_parent_node(&self, node: &Self::Node, name: &LocalName) -> Option<Self::Node> {
        self.parent_node(node)
            .filter(|parent| self.node_name(parent) == *name)
    }

    /// The previous sibling, only if it carries the given name.
    fn named_sibling_node(&self, node: &Self::Node, name: &LocalName) -> Option<Self::Node> {
        self.sibling_node(node)
            .filter(|sibling| self.node_name(sibling) == *name)
    }

    /// The nearest ancestor with the given name.
    fn named_ancestor_node(&self, node: &Self::Node, name: &LocalName) -> Option<Self::Node> {
        let mut cursor = self.parent_node(node);
        while let Some(ancestor) = cursor {
            if self.node_name(&ancestor) == *name {
                return Some(ancestor);
            }
            cursor = self.parent_node(&ancestor);
        }
        None
    }

    fn node_has_class(&self, node: &Self::Node, name: &str) -> bool;
    fn node_has_id(&self, node: &Self::Node, name: &str) -> bool;

    fn node_has_attribute(&self, node: &Self::Node, name: &LocalName) -> bool;
    fn node_has_attribute_equal(&self, node: &Self::Node, name: &LocalName, value: &str) -> bool;

    /// `[name|=value]`: exact match, or a prefix followed by `-`.
    fn node_has_attribute_dashmatch(
        &self,
        node: &Self::Node,
        name: &LocalName,
        value: &str,
    ) -> bool;

    /// `[name~=value]`: the value appears in the space-separated list.
    fn node_has_attribute_includes(&self, node: &Self::Node, name: &LocalName, value: &str)
        -> bool;

    fn node_is_first_child(&self, node: &Self::Node) -> bool;

    fn node_is_link(&self, _node: &Self::Node) -> bool {
        false
    }
    fn node_is_visited(&self, _node: &Self::Node) -> bool {
        false
    }
    fn node_is_hover(&self, _node: &Self::Node) -> bool {
        false
    }
    fn node_is_active(&self, _node: &Self::Node) -> bool {
        false
    }
    fn node_is_focus(&self, _node: &Self::Node) -> bool {
        false
    }
    fn node_is_lang(&self, _node: &Self::Node, _lang: &str) -> bool {
        false
    }

    /// Presentational hints the document language attaches to this node.
    fn node_presentational_hints(&self, _node: &Self::Node) -> Vec<PresentationalHint> {
        Vec::new()
    }
}

/// Position of a declaration in the cascade: origin crossed with
/// importance.  Order is the modern standard one, with user-important
/// above author-important.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Debug)]
enum CascadeLevel {
    UserAgentNormal,
    UserNormal,
    AuthorNormal,
    AuthorImportant,
    UserImportant,
    UserAgentImportant,
}

impl CascadeLevel {
    fn new(origin: Origin, important: bool) -> CascadeLevel {
        match (origin, important) {
            (Origin::UserAgent, false) => CascadeLevel::UserAgentNormal,
            (Origin::User, false) => CascadeLevel::UserNormal,
            (Origin::Author, false) => CascadeLevel::AuthorNormal,
            (Origin::Author, true) => CascadeLevel::AuthorImportant,
            (Origin::User, true) => CascadeLevel::UserImportant,
            (Origin::UserAgent, true) => CascadeLevel::UserAgentImportant,
        }
    }
}

/// A rule flattened out of a stylesheet, with its effective media.
struct StoredRule {
    selector: Selector,
    style: Style,
    media: MediaFlags,
    order: u32,
}

/// Per-sheet rule hash: buckets by the rightmost compound's element
/// name, plus a bucket for selectors with no element name.
struct SheetRules {
    origin: Origin,
    media: MediaFlags,
    rules: Vec<StoredRule>,
    by_name: FxHashMap<LocalName, Vec<u32>>,
    universal: Vec<u32>,
}

impl SheetRules {
    fn build(sheet: &Stylesheet) -> SheetRules {
        let mut this = SheetRules {
            origin: sheet.origin,
            media: sheet.media,
            rules: Vec::new(),
            by_name: FxHashMap::default(),
            universal: Vec::new(),
        };
        this.flatten(&sheet.rules, sheet.media);
        this
    }

    fn flatten(&mut self, rules: &[Rule], media: MediaFlags) {
        for rule in rules {
            match rule {
                Rule::Style { selectors, style } => {
                    for selector in selectors {
                        let index = self.rules.len() as u32;
                        match selector.element {
                            Some(ref name) => {
                                self.by_name.entry(name.clone()).or_default().push(index)
                            },
                            None => self.universal.push(index),
                        }
                        self.rules.push(StoredRule {
                            selector: selector.clone(),
                            style: style.clone(),
                            media,
                            order: index,
                        });
                    }
                },
                Rule::Media {
                    media: inner,
                    rules,
                } => {
                    self.flatten(rules, media & *inner);
                },
                // Imports are resolved by the client and appended as
                // sheets in their own right.
                Rule::Import { .. } => {},
            }
        }
    }

    /// Candidate rules for an element name, in source order.
    fn candidates(&self, name: &LocalName) -> Vec<u32> {
        let named = self.by_name.get(name).map(|v| &v[..]).unwrap_or(&[]);
        let mut out = Vec::with_capacity(named.len() + self.universal.len());
        let (mut i, mut j) = (0, 0);
        while i < named.len() || j < self.universal.len() {
            let take_named = match (named.get(i), self.universal.get(j)) {
                (Some(a), Some(b)) => a < b,
                (Some(_), None) => true,
                _ => false,
            };
            if take_named {
                out.push(named[i]);
                i += 1;
            } else {
                out.push(self.universal[j]);
                j += 1;
            }
        }
        out
    }
}

/// A selection context: an ordered list of sheets plus the computed-style
/// interner.
#[derive(Default)]
pub struct SelectCtx {
    sheets: Vec<SheetRules>,
    interned: RefCell<FxHashMap<u64, Vec<Rc<ComputedStyle>>>>,
}

impl SelectCtx {
    pub fn new() -> SelectCtx {
        SelectCtx::default()
    }

    /// Append a sheet; it cascades after every sheet already present.
    pub fn append_sheet(&mut self, sheet: &Stylesheet) {
        self.sheets.push(SheetRules::build(sheet));
    }

    /// Insert a sheet at a position in the cascade order.
    pub fn insert_sheet(&mut self, sheet: &Stylesheet, index: usize) -> Result<(), CssError> {
        if index > self.sheets.len() {
            return Err(CssError::BadParm);
        }
        self.sheets.insert(index, SheetRules::build(sheet));
        Ok(())
    }

    /// Remove the sheet at a position.
    pub fn remove_sheet(&mut self, index: usize) -> Result<(), CssError> {
        if index >= self.sheets.len() {
            return Err(CssError::NotFound);
        }
        self.sheets.remove(index);
        Ok(())
    }

    pub fn count_sheets(&self) -> usize {
        self.sheets.len()
    }

    /// Compute the style for one node and pseudo-element.
    ///
    /// `parent` is the parent element's computed style, for inheritance;
    /// pass `None` for the root.  The result is interned: identical
    /// styles share one allocation.
    pub fn select_style<H: SelectHandler>(
        &self,
        node: &H::Node,
        pseudo: PseudoElement,
        media: MediaFlags,
        parent: Option<&ComputedStyle>,
        handler: &H,
    ) -> Rc<ComputedStyle> {
        let mut state = CascadeState::new();

        for hint in handler.node_presentational_hints(node) {
            state.apply_hint(&hint);
        }

        let name = handler.node_name(node);
        for (sheet_index, sheet) in self.sheets.iter().enumerate() {
            if !sheet.media.intersects(media) {
                continue;
            }
            for index in sheet.candidates(&name) {
                let rule = &sheet.rules[index as usize];
                if !rule.media.intersects(media) {
                    continue;
                }
                if rule.selector.pseudo_element != pseudo {
                    continue;
                }
                if !match_selector(handler, node, &rule.selector) {
                    continue;
                }
                debug!("rule {index} in sheet {sheet_index} matched");
                let order = ((sheet_index as u32) << 20) | rule.order;
                for decl in rule.style.decls() {
                    state.apply(sheet.origin, decl, rule.selector.specificity.0, order);
                }
            }
        }

        self.intern(state.finish(parent))
    }

    fn intern(&self, style: ComputedStyle) -> Rc<ComputedStyle> {
        let mut hasher = FxHasher::default();
        style.hash(&mut hasher);
        let key = hasher.finish();

        let mut interned = self.interned.borrow_mut();
        let bucket = interned.entry(key).or_default();
        for existing in bucket.iter() {
            if **existing == style {
                return existing.clone();
            }
        }
        let shared = Rc::new(style);
        bucket.push(shared.clone());
        shared
    }
}

/// Winning source for one property while the cascade runs.
#[derive(Copy, Clone)]
struct PropSource {
    level: CascadeLevel,
    specificity: u32,
    order: u32,
}

struct CascadeState {
    style: ComputedStyle,
    source: [Option<PropSource>; crate::bytecode::N_PROPERTIES],
    inherit: [bool; crate::bytecode::N_PROPERTIES],
}

impl CascadeState {
    fn new() -> CascadeState {
        CascadeState {
            style: ComputedStyle::initial(),
            source: [None; crate::bytecode::N_PROPERTIES],
            inherit: [false; crate::bytecode::N_PROPERTIES],
        }
    }

    /// Hints enter at author level with zero specificity, before any
    /// author rule.
    fn apply_hint(&mut self, hint: &PresentationalHint) {
        let i = hint.property().index();
        if self.outranks(i, CascadeLevel::AuthorNormal, 0, 0) {
            self.source[i] = Some(PropSource {
                level: CascadeLevel::AuthorNormal,
                specificity: 0,
                order: 0,
            });
            self.inherit[i] = false;
            hint.set_from_hint(&mut self.style);
        }
    }

    fn apply(&mut self, origin: Origin, decl: Decl, specificity: u32, order: u32) {
        let level = CascadeLevel::new(origin, decl.important);
        let i = decl.prop.index();
        if !self.outranks(i, level, specificity, order) {
            return;
        }
        self.source[i] = Some(PropSource {
            level,
            specificity,
            order,
        });
        match decl.value {
            DeclValue::Inherit => self.inherit[i] = true,
            ref value => {
                self.inherit[i] = false;
                properties::cascade(decl.prop, value, &mut self.style);
            },
        }
    }

    /// Does a declaration at (level, specificity, order) replace the
    /// current source?  Ties go to the later declaration.
    fn outranks(&self, index: usize, level: CascadeLevel, specificity: u32, order: u32) -> bool {
        match self.source[index] {
            None => true,
            Some(old) => (level, specificity, order) >= (old.level, old.specificity, old.order),
        }
    }

    /// Resolve inheritance and defaults into the final style.
    fn finish(mut self, parent: Option<&ComputedStyle>) -> ComputedStyle {
        for (i, prop) in PROPERTIES.iter().enumerate() {
            let inherit = self.inherit[i] || (self.source[i].is_none() && prop.inherited());
            if inherit {
                match parent {
                    Some(parent) => (DISPATCH[i].compose)(parent, &mut self.style),
                    None => (DISPATCH[i].initial)(&mut self.style),
                }
            }
        }
        self.style
    }
}

/// Evaluate a selector chain right-to-left against a node.
fn match_selector<H: SelectHandler>(handler: &H, node: &H::Node, selector: &Selector) -> bool {
    if !match_compound(handler, node, selector) {
        return false;
    }

    let (combinator, left) = match selector.combinator {
        None => return true,
        Some((combinator, ref left)) => (combinator, left),
    };

    match combinator {
        Combinator::Child => {
            let parent = match left.element {
                Some(ref name) => handler.named_parent_node(node, name),
                None => handler.parent_node(node),
            };
            match parent {
                Some(parent) => match_selector(handler, &parent, left),
                None => false,
            }
        },

        Combinator::Descendant => {
            let mut cursor = match left.element {
                Some(ref name) => handler.named_ancestor_node(node, name),
                None => handler.parent_node(node),
            };
            while let Some(ancestor) = cursor {
                if match_selector(handler, &ancestor, left) {
                    return true;
                }
                cursor = match left.element {
                    Some(ref name) => handler.named_ancestor_node(&ancestor, name),
                    None => handler.parent_node(&ancestor),
                };
            }
            false
        },

        Combinator::Sibling => {
            let sibling = match left.element {
                Some(ref name) => handler.named_sibling_node(node, name),
                None => handler.sibling_node(node),
            };
            match sibling {
                Some(sibling) => match_selector(handler, &sibling, left),
                None => false,
            }
        },

        Combinator::GeneralSibling => {
            let mut cursor = handler.sibling_node(node);
            while let Some(sibling) = cursor {
                if match_selector(handler, &sibling, left) {
                    return true;
                }
                cursor = handler.sibling_node(&sibling);
            }
            false
        },
    }
}

fn match_compound<H: SelectHandler>(handler: &H, node: &H::Node, selector: &Selector) -> bool {
    if let Some(ref name) = selector.element {
        if handler.node_name(node) != *name {
            return false;
        }
    }

    selector.specifics.iter().all(|specific| match specific {
        Specific::Id(id) => handler.node_has_id(node, id),
        Specific::Class(class) => handler.node_has_class(node, class),
        Specific::Attr { name, matcher } => match matcher {
            AttrMatch::Exists => handler.node_has_attribute(node, name),
            AttrMatch::Equals(value) => handler.node_has_attribute_equal(node, name, value),
            AttrMatch::Includes(value) => handler.node_has_attribute_includes(node, name, value),
            AttrMatch::DashMatch(value) => handler.node_has_attribute_dashmatch(node, name, value),
        },
        Specific::Pseudo(pseudo) => match pseudo {
            PseudoClass::FirstChild => handler.node_is_first_child(node),
            PseudoClass::Link => handler.node_is_link(node),
            PseudoClass::Visited => handler.node_is_visited(node),
            PseudoClass::Hover => handler.node_is_hover(node),
            PseudoClass::Active => handler.node_is_active(node),
            PseudoClass::Focus => handler.node_is_focus(node),
            PseudoClass::Lang(lang) => handler.node_is_lang(node, lang),
        },
    })
}
