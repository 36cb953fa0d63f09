// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The stylesheet object model: rules, selectors and specificity.
//!
//! Selectors are stored subject-first: the rightmost compound selector
//! carries an optional combinator pointing at the compound to its left,
//! so `A + B` is represented as `B` whose combinator names `A`.  The
//! grammar parser (an external collaborator) builds these structures and
//! hands them to [`Stylesheet::append_rule`].

use smallvec::SmallVec;
use tendril::StrTendril;
use willow_markup::LocalName;

use crate::bytecode::Style;
use crate::error::CssError;
use crate::media::MediaFlags;
use crate::types::{Origin, PseudoElement};

/// Selector specificity: the `(a, b, c)` triple packed into 32 bits,
/// compared lexicographically.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Default, Debug)]
pub struct Specificity(pub u32);

impl Specificity {
    const A: u32 = 1 << 20;
    const B: u32 = 1 << 10;
    const C: u32 = 1;

    pub fn new(a: u32, b: u32, c: u32) -> Specificity {
        Specificity(a * Self::A + b * Self::B + c * Self::C)
    }
}

/// How a compound selector relates to the one on its left.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Combinator {
    /// `A B`
    Descendant,
    /// `A > B`
    Child,
    /// `A + B`
    Sibling,
    /// `A ~ B`
    GeneralSibling,
}

/// A class, id, attribute or pseudo-class constraint on a compound
/// selector.
#[derive(Clone, Debug)]
pub enum Specific {
    Id(StrTendril),
    Class(StrTendril),
    Attr { name: LocalName, matcher: AttrMatch },
    Pseudo(PseudoClass),
}

#[derive(Clone, Debug)]
pub enum AttrMatch {
    /// `[name]`
    Exists,
    /// `[name=value]`
    Equals(StrTendril),
    /// `[name~=value]`
    Includes(StrTendril),
    /// `[name|=value]`
    DashMatch(StrTendril),
}

#[derive(Clone, Debug)]
pub enum PseudoClass {
    FirstChild,
    Link,
    Visited,
    Hover,
    Active,
    Focus,
    Lang(StrTendril),
}

/// One compound selector plus the chain to its left.
#[derive(Clone, Debug)]
pub struct Selector {
    /// Element name; `None` is the universal selector.
    pub element: Option<LocalName>,
    /// Additional constraints on this compound.
    pub specifics: SmallVec<[Specific; 4]>,
    /// Pseudo-element the whole selector addresses.
    pub pseudo_element: PseudoElement,
    /// The compound to the left, reachable through its combinator.
    pub combinator: Option<(Combinator, Box<Selector>)>,
    /// Computed at build time, over the whole chain.
    pub specificity: Specificity,
}

impl Selector {
    /// Create a compound selector for an element name, or the universal
    /// selector for `None`.
    pub fn new(element: Option<&str>) -> Selector {
        let element = element.map(LocalName::from);
        let specificity = match element {
            Some(_) => Specificity::new(0, 0, 1),
            None => Specificity::default(),
        };
        Selector {
            element,
            specifics: SmallVec::new(),
            pseudo_element: PseudoElement::None,
            combinator: None,
            specificity,
        }
    }

    /// Append a specific to this compound, bumping the specificity.
    pub fn append_specific(&mut self, specific: Specific) {
        self.specificity.0 += match specific {
            Specific::Id(_) => Specificity::new(1, 0, 0).0,
            _ => Specificity::new(0, 1, 0).0,
        };
        self.specifics.push(specific);
    }

    /// Address a pseudo-element; counts like an element name.
    pub fn set_pseudo_element(&mut self, pseudo: PseudoElement) {
        if self.pseudo_element == PseudoElement::None && pseudo != PseudoElement::None {
            self.specificity.0 += Specificity::new(0, 0, 1).0;
        }
        self.pseudo_element = pseudo;
    }

    /// Combine a pair of selectors.
    ///
    /// Given `A + B`, `left` is `A` and `right` is `B`; the result is the
    /// chain rooted at `B`.  Fails if `right` already has a combinator.
    pub fn combine(
        combinator: Combinator,
        left: Selector,
        mut right: Selector,
    ) -> Result<Selector, CssError> {
        if right.combinator.is_some() {
            return Err(CssError::Invalid);
        }
        right.specificity.0 += left.specificity.0;
        right.combinator = Some((combinator, Box::new(left)));
        Ok(right)
    }
}

/// A rule in a stylesheet.
#[derive(Clone, Debug)]
pub enum Rule {
    /// Selectors sharing a declaration block.
    Style { selectors: Vec<Selector>, style: Style },
    /// `@media`, with nested rules.
    Media { media: MediaFlags, rules: Vec<Rule> },
    /// `@import`; resolution is the client's job.
    Import { url: StrTendril, media: MediaFlags },
}

/// An ordered list of rules with an origin and disposition.
#[derive(Debug)]
pub struct Stylesheet {
    pub origin: Origin,
    pub media: MediaFlags,
    pub url: StrTendril,
    pub title: Option<StrTendril>,
    /// Quirky selector matching (case-insensitive classes/ids) permitted.
    pub allow_quirks: bool,
    /// Came from a `style` attribute rather than a sheet.
    pub inline: bool,
    pub rules: Vec<Rule>,
}

impl Stylesheet {
    pub fn new(origin: Origin, url: StrTendril) -> Stylesheet {
        Stylesheet {
            origin,
            media: MediaFlags::ALL,
            url,
            title: None,
            allow_quirks: false,
            inline: false,
            rules: Vec::new(),
        }
    }

    /// Append a rule; rules cascade in append order.
    pub fn append_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// The `@import`s this sheet requests, for the client to resolve.
    pub fn imports(&self) -> impl Iterator<Item = (&StrTendril, MediaFlags)> {
        self.rules.iter().filter_map(|rule| match rule {
            Rule::Import { url, media } => Some((url, *media)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specificity_is_lexicographic() {
        let id = Specificity::new(1, 0, 0);
        let many_classes = Specificity::new(0, 20, 30);
        assert!(id > many_classes);

        let mut sel = Selector::new(Some("p"));
        sel.append_specific(Specific::Class("c".into()));
        sel.append_specific(Specific::Id("x".into()));
        assert_eq!(sel.specificity, Specificity::new(1, 1, 1));
    }

    #[test]
    fn combine_rejects_existing_chain() {
        let a = Selector::new(Some("div"));
        let b = Selector::new(Some("p"));
        let chained = Selector::combine(Combinator::Child, a, b).unwrap();
        assert_eq!(chained.specificity, Specificity::new(0, 0, 2));

        let c = Selector::new(Some("em"));
        assert!(Selector::combine(Combinator::Descendant, c.clone(), chained.clone()).is_err());
        let ok = Selector::combine(Combinator::Descendant, chained, c);
        assert!(ok.is_ok());
    }
}
