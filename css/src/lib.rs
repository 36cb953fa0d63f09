// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! CSS stylesheet model and selection engine.
//!
//! The grammar parser is an external collaborator: it builds
//! [`Stylesheet`]s out of [`Selector`] chains and opaque declaration
//! bytecode, and a [`SelectCtx`] cascades them over any tree reachable
//! through a [`SelectHandler`], producing interned [`ComputedStyle`]s
//! that honour origin, importance, specificity and inheritance.

pub mod bytecode;
pub mod computed;
pub mod error;
pub mod media;
pub mod properties;
pub mod select;
pub mod stylesheet;
pub mod types;

pub use bytecode::{PropertyId, Style};
pub use computed::ComputedStyle;
pub use error::CssError;
pub use media::MediaFlags;
pub use properties::PresentationalHint;
pub use select::{SelectCtx, SelectHandler};
pub use stylesheet::{
    AttrMatch, Combinator, PseudoClass, Rule, Selector, Specific, Specificity, Stylesheet,
};
pub use types::{
    Color, Display, Fixed, FontStyle, Length, Origin, PseudoElement, SizeValue, TextAlign, Unit,
    Visibility,
};
