// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A streaming HTML parser: a tokenizer feeding a tree-construction state
//! machine that drives any [`TreeSink`](willow_markup::interface::TreeSink),
//! plus the matching serializer.
//!
//! Malformed input never aborts a parse; errors are reported through the
//! sink and the output tree is always well-formed.

pub use willow_markup::*;

pub use crate::driver::{parse_document, parse_fragment, ParseOpts, Parser};
pub use crate::serialize::serialize;

#[macro_use]
mod macros;

pub mod driver;
pub mod serialize;
pub mod tokenizer;
pub mod tree_builder;
