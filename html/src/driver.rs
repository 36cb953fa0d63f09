// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! High-level interface to the parser: couples the tokenizer to the tree
//! builder and feeds it UTF-8 chunks.

use std::cell::RefCell;

use tendril::StrTendril;
use willow_markup::interface::{create_element, TreeSink};
use willow_markup::{Attribute, QualName};

use crate::tokenizer::{Tokenizer, TokenizerOpts};
use crate::tree_builder::{TreeBuilder, TreeBuilderOpts};

/// All-encompassing options struct for the parser.
#[derive(Clone, Default)]
pub struct ParseOpts {
    /// Tokenizer options.
    pub tokenizer: TokenizerOpts,

    /// Tree builder options.
    pub tree_builder: TreeBuilderOpts,
}

/// Parse an HTML document.
///
/// The returned `Parser` is fed UTF-8 chunks with [`Parser::parse_chunk`];
/// [`Parser::finish`] ends the parse and hands back the sink's output.
pub fn parse_document<Sink>(sink: Sink, opts: ParseOpts) -> Parser<Sink>
where
    Sink: TreeSink,
{
    let tb = TreeBuilder::new(sink, opts.tree_builder);
    let tok = Tokenizer::new(tb, opts.tokenizer);
    Parser {
        tokenizer: RefCell::new(tok),
    }
}

/// Parse an HTML fragment in the context of an element with the given
/// name and attributes.
///
/// The fragment is parsed as the children of the sink document's root
/// element.
pub fn parse_fragment<Sink>(
    sink: Sink,
    opts: ParseOpts,
    context_name: QualName,
    context_attrs: Vec<Attribute>,
) -> Parser<Sink>
where
    Sink: TreeSink,
{
    let context_local = context_name.local.clone();
    let context_elem = create_element(&sink, context_name, context_attrs);
    let tb = TreeBuilder::new_for_fragment(sink, context_elem, None, opts.tree_builder);
    let tok_opts = TokenizerOpts {
        initial_state: Some(tb.tokenizer_state_for_context_elem()),
        last_start_tag_name: Some(context_local),
        ..opts.tokenizer
    };
    let tok = Tokenizer::new(tb, tok_opts);
    Parser {
        tokenizer: RefCell::new(tok),
    }
}

/// A streaming HTML parse in progress.
pub struct Parser<Sink>
where
    Sink: TreeSink,
{
    tokenizer: RefCell<Tokenizer<TreeBuilder<Sink::Handle, Sink>>>,
}

impl<Sink: TreeSink> Parser<Sink> {
    /// Feed one chunk of input.  The tree visible through the sink is
    /// well-formed after every chunk.
    pub fn parse_chunk(&self, input: StrTendril) {
        self.tokenizer.borrow_mut().feed(input);
    }

    /// Abandon the parse.  Later chunks are ignored and `finish` returns
    /// whatever tree was built so far.
    pub fn stop(&self) {
        self.tokenizer.borrow_mut().stop();
    }

    /// Signal the end of input and return the sink's output.
    pub fn finish(self) -> Sink::Output {
        let mut tokenizer = self.tokenizer.into_inner();
        tokenizer.end();
        tokenizer.sink.sink.finish()
    }

    /// Parse a complete string in one go.
    pub fn one(self, input: StrTendril) -> Sink::Output {
        self.parse_chunk(input);
        self.finish()
    }
}
