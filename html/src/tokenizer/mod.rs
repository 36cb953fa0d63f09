// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The HTML tokenizer: a resumable state machine turning UTF-8 chunks
//! into a stream of tokens.
//!
//! The tokenizer never blocks: when a chunk ends mid-token the state is
//! kept and the next `feed` resumes where it left off.  Carriage returns
//! are normalized to line feeds on the way in.

use std::borrow::Cow;

use log::debug;
use mac::unwrap_or_return;
use tendril::StrTendril;
use willow_markup::{small_char_set, Attribute, BufferQueue, LocalName, QualName};
use willow_markup::SetResult::{FromSet, NotFromSet};

use self::char_ref::{consume_char_ref, CharRefResult};
use self::states::{DoubleQuoted, Public, Rcdata, SingleQuoted, System, Unquoted};

pub use self::interface::{Doctype, Tag, TagKind, Token, TokenSink, TokenSinkResult};
pub use self::interface::{CharacterTokens, CommentToken, DoctypeToken, TagToken};
pub use self::interface::{EOFToken, NullCharacterToken, ParseError};
pub use self::interface::{EndTag, StartTag};

mod char_ref;
mod interface;
pub mod states;

/// Tokenizer options, with an impl for `Default`.
#[derive(Clone)]
pub struct TokenizerOpts {
    /// Report all parse errors described in the spec, at some
    /// performance penalty?  Default: false
    pub exact_errors: bool,

    /// Discard a `U+FEFF BYTE ORDER MARK` if we see one at the beginning
    /// of the stream?  Default: true
    pub discard_bom: bool,

    /// Initial state override.  Only the driver should use this.
    pub initial_state: Option<states::State>,

    /// Last start tag.  Only the driver should use this.
    pub last_start_tag_name: Option<LocalName>,
}

impl Default for TokenizerOpts {
    fn default() -> TokenizerOpts {
        TokenizerOpts {
            exact_errors: false,
            discard_bom: true,
            initial_state: None,
            last_start_tag_name: None,
        }
    }
}

/// The HTML tokenizer.
pub struct Tokenizer<Sink> {
    /// Options controlling the behavior of the tokenizer.
    opts: TokenizerOpts,

    /// Destination for tokens we emit.
    pub sink: Sink,

    /// The abstract machine state.
    state: states::State,

    /// Input ready to be tokenized.
    input: BufferQueue,

    /// Are we at the end of the file?
    at_eof: bool,

    /// Set by the driver to abandon the parse; checked between tokens.
    stopped: bool,

    /// Should we discard a BOM at the start of the stream?
    discard_bom: bool,

    /// Ignore a following U+000A LINE FEED (after a CR).
    ignore_lf: bool,

    /// Name of the last emitted start tag, for raw-data end tag matching.
    last_start_tag_name: Option<LocalName>,

    /// Current tag under construction.
    current_tag_kind: TagKind,
    current_tag_name: StrTendril,
    current_tag_self_closing: bool,
    current_tag_attrs: Vec<Attribute>,

    /// Current attribute under construction.
    current_attr_name: StrTendril,
    current_attr_value: StrTendril,

    /// Current comment under construction.
    current_comment: StrTendril,

    /// Current doctype under construction.
    current_doctype: Doctype,

    /// Buffer for raw-data end tag matching.
    temp_buf: StrTendril,
}

impl<Sink: TokenSink> Tokenizer<Sink> {
    /// Create a new tokenizer which feeds tokens to a particular `TokenSink`.
    pub fn new(sink: Sink, opts: TokenizerOpts) -> Tokenizer<Sink> {
        let state = opts.initial_state.unwrap_or(states::State::Data);
        let last_start_tag_name = opts.last_start_tag_name.clone();
        let discard_bom = opts.discard_bom;
        Tokenizer {
            opts,
            sink,
            state,
            input: BufferQueue::new(),
            at_eof: false,
            stopped: false,
            discard_bom,
            ignore_lf: false,
            last_start_tag_name,
            current_tag_kind: StartTag,
            current_tag_name: StrTendril::new(),
            current_tag_self_closing: false,
            current_tag_attrs: Vec::new(),
            current_attr_name: StrTendril::new(),
            current_attr_value: StrTendril::new(),
            current_comment: StrTendril::new(),
            current_doctype: Doctype::default(),
            temp_buf: StrTendril::new(),
        }
    }

    /// Feed an input chunk to the tokenizer and process it as far as
    /// possible.
    pub fn feed(&mut self, chunk: StrTendril) {
        if chunk.is_empty() {
            return;
        }
        self.input.push_back(chunk);
        if self.discard_bom {
            if let Some('\u{feff}') = self.input.peek() {
                self.input.next();
            }
            self.discard_bom = false;
        }
        self.run();
    }

    /// Signal the end of input; flushes any partial token and emits EOF.
    pub fn end(&mut self) {
        self.at_eof = true;
        if !self.stopped {
            self.run();
            self.finish_eof();
            self.process_token(EOFToken);
        }
        self.sink.end();
    }

    /// Abandon the parse: no further tokens will be emitted.  The tree
    /// built so far stays well-formed.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    fn run(&mut self) {
        while !self.stopped && self.step() {}
    }

    //§ preprocessing-the-input-stream
    fn flush_ignore_lf(&mut self) -> bool {
        if self.ignore_lf {
            match self.input.peek() {
                Some('\n') => {
                    self.input.next();
                    self.ignore_lf = false;
                },
                Some(_) => self.ignore_lf = false,
                None if self.at_eof => self.ignore_lf = false,
                None => return false,
            }
        }
        true
    }

    fn get_char(&mut self) -> Option<char> {
        if !self.flush_ignore_lf() {
            return None;
        }
        match self.input.next() {
            Some('\r') => {
                self.ignore_lf = true;
                Some('\n')
            },
            c => c,
        }
    }

    fn pop_except(&mut self, set: willow_markup::SmallCharSet) -> Option<willow_markup::SetResult> {
        if !self.flush_ignore_lf() {
            return None;
        }
        match self.input.pop_except_from(set) {
            Some(FromSet('\r')) => {
                self.ignore_lf = true;
                Some(FromSet('\n'))
            },
            r => r,
        }
    }

    fn unget(&mut self, c: char) {
        let mut buf = StrTendril::new();
        buf.push_char(c);
        self.input.push_front(buf);
    }

    //§ tokenization
    fn process_token(&mut self, token: Token) {
        match self.sink.process_token(token) {
            TokenSinkResult::Continue => {},
            TokenSinkResult::RawData(kind) => self.state = states::State::RawData(kind),
            TokenSinkResult::Plaintext => self.state = states::State::Plaintext,
        }
    }

    fn parse_error(&mut self, msg: &'static str) {
        let msg = if self.opts.exact_errors {
            Cow::from(format!("{} in state {:?}", msg, self.state))
        } else {
            Cow::Borrowed(msg)
        };
        self.process_token(ParseError(msg));
    }

    fn emit_char(&mut self, c: char) {
        let mut buf = StrTendril::new();
        buf.push_char(c);
        self.process_token(CharacterTokens(buf));
    }

    fn emit_chars(&mut self, buf: StrTendril) {
        self.process_token(CharacterTokens(buf));
    }

    fn emit_str(&mut self, s: &str) {
        self.emit_chars(StrTendril::from_slice(s));
    }

    fn create_tag(&mut self, kind: TagKind, c: char) {
        self.finish_attribute();
        self.current_tag_kind = kind;
        self.current_tag_name.clear();
        self.current_tag_name.push_char(c);
        self.current_tag_self_closing = false;
        self.current_tag_attrs.clear();
        self.current_attr_name.clear();
        self.current_attr_value.clear();
    }

    fn create_attribute(&mut self, c: char) {
        self.finish_attribute();
        self.current_attr_name.push_char(c);
    }

    /// Commit the attribute under construction, dropping duplicates.
    fn finish_attribute(&mut self) {
        if self.current_attr_name.is_empty() {
            self.current_attr_value.clear();
            return;
        }
        let name = LocalName::from(&*self.current_attr_name);
        let duplicate = self
            .current_tag_attrs
            .iter()
            .any(|a| a.name.local == name);
        if duplicate {
            self.parse_error("Duplicate attribute");
        } else {
            self.current_tag_attrs.push(Attribute {
                name: QualName::new(None, willow_markup::ns!(), name),
                value: std::mem::take(&mut self.current_attr_value),
            });
        }
        self.current_attr_name.clear();
        self.current_attr_value.clear();
    }

    fn emit_current_tag(&mut self) {
        self.finish_attribute();
        let name = LocalName::from(&*self.current_tag_name);
        self.current_tag_name.clear();

        match self.current_tag_kind {
            StartTag => {
                self.last_start_tag_name = Some(name.clone());
            },
            EndTag => {
                if !self.current_tag_attrs.is_empty() {
                    self.parse_error("Attributes on an end tag");
                }
                if self.current_tag_self_closing {
                    self.parse_error("Self-closing end tag");
                }
            },
        }

        let token = TagToken(Tag {
            kind: self.current_tag_kind,
            name,
            self_closing: self.current_tag_self_closing,
            attrs: std::mem::take(&mut self.current_tag_attrs),
        });
        // The sink result may redirect us into a raw-data state; default
        // back to Data first.
        self.state = states::State::Data;
        self.process_token(token);
    }

    fn emit_current_comment(&mut self) {
        let comment = std::mem::take(&mut self.current_comment);
        self.process_token(CommentToken(comment));
    }

    fn emit_current_doctype(&mut self) {
        let doctype = std::mem::take(&mut self.current_doctype);
        self.process_token(DoctypeToken(doctype));
    }

    fn doctype_id(&mut self, kind: states::DoctypeIdKind) -> &mut Option<StrTendril> {
        match kind {
            Public => &mut self.current_doctype.public_id,
            System => &mut self.current_doctype.system_id,
        }
    }

    fn push_doctype_id(&mut self, kind: states::DoctypeIdKind, c: char) {
        self.doctype_id(kind)
            .get_or_insert_with(StrTendril::new)
            .push_char(c);
    }

    /// Does the current end tag match the last emitted start tag?
    fn have_appropriate_end_tag(&self) -> bool {
        match self.last_start_tag_name {
            Some(ref last) => {
                self.current_tag_kind == EndTag && *self.current_tag_name == **last
            },
            None => false,
        }
    }

    fn consume_char_ref(&mut self, in_attr: bool) -> bool {
        match consume_char_ref(&mut self.input, self.at_eof, in_attr) {
            CharRefResult::Done { chars, error } => {
                if let Some(msg) = error {
                    self.parse_error(msg);
                }
                if in_attr {
                    self.current_attr_value.push_tendril(&chars);
                } else {
                    self.emit_chars(chars);
                }
                true
            },
            CharRefResult::Stuck => {
                // Retry from the ampersand once more input arrives.
                self.unget('&');
                false
            },
        }
    }

    fn is_whitespace(c: char) -> bool {
        matches!(c, '\t' | '\n' | '\x0C' | ' ')
    }

    /// Run one step of the state machine.  Returns false when the
    /// machine needs more input.
    #[allow(clippy::never_loop)]
    fn step(&mut self) -> bool {
        use self::states::State;
        debug!("processing in state {:?}", self.state);

        match self.state {
            //§ data-state
            State::Data => match unwrap_or_return!(
                self.pop_except(small_char_set!('\r' '\0' '&' '<')),
                false
            ) {
                FromSet('\0') => {
                    self.parse_error("Null character in data");
                    self.process_token(NullCharacterToken);
                    true
                },
                FromSet('&') => self.consume_char_ref(false),
                FromSet('<') => go!(self: to TagOpen),
                FromSet(c) => {
                    self.emit_char(c);
                    true
                },
                NotFromSet(b) => {
                    self.emit_chars(b);
                    true
                },
            },

            //§ plaintext-state
            State::Plaintext => match unwrap_or_return!(
                self.pop_except(small_char_set!('\r' '\0')),
                false
            ) {
                FromSet('\0') => {
                    self.parse_error("Null character in plaintext");
                    self.emit_char('\u{fffd}');
                    true
                },
                FromSet(c) => {
                    self.emit_char(c);
                    true
                },
                NotFromSet(b) => {
                    self.emit_chars(b);
                    true
                },
            },

            //§ rcdata-state rawtext-state script-data-state
            State::RawData(kind) => match unwrap_or_return!(
                self.pop_except(small_char_set!('\r' '\0' '&' '<')),
                false
            ) {
                FromSet('&') if kind == Rcdata => self.consume_char_ref(false),
                FromSet('<') => go!(self: to RawLessThanSign kind),
                FromSet('\0') => {
                    self.parse_error("Null character in raw data");
                    self.emit_char('\u{fffd}');
                    true
                },
                FromSet(c) => {
                    self.emit_char(c);
                    true
                },
                NotFromSet(b) => {
                    self.emit_chars(b);
                    true
                },
            },

            //§ rcdata-less-than-sign-state
            State::RawLessThanSign(kind) => {
                let c = get_char!(self);
                match c {
                    '/' => {
                        self.temp_buf.clear();
                        go!(self: to RawEndTagOpen kind);
                    },
                    c => {
                        self.emit_char('<');
                        go!(self: reconsume c, RawData kind);
                    },
                }
            },

            //§ rcdata-end-tag-open-state
            State::RawEndTagOpen(kind) => {
                let c = get_char!(self);
                if c.is_ascii_alphabetic() {
                    self.create_tag(EndTag, c.to_ascii_lowercase());
                    self.temp_buf.push_char(c);
                    go!(self: to RawEndTagName kind);
                } else {
                    self.emit_str("</");
                    go!(self: reconsume c, RawData kind);
                }
            },

            //§ rcdata-end-tag-name-state
            State::RawEndTagName(kind) => {
                let c = get_char!(self);
                if self.have_appropriate_end_tag() {
                    match c {
                        c if Self::is_whitespace(c) => go!(self: to BeforeAttributeName),
                        '/' => go!(self: to SelfClosingStartTag),
                        '>' => {
                            self.emit_current_tag();
                            return true;
                        },
                        _ => {},
                    }
                }
                if c.is_ascii_alphabetic() {
                    self.current_tag_name.push_char(c.to_ascii_lowercase());
                    self.temp_buf.push_char(c);
                    true
                } else {
                    self.emit_str("</");
                    let buf = std::mem::take(&mut self.temp_buf);
                    self.emit_chars(buf);
                    go!(self: reconsume c, RawData kind);
                }
            },

            //§ tag-open-state
            State::TagOpen => {
                let c = get_char!(self);
                match c {
                    '!' => go!(self: to MarkupDeclarationOpen),
                    '/' => go!(self: to EndTagOpen),
                    '?' => {
                        self.parse_error("Question mark instead of tag name");
                        self.current_comment.clear();
                        go!(self: reconsume c, BogusComment);
                    },
                    c if c.is_ascii_alphabetic() => {
                        self.create_tag(StartTag, c.to_ascii_lowercase());
                        go!(self: to TagName);
                    },
                    c => {
                        self.parse_error("Expected tag name");
                        self.emit_char('<');
                        go!(self: reconsume c, Data);
                    },
                }
            },

            //§ end-tag-open-state
            State::EndTagOpen => {
                let c = get_char!(self);
                match c {
                    '>' => {
                        self.parse_error("Empty end tag");
                        go!(self: to Data);
                    },
                    c if c.is_ascii_alphabetic() => {
                        self.create_tag(EndTag, c.to_ascii_lowercase());
                        go!(self: to TagName);
                    },
                    c => {
                        self.parse_error("Invalid end tag");
                        self.current_comment.clear();
                        go!(self: reconsume c, BogusComment);
                    },
                }
            },

            //§ tag-name-state
            State::TagName => {
                let c = get_char!(self);
                match c {
                    c if Self::is_whitespace(c) => go!(self: to BeforeAttributeName),
                    '/' => go!(self: to SelfClosingStartTag),
                    '>' => {
                        self.emit_current_tag();
                        true
                    },
                    '\0' => {
                        self.parse_error("Null character in tag name");
                        self.current_tag_name.push_char('\u{fffd}');
                        true
                    },
                    c => {
                        self.current_tag_name.push_char(c.to_ascii_lowercase());
                        true
                    },
                }
            },

            //§ before-attribute-name-state
            State::BeforeAttributeName => {
                let c = get_char!(self);
                match c {
                    c if Self::is_whitespace(c) => true,
                    '/' => go!(self: to SelfClosingStartTag),
                    '>' => {
                        self.emit_current_tag();
                        true
                    },
                    '\0' => {
                        self.parse_error("Null character in attribute name");
                        self.create_attribute('\u{fffd}');
                        go!(self: to AttributeName);
                    },
                    c => {
                        if matches!(c, '"' | '\'' | '<' | '=') {
                            self.parse_error("Bad character at start of attribute name");
                        }
                        self.create_attribute(c.to_ascii_lowercase());
                        go!(self: to AttributeName);
                    },
                }
            },

            //§ attribute-name-state
            State::AttributeName => {
                let c = get_char!(self);
                match c {
                    c if Self::is_whitespace(c) => go!(self: to AfterAttributeName),
                    '/' => go!(self: to SelfClosingStartTag),
                    '=' => go!(self: to BeforeAttributeValue),
                    '>' => {
                        self.emit_current_tag();
                        true
                    },
                    '\0' => {
                        self.parse_error("Null character in attribute name");
                        self.current_attr_name.push_char('\u{fffd}');
                        true
                    },
                    c => {
                        if matches!(c, '"' | '\'' | '<') {
                            self.parse_error("Bad character in attribute name");
                        }
                        self.current_attr_name.push_char(c.to_ascii_lowercase());
                        true
                    },
                }
            },

            //§ after-attribute-name-state
            State::AfterAttributeName => {
                let c = get_char!(self);
                match c {
                    c if Self::is_whitespace(c) => true,
                    '/' => go!(self: to SelfClosingStartTag),
                    '=' => go!(self: to BeforeAttributeValue),
                    '>' => {
                        self.emit_current_tag();
                        true
                    },
                    c => go!(self: reconsume c, BeforeAttributeName),
                }
            },

            //§ before-attribute-value-state
            State::BeforeAttributeValue => {
                let c = get_char!(self);
                match c {
                    c if Self::is_whitespace(c) => true,
                    '"' => go!(self: to AttributeValue DoubleQuoted),
                    '\'' => go!(self: to AttributeValue SingleQuoted),
                    '>' => {
                        self.parse_error("Missing attribute value");
                        self.emit_current_tag();
                        true
                    },
                    c => go!(self: reconsume c, AttributeValue Unquoted),
                }
            },

            //§ attribute-value-double-quoted-state
            State::AttributeValue(DoubleQuoted) => match unwrap_or_return!(
                self.pop_except(small_char_set!('\r' '"' '&' '\0')),
                false
            ) {
                FromSet('"') => {
                    self.finish_attribute();
                    go!(self: to AfterAttributeValueQuoted);
                },
                FromSet('&') => self.consume_char_ref(true),
                FromSet('\0') => {
                    self.parse_error("Null character in attribute value");
                    self.current_attr_value.push_char('\u{fffd}');
                    true
                },
                FromSet(c) => {
                    self.current_attr_value.push_char(c);
                    true
                },
                NotFromSet(b) => {
                    self.current_attr_value.push_tendril(&b);
                    true
                },
            },

            //§ attribute-value-single-quoted-state
            State::AttributeValue(SingleQuoted) => match unwrap_or_return!(
                self.pop_except(small_char_set!('\r' '\'' '&' '\0')),
                false
            ) {
                FromSet('\'') => {
                    self.finish_attribute();
                    go!(self: to AfterAttributeValueQuoted);
                },
                FromSet('&') => self.consume_char_ref(true),
                FromSet('\0') => {
                    self.parse_error("Null character in attribute value");
                    self.current_attr_value.push_char('\u{fffd}');
                    true
                },
                FromSet(c) => {
                    self.current_attr_value.push_char(c);
                    true
                },
                NotFromSet(b) => {
                    self.current_attr_value.push_tendril(&b);
                    true
                },
            },

            //§ attribute-value-unquoted-state
            State::AttributeValue(Unquoted) => match unwrap_or_return!(
                self.pop_except(small_char_set!('\r' '\t' '\n' '\x0C' ' ' '&' '>' '\0')),
                false
            ) {
                FromSet('\t') | FromSet('\n') | FromSet('\x0C') | FromSet(' ') => {
                    self.finish_attribute();
                    go!(self: to BeforeAttributeName);
                },
                FromSet('&') => self.consume_char_ref(true),
                FromSet('>') => {
                    self.emit_current_tag();
                    true
                },
                FromSet('\0') => {
                    self.parse_error("Null character in attribute value");
                    self.current_attr_value.push_char('\u{fffd}');
                    true
                },
                FromSet(c) => {
                    self.current_attr_value.push_char(c);
                    true
                },
                NotFromSet(b) => {
                    self.current_attr_value.push_tendril(&b);
                    true
                },
            },

            //§ after-attribute-value-quoted-state
            State::AfterAttributeValueQuoted => {
                let c = get_char!(self);
                match c {
                    c if Self::is_whitespace(c) => go!(self: to BeforeAttributeName),
                    '/' => go!(self: to SelfClosingStartTag),
                    '>' => {
                        self.emit_current_tag();
                        true
                    },
                    c => {
                        self.parse_error("Missing space after attribute value");
                        go!(self: reconsume c, BeforeAttributeName);
                    },
                }
            },

            //§ self-closing-start-tag-state
            State::SelfClosingStartTag => {
                let c = get_char!(self);
                match c {
                    '>' => {
                        self.current_tag_self_closing = true;
                        self.emit_current_tag();
                        true
                    },
                    c => {
                        self.parse_error("Unexpected character after solidus");
                        go!(self: reconsume c, BeforeAttributeName);
                    },
                }
            },

            //§ bogus-comment-state
            State::BogusComment => {
                let c = get_char!(self);
                match c {
                    '>' => {
                        self.emit_current_comment();
                        go!(self: to Data);
                    },
                    '\0' => {
                        self.current_comment.push_char('\u{fffd}');
                        true
                    },
                    c => {
                        self.current_comment.push_char(c);
                        true
                    },
                }
            },

            //§ markup-declaration-open-state
            State::MarkupDeclarationOpen => {
                match self.input.eat("--", u8::eq) {
                    Some(true) => {
                        self.current_comment.clear();
                        go!(self: to CommentStart);
                    },
                    None if !self.at_eof => return false,
                    _ => {},
                }
                match self.input.eat("doctype", u8::eq_ignore_ascii_case) {
                    Some(true) => go!(self: to Doctype),
                    None if !self.at_eof => false,
                    _ => {
                        self.parse_error("Bad markup declaration");
                        self.current_comment.clear();
                        go!(self: to BogusComment);
                    },
                }
            },

            //§ comment-start-state
            State::CommentStart => {
                let c = get_char!(self);
                match c {
                    '-' => go!(self: to CommentStartDash),
                    '>' => {
                        self.parse_error("Comment ended prematurely");
                        self.emit_current_comment();
                        go!(self: to Data);
                    },
                    '\0' => {
                        self.parse_error("Null character in comment");
                        self.current_comment.push_char('\u{fffd}');
                        go!(self: to Comment);
                    },
                    c => go!(self: reconsume c, Comment),
                }
            },

            //§ comment-start-dash-state
            State::CommentStartDash => {
                let c = get_char!(self);
                match c {
                    '-' => go!(self: to CommentEnd),
                    '>' => {
                        self.parse_error("Comment ended prematurely");
                        self.emit_current_comment();
                        go!(self: to Data);
                    },
                    c => {
                        self.current_comment.push_char('-');
                        go!(self: reconsume c, Comment);
                    },
                }
            },

            //§ comment-state
            State::Comment => match unwrap_or_return!(
                self.pop_except(small_char_set!('\r' '\0' '-')),
                false
            ) {
                FromSet('-') => go!(self: to CommentEndDash),
                FromSet('\0') => {
                    self.parse_error("Null character in comment");
                    self.current_comment.push_char('\u{fffd}');
                    true
                },
                FromSet(c) => {
                    self.current_comment.push_char(c);
                    true
                },
                NotFromSet(b) => {
                    self.current_comment.push_tendril(&b);
                    true
                },
            },

            //§ comment-end-dash-state
            State::CommentEndDash => {
                let c = get_char!(self);
                match c {
                    '-' => go!(self: to CommentEnd),
                    '\0' => {
                        self.parse_error("Null character in comment");
                        self.current_comment.push_slice("-\u{fffd}");
                        go!(self: to Comment);
                    },
                    c => {
                        self.current_comment.push_char('-');
                        go!(self: reconsume c, Comment);
                    },
                }
            },

            //§ comment-end-state
            State::CommentEnd => {
                let c = get_char!(self);
                match c {
                    '>' => {
                        self.emit_current_comment();
                        go!(self: to Data);
                    },
                    '-' => {
                        self.current_comment.push_char('-');
                        true
                    },
                    '\0' => {
                        self.parse_error("Null character in comment");
                        self.current_comment.push_slice("--\u{fffd}");
                        go!(self: to Comment);
                    },
                    c => {
                        self.current_comment.push_slice("--");
                        go!(self: reconsume c, Comment);
                    },
                }
            },

            //§ doctype-state
            State::Doctype => {
                let c = get_char!(self);
                if Self::is_whitespace(c) {
                    go!(self: to BeforeDoctypeName);
                }
                self.parse_error("Missing space before doctype name");
                go!(self: reconsume c, BeforeDoctypeName);
            },

            //§ before-doctype-name-state
            State::BeforeDoctypeName => {
                let c = get_char!(self);
                match c {
                    c if Self::is_whitespace(c) => true,
                    '>' => {
                        self.parse_error("Missing doctype name");
                        self.current_doctype = Doctype::default();
                        self.current_doctype.force_quirks = true;
                        self.emit_current_doctype();
                        go!(self: to Data);
                    },
                    c => {
                        self.current_doctype = Doctype::default();
                        let c = if c == '\0' {
                            self.parse_error("Null character in doctype name");
                            '\u{fffd}'
                        } else {
                            c.to_ascii_lowercase()
                        };
                        let mut name = StrTendril::new();
                        name.push_char(c);
                        self.current_doctype.name = Some(name);
                        go!(self: to DoctypeName);
                    },
                }
            },

            //§ doctype-name-state
            State::DoctypeName => {
                let c = get_char!(self);
                match c {
                    c if Self::is_whitespace(c) => go!(self: to AfterDoctypeName),
                    '>' => {
                        self.emit_current_doctype();
                        go!(self: to Data);
                    },
                    c => {
                        let c = if c == '\0' {
                            self.parse_error("Null character in doctype name");
                            '\u{fffd}'
                        } else {
                            c.to_ascii_lowercase()
                        };
                        self.current_doctype
                            .name
                            .get_or_insert_with(StrTendril::new)
                            .push_char(c);
                        true
                    },
                }
            },

            //§ after-doctype-name-state
            State::AfterDoctypeName => {
                match self.input.eat("public", u8::eq_ignore_ascii_case) {
                    Some(true) => go!(self: to AfterDoctypeKeyword Public),
                    None if !self.at_eof => return false,
                    _ => {},
                }
                match self.input.eat("system", u8::eq_ignore_ascii_case) {
                    Some(true) => go!(self: to AfterDoctypeKeyword System),
                    None if !self.at_eof => return false,
                    _ => {},
                }
                let c = get_char!(self);
                match c {
                    c if Self::is_whitespace(c) => true,
                    '>' => {
                        self.emit_current_doctype();
                        go!(self: to Data);
                    },
                    c => {
                        self.parse_error("Expected PUBLIC or SYSTEM after doctype name");
                        self.current_doctype.force_quirks = true;
                        go!(self: reconsume c, BogusDoctype);
                    },
                }
            },

            //§ after-doctype-public-keyword-state after-doctype-system-keyword-state
            State::AfterDoctypeKeyword(kind) => {
                let c = get_char!(self);
                match c {
                    c if Self::is_whitespace(c) => go!(self: to BeforeDoctypeIdentifier kind),
                    '"' => {
                        self.parse_error("Missing space after doctype keyword");
                        *self.doctype_id(kind) = Some(StrTendril::new());
                        go!(self: to DoctypeIdentifierDoubleQuoted kind);
                    },
                    '\'' => {
                        self.parse_error("Missing space after doctype keyword");
                        *self.doctype_id(kind) = Some(StrTendril::new());
                        go!(self: to DoctypeIdentifierSingleQuoted kind);
                    },
                    '>' => {
                        self.parse_error("Missing doctype identifier");
                        self.current_doctype.force_quirks = true;
                        self.emit_current_doctype();
                        go!(self: to Data);
                    },
                    c => {
                        self.parse_error("Missing quote before doctype identifier");
                        self.current_doctype.force_quirks = true;
                        go!(self: reconsume c, BogusDoctype);
                    },
                }
            },

            //§ before-doctype-public-identifier-state before-doctype-system-identifier-state
            State::BeforeDoctypeIdentifier(kind) => {
                let c = get_char!(self);
                match c {
                    c if Self::is_whitespace(c) => true,
                    '"' => {
                        *self.doctype_id(kind) = Some(StrTendril::new());
                        go!(self: to DoctypeIdentifierDoubleQuoted kind);
                    },
                    '\'' => {
                        *self.doctype_id(kind) = Some(StrTendril::new());
                        go!(self: to DoctypeIdentifierSingleQuoted kind);
                    },
                    '>' => {
                        self.parse_error("Missing doctype identifier");
                        self.current_doctype.force_quirks = true;
                        self.emit_current_doctype();
                        go!(self: to Data);
                    },
                    c => {
                        self.parse_error("Missing quote before doctype identifier");
                        self.current_doctype.force_quirks = true;
                        go!(self: reconsume c, BogusDoctype);
                    },
                }
            },

            //§ doctype-public-identifier-double-quoted-state doctype-system-identifier-double-quoted-state
            State::DoctypeIdentifierDoubleQuoted(kind) => {
                let c = get_char!(self);
                match c {
                    '"' => go!(self: to AfterDoctypeIdentifier kind),
                    '>' => {
                        self.parse_error("Doctype identifier ended prematurely");
                        self.current_doctype.force_quirks = true;
                        self.emit_current_doctype();
                        go!(self: to Data);
                    },
                    '\0' => {
                        self.parse_error("Null character in doctype identifier");
                        self.push_doctype_id(kind, '\u{fffd}');
                        true
                    },
                    c => {
                        self.push_doctype_id(kind, c);
                        true
                    },
                }
            },

            //§ doctype-public-identifier-single-quoted-state doctype-system-identifier-single-quoted-state
            State::DoctypeIdentifierSingleQuoted(kind) => {
                let c = get_char!(self);
                match c {
                    '\'' => go!(self: to AfterDoctypeIdentifier kind),
                    '>' => {
                        self.parse_error("Doctype identifier ended prematurely");
                        self.current_doctype.force_quirks = true;
                        self.emit_current_doctype();
                        go!(self: to Data);
                    },
                    '\0' => {
                        self.parse_error("Null character in doctype identifier");
                        self.push_doctype_id(kind, '\u{fffd}');
                        true
                    },
                    c => {
                        self.push_doctype_id(kind, c);
                        true
                    },
                }
            },

            //§ after-doctype-public-identifier-state after-doctype-system-identifier-state
            State::AfterDoctypeIdentifier(kind) => {
                let c = get_char!(self);
                match (kind, c) {
                    (Public, c) if Self::is_whitespace(c) => {
                        go!(self: to BetweenDoctypePublicAndSystemIdentifiers);
                    },
                    (System, c) if Self::is_whitespace(c) => true,
                    (_, '>') => {
                        self.emit_current_doctype();
                        go!(self: to Data);
                    },
                    (Public, '"') => {
                        self.parse_error("Missing space between doctype identifiers");
                        *self.doctype_id(System) = Some(StrTendril::new());
                        go!(self: to DoctypeIdentifierDoubleQuoted System);
                    },
                    (Public, '\'') => {
                        self.parse_error("Missing space between doctype identifiers");
                        *self.doctype_id(System) = Some(StrTendril::new());
                        go!(self: to DoctypeIdentifierSingleQuoted System);
                    },
                    (_, c) => {
                        self.parse_error("Junk after doctype identifier");
                        self.current_doctype.force_quirks = true;
                        go!(self: reconsume c, BogusDoctype);
                    },
                }
            },

            //§ between-doctype-public-and-system-identifiers-state
            State::BetweenDoctypePublicAndSystemIdentifiers => {
                let c = get_char!(self);
                match c {
                    c if Self::is_whitespace(c) => true,
                    '>' => {
                        self.emit_current_doctype();
                        go!(self: to Data);
                    },
                    '"' => {
                        *self.doctype_id(System) = Some(StrTendril::new());
                        go!(self: to DoctypeIdentifierDoubleQuoted System);
                    },
                    '\'' => {
                        *self.doctype_id(System) = Some(StrTendril::new());
                        go!(self: to DoctypeIdentifierSingleQuoted System);
                    },
                    c => {
                        self.parse_error("Missing quote before doctype identifier");
                        self.current_doctype.force_quirks = true;
                        go!(self: reconsume c, BogusDoctype);
                    },
                }
            },

            //§ bogus-doctype-state
            State::BogusDoctype => {
                let c = get_char!(self);
                match c {
                    '>' => {
                        self.emit_current_doctype();
                        go!(self: to Data);
                    },
                    _ => true,
                }
            },
        }
    }

    /// Flush whatever partial token the machine holds once the input is
    /// exhausted for good.
    fn finish_eof(&mut self) {
        use self::states::State;
        match self.state {
            State::Data | State::Plaintext | State::RawData(_) => {},

            State::TagOpen => {
                self.parse_error("EOF after '<'");
                self.emit_char('<');
            },
            State::EndTagOpen => {
                self.parse_error("EOF after '</'");
                self.emit_str("</");
            },
            State::TagName
            | State::BeforeAttributeName
            | State::AttributeName
            | State::AfterAttributeName
            | State::BeforeAttributeValue
            | State::AttributeValue(_)
            | State::AfterAttributeValueQuoted
            | State::SelfClosingStartTag => {
                self.parse_error("EOF in tag");
            },

            State::RawLessThanSign(_) => self.emit_char('<'),
            State::RawEndTagOpen(_) => self.emit_str("</"),
            State::RawEndTagName(_) => {
                self.emit_str("</");
                let buf = std::mem::take(&mut self.temp_buf);
                self.emit_chars(buf);
            },

            State::MarkupDeclarationOpen => {
                self.parse_error("EOF in markup declaration");
                self.current_comment.clear();
                self.emit_current_comment();
            },
            State::BogusComment => self.emit_current_comment(),
            State::CommentStart | State::Comment => {
                self.parse_error("EOF in comment");
                self.emit_current_comment();
            },
            State::CommentStartDash | State::CommentEndDash => {
                self.parse_error("EOF in comment");
                self.current_comment.push_char('-');
                self.emit_current_comment();
            },
            State::CommentEnd => {
                self.parse_error("EOF in comment");
                self.current_comment.push_slice("--");
                self.emit_current_comment();
            },

            State::Doctype | State::BeforeDoctypeName => {
                self.parse_error("EOF in doctype");
                self.current_doctype = Doctype::default();
                self.current_doctype.force_quirks = true;
                self.emit_current_doctype();
            },
            State::DoctypeName
            | State::AfterDoctypeName
            | State::AfterDoctypeKeyword(_)
            | State::BeforeDoctypeIdentifier(_)
            | State::DoctypeIdentifierDoubleQuoted(_)
            | State::DoctypeIdentifierSingleQuoted(_)
            | State::AfterDoctypeIdentifier(_)
            | State::BetweenDoctypePublicAndSystemIdentifiers => {
                self.parse_error("EOF in doctype");
                self.current_doctype.force_quirks = true;
                self.emit_current_doctype();
            },
            State::BogusDoctype => self.emit_current_doctype(),
        }
        self.state = states::State::Data;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tendril::SliceExt;

    /// Collects tokens, merging adjacent character tokens.
    struct TokenLogger {
        tokens: RefCell<Vec<Token>>,
        current_str: RefCell<StrTendril>,
    }

    impl TokenLogger {
        fn new() -> TokenLogger {
            TokenLogger {
                tokens: RefCell::new(vec![]),
                current_str: RefCell::new(StrTendril::new()),
            }
        }

        fn push(&self, token: Token) {
            self.finish_str();
            self.tokens.borrow_mut().push(token);
        }

        fn finish_str(&self) {
            let s = std::mem::take(&mut *self.current_str.borrow_mut());
            if !s.is_empty() {
                self.tokens.borrow_mut().push(CharacterTokens(s));
            }
        }

        fn get_tokens(self) -> Vec<Token> {
            self.finish_str();
            self.tokens.into_inner()
        }
    }

    impl TokenSink for TokenLogger {
        fn process_token(&self, token: Token) -> TokenSinkResult {
            match token {
                CharacterTokens(b) => {
                    self.current_str.borrow_mut().push_tendril(&b);
                },
                NullCharacterToken => {
                    self.current_str.borrow_mut().push_char('\0');
                },
                ParseError(_) => {},
                EOFToken => {},
                t => self.push(t),
            }
            TokenSinkResult::Continue
        }
    }

    fn tokenize(input: &str) -> Vec<Token> {
        let mut tok = Tokenizer::new(TokenLogger::new(), TokenizerOpts::default());
        tok.feed(input.to_tendril());
        tok.end();
        tok.sink.get_tokens()
    }

    fn chars(s: &str) -> Token {
        CharacterTokens(s.to_tendril())
    }

    fn start_tag(name: &str, attrs: Vec<(&str, &str)>) -> Token {
        TagToken(Tag {
            kind: StartTag,
            name: LocalName::from(name),
            self_closing: false,
            attrs: attrs
                .into_iter()
                .map(|(name, value)| Attribute {
                    name: QualName::new(None, willow_markup::ns!(), LocalName::from(name)),
                    value: value.to_tendril(),
                })
                .collect(),
        })
    }

    fn end_tag(name: &str) -> Token {
        TagToken(Tag {
            kind: EndTag,
            name: LocalName::from(name),
            self_closing: false,
            attrs: vec![],
        })
    }

    #[test]
    fn simple_elements() {
        assert_eq!(
            tokenize("<p>hi</p>"),
            vec![start_tag("p", vec![]), chars("hi"), end_tag("p")]
        );
    }

    #[test]
    fn attributes_in_all_styles() {
        assert_eq!(
            tokenize(r#"<a href="x" Title='y' data-z=w empty>"#),
            vec![start_tag(
                "a",
                vec![("href", "x"), ("title", "y"), ("data-z", "w"), ("empty", "")],
            )]
        );
    }

    #[test]
    fn character_references() {
        assert_eq!(tokenize("a&amp;b&#65;"), vec![chars("a&bA")]);
        assert_eq!(tokenize("&nosuch;"), vec![chars("&nosuch;")]);
    }

    #[test]
    fn comments_and_doctype() {
        assert_eq!(
            tokenize("<!doctype html><!-- hi -->"),
            vec![
                DoctypeToken(Doctype {
                    name: Some("html".to_tendril()),
                    ..Doctype::default()
                }),
                CommentToken(" hi ".to_tendril()),
            ]
        );
    }

    #[test]
    fn cr_normalization() {
        assert_eq!(tokenize("a\r\nb\rc"), vec![chars("a\nb\nc")]);
    }

    #[test]
    fn split_input_across_chunks() {
        let mut tok = Tokenizer::new(TokenLogger::new(), TokenizerOpts::default());
        for chunk in ["<di", "v cl", "ass=\"x", "\">&am", "p;</div>"] {
            tok.feed(chunk.to_tendril());
        }
        tok.end();
        assert_eq!(
            tok.sink.get_tokens(),
            vec![
                start_tag("div", vec![("class", "x")]),
                chars("&"),
                end_tag("div"),
            ]
        );
    }
}
