// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// The tree builder rules, as a single, enormous nested match expression.

use std::borrow::Cow::Borrowed;
use std::mem::replace;

use tendril::StrTendril;
use willow_markup::{local_name, ns, ExpandedName, LocalName};

use crate::tokenizer::states::{Rawtext, Rcdata, ScriptData};
use crate::tokenizer::TagKind::{EndTag, StartTag};
use crate::tree_builder::tag_sets::*;
use crate::tree_builder::types::*;
use crate::tree_builder::{Quirks, Tag, TreeBuilder, TreeSink};

fn any_not_whitespace(x: &StrTendril) -> bool {
    x.chars().any(|c| !c.is_ascii_whitespace())
}

#[doc(hidden)]
impl<Handle, Sink> TreeBuilder<Handle, Sink>
where
    Handle: Clone,
    Sink: TreeSink<Handle = Handle>,
{
    pub(crate) fn step(&self, mode: InsertionMode, token: Token) -> ProcessResult {
        self.debug_step(mode, &token);

        match mode {
            //§ the-initial-insertion-mode
            InsertionMode::Initial => match token {
                Token::Characters(SplitStatus::NotSplit, text) => {
                    ProcessResult::SplitWhitespace(text)
                },
                Token::Characters(SplitStatus::Whitespace, _) => ProcessResult::Done,
                Token::Comment(text) => self.append_comment_to_doc(text),
                token => {
                    if !self.opts.iframe_srcdoc {
                        self.unexpected(&token);
                        self.set_quirks_mode(Quirks);
                    }
                    ProcessResult::Reprocess(InsertionMode::BeforeHtml, token)
                },
            },

            //§ the-before-html-insertion-mode
            InsertionMode::BeforeHtml => match token {
                Token::Characters(SplitStatus::NotSplit, text) => {
                    ProcessResult::SplitWhitespace(text)
                },
                Token::Characters(SplitStatus::Whitespace, _) => ProcessResult::Done,
                Token::Comment(text) => self.append_comment_to_doc(text),

                Token::Tag(tag) => match (tag.kind, &*tag.name.clone()) {
                    (StartTag, "html") => {
                        self.create_root(tag.attrs);
                        self.mode.set(InsertionMode::BeforeHead);
                        ProcessResult::Done
                    },
                    (EndTag, "head") | (EndTag, "body") | (EndTag, "html") | (EndTag, "br") => {
                        self.create_root(vec![]);
                        ProcessResult::Reprocess(InsertionMode::BeforeHead, Token::Tag(tag))
                    },
                    (EndTag, _) => self.unexpected(&tag),
                    _ => {
                        self.create_root(vec![]);
                        ProcessResult::Reprocess(InsertionMode::BeforeHead, Token::Tag(tag))
                    },
                },

                token => {
                    self.create_root(vec![]);
                    ProcessResult::Reprocess(InsertionMode::BeforeHead, token)
                },
            },

            //§ the-before-head-insertion-mode
            InsertionMode::BeforeHead => match token {
                Token::Characters(SplitStatus::NotSplit, text) => {
                    ProcessResult::SplitWhitespace(text)
                },
                Token::Characters(SplitStatus::Whitespace, _) => ProcessResult::Done,
                Token::Comment(text) => self.append_comment(text),

                Token::Tag(tag) => match (tag.kind, &*tag.name.clone()) {
                    (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),
                    (StartTag, "head") => {
                        let head = self.insert_element_for(tag);
                        *self.head_elem.borrow_mut() = Some(head);
                        self.mode.set(InsertionMode::InHead);
                        ProcessResult::Done
                    },
                    (EndTag, "head") | (EndTag, "body") | (EndTag, "html") | (EndTag, "br") => {
                        let head = self.insert_phantom(local_name!("head"));
                        *self.head_elem.borrow_mut() = Some(head);
                        ProcessResult::Reprocess(InsertionMode::InHead, Token::Tag(tag))
                    },
                    (EndTag, _) => self.unexpected(&tag),
                    _ => {
                        let head = self.insert_phantom(local_name!("head"));
                        *self.head_elem.borrow_mut() = Some(head);
                        ProcessResult::Reprocess(InsertionMode::InHead, Token::Tag(tag))
                    },
                },

                token => {
                    let head = self.insert_phantom(local_name!("head"));
                    *self.head_elem.borrow_mut() = Some(head);
                    ProcessResult::Reprocess(InsertionMode::InHead, token)
                },
            },

            //§ parsing-main-inhead
            InsertionMode::InHead => match token {
                Token::Characters(SplitStatus::NotSplit, text) => {
                    ProcessResult::SplitWhitespace(text)
                },
                Token::Characters(SplitStatus::Whitespace, text) => self.append_text(text),
                Token::Comment(text) => self.append_comment(text),

                Token::Tag(tag) => match (tag.kind, &*tag.name.clone()) {
                    (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),

                    (StartTag, "base")
                    | (StartTag, "basefont")
                    | (StartTag, "bgsound")
                    | (StartTag, "link")
                    | (StartTag, "meta") => {
                        // FIXME: handle <meta charset=...> and <meta http-equiv="Content-Type">
                        self.insert_and_pop_element_for(tag);
                        ProcessResult::DoneAckSelfClosing
                    },

                    (StartTag, "title") => self.parse_raw_data(tag, Rcdata),

                    (StartTag, "noframes") | (StartTag, "style") => {
                        self.parse_raw_data(tag, Rawtext)
                    },

                    (StartTag, "noscript") => {
                        if self.opts.scripting_enabled {
                            self.parse_raw_data(tag, Rawtext)
                        } else {
                            self.insert_element_for(tag);
                            self.mode.set(InsertionMode::InHeadNoscript);
                            ProcessResult::Done
                        }
                    },

                    (StartTag, "script") => self.parse_raw_data(tag, ScriptData),

                    (EndTag, "head") => {
                        self.pop();
                        self.mode.set(InsertionMode::AfterHead);
                        ProcessResult::Done
                    },

                    (EndTag, "body") | (EndTag, "html") | (EndTag, "br") => {
                        self.pop();
                        ProcessResult::Reprocess(InsertionMode::AfterHead, Token::Tag(tag))
                    },

                    (StartTag, "head") => self.unexpected(&tag),
                    (EndTag, _) => self.unexpected(&tag),

                    _ => {
                        self.pop();
                        ProcessResult::Reprocess(InsertionMode::AfterHead, Token::Tag(tag))
                    },
                },

                token => {
                    self.pop();
                    ProcessResult::Reprocess(InsertionMode::AfterHead, token)
                },
            },

            //§ parsing-main-inheadnoscript
            InsertionMode::InHeadNoscript => match token {
                Token::Characters(SplitStatus::NotSplit, text) => {
                    ProcessResult::SplitWhitespace(text)
                },
                token @ Token::Characters(SplitStatus::Whitespace, _) => {
                    self.step(InsertionMode::InHead, token)
                },
                token @ Token::Comment(_) => self.step(InsertionMode::InHead, token),

                Token::Tag(tag) => match (tag.kind, &*tag.name.clone()) {
                    (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),

                    (EndTag, "noscript") => {
                        self.pop();
                        self.mode.set(InsertionMode::InHead);
                        ProcessResult::Done
                    },

                    (StartTag, "basefont")
                    | (StartTag, "bgsound")
                    | (StartTag, "link")
                    | (StartTag, "meta")
                    | (StartTag, "noframes")
                    | (StartTag, "style") => self.step(InsertionMode::InHead, Token::Tag(tag)),

                    (StartTag, "head") | (StartTag, "noscript") => self.unexpected(&tag),

                    (EndTag, "br") | (StartTag, _) => {
                        self.unexpected(&tag);
                        self.pop();
                        ProcessResult::Reprocess(InsertionMode::InHead, Token::Tag(tag))
                    },

                    (EndTag, _) => self.unexpected(&tag),
                },

                token => {
                    self.unexpected(&token);
                    self.pop();
                    ProcessResult::Reprocess(InsertionMode::InHead, token)
                },
            },

            //§ the-after-head-insertion-mode
            InsertionMode::AfterHead => match token {
                Token::Characters(SplitStatus::NotSplit, text) => {
                    ProcessResult::SplitWhitespace(text)
                },
                Token::Characters(SplitStatus::Whitespace, text) => self.append_text(text),
                Token::Comment(text) => self.append_comment(text),

                Token::Tag(tag) => match (tag.kind, &*tag.name.clone()) {
                    (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),

                    (StartTag, "body") => {
                        self.insert_element_for(tag);
                        self.frameset_ok.set(false);
                        self.mode.set(InsertionMode::InBody);
                        ProcessResult::Done
                    },

                    (StartTag, "frameset") => {
                        self.insert_element_for(tag);
                        self.mode.set(InsertionMode::InFrameset);
                        ProcessResult::Done
                    },

                    (StartTag, "base")
                    | (StartTag, "basefont")
                    | (StartTag, "bgsound")
                    | (StartTag, "link")
                    | (StartTag, "meta")
                    | (StartTag, "noframes")
                    | (StartTag, "script")
                    | (StartTag, "style")
                    | (StartTag, "title") => {
                        self.unexpected(&tag);
                        let head = self.head_elem.borrow().clone().expect("no head element");
                        self.push(&head);
                        let result = self.step(InsertionMode::InHead, Token::Tag(tag));
                        self.remove_from_stack(&head);
                        result
                    },

                    (StartTag, "head") => self.unexpected(&tag),

                    (EndTag, "body") | (EndTag, "html") | (EndTag, "br") => {
                        self.insert_phantom(local_name!("body"));
                        ProcessResult::Reprocess(InsertionMode::InBody, Token::Tag(tag))
                    },

                    (EndTag, _) => self.unexpected(&tag),

                    _ => {
                        self.insert_phantom(local_name!("body"));
                        ProcessResult::Reprocess(InsertionMode::InBody, Token::Tag(tag))
                    },
                },

                token => {
                    self.insert_phantom(local_name!("body"));
                    ProcessResult::Reprocess(InsertionMode::InBody, token)
                },
            },

            //§ parsing-main-inbody
            InsertionMode::InBody => match token {
                Token::NullCharacter => self.unexpected(&token),

                Token::Characters(_, text) => {
                    self.reconstruct_active_formatting_elements();
                    if any_not_whitespace(&text) {
                        self.frameset_ok.set(false);
                    }
                    self.append_text(text)
                },

                Token::Comment(text) => self.append_comment(text),

                Token::Eof => {
                    self.check_body_end();
                    self.stop_parsing()
                },

                Token::Tag(tag) => self.step_in_body_tag(tag),
            },

            //§ parsing-main-incdata
            InsertionMode::Text => match token {
                Token::Characters(_, text) => self.append_text(text),
                token @ Token::Eof => {
                    self.unexpected(&token);
                    self.pop();
                    let mode = self.orig_mode.take().expect("no original mode");
                    ProcessResult::Reprocess(mode, token)
                },
                Token::Tag(tag) => {
                    debug_assert!(tag.kind == EndTag);
                    self.pop();
                    let mode = self.orig_mode.take().expect("no original mode");
                    self.mode.set(mode);
                    ProcessResult::Done
                },
                token => panic!("impossible token in Text mode: {token:?}"),
            },

            //§ parsing-main-intable
            InsertionMode::InTable => match token {
                token @ Token::NullCharacter | token @ Token::Characters(..) => {
                    self.process_chars_in_table(token)
                },

                Token::Comment(text) => self.append_comment(text),

                Token::Tag(tag) => match (tag.kind, &*tag.name.clone()) {
                    (StartTag, "caption") => {
                        self.pop_until_current(table_scope);
                        self.active_formatting
                            .borrow_mut()
                            .push(FormatEntry::Marker);
                        self.insert_element_for(tag);
                        self.mode.set(InsertionMode::InCaption);
                        ProcessResult::Done
                    },

                    (StartTag, "colgroup") => {
                        self.pop_until_current(table_scope);
                        self.insert_element_for(tag);
                        self.mode.set(InsertionMode::InColumnGroup);
                        ProcessResult::Done
                    },

                    (StartTag, "col") => {
                        self.pop_until_current(table_scope);
                        self.insert_phantom(local_name!("colgroup"));
                        ProcessResult::Reprocess(InsertionMode::InColumnGroup, Token::Tag(tag))
                    },

                    (StartTag, "tbody") | (StartTag, "tfoot") | (StartTag, "thead") => {
                        self.pop_until_current(table_scope);
                        self.insert_element_for(tag);
                        self.mode.set(InsertionMode::InTableBody);
                        ProcessResult::Done
                    },

                    (StartTag, "td") | (StartTag, "th") | (StartTag, "tr") => {
                        self.pop_until_current(table_scope);
                        self.insert_phantom(local_name!("tbody"));
                        ProcessResult::Reprocess(InsertionMode::InTableBody, Token::Tag(tag))
                    },

                    (StartTag, "table") => {
                        self.unexpected(&tag);
                        if self.in_scope_named(table_scope, local_name!("table")) {
                            self.pop_until_named(local_name!("table"));
                            let mode = self.reset_insertion_mode();
                            ProcessResult::Reprocess(mode, Token::Tag(tag))
                        } else {
                            ProcessResult::Done
                        }
                    },

                    (EndTag, "table") => {
                        if self.in_scope_named(table_scope, local_name!("table")) {
                            self.pop_until_named(local_name!("table"));
                            let mode = self.reset_insertion_mode();
                            self.mode.set(mode);
                        } else {
                            self.unexpected(&tag);
                        }
                        ProcessResult::Done
                    },

                    (EndTag, "body")
                    | (EndTag, "caption")
                    | (EndTag, "col")
                    | (EndTag, "colgroup")
                    | (EndTag, "html")
                    | (EndTag, "tbody")
                    | (EndTag, "td")
                    | (EndTag, "tfoot")
                    | (EndTag, "th")
                    | (EndTag, "thead")
                    | (EndTag, "tr") => self.unexpected(&tag),

                    (StartTag, "style") | (StartTag, "script") => {
                        self.step(InsertionMode::InHead, Token::Tag(tag))
                    },

                    (StartTag, "input") => {
                        if self.is_type_hidden(&tag) {
                            self.unexpected(&tag);
                            self.insert_and_pop_element_for(tag);
                            ProcessResult::DoneAckSelfClosing
                        } else {
                            self.unexpected(&tag);
                            self.foster_parent_in_body(Token::Tag(tag))
                        }
                    },

                    (StartTag, "form") => {
                        self.unexpected(&tag);
                        if self.form_elem.borrow().is_none() {
                            let form = self.insert_and_pop_element_for(tag);
                            *self.form_elem.borrow_mut() = Some(form);
                        }
                        ProcessResult::Done
                    },

                    _ => {
                        self.unexpected(&tag);
                        self.foster_parent_in_body(Token::Tag(tag))
                    },
                },

                token @ Token::Eof => self.step(InsertionMode::InBody, token),
            },

            //§ parsing-main-intabletext
            InsertionMode::InTableText => match token {
                token @ Token::NullCharacter => self.unexpected(&token),

                Token::Characters(split, text) => {
                    self.pending_table_text.borrow_mut().push((split, text));
                    ProcessResult::Done
                },

                token => {
                    let pending = replace(&mut *self.pending_table_text.borrow_mut(), vec![]);
                    let contains_nonspace = pending.iter().any(|&(split, ref text)| match split {
                        SplitStatus::Whitespace => false,
                        SplitStatus::NotWhitespace => true,
                        SplitStatus::NotSplit => any_not_whitespace(text),
                    });

                    if contains_nonspace {
                        self.sink.parse_error(Borrowed("Non-space table text"));
                        for (split, text) in pending.into_iter() {
                            match self.foster_parent_in_body(Token::Characters(split, text)) {
                                ProcessResult::Done => (),
                                _ => panic!("not prepared to handle this!"),
                            }
                        }
                    } else {
                        for (_, text) in pending.into_iter() {
                            self.append_text(text);
                        }
                    }

                    let mode = self.orig_mode.take().expect("no original mode");
                    ProcessResult::Reprocess(mode, token)
                },
            },

            //§ parsing-main-incaption
            InsertionMode::InCaption => match token {
                Token::Tag(tag) => match (tag.kind, &*tag.name.clone()) {
                    (StartTag, "caption")
                    | (StartTag, "col")
                    | (StartTag, "colgroup")
                    | (StartTag, "tbody")
                    | (StartTag, "td")
                    | (StartTag, "tfoot")
                    | (StartTag, "th")
                    | (StartTag, "thead")
                    | (StartTag, "tr")
                    | (EndTag, "table") => {
                        if self.in_scope_named(table_scope, local_name!("caption")) {
                            self.generate_implied_end_tags(cursory_implied_end);
                            self.expect_to_close(local_name!("caption"));
                            self.clear_active_formatting_to_marker();
                            ProcessResult::Reprocess(InsertionMode::InTable, Token::Tag(tag))
                        } else {
                            self.unexpected(&tag)
                        }
                    },

                    (EndTag, "caption") => {
                        if self.in_scope_named(table_scope, local_name!("caption")) {
                            self.generate_implied_end_tags(cursory_implied_end);
                            self.expect_to_close(local_name!("caption"));
                            self.clear_active_formatting_to_marker();
                            self.mode.set(InsertionMode::InTable);
                        } else {
                            self.unexpected(&tag);
                        }
                        ProcessResult::Done
                    },

                    (EndTag, "body")
                    | (EndTag, "col")
                    | (EndTag, "colgroup")
                    | (EndTag, "html")
                    | (EndTag, "tbody")
                    | (EndTag, "td")
                    | (EndTag, "tfoot")
                    | (EndTag, "th")
                    | (EndTag, "thead")
                    | (EndTag, "tr") => self.unexpected(&tag),

                    _ => self.step(InsertionMode::InBody, Token::Tag(tag)),
                },

                token => self.step(InsertionMode::InBody, token),
            },

            //§ parsing-main-incolgroup
            InsertionMode::InColumnGroup => match token {
                Token::Characters(SplitStatus::NotSplit, text) => {
                    ProcessResult::SplitWhitespace(text)
                },
                Token::Characters(SplitStatus::Whitespace, text) => self.append_text(text),
                Token::Comment(text) => self.append_comment(text),

                Token::Tag(tag) => match (tag.kind, &*tag.name.clone()) {
                    (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),

                    (StartTag, "col") => {
                        self.insert_and_pop_element_for(tag);
                        ProcessResult::DoneAckSelfClosing
                    },

                    (EndTag, "colgroup") => {
                        if self.current_node_named(local_name!("colgroup")) {
                            self.pop();
                            self.mode.set(InsertionMode::InTable);
                        } else {
                            self.unexpected(&tag);
                        }
                        ProcessResult::Done
                    },

                    (EndTag, "col") => self.unexpected(&tag),

                    _ => {
                        if self.current_node_named(local_name!("colgroup")) {
                            self.pop();
                            ProcessResult::Reprocess(InsertionMode::InTable, Token::Tag(tag))
                        } else {
                            self.unexpected(&tag)
                        }
                    },
                },

                token @ Token::Eof => self.step(InsertionMode::InBody, token),

                token => {
                    if self.current_node_named(local_name!("colgroup")) {
                        self.pop();
                        ProcessResult::Reprocess(InsertionMode::InTable, token)
                    } else {
                        self.unexpected(&token)
                    }
                },
            },

            //§ parsing-main-intbody
            InsertionMode::InTableBody => match token {
                Token::Tag(tag) => match (tag.kind, &*tag.name.clone()) {
                    (StartTag, "tr") => {
                        self.pop_until_current(table_body_context);
                        self.insert_element_for(tag);
                        self.mode.set(InsertionMode::InRow);
                        ProcessResult::Done
                    },

                    (StartTag, "th") | (StartTag, "td") => {
                        self.unexpected(&tag);
                        self.pop_until_current(table_body_context);
                        self.insert_phantom(local_name!("tr"));
                        ProcessResult::Reprocess(InsertionMode::InRow, Token::Tag(tag))
                    },

                    (EndTag, "tbody") | (EndTag, "tfoot") | (EndTag, "thead") => {
                        if self.in_scope_named(table_scope, tag.name.clone()) {
                            self.pop_until_current(table_body_context);
                            self.pop();
                            self.mode.set(InsertionMode::InTable);
                        } else {
                            self.unexpected(&tag);
                        }
                        ProcessResult::Done
                    },

                    (StartTag, "caption")
                    | (StartTag, "col")
                    | (StartTag, "colgroup")
                    | (StartTag, "tbody")
                    | (StartTag, "tfoot")
                    | (StartTag, "thead")
                    | (EndTag, "table") => {
                        if self.in_scope(table_scope, |e| self.elem_in(&e, table_body_context)) {
                            self.pop_until_current(table_body_context);
                            self.pop();
                            ProcessResult::Reprocess(InsertionMode::InTable, Token::Tag(tag))
                        } else {
                            self.unexpected(&tag)
                        }
                    },

                    (EndTag, "body")
                    | (EndTag, "caption")
                    | (EndTag, "col")
                    | (EndTag, "colgroup")
                    | (EndTag, "html")
                    | (EndTag, "td")
                    | (EndTag, "th")
                    | (EndTag, "tr") => self.unexpected(&tag),

                    _ => self.step(InsertionMode::InTable, Token::Tag(tag)),
                },

                token => self.step(InsertionMode::InTable, token),
            },

            //§ parsing-main-intr
            InsertionMode::InRow => match token {
                Token::Tag(tag) => match (tag.kind, &*tag.name.clone()) {
                    (StartTag, "th") | (StartTag, "td") => {
                        self.pop_until_current(table_row_context);
                        self.insert_element_for(tag);
                        self.mode.set(InsertionMode::InCell);
                        self.active_formatting
                            .borrow_mut()
                            .push(FormatEntry::Marker);
                        ProcessResult::Done
                    },

                    (EndTag, "tr") => {
                        if self.in_scope_named(table_scope, local_name!("tr")) {
                            self.pop_until_current(table_row_context);
                            let node = self.pop();
                            self.assert_named(&node, local_name!("tr"));
                            self.mode.set(InsertionMode::InTableBody);
                        } else {
                            self.unexpected(&tag);
                        }
                        ProcessResult::Done
                    },

                    (StartTag, "caption")
                    | (StartTag, "col")
                    | (StartTag, "colgroup")
                    | (StartTag, "tbody")
                    | (StartTag, "tfoot")
                    | (StartTag, "thead")
                    | (StartTag, "tr")
                    | (EndTag, "table") => {
                        if self.in_scope_named(table_scope, local_name!("tr")) {
                            self.pop_until_current(table_row_context);
                            let node = self.pop();
                            self.assert_named(&node, local_name!("tr"));
                            ProcessResult::Reprocess(InsertionMode::InTableBody, Token::Tag(tag))
                        } else {
                            self.unexpected(&tag)
                        }
                    },

                    (EndTag, "tbody") | (EndTag, "tfoot") | (EndTag, "thead") => {
                        if self.in_scope_named(table_scope, tag.name.clone()) {
                            if self.in_scope_named(table_scope, local_name!("tr")) {
                                self.pop_until_current(table_row_context);
                                let node = self.pop();
                                self.assert_named(&node, local_name!("tr"));
                                ProcessResult::Reprocess(
                                    InsertionMode::InTableBody,
                                    Token::Tag(tag),
                                )
                            } else {
                                ProcessResult::Done
                            }
                        } else {
                            self.unexpected(&tag)
                        }
                    },

                    (EndTag, "body")
                    | (EndTag, "caption")
                    | (EndTag, "col")
                    | (EndTag, "colgroup")
                    | (EndTag, "html")
                    | (EndTag, "td")
                    | (EndTag, "th") => self.unexpected(&tag),

                    _ => self.step(InsertionMode::InTable, Token::Tag(tag)),
                },

                token => self.step(InsertionMode::InTable, token),
            },

            //§ parsing-main-intd
            InsertionMode::InCell => match token {
                Token::Tag(tag) => match (tag.kind, &*tag.name.clone()) {
                    (EndTag, "td") | (EndTag, "th") => {
                        if self.in_scope_named(table_scope, tag.name.clone()) {
                            self.generate_implied_end_tags(cursory_implied_end);
                            self.expect_to_close(tag.name);
                            self.clear_active_formatting_to_marker();
                            self.mode.set(InsertionMode::InRow);
                        } else {
                            self.unexpected(&tag);
                        }
                        ProcessResult::Done
                    },

                    (StartTag, "caption")
                    | (StartTag, "col")
                    | (StartTag, "colgroup")
                    | (StartTag, "tbody")
                    | (StartTag, "td")
                    | (StartTag, "tfoot")
                    | (StartTag, "th")
                    | (StartTag, "thead")
                    | (StartTag, "tr") => {
                        if self.in_scope(table_scope, |n| self.elem_in(&n, td_th)) {
                            self.close_the_cell();
                            ProcessResult::Reprocess(InsertionMode::InRow, Token::Tag(tag))
                        } else {
                            self.unexpected(&tag)
                        }
                    },

                    (EndTag, "body")
                    | (EndTag, "caption")
                    | (EndTag, "col")
                    | (EndTag, "colgroup")
                    | (EndTag, "html") => self.unexpected(&tag),

                    (EndTag, "table")
                    | (EndTag, "tbody")
                    | (EndTag, "tfoot")
                    | (EndTag, "thead")
                    | (EndTag, "tr") => {
                        if self.in_scope_named(table_scope, tag.name.clone()) {
                            self.close_the_cell();
                            ProcessResult::Reprocess(InsertionMode::InRow, Token::Tag(tag))
                        } else {
                            self.unexpected(&tag)
                        }
                    },

                    _ => self.step(InsertionMode::InBody, Token::Tag(tag)),
                },

                token => self.step(InsertionMode::InBody, token),
            },

            //§ parsing-main-inselect
            InsertionMode::InSelect => match token {
                token @ Token::NullCharacter => self.unexpected(&token),
                Token::Characters(_, text) => self.append_text(text),
                Token::Comment(text) => self.append_comment(text),

                Token::Tag(tag) => match (tag.kind, &*tag.name.clone()) {
                    (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),

                    (StartTag, "option") => {
                        if self.current_node_named(local_name!("option")) {
                            self.pop();
                        }
                        self.insert_element_for(tag);
                        ProcessResult::Done
                    },

                    (StartTag, "optgroup") => {
                        if self.current_node_named(local_name!("option")) {
                            self.pop();
                        }
                        if self.current_node_named(local_name!("optgroup")) {
                            self.pop();
                        }
                        self.insert_element_for(tag);
                        ProcessResult::Done
                    },

                    (EndTag, "optgroup") => {
                        let under_option = {
                            let open_elems = self.open_elems.borrow();
                            open_elems.len() >= 2
                                && self.html_elem_named(
                                    &open_elems[open_elems.len() - 2],
                                    local_name!("optgroup"),
                                )
                        };
                        if under_option && self.current_node_named(local_name!("option")) {
                            self.pop();
                        }
                        if self.current_node_named(local_name!("optgroup")) {
                            self.pop();
                        } else {
                            self.unexpected(&tag);
                        }
                        ProcessResult::Done
                    },

                    (EndTag, "option") => {
                        if self.current_node_named(local_name!("option")) {
                            self.pop();
                        } else {
                            self.unexpected(&tag);
                        }
                        ProcessResult::Done
                    },

                    (StartTag, "select") | (EndTag, "select") => {
                        let in_scope = self.in_scope_named(select_scope, local_name!("select"));
                        if !in_scope || tag.kind == StartTag {
                            self.unexpected(&tag);
                        }
                        if in_scope {
                            self.pop_until_named(local_name!("select"));
                            let mode = self.reset_insertion_mode();
                            self.mode.set(mode);
                        }
                        ProcessResult::Done
                    },

                    (StartTag, "input") | (StartTag, "keygen") | (StartTag, "textarea") => {
                        self.unexpected(&tag);
                        if self.in_scope_named(select_scope, local_name!("select")) {
                            self.pop_until_named(local_name!("select"));
                            let mode = self.reset_insertion_mode();
                            ProcessResult::Reprocess(mode, Token::Tag(tag))
                        } else {
                            ProcessResult::Done
                        }
                    },

                    (StartTag, "script") => self.step(InsertionMode::InHead, Token::Tag(tag)),

                    _ => self.unexpected(&tag),
                },

                token @ Token::Eof => self.step(InsertionMode::InBody, token),
            },

            //§ parsing-main-inselectintable
            InsertionMode::InSelectInTable => match token {
                Token::Tag(tag) => match (tag.kind, &*tag.name.clone()) {
                    (StartTag, "caption")
                    | (StartTag, "table")
                    | (StartTag, "tbody")
                    | (StartTag, "tfoot")
                    | (StartTag, "thead")
                    | (StartTag, "tr")
                    | (StartTag, "td")
                    | (StartTag, "th") => {
                        self.unexpected(&tag);
                        self.pop_until_named(local_name!("select"));
                        let mode = self.reset_insertion_mode();
                        ProcessResult::Reprocess(mode, Token::Tag(tag))
                    },

                    (EndTag, "caption")
                    | (EndTag, "table")
                    | (EndTag, "tbody")
                    | (EndTag, "tfoot")
                    | (EndTag, "thead")
                    | (EndTag, "tr")
                    | (EndTag, "td")
                    | (EndTag, "th") => {
                        self.unexpected(&tag);
                        if self.in_scope_named(table_scope, tag.name.clone()) {
                            self.pop_until_named(local_name!("select"));
                            let mode = self.reset_insertion_mode();
                            ProcessResult::Reprocess(mode, Token::Tag(tag))
                        } else {
                            ProcessResult::Done
                        }
                    },

                    _ => self.step(InsertionMode::InSelect, Token::Tag(tag)),
                },

                token => self.step(InsertionMode::InSelect, token),
            },

            //§ parsing-main-afterbody
            InsertionMode::AfterBody => match token {
                Token::Characters(SplitStatus::NotSplit, text) => {
                    ProcessResult::SplitWhitespace(text)
                },
                token @ Token::Characters(SplitStatus::Whitespace, _) => {
                    self.step(InsertionMode::InBody, token)
                },
                Token::Comment(text) => self.append_comment_to_html(text),

                Token::Tag(tag) => match (tag.kind, &*tag.name.clone()) {
                    (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),
                    (EndTag, "html") => {
                        if self.is_fragment() {
                            self.unexpected(&tag);
                        } else {
                            self.mode.set(InsertionMode::AfterAfterBody);
                        }
                        ProcessResult::Done
                    },
                    _ => {
                        self.unexpected(&tag);
                        ProcessResult::Reprocess(InsertionMode::InBody, Token::Tag(tag))
                    },
                },

                Token::Eof => self.stop_parsing(),

                token => {
                    self.unexpected(&token);
                    ProcessResult::Reprocess(InsertionMode::InBody, token)
                },
            },

            //§ parsing-main-inframeset
            InsertionMode::InFrameset => match token {
                Token::Characters(SplitStatus::NotSplit, text) => {
                    ProcessResult::SplitWhitespace(text)
                },
                Token::Characters(SplitStatus::Whitespace, text) => self.append_text(text),
                Token::Comment(text) => self.append_comment(text),

                Token::Tag(tag) => match (tag.kind, &*tag.name.clone()) {
                    (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),

                    (StartTag, "frameset") => {
                        self.insert_element_for(tag);
                        ProcessResult::Done
                    },

                    (EndTag, "frameset") => {
                        if self.open_elems.borrow().len() == 1 {
                            self.unexpected(&tag);
                        } else {
                            self.pop();
                            if !self.is_fragment()
                                && !self.current_node_named(local_name!("frameset"))
                            {
                                self.mode.set(InsertionMode::AfterFrameset);
                            }
                        }
                        ProcessResult::Done
                    },

                    (StartTag, "frame") => {
                        self.insert_and_pop_element_for(tag);
                        ProcessResult::DoneAckSelfClosing
                    },

                    (StartTag, "noframes") => self.step(InsertionMode::InHead, Token::Tag(tag)),

                    _ => self.unexpected(&tag),
                },

                token @ Token::Eof => {
                    if self.open_elems.borrow().len() != 1 {
                        self.unexpected(&token);
                    }
                    self.stop_parsing()
                },

                token => self.unexpected(&token),
            },

            //§ parsing-main-afterframeset
            InsertionMode::AfterFrameset => match token {
                Token::Characters(SplitStatus::NotSplit, text) => {
                    ProcessResult::SplitWhitespace(text)
                },
                Token::Characters(SplitStatus::Whitespace, text) => self.append_text(text),
                Token::Comment(text) => self.append_comment(text),

                Token::Tag(tag) => match (tag.kind, &*tag.name.clone()) {
                    (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),
                    (EndTag, "html") => {
                        self.mode.set(InsertionMode::AfterAfterFrameset);
                        ProcessResult::Done
                    },
                    (StartTag, "noframes") => self.step(InsertionMode::InHead, Token::Tag(tag)),
                    _ => self.unexpected(&tag),
                },

                Token::Eof => self.stop_parsing(),

                token => self.unexpected(&token),
            },

            //§ the-after-after-body-insertion-mode
            InsertionMode::AfterAfterBody => match token {
                Token::Characters(SplitStatus::NotSplit, text) => {
                    ProcessResult::SplitWhitespace(text)
                },
                token @ Token::Characters(SplitStatus::Whitespace, _) => {
                    self.step(InsertionMode::InBody, token)
                },
                Token::Comment(text) => self.append_comment_to_doc(text),

                Token::Tag(tag) => match (tag.kind, &*tag.name.clone()) {
                    (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),
                    _ => {
                        self.unexpected(&tag);
                        ProcessResult::Reprocess(InsertionMode::InBody, Token::Tag(tag))
                    },
                },

                Token::Eof => self.stop_parsing(),

                token => {
                    self.unexpected(&token);
                    ProcessResult::Reprocess(InsertionMode::InBody, token)
                },
            },

            //§ the-after-after-frameset-insertion-mode
            InsertionMode::AfterAfterFrameset => match token {
                Token::Characters(SplitStatus::NotSplit, text) => {
                    ProcessResult::SplitWhitespace(text)
                },
                token @ Token::Characters(SplitStatus::Whitespace, _) => {
                    self.step(InsertionMode::InBody, token)
                },
                Token::Comment(text) => self.append_comment_to_doc(text),

                Token::Tag(tag) => match (tag.kind, &*tag.name.clone()) {
                    (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),
                    (StartTag, "noframes") => self.step(InsertionMode::InHead, Token::Tag(tag)),
                    _ => self.unexpected(&tag),
                },

                Token::Eof => self.stop_parsing(),

                token => self.unexpected(&token),
            },
        }
    }

    /// Tag handling for the in-body insertion mode.
    fn step_in_body_tag(&self, tag: Tag) -> ProcessResult {
        declare_tag_set!(block_start =
            "address" "article" "aside" "blockquote" "center" "details" "dialog" "dir" "div" "dl"
            "fieldset" "figcaption" "figure" "footer" "header" "hgroup" "main" "menu" "nav" "ol"
            "p" "section" "summary" "ul");
        // `</p>`, unlike `<p>`, has its own rule below.
        declare_tag_set!(block_end_base = [block_start] - "p");
        declare_tag_set!(block_end = [block_end_base] + "button" "listing" "pre");
        declare_tag_set!(formatting_start =
            "b" "big" "code" "em" "font" "i" "s" "small" "strike" "strong" "tt" "u");

        let name = tag.name.clone();
        let named = |set: fn(ExpandedName) -> bool| {
            set(ExpandedName {
                ns: &ns!(html),
                local: &name,
            })
        };

        match (tag.kind, &*tag.name.clone()) {
            (StartTag, "html") => {
                self.unexpected(&tag);
                let top = self.html_elem();
                self.sink.add_attrs_if_missing(&top, tag.attrs);
                ProcessResult::Done
            },

            (StartTag, "base")
            | (StartTag, "basefont")
            | (StartTag, "bgsound")
            | (StartTag, "link")
            | (StartTag, "meta")
            | (StartTag, "noframes")
            | (StartTag, "script")
            | (StartTag, "style")
            | (StartTag, "title") => self.step(InsertionMode::InHead, Token::Tag(tag)),

            (StartTag, "body") => {
                self.unexpected(&tag);
                if let Some(body) = self.body_elem() {
                    self.frameset_ok.set(false);
                    self.sink.add_attrs_if_missing(&body, tag.attrs);
                }
                ProcessResult::Done
            },

            (StartTag, "frameset") => {
                self.unexpected(&tag);
                if self.frameset_ok.get() {
                    if let Some(body) = self.body_elem() {
                        self.sink.remove_from_parent(&body);
                        self.open_elems.borrow_mut().truncate(1);
                        self.insert_element_for(tag);
                        self.mode.set(InsertionMode::InFrameset);
                    }
                }
                ProcessResult::Done
            },

            (EndTag, "body") => {
                if self.in_scope_named(default_scope, local_name!("body")) {
                    self.check_body_end();
                    self.mode.set(InsertionMode::AfterBody);
                } else {
                    self.sink.parse_error(Borrowed("</body> without <body>"));
                }
                ProcessResult::Done
            },

            (EndTag, "html") => {
                if self.in_scope_named(default_scope, local_name!("body")) {
                    self.check_body_end();
                    ProcessResult::Reprocess(InsertionMode::AfterBody, Token::Tag(tag))
                } else {
                    self.sink.parse_error(Borrowed("</html> without <body>"));
                    ProcessResult::Done
                }
            },

            (StartTag, _) if named(block_start) => {
                self.close_p_element_in_button_scope();
                self.insert_element_for(tag);
                ProcessResult::Done
            },

            (StartTag, _) if named(heading_tag) => {
                self.close_p_element_in_button_scope();
                if self.current_node_in(heading_tag) {
                    self.sink.parse_error(Borrowed("nested heading tags"));
                    self.pop();
                }
                self.insert_element_for(tag);
                ProcessResult::Done
            },

            (StartTag, "pre") | (StartTag, "listing") => {
                self.close_p_element_in_button_scope();
                self.insert_element_for(tag);
                self.ignore_lf.set(true);
                self.frameset_ok.set(false);
                ProcessResult::Done
            },

            (StartTag, "form") => {
                if self.form_elem.borrow().is_some() {
                    self.sink.parse_error(Borrowed("nested forms"));
                } else {
                    self.close_p_element_in_button_scope();
                    let elem = self.insert_element_for(tag);
                    *self.form_elem.borrow_mut() = Some(elem);
                }
                ProcessResult::Done
            },

            (StartTag, "li") => {
                self.frameset_ok.set(false);
                self.close_misnested_list_item(&[local_name!("li")]);
                self.close_p_element_in_button_scope();
                self.insert_element_for(tag);
                ProcessResult::Done
            },

            (StartTag, "dd") | (StartTag, "dt") => {
                self.frameset_ok.set(false);
                self.close_misnested_list_item(&[local_name!("dd"), local_name!("dt")]);
                self.close_p_element_in_button_scope();
                self.insert_element_for(tag);
                ProcessResult::Done
            },

            (StartTag, "plaintext") => {
                self.close_p_element_in_button_scope();
                self.insert_element_for(tag);
                ProcessResult::ToPlaintext
            },

            (StartTag, "button") => {
                if self.in_scope_named(default_scope, local_name!("button")) {
                    self.sink.parse_error(Borrowed("nested buttons"));
                    self.generate_implied_end_tags(cursory_implied_end);
                    self.pop_until_named(local_name!("button"));
                }
                self.reconstruct_active_formatting_elements();
                self.insert_element_for(tag);
                self.frameset_ok.set(false);
                ProcessResult::Done
            },

            (EndTag, _) if named(block_end) => {
                if !self.in_scope_named(default_scope, name.clone()) {
                    self.unexpected(&tag);
                } else {
                    self.generate_implied_end_tags(cursory_implied_end);
                    self.expect_to_close(name);
                }
                ProcessResult::Done
            },

            (EndTag, "form") => {
                let node = match self.form_elem.borrow_mut().take() {
                    None => {
                        self.sink
                            .parse_error(Borrowed("Null form element pointer on </form>"));
                        return ProcessResult::Done;
                    },
                    Some(x) => x,
                };
                if !self.in_scope(default_scope, |n| self.sink.same_node(&node, &n)) {
                    self.sink.parse_error(Borrowed("Form element not in scope"));
                    return ProcessResult::Done;
                }
                self.generate_implied_end_tags(cursory_implied_end);
                if !self.sink.same_node(&self.current_node(), &node) {
                    self.sink
                        .parse_error(Borrowed("Bad open element on </form>"));
                }
                self.remove_from_stack(&node);
                ProcessResult::Done
            },

            (EndTag, "p") => {
                if !self.in_scope_named(button_scope, local_name!("p")) {
                    self.sink.parse_error(Borrowed("No <p> tag to close"));
                    self.insert_phantom(local_name!("p"));
                }
                self.close_p_element();
                ProcessResult::Done
            },

            (EndTag, "li") | (EndTag, "dd") | (EndTag, "dt") => {
                let in_scope = if self.html_name_is(&name, "li") {
                    self.in_scope_named(list_item_scope, name.clone())
                } else {
                    self.in_scope_named(default_scope, name.clone())
                };
                if in_scope {
                    self.generate_implied_end_except(name.clone());
                    self.expect_to_close(name);
                } else {
                    self.sink.parse_error(Borrowed("No matching tag to close"));
                }
                ProcessResult::Done
            },

            (EndTag, _) if named(heading_tag) => {
                if self.in_scope(default_scope, |n| self.elem_in(&n, heading_tag)) {
                    self.generate_implied_end_tags(cursory_implied_end);
                    if !self.current_node_named(name) {
                        self.sink
                            .parse_error(Borrowed("Closing wrong heading tag"));
                    }
                    self.pop_until(heading_tag);
                } else {
                    self.sink.parse_error(Borrowed("No heading tag to close"));
                }
                ProcessResult::Done
            },

            (StartTag, "a") => {
                self.handle_misnested_a_tags(&tag);
                self.reconstruct_active_formatting_elements();
                self.create_formatting_element_for(tag);
                ProcessResult::Done
            },

            (StartTag, _) if named(formatting_start) => {
                self.reconstruct_active_formatting_elements();
                self.create_formatting_element_for(tag);
                ProcessResult::Done
            },

            (StartTag, "nobr") => {
                self.reconstruct_active_formatting_elements();
                if self.in_scope_named(default_scope, local_name!("nobr")) {
                    self.sink.parse_error(Borrowed("Nested <nobr>"));
                    self.adoption_agency(local_name!("nobr"));
                    self.reconstruct_active_formatting_elements();
                }
                self.create_formatting_element_for(tag);
                ProcessResult::Done
            },

            (EndTag, "a")
            | (EndTag, "b")
            | (EndTag, "big")
            | (EndTag, "code")
            | (EndTag, "em")
            | (EndTag, "font")
            | (EndTag, "i")
            | (EndTag, "nobr")
            | (EndTag, "s")
            | (EndTag, "small")
            | (EndTag, "strike")
            | (EndTag, "strong")
            | (EndTag, "tt")
            | (EndTag, "u") => {
                self.adoption_agency(name);
                ProcessResult::Done
            },

            (StartTag, "applet") | (StartTag, "marquee") | (StartTag, "object") => {
                self.reconstruct_active_formatting_elements();
                self.insert_element_for(tag);
                self.active_formatting
                    .borrow_mut()
                    .push(FormatEntry::Marker);
                self.frameset_ok.set(false);
                ProcessResult::Done
            },

            (EndTag, "applet") | (EndTag, "marquee") | (EndTag, "object") => {
                if !self.in_scope_named(default_scope, name.clone()) {
                    self.unexpected(&tag);
                } else {
                    self.generate_implied_end_tags(cursory_implied_end);
                    self.expect_to_close(name);
                    self.clear_active_formatting_to_marker();
                }
                ProcessResult::Done
            },

            (StartTag, "table") => {
                if self.quirks_mode.get() != Quirks {
                    self.close_p_element_in_button_scope();
                }
                self.insert_element_for(tag);
                self.frameset_ok.set(false);
                self.mode.set(InsertionMode::InTable);
                ProcessResult::Done
            },

            (EndTag, "br") => {
                self.unexpected(&tag);
                self.step_in_body_tag(Tag {
                    kind: StartTag,
                    name: local_name!("br"),
                    self_closing: false,
                    attrs: vec![],
                })
            },

            (StartTag, "area")
            | (StartTag, "br")
            | (StartTag, "embed")
            | (StartTag, "img")
            | (StartTag, "keygen")
            | (StartTag, "wbr") => {
                self.reconstruct_active_formatting_elements();
                self.insert_and_pop_element_for(tag);
                self.frameset_ok.set(false);
                ProcessResult::DoneAckSelfClosing
            },

            (StartTag, "input") => {
                self.reconstruct_active_formatting_elements();
                let keep_frameset_ok = self.is_type_hidden(&tag);
                self.insert_and_pop_element_for(tag);
                if !keep_frameset_ok {
                    self.frameset_ok.set(false);
                }
                ProcessResult::DoneAckSelfClosing
            },

            (StartTag, "param") | (StartTag, "source") | (StartTag, "track") => {
                self.insert_and_pop_element_for(tag);
                ProcessResult::DoneAckSelfClosing
            },

            (StartTag, "hr") => {
                self.close_p_element_in_button_scope();
                self.insert_and_pop_element_for(tag);
                self.frameset_ok.set(false);
                ProcessResult::DoneAckSelfClosing
            },

            (StartTag, "image") => {
                self.unexpected(&tag);
                self.step_in_body_tag(Tag {
                    name: local_name!("img"),
                    ..tag
                })
            },

            (StartTag, "textarea") => {
                self.ignore_lf.set(true);
                self.frameset_ok.set(false);
                self.parse_raw_data(tag, Rcdata)
            },

            (StartTag, "xmp") => {
                self.close_p_element_in_button_scope();
                self.reconstruct_active_formatting_elements();
                self.frameset_ok.set(false);
                self.parse_raw_data(tag, Rawtext)
            },

            (StartTag, "iframe") => {
                self.frameset_ok.set(false);
                self.parse_raw_data(tag, Rawtext)
            },

            (StartTag, "noembed") => self.parse_raw_data(tag, Rawtext),

            (StartTag, "noscript") if self.opts.scripting_enabled => {
                self.parse_raw_data(tag, Rawtext)
            },

            (StartTag, "select") => {
                self.reconstruct_active_formatting_elements();
                self.insert_element_for(tag);
                self.frameset_ok.set(false);
                let mode = match self.mode.get() {
                    InsertionMode::InTable
                    | InsertionMode::InCaption
                    | InsertionMode::InTableBody
                    | InsertionMode::InRow
                    | InsertionMode::InCell => InsertionMode::InSelectInTable,
                    _ => InsertionMode::InSelect,
                };
                self.mode.set(mode);
                ProcessResult::Done
            },

            (StartTag, "optgroup") | (StartTag, "option") => {
                if self.current_node_named(local_name!("option")) {
                    self.pop();
                }
                self.reconstruct_active_formatting_elements();
                self.insert_element_for(tag);
                ProcessResult::Done
            },

            (StartTag, "rp") | (StartTag, "rt") => {
                if self.in_scope_named(default_scope, local_name!("ruby")) {
                    self.generate_implied_end_tags(cursory_implied_end);
                }
                if !self.current_node_named(local_name!("ruby")) {
                    self.unexpected(&tag);
                }
                self.insert_element_for(tag);
                ProcessResult::Done
            },

            (StartTag, "caption")
            | (StartTag, "col")
            | (StartTag, "colgroup")
            | (StartTag, "frame")
            | (StartTag, "head")
            | (StartTag, "tbody")
            | (StartTag, "td")
            | (StartTag, "tfoot")
            | (StartTag, "th")
            | (StartTag, "thead")
            | (StartTag, "tr") => self.unexpected(&tag),

            (StartTag, _) => {
                self.reconstruct_active_formatting_elements();
                self.insert_element_for(tag);
                ProcessResult::Done
            },

            (EndTag, _) => {
                self.process_end_tag_in_body(tag);
                ProcessResult::Done
            },
        }
    }

    fn html_name_is(&self, name: &LocalName, s: &str) -> bool {
        &**name == s
    }

    /// Close an open `li` / `dd` / `dt` before opening a new one.
    fn close_misnested_list_item(&self, closes: &[LocalName]) {
        declare_tag_set!(stop_set = [special_tag] - "address" "div" "p");

        let mut to_close = None;
        let open_elems = self.open_elems.borrow().clone();
        for node in open_elems.iter().rev() {
            if let Some(name) = closes
                .iter()
                .find(|name| self.html_elem_named(node, (*name).clone()))
            {
                to_close = Some(name.clone());
                break;
            }
            if self.elem_in(node, stop_set) {
                break;
            }
        }

        if let Some(name) = to_close {
            self.generate_implied_end_except(name.clone());
            if !self.current_node_named(name.clone()) {
                self.sink
                    .parse_error(Borrowed("Bad open element while closing list item"));
            }
            self.pop_until_named(name);
        }
    }

    /// The `<a>`-inside-`<a>` cleanup preceding a new formatting anchor.
    fn handle_misnested_a_tags(&self, tag: &Tag) {
        let node = match self.with_active_formatting_to_marker(|mut iter| {
            iter.find(|&(_, _, t)| t.name == local_name!("a"))
                .map(|(_, n, _)| n.clone())
        }) {
            Some(node) => node,
            None => return,
        };

        self.unexpected(tag);
        self.adoption_agency(local_name!("a"));
        if let Some(position) = self.position_in_active_formatting(&node) {
            self.active_formatting.borrow_mut().remove(position);
        }
        self.remove_from_stack(&node);
    }
}
