// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! HTML fragment serialization.

use std::io::{self, Write};

use log::warn;
use willow_markup::serialize::{AttrRef, Serialize, Serializer, TraversalScope};
use willow_markup::{local_name, ns, LocalName, QualName};

//§ serializing-html-fragments
/// Default serialization options.
#[derive(Clone)]
pub struct SerializeOpts {
    /// Is scripting enabled?  Default: true.
    pub scripting_enabled: bool,

    /// Serialize the root node?  Default: `ChildrenOnly`.
    pub traversal_scope: TraversalScope,
}

impl Default for SerializeOpts {
    fn default() -> SerializeOpts {
        SerializeOpts {
            scripting_enabled: true,
            traversal_scope: TraversalScope::ChildrenOnly,
        }
    }
}

/// Serialize an HTML node to a writer.
pub fn serialize<Wr, T>(writer: Wr, node: &T, opts: SerializeOpts) -> io::Result<()>
where
    Wr: Write,
    T: Serialize,
{
    let mut ser = HtmlSerializer::new(writer, opts.clone());
    node.serialize(&mut ser, opts.traversal_scope)
}

struct ElemInfo {
    html_name: Option<LocalName>,
    ignore_children: bool,
}

/// A serializer for the HTML syntax.
pub struct HtmlSerializer<Wr: Write> {
    pub writer: Wr,
    opts: SerializeOpts,
    stack: Vec<ElemInfo>,
}

fn tagname(name: &QualName) -> LocalName {
    if name.ns != ns!(html) && name.ns != ns!(mathml) && name.ns != ns!(svg) {
        warn!("node with weird namespace {:?}", name.ns);
    }

    name.local.clone()
}

impl<Wr: Write> HtmlSerializer<Wr> {
    pub fn new(writer: Wr, opts: SerializeOpts) -> Self {
        let html_name = match opts.traversal_scope {
            TraversalScope::IncludeNode => None,
            TraversalScope::ChildrenOnly => Some(local_name!("html")),
        };
        HtmlSerializer {
            writer,
            opts,
            stack: vec![ElemInfo {
                html_name,
                ignore_children: false,
            }],
        }
    }

    fn parent(&mut self) -> &mut ElemInfo {
        if self.stack.is_empty() {
            warn!("serializer stack is empty, pushing Dummy");
            self.push(None, false);
        }
        self.stack.last_mut().unwrap()
    }

    fn push(&mut self, html_name: Option<LocalName>, ignore_children: bool) {
        self.stack.push(ElemInfo {
            html_name,
            ignore_children,
        });
    }

    fn pop(&mut self) {
        if self.stack.pop().is_none() {
            warn!("serializer stack is empty, popping Dummy");
        }
    }

    fn write_escaped(&mut self, text: &str, attr_mode: bool) -> io::Result<()> {
        for c in text.chars() {
            match c {
                '&' => self.writer.write_all(b"&amp;"),
                '\u{00A0}' => self.writer.write_all(b"&nbsp;"),
                '"' if attr_mode => self.writer.write_all(b"&quot;"),
                '<' if !attr_mode => self.writer.write_all(b"&lt;"),
                '>' if !attr_mode => self.writer.write_all(b"&gt;"),
                c => self.writer.write_fmt(format_args!("{c}")),
            }?;
        }
        Ok(())
    }
}

impl<Wr: Write> Serializer for HtmlSerializer<Wr> {
    fn start_elem<'a, AttrIter>(&mut self, name: QualName, attrs: AttrIter) -> io::Result<()>
    where
        AttrIter: Iterator<Item = AttrRef<'a>>,
    {
        let html_name = if name.ns == ns!(html) {
            Some(name.local.clone())
        } else {
            None
        };

        if self.parent().ignore_children {
            self.push(html_name, true);
            return Ok(());
        }

        self.writer.write_all(b"<")?;
        self.writer.write_all(tagname(&name).as_bytes())?;
        for (name, value) in attrs {
            self.writer.write_all(b" ")?;

            if name.ns == ns!(xml) {
                self.writer.write_all(b"xml:")?;
            } else if name.ns == ns!(xmlns) {
                if name.local != local_name!("xmlns") {
                    self.writer.write_all(b"xmlns:")?;
                }
            } else if name.ns == ns!(xlink) {
                self.writer.write_all(b"xlink:")?;
            } else if name.ns != ns!() {
                warn!("attr with weird namespace {:?}", name.ns);
                self.writer.write_all(b"unknown_namespace:")?;
            }

            self.writer.write_all(name.local.as_bytes())?;
            self.writer.write_all(b"=\"")?;
            self.write_escaped(value, true)?;
            self.writer.write_all(b"\"")?;
        }
        self.writer.write_all(b">")?;

        let ignore_children = name.ns == ns!(html)
            && matches!(
                &*name.local,
                "area"
                    | "base"
                    | "basefont"
                    | "bgsound"
                    | "br"
                    | "col"
                    | "embed"
                    | "frame"
                    | "hr"
                    | "img"
                    | "input"
                    | "keygen"
                    | "link"
                    | "meta"
                    | "param"
                    | "source"
                    | "track"
                    | "wbr"
            );

        self.push(html_name, ignore_children);
        Ok(())
    }

    fn end_elem(&mut self, name: QualName) -> io::Result<()> {
        let info = match self.stack.pop() {
            Some(info) => info,
            _ => panic!("no ElemInfo"),
        };
        if info.ignore_children {
            return Ok(());
        }

        self.writer.write_all(b"</")?;
        self.writer.write_all(tagname(&name).as_bytes())?;
        self.writer.write_all(b">")
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        let escape = match self.parent().html_name.as_deref() {
            Some("style") | Some("script") | Some("xmp") | Some("iframe") | Some("noembed")
            | Some("noframes") | Some("plaintext") => false,

            Some("noscript") => !self.opts.scripting_enabled,

            _ => true,
        };

        if escape {
            self.write_escaped(text, false)
        } else {
            self.writer.write_all(text.as_bytes())
        }
    }

    fn write_comment(&mut self, text: &str) -> io::Result<()> {
        self.writer.write_all(b"<!--")?;
        self.writer.write_all(text.as_bytes())?;
        self.writer.write_all(b"-->")
    }

    fn write_doctype(&mut self, name: &str) -> io::Result<()> {
        self.writer.write_all(b"<!DOCTYPE ")?;
        self.writer.write_all(name.as_bytes())?;
        self.writer.write_all(b">")
    }

    fn write_processing_instruction(&mut self, target: &str, data: &str) -> io::Result<()> {
        self.writer.write_all(b"<?")?;
        self.writer.write_all(target.as_bytes())?;
        self.writer.write_all(b" ")?;
        self.writer.write_all(data.as_bytes())?;
        self.writer.write_all(b">")
    }
}
