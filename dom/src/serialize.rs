// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::VecDeque;
use std::io;

use tendril::StrTendril;
use willow_markup::serialize::TraversalScope::{ChildrenOnly, IncludeNode};
use willow_markup::serialize::{Serialize, Serializer, TraversalScope};
use willow_markup::QualName;

use crate::element::attr_value;
use crate::node::{Handle, NodeData};

enum SerializeOp {
    Open(Handle),
    Close(QualName),
}

/// A node handle wrapped for serialization.
pub struct SerializableHandle(Handle);

impl From<Handle> for SerializableHandle {
    fn from(h: Handle) -> SerializableHandle {
        SerializableHandle(h)
    }
}

impl Serialize for SerializableHandle {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        let mut ops = VecDeque::new();
        match traversal_scope {
            IncludeNode => ops.push_back(SerializeOp::Open(self.0.clone())),
            ChildrenOnly => ops.extend(
                self.0
                    .children
                    .borrow()
                    .iter()
                    .map(|h| SerializeOp::Open(h.clone())),
            ),
        }

        while let Some(op) = ops.pop_front() {
            match op {
                SerializeOp::Open(handle) => match handle.data {
                    NodeData::Element {
                        ref name,
                        ref attrs,
                    } => {
                        let attr_list: Vec<(QualName, StrTendril)> = attrs
                            .snapshot()
                            .iter()
                            .map(|attr| match attr.data {
                                NodeData::Attr { ref name, .. } => {
                                    (name.clone(), attr_value(attr))
                                },
                                _ => panic!("non-attribute in attribute map"),
                            })
                            .collect();
                        serializer.start_elem(
                            name.clone(),
                            attr_list.iter().map(|(name, value)| (name, &value[..])),
                        )?;

                        ops.reserve(1 + handle.children.borrow().len());
                        ops.push_front(SerializeOp::Close(name.clone()));

                        for child in handle.children.borrow().iter().rev() {
                            ops.push_front(SerializeOp::Open(child.clone()));
                        }
                    },

                    NodeData::Doctype { ref name, .. } => serializer.write_doctype(name)?,

                    NodeData::Text { ref contents } | NodeData::CData { ref contents } => {
                        serializer.write_text(&contents.borrow())?
                    },

                    NodeData::Comment { ref contents } => {
                        serializer.write_comment(&contents.borrow())?
                    },

                    NodeData::ProcessingInstruction {
                        ref target,
                        ref contents,
                    } => serializer.write_processing_instruction(target, &contents.borrow())?,

                    NodeData::EntityReference { .. } => {
                        if let Some(text) = handle.text_content() {
                            serializer.write_text(&text)?;
                        }
                    },

                    NodeData::Fragment => {
                        for child in handle.children.borrow().iter().rev() {
                            ops.push_front(SerializeOp::Open(child.clone()));
                        }
                    },

                    NodeData::Document { .. } => panic!("Can't serialize Document node itself"),

                    NodeData::Attr { .. } => panic!("Can't serialize detached attribute"),
                },

                SerializeOp::Close(name) => {
                    serializer.end_elem(name)?;
                },
            }
        }

        Ok(())
    }
}
