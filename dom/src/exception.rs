// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The DOM exception codes.  Domain errors are detected before any tree
//! mutation takes place, so a returned exception implies the tree is
//! unchanged.

use std::error::Error;
use std::fmt;

/// Exception codes raised by DOM operations.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum DomException {
    /// An index is outside the bounds of a string or child list.
    IndexSize,
    /// A node was inserted somewhere it doesn't belong.
    HierarchyRequest,
    /// A node is used in a different document than the one that created it.
    WrongDocument,
    /// An invalid character appears in a name.
    InvalidCharacter,
    /// An attempt was made to modify a read-only node.
    NoModificationAllowed,
    /// A reference was made to a node that does not exist.
    NotFound,
    /// The implementation does not support the requested operation.
    NotSupported,
    /// An attribute is already in use by another element.
    InUseAttribute,
    /// An attempt was made to use an object that is not, or is no longer,
    /// usable.
    InvalidState,
    /// An invalid or illegal string was specified.
    Syntax,
    /// An attempt was made to modify the underlying type of an object.
    InvalidModification,
    /// An attempt was made to create or change a node in a way incompatible
    /// with namespaces.
    Namespace,
    /// The type of an object is incompatible with the expected type.
    TypeMismatch,
}

impl fmt::Display for DomException {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match *self {
            DomException::IndexSize => "index size",
            DomException::HierarchyRequest => "hierarchy request",
            DomException::WrongDocument => "wrong document",
            DomException::InvalidCharacter => "invalid character",
            DomException::NoModificationAllowed => "no modification allowed",
            DomException::NotFound => "not found",
            DomException::NotSupported => "not supported",
            DomException::InUseAttribute => "attribute in use",
            DomException::InvalidState => "invalid state",
            DomException::Syntax => "syntax",
            DomException::InvalidModification => "invalid modification",
            DomException::Namespace => "namespace",
            DomException::TypeMismatch => "type mismatch",
        };
        f.write_str(msg)
    }
}

impl Error for DomException {}
