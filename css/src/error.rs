// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::error::Error;
use std::fmt;

/// Errors surfaced by the stylesheet model and selection engine.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum CssError {
    /// A parameter was invalid for the requested operation.
    BadParm,
    /// The operation is invalid in the current state.
    Invalid,
    /// The requested object was not found.
    NotFound,
}

impl fmt::Display for CssError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match *self {
            CssError::BadParm => "bad parameter",
            CssError::Invalid => "invalid",
            CssError::NotFound => "not found",
        };
        f.write_str(msg)
    }
}

impl Error for CssError {}
