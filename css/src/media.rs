// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use bitflags::bitflags;

bitflags! {
    /// Media types a rule or sheet applies to, as a bitmask so a single
    /// intersection test decides applicability.
    #[derive(PartialEq, Eq, Copy, Clone, Debug)]
    pub struct MediaFlags: u64 {
        const AURAL      = 1 << 0;
        const BRAILLE    = 1 << 1;
        const EMBOSSED   = 1 << 2;
        const HANDHELD   = 1 << 3;
        const PRINT      = 1 << 4;
        const PROJECTION = 1 << 5;
        const SCREEN     = 1 << 6;
        const SPEECH     = 1 << 7;
        const TTY        = 1 << 8;
        const TV         = 1 << 9;
        const ALL        = (1 << 10) - 1;
    }
}

impl Default for MediaFlags {
    fn default() -> MediaFlags {
        MediaFlags::ALL
    }
}
