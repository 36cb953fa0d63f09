// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The fully resolved property table for one element and pseudo-element.
//!
//! Computed styles are plain data, hashable so the selection context can
//! intern them: identical styles share one allocation.

use crate::types::{Color, Display, FontStyle, Length, SizeValue, TextAlign, Visibility};

/// The resolved value of every property the engine computes.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct ComputedStyle {
    pub color: Color,
    pub background_color: Color,
    pub display: Display,
    pub visibility: Visibility,
    pub font_size: Length,
    pub font_weight: u16,
    pub font_style: FontStyle,
    pub text_align: TextAlign,
    pub width: SizeValue,
    pub height: SizeValue,
}

impl ComputedStyle {
    /// Every property at its initial value.
    pub fn initial() -> ComputedStyle {
        ComputedStyle {
            color: Color::BLACK,
            background_color: Color::TRANSPARENT,
            display: Display::Inline,
            visibility: Visibility::Visible,
            font_size: Length::px(16.0),
            font_weight: 400,
            font_style: FontStyle::Normal,
            text_align: TextAlign::Left,
            width: SizeValue::Auto,
            height: SizeValue::Auto,
        }
    }
}

impl Default for ComputedStyle {
    fn default() -> ComputedStyle {
        ComputedStyle::initial()
    }
}
