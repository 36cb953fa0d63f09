// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-property behavior, as a dispatch table indexed by `PropertyId`.
//!
//! Each property contributes three operations: `cascade` applies an
//! explicit declared value, `initial` resets the slot, and `compose`
//! copies the parent's computed value in for inheritance.  Presentational
//! hints from the document language enter the cascade through
//! [`PresentationalHint`].

use log::warn;

use crate::bytecode::{DeclValue, PropertyId, N_PROPERTIES};
use crate::computed::ComputedStyle;
use crate::types::{Color, Display, FontStyle, Length, SizeValue, TextAlign, Visibility};

pub(crate) struct PropertyDef {
    pub cascade: fn(&DeclValue, &mut ComputedStyle),
    pub initial: fn(&mut ComputedStyle),
    pub compose: fn(&ComputedStyle, &mut ComputedStyle),
}

fn cascade_color(value: &DeclValue, style: &mut ComputedStyle) {
    if let DeclValue::Color(c) = value {
        style.color = *c;
    }
}

fn initial_color(style: &mut ComputedStyle) {
    style.color = Color::BLACK;
}

fn compose_color(parent: &ComputedStyle, style: &mut ComputedStyle) {
    style.color = parent.color;
}

fn cascade_background_color(value: &DeclValue, style: &mut ComputedStyle) {
    if let DeclValue::Color(c) = value {
        style.background_color = *c;
    }
}

fn initial_background_color(style: &mut ComputedStyle) {
    style.background_color = Color::TRANSPARENT;
}

fn compose_background_color(parent: &ComputedStyle, style: &mut ComputedStyle) {
    style.background_color = parent.background_color;
}

fn cascade_display(value: &DeclValue, style: &mut ComputedStyle) {
    if let DeclValue::Display(d) = value {
        style.display = *d;
    }
}

fn initial_display(style: &mut ComputedStyle) {
    style.display = Display::Inline;
}

fn compose_display(parent: &ComputedStyle, style: &mut ComputedStyle) {
    style.display = parent.display;
}

fn cascade_visibility(value: &DeclValue, style: &mut ComputedStyle) {
    if let DeclValue::Visibility(v) = value {
        style.visibility = *v;
    }
}

fn initial_visibility(style: &mut ComputedStyle) {
    style.visibility = Visibility::Visible;
}

fn compose_visibility(parent: &ComputedStyle, style: &mut ComputedStyle) {
    style.visibility = parent.visibility;
}

fn cascade_font_size(value: &DeclValue, style: &mut ComputedStyle) {
    if let DeclValue::FontSize(l) = value {
        style.font_size = *l;
    }
}

fn initial_font_size(style: &mut ComputedStyle) {
    style.font_size = Length::px(16.0);
}

fn compose_font_size(parent: &ComputedStyle, style: &mut ComputedStyle) {
    style.font_size = parent.font_size;
}

fn cascade_font_weight(value: &DeclValue, style: &mut ComputedStyle) {
    if let DeclValue::FontWeight(w) = value {
        style.font_weight = *w;
    }
}

fn initial_font_weight(style: &mut ComputedStyle) {
    style.font_weight = 400;
}

fn compose_font_weight(parent: &ComputedStyle, style: &mut ComputedStyle) {
    style.font_weight = parent.font_weight;
}

fn cascade_font_style(value: &DeclValue, style: &mut ComputedStyle) {
    if let DeclValue::FontStyle(s) = value {
        style.font_style = *s;
    }
}

fn initial_font_style(style: &mut ComputedStyle) {
    style.font_style = FontStyle::Normal;
}

fn compose_font_style(parent: &ComputedStyle, style: &mut ComputedStyle) {
    style.font_style = parent.font_style;
}

fn cascade_text_align(value: &DeclValue, style: &mut ComputedStyle) {
    if let DeclValue::TextAlign(a) = value {
        style.text_align = *a;
    }
}

fn initial_text_align(style: &mut ComputedStyle) {
    style.text_align = TextAlign::Left;
}

fn compose_text_align(parent: &ComputedStyle, style: &mut ComputedStyle) {
    style.text_align = parent.text_align;
}

fn cascade_width(value: &DeclValue, style: &mut ComputedStyle) {
    if let DeclValue::Size(s) = value {
        style.width = *s;
    }
}

fn initial_width(style: &mut ComputedStyle) {
    style.width = SizeValue::Auto;
}

fn compose_width(parent: &ComputedStyle, style: &mut ComputedStyle) {
    style.width = parent.width;
}

fn cascade_height(value: &DeclValue, style: &mut ComputedStyle) {
    if let DeclValue::Size(s) = value {
        style.height = *s;
    }
}

fn initial_height(style: &mut ComputedStyle) {
    style.height = SizeValue::Auto;
}

fn compose_height(parent: &ComputedStyle, style: &mut ComputedStyle) {
    style.height = parent.height;
}

pub(crate) static DISPATCH: [PropertyDef; N_PROPERTIES] = [
    PropertyDef {
        cascade: cascade_color,
        initial: initial_color,
        compose: compose_color,
    },
    PropertyDef {
        cascade: cascade_background_color,
        initial: initial_background_color,
        compose: compose_background_color,
    },
    PropertyDef {
        cascade: cascade_display,
        initial: initial_display,
        compose: compose_display,
    },
    PropertyDef {
        cascade: cascade_visibility,
        initial: initial_visibility,
        compose: compose_visibility,
    },
    PropertyDef {
        cascade: cascade_font_size,
        initial: initial_font_size,
        compose: compose_font_size,
    },
    PropertyDef {
        cascade: cascade_font_weight,
        initial: initial_font_weight,
        compose: compose_font_weight,
    },
    PropertyDef {
        cascade: cascade_font_style,
        initial: initial_font_style,
        compose: compose_font_style,
    },
    PropertyDef {
        cascade: cascade_text_align,
        initial: initial_text_align,
        compose: compose_text_align,
    },
    PropertyDef {
        cascade: cascade_width,
        initial: initial_width,
        compose: compose_width,
    },
    PropertyDef {
        cascade: cascade_height,
        initial: initial_height,
        compose: compose_height,
    },
];

/// A style hint carried by the document language (e.g. a `bgcolor` or
/// `align` attribute).  Hints cascade as author-origin declarations with
/// zero specificity, so any real author rule overrides them.
#[derive(Clone, Debug)]
pub enum PresentationalHint {
    Color(Color),
    BackgroundColor(Color),
    TextAlign(TextAlign),
    FontSize(Length),
    Width(SizeValue),
    Height(SizeValue),
}

impl PresentationalHint {
    pub(crate) fn property(&self) -> PropertyId {
        match self {
            PresentationalHint::Color(_) => PropertyId::Color,
            PresentationalHint::BackgroundColor(_) => PropertyId::BackgroundColor,
            PresentationalHint::TextAlign(_) => PropertyId::TextAlign,
            PresentationalHint::FontSize(_) => PropertyId::FontSize,
            PresentationalHint::Width(_) => PropertyId::Width,
            PresentationalHint::Height(_) => PropertyId::Height,
        }
    }

    pub(crate) fn set_from_hint(&self, style: &mut ComputedStyle) {
        match *self {
            PresentationalHint::Color(c) => style.color = c,
            PresentationalHint::BackgroundColor(c) => style.background_color = c,
            PresentationalHint::TextAlign(a) => style.text_align = a,
            PresentationalHint::FontSize(l) => style.font_size = l,
            PresentationalHint::Width(s) => style.width = s,
            PresentationalHint::Height(s) => style.height = s,
        }
    }
}

/// Apply one declared value through the dispatch table.
pub(crate) fn cascade(prop: PropertyId, value: &DeclValue, style: &mut ComputedStyle) {
    if matches!(value, DeclValue::Inherit) {
        warn!("inherit reached the property cascade");
        return;
    }
    (DISPATCH[prop.index()].cascade)(value, style);
}
