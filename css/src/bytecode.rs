// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Declaration bytecode.
//!
//! A style is a compact stream of `u32` words.  Each declaration starts
//! with an *opv* word (opcode, flags, value) optionally followed by data
//! words for colours and dimensions.  The encoding is private to this
//! crate; the grammar parser builds it through the typed setters on
//! [`Style`] and the cascade reads it back through [`Style::decls`].

use crate::types::{Color, Display, FontStyle, Length, SizeValue, TextAlign, Unit, Visibility};

/// The properties the engine computes.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum PropertyId {
    Color,
    BackgroundColor,
    Display,
    Visibility,
    FontSize,
    FontWeight,
    FontStyle,
    TextAlign,
    Width,
    Height,
}

pub(crate) const N_PROPERTIES: usize = 10;

pub(crate) const PROPERTIES: [PropertyId; N_PROPERTIES] = [
    PropertyId::Color,
    PropertyId::BackgroundColor,
    PropertyId::Display,
    PropertyId::Visibility,
    PropertyId::FontSize,
    PropertyId::FontWeight,
    PropertyId::FontStyle,
    PropertyId::TextAlign,
    PropertyId::Width,
    PropertyId::Height,
];

impl PropertyId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    fn from_opcode(op: u32) -> PropertyId {
        PROPERTIES[op as usize]
    }

    /// Is this property inherited by default?
    pub(crate) fn inherited(self) -> bool {
        matches!(
            self,
            PropertyId::Color
                | PropertyId::Visibility
                | PropertyId::FontSize
                | PropertyId::FontWeight
                | PropertyId::FontStyle
                | PropertyId::TextAlign
        )
    }
}

const FLAG_IMPORTANT: u32 = 1 << 10;
const FLAG_INHERIT: u32 = 1 << 11;

#[inline]
fn build_opv(op: PropertyId, flags: u32, value: u32) -> u32 {
    (op as u32) | flags | (value << 18)
}

#[inline]
fn opv_opcode(opv: u32) -> u32 {
    opv & 0x3ff
}

#[inline]
fn opv_value(opv: u32) -> u32 {
    opv >> 18
}

/// A decoded declaration.
#[derive(Clone, Debug)]
pub(crate) struct Decl {
    pub prop: PropertyId,
    pub important: bool,
    pub value: DeclValue,
}

#[derive(Clone, Debug)]
pub(crate) enum DeclValue {
    Inherit,
    Color(Color),
    Display(Display),
    Visibility(Visibility),
    FontSize(Length),
    FontWeight(u16),
    FontStyle(FontStyle),
    TextAlign(TextAlign),
    Size(SizeValue),
}

/// An opaque block of declarations, in source order.
#[derive(Clone, Default, Debug)]
pub struct Style {
    bytecode: Vec<u32>,
}

impl Style {
    pub fn new() -> Style {
        Style::default()
    }

    pub fn is_empty(&self) -> bool {
        self.bytecode.is_empty()
    }

    /// Record `property: inherit`.
    pub fn set_inherit(&mut self, prop: PropertyId, important: bool) {
        self.push_opv(prop, important, FLAG_INHERIT, 0);
    }

    pub fn set_color(&mut self, color: Color, important: bool) {
        self.push_opv(PropertyId::Color, important, 0, 0);
        self.bytecode.push(color.0);
    }

    pub fn set_background_color(&mut self, color: Color, important: bool) {
        self.push_opv(PropertyId::BackgroundColor, important, 0, 0);
        self.bytecode.push(color.0);
    }

    pub fn set_display(&mut self, display: Display, important: bool) {
        self.push_opv(PropertyId::Display, important, 0, display as u32);
    }

    pub fn set_visibility(&mut self, visibility: Visibility, important: bool) {
        self.push_opv(PropertyId::Visibility, important, 0, visibility as u32);
    }

    pub fn set_font_size(&mut self, size: Length, important: bool) {
        self.push_opv(PropertyId::FontSize, important, 0, 0);
        self.push_length(size);
    }

    pub fn set_font_weight(&mut self, weight: u16, important: bool) {
        self.push_opv(PropertyId::FontWeight, important, 0, weight as u32);
    }

    pub fn set_font_style(&mut self, style: FontStyle, important: bool) {
        self.push_opv(PropertyId::FontStyle, important, 0, style as u32);
    }

    pub fn set_text_align(&mut self, align: TextAlign, important: bool) {
        self.push_opv(PropertyId::TextAlign, important, 0, align as u32);
    }

    pub fn set_width(&mut self, size: SizeValue, important: bool) {
        self.push_size(PropertyId::Width, size, important);
    }

    pub fn set_height(&mut self, size: SizeValue, important: bool) {
        self.push_size(PropertyId::Height, size, important);
    }

    fn push_opv(&mut self, prop: PropertyId, important: bool, flags: u32, value: u32) {
        let flags = flags | if important { FLAG_IMPORTANT } else { 0 };
        self.bytecode.push(build_opv(prop, flags, value));
    }

    fn push_length(&mut self, length: Length) {
        self.bytecode.push(length.value.raw() as u32);
        self.bytecode.push(length.unit as u32);
    }

    fn push_size(&mut self, prop: PropertyId, size: SizeValue, important: bool) {
        match size {
            SizeValue::Auto => self.push_opv(prop, important, 0, 0),
            SizeValue::Length(length) => {
                self.push_opv(prop, important, 0, 1);
                self.push_length(length);
            },
        }
    }

    /// Decode the bytecode back into declarations, in source order.
    pub(crate) fn decls(&self) -> DeclIter<'_> {
        DeclIter {
            bytecode: &self.bytecode,
            pos: 0,
        }
    }
}

pub(crate) struct DeclIter<'a> {
    bytecode: &'a [u32],
    pos: usize,
}

impl<'a> DeclIter<'a> {
    fn word(&mut self) -> u32 {
        let w = self.bytecode[self.pos];
        self.pos += 1;
        w
    }

    fn length(&mut self) -> Length {
        let value = crate::types::Fixed(self.word() as i32);
        let unit = match self.word() {
            0 => Unit::Px,
            1 => Unit::Em,
            2 => Unit::Ex,
            3 => Unit::Pt,
            _ => Unit::Pct,
        };
        Length { value, unit }
    }
}

impl<'a> Iterator for DeclIter<'a> {
    type Item = Decl;

    fn next(&mut self) -> Option<Decl> {
        if self.pos >= self.bytecode.len() {
            return None;
        }
        let opv = self.word();
        let prop = PropertyId::from_opcode(opv_opcode(opv));
        let important = opv & FLAG_IMPORTANT != 0;

        if opv & FLAG_INHERIT != 0 {
            return Some(Decl {
                prop,
                important,
                value: DeclValue::Inherit,
            });
        }

        let value = match prop {
            PropertyId::Color | PropertyId::BackgroundColor => DeclValue::Color(Color(self.word())),
            PropertyId::Display => DeclValue::Display(match opv_value(opv) {
                0 => Display::Inline,
                1 => Display::Block,
                2 => Display::InlineBlock,
                3 => Display::ListItem,
                _ => Display::None,
            }),
            PropertyId::Visibility => DeclValue::Visibility(match opv_value(opv) {
                0 => Visibility::Visible,
                1 => Visibility::Hidden,
                _ => Visibility::Collapse,
            }),
            PropertyId::FontSize => DeclValue::FontSize(self.length()),
            PropertyId::FontWeight => DeclValue::FontWeight(opv_value(opv) as u16),
            PropertyId::FontStyle => DeclValue::FontStyle(match opv_value(opv) {
                0 => FontStyle::Normal,
                1 => FontStyle::Italic,
                _ => FontStyle::Oblique,
            }),
            PropertyId::TextAlign => DeclValue::TextAlign(match opv_value(opv) {
                0 => TextAlign::Left,
                1 => TextAlign::Right,
                2 => TextAlign::Center,
                _ => TextAlign::Justify,
            }),
            PropertyId::Width | PropertyId::Height => DeclValue::Size(match opv_value(opv) {
                0 => SizeValue::Auto,
                _ => SizeValue::Length(self.length()),
            }),
        };

        Some(Decl {
            prop,
            important,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Fixed;

    #[test]
    fn round_trip_mixed_declarations() {
        let mut style = Style::new();
        style.set_color(Color::rgb(255, 0, 0), true);
        style.set_display(Display::Block, false);
        style.set_font_size(Length::new(Fixed::from_int(12), Unit::Pt), false);
        style.set_width(SizeValue::Auto, false);
        style.set_inherit(PropertyId::Height, false);

        let decls: Vec<Decl> = style.decls().collect();
        assert_eq!(decls.len(), 5);

        assert_eq!(decls[0].prop, PropertyId::Color);
        assert!(decls[0].important);
        assert!(matches!(decls[0].value, DeclValue::Color(c) if c == Color::rgb(255, 0, 0)));

        assert!(matches!(decls[1].value, DeclValue::Display(Display::Block)));
        assert!(!decls[1].important);

        assert!(matches!(
            decls[2].value,
            DeclValue::FontSize(Length { unit: Unit::Pt, .. })
        ));

        assert!(matches!(decls[3].value, DeclValue::Size(SizeValue::Auto)));
        assert!(matches!(decls[4].value, DeclValue::Inherit));
    }
}
