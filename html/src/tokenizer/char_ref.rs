// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Character reference resolution.
//!
//! The leading `&` has already been consumed by the caller.  Resolution is
//! resumable: when the queue runs dry mid-reference and more input may
//! still arrive, everything consumed is pushed back and `Stuck` returned.

use tendril::StrTendril;
use willow_markup::BufferQueue;

/// Named character references, with and (for the legacy set) without the
/// trailing semicolon.  The second codepoint is 0 for single-codepoint
/// entities.
static NAMED_ENTITIES: phf::Map<&'static str, (u32, u32)> = phf::phf_map! {
    "AElig;" => (0xC6, 0),
    "AMP" => (0x26, 0),
    "AMP;" => (0x26, 0),
    "Aacute;" => (0xC1, 0),
    "Agrave;" => (0xC0, 0),
    "Alpha;" => (0x391, 0),
    "Auml;" => (0xC4, 0),
    "Beta;" => (0x392, 0),
    "COPY" => (0xA9, 0),
    "COPY;" => (0xA9, 0),
    "Dagger;" => (0x2021, 0),
    "Delta;" => (0x394, 0),
    "Eacute;" => (0xC9, 0),
    "GT" => (0x3E, 0),
    "GT;" => (0x3E, 0),
    "Gamma;" => (0x393, 0),
    "LT" => (0x3C, 0),
    "LT;" => (0x3C, 0),
    "Lambda;" => (0x39B, 0),
    "Omega;" => (0x3A9, 0),
    "Ouml;" => (0xD6, 0),
    "Phi;" => (0x3A6, 0),
    "Pi;" => (0x3A0, 0),
    "Prime;" => (0x2033, 0),
    "Psi;" => (0x3A8, 0),
    "QUOT" => (0x22, 0),
    "QUOT;" => (0x22, 0),
    "REG" => (0xAE, 0),
    "REG;" => (0xAE, 0),
    "Sigma;" => (0x3A3, 0),
    "Theta;" => (0x398, 0),
    "Uacute;" => (0xDA, 0),
    "Uuml;" => (0xDC, 0),
    "Xi;" => (0x39E, 0),
    "aacute;" => (0xE1, 0),
    "acirc;" => (0xE2, 0),
    "acute;" => (0xB4, 0),
    "aelig;" => (0xE6, 0),
    "agrave;" => (0xE0, 0),
    "alpha;" => (0x3B1, 0),
    "amp" => (0x26, 0),
    "amp;" => (0x26, 0),
    "apos;" => (0x27, 0),
    "aring;" => (0xE5, 0),
    "atilde;" => (0xE3, 0),
    "auml;" => (0xE4, 0),
    "bdquo;" => (0x201E, 0),
    "beta;" => (0x3B2, 0),
    "brvbar;" => (0xA6, 0),
    "bull;" => (0x2022, 0),
    "ccedil;" => (0xE7, 0),
    "cedil;" => (0xB8, 0),
    "cent;" => (0xA2, 0),
    "chi;" => (0x3C7, 0),
    "circ;" => (0x2C6, 0),
    "copy" => (0xA9, 0),
    "copy;" => (0xA9, 0),
    "curren;" => (0xA4, 0),
    "dagger;" => (0x2020, 0),
    "darr;" => (0x2193, 0),
    "deg;" => (0xB0, 0),
    "delta;" => (0x3B4, 0),
    "divide;" => (0xF7, 0),
    "eacute;" => (0xE9, 0),
    "ecirc;" => (0xEA, 0),
    "egrave;" => (0xE8, 0),
    "emsp;" => (0x2003, 0),
    "ensp;" => (0x2002, 0),
    "epsilon;" => (0x3B5, 0),
    "equiv;" => (0x2261, 0),
    "eta;" => (0x3B7, 0),
    "eth;" => (0xF0, 0),
    "euml;" => (0xEB, 0),
    "euro;" => (0x20AC, 0),
    "frac12;" => (0xBD, 0),
    "frac14;" => (0xBC, 0),
    "frac34;" => (0xBE, 0),
    "gamma;" => (0x3B3, 0),
    "ge;" => (0x2265, 0),
    "gt" => (0x3E, 0),
    "gt;" => (0x3E, 0),
    "harr;" => (0x2194, 0),
    "hearts;" => (0x2665, 0),
    "hellip;" => (0x2026, 0),
    "iacute;" => (0xED, 0),
    "icirc;" => (0xEE, 0),
    "iexcl;" => (0xA1, 0),
    "igrave;" => (0xEC, 0),
    "infin;" => (0x221E, 0),
    "iota;" => (0x3B9, 0),
    "iquest;" => (0xBF, 0),
    "iuml;" => (0xEF, 0),
    "kappa;" => (0x3BA, 0),
    "lambda;" => (0x3BB, 0),
    "laquo;" => (0xAB, 0),
    "larr;" => (0x2190, 0),
    "ldquo;" => (0x201C, 0),
    "le;" => (0x2264, 0),
    "lsaquo;" => (0x2039, 0),
    "lsquo;" => (0x2018, 0),
    "lt" => (0x3C, 0),
    "lt;" => (0x3C, 0),
    "mdash;" => (0x2014, 0),
    "micro;" => (0xB5, 0),
    "middot;" => (0xB7, 0),
    "minus;" => (0x2212, 0),
    "mu;" => (0x3BC, 0),
    "nbsp" => (0xA0, 0),
    "nbsp;" => (0xA0, 0),
    "ndash;" => (0x2013, 0),
    "ne;" => (0x2260, 0),
    "not;" => (0xAC, 0),
    "ntilde;" => (0xF1, 0),
    "nu;" => (0x3BD, 0),
    "oacute;" => (0xF3, 0),
    "ocirc;" => (0xF4, 0),
    "oelig;" => (0x153, 0),
    "ograve;" => (0xF2, 0),
    "omega;" => (0x3C9, 0),
    "ordf;" => (0xAA, 0),
    "ordm;" => (0xBA, 0),
    "oslash;" => (0xF8, 0),
    "otilde;" => (0xF5, 0),
    "ouml;" => (0xF6, 0),
    "para;" => (0xB6, 0),
    "permil;" => (0x2030, 0),
    "phi;" => (0x3C6, 0),
    "pi;" => (0x3C0, 0),
    "plusmn;" => (0xB1, 0),
    "pound;" => (0xA3, 0),
    "prime;" => (0x2032, 0),
    "psi;" => (0x3C8, 0),
    "quot" => (0x22, 0),
    "quot;" => (0x22, 0),
    "raquo;" => (0xBB, 0),
    "rarr;" => (0x2192, 0),
    "rdquo;" => (0x201D, 0),
    "reg" => (0xAE, 0),
    "reg;" => (0xAE, 0),
    "rho;" => (0x3C1, 0),
    "rsaquo;" => (0x203A, 0),
    "rsquo;" => (0x2019, 0),
    "sbquo;" => (0x201A, 0),
    "sect;" => (0xA7, 0),
    "shy;" => (0xAD, 0),
    "sigma;" => (0x3C3, 0),
    "spades;" => (0x2660, 0),
    "sup1;" => (0xB9, 0),
    "sup2;" => (0xB2, 0),
    "sup3;" => (0xB3, 0),
    "szlig;" => (0xDF, 0),
    "tau;" => (0x3C4, 0),
    "theta;" => (0x3B8, 0),
    "thinsp;" => (0x2009, 0),
    "thorn;" => (0xFE, 0),
    "tilde;" => (0x2DC, 0),
    "times;" => (0xD7, 0),
    "trade;" => (0x2122, 0),
    "uacute;" => (0xFA, 0),
    "uarr;" => (0x2191, 0),
    "ucirc;" => (0xFB, 0),
    "ugrave;" => (0xF9, 0),
    "uml;" => (0xA8, 0),
    "upsilon;" => (0x3C5, 0),
    "uuml;" => (0xFC, 0),
    "xi;" => (0x3BE, 0),
    "yacute;" => (0xFD, 0),
    "yen;" => (0xA5, 0),
    "yuml;" => (0xFF, 0),
    "zeta;" => (0x3B6, 0),
    "zwj;" => (0x200D, 0),
    "zwnj;" => (0x200C, 0),
};

/// Numeric references in the C1 controls range get remapped, for
/// compatibility with windows-1252.
static C1_REPLACEMENTS: [Option<char>; 32] = [
    Some('\u{20ac}'), None,             Some('\u{201a}'), Some('\u{0192}'),
    Some('\u{201e}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
    Some('\u{02c6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
    Some('\u{0152}'), None,             Some('\u{017d}'), None,
    None,             Some('\u{2018}'), Some('\u{2019}'), Some('\u{201c}'),
    Some('\u{201d}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
    Some('\u{02dc}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203a}'),
    Some('\u{0153}'), None,             Some('\u{017e}'), Some('\u{0178}'),
];

pub(crate) enum CharRefResult {
    /// The resolved character data, and whether the input was malformed.
    Done {
        chars: StrTendril,
        error: Option<&'static str>,
    },
    /// Out of input mid-reference; the consumed characters were pushed
    /// back.  Try again once more input has arrived.
    Stuck,
}

const MAX_NAME_LEN: usize = 32;

/// Resolve a character reference whose `&` was already consumed.
pub(crate) fn consume_char_ref(
    input: &mut BufferQueue,
    at_eof: bool,
    in_attr: bool,
) -> CharRefResult {
    let mut taken = String::new();

    macro_rules! stuck_or_literal (() => ({
        return if at_eof {
            literal(&taken)
        } else {
            push_back(input, &taken);
            CharRefResult::Stuck
        };
    }));

    macro_rules! next (() => (
        match input.next() {
            Some(c) => { taken.push(c); c },
            None => stuck_or_literal!(),
        }
    ));

    let first = next!();
    match first {
        '#' => {
            let mut hex = false;
            let mut seen_digit = false;
            let mut value: u32 = 0;
            loop {
                let c = next!();
                match c {
                    'x' | 'X' if !hex && !seen_digit => hex = true,
                    ';' => break,
                    _ => {
                        let digit = if hex { c.to_digit(16) } else { c.to_digit(10) };
                        match digit {
                            Some(d) => {
                                seen_digit = true;
                                value = value.saturating_mul(if hex { 16 } else { 10 });
                                value = value.saturating_add(d);
                            },
                            None => {
                                // The non-digit belongs to whatever follows.
                                input.push_front(pop_last(&mut taken));
                                break;
                            },
                        }
                    },
                }
            }
            if !seen_digit {
                push_back(input, &taken);
                let mut chars = StrTendril::new();
                chars.push_char('&');
                return CharRefResult::Done {
                    chars,
                    error: Some("Numeric character reference without digits"),
                };
            }
            let (c, error) = decode_numeric(value);
            let mut chars = StrTendril::new();
            chars.push_char(c);
            CharRefResult::Done { chars, error }
        },

        c if c.is_ascii_alphanumeric() => {
            let mut name = String::new();
            name.push(c);
            let mut semicolon = false;
            loop {
                if name.len() > MAX_NAME_LEN {
                    return literal(&taken);
                }
                let c = next!();
                if c.is_ascii_alphanumeric() {
                    name.push(c);
                } else {
                    if c == ';' {
                        semicolon = true;
                    } else {
                        input.push_front(pop_last(&mut taken));
                    }
                    break;
                }
            }

            if semicolon {
                name.push(';');
                if let Some(&codepoints) = NAMED_ENTITIES.get(&name[..]) {
                    return CharRefResult::Done {
                        chars: encode(codepoints),
                        error: None,
                    };
                }
                return literal(&taken);
            }

            // Semicolon-less legacy entities, not applied in attributes
            // when the next character could extend the name.
            if in_attr {
                if let Some(c) = input.peek() {
                    if c == '=' || c.is_ascii_alphanumeric() {
                        return literal(&taken);
                    }
                } else if !at_eof {
                    push_back(input, &taken);
                    return CharRefResult::Stuck;
                }
            }
            match NAMED_ENTITIES.get(&name[..]) {
                Some(&codepoints) => CharRefResult::Done {
                    chars: encode(codepoints),
                    error: Some("Character reference without semicolon"),
                },
                None => literal(&taken),
            }
        },

        _ => {
            input.push_front(pop_last(&mut taken));
            literal(&taken)
        },
    }
}

fn decode_numeric(value: u32) -> (char, Option<&'static str>) {
    match value {
        0x00 | 0xD800..=0xDFFF | 0x11_0000.. => {
            ('\u{fffd}', Some("Invalid numeric character reference"))
        },
        0x80..=0x9F => match C1_REPLACEMENTS[(value - 0x80) as usize] {
            Some(c) => (c, Some("Numeric reference to windows-1252 control")),
            None => (
                char::from_u32(value).unwrap(),
                Some("Numeric reference to a control character"),
            ),
        },
        _ => match char::from_u32(value) {
            Some(c) => (c, None),
            None => ('\u{fffd}', Some("Invalid numeric character reference")),
        },
    }
}

fn encode((a, b): (u32, u32)) -> StrTendril {
    let mut out = StrTendril::new();
    out.push_char(char::from_u32(a).expect("bad entity table entry"));
    if b != 0 {
        out.push_char(char::from_u32(b).expect("bad entity table entry"));
    }
    out
}

/// No reference matched: yield `&` followed by whatever was consumed.
fn literal(taken: &str) -> CharRefResult {
    let mut chars = StrTendril::new();
    chars.push_char('&');
    chars.push_slice(taken);
    CharRefResult::Done { chars, error: None }
}

/// Return consumed characters to the front of the queue.
fn push_back(input: &mut BufferQueue, taken: &str) {
    if !taken.is_empty() {
        input.push_front(StrTendril::from_slice(taken));
    }
}

fn pop_last(taken: &mut String) -> StrTendril {
    let c = taken.pop().expect("nothing consumed");
    let mut t = StrTendril::new();
    t.push_char(c);
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use tendril::SliceExt;

    fn run(input: &str, at_eof: bool, in_attr: bool) -> Option<(String, String)> {
        let mut queue = BufferQueue::new();
        queue.push_back(input.to_tendril());
        match consume_char_ref(&mut queue, at_eof, in_attr) {
            CharRefResult::Done { chars, .. } => {
                let mut rest = String::new();
                while let Some(c) = queue.next() {
                    rest.push(c);
                }
                Some((chars.to_string(), rest))
            },
            CharRefResult::Stuck => None,
        }
    }

    #[test]
    fn named() {
        assert_eq!(run("amp;x", true, false), Some(("&".to_string(), "x".to_string())));
        assert_eq!(run("lt;", true, false), Some(("<".to_string(), String::new())));
        assert_eq!(run("nosuch;", true, false), Some(("&nosuch;".to_string(), String::new())));
    }

    #[test]
    fn legacy_without_semicolon() {
        assert_eq!(run("amp rest", true, false), Some(("&".to_string(), " rest".to_string())));
        // In attributes a trailing alphanumeric suppresses the legacy form.
        assert_eq!(run("ampx", true, true), Some(("&ampx".to_string(), String::new())));
    }

    #[test]
    fn numeric() {
        assert_eq!(run("#65;", true, false), Some(("A".to_string(), String::new())));
        assert_eq!(run("#x41;", true, false), Some(("A".to_string(), String::new())));
        assert_eq!(run("#0;", true, false), Some(("\u{fffd}".to_string(), String::new())));
        assert_eq!(run("#65 z", true, false), Some(("A".to_string(), " z".to_string())));
    }

    #[test]
    fn stuck_until_more_input() {
        assert_eq!(run("am", false, false), None);
        assert_eq!(run("am", true, false), Some(("&am".to_string(), String::new())));
    }
}
