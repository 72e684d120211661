// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text encoding and measurement for the standard PDF fonts.
//
// Text is written under WinAnsiEncoding, one byte per glyph. Measurement goes
// through the same encoder, so the width used for the horizontal scale is the
// width of exactly the glyphs that end up on the page. Advance widths are the
// Adobe AFM metrics for printable ASCII, in thousandths of an em.

use inklayer_core::OverlayFont;

/// Measures the rendered width of a string.
///
/// This is the one canvas capability the word-placement math needs.
pub trait TextMeasure: Sync {
    /// Width in points of `text` set at `font_size` points, with 100% horizontal scale.
    fn text_width(&self, text: &str, font_size: f64) -> f64;
}

/// Written in place of characters WinAnsiEncoding cannot represent.
pub const SUBSTITUTE: u8 = b'?';

/// Unicode code points of WinAnsi bytes 0x80..=0x9F; 0 marks an unused slot.
#[rustfmt::skip]
const WIN_ANSI_HIGH: [u16; 32] = [
    0x20AC, 0, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021,
    0x02C6, 0x2030, 0x0160, 0x2039, 0x0152, 0, 0x017D, 0,
    0, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014,
    0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0, 0x017E, 0x0178,
];

/// WinAnsi byte for `ch`. `None` for control characters, which are dropped.
fn win_ansi_byte(ch: char) -> Option<u8> {
    let code = ch as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ if ch.is_control() => None,
        _ => Some(
            WIN_ANSI_HIGH
                .iter()
                .position(|&mapped| mapped != 0 && u32::from(mapped) == code)
                .map_or(SUBSTITUTE, |slot| 0x80 + slot as u8),
        ),
    }
}

/// Encode `text` as WinAnsi bytes, one per glyph.
///
/// Characters outside the encoding become [`SUBSTITUTE`]; control characters
/// are left out.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().filter_map(win_ansi_byte).collect()
}

/// Decode WinAnsi bytes back to text.
pub fn decode_win_ansi(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&byte| match byte {
            0x80..=0x9F => char::from_u32(u32::from(WIN_ANSI_HIGH[usize::from(byte - 0x80)]))
                .filter(|ch| *ch != '\0')
                .unwrap_or(char::REPLACEMENT_CHARACTER),
            _ => char::from(byte),
        })
        .collect()
}

#[rustfmt::skip]
const TIMES_ROMAN_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278, // ' ' .. '/'
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444, // '0' .. '?'
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722, // '@' .. 'O'
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500, // 'P' .. '_'
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500, // '`' .. 'o'
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,      // 'p' .. '~'
];

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

const COURIER_WIDTH: u16 = 600;

/// The unaccented ASCII letter an accented WinAnsi letter is drawn on.
fn base_letter(code: u8) -> Option<u8> {
    let base = match code {
        0xA0 => b' ',
        0x8A => b'S',
        0x9A => b's',
        0x8E => b'Z',
        0x9E => b'z',
        0x9F | 0xDD => b'Y',
        0xC0..=0xC5 => b'A',
        0xC7 => b'C',
        0xC8..=0xCB => b'E',
        0xCC..=0xCF => b'I',
        0xD1 => b'N',
        0xD2..=0xD6 | 0xD8 => b'O',
        0xD9..=0xDC => b'U',
        0xE0..=0xE5 => b'a',
        0xE7 => b'c',
        0xE8..=0xEB => b'e',
        0xEC..=0xEF => b'i',
        0xF1 => b'n',
        0xF2..=0xF6 | 0xF8 => b'o',
        0xF9..=0xFC => b'u',
        0xFD | 0xFF => b'y',
        _ => return None,
    };
    Some(base)
}

/// Advance width of one WinAnsi byte in thousandths of an em.
///
/// Accented letters take their base letter's width; other symbols outside
/// printable ASCII use the font's typical lowercase width.
pub fn code_width(font: OverlayFont, code: u8) -> u16 {
    let table = match font {
        OverlayFont::TimesRoman => &TIMES_ROMAN_WIDTHS,
        OverlayFont::Helvetica => &HELVETICA_WIDTHS,
        OverlayFont::Courier => return COURIER_WIDTH,
    };
    let ascii = match code {
        0x20..=0x7E => code,
        _ => match base_letter(code) {
            Some(base) => base,
            None => b'n',
        },
    };
    table[usize::from(ascii - 0x20)]
}

/// Width in em units of WinAnsi-encoded bytes.
pub fn encoded_width(font: OverlayFont, bytes: &[u8]) -> u32 {
    bytes.iter().map(|&code| u32::from(code_width(font, code))).sum()
}

impl TextMeasure for OverlayFont {
    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        f64::from(encoded_width(*self, &encode_win_ansi(text))) * font_size / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn times_roman_hello() {
        // H 722 + e 444 + l 278 + l 278 + o 500
        let width = OverlayFont::TimesRoman.text_width("Hello", 10.0);
        assert!((width - 22.22).abs() < 1e-9);
    }

    #[test]
    fn courier_is_monospaced() {
        let narrow = OverlayFont::Courier.text_width("iiii", 12.0);
        let wide = OverlayFont::Courier.text_width("MMMM", 12.0);
        assert_eq!(narrow, wide);
        assert!((narrow - 28.8).abs() < 1e-9);
    }

    #[test]
    fn helvetica_differs_from_times() {
        assert_eq!(code_width(OverlayFont::Helvetica, b'a'), 556);
        assert_eq!(code_width(OverlayFont::TimesRoman, b'a'), 444);
        assert_eq!(code_width(OverlayFont::Helvetica, b'@'), 1015);
    }

    #[test]
    fn empty_text_has_zero_width() {
        assert_eq!(OverlayFont::TimesRoman.text_width("", 24.0), 0.0);
        assert_eq!(OverlayFont::TimesRoman.text_width("\u{1}\u{7f}", 24.0), 0.0);
    }

    #[test]
    fn latin_text_encodes_one_byte_per_glyph() {
        assert_eq!(encode_win_ansi("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("€5 – ok"), vec![0x80, b'5', b' ', 0x96, b' ', b'o', b'k']);
        assert_eq!(decode_win_ansi(&encode_win_ansi("café – Œuvre")), "café – Œuvre");
    }

    #[test]
    fn unmappable_characters_are_substituted() {
        assert_eq!(decode_win_ansi(&encode_win_ansi("Łódź")), "?ód?");
        assert_eq!(encode_win_ansi("日本"), vec![SUBSTITUTE, SUBSTITUTE]);
        assert_eq!(encode_win_ansi("a\tb"), b"ab".to_vec());
    }

    #[test]
    fn width_counts_exactly_the_encoded_glyphs() {
        let font = OverlayFont::TimesRoman;
        // é is drawn on e: c 444 + a 444 + f 333 + e 444.
        assert_eq!(encoded_width(font, &encode_win_ansi("café")), 1665);
        assert_eq!(font.text_width("café", 1000.0), 1665.0);
        // Two substitutes, each as wide as '?'.
        assert_eq!(font.text_width("日本", 1000.0), 2.0 * 444.0);
        assert_eq!(
            font.text_width("Łódź", 1000.0),
            f64::from(encoded_width(font, b"?\xF3d?"))
        );
    }

    #[test]
    fn symbols_use_the_typical_width() {
        assert_eq!(code_width(OverlayFont::TimesRoman, 0x80), 500);
        assert_eq!(code_width(OverlayFont::Helvetica, 0xA9), 556);
        assert_eq!(code_width(OverlayFont::Courier, 0xE9), 600);
    }

    #[test]
    fn width_scales_linearly_with_size() {
        let small = OverlayFont::TimesRoman.text_width("Searchable", 10.0);
        let large = OverlayFont::TimesRoman.text_width("Searchable", 20.0);
        assert!((large - 2.0 * small).abs() < 1e-9);
    }
}
