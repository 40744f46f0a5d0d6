//! Glyph advance widths for the standard Times-Roman font.
//!
//! The PDF writer uses the base-14 Times-Roman font, which viewers supply
//! themselves, so nothing is embedded and line measurement only needs the
//! AFM advance widths (units of 1/1000 em). Characters outside printable
//! ASCII fall back to the width of a digit.

const FALLBACK_WIDTH: u16 = 500;

/// Advance widths for U+0020..=U+007E.
#[rustfmt::skip]
const TIMES_ROMAN_ASCII: [u16; 95] = [
    // space ! " # $ % & ' ( ) * + , - . /
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    // 0-9
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    // : ; < = > ? @
    278, 278, 564, 564, 564, 444, 921,
    // A-Z
    722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889,
    722, 722, 556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611,
    // [ \ ] ^ _ `
    333, 278, 333, 469, 500, 333,
    // a-z
    444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778,
    500, 500, 500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444,
    // { | } ~
    480, 200, 480, 541,
];

fn char_width(c: char) -> u16 {
    match c as u32 {
        cp @ 0x20..=0x7E => TIMES_ROMAN_ASCII[(cp - 0x20) as usize],
        _ => FALLBACK_WIDTH,
    }
}

/// Width of `text` set in Times-Roman at `size` points.
pub fn text_width(text: &str, size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| char_width(c) as u32).sum();
    units as f32 * size / 1000.0
}
