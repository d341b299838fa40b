#![forbid(unsafe_code)]

//! Text effects and foreground style.
//!
//! [`TextEffects`] are SGR attribute flags. Each effect carries an `on`
//! parameter and an `off` parameter; several effects share an `off` code
//! (intense/faint both clear with 22, both underline widths clear with 24,
//! both blink rates clear with 25), which the renderer's SGR transition
//! has to account for when toggling effects individually.

use bitflags::bitflags;

use crate::color::Color;

bitflags! {
    /// SGR text attributes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextEffects: u8 {
        /// Bold / increased intensity (SGR 1).
        const INTENSE = 1 << 0;
        /// Faint / decreased intensity (SGR 2).
        const FAINT = 1 << 1;
        /// Italic (SGR 3).
        const ITALIC = 1 << 2;
        /// Single underline (SGR 4).
        const UNDERLINE = 1 << 3;
        /// Double underline (SGR 21).
        const DOUBLE_UNDERLINE = 1 << 4;
        /// Slow blink (SGR 5).
        const SLOW_BLINK = 1 << 5;
        /// Fast blink (SGR 6).
        const FAST_BLINK = 1 << 6;
        /// Crossed out (SGR 9).
        const CROSSED_OUT = 1 << 7;
    }
}

impl TextEffects {
    /// All effects in bit order, with their SGR on/off parameters.
    pub const CODES: [(TextEffects, u8, u8); 8] = [
        (TextEffects::INTENSE, 1, 22),
        (TextEffects::FAINT, 2, 22),
        (TextEffects::ITALIC, 3, 23),
        (TextEffects::UNDERLINE, 4, 24),
        (TextEffects::DOUBLE_UNDERLINE, 21, 24),
        (TextEffects::SLOW_BLINK, 5, 25),
        (TextEffects::FAST_BLINK, 6, 25),
        (TextEffects::CROSSED_OUT, 9, 29),
    ];

    /// The SGR parameter enabling a single effect flag.
    #[must_use]
    pub fn on_code(flag: TextEffects) -> Option<u8> {
        Self::CODES
            .iter()
            .find(|(f, _, _)| *f == flag)
            .map(|&(_, on, _)| on)
    }

    /// The SGR parameter disabling a single effect flag.
    #[must_use]
    pub fn off_code(flag: TextEffects) -> Option<u8> {
        Self::CODES
            .iter()
            .find(|(f, _, _)| *f == flag)
            .map(|&(_, _, off)| off)
    }
}

/// A foreground style: colour plus text effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    /// Glyph colour.
    pub color: Color,
    /// SGR attributes.
    pub effects: TextEffects,
}

impl Style {
    /// Create a style with the given colour and no effects.
    #[must_use]
    pub const fn new(color: Color) -> Self {
        Self {
            color,
            effects: TextEffects::empty(),
        }
    }

    /// Add effects to this style.
    #[must_use]
    pub const fn with_effects(mut self, effects: TextEffects) -> Self {
        self.effects = effects;
        self
    }
}

/// The foreground content of a cell: a style and a single UTF-16 code unit.
///
/// `code_unit == 0` means no glyph is painted from here; a grapheme
/// attachment on the cell carries the visible content instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Foreground {
    /// Colour and effects of the glyph.
    pub style: Style,
    /// The glyph, or 0 for "painted elsewhere".
    pub code_unit: u16,
}

impl Foreground {
    /// A blank foreground (space glyph) in the given style.
    #[must_use]
    pub const fn blank(style: Style) -> Self {
        Self {
            style,
            code_unit: b' ' as u16,
        }
    }

    /// A foreground with no glyph, used for grapheme-bearing cells.
    #[must_use]
    pub const fn empty(style: Style) -> Self {
        Self {
            style,
            code_unit: 0,
        }
    }

    /// A foreground showing a single ASCII character.
    #[must_use]
    pub const fn ascii(style: Style, byte: u8) -> Self {
        Self {
            style,
            code_unit: byte as u16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_off_codes() {
        assert_eq!(TextEffects::off_code(TextEffects::INTENSE), Some(22));
        assert_eq!(TextEffects::off_code(TextEffects::FAINT), Some(22));
        assert_eq!(TextEffects::off_code(TextEffects::UNDERLINE), Some(24));
        assert_eq!(
            TextEffects::off_code(TextEffects::DOUBLE_UNDERLINE),
            Some(24)
        );
        assert_eq!(TextEffects::off_code(TextEffects::SLOW_BLINK), Some(25));
        assert_eq!(TextEffects::off_code(TextEffects::FAST_BLINK), Some(25));
    }

    #[test]
    fn on_codes() {
        let expected = [1u8, 2, 3, 4, 21, 5, 6, 9];
        for (i, (flag, _, _)) in TextEffects::CODES.iter().enumerate() {
            assert_eq!(TextEffects::on_code(*flag), Some(expected[i]));
        }
    }

    #[test]
    fn codes_cover_every_flag() {
        let mut all = TextEffects::empty();
        for (flag, _, _) in TextEffects::CODES {
            all |= flag;
        }
        assert_eq!(all, TextEffects::all());
    }

    #[test]
    fn foreground_sentinel() {
        let style = Style::new(Color::Standard(2));
        assert_eq!(Foreground::empty(style).code_unit, 0);
        assert_eq!(Foreground::blank(style).code_unit, b' ' as u16);
        assert_eq!(Foreground::ascii(style, b'x').code_unit, b'x' as u16);
    }

    #[test]
    fn style_builder() {
        let style = Style::new(Color::Bright(3)).with_effects(TextEffects::ITALIC);
        assert_eq!(style.color, Color::Bright(3));
        assert!(style.effects.contains(TextEffects::ITALIC));
    }
}
