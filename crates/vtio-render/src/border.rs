#![forbid(unsafe_code)]

//! Border glyph selection.
//!
//! A [`BorderCharSet`] names the eleven glyphs a box border can need.
//! [`BorderCharSet::glyph`] picks the right one from a cell's adjacency
//! flags: which of the four neighbours the border extends towards.

use crate::cell::BorderEdges;

/// The glyphs used to draw borders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderCharSet {
    pub horizontal: char,
    pub vertical: char,
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub cross: char,
    pub tee_up: char,
    pub tee_down: char,
    pub tee_left: char,
    pub tee_right: char,
}

impl BorderCharSet {
    /// Light box-drawing glyphs.
    pub const LIGHT: Self = Self {
        horizontal: '─',
        vertical: '│',
        top_left: '┌',
        top_right: '┐',
        bottom_left: '└',
        bottom_right: '┘',
        cross: '┼',
        tee_up: '┴',
        tee_down: '┬',
        tee_left: '┤',
        tee_right: '├',
    };

    /// Heavy box-drawing glyphs.
    pub const HEAVY: Self = Self {
        horizontal: '━',
        vertical: '┃',
        top_left: '┏',
        top_right: '┓',
        bottom_left: '┗',
        bottom_right: '┛',
        cross: '╋',
        tee_up: '┻',
        tee_down: '┳',
        tee_left: '┫',
        tee_right: '┣',
    };

    /// Double-line box-drawing glyphs.
    pub const DOUBLE: Self = Self {
        horizontal: '═',
        vertical: '║',
        top_left: '╔',
        top_right: '╗',
        bottom_left: '╚',
        bottom_right: '╝',
        cross: '╬',
        tee_up: '╩',
        tee_down: '╦',
        tee_left: '╣',
        tee_right: '╠',
    };

    /// Pick the glyph for an adjacency set.
    ///
    /// Degenerate single-direction sets fall back to the straight
    /// glyphs. An empty set is a programmer error.
    ///
    /// # Panics
    ///
    /// Panics when `edges` is empty.
    #[must_use]
    pub fn glyph(&self, edges: BorderEdges) -> char {
        use BorderEdges as E;
        assert!(!edges.is_empty(), "border glyph for empty adjacency");

        let l = edges.contains(E::LEFT);
        let t = edges.contains(E::TOP);
        let r = edges.contains(E::RIGHT);
        let b = edges.contains(E::BOTTOM);

        match (l, t, r, b) {
            (true, true, true, true) => self.cross,
            (true, true, true, false) => self.tee_up,
            (true, false, true, true) => self.tee_down,
            (true, true, false, true) => self.tee_left,
            (false, true, true, true) => self.tee_right,
            (true, false, true, false) => self.horizontal,
            (false, true, false, true) => self.vertical,
            (false, false, true, true) => self.top_left,
            (true, false, false, true) => self.top_right,
            (false, true, true, false) => self.bottom_left,
            (true, true, false, false) => self.bottom_right,
            // Degenerate stubs.
            (true, false, false, false) | (false, false, true, false) => self.horizontal,
            (false, true, false, false) | (false, false, false, true) => self.vertical,
            (false, false, false, false) => unreachable!(),
        }
    }
}
