#![forbid(unsafe_code)]

//! Cell types and invariants.
//!
//! [`TerminalCell`] is the unit of the back buffer. A cell carries its
//! committed foreground and background (what the physical terminal shows)
//! plus pending values written by draw calls and not yet flushed by the
//! renderer. `changed` is true iff a pending value exists or a grapheme
//! was newly attached.
//!
//! # Wide graphemes
//!
//! A double-width grapheme occupies two adjacent cells: the left cell
//! holds `is_second == false` and paints the glyph, the right cell holds
//! `is_second == true` with the same data and never paints itself. The
//! pairing is cooperative; the buffer's draw operations keep it intact
//! and the renderer detaches it when a cell is overdrawn.
//!
//! # Borders
//!
//! Border adjacency flags OR together only while the stored draw
//! identifier matches the incoming one; a draw with a different
//! identifier replaces the flags. Two box draws sharing an identifier
//! therefore form T-junctions and crosses, while an unrelated later draw
//! starts fresh.

use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;

use vtio_style::{Color, Foreground};

/// A grapheme cluster attached to a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grapheme {
    /// The cluster text.
    pub data: String,
    /// Display width in cells (1 or 2).
    pub width: u8,
    /// True for the right half of a double-width pair.
    pub is_second: bool,
}

impl Grapheme {
    /// The visible (left) half of a grapheme.
    #[must_use]
    pub fn first(data: impl Into<String>, width: u8) -> Self {
        Self {
            data: data.into(),
            width,
            is_second: false,
        }
    }

    /// The continuation (right) half of a double-width grapheme.
    #[must_use]
    pub fn second(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            width: 2,
            is_second: true,
        }
    }
}

bitflags! {
    /// Which directions a border extends from a cell.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BorderEdges: u8 {
        const LEFT = 1 << 0;
        const TOP = 1 << 1;
        const RIGHT = 1 << 2;
        const BOTTOM = 1 << 3;
    }
}

/// A token identifying one logical border drawing.
///
/// Tokens are allocated monotonically and fit in 60 bits. Draw calls
/// sharing a token merge their adjacency flags; distinct tokens replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BorderDrawId(u64);

static NEXT_DRAW_ID: AtomicU64 = AtomicU64::new(1);

impl BorderDrawId {
    const MASK: u64 = (1 << 60) - 1;

    /// Allocate a fresh token.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_DRAW_ID.fetch_add(1, Ordering::Relaxed) & Self::MASK)
    }
}

/// Border adjacency state stored on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderState {
    pub edges: BorderEdges,
    pub draw_id: BorderDrawId,
}

impl BorderState {
    /// Merge incoming edges: OR when the identifier matches, replace
    /// otherwise. Returns the resulting edge set.
    pub fn merge(&mut self, edges: BorderEdges, draw_id: BorderDrawId) -> BorderEdges {
        if self.draw_id == draw_id {
            self.edges |= edges;
        } else {
            self.edges = edges;
            self.draw_id = draw_id;
        }
        self.edges
    }
}

/// One cell of the back buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalCell {
    /// Committed foreground (what the terminal currently shows).
    pub fg: Foreground,
    /// Committed background.
    pub bg: Color,
    /// Pending foreground from a draw call.
    pub new_fg: Option<Foreground>,
    /// Pending background from a draw call.
    pub new_bg: Option<Color>,
    /// True iff a pending value exists or a grapheme was newly attached.
    pub changed: bool,
    /// Attached grapheme cluster, if any.
    pub grapheme: Option<Grapheme>,
    /// Border adjacency, if a border was drawn through this cell.
    pub border: Option<BorderState>,
}

impl TerminalCell {
    /// A cell committed to the given foreground and background, with no
    /// pending state.
    #[must_use]
    pub const fn filled(fg: Foreground, bg: Color) -> Self {
        Self {
            fg,
            bg,
            new_fg: None,
            new_bg: None,
            changed: false,
            grapheme: None,
            border: None,
        }
    }

    /// Record a draw: store pending values and mark the cell changed.
    pub fn draw(&mut self, fg: Option<Foreground>, bg: Option<Color>) {
        if fg.is_some() {
            self.new_fg = fg;
        }
        if bg.is_some() {
            self.new_bg = bg;
        }
        if fg.is_some() || bg.is_some() {
            self.changed = true;
        }
    }

    /// Attach a grapheme and the empty foreground that goes with it.
    pub fn attach_grapheme(&mut self, grapheme: Grapheme, fg: Foreground, bg: Option<Color>) {
        self.grapheme = Some(grapheme);
        self.new_fg = Some(fg);
        if bg.is_some() {
            self.new_bg = bg;
        }
        self.changed = true;
    }

    /// Commit pending values.
    ///
    /// Returns true iff the committed foreground or background actually
    /// changed. The `changed` flag is cleared either way.
    pub fn commit(&mut self) -> bool {
        let mut dirty = false;
        if let Some(fg) = self.new_fg.take() {
            if fg != self.fg {
                self.fg = fg;
                dirty = true;
            }
        }
        if let Some(bg) = self.new_bg.take() {
            if bg != self.bg {
                self.bg = bg;
                dirty = true;
            }
        }
        self.changed = false;
        dirty
    }

    /// Reset to a committed state, dropping pending values, grapheme and
    /// border.
    pub fn reset(&mut self, fg: Foreground, bg: Color) {
        *self = Self::filled(fg, bg);
    }
}
