#![forbid(unsafe_code)]

//! Cursor state and the DECSCUSR shape mapping.

use crate::geometry::Position;

/// Cursor glyph shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CursorShape {
    /// Full-cell block.
    #[default]
    Block,
    /// Underline.
    Underline,
    /// Vertical bar (xterm "bar" / DECSCUSR 5-6).
    Bar,
}

/// The cursor as the application sees it: position, shape, blink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CursorState {
    pub position: Position,
    pub shape: CursorShape,
    pub blinking: bool,
}

impl CursorState {
    /// Create a cursor state at a position with the default appearance.
    #[must_use]
    pub const fn at(position: Position) -> Self {
        Self {
            position,
            shape: CursorShape::Block,
            blinking: false,
        }
    }

    /// The DECSCUSR parameter (`CSI Ps q`) for this appearance.
    ///
    /// Blinking shapes take the odd codes 1/3/5, steady shapes the even
    /// codes 2/4/6.
    #[must_use]
    pub const fn decscusr_param(&self) -> u8 {
        let base = match self.shape {
            CursorShape::Block => 1,
            CursorShape::Underline => 3,
            CursorShape::Bar => 5,
        };
        if self.blinking {
            base
        } else {
            base + 1
        }
    }
}
