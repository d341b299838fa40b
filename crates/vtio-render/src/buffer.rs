#![forbid(unsafe_code)]

//! The cell-addressed back buffer.
//!
//! [`CellBuffer`] is a row-major grid of [`TerminalCell`]s with a
//! parallel dirty flag per row. Draw operations record pending state on
//! the cells and mark the touched rows; the presenter later walks dirty
//! rows, commits pending state, and emits the difference.
//!
//! Storage only ever grows. Shrinking the logical size leaves the
//! trailing rows and columns allocated but unused, so growing again
//! restores whatever was committed there.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use vtio_core::geometry::{Offset, Position, Rect, Size};
use vtio_style::{Color, Foreground, Style};

use crate::border::BorderCharSet;
use crate::cell::{BorderDrawId, BorderEdges, BorderState, Grapheme, TerminalCell};

/// One cell of a pre-rendered image block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageCell {
    /// Single-width glyph to show.
    pub glyph: char,
    /// Foreground style.
    pub style: Style,
    /// Background colour.
    pub bg: Color,
}

/// The back buffer.
#[derive(Debug)]
pub struct CellBuffer {
    rows: Vec<Vec<TerminalCell>>,
    row_changed: Vec<bool>,
    size: Size,
    /// Widest width the storage has ever had; rows are padded to this.
    storage_width: usize,
    default_style: Style,
    default_bg: Color,
    /// Set by [`CellBuffer::draw_color`]; consumed by the presenter to
    /// emit a single erase-screen instead of per-cell writes.
    background_fill: Option<Color>,
}

impl CellBuffer {
    /// Create a buffer of the given size.
    #[must_use]
    pub fn new(size: Size, default_style: Style, default_bg: Color) -> Self {
        let mut buffer = Self {
            rows: Vec::new(),
            row_changed: Vec::new(),
            size: Size::new(0, 0),
            storage_width: 0,
            default_style,
            default_bg,
            background_fill: None,
        };
        buffer.resize(size);
        buffer
    }

    /// Logical size.
    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    /// The style cells are reset to.
    #[must_use]
    pub fn default_style(&self) -> Style {
        self.default_style
    }

    /// The background cells are reset to.
    #[must_use]
    pub fn default_bg(&self) -> Color {
        self.default_bg
    }

    fn blank(&self) -> Foreground {
        Foreground::blank(self.default_style)
    }

    /// Resize the logical grid. Storage grows, never shrinks; committed
    /// content inside the retained region is preserved.
    pub fn resize(&mut self, size: Size) {
        let width = size.width as usize;
        let height = size.height as usize;
        let blank = TerminalCell::filled(Foreground::blank(self.default_style), self.default_bg);

        self.storage_width = self.storage_width.max(width);
        for row in &mut self.rows {
            if row.len() < self.storage_width {
                row.resize(self.storage_width, blank.clone());
            }
        }
        while self.rows.len() < height {
            self.rows.push(vec![blank.clone(); self.storage_width]);
            self.row_changed.push(false);
        }
        self.size = size;
    }

    /// Reset every cell to a committed `(fg, bg)` and clear all dirty
    /// flags.
    pub fn reset(&mut self, style: Style, bg: Color) {
        let fg = Foreground::blank(style);
        for row in &mut self.rows {
            for cell in row.iter_mut() {
                cell.reset(fg, bg);
            }
        }
        for flag in &mut self.row_changed {
            *flag = false;
        }
    }

    /// Take the pending whole-screen fill, if any.
    pub fn take_background_fill(&mut self) -> Option<Color> {
        self.background_fill.take()
    }

    // ── Cell access ──────────────────────────────────────────────────

    /// The cell at `pos`, if inside the logical size.
    #[must_use]
    pub fn cell(&self, pos: Position) -> Option<&TerminalCell> {
        if !self.size.rect().contains(pos) {
            return None;
        }
        self.rows.get(pos.y as usize)?.get(pos.x as usize)
    }

    /// Mutable access to the cell at `pos`.
    pub fn cell_mut(&mut self, pos: Position) -> Option<&mut TerminalCell> {
        if !self.size.rect().contains(pos) {
            return None;
        }
        self.rows.get_mut(pos.y as usize)?.get_mut(pos.x as usize)
    }

    /// Whether a row needs a diff pass.
    #[must_use]
    pub fn row_dirty(&self, y: u16) -> bool {
        self.row_changed.get(y as usize).copied().unwrap_or(false)
    }

    /// Mark a row for the next diff pass.
    pub fn mark_row_dirty(&mut self, y: u16) {
        if let Some(flag) = self.row_changed.get_mut(y as usize) {
            *flag = true;
        }
    }

    /// Clear a row's dirty flag (start of its diff pass).
    pub fn clear_row_dirty(&mut self, y: u16) {
        if let Some(flag) = self.row_changed.get_mut(y as usize) {
            *flag = false;
        }
    }

    // ── Drawing ──────────────────────────────────────────────────────

    /// Fill the whole screen with a background colour.
    ///
    /// With `optimize_by_clear` the buffer records the fill and resets
    /// itself clean; the presenter then emits a single erase-screen
    /// after setting the background. Without it, this is an ordinary
    /// full-screen rectangle draw.
    pub fn draw_color(&mut self, color: Color, optimize_by_clear: bool) {
        if optimize_by_clear {
            self.background_fill = Some(color);
            let style = self.default_style;
            self.reset(style, color);
        } else {
            let fg = self.blank();
            self.draw_rect(self.size.rect(), Some(fg), Some(color));
        }
    }

    /// Draw a single cell.
    pub fn draw_point(&mut self, pos: Position, fg: Option<Foreground>, bg: Option<Color>) {
        if let Some(cell) = self.cell_mut(pos) {
            cell.draw(fg, bg);
            self.mark_row_dirty(pos.y as u16);
        }
    }

    /// Draw a filled rectangle, clipped to the screen.
    pub fn draw_rect(&mut self, rect: Rect, fg: Option<Foreground>, bg: Option<Color>) {
        let clipped = rect.clip(&self.size.rect());
        if clipped.is_empty() {
            return;
        }
        for y in clipped.y1..=clipped.y2 {
            for x in clipped.x1..=clipped.x2 {
                if let Some(cell) = self.cell_mut(Position::new(x, y)) {
                    cell.draw(fg, bg);
                }
            }
            self.mark_row_dirty(y as u16);
        }
    }

    /// Draw ASCII text. Only code units 32..=126 are painted; anything
    /// else advances the position without drawing.
    pub fn draw_text(&mut self, origin: Position, text: &str, style: Style) {
        for (i, byte) in text.bytes().enumerate() {
            if (32..=126).contains(&byte) {
                self.draw_point(
                    origin + Offset::E1 * i as i32,
                    Some(Foreground::ascii(style, byte)),
                    None,
                );
            }
        }
    }

    /// Draw text that may contain multi-codepoint or double-width
    /// grapheme clusters.
    pub fn draw_unicode_text(&mut self, origin: Position, text: &str, style: Style) {
        let mut x = origin.x;
        for cluster in text.graphemes(true) {
            let width = UnicodeWidthStr::width(cluster);
            if width == 0 {
                continue;
            }
            let pos = Position::new(x, origin.y);
            if cluster.len() == 1 && width == 1 {
                // Single-byte, single-width: the ASCII fast path.
                let byte = cluster.as_bytes()[0];
                if (32..=126).contains(&byte) {
                    self.draw_point(pos, Some(Foreground::ascii(style, byte)), None);
                }
            } else {
                self.try_draw_grapheme(pos, cluster, width.min(2) as u8, style);
            }
            x += width as i32;
        }
    }

    /// Place one grapheme cluster, fixing up any neighbours it disturbs.
    fn try_draw_grapheme(&mut self, pos: Position, data: &str, width: u8, style: Style) {
        if self.cell(pos).is_none() {
            return;
        }
        let existing = self.cell(pos).and_then(|c| c.grapheme.clone());

        // Displacing the right half of a pair orphans its left half.
        if let Some(grapheme) = existing {
            if grapheme.is_second {
                let left = pos + Offset::E1 * -1;
                if self
                    .cell(left)
                    .and_then(|c| c.grapheme.as_ref())
                    .is_some_and(|g| !g.is_second && g.width == 2)
                {
                    self.clear_grapheme_cell(left);
                }
                self.clear_grapheme_cell(pos);
            } else if grapheme.width == 2 {
                // Displacing the left half clears both.
                self.clear_grapheme_cell(pos);
                self.clear_grapheme_cell(pos + Offset::E1);
            }
        }

        if width == 2 {
            let right_pos = pos + Offset::E1;
            // No room for the right half: reject the draw.
            if !self.size.rect().contains(right_pos) {
                return;
            }
            if self
                .cell(right_pos)
                .is_some_and(|c| c.grapheme.is_some())
            {
                self.clear_grapheme_span(right_pos);
            }
            // The right half never paints itself; it is committed
            // directly and repainted through the left cell.
            if let Some(right) = self.cell_mut(right_pos) {
                right.grapheme = Some(Grapheme::second(data));
                right.fg = Foreground::empty(style);
                right.new_fg = None;
                right.changed = false;
            }
        }

        if let Some(cell) = self.cell_mut(pos) {
            cell.attach_grapheme(
                Grapheme::first(data, width),
                Foreground::empty(style),
                None,
            );
            self.mark_row_dirty(pos.y as u16);
        }
    }

    /// Remove a grapheme from one cell and schedule a blank repaint.
    fn clear_grapheme_cell(&mut self, pos: Position) {
        let blank = self.blank();
        if let Some(cell) = self.cell_mut(pos) {
            cell.grapheme = None;
            cell.draw(Some(blank), None);
            self.mark_row_dirty(pos.y as u16);
        }
    }

    /// Remove a grapheme and its partner cell, whichever half `pos`
    /// names.
    fn clear_grapheme_span(&mut self, pos: Position) {
        let partner = match self.cell(pos).and_then(|c| c.grapheme.as_ref()) {
            Some(g) if g.is_second => Some(pos + Offset::E1 * -1),
            Some(g) if g.width == 2 => Some(pos + Offset::E1),
            _ => None,
        };
        self.clear_grapheme_cell(pos);
        if let Some(partner) = partner {
            if self
                .cell(partner)
                .is_some_and(|c| c.grapheme.is_some())
            {
                self.clear_grapheme_cell(partner);
            }
        }
    }

    /// Revalidate a grapheme cell during the diff pass.
    ///
    /// If a draw overpainted the cell with a real glyph (`code_unit !=
    /// 0`), the grapheme no longer owns its span: both halves are
    /// detached and scheduled to repaint plainly, and this returns
    /// false so the caller falls through to the single-cell path.
    /// Otherwise pending colours are committed and this returns true.
    pub fn revalidate_grapheme(&mut self, pos: Position) -> bool {
        let Some(grapheme) = self.cell(pos).and_then(|c| c.grapheme.clone()) else {
            return false;
        };
        let partner = if grapheme.is_second {
            Some(pos + Offset::E1 * -1)
        } else if grapheme.width == 2 {
            Some(pos + Offset::E1)
        } else {
            None
        };

        let overdrawn = |cell: &TerminalCell| cell.new_fg.is_some_and(|fg| fg.code_unit != 0);
        let overdrawn_here = self.cell(pos).is_some_and(overdrawn);
        let overdrawn_partner = partner
            .and_then(|p| self.cell(p))
            .is_some_and(overdrawn);

        if overdrawn_here || overdrawn_partner {
            self.detach_half(pos);
            if let Some(partner) = partner {
                self.detach_half(partner);
            }
            return false;
        }

        if let Some(cell) = self.cell_mut(pos) {
            cell.commit();
            // The left half stays marked; graphemes repaint every pass.
            cell.changed = !grapheme.is_second;
        }
        true
    }

    /// Detach one half of a broken grapheme pair. A half that carries
    /// its own pending glyph keeps it; the other is scheduled blank.
    fn detach_half(&mut self, pos: Position) {
        let blank = self.blank();
        if let Some(cell) = self.cell_mut(pos) {
            if cell.grapheme.is_none() && cell.new_fg.is_some() {
                return;
            }
            cell.grapheme = None;
            if cell.new_fg.is_none() {
                cell.new_fg = Some(blank);
            }
            cell.changed = true;
        }
        self.mark_row_dirty(pos.y as u16);
    }

    /// Draw a rectangular block of pre-rendered cells.
    ///
    /// `cells` is row-major with `width` cells per row; the block is
    /// clipped to the screen.
    pub fn draw_image(&mut self, origin: Position, width: u16, cells: &[ImageCell]) {
        if width == 0 {
            return;
        }
        for (i, image_cell) in cells.iter().enumerate() {
            let dx = (i % width as usize) as i32;
            let dy = (i / width as usize) as i32;
            self.draw_point(
                origin + Offset::new(dx, dy),
                Some(Foreground {
                    style: image_cell.style,
                    code_unit: image_cell.glyph as u16,
                }),
                Some(image_cell.bg),
            );
        }
    }

    // ── Borders ──────────────────────────────────────────────────────

    /// Draw a straight border line between two aligned positions.
    ///
    /// Endpoint cells do not extend outward. Adjacency accumulates with
    /// earlier draws that used the same `draw_id` and replaces others.
    ///
    /// # Panics
    ///
    /// Panics when the endpoints are neither horizontally nor
    /// vertically aligned.
    pub fn draw_border_line(
        &mut self,
        from: Position,
        to: Position,
        style: Style,
        charset: &BorderCharSet,
        draw_id: BorderDrawId,
    ) {
        assert!(
            from.x == to.x || from.y == to.y,
            "border line endpoints must be aligned"
        );

        if from.y == to.y {
            let (x1, x2) = (from.x.min(to.x), from.x.max(to.x));
            for x in x1..=x2 {
                let mut edges = BorderEdges::empty();
                if x > x1 {
                    edges |= BorderEdges::LEFT;
                }
                if x < x2 {
                    edges |= BorderEdges::RIGHT;
                }
                if edges.is_empty() {
                    // Single-cell line: a plain horizontal dash.
                    edges = BorderEdges::LEFT | BorderEdges::RIGHT;
                }
                self.merge_border(Position::new(x, from.y), edges, style, charset, draw_id);
            }
        } else {
            let (y1, y2) = (from.y.min(to.y), from.y.max(to.y));
            for y in y1..=y2 {
                let mut edges = BorderEdges::empty();
                if y > y1 {
                    edges |= BorderEdges::TOP;
                }
                if y < y2 {
                    edges |= BorderEdges::BOTTOM;
                }
                if edges.is_empty() {
                    edges = BorderEdges::TOP | BorderEdges::BOTTOM;
                }
                self.merge_border(Position::new(from.x, y), edges, style, charset, draw_id);
            }
        }
    }

    /// Draw a rectangular border box.
    ///
    /// All four lines share one draw identifier, so overlapping boxes
    /// drawn with the same explicit identifier form junctions.
    ///
    /// # Panics
    ///
    /// Panics when the rectangle is smaller than 2×2.
    pub fn draw_border_box(
        &mut self,
        rect: Rect,
        style: Style,
        charset: &BorderCharSet,
        draw_id: Option<BorderDrawId>,
    ) {
        assert!(
            rect.width() >= 2 && rect.height() >= 2,
            "border box must be at least 2x2"
        );
        let id = draw_id.unwrap_or_else(BorderDrawId::next);
        let tl = Position::new(rect.x1, rect.y1);
        let tr = Position::new(rect.x2, rect.y1);
        let bl = Position::new(rect.x1, rect.y2);
        let br = Position::new(rect.x2, rect.y2);
        self.draw_border_line(tl, tr, style, charset, id);
        self.draw_border_line(bl, br, style, charset, id);
        self.draw_border_line(tl, bl, style, charset, id);
        self.draw_border_line(tr, br, style, charset, id);
    }

    fn merge_border(
        &mut self,
        pos: Position,
        edges: BorderEdges,
        style: Style,
        charset: &BorderCharSet,
        draw_id: BorderDrawId,
    ) {
        if !self.size.rect().contains(pos) {
            return;
        }
        let Some(cell) = self.cell_mut(pos) else {
            return;
        };
        let merged = match cell.border.as_mut() {
            Some(state) => state.merge(edges, draw_id),
            None => {
                cell.border = Some(BorderState { edges, draw_id });
                edges
            }
        };
        let glyph = charset.glyph(merged);
        cell.draw(
            Some(Foreground {
                style,
                code_unit: glyph as u16,
            }),
            None,
        );
        self.mark_row_dirty(pos.y as u16);
    }
}
