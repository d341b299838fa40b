#![forbid(unsafe_code)]

//! Diff-driven viewport renderer.
//!
//! [`Presenter`] reconciles the physical terminal with a [`CellBuffer`].
//! It tracks what the terminal currently shows — cursor position, SGR
//! state — and emits the minimal escape-sequence stream on each
//! [`Presenter::update`]: cursor moves only when the target differs,
//! SGR transitions computed from the previous `(effects, fg, bg)`
//! triple, and glyph writes for cells whose committed state changed.
//!
//! All output accumulates in one buffer and reaches the sink in a
//! single contiguous write per update; the renderer must not interleave
//! with unrelated writes.

use std::io::{self, Write};

use vtio_core::cursor::CursorState;
use vtio_core::geometry::{Offset, Position, Size};
use vtio_core::logging::{debug, trace};
use vtio_style::{Color, Style, TextEffects};

use crate::buffer::CellBuffer;

/// State-tracked renderer over a byte sink.
pub struct Presenter<W: Write> {
    writer: W,
    /// Output accumulator, flushed once per update.
    out: String,
    /// The application-visible cursor.
    cursor: CursorState,
    cursor_hidden: bool,
    /// Where the physical cursor is, if known.
    tracked: Option<Position>,
    /// SGR state the terminal currently has.
    current_fg: Style,
    current_bg: Color,
    default_style: Style,
    default_bg: Color,
    active: bool,
}

impl<W: Write> Presenter<W> {
    /// Create a presenter over `writer` with the given defaults.
    pub fn new(writer: W, default_style: Style, default_bg: Color) -> Self {
        Self {
            writer,
            out: String::new(),
            cursor: CursorState::default(),
            cursor_hidden: false,
            tracked: None,
            current_fg: default_style,
            current_bg: default_bg,
            default_style,
            default_bg,
            active: false,
        }
    }

    /// Whether viewport mode is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The application cursor.
    #[must_use]
    pub fn cursor(&self) -> CursorState {
        self.cursor
    }

    /// Move and restyle the application cursor.
    ///
    /// Appearance changes emit DECSCUSR immediately; the position takes
    /// effect with the next update's cursor restore.
    pub fn set_cursor(&mut self, cursor: CursorState) {
        if (cursor.shape, cursor.blinking) != (self.cursor.shape, self.cursor.blinking) {
            self.out
                .push_str(&format!("\x1b[{} q", cursor.decscusr_param()));
        }
        self.cursor = cursor;
    }

    /// Show or hide the cursor.
    pub fn set_cursor_hidden(&mut self, hidden: bool) {
        if hidden == self.cursor_hidden {
            return;
        }
        self.cursor_hidden = hidden;
        self.out
            .push_str(if hidden { "\x1b[?25l" } else { "\x1b[?25h" });
    }

    /// Enter viewport mode: alternate screen, mouse tracking, a clean
    /// screen, and a buffer resized to `size`.
    ///
    /// # Panics
    ///
    /// Panics when already active.
    pub fn activate(&mut self, buffer: &mut CellBuffer, size: Size) -> io::Result<()> {
        assert!(!self.active, "viewport already active");
        debug!("viewport activate");
        self.active = true;

        self.out.push_str("\x1b[?1049h");
        self.out.push_str("\x1b[?1003;1006h");
        let start = self.cursor.position;
        self.push_cup(start);
        self.tracked = Some(start);
        self.out.push_str("\x1b[2J");
        self.cursor.position = self.cursor.position.clamped(size);
        buffer.resize(size);
        self.flush()
    }

    /// Leave viewport mode, restoring the primary screen and default
    /// SGR state.
    ///
    /// # Panics
    ///
    /// Panics when not active.
    pub fn deactivate(&mut self) -> io::Result<()> {
        assert!(self.active, "viewport not active");
        debug!("viewport deactivate");
        self.active = false;

        self.out.push_str("\x1b[?1049l");
        self.out.push_str("\x1b[?1003;1006l");
        self.out.push_str("\x1b[0m");
        self.current_fg = self.default_style;
        self.current_bg = self.default_bg;
        self.tracked = None;
        self.flush()
    }

    /// Reconcile the terminal with the buffer.
    pub fn update(&mut self, buffer: &mut CellBuffer) -> io::Result<()> {
        if let Some(fill) = buffer.take_background_fill() {
            self.sgr_transition(self.default_style, fill);
            self.out.push_str("\x1b[2J");
            // An erase repaints every cell; the cursor lands unchanged
            // but everything under the old tracked position is gone.
        }

        let old_cursor = self.cursor.position;
        let size = buffer.size();

        for y in 0..size.height {
            if !buffer.row_dirty(y) {
                continue;
            }
            buffer.clear_row_dirty(y);

            let mut x: i32 = 0;
            while x < size.width as i32 {
                let pos = Position::new(x, y as i32);
                let (changed, has_grapheme) = match buffer.cell(pos) {
                    Some(cell) => (cell.changed, cell.grapheme.is_some()),
                    None => break,
                };
                if !changed {
                    x += 1;
                    continue;
                }

                if has_grapheme && buffer.revalidate_grapheme(pos) {
                    let cell = buffer.cell(pos).expect("revalidated cell exists");
                    let grapheme = cell.grapheme.clone().expect("grapheme survived");
                    if grapheme.is_second {
                        x += 1;
                        continue;
                    }
                    let style = cell.fg.style;
                    let bg = cell.bg;
                    self.move_to(pos);
                    self.sgr_transition(style, bg);
                    self.out.push_str(&grapheme.data);
                    self.tracked = Some(pos + Offset::E1 * grapheme.width as i32);
                    // Grapheme rows repaint next update as well.
                    buffer.mark_row_dirty(y);
                    x += grapheme.width as i32;
                    continue;
                }

                let dirty = buffer.cell_mut(pos).is_some_and(|cell| cell.commit());
                if dirty {
                    let cell = buffer.cell(pos).expect("committed cell exists");
                    let style = cell.fg.style;
                    let bg = cell.bg;
                    let glyph = char::from_u32(cell.fg.code_unit as u32)
                        .filter(|_| cell.fg.code_unit != 0)
                        .unwrap_or(' ');
                    self.move_to(pos);
                    self.sgr_transition(style, bg);
                    self.out.push(glyph);
                    self.tracked = Some(pos + Offset::E1);
                }
                x += 1;
            }
        }

        if !self.cursor_hidden {
            self.move_to(old_cursor);
        }

        trace!("viewport update flushing {} bytes", self.out.len());
        self.flush()
    }

    /// Flush the accumulator to the sink.
    pub fn flush(&mut self) -> io::Result<()> {
        if !self.out.is_empty() {
            self.writer.write_all(self.out.as_bytes())?;
            self.out.clear();
        }
        self.writer.flush()
    }

    /// The underlying sink.
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consume the presenter, returning the sink.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn push_cup(&mut self, pos: Position) {
        self.out
            .push_str(&format!("\x1b[{};{}H", pos.y + 1, pos.x + 1));
    }

    /// Emit a cursor move unless the terminal is already there.
    fn move_to(&mut self, pos: Position) {
        if self.tracked == Some(pos) {
            return;
        }
        self.push_cup(pos);
        self.tracked = Some(pos);
    }

    /// Emit the minimal SGR bytes taking the terminal from the current
    /// `(effects, fg, bg)` triple to the target one.
    ///
    /// Three shapes, in order of preference:
    /// - effects unchanged: each changed colour as its own sequence;
    /// - all effects vanish: one `0`-led sequence re-establishing any
    ///   non-default colours;
    /// - otherwise: one combined sequence of changed colours plus
    ///   per-effect on/off codes, re-asserting effects whose shared off
    ///   code would have cleared them.
    fn sgr_transition(&mut self, to_style: Style, to_bg: Color) {
        let from_effects = self.current_fg.effects;
        let from_fg = self.current_fg.color;
        let from_bg = self.current_bg;
        let to_effects = to_style.effects;
        let to_fg = to_style.color;

        if from_effects == to_effects && from_fg == to_fg && from_bg == to_bg {
            return;
        }

        if from_effects == to_effects {
            if from_fg != to_fg {
                self.out.push_str("\x1b[");
                self.out.push_str(&to_fg.fg_params());
                self.out.push('m');
            }
            if from_bg != to_bg {
                self.out.push_str("\x1b[");
                self.out.push_str(&to_bg.bg_params());
                self.out.push('m');
            }
        } else if to_effects.is_empty() {
            let mut params = String::from("0");
            if to_fg != Color::Normal {
                params.push(';');
                params.push_str(&to_fg.fg_params());
            }
            if to_bg != Color::Normal {
                params.push(';');
                params.push_str(&to_bg.bg_params());
            }
            self.out.push_str("\x1b[");
            self.out.push_str(&params);
            self.out.push('m');
        } else {
            let mut params: Vec<String> = Vec::new();
            if from_fg != to_fg {
                params.push(to_fg.fg_params());
            }
            if from_bg != to_bg {
                params.push(to_bg.bg_params());
            }

            let removed = from_effects & !to_effects;
            let added = to_effects & !from_effects;
            let kept = from_effects & to_effects;

            // Off codes, deduplicated (intense/faint, both underlines
            // and both blinks share theirs).
            let mut off_codes: Vec<u8> = Vec::new();
            for (flag, _, off) in TextEffects::CODES {
                if removed.contains(flag) && !off_codes.contains(&off) {
                    off_codes.push(off);
                }
            }
            // A shared off code clears kept effects too; re-assert them.
            let mut on_flags = added;
            for (flag, _, off) in TextEffects::CODES {
                if kept.contains(flag) && off_codes.contains(&off) {
                    on_flags |= flag;
                }
            }

            for off in off_codes {
                params.push(off.to_string());
            }
            for (flag, on, _) in TextEffects::CODES {
                if on_flags.contains(flag) {
                    params.push(on.to_string());
                }
            }

            self.out.push_str("\x1b[");
            self.out.push_str(&params.join(";"));
            self.out.push('m');
        }

        self.current_fg = to_style;
        self.current_bg = to_bg;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtio_core::cursor::CursorShape;

    fn presenter() -> Presenter<Vec<u8>> {
        Presenter::new(Vec::new(), Style::default(), Color::Normal)
    }

    fn buffer(w: u16, h: u16) -> CellBuffer {
        CellBuffer::new(Size::new(w, h), Style::default(), Color::Normal)
    }

    fn output(p: &mut Presenter<Vec<u8>>) -> String {
        let bytes = std::mem::take(p.writer_mut());
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn text_diff_emits_one_move_and_glyphs() {
        let mut p = presenter();
        let mut buf = buffer(10, 2);
        buf.draw_text(Position::new(0, 0), "hi", Style::default());

        p.update(&mut buf).unwrap();
        let out = output(&mut p);
        assert_eq!(out, "\x1b[1;1Hhi\x1b[1;1H");
    }

    #[test]
    fn second_update_without_changes_is_silent() {
        let mut p = presenter();
        let mut buf = buffer(10, 2);
        buf.draw_text(Position::new(0, 0), "hi", Style::default());
        p.update(&mut buf).unwrap();
        output(&mut p);

        p.update(&mut buf).unwrap();
        assert_eq!(output(&mut p), "");
    }

    #[test]
    fn identical_sgr_states_emit_no_sgr() {
        let mut p = presenter();
        let mut buf = buffer(10, 1);
        buf.draw_text(Position::new(0, 0), "ab", Style::default());
        p.update(&mut buf).unwrap();
        assert!(!output(&mut p).contains('m'));
    }

    #[test]
    fn styled_text_emits_sgr_once_per_run() {
        let mut p = presenter();
        let mut buf = buffer(10, 1);
        let red = Style::new(Color::Standard(1));
        buf.draw_text(Position::new(0, 0), "ab", red);
        p.update(&mut buf).unwrap();
        let out = output(&mut p);
        assert_eq!(out.matches("\x1b[31m").count(), 1);
        assert!(out.contains("\x1b[31mab"));
    }

    #[test]
    fn background_fill_is_one_erase() {
        let mut p = presenter();
        let mut buf = buffer(10, 3);
        buf.draw_color(Color::Extended(17), true);
        p.update(&mut buf).unwrap();
        let out = output(&mut p);
        assert!(out.contains("\x1b[48;5;17m"));
        assert!(out.contains("\x1b[2J"));
        // No per-cell writes happened.
        assert!(!out.contains(' '));
    }

    #[test]
    fn cursor_restored_after_diff() {
        let mut p = presenter();
        p.set_cursor(CursorState::at(Position::new(5, 1)));
        let mut buf = buffer(10, 3);
        buf.draw_text(Position::new(0, 0), "x", Style::default());
        p.update(&mut buf).unwrap();
        let out = output(&mut p);
        assert!(out.ends_with("\x1b[2;6H"), "got {out:?}");
    }

    #[test]
    fn hidden_cursor_is_not_restored() {
        let mut p = presenter();
        p.set_cursor_hidden(true);
        p.set_cursor(CursorState::at(Position::new(5, 1)));
        let mut buf = buffer(10, 3);
        buf.draw_text(Position::new(0, 0), "x", Style::default());
        p.update(&mut buf).unwrap();
        let out = output(&mut p);
        assert!(out.ends_with('x'), "got {out:?}");
    }

    #[test]
    fn cursor_appearance_emits_decscusr() {
        let mut p = presenter();
        let mut cursor = CursorState::at(Position::ORIGIN);
        cursor.shape = CursorShape::Bar;
        cursor.blinking = true;
        p.set_cursor(cursor);
        p.flush().unwrap();
        assert_eq!(output(&mut p), "\x1b[5 q");
    }

    #[test]
    fn cursor_visibility_toggles() {
        let mut p = presenter();
        p.set_cursor_hidden(true);
        p.set_cursor_hidden(true);
        p.set_cursor_hidden(false);
        p.flush().unwrap();
        assert_eq!(output(&mut p), "\x1b[?25l\x1b[?25h");
    }

    #[test]
    fn activation_sequence() {
        let mut p = presenter();
        let mut buf = buffer(1, 1);
        p.activate(&mut buf, Size::new(80, 24)).unwrap();
        let out = output(&mut p);
        assert!(out.starts_with("\x1b[?1049h\x1b[?1003;1006h"));
        assert!(out.contains("\x1b[2J"));
        assert_eq!(buf.size(), Size::new(80, 24));

        p.deactivate().unwrap();
        let out = output(&mut p);
        assert!(out.contains("\x1b[?1049l"));
        assert!(out.contains("\x1b[?1003;1006l"));
        assert!(out.ends_with("\x1b[0m"));
    }

    #[test]
    #[should_panic(expected = "already active")]
    fn double_activation_panics() {
        let mut p = presenter();
        let mut buf = buffer(1, 1);
        p.activate(&mut buf, Size::new(10, 5)).unwrap();
        let mut buf2 = buffer(1, 1);
        p.activate(&mut buf2, Size::new(10, 5)).unwrap();
    }

    #[test]
    fn wide_grapheme_advances_cursor_by_two() {
        let mut p = presenter();
        let mut buf = buffer(10, 1);
        buf.draw_unicode_text(Position::new(0, 0), "你a", Style::default());
        p.update(&mut buf).unwrap();
        let out = output(&mut p);
        // The wide glyph is emitted, then 'a' lands at column 3 with no
        // extra move (the terminal advanced two cells on its own).
        assert!(out.contains("你a"), "got {out:?}");
    }

    #[test]
    fn grapheme_rows_repaint_every_update() {
        let mut p = presenter();
        let mut buf = buffer(10, 1);
        buf.draw_unicode_text(Position::new(0, 0), "你", Style::default());
        p.update(&mut buf).unwrap();
        let first = output(&mut p);
        assert!(first.contains("你"));

        p.update(&mut buf).unwrap();
        let second = output(&mut p);
        assert!(second.contains("你"));
    }

    #[test]
    fn overdrawn_grapheme_renders_plainly() {
        let mut p = presenter();
        let mut buf = buffer(10, 1);
        buf.draw_unicode_text(Position::new(0, 0), "你", Style::default());
        p.update(&mut buf).unwrap();
        output(&mut p);

        buf.draw_point(
            Position::new(1, 0),
            Some(vtio_style::Foreground::ascii(Style::default(), b'x')),
            None,
        );
        p.update(&mut buf).unwrap();
        let out = output(&mut p);
        // The left half repaints as a blank, the overdraw lands.
        assert!(out.contains(' '), "got {out:?}");
        assert!(out.contains('x'), "got {out:?}");
        assert!(!out.contains("你"), "got {out:?}");
    }

    // ── SGR transition shapes ────────────────────────────────────────

    fn transition(
        from: (TextEffects, Color, Color),
        to: (TextEffects, Color, Color),
    ) -> String {
        let mut p = presenter();
        p.current_fg = Style::new(from.1).with_effects(from.0);
        p.current_bg = from.2;
        p.sgr_transition(Style::new(to.1).with_effects(to.0), to.2);
        std::mem::take(&mut p.out)
    }

    #[test]
    fn transition_identical_is_empty() {
        let state = (
            TextEffects::INTENSE,
            Color::Standard(1),
            Color::Extended(17),
        );
        assert_eq!(transition(state, state), "");
    }

    #[test]
    fn transition_colour_only_uses_separate_sequences() {
        let out = transition(
            (TextEffects::empty(), Color::Normal, Color::Normal),
            (TextEffects::empty(), Color::Standard(1), Color::Standard(4)),
        );
        assert_eq!(out, "\x1b[31m\x1b[44m");
    }

    #[test]
    fn transition_fg_only() {
        let out = transition(
            (TextEffects::ITALIC, Color::Normal, Color::Normal),
            (TextEffects::ITALIC, Color::Bright(2), Color::Normal),
        );
        assert_eq!(out, "\x1b[92m");
    }

    #[test]
    fn transition_effects_vanish_uses_reset() {
        let out = transition(
            (
                TextEffects::INTENSE | TextEffects::UNDERLINE,
                Color::Standard(1),
                Color::Normal,
            ),
            (TextEffects::empty(), Color::Standard(1), Color::Normal),
        );
        assert_eq!(out, "\x1b[0;31m");
    }

    #[test]
    fn transition_to_all_defaults_is_bare_reset() {
        let out = transition(
            (TextEffects::ITALIC, Color::Normal, Color::Normal),
            (TextEffects::empty(), Color::Normal, Color::Normal),
        );
        assert_eq!(out, "\x1b[0m");
    }

    #[test]
    fn transition_combined_toggles_effects() {
        let out = transition(
            (TextEffects::ITALIC, Color::Normal, Color::Normal),
            (TextEffects::INTENSE, Color::Standard(2), Color::Normal),
        );
        // One sequence: colour, italic off, intense on.
        assert_eq!(out, "\x1b[32;23;1m");
    }

    #[test]
    fn transition_reasserts_shared_off_victim() {
        // Dropping INTENSE while keeping FAINT: off code 22 clears
        // both, so FAINT must be re-asserted.
        let out = transition(
            (
                TextEffects::INTENSE | TextEffects::FAINT,
                Color::Normal,
                Color::Normal,
            ),
            (TextEffects::FAINT, Color::Normal, Color::Normal),
        );
        assert_eq!(out, "\x1b[22;2m");
    }

    #[test]
    fn transition_swaps_shared_pair() {
        let out = transition(
            (TextEffects::UNDERLINE, Color::Normal, Color::Normal),
            (TextEffects::DOUBLE_UNDERLINE, Color::Normal, Color::Normal),
        );
        // Off 24 then on 21.
        assert_eq!(out, "\x1b[24;21m");
    }
}
