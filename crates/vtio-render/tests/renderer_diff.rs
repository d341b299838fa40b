//! End-to-end renderer scenarios: diff output, grapheme safety, and
//! resize preservation through the public API.

use vtio_core::geometry::{Position, Rect, Size};
use vtio_render::buffer::CellBuffer;
use vtio_render::presenter::Presenter;
use vtio_style::{Color, Foreground, Style, TextEffects};

fn fixture(w: u16, h: u16) -> (Presenter<Vec<u8>>, CellBuffer) {
    let presenter = Presenter::new(Vec::new(), Style::default(), Color::Normal);
    let buffer = CellBuffer::new(Size::new(w, h), Style::default(), Color::Normal);
    (presenter, buffer)
}

fn drain(presenter: &mut Presenter<Vec<u8>>) -> String {
    String::from_utf8(std::mem::take(presenter.writer_mut())).unwrap()
}

#[test]
fn empty_buffer_text_draw_produces_move_and_glyphs() {
    let (mut presenter, mut buffer) = fixture(20, 5);
    buffer.draw_text(Position::new(0, 0), "hi", Style::default());

    presenter.update(&mut buffer).unwrap();
    let out = drain(&mut presenter);

    // One cursor move, no SGR (the style matches the tracked default),
    // the glyphs, and the restore to the unchanged cursor.
    assert_eq!(out, "\x1b[1;1Hhi\x1b[1;1H");

    presenter.update(&mut buffer).unwrap();
    assert_eq!(drain(&mut presenter), "");
}

#[test]
fn sgr_emitted_once_for_a_styled_run() {
    let (mut presenter, mut buffer) = fixture(20, 2);
    let style = Style::new(Color::Standard(2)).with_effects(TextEffects::INTENSE);
    buffer.draw_text(Position::new(3, 1), "ok", style);

    presenter.update(&mut buffer).unwrap();
    let out = drain(&mut presenter);
    assert_eq!(out.matches('m').count(), 1, "one SGR in {out:?}");
    assert!(out.contains("\x1b[2;4H"));
}

#[test]
fn distant_cells_get_separate_moves() {
    let (mut presenter, mut buffer) = fixture(20, 3);
    buffer.draw_text(Position::new(0, 0), "a", Style::default());
    buffer.draw_text(Position::new(10, 2), "b", Style::default());

    presenter.update(&mut buffer).unwrap();
    let out = drain(&mut presenter);
    assert!(out.contains("\x1b[1;1Ha"));
    assert!(out.contains("\x1b[3;11Hb"));
}

#[test]
fn rect_fill_then_noop_update() {
    let (mut presenter, mut buffer) = fixture(8, 3);
    buffer.draw_rect(Rect::new(0, 7, 0, 2), None, Some(Color::Extended(236)));
    presenter.update(&mut buffer).unwrap();
    let first = drain(&mut presenter);
    assert!(first.contains("\x1b[48;5;236m"));

    presenter.update(&mut buffer).unwrap();
    assert_eq!(drain(&mut presenter), "");
}

#[test]
fn background_fill_fast_path_skips_cell_writes() {
    let (mut presenter, mut buffer) = fixture(40, 12);
    buffer.draw_color(Color::Rgb(10, 20, 30), true);

    presenter.update(&mut buffer).unwrap();
    let out = drain(&mut presenter);
    assert!(out.contains("\x1b[48;2;10;20;30m"));
    assert!(out.contains("\x1b[2J"));
    assert!(out.len() < 40, "fast path stayed small: {out:?}");
}

#[test]
fn resize_preserves_committed_cells() {
    let (mut presenter, mut buffer) = fixture(10, 4);
    buffer.draw_text(Position::new(2, 1), "keep", Style::default());
    presenter.update(&mut buffer).unwrap();
    drain(&mut presenter);

    buffer.resize(Size::new(30, 10));
    for (i, c) in "keep".chars().enumerate() {
        let cell = buffer.cell(Position::new(2 + i as i32, 1)).unwrap();
        assert_eq!(cell.fg.code_unit, c as u16);
    }

    // Nothing is dirty after a grow; the terminal already matches.
    presenter.update(&mut buffer).unwrap();
    assert_eq!(drain(&mut presenter), "");
}

#[test]
fn wide_grapheme_then_overdraw_renders_plainly() {
    let (mut presenter, mut buffer) = fixture(10, 1);
    buffer.draw_unicode_text(Position::new(0, 0), "你", Style::default());
    presenter.update(&mut buffer).unwrap();
    assert!(drain(&mut presenter).contains("你"));

    // Overdraw the right half with a plain glyph.
    buffer.draw_point(
        Position::new(1, 0),
        Some(Foreground::ascii(Style::default(), b'!')),
        None,
    );
    presenter.update(&mut buffer).unwrap();
    let out = drain(&mut presenter);
    assert!(!out.contains("你"));
    assert!(out.contains('!'));
    assert!(out.contains(' '), "left half blanked in {out:?}");
}

#[test]
fn mixed_width_line_layout() {
    let (mut presenter, mut buffer) = fixture(10, 1);
    buffer.draw_unicode_text(Position::new(0, 0), "a你b", Style::default());
    presenter.update(&mut buffer).unwrap();
    let out = drain(&mut presenter);
    // 'a' at column 1, the wide glyph spans 2-3, 'b' lands at 4 without
    // an extra cursor move.
    assert!(out.contains("a你b"), "got {out:?}");
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Growing a buffer never loses committed cells.
        #[test]
        fn grow_preserves_content(
            w1 in 1u16..20,
            h1 in 1u16..10,
            grow_w in 0u16..10,
            grow_h in 0u16..10,
            x in 0i32..20,
            y in 0i32..10,
        ) {
            let mut buffer =
                CellBuffer::new(Size::new(w1, h1), Style::default(), Color::Normal);
            let pos = Position::new(x.min(w1 as i32 - 1), y.min(h1 as i32 - 1));
            buffer.draw_point(
                pos,
                Some(Foreground::ascii(Style::default(), b'#')),
                Some(Color::Standard(5)),
            );
            if let Some(cell) = buffer.cell_mut(pos) {
                cell.commit();
            }

            buffer.resize(Size::new(w1 + grow_w, h1 + grow_h));
            let cell = buffer.cell(pos).expect("cell survives growth");
            prop_assert_eq!(cell.fg.code_unit, b'#' as u16);
            prop_assert_eq!(cell.bg, Color::Standard(5));
        }

        /// Updating twice with no draws in between never emits bytes
        /// the second time.
        #[test]
        fn settled_buffer_is_silent(
            text in "[ -~]{0,16}",
            x in 0i32..10,
            y in 0i32..5,
        ) {
            let mut presenter =
                Presenter::new(Vec::new(), Style::default(), Color::Normal);
            let mut buffer =
                CellBuffer::new(Size::new(20, 6), Style::default(), Color::Normal);
            buffer.draw_text(Position::new(x, y), &text, Style::default());

            presenter.update(&mut buffer).unwrap();
            std::mem::take(presenter.writer_mut());

            presenter.update(&mut buffer).unwrap();
            prop_assert!(presenter.writer_mut().is_empty());
        }
    }
}
