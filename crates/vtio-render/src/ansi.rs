#![forbid(unsafe_code)]

//! ANSI escape sequence generation.
//!
//! Pure byte-generation helpers for the control sequences the renderer
//! and output controller emit. No state tracking lives here; the
//! presenter owns the diffing and the tty layer owns mode bookkeeping.
//!
//! # Sequence Reference
//!
//! | Category | Sequence | Description |
//! |----------|----------|-------------|
//! | C0 | `BEL` | Bell |
//! | CSI | `ESC [ row ; col H` | CUP (cursor position, 1-indexed) |
//! | CSI | `ESC [ 2 J` | ED (erase entire display) |
//! | CSI | `ESC [ ? 25 h/l` | Cursor visibility |
//! | CSI | `ESC [ n SP q` | DECSCUSR (cursor style) |
//! | CSI | `ESC [ 6 n` | DSR cursor position query |
//! | CSI | `ESC [ ? 1049 h/l` | Alternate screen buffer |
//! | CSI | `ESC [ ? 7 h/l` | Auto-wrap |
//! | CSI | `ESC [ ? 1003;1006 h/l` | Mouse tracking (any-motion + SGR) |
//! | CSI | `ESC [ ? 1004 h/l` | Focus reporting |
//! | CSI | `ESC [ ? 2004 h/l` | Bracketed paste |
//! | CSI | `ESC [ 8 ; rows ; cols t` | Window resize request |
//! | OSC | `ESC ] 0/1 ; text BEL` | Window title / icon name |
//! | SGR | `ESC [ params m` | Colours and effects |

use std::io::{self, Write};

/// Bell.
pub const BEL: &[u8] = b"\x07";

/// ED: erase the entire display.
pub const ERASE_DISPLAY: &[u8] = b"\x1b[2J";

/// SGR reset.
pub const SGR_RESET: &[u8] = b"\x1b[0m";

/// DSR: ask the terminal where the cursor is.
pub const CURSOR_POSITION_QUERY: &[u8] = b"\x1b[6n";

/// Show cursor.
pub const CURSOR_SHOW: &[u8] = b"\x1b[?25h";

/// Hide cursor.
pub const CURSOR_HIDE: &[u8] = b"\x1b[?25l";

/// Enter the alternate screen buffer.
pub const ALT_SCREEN_ENTER: &[u8] = b"\x1b[?1049h";

/// Leave the alternate screen buffer.
pub const ALT_SCREEN_LEAVE: &[u8] = b"\x1b[?1049l";

/// Enable auto-wrap.
pub const WRAP_ENABLE: &[u8] = b"\x1b[?7h";

/// Disable auto-wrap.
pub const WRAP_DISABLE: &[u8] = b"\x1b[?7l";

/// Enable any-motion mouse tracking with SGR coordinates.
pub const MOUSE_ENABLE: &[u8] = b"\x1b[?1003;1006h";

/// Disable mouse tracking.
pub const MOUSE_DISABLE: &[u8] = b"\x1b[?1003;1006l";

/// Enable focus reporting.
pub const FOCUS_ENABLE: &[u8] = b"\x1b[?1004h";

/// Disable focus reporting.
pub const FOCUS_DISABLE: &[u8] = b"\x1b[?1004l";

/// Enable bracketed paste.
pub const BRACKETED_PASTE_ENABLE: &[u8] = b"\x1b[?2004h";

/// Disable bracketed paste.
pub const BRACKETED_PASTE_DISABLE: &[u8] = b"\x1b[?2004l";

/// Ring the bell.
#[inline]
pub fn bell<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(BEL)
}

/// CUP: move the cursor. Input is 0-indexed, the wire is 1-indexed.
pub fn cup<W: Write>(w: &mut W, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", y + 1, x + 1)
}

/// ED 2: erase the entire display.
#[inline]
pub fn erase_display<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(ERASE_DISPLAY)
}

/// Show or hide the cursor.
#[inline]
pub fn cursor_visible<W: Write>(w: &mut W, visible: bool) -> io::Result<()> {
    w.write_all(if visible { CURSOR_SHOW } else { CURSOR_HIDE })
}

/// DECSCUSR: set the cursor style (1..=6, or 0 for the default).
pub fn cursor_style<W: Write>(w: &mut W, param: u8) -> io::Result<()> {
    write!(w, "\x1b[{param} q")
}

/// Query the cursor position; the reply arrives as `CSI row ; col R`.
#[inline]
pub fn cursor_position_query<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(CURSOR_POSITION_QUERY)
}

/// Switch the alternate screen buffer on or off.
#[inline]
pub fn alternate_screen<W: Write>(w: &mut W, on: bool) -> io::Result<()> {
    w.write_all(if on { ALT_SCREEN_ENTER } else { ALT_SCREEN_LEAVE })
}

/// Switch auto-wrap on or off.
#[inline]
pub fn line_wrap<W: Write>(w: &mut W, on: bool) -> io::Result<()> {
    w.write_all(if on { WRAP_ENABLE } else { WRAP_DISABLE })
}

/// Switch mouse tracking on or off.
#[inline]
pub fn mouse_tracking<W: Write>(w: &mut W, on: bool) -> io::Result<()> {
    w.write_all(if on { MOUSE_ENABLE } else { MOUSE_DISABLE })
}

/// Switch focus reporting on or off.
#[inline]
pub fn focus_tracking<W: Write>(w: &mut W, on: bool) -> io::Result<()> {
    w.write_all(if on { FOCUS_ENABLE } else { FOCUS_DISABLE })
}

/// Switch bracketed paste on or off.
#[inline]
pub fn bracketed_paste<W: Write>(w: &mut W, on: bool) -> io::Result<()> {
    w.write_all(if on {
        BRACKETED_PASTE_ENABLE
    } else {
        BRACKETED_PASTE_DISABLE
    })
}

/// OSC 0: set the window title.
pub fn window_title<W: Write>(w: &mut W, title: &str) -> io::Result<()> {
    write!(w, "\x1b]0;{title}\x07")
}

/// OSC 1: set the icon name.
pub fn icon_name<W: Write>(w: &mut W, icon: &str) -> io::Result<()> {
    write!(w, "\x1b]1;{icon}\x07")
}

/// XTWINOPS 8: ask the terminal to resize to `rows` × `cols`.
pub fn window_size<W: Write>(w: &mut W, rows: u16, cols: u16) -> io::Result<()> {
    write!(w, "\x1b[8;{rows};{cols}t")
}

/// SGR with a pre-assembled parameter list.
pub fn sgr<W: Write>(w: &mut W, params: &str) -> io::Result<()> {
    write!(w, "\x1b[{params}m")
}

/// SGR reset.
#[inline]
pub fn sgr_reset<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(SGR_RESET)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_bytes<F: FnOnce(&mut Vec<u8>) -> io::Result<()>>(f: F) -> Vec<u8> {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        buf
    }

    #[test]
    fn cup_is_1_indexed() {
        assert_eq!(to_bytes(|w| cup(w, 0, 0)), b"\x1b[1;1H");
        assert_eq!(to_bytes(|w| cup(w, 79, 23)), b"\x1b[24;80H");
    }

    #[test]
    fn cursor_visibility() {
        assert_eq!(to_bytes(|w| cursor_visible(w, true)), b"\x1b[?25h");
        assert_eq!(to_bytes(|w| cursor_visible(w, false)), b"\x1b[?25l");
    }

    #[test]
    fn cursor_style_has_space_intermediate() {
        assert_eq!(to_bytes(|w| cursor_style(w, 4)), b"\x1b[4 q");
    }

    #[test]
    fn mode_toggles() {
        assert_eq!(to_bytes(|w| alternate_screen(w, true)), b"\x1b[?1049h");
        assert_eq!(to_bytes(|w| alternate_screen(w, false)), b"\x1b[?1049l");
        assert_eq!(to_bytes(|w| line_wrap(w, false)), b"\x1b[?7l");
        assert_eq!(to_bytes(|w| mouse_tracking(w, true)), b"\x1b[?1003;1006h");
        assert_eq!(to_bytes(|w| focus_tracking(w, true)), b"\x1b[?1004h");
        assert_eq!(to_bytes(|w| bracketed_paste(w, false)), b"\x1b[?2004l");
    }

    #[test]
    fn osc_titles_are_bel_terminated() {
        assert_eq!(to_bytes(|w| window_title(w, "hello")), b"\x1b]0;hello\x07");
        assert_eq!(to_bytes(|w| icon_name(w, "icon")), b"\x1b]1;icon\x07");
    }

    #[test]
    fn window_size_request() {
        assert_eq!(to_bytes(|w| window_size(w, 24, 80)), b"\x1b[8;24;80t");
    }

    #[test]
    fn sgr_assembly() {
        assert_eq!(to_bytes(|w| sgr(w, "0;31")), b"\x1b[0;31m");
        assert_eq!(to_bytes(sgr_reset), b"\x1b[0m");
    }

    #[test]
    fn erase_and_query() {
        assert_eq!(to_bytes(erase_display), b"\x1b[2J");
        assert_eq!(to_bytes(cursor_position_query), b"\x1b[6n");
    }

    #[test]
    fn all_constants_are_ascii() {
        for seq in [
            BEL,
            ERASE_DISPLAY,
            SGR_RESET,
            CURSOR_POSITION_QUERY,
            CURSOR_SHOW,
            CURSOR_HIDE,
            ALT_SCREEN_ENTER,
            ALT_SCREEN_LEAVE,
            WRAP_ENABLE,
            WRAP_DISABLE,
            MOUSE_ENABLE,
            MOUSE_DISABLE,
            FOCUS_ENABLE,
            FOCUS_DISABLE,
            BRACKETED_PASTE_ENABLE,
            BRACKETED_PASTE_DISABLE,
        ] {
            assert!(seq.iter().all(|&b| b < 0x80));
        }
    }
}
