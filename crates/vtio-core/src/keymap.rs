#![forbid(unsafe_code)]

//! Keystroke classification.
//!
//! Turns decoded text (after the structured handlers have had their
//! chance) into [`InputEvent`]s: named control keys, ctrl-letter codes,
//! ESC-meta combinations, CSI/SS3 function-key sequences with xterm
//! modifier parameters, and the rxvt/cygwin/putty variants. Escape
//! sequences that parse as CSI but match no known key surface as
//! [`InputEvent::Unhandled`] instead of leaking into text.

use unicode_segmentation::UnicodeSegmentation;

use crate::event::{InputEvent, Key, KeyEvent, Modifiers};

const ESC: char = '\x1b';

/// Classify `text` into events, appending to `events`.
pub(crate) fn classify_into(text: &str, events: &mut Vec<InputEvent>) {
    let mut rest = text;
    while !rest.is_empty() {
        let consumed = classify_step(rest, events);
        debug_assert!(consumed > 0, "classifier must always make progress");
        rest = &rest[consumed..];
    }
}

/// Classify one key stroke / grapheme at the head of `rest`.
///
/// Returns the number of bytes consumed.
fn classify_step(rest: &str, events: &mut Vec<InputEvent>) -> usize {
    let mut chars = rest.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return 0,
    };

    if first == ESC {
        return classify_escape(rest, events);
    }

    if first.is_ascii() {
        events.push(ascii_event(first as u8, Modifiers::empty()));
        return 1;
    }

    // C1 controls fall through every table.
    if ('\u{80}'..='\u{9f}').contains(&first) {
        events.push(InputEvent::Unhandled(first.to_string()));
        return first.len_utf8();
    }

    // Printable non-ASCII: take the whole grapheme cluster.
    let grapheme = rest.graphemes(true).next().unwrap_or(rest);
    events.push(InputEvent::Text(grapheme.to_string()));
    grapheme.len()
}

/// Classify input starting with ESC.
fn classify_escape(rest: &str, events: &mut Vec<InputEvent>) -> usize {
    debug_assert!(rest.starts_with(ESC));
    let tail = &rest[1..];

    // Recognized CSI/SS3 key sequences take precedence over ESC-as-meta.
    if let Some((len, event)) = match_key_sequence(tail) {
        events.push(InputEvent::Key(event));
        return 1 + len;
    }

    let mut tail_chars = tail.chars();
    match tail_chars.next() {
        // Lone ESC at end of chunk.
        None => {
            events.push(InputEvent::Key(KeyEvent::new(Key::Escape)));
            1
        }
        // ESC + control code: same key with meta.
        Some(c) if (c as u32) < 0x20 || c == '\x7f' => {
            events.push(ascii_event(c as u8, Modifiers::META));
            2
        }
        // Unrecognized CSI: swallow parameter/intermediate/final bytes.
        Some('[') => match match_generic_csi(tail) {
            Some(len) => {
                events.push(InputEvent::Unhandled(rest[..1 + len].to_string()));
                1 + len
            }
            None => {
                // "ESC [" with no final byte yet; treat as meta-[.
                events.push(InputEvent::Key(
                    KeyEvent::new(Key::Char('[')).with_modifiers(Modifiers::META),
                ));
                2
            }
        },
        // ESC + printable ASCII: meta, plus shift for uppercase.
        Some(c) if c.is_ascii_graphic() || c == ' ' => {
            events.push(ascii_event(c as u8, Modifiers::META));
            2
        }
        // ESC before non-ASCII text: the ESC stands alone.
        Some(_) => {
            events.push(InputEvent::Key(KeyEvent::new(Key::Escape)));
            1
        }
    }
}

/// Map a single ASCII byte (plus accumulated modifiers) to an event.
fn ascii_event(byte: u8, extra: Modifiers) -> InputEvent {
    let (key, mut mods) = match byte {
        b'\r' if extra.contains(Modifiers::META) => (Key::Enter, Modifiers::empty()),
        b'\r' => (Key::CarriageReturn, Modifiers::empty()),
        b'\n' => (Key::Enter, Modifiers::empty()),
        b'\t' => (Key::Tab, Modifiers::empty()),
        0x1b => (Key::Escape, Modifiers::empty()),
        0x08 | 0x7f => (Key::Backspace, Modifiers::empty()),
        b' ' => (Key::Space, Modifiers::empty()),
        0x00 => (Key::Space, Modifiers::CTRL),
        // Ctrl+A .. Ctrl+Z (minus the named controls above).
        0x01..=0x1a => (
            Key::Char((b'a' + byte - 1) as char),
            Modifiers::CTRL,
        ),
        0x1c => (Key::Char('\\'), Modifiers::CTRL),
        0x1d => (Key::Char(']'), Modifiers::CTRL),
        0x1e => (Key::Char('^'), Modifiers::CTRL),
        0x1f => (Key::Char('_'), Modifiers::CTRL),
        b'A'..=b'Z' => (
            Key::Char(byte.to_ascii_lowercase() as char),
            Modifiers::SHIFT,
        ),
        _ => (Key::Char(byte as char), Modifiers::empty()),
    };
    mods |= extra;
    InputEvent::Key(KeyEvent::new(key).with_modifiers(mods))
}

/// Match a CSI/SS3 key sequence at the head of `tail` (the text after ESC).
///
/// Returns the byte length consumed from `tail` and the decoded event.
fn match_key_sequence(tail: &str) -> Option<(usize, KeyEvent)> {
    let bytes = tail.as_bytes();
    match bytes.first()? {
        b'O' => match_ss3(bytes),
        b'[' => match_csi_key(bytes),
        _ => None,
    }
}

/// SS3 sequences: `ESC O <final>`.
fn match_ss3(bytes: &[u8]) -> Option<(usize, KeyEvent)> {
    let final_byte = *bytes.get(1)?;
    let event = match final_byte {
        b'P'..=b'S' => KeyEvent::new(Key::F(final_byte - b'P' + 1)),
        b'A' => KeyEvent::new(Key::Up),
        b'B' => KeyEvent::new(Key::Down),
        b'C' => KeyEvent::new(Key::Right),
        b'D' => KeyEvent::new(Key::Left),
        b'E' => KeyEvent::new(Key::Clear),
        b'F' => KeyEvent::new(Key::End),
        b'H' => KeyEvent::new(Key::Home),
        // rxvt: ctrl-modified arrows/clear.
        b'a'..=b'e' => {
            let key = rxvt_letter_key(final_byte)?;
            KeyEvent::new(key).with_modifiers(Modifiers::CTRL)
        }
        // Application keypad digits.
        b'p'..=b'y' => KeyEvent::new(Key::Keypad(final_byte - b'p')),
        _ => return None,
    };
    Some((2, event))
}

fn rxvt_letter_key(byte: u8) -> Option<Key> {
    match byte {
        b'a' => Some(Key::Up),
        b'b' => Some(Key::Down),
        b'c' => Some(Key::Right),
        b'd' => Some(Key::Left),
        b'e' => Some(Key::Clear),
        _ => None,
    }
}

/// CSI key sequences: `ESC [ …`.
fn match_csi_key(bytes: &[u8]) -> Option<(usize, KeyEvent)> {
    debug_assert_eq!(bytes.first(), Some(&b'['));

    // Cygwin `ESC [ [ A..E` (F1..F5) and putty `ESC [ [ 5~ / 6~`.
    if bytes.get(1) == Some(&b'[') {
        return match bytes.get(2)? {
            c @ b'A'..=b'E' => Some((3, KeyEvent::new(Key::F(c - b'A' + 1)))),
            b'5' if bytes.get(3) == Some(&b'~') => {
                Some((4, KeyEvent::new(Key::PageUp)))
            }
            b'6' if bytes.get(3) == Some(&b'~') => {
                Some((4, KeyEvent::new(Key::PageDown)))
            }
            _ => None,
        };
    }

    // Collect numeric parameters separated by ';'.
    let mut idx = 1;
    let mut params: [u32; 2] = [0, 0];
    let mut param_count = 0usize;
    let mut digits_seen = false;
    while idx < bytes.len() {
        match bytes[idx] {
            b @ b'0'..=b'9' => {
                if !digits_seen {
                    digits_seen = true;
                    if param_count < 2 {
                        param_count += 1;
                    }
                }
                if param_count <= 2 {
                    let slot = &mut params[param_count - 1];
                    *slot = slot.saturating_mul(10) + u32::from(b - b'0');
                }
                idx += 1;
            }
            b';' => {
                if !digits_seen || param_count >= 2 {
                    return None;
                }
                digits_seen = false;
                idx += 1;
            }
            _ => break,
        }
    }
    let final_byte = *bytes.get(idx)?;
    let consumed = idx + 1;

    let modifier = if param_count == 2 { params[1] } else { 1 };
    if !(1..=16).contains(&modifier) {
        return None;
    }
    let mods = xterm_modifiers(modifier);

    let event = match final_byte {
        // Arrows / clear / end / home, optionally `1;m`-prefixed.
        b'A'..=b'F' | b'H' => {
            if param_count == 1 || (param_count == 2 && params[0] != 1) {
                return None;
            }
            let key = match final_byte {
                b'A' => Key::Up,
                b'B' => Key::Down,
                b'C' => Key::Right,
                b'D' => Key::Left,
                b'E' => Key::Clear,
                b'F' => Key::End,
                _ => Key::Home,
            };
            KeyEvent::new(key).with_modifiers(mods)
        }
        // xterm F1..F4 as `CSI P..S` / `CSI 1;m P..S`.
        b'P'..=b'S' => {
            if param_count == 1 || (param_count == 2 && params[0] != 1) {
                return None;
            }
            KeyEvent::new(Key::F(final_byte - b'P' + 1)).with_modifiers(mods)
        }
        b'Z' => {
            if param_count != 0 {
                return None;
            }
            KeyEvent::new(Key::Tab).with_modifiers(Modifiers::SHIFT)
        }
        // rxvt shift-modified arrows/clear.
        b'a'..=b'e' => {
            if param_count != 0 {
                return None;
            }
            let key = rxvt_letter_key(final_byte)?;
            KeyEvent::new(key).with_modifiers(Modifiers::SHIFT)
        }
        b'~' => {
            if param_count == 0 {
                return None;
            }
            let key = tilde_key(params[0])?;
            KeyEvent::new(key).with_modifiers(mods)
        }
        // rxvt shift (`$`) and ctrl (`^`) suffixes on navigation keys.
        b'$' | b'^' => {
            if param_count != 1 || !(2..=8).contains(&params[0]) {
                return None;
            }
            let key = tilde_key(params[0])?;
            let implied = if final_byte == b'$' {
                Modifiers::SHIFT
            } else {
                Modifiers::CTRL
            };
            KeyEvent::new(key).with_modifiers(implied)
        }
        _ => return None,
    };

    Some((consumed, event))
}

/// The `CSI n ~` navigation / function-key table.
fn tilde_key(n: u32) -> Option<Key> {
    let key = match n {
        1 => Key::Home,
        2 => Key::Insert,
        3 => Key::Delete,
        4 => Key::End,
        5 => Key::PageUp,
        6 => Key::PageDown,
        // rxvt aliases.
        7 => Key::Home,
        8 => Key::End,
        11 => Key::F(1),
        12 => Key::F(2),
        13 => Key::F(3),
        14 => Key::F(4),
        15 => Key::F(5),
        17 => Key::F(6),
        18 => Key::F(7),
        19 => Key::F(8),
        20 => Key::F(9),
        21 => Key::F(10),
        23 => Key::F(11),
        24 => Key::F(12),
        _ => return None,
    };
    Some(key)
}

/// Decode the xterm modifier parameter (1..=16).
///
/// After subtracting 1: bit 0 is shift, bit 2 is ctrl, bits 1 and 3 both
/// report meta (alt and the meta key proper).
fn xterm_modifiers(param: u32) -> Modifiers {
    let bits = param.saturating_sub(1);
    let mut mods = Modifiers::empty();
    if bits & 0b0001 != 0 {
        mods |= Modifiers::SHIFT;
    }
    if bits & 0b0100 != 0 {
        mods |= Modifiers::CTRL;
    }
    if bits & 0b1010 != 0 {
        mods |= Modifiers::META;
    }
    mods
}

/// Match a generic CSI sequence (`[` + parameter bytes + intermediate
/// bytes + final byte) at the head of `tail`. Returns its byte length.
fn match_generic_csi(tail: &str) -> Option<usize> {
    let bytes = tail.as_bytes();
    if bytes.first() != Some(&b'[') {
        return None;
    }
    let mut idx = 1;
    while idx < bytes.len() && (0x30..=0x3f).contains(&bytes[idx]) {
        idx += 1;
    }
    while idx < bytes.len() && (0x20..=0x2f).contains(&bytes[idx]) {
        idx += 1;
    }
    match bytes.get(idx) {
        Some(b) if (0x40..=0x7e).contains(b) => Some(idx + 1),
        _ => None,
    }
}
