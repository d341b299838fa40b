#![forbid(unsafe_code)]

//! Streaming input decoder.
//!
//! Consumes the terminal byte stream as arbitrary-sized chunks and
//! classifies each chunk into [`InputEvent`]s. Structured reports are
//! tried first, in a fixed cascade: bracketed paste, focus, cursor
//! position, device attributes, mouse. A chunk consumed by one of these
//! handlers additionally yields a trailing [`InputEvent::RawProcessed`]
//! so listeners can account for every byte. Anything else goes to the
//! keystroke classifier.
//!
//! # Time
//!
//! The only multi-chunk state is the bracketed-paste accumulator, guarded
//! by a deadline. The decoder never reads the clock on its own: `feed_at`
//! and `poll_paste` take the current instant, and the caller arms a timer
//! from [`InputDecoder::paste_deadline`]. `feed` is the convenience entry
//! point that stamps chunks with `Instant::now()`.
//!
//! # Paste-mode quirk
//!
//! A `201~` terminator emits the accumulated paste but leaves the decoder
//! in paste mode with no armed deadline; the next chunk re-arms it and
//! only deadline expiry returns to idle. A stray `201~` at the end of an
//! idle chunk surfaces as `Unhandled` before the rest of the chunk is
//! classified. Both behaviours are contractual; tests depend on them.

use std::mem;
use std::time::{Duration, Instant};

use smallvec::SmallVec;

use crate::event::{
    AttributesKind, ButtonState, DeviceAttributes, InputEvent, MouseButton, MouseEvent,
    MouseKind, PasteEvent,
};
use crate::geometry::{Offset, Position};
use crate::keymap;

const PASTE_START: &str = "\x1b[200~";
const PASTE_END: &str = "\x1b[201~";

/// Decoder configuration.
#[derive(Debug, Clone, Copy)]
pub struct DecoderOptions {
    /// How long an unterminated paste may sit idle before it is flushed.
    pub paste_timeout: Duration,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            paste_timeout: Duration::from_millis(50),
        }
    }
}

/// Streaming decoder for terminal input.
#[derive(Debug)]
pub struct InputDecoder {
    options: DecoderOptions,
    /// Paste state; see the module docs for the lifecycle.
    in_paste: bool,
    paste_buffer: String,
    paste_deadline: Option<Instant>,
    /// Armed by the caller after a `CSI 6 n` query.
    awaiting_cursor_report: bool,
    /// Remembered button for releases that do not name one.
    last_pressed_button: Option<MouseButton>,
}

impl Default for InputDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl InputDecoder {
    /// Create a decoder with the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(DecoderOptions::default())
    }

    /// Create a decoder with explicit options.
    #[must_use]
    pub fn with_options(options: DecoderOptions) -> Self {
        Self {
            options,
            in_paste: false,
            paste_buffer: String::new(),
            paste_deadline: None,
            awaiting_cursor_report: false,
            last_pressed_button: None,
        }
    }

    /// Feed a chunk of input, stamping it with the current time.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<InputEvent> {
        self.feed_at(chunk, Instant::now())
    }

    /// Feed a chunk of input observed at `now`.
    pub fn feed_at(&mut self, chunk: &[u8], now: Instant) -> Vec<InputEvent> {
        let mut events = Vec::new();
        if chunk.is_empty() {
            return events;
        }

        let text = decode_chunk(chunk);

        if self.try_paste(&text, now, &mut events)
            || self.try_focus(&text, &mut events)
            || self.try_cursor_report(&text, &mut events)
            || self.try_device_attributes(&text, &mut events)
            || self.try_mouse(chunk, &mut events)
        {
            events.push(InputEvent::RawProcessed(text));
            return events;
        }

        // A terminator with no opener: flag it, classify the rest.
        let remainder = match text.strip_suffix(PASTE_END) {
            Some(prefix) => {
                events.push(InputEvent::Unhandled(PASTE_END.to_string()));
                prefix
            }
            None => &text,
        };

        keymap::classify_into(remainder, &mut events);
        events
    }

    /// The instant at which an unterminated paste will be flushed.
    #[must_use]
    pub fn paste_deadline(&self) -> Option<Instant> {
        self.paste_deadline
    }

    /// Flush the paste accumulator if its deadline has passed.
    ///
    /// Returns the flushed paste event, if any. Expiry always returns the
    /// decoder to idle; an empty accumulator flushes silently.
    pub fn poll_paste(&mut self, now: Instant) -> Option<InputEvent> {
        let deadline = self.paste_deadline?;
        if now < deadline {
            return None;
        }
        self.paste_deadline = None;
        self.in_paste = false;
        if self.paste_buffer.is_empty() {
            return None;
        }
        let text = mem::take(&mut self.paste_buffer);
        Some(InputEvent::Paste(PasteEvent::bracketed(text)))
    }

    /// Arm the cursor-report flag; the next full-chunk `CSI y ; x R`
    /// will be consumed as a [`InputEvent::CursorReport`].
    pub fn expect_cursor_report(&mut self) {
        self.awaiting_cursor_report = true;
    }

    /// Whether a cursor-position query is outstanding.
    #[must_use]
    pub fn awaiting_cursor_report(&self) -> bool {
        self.awaiting_cursor_report
    }

    /// Cancel paste state and deadline (teardown path).
    pub fn reset(&mut self) {
        self.in_paste = false;
        self.paste_buffer.clear();
        self.paste_deadline = None;
        self.awaiting_cursor_report = false;
        self.last_pressed_button = None;
    }

    // ── Bracketed paste ──────────────────────────────────────────────

    fn try_paste(&mut self, text: &str, now: Instant, events: &mut Vec<InputEvent>) -> bool {
        if self.in_paste {
            // Any chunk cancels the pending deadline.
            self.paste_deadline = None;
            match text.strip_suffix(PASTE_END) {
                Some(body) => {
                    self.paste_buffer.push_str(body);
                    let content = mem::take(&mut self.paste_buffer);
                    events.push(InputEvent::Paste(PasteEvent::bracketed(content)));
                    // Deliberately stays in paste mode; see module docs.
                }
                None => {
                    self.paste_buffer.push_str(text);
                    self.paste_deadline = Some(now + self.options.paste_timeout);
                }
            }
            return true;
        }

        let Some(rest) = text.strip_prefix(PASTE_START) else {
            return false;
        };
        self.in_paste = true;
        self.paste_buffer.clear();
        match rest.strip_suffix(PASTE_END) {
            Some(body) => {
                events.push(InputEvent::Paste(PasteEvent::bracketed(body)));
            }
            None => {
                self.paste_buffer.push_str(rest);
                self.paste_deadline = Some(now + self.options.paste_timeout);
            }
        }
        true
    }

    // ── Focus ────────────────────────────────────────────────────────

    /// The first `CSI I` / `CSI O` anywhere in the chunk wins; the rest
    /// of the chunk is dropped (contractual lossy behaviour).
    fn try_focus(&mut self, text: &str, events: &mut Vec<InputEvent>) -> bool {
        let gained = text.find("\x1b[I");
        let lost = text.find("\x1b[O");
        let first = match (gained, lost) {
            (Some(g), Some(l)) => Some(g < l),
            (Some(_), None) => Some(true),
            (None, Some(_)) => Some(false),
            (None, None) => None,
        };
        match first {
            Some(gained) => {
                events.push(InputEvent::Focus(gained));
                true
            }
            None => false,
        }
    }

    // ── Cursor position report ───────────────────────────────────────

    fn try_cursor_report(&mut self, text: &str, events: &mut Vec<InputEvent>) -> bool {
        if !self.awaiting_cursor_report {
            return false;
        }
        let Some(body) = text
            .strip_prefix("\x1b[")
            .and_then(|t| t.strip_suffix('R'))
        else {
            return false;
        };
        let mut parts = body.splitn(2, ';');
        let (Some(row), Some(col)) = (parts.next(), parts.next()) else {
            return false;
        };
        let (Ok(row), Ok(col)) = (row.parse::<i32>(), col.parse::<i32>()) else {
            return false;
        };
        self.awaiting_cursor_report = false;
        events.push(InputEvent::CursorReport(Position::new(col - 1, row - 1)));
        true
    }

    // ── Device attributes ────────────────────────────────────────────

    fn try_device_attributes(&mut self, text: &str, events: &mut Vec<InputEvent>) -> bool {
        let Some(body) = text
            .strip_prefix("\x1b[")
            .and_then(|t| t.strip_suffix('c'))
        else {
            return false;
        };
        let (kind, params) = match body.as_bytes().first() {
            Some(b'?') => (AttributesKind::Primary, &body[1..]),
            Some(b'>') => (AttributesKind::Secondary, &body[1..]),
            _ => return false,
        };
        let mut values = Vec::new();
        for part in params.split(';') {
            match part.parse::<u32>() {
                Ok(v) => values.push(v),
                Err(_) => return false,
            }
        }
        if values.is_empty() {
            return false;
        }
        events.push(InputEvent::DeviceAttributes(DeviceAttributes {
            kind,
            device_type: values[0],
            version: values.get(1).copied().unwrap_or(0),
            extra: values.get(2..).unwrap_or_default().to_vec(),
        }));
        true
    }

    // ── Mouse ────────────────────────────────────────────────────────

    /// Greedy mouse decode: the chunk is split on ESC and consumed only
    /// if every segment parses as exactly one mouse report.
    fn try_mouse(&mut self, chunk: &[u8], events: &mut Vec<InputEvent>) -> bool {
        let mut reports: SmallVec<[MouseReport; 4]> = SmallVec::new();
        let mut rest = chunk;
        while !rest.is_empty() {
            if rest[0] != 0x1b {
                return false;
            }
            let end = rest[1..]
                .iter()
                .position(|&b| b == 0x1b)
                .map_or(rest.len(), |i| i + 1);
            let segment = &rest[1..end];
            match parse_mouse_segment(segment) {
                Some(report) => reports.push(report),
                None => return false,
            }
            rest = &rest[end..];
        }
        if reports.is_empty() {
            return false;
        }
        for report in reports {
            events.push(InputEvent::Mouse(self.resolve_report(report)));
        }
        true
    }

    /// Turn a parsed report into an event, tracking the pressed button
    /// so button-less releases can be attributed.
    fn resolve_report(&mut self, report: MouseReport) -> MouseEvent {
        match report {
            MouseReport::Direct(event) => {
                if let MouseKind::Press { button, state } = event.kind {
                    match state {
                        ButtonState::Pressed => self.last_pressed_button = Some(button),
                        ButtonState::Released => self.last_pressed_button = None,
                    }
                }
                event
            }
            MouseReport::Encoded {
                bits,
                position,
                released,
            } => {
                let decoded = ButtonBits::decode(bits);
                let kind = if let Some(vector) = decoded.scroll {
                    MouseKind::Scroll { vector }
                } else if decoded.motion {
                    MouseKind::Motion {
                        button: decoded.button,
                    }
                } else {
                    let released = released.unwrap_or(decoded.button.is_none());
                    match decoded.button {
                        Some(button) => {
                            if released {
                                self.last_pressed_button = None;
                            } else {
                                self.last_pressed_button = Some(button);
                            }
                            MouseKind::Press {
                                button,
                                state: if released {
                                    ButtonState::Released
                                } else {
                                    ButtonState::Pressed
                                },
                            }
                        }
                        None => match self.last_pressed_button.take() {
                            Some(button) => MouseKind::Press {
                                button,
                                state: ButtonState::Released,
                            },
                            None => MouseKind::Motion { button: None },
                        },
                    }
                };
                MouseEvent::new(position, kind).with_modifiers(decoded.modifiers)
            }
        }
    }
}

/// Decode a chunk to text, tolerating malformed UTF-8.
///
/// A lone byte with the high bit set is the legacy 8-bit-meta encoding
/// and is rewritten as `ESC` plus the 7-bit character.
fn decode_chunk(chunk: &[u8]) -> String {
    if chunk.len() == 1 && chunk[0] >= 0x80 {
        let mut text = String::with_capacity(2);
        text.push('\x1b');
        text.push((chunk[0] & 0x7f) as char);
        return text;
    }
    String::from_utf8_lossy(chunk).into_owned()
}

/// One mouse report parsed out of a chunk segment.
enum MouseReport {
    /// X10/URXVT/SGR style: a button byte plus coordinates.
    Encoded {
        bits: u32,
        position: Position,
        /// SGR carries press/release in the final byte; `None` means
        /// derive it from the button bits.
        released: Option<bool>,
    },
    /// DEC locator and VT300 reports name the action outright.
    Direct(MouseEvent),
}

/// Decoded button byte fields.
struct ButtonBits {
    button: Option<MouseButton>,
    scroll: Option<Offset>,
    motion: bool,
    modifiers: crate::event::Modifiers,
}

impl ButtonBits {
    /// Split a button value into button group, modifiers and motion flag.
    ///
    /// Bits: 0-1 low button, 2 shift, 3 meta, 4 ctrl, 5 motion,
    /// 6 scroll group (buttons 4..7), 7 extra group (buttons 8..11).
    /// The groups are mutually exclusive; a plain value of 3 is a
    /// release that does not name its button.
    fn decode(bits: u32) -> Self {
        use crate::event::Modifiers;

        let low = bits & 3;
        let mut modifiers = Modifiers::empty();
        if bits & 4 != 0 {
            modifiers |= Modifiers::SHIFT;
        }
        if bits & 8 != 0 {
            modifiers |= Modifiers::META;
        }
        if bits & 16 != 0 {
            modifiers |= Modifiers::CTRL;
        }
        let motion = bits & 32 != 0;

        if bits & 64 != 0 {
            let vector = match low {
                0 => Offset::new(0, -1),
                1 => Offset::new(0, 1),
                2 => Offset::new(1, 0),
                _ => Offset::new(-1, 0),
            };
            return Self {
                button: None,
                scroll: Some(vector),
                motion,
                modifiers,
            };
        }

        let button = if bits & 128 != 0 {
            Some(MouseButton::Extra(8 + low as u8))
        } else {
            match low {
                0 => Some(MouseButton::Left),
                1 => Some(MouseButton::Middle),
                2 => Some(MouseButton::Right),
                _ => None,
            }
        };

        Self {
            button,
            scroll: None,
            motion,
            modifiers,
        }
    }
}

/// Parse one ESC-delimited segment as a mouse report.
///
/// The segment excludes the leading ESC byte.
fn parse_mouse_segment(segment: &[u8]) -> Option<MouseReport> {
    let body = segment.strip_prefix(b"[")?;
    match body.first()? {
        b'M' => parse_x10(&body[1..]),
        b'<' => parse_sgr(&body[1..]),
        b'0'..=b'9' => parse_numeric(body),
        _ => None,
    }
}

/// X10 report: three values after `CSI M`, each offset by 32.
///
/// DECSET 1005 widens values past 0x7F by UTF-8 encoding them; a lone
/// trailing byte is taken verbatim so a raw `0xFF` still reads as 255.
fn parse_x10(body: &[u8]) -> Option<MouseReport> {
    let mut idx = 0usize;
    let b = take_wide_value(body, &mut idx)?;
    let x = take_wide_value(body, &mut idx)?;
    let y = take_wide_value(body, &mut idx)?;
    if idx != body.len() {
        return None;
    }

    let bits = (b as i64 - 32).max(0) as u32;
    Some(MouseReport::Encoded {
        bits,
        position: Position::new(repair_coord(x) - 1, repair_coord(y) - 1),
        released: None,
    })
}

/// Read one possibly-UTF-8-widened coordinate value.
fn take_wide_value(body: &[u8], idx: &mut usize) -> Option<u32> {
    let first = *body.get(*idx)?;
    if first < 0x80 {
        *idx += 1;
        return Some(first as u32);
    }
    // Try a UTF-8 scalar (DECSET 1005 allows coordinates up to 999,
    // which fit in two bytes).
    let len = if first >= 0xf0 {
        4
    } else if first >= 0xe0 {
        3
    } else if first >= 0xc0 {
        2
    } else {
        1
    };
    if len > 1 {
        if let Some(bytes) = body.get(*idx..*idx + len) {
            if let Ok(s) = std::str::from_utf8(bytes) {
                if let Some(c) = s.chars().next() {
                    *idx += len;
                    return Some(c as u32);
                }
            }
        }
    }
    // Malformed: take the byte verbatim.
    *idx += 1;
    Some(first as u32)
}

/// Apply the X10 coordinate rules: subtract 32, a raw 32 means 255,
/// and a wrapped (negative) value is repaired with `+0xff`.
fn repair_coord(value: u32) -> i32 {
    let coord = value as i64 - 32;
    if coord == 0 {
        return 255;
    }
    if coord < 0 {
        return (coord + 0xff) as i32;
    }
    coord as i32
}

/// SGR report: `CSI < b ; x ; y M|m`, or the DEC locator `&w` form.
fn parse_sgr(body: &[u8]) -> Option<MouseReport> {
    if body.ends_with(b"&w") {
        return parse_dec_locator(&body[..body.len() - 2]);
    }
    let (params, final_byte) = body.split_at(body.len().checked_sub(1)?);
    let released = match final_byte[0] {
        b'M' => false,
        b'm' => true,
        _ => return None,
    };
    let values = parse_params(params, 3)?;
    Some(MouseReport::Encoded {
        bits: values[0],
        position: Position::new(values[1] as i32 - 1, values[2] as i32 - 1),
        released: Some(released),
    })
}

/// URXVT (1015) `CSI b ; x ; y M`, or the VT300 bracket form.
fn parse_numeric(body: &[u8]) -> Option<MouseReport> {
    if let Some(report) = parse_vt300(body) {
        return Some(report);
    }
    if body.ends_with(b"&w") {
        return parse_dec_locator(&body[..body.len() - 2]);
    }
    let params = body.strip_suffix(b"M")?;
    let values = parse_params(params, 3)?;
    let bits = (values[0] as i64 - 32).max(0) as u32;
    Some(MouseReport::Encoded {
        bits,
        position: Position::new(values[1] as i32 - 1, values[2] as i32 - 1),
        released: None,
    })
}

/// DEC locator report: `event ; button-mask ; row ; col [; page]`.
///
/// Events 2/4/6/8 are presses and 3/5/7/9 releases of buttons
/// left/middle/right/extra; the mask parameter is not used.
fn parse_dec_locator(params: &[u8]) -> Option<MouseReport> {
    let values = parse_params_flexible(params, 4, 5)?;
    let event = values[0];
    if !(2..=9).contains(&event) {
        return None;
    }
    let position = Position::new(values[3] as i32 - 1, values[2] as i32 - 1);
    let button = match (event - 2) / 2 {
        0 => MouseButton::Left,
        1 => MouseButton::Middle,
        2 => MouseButton::Right,
        _ => MouseButton::Extra(8),
    };
    let state = if event % 2 == 0 {
        ButtonState::Pressed
    } else {
        ButtonState::Released
    };
    Some(MouseReport::Direct(MouseEvent::new(
        position,
        MouseKind::Press { button, state },
    )))
}

/// VT300 report: `CSI 24x~[x,y]CR` with `x` one of 1/3/5 for
/// press/release/motion of the left button.
fn parse_vt300(body: &[u8]) -> Option<MouseReport> {
    let rest = body.strip_prefix(b"24")?;
    let (action, rest) = rest.split_first()?;
    if !matches!(action, b'1' | b'3' | b'5') {
        return None;
    }
    let rest = rest.strip_prefix(b"~[")?;
    let rest = rest.strip_suffix(b"]\r")?;
    let mut parts = rest.splitn(2, |&b| b == b',');
    let x = parse_u32(parts.next()?)?;
    let y = parse_u32(parts.next()?)?;
    let position = Position::new(x as i32 - 1, y as i32 - 1);
    let kind = match action {
        b'1' => MouseKind::Press {
            button: MouseButton::Left,
            state: ButtonState::Pressed,
        },
        b'3' => MouseKind::Press {
            button: MouseButton::Left,
            state: ButtonState::Released,
        },
        _ => MouseKind::Motion { button: None },
    };
    Some(MouseReport::Direct(MouseEvent::new(position, kind)))
}

/// Parse exactly `count` `;`-separated decimal parameters.
fn parse_params(bytes: &[u8], count: usize) -> Option<SmallVec<[u32; 5]>> {
    parse_params_flexible(bytes, count, count)
}

/// Parse between `min` and `max` `;`-separated decimal parameters.
fn parse_params_flexible(
    bytes: &[u8],
    min: usize,
    max: usize,
) -> Option<SmallVec<[u32; 5]>> {
    let mut values: SmallVec<[u32; 5]> = SmallVec::new();
    for part in bytes.split(|&b| b == b';') {
        if values.len() == max {
            return None;
        }
        values.push(parse_u32(part)?);
    }
    if values.len() < min {
        return None;
    }
    Some(values)
}

fn parse_u32(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Key, KeyEvent, Modifiers};
    use std::time::{Duration, Instant};

    fn decoder_with_timeout(ms: u64) -> InputDecoder {
        InputDecoder::with_options(DecoderOptions {
            paste_timeout: Duration::from_millis(ms),
        })
    }

    fn strip_raw(events: Vec<InputEvent>) -> Vec<InputEvent> {
        events
            .into_iter()
            .filter(|e| !matches!(e, InputEvent::RawProcessed(_)))
            .collect()
    }

    #[test]
    fn plain_keystrokes_pass_through() {
        let mut decoder = InputDecoder::new();
        let events = decoder.feed(b"hi");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], InputEvent::Key(KeyEvent::new(Key::Char('h'))));
        assert_eq!(events[1], InputEvent::Key(KeyEvent::new(Key::Char('i'))));
    }

    #[test]
    fn eight_bit_meta_rewrite() {
        let mut decoder = InputDecoder::new();
        // 0xE1 = 0x80 | 'a'
        let events = decoder.feed(&[0xe1]);
        assert_eq!(
            events,
            vec![InputEvent::Key(
                KeyEvent::new(Key::Char('a')).with_modifiers(Modifiers::META)
            )]
        );
    }

    #[test]
    fn handled_chunk_emits_raw_processed() {
        let mut decoder = InputDecoder::new();
        let events = decoder.feed(b"\x1b[I");
        assert_eq!(
            events,
            vec![
                InputEvent::Focus(true),
                InputEvent::RawProcessed("\x1b[I".to_string()),
            ]
        );
    }

    #[test]
    fn focus_first_match_wins() {
        let mut decoder = InputDecoder::new();
        let events = strip_raw(decoder.feed(b"\x1b[O\x1b[I"));
        assert_eq!(events, vec![InputEvent::Focus(false)]);
    }

    // ── Bracketed paste ──────────────────────────────────────────────

    #[test]
    fn paste_split_across_chunks() {
        let mut decoder = decoder_with_timeout(50);
        let t0 = Instant::now();
        let events = decoder.feed_at(b"\x1b[200~start", t0);
        assert_eq!(strip_raw(events), vec![]);

        let events = decoder.feed_at(b"second", t0 + Duration::from_millis(5));
        assert_eq!(strip_raw(events), vec![]);

        let events = decoder.feed_at(b"end\x1b[201~", t0 + Duration::from_millis(10));
        assert_eq!(
            strip_raw(events),
            vec![InputEvent::Paste(PasteEvent::bracketed("startsecondend"))]
        );
    }

    #[test]
    fn paste_single_chunk() {
        let mut decoder = InputDecoder::new();
        let events = strip_raw(decoder.feed(b"\x1b[200~hello\x1b[201~"));
        assert_eq!(
            events,
            vec![InputEvent::Paste(PasteEvent::bracketed("hello"))]
        );
    }

    #[test]
    fn paste_timeout_flushes_and_terminator_goes_stray() {
        let mut decoder = decoder_with_timeout(10);
        let t0 = Instant::now();
        decoder.feed_at(b"\x1b[200~start", t0);
        decoder.feed_at(b"second", t0 + Duration::from_millis(5));

        // Deadline is re-armed from the second chunk.
        let deadline = decoder.paste_deadline().expect("deadline armed");
        assert_eq!(deadline, t0 + Duration::from_millis(15));

        let flushed = decoder.poll_paste(t0 + Duration::from_millis(20));
        assert_eq!(
            flushed,
            Some(InputEvent::Paste(PasteEvent::bracketed("startsecond")))
        );

        // The late terminator is now stray: flagged first, then the
        // prefix is classified as ordinary keystrokes.
        let events = decoder.feed_at(b"end\x1b[201~", t0 + Duration::from_millis(25));
        assert_eq!(
            events,
            vec![
                InputEvent::Unhandled(PASTE_END.to_string()),
                InputEvent::Key(KeyEvent::new(Key::Char('e'))),
                InputEvent::Key(KeyEvent::new(Key::Char('n'))),
                InputEvent::Key(KeyEvent::new(Key::Char('d'))),
            ]
        );
    }

    #[test]
    fn paste_stays_in_paste_mode_after_terminator() {
        let mut decoder = decoder_with_timeout(10);
        let t0 = Instant::now();
        let events = strip_raw(decoder.feed_at(b"\x1b[200~one\x1b[201~", t0));
        assert_eq!(
            events,
            vec![InputEvent::Paste(PasteEvent::bracketed("one"))]
        );
        // No deadline is armed by the terminator itself.
        assert_eq!(decoder.paste_deadline(), None);

        // Follow-up bytes keep accumulating until the deadline fires.
        let events = strip_raw(decoder.feed_at(b"two", t0 + Duration::from_millis(1)));
        assert_eq!(events, vec![]);
        let flushed = decoder.poll_paste(t0 + Duration::from_millis(20));
        assert_eq!(
            flushed,
            Some(InputEvent::Paste(PasteEvent::bracketed("two")))
        );

        // And expiry returned the decoder to idle.
        let events = decoder.feed_at(b"x", t0 + Duration::from_millis(21));
        assert_eq!(events, vec![InputEvent::Key(KeyEvent::new(Key::Char('x')))]);
    }

    #[test]
    fn empty_paste_expiry_is_silent() {
        let mut decoder = decoder_with_timeout(10);
        let t0 = Instant::now();
        // A bare opener arms the deadline with nothing accumulated.
        let events = strip_raw(decoder.feed_at(b"\x1b[200~", t0));
        assert_eq!(events, vec![]);
        assert!(decoder.paste_deadline().is_some());

        // Expiry flushes nothing but still returns the decoder to idle.
        assert_eq!(decoder.poll_paste(t0 + Duration::from_secs(1)), None);
        let events = decoder.feed_at(b"q", t0 + Duration::from_secs(2));
        assert_eq!(events, vec![InputEvent::Key(KeyEvent::new(Key::Char('q')))]);
    }

    #[test]
    fn paste_poll_before_deadline_is_noop() {
        let mut decoder = decoder_with_timeout(50);
        let t0 = Instant::now();
        decoder.feed_at(b"\x1b[200~x", t0);
        assert_eq!(decoder.poll_paste(t0 + Duration::from_millis(10)), None);
        assert!(decoder.paste_deadline().is_some());
    }

    // ── Cursor report ────────────────────────────────────────────────

    #[test]
    fn cursor_report_requires_armed_flag() {
        let mut decoder = InputDecoder::new();
        let events = decoder.feed(b"\x1b[5;10R");
        // Not awaited: surfaces as unhandled.
        assert_eq!(
            events,
            vec![InputEvent::Unhandled("\x1b[5;10R".to_string())]
        );

        decoder.expect_cursor_report();
        let events = strip_raw(decoder.feed(b"\x1b[5;10R"));
        assert_eq!(events, vec![InputEvent::CursorReport(Position::new(9, 4))]);
        assert!(!decoder.awaiting_cursor_report());
    }

    // ── Device attributes ────────────────────────────────────────────

    #[test]
    fn primary_device_attributes() {
        let mut decoder = InputDecoder::new();
        let events = strip_raw(decoder.feed(b"\x1b[?62;1;4c"));
        assert_eq!(
            events,
            vec![InputEvent::DeviceAttributes(DeviceAttributes {
                kind: AttributesKind::Primary,
                device_type: 62,
                version: 1,
                extra: vec![4],
            })]
        );
    }

    #[test]
    fn secondary_device_attributes() {
        let mut decoder = InputDecoder::new();
        let events = strip_raw(decoder.feed(b"\x1b[>41;351;0c"));
        assert_eq!(
            events,
            vec![InputEvent::DeviceAttributes(DeviceAttributes {
                kind: AttributesKind::Secondary,
                device_type: 41,
                version: 351,
                extra: vec![0],
            })]
        );
    }

    // ── Mouse ────────────────────────────────────────────────────────

    #[test]
    fn sgr_press_and_release() {
        let mut decoder = InputDecoder::new();
        let events = strip_raw(decoder.feed(b"\x1b[<0;1;1M"));
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::new(
                Position::new(0, 0),
                MouseKind::Press {
                    button: MouseButton::Left,
                    state: ButtonState::Pressed,
                },
            ))]
        );

        let events = strip_raw(decoder.feed(b"\x1b[<0;1;1m"));
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::new(
                Position::new(0, 0),
                MouseKind::Press {
                    button: MouseButton::Left,
                    state: ButtonState::Released,
                },
            ))]
        );
    }

    #[test]
    fn sgr_round_trip_all_fields() {
        let mut decoder = InputDecoder::new();
        // Button 2 (right), shift+ctrl (4+16=20 -> bits 22), at (10, 4).
        let events = strip_raw(decoder.feed(b"\x1b[<22;11;5M"));
        assert_eq!(
            events,
            vec![InputEvent::Mouse(
                MouseEvent::new(
                    Position::new(10, 4),
                    MouseKind::Press {
                        button: MouseButton::Right,
                        state: ButtonState::Pressed,
                    },
                )
                .with_modifiers(Modifiers::SHIFT | Modifiers::CTRL)
            )]
        );
    }

    #[test]
    fn sgr_scroll_wheel() {
        let mut decoder = InputDecoder::new();
        let events = strip_raw(decoder.feed(b"\x1b[<64;3;4M"));
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::new(
                Position::new(2, 3),
                MouseKind::Scroll {
                    vector: Offset::new(0, -1)
                },
            ))]
        );

        let events = strip_raw(decoder.feed(b"\x1b[<65;3;4M"));
        assert!(matches!(
            events[0],
            InputEvent::Mouse(MouseEvent {
                kind: MouseKind::Scroll {
                    vector: Offset { dx: 0, dy: 1 }
                },
                ..
            })
        ));
    }

    #[test]
    fn sgr_motion_and_drag() {
        let mut decoder = InputDecoder::new();
        // 35 = 32 (motion) + 3 (no button).
        let events = strip_raw(decoder.feed(b"\x1b[<35;2;2M"));
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::new(
                Position::new(1, 1),
                MouseKind::Motion { button: None },
            ))]
        );

        // 32 = motion with left button held (drag).
        let events = strip_raw(decoder.feed(b"\x1b[<32;2;2M"));
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::new(
                Position::new(1, 1),
                MouseKind::Motion {
                    button: Some(MouseButton::Left)
                },
            ))]
        );
    }

    #[test]
    fn x10_basic_press() {
        let mut decoder = InputDecoder::new();
        // b=0x20 (left press), x=y=0x21 (cell 1,1 -> position 0,0).
        let events = strip_raw(decoder.feed(b"\x1b[M\x20\x21\x21"));
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::new(
                Position::new(0, 0),
                MouseKind::Press {
                    button: MouseButton::Left,
                    state: ButtonState::Pressed,
                },
            ))]
        );
    }

    #[test]
    fn x10_release_uses_last_pressed_button() {
        let mut decoder = InputDecoder::new();
        decoder.feed(b"\x1b[M\x21\x21\x21"); // middle press
        let events = strip_raw(decoder.feed(b"\x1b[M\x23\x21\x21")); // release, button 3
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::new(
                Position::new(0, 0),
                MouseKind::Press {
                    button: MouseButton::Middle,
                    state: ButtonState::Released,
                },
            ))]
        );

        // A second anonymous release has nothing to attribute.
        let events = strip_raw(decoder.feed(b"\x1b[M\x23\x21\x21"));
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::new(
                Position::new(0, 0),
                MouseKind::Motion { button: None },
            ))]
        );
    }

    #[test]
    fn x10_wide_coordinates() {
        let mut decoder = InputDecoder::new();
        // Raw 0xFF bytes read verbatim: 255 - 32 = 223 -> position 222.
        let events = strip_raw(decoder.feed(b"\x1b[M\x20\xff\xff"));
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::new(
                Position::new(222, 222),
                MouseKind::Press {
                    button: MouseButton::Left,
                    state: ButtonState::Pressed,
                },
            ))]
        );
    }

    #[test]
    fn x10_utf8_widened_coordinates() {
        let mut decoder = InputDecoder::new();
        // DECSET 1005: coordinate 300 encodes as U+012C (0xC4 0xAC).
        let mut chunk = b"\x1b[M\x20".to_vec();
        chunk.extend_from_slice("\u{12c}".as_bytes());
        chunk.extend_from_slice(b"\x21");
        let events = strip_raw(decoder.feed(&chunk));
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::new(
                Position::new(267, 0),
                MouseKind::Press {
                    button: MouseButton::Left,
                    state: ButtonState::Pressed,
                },
            ))]
        );
    }

    #[test]
    fn x10_zero_coordinate_means_255() {
        let mut decoder = InputDecoder::new();
        // Coordinate byte 0x20 -> value 0 -> 255 -> position 254.
        let events = strip_raw(decoder.feed(b"\x1b[M\x20\x20\x21"));
        assert!(matches!(
            events[0],
            InputEvent::Mouse(MouseEvent {
                position: Position { x: 254, y: 0 },
                ..
            })
        ));
    }

    #[test]
    fn x10_wrapped_coordinate_repair() {
        let mut decoder = InputDecoder::new();
        // Coordinate 240 wraps: (240+32) mod 256 = 16 -> 16-32 = -16 -> +0xff.
        let events = strip_raw(decoder.feed(b"\x1b[M\x20\x10\x21"));
        assert!(matches!(
            events[0],
            InputEvent::Mouse(MouseEvent {
                position: Position { x: 238, y: 0 },
                ..
            })
        ));
    }

    #[test]
    fn urxvt_press() {
        let mut decoder = InputDecoder::new();
        // 32 -> bits 0 (left press) at (5, 7).
        let events = strip_raw(decoder.feed(b"\x1b[32;5;7M"));
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::new(
                Position::new(4, 6),
                MouseKind::Press {
                    button: MouseButton::Left,
                    state: ButtonState::Pressed,
                },
            ))]
        );
    }

    #[test]
    fn dec_locator_press_release() {
        let mut decoder = InputDecoder::new();
        let events = strip_raw(decoder.feed(b"\x1b[2;4;3;8&w"));
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::new(
                Position::new(7, 2),
                MouseKind::Press {
                    button: MouseButton::Left,
                    state: ButtonState::Pressed,
                },
            ))]
        );

        let events = strip_raw(decoder.feed(b"\x1b[5;0;3;8&w"));
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::new(
                Position::new(7, 2),
                MouseKind::Press {
                    button: MouseButton::Middle,
                    state: ButtonState::Released,
                },
            ))]
        );
    }

    #[test]
    fn vt300_press_release_motion() {
        let mut decoder = InputDecoder::new();
        let events = strip_raw(decoder.feed(b"\x1b[241~[12,6]\r"));
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::new(
                Position::new(11, 5),
                MouseKind::Press {
                    button: MouseButton::Left,
                    state: ButtonState::Pressed,
                },
            ))]
        );

        let events = strip_raw(decoder.feed(b"\x1b[245~[1,1]\r"));
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent::new(
                Position::new(0, 0),
                MouseKind::Motion { button: None },
            ))]
        );
    }

    #[test]
    fn multiple_mouse_events_in_one_chunk() {
        let mut decoder = InputDecoder::new();
        let events = strip_raw(decoder.feed(b"\x1b[<0;1;1M\x1b[<0;1;1m"));
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            InputEvent::Mouse(MouseEvent {
                kind: MouseKind::Press {
                    state: ButtonState::Pressed,
                    ..
                },
                ..
            })
        ));
        assert!(matches!(
            events[1],
            InputEvent::Mouse(MouseEvent {
                kind: MouseKind::Press {
                    state: ButtonState::Released,
                    ..
                },
                ..
            })
        ));
    }

    #[test]
    fn extra_button_group() {
        let mut decoder = InputDecoder::new();
        // 128 + 1 = button 9.
        let events = strip_raw(decoder.feed(b"\x1b[<129;1;1M"));
        assert!(matches!(
            events[0],
            InputEvent::Mouse(MouseEvent {
                kind: MouseKind::Press {
                    button: MouseButton::Extra(9),
                    state: ButtonState::Pressed,
                },
                ..
            })
        ));
    }

    #[test]
    fn mixed_chunk_falls_back_to_classifier() {
        let mut decoder = InputDecoder::new();
        // A mouse report glued to plain text is not consumed as mouse.
        let events = decoder.feed(b"\x1b[<0;1;1Mab");
        assert!(events.iter().all(|e| !matches!(e, InputEvent::Mouse(_))));
        assert!(events
            .iter()
            .any(|e| matches!(e, InputEvent::Key(KeyEvent { key: Key::Char('a'), .. }))));
    }
}
