#![forbid(unsafe_code)]

//! Input event types.
//!
//! The decoder classifies terminal input into these events. All types
//! derive `Clone` and `PartialEq` for use in tests and pattern matching.
//!
//! # Design Notes
//!
//! - Mouse and cursor-report coordinates are 0-indexed (the wire protocol
//!   is 1-indexed; the decoder converts).
//! - `Modifiers` use bitflags for easy combination.
//! - `RawProcessed` carries the text of a chunk that was consumed whole by
//!   a structured handler, so listeners can reconstruct the byte stream.

use bitflags::bitflags;

use crate::geometry::{Offset, Position, Size};

/// An input event produced by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A key stroke with modifiers.
    Key(KeyEvent),

    /// A printable non-ASCII grapheme cluster.
    Text(String),

    /// Pasted text.
    Paste(PasteEvent),

    /// A mouse press, motion, or scroll.
    Mouse(MouseEvent),

    /// Focus gained (`true`) or lost (`false`).
    Focus(bool),

    /// A cursor-position report, 0-indexed.
    CursorReport(Position),

    /// A primary or secondary device-attributes reply.
    DeviceAttributes(DeviceAttributes),

    /// Input the decoder recognized as an escape sequence but could not
    /// classify. Never fatal; applications may log or ignore it.
    Unhandled(String),

    /// A chunk that was consumed whole by a structured handler.
    RawProcessed(String),
}

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// The logical key.
    pub key: Key,
    /// Modifier keys held during the event.
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// Create a key event with no modifiers.
    #[must_use]
    pub const fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::empty(),
        }
    }

    /// Create a key event with modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Check if Ctrl is held.
    #[must_use]
    pub const fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    /// Check if Meta/Alt is held.
    #[must_use]
    pub const fn meta(&self) -> bool {
        self.modifiers.contains(Modifiers::META)
    }

    /// Check if Shift is held.
    #[must_use]
    pub const fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }
}

/// Logical keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable ASCII character (letters, digits, punctuation).
    Char(char),
    /// Enter / line feed.
    Enter,
    /// Carriage return.
    CarriageReturn,
    /// Tab.
    Tab,
    /// Escape.
    Escape,
    /// Backspace (BS or DEL).
    Backspace,
    /// Space bar.
    Space,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Home.
    Home,
    /// End.
    End,
    /// Page up.
    PageUp,
    /// Page down.
    PageDown,
    /// Insert.
    Insert,
    /// Delete.
    Delete,
    /// Clear (keypad 5 on some terminals).
    Clear,
    /// Function key F1..=F12.
    F(u8),
    /// Keypad digit 0..=9 (application keypad mode).
    Keypad(u8),
}

bitflags! {
    /// Modifier keys.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        /// Shift key.
        const SHIFT = 0b001;
        /// Meta/Alt key.
        const META = 0b010;
        /// Control key.
        const CTRL = 0b100;
    }
}

/// A paste event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteEvent {
    /// The pasted text.
    pub text: String,
    /// True when the text was delimited by bracketed-paste markers.
    pub bracketed: bool,
}

impl PasteEvent {
    /// Create a bracketed paste event (the common case).
    #[must_use]
    pub fn bracketed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bracketed: true,
        }
    }
}

/// A mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    /// Cell the event happened in, 0-indexed.
    pub position: Position,
    /// What happened.
    pub kind: MouseKind,
    /// Modifier keys held during the event.
    pub modifiers: Modifiers,
}

impl MouseEvent {
    /// Create a mouse event with no modifiers.
    #[must_use]
    pub const fn new(position: Position, kind: MouseKind) -> Self {
        Self {
            position,
            kind,
            modifiers: Modifiers::empty(),
        }
    }

    /// Create a mouse event with modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// The kind of mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseKind {
    /// A button went down or up.
    Press {
        button: MouseButton,
        state: ButtonState,
    },
    /// The pointer moved, possibly while a button was held.
    Motion { button: Option<MouseButton> },
    /// The wheel scrolled; the vector is one of the four unit directions.
    Scroll { vector: Offset },
}

/// Press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonState {
    Pressed,
    Released,
}

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    /// Extended buttons 8..=11 from the second extra group.
    Extra(u8),
}

/// Which device-attributes query a reply answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributesKind {
    /// `CSI ? … c` — primary device attributes.
    Primary,
    /// `CSI > … c` — secondary device attributes.
    Secondary,
}

/// A device-attributes reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAttributes {
    pub kind: AttributesKind,
    /// First parameter (terminal type).
    pub device_type: u32,
    /// Second parameter (firmware version), 0 when absent.
    pub version: u32,
    /// Any further parameters.
    pub extra: Vec<u32>,
}

/// Callbacks for applications consuming terminal input.
///
/// All methods have no-op defaults so implementors only override what
/// they care about. Callbacks must not re-enter the decoder for the
/// chunk currently being delivered.
pub trait TerminalListener {
    /// A key stroke or printable grapheme was decoded.
    fn on_keyboard_input(&mut self, _event: &InputEvent) {}

    /// A chunk finished decoding. `fully_processed` is true when a
    /// structured handler consumed the chunk whole.
    fn on_raw_input(&mut self, _input: &str, _fully_processed: bool) {}

    /// A mouse event was decoded.
    fn on_mouse_event(&mut self, _event: &MouseEvent) {}

    /// The terminal gained or lost focus.
    fn on_focus_change(&mut self, _gained: bool) {}

    /// The terminal was resized.
    fn on_screen_resize(&mut self, _size: Size) {}

    /// A platform signal (e.g. interrupt) was delivered.
    fn on_signal(&mut self, _signal: i32) {}
}
