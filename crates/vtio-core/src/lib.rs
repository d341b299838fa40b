#![forbid(unsafe_code)]

//! Core types for the vtio terminal stack: geometry, input events, and
//! the escape-sequence input decoder.

pub mod cursor;
pub mod decoder;
pub mod event;
pub mod geometry;
mod keymap;
pub mod logging;

pub use cursor::{CursorShape, CursorState};
pub use decoder::{DecoderOptions, InputDecoder};
pub use event::{
    AttributesKind, ButtonState, DeviceAttributes, InputEvent, Key, KeyEvent, Modifiers,
    MouseButton, MouseEvent, MouseKind, PasteEvent, TerminalListener,
};
pub use geometry::{Offset, Position, Rect, Size};
