#![forbid(unsafe_code)]

//! Colour model and text attributes for the vtio terminal core.

pub mod color;
pub mod effects;

pub use color::Color;
pub use effects::{Foreground, Style, TextEffects};
