#![forbid(unsafe_code)]

//! Terminal colour model.
//!
//! [`Color`] is a tagged union over the colour spaces a terminal can
//! address: the default colour, the 8 standard and 8 bright ANSI colours,
//! the extended 256-colour palette, and 24-bit RGB. Each variant knows its
//! own SGR parameter fragment for foreground and background use, so the
//! renderer can assemble `CSI … m` sequences without a lookup table.
//!
//! Down-conversion between the spaces follows the xterm palette: the
//! 6×6×6 colour cube with levels `[0, 95, 135, 175, 215, 255]` plus the
//! 24-step grayscale ramp `8 + 10k`.

/// A terminal colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// The terminal's default foreground or background colour.
    #[default]
    Normal,

    /// One of the 8 standard ANSI colours (index 0..=7).
    Standard(u8),

    /// One of the 8 bright ANSI colours (index 0..=7).
    Bright(u8),

    /// An index into the 256-colour palette.
    Extended(u8),

    /// A 24-bit RGB colour.
    Rgb(u8, u8, u8),
}

/// Canonical RGB values of the 16 base colours (xterm defaults).
const BASE_PALETTE: [(u8, u8, u8); 16] = [
    (0, 0, 0),       // black
    (205, 0, 0),     // red
    (0, 205, 0),     // green
    (205, 205, 0),   // yellow
    (0, 0, 238),     // blue
    (205, 0, 205),   // magenta
    (0, 205, 205),   // cyan
    (229, 229, 229), // white
    (127, 127, 127), // bright black
    (255, 0, 0),     // bright red
    (0, 255, 0),     // bright green
    (255, 255, 0),   // bright yellow
    (92, 92, 255),   // bright blue
    (255, 0, 255),   // bright magenta
    (0, 255, 255),   // bright cyan
    (255, 255, 255), // bright white
];

/// Colour-cube channel levels for palette indices 16..=231.
const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

impl Color {
    /// Build a colour from a 256-palette index, using the cheapest
    /// representation: 0..=7 become [`Color::Standard`], 8..=15 become
    /// [`Color::Bright`], the rest stay [`Color::Extended`].
    #[must_use]
    pub const fn optimized_extended(index: u8) -> Self {
        match index {
            0..=7 => Self::Standard(index),
            8..=15 => Self::Bright(index - 8),
            _ => Self::Extended(index),
        }
    }

    /// SGR parameter fragment selecting this colour as the foreground.
    ///
    /// The fragment carries no `CSI` introducer and no trailing `m`.
    #[must_use]
    pub fn fg_params(&self) -> String {
        match *self {
            Self::Normal => "39".to_string(),
            Self::Standard(n) => format!("{}", 30 + n),
            Self::Bright(n) => format!("{}", 90 + n),
            Self::Extended(n) => format!("38;5;{n}"),
            Self::Rgb(r, g, b) => format!("38;2;{r};{g};{b}"),
        }
    }

    /// SGR parameter fragment selecting this colour as the background.
    #[must_use]
    pub fn bg_params(&self) -> String {
        match *self {
            Self::Normal => "49".to_string(),
            Self::Standard(n) => format!("{}", 40 + n),
            Self::Bright(n) => format!("{}", 100 + n),
            Self::Extended(n) => format!("48;5;{n}"),
            Self::Rgb(r, g, b) => format!("48;2;{r};{g};{b}"),
        }
    }

    /// Canonical RGB value of this colour.
    ///
    /// [`Color::Normal`] has no fixed RGB value and returns `None`.
    #[must_use]
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        match *self {
            Self::Normal => None,
            Self::Standard(n) => Some(BASE_PALETTE[(n & 7) as usize]),
            Self::Bright(n) => Some(BASE_PALETTE[8 + (n & 7) as usize]),
            Self::Extended(n) => Some(extended_to_rgb(n)),
            Self::Rgb(r, g, b) => Some((r, g, b)),
        }
    }

    /// Down-convert to the 256-colour palette.
    ///
    /// RGB values map through the 6×6×6 cube, with pure grays routed to
    /// the grayscale ramp. Palette and base colours pass through.
    #[must_use]
    pub fn to_extended(&self) -> Self {
        match *self {
            Self::Normal => Self::Normal,
            Self::Standard(_) | Self::Bright(_) | Self::Extended(_) => *self,
            Self::Rgb(r, g, b) => Self::Extended(rgb_to_extended(r, g, b)),
        }
    }

    /// Down-convert to the nearest of the 16 base colours.
    #[must_use]
    pub fn to_standard(&self) -> Self {
        match *self {
            Self::Normal | Self::Standard(_) | Self::Bright(_) => *self,
            _ => match self.to_ansi() {
                None => Self::Normal,
                Some(n @ 0..=7) => Self::Standard(n),
                Some(n) => Self::Bright(n - 8),
            },
        }
    }

    /// The 16-colour index (0..=15) closest to this colour.
    ///
    /// `None` for [`Color::Normal`], which stays the terminal default.
    #[must_use]
    pub fn to_ansi(&self) -> Option<u8> {
        match *self {
            Self::Normal => None,
            Self::Standard(n) => Some(n & 7),
            Self::Bright(n) => Some(8 + (n & 7)),
            Self::Extended(n) if n < 16 => Some(n),
            _ => {
                let (r, g, b) = self.rgb()?;
                Some(nearest_base(r, g, b))
            }
        }
    }
}

/// RGB value of a 256-palette index.
fn extended_to_rgb(index: u8) -> (u8, u8, u8) {
    if index < 16 {
        return BASE_PALETTE[index as usize];
    }
    if index >= 232 {
        let gray = 8 + 10 * (index - 232);
        return (gray, gray, gray);
    }
    let idx = index - 16;
    let r = CUBE_LEVELS[(idx / 36) as usize];
    let g = CUBE_LEVELS[((idx / 6) % 6) as usize];
    let b = CUBE_LEVELS[(idx % 6) as usize];
    (r, g, b)
}

/// Nearest 256-palette index for an RGB value.
fn rgb_to_extended(r: u8, g: u8, b: u8) -> u8 {
    if r == g && g == b {
        if r < 8 {
            return 16;
        }
        if r > 248 {
            return 231;
        }
        return 232 + ((r - 8) / 10).min(23);
    }
    16 + 36 * cube_index(r) + 6 * cube_index(g) + cube_index(b)
}

/// Map an 8-bit channel value to the nearest cube level index.
///
/// The cube levels are not uniformly spaced; the split points are the
/// midpoints between adjacent levels (48, 115, 155, 195, 235).
fn cube_index(v: u8) -> u8 {
    if v < 48 {
        0
    } else if v < 115 {
        1
    } else {
        (v - 35) / 40
    }
}

/// Luma-weighted nearest base colour (0..=15).
fn nearest_base(r: u8, g: u8, b: u8) -> u8 {
    let mut best = 0u8;
    let mut best_dist = u64::MAX;
    for (idx, &(pr, pg, pb)) in BASE_PALETTE.iter().enumerate() {
        let dr = (r as i32 - pr as i32) as i64;
        let dg = (g as i32 - pg as i32) as i64;
        let db = (b as i32 - pb as i32) as i64;
        let dist = (2126 * dr * dr + 7152 * dg * dg + 722 * db * db) as u64;
        if dist < best_dist {
            best = idx as u8;
            best_dist = dist;
        }
    }
    best
}
