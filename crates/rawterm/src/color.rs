// SPDX-License-Identifier: MIT
//
// Color model: named, indexed, and 24-bit colors with capability-aware
// downsampling.
//
// Single-character variable names (r, g, b) are the usual convention for
// color channels.
#![allow(clippy::many_single_char_names)]
//
// Terminals come in three flavors: true-color (any RGB triple), 256-color
// (the xterm palette), and 16-color (the base ANSI set). A `Color` is a
// request; `Color::resolve` turns it into something the terminal can show.
//
// Nearest-match uses plain Euclidean distance in RGB space over the xterm
// reference palette. It is not perceptually uniform, but it is pure, total,
// and deterministic: every triple maps to exactly one index, ties going to
// the lowest index. Callers that need reproducible output across machines
// rely on that.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

// ─── NamedColor ──────────────────────────────────────────────────────────────

/// One of the 16 base ANSI colors.
///
/// Names follow the common convention where the plain name is the bright
/// variant and `Dark*` is the standard one (`Red` = index 9, `DarkRed` = 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedColor {
    Black,
    DarkRed,
    DarkGreen,
    DarkYellow,
    DarkBlue,
    DarkMagenta,
    DarkCyan,
    Grey,
    DarkGrey,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl NamedColor {
    /// All 16 colors, ordered by palette index.
    pub const ALL: [Self; 16] = [
        Self::Black,
        Self::DarkRed,
        Self::DarkGreen,
        Self::DarkYellow,
        Self::DarkBlue,
        Self::DarkMagenta,
        Self::DarkCyan,
        Self::Grey,
        Self::DarkGrey,
        Self::Red,
        Self::Green,
        Self::Yellow,
        Self::Blue,
        Self::Magenta,
        Self::Cyan,
        Self::White,
    ];

    /// Palette index (0–15).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// The color at palette index `idx`, if `idx < 16`.
    #[must_use]
    pub const fn from_index(idx: u8) -> Option<Self> {
        if idx < 16 {
            Some(Self::ALL[idx as usize])
        } else {
            None
        }
    }

    /// Canonical name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Black => "Black",
            Self::DarkRed => "DarkRed",
            Self::DarkGreen => "DarkGreen",
            Self::DarkYellow => "DarkYellow",
            Self::DarkBlue => "DarkBlue",
            Self::DarkMagenta => "DarkMagenta",
            Self::DarkCyan => "DarkCyan",
            Self::Grey => "Grey",
            Self::DarkGrey => "DarkGrey",
            Self::Red => "Red",
            Self::Green => "Green",
            Self::Yellow => "Yellow",
            Self::Blue => "Blue",
            Self::Magenta => "Magenta",
            Self::Cyan => "Cyan",
            Self::White => "White",
        }
    }

    /// Reference RGB value from the xterm palette.
    #[inline]
    #[must_use]
    pub const fn rgb(self) -> (u8, u8, u8) {
        ANSI16_RGB[self as usize]
    }
}

impl fmt::Display for NamedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NamedColor {
    type Err = Error;

    /// Case-insensitive, ignores `_`/`-`/spaces, accepts `Gray` for `Grey`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect::<String>()
            .replace("gray", "grey");

        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(&key))
            .ok_or_else(|| Error::UnknownColor(s.to_owned()))
    }
}

// ─── Color ───────────────────────────────────────────────────────────────────

/// A terminal color request.
///
/// # Examples
///
/// ```
/// use rawterm::color::{Color, ColorMode, NamedColor};
///
/// let magenta = Color::rgb(255, 0, 255);
/// assert_eq!(magenta.resolve(ColorMode::TrueColor), magenta);
/// assert_eq!(magenta.resolve(ColorMode::Ansi16), Color::Named(NamedColor::Magenta));
///
/// let parsed: Color = "DarkBlue".parse().unwrap();
/// assert_eq!(parsed, Color::Named(NamedColor::DarkBlue));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// The terminal's default color (SGR 39 / 49).
    #[default]
    Reset,
    /// One of the 16 base colors.
    Named(NamedColor),
    /// An xterm 256-color palette index.
    Indexed(u8),
    /// 24-bit color.
    Rgb { r: u8, g: u8, b: u8 },
}

impl Color {
    /// Shorthand for [`Color::Rgb`].
    #[inline]
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::Rgb { r, g, b }
    }

    /// Reference RGB for this color, or `None` for [`Color::Reset`].
    #[must_use]
    pub const fn to_rgb(self) -> Option<(u8, u8, u8)> {
        match self {
            Self::Reset => None,
            Self::Named(n) => Some(n.rgb()),
            Self::Indexed(idx) => Some(indexed_to_rgb(idx)),
            Self::Rgb { r, g, b } => Some((r, g, b)),
        }
    }

    /// Downsample to what a terminal in `mode` can display.
    ///
    /// `Reset` and named colors pass through untouched in every mode.
    #[must_use]
    pub fn resolve(self, mode: ColorMode) -> Self {
        match (self, mode) {
            (Self::Rgb { r, g, b }, ColorMode::Ansi256) => Self::Indexed(nearest_indexed(r, g, b)),
            (Self::Rgb { r, g, b }, ColorMode::Ansi16) => Self::Named(nearest_named(r, g, b)),
            (Self::Indexed(idx), ColorMode::Ansi16) => NamedColor::from_index(idx).map_or_else(
                || {
                    let (r, g, b) = indexed_to_rgb(idx);
                    Self::Named(nearest_named(r, g, b))
                },
                Self::Named,
            ),
            (other, _) => other,
        }
    }
}

impl From<NamedColor> for Color {
    fn from(named: NamedColor) -> Self {
        Self::Named(named)
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::rgb(r, g, b)
    }
}

impl FromStr for Color {
    type Err = Error;

    /// Accepts `Reset`, any [`NamedColor`] name, `#rrggbb`, `#rgb`,
    /// `rgb(r, g, b)`, or a decimal palette index `0..=255`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("reset") {
            return Ok(Self::Reset);
        }
        if let Some(hex) = trimmed.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| Error::UnknownColor(s.to_owned()));
        }
        if let Some(body) = trimmed
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_rgb_triple(body).ok_or_else(|| Error::UnknownColor(s.to_owned()));
        }
        if let Ok(idx) = trimmed.parse::<u8>() {
            return Ok(Self::Indexed(idx));
        }
        trimmed
            .parse::<NamedColor>()
            .map(Self::Named)
            .map_err(|_| Error::UnknownColor(s.to_owned()))
    }
}

// ─── ColorMode ───────────────────────────────────────────────────────────────

/// How many colors the output terminal can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorMode {
    /// 24-bit RGB.
    #[default]
    TrueColor,
    /// xterm 256-color palette.
    Ansi256,
    /// The 16 base colors.
    Ansi16,
}

impl ColorMode {
    /// Number of distinct colors the mode can show.
    #[must_use]
    pub const fn color_count(self) -> u32 {
        match self {
            Self::TrueColor => 1 << 24,
            Self::Ansi256 => 256,
            Self::Ansi16 => 16,
        }
    }
}

// ─── Palette ─────────────────────────────────────────────────────────────────

/// The base 16 colors as RGB, matching the xterm defaults.
pub const ANSI16_RGB: [(u8, u8, u8); 16] = [
    (0, 0, 0),       // 0: Black
    (128, 0, 0),     // 1: DarkRed
    (0, 128, 0),     // 2: DarkGreen
    (128, 128, 0),   // 3: DarkYellow
    (0, 0, 128),     // 4: DarkBlue
    (128, 0, 128),   // 5: DarkMagenta
    (0, 128, 128),   // 6: DarkCyan
    (192, 192, 192), // 7: Grey
    (128, 128, 128), // 8: DarkGrey
    (255, 0, 0),     // 9: Red
    (0, 255, 0),     // 10: Green
    (255, 255, 0),   // 11: Yellow
    (0, 0, 255),     // 12: Blue
    (255, 0, 255),   // 13: Magenta
    (0, 255, 255),   // 14: Cyan
    (255, 255, 255), // 15: White
];

/// RGB value of a 256-color palette index.
///
/// - 0–15: base colors
/// - 16–231: 6×6×6 cube with levels 0, 95, 135, 175, 215, 255
/// - 232–255: gray ramp 8, 18, …, 238
#[must_use]
pub const fn indexed_to_rgb(idx: u8) -> (u8, u8, u8) {
    match idx {
        0..=15 => ANSI16_RGB[idx as usize],
        16..=231 => {
            let i = idx - 16;
            (cube_level(i / 36), cube_level((i % 36) / 6), cube_level(i % 6))
        }
        232..=255 => {
            let v = 8 + 10 * (idx - 232);
            (v, v, v)
        }
    }
}

const fn cube_level(i: u8) -> u8 {
    if i == 0 { 0 } else { 55 + 40 * i }
}

/// Squared Euclidean distance between two RGB triples.
#[inline]
const fn distance_sq(a: (u8, u8, u8), b: (u8, u8, u8)) -> u32 {
    let dr = a.0.abs_diff(b.0) as u32;
    let dg = a.1.abs_diff(b.1) as u32;
    let db = a.2.abs_diff(b.2) as u32;
    dr * dr + dg * dg + db * db
}

/// Nearest 256-color palette index. Ties resolve to the lowest index.
#[must_use]
pub fn nearest_indexed(r: u8, g: u8, b: u8) -> u8 {
    nearest_in(0..=255, (r, g, b))
}

/// Nearest of the 16 base colors. Ties resolve to the lowest index.
#[must_use]
pub fn nearest_named(r: u8, g: u8, b: u8) -> NamedColor {
    let idx = nearest_in(0..=15, (r, g, b));
    NamedColor::ALL[idx as usize]
}

fn nearest_in(range: std::ops::RangeInclusive<u8>, target: (u8, u8, u8)) -> u8 {
    let mut best_idx = *range.start();
    let mut best_dist = u32::MAX;

    for idx in range {
        let dist = distance_sq(indexed_to_rgb(idx), target);
        // Strict `<` keeps the first (lowest) index on ties.
        if dist < best_dist {
            best_dist = dist;
            best_idx = idx;
            if dist == 0 {
                break;
            }
        }
    }

    best_idx
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

fn parse_hex(hex: &str) -> Option<Color> {
    let bytes = hex.as_bytes();
    match bytes.len() {
        6 => Some(Color::rgb(
            parse_hex_byte(&bytes[0..2])?,
            parse_hex_byte(&bytes[2..4])?,
            parse_hex_byte(&bytes[4..6])?,
        )),
        3 => {
            let r = parse_hex_digit(bytes[0])?;
            let g = parse_hex_digit(bytes[1])?;
            let b = parse_hex_digit(bytes[2])?;
            Some(Color::rgb(r * 17, g * 17, b * 17))
        }
        _ => None,
    }
}

const fn parse_hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn parse_hex_byte(bytes: &[u8]) -> Option<u8> {
    Some(parse_hex_digit(bytes[0])? * 16 + parse_hex_digit(bytes[1])?)
}

fn parse_rgb_triple(body: &str) -> Option<Color> {
    let mut parts = body.split(',').map(|p| p.trim().parse::<u8>());
    let r = parts.next()?.ok()?;
    let g = parts.next()?.ok()?;
    let b = parts.next()?.ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Color::rgb(r, g, b))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
