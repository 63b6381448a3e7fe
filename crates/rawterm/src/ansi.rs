// SPDX-License-Identifier: MIT
//
// ANSI / VT escape sequence encoding.
//
// Pure functions that write escape sequences to any `impl Write`. No state,
// and no color-capability decisions; the `Emitter` makes those. This module
// just knows the byte-level encoding of every terminal command we need.
//
// All cursor positions are 0-indexed in our API and converted to 1-indexed
// for the terminal (ANSI standard uses 1-based coordinates).
//
// All functions return `io::Result` propagated from the underlying writer.
use std::io::{self, Write};

use crate::attr::{Attribute, Attributes};
use crate::color::Color;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` using the CUP (Cursor Position) sequence.
///
/// Our coordinates are 0-indexed; ANSI CUP is 1-indexed.
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

/// Move the cursor up `n` rows (CUU). `n == 0` writes nothing.
#[inline]
pub fn cursor_up(w: &mut impl Write, n: u16) -> io::Result<()> {
    relative(w, n, b'A')
}

/// Move the cursor down `n` rows (CUD).
#[inline]
pub fn cursor_down(w: &mut impl Write, n: u16) -> io::Result<()> {
    relative(w, n, b'B')
}

/// Move the cursor right `n` columns (CUF).
#[inline]
pub fn cursor_right(w: &mut impl Write, n: u16) -> io::Result<()> {
    relative(w, n, b'C')
}

/// Move the cursor left `n` columns (CUB).
#[inline]
pub fn cursor_left(w: &mut impl Write, n: u16) -> io::Result<()> {
    relative(w, n, b'D')
}

/// Move the cursor to the start of the line `n` rows down (CNL).
#[inline]
pub fn cursor_next_line(w: &mut impl Write, n: u16) -> io::Result<()> {
    relative(w, n, b'E')
}

/// Move the cursor to the start of the line `n` rows up (CPL).
#[inline]
pub fn cursor_prev_line(w: &mut impl Write, n: u16) -> io::Result<()> {
    relative(w, n, b'F')
}

/// Move the cursor to column `x` of the current row (CHA, 0-indexed).
#[inline]
pub fn cursor_to_column(w: &mut impl Write, x: u16) -> io::Result<()> {
    write!(w, "\x1b[{}G", u32::from(x) + 1)
}

fn relative(w: &mut impl Write, n: u16, final_byte: u8) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    write!(w, "\x1b[{n}{}", final_byte as char)
}

/// Save the cursor position (DECSC).
#[inline]
pub fn cursor_save(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b7")
}

/// Restore the cursor position saved by [`cursor_save`] (DECRC).
#[inline]
pub fn cursor_restore(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b8")
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

/// Start cursor blinking (att610).
#[inline]
pub fn cursor_blink_on(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?12h")
}

/// Stop cursor blinking.
#[inline]
pub fn cursor_blink_off(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?12l")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Which part of the screen to erase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClearType {
    /// Every cell on screen (ED 2).
    All,
    /// Every cell plus the scrollback buffer (ED 3).
    Purge,
    /// From the cursor to the end of the screen (ED 0).
    FromCursorDown,
    /// From the start of the screen to the cursor (ED 1).
    FromCursorUp,
    /// The whole current line (EL 2).
    CurrentLine,
    /// From the cursor to the end of the line (EL 0).
    UntilNewLine,
}

/// Erase part of the screen.
pub fn clear(w: &mut impl Write, region: ClearType) -> io::Result<()> {
    w.write_all(match region {
        ClearType::All => b"\x1b[2J",
        ClearType::Purge => b"\x1b[3J",
        ClearType::FromCursorDown => b"\x1b[J",
        ClearType::FromCursorUp => b"\x1b[1J",
        ClearType::CurrentLine => b"\x1b[2K",
        ClearType::UntilNewLine => b"\x1b[K",
    })
}

/// Scroll the page up `n` lines (SU).
#[inline]
pub fn scroll_up(w: &mut impl Write, n: u16) -> io::Result<()> {
    relative(w, n, b'S')
}

/// Scroll the page down `n` lines (SD).
#[inline]
pub fn scroll_down(w: &mut impl Write, n: u16) -> io::Result<()> {
    relative(w, n, b'T')
}

/// Request a window resize to `cols × rows` (XTWINOPS 8).
///
/// Best-effort: many terminal emulators ignore it.
#[inline]
pub fn set_size(w: &mut impl Write, cols: u16, rows: u16) -> io::Result<()> {
    write!(w, "\x1b[8;{rows};{cols}t")
}

/// Enter the alternate screen buffer (DEC Private Mode 1049).
#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

/// Exit the alternate screen buffer and restore original content.
#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

// ─── Colors ──────────────────────────────────────────────────────────────────

/// Set the foreground (text) color.
///
/// Compact SGR codes for the base 16 (30–37, 90–97), the 256-color
/// extended format for palette indices 16–255, and 24-bit for RGB.
/// The color is written as given: resolve it first for limited terminals.
pub fn fg(w: &mut impl Write, color: Color) -> io::Result<()> {
    match color {
        Color::Reset => w.write_all(b"\x1b[39m"),
        Color::Named(named) => palette(w, named.index(), 30, 90, 38),
        Color::Indexed(idx) => palette(w, idx, 30, 90, 38),
        Color::Rgb { r, g, b } => write!(w, "\x1b[38;2;{r};{g};{b}m"),
    }
}

/// Set the background color (40–47, 100–107, 48;5;N, 48;2;R;G;B).
pub fn bg(w: &mut impl Write, color: Color) -> io::Result<()> {
    match color {
        Color::Reset => w.write_all(b"\x1b[49m"),
        Color::Named(named) => palette(w, named.index(), 40, 100, 48),
        Color::Indexed(idx) => palette(w, idx, 40, 100, 48),
        Color::Rgb { r, g, b } => write!(w, "\x1b[48;2;{r};{g};{b}m"),
    }
}

fn palette(w: &mut impl Write, idx: u8, base: u16, bright: u16, extended: u8) -> io::Result<()> {
    if idx < 8 {
        write!(w, "\x1b[{}m", base + u16::from(idx))
    } else if idx < 16 {
        write!(w, "\x1b[{}m", bright + u16::from(idx - 8))
    } else {
        write!(w, "\x1b[{extended};5;{idx}m")
    }
}

/// Restore both colors to the terminal defaults, leaving attributes alone.
#[inline]
pub fn reset_color(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[39;49m")
}

// ─── Attributes ──────────────────────────────────────────────────────────────

/// Emit a single SGR attribute command.
#[inline]
pub fn attribute(w: &mut impl Write, attr: Attribute) -> io::Result<()> {
    write!(w, "\x1b[{}m", attr.sgr())
}

/// Emit every attribute in the set as one CSI sequence.
///
/// Multiple attributes are semicolon-separated: `\x1b[1;3;9m` for
/// bold + italic + crossed out. Does nothing if the set is empty.
pub fn attributes(w: &mut impl Write, attrs: Attributes) -> io::Result<()> {
    sgr_list(w, attrs.sgr_codes())
}

/// Emit attribute commands in the given order as one CSI sequence,
/// off-variants included: `[Bold, NoItalic]` is `\x1b[1;23m`. Does nothing
/// for an empty slice.
pub fn attribute_list(w: &mut impl Write, attrs: &[Attribute]) -> io::Result<()> {
    sgr_list(w, attrs.iter().map(|attr| attr.sgr()))
}

fn sgr_list(w: &mut impl Write, codes: impl Iterator<Item = u8>) -> io::Result<()> {
    let mut codes = codes.peekable();
    if codes.peek().is_none() {
        return Ok(());
    }

    w.write_all(b"\x1b[")?;
    for (i, code) in codes.enumerate() {
        if i > 0 {
            w.write_all(b";")?;
        }
        write!(w, "{code}")?;
    }
    w.write_all(b"m")
}

/// Reset all SGR attributes and colors to terminal defaults (SGR 0).
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

// ─── Mouse Protocol ─────────────────────────────────────────────────────────

/// Mouse tracking granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseMode {
    /// Report button press and release events (DEC 1000).
    Click,
    /// Report button events and drag motion (DEC 1000 + 1002).
    #[default]
    Drag,
    /// Report all mouse motion, even without buttons held (DEC 1000 + 1002 + 1003).
    Motion,
}

/// Enable mouse tracking at the specified granularity.
///
/// Also requests the rxvt (1015) and SGR (1006) extended encodings. Terminals
/// that know SGR use it; the decoder understands all three report formats.
pub fn enable_mouse(w: &mut impl Write, mode: MouseMode) -> io::Result<()> {
    w.write_all(b"\x1b[?1000h")?;
    if matches!(mode, MouseMode::Drag | MouseMode::Motion) {
        w.write_all(b"\x1b[?1002h")?;
    }
    if mode == MouseMode::Motion {
        w.write_all(b"\x1b[?1003h")?;
    }
    w.write_all(b"\x1b[?1015h")?;
    w.write_all(b"\x1b[?1006h")
}

/// Disable all mouse tracking, in the reverse order of [`enable_mouse`].
pub fn disable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1006l")?;
    w.write_all(b"\x1b[?1015l")?;
    w.write_all(b"\x1b[?1003l")?;
    w.write_all(b"\x1b[?1002l")?;
    w.write_all(b"\x1b[?1000l")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
