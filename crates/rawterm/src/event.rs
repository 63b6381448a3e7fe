// SPDX-License-Identifier: MIT
//
// Input event types.
//
// A closed sum over everything the decoder and the event source can
// deliver. Coordinates are 0-based cells, matching the emitter's
// `move_to`. Mouse events can be re-encoded into SGR or X10 reports,
// which is what a terminal would have sent for them.

use std::fmt::Write as _;

use bitflags::bitflags;

// ─── Event ───────────────────────────────────────────────────────────────────

/// A decoded terminal input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// A key press.
    Key(KeyEvent),
    /// A mouse button, motion, or wheel report.
    Mouse(MouseEvent),
    /// The terminal window was resized to `cols × rows` cells.
    Resize { cols: u16, rows: u16 },
}

impl Event {
    #[must_use]
    pub const fn as_key(&self) -> Option<&KeyEvent> {
        match self {
            Self::Key(key) => Some(key),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_mouse(&self) -> Option<&MouseEvent> {
        match self {
            Self::Mouse(mouse) => Some(mouse),
            _ => None,
        }
    }
}

impl From<KeyEvent> for Event {
    fn from(key: KeyEvent) -> Self {
        Self::Key(key)
    }
}

impl From<MouseEvent> for Event {
    fn from(mouse: MouseEvent) -> Self {
        Self::Mouse(mouse)
    }
}

// ─── Keys ────────────────────────────────────────────────────────────────────

/// A key press with its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    #[inline]
    #[must_use]
    pub const fn new(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    /// A key with no modifiers held.
    #[inline]
    #[must_use]
    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, Modifiers::empty())
    }
}

impl From<KeyCode> for KeyEvent {
    fn from(code: KeyCode) -> Self {
        Self::plain(code)
    }
}

/// Identity of a key.
///
/// Printable characters use [`Char`](KeyCode::Char). Shift+Tab arrives as
/// `Tab` with [`Modifiers::SHIFT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    Insert,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    /// F1 through F20.
    F(u8),
}

bitflags! {
    /// Keyboard modifiers.
    ///
    /// Bit layout matches the xterm CSI modifier parameter, which is sent
    /// as `1 + bits`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        const META  = 0b1000;
    }
}

impl Modifiers {
    /// Decode an xterm modifier parameter (`2` = Shift, `5` = Ctrl, ...).
    #[must_use]
    pub fn from_xterm_param(param: u16) -> Self {
        let bits = param.saturating_sub(1);
        Self::from_bits_truncate(u8::try_from(bits & 0x0F).unwrap_or(0))
    }

    /// The modifier bits a mouse report carries in its button byte.
    #[must_use]
    pub const fn mouse_bits(self) -> u16 {
        let mut bits = 0;
        if self.contains(Self::SHIFT) {
            bits |= 4;
        }
        if self.contains(Self::ALT) {
            bits |= 8;
        }
        if self.contains(Self::CTRL) {
            bits |= 16;
        }
        bits
    }

    /// Inverse of [`mouse_bits`](Self::mouse_bits).
    #[must_use]
    pub const fn from_mouse_bits(cb: u16) -> Self {
        let mut mods = Self::empty();
        if cb & 4 != 0 {
            mods = mods.union(Self::SHIFT);
        }
        if cb & 8 != 0 {
            mods = mods.union(Self::ALT);
        }
        if cb & 16 != 0 {
            mods = mods.union(Self::CTRL);
        }
        mods
    }
}

// ─── Mouse ───────────────────────────────────────────────────────────────────

/// A mouse event at a 0-based cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub x: u16,
    pub y: u16,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    Down(MouseButton),
    Up(MouseButton),
    /// Motion with a button held.
    Drag(MouseButton),
    /// Motion with no button held (only reported in all-motion mode).
    Moved,
    ScrollUp,
    ScrollDown,
    ScrollLeft,
    ScrollRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    /// Button number in a mouse report (0, 1, 2).
    #[inline]
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Left => 0,
            Self::Middle => 1,
            Self::Right => 2,
        }
    }

    /// The button for a report's low two bits. `3` ("released") has none.
    #[must_use]
    pub const fn from_code(code: u16) -> Option<Self> {
        match code & 3 {
            0 => Some(Self::Left),
            1 => Some(Self::Middle),
            2 => Some(Self::Right),
            _ => None,
        }
    }
}

/// Offset added to every byte of a legacy X10 report.
pub(crate) const X10_OFFSET: u16 = 32;

/// Largest 0-based coordinate an X10 report can carry.
pub const X10_MAX_COORD: u16 = 255 - X10_OFFSET - 1;

impl MouseEvent {
    #[must_use]
    pub const fn new(kind: MouseEventKind, x: u16, y: u16) -> Self {
        Self {
            kind,
            x,
            y,
            modifiers: Modifiers::empty(),
        }
    }

    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// The button byte for this event, without any protocol offset.
    ///
    /// SGR releases keep the button identity; X10 releases always send `3`.
    const fn button_byte(&self, keep_release_button: bool) -> u16 {
        let base = match self.kind {
            MouseEventKind::Down(b) => b.code(),
            MouseEventKind::Up(b) => {
                if keep_release_button {
                    b.code()
                } else {
                    3
                }
            }
            MouseEventKind::Drag(b) => 32 + b.code(),
            MouseEventKind::Moved => 32 + 3,
            MouseEventKind::ScrollUp => 64,
            MouseEventKind::ScrollDown => 65,
            MouseEventKind::ScrollLeft => 66,
            MouseEventKind::ScrollRight => 67,
        };
        base | self.modifiers.mouse_bits()
    }

    /// Encode as an SGR (1006) report: `CSI < Cb ; Cx ; Cy M|m`.
    #[must_use]
    pub fn to_sgr(&self) -> String {
        let mut out = String::with_capacity(16);
        let final_byte = if matches!(self.kind, MouseEventKind::Up(_)) {
            'm'
        } else {
            'M'
        };
        // Writing to a String cannot fail.
        let _ = write!(
            out,
            "\x1b[<{};{};{}{final_byte}",
            self.button_byte(true),
            u32::from(self.x) + 1,
            u32::from(self.y) + 1,
        );
        out
    }

    /// Encode as a legacy X10 report: `CSI M cb cx cy`, each byte offset by
    /// 32. Returns `None` when the position is beyond [`X10_MAX_COORD`].
    #[must_use]
    pub fn to_x10(&self) -> Option<Vec<u8>> {
        if self.x > X10_MAX_COORD || self.y > X10_MAX_COORD {
            return None;
        }
        let encode = |v: u16| u8::try_from(v + X10_OFFSET).ok();
        Some(vec![
            0x1b,
            b'[',
            b'M',
            encode(self.button_byte(false))?,
            encode(self.x + 1)?,
            encode(self.y + 1)?,
        ])
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
