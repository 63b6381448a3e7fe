// SPDX-License-Identifier: MIT
//
// Terminal input decoder.
//
// Turns raw terminal bytes into structured events: keys and mouse reports.
// Understands every encoding a typical xterm-compatible terminal produces
// once `ansi::enable_mouse` has been sent:
//
// - Legacy CSI sequences (arrows, function keys, editing keys), with the
//   xterm modifier parameter (`CSI 1;5A` = Ctrl+Up)
// - SS3 sequences (F1-F4 and arrows in application mode)
// - Alt+key (ESC followed by a key byte)
// - SGR mouse (`CSI < Cb ; Cx ; Cy M|m`)
// - rxvt mouse (`CSI Cb ; Cx ; Cy M`, button offset by 32)
// - X10 mouse (`CSI M cb cx cy`, every byte offset by 32)
// - UTF-8 multi-byte characters
//
// # Design
//
// The decoder keeps a small byte buffer because sequences can span reads.
// Feed bytes with [`Decoder::advance`]; incomplete tails stay buffered.
// After the escape timeout passes with no new input, call
// [`Decoder::flush`] to turn whatever is left (typically a lone ESC) into
// literal key events.
//
// Parsing itself is stateless: `try_parse` looks at the buffer and says
// what it found and how many bytes it covers. The only state carried
// between events is the mouse button last pressed, which legacy protocols
// need to say which button a release belongs to.

use crate::event::{
    Event, KeyCode, KeyEvent, Modifiers, MouseButton, MouseEvent, MouseEventKind, X10_OFFSET,
};

/// Longest sequence the decoder waits for. An unterminated sequence that
/// reaches this length is discarded.
pub const MAX_SEQUENCE_LEN: usize = 64;

const ESC: u8 = 0x1B;

// ─── State ───────────────────────────────────────────────────────────────────

/// Where the decoder is within the byte stream.
///
/// Derived from the pending buffer: `Idle` means nothing is held back
/// (or only part of a UTF-8 character).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecoderState {
    #[default]
    Idle,
    /// Holding an ESC, or ESC plus an SS3 introducer.
    InEscape,
    /// Inside a `CSI` sequence, waiting for its final byte.
    InCsi,
    /// Inside an SGR or X10 mouse report.
    InMouseSequence,
}

// ─── Decoder ─────────────────────────────────────────────────────────────────

/// Incremental byte-stream to [`Event`] decoder.
///
/// ```
/// use rawterm::event::{Event, MouseButton, MouseEvent, MouseEventKind};
/// use rawterm::input::Decoder;
///
/// let mut decoder = Decoder::new();
/// let events = decoder.advance(b"\x1b[<0;10;5M");
/// assert_eq!(
///     events,
///     [Event::Mouse(MouseEvent::new(MouseEventKind::Down(MouseButton::Left), 9, 4))]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Decoder {
    /// Bytes not yet turned into events.
    buf: Vec<u8>,
    /// When `false`, mouse reports are passed through as literal keys.
    mouse_capture: bool,
    /// Button of the last unreleased press.
    held: Option<MouseButton>,
}

impl Decoder {
    /// A decoder with mouse decoding enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(MAX_SEQUENCE_LEN),
            mouse_capture: true,
            held: None,
        }
    }

    #[must_use]
    pub const fn with_mouse_capture(mut self, enabled: bool) -> Self {
        self.mouse_capture = enabled;
        self
    }

    #[inline]
    #[must_use]
    pub const fn mouse_capture(&self) -> bool {
        self.mouse_capture
    }

    /// Toggle mouse decoding. Takes effect from the next [`advance`].
    ///
    /// [`advance`]: Decoder::advance
    pub fn set_mouse_capture(&mut self, enabled: bool) {
        if self.mouse_capture != enabled {
            self.held = None;
        }
        self.mouse_capture = enabled;
    }

    #[must_use]
    pub fn state(&self) -> DecoderState {
        match self.buf.as_slice() {
            [] => DecoderState::Idle,
            [ESC] => DecoderState::InEscape,
            [ESC, b'[', b'<' | b'M', ..] if self.mouse_capture => DecoderState::InMouseSequence,
            [ESC, b'[', ..] => DecoderState::InCsi,
            [ESC, ..] => DecoderState::InEscape,
            _ => DecoderState::Idle,
        }
    }

    /// Are there buffered bytes waiting for more input?
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Feed bytes and return every event they complete.
    pub fn advance(&mut self, data: &[u8]) -> Vec<Event> {
        self.buf.extend_from_slice(data);
        let mut events = Vec::new();
        let mut pos = 0;

        while pos < self.buf.len() {
            match try_parse(&self.buf[pos..]) {
                Parsed::Event(event, consumed) => {
                    emit(&mut events, event);
                    pos += consumed;
                }
                Parsed::Mouse(report, consumed) => {
                    if self.mouse_capture {
                        let event = Event::Mouse(self.resolve_mouse(report));
                        emit(&mut events, event);
                    } else {
                        for &byte in &self.buf[pos..pos + consumed] {
                            if let Some(key) = byte_key(byte) {
                                emit(&mut events, Event::Key(key));
                            }
                        }
                    }
                    pos += consumed;
                }
                Parsed::Incomplete => break,
                Parsed::Skip(n) => {
                    tracing::debug!(
                        bytes = ?&self.buf[pos..pos + n],
                        "discarded unrecognized input sequence"
                    );
                    pos += n;
                }
            }
        }

        if pos > 0 {
            self.buf.drain(..pos);
        }

        events
    }

    /// Give up waiting: turn every buffered byte into a literal key event.
    ///
    /// A lone ESC becomes [`KeyCode::Escape`]. Bytes of an unfinished UTF-8
    /// character are dropped.
    pub fn flush(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        for &byte in &self.buf {
            if let Some(key) = byte_key(byte) {
                emit(&mut events, Event::Key(key));
            }
        }
        self.buf.clear();
        events
    }

    /// Turn a raw mouse report into an event, tracking the held button.
    fn resolve_mouse(&mut self, report: MouseReport) -> MouseEvent {
        let cb = report.cb;
        let button = MouseButton::from_code(cb);

        let kind = if cb & 64 != 0 {
            match cb & 3 {
                0 => MouseEventKind::ScrollUp,
                1 => MouseEventKind::ScrollDown,
                2 => MouseEventKind::ScrollLeft,
                _ => MouseEventKind::ScrollRight,
            }
        } else if cb & 32 != 0 {
            button.map_or(MouseEventKind::Moved, |b| {
                self.held = Some(b);
                MouseEventKind::Drag(b)
            })
        } else if report.released {
            let b = button.or(self.held).unwrap_or(MouseButton::Left);
            self.held = None;
            MouseEventKind::Up(b)
        } else if let Some(b) = button {
            self.held = Some(b);
            MouseEventKind::Down(b)
        } else {
            // Legacy release (code 3) carries no button; use the held one.
            MouseEventKind::Up(self.held.take().unwrap_or(MouseButton::Left))
        };

        MouseEvent {
            kind,
            x: report.x,
            y: report.y,
            modifiers: Modifiers::from_mouse_bits(cb),
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

fn emit(events: &mut Vec<Event>, event: Event) {
    tracing::trace!(?event, "decoded input event");
    events.push(event);
}

// ─── Stateless Parsing ───────────────────────────────────────────────────────
//
// Every parse function reads from the start of the slice it is given and
// reports what it found plus how many bytes that covers.

/// A mouse report before the held-button context is applied.
#[derive(Debug, Clone, Copy)]
struct MouseReport {
    /// Button byte with any protocol offset removed.
    cb: u16,
    x: u16,
    y: u16,
    /// SGR's lowercase `m` final byte.
    released: bool,
}

enum Parsed {
    /// A complete event covering `usize` bytes.
    Event(Event, usize),
    /// A complete mouse report covering `usize` bytes.
    Mouse(MouseReport, usize),
    /// Need more bytes.
    Incomplete,
    /// Unrecognized bytes; drop `usize` of them.
    Skip(usize),
}

fn try_parse(buf: &[u8]) -> Parsed {
    match buf[0] {
        ESC => parse_escape(buf),
        b @ 0x00..=0x7F => byte_key(b).map_or(Parsed::Skip(1), |key| {
            Parsed::Event(Event::Key(key), 1)
        }),
        0xC0..=0xFF => parse_utf8(buf),
        // Stray continuation byte.
        _ => Parsed::Skip(1),
    }
}

/// The key a single byte stands for on its own.
const fn byte_key(byte: u8) -> Option<KeyEvent> {
    let (code, modifiers) = match byte {
        0x00 => (KeyCode::Char('@'), Modifiers::CTRL),
        0x08 | 0x7F => (KeyCode::Backspace, Modifiers::empty()),
        0x09 => (KeyCode::Tab, Modifiers::empty()),
        0x0A | 0x0D => (KeyCode::Enter, Modifiers::empty()),
        ESC => (KeyCode::Escape, Modifiers::empty()),
        b @ (0x01..=0x07 | 0x0B..=0x0C | 0x0E..=0x1A) => {
            (KeyCode::Char((b - 1 + b'a') as char), Modifiers::CTRL)
        }
        // Ctrl+\ Ctrl+] Ctrl+^ Ctrl+_
        b @ 0x1C..=0x1F => (KeyCode::Char((b + 0x40) as char), Modifiers::CTRL),
        b @ 0x20..=0x7E => (KeyCode::Char(b as char), Modifiers::empty()),
        _ => return None,
    };
    Some(KeyEvent::new(code, modifiers))
}

// ── Escape sequences ────────────────────────────────────────────────────────

fn parse_escape(buf: &[u8]) -> Parsed {
    if buf.len() < 2 {
        return Parsed::Incomplete;
    }

    match buf[1] {
        b'[' => parse_csi(buf),
        b'O' => parse_ss3(buf),
        ESC => parse_double_escape(buf),
        next => byte_key(next).map_or(
            // ESC followed by something that isn't a key: plain Escape.
            Parsed::Event(key(KeyCode::Escape, Modifiers::empty()), 1),
            |alt| {
                let modifiers = alt.modifiers.union(Modifiers::ALT);
                Parsed::Event(key(alt.code, modifiers), 2)
            },
        ),
    }
}

/// `ESC ESC ...`: Alt plus whatever the second ESC starts.
///
/// A key sequence behind the second ESC gains [`Modifiers::ALT`]. Anything
/// else (a mouse report, garbage) yields a plain Escape for the first byte
/// and is decoded on its own from the second.
fn parse_double_escape(buf: &[u8]) -> Parsed {
    if buf.len() < 3 {
        return Parsed::Incomplete;
    }
    if !matches!(buf[2], b'[' | b'O') {
        return Parsed::Event(key(KeyCode::Escape, Modifiers::ALT), 2);
    }

    match parse_escape(&buf[1..]) {
        Parsed::Incomplete => Parsed::Incomplete,
        Parsed::Event(Event::Key(inner), n) => Parsed::Event(
            key(inner.code, inner.modifiers.union(Modifiers::ALT)),
            n + 1,
        ),
        _ => Parsed::Event(key(KeyCode::Escape, Modifiers::empty()), 1),
    }
}

fn parse_ss3(buf: &[u8]) -> Parsed {
    if buf.len() < 3 {
        return Parsed::Incomplete;
    }

    let code = match buf[2] {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'M' => KeyCode::Enter,
        b'P' => KeyCode::F(1),
        b'Q' => KeyCode::F(2),
        b'R' => KeyCode::F(3),
        b'S' => KeyCode::F(4),
        _ => return Parsed::Skip(3),
    };

    Parsed::Event(key(code, Modifiers::empty()), 3)
}

// ── CSI ─────────────────────────────────────────────────────────────────────

fn parse_csi(buf: &[u8]) -> Parsed {
    if buf.len() < 3 {
        return Parsed::Incomplete;
    }

    match buf[2] {
        b'<' => return parse_sgr_mouse(buf),
        b'M' => return parse_x10_mouse(buf),
        _ => {}
    }

    // Parameter bytes are 0x30..=0x3F, intermediates 0x20..=0x2F, and the
    // final byte is 0x40..=0x7E.
    let end = match scan(buf, 2, |b| (0x40..=0x7E).contains(&b), |b| (0x20..=0x3F).contains(&b)) {
        Scan::Found(end) => end,
        Scan::Invalid(at) => return Parsed::Skip(at),
        Scan::Incomplete => return Parsed::Incomplete,
        Scan::TooLong(n) => return Parsed::Skip(n),
    };

    let final_byte = buf[end];
    let consumed = end + 1;
    let Some(params) = parse_params(&buf[2..end]) else {
        // Private markers or intermediates: not a key we know.
        return Parsed::Skip(consumed);
    };
    let modifiers = params
        .get(1)
        .map_or(Modifiers::empty(), |&p| Modifiers::from_xterm_param(p));

    let code = match final_byte {
        b'~' => match tilde_key(params.first().copied().unwrap_or(0)) {
            Some(code) => code,
            None => return Parsed::Skip(consumed),
        },
        b'M' if params.len() == 3 => return rxvt_mouse(&params, consumed),
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'P' => KeyCode::F(1),
        b'Q' => KeyCode::F(2),
        b'R' => KeyCode::F(3),
        b'S' => KeyCode::F(4),
        b'Z' => return Parsed::Event(key(KeyCode::Tab, Modifiers::SHIFT), consumed),
        _ => return Parsed::Skip(consumed),
    };

    Parsed::Event(key(code, modifiers), consumed)
}

/// `CSI n ~` keys.
const fn tilde_key(n: u16) -> Option<KeyCode> {
    let code = match n {
        1 | 7 => KeyCode::Home,
        2 => KeyCode::Insert,
        3 => KeyCode::Delete,
        4 | 8 => KeyCode::End,
        5 => KeyCode::PageUp,
        6 => KeyCode::PageDown,
        11 => KeyCode::F(1),
        12 => KeyCode::F(2),
        13 => KeyCode::F(3),
        14 => KeyCode::F(4),
        15 => KeyCode::F(5),
        17 => KeyCode::F(6),
        18 => KeyCode::F(7),
        19 => KeyCode::F(8),
        20 => KeyCode::F(9),
        21 => KeyCode::F(10),
        23 => KeyCode::F(11),
        24 => KeyCode::F(12),
        25 => KeyCode::F(13),
        26 => KeyCode::F(14),
        28 => KeyCode::F(15),
        29 => KeyCode::F(16),
        31 => KeyCode::F(17),
        32 => KeyCode::F(18),
        33 => KeyCode::F(19),
        34 => KeyCode::F(20),
        _ => return None,
    };
    Some(code)
}

// ── Mouse ───────────────────────────────────────────────────────────────────

/// `CSI < Cb ; Cx ; Cy M` (press or motion) / `m` (release).
fn parse_sgr_mouse(buf: &[u8]) -> Parsed {
    let end = match scan(buf, 3, |b| b == b'M' || b == b'm', |b| b.is_ascii_digit() || b == b';') {
        Scan::Found(end) => end,
        Scan::Invalid(at) => return Parsed::Skip(at),
        Scan::Incomplete => return Parsed::Incomplete,
        Scan::TooLong(n) => return Parsed::Skip(n),
    };

    let consumed = end + 1;
    match parse_params(&buf[3..end]).as_deref() {
        Some(&[cb, x, y]) => Parsed::Mouse(
            MouseReport {
                cb,
                x: x.saturating_sub(1),
                y: y.saturating_sub(1),
                released: buf[end] == b'm',
            },
            consumed,
        ),
        _ => Parsed::Skip(consumed),
    }
}

/// `CSI M cb cx cy`, three raw bytes each offset by 32.
fn parse_x10_mouse(buf: &[u8]) -> Parsed {
    if buf.len() < 6 {
        return Parsed::Incomplete;
    }

    let [cb, cx, cy] = [buf[3], buf[4], buf[5]].map(u16::from);
    if cb < X10_OFFSET || cx <= X10_OFFSET || cy <= X10_OFFSET {
        return Parsed::Skip(3);
    }

    Parsed::Mouse(
        MouseReport {
            cb: cb - X10_OFFSET,
            x: cx - X10_OFFSET - 1,
            y: cy - X10_OFFSET - 1,
            released: false,
        },
        6,
    )
}

/// `CSI Cb ; Cx ; Cy M` with `Cb` offset by 32 and decimal coordinates.
fn rxvt_mouse(params: &[u16], consumed: usize) -> Parsed {
    let [cb, x, y] = [params[0], params[1], params[2]];
    if cb < X10_OFFSET {
        return Parsed::Skip(consumed);
    }
    Parsed::Mouse(
        MouseReport {
            cb: cb - X10_OFFSET,
            x: x.saturating_sub(1),
            y: y.saturating_sub(1),
            released: false,
        },
        consumed,
    )
}

// ── UTF-8 ───────────────────────────────────────────────────────────────────

fn parse_utf8(buf: &[u8]) -> Parsed {
    let expected = utf8_char_len(buf[0]);

    if expected == 0 {
        return Parsed::Skip(1);
    }
    if buf.len() < expected {
        // Bail early if what we have already can't be a continuation.
        if buf[1..].iter().any(|&b| b & 0xC0 != 0x80) {
            return Parsed::Skip(1);
        }
        return Parsed::Incomplete;
    }

    std::str::from_utf8(&buf[..expected])
        .ok()
        .and_then(|s| s.chars().next())
        .map_or(Parsed::Skip(1), |ch| {
            Parsed::Event(key(KeyCode::Char(ch), Modifiers::empty()), expected)
        })
}

/// Byte length of a UTF-8 character from its lead byte, or 0 if invalid.
const fn utf8_char_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 0,
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

const fn key(code: KeyCode, modifiers: Modifiers) -> Event {
    Event::Key(KeyEvent::new(code, modifiers))
}

enum Scan {
    /// Index of the terminating byte.
    Found(usize),
    /// A byte that belongs to neither class, at this index.
    Invalid(usize),
    Incomplete,
    /// Reached [`MAX_SEQUENCE_LEN`] without a terminator.
    TooLong(usize),
}

/// Look for a byte matching `is_final` from `start`, allowing only bytes
/// matching `is_body` before it.
fn scan(
    buf: &[u8],
    start: usize,
    is_final: impl Fn(u8) -> bool,
    is_body: impl Fn(u8) -> bool,
) -> Scan {
    let limit = buf.len().min(MAX_SEQUENCE_LEN);
    for (i, &b) in buf.iter().enumerate().take(limit).skip(start) {
        if is_final(b) {
            return Scan::Found(i);
        }
        if !is_body(b) {
            // Leave the offending byte in place; it may start the next event.
            return Scan::Invalid(i);
        }
    }
    if buf.len() >= MAX_SEQUENCE_LEN {
        Scan::TooLong(limit)
    } else {
        Scan::Incomplete
    }
}

/// Semicolon-separated decimal parameters. Empty fields read as 0.
/// `None` if anything other than digits and `;` is present.
fn parse_params(raw: &[u8]) -> Option<Vec<u16>> {
    if raw.is_empty() {
        return Some(Vec::new());
    }
    raw.split(|&b| b == b';').map(parse_number).collect()
}

fn parse_number(digits: &[u8]) -> Option<u16> {
    digits.iter().try_fold(0u16, |acc, &b| {
        b.is_ascii_digit()
            .then(|| acc.saturating_mul(10).saturating_add(u16::from(b - b'0')))
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(data: &[u8]) -> Vec<Event> {
        Decoder::new().advance(data)
    }

    fn parse_one(data: &[u8]) -> Event {
        let events = parse(data);
        assert_eq!(events.len(), 1, "expected 1 event, got {events:?}");
        events[0]
    }

    fn plain(code: KeyCode) -> Event {
        key(code, Modifiers::empty())
    }

    fn mouse(kind: MouseEventKind, x: u16, y: u16) -> Event {
        Event::Mouse(MouseEvent::new(kind, x, y))
    }

    // ── Plain keys ──────────────────────────────────────────────────────

    #[test]
    fn ascii_chars() {
        assert_eq!(
            parse(b"a~ "),
            [
                plain(KeyCode::Char('a')),
                plain(KeyCode::Char('~')),
                plain(KeyCode::Char(' ')),
            ]
        );
    }

    #[test]
    fn control_bytes() {
        assert_eq!(parse_one(b"\x01"), key(KeyCode::Char('a'), Modifiers::CTRL));
        assert_eq!(parse_one(b"\x1a"), key(KeyCode::Char('z'), Modifiers::CTRL));
        assert_eq!(parse_one(b"\x00"), key(KeyCode::Char('@'), Modifiers::CTRL));
        assert_eq!(parse_one(b"\x1c"), key(KeyCode::Char('\\'), Modifiers::CTRL));
        assert_eq!(parse_one(b"\r"), plain(KeyCode::Enter));
        assert_eq!(parse_one(b"\n"), plain(KeyCode::Enter));
        assert_eq!(parse_one(b"\t"), plain(KeyCode::Tab));
        assert_eq!(parse_one(b"\x7f"), plain(KeyCode::Backspace));
        assert_eq!(parse_one(b"\x08"), plain(KeyCode::Backspace));
    }

    #[test]
    fn utf8_chars() {
        assert_eq!(parse_one("é".as_bytes()), plain(KeyCode::Char('é')));
        assert_eq!(parse_one("日".as_bytes()), plain(KeyCode::Char('日')));
        assert_eq!(parse_one("🦀".as_bytes()), plain(KeyCode::Char('🦀')));
    }

    #[test]
    fn utf8_split_across_reads() {
        let mut d = Decoder::new();
        let crab = "🦀".as_bytes();
        assert!(d.advance(&crab[..2]).is_empty());
        assert!(d.has_pending());
        assert_eq!(d.state(), DecoderState::Idle);
        assert_eq!(d.advance(&crab[2..]), [plain(KeyCode::Char('🦀'))]);
        assert!(!d.has_pending());
    }

    #[test]
    fn invalid_utf8_is_skipped() {
        assert_eq!(parse(b"\x80a"), [plain(KeyCode::Char('a'))]);
        assert_eq!(parse(b"\xc3a"), [plain(KeyCode::Char('a'))]);
        assert_eq!(parse(b"\xffb"), [plain(KeyCode::Char('b'))]);
    }

    // ── Escape ──────────────────────────────────────────────────────────

    #[test]
    fn lone_escape_waits_then_flushes() {
        let mut d = Decoder::new();
        assert!(d.advance(b"\x1b").is_empty());
        assert_eq!(d.state(), DecoderState::InEscape);
        assert_eq!(d.flush(), [plain(KeyCode::Escape)]);
        assert_eq!(d.state(), DecoderState::Idle);
        assert!(!d.has_pending());
    }

    #[test]
    fn flush_turns_partial_csi_into_literals() {
        let mut d = Decoder::new();
        assert!(d.advance(b"\x1b[1;").is_empty());
        assert_eq!(d.state(), DecoderState::InCsi);
        assert_eq!(
            d.flush(),
            [
                plain(KeyCode::Escape),
                plain(KeyCode::Char('[')),
                plain(KeyCode::Char('1')),
                plain(KeyCode::Char(';')),
            ]
        );
    }

    #[test]
    fn flush_with_nothing_pending() {
        assert!(Decoder::new().flush().is_empty());
    }

    #[test]
    fn alt_keys() {
        assert_eq!(parse_one(b"\x1bx"), key(KeyCode::Char('x'), Modifiers::ALT));
        assert_eq!(parse_one(b"\x1b\r"), key(KeyCode::Enter, Modifiers::ALT));
        assert_eq!(
            parse(b"\x1b\x1bx"),
            [key(KeyCode::Escape, Modifiers::ALT), plain(KeyCode::Char('x'))]
        );
        assert_eq!(
            parse_one(b"\x1b\x01"),
            key(KeyCode::Char('a'), Modifiers::ALT | Modifiers::CTRL)
        );
    }

    #[test]
    fn escape_before_csi_key_adds_alt() {
        assert_eq!(parse_one(b"\x1b\x1b[A"), key(KeyCode::Up, Modifiers::ALT));
        assert_eq!(parse_one(b"\x1b\x1bOP"), key(KeyCode::F(1), Modifiers::ALT));
        assert_eq!(
            parse_one(b"\x1b\x1b[3;5~"),
            key(KeyCode::Delete, Modifiers::ALT | Modifiers::CTRL)
        );
    }

    #[test]
    fn double_escape_waits_for_third_byte() {
        let mut d = Decoder::new();
        assert!(d.advance(b"\x1b\x1b").is_empty());
        assert!(d.advance(b"[").is_empty());
        assert_eq!(d.advance(b"B"), [key(KeyCode::Down, Modifiers::ALT)]);

        assert!(d.advance(b"\x1b\x1b").is_empty());
        assert_eq!(d.flush(), [plain(KeyCode::Escape), plain(KeyCode::Escape)]);
    }

    #[test]
    fn escape_before_mouse_report_keeps_report() {
        assert_eq!(
            parse(b"\x1b\x1b[<0;10;5M"),
            [
                plain(KeyCode::Escape),
                mouse(MouseEventKind::Down(MouseButton::Left), 9, 4),
            ]
        );
    }

    #[test]
    fn escape_before_non_key_byte() {
        assert_eq!(
            parse("\x1bé".as_bytes()),
            [plain(KeyCode::Escape), plain(KeyCode::Char('é'))]
        );
    }

    // ── CSI keys ────────────────────────────────────────────────────────

    #[test]
    fn arrows() {
        assert_eq!(
            parse(b"\x1b[A\x1b[B\x1b[C\x1b[D"),
            [
                plain(KeyCode::Up),
                plain(KeyCode::Down),
                plain(KeyCode::Right),
                plain(KeyCode::Left),
            ]
        );
    }

    #[test]
    fn modified_arrows() {
        assert_eq!(parse_one(b"\x1b[1;5A"), key(KeyCode::Up, Modifiers::CTRL));
        assert_eq!(
            parse_one(b"\x1b[1;4D"),
            key(KeyCode::Left, Modifiers::SHIFT | Modifiers::ALT)
        );
    }

    #[test]
    fn home_end_both_encodings() {
        assert_eq!(parse_one(b"\x1b[H"), plain(KeyCode::Home));
        assert_eq!(parse_one(b"\x1b[F"), plain(KeyCode::End));
        assert_eq!(parse_one(b"\x1b[1~"), plain(KeyCode::Home));
        assert_eq!(parse_one(b"\x1b[4~"), plain(KeyCode::End));
        assert_eq!(parse_one(b"\x1b[7~"), plain(KeyCode::Home));
    }

    #[test]
    fn editing_keys() {
        assert_eq!(parse_one(b"\x1b[2~"), plain(KeyCode::Insert));
        assert_eq!(parse_one(b"\x1b[3~"), plain(KeyCode::Delete));
        assert_eq!(parse_one(b"\x1b[5~"), plain(KeyCode::PageUp));
        assert_eq!(parse_one(b"\x1b[6;3~"), key(KeyCode::PageDown, Modifiers::ALT));
    }

    #[test]
    fn function_keys() {
        assert_eq!(parse_one(b"\x1bOP"), plain(KeyCode::F(1)));
        assert_eq!(parse_one(b"\x1bOS"), plain(KeyCode::F(4)));
        assert_eq!(parse_one(b"\x1b[11~"), plain(KeyCode::F(1)));
        assert_eq!(parse_one(b"\x1b[15~"), plain(KeyCode::F(5)));
        assert_eq!(parse_one(b"\x1b[24~"), plain(KeyCode::F(12)));
        assert_eq!(parse_one(b"\x1b[34~"), plain(KeyCode::F(20)));
        assert_eq!(parse_one(b"\x1b[1;2P"), key(KeyCode::F(1), Modifiers::SHIFT));
        assert_eq!(parse_one(b"\x1b[15;5~"), key(KeyCode::F(5), Modifiers::CTRL));
    }

    #[test]
    fn ss3_cursor_keys() {
        assert_eq!(parse_one(b"\x1bOA"), plain(KeyCode::Up));
        assert_eq!(parse_one(b"\x1bOH"), plain(KeyCode::Home));
        assert_eq!(parse_one(b"\x1bOM"), plain(KeyCode::Enter));
    }

    #[test]
    fn shift_tab() {
        assert_eq!(parse_one(b"\x1b[Z"), key(KeyCode::Tab, Modifiers::SHIFT));
    }

    #[test]
    fn csi_split_across_reads() {
        let mut d = Decoder::new();
        assert!(d.advance(b"\x1b").is_empty());
        assert!(d.advance(b"[1;").is_empty());
        assert_eq!(d.state(), DecoderState::InCsi);
        assert_eq!(d.advance(b"5C"), [key(KeyCode::Right, Modifiers::CTRL)]);
        assert_eq!(d.state(), DecoderState::Idle);
    }

    // ── Malformed input ─────────────────────────────────────────────────

    #[test]
    fn unknown_sequences_are_discarded() {
        assert_eq!(parse(b"\x1b[99~a"), [plain(KeyCode::Char('a'))]);
        assert_eq!(parse(b"\x1b[?1;2cb"), [plain(KeyCode::Char('b'))]);
        assert_eq!(parse(b"\x1bOzc"), [plain(KeyCode::Char('c'))]);
        assert_eq!(parse(b"\x1b[5yd"), [plain(KeyCode::Char('d'))]);
    }

    #[test]
    fn invalid_byte_inside_csi_starts_next_event() {
        assert_eq!(parse(b"\x1b[1\x1b[A"), [plain(KeyCode::Up)]);
    }

    #[test]
    fn unterminated_csi_is_bounded() {
        let mut d = Decoder::new();
        let mut seq = b"\x1b[".to_vec();
        seq.extend(std::iter::repeat_n(b'1', MAX_SEQUENCE_LEN - 3));
        assert!(d.advance(&seq).is_empty());
        assert_eq!(d.state(), DecoderState::InCsi);

        // One more parameter byte reaches the limit: the whole thing goes.
        assert!(d.advance(b"1").is_empty());
        assert!(!d.has_pending());
        assert_eq!(d.advance(b"a"), [plain(KeyCode::Char('a'))]);
    }

    #[test]
    fn unterminated_sgr_mouse_is_bounded() {
        let mut d = Decoder::new();
        let mut seq = b"\x1b[<".to_vec();
        seq.extend(std::iter::repeat_n(b';', MAX_SEQUENCE_LEN));
        // 64 bytes dropped, the remaining semicolons come out as keys.
        assert_eq!(d.advance(&seq), [plain(KeyCode::Char(';')); 3]);
        assert!(!d.has_pending());
    }

    // ── SGR mouse ───────────────────────────────────────────────────────

    #[test]
    fn sgr_left_press_is_zero_based() {
        assert_eq!(
            parse_one(b"\x1b[<0;10;5M"),
            mouse(MouseEventKind::Down(MouseButton::Left), 9, 4)
        );
    }

    #[test]
    fn sgr_press_drag_release() {
        assert_eq!(
            parse(b"\x1b[<2;1;1M\x1b[<34;2;1M\x1b[<2;3;1m"),
            [
                mouse(MouseEventKind::Down(MouseButton::Right), 0, 0),
                mouse(MouseEventKind::Drag(MouseButton::Right), 1, 0),
                mouse(MouseEventKind::Up(MouseButton::Right), 2, 0),
            ]
        );
    }

    #[test]
    fn sgr_motion_without_button() {
        assert_eq!(parse_one(b"\x1b[<35;7;8M"), mouse(MouseEventKind::Moved, 6, 7));
    }

    #[test]
    fn sgr_wheel() {
        assert_eq!(parse_one(b"\x1b[<64;5;5M"), mouse(MouseEventKind::ScrollUp, 4, 4));
        assert_eq!(parse_one(b"\x1b[<65;5;5M"), mouse(MouseEventKind::ScrollDown, 4, 4));
        assert_eq!(parse_one(b"\x1b[<66;5;5M"), mouse(MouseEventKind::ScrollLeft, 4, 4));
    }

    #[test]
    fn sgr_modifiers() {
        let Event::Mouse(m) = parse_one(b"\x1b[<28;1;1M") else {
            panic!("expected a mouse event");
        };
        assert_eq!(m.kind, MouseEventKind::Down(MouseButton::Left));
        assert_eq!(m.modifiers, Modifiers::SHIFT | Modifiers::ALT | Modifiers::CTRL);
    }

    #[test]
    fn sgr_large_coordinates() {
        assert_eq!(
            parse_one(b"\x1b[<1;300;200M"),
            mouse(MouseEventKind::Down(MouseButton::Middle), 299, 199)
        );
    }

    #[test]
    fn sgr_split_across_reads() {
        let mut d = Decoder::new();
        assert!(d.advance(b"\x1b[<0;1").is_empty());
        assert_eq!(d.state(), DecoderState::InMouseSequence);
        assert_eq!(
            d.advance(b"0;5M"),
            [mouse(MouseEventKind::Down(MouseButton::Left), 9, 4)]
        );
    }

    #[test]
    fn sgr_wrong_arity_is_discarded() {
        assert_eq!(parse(b"\x1b[<0;1Mz"), [plain(KeyCode::Char('z'))]);
    }

    // ── Legacy mouse ────────────────────────────────────────────────────

    #[test]
    fn x10_release_reports_previous_button() {
        let mut d = Decoder::new();
        // Right press at (9, 4), then a button-less release.
        assert_eq!(
            d.advance(b"\x1b[M\"*%"),
            [mouse(MouseEventKind::Down(MouseButton::Right), 9, 4)]
        );
        assert_eq!(
            d.advance(b"\x1b[M#*%"),
            [mouse(MouseEventKind::Up(MouseButton::Right), 9, 4)]
        );
        // Nothing held any more: a stray release defaults to Left.
        assert_eq!(
            d.advance(b"\x1b[M#!!"),
            [mouse(MouseEventKind::Up(MouseButton::Left), 0, 0)]
        );
    }

    #[test]
    fn x10_drag_and_far_coordinates() {
        // Drag with middle (32 + 1 + 32 = 'A'), x = 0xC8 - 33 = 167.
        assert_eq!(
            parse_one(b"\x1b[MA\xc8!"),
            mouse(MouseEventKind::Drag(MouseButton::Middle), 167, 0)
        );
    }

    #[test]
    fn x10_waits_for_all_bytes() {
        let mut d = Decoder::new();
        assert!(d.advance(b"\x1b[M ").is_empty());
        assert_eq!(d.state(), DecoderState::InMouseSequence);
        assert_eq!(
            d.advance(b"!!"),
            [mouse(MouseEventKind::Down(MouseButton::Left), 0, 0)]
        );
    }

    #[test]
    fn rxvt_reports() {
        let mut d = Decoder::new();
        assert_eq!(
            d.advance(b"\x1b[32;10;5M\x1b[35;11;5M"),
            [
                mouse(MouseEventKind::Down(MouseButton::Left), 9, 4),
                mouse(MouseEventKind::Up(MouseButton::Left), 10, 4),
            ]
        );
        assert_eq!(d.advance(b"\x1b[96;1;1M"), [mouse(MouseEventKind::ScrollUp, 0, 0)]);
    }

    // ── Capture toggle ──────────────────────────────────────────────────

    #[test]
    fn capture_off_passes_mouse_bytes_through() {
        let mut d = Decoder::new().with_mouse_capture(false);
        let events = d.advance(b"\x1b[<0;1;2M");
        assert_eq!(
            events,
            [
                plain(KeyCode::Escape),
                plain(KeyCode::Char('[')),
                plain(KeyCode::Char('<')),
                plain(KeyCode::Char('0')),
                plain(KeyCode::Char(';')),
                plain(KeyCode::Char('1')),
                plain(KeyCode::Char(';')),
                plain(KeyCode::Char('2')),
                plain(KeyCode::Char('M')),
            ]
        );
    }

    #[test]
    fn capture_off_keeps_keys_working() {
        let mut d = Decoder::new().with_mouse_capture(false);
        assert_eq!(d.advance(b"\x1b[A"), [plain(KeyCode::Up)]);
        assert!(d.advance(b"\x1b[<0").is_empty());
        assert_eq!(d.state(), DecoderState::InCsi);
    }

    #[test]
    fn toggle_capture_mid_stream() {
        let mut d = Decoder::new();
        assert_eq!(
            d.advance(b"\x1b[<0;1;1M"),
            [mouse(MouseEventKind::Down(MouseButton::Left), 0, 0)]
        );
        d.set_mouse_capture(false);
        let events = d.advance(b"\x1b[<0;1;1m");
        assert!(events.iter().all(|e| matches!(e, Event::Key(_))));
        assert_eq!(events.len(), 9);
        d.set_mouse_capture(true);
        assert_eq!(
            d.advance(b"\x1b[<0;1;1m"),
            [mouse(MouseEventKind::Up(MouseButton::Left), 0, 0)]
        );
    }

    // ── Round trip ──────────────────────────────────────────────────────

    #[test]
    fn sgr_reports_round_trip() {
        let cases = [
            MouseEvent::new(MouseEventKind::Down(MouseButton::Left), 9, 4),
            MouseEvent::new(MouseEventKind::Down(MouseButton::Middle), 0, 0),
            MouseEvent::new(MouseEventKind::Up(MouseButton::Right), 79, 23),
            MouseEvent::new(MouseEventKind::Drag(MouseButton::Left), 500, 120),
            MouseEvent::new(MouseEventKind::Moved, 3, 3),
            MouseEvent::new(MouseEventKind::ScrollDown, 12, 1).with_modifiers(Modifiers::CTRL),
            MouseEvent::new(MouseEventKind::Down(MouseButton::Right), 2, 2)
                .with_modifiers(Modifiers::SHIFT | Modifiers::ALT),
        ];
        for event in cases {
            let report = event.to_sgr();
            assert_eq!(parse_one(report.as_bytes()), Event::Mouse(event), "{report:?}");
        }
    }

    #[test]
    fn x10_reports_round_trip_with_context() {
        let press = MouseEvent::new(MouseEventKind::Down(MouseButton::Middle), 40, 12);
        let drag = MouseEvent::new(MouseEventKind::Drag(MouseButton::Middle), 41, 12);
        let release = MouseEvent::new(MouseEventKind::Up(MouseButton::Middle), 41, 12);

        let mut bytes = press.to_x10().unwrap();
        bytes.extend(drag.to_x10().unwrap());
        bytes.extend(release.to_x10().unwrap());

        assert_eq!(
            Decoder::new().advance(&bytes),
            [Event::Mouse(press), Event::Mouse(drag), Event::Mouse(release)]
        );
    }

    #[test]
    fn sgr_and_x10_agree() {
        let event = MouseEvent::new(MouseEventKind::Down(MouseButton::Left), 17, 6);
        assert_eq!(
            parse_one(event.to_sgr().as_bytes()),
            parse_one(&event.to_x10().unwrap())
        );
    }

    // ── Mixed stream ────────────────────────────────────────────────────

    #[test]
    fn mixed_keys_and_mouse_preserve_order() {
        assert_eq!(
            parse(b"a\x1b[<0;2;2M\x1b[Bb"),
            [
                plain(KeyCode::Char('a')),
                mouse(MouseEventKind::Down(MouseButton::Left), 1, 1),
                plain(KeyCode::Down),
                plain(KeyCode::Char('b')),
            ]
        );
    }
}
