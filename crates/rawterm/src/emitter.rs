// SPDX-License-Identifier: MIT
//
// Escape sequence emitter: the stateful front for `ansi`.
//
// The `ansi` module knows bytes; the emitter knows the terminal. It owns the
// output sink, decides how far to downsample colors for the detected
// capability, and applies the flush policy. Every setter writes its
// sequence synchronously. With auto-flush on (the default) the sink is
// flushed before the call returns, so the terminal reflects the change
// immediately. Turn it off to batch a frame and call `flush` once.
//
// Any failure from the sink is surfaced as `Error::Write`. The stdout
// emitter also tells the panic hook whether the alternate screen is active.

use std::io::{self, Stdout, Write};

use crate::ansi::{self, ClearType, MouseMode};
use crate::attr::{Attribute, Attributes};
use crate::color::{Color, ColorMode};
use crate::error::{Error, Result};
use crate::raw_mode;

/// Writes escape sequences to an output sink.
///
/// ```
/// use rawterm::color::{Color, ColorMode};
/// use rawterm::emitter::Emitter;
///
/// let mut out = Emitter::new(Vec::new(), ColorMode::Ansi256);
/// out.move_to(4, 2)?;
/// out.set_foreground_color(Color::rgb(255, 0, 0))?;
/// assert_eq!(out.get_ref().as_slice(), b"\x1b[3;5H\x1b[91m");
/// # Ok::<(), rawterm::Error>(())
/// ```
#[derive(Debug)]
pub struct Emitter<W: Write> {
    out: W,
    mode: ColorMode,
    auto_flush: bool,
    /// Report alternate-screen changes to the panic hook.
    tracks_screen: bool,
}

impl Emitter<Stdout> {
    /// Emitter over the process's standard output.
    #[must_use]
    pub fn stdout(mode: ColorMode) -> Self {
        Self {
            tracks_screen: true,
            ..Self::new(io::stdout(), mode)
        }
    }
}

impl<W: Write> Emitter<W> {
    /// Wrap `out`, with auto-flush enabled.
    pub const fn new(out: W, mode: ColorMode) -> Self {
        Self {
            out,
            mode,
            auto_flush: true,
            tracks_screen: false,
        }
    }

    #[must_use]
    pub const fn with_auto_flush(mut self, auto_flush: bool) -> Self {
        self.auto_flush = auto_flush;
        self
    }

    #[inline]
    #[must_use]
    pub const fn color_mode(&self) -> ColorMode {
        self.mode
    }

    pub const fn set_color_mode(&mut self, mode: ColorMode) {
        self.mode = mode;
    }

    #[inline]
    #[must_use]
    pub const fn auto_flush(&self) -> bool {
        self.auto_flush
    }

    pub const fn set_auto_flush(&mut self, auto_flush: bool) {
        self.auto_flush = auto_flush;
    }

    #[must_use]
    pub const fn get_ref(&self) -> &W {
        &self.out
    }

    pub const fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Run one encoder against the sink, then apply the flush policy.
    fn emit(&mut self, f: impl FnOnce(&mut W) -> io::Result<()>) -> Result<()> {
        f(&mut self.out).map_err(Error::write)?;
        if self.auto_flush {
            self.out.flush().map_err(Error::write)?;
        }
        Ok(())
    }

    // ── Cursor ──────────────────────────────────────────────────────────

    /// Move the cursor to column `x`, row `y` (0-based).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn move_to(&mut self, x: u16, y: u16) -> Result<()> {
        self.emit(|w| ansi::cursor_to(w, x, y))
    }

    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn move_up(&mut self, n: u16) -> Result<()> {
        self.emit(|w| ansi::cursor_up(w, n))
    }

    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn move_down(&mut self, n: u16) -> Result<()> {
        self.emit(|w| ansi::cursor_down(w, n))
    }

    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn move_left(&mut self, n: u16) -> Result<()> {
        self.emit(|w| ansi::cursor_left(w, n))
    }

    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn move_right(&mut self, n: u16) -> Result<()> {
        self.emit(|w| ansi::cursor_right(w, n))
    }

    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn move_to_column(&mut self, x: u16) -> Result<()> {
        self.emit(|w| ansi::cursor_to_column(w, x))
    }

    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn move_to_next_line(&mut self, n: u16) -> Result<()> {
        self.emit(|w| ansi::cursor_next_line(w, n))
    }

    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn move_to_previous_line(&mut self, n: u16) -> Result<()> {
        self.emit(|w| ansi::cursor_prev_line(w, n))
    }

    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn save_position(&mut self) -> Result<()> {
        self.emit(ansi::cursor_save)
    }

    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn restore_position(&mut self) -> Result<()> {
        self.emit(ansi::cursor_restore)
    }

    /// Show the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn show(&mut self) -> Result<()> {
        self.emit(ansi::cursor_show)
    }

    /// Hide the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn hide(&mut self) -> Result<()> {
        self.emit(ansi::cursor_hide)
    }

    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn enable_blinking(&mut self) -> Result<()> {
        self.emit(ansi::cursor_blink_on)
    }

    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn disable_blinking(&mut self) -> Result<()> {
        self.emit(ansi::cursor_blink_off)
    }

    // ── Style ───────────────────────────────────────────────────────────

    /// Set the foreground color, downsampled for the current color mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn set_foreground_color(&mut self, color: Color) -> Result<()> {
        let color = color.resolve(self.mode);
        self.emit(|w| ansi::fg(w, color))
    }

    /// Set the background color, downsampled for the current color mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn set_background_color(&mut self, color: Color) -> Result<()> {
        let color = color.resolve(self.mode);
        self.emit(|w| ansi::bg(w, color))
    }

    /// Restore foreground and background to the terminal defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn reset_color(&mut self) -> Result<()> {
        self.emit(ansi::reset_color)
    }

    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn set_attribute(&mut self, attr: Attribute) -> Result<()> {
        self.emit(|w| ansi::attribute(w, attr))
    }

    /// Turn on every attribute in `attrs` with a single sequence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn set_attributes(&mut self, attrs: Attributes) -> Result<()> {
        self.emit(|w| ansi::attributes(w, attrs))
    }

    /// Reset colors and attributes (SGR 0).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn reset(&mut self) -> Result<()> {
        self.emit(ansi::reset)
    }

    // ── Screen ──────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn clear(&mut self, region: ClearType) -> Result<()> {
        self.emit(|w| ansi::clear(w, region))
    }

    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn scroll_up(&mut self, n: u16) -> Result<()> {
        self.emit(|w| ansi::scroll_up(w, n))
    }

    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn scroll_down(&mut self, n: u16) -> Result<()> {
        self.emit(|w| ansi::scroll_down(w, n))
    }

    /// Ask the terminal emulator to resize its window. Best-effort.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn set_size(&mut self, cols: u16, rows: u16) -> Result<()> {
        self.emit(|w| ansi::set_size(w, cols, rows))
    }

    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn enter_alternate_screen(&mut self) -> Result<()> {
        // Noted before writing: a partial write may still switch screens.
        if self.tracks_screen {
            raw_mode::note_alternate_screen(true);
        }
        self.emit(ansi::enter_alt_screen)
    }

    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn leave_alternate_screen(&mut self) -> Result<()> {
        self.emit(ansi::exit_alt_screen)?;
        if self.tracks_screen {
            raw_mode::note_alternate_screen(false);
        }
        Ok(())
    }

    // ── Mouse ───────────────────────────────────────────────────────────

    /// Write the mouse-reporting enable sequences. This only changes what
    /// the terminal sends; the decoder side is toggled on the event source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn enable_mouse(&mut self, mode: MouseMode) -> Result<()> {
        self.emit(|w| ansi::enable_mouse(w, mode))
    }

    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn disable_mouse(&mut self) -> Result<()> {
        self.emit(ansi::disable_mouse)
    }

    // ── Text ────────────────────────────────────────────────────────────

    /// Write plain text at the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn print(&mut self, text: &str) -> Result<()> {
        self.emit(|w| w.write_all(text.as_bytes()))
    }

    /// Write pre-encoded bytes (e.g. a rendered [`StyledContent`]).
    ///
    /// [`StyledContent`]: crate::style::StyledContent
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.emit(|w| w.write_all(bytes))
    }

    /// Flush the sink regardless of the auto-flush setting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if the sink fails.
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush().map_err(Error::write)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::NamedColor;
    use pretty_assertions::assert_eq;

    fn output(e: &Emitter<Vec<u8>>) -> String {
        String::from_utf8(e.get_ref().clone()).unwrap()
    }

    /// Sink that counts flushes.
    #[derive(Default)]
    struct FlushCounter {
        bytes: Vec<u8>,
        flushes: usize,
    }

    impl Write for FlushCounter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    /// Sink whose writes always fail, like a closed pipe.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    /// Sink that accepts writes but fails to flush.
    struct FlushFails;

    impl Write for FlushFails {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("flush failed"))
        }
    }

    #[test]
    fn cursor_commands() {
        let mut e = Emitter::new(Vec::new(), ColorMode::TrueColor);
        e.move_to(9, 4).unwrap();
        e.hide().unwrap();
        e.show().unwrap();
        e.disable_blinking().unwrap();
        e.enable_blinking().unwrap();
        assert_eq!(output(&e), "\x1b[5;10H\x1b[?25l\x1b[?25h\x1b[?12l\x1b[?12h");
    }

    #[test]
    fn relative_cursor_commands() {
        let mut e = Emitter::new(Vec::new(), ColorMode::TrueColor);
        e.move_up(1).unwrap();
        e.move_down(2).unwrap();
        e.move_left(3).unwrap();
        e.move_right(4).unwrap();
        e.move_to_column(0).unwrap();
        e.move_to_next_line(1).unwrap();
        e.move_to_previous_line(1).unwrap();
        e.save_position().unwrap();
        e.restore_position().unwrap();
        assert_eq!(
            output(&e),
            "\x1b[1A\x1b[2B\x1b[3D\x1b[4C\x1b[1G\x1b[1E\x1b[1F\x1b7\x1b8"
        );
    }

    #[test]
    fn truecolor_rgb_is_emitted_verbatim() {
        let mut e = Emitter::new(Vec::new(), ColorMode::TrueColor);
        e.set_foreground_color(Color::rgb(255, 0, 255)).unwrap();
        e.set_background_color(Color::rgb(50, 50, 50)).unwrap();
        assert_eq!(output(&e), "\x1b[38;2;255;0;255m\x1b[48;2;50;50;50m");
    }

    #[test]
    fn ansi256_downsamples_rgb() {
        let mut e = Emitter::new(Vec::new(), ColorMode::Ansi256);
        e.set_foreground_color(Color::rgb(135, 175, 215)).unwrap();
        e.set_background_color(Color::rgb(50, 50, 50)).unwrap();
        assert_eq!(output(&e), "\x1b[38;5;110m\x1b[48;5;236m");
    }

    #[test]
    fn ansi16_downsamples_rgb_and_indexed() {
        let mut e = Emitter::new(Vec::new(), ColorMode::Ansi16);
        e.set_foreground_color(Color::rgb(255, 0, 255)).unwrap();
        e.set_background_color(Color::Indexed(196)).unwrap();
        assert_eq!(output(&e), "\x1b[95m\x1b[101m");
    }

    #[test]
    fn named_colors_are_never_downsampled() {
        let mut e = Emitter::new(Vec::new(), ColorMode::Ansi16);
        e.set_foreground_color(Color::Named(NamedColor::DarkCyan)).unwrap();
        e.set_foreground_color(Color::Reset).unwrap();
        assert_eq!(output(&e), "\x1b[36m\x1b[39m");
    }

    #[test]
    fn attributes_and_reset() {
        let mut e = Emitter::new(Vec::new(), ColorMode::TrueColor);
        e.set_attribute(Attribute::CrossedOut).unwrap();
        e.set_attributes(Attributes::BOLD | Attributes::UNDERLINED).unwrap();
        e.reset_color().unwrap();
        e.reset().unwrap();
        assert_eq!(output(&e), "\x1b[9m\x1b[1;4m\x1b[39;49m\x1b[0m");
    }

    #[test]
    fn screen_commands() {
        let mut e = Emitter::new(Vec::new(), ColorMode::TrueColor);
        e.clear(ClearType::All).unwrap();
        e.scroll_up(1).unwrap();
        e.scroll_down(2).unwrap();
        e.set_size(80, 40).unwrap();
        e.enter_alternate_screen().unwrap();
        e.leave_alternate_screen().unwrap();
        assert_eq!(
            output(&e),
            "\x1b[2J\x1b[1S\x1b[2T\x1b[8;40;80t\x1b[?1049h\x1b[?1049l"
        );
    }

    #[test]
    fn only_stdout_reports_screen_changes() {
        assert!(Emitter::stdout(ColorMode::Ansi16).tracks_screen);
        assert!(!Emitter::new(Vec::new(), ColorMode::Ansi16).tracks_screen);
    }

    #[test]
    fn print_writes_text() {
        let mut e = Emitter::new(Vec::new(), ColorMode::TrueColor);
        e.print("héllo").unwrap();
        e.write_raw(b"!").unwrap();
        assert_eq!(output(&e), "héllo!");
    }

    #[test]
    fn auto_flush_flushes_every_call() {
        let mut e = Emitter::new(FlushCounter::default(), ColorMode::TrueColor);
        e.hide().unwrap();
        e.move_to(0, 0).unwrap();
        assert_eq!(e.get_ref().flushes, 2);
    }

    #[test]
    fn batched_mode_flushes_only_on_request() {
        let mut e =
            Emitter::new(FlushCounter::default(), ColorMode::TrueColor).with_auto_flush(false);
        e.hide().unwrap();
        e.move_to(0, 0).unwrap();
        assert_eq!(e.get_ref().flushes, 0);
        e.flush().unwrap();
        assert_eq!(e.get_ref().flushes, 1);
        assert_eq!(e.get_ref().bytes, b"\x1b[?25l\x1b[1;1H");
    }

    #[test]
    fn closed_sink_surfaces_write_error() {
        let mut e = Emitter::new(ClosedPipe, ColorMode::TrueColor);
        let err = e.move_to(1, 1).unwrap_err();
        assert!(matches!(err, Error::Write(ref io) if io.kind() == io::ErrorKind::BrokenPipe));
    }

    #[test]
    fn flush_failure_is_not_swallowed() {
        let mut e = Emitter::new(FlushFails, ColorMode::TrueColor);
        assert!(matches!(e.show(), Err(Error::Write(_))));
        e.set_auto_flush(false);
        assert!(e.show().is_ok());
        assert!(matches!(e.flush(), Err(Error::Write(_))));
    }

    #[test]
    fn color_mode_can_change() {
        let mut e = Emitter::new(Vec::new(), ColorMode::TrueColor);
        e.set_color_mode(ColorMode::Ansi16);
        assert_eq!(e.color_mode(), ColorMode::Ansi16);
        e.set_foreground_color(Color::rgb(0, 0, 250)).unwrap();
        assert_eq!(e.into_inner(), b"\x1b[94m");
    }
}
