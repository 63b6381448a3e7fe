// SPDX-License-Identifier: MIT
//
// Terminal handle: size queries, mouse capture, and cleanup.
//
// Safety: the size query uses ioctl(TIOCGWINSZ) on stdout.
#![allow(unsafe_code)]
//
// `Terminal` is the context object an application holds for the lifetime of
// its UI. Creating one switches the controlling terminal to raw mode,
// resolves the color capability, and starts the event reader on the same
// terminal device.
// `restore` undoes everything the handle changed and also runs on drop.
// A panic in raw mode is covered separately by the hook in `raw_mode`.

use std::io::{self, Stdout, Write};
use std::time::Duration;

use crate::config::{self, Config};
use crate::emitter::Emitter;
use crate::error::{Error, Result};
use crate::event::Event;
#[cfg(unix)]
use crate::raw_mode;
use crate::source::EventSource;

// ─── Size ────────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

impl Size {
    /// Total number of cells (`cols × rows`).
    #[inline]
    #[must_use]
    pub const fn area(self) -> u32 {
        self.cols as u32 * self.rows as u32
    }
}

/// Query the terminal size.
///
/// Asks stdout with `ioctl(TIOCGWINSZ)` and falls back to the `COLUMNS` and
/// `LINES` environment variables.
///
/// # Errors
///
/// [`Error::Size`] if neither source has an answer.
pub fn size() -> Result<Size> {
    match query_size() {
        Ok(size) => Ok(size),
        Err(err) => config::size_from_env()
            .map(|(cols, rows)| Size { cols, rows })
            .ok_or(Error::Size(err)),
    }
}

#[cfg(unix)]
fn query_size() -> io::Result<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &raw mut ws) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    if ws.ws_col == 0 || ws.ws_row == 0 {
        return Err(io::Error::other("terminal reported a zero size"));
    }
    Ok(Size {
        cols: ws.ws_col,
        rows: ws.ws_row,
    })
}

#[cfg(not(unix))]
fn query_size() -> io::Result<Size> {
    Err(io::Error::from(io::ErrorKind::Unsupported))
}

// ─── Terminal ────────────────────────────────────────────────────────────────

/// The controlling terminal, in raw mode, with an event reader attached.
///
/// ```no_run
/// use rawterm::config::Config;
/// use rawterm::event::{Event, KeyCode};
/// use rawterm::terminal::Terminal;
///
/// let mut term = Terminal::new(Config::default())?;
/// term.enable_mouse_capture()?;
/// term.emitter_mut().print("press q to quit")?;
/// while let Event::Key(key) = term.read()? {
///     if key.code == KeyCode::Char('q') {
///         break;
///     }
/// }
/// term.restore()?;
/// # Ok::<(), rawterm::Error>(())
/// ```
#[derive(Debug)]
pub struct Terminal {
    emitter: Emitter<Stdout>,
    events: EventSource,
    config: Config,
    cleanup: Cleanup,
}

impl Terminal {
    /// Enter raw mode and start reading the terminal it was entered on
    /// (stdin, or `/dev/tty` when stdin is redirected).
    ///
    /// If raw mode was already on, the existing owner stays responsible for
    /// leaving it.
    ///
    /// # Errors
    ///
    /// [`Error::Mode`] if raw mode cannot be entered, [`Error::Spawn`] if the
    /// reader thread cannot be started.
    #[cfg(unix)]
    pub fn new(config: Config) -> Result<Self> {
        let owns_raw_mode = raw_mode::enable_tracked()?;

        let events = match EventSource::tty(&config) {
            Ok(events) => events,
            Err(err) => {
                if owns_raw_mode {
                    let _ = raw_mode::disable_raw_mode();
                }
                return Err(err);
            }
        };

        let mode = config.resolved_color_mode();
        tracing::debug!(?mode, "terminal opened");

        Ok(Self {
            emitter: Emitter::stdout(mode).with_auto_flush(config.auto_flush),
            events,
            config,
            cleanup: Cleanup::new(owns_raw_mode),
        })
    }

    /// # Errors
    ///
    /// Always [`Error::Mode`]: raw mode needs a Unix terminal.
    #[cfg(not(unix))]
    pub fn new(_config: Config) -> Result<Self> {
        Err(crate::error::ModeError::NotATerminal.into())
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn emitter(&self) -> &Emitter<Stdout> {
        &self.emitter
    }

    pub const fn emitter_mut(&mut self) -> &mut Emitter<Stdout> {
        &mut self.emitter
    }

    #[must_use]
    pub const fn events(&self) -> &EventSource {
        &self.events
    }

    /// See [`EventSource::read`].
    ///
    /// # Errors
    ///
    /// [`Error::Disconnected`] once terminal input has closed.
    pub fn read(&self) -> Result<Event> {
        self.events.read()
    }

    /// See [`EventSource::poll`].
    ///
    /// # Errors
    ///
    /// [`Error::Disconnected`] once terminal input has closed.
    pub fn poll(&self, timeout: Duration) -> Result<bool> {
        self.events.poll(timeout)
    }

    /// Current size. See [`size`].
    ///
    /// # Errors
    ///
    /// [`Error::Size`] if the size cannot be determined.
    pub fn size(&self) -> Result<Size> {
        size()
    }

    /// Ask the terminal to resize itself. Many terminals ignore this.
    ///
    /// # Errors
    ///
    /// [`Error::Write`] if stdout fails.
    pub fn set_size(&mut self, cols: u16, rows: u16) -> Result<()> {
        self.emitter.set_size(cols, rows)
    }

    /// Start mouse tracking: ask the terminal for reports in the configured
    /// [`MouseMode`](crate::ansi::MouseMode) and decode them as mouse events.
    ///
    /// # Errors
    ///
    /// [`Error::Write`] if stdout fails. Decoding stays off in that case.
    pub fn enable_mouse_capture(&mut self) -> Result<()> {
        self.emitter.enable_mouse(self.config.mouse_mode)?;
        self.events.set_mouse_capture(true);
        Ok(())
    }

    /// Stop mouse tracking. Mouse bytes still in flight decode as keys.
    ///
    /// # Errors
    ///
    /// [`Error::Write`] if stdout fails.
    pub fn disable_mouse_capture(&mut self) -> Result<()> {
        self.events.set_mouse_capture(false);
        self.emitter.disable_mouse()
    }

    /// Put the terminal back the way it was: mouse tracking off, colors and
    /// attributes reset, cursor shown and blinking, raw mode left.
    ///
    /// Every step runs even if an earlier one fails; the first error is
    /// returned. Steps that failed are tried again on the next call, and
    /// once everything has succeeded further calls do nothing.
    ///
    /// # Errors
    ///
    /// The first [`Error::Write`] or [`Error::Mode`] encountered.
    pub fn restore(&mut self) -> Result<()> {
        if self.cleanup.is_done() {
            return Ok(());
        }
        self.events.set_mouse_capture(false);
        let result = self.cleanup.run(&mut self.emitter, leave_raw_mode);
        if result.is_ok() {
            tracing::debug!("terminal restored");
        }
        result
    }
}

#[cfg(unix)]
fn leave_raw_mode() -> Result<()> {
    raw_mode::disable_raw_mode()
}

#[cfg(not(unix))]
fn leave_raw_mode() -> Result<()> {
    Ok(())
}

// ─── Cleanup ─────────────────────────────────────────────────────────────────

/// What `Terminal::restore` still has to undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cleanup {
    output_restored: bool,
    owns_raw_mode: bool,
}

impl Cleanup {
    const fn new(owns_raw_mode: bool) -> Self {
        Self {
            output_restored: false,
            owns_raw_mode,
        }
    }

    const fn is_done(&self) -> bool {
        self.output_restored && !self.owns_raw_mode
    }

    /// Run every pending step. A step is marked done only once it succeeds.
    fn run<W: Write>(
        &mut self,
        out: &mut Emitter<W>,
        leave_raw_mode: impl FnOnce() -> Result<()>,
    ) -> Result<()> {
        let output = if self.output_restored {
            Ok(())
        } else {
            let result = restore_output(out);
            self.output_restored = result.is_ok();
            result
        };

        let mode = if self.owns_raw_mode {
            let result = leave_raw_mode();
            self.owns_raw_mode = result.is_err();
            result
        } else {
            Ok(())
        };

        output.and(mode)
    }
}

/// Mouse tracking off, SGR reset, cursor visible and blinking, flushed.
fn restore_output<W: Write>(out: &mut Emitter<W>) -> Result<()> {
    let steps = [
        out.disable_mouse(),
        out.reset(),
        out.show(),
        out.enable_blinking(),
        out.flush(),
    ];
    steps.into_iter().collect()
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            tracing::warn!(%err, "failed to restore terminal");
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
