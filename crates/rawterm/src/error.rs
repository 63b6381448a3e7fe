// SPDX-License-Identifier: MIT
//
// Error taxonomy for the engine.
//
// Terminal failures are surfaced on the call that triggered them and are
// never retried: a failing tcsetattr or write almost always means we are
// not attached to an interactive terminal. Malformed input is not an error
// at all; the decoder drops it locally.

use std::io;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while driving the terminal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Entering or leaving raw mode failed.
    #[error(transparent)]
    Mode(#[from] ModeError),

    /// The output sink rejected a write or flush.
    #[error("failed to write to terminal output: {0}")]
    Write(#[source] io::Error),

    /// A color name did not match any of the 16 base colors.
    #[error("unknown color: {0:?}")]
    UnknownColor(String),

    /// An attribute name did not match any SGR attribute.
    #[error("unknown attribute: {0:?}")]
    UnknownAttribute(String),

    /// The terminal size could not be determined.
    #[error("terminal size unavailable: {0}")]
    Size(#[source] io::Error),

    /// The input reader stopped (EOF or read error) and no events remain.
    #[error("terminal input disconnected")]
    Disconnected,

    /// The input reader thread could not be started.
    #[error("failed to spawn input reader thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Raw-mode failures.
#[derive(Debug, thiserror::Error)]
pub enum ModeError {
    /// Neither stdin nor `/dev/tty` is a terminal.
    #[error("not attached to a terminal")]
    NotATerminal,

    /// `disable_raw_mode` was called with no saved attributes.
    #[error("raw mode is not enabled")]
    NotEnabled,

    /// `tcgetattr` / `tcsetattr` failed.
    #[error("terminal attribute call failed: {0}")]
    Os(#[source] io::Error),

    /// A thread panicked while holding the raw-mode lock.
    #[error("raw mode state lock poisoned")]
    LockPoisoned,
}

impl Error {
    /// Wrap an I/O error from the output sink.
    #[inline]
    #[must_use]
    pub fn write(err: io::Error) -> Self {
        Self::Write(err)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
