// SPDX-License-Identifier: MIT
//
// Engine configuration and terminal color capability detection.
//
// Detection reads a handful of environment variables once and memoizes the
// answer in an atomic. Tests (and applications with a `--color` flag) can
// pin the answer with `color_support::set_override`.

use std::env;
use std::time::Duration;

use crate::ansi::MouseMode;
use crate::color::ColorMode;

// ─── Config ──────────────────────────────────────────────────────────────────

/// How long a lone ESC waits for the rest of a sequence before it is
/// reported as the Escape key.
pub const DEFAULT_ESCAPE_TIMEOUT: Duration = Duration::from_millis(30);

/// Knobs for [`Terminal`](crate::terminal::Terminal) and its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Escape-sequence disambiguation timeout.
    pub escape_timeout: Duration,
    /// Forced color capability. `None` means detect from the environment.
    pub color_mode: Option<ColorMode>,
    /// Flush the output sink after every emitter call.
    pub auto_flush: bool,
    /// Tracking granularity requested by `enable_mouse_capture`.
    pub mouse_mode: MouseMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            escape_timeout: DEFAULT_ESCAPE_TIMEOUT,
            color_mode: None,
            auto_flush: true,
            mouse_mode: MouseMode::Drag,
        }
    }
}

impl Config {
    #[must_use]
    pub const fn with_escape_timeout(mut self, timeout: Duration) -> Self {
        self.escape_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_color_mode(mut self, mode: ColorMode) -> Self {
        self.color_mode = Some(mode);
        self
    }

    #[must_use]
    pub const fn with_auto_flush(mut self, auto_flush: bool) -> Self {
        self.auto_flush = auto_flush;
        self
    }

    #[must_use]
    pub const fn with_mouse_mode(mut self, mode: MouseMode) -> Self {
        self.mouse_mode = mode;
        self
    }

    /// The effective color mode: the forced one, or the detected one.
    #[must_use]
    pub fn resolved_color_mode(&self) -> ColorMode {
        self.color_mode.unwrap_or_else(color_support::detect)
    }
}

// ─── Detection ───────────────────────────────────────────────────────────────

/// Memoized, overridable color capability detection.
pub mod color_support {
    use std::sync::atomic::{AtomicI8, Ordering};

    use super::{ColorMode, examine_env};

    const NOT_SET: i8 = -1;

    static OVERRIDE: AtomicI8 = AtomicI8::new(NOT_SET);
    static CACHED: AtomicI8 = AtomicI8::new(NOT_SET);

    /// The override if set, else the cached detection, else detect now.
    #[must_use]
    pub fn detect() -> ColorMode {
        if let Some(mode) = decode(OVERRIDE.load(Ordering::Acquire)) {
            return mode;
        }
        if let Some(mode) = decode(CACHED.load(Ordering::Acquire)) {
            return mode;
        }
        let detected = examine_env(|key| std::env::var(key).ok());
        CACHED.store(encode(detected), Ordering::Release);
        tracing::debug!(?detected, "detected terminal color support");
        detected
    }

    /// Force [`detect`] to return `mode` regardless of the environment.
    ///
    /// Tests that call this must be `#[serial]`.
    pub fn set_override(mode: ColorMode) {
        OVERRIDE.store(encode(mode), Ordering::Release);
    }

    pub fn clear_override() {
        OVERRIDE.store(NOT_SET, Ordering::Release);
    }

    /// Forget the memoized detection so the next call re-reads the environment.
    pub fn clear_cache() {
        CACHED.store(NOT_SET, Ordering::Release);
    }

    const fn encode(mode: ColorMode) -> i8 {
        match mode {
            ColorMode::TrueColor => 2,
            ColorMode::Ansi256 => 1,
            ColorMode::Ansi16 => 0,
        }
    }

    const fn decode(raw: i8) -> Option<ColorMode> {
        match raw {
            2 => Some(ColorMode::TrueColor),
            1 => Some(ColorMode::Ansi256),
            0 => Some(ColorMode::Ansi16),
            _ => None,
        }
    }
}

/// Decide color support from environment variables.
///
/// `lookup` is `std::env::var` in production; tests pass a closure over a
/// fixed table.
pub fn examine_env(lookup: impl Fn(&str) -> Option<String>) -> ColorMode {
    if let Some(colorterm) = lookup("COLORTERM") {
        let colorterm = colorterm.to_ascii_lowercase();
        if colorterm == "truecolor" || colorterm == "24bit" {
            return ColorMode::TrueColor;
        }
    }

    if lookup("TERM_PROGRAM")
        .is_some_and(|program| matches!(program.as_str(), "iTerm.app" | "WezTerm" | "vscode"))
    {
        return ColorMode::TrueColor;
    }

    if lookup("WT_SESSION").is_some() {
        return ColorMode::TrueColor;
    }

    match lookup("TERM") {
        Some(term) if term.contains("truecolor") || term.contains("direct") => {
            ColorMode::TrueColor
        }
        Some(term) if term == "xterm-kitty" || term == "alacritty" => ColorMode::TrueColor,
        Some(term) if term.contains("256color") => ColorMode::Ansi256,
        Some(term) if term == "dumb" || term == "linux" || term.is_empty() => ColorMode::Ansi16,
        Some(_) => ColorMode::Ansi256,
        None => ColorMode::Ansi16,
    }
}

/// Terminal size from `COLUMNS` / `LINES`, used when `ioctl` is unavailable.
pub(crate) fn size_from_env() -> Option<(u16, u16)> {
    let cols = env::var("COLUMNS").ok()?.trim().parse::<u16>().ok()?;
    let rows = env::var("LINES").ok()?.trim().parse::<u16>().ok()?;
    (cols > 0 && rows > 0).then_some((cols, rows))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
