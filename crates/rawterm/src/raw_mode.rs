// SPDX-License-Identifier: MIT
//
// Raw mode: termios snapshot, raw settings, exact restore.
//
// Safety: termios (tcgetattr, tcsetattr), isatty, and the panic hook's raw
// fd write are POSIX calls with no safe wrapper in std.
#![allow(unsafe_code)]
//
// The snapshot/restore logic lives in `RawModeController`, generic over a
// `TtyDevice`. Production code uses one process-global controller over the
// controlling terminal (stdin when it is a tty, otherwise `/dev/tty`),
// guarded by a mutex. Tests drive the controller over an in-memory device.
//
// Policy is first-call-wins: enabling while already enabled keeps the
// original snapshot and applies nothing. A single disable restores that
// snapshot exactly.
//
// A panic hook, installed on the first successful enable, restores the
// snapshot and writes a fixed cleanup sequence with a raw write(2). It
// bypasses the stdout lock so a panic mid-write cannot deadlock. The
// sequence goes to stdout while that is a terminal and to the raw-mode
// device otherwise, and leaves the alternate screen only if the stdout
// emitter entered it.

use std::io;
#[cfg(unix)]
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, Once, TryLockError};

use crate::error::{ModeError, Result};

// ─── Device Seam ─────────────────────────────────────────────────────────────

/// A terminal whose line discipline can be read and replaced.
pub trait TtyDevice {
    /// Snapshot of the device's settings.
    type Attrs: Clone;

    /// Read the current settings.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the query fails.
    fn get_attrs(&mut self) -> io::Result<Self::Attrs>;

    /// Replace the current settings.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the update fails.
    fn set_attrs(&mut self, attrs: &Self::Attrs) -> io::Result<()>;

    /// Raw-mode version of `attrs`: no echo, no line buffering, no signal
    /// keys, byte-at-a-time reads.
    fn make_raw(attrs: &Self::Attrs) -> Self::Attrs;
}

// ─── Controller ──────────────────────────────────────────────────────────────

/// Snapshot and restore logic over one device.
pub struct RawModeController<D: TtyDevice> {
    device: D,
    saved: Option<D::Attrs>,
}

impl<D: TtyDevice> RawModeController<D> {
    pub const fn new(device: D) -> Self {
        Self {
            device,
            saved: None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.saved.is_some()
    }

    /// The settings that `disable` will restore.
    #[must_use]
    pub const fn saved(&self) -> Option<&D::Attrs> {
        self.saved.as_ref()
    }

    #[must_use]
    pub const fn device(&self) -> &D {
        &self.device
    }

    /// Snapshot the device and switch it to raw mode.
    ///
    /// Returns `false` (and changes nothing) if already enabled.
    ///
    /// # Errors
    ///
    /// [`ModeError::Os`] if reading or applying settings fails. In that
    /// case no snapshot is kept.
    pub fn enable(&mut self) -> std::result::Result<bool, ModeError> {
        if self.saved.is_some() {
            return Ok(false);
        }

        let original = self.device.get_attrs().map_err(ModeError::Os)?;
        let raw = D::make_raw(&original);
        if let Err(err) = self.device.set_attrs(&raw) {
            // tcsetattr may have applied part of the change.
            let _ = self.device.set_attrs(&original);
            return Err(ModeError::Os(err));
        }

        self.saved = Some(original);
        Ok(true)
    }

    /// Restore the snapshot taken by [`enable`](Self::enable).
    ///
    /// # Errors
    ///
    /// [`ModeError::NotEnabled`] if there is no snapshot, [`ModeError::Os`]
    /// if the device rejects it. The snapshot is kept on failure so a
    /// later call can retry.
    pub fn disable(&mut self) -> std::result::Result<(), ModeError> {
        let original = self.saved.as_ref().ok_or(ModeError::NotEnabled)?;
        self.device.set_attrs(original).map_err(ModeError::Os)?;
        self.saved = None;
        Ok(())
    }
}

// ─── Unix Device ─────────────────────────────────────────────────────────────

#[cfg(unix)]
pub use unix::UnixTty;

#[cfg(unix)]
mod unix {
    use std::fs::{File, OpenOptions};
    use std::io;
    use std::os::unix::io::{AsRawFd, RawFd};

    use super::TtyDevice;
    use crate::error::ModeError;

    /// The process's controlling terminal.
    #[derive(Debug)]
    pub struct UnixTty {
        fd: RawFd,
        /// Keeps `/dev/tty` open when stdin is not a terminal.
        _file: Option<File>,
    }

    impl UnixTty {
        /// Stdin if it is a terminal, otherwise `/dev/tty`.
        ///
        /// # Errors
        ///
        /// [`ModeError::NotATerminal`] if neither is available.
        pub fn open() -> Result<Self, ModeError> {
            if unsafe { libc::isatty(libc::STDIN_FILENO) } == 1 {
                return Ok(Self {
                    fd: libc::STDIN_FILENO,
                    _file: None,
                });
            }

            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .open("/dev/tty")
                .map_err(|_| ModeError::NotATerminal)?;
            Ok(Self {
                fd: file.as_raw_fd(),
                _file: Some(file),
            })
        }

        #[must_use]
        pub const fn fd(&self) -> RawFd {
            self.fd
        }
    }

    impl TtyDevice for UnixTty {
        type Attrs = libc::termios;

        fn get_attrs(&mut self) -> io::Result<libc::termios> {
            let mut termios: libc::termios = unsafe { std::mem::zeroed() };
            if unsafe { libc::tcgetattr(self.fd, &raw mut termios) } != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(termios)
        }

        fn set_attrs(&mut self, attrs: &libc::termios) -> io::Result<()> {
            if unsafe { libc::tcsetattr(self.fd, libc::TCSAFLUSH, attrs) } != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }

        /// cfmakeraw equivalent, plus VMIN=1 / VTIME=0.
        fn make_raw(attrs: &libc::termios) -> libc::termios {
            let mut raw = *attrs;
            raw.c_iflag &= !(libc::IGNBRK
                | libc::BRKINT
                | libc::PARMRK
                | libc::ISTRIP
                | libc::INLCR
                | libc::IGNCR
                | libc::ICRNL
                | libc::IXON);
            raw.c_oflag &= !libc::OPOST;
            raw.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
            raw.c_cflag &= !(libc::CSIZE | libc::PARENB);
            raw.c_cflag |= libc::CS8;
            raw.c_cc[libc::VMIN] = 1;
            raw.c_cc[libc::VTIME] = 0;
            raw
        }
    }
}

// ─── Process-Global Raw Mode ─────────────────────────────────────────────────

#[cfg(unix)]
static CONTROLLER: Mutex<Option<RawModeController<UnixTty>>> = Mutex::new(None);

/// Switch the controlling terminal to raw mode.
///
/// A no-op if raw mode is already on; the first snapshot is kept.
///
/// # Errors
///
/// [`ModeError::NotATerminal`] without a controlling terminal,
/// [`ModeError::Os`] if termios calls fail.
pub fn enable_raw_mode() -> Result<()> {
    enable_tracked().map(|_| ())
}

/// Like [`enable_raw_mode`], but reports whether this call did the switch.
#[cfg(unix)]
pub(crate) fn enable_tracked() -> Result<bool> {
    let mut slot = CONTROLLER.lock().map_err(|_| ModeError::LockPoisoned)?;
    let controller = match slot.take() {
        Some(controller) => controller,
        None => RawModeController::new(UnixTty::open()?),
    };
    let controller = slot.insert(controller);

    let changed = controller.enable()?;
    if changed {
        install_panic_hook();
        tracing::debug!(fd = controller.device().fd(), "entered raw mode");
    }
    Ok(changed)
}

#[cfg(not(unix))]
pub(crate) fn enable_tracked() -> Result<bool> {
    Err(ModeError::NotATerminal.into())
}

/// Restore the terminal settings saved by [`enable_raw_mode`].
///
/// # Errors
///
/// [`ModeError::NotEnabled`] if raw mode is off, [`ModeError::Os`] if the
/// restore fails.
#[cfg(unix)]
pub fn disable_raw_mode() -> Result<()> {
    let mut slot = CONTROLLER.lock().map_err(|_| ModeError::LockPoisoned)?;
    let controller = slot.as_mut().ok_or(ModeError::NotEnabled)?;
    controller.disable()?;
    tracing::debug!(fd = controller.device().fd(), "left raw mode");
    Ok(())
}

#[cfg(not(unix))]
pub fn disable_raw_mode() -> Result<()> {
    Err(ModeError::NotEnabled.into())
}

/// Is the controlling terminal currently in raw mode (set by this crate)?
#[must_use]
pub fn is_raw_mode_enabled() -> bool {
    #[cfg(unix)]
    {
        CONTROLLER
            .lock()
            .is_ok_and(|slot| slot.as_ref().is_some_and(RawModeController::is_enabled))
    }
    #[cfg(not(unix))]
    {
        false
    }
}

// ─── Guard ───────────────────────────────────────────────────────────────────

/// Raw mode for a scope.
///
/// Restores the terminal on drop, but only if this guard was the one that
/// switched it: nesting a guard inside an already-raw terminal leaves the
/// outer owner in charge.
#[derive(Debug)]
#[must_use = "raw mode is left as soon as the guard is dropped"]
pub struct RawModeGuard {
    owned: bool,
}

impl RawModeGuard {
    /// Enable raw mode until the guard is dropped.
    ///
    /// # Errors
    ///
    /// Same as [`enable_raw_mode`].
    pub fn new() -> Result<Self> {
        let owned = enable_tracked()?;
        Ok(Self { owned })
    }

    /// Did this guard switch the terminal to raw mode?
    #[must_use]
    pub const fn owns_raw_mode(&self) -> bool {
        self.owned
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.owned {
            if let Err(err) = disable_raw_mode() {
                tracing::warn!(%err, "failed to leave raw mode");
            }
        }
    }
}

// ─── Panic Hook ──────────────────────────────────────────────────────────────

/// Cleanup written by the panic hook: reset SGR, show cursor, enable
/// blinking, disable every mouse mode.
#[rustfmt::skip]
const EMERGENCY_RESTORE: &[u8] = b"\
    \x1b[0m\
    \x1b[?25h\
    \x1b[?12h\
    \x1b[?1006l\x1b[?1015l\x1b[?1003l\x1b[?1002l\x1b[?1000l";

/// [`EMERGENCY_RESTORE`] followed by leaving the alternate screen, last so
/// the restored shell content appears without leftovers.
#[rustfmt::skip]
const EMERGENCY_RESTORE_ALT: &[u8] = b"\
    \x1b[0m\
    \x1b[?25h\
    \x1b[?12h\
    \x1b[?1006l\x1b[?1015l\x1b[?1003l\x1b[?1002l\x1b[?1000l\
    \x1b[?1049l";

/// Set while the stdout emitter has the alternate screen active.
static ALT_SCREEN: AtomicBool = AtomicBool::new(false);

static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Record that stdout entered or left the alternate screen.
pub(crate) fn note_alternate_screen(active: bool) {
    ALT_SCREEN.store(active, Ordering::Relaxed);
}

const fn emergency_sequence(alt_screen: bool) -> &'static [u8] {
    if alt_screen {
        EMERGENCY_RESTORE_ALT
    } else {
        EMERGENCY_RESTORE
    }
}

/// Where the panic hook writes: stdout while it is a terminal, otherwise
/// the raw-mode device so redirected output stays clean.
#[cfg(unix)]
const fn emergency_target(stdout_is_tty: bool, device: Option<RawFd>) -> RawFd {
    match device {
        Some(fd) if !stdout_is_tty => fd,
        _ => libc::STDOUT_FILENO,
    }
}

/// File descriptor of the device raw mode was entered on.
///
/// The controller is never removed from its slot once created, so the
/// descriptor stays open for the rest of the process.
#[cfg(unix)]
pub(crate) fn tty_fd() -> Option<RawFd> {
    CONTROLLER
        .lock()
        .ok()
        .and_then(|slot| slot.as_ref().map(|controller| controller.device().fd()))
}

fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();
            original(info);
        }));
    });
}

/// Best-effort restore from inside a panic: never blocks, ignores errors.
fn emergency_restore() {
    let sequence = emergency_sequence(ALT_SCREEN.load(Ordering::Relaxed));

    #[cfg(unix)]
    {
        // The panic may have happened while the lock was held.
        let mut slot = match CONTROLLER.try_lock() {
            Ok(slot) => Some(slot),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        };
        let controller = slot.as_mut().and_then(|guard| guard.as_mut());

        let stdout_is_tty = unsafe { libc::isatty(libc::STDOUT_FILENO) } == 1;
        let device = controller.as_ref().map(|controller| controller.device().fd());
        let fd = emergency_target(stdout_is_tty, device);
        let _ = unsafe {
            libc::write(fd, sequence.as_ptr().cast::<libc::c_void>(), sequence.len())
        };

        if let Some(controller) = controller {
            let _ = controller.disable();
        }
    }

    #[cfg(not(unix))]
    {
        use std::io::Write;
        let _ = io::stdout().write_all(sequence);
        let _ = io::stdout().flush();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct FakeAttrs {
        echo: bool,
        canonical: bool,
        signals: bool,
        vmin: u8,
        vtime: u8,
        custom: u32,
    }

    impl FakeAttrs {
        const fn cooked() -> Self {
            Self {
                echo: true,
                canonical: true,
                signals: true,
                vmin: 0,
                vtime: 5,
                custom: 0xDEAD_BEEF,
            }
        }
    }

    #[derive(Debug)]
    struct FakeTty {
        current: FakeAttrs,
        get_fails: bool,
        set_fails: bool,
        sets: usize,
    }

    impl FakeTty {
        const fn new() -> Self {
            Self {
                current: FakeAttrs::cooked(),
                get_fails: false,
                set_fails: false,
                sets: 0,
            }
        }
    }

    impl TtyDevice for FakeTty {
        type Attrs = FakeAttrs;

        fn get_attrs(&mut self) -> io::Result<FakeAttrs> {
            if self.get_fails {
                // ENOTTY
                return Err(io::Error::from_raw_os_error(25));
            }
            Ok(self.current.clone())
        }

        fn set_attrs(&mut self, attrs: &FakeAttrs) -> io::Result<()> {
            if self.set_fails {
                return Err(io::Error::other("tcsetattr failed"));
            }
            self.sets += 1;
            self.current = attrs.clone();
            Ok(())
        }

        fn make_raw(attrs: &FakeAttrs) -> FakeAttrs {
            FakeAttrs {
                echo: false,
                canonical: false,
                signals: false,
                vmin: 1,
                vtime: 0,
                ..attrs.clone()
            }
        }
    }

    #[test]
    fn enable_applies_raw_settings() {
        let mut ctl = RawModeController::new(FakeTty::new());
        assert!(ctl.enable().unwrap());
        assert!(ctl.is_enabled());
        let current = &ctl.device().current;
        assert!(!current.echo && !current.canonical && !current.signals);
        assert_eq!((current.vmin, current.vtime), (1, 0));
        assert_eq!(current.custom, 0xDEAD_BEEF);
    }

    #[test]
    fn disable_restores_exact_snapshot() {
        let mut ctl = RawModeController::new(FakeTty::new());
        let before = ctl.device().current.clone();
        ctl.enable().unwrap();
        ctl.disable().unwrap();
        assert_eq!(ctl.device().current, before);
        assert!(!ctl.is_enabled());
        assert_eq!(ctl.saved(), None);
    }

    #[test]
    fn second_enable_keeps_first_snapshot() {
        let mut ctl = RawModeController::new(FakeTty::new());
        assert!(ctl.enable().unwrap());
        assert!(!ctl.enable().unwrap());
        assert_eq!(ctl.device().sets, 1);
        assert_eq!(ctl.saved(), Some(&FakeAttrs::cooked()));

        ctl.disable().unwrap();
        assert_eq!(ctl.device().current, FakeAttrs::cooked());
    }

    #[test]
    fn disable_without_enable_fails() {
        let mut ctl = RawModeController::new(FakeTty::new());
        assert!(matches!(ctl.disable(), Err(ModeError::NotEnabled)));
        assert_eq!(ctl.device().sets, 0);
    }

    #[test]
    fn double_disable_fails_the_second_time() {
        let mut ctl = RawModeController::new(FakeTty::new());
        ctl.enable().unwrap();
        ctl.disable().unwrap();
        assert!(matches!(ctl.disable(), Err(ModeError::NotEnabled)));
    }

    #[test]
    fn failed_apply_keeps_no_snapshot() {
        let mut tty = FakeTty::new();
        tty.set_fails = true;
        let mut ctl = RawModeController::new(tty);
        assert!(matches!(ctl.enable(), Err(ModeError::Os(_))));
        assert!(!ctl.is_enabled());
        assert_eq!(ctl.device().current, FakeAttrs::cooked());
    }

    #[test]
    fn failed_query_is_an_os_error() {
        let mut tty = FakeTty::new();
        tty.get_fails = true;
        let mut ctl = RawModeController::new(tty);
        let err = ctl.enable().unwrap_err();
        assert!(matches!(err, ModeError::Os(ref io) if io.raw_os_error() == Some(25)));
        assert!(!ctl.is_enabled());
    }

    #[test]
    fn enable_disable_cycles() {
        let mut ctl = RawModeController::new(FakeTty::new());
        for _ in 0..3 {
            assert!(ctl.enable().unwrap());
            ctl.disable().unwrap();
        }
        assert_eq!(ctl.device().current, FakeAttrs::cooked());
        assert_eq!(ctl.device().sets, 6);
    }

    #[cfg(unix)]
    #[test]
    fn unix_make_raw_clears_line_discipline() {
        let mut cooked: libc::termios = unsafe { std::mem::zeroed() };
        cooked.c_lflag = libc::ECHO | libc::ICANON | libc::ISIG | libc::IEXTEN;
        cooked.c_iflag = libc::ICRNL | libc::IXON;
        cooked.c_oflag = libc::OPOST;

        let raw = UnixTty::make_raw(&cooked);
        assert_eq!(raw.c_lflag & (libc::ECHO | libc::ICANON | libc::ISIG), 0);
        assert_eq!(raw.c_iflag & (libc::ICRNL | libc::IXON), 0);
        assert_eq!(raw.c_oflag & libc::OPOST, 0);
        assert_eq!(raw.c_cflag & libc::CS8, libc::CS8);
        assert_eq!(raw.c_cc[libc::VMIN], 1);
        assert_eq!(raw.c_cc[libc::VTIME], 0);
    }

    #[test]
    #[serial]
    fn global_disable_without_enable() {
        assert!(!is_raw_mode_enabled());
        assert!(matches!(
            disable_raw_mode(),
            Err(Error::Mode(ModeError::NotEnabled))
        ));
    }

    #[test]
    fn emergency_restore_contents() {
        let s = std::str::from_utf8(emergency_sequence(false)).unwrap();
        assert!(s.starts_with("\x1b[0m"));
        assert!(s.contains("\x1b[?25h"), "must show cursor");
        assert!(s.contains("\x1b[?12h"), "must re-enable blinking");
        assert!(s.contains("\x1b[?1000l"), "must disable mouse clicks");
        assert!(s.contains("\x1b[?1006l"), "must disable SGR mouse");
        assert!(!s.contains("1049"), "main screen must not be touched");
    }

    #[test]
    fn emergency_restore_leaves_alternate_screen_last() {
        let with_alt = emergency_sequence(true);
        assert!(with_alt.starts_with(emergency_sequence(false)));
        assert!(with_alt.ends_with(b"\x1b[?1049l"));
    }

    #[cfg(unix)]
    #[test]
    fn emergency_target_prefers_terminal_stdout() {
        assert_eq!(emergency_target(true, Some(7)), libc::STDOUT_FILENO);
        assert_eq!(emergency_target(false, Some(7)), 7);
        assert_eq!(emergency_target(false, None), libc::STDOUT_FILENO);
    }

    #[test]
    #[serial]
    fn alternate_screen_flag_follows_notes() {
        note_alternate_screen(true);
        assert!(ALT_SCREEN.load(Ordering::Relaxed));
        note_alternate_screen(false);
        assert!(!ALT_SCREEN.load(Ordering::Relaxed));
    }
}
