// SPDX-License-Identifier: MIT
//
// Event source: a reader thread feeding a shared event queue.
//
// Safety: the terminal source uses poll(2) and read(2) directly, and the
// resize watch installs a SIGWINCH handler with sigaction(2).
#![allow(unsafe_code)]
//
// A dedicated thread waits on a `ByteSource` with a short timeout, feeds
// whatever arrives to the decoder, and appends decoded events to a FIFO
// behind a mutex. Callers block on the paired condvar (`read`), wait with
// a bound (`poll`), or just peek (`try_read`). Events leave the queue only
// through `read`/`try_read`, so nothing is lost between a `poll` that said
// "ready" and the `read` that follows.
//
// Escape timeout: while the decoder holds an unfinished sequence, the
// reader waits only `escape_timeout` for more bytes. If none come, the
// pending bytes are flushed as literal keys (a lone ESC becomes Escape).
//
// Shutdown: the thread checks a stop flag between waits and is joined on
// drop. When the source reaches EOF or fails, the queue is marked
// disconnected and `read` reports it once the remaining events are taken.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::input::Decoder;

/// Bytes read per wakeup. A keypress is 1-6 bytes; a paste can be more.
const READ_BUF_SIZE: usize = 4096;

/// How long the reader waits before re-checking the stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

// ─── Byte Sources ────────────────────────────────────────────────────────────

/// Result of one bounded wait on a [`ByteSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were written to the start of the buffer.
    Data(usize),
    /// Nothing arrived within the timeout.
    Timeout,
    /// The input is closed for good.
    Eof,
}

/// Where the reader thread gets its bytes.
pub trait ByteSource: Send + 'static {
    /// Wait up to `timeout` for input and read what is available.
    ///
    /// # Errors
    ///
    /// Any I/O error other than [`io::ErrorKind::Interrupted`] stops the
    /// reader thread.
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<ReadOutcome>;

    /// A pending window resize, as `(cols, rows)`. Checked once per wakeup.
    fn take_resize(&mut self) -> Option<(u16, u16)> {
        None
    }
}

/// Bytes pushed from another thread through a channel.
///
/// Useful for feeding the engine from a pty, a recording, or a test.
/// Dropping every sender reads as EOF.
#[derive(Debug)]
pub struct ChannelSource {
    rx: Receiver<Vec<u8>>,
    /// Bytes received but not yet handed out.
    spill: Vec<u8>,
}

impl ChannelSource {
    #[must_use]
    pub fn new() -> (Self, Sender<Vec<u8>>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                rx,
                spill: Vec::new(),
            },
            tx,
        )
    }

    fn drain_spill(&mut self, buf: &mut [u8]) -> usize {
        let n = self.spill.len().min(buf.len());
        buf[..n].copy_from_slice(&self.spill[..n]);
        self.spill.drain(..n);
        n
    }
}

impl ByteSource for ChannelSource {
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<ReadOutcome> {
        if !self.spill.is_empty() {
            return Ok(ReadOutcome::Data(self.drain_spill(buf)));
        }
        match self.rx.recv_timeout(timeout) {
            Ok(chunk) if chunk.is_empty() => Ok(ReadOutcome::Timeout),
            Ok(chunk) => {
                self.spill = chunk;
                Ok(ReadOutcome::Data(self.drain_spill(buf)))
            }
            Err(RecvTimeoutError::Timeout) => Ok(ReadOutcome::Timeout),
            Err(RecvTimeoutError::Disconnected) => Ok(ReadOutcome::Eof),
        }
    }
}

#[cfg(unix)]
pub use unix::StdinSource;

#[cfg(unix)]
mod unix {
    use std::io;
    use std::os::unix::io::RawFd;
    use std::sync::Once;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::{ByteSource, ReadOutcome};

    /// Set by the SIGWINCH handler, cleared by the reader thread.
    static SIGWINCH_RECEIVED: AtomicBool = AtomicBool::new(false);
    static SIGWINCH_INSTALLED: Once = Once::new();

    extern "C" fn sigwinch_handler(_sig: libc::c_int) {
        SIGWINCH_RECEIVED.store(true, Ordering::Relaxed);
    }

    fn install_sigwinch_handler() {
        SIGWINCH_INSTALLED.call_once(|| unsafe {
            let mut sa: libc::sigaction = std::mem::zeroed();
            sa.sa_sigaction = sigwinch_handler as *const () as usize;
            sa.sa_flags = libc::SA_RESTART;
            libc::sigemptyset(&raw mut sa.sa_mask);
            libc::sigaction(libc::SIGWINCH, &raw const sa, std::ptr::null_mut());
        });
    }

    /// Terminal input (standard input unless built with `from_fd`), read
    /// with `poll(2)` so waits are bounded.
    ///
    /// Also reports SIGWINCH as a resize.
    #[derive(Debug)]
    pub struct StdinSource {
        fd: RawFd,
    }

    impl StdinSource {
        #[must_use]
        pub fn new() -> Self {
            Self::from_fd(libc::STDIN_FILENO)
        }

        /// Read from `fd` instead of stdin. The descriptor is borrowed and
        /// must stay open for the life of the source.
        #[must_use]
        pub fn from_fd(fd: RawFd) -> Self {
            install_sigwinch_handler();
            Self { fd }
        }
    }

    impl Default for StdinSource {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ByteSource for StdinSource {
        fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<ReadOutcome> {
            let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
            let mut pfd = libc::pollfd {
                fd: self.fd,
                events: libc::POLLIN,
                revents: 0,
            };
            let ready = unsafe { libc::poll(&raw mut pfd, 1, timeout_ms) };
            if ready < 0 {
                return Err(io::Error::last_os_error());
            }
            if ready == 0 {
                return Ok(ReadOutcome::Timeout);
            }

            let n = unsafe { libc::read(self.fd, buf.as_mut_ptr().cast(), buf.len()) };
            match usize::try_from(n) {
                Ok(0) => Ok(ReadOutcome::Eof),
                Ok(n) => Ok(ReadOutcome::Data(n)),
                Err(_) => Err(io::Error::last_os_error()),
            }
        }

        fn take_resize(&mut self) -> Option<(u16, u16)> {
            if !SIGWINCH_RECEIVED.swap(false, Ordering::Relaxed) {
                return None;
            }
            crate::terminal::size().ok().map(|s| (s.cols, s.rows))
        }
    }
}

// ─── Shared Queue ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Queue {
    events: VecDeque<Event>,
    /// The reader thread has exited; no more events will arrive.
    disconnected: bool,
}

#[derive(Debug, Default)]
struct Shared {
    queue: Mutex<Queue>,
    ready: Condvar,
}

impl Shared {
    /// The queue, even if a thread panicked while holding it. Every update
    /// is a single push or pop, so the contents stay consistent.
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push_all(&self, events: Vec<Event>) {
        if events.is_empty() {
            return;
        }
        self.lock().events.extend(events);
        self.ready.notify_all();
    }

    fn disconnect(&self) {
        self.lock().disconnected = true;
        self.ready.notify_all();
    }
}

// ─── EventSource ─────────────────────────────────────────────────────────────

/// Decoded terminal events, read by a background thread.
///
/// ```
/// use std::time::Duration;
/// use rawterm::config::Config;
/// use rawterm::event::{Event, KeyCode, KeyEvent};
/// use rawterm::source::{ChannelSource, EventSource};
///
/// let (input, tx) = ChannelSource::new();
/// let events = EventSource::spawn(input, &Config::default())?;
/// tx.send(b"q".to_vec()).unwrap();
///
/// assert!(events.poll(Duration::from_secs(1))?);
/// assert_eq!(events.read()?, Event::Key(KeyEvent::plain(KeyCode::Char('q'))));
/// # Ok::<(), rawterm::Error>(())
/// ```
#[derive(Debug)]
pub struct EventSource {
    shared: Arc<Shared>,
    mouse_capture: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    /// `None` after [`stop`](Self::stop) joins the thread.
    handle: Option<JoinHandle<()>>,
}

impl EventSource {
    /// Start reading from `source`. Mouse capture starts off.
    ///
    /// # Errors
    ///
    /// [`Error::Spawn`] if the reader thread cannot be started.
    pub fn spawn<S: ByteSource>(source: S, config: &Config) -> Result<Self> {
        let shared = Arc::new(Shared::default());
        let mouse_capture = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));

        let reader = Reader {
            source,
            decoder: Decoder::new().with_mouse_capture(false),
            shared: Arc::clone(&shared),
            mouse_capture: Arc::clone(&mouse_capture),
            stop: Arc::clone(&stop),
            escape_timeout: config.escape_timeout,
        };

        let handle = thread::Builder::new()
            .name("rawterm-input".into())
            .spawn(move || reader.run())
            .map_err(Error::Spawn)?;

        Ok(Self {
            shared,
            mouse_capture,
            stop,
            handle: Some(handle),
        })
    }

    /// Read from the process's standard input.
    ///
    /// # Errors
    ///
    /// [`Error::Spawn`] if the reader thread cannot be started.
    #[cfg(unix)]
    pub fn stdin(config: &Config) -> Result<Self> {
        Self::spawn(StdinSource::new(), config)
    }

    /// Read from the device raw mode was entered on, which is `/dev/tty`
    /// when stdin is redirected. Falls back to stdin before raw mode.
    ///
    /// # Errors
    ///
    /// [`Error::Spawn`] if the reader thread cannot be started.
    #[cfg(unix)]
    pub fn tty(config: &Config) -> Result<Self> {
        let fd = crate::raw_mode::tty_fd().unwrap_or(libc::STDIN_FILENO);
        Self::spawn(StdinSource::from_fd(fd), config)
    }

    /// Block until an event is available and take it.
    ///
    /// # Errors
    ///
    /// [`Error::Disconnected`] once the input has closed and every event
    /// read before that has been taken.
    pub fn read(&self) -> Result<Event> {
        let mut queue = self.shared.lock();
        loop {
            if let Some(event) = queue.events.pop_front() {
                return Ok(event);
            }
            if queue.disconnected {
                return Err(Error::Disconnected);
            }
            queue = self
                .shared
                .ready
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Wait up to `timeout` for an event, without taking it.
    ///
    /// `Ok(true)` means the next [`read`](Self::read) returns immediately.
    ///
    /// # Errors
    ///
    /// [`Error::Disconnected`] if the input has closed and the queue is empty.
    pub fn poll(&self, timeout: Duration) -> Result<bool> {
        let queue = self.shared.lock();
        let (queue, _) = self
            .shared
            .ready
            .wait_timeout_while(queue, timeout, |q| q.events.is_empty() && !q.disconnected)
            .unwrap_or_else(PoisonError::into_inner);
        if !queue.events.is_empty() {
            return Ok(true);
        }
        if queue.disconnected {
            return Err(Error::Disconnected);
        }
        Ok(false)
    }

    /// Take the next event if one is already queued.
    ///
    /// # Errors
    ///
    /// [`Error::Disconnected`] if the input has closed and the queue is empty.
    pub fn try_read(&self) -> Result<Option<Event>> {
        let mut queue = self.shared.lock();
        match queue.events.pop_front() {
            Some(event) => Ok(Some(event)),
            None if queue.disconnected => Err(Error::Disconnected),
            None => Ok(None),
        }
    }

    /// Toggle mouse decoding. Applies from the next chunk the reader
    /// decodes; events already queued are unaffected.
    pub fn set_mouse_capture(&self, enabled: bool) {
        self.mouse_capture.store(enabled, Ordering::Release);
        tracing::debug!(enabled, "mouse capture decoding toggled");
    }

    #[must_use]
    pub fn mouse_capture(&self) -> bool {
        self.mouse_capture.load(Ordering::Acquire)
    }

    /// Stop the reader thread and wait for it. Idempotent.
    ///
    /// Queued events can still be read afterwards.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("input reader thread panicked");
                self.shared.disconnect();
            }
        }
    }
}

impl Drop for EventSource {
    fn drop(&mut self) {
        self.stop();
    }
}

// ─── Reader Thread ───────────────────────────────────────────────────────────

struct Reader<S> {
    source: S,
    decoder: Decoder,
    shared: Arc<Shared>,
    mouse_capture: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    escape_timeout: Duration,
}

impl<S: ByteSource> Reader<S> {
    fn run(mut self) {
        let mut buf = [0u8; READ_BUF_SIZE];

        while !self.stop.load(Ordering::Acquire) {
            if let Some((cols, rows)) = self.source.take_resize() {
                tracing::trace!(cols, rows, "terminal resized");
                self.shared.push_all(vec![Event::Resize { cols, rows }]);
            }

            let wait = if self.decoder.has_pending() {
                self.escape_timeout
            } else {
                POLL_INTERVAL
            };

            match self.source.read_timeout(&mut buf, wait) {
                Ok(ReadOutcome::Data(n)) => {
                    self.decoder
                        .set_mouse_capture(self.mouse_capture.load(Ordering::Acquire));
                    let events = self.decoder.advance(&buf[..n]);
                    self.shared.push_all(events);
                }
                Ok(ReadOutcome::Timeout) => {
                    if self.decoder.has_pending() {
                        let events = self.decoder.flush();
                        self.shared.push_all(events);
                    }
                }
                Ok(ReadOutcome::Eof) => {
                    tracing::debug!("terminal input reached end of file");
                    break;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    tracing::warn!(%err, "terminal input read failed, stopping reader");
                    break;
                }
            }
        }

        let rest = self.decoder.flush();
        self.shared.push_all(rest);
        self.shared.disconnect();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
