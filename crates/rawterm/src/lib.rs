// SPDX-License-Identifier: MIT
//
// rawterm: terminal control and input events over raw termios.
//
// Raw mode with exact restore, a typed escape-sequence emitter with color
// downsampling, an input decoder for keys and mouse reports, a threaded
// event source with `read`/`poll`, and value-style styled text. Everything
// that writes goes through `Emitter`; everything that reads comes out of
// `EventSource` as `Event`s.

pub mod ansi;
pub mod attr;
pub mod color;
pub mod config;
pub mod emitter;
pub mod error;
pub mod event;
pub mod input;
pub mod raw_mode;
pub mod source;
pub mod style;
pub mod terminal;

pub use error::{Error, ModeError, Result};
