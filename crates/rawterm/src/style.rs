// SPDX-License-Identifier: MIT
//
// Styled content: text with its own colors and attributes.
//
// A `StyledContent` is a value: every builder call consumes it and returns
// the updated value, so a style can be built up in one expression and
// stored or cloned freely. Rendering emits the style, the text, and then a
// full SGR reset, so nothing leaks into whatever is printed next.
//
// Attributes are kept as the commands that were asked for, in order, and
// every one of them is written. `NoBold` on content printed after an
// unscoped `set_attribute(Bold)` really does switch bold off.

use std::fmt;
use std::io::{self, Write};

use unicode_width::UnicodeWidthStr;

use crate::ansi;
use crate::attr::{Attribute, Attributes};
use crate::color::{Color, ColorMode};
use crate::emitter::Emitter;
use crate::error::Result;

/// Text plus optional foreground, background, and attributes.
///
/// ```
/// use rawterm::attr::Attribute;
/// use rawterm::color::{Color, ColorMode};
/// use rawterm::style::style;
///
/// let x = style("X")
///     .color(Color::rgb(255, 0, 255))
///     .on(Color::rgb(50, 50, 50))
///     .attribute(Attribute::CrossedOut);
/// assert_eq!(
///     x.render(ColorMode::TrueColor),
///     "\x1b[38;2;255;0;255m\x1b[48;2;50;50;50m\x1b[9mX\x1b[0m"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StyledContent {
    content: String,
    fg: Option<Color>,
    bg: Option<Color>,
    /// Requested attribute commands, oldest first, each at most once.
    attrs: Vec<Attribute>,
}

/// Start styling `content`.
pub fn style(content: impl Into<String>) -> StyledContent {
    StyledContent::new(content)
}

impl StyledContent {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Set the foreground color.
    #[must_use]
    pub const fn color(mut self, color: Color) -> Self {
        self.fg = Some(color);
        self
    }

    /// Set the background color.
    #[must_use]
    pub const fn on(mut self, color: Color) -> Self {
        self.bg = Some(color);
        self
    }

    /// Request an attribute. Off-variants are written too.
    ///
    /// Repeating an attribute moves it to the end. `Attribute::Reset`
    /// replaces everything requested before it; as SGR 0 it also clears the
    /// colors written ahead of it.
    #[must_use]
    pub fn attribute(mut self, attr: Attribute) -> Self {
        if attr == Attribute::Reset {
            self.attrs.clear();
        } else {
            self.attrs.retain(|&a| a != attr);
        }
        self.attrs.push(attr);
        self
    }

    /// Replace the text, keeping the style.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub const fn foreground(&self) -> Option<Color> {
        self.fg
    }

    #[must_use]
    pub const fn background(&self) -> Option<Color> {
        self.bg
    }

    /// The attribute commands that will be written, in order.
    #[must_use]
    pub fn requested_attributes(&self) -> &[Attribute] {
        &self.attrs
    }

    /// What the requested commands leave switched on.
    #[must_use]
    pub fn attributes(&self) -> Attributes {
        self.attrs
            .iter()
            .fold(Attributes::empty(), |set, &attr| set.apply(attr))
    }

    /// Does rendering add anything beyond the text?
    #[must_use]
    pub fn is_styled(&self) -> bool {
        self.fg.is_some() || self.bg.is_some() || !self.attrs.is_empty()
    }

    /// Display width of the text in terminal columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.content.width()
    }

    /// Write the styled text to `w`, downsampling colors for `mode`.
    ///
    /// Order: foreground, background, attributes, text, reset. Unstyled
    /// content is written as bare text.
    ///
    /// # Errors
    ///
    /// Returns any error from `w`.
    pub fn write_to(&self, w: &mut impl Write, mode: ColorMode) -> io::Result<()> {
        if !self.is_styled() {
            return w.write_all(self.content.as_bytes());
        }
        if let Some(fg) = self.fg {
            ansi::fg(w, fg.resolve(mode))?;
        }
        if let Some(bg) = self.bg {
            ansi::bg(w, bg.resolve(mode))?;
        }
        ansi::attribute_list(w, &self.attrs)?;
        w.write_all(self.content.as_bytes())?;
        ansi::reset(w)
    }

    /// The escape-encoded string for `mode`.
    #[must_use]
    pub fn render(&self, mode: ColorMode) -> String {
        let mut buf = Vec::with_capacity(self.content.len() + 32);
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut buf, mode);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Print through `out`, using its color mode and flush policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`](crate::Error::Write) if the sink fails.
    pub fn print<W: Write>(&self, out: &mut Emitter<W>) -> Result<()> {
        let rendered = self.render(out.color_mode());
        out.write_raw(rendered.as_bytes())
    }
}

impl fmt::Display for StyledContent {
    /// Renders with true color.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(ColorMode::TrueColor))
    }
}

impl From<&str> for StyledContent {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

impl From<String> for StyledContent {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}

// ─── Stylize ─────────────────────────────────────────────────────────────────

/// Builder methods directly on strings: `"OK".with(Color::Named(Green))`.
pub trait Stylize: Sized {
    fn stylize(self) -> StyledContent;

    #[must_use]
    fn with(self, color: Color) -> StyledContent {
        self.stylize().color(color)
    }

    #[must_use]
    fn on(self, color: Color) -> StyledContent {
        self.stylize().on(color)
    }

    #[must_use]
    fn attribute(self, attr: Attribute) -> StyledContent {
        self.stylize().attribute(attr)
    }

    #[must_use]
    fn bold(self) -> StyledContent {
        self.attribute(Attribute::Bold)
    }

    #[must_use]
    fn italic(self) -> StyledContent {
        self.attribute(Attribute::Italic)
    }

    #[must_use]
    fn underlined(self) -> StyledContent {
        self.attribute(Attribute::Underlined)
    }
}

impl Stylize for &str {
    fn stylize(self) -> StyledContent {
        StyledContent::new(self)
    }
}

impl Stylize for String {
    fn stylize(self) -> StyledContent {
        StyledContent::new(self)
    }
}

impl Stylize for StyledContent {
    fn stylize(self) -> StyledContent {
        self
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
