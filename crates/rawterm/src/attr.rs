// SPDX-License-Identifier: MIT
//
// Text attributes: the SGR rendering flags.
//
// Two views of the same thing:
//
//   Attribute   one SGR command, including the "off" variants (NoBold,
//               NotCrossedOut, ...). This is what `set_attribute` emits.
//   Attributes  a compact bitset of the attributes that are *on*, for
//               batch emission and for asking what a sequence of commands
//               leaves switched on.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

// ─── Attribute ───────────────────────────────────────────────────────────────

/// A single SGR (Select Graphic Rendition) attribute command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// SGR 0: reset every attribute and both colors.
    Reset,
    /// SGR 1: increased intensity.
    Bold,
    /// SGR 2: decreased intensity.
    Dim,
    /// SGR 3.
    Italic,
    /// SGR 4.
    Underlined,
    /// SGR 5: less than 150 blinks per minute.
    SlowBlink,
    /// SGR 6: rarely supported.
    RapidBlink,
    /// SGR 7: swap foreground and background.
    Reverse,
    /// SGR 8.
    Hidden,
    /// SGR 9: strikethrough. Not rendered by Windows conhost.
    CrossedOut,
    /// SGR 20: almost never supported.
    Fraktur,
    /// SGR 21: bold off (double underline on some terminals).
    NoBold,
    /// SGR 22: neither bold nor dim.
    NormalIntensity,
    /// SGR 23: italic and fraktur off.
    NoItalic,
    /// SGR 24.
    NoUnderline,
    /// SGR 25.
    NoBlink,
    /// SGR 27.
    NoReverse,
    /// SGR 28.
    NoHidden,
    /// SGR 29.
    NotCrossedOut,
    /// SGR 51.
    Framed,
    /// SGR 52.
    Encircled,
    /// SGR 53.
    OverLined,
    /// SGR 54.
    NotFramedOrEncircled,
    /// SGR 55.
    NotOverLined,
}

impl Attribute {
    /// Every attribute, in SGR code order.
    pub const ALL: [Self; 24] = [
        Self::Reset,
        Self::Bold,
        Self::Dim,
        Self::Italic,
        Self::Underlined,
        Self::SlowBlink,
        Self::RapidBlink,
        Self::Reverse,
        Self::Hidden,
        Self::CrossedOut,
        Self::Fraktur,
        Self::NoBold,
        Self::NormalIntensity,
        Self::NoItalic,
        Self::NoUnderline,
        Self::NoBlink,
        Self::NoReverse,
        Self::NoHidden,
        Self::NotCrossedOut,
        Self::Framed,
        Self::Encircled,
        Self::OverLined,
        Self::NotFramedOrEncircled,
        Self::NotOverLined,
    ];

    /// The SGR parameter for this attribute.
    #[must_use]
    pub const fn sgr(self) -> u8 {
        match self {
            Self::Reset => 0,
            Self::Bold => 1,
            Self::Dim => 2,
            Self::Italic => 3,
            Self::Underlined => 4,
            Self::SlowBlink => 5,
            Self::RapidBlink => 6,
            Self::Reverse => 7,
            Self::Hidden => 8,
            Self::CrossedOut => 9,
            Self::Fraktur => 20,
            Self::NoBold => 21,
            Self::NormalIntensity => 22,
            Self::NoItalic => 23,
            Self::NoUnderline => 24,
            Self::NoBlink => 25,
            Self::NoReverse => 27,
            Self::NoHidden => 28,
            Self::NotCrossedOut => 29,
            Self::Framed => 51,
            Self::Encircled => 52,
            Self::OverLined => 53,
            Self::NotFramedOrEncircled => 54,
            Self::NotOverLined => 55,
        }
    }

    /// Variant name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Reset => "Reset",
            Self::Bold => "Bold",
            Self::Dim => "Dim",
            Self::Italic => "Italic",
            Self::Underlined => "Underlined",
            Self::SlowBlink => "SlowBlink",
            Self::RapidBlink => "RapidBlink",
            Self::Reverse => "Reverse",
            Self::Hidden => "Hidden",
            Self::CrossedOut => "CrossedOut",
            Self::Fraktur => "Fraktur",
            Self::NoBold => "NoBold",
            Self::NormalIntensity => "NormalIntensity",
            Self::NoItalic => "NoItalic",
            Self::NoUnderline => "NoUnderline",
            Self::NoBlink => "NoBlink",
            Self::NoReverse => "NoReverse",
            Self::NoHidden => "NoHidden",
            Self::NotCrossedOut => "NotCrossedOut",
            Self::Framed => "Framed",
            Self::Encircled => "Encircled",
            Self::OverLined => "OverLined",
            Self::NotFramedOrEncircled => "NotFramedOrEncircled",
            Self::NotOverLined => "NotOverLined",
        }
    }

    /// The flag this attribute turns on, if it is an "on" attribute.
    #[must_use]
    pub const fn flag(self) -> Attributes {
        match self {
            Self::Bold => Attributes::BOLD,
            Self::Dim => Attributes::DIM,
            Self::Italic => Attributes::ITALIC,
            Self::Underlined => Attributes::UNDERLINED,
            Self::SlowBlink => Attributes::SLOW_BLINK,
            Self::RapidBlink => Attributes::RAPID_BLINK,
            Self::Reverse => Attributes::REVERSE,
            Self::Hidden => Attributes::HIDDEN,
            Self::CrossedOut => Attributes::CROSSED_OUT,
            Self::Fraktur => Attributes::FRAKTUR,
            Self::Framed => Attributes::FRAMED,
            Self::Encircled => Attributes::ENCIRCLED,
            Self::OverLined => Attributes::OVERLINED,
            _ => Attributes::empty(),
        }
    }

    /// The flags this attribute turns off.
    #[must_use]
    pub const fn clears(self) -> Attributes {
        match self {
            Self::Reset => Attributes::all(),
            Self::NoBold => Attributes::BOLD,
            Self::NormalIntensity => Attributes::BOLD.union(Attributes::DIM),
            Self::NoItalic => Attributes::ITALIC.union(Attributes::FRAKTUR),
            Self::NoUnderline => Attributes::UNDERLINED,
            Self::NoBlink => Attributes::SLOW_BLINK.union(Attributes::RAPID_BLINK),
            Self::NoReverse => Attributes::REVERSE,
            Self::NoHidden => Attributes::HIDDEN,
            Self::NotCrossedOut => Attributes::CROSSED_OUT,
            Self::NotFramedOrEncircled => Attributes::FRAMED.union(Attributes::ENCIRCLED),
            Self::NotOverLined => Attributes::OVERLINED,
            _ => Attributes::empty(),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = Error;

    /// Case-insensitive variant name lookup (`"CrossedOut"`, `"crossedout"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownAttribute(s.to_owned()))
    }
}

// ─── Attributes ──────────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// The set of attributes currently on.
    ///
    /// ```
    /// use rawterm::attr::{Attribute, Attributes};
    ///
    /// let set = Attributes::empty()
    ///     .apply(Attribute::Bold)
    ///     .apply(Attribute::CrossedOut)
    ///     .apply(Attribute::NoBold);
    /// assert_eq!(set, Attributes::CROSSED_OUT);
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attributes: u16 {
        const BOLD        = 1 << 0;
        const DIM         = 1 << 1;
        const ITALIC      = 1 << 2;
        const UNDERLINED  = 1 << 3;
        const SLOW_BLINK  = 1 << 4;
        const RAPID_BLINK = 1 << 5;
        const REVERSE     = 1 << 6;
        const HIDDEN      = 1 << 7;
        const CROSSED_OUT = 1 << 8;
        const FRAKTUR     = 1 << 9;
        const FRAMED      = 1 << 10;
        const ENCIRCLED   = 1 << 11;
        const OVERLINED   = 1 << 12;
    }
}

/// Flag → SGR code, in emission order.
const FLAG_CODES: [(Attributes, u8); 13] = [
    (Attributes::BOLD, 1),
    (Attributes::DIM, 2),
    (Attributes::ITALIC, 3),
    (Attributes::UNDERLINED, 4),
    (Attributes::SLOW_BLINK, 5),
    (Attributes::RAPID_BLINK, 6),
    (Attributes::REVERSE, 7),
    (Attributes::HIDDEN, 8),
    (Attributes::CROSSED_OUT, 9),
    (Attributes::FRAKTUR, 20),
    (Attributes::FRAMED, 51),
    (Attributes::ENCIRCLED, 52),
    (Attributes::OVERLINED, 53),
];

impl Attributes {
    /// Apply one attribute command to the set.
    #[must_use]
    pub const fn apply(self, attr: Attribute) -> Self {
        self.difference(attr.clears()).union(attr.flag())
    }

    /// SGR codes for every flag in the set, in ascending code order.
    pub fn sgr_codes(self) -> impl Iterator<Item = u8> {
        FLAG_CODES
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, code)| code)
    }
}

impl From<Attribute> for Attributes {
    fn from(attr: Attribute) -> Self {
        attr.flag()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossed_out_is_sgr_9() {
        assert_eq!(Attribute::CrossedOut.sgr(), 9);
    }

    #[test]
    fn off_codes_match_sgr_table() {
        assert_eq!(Attribute::NormalIntensity.sgr(), 22);
        assert_eq!(Attribute::NoReverse.sgr(), 27);
        assert_eq!(Attribute::NotOverLined.sgr(), 55);
    }

    #[test]
    fn parse_exact_name() {
        assert_eq!("CrossedOut".parse::<Attribute>().unwrap(), Attribute::CrossedOut);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("bold".parse::<Attribute>().unwrap(), Attribute::Bold);
        assert_eq!("OVERLINED".parse::<Attribute>().unwrap(), Attribute::OverLined);
    }

    #[test]
    fn parse_unknown_fails() {
        let err = "Sparkly".parse::<Attribute>().unwrap_err();
        assert!(matches!(err, Error::UnknownAttribute(name) if name == "Sparkly"));
    }

    #[test]
    fn name_roundtrips_for_every_attribute() {
        for attr in Attribute::ALL {
            assert_eq!(attr.name().parse::<Attribute>().unwrap(), attr);
        }
    }

    #[test]
    fn apply_on_then_off_is_empty() {
        let set = Attributes::empty()
            .apply(Attribute::Underlined)
            .apply(Attribute::NoUnderline);
        assert!(set.is_empty());
    }

    #[test]
    fn normal_intensity_clears_bold_and_dim() {
        let set = (Attributes::BOLD | Attributes::DIM | Attributes::ITALIC)
            .apply(Attribute::NormalIntensity);
        assert_eq!(set, Attributes::ITALIC);
    }

    #[test]
    fn reset_clears_everything() {
        assert!(Attributes::all().apply(Attribute::Reset).is_empty());
    }

    #[test]
    fn sgr_codes_are_ordered() {
        let set = Attributes::CROSSED_OUT | Attributes::BOLD | Attributes::OVERLINED;
        assert_eq!(set.sgr_codes().collect::<Vec<_>>(), [1, 9, 53]);
    }

    #[test]
    fn off_attribute_has_no_flag() {
        assert!(Attribute::NoBlink.flag().is_empty());
        assert!(Attributes::from(Attribute::NoBlink).is_empty());
    }
}
