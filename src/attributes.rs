//! Text attributes
//!
//! A console attribute word packs the foreground color into the low nibble
//! and the background color into the next nibble. Bits above the low byte
//! (grid lines, reverse video, DBCS lead/trail markers) belong to the device;
//! partial color updates carry them through untouched.

use std::cell::OnceCell;
use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::device::DeviceResult;

const FOREGROUND_MASK: u16 = 0x000F;
const BACKGROUND_MASK: u16 = 0x00F0;

/// The 16 console colors, numbered as in the low nibble of an attribute word
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum Color {
    Black = 0,
    DarkBlue = 1,
    DarkGreen = 2,
    DarkCyan = 3,
    DarkRed = 4,
    DarkMagenta = 5,
    DarkYellow = 6,
    Gray = 7,
    DarkGray = 8,
    Blue = 9,
    Green = 10,
    Cyan = 11,
    Red = 12,
    Magenta = 13,
    Yellow = 14,
    White = 15,
}

impl Color {
    pub const ALL: [Color; 16] = [
        Color::Black,
        Color::DarkBlue,
        Color::DarkGreen,
        Color::DarkCyan,
        Color::DarkRed,
        Color::DarkMagenta,
        Color::DarkYellow,
        Color::Gray,
        Color::DarkGray,
        Color::Blue,
        Color::Green,
        Color::Cyan,
        Color::Red,
        Color::Magenta,
        Color::Yellow,
        Color::White,
    ];

    /// Color for the low 4 bits of `code`; higher bits are ignored
    pub const fn from_nibble(code: u8) -> Self {
        Self::ALL[(code & 0x0F) as usize]
    }

    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Intensity bit set
    pub const fn is_bright(self) -> bool {
        self.code() & 0x08 != 0
    }

    pub const fn name(self) -> &'static str {
        match self {
            Color::Black => "black",
            Color::DarkBlue => "dark-blue",
            Color::DarkGreen => "dark-green",
            Color::DarkCyan => "dark-cyan",
            Color::DarkRed => "dark-red",
            Color::DarkMagenta => "dark-magenta",
            Color::DarkYellow => "dark-yellow",
            Color::Gray => "gray",
            Color::DarkGray => "dark-gray",
            Color::Blue => "blue",
            Color::Green => "green",
            Color::Cyan => "cyan",
            Color::Red => "red",
            Color::Magenta => "magenta",
            Color::Yellow => "yellow",
            Color::White => "white",
        }
    }
}

impl From<Color> for u8 {
    fn from(color: Color) -> u8 {
        color.code()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts a color name (`dark-blue`, `dark_blue`, `DarkBlue`) or a code 0-15
impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<u8>() {
            return if code <= 15 {
                Ok(Color::from_nibble(code))
            } else {
                Err(format!("Color code out of range: {} (expected 0-15)", code))
            };
        }

        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_' && *c != ' ')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Color::ALL
            .iter()
            .copied()
            .find(|color| color.name().replace('-', "") == normalized)
            .ok_or_else(|| format!("Unknown color: {}", s))
    }
}

bitflags! {
    /// Device attribute bits above the color byte
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct LvbFlags: u16 {
        const LEADING_BYTE    = 0x0100;
        const TRAILING_BYTE   = 0x0200;
        const GRID_HORIZONTAL = 0x0400;
        const GRID_LVERTICAL  = 0x0800;
        const GRID_RVERTICAL  = 0x1000;
        const REVERSE_VIDEO   = 0x4000;
        const UNDERSCORE      = 0x8000;
    }
}

/// A full console attribute word
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Attributes(u16);

impl Attributes {
    /// Light gray on black, the console's factory default
    pub const FALLBACK: Attributes = Attributes::new(Color::Gray, Color::Black);

    pub const fn new(foreground: Color, background: Color) -> Self {
        Self(((background as u16) << 4) | foreground as u16)
    }

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn foreground(self) -> Color {
        Color::from_nibble(self.0 as u8)
    }

    pub const fn background(self) -> Color {
        Color::from_nibble((self.0 >> 4) as u8)
    }

    pub fn flags(self) -> LvbFlags {
        LvbFlags::from_bits_truncate(self.0)
    }

    /// Replace the foreground nibble with the low 4 bits of `code`
    pub const fn with_foreground(self, code: u8) -> Self {
        Self((self.0 & !FOREGROUND_MASK) | (code as u16 & FOREGROUND_MASK))
    }

    /// Replace the background nibble with the low 4 bits of `code`
    pub const fn with_background(self, code: u8) -> Self {
        Self((self.0 & !BACKGROUND_MASK) | ((code as u16 & 0x0F) << 4))
    }
}

impl From<u16> for Attributes {
    fn from(bits: u16) -> Self {
        Self(bits)
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {} (0x{:04X})", self.foreground(), self.background(), self.0)
    }
}

/// The console's original colors, captured once per context
#[derive(Debug)]
pub struct AttributeState {
    default: OnceCell<Attributes>,
    fallback: Attributes,
}

impl AttributeState {
    pub fn new(fallback: Attributes) -> Self {
        Self {
            default: OnceCell::new(),
            fallback,
        }
    }

    /// Capture the default attributes on first call.
    ///
    /// `query` runs at most once over the lifetime of this state. A failed
    /// query stores the fallback word and still counts as the capture.
    pub fn ensure_captured<F>(&self, query: F) -> Attributes
    where
        F: FnOnce() -> DeviceResult<u16>,
    {
        *self.default.get_or_init(|| match query() {
            Ok(bits) => {
                let attrs = Attributes::from_bits(bits);
                debug!("Captured default attributes: {}", attrs);
                attrs
            }
            Err(e) => {
                warn!("Could not read default attributes ({}), using {}", e, self.fallback);
                self.fallback
            }
        })
    }

    pub fn is_captured(&self) -> bool {
        self.default.get().is_some()
    }

    /// The captured default, if capture has happened
    pub fn default_attributes(&self) -> Option<Attributes> {
        self.default.get().copied()
    }
}
