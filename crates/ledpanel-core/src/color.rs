//! RGB color handling.
//!
//! The device reports colors as packed 24-bit integers (`0xRRGGBB`), while the
//! picker side of the panel speaks `rgb(r,g,b)` strings. Older firmware also
//! sends the bare `r,g,b` form, so both are accepted on input.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while parsing a color string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    /// The string is not in `rgb(r,g,b)` or `r,g,b` form.
    #[error("Malformed color string: {0:?}")]
    Malformed(String),

    /// A component does not fit in a byte.
    #[error("Color component out of range: {0}")]
    OutOfRange(u32),

    /// A built-in color pattern failed to compile.
    #[error("Invalid color pattern: {0}")]
    Pattern(String),
}

/// One channel of an RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    /// Query parameter name used by `/set` for this channel.
    pub fn key(&self) -> &'static str {
        match self {
            Channel::Red => "r",
            Channel::Green => "g",
            Channel::Blue => "b",
        }
    }
}

/// An 8-bit per channel RGB color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

type Pattern = OnceLock<Result<Regex, regex::Error>>;

fn compiled(cell: &'static Pattern, source: &str) -> Result<&'static Regex, ColorError> {
    cell.get_or_init(|| Regex::new(source))
        .as_ref()
        .map_err(|e| ColorError::Pattern(e.to_string()))
}

fn css_pattern() -> Result<&'static Regex, ColorError> {
    static PATTERN: Pattern = OnceLock::new();
    compiled(&PATTERN, r"^rgb\((\d+),\s*(\d+),\s*(\d+)\)$")
}

fn triple_pattern() -> Result<&'static Regex, ColorError> {
    static PATTERN: Pattern = OnceLock::new();
    compiled(&PATTERN, r"^\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*$")
}

fn component(text: &str) -> Result<u8, ColorError> {
    let value: u32 = text
        .parse()
        .map_err(|_| ColorError::Malformed(text.to_string()))?;
    u8::try_from(value).map_err(|_| ColorError::OutOfRange(value))
}

fn from_captures(re: &Regex, text: &str) -> Result<Rgb, ColorError> {
    let caps = re
        .captures(text)
        .ok_or_else(|| ColorError::Malformed(text.to_string()))?;
    Ok(Rgb {
        r: component(&caps[1])?,
        g: component(&caps[2])?,
        b: component(&caps[3])?,
    })
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Unpack a `0xRRGGBB` integer. Bits above the low 24 are ignored.
    pub fn from_packed(col: u32) -> Self {
        Self {
            r: ((col >> 16) & 0xff) as u8,
            g: ((col >> 8) & 0xff) as u8,
            b: (col & 0xff) as u8,
        }
    }

    /// Pack into a `0xRRGGBB` integer.
    pub fn packed(&self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    /// Parse the strict `rgb(r,g,b)` form emitted by color pickers.
    pub fn parse_css(text: &str) -> Result<Self, ColorError> {
        from_captures(css_pattern()?, text)
    }

    /// Parse either `rgb(r,g,b)` or the bare `r,g,b` form.
    pub fn parse(text: &str) -> Result<Self, ColorError> {
        let trimmed = text.trim();
        if trimmed.starts_with("rgb(") {
            Self::parse_css(trimmed)
        } else {
            from_captures(triple_pattern()?, trimmed)
        }
    }

    /// `rgb(r,g,b)` without spaces.
    pub fn to_css(&self) -> String {
        format!("rgb({},{},{})", self.r, self.g, self.b)
    }

    /// `#rrggbb` in lower case.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn channel(&self, channel: Channel) -> u8 {
        match channel {
            Channel::Red => self.r,
            Channel::Green => self.g,
            Channel::Blue => self.b,
        }
    }

    /// Copy of this color with one channel replaced.
    pub fn with_channel(self, channel: Channel, value: u8) -> Self {
        match channel {
            Channel::Red => Self { r: value, ..self },
            Channel::Green => Self { g: value, ..self },
            Channel::Blue => Self { b: value, ..self },
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

/// Format a packed color as `rgb(r,g,b)`.
pub fn col_to_rgb(col: u32) -> String {
    Rgb::from_packed(col).to_css()
}

/// Split an `rgb(r,g,b)` string into its components.
pub fn rgb_to_components(text: &str) -> Result<Rgb, ColorError> {
    Rgb::parse_css(text)
}
