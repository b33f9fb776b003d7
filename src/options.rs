//! Render configuration: colors, output format, QR parameters and logo options.
//!
//! Every field has a documented default and a valid range. Values are checked
//! once, when [`crate::render`] starts, through [`RenderRequest::validate`] and
//! [`LogoOptions::validate`].

use std::fmt;
use std::str::FromStr;

use image::Rgba;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{RenderError, Result};

/// Smallest module size, in pixels.
pub const MIN_SCALE: u32 = 1;
/// Largest module size, in pixels.
pub const MAX_SCALE: u32 = 64;
/// Widest quiet zone, in modules.
pub const MAX_BORDER: u32 = 32;
/// Smallest QR Code Model 2 version.
pub const MIN_VERSION: i16 = 1;
/// Largest QR Code Model 2 version.
pub const MAX_VERSION: i16 = 40;

/// An RGBA color, parsed from hex notation or a CSS basic color name.
///
/// # Example
///
/// ```rust
/// use qrlogo::Color;
///
/// let orange: Color = "#FFA500".parse().unwrap();
/// assert_eq!(orange, "orange".parse().unwrap());
/// assert_eq!(orange.to_string(), "#FFA500");
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Color(pub [u8; 4]);

const NAMED_COLORS: &[(&str, [u8; 4])] = &[
    ("black", [0, 0, 0, 255]),
    ("silver", [192, 192, 192, 255]),
    ("gray", [128, 128, 128, 255]),
    ("grey", [128, 128, 128, 255]),
    ("white", [255, 255, 255, 255]),
    ("maroon", [128, 0, 0, 255]),
    ("red", [255, 0, 0, 255]),
    ("purple", [128, 0, 128, 255]),
    ("fuchsia", [255, 0, 255, 255]),
    ("magenta", [255, 0, 255, 255]),
    ("green", [0, 128, 0, 255]),
    ("lime", [0, 255, 0, 255]),
    ("olive", [128, 128, 0, 255]),
    ("yellow", [255, 255, 0, 255]),
    ("navy", [0, 0, 128, 255]),
    ("blue", [0, 0, 255, 255]),
    ("teal", [0, 128, 128, 255]),
    ("aqua", [0, 255, 255, 255]),
    ("cyan", [0, 255, 255, 255]),
    ("orange", [255, 165, 0, 255]),
    ("transparent", [0, 0, 0, 0]),
];

impl Color {
    pub const BLACK: Color = Color([0, 0, 0, 255]);
    pub const WHITE: Color = Color([255, 255, 255, 255]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    pub const fn alpha(self) -> u8 {
        self.0[3]
    }

    pub const fn is_opaque(self) -> bool {
        self.0[3] == u8::MAX
    }

    /// The `#RRGGBB` part, without alpha. Used for SVG fills.
    pub fn to_hex_rgb(self) -> String {
        let [r, g, b, _] = self.0;
        format!("#{:02X}{:02X}{:02X}", r, g, b)
    }

    /// Alpha as an SVG opacity in `[0, 1]`.
    pub fn opacity(self) -> f32 {
        f32::from(self.alpha()) / 255.0
    }

    pub const fn to_rgba(self) -> Rgba<u8> {
        Rgba(self.0)
    }
}

fn hex_digit(c: u8) -> Option<u8> {
    (c as char).to_digit(16).map(|d| d as u8)
}

fn parse_hex(s: &str) -> Option<[u8; 4]> {
    let digits: Vec<u8> = s.bytes().map(hex_digit).collect::<Option<_>>()?;
    match digits.len() {
        // Short forms repeat each nibble: #F80 == #FF8800.
        3 | 4 => {
            let mut out = [255u8; 4];
            for (slot, d) in out.iter_mut().zip(&digits) {
                *slot = d * 17;
            }
            Some(out)
        }
        6 | 8 => {
            let mut out = [255u8; 4];
            for (slot, pair) in out.iter_mut().zip(digits.chunks(2)) {
                *slot = pair[0] * 16 + pair[1];
            }
            Some(out)
        }
        _ => None,
    }
}

impl FromStr for Color {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Some(hex) = trimmed.strip_prefix('#') {
            return parse_hex(hex)
                .map(Color)
                .ok_or_else(|| RenderError::Validation(format!("invalid color: {s:?}")));
        }
        let lower = trimmed.to_ascii_lowercase();
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, rgba)| Color(*rgba))
            .or_else(|| parse_hex(trimmed).map(Color))
            .ok_or_else(|| RenderError::Validation(format!("invalid color: {s:?}")))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [r, g, b, a] = self.0;
        if a == u8::MAX {
            write!(f, "#{:02X}{:02X}{:02X}", r, g, b)
        } else {
            write!(f, "#{:02X}{:02X}{:02X}{:02X}", r, g, b, a)
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Output image format.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG raster. The only format that supports a logo overlay.
    #[default]
    Png,
    /// SVG vector document.
    Svg,
}

impl OutputFormat {
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Svg => "image/svg+xml",
        }
    }

    /// Download name offered for this format, e.g. `qrcode_png.png`.
    pub const fn filename(self) -> &'static str {
        match self {
            Self::Png => "qrcode_png.png",
            Self::Svg => "qrcode_svg.svg",
        }
    }
}

/// Everything needed to render one QR code, apart from the logo.
///
/// Error correction is always level H, so that a logo covering the center
/// leaves the symbol readable.
///
/// # Example
///
/// ```rust
/// use qrlogo::{OutputFormat, RenderRequest};
///
/// let request = RenderRequest::new("https://example.com")
///     .with_colors("navy".parse().unwrap(), "#FFFFFF".parse().unwrap())
///     .with_scale(10)
///     .with_format(OutputFormat::Svg);
/// assert!(request.validate().is_ok());
/// ```
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderRequest {
    /// Text or URL to encode. Must not be empty.
    pub text: String,
    /// Color of dark modules. Default black.
    pub foreground: Color,
    /// Color of light modules, the quiet zone and the logo clear zone. Default white.
    pub background: Color,
    /// Default PNG.
    pub format: OutputFormat,
    /// Pixels per module, `MIN_SCALE..=MAX_SCALE`. Default 8.
    pub scale: u32,
    /// Quiet zone width in modules, `0..=MAX_BORDER`. Default 4.
    pub border: u32,
    /// Forced symbol version, `MIN_VERSION..=MAX_VERSION`. `None` picks the smallest that fits.
    pub version: Option<i16>,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            text: String::new(),
            foreground: Color::BLACK,
            background: Color::WHITE,
            format: OutputFormat::Png,
            scale: 8,
            border: 4,
            version: None,
        }
    }
}

impl RenderRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_colors(mut self, foreground: Color, background: Color) -> Self {
        self.foreground = foreground;
        self.background = background;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_border(mut self, border: u32) -> Self {
        self.border = border;
        self
    }

    pub fn with_version(mut self, version: Option<i16>) -> Self {
        self.version = version;
        self
    }

    /// Checks text, scale, border and version against their ranges.
    pub fn validate(&self) -> Result<()> {
        if self.text.is_empty() {
            return Err(RenderError::Validation("text must not be empty".into()));
        }
        if !(MIN_SCALE..=MAX_SCALE).contains(&self.scale) {
            return Err(RenderError::Validation(format!(
                "scale {} outside {}..={}",
                self.scale, MIN_SCALE, MAX_SCALE
            )));
        }
        if self.border > MAX_BORDER {
            return Err(RenderError::Validation(format!(
                "border {} outside 0..={}",
                self.border, MAX_BORDER
            )));
        }
        if let Some(version) = self.version {
            if !(MIN_VERSION..=MAX_VERSION).contains(&version) {
                return Err(RenderError::Validation(format!(
                    "version {} outside {}..={}",
                    version, MIN_VERSION, MAX_VERSION
                )));
            }
        }
        Ok(())
    }
}

/// Shape of the background-colored area carved out beneath the logo.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearZoneShape {
    #[default]
    RoundedRectangle,
    /// Ellipse inscribed in the clear-zone box; a circle when the box is square.
    Circle,
}

/// Sizing and shape of a logo overlay.
///
/// # Example
///
/// ```rust
/// use qrlogo::{ClearZoneShape, LogoOptions};
///
/// let options = LogoOptions {
///     scale: 0.3,
///     shape: ClearZoneShape::Circle,
///     ..LogoOptions::default()
/// };
/// assert!(options.validate().is_ok());
/// ```
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoOptions {
    /// Longest logo side as a fraction of the QR image's shorter side, in `(0, 1)`. Default 0.25.
    pub scale: f64,
    /// Clear-zone padding as a fraction of the logo's longer side, in `[0, 1]`. Default 0.18.
    pub padding: f64,
    /// Corner radius in pixels. Ignored for [`ClearZoneShape::Circle`]. Default 12.
    pub corner_radius: u32,
    pub shape: ClearZoneShape,
}

impl Default for LogoOptions {
    fn default() -> Self {
        Self {
            scale: 0.25,
            padding: 0.18,
            corner_radius: 12,
            shape: ClearZoneShape::RoundedRectangle,
        }
    }
}

impl LogoOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.scale > 0.0 && self.scale < 1.0) {
            return Err(RenderError::Validation(format!(
                "logo scale {} outside (0, 1)",
                self.scale
            )));
        }
        if !(0.0..=1.0).contains(&self.padding) {
            return Err(RenderError::Validation(format!(
                "logo padding {} outside [0, 1]",
                self.padding
            )));
        }
        Ok(())
    }
}
