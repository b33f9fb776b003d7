//! # qrlogo
//!
//! A Rust library for rendering QR codes with an optional logo in the middle.
//!
//! `qrlogo` encodes text or URLs at error correction level H, then exports the symbol as a PNG
//! image or an SVG document. On PNG output, a logo can be placed at the center, on top of a
//! background-colored "clear zone" (a rounded rectangle or a circle) that keeps the logo's edges
//! from blending into the modules around it.
//!
//! ## Features
//!
//! - PNG or SVG output with custom foreground and background colors (hex or CSS names).
//! - Configurable module scale, quiet zone width and forced symbol version.
//! - Logo overlay sized relative to the QR code, with padding and a rounded or circular clear zone.
//! - Serde-friendly configuration with documented defaults, validated once per render.
//! - Safe Rust implementation with no unsafe code.
//!
//! ## Example
//!
//! Render a QR code with a logo:
//!
//! ```rust
//! use image::{DynamicImage, Rgba, RgbaImage};
//! use qrlogo::{render, ClearZoneShape, LogoOptions, LogoOverlay, RenderRequest};
//!
//! let logo = LogoOverlay::new(
//!     DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 64, Rgba([255, 165, 0, 255]))),
//!     LogoOptions {
//!         scale: 0.2,
//!         shape: ClearZoneShape::Circle,
//!         ..LogoOptions::default()
//!     },
//! )
//! .unwrap();
//!
//! let request = RenderRequest::new("https://example.com").with_scale(10);
//! let output = render(&request, Some(&logo)).unwrap();
//! assert_eq!(output.media_type, "image/png");
//! assert_eq!(output.filename, "qrcode_png.png");
//! ```
//!
//! Render an SVG document:
//!
//! ```rust
//! use qrlogo::{render, OutputFormat, RenderRequest};
//!
//! let request = RenderRequest::new("Hello, World!")
//!     .with_colors("#1E3A8A".parse().unwrap(), "white".parse().unwrap())
//!     .with_format(OutputFormat::Svg);
//! let output = render(&request, None).unwrap();
//! assert!(String::from_utf8(output.bytes).unwrap().contains("fill=\"#1E3A8A\""));
//! ```
//!
//! ## Modules
//!
//! - [`compositor`]: The render pipeline and logo placement geometry.
//! - [`options`]: Request, logo and color configuration.
//! - [`helper`]: Encoding, rasterizing and SVG/PNG serialization utilities.
//! - [`surface`]: Drawing surface used for the clear zone and logo.
//! - [`error`]: The error type.
#![forbid(unsafe_code)]

pub mod compositor;
pub mod error;
pub mod helper;
pub mod options;
pub mod surface;

pub use compositor::{composite_logo, fit_within, render, LogoOverlay, OverlayPlan, RenderedOutput};
pub use error::{RenderError, Result};
pub use options::{ClearZoneShape, Color, LogoOptions, OutputFormat, RenderRequest};
pub use surface::{ClearZone, Surface};
