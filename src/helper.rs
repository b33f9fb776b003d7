use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, RgbaImage};
use qrcode::types::QrError;
use qrcode::{Color as Module, EcLevel, QrCode, Version};
use tracing::debug;

use crate::error::{RenderError, Result};
use crate::options::{Color, RenderRequest};

/*---- Utilities ----*/

/// Encodes text at error correction level H.
///
/// With `version` set, the symbol is forced to that version; otherwise the
/// smallest version that holds the data is used.
///
/// # Errors
///
/// Returns [`RenderError::CapacityExceeded`] when the text does not fit.
///
/// # Example
///
/// ```rust
/// use qrlogo::helper::encode_text;
///
/// let qr = encode_text("HELLO WORLD", Some(2)).unwrap();
/// assert_eq!(qr.width(), 25);
/// ```
pub fn encode_text(text: &str, version: Option<i16>) -> Result<QrCode> {
    let encoded = match version {
        Some(v) => QrCode::with_version(text, Version::Normal(v), EcLevel::H),
        None => QrCode::with_error_correction_level(text, EcLevel::H),
    };
    let qr = encoded.map_err(|err| match err {
        QrError::DataTooLong => RenderError::CapacityExceeded { version, source: err },
        other => RenderError::Validation(format!("cannot encode text: {other}")),
    })?;
    debug!(version = ?qr.version(), modules = qr.width(), "encoded QR symbol");
    Ok(qr)
}

// Module lookup that treats anything outside the symbol as light,
// so the quiet zone needs no special casing.
fn is_dark(qr: &QrCode, x: i64, y: i64) -> bool {
    let width = qr.width() as i64;
    (0..width).contains(&x) && (0..width).contains(&y) && qr[(x as usize, y as usize)] == Module::Dark
}

// Returns a string of SVG code for an image depicting the given QR Code,
// with `border` light modules on each side. One SVG user unit is one module;
// `width`/`height` scale the whole grid to `scale` pixels per module.
// The string always uses Unix newlines (\n), regardless of the platform.
pub fn to_svg_string(qr: &QrCode, border: u32, scale: u32, dark: Color, light: Color) -> String {
    let size = qr.width() as u32;
    let dimension = size + border * 2;
    let pixels = dimension * scale;
    let mut result = String::new();
    result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
    result += "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n";
    result += &format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" width=\"{1}\" height=\"{1}\" viewBox=\"0 0 {0} {0}\" stroke=\"none\">\n",
        dimension, pixels);
    result += &format!("\t<rect width=\"100%\" height=\"100%\" fill=\"{}\"{}/>\n",
        light.to_hex_rgb(), opacity_attr(light));
    result += "\t<path d=\"";
    let mut first = true;
    for y in 0..size {
        for x in 0..size {
            if is_dark(qr, x as i64, y as i64) {
                if !first {
                    result += " ";
                }
                first = false;
                result += &format!("M{},{}h1v1h-1z", x + border, y + border);
            }
        }
    }
    result += &format!("\" fill=\"{}\"{}/>\n", dark.to_hex_rgb(), opacity_attr(dark));
    result += "</svg>\n";
    result
}

fn opacity_attr(color: Color) -> String {
    if color.is_opaque() {
        String::new()
    } else {
        format!(" fill-opacity=\"{:.3}\"", color.opacity())
    }
}

/// Draws the QR code onto a new RGBA image, `scale` pixels per module and
/// `border` modules of quiet zone on each side.
///
/// # Example
///
/// ```rust
/// use qrlogo::helper::{encode_text, qr_to_image};
/// use qrlogo::Color;
///
/// let qr = encode_text("Hello, World!", None).unwrap();
/// let img = qr_to_image(&qr, 4, 3, Color::BLACK, Color::WHITE);
/// assert_eq!(img.width(), (qr.width() as u32 + 8) * 3);
/// ```
pub fn qr_to_image(qr: &QrCode, border: u32, scale: u32, dark: Color, light: Color) -> RgbaImage {
    let size = (qr.width() as u32 + 2 * border) * scale;
    let border = i64::from(border);
    let scale = scale.max(1);
    let img = ImageBuffer::from_fn(size, size, |x, y| {
        let qr_x = i64::from(x / scale) - border;
        let qr_y = i64::from(y / scale) - border;
        if is_dark(qr, qr_x, qr_y) {
            dark.to_rgba()
        } else {
            light.to_rgba()
        }
    });
    debug!(width = size, height = size, "rasterized QR symbol");
    img
}

/// Encodes an RGBA image as PNG bytes.
pub fn encode_png(img: RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Renders the request's text straight to an SVG string.
pub fn generate_svg_string(request: &RenderRequest) -> Result<String> {
    request.validate()?;
    let qr = encode_text(&request.text, request.version)?;
    Ok(to_svg_string(&qr, request.border, request.scale, request.foreground, request.background))
}

/// Renders the request's text to an in-memory RGBA image, without a logo.
///
/// # Example
///
/// ```
/// use qrlogo::helper::generate_image_buffer;
/// use qrlogo::RenderRequest;
///
/// let img = generate_image_buffer(&RenderRequest::new("Hello, World!").with_scale(1)).unwrap();
/// assert_eq!(img.dimensions(), (33, 33));
/// ```
pub fn generate_image_buffer(request: &RenderRequest) -> Result<RgbaImage> {
    request.validate()?;
    let qr = encode_text(&request.text, request.version)?;
    Ok(qr_to_image(&qr, request.border, request.scale, request.foreground, request.background))
}
