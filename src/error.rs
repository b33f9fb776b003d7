//! Error type shared by every rendering stage.

use qrcode::types::QrError;
use thiserror::Error;

/// Errors returned while building or rendering a QR code.
///
/// Every failure surfaces before any output bytes exist, so a caller never
/// receives a partially rendered image.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Empty text, an unparsable color or a parameter outside its range.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The logo could not be read or decoded, or has no pixels.
    ///
    /// Callers usually report this inline and render again without a logo.
    #[error("Invalid logo: {0}")]
    InvalidLogo(String),

    /// The text does not fit in the requested version (or in version 40 when
    /// the version is chosen automatically) at error correction level H.
    #[error("Capacity exceeded{}: {source}", .version.map(|v| format!(" for version {v}")).unwrap_or_default())]
    CapacityExceeded {
        version: Option<i16>,
        #[source]
        source: QrError,
    },

    /// The finished surface could not be encoded as PNG.
    #[error("Export error: {0}")]
    Export(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, RenderError>;
