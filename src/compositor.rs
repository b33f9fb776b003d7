//! The rendering pipeline: encode, rasterize or vectorize, then place the logo.

use std::borrow::Cow;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use tracing::{debug, instrument, warn};

use crate::error::{RenderError, Result};
use crate::helper::{encode_png, encode_text, qr_to_image, to_svg_string};
use crate::options::{Color, LogoOptions, OutputFormat, RenderRequest};
use crate::surface::{draw_clear_zone, ClearZone, Surface};

/// A decoded logo image together with its overlay options.
#[derive(Clone, Debug)]
pub struct LogoOverlay {
    image: RgbaImage,
    pub options: LogoOptions,
}

impl LogoOverlay {
    /// Wraps an already decoded image.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidLogo`] if the image has no pixels.
    pub fn new(image: DynamicImage, options: LogoOptions) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(RenderError::InvalidLogo(format!(
                "logo is {}x{} pixels",
                image.width(),
                image.height()
            )));
        }
        Ok(Self {
            image: image.into_rgba8(),
            options,
        })
    }

    /// Decodes an uploaded PNG or JPEG file held in memory.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidLogo`] if the bytes are not a readable image.
    pub fn from_bytes(bytes: &[u8], options: LogoOptions) -> Result<Self> {
        let image = image::load_from_memory(bytes).map_err(|err| RenderError::InvalidLogo(err.to_string()))?;
        Self::new(image, options)
    }

    /// Reads and decodes a logo file.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidLogo`] if the file cannot be read or is not a
    /// readable image. The message names the path.
    pub fn open(path: impl AsRef<Path>, options: LogoOptions) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|err| RenderError::InvalidLogo(format!("{}: {}", path.display(), err)))?;
        Self::new(image, options)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// Geometry of a logo placed on a QR image.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct OverlayPlan {
    pub logo_width: u32,
    pub logo_height: u32,
    /// Top-left corner of the logo.
    pub x: u32,
    pub y: u32,
    /// Margin added around the logo before clamping.
    pub pad: u32,
    /// Area painted in the background color, clamped to the image.
    pub zone: ClearZone,
}

impl OverlayPlan {
    /// Sizes and centers a `logo` on an `image`, both given as `(width, height)`.
    ///
    /// # Errors
    ///
    /// [`RenderError::Validation`] if the options are out of range, or if the
    /// logo scale leaves no room for even one pixel.
    ///
    /// # Example
    ///
    /// ```rust
    /// use qrlogo::{ClearZone, LogoOptions, OverlayPlan};
    ///
    /// let plan = OverlayPlan::compute((400, 400), (100, 100), &LogoOptions::default()).unwrap();
    /// assert_eq!((plan.x, plan.y), (150, 150));
    /// assert_eq!(plan.zone, ClearZone::new(132, 132, 268, 268));
    /// ```
    pub fn compute(image: (u32, u32), logo: (u32, u32), options: &LogoOptions) -> Result<Self> {
        options.validate()?;
        let (width, height) = image;
        let bound = (f64::from(width.min(height)) * options.scale).floor() as u32;
        if bound == 0 {
            return Err(RenderError::Validation(format!(
                "logo scale {} is too small for a {}x{} image",
                options.scale, width, height
            )));
        }

        let (logo_width, logo_height) = fit_within(logo.0, logo.1, bound);
        let pad = (f64::from(logo_width.max(logo_height)) * options.padding).floor() as u32;
        let x = (width - logo_width) / 2;
        let y = (height - logo_height) / 2;
        let zone = ClearZone::new(
            x.saturating_sub(pad),
            y.saturating_sub(pad),
            (x + logo_width + pad).min(width),
            (y + logo_height + pad).min(height),
        );

        Ok(Self {
            logo_width,
            logo_height,
            x,
            y,
            pad,
            zone,
        })
    }

    /// Pixels covered by the resized logo.
    pub fn logo_box(&self) -> ClearZone {
        ClearZone::new(self.x, self.y, self.x + self.logo_width, self.y + self.logo_height)
    }
}

/// Shrinks `width x height` so the longer side is at most `bound`, keeping the
/// aspect ratio. Sizes that already fit are returned unchanged.
pub fn fit_within(width: u32, height: u32, bound: u32) -> (u32, u32) {
    let long = width.max(height);
    if long <= bound {
        return (width, height);
    }
    let shrink = |side: u32| {
        if side == long {
            bound
        } else {
            let scaled = (u64::from(side) * u64::from(bound) + u64::from(long) / 2) / u64::from(long);
            scaled.max(1) as u32
        }
    };
    (shrink(width), shrink(height))
}

/// Carves the clear zone and alpha-composites the logo onto `surface`.
///
/// Returns the plan that was applied.
pub fn composite_logo<S: Surface + ?Sized>(
    surface: &mut S,
    logo: &LogoOverlay,
    background: Color,
) -> Result<OverlayPlan> {
    let plan = OverlayPlan::compute(surface.dimensions(), logo.image.dimensions(), &logo.options)?;
    debug!(?plan, "placing logo");

    draw_clear_zone(surface, plan.zone, &logo.options, background.to_rgba());

    let resized = if (plan.logo_width, plan.logo_height) == logo.image.dimensions() {
        Cow::Borrowed(&logo.image)
    } else {
        Cow::Owned(imageops::resize(&logo.image, plan.logo_width, plan.logo_height, FilterType::Lanczos3))
    };
    surface.overlay(&resized, plan.x, plan.y);
    Ok(plan)
}

/// Finished image bytes ready to display or download.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RenderedOutput {
    pub bytes: Vec<u8>,
    /// `image/png` or `image/svg+xml`.
    pub media_type: &'static str,
    /// Suggested download name.
    pub filename: &'static str,
}

/// Renders `request`, with `logo` centered on PNG output.
///
/// A logo passed along with [`OutputFormat::Svg`] is ignored and the result is
/// the same as rendering without it.
///
/// # Errors
///
/// - [`RenderError::Validation`] for empty text or out-of-range parameters.
/// - [`RenderError::CapacityExceeded`] when the text does not fit.
/// - [`RenderError::Export`] if PNG encoding fails.
///
/// # Example
///
/// ```rust
/// use qrlogo::{render, OutputFormat, RenderRequest};
///
/// let out = render(&RenderRequest::new("https://example.com"), None).unwrap();
/// assert_eq!(out.media_type, "image/png");
///
/// let svg = render(&RenderRequest::new("https://example.com").with_format(OutputFormat::Svg), None).unwrap();
/// assert_eq!(svg.filename, "qrcode_svg.svg");
/// ```
#[instrument(level = "debug", skip_all, fields(format = ?request.format, scale = request.scale, border = request.border))]
pub fn render(request: &RenderRequest, logo: Option<&LogoOverlay>) -> Result<RenderedOutput> {
    request.validate()?;
    let logo = match (request.format, logo) {
        (OutputFormat::Svg, Some(_)) => {
            warn!("logo overlay only applies to PNG output, ignoring it");
            None
        }
        (_, logo) => logo,
    };
    if let Some(logo) = logo {
        logo.options.validate()?;
    }

    let qr = encode_text(&request.text, request.version)?;
    let bytes = match request.format {
        OutputFormat::Svg => {
            to_svg_string(&qr, request.border, request.scale, request.foreground, request.background).into_bytes()
        }
        OutputFormat::Png => {
            let mut img = qr_to_image(&qr, request.border, request.scale, request.foreground, request.background);
            if let Some(logo) = logo {
                composite_logo(&mut img, logo, request.background)?;
            }
            encode_png(img)?
        }
    };

    Ok(RenderedOutput {
        bytes,
        media_type: request.format.media_type(),
        filename: request.format.filename(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ClearZoneShape;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn decode(out: &RenderedOutput) -> RgbaImage {
        image::load_from_memory_with_format(&out.bytes, ImageFormat::Png)
            .unwrap()
            .to_rgba8()
    }

    fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    // Version 1 with 25 grid units at 16 px per module gives a 400x400 image.
    fn square_400() -> RenderRequest {
        RenderRequest::new("HELLO").with_version(Some(1)).with_border(2).with_scale(16)
    }

    fn red_logo(width: u32, height: u32, options: LogoOptions) -> LogoOverlay {
        LogoOverlay::new(DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, RED)), options).unwrap()
    }

    #[test]
    fn test_png_without_logo() {
        let request = RenderRequest::new("https://example.com");
        let out = render(&request, None).unwrap();
        assert_eq!(out.media_type, "image/png");
        assert_eq!(out.filename, "qrcode_png.png");

        let modules = encode_text("https://example.com", None).unwrap().width() as u32;
        let img = decode(&out);
        assert_eq!(img.dimensions(), ((modules + 8) * 8, (modules + 8) * 8));
        assert!(img
            .pixels()
            .all(|p| *p == Color::BLACK.to_rgba() || *p == Color::WHITE.to_rgba()));
    }

    #[test]
    fn test_png_is_deterministic() {
        let request = RenderRequest::new("determinism").with_colors(Color::rgb(10, 20, 30), Color::WHITE);
        assert_eq!(render(&request, None).unwrap(), render(&request, None).unwrap());
    }

    #[test]
    fn test_every_text_renders_in_both_formats() {
        let long = "long ".repeat(100);
        for text in ["a", "1234567890", "HELLO WORLD", "https://example.com/?q=ü", long.as_str()] {
            for format in [OutputFormat::Png, OutputFormat::Svg] {
                let out = render(&RenderRequest::new(text).with_format(format), None).unwrap();
                assert!(!out.bytes.is_empty());
                assert_eq!(out.media_type, format.media_type());
            }
        }
    }

    #[test]
    fn test_svg_grid() {
        let request = RenderRequest::new("https://example.com")
            .with_format(OutputFormat::Svg)
            .with_scale(5)
            .with_border(3);
        let out = render(&request, None).unwrap();
        assert_eq!(out.media_type, "image/svg+xml");

        let modules = encode_text("https://example.com", None).unwrap().width() as u32;
        let svg = String::from_utf8(out.bytes).unwrap();
        let dimension = modules + 6;

        let doc = roxmltree::Document::parse_with_options(
            &svg,
            roxmltree::ParsingOptions { allow_dtd: true, ..Default::default() },
        )
        .unwrap();
        let root = doc.root_element();
        assert_eq!(root.tag_name().name(), "svg");
        assert_eq!(root.attribute("viewBox"), Some(format!("0 0 {0} {0}", dimension).as_str()));
        assert_eq!(root.attribute("width"), Some((dimension * 5).to_string().as_str()));
        assert_eq!(root.attribute("height"), Some((dimension * 5).to_string().as_str()));

        let tree = usvg::Tree::from_str(&svg, &usvg::Options::default()).unwrap();
        assert_eq!(tree.size().width(), (dimension * 5) as f32);
        assert_eq!(tree.size().height(), (dimension * 5) as f32);
    }

    #[test]
    fn test_svg_ignores_logo() {
        let request = RenderRequest::new("https://example.com").with_format(OutputFormat::Svg);
        let plain = render(&request, None).unwrap();

        let logo = red_logo(50, 50, LogoOptions::default());
        assert_eq!(render(&request, Some(&logo)).unwrap(), plain);

        // Options are not even checked when the logo is dropped.
        let bogus = red_logo(50, 50, LogoOptions { scale: 3.0, ..LogoOptions::default() });
        assert_eq!(render(&request, Some(&bogus)).unwrap(), plain);
    }

    #[test]
    fn test_logo_on_400_square() {
        let request = square_400();
        let logo = red_logo(100, 100, LogoOptions::default());

        let mut img = generate(&request);
        assert_eq!(img.dimensions(), (400, 400));
        let plan = composite_logo(&mut img, &logo, request.background).unwrap();

        assert_eq!((plan.logo_width, plan.logo_height), (100, 100));
        assert_eq!(plan.pad, 18);
        assert_eq!(plan.zone, ClearZone::new(132, 132, 268, 268));
        assert_eq!(*img.get_pixel(200, 200), RED);
        // Padding between the logo and the zone edge is background.
        assert_eq!(*img.get_pixel(140, 200), Color::WHITE.to_rgba());
        assert_eq!(*img.get_pixel(200, 262), Color::WHITE.to_rgba());

        let out = render(&request, Some(&logo)).unwrap();
        assert_eq!(out.media_type, "image/png");
        assert_eq!(decode(&out), img);
    }

    fn generate(request: &RenderRequest) -> RgbaImage {
        crate::helper::generate_image_buffer(request).unwrap()
    }

    #[test]
    fn test_logo_is_shrunk_with_aspect_ratio() {
        let request = square_400();
        let logo = red_logo(400, 200, LogoOptions::default());
        let mut img = generate(&request);
        let plan = composite_logo(&mut img, &logo, request.background).unwrap();

        assert_eq!((plan.logo_width, plan.logo_height), (100, 50));
        assert_eq!((plan.x, plan.y), (150, 175));
        assert!(img.get_pixel(200, 200)[0] > 200);
        assert!(img.get_pixel(200, 200)[1] < 50);
    }

    #[test]
    fn test_logo_transparency_shows_clear_zone() {
        let request = square_400();
        let mut pixels = RgbaImage::from_pixel(100, 100, RED);
        for x in 0..50 {
            for y in 0..100 {
                pixels.put_pixel(x, y, Rgba([0, 0, 0, 0]));
            }
        }
        let logo = LogoOverlay::new(DynamicImage::ImageRgba8(pixels), LogoOptions::default()).unwrap();
        let img = decode(&render(&request, Some(&logo)).unwrap());

        assert_eq!(*img.get_pixel(160, 200), Color::WHITE.to_rgba());
        assert_eq!(*img.get_pixel(240, 200), RED);
    }

    #[test]
    fn test_logo_from_png_bytes() {
        let bytes = png_bytes(&RgbaImage::from_pixel(64, 32, RED));
        let logo = LogoOverlay::from_bytes(&bytes, LogoOptions::default()).unwrap();
        assert_eq!(logo.image().dimensions(), (64, 32));
    }

    #[test]
    fn test_corrupt_logo() {
        assert!(matches!(
            LogoOverlay::from_bytes(b"definitely not a png", LogoOptions::default()),
            Err(RenderError::InvalidLogo(_))
        ));
        let mut truncated = png_bytes(&RgbaImage::from_pixel(64, 64, RED));
        truncated.truncate(40);
        assert!(matches!(
            LogoOverlay::from_bytes(&truncated, LogoOptions::default()),
            Err(RenderError::InvalidLogo(_))
        ));
        match LogoOverlay::open("/nonexistent/logo.png", LogoOptions::default()) {
            Err(RenderError::InvalidLogo(message)) => assert!(message.starts_with("/nonexistent/logo.png: ")),
            other => panic!("expected invalid logo, got {other:?}"),
        }
        assert!(matches!(
            LogoOverlay::new(DynamicImage::new_rgba8(0, 0), LogoOptions::default()),
            Err(RenderError::InvalidLogo(_))
        ));
    }

    #[test]
    fn test_render_errors() {
        assert!(matches!(
            render(&RenderRequest::new(""), None),
            Err(RenderError::Validation(_))
        ));
        assert!(matches!(
            render(&RenderRequest::new("x".repeat(100)).with_version(Some(1)), None),
            Err(RenderError::CapacityExceeded { version: Some(1), .. })
        ));

        let bad = red_logo(10, 10, LogoOptions { padding: -1.0, ..LogoOptions::default() });
        assert!(matches!(
            render(&RenderRequest::new("hello"), Some(&bad)),
            Err(RenderError::Validation(_))
        ));

        // 21 px wide at 1 px per module leaves no room for a 1% logo.
        let tiny = RenderRequest::new("HI").with_version(Some(1)).with_border(0).with_scale(1);
        let small = red_logo(10, 10, LogoOptions { scale: 0.01, ..LogoOptions::default() });
        assert!(matches!(render(&tiny, Some(&small)), Err(RenderError::Validation(_))));
    }

    #[test]
    fn test_fit_within() {
        assert_eq!(fit_within(100, 100, 100), (100, 100));
        assert_eq!(fit_within(50, 20, 100), (50, 20));
        assert_eq!(fit_within(400, 200, 100), (100, 50));
        assert_eq!(fit_within(200, 400, 100), (50, 100));
        assert_eq!(fit_within(3, 2, 1), (1, 1));
        assert_eq!(fit_within(1000, 1, 10), (10, 1));
    }

    #[test]
    fn test_plan_exact_sizes() {
        // (image side, logo scale, expected longest logo side)
        let bounds = [(400, 0.24, 96), (400, 0.12, 48), (400, 0.1, 40), (400, 0.35, 140), (370, 0.25, 92)];
        for (side, scale, expected) in bounds {
            let options = LogoOptions { scale, ..LogoOptions::default() };
            let plan = OverlayPlan::compute((side, side), (1000, 1000), &options).unwrap();
            assert_eq!((plan.logo_width, plan.logo_height), (expected, expected), "scale {scale} on {side}");
        }

        // (padding ratio, expected pad) around a 100 px logo
        let pads = [(0.35, 35), (0.19, 19), (0.18, 18), (0.05, 5), (0.4, 40)];
        for (padding, expected) in pads {
            let options = LogoOptions { padding, ..LogoOptions::default() };
            let plan = OverlayPlan::compute((400, 400), (100, 100), &options).unwrap();
            assert_eq!(plan.pad, expected, "padding {padding}");
            assert_eq!(plan.zone.width(), 100 + 2 * expected);
        }
    }

    #[test]
    fn test_plan_invariants() {
        let images = [(21, 21), (168, 168), (400, 400), (1000, 1000), (300, 120)];
        let logos = [(1, 1), (100, 100), (640, 200), (37, 512), (3000, 3000)];
        let scales = [0.05, 0.1, 0.12, 0.24, 0.25, 0.33, 0.4, 0.5, 0.75, 0.95];
        let paddings = [0.0, 0.05, 0.18, 0.19, 0.35, 0.4, 1.0];

        for &(w, h) in &images {
            for &logo in &logos {
                for &scale in &scales {
                    for &padding in &paddings {
                        let options = LogoOptions { scale, padding, ..LogoOptions::default() };
                        let bound = (f64::from(w.min(h)) * scale).floor() as u32;
                        let plan = match OverlayPlan::compute((w, h), logo, &options) {
                            Ok(plan) => plan,
                            Err(RenderError::Validation(_)) if bound == 0 => continue,
                            Err(err) => panic!("{err}"),
                        };

                        let long = plan.logo_width.max(plan.logo_height);
                        assert!(long <= bound);
                        assert_eq!(plan.pad, (f64::from(long) * padding).floor() as u32);
                        assert!(plan.logo_width >= 1 && plan.logo_height >= 1);
                        // Orientation never flips.
                        if logo.0 > logo.1 {
                            assert!(plan.logo_width >= plan.logo_height);
                        } else if logo.0 < logo.1 {
                            assert!(plan.logo_width <= plan.logo_height);
                        }

                        let bounds = ClearZone::new(0, 0, w, h);
                        assert!(bounds.contains(&plan.zone));
                        assert!(plan.zone.contains(&plan.logo_box()));
                        assert_eq!(plan.zone.x0, plan.x.saturating_sub(plan.pad));
                        assert_eq!(plan.zone.x1, (plan.x + plan.logo_width + plan.pad).min(w));
                        assert_eq!(plan.zone.y0, plan.y.saturating_sub(plan.pad));
                        assert_eq!(plan.zone.y1, (plan.y + plan.logo_height + plan.pad).min(h));
                    }
                }
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl Surface for Recorder {
        fn dimensions(&self) -> (u32, u32) {
            (400, 400)
        }

        fn fill_rect(&mut self, zone: ClearZone, _: Rgba<u8>) {
            self.calls.push(format!("rect {}x{}", zone.width(), zone.height()));
        }

        fn fill_ellipse(&mut self, zone: ClearZone, _: Rgba<u8>) {
            self.calls.push(format!("ellipse {}x{}", zone.width(), zone.height()));
        }

        fn overlay(&mut self, image: &RgbaImage, x: u32, y: u32) {
            self.calls.push(format!("logo {}x{} at {},{}", image.width(), image.height(), x, y));
        }
    }

    #[test]
    fn test_clear_zone_drawn_before_logo() {
        let mut surface = Recorder::default();
        let logo = red_logo(100, 100, LogoOptions::default());
        composite_logo(&mut surface, &logo, Color::WHITE).unwrap();
        assert_eq!(surface.calls, ["rect 136x136", "logo 100x100 at 150,150"]);

        let mut surface = Recorder::default();
        let circle = red_logo(100, 100, LogoOptions { shape: ClearZoneShape::Circle, ..LogoOptions::default() });
        composite_logo(&mut surface, &circle, Color::WHITE).unwrap();
        assert_eq!(surface.calls, ["ellipse 136x136", "logo 100x100 at 150,150"]);
    }

    #[test]
    fn test_parallel_renders_are_independent() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RenderRequest>();
        assert_send_sync::<LogoOverlay>();
        assert_send_sync::<RenderedOutput>();

        let request = RenderRequest::new("shared");
        let expected = render(&request, None).unwrap();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4).map(|_| scope.spawn(|| render(&request, None).unwrap())).collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}
