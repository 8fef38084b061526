//! Background banner drawn behind Retro page titles.
//!
//! The banner is an SVG asset sized for a 291px title. Longer titles stretch
//! the canvas and its rectangle, and widen the viewport the image occupies
//! on the page.

use super::title::{split_title, ORDINAL_FONT_FAMILY, ORDINAL_FONT_SIZE_PT};
use crate::errors::{AppResult, JournalError};
use crate::page::Element;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

const RETRO_BANNER_SVG: &str = include_str!("assets/retro-title-background.svg");

const BASELINE_TITLE_WIDTH_PX: f32 = 291.0;
const TITLE_PADDING_PX: f32 = 55.0;
const SUPERSCRIPT_FONT_SIZE_PT: f32 = 10.0;
const DEFAULT_FONT_FAMILY: &str = "Calibri";
const DEFAULT_FONT_SIZE_PT: f32 = 18.0;
const AVERAGE_GLYPH_EM: f32 = 0.55;

const BANNER_VIEWPORT: Viewport = Viewport {
    x: 23.0,
    y: 10.0,
    width: 223.0,
    height: 48.0,
};

static SVG_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<svg\b[^>]*>").expect("valid svg tag regex"));
static RECT_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<rect\b[^>]*>").expect("valid rect tag regex"));
static WIDTH_ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\swidth=")([0-9]+(?:\.[0-9]+)?)(")"#).expect("valid width attribute regex")
});
static RX_ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\srx="([0-9]+(?:\.[0-9]+)?)""#).expect("valid rx attribute regex")
});

/// Rendered width of a title run, in pixels.
pub trait TextMeasurer: Send + Sync {
    fn measure_px(&self, text: &str, font_family: &str, font_size_pt: f32) -> f32;
}

/// Approximates every glyph as a fixed fraction of an em.
#[derive(Debug, Clone, Copy)]
pub struct GlyphAverageMeasurer {
    dpi: f32,
}

impl GlyphAverageMeasurer {
    pub fn new(dpi: f32) -> Self {
        Self { dpi }
    }
}

impl TextMeasurer for GlyphAverageMeasurer {
    fn measure_px(&self, text: &str, _font_family: &str, font_size_pt: f32) -> f32 {
        let em_px = font_size_pt * self.dpi / 72.0;
        text.chars().count() as f32 * em_px * AVERAGE_GLYPH_EM
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub format: String,
    pub bytes: Vec<u8>,
}

/// Turns the banner SVG into the bytes embedded in the page.
pub trait ImageEncoder: Send + Sync {
    fn encode(&self, svg: &str) -> AppResult<EncodedImage>;
}

/// Embeds the SVG markup as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgPassthrough;

impl ImageEncoder for SvgPassthrough {
    fn encode(&self, svg: &str) -> AppResult<EncodedImage> {
        Ok(EncodedImage {
            format: "svg".to_string(),
            bytes: svg.as_bytes().to_vec(),
        })
    }
}

/// Placement of the banner on the page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BannerLayout {
    pub viewport: Viewport,
    pub svg: String,
}

#[derive(Clone)]
pub struct BannerPainter {
    measurer: Arc<dyn TextMeasurer>,
    encoder: Arc<dyn ImageEncoder>,
    dpi: f32,
}

impl fmt::Debug for BannerPainter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BannerPainter").field("dpi", &self.dpi).finish()
    }
}

impl BannerPainter {
    pub fn new(dpi: f32) -> Self {
        Self {
            measurer: Arc::new(GlyphAverageMeasurer::new(dpi)),
            encoder: Arc::new(SvgPassthrough),
            dpi,
        }
    }

    pub fn with_measurer(mut self, measurer: Arc<dyn TextMeasurer>) -> Self {
        self.measurer = measurer;
        self
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn ImageEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn layout(&self, title: &str) -> AppResult<BannerLayout> {
        let title_width = self.title_width_px(title).ceil();
        let threshold = title_width + TITLE_PADDING_PX;
        let mut viewport = BANNER_VIEWPORT;

        if threshold <= BASELINE_TITLE_WIDTH_PX {
            return Ok(BannerLayout {
                viewport,
                svg: RETRO_BANNER_SVG.to_string(),
            });
        }

        let overflow = threshold - BASELINE_TITLE_WIDTH_PX;
        let (svg, rx) = stretch_banner(RETRO_BANNER_SVG, overflow * 2.0)?;
        let corner_steps = if rx > 0.0 {
            (overflow / (rx / 2.0)).ceil()
        } else {
            0.0
        };
        viewport.width += f64::from((overflow * 72.0 / self.dpi).ceil() + corner_steps);

        tracing::debug!(
            title_width,
            overflow,
            viewport_width = viewport.width,
            "stretched retro banner"
        );
        Ok(BannerLayout { viewport, svg })
    }

    /// The `one:Image` element placed right after the title.
    pub fn image_element(&self, title: &str) -> AppResult<Element> {
        let layout = self.layout(title)?;
        let image = self.encoder.encode(&layout.svg)?;
        let data = base64::engine::general_purpose::STANDARD.encode(&image.bytes);

        Ok(Element::new("Image")
            .with_attr("format", image.format)
            .with_attr("backgroundImage", "true")
            .with_child(
                Element::new("Position")
                    .with_attr("x", format!("{:.1}", layout.viewport.x))
                    .with_attr("y", format!("{:.1}", layout.viewport.y)),
            )
            .with_child(
                Element::new("Size")
                    .with_attr("width", format!("{:.1}", layout.viewport.width))
                    .with_attr("height", format!("{:.1}", layout.viewport.height))
                    .with_attr("isSetByUser", "true"),
            )
            .with_child(Element::new("Data").with_text(data)))
    }

    fn title_width_px(&self, title: &str) -> f32 {
        let parts = split_title(title);
        match parts.superscript {
            Some(suffix) => {
                self.measurer
                    .measure_px(parts.base, ORDINAL_FONT_FAMILY, ORDINAL_FONT_SIZE_PT)
                    + self
                        .measurer
                        .measure_px(suffix, ORDINAL_FONT_FAMILY, SUPERSCRIPT_FONT_SIZE_PT)
            }
            None => self
                .measurer
                .measure_px(title, DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE_PT),
        }
    }
}

/// Widens the root canvas and the first rectangle by `delta` px. Returns the
/// stretched markup and the rectangle's corner radius.
fn stretch_banner(svg: &str, delta: f32) -> AppResult<(String, f32)> {
    let rect = RECT_TAG_RE
        .find(svg)
        .ok_or_else(|| JournalError::Malformed("banner asset has no <rect> element".to_string()))?;
    let rect_tag = rect.as_str();
    let rx = RX_ATTR_RE
        .captures(rect_tag)
        .and_then(|caps| caps[1].parse::<f32>().ok())
        .unwrap_or(0.0);
    let stretched_rect = widen(rect_tag, delta)?;

    let mut out = String::with_capacity(svg.len() + 16);
    out.push_str(&svg[..rect.start()]);
    out.push_str(&stretched_rect);
    out.push_str(&svg[rect.end()..]);

    let root = SVG_TAG_RE
        .find(&out)
        .ok_or_else(|| JournalError::Malformed("banner asset has no <svg> element".to_string()))?;
    let (start, end) = (root.start(), root.end());
    let stretched_root = widen(root.as_str(), delta)?;
    out.replace_range(start..end, &stretched_root);

    Ok((out, rx))
}

fn widen(tag: &str, delta: f32) -> AppResult<String> {
    let caps = WIDTH_ATTR_RE
        .captures(tag)
        .ok_or_else(|| JournalError::Malformed(format!("banner tag has no width: {}", tag)))?;
    let width: f32 = caps[2]
        .parse()
        .map_err(|_| JournalError::Malformed(format!("banner width is not a number: {}", &caps[2])))?;
    let value = caps.get(2).map(|m| (m.start(), m.end())).unwrap_or((0, 0));

    let mut out = String::with_capacity(tag.len() + 8);
    out.push_str(&tag[..value.0]);
    out.push_str(&(width + delta).to_string());
    out.push_str(&tag[value.1..]);
    Ok(out)
}
