//! Raster rendering of authoring pages
//!
//! Elements are rasterised with their filter applied, then either composited
//! into a preview surface or re-encoded as JPEG for export. Every surface is
//! size-checked with [`ensure_surface`] before it is allocated.

use crate::cancel::RenderTicket;
use crate::constants::MAX_SURFACE_EDGE_PX;
use crate::context::RenderContext;
use crate::document::{DocumentSnapshot, Element};
use crate::types::*;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, Rgba, RgbaImage};

/// Check a requested surface size and round it up to whole pixels.
///
/// Non-finite, non-positive and oversized dimensions are rejected before
/// anything is allocated.
pub fn ensure_surface(width: f32, height: f32) -> Result<(u32, u32)> {
    let valid = |v: f32| v.is_finite() && v > 0.0 && v <= MAX_SURFACE_EDGE_PX;
    if !valid(width) || !valid(height) {
        return Err(ComposeError::InvalidGeometry { width, height });
    }
    Ok((width.ceil() as u32, height.ceil() as u32))
}

/// The element's image at its intrinsic size with the filter applied
pub fn filtered_image(element: &Element) -> Result<RgbaImage> {
    let source = element.image.decoded();
    ensure_surface(source.width() as f32, source.height() as f32)?;

    let mut pixels = source.to_rgba8();
    element.filter().apply(&mut pixels);
    Ok(pixels)
}

/// The element resampled to its rendered size at `device_scale` pixels per
/// point, filter applied
pub fn rasterize_element(element: &Element, device_scale: f32) -> Result<RgbaImage> {
    let (width_pt, height_pt) = element.rendered_size();
    let (width, height) = ensure_surface(width_pt * device_scale, height_pt * device_scale)?;

    let mut pixels = imageops::resize(
        &element.image.decoded().to_rgba8(),
        width,
        height,
        FilterType::Triangle,
    );
    element.filter().apply(&mut pixels);
    Ok(pixels)
}

/// Flatten onto white and encode as baseline JPEG
pub fn encode_jpeg(pixels: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = flatten_on_white(pixels);
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    rgb.write_with_encoder(encoder)?;
    Ok(buffer)
}

fn flatten_on_white(pixels: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(pixels.width(), pixels.height(), |x, y| {
        let [r, g, b, a] = pixels.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Render one authoring page as it will look when exported.
///
/// The surface is `ctx.surface_size()`; elements are composited in z-order
/// over white. The ticket is checked before every element, so a superseded
/// render stops early with [`ComposeError::Cancelled`].
pub fn render_page_preview(
    snapshot: &DocumentSnapshot,
    page_index: usize,
    ctx: &RenderContext,
    ticket: &RenderTicket,
) -> Result<RgbaImage> {
    let page = snapshot
        .page(page_index)
        .ok_or(ComposeError::UnknownPage(page_index))?;
    let (width, height) = ctx.surface_size()?;
    let mut surface = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

    for element in &page.elements {
        ticket.check()?;
        let pixels = match rasterize_element(element, ctx.device_scale) {
            Ok(pixels) => pixels,
            // Degenerate elements are skipped, the rest of the page still renders
            Err(ComposeError::InvalidGeometry { width, height }) => {
                log::warn!("Skipping {} with surface {}x{}", element.id, width, height);
                continue;
            }
            Err(e) => return Err(e),
        };
        let x = (element.x * ctx.device_scale).round() as i64;
        let y = (element.y * ctx.device_scale).round() as i64;
        imageops::overlay(&mut surface, &pixels, x, y);
    }

    ticket.check()?;
    Ok(surface)
}
