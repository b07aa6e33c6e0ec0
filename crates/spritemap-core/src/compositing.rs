use image::{Rgb, RgbImage, Rgba, RgbaImage};

use crate::canvas::Canvas;
use crate::config::{PackerConfig, Quantization, Rgb as FlattenColor};

/// Straight alpha blend of one channel: `(fg*a + bg*(255-a)) / 255`.
#[inline]
pub fn blend_channel(fg: u8, bg: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    ((fg as u32 * a + bg as u32 * (255 - a)) / 255) as u8
}

/// Resolve a canvas cell to its output texel.
///
/// - unoccupied: `(0,0,0,0)`
/// - occupied with a flatten color: blended over it, alpha forced to 255
/// - occupied, fully transparent, no flatten color: `(0,0,0,0)`
/// - otherwise the stored texel
///
/// RGB channels of every non-transparent result are masked by `quant`.
pub fn resolve_texel(
    stored: Option<[u8; 4]>,
    quant: Quantization,
    flatten: Option<FlattenColor>,
) -> [u8; 4] {
    let Some([r, g, b, a]) = stored else {
        return [0, 0, 0, 0];
    };
    match flatten {
        Some(FlattenColor([br, bg, bb])) => [
            quant.apply(blend_channel(r, br, a)),
            quant.apply(blend_channel(g, bg, a)),
            quant.apply(blend_channel(b, bb, a)),
            255,
        ],
        None if a == 0 => [0, 0, 0, 0],
        None => [quant.apply(r), quant.apply(g), quant.apply(b), a],
    }
}

/// Resolved texel at canvas coordinates.
pub fn resolve_at(canvas: &Canvas, x: u32, y: u32, cfg: &PackerConfig) -> [u8; 4] {
    resolve_texel(canvas.stored(x, y), cfg.quantization, cfg.flatten)
}

/// Render the used area (`width x top`) of the canvas as RGBA.
pub fn render_rgba(canvas: &Canvas, cfg: &PackerConfig) -> RgbaImage {
    RgbaImage::from_fn(canvas.width(), canvas.top(), |x, y| {
        Rgba(resolve_at(canvas, x, y, cfg))
    })
}

/// Render the used area as RGB, dropping the (forced opaque) alpha channel.
///
/// Unoccupied cells show the flatten color (quantized) when one is set; the
/// resolved texel, and so the signature, still treats them as transparent.
pub fn render_rgb(canvas: &Canvas, cfg: &PackerConfig) -> RgbImage {
    let background = cfg
        .flatten
        .map(|FlattenColor(c)| c.map(|ch| cfg.quantization.apply(ch)))
        .unwrap_or([0, 0, 0]);
    RgbImage::from_fn(canvas.width(), canvas.top(), |x, y| {
        if !canvas.is_occupied(x, y) {
            return Rgb(background);
        }
        let [r, g, b, _] = resolve_at(canvas, x, y, cfg);
        Rgb([r, g, b])
    })
}
