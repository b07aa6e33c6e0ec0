use std::fs;
use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::Crc;
use flate2::write::ZlibEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use tracing::{info, instrument};

use crate::error::{Result, SpriteMapError};
use crate::pipeline::SpriteSheet;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
const COLOR_TYPE_RGB: u8 = 2;
const COLOR_TYPE_RGBA: u8 = 6;

/// Adam7 passes as `(x0, y0, dx, dy)`.
const ADAM7: [(u32, u32, u32, u32); 7] = [
    (0, 0, 8, 8),
    (4, 0, 8, 8),
    (0, 4, 4, 8),
    (2, 0, 4, 4),
    (0, 2, 2, 4),
    (1, 0, 2, 2),
    (0, 1, 1, 2),
];

/// Encode the resolved sheet as PNG bytes.
///
/// With a flatten color the sheet is written as RGB8, otherwise RGBA8.
/// Interlaced output uses Adam7.
pub fn encode_png(sheet: &SpriteSheet) -> Result<Vec<u8>> {
    let (w, h) = (sheet.width(), sheet.height());
    if w == 0 || h == 0 {
        return Err(SpriteMapError::Encode(format!("empty sheet {w}x{h}")));
    }
    let (raw, color_type, channels) = if sheet.config.flatten.is_some() {
        (sheet.to_rgb().into_raw(), COLOR_TYPE_RGB, 3)
    } else {
        (sheet.to_rgba().into_raw(), COLOR_TYPE_RGBA, 4)
    };
    if sheet.config.interlace {
        return encode_adam7(&raw, w, h, color_type, channels);
    }
    let mut buf = Vec::new();
    let color = if channels == 3 {
        ExtendedColorType::Rgb8
    } else {
        ExtendedColorType::Rgba8
    };
    PngEncoder::new(&mut buf)
        .write_image(&raw, w, h, color)
        .map_err(|e| SpriteMapError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Encode the sheet and write it to `path`.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn encode_sheet(sheet: &SpriteSheet, path: &Path) -> Result<()> {
    let bytes = encode_png(sheet)?;
    fs::write(path, &bytes)?;
    info!(
        bytes = bytes.len(),
        interlace = sheet.config.interlace,
        "sheet written"
    );
    Ok(())
}

fn encode_adam7(raw: &[u8], w: u32, h: u32, color_type: u8, channels: usize) -> Result<Vec<u8>> {
    let stride = w as usize * channels;
    let mut scanlines = Vec::with_capacity(raw.len() + h as usize * 2);
    for (x0, y0, dx, dy) in ADAM7 {
        if x0 >= w || y0 >= h {
            continue;
        }
        for y in (y0..h).step_by(dy as usize) {
            // filter type: none
            scanlines.push(0);
            let row = &raw[y as usize * stride..(y as usize + 1) * stride];
            for x in (x0..w).step_by(dx as usize) {
                let at = x as usize * channels;
                scanlines.extend_from_slice(&row[at..at + channels]);
            }
        }
    }

    let mut zlib = ZlibEncoder::new(Vec::new(), Compression::default());
    zlib.write_all(&scanlines)?;
    let idat = zlib.finish()?;

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&w.to_be_bytes());
    ihdr.extend_from_slice(&h.to_be_bytes());
    // bit depth, color type, compression, filter method, interlace (Adam7)
    ihdr.extend_from_slice(&[8, color_type, 0, 0, 1]);

    let mut out = Vec::with_capacity(idat.len() + 64);
    out.extend_from_slice(&PNG_SIGNATURE);
    write_chunk(&mut out, b"IHDR", &ihdr);
    write_chunk(&mut out, b"IDAT", &idat);
    write_chunk(&mut out, b"IEND", &[]);
    Ok(out)
}

/// Append a chunk: length, type, data and CRC of type + data.
fn write_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    let mut crc = Crc::new();
    crc.update(kind);
    crc.update(data);
    out.extend_from_slice(&crc.sum().to_be_bytes());
}
