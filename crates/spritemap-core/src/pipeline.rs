use std::cmp::Ordering;
use std::path::Path;

use image::{DynamicImage, ImageReader, RgbImage, RgbaImage};
use tracing::{debug, info, instrument, warn};

use crate::asset::Asset;
use crate::canvas::Canvas;
use crate::compositing::{render_rgb, render_rgba};
use crate::config::{PackerConfig, SortOrder};
use crate::crop::crop_asset;
use crate::error::{Result, SpriteMapError};
use crate::model::SheetStats;
use crate::packer::{FirstFitPacker, Packer, sheet_bounds};
use crate::signature::{Signature, compute_signature, resolve_output_path};
use crate::template::{RenderContext, Template};

/// In-memory image to pack (key + decoded image).
pub struct InputImage {
    pub key: String,
    pub image: DynamicImage,
}

/// Extensions the decoder accepts.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
}

/// Decode one file into an `InputImage`. Failures are input errors: the
/// caller drops the file and continues.
pub fn load_input(path: &Path) -> Result<InputImage> {
    if !is_supported_image(path) {
        return Err(SpriteMapError::InvalidInput(format!(
            "unsupported extension: {}",
            path.display()
        )));
    }
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(InputImage {
        key: path.to_string_lossy().replace('\\', "/"),
        image,
    })
}

/// Result of a packing run: the packed assets (in packed order), the canvas
/// and the build signature.
#[derive(Debug, Clone)]
pub struct SpriteSheet {
    pub assets: Vec<Asset>,
    pub canvas: Canvas,
    pub signature: Signature,
    pub config: PackerConfig,
}

impl SpriteSheet {
    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    /// Used height (`top`).
    pub fn height(&self) -> u32 {
        self.canvas.top()
    }

    /// Output path with the `XXXXXXXX` placeholder replaced by the signature.
    pub fn output_path(&self, pattern: &str) -> String {
        resolve_output_path(pattern, self.signature)
    }

    /// Resolved RGBA sheet (alpha kept).
    pub fn to_rgba(&self) -> RgbaImage {
        render_rgba(&self.canvas, &self.config)
    }

    /// Resolved RGB sheet (used when a flatten color is set).
    pub fn to_rgb(&self) -> RgbImage {
        render_rgb(&self.canvas, &self.config)
    }

    /// Render `template` over the packed assets.
    pub fn render_template(&self, template: &Template, output_path: &str) -> String {
        let ctx = RenderContext {
            signature: self.signature,
            output_path,
        };
        template.render_to_string(&self.assets, &ctx)
    }

    /// Computes packing statistics for this sheet.
    pub fn stats(&self) -> SheetStats {
        let total_area = self.width() as u64 * self.height() as u64;
        let used_area: u64 = self.assets.iter().map(|a| a.surface()).sum();
        SheetStats {
            num_assets: self.assets.len(),
            width: self.width(),
            height: self.height(),
            total_area,
            used_area,
            occupancy: if total_area > 0 {
                used_area as f64 / total_area as f64
            } else {
                0.0
            },
            num_cropped: self.assets.iter().filter(|a| a.is_cropped()).count(),
        }
    }
}

/// Converts `inputs` to assets and packs them with [`pack_assets`].
#[instrument(skip_all)]
pub fn pack_sprites(inputs: Vec<InputImage>, cfg: &PackerConfig) -> Result<SpriteSheet> {
    let assets = inputs
        .into_iter()
        .map(|inp| Asset::new(inp.key, inp.image.to_rgba8()))
        .collect();
    pack_assets(assets, cfg)
}

/// Crop (optional), order, place and sign a set of assets.
///
/// Notes:
/// - Sorting is stable and ties break by source name, so layouts are reproducible.
/// - Zero-area assets (fully transparent after cropping) are kept and placed at
///   the origin without claiming any cell.
#[instrument(skip_all, fields(assets = assets.len()))]
pub fn pack_assets(mut assets: Vec<Asset>, cfg: &PackerConfig) -> Result<SpriteSheet> {
    cfg.validate()?;

    if cfg.crop {
        for asset in assets.iter_mut() {
            crop_asset(asset, cfg.crop_threshold);
        }
    }
    if assets.iter().all(|a| a.surface() == 0) {
        return Err(SpriteMapError::Empty);
    }

    sort_assets(&mut assets, &cfg.sort_order);

    let (larg, height_bound) = sheet_bounds(&assets);
    debug!(larg, height_bound, "canvas sized");
    let mut packer = FirstFitPacker::new(larg, height_bound);
    for asset in assets.iter_mut() {
        packer.pack(asset)?;
    }
    let canvas = packer.into_canvas();
    let signature = compute_signature(&canvas, cfg);
    info!(
        width = canvas.width(),
        height = canvas.top(),
        %signature,
        "sheet packed"
    );
    Ok(SpriteSheet {
        assets,
        canvas,
        signature,
        config: cfg.clone(),
    })
}

/// Stable sort per `order`; ties break by source name.
pub fn sort_assets(assets: &mut [Asset], order: &SortOrder) {
    let by_name = |a: &Asset, b: &Asset| a.source_name().cmp(b.source_name());
    let key_desc = |ka: u64, kb: u64, a: &Asset, b: &Asset| -> Ordering {
        kb.cmp(&ka).then_with(|| by_name(a, b))
    };
    match order {
        SortOrder::None => {}
        SortOrder::NameAsc => assets.sort_by(by_name),
        SortOrder::AreaDesc => assets.sort_by(|a, b| key_desc(a.surface(), b.surface(), a, b)),
        SortOrder::MaxSideDesc => assets.sort_by(|a, b| {
            let sa = a.width().max(a.height()) as u64;
            let sb = b.width().max(b.height()) as u64;
            key_desc(sa, sb, a, b)
        }),
        SortOrder::HeightDesc => {
            assets.sort_by(|a, b| key_desc(a.height() as u64, b.height() as u64, a, b))
        }
        SortOrder::WidthDesc => {
            assets.sort_by(|a, b| key_desc(a.width() as u64, b.width() as u64, a, b))
        }
    }
}

/// Decode every path. Input errors drop (and log) the offending file; any
/// other error, such as a decoder allocation limit, aborts.
pub fn load_inputs<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<InputImage>> {
    let mut list = Vec::with_capacity(paths.len());
    for p in paths {
        let p = p.as_ref();
        match load_input(p) {
            Ok(inp) => list.push(inp),
            Err(e) if e.is_input_error() => {
                warn!(path = %p.display(), error = %e, "skip image")
            }
            Err(e) => return Err(e),
        }
    }
    Ok(list)
}
