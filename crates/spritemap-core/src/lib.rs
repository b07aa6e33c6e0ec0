//! Core library for packing images into a single sprite sheet.
//!
//! - Placement: greedy first-fit over a shared occupancy canvas, largest assets first
//! - Cropping: transparent borders trimmed through a view, no pixel copies
//! - Output: flatten/quantization policy, content signature for cache-busting names
//! - Templates: header/body/footer marker substitution for CSS and manifests
//!
//! Quick example:
//! ```ignore
//! use std::path::Path;
//! use spritemap_core::{PackerConfig, encode_sheet, load_inputs, pack_sprites};
//! # fn main() -> anyhow::Result<()> {
//! let inputs = load_inputs(&["a.png", "b.png"])?;
//! let cfg = PackerConfig::builder().crop(true).build();
//! let sheet = pack_sprites(inputs, &cfg)?;
//! let out = sheet.output_path("sprites-XXXXXXXX.png");
//! encode_sheet(&sheet, Path::new(&out))?;
//! # Ok(()) }
//! ```

pub mod asset;
pub mod canvas;
pub mod compositing;
pub mod config;
pub mod crop;
pub mod encode;
pub mod error;
pub mod export;
pub mod model;
pub mod packer;
pub mod pipeline;
pub mod signature;
pub mod template;

pub use asset::*;
pub use canvas::*;
pub use config::*;
pub use crop::*;
pub use encode::*;
pub use error::*;
pub use export::*;
pub use model::*;
pub use packer::*;
pub use pipeline::*;
pub use signature::*;
pub use template::{RenderContext, Template, TemplateBinding, TemplateJob, Token, Variable};

/// Convenience prelude for common types and functions.
/// Importing `spritemap_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::asset::Asset;
    pub use crate::canvas::Canvas;
    pub use crate::config::{PackerConfig, PackerConfigBuilder, Quantization, Rgb, SortOrder};
    pub use crate::model::{Rect, SheetStats};
    pub use crate::packer::{FirstFitPacker, Packer};
    pub use crate::signature::Signature;
    pub use crate::template::{RenderContext, Template, TemplateBinding};
    pub use crate::{
        InputImage, SpriteSheet, encode_sheet, load_input, pack_assets, pack_sprites,
    };
}
