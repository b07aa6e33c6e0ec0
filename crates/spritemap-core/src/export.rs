use crate::pipeline::SpriteSheet;
use serde_json::{Value, json};

/// Hash-style JSON manifest keyed by source name.
/// Shape: `{ frames: { name: { frame, cropped, spriteSourceSize, sourceSize, index } }, meta }`.
/// Compatible with pipelines expecting TexturePacker-like JSON hash.
pub fn to_json_manifest(sheet: &SpriteSheet, image_path: &str) -> Value {
    let mut frames = serde_json::Map::new();
    for (index, asset) in sheet.assets.iter().enumerate() {
        let (x, y) = asset.placement().unwrap_or((0, 0));
        let view = asset.view();
        let (sw, sh) = asset.source_size();
        frames.insert(
            asset.source_name().to_string(),
            json!({
                "frame": {"x": x, "y": y, "w": asset.width(), "h": asset.height()},
                "cropped": asset.is_cropped(),
                "spriteSourceSize": {"x": view.x, "y": view.y, "w": view.w, "h": view.h},
                "sourceSize": {"w": sw, "h": sh},
                "normalizedName": asset.normalized_name(),
                "index": index,
            }),
        );
    }
    let meta = json!({
        "app": "spritemap",
        "version": env!("CARGO_PKG_VERSION"),
        "image": image_path,
        "size": {"w": sheet.width(), "h": sheet.height()},
        "signature": sheet.signature.to_hex(),
        "quantization": sheet.config.quantization.level(),
        "flatten": sheet.config.flatten.map(|c| c.to_string()),
        "interlace": sheet.config.interlace,
    });
    json!({ "frames": frames, "meta": meta })
}
