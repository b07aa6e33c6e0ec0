use super::Packer;
use crate::asset::Asset;
use crate::canvas::Canvas;
use crate::error::{Result, SpriteMapError};
use crate::model::Rect;
use tracing::debug;

/// Greedy first-fit placer.
///
/// Candidate origins are scanned row-major (`y` outer, `x` inner) and the
/// first origin whose rectangle is entirely free wins. When a candidate is
/// blocked, every origin up to the rightmost blocking column on that row
/// would hit the same cell, so the scan resumes just past it. This picks
/// exactly the origin a cell-by-cell scan would.
pub struct FirstFitPacker {
    canvas: Canvas,
}

impl FirstFitPacker {
    pub fn new(width: u32, height_bound: u32) -> Self {
        Self {
            canvas: Canvas::new(width, height_bound),
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn into_canvas(self) -> Canvas {
        self.canvas
    }
}

impl Packer for FirstFitPacker {
    fn find(&self, w: u32, h: u32) -> Option<Rect> {
        if w == 0 || h == 0 {
            return Some(Rect::new(0, 0, w, h));
        }
        let canvas = &self.canvas;
        if w > canvas.width() || h > canvas.height_bound() {
            return None;
        }
        let max_x = canvas.width() - w;
        let max_y = canvas.height_bound() - h;
        for y in 0..=max_y {
            let mut x = 0;
            while x <= max_x {
                let rect = Rect::new(x, y, w, h);
                match canvas.rightmost_blocker(&rect) {
                    None => return Some(rect),
                    Some(col) => x = col + 1,
                }
            }
        }
        None
    }

    fn pack(&mut self, asset: &mut Asset) -> Result<Rect> {
        let (w, h) = (asset.width(), asset.height());
        let rect = self.find(w, h).ok_or_else(|| SpriteMapError::OutOfSpace {
            key: asset.source_name().to_string(),
            width: w,
            height: h,
        })?;
        self.canvas.commit(rect, asset)?;
        asset.set_placement(rect.x, rect.y);
        debug!(key = asset.source_name(), x = rect.x, y = rect.y, w, h, "placed");
        Ok(rect)
    }
}
