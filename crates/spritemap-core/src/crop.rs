use crate::asset::Asset;
use crate::model::Rect;
use tracing::debug;

/// Compute the opaque sub-rectangle of `asset`'s live view, relative to that
/// view. Rows are trimmed top then bottom, columns left then right; a texel
/// counts as transparent when `alpha <= threshold`.
///
/// A fully transparent asset yields a zero-area rectangle.
pub fn compute_crop_rect(asset: &Asset, threshold: u8) -> Rect {
    let (w, h) = (asset.width(), asset.height());
    let row_clear = |y: u32| asset.row(y).chunks_exact(4).all(|px| px[3] <= threshold);

    let mut y1 = 0;
    while y1 < h && row_clear(y1) {
        y1 += 1;
    }
    let mut y2 = h;
    while y2 > y1 && row_clear(y2 - 1) {
        y2 -= 1;
    }

    let col_clear = |x: u32| (y1..y2).all(|y| asset.alpha(x, y) <= threshold);
    let mut x1 = 0;
    while x1 < w && col_clear(x1) {
        x1 += 1;
    }
    let mut x2 = w;
    while x2 > x1 && col_clear(x2 - 1) {
        x2 -= 1;
    }

    Rect::new(x1, y1, x2 - x1, y2 - y1)
}

/// Trim transparent borders from `asset` in place. No pixel data is copied;
/// only the live view shrinks. Returns true if anything was removed.
pub fn crop_asset(asset: &mut Asset, threshold: u8) -> bool {
    let rect = compute_crop_rect(asset, threshold);
    if rect.x == 0 && rect.y == 0 && rect.w == asset.width() && rect.h == asset.height() {
        return false;
    }
    debug!(
        key = asset.source_name(),
        from = ?(asset.width(), asset.height()),
        to = ?(rect.w, rect.h),
        "cropped"
    );
    asset.narrow_view(rect);
    true
}
