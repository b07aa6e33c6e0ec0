use crate::asset::Asset;
use crate::error::Result;
use crate::model::Rect;

pub mod first_fit;

pub use first_fit::FirstFitPacker;

/// A packer places assets onto a shared canvas.
///
/// Implementations must never overlap two committed rectangles and must keep
/// every rectangle inside the canvas bounds. `find` is side-effect free;
/// `pack` commits, records the placement on the asset and returns the frame.
pub trait Packer {
    fn find(&self, w: u32, h: u32) -> Option<Rect>;
    fn pack(&mut self, asset: &mut Asset) -> Result<Rect>;
}

/// Canvas dimensions for a set of assets: `(larg, height_bound)`.
///
/// `larg = max(ceil(sqrt(total_area)) + 1, max_width)` and the height bound is
/// the sum of heights, which always leaves room to stack every asset.
pub fn sheet_bounds<'a>(assets: impl IntoIterator<Item = &'a Asset>) -> (u32, u32) {
    let mut total_area: u64 = 0;
    let mut max_width: u32 = 0;
    let mut height_sum: u64 = 0;
    for a in assets {
        total_area += a.surface();
        max_width = max_width.max(a.width());
        height_sum += a.height() as u64;
    }
    let larg = (ceil_sqrt(total_area) + 1).max(max_width as u64);
    (
        larg.min(u32::MAX as u64) as u32,
        height_sum.min(u32::MAX as u64) as u32,
    )
}

fn ceil_sqrt(v: u64) -> u64 {
    if v == 0 {
        return 0;
    }
    let mut r = (v as f64).sqrt() as u64;
    while r * r > v {
        r -= 1;
    }
    while r * r < v {
        r += 1;
    }
    r
}

#[cfg(test)]
mod tests {
    use super::ceil_sqrt;

    #[test]
    fn ceil_sqrt_exact_and_between() {
        assert_eq!(ceil_sqrt(0), 0);
        assert_eq!(ceil_sqrt(1), 1);
        assert_eq!(ceil_sqrt(200), 15);
        assert_eq!(ceil_sqrt(225), 15);
        assert_eq!(ceil_sqrt(226), 16);
    }
}
