use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Exclusive right edge (`x + w`).
    pub fn right(&self) -> u32 {
        self.x + self.w
    }
    /// Exclusive bottom edge (`y + h`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
    /// True if the two half-open rectangles share at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.is_empty()
            || other.is_empty()
            || self.x >= other.right()
            || other.x >= self.right()
            || self.y >= other.bottom()
            || other.y >= self.bottom())
    }
    /// Returns true if `r` lies fully inside `self` (half-open edges).
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
}

/// Statistics about sheet packing efficiency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SheetStats {
    /// Number of assets packed (including zero-area ones).
    pub num_assets: usize,
    /// Sheet width (`larg`).
    pub width: u32,
    /// Used sheet height (`top`).
    pub height: u32,
    /// `width * height`.
    pub total_area: u64,
    /// Sum of asset surfaces.
    pub used_area: u64,
    /// used_area / total_area (0.0 to 1.0).
    pub occupancy: f64,
    /// Number of assets whose live region is smaller than the source image.
    pub num_cropped: usize,
}

impl SheetStats {
    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Assets: {}, Sheet: {}x{}, Occupancy: {:.2}%, Total Area: {} px², Used Area: {} px², Cropped: {}",
            self.num_assets,
            self.width,
            self.height,
            self.occupancy * 100.0,
            self.total_area,
            self.used_area,
            self.num_cropped,
        )
    }

    /// Returns wasted space in pixels.
    pub fn wasted_area(&self) -> u64 {
        self.total_area.saturating_sub(self.used_area)
    }

    /// Returns wasted space as a percentage (0.0 to 100.0).
    pub fn waste_percentage(&self) -> f64 {
        if self.total_area > 0 {
            (self.wasted_area() as f64 / self.total_area as f64) * 100.0
        } else {
            0.0
        }
    }
}
