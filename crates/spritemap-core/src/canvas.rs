use crate::asset::Asset;
use crate::error::{Result, SpriteMapError};
use crate::model::Rect;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Cell {
    used: bool,
    rgba: [u8; 4],
}

/// The shared packing surface.
///
/// Width is fixed for the run. Height is bounded by `height_bound`; rows are
/// materialized lazily as placements reach them, so rows past the allocated
/// range are unoccupied by definition. `top` is the used height.
///
/// Occupancy is write-once: `commit` refuses to touch an occupied cell.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u32,
    height_bound: u32,
    top: u32,
    rows: u32,
    cells: Vec<Cell>,
}

impl Canvas {
    pub fn new(width: u32, height_bound: u32) -> Self {
        Self {
            width,
            height_bound,
            top: 0,
            rows: 0,
            cells: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Upper bound the placer may search within.
    pub fn height_bound(&self) -> u32 {
        self.height_bound
    }

    /// Tallest committed placement (`max(y + h)`).
    pub fn top(&self) -> u32 {
        self.top
    }

    pub fn is_occupied(&self, x: u32, y: u32) -> bool {
        self.cell(x, y).is_some_and(|c| c.used)
    }

    /// Stored texel of an occupied cell.
    pub fn stored(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.cell(x, y).filter(|c| c.used).map(|c| c.rgba)
    }

    fn cell(&self, x: u32, y: u32) -> Option<&Cell> {
        if x >= self.width || y >= self.rows {
            return None;
        }
        self.cells.get(y as usize * self.width as usize + x as usize)
    }

    fn row_cells(&self, y: u32, x: u32, w: u32) -> &[Cell] {
        let base = y as usize * self.width as usize;
        &self.cells[base + x as usize..base + (x + w) as usize]
    }

    /// True if `rect` is inside the bounds and every cell in it is free.
    pub fn is_free(&self, rect: &Rect) -> bool {
        self.in_bounds(rect) && self.rightmost_blocker(rect).is_none()
    }

    pub fn in_bounds(&self, rect: &Rect) -> bool {
        rect.right() <= self.width && rect.bottom() <= self.height_bound
    }

    /// Rightmost occupied column inside `rect`, scanning every row it covers.
    pub(crate) fn rightmost_blocker(&self, rect: &Rect) -> Option<u32> {
        if rect.is_empty() {
            return None;
        }
        let last_row = rect.bottom().min(self.rows);
        let mut blocker: Option<u32> = None;
        for y in rect.y..last_row {
            if let Some(i) = self.row_cells(y, rect.x, rect.w).iter().rposition(|c| c.used) {
                let col = rect.x + i as u32;
                blocker = Some(blocker.map_or(col, |b| b.max(col)));
                if col + 1 == rect.right() {
                    break;
                }
            }
        }
        blocker
    }

    /// Mark `rect` occupied and copy `asset`'s live texels into it.
    /// A zero-area rect is a no-op.
    pub fn commit(&mut self, rect: Rect, asset: &Asset) -> Result<()> {
        if rect.is_empty() {
            return Ok(());
        }
        if rect.w != asset.width() || rect.h != asset.height() || !self.is_free(&rect) {
            return Err(SpriteMapError::OutOfSpace {
                key: asset.source_name().to_string(),
                width: asset.width(),
                height: asset.height(),
            });
        }
        self.ensure_rows(rect.bottom())?;
        let stride = self.width as usize;
        for yy in 0..rect.h {
            let base = (rect.y + yy) as usize * stride + rect.x as usize;
            let src = asset.row(yy);
            let dst = &mut self.cells[base..base + rect.w as usize];
            for (cell, px) in dst.iter_mut().zip(src.chunks_exact(4)) {
                cell.used = true;
                cell.rgba = [px[0], px[1], px[2], px[3]];
            }
        }
        self.top = self.top.max(rect.bottom());
        Ok(())
    }

    fn ensure_rows(&mut self, rows: u32) -> Result<()> {
        if rows <= self.rows {
            return Ok(());
        }
        let cells = rows as usize * self.width as usize;
        self.cells
            .try_reserve_exact(cells - self.cells.len())
            .map_err(|_| SpriteMapError::Allocation { cells })?;
        self.cells.resize(cells, Cell::default());
        self.rows = rows;
        Ok(())
    }
}
