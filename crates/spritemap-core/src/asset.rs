use image::RgbaImage;

use crate::model::Rect;

/// One decoded source image plus its naming metadata and eventual placement.
///
/// The pixel buffer is owned and never copied after decode. Cropping only
/// narrows `view`, the live sub-rectangle of the buffer; every accessor
/// (`width`, `row`, `texel`) is relative to that view.
#[derive(Debug, Clone)]
pub struct Asset {
    source_name: String,
    normalized_name: String,
    image: RgbaImage,
    view: Rect,
    surface: u64,
    placement: Option<(u32, u32)>,
}

impl Asset {
    pub fn new(source_name: impl Into<String>, image: RgbaImage) -> Self {
        let source_name = source_name.into();
        let (w, h) = image.dimensions();
        let view = Rect::new(0, 0, w, h);
        Self {
            normalized_name: normalize_name(&source_name),
            source_name,
            image,
            surface: view.area(),
            view,
            placement: None,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn normalized_name(&self) -> &str {
        &self.normalized_name
    }

    pub fn width(&self) -> u32 {
        self.view.w
    }

    pub fn height(&self) -> u32 {
        self.view.h
    }

    /// `width * height`, cached.
    pub fn surface(&self) -> u64 {
        self.surface
    }

    /// Live region inside the source image.
    pub fn view(&self) -> Rect {
        self.view
    }

    /// Dimensions of the decoded source image.
    pub fn source_size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn is_cropped(&self) -> bool {
        (self.view.w, self.view.h) != self.image.dimensions()
    }

    /// Committed origin on the canvas, if placed.
    pub fn placement(&self) -> Option<(u32, u32)> {
        self.placement
    }

    /// Placed rectangle on the canvas.
    pub fn frame(&self) -> Option<Rect> {
        self.placement
            .map(|(x, y)| Rect::new(x, y, self.view.w, self.view.h))
    }

    /// Interleaved RGBA bytes of live row `y` (`4 * width` bytes).
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.image.width() as usize * 4;
        let start = (self.view.y + y) as usize * stride + self.view.x as usize * 4;
        &self.image.as_raw()[start..start + self.view.w as usize * 4]
    }

    /// Texel at live coordinates `(x, y)`.
    pub fn texel(&self, x: u32, y: u32) -> [u8; 4] {
        let p = self.image.get_pixel(self.view.x + x, self.view.y + y);
        p.0
    }

    /// Alpha at live coordinates `(x, y)`.
    pub fn alpha(&self, x: u32, y: u32) -> u8 {
        self.image.get_pixel(self.view.x + x, self.view.y + y)[3]
    }

    /// Narrow the live region. `rect` is relative to the current view.
    pub(crate) fn narrow_view(&mut self, rect: Rect) {
        debug_assert!(Rect::new(0, 0, self.view.w, self.view.h).contains(&rect));
        self.view = Rect::new(self.view.x + rect.x, self.view.y + rect.y, rect.w, rect.h);
        self.surface = self.view.area();
    }

    /// Record the canvas origin. Placement is write-once.
    pub(crate) fn set_placement(&mut self, x: u32, y: u32) {
        debug_assert!(self.placement.is_none(), "asset placed twice");
        if self.placement.is_none() {
            self.placement = Some((x, y));
        }
    }
}

/// Identifier-safe form of a source path: file stem, lower-cased, with every
/// character outside `[a-z0-9_]` replaced by `_`.
pub fn normalize_name(source_name: &str) -> String {
    let file = source_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source_name);
    let stem = match file.rfind('.') {
        Some(0) | None => file,
        Some(dot) => &file[..dot],
    };
    stem.chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
