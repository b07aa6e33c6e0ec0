use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SpriteMapError;

/// Per-channel bit depth of the written sheet.
///
/// Level `n` keeps the top `n + 2` bits of every color channel: level 1 keeps
/// 3 bits, level 6 keeps all 8. Alpha is never masked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub struct Quantization(u8);

impl Quantization {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;
    /// Full 8-bit output, no masking.
    pub const FULL: Quantization = Quantization(6);

    pub fn new(level: u8) -> Result<Self, SpriteMapError> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(SpriteMapError::InvalidQuantization(level))
        }
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// Effective bits per channel (3..=8).
    pub fn bits(self) -> u8 {
        self.0 + 2
    }

    /// Mask applied to each RGB channel.
    pub fn mask(self) -> u8 {
        0xffu8 << (Self::MAX - self.0)
    }

    #[inline]
    pub fn apply(self, channel: u8) -> u8 {
        channel & self.mask()
    }
}

impl Default for Quantization {
    fn default() -> Self {
        Self::FULL
    }
}

impl TryFrom<u8> for Quantization {
    type Error = SpriteMapError;
    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Self::new(v)
    }
}

impl From<Quantization> for u8 {
    fn from(q: Quantization) -> u8 {
        q.0
    }
}

impl FromStr for Quantization {
    type Err = SpriteMapError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level: u8 = s
            .trim()
            .parse()
            .map_err(|_| SpriteMapError::InvalidConfig(format!("bad quantization level '{s}'")))?;
        Self::new(level)
    }
}

/// Opaque RGB color used as the flatten background.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }
}

impl FromStr for Rgb {
    type Err = SpriteMapError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(SpriteMapError::InvalidColor(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| SpriteMapError::InvalidColor(s.to_string()))
        };
        Ok(Self([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl TryFrom<String> for Rgb {
    type Error = SpriteMapError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> String {
        c.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "{r:02x}{g:02x}{b:02x}")
    }
}

/// Placement order. Ties are always broken by source name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    AreaDesc,
    MaxSideDesc,
    HeightDesc,
    WidthDesc,
    NameAsc,
    None,
}

impl FromStr for SortOrder {
    type Err = SpriteMapError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "area_desc" => Ok(Self::AreaDesc),
            "max_side_desc" => Ok(Self::MaxSideDesc),
            "height_desc" => Ok(Self::HeightDesc),
            "width_desc" => Ok(Self::WidthDesc),
            "name_asc" => Ok(Self::NameAsc),
            "none" => Ok(Self::None),
            other => Err(SpriteMapError::InvalidConfig(format!(
                "unknown sort order: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackerConfig {
    /// Trim transparent border rows/columns before packing.
    #[serde(default)]
    pub crop: bool,
    /// Texels with alpha <= threshold count as transparent when cropping.
    #[serde(default)]
    pub crop_threshold: u8,
    /// Output bit depth per channel.
    #[serde(default)]
    pub quantization: Quantization,
    /// Composite onto this color and write an RGB sheet.
    #[serde(default)]
    pub flatten: Option<Rgb>,
    /// Write an Adam7 interlaced PNG.
    #[serde(default)]
    pub interlace: bool,
    #[serde(default = "default_sort_order")]
    pub sort_order: SortOrder,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            crop: false,
            crop_threshold: 0,
            quantization: Quantization::default(),
            flatten: None,
            interlace: false,
            sort_order: default_sort_order(),
        }
    }
}

impl PackerConfig {
    /// Validates the configuration parameters.
    ///
    /// `Quantization` and `Rgb` are valid by construction; what remains is
    /// the combination rules between fields.
    pub fn validate(&self) -> crate::error::Result<()> {
        if !self.crop && self.crop_threshold != 0 {
            return Err(SpriteMapError::InvalidConfig(format!(
                "crop_threshold ({}) requires crop to be enabled",
                self.crop_threshold
            )));
        }
        if self.crop_threshold == u8::MAX {
            return Err(SpriteMapError::InvalidConfig(
                "crop_threshold 255 would treat every texel as transparent".into(),
            ));
        }
        Ok(())
    }
}

fn default_sort_order() -> SortOrder {
    SortOrder::AreaDesc
}

/// Builder for `PackerConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct PackerConfigBuilder {
    cfg: PackerConfig,
}

impl PackerConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: PackerConfig::default(),
        }
    }
    pub fn crop(mut self, v: bool) -> Self {
        self.cfg.crop = v;
        self
    }
    pub fn crop_threshold(mut self, v: u8) -> Self {
        self.cfg.crop_threshold = v;
        self
    }
    pub fn quantization(mut self, v: Quantization) -> Self {
        self.cfg.quantization = v;
        self
    }
    pub fn flatten(mut self, v: Option<Rgb>) -> Self {
        self.cfg.flatten = v;
        self
    }
    pub fn interlace(mut self, v: bool) -> Self {
        self.cfg.interlace = v;
        self
    }
    pub fn sort_order(mut self, v: SortOrder) -> Self {
        self.cfg.sort_order = v;
        self
    }
    pub fn build(self) -> PackerConfig {
        self.cfg
    }
}

impl PackerConfig {
    /// Create a fluent builder for `PackerConfig`.
    pub fn builder() -> PackerConfigBuilder {
        PackerConfigBuilder::new()
    }
}
