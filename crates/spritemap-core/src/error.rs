use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpriteMapError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid quantization level {0} (expected 1..=6)")]
    InvalidQuantization(u8),
    #[error("Invalid color '{0}' (expected rrggbb)")]
    InvalidColor(String),
    #[error("Nothing to pack")]
    Empty,
    #[error("No free {width}x{height} region for '{key}' on the sized canvas")]
    OutOfSpace { key: String, width: u32, height: u32 },
    #[error("Could not allocate canvas memory for {cells} cells")]
    Allocation { cells: usize },
    #[error("Template error: {0}")]
    Template(String),
    #[error("Encoding error: {0}")]
    Encode(String),
}

impl SpriteMapError {
    /// True when the error only disqualifies a single input file; the run
    /// continues with the remaining assets. Decoder allocation limits are
    /// resource exhaustion and abort the run.
    pub fn is_input_error(&self) -> bool {
        match self {
            SpriteMapError::Image(image::ImageError::Limits(_)) => false,
            SpriteMapError::Io(_) | SpriteMapError::Image(_) | SpriteMapError::InvalidInput(_) => {
                true
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SpriteMapError>;
