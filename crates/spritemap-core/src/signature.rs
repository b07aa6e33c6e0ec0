use std::fmt;

use serde::{Deserialize, Serialize};

use crate::canvas::Canvas;
use crate::compositing::resolve_at;
use crate::config::PackerConfig;

/// Deterministic 32-bit identity of one build's canvas content and output
/// parameters. Displays as 8 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(pub u32);

impl Signature {
    pub fn to_hex(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// 32-bit integer avalanche (Jenkins' six-round mix).
#[inline]
pub fn mix32(mut a: u32) -> u32 {
    a = a.wrapping_add(0x7ed5_5d16).wrapping_add(a << 12);
    a = (a ^ 0xc761_c23c) ^ (a >> 19);
    a = a.wrapping_add(0x1656_67b1).wrapping_add(a << 5);
    a = a.wrapping_add(0xd3a2_646c) ^ (a << 9);
    a = a.wrapping_add(0xfd70_46c5).wrapping_add(a << 3);
    a = (a ^ 0xb55a_4f09) ^ (a >> 16);
    a
}

/// Fold the resolved `width x top` canvas and the output parameters into a
/// signature. Every cell is mixed independently and XOR-ed in row-major
/// order, followed by the width, used height, quantization level and, when
/// flattening, the constant 1.
pub fn compute_signature(canvas: &Canvas, cfg: &PackerConfig) -> Signature {
    let mut acc: u32 = 0;
    for y in 0..canvas.top() {
        for x in 0..canvas.width() {
            acc ^= mix32(u32::from_le_bytes(resolve_at(canvas, x, y, cfg)));
        }
    }
    acc ^= mix32(canvas.width());
    acc ^= mix32(canvas.top());
    acc ^= mix32(cfg.quantization.level() as u32);
    if cfg.flatten.is_some() {
        acc ^= mix32(1);
    }
    Signature(acc)
}

/// Placeholder replaced by the signature in output paths.
pub const SIGNATURE_PLACEHOLDER: &str = "XXXXXXXX";

/// Replace the first run of eight `X` characters in `pattern` with the hex
/// signature. Patterns without a placeholder are returned unchanged.
pub fn resolve_output_path(pattern: &str, signature: Signature) -> String {
    match pattern.find(SIGNATURE_PLACEHOLDER) {
        Some(i) => {
            let mut out = String::with_capacity(pattern.len());
            out.push_str(&pattern[..i]);
            out.push_str(&signature.to_hex());
            out.push_str(&pattern[i + SIGNATURE_PLACEHOLDER.len()..]);
            out
        }
        None => pattern.to_string(),
    }
}
