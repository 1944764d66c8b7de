// src/pixel.rs
//! Pixel encodings understood by the bridge and the conversion table between them.
//!
//! The engine writes frames in one encoding and the display surface wants
//! another. Which pairs can be bridged is fixed at build time by
//! [`CONVERSION_TABLE`]; nothing is negotiated at runtime.

pub mod converter;

pub use converter::PixelConverter;

use crate::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};

/// Memory layout of a single pixel, named in byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// R, G, B, A bytes.
    Rgba8888,
    /// B, G, R, A bytes (what most window systems scan out).
    Bgra8888,
    /// R, G, B bytes followed by an ignored byte that must read as opaque.
    Rgbx8888,
    /// 16-bit little-endian `rrrrrggg gggbbbbb`.
    Rgb565,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8888 | PixelFormat::Bgra8888 | PixelFormat::Rgbx8888 => 4,
            PixelFormat::Rgb565 => 2,
        }
    }

    /// Encodes an opaque-or-not RGBA colour in this format.
    ///
    /// Writes `bytes_per_pixel()` bytes into `out`.
    pub fn encode_rgba(self, [r, g, b, a]: [u8; 4], out: &mut [u8]) {
        match self {
            PixelFormat::Rgba8888 => out[..4].copy_from_slice(&[r, g, b, a]),
            PixelFormat::Bgra8888 => out[..4].copy_from_slice(&[b, g, r, a]),
            PixelFormat::Rgbx8888 => out[..4].copy_from_slice(&[r, g, b, 0xFF]),
            PixelFormat::Rgb565 => out[..2].copy_from_slice(&pack_565(r, g, b).to_le_bytes()),
        }
    }
}

/// A (source, target) conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormatPair {
    pub source: PixelFormat,
    pub target: PixelFormat,
}

/// Every non-identity conversion this build can perform.
///
/// Identity pairs are always supported and are not listed.
pub const CONVERSION_TABLE: &[FormatPair] = &[
    FormatPair::new(PixelFormat::Rgba8888, PixelFormat::Bgra8888),
    FormatPair::new(PixelFormat::Bgra8888, PixelFormat::Rgba8888),
    FormatPair::new(PixelFormat::Rgba8888, PixelFormat::Rgbx8888),
    FormatPair::new(PixelFormat::Rgba8888, PixelFormat::Rgb565),
    FormatPair::new(PixelFormat::Bgra8888, PixelFormat::Rgb565),
    FormatPair::new(PixelFormat::Rgb565, PixelFormat::Rgba8888),
];

impl FormatPair {
    pub const fn new(source: PixelFormat, target: PixelFormat) -> Self {
        Self { source, target }
    }

    pub fn is_identity(&self) -> bool {
        self.source == self.target
    }

    pub fn is_supported(&self) -> bool {
        self.is_identity() || CONVERSION_TABLE.contains(self)
    }

    /// Fails with `UnsupportedFormat` unless the pair is in the table.
    pub fn ensure_supported(&self) -> BridgeResult<()> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(BridgeError::UnsupportedFormat {
                from: self.source,
                to: self.target,
            })
        }
    }

    /// True when no information is lost going from source to target.
    pub fn is_lossless(&self) -> bool {
        use PixelFormat::*;
        match (self.source, self.target) {
            (a, b) if a == b => true,
            (Rgba8888, Bgra8888) | (Bgra8888, Rgba8888) => true,
            // 565 expands into 8888 by bit replication, which 8888 -> 565 undoes exactly.
            (Rgb565, Rgba8888) => true,
            _ => false,
        }
    }

    /// The reverse conversion, if the table has it.
    pub fn inverse(&self) -> Option<FormatPair> {
        let reverse = FormatPair::new(self.target, self.source);
        reverse.is_supported().then_some(reverse)
    }
}

pub(crate) fn pack_565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3)
}

pub(crate) fn unpack_565(v: u16) -> [u8; 3] {
    let r = ((v >> 11) & 0x1F) as u8;
    let g = ((v >> 5) & 0x3F) as u8;
    let b = (v & 0x1F) as u8;
    [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
}
