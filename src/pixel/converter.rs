// src/pixel/converter.rs
//! Frame-wide pixel conversion with a reusable scratch buffer.
//!
//! Runs once per presented frame. The only allocation is the scratch buffer,
//! which grows to the largest frame seen and is then reused.

use crate::error::{BridgeError, BridgeResult};
use crate::pixel::{pack_565, unpack_565, FormatPair, PixelFormat};
use log::debug;

/// Converts whole frames between the formats of one [`FormatPair`].
#[derive(Debug)]
pub struct PixelConverter {
    pair: FormatPair,
    scratch: Vec<u8>,
}

impl PixelConverter {
    /// Builds a converter for the deployment's format pair.
    pub fn new(pair: FormatPair) -> BridgeResult<Self> {
        pair.ensure_supported()?;
        debug!(
            "PixelConverter: {:?} -> {:?} (lossless={})",
            pair.source,
            pair.target,
            pair.is_lossless()
        );
        Ok(Self {
            pair,
            scratch: Vec::new(),
        })
    }

    pub fn pair(&self) -> FormatPair {
        self.pair
    }

    /// Converts `raw` from `source` to `target`, returning a view into the scratch buffer.
    ///
    /// The output is only valid until the next call.
    pub fn convert(
        &mut self,
        raw: &[u8],
        source: PixelFormat,
        target: PixelFormat,
    ) -> BridgeResult<&[u8]> {
        let pair = FormatPair::new(source, target);
        pair.ensure_supported()?;

        let pixels = pixel_count(raw, source)?;
        let out_len = pixels * target.bytes_per_pixel();
        self.scratch.resize(out_len, 0);
        convert_into(raw, pair, &mut self.scratch)?;
        Ok(&self.scratch[..out_len])
    }

    /// Converts `raw` using the configured pair.
    pub fn convert_frame(&mut self, raw: &[u8]) -> BridgeResult<&[u8]> {
        let FormatPair { source, target } = self.pair;
        self.convert(raw, source, target)
    }
}

fn pixel_count(raw: &[u8], format: PixelFormat) -> BridgeResult<usize> {
    let bpp = format.bytes_per_pixel();
    if raw.len() % bpp != 0 {
        return Err(BridgeError::FrameSizeMismatch {
            expected: raw.len() / bpp * bpp,
            actual: raw.len(),
        });
    }
    Ok(raw.len() / bpp)
}

/// Stateless conversion of `raw` into a caller-provided `out` slice.
///
/// `out` must hold exactly as many pixels as `raw`, in the target encoding.
pub fn convert_into(raw: &[u8], pair: FormatPair, out: &mut [u8]) -> BridgeResult<()> {
    use PixelFormat::*;

    pair.ensure_supported()?;
    let pixels = pixel_count(raw, pair.source)?;
    let expected = pixels * pair.target.bytes_per_pixel();
    if out.len() != expected {
        return Err(BridgeError::FrameSizeMismatch {
            expected,
            actual: out.len(),
        });
    }

    match (pair.source, pair.target) {
        (s, t) if s == t => out.copy_from_slice(raw),
        (Rgba8888, Bgra8888) | (Bgra8888, Rgba8888) => {
            for (src, dst) in raw.chunks_exact(4).zip(out.chunks_exact_mut(4)) {
                dst[0] = src[2];
                dst[1] = src[1];
                dst[2] = src[0];
                dst[3] = src[3];
            }
        }
        (Rgba8888, Rgbx8888) => {
            for (src, dst) in raw.chunks_exact(4).zip(out.chunks_exact_mut(4)) {
                dst[..3].copy_from_slice(&src[..3]);
                dst[3] = 0xFF;
            }
        }
        (Rgba8888, Rgb565) => {
            for (src, dst) in raw.chunks_exact(4).zip(out.chunks_exact_mut(2)) {
                dst.copy_from_slice(&pack_565(src[0], src[1], src[2]).to_le_bytes());
            }
        }
        (Bgra8888, Rgb565) => {
            for (src, dst) in raw.chunks_exact(4).zip(out.chunks_exact_mut(2)) {
                dst.copy_from_slice(&pack_565(src[2], src[1], src[0]).to_le_bytes());
            }
        }
        (Rgb565, Rgba8888) => {
            for (src, dst) in raw.chunks_exact(2).zip(out.chunks_exact_mut(4)) {
                let [r, g, b] = unpack_565(u16::from_le_bytes([src[0], src[1]]));
                dst.copy_from_slice(&[r, g, b, 0xFF]);
            }
        }
        (from, to) => return Err(BridgeError::UnsupportedFormat { from, to }),
    }
    Ok(())
}
