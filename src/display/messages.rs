// src/display/messages.rs
//! Types exchanged between the host, the presenter and a SurfaceDriver.
//!
//! Draw targets move by value: the driver lends its pixel memory out on
//! acquire and gets it back on release, so no surface memory is shared.

use crate::error::{BridgeError, BridgeResult};
use crate::pixel::PixelFormat;
use std::fmt;

/// Opaque, host-issued identifier for a display surface.
///
/// Carrying a handle says nothing about whether the surface still exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceHandle(u64);

impl SurfaceHandle {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// Lifecycle notifications forwarded by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// A surface became available for drawing.
    Created(SurfaceHandle),

    /// The surface was resized or changed format.
    Changed {
        handle: SurfaceHandle,
        width: i32,
        height: i32,
    },

    /// The surface is going away. No drawing may happen after this is handled.
    Destroyed(SurfaceHandle),
}

/// Pixel memory lent out by a driver for the duration of one presentation.
#[derive(Debug)]
pub struct DrawTarget {
    handle: SurfaceHandle,
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
    pixels: Box<[u8]>,
    committed: bool,
}

impl DrawTarget {
    /// Wraps driver memory.
    ///
    /// Fails with `InvalidDrawTarget` unless both sides are positive, `stride`
    /// covers a row, and `pixels` holds at least `stride * height` bytes.
    pub fn new(
        handle: SurfaceHandle,
        width: u32,
        height: u32,
        stride: usize,
        format: PixelFormat,
        pixels: Box<[u8]>,
    ) -> BridgeResult<Self> {
        let row_bytes = (width as usize).checked_mul(format.bytes_per_pixel());
        let needed = stride.checked_mul(height as usize);
        let reason = match (row_bytes, needed) {
            _ if width == 0 || height == 0 => Some(format!("{width}x{height} surface")),
            (Some(row), _) if stride < row => {
                Some(format!("stride {stride} shorter than a {row}-byte row"))
            }
            (_, Some(needed)) if pixels.len() < needed => Some(format!(
                "{} bytes for {height} rows of stride {stride}",
                pixels.len()
            )),
            (None, _) | (_, None) => Some(format!("{width}x{height} stride {stride} overflows")),
            _ => None,
        };
        if let Some(reason) = reason {
            return Err(BridgeError::InvalidDrawTarget(format!("{handle}: {reason}")));
        }
        Ok(Self {
            handle,
            width,
            height,
            stride,
            format,
            pixels,
            committed: false,
        })
    }

    pub fn handle(&self) -> SurfaceHandle {
        self.handle
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row, including padding.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Fills every visible pixel with `rgba`.
    pub fn clear(&mut self, rgba: [u8; 4]) {
        let bpp = self.format.bytes_per_pixel();
        let row_bytes = self.width as usize * bpp;
        let mut encoded = [0u8; 4];
        self.format.encode_rgba(rgba, &mut encoded);
        for row in self.pixels.chunks_exact_mut(self.stride).take(self.height as usize) {
            for px in row[..row_bytes].chunks_exact_mut(bpp) {
                px.copy_from_slice(&encoded[..bpp]);
            }
        }
    }

    /// Marks the contents complete; the driver shows them on release.
    pub fn commit(&mut self) {
        self.committed = true;
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Gives the pixel memory back to the driver.
    pub fn into_pixels(self) -> Box<[u8]> {
        self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn clear_skips_row_padding() {
        let stride = 3 * 4 + 4;
        let mut target = DrawTarget::new(
            SurfaceHandle::from_raw(1),
            3,
            2,
            stride,
            PixelFormat::Bgra8888,
            vec![0xAAu8; stride * 2].into_boxed_slice(),
        )
        .unwrap();
        target.clear([1, 2, 3, 4]);
        for row in target.pixels().chunks_exact(stride) {
            for px in row[..12].chunks_exact(4) {
                assert_eq!(px, &[3, 2, 1, 4]);
            }
            assert_eq!(&row[12..], &[0xAA; 4]);
        }
        assert!(!target.is_committed());
    }

    #[test]
    fn handles_display_their_raw_id() {
        assert_eq!(SurfaceHandle::from_raw(42).to_string(), "surface#42");
    }

    #[test]
    fn malformed_geometry_is_rejected() {
        let h = SurfaceHandle::from_raw(3);
        let bgra = PixelFormat::Bgra8888;
        let cases = [
            // Zero-sized.
            (0, 2, 0, 0),
            (2, 0, 8, 0),
            // Stride narrower than a row.
            (4, 2, 12, 64),
            // Buffer shorter than stride * height.
            (4, 2, 16, 31),
        ];
        for (width, height, stride, len) in cases {
            let result = DrawTarget::new(h, width, height, stride, bgra, vec![0u8; len].into_boxed_slice());
            assert!(
                matches!(result, Err(BridgeError::InvalidDrawTarget(_))),
                "{width}x{height} stride {stride} len {len} accepted"
            );
        }

        let padded = DrawTarget::new(h, 4, 2, 20, bgra, vec![0u8; 40].into_boxed_slice());
        assert!(padded.is_ok());
    }
}
