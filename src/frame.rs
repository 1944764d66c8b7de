// src/frame.rs
//! FrameBuffer - double-buffered pixel storage shared by the simulation and the presenter.
//!
//! The producer fills a private back buffer, then swaps it with the front
//! buffer under a short lock. Readers hold the front lock for as long as they
//! look at the pixels, so a reader sees either the previous complete frame or
//! the new one and never a mix.
//!
//! Ownership model:
//! - `back`: only ever touched by the single producer (the simulation thread)
//! - `front`: the latest completed frame, read by the presenter
//! - The swap instant is the only point where producer and reader contend

mod tests;

use crate::error::{BridgeError, BridgeResult};
use crate::pixel::PixelFormat;
use log::{debug, trace};
use parking_lot::{Mutex, MutexGuard};
use std::ops::Deref;

/// Validated frame size in pixels. Both sides are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameDimensions {
    width: u32,
    height: u32,
}

impl FrameDimensions {
    /// Fails with `InvalidDimensions` unless both sides are positive.
    pub fn new(width: i32, height: i32) -> BridgeResult<Self> {
        if width <= 0 || height <= 0 {
            return Err(BridgeError::InvalidDimensions {
                width: width as i64,
                height: height as i64,
            });
        }
        Ok(Self {
            width: width as u32,
            height: height as u32,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Byte length of a tightly packed frame, or `InvalidDimensions` on overflow.
    pub fn byte_len(&self, format: PixelFormat) -> BridgeResult<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|px| px.checked_mul(format.bytes_per_pixel()))
            .ok_or(BridgeError::InvalidDimensions {
                width: self.width as i64,
                height: self.height as i64,
            })
    }
}

struct Frame {
    pixels: Box<[u8]>,
    sequence: u64,
}

/// Fixed-size frame storage with one producer and one consumer.
pub struct FrameBuffer {
    dims: FrameDimensions,
    format: PixelFormat,
    len: usize,
    front: Mutex<Frame>,
    back: Mutex<Box<[u8]>>,
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("dims", &self.dims)
            .field("format", &self.format)
            .field("len", &self.len)
            .finish()
    }
}

impl FrameBuffer {
    /// Allocates a zeroed buffer of `width * height * bytes_per_pixel` bytes.
    pub fn new(width: i32, height: i32, format: PixelFormat) -> BridgeResult<Self> {
        let dims = FrameDimensions::new(width, height)?;
        Self::with_dimensions(dims, format)
    }

    pub fn with_dimensions(dims: FrameDimensions, format: PixelFormat) -> BridgeResult<Self> {
        let len = dims.byte_len(format)?;
        debug!(
            "FrameBuffer: {}x{} {:?} ({} bytes per frame)",
            dims.width, dims.height, format, len
        );
        Ok(Self {
            dims,
            format,
            len,
            front: Mutex::new(Frame {
                pixels: vec![0u8; len].into_boxed_slice(),
                sequence: 0,
            }),
            back: Mutex::new(vec![0u8; len].into_boxed_slice()),
        })
    }

    pub fn dimensions(&self) -> FrameDimensions {
        self.dims
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Size of one frame in bytes. Immutable for the buffer's lifetime.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sequence number of the latest completed frame (0 before the first write).
    pub fn sequence(&self) -> u64 {
        self.front.lock().sequence
    }

    /// Replaces the buffer contents with `frame_data` and publishes it.
    ///
    /// Returns the new frame's sequence number.
    pub fn write(&self, frame_data: &[u8]) -> BridgeResult<u64> {
        if frame_data.len() != self.len {
            return Err(BridgeError::FrameSizeMismatch {
                expected: self.len,
                actual: frame_data.len(),
            });
        }
        self.write_with(|back| {
            back.copy_from_slice(frame_data);
            Ok(())
        })
    }

    /// Lets `render` fill the back buffer in place, then publishes it.
    ///
    /// The slice handed to `render` holds stale pixels; `render` must write
    /// every byte. If `render` fails nothing is published.
    pub fn write_with<F>(&self, render: F) -> BridgeResult<u64>
    where
        F: FnOnce(&mut [u8]) -> BridgeResult<()>,
    {
        let mut back = self.back.lock();
        render(&mut back[..])?;

        let mut front = self.front.lock();
        std::mem::swap(&mut front.pixels, &mut *back);
        front.sequence += 1;
        trace!("FrameBuffer: published frame {}", front.sequence);
        Ok(front.sequence)
    }

    /// A consistent view of the most recently completed frame.
    ///
    /// The producer cannot publish while the snapshot is alive, so keep it short.
    pub fn read_snapshot(&self) -> FrameSnapshot<'_> {
        FrameSnapshot {
            guard: self.front.lock(),
            dims: self.dims,
            format: self.format,
        }
    }

    /// Copies the latest completed frame into `out`, returning its sequence number.
    pub fn copy_snapshot(&self, out: &mut Vec<u8>) -> u64 {
        let snapshot = self.read_snapshot();
        out.clear();
        out.extend_from_slice(&snapshot);
        snapshot.sequence()
    }
}

/// Read guard over the front buffer.
pub struct FrameSnapshot<'a> {
    guard: MutexGuard<'a, Frame>,
    dims: FrameDimensions,
    format: PixelFormat,
}

impl FrameSnapshot<'_> {
    pub fn sequence(&self) -> u64 {
        self.guard.sequence
    }

    pub fn dimensions(&self) -> FrameDimensions {
        self.dims
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pixels(&self) -> &[u8] {
        &self.guard.pixels
    }
}

impl Deref for FrameSnapshot<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.guard.pixels
    }
}
