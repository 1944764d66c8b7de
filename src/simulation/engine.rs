// src/simulation/engine.rs
//! Engine collaborator: the opaque simulation that produces frames.
//!
//! An [`EngineLibrary`] stands for the loaded native code and is acquired
//! once per process as an [`EngineHandle`]. Each session asks the handle for
//! a fresh [`SimulationEngine`] instance. There is no process-global engine
//! state; whoever needs the engine is handed the handle.

use crate::error::{BridgeError, BridgeResult};
use crate::frame::FrameDimensions;
use crate::pixel::PixelFormat;
use log::info;
use std::fmt;
use std::sync::Arc;

/// One running simulation instance.
pub trait SimulationEngine: Send {
    /// Advances one step and renders exactly one frame into `frame`.
    ///
    /// `frame` is `dims` pixels in the library's native format and holds
    /// stale data; every byte must be written.
    fn step(&mut self, frame: &mut [u8], dims: FrameDimensions) -> BridgeResult<()>;
}

/// A located engine implementation.
pub trait EngineLibrary: Send + Sync {
    fn name(&self) -> &str;

    /// The encoding `step` writes.
    fn native_format(&self) -> PixelFormat;

    /// Creates a fresh engine instance, or `EngineUnavailable`.
    fn initialize(&self) -> BridgeResult<Box<dyn SimulationEngine>>;
}

/// Process-wide handle to an engine library. Cheap to clone.
#[derive(Clone)]
pub struct EngineHandle {
    library: Arc<dyn EngineLibrary>,
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("name", &self.library.name())
            .field("native_format", &self.library.native_format())
            .finish()
    }
}

impl EngineHandle {
    pub fn new(library: impl EngineLibrary + 'static) -> Self {
        Self {
            library: Arc::new(library),
        }
    }

    /// Resolves a built-in engine library by name.
    pub fn locate(name: &str) -> BridgeResult<Self> {
        let handle = match name {
            PatternLibrary::NAME => Self::new(PatternLibrary::default()),
            other => {
                return Err(BridgeError::EngineUnavailable(format!(
                    "no engine library named '{other}'"
                )))
            }
        };
        info!("EngineHandle: located '{}'", name);
        Ok(handle)
    }

    pub fn name(&self) -> &str {
        self.library.name()
    }

    pub fn native_format(&self) -> PixelFormat {
        self.library.native_format()
    }

    pub fn initialize(&self) -> BridgeResult<Box<dyn SimulationEngine>> {
        self.library.initialize()
    }
}

/// Built-in library that draws a moving test pattern.
#[derive(Debug, Clone, Copy)]
pub struct PatternLibrary {
    format: PixelFormat,
}

impl PatternLibrary {
    pub const NAME: &'static str = "pattern";

    pub fn with_format(format: PixelFormat) -> Self {
        Self { format }
    }
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::with_format(PixelFormat::Rgba8888)
    }
}

impl EngineLibrary for PatternLibrary {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn native_format(&self) -> PixelFormat {
        self.format
    }

    fn initialize(&self) -> BridgeResult<Box<dyn SimulationEngine>> {
        Ok(Box::new(PatternEngine::new(self.format)))
    }
}

/// Diagonal colour bands that scroll one pixel per tick.
#[derive(Debug)]
pub struct PatternEngine {
    format: PixelFormat,
    tick: u64,
}

impl PatternEngine {
    pub fn new(format: PixelFormat) -> Self {
        Self { format, tick: 0 }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// The colour of pixel (x, y) at `tick`.
    pub fn color_at(tick: u64, x: u32, y: u32) -> [u8; 4] {
        let t = tick as u32;
        let band = x.wrapping_add(y).wrapping_add(t);
        [
            band as u8,
            (y.wrapping_mul(2).wrapping_add(t)) as u8,
            (x ^ t) as u8,
            0xFF,
        ]
    }
}

impl SimulationEngine for PatternEngine {
    fn step(&mut self, frame: &mut [u8], dims: FrameDimensions) -> BridgeResult<()> {
        let bpp = self.format.bytes_per_pixel();
        let expected = dims.pixel_count() * bpp;
        if frame.len() != expected {
            return Err(BridgeError::FrameSizeMismatch {
                expected,
                actual: frame.len(),
            });
        }

        self.tick += 1;
        let width = dims.width() as usize;
        for (i, px) in frame.chunks_exact_mut(bpp).enumerate() {
            let (x, y) = ((i % width) as u32, (i / width) as u32);
            self.format
                .encode_rgba(Self::color_at(self.tick, x, y), px);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn locate_knows_the_pattern_engine() {
        let handle = EngineHandle::locate("pattern").unwrap();
        assert_eq!(handle.name(), "pattern");
        assert_eq!(handle.native_format(), PixelFormat::Rgba8888);
    }

    #[test]
    fn locate_reports_missing_engines() {
        assert!(matches!(
            EngineHandle::locate("srb2"),
            Err(BridgeError::EngineUnavailable(_))
        ));
    }

    #[test]
    fn pattern_engine_fills_every_pixel_per_step() {
        let dims = FrameDimensions::new(3, 2).unwrap();
        let mut engine = PatternEngine::new(PixelFormat::Rgba8888);
        let mut frame = vec![0xEEu8; dims.pixel_count() * 4];
        engine.step(&mut frame, dims).unwrap();
        assert_eq!(engine.tick(), 1);
        for (i, px) in frame.chunks_exact(4).enumerate() {
            let (x, y) = ((i % 3) as u32, (i / 3) as u32);
            assert_eq!(px, PatternEngine::color_at(1, x, y));
        }
    }

    #[test]
    fn pattern_engine_rejects_wrong_sized_frames() {
        let dims = FrameDimensions::new(2, 2).unwrap();
        let mut engine = PatternEngine::new(PixelFormat::Rgb565);
        let mut frame = vec![0u8; 16];
        assert!(engine.step(&mut frame, dims).is_err());
        assert_eq!(engine.tick(), 0);
    }
}
