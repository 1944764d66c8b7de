// src/display/drivers/headless.rs
//! Headless in-memory surface driver.
//!
//! Plays the host's part for the binary and for tests: surfaces are created,
//! resized and destroyed through inherent methods, and posted frames are
//! kept so callers can inspect what reached the "screen".

use crate::display::driver::SurfaceDriver;
use crate::display::messages::{DrawTarget, SurfaceHandle};
use crate::error::{BridgeError, BridgeResult};
use crate::pixel::PixelFormat;
use log::{debug, info, trace};
use parking_lot::Mutex;
use std::collections::HashMap;

/// A frame that was committed to a headless surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedFrame {
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub pixels: Vec<u8>,
}

struct HeadlessSurface {
    width: u32,
    height: u32,
    destroyed: bool,
    // None while lent out as a DrawTarget.
    buffer: Option<Box<[u8]>>,
    lent: bool,
    posts: u64,
    last_posted: Option<PostedFrame>,
}

impl HeadlessSurface {
    fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            destroyed: false,
            buffer: Some(Self::allocate(width, height, format)),
            lent: false,
            posts: 0,
            last_posted: None,
        }
    }

    fn allocate(width: u32, height: u32, format: PixelFormat) -> Box<[u8]> {
        vec![0u8; width as usize * height as usize * format.bytes_per_pixel()].into_boxed_slice()
    }
}

#[derive(Default)]
struct HeadlessState {
    next_id: u64,
    surfaces: HashMap<SurfaceHandle, HeadlessSurface>,
}

pub struct HeadlessSurfaceDriver {
    format: PixelFormat,
    state: Mutex<HeadlessState>,
}

impl std::fmt::Debug for HeadlessSurfaceDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessSurfaceDriver")
            .field("format", &self.format)
            .field("surfaces", &self.state.lock().surfaces.len())
            .finish()
    }
}

impl HeadlessSurfaceDriver {
    /// Creates a driver whose surfaces all use `format`.
    pub fn new(format: PixelFormat) -> Self {
        info!("HeadlessSurfaceDriver::new() format={:?}", format);
        Self {
            format,
            state: Mutex::new(HeadlessState::default()),
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn create_surface(&self, width: u32, height: u32) -> SurfaceHandle {
        let mut state = self.state.lock();
        state.next_id += 1;
        let handle = SurfaceHandle::from_raw(state.next_id);
        state
            .surfaces
            .insert(handle, HeadlessSurface::new(width, height, self.format));
        info!(
            "HeadlessSurfaceDriver: created {} ({}x{})",
            handle, width, height
        );
        handle
    }

    /// Resizes a live surface. A target that is currently lent keeps its old size.
    pub fn resize_surface(&self, handle: SurfaceHandle, width: u32, height: u32) -> BridgeResult<()> {
        let mut state = self.state.lock();
        let surface = state
            .surfaces
            .get_mut(&handle)
            .filter(|s| !s.destroyed)
            .ok_or(BridgeError::SurfaceUnavailable(Some(handle)))?;
        surface.width = width;
        surface.height = height;
        if !surface.lent {
            surface.buffer = Some(HeadlessSurface::allocate(width, height, self.format));
        }
        info!(
            "HeadlessSurfaceDriver: resized {} to {}x{}",
            handle, width, height
        );
        Ok(())
    }

    pub fn destroy_surface(&self, handle: SurfaceHandle) {
        let mut state = self.state.lock();
        if let Some(surface) = state.surfaces.get_mut(&handle) {
            surface.destroyed = true;
            surface.buffer = None;
            info!("HeadlessSurfaceDriver: destroyed {}", handle);
        }
    }

    pub fn is_live(&self, handle: SurfaceHandle) -> bool {
        self.state
            .lock()
            .surfaces
            .get(&handle)
            .is_some_and(|s| !s.destroyed)
    }

    /// Number of committed presentations on `handle`.
    pub fn post_count(&self, handle: SurfaceHandle) -> u64 {
        self.state
            .lock()
            .surfaces
            .get(&handle)
            .map_or(0, |s| s.posts)
    }

    pub fn last_posted(&self, handle: SurfaceHandle) -> Option<PostedFrame> {
        self.state
            .lock()
            .surfaces
            .get(&handle)
            .and_then(|s| s.last_posted.clone())
    }

    /// Draw targets acquired but not yet released, across all surfaces.
    pub fn outstanding_targets(&self) -> usize {
        self.state
            .lock()
            .surfaces
            .values()
            .filter(|s| s.lent)
            .count()
    }
}

impl SurfaceDriver for HeadlessSurfaceDriver {
    fn acquire_draw_target(&self, handle: SurfaceHandle) -> BridgeResult<DrawTarget> {
        let mut state = self.state.lock();
        let surface = match state.surfaces.get_mut(&handle) {
            Some(s) if !s.destroyed && !s.lent => s,
            _ => return Err(BridgeError::SurfaceUnavailable(Some(handle))),
        };

        let expected = surface.width as usize * surface.height as usize * self.format.bytes_per_pixel();
        let pixels = match surface.buffer.take() {
            Some(buf) if buf.len() == expected => buf,
            _ => HeadlessSurface::allocate(surface.width, surface.height, self.format),
        };
        // A degenerate surface is refused without being marked as lent.
        let target = DrawTarget::new(
            handle,
            surface.width,
            surface.height,
            surface.width as usize * self.format.bytes_per_pixel(),
            self.format,
            pixels,
        )?;
        surface.lent = true;
        trace!("HeadlessSurfaceDriver: lent {}", handle);
        Ok(target)
    }

    fn release_draw_target(&self, target: DrawTarget) {
        let mut state = self.state.lock();
        let Some(surface) = state.surfaces.get_mut(&target.handle()) else {
            debug!("HeadlessSurfaceDriver: release for unknown {}", target.handle());
            return;
        };
        surface.lent = false;

        if surface.destroyed {
            debug!(
                "HeadlessSurfaceDriver: {} destroyed while drawing, dropping target",
                target.handle()
            );
            return;
        }

        if target.is_committed() {
            surface.posts += 1;
            surface.last_posted = Some(PostedFrame {
                width: target.width(),
                height: target.height(),
                stride: target.stride(),
                pixels: target.pixels().to_vec(),
            });
            trace!(
                "HeadlessSurfaceDriver: posted frame {} on {}",
                surface.posts,
                target.handle()
            );
        }

        if target.width() == surface.width && target.height() == surface.height {
            surface.buffer = Some(target.into_pixels());
        }
    }
}
