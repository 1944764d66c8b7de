// src/presenter.rs
//! Presenter - the only component that touches a display surface.
//!
//! One presentation: look up the current surface, acquire a draw target,
//! convert the latest completed frame, blit it (centred, letterboxed when the
//! sizes differ), commit and release. The draw target is released on every
//! exit path, and it is only committed once the blit has fully succeeded, so
//! a failed presentation leaves the visible surface as it was.

mod tests;

use crate::display::{DrawScope, DrawTarget, SurfaceDriver, SurfaceHandle, SurfaceSlot};
use crate::error::{BridgeError, BridgeResult};
use crate::frame::{FrameBuffer, FrameDimensions};
use crate::pixel::{FormatPair, PixelConverter};
use log::trace;
use parking_lot::Mutex;
use std::sync::Arc;

/// A presenter shared between the simulation thread and the host.
pub type SharedPresenter = Arc<Mutex<Presenter>>;

/// What a successful presentation showed, and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentReport {
    pub handle: SurfaceHandle,
    pub sequence: u64,
    pub surface_width: u32,
    pub surface_height: u32,
    /// Slot generation at the time of drawing; changes with every attach, resize and detach.
    pub generation: u64,
}

pub struct Presenter {
    driver: Arc<dyn SurfaceDriver>,
    slot: Arc<SurfaceSlot>,
    converter: PixelConverter,
    clear_color: [u8; 4],
}

impl std::fmt::Debug for Presenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Presenter")
            .field("pair", &self.converter.pair())
            .field("clear_color", &self.clear_color)
            .finish()
    }
}

impl Presenter {
    /// Fails with `UnsupportedFormat` if `pair` is not in the conversion table.
    pub fn new(
        driver: Arc<dyn SurfaceDriver>,
        slot: Arc<SurfaceSlot>,
        pair: FormatPair,
        clear_color: [u8; 4],
    ) -> BridgeResult<Self> {
        Ok(Self {
            driver,
            slot,
            converter: PixelConverter::new(pair)?,
            clear_color,
        })
    }

    pub fn into_shared(self) -> SharedPresenter {
        Arc::new(Mutex::new(self))
    }

    pub fn format_pair(&self) -> FormatPair {
        self.converter.pair()
    }

    /// Shows the latest completed frame of `frame_buffer` on the current surface.
    ///
    /// `SurfaceUnavailable` is the expected result while no surface exists;
    /// callers should drop the frame and carry on. The frame buffer is never
    /// modified.
    pub fn present_frame(&mut self, frame_buffer: &FrameBuffer) -> BridgeResult<PresentReport> {
        // Held until the target is released so the controller cannot detach mid-draw.
        let surface = self.slot.lock();
        let handle = surface
            .handle()
            .ok_or(BridgeError::SurfaceUnavailable(None))?;

        let pair = self.converter.pair();
        if frame_buffer.format() != pair.source {
            return Err(BridgeError::UnsupportedFormat {
                from: frame_buffer.format(),
                to: pair.target,
            });
        }

        let mut scope = DrawScope::acquire(self.driver.as_ref(), handle)?;
        let target = scope.target_mut();
        if target.format() != pair.target {
            return Err(BridgeError::UnsupportedFormat {
                from: pair.source,
                to: target.format(),
            });
        }

        let (converted, sequence) = {
            let snapshot = frame_buffer.read_snapshot();
            (self.converter.convert_frame(&snapshot)?, snapshot.sequence())
        };

        let frame_dims = frame_buffer.dimensions();
        if !covers(frame_dims, target) {
            target.clear(self.clear_color);
        }
        blit_centered(converted, frame_dims, target);

        let report = PresentReport {
            handle,
            sequence,
            surface_width: target.width(),
            surface_height: target.height(),
            generation: surface.generation(),
        };
        scope.post();
        drop(surface);

        trace!("Presenter: frame {} -> {}", sequence, handle);
        Ok(report)
    }
}

fn covers(frame: FrameDimensions, target: &DrawTarget) -> bool {
    frame.width() >= target.width() && frame.height() >= target.height()
}

/// Copies `src` (tightly packed, target format) into the middle of `target`,
/// clipping whatever does not fit.
fn blit_centered(src: &[u8], dims: FrameDimensions, target: &mut DrawTarget) {
    let bpp = target.format().bytes_per_pixel();
    let (fw, fh) = (dims.width() as usize, dims.height() as usize);
    let (tw, th) = (target.width() as usize, target.height() as usize);
    let stride = target.stride();

    let copy_w = fw.min(tw);
    let copy_h = fh.min(th);
    // Offsets into the source when it is larger, into the target when it is smaller.
    let src_x = (fw - copy_w) / 2;
    let src_y = (fh - copy_h) / 2;
    let dst_x = (tw - copy_w) / 2;
    let dst_y = (th - copy_h) / 2;

    let src_row_bytes = fw * bpp;
    let span = copy_w * bpp;
    let dst = target.pixels_mut();
    for row in 0..copy_h {
        let s = (src_y + row) * src_row_bytes + src_x * bpp;
        let d = (dst_y + row) * stride + dst_x * bpp;
        dst[d..d + span].copy_from_slice(&src[s..s + span]);
    }
}
