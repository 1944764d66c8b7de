// src/display/manager.rs
//! SurfaceSlot - tracks which host surface is current.
//!
//! The presenter holds the slot lock for the whole of a presentation, and
//! the controller takes the same lock to change the current surface. So once
//! `detach` returns, no presentation against the detached handle is running
//! and none can start.

use crate::display::messages::SurfaceHandle;
use crate::frame::FrameDimensions;
use log::{debug, info, warn};
use parking_lot::{Mutex, MutexGuard};

/// Snapshot of the current surface as reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceState {
    handle: Option<SurfaceHandle>,
    generation: u64,
}

impl SurfaceState {
    pub fn handle(&self) -> Option<SurfaceHandle> {
        self.handle
    }

    /// Bumped on every attach, resize and detach. Presentations report the
    /// generation they drew against.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// The current-surface cell shared by controller and presenter.
#[derive(Debug, Default)]
pub struct SurfaceSlot {
    state: Mutex<SurfaceState>,
}

impl SurfaceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the slot. Presentations hold this for their whole duration.
    pub fn lock(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock()
    }

    pub fn current(&self) -> Option<SurfaceHandle> {
        self.state.lock().handle
    }

    pub fn state(&self) -> SurfaceState {
        *self.state.lock()
    }

    /// Makes `handle` current. Returns false if it already was.
    pub fn attach(&self, handle: SurfaceHandle) -> bool {
        let mut state = self.state.lock();
        match state.handle {
            Some(current) if current == handle => {
                debug!("SurfaceSlot: {} already attached", handle);
                return false;
            }
            Some(current) => {
                warn!(
                    "SurfaceSlot: {} created while {} still attached, replacing",
                    handle, current
                );
            }
            None => {}
        }
        state.handle = Some(handle);
        state.generation += 1;
        info!("SurfaceSlot: attached {}", handle);
        true
    }

    /// Records a new size for the current surface. Stale handles are ignored.
    pub fn resize(&self, handle: SurfaceHandle, size: FrameDimensions) -> bool {
        let mut state = self.state.lock();
        if state.handle != Some(handle) {
            warn!("SurfaceSlot: resize for non-current {} ignored", handle);
            return false;
        }
        state.generation += 1;
        info!(
            "SurfaceSlot: {} is now {}x{}",
            handle,
            size.width(),
            size.height()
        );
        true
    }

    /// Clears the slot if `handle` is current. Waits for an in-flight presentation.
    pub fn detach(&self, handle: SurfaceHandle) -> bool {
        let mut state = self.state.lock();
        if state.handle != Some(handle) {
            debug!("SurfaceSlot: detach for non-current {} ignored", handle);
            return false;
        }
        state.handle = None;
        state.generation += 1;
        info!("SurfaceSlot: detached {}", handle);
        true
    }
}
