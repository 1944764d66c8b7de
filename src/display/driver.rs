// src/display/driver.rs
//! SurfaceDriver trait - minimal interface for platform-specific surface access.
//!
//! ## Threading Model
//! - The host creates and destroys surfaces on its own thread
//! - The presenter acquires draw targets from whichever thread presents
//! - Drivers must therefore be `Send + Sync` and treat every acquire as
//!   racing against destruction
//!
//! ## Lifecycle of one presentation
//! 1. `acquire_draw_target(handle)` - lend out pixel memory, or `SurfaceUnavailable`
//! 2. Presenter writes pixels and optionally commits
//! 3. `release_draw_target(target)` - show committed contents, reclaim memory

use crate::display::messages::{DrawTarget, SurfaceHandle};
use crate::error::BridgeResult;
use log::trace;

/// Platform surface primitives.
pub trait SurfaceDriver: Send + Sync {
    /// Locks the surface for drawing.
    ///
    /// Fails with `SurfaceUnavailable` if the surface does not exist, was
    /// destroyed, or is already locked.
    fn acquire_draw_target(&self, handle: SurfaceHandle) -> BridgeResult<DrawTarget>;

    /// Unlocks the surface. Committed targets are posted to the display,
    /// uncommitted ones are discarded and leave the surface untouched.
    fn release_draw_target(&self, target: DrawTarget);
}

/// Scoped acquisition of a draw target. Releases on drop.
pub struct DrawScope<'d> {
    driver: &'d dyn SurfaceDriver,
    target: Option<DrawTarget>,
}

impl<'d> DrawScope<'d> {
    pub fn acquire(driver: &'d dyn SurfaceDriver, handle: SurfaceHandle) -> BridgeResult<Self> {
        let target = driver.acquire_draw_target(handle)?;
        trace!("DrawScope: acquired {}", handle);
        Ok(Self {
            driver,
            target: Some(target),
        })
    }

    pub fn target(&self) -> &DrawTarget {
        self.target.as_ref().expect("target is only taken on drop")
    }

    pub fn target_mut(&mut self) -> &mut DrawTarget {
        self.target.as_mut().expect("target is only taken on drop")
    }

    /// Commits the drawing and releases now.
    pub fn post(mut self) {
        self.target_mut().commit();
    }
}

impl Drop for DrawScope<'_> {
    fn drop(&mut self) {
        if let Some(target) = self.target.take() {
            trace!(
                "DrawScope: releasing {} (committed={})",
                target.handle(),
                target.is_committed()
            );
            self.driver.release_draw_target(target);
        }
    }
}
