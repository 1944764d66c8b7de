// src/display/mod.rs
//! Display surface collaborator.
//!
//! - SurfaceDriver: platform primitives (acquire/release a draw target)
//! - SurfaceSlot: which surface is current, shared by controller and presenter
//! - Messages: handles, draw targets and host lifecycle notifications
//!
//! Surfaces belong to the host. This crate only ever touches one inside a
//! [`DrawScope`], which releases the target on every exit path.

pub mod driver;
pub mod drivers;
pub mod manager;
pub mod messages;

pub use driver::{DrawScope, SurfaceDriver};
pub use drivers::HeadlessSurfaceDriver;
pub use manager::{SurfaceSlot, SurfaceState};
pub use messages::{DrawTarget, SurfaceEvent, SurfaceHandle};
