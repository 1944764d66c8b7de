// src/lib.rs
//! Bridges a continuously running simulation to a host-owned display surface.
//!
//! - `frame`: double-buffered pixels shared by simulation and presenter
//! - `pixel`: pixel formats and per-frame conversion
//! - `display`: the surface collaborator, plus a headless driver
//! - `presenter`: draws the latest frame onto the current surface
//! - `simulation`: engine collaborator and the thread that drives it
//! - `lifecycle`: maps host surface notifications onto sessions

pub mod config;
pub mod display;
pub mod error;
pub mod frame;
pub mod lifecycle;
pub mod pixel;
pub mod presenter;
pub mod simulation;

pub use config::Config;
pub use error::{BridgeError, BridgeResult};
pub use frame::{FrameBuffer, FrameDimensions};
pub use lifecycle::{SessionSummary, SurfaceLifecycleController};
pub use presenter::{PresentReport, Presenter};
