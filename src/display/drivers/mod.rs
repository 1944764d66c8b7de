// src/display/drivers/mod.rs
//! Surface driver implementations.

pub mod headless;

pub use headless::{HeadlessSurfaceDriver, PostedFrame};
