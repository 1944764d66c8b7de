// src/error.rs
//! Error taxonomy for the presentation bridge.
//!
//! Only [`BridgeError::SurfaceUnavailable`] is expected during normal
//! operation; it marks a dropped frame. Everything else aborts whatever
//! operation produced it.

use crate::display::SurfaceHandle;
use crate::pixel::PixelFormat;
use thiserror::Error;

/// Errors produced by the frame buffer, converter, presenter, runner and controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The simulation engine could not be located or initialised.
    #[error("simulation engine unavailable: {0}")]
    EngineUnavailable(String),

    /// A frame or surface was described with a non-positive (or overflowing) size.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: i64, height: i64 },

    /// The requested conversion is not part of the deployment's conversion table.
    #[error("unsupported pixel conversion {from:?} -> {to:?}")]
    UnsupportedFormat { from: PixelFormat, to: PixelFormat },

    /// No drawable surface right now. The frame is dropped.
    #[error("surface unavailable ({0:?})")]
    SurfaceUnavailable(Option<SurfaceHandle>),

    /// A write or conversion was handed a byte slice of the wrong length.
    #[error("frame size mismatch: expected {expected} bytes, got {actual}")]
    FrameSizeMismatch { expected: usize, actual: usize },

    /// A driver lent out pixel memory that does not match its stated geometry.
    #[error("invalid draw target: {0}")]
    InvalidDrawTarget(String),

    /// An operation was attempted in a lifecycle state that forbids it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The engine failed while producing a frame.
    #[error("engine step failed: {0}")]
    Engine(String),
}

impl BridgeError {
    /// True for failures that only cost the current frame.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BridgeError::SurfaceUnavailable(_))
    }
}

pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn only_surface_unavailable_is_recoverable() {
        assert!(BridgeError::SurfaceUnavailable(None).is_recoverable());
        assert!(!BridgeError::EngineUnavailable("gone".into()).is_recoverable());
        assert!(!BridgeError::InvalidDimensions {
            width: 0,
            height: 1
        }
        .is_recoverable());
        assert!(!BridgeError::UnsupportedFormat {
            from: PixelFormat::Rgb565,
            to: PixelFormat::Bgra8888,
        }
        .is_recoverable());
    }

    #[test]
    fn messages_name_the_values() {
        let err = BridgeError::InvalidDimensions {
            width: -3,
            height: 7,
        };
        assert_eq!(err.to_string(), "invalid dimensions -3x7");
    }
}
