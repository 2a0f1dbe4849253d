//! # edge-core
//!
//! Native side of the camera edge-detection bridge.
//!
//! This crate handles:
//! - Zero-copy wrapping of caller-owned RGBA frames ([`frame`])
//! - The image capability seam and its `imageproc` backend ([`ops`])
//! - The processing session: dispatch, timing, fail-soft passthrough ([`session`])
//! - The buffer-or-nothing boundary API used by the JNI layer ([`bridge`])
//!
//! The image math itself (grayscale conversion, Gaussian smoothing, Canny)
//! is delegated to `image` and `imageproc`.

pub mod bridge;
pub mod config;
pub mod error;
pub mod frame;
pub mod ops;
#[cfg(test)]
mod proptests;
pub mod session;

// Re-export main types for convenience
pub use bridge::EdgeBridge;
pub use config::ProcessorConfig;
pub use error::{EdgeError, ProcessingFailure};
pub use frame::{unwrap_to_buffer, wrap_as_image_view, ImageView, PixelBuffer, PixelFormat};
pub use ops::{ImageOps, ImageprocOps, BLUR_KERNEL_SIZE, BLUR_SIGMA};
pub use session::{
    Operation, ProcessingOutcome, ProcessingResult, ProcessingSession, SessionStats,
};
