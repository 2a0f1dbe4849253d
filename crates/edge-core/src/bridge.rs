//! Boundary API between the managed caller and the processing session
//!
//! `EdgeBridge` is what a foreign-function layer holds on to. It owns the
//! (optional) session behind one mutex, so concurrent callers are serialized
//! and the timing and dimension fields are never torn.

use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::config::ProcessorConfig;
use crate::error::EdgeError;
use crate::frame::wrap_as_image_view;
use crate::ops::{ImageOps, ImageprocOps};
use crate::session::{Operation, ProcessingOutcome, ProcessingSession};

/// Holder of the single processing session.
///
/// Starts uninitialized. Every processing call made before [`EdgeBridge::init`]
/// fails with [`EdgeError::SessionNotInitialized`] (or `None` from the
/// collapsing variants) instead of panicking.
pub struct EdgeBridge<O: ImageOps = ImageprocOps> {
    session: Mutex<Option<ProcessingSession<O>>>,
}

impl EdgeBridge<ImageprocOps> {
    /// (Re)create the session with default settings
    pub fn init(&self) {
        self.init_with_config(ProcessorConfig::default());
    }

    /// (Re)create the session, discarding any previous timing stats
    pub fn init_with_config(&self, config: ProcessorConfig) {
        self.install(ProcessingSession::new(config));
    }
}

impl<O: ImageOps> EdgeBridge<O> {
    pub const fn new() -> Self {
        Self {
            session: parking_lot::const_mutex(None),
        }
    }

    /// Replace the current session with `session`
    pub fn install(&self, session: ProcessingSession<O>) {
        let mut guard = self.session.lock();
        let replaced = guard.replace(session).is_some();
        info!(replaced, "Initializing ImageProcessor");
    }

    pub fn is_initialized(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Current configuration, if initialized
    pub fn config(&self) -> Option<ProcessorConfig> {
        self.session.lock().as_ref().map(|s| s.config().clone())
    }

    pub fn try_process_edge_detect(
        &self,
        buffer: &[u8],
        width: i32,
        height: i32,
        threshold1: i32,
        threshold2: i32,
    ) -> Result<ProcessingOutcome, EdgeError> {
        self.dispatch(buffer, width, height, |_| Operation::EdgeDetect {
            threshold1,
            threshold2,
        })
    }

    /// Edge detection with the configured default thresholds
    pub fn try_process_edge_detect_default(
        &self,
        buffer: &[u8],
        width: i32,
        height: i32,
    ) -> Result<ProcessingOutcome, EdgeError> {
        self.dispatch(buffer, width, height, |config| {
            let (threshold1, threshold2) = config.default_thresholds();
            Operation::EdgeDetect {
                threshold1,
                threshold2,
            }
        })
    }

    pub fn try_process_grayscale(
        &self,
        buffer: &[u8],
        width: i32,
        height: i32,
    ) -> Result<ProcessingOutcome, EdgeError> {
        self.dispatch(buffer, width, height, |_| Operation::Grayscale)
    }

    /// BGR8 edge mask of an RGBA8 frame, or `None` if the bridge is not
    /// initialized or the frame is malformed.
    pub fn process_edge_detect(
        &self,
        buffer: &[u8],
        width: i32,
        height: i32,
        threshold1: i32,
        threshold2: i32,
    ) -> Option<Vec<u8>> {
        collapse(
            "processFrameCanny",
            self.try_process_edge_detect(buffer, width, height, threshold1, threshold2),
        )
    }

    pub fn process_edge_detect_default(&self, buffer: &[u8], width: i32, height: i32) -> Option<Vec<u8>> {
        collapse(
            "processFrameCanny",
            self.try_process_edge_detect_default(buffer, width, height),
        )
    }

    /// BGR8 grayscale of an RGBA8 frame, or `None` like [`Self::process_edge_detect`]
    pub fn process_grayscale(&self, buffer: &[u8], width: i32, height: i32) -> Option<Vec<u8>> {
        collapse(
            "processFrameGrayscale",
            self.try_process_grayscale(buffer, width, height),
        )
    }

    /// `0.0` when uninitialized or before the first call
    pub fn last_processing_time_millis(&self) -> f64 {
        self.session
            .lock()
            .as_ref()
            .map(|s| s.last_duration_millis())
            .unwrap_or(0.0)
    }

    /// `(0, 0)` when uninitialized or before the first call
    pub fn last_frame_dimensions(&self) -> (u32, u32) {
        self.session
            .lock()
            .as_ref()
            .map(|s| s.last_frame_dimensions())
            .unwrap_or((0, 0))
    }

    fn dispatch(
        &self,
        buffer: &[u8],
        width: i32,
        height: i32,
        op: impl FnOnce(&ProcessorConfig) -> Operation,
    ) -> Result<ProcessingOutcome, EdgeError> {
        let mut guard = self.session.lock();
        let session = guard.as_mut().ok_or(EdgeError::SessionNotInitialized)?;
        let op = op(session.config());
        let view = wrap_as_image_view(buffer, width, height)?;
        session.run(&view, op)
    }
}

impl<O: ImageOps> Default for EdgeBridge<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// Flatten an outcome to the wire contract: a buffer, or nothing.
fn collapse(call: &str, result: Result<ProcessingOutcome, EdgeError>) -> Option<Vec<u8>> {
    match result {
        Ok(outcome) => Some(outcome.into_bytes()),
        Err(EdgeError::SessionNotInitialized) => {
            error!("{}: ImageProcessor not initialized", call);
            None
        }
        Err(e @ EdgeError::InvalidBuffer(_)) => {
            warn!("{}: rejected frame: {}", call, e);
            None
        }
        Err(e) => {
            error!("{}: {}", call, e);
            None
        }
    }
}
