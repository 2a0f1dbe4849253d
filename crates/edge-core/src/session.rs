//! Processing session: dispatch, timing and the fail-soft policy

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use image::RgbImage;
use tracing::{debug, error, info};

use crate::config::ProcessorConfig;
use crate::error::{EdgeError, ProcessingFailure};
use crate::frame::{unwrap_to_buffer, ImageView, PixelBuffer, PixelFormat};
use crate::ops::{ImageOps, ImageprocOps};

/// Operation requested for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Canny with the given hysteresis pair, forwarded unvalidated
    EdgeDetect { threshold1: i32, threshold2: i32 },
    Grayscale,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::EdgeDetect { .. } => "edge-detect",
            Operation::Grayscale => "grayscale",
        }
    }
}

/// Output of one processing call
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingResult {
    /// BGR8, tightly packed, owned by the caller
    pub buffer: PixelBuffer,
    pub duration_millis: f64,
    pub width: u32,
    pub height: u32,
}

/// How a processing call ended.
///
/// Both arms carry a valid frame. A degraded result holds the unmodified
/// input, reinterpreted as 3-channel, plus the failure that caused it.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingOutcome {
    Success(ProcessingResult),
    DegradedPassthrough {
        result: ProcessingResult,
        cause: ProcessingFailure,
    },
}

impl ProcessingOutcome {
    pub fn result(&self) -> &ProcessingResult {
        match self {
            ProcessingOutcome::Success(result) => result,
            ProcessingOutcome::DegradedPassthrough { result, .. } => result,
        }
    }

    pub fn into_result(self) -> ProcessingResult {
        match self {
            ProcessingOutcome::Success(result) => result,
            ProcessingOutcome::DegradedPassthrough { result, .. } => result,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ProcessingOutcome::DegradedPassthrough { .. })
    }

    /// Raw output bytes, the wire-level view of either arm
    pub fn into_bytes(self) -> Vec<u8> {
        self.into_result().buffer.into_bytes()
    }
}

/// Metadata kept between calls
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionStats {
    pub last_duration_millis: f64,
    pub last_frame_width: u32,
    pub last_frame_height: u32,
}

/// The single active processing pipeline.
///
/// Not `Sync`-shared on its own; callers that need one session across
/// threads go through [`crate::EdgeBridge`], which serializes every call.
pub struct ProcessingSession<O: ImageOps = ImageprocOps> {
    ops: O,
    config: ProcessorConfig,
    stats: SessionStats,
}

impl ProcessingSession<ImageprocOps> {
    pub fn new(config: ProcessorConfig) -> Self {
        Self::with_ops(ImageprocOps::new(), config)
    }
}

impl<O: ImageOps> ProcessingSession<O> {
    /// Create a session over a specific image backend
    pub fn with_ops(ops: O, config: ProcessorConfig) -> Self {
        Self {
            ops,
            config,
            stats: SessionStats::default(),
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Duration of the last operation, `0.0` before the first one
    pub fn last_duration_millis(&self) -> f64 {
        self.stats.last_duration_millis
    }

    pub fn last_frame_dimensions(&self) -> (u32, u32) {
        (self.stats.last_frame_width, self.stats.last_frame_height)
    }

    pub fn run_edge_detect(
        &mut self,
        view: &ImageView<'_>,
        threshold1: i32,
        threshold2: i32,
    ) -> Result<ProcessingOutcome, EdgeError> {
        self.run(
            view,
            Operation::EdgeDetect {
                threshold1,
                threshold2,
            },
        )
    }

    pub fn run_grayscale(&mut self, view: &ImageView<'_>) -> Result<ProcessingOutcome, EdgeError> {
        self.run(view, Operation::Grayscale)
    }

    /// Run `op` over `view`.
    ///
    /// Failures inside the image backend, panics included, never escape:
    /// they are logged and the input is passed through. The only error
    /// returned is a failed output allocation.
    pub fn run(&mut self, view: &ImageView<'_>, op: Operation) -> Result<ProcessingOutcome, EdgeError> {
        let (width, height) = (view.width(), view.height());
        self.stats.last_frame_width = width;
        self.stats.last_frame_height = height;
        debug!(op = op.name(), width, height, format = ?view.format(), "Dispatching frame");

        let start = Instant::now();
        let processed = guarded(op.name(), || self.apply(view, op));
        let duration_millis = start.elapsed().as_secs_f64() * 1000.0;
        self.stats.last_duration_millis = duration_millis;

        match processed {
            Ok(image) => {
                let output = ImageView::new(
                    image.as_raw(),
                    width,
                    height,
                    width as usize * PixelFormat::Bgr8.channels(),
                    PixelFormat::Bgr8,
                )?;
                let buffer = unwrap_to_buffer(&output)?;
                info!(
                    "Frame processed ({}): {}x{}, Time: {:.2} ms",
                    op.name(),
                    width,
                    height,
                    duration_millis
                );
                Ok(ProcessingOutcome::Success(ProcessingResult {
                    buffer,
                    duration_millis,
                    width,
                    height,
                }))
            }
            Err(cause) => {
                error!("Error in {}: {}; passing frame through", op.name(), cause);
                let buffer = view.to_bgr_passthrough()?;
                Ok(ProcessingOutcome::DegradedPassthrough {
                    result: ProcessingResult {
                        buffer,
                        duration_millis,
                        width,
                        height,
                    },
                    cause,
                })
            }
        }
    }

    fn apply(&self, view: &ImageView<'_>, op: Operation) -> Result<RgbImage, ProcessingFailure> {
        let gray = self.ops.to_gray(view)?;
        let mask = match op {
            Operation::EdgeDetect {
                threshold1,
                threshold2,
            } => {
                let smoothed = self.ops.smooth(&gray)?;
                self.ops
                    .detect_edges(&smoothed, threshold1 as f32, threshold2 as f32)?
            }
            Operation::Grayscale => gray,
        };

        let bgr = self.ops.gray_to_bgr(&mask)?;
        if bgr.dimensions() != (view.width(), view.height()) {
            return Err(ProcessingFailure::Capability(format!(
                "backend produced {}x{} for a {}x{} frame",
                bgr.width(),
                bgr.height(),
                view.width(),
                view.height()
            )));
        }
        Ok(bgr)
    }
}

/// Run a backend step, turning a panic into a [`ProcessingFailure`]
fn guarded<T>(
    op: &'static str,
    step: impl FnOnce() -> Result<T, ProcessingFailure>,
) -> Result<T, ProcessingFailure> {
    match panic::catch_unwind(AssertUnwindSafe(step)) {
        Ok(result) => result,
        Err(payload) => Err(ProcessingFailure::Panicked(format!(
            "{}: {}",
            op,
            panic_message(&*payload)
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::wrap_as_image_view;
    use image::GrayImage;

    /// Backend that fails or panics at a chosen step
    struct FaultyOps {
        panic: bool,
    }

    impl ImageOps for FaultyOps {
        fn to_gray(&self, view: &ImageView<'_>) -> Result<GrayImage, ProcessingFailure> {
            ImageprocOps::new().to_gray(view)
        }

        fn smooth(&self, gray: &GrayImage) -> Result<GrayImage, ProcessingFailure> {
            Ok(gray.clone())
        }

        fn detect_edges(&self, _: &GrayImage, _: f32, _: f32) -> Result<GrayImage, ProcessingFailure> {
            if self.panic {
                panic!("edge backend exploded");
            }
            Err(ProcessingFailure::Capability("no edges today".to_string()))
        }

        fn gray_to_bgr(&self, gray: &GrayImage) -> Result<RgbImage, ProcessingFailure> {
            ImageprocOps::new().gray_to_bgr(gray)
        }
    }

    /// Backend that returns a frame of the wrong size
    struct ShrinkingOps;

    impl ImageOps for ShrinkingOps {
        fn to_gray(&self, _: &ImageView<'_>) -> Result<GrayImage, ProcessingFailure> {
            Ok(GrayImage::new(1, 1))
        }

        fn smooth(&self, gray: &GrayImage) -> Result<GrayImage, ProcessingFailure> {
            Ok(gray.clone())
        }

        fn detect_edges(&self, gray: &GrayImage, _: f32, _: f32) -> Result<GrayImage, ProcessingFailure> {
            Ok(gray.clone())
        }

        fn gray_to_bgr(&self, gray: &GrayImage) -> Result<RgbImage, ProcessingFailure> {
            ImageprocOps::new().gray_to_bgr(gray)
        }
    }

    fn rgba_frame(width: usize, height: usize) -> Vec<u8> {
        (0..width * height)
            .flat_map(|i| {
                let v = (i * 37 % 256) as u8;
                [v, v.wrapping_add(1), v.wrapping_add(2), 255]
            })
            .collect()
    }

    #[test]
    fn fresh_session_has_zero_stats() {
        let session = ProcessingSession::new(ProcessorConfig::default());
        assert_eq!(session.last_duration_millis(), 0.0);
        assert_eq!(session.last_frame_dimensions(), (0, 0));
    }

    #[test]
    fn grayscale_success_records_stats() {
        let mut session = ProcessingSession::new(ProcessorConfig::default());
        let buf = rgba_frame(5, 3);
        let view = wrap_as_image_view(&buf, 5, 3).unwrap();

        let outcome = session.run_grayscale(&view).unwrap();
        assert!(!outcome.is_degraded());
        let result = outcome.result();
        assert_eq!(result.buffer.len(), 5 * 3 * 3);
        assert_eq!(result.buffer.format(), PixelFormat::Bgr8);
        assert_eq!((result.width, result.height), (5, 3));
        assert!(result.duration_millis >= 0.0);
        assert_eq!(session.last_frame_dimensions(), (5, 3));
        assert_eq!(session.last_duration_millis(), result.duration_millis);
    }

    #[test]
    fn edge_detect_output_is_three_channel() {
        let mut session = ProcessingSession::new(ProcessorConfig::default());
        let buf = rgba_frame(8, 6);
        let view = wrap_as_image_view(&buf, 8, 6).unwrap();

        let outcome = session.run_edge_detect(&view, 50, 150).unwrap();
        assert!(!outcome.is_degraded());
        let bytes = outcome.into_bytes();
        assert_eq!(bytes.len(), 8 * 6 * 3);
        assert!(bytes.chunks_exact(3).all(|px| px[0] == px[1] && px[1] == px[2]));
    }

    #[test]
    fn backend_error_degrades_to_passthrough() {
        let mut session = ProcessingSession::with_ops(FaultyOps { panic: false }, ProcessorConfig::default());
        let buf = rgba_frame(4, 2);
        let view = wrap_as_image_view(&buf, 4, 2).unwrap();

        let outcome = session.run_edge_detect(&view, 50, 150).unwrap();
        match &outcome {
            ProcessingOutcome::DegradedPassthrough { result, cause } => {
                assert_eq!(result.buffer, view.to_bgr_passthrough().unwrap());
                assert!(matches!(cause, ProcessingFailure::Capability(_)));
            }
            other => panic!("expected passthrough, got {:?}", other),
        }
        assert_eq!(session.last_frame_dimensions(), (4, 2));
        assert!(session.last_duration_millis() >= 0.0);
    }

    #[test]
    fn backend_panic_is_contained() {
        let mut session = ProcessingSession::with_ops(FaultyOps { panic: true }, ProcessorConfig::default());
        let buf = rgba_frame(3, 3);
        let view = wrap_as_image_view(&buf, 3, 3).unwrap();

        let outcome = session.run_edge_detect(&view, 50, 150).unwrap();
        match outcome {
            ProcessingOutcome::DegradedPassthrough { cause, result } => {
                assert!(matches!(cause, ProcessingFailure::Panicked(ref msg) if msg.contains("exploded")));
                assert_eq!(result.buffer.len(), 3 * 3 * 3);
            }
            other => panic!("expected passthrough, got {:?}", other),
        }
    }

    #[test]
    fn grayscale_unaffected_by_edge_backend_failure() {
        let mut session = ProcessingSession::with_ops(FaultyOps { panic: false }, ProcessorConfig::default());
        let buf = rgba_frame(2, 2);
        let view = wrap_as_image_view(&buf, 2, 2).unwrap();
        assert!(!session.run_grayscale(&view).unwrap().is_degraded());
    }

    #[test]
    fn wrong_sized_backend_output_degrades() {
        let mut session = ProcessingSession::with_ops(ShrinkingOps, ProcessorConfig::default());
        let buf = rgba_frame(4, 4);
        let view = wrap_as_image_view(&buf, 4, 4).unwrap();

        let outcome = session.run_grayscale(&view).unwrap();
        assert!(outcome.is_degraded());
        assert_eq!(outcome.result().buffer.len(), 4 * 4 * 3);
    }

    #[test]
    fn unordered_thresholds_match_ordered() {
        let mut session = ProcessingSession::new(ProcessorConfig::default());
        let buf: Vec<u8> = (0..12 * 12)
            .flat_map(|i| if i % 12 < 6 { [0, 0, 0, 255] } else { [255, 255, 255, 255] })
            .collect();
        let view = wrap_as_image_view(&buf, 12, 12).unwrap();

        let inverted = session.run_edge_detect(&view, 200, 10).unwrap();
        assert!(!inverted.is_degraded());
        let ordered = session.run_edge_detect(&view, 10, 200).unwrap();
        assert_eq!(inverted.into_bytes(), ordered.into_bytes());
    }

    #[test]
    fn panic_message_handles_payload_types() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(&*boxed), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*boxed), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(&*boxed), "unknown panic");
    }
}
