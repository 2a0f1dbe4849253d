//! Image capability used by the processing session
//!
//! The session only sequences these calls; the math lives in `image` and
//! `imageproc`. The trait is the seam where a different backend (or a
//! failing one, in tests) plugs in.

use image::{GenericImageView, GrayImage, Luma, Rgb, RgbImage, Rgba};
use imageproc::edges::canny;
use imageproc::filter::separable_filter_equal;

use crate::error::ProcessingFailure;
use crate::frame::{ImageView, PixelFormat};

/// Side of the square smoothing kernel applied before edge detection
pub const BLUR_KERNEL_SIZE: usize = 5;

/// Standard deviation of the smoothing kernel
pub const BLUR_SIGMA: f32 = 1.5;

/// Operations the session needs from an image-processing library
pub trait ImageOps: Send {
    /// Reduce any supported view to a single 8-bit channel.
    ///
    /// 4-channel and 3-channel input is weighted as RGB with BT.601 luma
    /// coefficients; gray is copied.
    fn to_gray(&self, view: &ImageView<'_>) -> Result<GrayImage, ProcessingFailure>;

    /// Fixed 5x5 Gaussian smoothing, sigma 1.5
    fn smooth(&self, gray: &GrayImage) -> Result<GrayImage, ProcessingFailure>;

    /// Canny edge mask. Thresholds arrive unvalidated and in either order.
    fn detect_edges(
        &self,
        gray: &GrayImage,
        low_threshold: f32,
        high_threshold: f32,
    ) -> Result<GrayImage, ProcessingFailure>;

    /// Widen a single channel to three identical channels
    fn gray_to_bgr(&self, gray: &GrayImage) -> Result<RgbImage, ProcessingFailure>;
}

/// `image`/`imageproc` backed implementation
#[derive(Debug, Clone)]
pub struct ImageprocOps {
    kernel: [f32; BLUR_KERNEL_SIZE],
}

impl ImageprocOps {
    pub fn new() -> Self {
        Self {
            kernel: gaussian_kernel(BLUR_SIGMA),
        }
    }
}

impl Default for ImageprocOps {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageOps for ImageprocOps {
    fn to_gray(&self, view: &ImageView<'_>) -> Result<GrayImage, ProcessingFailure> {
        let flat = view.as_flat();
        let conversion = |e: image::flat::Error| {
            ProcessingFailure::Conversion(format!("{:?} view rejected: {}", view.format(), e))
        };

        let (w, h) = (view.width(), view.height());
        let gray = match view.format() {
            PixelFormat::Rgba8 => {
                let px = flat.as_view::<Rgba<u8>>().map_err(conversion)?;
                GrayImage::from_fn(w, h, |x, y| {
                    let Rgba([r, g, b, _]) = px.get_pixel(x, y);
                    Luma([bt601_luma(r, g, b)])
                })
            }
            PixelFormat::Bgr8 => {
                let px = flat.as_view::<Rgb<u8>>().map_err(conversion)?;
                GrayImage::from_fn(w, h, |x, y| {
                    let Rgb([r, g, b]) = px.get_pixel(x, y);
                    Luma([bt601_luma(r, g, b)])
                })
            }
            PixelFormat::Gray8 => {
                let px = flat.as_view::<Luma<u8>>().map_err(conversion)?;
                GrayImage::from_fn(w, h, |x, y| px.get_pixel(x, y))
            }
        };
        Ok(gray)
    }

    fn smooth(&self, gray: &GrayImage) -> Result<GrayImage, ProcessingFailure> {
        Ok(separable_filter_equal(gray, &self.kernel[..]))
    }

    fn detect_edges(
        &self,
        gray: &GrayImage,
        low_threshold: f32,
        high_threshold: f32,
    ) -> Result<GrayImage, ProcessingFailure> {
        // imageproc asserts low <= high; OpenCV swaps an inverted pair instead
        let low = low_threshold.min(high_threshold);
        let high = low_threshold.max(high_threshold);
        Ok(canny(gray, low, high))
    }

    fn gray_to_bgr(&self, gray: &GrayImage) -> Result<RgbImage, ProcessingFailure> {
        Ok(RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
            let Luma([v]) = *gray.get_pixel(x, y);
            Rgb([v, v, v])
        }))
    }
}

/// 0.299 R + 0.587 G + 0.114 B in 14-bit fixed point, rounded
fn bt601_luma(r: u8, g: u8, b: u8) -> u8 {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    ((R * r as u32 + G * g as u32 + B * b as u32 + (1 << 13)) >> 14) as u8
}

/// Normalized 1-D Gaussian taps, applied separably in both directions
fn gaussian_kernel(sigma: f32) -> [f32; BLUR_KERNEL_SIZE] {
    let radius = (BLUR_KERNEL_SIZE / 2) as f32;
    let mut kernel = [0.0f32; BLUR_KERNEL_SIZE];
    for (i, tap) in kernel.iter_mut().enumerate() {
        let x = i as f32 - radius;
        *tap = (-(x * x) / (2.0 * sigma * sigma)).exp();
    }
    let sum: f32 = kernel.iter().sum();
    for tap in kernel.iter_mut() {
        *tap /= sum;
    }
    kernel
}
