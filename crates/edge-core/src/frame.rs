//! Frame marshaling between caller-owned pixel memory and image views
//!
//! Ingress frames are borrowed, never copied: [`wrap_as_image_view`] hands
//! back an [`ImageView`] that aliases the caller's buffer for the duration of
//! one processing call. Egress goes the other way through
//! [`unwrap_to_buffer`], which always copies into a fresh [`PixelBuffer`]
//! because ownership has to cross the boundary.

use image::flat::{FlatSamples, SampleLayout};

use crate::error::EdgeError;

/// Bytes per pixel of the only supported ingress format (RGBA8)
pub const INGRESS_CHANNELS: usize = 4;

/// Pixel layouts understood by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 4 channels, camera ingress
    Rgba8,
    /// 3 channels, every output frame
    Bgr8,
    /// 1 channel
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub const fn channels(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Bgr8 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// Owned, contiguous pixel memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
}

impl PixelBuffer {
    /// Wrap tightly packed rows (`stride == width * channels`)
    fn packed(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        let stride = width as usize * format.channels();
        debug_assert_eq!(data.len(), stride * height as usize);
        Self {
            data,
            width,
            height,
            stride,
            format,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn channel_count(&self) -> usize {
        self.format.channels()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Give up the buffer, e.g. to hand it to the managed side
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Borrow the buffer as an image view
    pub fn as_view(&self) -> ImageView<'_> {
        ImageView {
            samples: &self.data,
            width: self.width,
            height: self.height,
            stride: self.stride,
            format: self.format,
        }
    }
}

/// Borrowed, typed view over pixel memory owned by someone else.
///
/// The lifetime ties the view to the buffer it was created from, so it can
/// never be stored past the call that produced it.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a> {
    samples: &'a [u8],
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
}

impl<'a> ImageView<'a> {
    /// Create a stride-aware view, validating that every row fits in `samples`.
    pub fn new(
        samples: &'a [u8],
        width: u32,
        height: u32,
        stride: usize,
        format: PixelFormat,
    ) -> Result<Self, EdgeError> {
        if width == 0 || height == 0 {
            return Err(EdgeError::InvalidBuffer(format!(
                "dimensions must be positive, got {}x{}",
                width, height
            )));
        }

        let row_bytes = (width as usize)
            .checked_mul(format.channels())
            .ok_or_else(|| EdgeError::InvalidBuffer("row size overflows".to_string()))?;
        if stride < row_bytes {
            return Err(EdgeError::InvalidBuffer(format!(
                "stride {} is smaller than a row of {} bytes",
                stride, row_bytes
            )));
        }

        // The last row does not need trailing padding.
        let required = stride
            .checked_mul(height as usize - 1)
            .and_then(|n| n.checked_add(row_bytes))
            .ok_or_else(|| EdgeError::InvalidBuffer("frame size overflows".to_string()))?;
        if samples.len() < required {
            return Err(EdgeError::InvalidBuffer(format!(
                "buffer holds {} bytes, {}x{} {:?} needs {}",
                samples.len(),
                width,
                height,
                format,
                required
            )));
        }

        Ok(Self {
            samples,
            width,
            height,
            stride,
            format,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn channel_count(&self) -> usize {
        self.format.channels()
    }

    /// Pixel bytes per row, without padding
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.format.channels()
    }

    /// Pixel bytes of row `y`, without padding
    pub fn row(&self, y: u32) -> &'a [u8] {
        let start = y as usize * self.stride;
        &self.samples[start..start + self.row_bytes()]
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        let view = *self;
        (0..view.height).map(move |y| view.row(y))
    }

    /// Describe the view in `image`'s flat-sample terms, still without copying
    pub fn as_flat(&self) -> FlatSamples<&'a [u8]> {
        let channels = self.format.channels();
        FlatSamples {
            samples: self.samples,
            layout: SampleLayout {
                channels: channels as u8,
                channel_stride: 1,
                width: self.width,
                width_stride: channels,
                height: self.height,
                height_stride: self.stride,
            },
            color_hint: None,
        }
    }

    /// Copy the frame as-is into a 3-channel buffer of matching dimensions.
    ///
    /// Used when processing fails: RGBA drops its alpha byte, 3-channel data
    /// is copied verbatim and gray is replicated. No color conversion happens.
    pub fn to_bgr_passthrough(&self) -> Result<PixelBuffer, EdgeError> {
        let len = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(PixelFormat::Bgr8.channels()))
            .ok_or(EdgeError::Allocation {
                requested: usize::MAX,
            })?;
        let mut data = try_allocate(len)?;

        for row in self.rows() {
            match self.format {
                PixelFormat::Rgba8 => {
                    for px in row.chunks_exact(4) {
                        data.extend_from_slice(&px[..3]);
                    }
                }
                PixelFormat::Bgr8 => data.extend_from_slice(row),
                PixelFormat::Gray8 => {
                    for &v in row {
                        data.extend_from_slice(&[v, v, v]);
                    }
                }
            }
        }

        Ok(PixelBuffer::packed(
            data,
            self.width,
            self.height,
            PixelFormat::Bgr8,
        ))
    }
}

/// Wrap a caller-owned RGBA8 frame without copying it.
///
/// Only the first `width * height * 4` bytes are viewed; anything after that
/// is ignored. The caller must keep the buffer alive and unmodified until the
/// processing call that uses the view returns, which the borrow enforces.
pub fn wrap_as_image_view(buffer: &[u8], width: i32, height: i32) -> Result<ImageView<'_>, EdgeError> {
    if width <= 0 || height <= 0 {
        return Err(EdgeError::InvalidBuffer(format!(
            "dimensions must be positive, got {}x{}",
            width, height
        )));
    }

    let (width, height) = (width as u32, height as u32);
    let required = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(INGRESS_CHANNELS))
        .ok_or_else(|| EdgeError::InvalidBuffer("frame size overflows".to_string()))?;
    if buffer.len() < required {
        return Err(EdgeError::InvalidBuffer(format!(
            "buffer holds {} bytes, {}x{} RGBA needs {}",
            buffer.len(),
            width,
            height,
            required
        )));
    }

    ImageView::new(
        &buffer[..required],
        width,
        height,
        width as usize * INGRESS_CHANNELS,
        PixelFormat::Rgba8,
    )
}

/// Copy a processed image into a freshly allocated, tightly packed buffer.
pub fn unwrap_to_buffer(image: &ImageView<'_>) -> Result<PixelBuffer, EdgeError> {
    let len = image.row_bytes() * image.height() as usize;
    let mut data = try_allocate(len)?;
    for row in image.rows() {
        data.extend_from_slice(row);
    }

    Ok(PixelBuffer::packed(
        data,
        image.width(),
        image.height(),
        image.format(),
    ))
}

fn try_allocate(len: usize) -> Result<Vec<u8>, EdgeError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| EdgeError::Allocation { requested: len })?;
    Ok(data)
}
