use frame_delta_common::image::{Image, Pixel};
use std::ops::Deref;

/// Bytes per encoded pixel: one each for r, g, b.
pub const BYTES_PER_PIXEL: usize = 3;

/// Per-channel absolute difference between two frames of the same size.
///
/// The sign of each change is not kept, so a difference alone cannot
/// reconstruct the frame it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifferenceImage(Image);

impl DifferenceImage {
    /// Largest channel value across all pixels.
    pub fn peak(&self) -> u8 {
        self.0
            .pixels()
            .iter()
            .flat_map(|p| p.channels())
            .max()
            .unwrap_or(0)
    }

    /// Mean channel value across all pixels; 0 for an empty image.
    pub fn mean(&self) -> f64 {
        mean_channel(self.0.pixels().iter().flat_map(|p| p.channels()))
    }

    pub fn is_zero(&self) -> bool {
        self.0.pixels().iter().all(|p| *p == Pixel::default())
    }
}

impl Deref for DifferenceImage {
    type Target = Image;

    fn deref(&self) -> &Image {
        &self.0
    }
}

/// Compute `abs(current - base)` per channel.
pub fn compute_difference(base: &Image, current: &Image) -> Result<DifferenceImage, CodecError> {
    if base.dimensions() != current.dimensions() {
        return Err(CodecError::DimensionMismatch {
            base: base.dimensions(),
            current: current.dimensions(),
        });
    }

    let pixels = base
        .pixels()
        .iter()
        .zip(current.pixels())
        .map(|(b, c)| Pixel::new(c.r.abs_diff(b.r), c.g.abs_diff(b.g), c.b.abs_diff(b.b)))
        .collect();

    let image = Image::new(base.width(), base.height(), base.max_channel_value(), pixels)
        .map_err(|e| CodecError::Corrupt(e.to_string()))?;
    Ok(DifferenceImage(image))
}

/// Mean absolute channel difference between two same-sized frames, without
/// materialising the difference image. `None` when the sizes differ.
pub fn mean_absolute_difference(base: &Image, current: &Image) -> Option<f64> {
    if base.dimensions() != current.dimensions() {
        return None;
    }
    let channels = base
        .pixels()
        .iter()
        .zip(current.pixels())
        .flat_map(|(b, c)| {
            [c.r.abs_diff(b.r), c.g.abs_diff(b.g), c.b.abs_diff(b.b)]
        });
    Some(mean_channel(channels))
}

fn mean_channel(channels: impl Iterator<Item = u8>) -> f64 {
    let (sum, count) = channels.fold((0u64, 0u64), |(sum, count), v| (sum + u64::from(v), count + 1));
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// Serialize a difference as raw `r g b` bytes, row-major, no header.
///
/// Output is exactly `width * height * 3` bytes.
pub fn encode(diff: &DifferenceImage) -> Vec<u8> {
    let mut buf = Vec::with_capacity(diff.pixels().len() * BYTES_PER_PIXEL);
    for row in diff.rows() {
        for pixel in row {
            buf.extend_from_slice(&pixel.channels());
        }
    }
    buf
}

/// Read a difference back. Dimensions come from the matching inception frame
/// since the artifact carries none. Bytes past the expected length are ignored;
/// a channel above `max_channel_value` means the artifact does not belong to
/// that inception.
pub fn decode(
    data: &[u8],
    width: u32,
    height: u32,
    max_channel_value: u32,
) -> Result<DifferenceImage, CodecError> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(BYTES_PER_PIXEL))
        .ok_or_else(|| CodecError::Corrupt(format!("{width}x{height} overflows")))?;

    if data.len() < expected {
        return Err(CodecError::TruncatedData {
            expected,
            got: data.len(),
        });
    }

    if let Some(&value) = data[..expected]
        .iter()
        .find(|&&v| u32::from(v) > max_channel_value)
    {
        return Err(CodecError::ChannelOutOfRange {
            value,
            max: max_channel_value,
        });
    }

    let pixels = data[..expected]
        .chunks_exact(BYTES_PER_PIXEL)
        .map(|c| Pixel::new(c[0], c[1], c[2]))
        .collect();

    let image = Image::new(width, height, max_channel_value, pixels)
        .map_err(|e| CodecError::Corrupt(e.to_string()))?;
    Ok(DifferenceImage(image))
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("cannot diff a {}x{} frame against a {}x{} inception", .current.0, .current.1, .base.0, .base.1)]
    DimensionMismatch { base: (u32, u32), current: (u32, u32) },
    #[error("difference data too short: got {got} bytes, expected {expected}")]
    TruncatedData { expected: usize, got: usize },
    #[error("difference channel {value} exceeds the inception maximum {max}")]
    ChannelOutOfRange { value: u8, max: u32 },
    #[error("corrupt difference image: {0}")]
    Corrupt(String),
}
