use frame_delta_common::image::{Image, Pixel};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Decode a plain-text pixel map from disk.
///
/// Layout: a `width height max_channel_value` header followed by
/// `width * height` whitespace-separated `r g b` triples, row-major. There is
/// no magic tag and no comment syntax. Anything after the last triple is
/// ignored.
pub fn decode_file(path: &Path) -> Result<Image, DecodeError> {
    let bytes = std::fs::read(path).map_err(|source| DecodeError::FileUnopenable {
        path: path.to_path_buf(),
        source,
    })?;
    // Non-UTF-8 bytes become U+FFFD, which no header or channel token accepts.
    let content = String::from_utf8_lossy(&bytes);
    let image = decode_str(&content).map_err(|kind| kind.at(path))?;
    debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "decoded frame"
    );
    Ok(image)
}

/// Decode pixel-map text that is already in memory.
pub fn decode_str(content: &str) -> Result<Image, DecodeErrorKind> {
    let mut tokens = content.split_ascii_whitespace();

    let mut header = [0u32; 3];
    for (i, slot) in header.iter_mut().enumerate() {
        let token = tokens
            .next()
            .ok_or_else(|| DecodeErrorKind::MalformedHeader(format!("missing header field {}", i + 1)))?;
        *slot = token
            .parse()
            .map_err(|_| DecodeErrorKind::MalformedHeader(format!("`{token}` is not a non-negative integer")))?;
    }
    let [width, height, max_channel_value] = header;

    let expected = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| DecodeErrorKind::MalformedHeader(format!("{width}x{height} overflows")))?;

    // Every pixel needs at least six bytes of text, so never reserve past that.
    let mut pixels = Vec::with_capacity(expected.min(content.len() / 6));
    let mut channels = [0u8; 3];
    for _ in 0..expected {
        for channel in channels.iter_mut() {
            let token = tokens.next().ok_or(DecodeErrorKind::TruncatedPixelData {
                expected,
                got: pixels.len(),
            })?;
            *channel = parse_channel(token, max_channel_value)?;
        }
        pixels.push(Pixel::new(channels[0], channels[1], channels[2]));
    }

    Image::new(width, height, max_channel_value, pixels)
        .map_err(|e| DecodeErrorKind::MalformedHeader(e.to_string()))
}

fn parse_channel(token: &str, max_channel_value: u32) -> Result<u8, DecodeErrorKind> {
    let value: u8 = token
        .parse()
        .map_err(|_| DecodeErrorKind::InvalidChannel(token.to_string()))?;
    if u32::from(value) > max_channel_value {
        return Err(DecodeErrorKind::ChannelOutOfRange {
            value,
            max: max_channel_value,
        });
    }
    Ok(value)
}

/// What went wrong while parsing, independent of where the bytes came from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeErrorKind {
    #[error("malformed header: {0}")]
    MalformedHeader(String),
    #[error("truncated pixel data: expected {expected} pixels, got {got}")]
    TruncatedPixelData { expected: usize, got: usize },
    #[error("`{0}` is not a channel value in 0..=255")]
    InvalidChannel(String),
    #[error("channel value {value} exceeds the declared maximum {max}")]
    ChannelOutOfRange { value: u8, max: u32 },
}

impl DecodeErrorKind {
    fn at(self, path: &Path) -> DecodeError {
        DecodeError::Invalid {
            path: path.to_path_buf(),
            kind: self,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("could not open frame {}: {source}", .path.display())]
    FileUnopenable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid frame {}: {kind}", .path.display())]
    Invalid { path: PathBuf, kind: DecodeErrorKind },
}
