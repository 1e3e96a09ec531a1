/// One RGB pixel, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Pixel {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn channels(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// A decoded frame: `height` rows of `width` pixels, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    max_channel_value: u32,
    pixels: Vec<Pixel>,
}

impl Image {
    /// Build an image from row-major pixels. Fails unless exactly
    /// `width * height` pixels are supplied.
    pub fn new(
        width: u32,
        height: u32,
        max_channel_value: u32,
        pixels: Vec<Pixel>,
    ) -> Result<Self, ImageError> {
        let expected = pixel_count(width, height).ok_or(ImageError::TooLarge { width, height })?;
        if pixels.len() != expected {
            return Err(ImageError::PixelCount {
                expected,
                got: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            max_channel_value,
            pixels,
        })
    }

    /// An all-black image of the given size.
    pub fn blank(width: u32, height: u32, max_channel_value: u32) -> Result<Self, ImageError> {
        let count = pixel_count(width, height).ok_or(ImageError::TooLarge { width, height })?;
        Self::new(width, height, max_channel_value, vec![Pixel::default(); count])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn max_channel_value(&self) -> u32 {
        self.max_channel_value
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Pixel at column `x`, row `y`.
    pub fn get(&self, x: u32, y: u32) -> Option<&Pixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y as usize * self.width as usize + x as usize)
    }

    /// Iterate rows top to bottom, each exactly `width` pixels long.
    /// A `0xN` image yields `N` empty rows.
    pub fn rows(&self) -> impl Iterator<Item = &[Pixel]> {
        let width = self.width as usize;
        (0..self.height as usize).map(move |y| &self.pixels[y * width..(y + 1) * width])
    }

    /// Convert to an `image::RgbImage` for previews.
    pub fn to_rgb_image(&self) -> ::image::RgbImage {
        ::image::RgbImage::from_fn(self.width, self.height, |x, y| {
            let p = self.pixels[y as usize * self.width as usize + x as usize];
            ::image::Rgb(p.channels())
        })
    }
}

fn pixel_count(width: u32, height: u32) -> Option<usize> {
    (width as usize).checked_mul(height as usize)
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image {width}x{height} is too large to address")]
    TooLarge { width: u32, height: u32 },
    #[error("expected {expected} pixels, got {got}")]
    PixelCount { expected: usize, got: usize },
}
