use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Unlit pixels produce no display entity.
    pub fn is_unlit(self) -> bool {
        self.a == 0 || (self.r == 0 && self.g == 0 && self.b == 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("pixel count mismatch: expected {expected}, got {actual}")]
    PixelCountMismatch { expected: usize, actual: usize },
}

/// One decoded video frame. Row-major, row 0 first.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: Vec<Rgba>) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize;
        let actual = pixels.len();
        if expected != actual {
            return Err(FrameError::PixelCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    pub(crate) fn from_rgba_image(image: &image::RgbaImage) -> Self {
        let pixels = image
            .pixels()
            .map(|pixel| {
                let [r, g, b, a] = pixel.0;
                Rgba::new(r, g, b, a)
            })
            .collect();
        Self {
            width: image.width(),
            height: image.height(),
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        self.index_of(x, y)
            .and_then(|index| self.pixels.get(index).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_pixel_count_mismatch() {
        let err = Frame::new(2, 2, vec![Rgba::BLACK; 3]).expect_err("err");
        assert_eq!(
            err,
            FrameError::PixelCountMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn pixel_reads_row_major_and_rejects_out_of_range() {
        let mut pixels = vec![Rgba::BLACK; 4 * 2];
        pixels[4 + 3] = Rgba::opaque(10, 20, 30);
        let frame = Frame::new(4, 2, pixels).expect("frame");

        assert_eq!(frame.pixel(3, 1), Some(Rgba::opaque(10, 20, 30)));
        assert_eq!(frame.pixel(0, 0), Some(Rgba::BLACK));
        assert_eq!(frame.pixel(4, 0), None);
        assert_eq!(frame.pixel(0, 2), None);
    }

    #[test]
    fn unlit_rule_covers_transparent_and_pure_black() {
        assert!(Rgba::TRANSPARENT.is_unlit());
        assert!(Rgba::new(255, 255, 255, 0).is_unlit());
        assert!(Rgba::BLACK.is_unlit());
        assert!(!Rgba::opaque(1, 0, 0).is_unlit());
        assert!(!Rgba::new(0, 0, 1, 10).is_unlit());
    }
}
