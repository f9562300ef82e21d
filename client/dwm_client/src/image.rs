//! `.fbmp` images: a trivial container of raw ARGB pixels.

use std::path::Path;

use dwm_api_types::pixel::Pixel;
use dwm_api_types::rect::Rect;
use dwm_api_types::wire::Reader;

use crate::drawable::PixelView;

pub const FBMP_MAGIC: u32 = 0x706D_6266; // "fbmp" little-endian

#[derive(Debug, PartialEq, Eq)]
pub enum ImageError {
    Truncated,
    BadMagic,
    SizeMismatch,
}

#[derive(Debug)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}

impl Image {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let bytes = std::fs::read(path).map_err(|_| ImageError::Truncated)?;
        Self::from_bytes(&bytes)
    }

    /// Layout: `magic, width, height, pixel[width * height]`, little-endian.
    /// The byte count must match the header exactly.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        let mut r = Reader::new(bytes);
        let magic = r.get_u32().ok_or(ImageError::Truncated)?;
        if magic != FBMP_MAGIC {
            return Err(ImageError::BadMagic);
        }
        let width = r.get_u32().ok_or(ImageError::Truncated)?;
        let height = r.get_u32().ok_or(ImageError::Truncated)?;

        let count = width as usize * height as usize;
        if r.remaining() != count * 4 {
            return Err(ImageError::SizeMismatch);
        }
        let mut pixels = Vec::with_capacity(count);
        for _ in 0..count {
            pixels.push(Pixel(r.get_u32().ok_or(ImageError::Truncated)?));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Pixel::ZERO; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rect(&self) -> Rect {
        Rect::from_dim(0, 0, self.width as i32, self.height as i32)
    }

    pub fn pixels_mut(&mut self) -> &mut [Pixel] {
        &mut self.pixels
    }

    /// Read view used as a blit source.
    pub fn view(&self) -> PixelView<'_> {
        PixelView::new(&self.pixels, self.width, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(width: u32, height: u32, pixels: &[u32]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&FBMP_MAGIC.to_le_bytes());
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        for p in pixels {
            bytes.extend_from_slice(&p.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn decodes_well_formed_images() {
        let bytes = encode(2, 2, &[1, 2, 3, 4]);
        let image = Image::from_bytes(&bytes).unwrap();
        assert_eq!(image.width(), 2);
        assert_eq!(image.height(), 2);
        assert_eq!(image.view().pixel_at(1, 1), Pixel(4));
    }

    #[test]
    fn rejects_bad_magic_and_size_mismatch() {
        let mut bytes = encode(2, 2, &[1, 2, 3, 4]);
        bytes[0] = 0;
        assert_eq!(Image::from_bytes(&bytes).unwrap_err(), ImageError::BadMagic);

        let bytes = encode(2, 2, &[1, 2, 3]);
        assert_eq!(
            Image::from_bytes(&bytes).unwrap_err(),
            ImageError::SizeMismatch
        );
    }
}
