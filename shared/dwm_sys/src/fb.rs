//! Framebuffer device access.
//!
//! `/dev/fb/0/info` describes the scan-out geometry; `/dev/fb/0/buffer` is
//! the pixel store. Only 32-bit ARGB is supported; anything else is fatal at
//! server startup.

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::FileExt;
use std::path::Path;

use dwm_api_types::pixel::Pixel;
use dwm_api_types::rect::Rect;

pub const FB_INFO_PATH: &str = "/dev/fb/0/info";
pub const FB_BUFFER_PATH: &str = "/dev/fb/0/buffer";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FbFormat {
    Argb32,
}

#[derive(Clone, Debug)]
pub struct FramebufferInfo {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Row pitch in pixels.
    pub stride: u32,
    pub format: FbFormat,
}

/// The scan-out target. `scanout` hands the server the mapped front-buffer
/// pixels; `flush` pushes a dirty rect to the device when the mapping is a
/// shadow rather than the real thing.
pub trait Framebuffer {
    fn info(&self) -> &FramebufferInfo;

    fn scanout(&mut self) -> &mut [Pixel];

    fn flush(&mut self, _rect: &Rect) -> io::Result<()> {
        Ok(())
    }
}

/// In-memory framebuffer used by tests (and useful headless).
pub struct MemFramebuffer {
    info: FramebufferInfo,
    pixels: Vec<Pixel>,
}

impl MemFramebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            info: FramebufferInfo {
                name: "mem".into(),
                width,
                height,
                stride: width,
                format: FbFormat::Argb32,
            },
            pixels: vec![Pixel::ZERO; (width * height) as usize],
        }
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn pixel_at(&self, x: i32, y: i32) -> Pixel {
        self.pixels[(y as u32 * self.info.stride + x as u32) as usize]
    }
}

impl Framebuffer for MemFramebuffer {
    fn info(&self) -> &FramebufferInfo {
        &self.info
    }

    fn scanout(&mut self) -> &mut [Pixel] {
        &mut self.pixels
    }
}

/// Production framebuffer: a shadow mapping flushed to the device file.
pub struct DevFramebuffer {
    info: FramebufferInfo,
    shadow: Vec<Pixel>,
    device: File,
}

impl DevFramebuffer {
    pub fn open() -> io::Result<Self> {
        Self::open_at(FB_INFO_PATH, FB_BUFFER_PATH)
    }

    pub fn open_at(info_path: impl AsRef<Path>, buffer_path: impl AsRef<Path>) -> io::Result<Self> {
        let mut text = String::new();
        File::open(info_path)?.read_to_string(&mut text)?;
        let info = Self::parse_info(&text)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "bad framebuffer info"))?;

        let device = OpenOptions::new().write(true).open(buffer_path)?;
        let shadow = vec![Pixel::ZERO; (info.stride * info.height) as usize];
        Ok(Self {
            info,
            shadow,
            device,
        })
    }

    /// Info format: `name width height stride format`, whitespace separated.
    fn parse_info(text: &str) -> Option<FramebufferInfo> {
        let mut fields = text.split_whitespace();
        let name = fields.next()?.to_string();
        let width = fields.next()?.parse().ok()?;
        let height = fields.next()?.parse().ok()?;
        let stride = fields.next()?.parse().ok()?;
        let format = match fields.next()? {
            "FB_ARGB32" => FbFormat::Argb32,
            _ => return None,
        };
        Some(FramebufferInfo {
            name,
            width,
            height,
            stride,
            format,
        })
    }
}

impl Framebuffer for DevFramebuffer {
    fn info(&self) -> &FramebufferInfo {
        &self.info
    }

    fn scanout(&mut self) -> &mut [Pixel] {
        &mut self.shadow
    }

    fn flush(&mut self, rect: &Rect) -> io::Result<()> {
        let stride = self.info.stride as usize;
        let width = rect.width().max(0) as usize;
        if width == 0 {
            return Ok(());
        }
        for y in rect.top..rect.bottom {
            let start = y as usize * stride + rect.left as usize;
            let row = &self.shadow[start..start + width];
            let bytes: Vec<u8> = row.iter().flat_map(|p| p.0.to_le_bytes()).collect();
            self.device.write_all_at(&bytes, (start * 4) as u64)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_info_accepts_spec_format() {
        let info = DevFramebuffer::parse_info("vga0 1024 768 1024 FB_ARGB32").unwrap();
        assert_eq!(info.width, 1024);
        assert_eq!(info.height, 768);
        assert_eq!(info.stride, 1024);
        assert_eq!(info.format, FbFormat::Argb32);
    }

    #[test]
    fn parse_info_rejects_unknown_format() {
        assert!(DevFramebuffer::parse_info("vga0 640 480 640 FB_RGB565").is_none());
        assert!(DevFramebuffer::parse_info("vga0 640").is_none());
    }

    #[test]
    fn mem_framebuffer_is_zeroed() {
        let fb = MemFramebuffer::new(4, 2);
        assert_eq!(fb.pixels().len(), 8);
        assert!(fb.pixels().iter().all(|&p| p == Pixel::ZERO));
    }
}
