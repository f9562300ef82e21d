//! Double-buffered scan-out.
//!
//! The screen owns the framebuffer mapping and a same-sized back buffer.
//! Surfaces are transferred into the back buffer; `swap` copies only the
//! invalid region to the front. Fullscreen surfaces bypass the back buffer
//! entirely.

use dwm_api_types::pixel::Pixel;
use dwm_api_types::point::Point;
use dwm_api_types::rect::Rect;
use dwm_sys::fb::Framebuffer;

use crate::region::Region;

pub struct Screen<F: Framebuffer> {
    fb: F,
    width: u32,
    height: u32,
    stride: u32,
    back: Vec<Pixel>,
    rect: Rect,
    invalid: Region,
}

impl<F: Framebuffer> Screen<F> {
    pub fn new(mut fb: F) -> Self {
        let info = fb.info().clone();
        let rect = Rect::from_dim(0, 0, info.width as i32, info.height as i32);

        fb.scanout().fill(Pixel::ZERO);
        let _ = fb.flush(&rect);

        Self {
            fb,
            width: info.width,
            height: info.height,
            stride: info.stride,
            back: vec![Pixel::ZERO; (info.stride * info.height) as usize],
            rect,
            invalid: Region::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn framebuffer(&self) -> &F {
        &self.fb
    }

    pub fn back_pixels(&self) -> &[Pixel] {
        &self.back
    }

    fn invalidate(&mut self, rect: &Rect) {
        let fit = rect.fitted(&self.rect);
        self.invalid.add(&fit);
    }

    /// Clipped source geometry for a screen-space destination rect: returns
    /// `(dest, src_origin)` or `None` when nothing survives clipping.
    fn clip(&self, src_size: (u32, u32), src_pos: Point, rect: &Rect) -> Option<(Rect, Point)> {
        let mut fit = rect.fitted(&self.rect);
        let src_rect = Rect::from_dim(src_pos.x, src_pos.y, src_size.0 as i32, src_size.1 as i32);
        fit.fit(&src_rect);
        if fit.is_empty() {
            return None;
        }
        Some((fit, Point::new(fit.left - src_pos.x, fit.top - src_pos.y)))
    }

    /// Source-copies surface pixels into the back buffer over the given
    /// screen-space rect, clipped to both the screen and the surface.
    pub fn transfer(&mut self, src: &[Pixel], src_size: (u32, u32), src_pos: Point, rect: &Rect) {
        let Some((fit, origin)) = self.clip(src_size, src_pos, rect) else {
            return;
        };
        let width = fit.width() as usize;
        for y in 0..fit.height() {
            let src_start = (origin.x + (origin.y + y) * src_size.0 as i32) as usize;
            let dest_start = (fit.left + (fit.top + y) * self.stride as i32) as usize;
            self.back[dest_start..dest_start + width]
                .copy_from_slice(&src[src_start..src_start + width]);
        }
        self.invalidate(rect);
    }

    /// Like `transfer` but blending each source pixel over the back buffer.
    pub fn transfer_blend(
        &mut self,
        src: &[Pixel],
        src_size: (u32, u32),
        src_pos: Point,
        rect: &Rect,
    ) {
        let Some((fit, origin)) = self.clip(src_size, src_pos, rect) else {
            return;
        };
        for y in 0..fit.height() {
            for x in 0..fit.width() {
                let pixel = src[((origin.x + x) + (origin.y + y) * src_size.0 as i32) as usize];
                let dest = &mut self.back
                    [((fit.left + x) + (fit.top + y) * self.stride as i32) as usize];
                *dest = dest.blend(pixel);
            }
        }
        self.invalidate(&fit);
    }

    /// Copies surface pixels straight to the front buffer, bypassing the back
    /// buffer, and drops any pending swap work. Only fullscreen surfaces that
    /// own the whole screen take this path.
    pub fn transfer_frontbuffer(
        &mut self,
        src: &[Pixel],
        src_size: (u32, u32),
        src_pos: Point,
        rect: &Rect,
    ) {
        let Some((fit, origin)) = self.clip(src_size, src_pos, rect) else {
            return;
        };
        let width = fit.width() as usize;
        let stride = self.stride as i32;
        let front = self.fb.scanout();
        for y in 0..fit.height() {
            let src_start = (origin.x + (origin.y + y) * src_size.0 as i32) as usize;
            let dest_start = (fit.left + (fit.top + y) * stride) as usize;
            front[dest_start..dest_start + width]
                .copy_from_slice(&src[src_start..src_start + width]);
        }
        let _ = self.fb.flush(&fit);
        self.invalid.clear();
    }

    /// Copies every invalid rect from back to front, then clears the region.
    pub fn swap(&mut self) {
        let stride = self.stride as i32;
        for rect in self.invalid.rects() {
            let width = rect.width() as usize;
            let front = self.fb.scanout();
            for y in rect.top..rect.bottom {
                let start = (rect.left + y * stride) as usize;
                front[start..start + width].copy_from_slice(&self.back[start..start + width]);
            }
            let _ = self.fb.flush(rect);
        }
        self.invalid.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwm_sys::fb::MemFramebuffer;

    fn filled(width: u32, height: u32, pixel: Pixel) -> Vec<Pixel> {
        vec![pixel; (width * height) as usize]
    }

    #[test]
    fn transfer_then_swap_reaches_front_buffer() {
        let mut screen = Screen::new(MemFramebuffer::new(16, 16));
        let src = filled(4, 4, Pixel::rgb(9, 9, 9));

        screen.transfer(&src, (4, 4), Point::new(2, 3), &Rect::from_dim(2, 3, 4, 4));
        // Back buffer has the pixels, the front does not yet.
        assert_eq!(screen.back_pixels()[3 * 16 + 2], Pixel::rgb(9, 9, 9));
        assert_eq!(screen.framebuffer().pixel_at(2, 3), Pixel::ZERO);

        screen.swap();
        assert_eq!(screen.framebuffer().pixel_at(2, 3), Pixel::rgb(9, 9, 9));
        assert_eq!(screen.framebuffer().pixel_at(5, 6), Pixel::rgb(9, 9, 9));
        assert_eq!(screen.framebuffer().pixel_at(6, 3), Pixel::ZERO);
    }

    #[test]
    fn transfer_clips_to_screen_and_surface() {
        let mut screen = Screen::new(MemFramebuffer::new(8, 8));
        let src = filled(4, 4, Pixel::rgb(1, 1, 1));

        // Surface partially off-screen to the top-left.
        screen.transfer(&src, (4, 4), Point::new(-2, -2), &Rect::from_dim(-2, -2, 4, 4));
        screen.swap();
        assert_eq!(screen.framebuffer().pixel_at(0, 0), Pixel::rgb(1, 1, 1));
        assert_eq!(screen.framebuffer().pixel_at(1, 1), Pixel::rgb(1, 1, 1));
        assert_eq!(screen.framebuffer().pixel_at(2, 2), Pixel::ZERO);

        // Rect larger than the surface: the copy stops at the surface edge.
        let mut screen = Screen::new(MemFramebuffer::new(8, 8));
        screen.transfer(&src, (4, 4), Point::new(0, 0), &Rect::from_dim(0, 0, 6, 6));
        screen.swap();
        assert_eq!(screen.framebuffer().pixel_at(3, 3), Pixel::rgb(1, 1, 1));
        assert_eq!(screen.framebuffer().pixel_at(4, 4), Pixel::ZERO);
    }

    #[test]
    fn swap_without_damage_is_a_no_op() {
        let mut screen = Screen::new(MemFramebuffer::new(4, 4));
        let before: Vec<Pixel> = screen.framebuffer().pixels().to_vec();
        screen.swap();
        assert_eq!(screen.framebuffer().pixels(), &before[..]);
    }

    #[test]
    fn transfer_blend_blends_over_back_buffer() {
        let mut screen = Screen::new(MemFramebuffer::new(4, 4));
        let opaque = filled(2, 2, Pixel::rgb(10, 20, 30));
        screen.transfer(&opaque, (2, 2), Point::new(0, 0), &Rect::from_dim(0, 0, 2, 2));

        // A transparent overlay leaves the underlying pixels alone.
        let clear = filled(2, 2, Pixel::ZERO);
        screen.transfer_blend(&clear, (2, 2), Point::new(0, 0), &Rect::from_dim(0, 0, 2, 2));
        assert_eq!(screen.back_pixels()[0], Pixel::rgb(10, 20, 30));

        // An opaque overlay replaces them.
        let red = filled(2, 2, Pixel::rgb(255, 0, 0));
        screen.transfer_blend(&red, (2, 2), Point::new(0, 0), &Rect::from_dim(0, 0, 2, 2));
        assert_eq!(screen.back_pixels()[0], Pixel::rgb(255, 0, 0));
    }

    #[test]
    fn transfer_frontbuffer_bypasses_back_buffer() {
        let mut screen = Screen::new(MemFramebuffer::new(8, 8));
        let src = filled(8, 8, Pixel::rgb(5, 5, 5));

        // Leave stale damage behind, then take the fullscreen path.
        let other = filled(2, 2, Pixel::rgb(1, 1, 1));
        screen.transfer(&other, (2, 2), Point::new(0, 0), &Rect::from_dim(0, 0, 2, 2));

        screen.transfer_frontbuffer(&src, (8, 8), Point::new(0, 0), &Rect::from_dim(0, 0, 8, 8));
        assert_eq!(screen.framebuffer().pixel_at(7, 7), Pixel::rgb(5, 5, 5));

        // The pending swap work was discarded along with the invalid region.
        screen.swap();
        assert_eq!(screen.framebuffer().pixel_at(0, 0), Pixel::rgb(5, 5, 5));
    }
}
