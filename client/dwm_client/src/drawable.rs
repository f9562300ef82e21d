//! Software 2D primitives over a borrowed pixel buffer.
//!
//! A drawable is a clipped view onto a rectangular sub-region of some pixel
//! buffer (a window's shared surface, an image, a test canvas). Every
//! primitive clips to the content rect and unions the touched area into the
//! drawable's invalid rect; whoever owns the drawable decides when to flush
//! that damage.

use std::convert::Infallible;
use std::rc::Rc;

use embedded_graphics::Pixel as EgPixel;
use embedded_graphics::draw_target::DrawTarget;
use embedded_graphics::geometry::Size;
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::OriginDimensions;
use rand::Rng;
use unicode_segmentation::UnicodeSegmentation;

use dwm_api_types::pixel::Pixel;
use dwm_api_types::point::Point;
use dwm_api_types::rect::Rect;

use crate::font::Font;
use crate::image::Image;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Center,
    Max,
    Min,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Vertical,
    Horizontal,
    Diagonal,
}

/// A read-only blit source.
#[derive(Clone, Copy)]
pub struct PixelView<'a> {
    pixels: &'a [Pixel],
    stride: u32,
    width: u32,
    height: u32,
}

impl<'a> PixelView<'a> {
    pub fn new(pixels: &'a [Pixel], stride: u32, width: u32, height: u32) -> Self {
        Self {
            pixels,
            stride,
            width,
            height,
        }
    }

    pub fn width(&self) -> i32 {
        self.width as i32
    }

    pub fn height(&self) -> i32 {
        self.height as i32
    }

    pub fn pixel_at(&self, x: i32, y: i32) -> Pixel {
        self.pixels[(y * self.stride as i32 + x) as usize]
    }
}

pub struct Drawable<'a> {
    buffer: &'a mut [Pixel],
    stride: u32,
    origin: Point,
    content: Rect,
    invalid: Rect,
    default_font: Option<Rc<Font>>,
}

impl<'a> Drawable<'a> {
    /// A view of `width * height` pixels whose top-left corner sits at
    /// `origin` inside `buffer` (row pitch `stride`). Degenerate dimensions
    /// yield an empty view that absorbs every draw call.
    pub fn new(buffer: &'a mut [Pixel], stride: u32, origin: Point, width: i32, height: i32) -> Self {
        Self {
            buffer,
            stride,
            origin,
            content: Rect::from_dim(0, 0, width.max(0), height.max(0)),
            invalid: Rect::ZERO,
            default_font: None,
        }
    }

    pub fn with_default_font(mut self, font: Option<Rc<Font>>) -> Self {
        self.default_font = font;
        self
    }

    pub fn content_rect(&self) -> Rect {
        self.content
    }

    pub fn invalid_rect(&self) -> Rect {
        self.invalid
    }

    /// Marks `rect` (or the whole content for `None`) as needing a flush.
    pub fn invalidate(&mut self, rect: Option<&Rect>) {
        let Some(rect) = rect else {
            self.invalid = self.content;
            return;
        };
        if self.invalid.area() == 0 {
            self.invalid = *rect;
        } else {
            self.invalid.expand_to_contain(rect);
        }
    }

    fn index(&self, x: i32, y: i32) -> usize {
        ((self.origin.y + y) * self.stride as i32 + self.origin.x + x) as usize
    }

    pub fn pixel_at(&self, x: i32, y: i32) -> Pixel {
        self.buffer[self.index(x, y)]
    }

    fn put(&mut self, x: i32, y: i32, pixel: Pixel) {
        if self.content.contains_point(Point::new(x, y)) {
            let index = self.index(x, y);
            self.buffer[index] = pixel;
        }
    }

    fn blend(&mut self, x: i32, y: i32, pixel: Pixel) {
        if self.content.contains_point(Point::new(x, y)) {
            let index = self.index(x, y);
            self.buffer[index] = self.buffer[index].blend(pixel);
        }
    }

    // ─── Fills and borders ─────────────────────────────────────────────────

    pub fn rect(&mut self, rect: &Rect, pixel: Pixel) {
        let fit = rect.fitted(&self.content);
        if fit.is_empty() {
            return;
        }
        let width = fit.width() as usize;
        for y in fit.top..fit.bottom {
            let start = self.index(fit.left, y);
            self.buffer[start..start + width].fill(pixel);
        }
        self.invalidate(Some(&fit));
    }

    /// Skeuomorphic frame: top and left edges in `fg`, bottom and right in
    /// `bg`, with a mitred diagonal at the two mixed corners.
    pub fn frame(&mut self, rect: &Rect, width: i32, fg: Pixel, bg: Pixel) {
        let fit = rect.fitted(&self.content);
        if fit.is_empty() || width <= 0 {
            return;
        }

        self.rect(
            &Rect::new(fit.left, fit.top, fit.left + width, fit.bottom - width),
            fg,
        );
        self.rect(
            &Rect::new(fit.left + width, fit.top, fit.right - width, fit.top + width),
            fg,
        );
        self.rect(
            &Rect::new(fit.right - width, fit.top + width, fit.right, fit.bottom),
            bg,
        );
        self.rect(
            &Rect::new(fit.left + width, fit.bottom - width, fit.right - width, fit.bottom),
            bg,
        );

        for y in 0..width {
            for x in 0..width {
                let color = if x + y < width - 1 { fg } else { bg };
                self.put(fit.right - width + x, fit.top + y, color);
                self.put(fit.left + x, fit.bottom - width + y, color);
            }
        }

        self.invalidate(Some(&fit));
    }

    /// Constant-color border with half-width corner insets so the four side
    /// bars overlap cleanly.
    pub fn bezel(&mut self, rect: &Rect, width: i32, pixel: Pixel) {
        let inset = width - width / 2;
        self.rect(
            &Rect::new(rect.left, rect.top + inset, rect.left + width, rect.bottom - inset),
            pixel,
        );
        self.rect(
            &Rect::new(rect.left + inset, rect.top, rect.right - inset, rect.top + width),
            pixel,
        );
        self.rect(
            &Rect::new(rect.right - width, rect.top + inset, rect.right, rect.bottom - inset),
            pixel,
        );
        self.rect(
            &Rect::new(rect.left + inset, rect.bottom - width, rect.right - inset, rect.bottom),
            pixel,
        );
    }

    /// Dashed outline just inside `rect`: solid for `length`, blank for
    /// `length`, `width` pixels thick. Corners count as horizontal.
    pub fn outline(&mut self, rect: &Rect, pixel: Pixel, length: u32, width: i32) {
        let fit = rect.fitted(&self.content);
        if fit.is_empty() || length == 0 {
            return;
        }
        let period = (length * 2) as i32;

        for w in 0..width {
            for x in fit.left..fit.right {
                if (x - fit.left) % period < length as i32 {
                    self.put(x, fit.top + w, pixel);
                    if fit.bottom - 1 - w > fit.top + w {
                        self.put(x, fit.bottom - 1 - w, pixel);
                    }
                }
            }
        }
        for w in 0..width {
            for y in fit.top + width..fit.bottom - width {
                if (y - fit.top - width) % period < length as i32 {
                    self.put(fit.left + w, y, pixel);
                    if fit.right - 1 - w > fit.left + w {
                        self.put(fit.right - 1 - w, y, pixel);
                    }
                }
            }
        }

        self.invalidate(Some(&fit));
    }

    /// Linear gradient with integer interpolation. Noise dithers each channel
    /// independently by up to two steps to hide banding.
    pub fn gradient(
        &mut self,
        rect: &Rect,
        start: Pixel,
        end: Pixel,
        direction: Direction,
        add_noise: bool,
    ) {
        let fit = rect.fitted(&self.content);
        if fit.is_empty() {
            return;
        }
        let width = fit.width();
        let height = fit.height();

        let delta_r = end.red() as i32 - start.red() as i32;
        let delta_g = end.green() as i32 - start.green() as i32;
        let delta_b = end.blue() as i32 - start.blue() as i32;
        let mut rng = rand::thread_rng();

        for y in fit.top..fit.bottom {
            for x in fit.left..fit.right {
                let (num, denom) = match direction {
                    Direction::Vertical => (y - fit.top, height),
                    Direction::Horizontal => (x - fit.left, width),
                    Direction::Diagonal => ((x - fit.left) + (y - fit.top), width + height),
                };

                let mut red = start.red() as i32 + num * delta_r / denom;
                let mut green = start.green() as i32 + num * delta_g / denom;
                let mut blue = start.blue() as i32 + num * delta_b / denom;

                if add_noise {
                    red = (red + rng.gen_range(-2..=2)).clamp(0, 255);
                    green = (green + rng.gen_range(-2..=2)).clamp(0, 255);
                    blue = (blue + rng.gen_range(-2..=2)).clamp(0, 255);
                }

                let index = self.index(x, y);
                self.buffer[index] = Pixel::argb(255, red as u8, green as u8, blue as u8);
            }
        }

        self.invalidate(Some(&fit));
    }

    // ─── Blits ─────────────────────────────────────────────────────────────

    fn transfer_bounds_ok(&self, src: &PixelView, dest_rect: &Rect, src_point: Point) -> bool {
        let width = dest_rect.width();
        let height = dest_rect.height();
        if width <= 0 || height <= 0 {
            return false;
        }
        if src_point.x < 0
            || src_point.y < 0
            || src_point.x + width > src.width()
            || src_point.y + height > src.height()
        {
            return false;
        }
        dest_rect.left >= 0
            && dest_rect.top >= 0
            && dest_rect.left + width <= self.content.width()
            && dest_rect.top + height <= self.content.height()
    }

    /// Source-copy blit. Rejects (rather than clips) out-of-bounds requests
    /// on either side.
    pub fn transfer(&mut self, src: &PixelView, dest_rect: &Rect, src_point: Point) {
        if !self.transfer_bounds_ok(src, dest_rect, src_point) {
            return;
        }
        let width = dest_rect.width() as usize;
        for y in 0..dest_rect.height() {
            let start = self.index(dest_rect.left, dest_rect.top + y);
            let src_start = ((src_point.y + y) * src.stride as i32 + src_point.x) as usize;
            self.buffer[start..start + width]
                .copy_from_slice(&src.pixels[src_start..src_start + width]);
        }
        self.invalidate(Some(dest_rect));
    }

    /// Per-pixel alpha blend blit.
    pub fn transfer_blend(&mut self, src: &PixelView, dest_rect: &Rect, src_point: Point) {
        if !self.transfer_bounds_ok(src, dest_rect, src_point) {
            return;
        }
        for y in 0..dest_rect.height() {
            for x in 0..dest_rect.width() {
                let pixel = src.pixel_at(src_point.x + x, src_point.y + y);
                self.blend(dest_rect.left + x, dest_rect.top + y, pixel);
            }
        }
        self.invalidate(Some(dest_rect));
    }

    /// Self-to-self copy within this drawable; rows are moved overlap-safely.
    pub fn transfer_within(&mut self, dest_rect: &Rect, src_point: Point) {
        let width = dest_rect.width();
        let height = dest_rect.height();
        if width <= 0 || height <= 0 {
            return;
        }
        let content_w = self.content.width();
        let content_h = self.content.height();
        if src_point.x < 0
            || src_point.y < 0
            || src_point.x + width > content_w
            || src_point.y + height > content_h
            || dest_rect.left < 0
            || dest_rect.top < 0
            || dest_rect.left + width > content_w
            || dest_rect.top + height > content_h
        {
            return;
        }

        let rows: Box<dyn Iterator<Item = i32>> = if dest_rect.top > src_point.y {
            Box::new((0..height).rev())
        } else {
            Box::new(0..height)
        };
        for y in rows {
            let src_start = self.index(src_point.x, src_point.y + y);
            let dest_start = self.index(dest_rect.left, dest_rect.top + y);
            self.buffer
                .copy_within(src_start..src_start + width as usize, dest_start);
        }
        self.invalidate(Some(dest_rect));
    }

    pub fn image(&mut self, image: &Image, dest_rect: &Rect, src_point: Point) {
        self.transfer(&image.view(), dest_rect, src_point);
    }

    pub fn image_blend(&mut self, image: &Image, dest_rect: &Rect, src_point: Point) {
        self.transfer_blend(&image.view(), dest_rect, src_point);
    }

    // ─── Text ──────────────────────────────────────────────────────────────

    fn resolve_font(&self, font: Option<&Rc<Font>>) -> Option<Rc<Font>> {
        font.cloned().or_else(|| self.default_font.clone())
    }

    fn glyph_blit(&mut self, font: &Font, pos: Point, ch: u8, pixel: Pixel) {
        let Some(glyph) = font.glyph(ch) else {
            return;
        };
        let baseline = pos.y + font.ascender() as i32;
        for y in 0..glyph.height as i32 {
            for x in 0..glyph.width as i32 {
                let gray = glyph.coverage[(y * glyph.width as i32 + x) as usize];
                if gray == 0 {
                    continue;
                }
                let target_x = pos.x + glyph.bearing_x as i32 + x;
                let target_y = baseline - glyph.bearing_y as i32 + y;
                self.blend(
                    target_x,
                    target_y,
                    Pixel::argb(gray, pixel.red(), pixel.green(), pixel.blue()),
                );
            }
        }
    }

    /// Draws the glyphs of `text` starting at `point` (top-left of the line
    /// box). Characters without glyphs are skipped silently.
    pub fn string(&mut self, font: Option<&Rc<Font>>, point: Point, pixel: Pixel, text: &str) {
        let Some(font) = self.resolve_font(font) else {
            return;
        };
        self.string_bytes(&font, point, pixel, text.as_bytes());
    }

    fn string_bytes(&mut self, font: &Rc<Font>, point: Point, pixel: Pixel, bytes: &[u8]) {
        let mut pos = point;
        for (i, &ch) in bytes.iter().enumerate() {
            if let Some(glyph) = font.glyph(ch) {
                self.glyph_blit(font, pos, ch, pixel);
                pos.x += glyph.advance_x as i32;
                if i != bytes.len() - 1 {
                    pos.x += font.kerning(ch, bytes[i + 1]) as i32;
                }
            }
        }

        let area = Rect::from_dim(point.x, point.y, font.width_bytes(bytes), font.visual_height());
        self.invalidate(Some(&area));
    }

    fn aligned_text_pos(
        rect: &Rect,
        text_width: i32,
        text_height: i32,
        x_align: Align,
        y_align: Align,
    ) -> Point {
        let x = match x_align {
            Align::Min => rect.left,
            Align::Center => (rect.left + rect.width() / 2 - text_width / 2).max(rect.left),
            Align::Max => (rect.left + rect.width() - text_width).max(rect.left),
        };
        let y = match y_align {
            Align::Min => rect.top,
            Align::Center => rect.top + rect.height() / 2 - text_height / 2,
            Align::Max => rect.top + rect.height() - text_height,
        };
        Point::new(x, y)
    }

    /// Single-line text fitted to `rect`: aligned when it fits, otherwise as
    /// many leading characters as possible followed by `...` (or a truncated
    /// ellipsis when even that is too wide). Never draws outside `rect`.
    pub fn text(
        &mut self,
        rect: &Rect,
        font: Option<&Rc<Font>>,
        x_align: Align,
        y_align: Align,
        pixel: Pixel,
        text: &str,
    ) {
        if text.is_empty() {
            return;
        }
        let Some(font) = self.resolve_font(font) else {
            return;
        };

        let max_width = rect.width();
        let text_width = font.width(text);
        let height = font.visual_height();

        if text_width <= max_width {
            let pos = Self::aligned_text_pos(rect, text_width, height, x_align, y_align);
            self.string(Some(&font), pos, pixel, text);
            return;
        }

        const ELLIPSIS: &[u8] = b"...";
        let ellipsis_width = font.width_bytes(ELLIPSIS);
        let bytes = text.as_bytes();

        if ellipsis_width <= max_width {
            let mut fitted = 0;
            let mut used = 0;
            for (i, &ch) in bytes.iter().enumerate() {
                let char_width = font.width_bytes(&[ch]);
                if used + char_width + ellipsis_width > max_width {
                    break;
                }
                used += char_width;
                fitted = i + 1;
            }

            let head = &bytes[..fitted];
            let head_width = font.width_bytes(head);
            let pos = Self::aligned_text_pos(
                rect,
                head_width + ellipsis_width,
                height,
                x_align,
                y_align,
            );
            self.string_bytes(&font, pos, pixel, head);
            self.string_bytes(&font, Point::new(pos.x + head_width, pos.y), pixel, ELLIPSIS);
        } else {
            // Not even the ellipsis fits whole; draw its longest prefix.
            let mut fitted = 0;
            let mut used = 0;
            for (i, &ch) in ELLIPSIS.iter().enumerate() {
                let char_width = font.width_bytes(&[ch]);
                if used + char_width > max_width {
                    break;
                }
                used += char_width;
                fitted = i + 1;
            }
            let pos = Self::aligned_text_pos(rect, used, height, x_align, y_align);
            self.string_bytes(&font, pos, pixel, &ELLIPSIS[..fitted]);
        }
    }

    /// Multiline text with greedy word wrap on spaces and hard breaks on
    /// `\n`. Words wider than the rect still get their own line. Vertical
    /// alignment covers the total wrapped height; lines that would start
    /// below the rect are dropped.
    pub fn text_multiline(
        &mut self,
        rect: &Rect,
        font: Option<&Rc<Font>>,
        x_align: Align,
        y_align: Align,
        pixel: Pixel,
        text: &str,
    ) {
        if text.is_empty() {
            return;
        }
        let Some(font) = self.resolve_font(font) else {
            return;
        };

        let fit = rect.fitted(&self.content);
        let line_height = font.visual_height();
        let max_width = fit.width();

        let lines = wrap_lines(&font, text, max_width);
        let total_height = lines.len() as i32 * line_height;

        let mut y = match y_align {
            Align::Min => fit.top,
            Align::Center => fit.top + fit.height() / 2 - total_height / 2,
            Align::Max => fit.top + fit.height() - total_height,
        };

        for line in lines {
            if y + line_height > fit.bottom {
                break;
            }
            let line_width = font.width(line);
            let x = match x_align {
                Align::Min => fit.left,
                Align::Center => (fit.left + fit.width() / 2 - line_width / 2).max(fit.left),
                Align::Max => (fit.left + fit.width() - line_width).max(fit.left),
            };
            self.string(Some(&font), Point::new(x, y), pixel, line);
            y += line_height;
        }

        self.invalidate(Some(&fit));
    }

    // ─── Composite borders ─────────────────────────────────────────────────

    /// An inverted frame inside a frame, forming a raised ridge.
    pub fn ridge(&mut self, rect: &Rect, width: i32, fg: Pixel, bg: Pixel) {
        self.frame(rect, width / 2, bg, fg);
        let inner = rect.shrunk(width / 2);
        self.frame(&inner, width / 2, fg, bg);
    }

    /// Separator line: highlight half then shadow half along the axis.
    pub fn separator(&mut self, rect: &Rect, highlight: Pixel, shadow: Pixel, dir: Direction) {
        let fit = rect.fitted(&self.content);
        if fit.is_empty() {
            return;
        }
        match dir {
            Direction::Horizontal => {
                let mid = fit.left + fit.width() / 2;
                self.rect(&Rect::new(fit.left, fit.top, mid, fit.bottom), highlight);
                self.rect(&Rect::new(mid, fit.top, fit.right, fit.bottom), shadow);
            }
            Direction::Vertical => {
                let mid = fit.top + fit.height() / 2;
                self.rect(&Rect::new(fit.left, fit.top, fit.right, mid), highlight);
                self.rect(&Rect::new(fit.left, mid, fit.right, fit.bottom), shadow);
            }
            Direction::Diagonal => {}
        }
        self.invalidate(Some(&fit));
    }
}

/// Greedy word wrap: hard lines on `\n`, soft breaks at the last word
/// boundary that fits. A word wider than `max_width` occupies its own line.
fn wrap_lines<'t>(font: &Font, text: &'t str, max_width: i32) -> Vec<&'t str> {
    let mut lines = Vec::new();
    for hard in text.split('\n') {
        if hard.is_empty() {
            lines.push("");
            continue;
        }

        let mut line_start = 0usize;
        let mut cursor = 0usize;
        let mut line_width = 0i32;
        for seg in hard.split_word_bounds() {
            let seg_width = font.width(seg);
            let is_space = seg.chars().all(char::is_whitespace);
            if !is_space && line_width + seg_width > max_width && cursor > line_start {
                lines.push(hard[line_start..cursor].trim_end_matches(' '));
                line_start = cursor;
                line_width = 0;
            }
            line_width += seg_width;
            cursor += seg.len();
        }
        lines.push(hard[line_start..].trim_end_matches(' '));
    }
    lines
}

impl OriginDimensions for Drawable<'_> {
    fn size(&self) -> Size {
        Size::new(self.content.width() as u32, self.content.height() as u32)
    }
}

impl DrawTarget for Drawable<'_> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = EgPixel<Self::Color>>,
    {
        for EgPixel(point, color) in pixels {
            let p = Point::new(point.x, point.y);
            if self.content.contains_point(p) {
                self.put(p.x, p.y, Pixel::rgb(color.r(), color.g(), color.b()));
                self.invalidate(Some(&Rect::from_dim(p.x, p.y, 1, 1)));
            }
        }
        Ok(())
    }

    fn fill_solid(
        &mut self,
        area: &embedded_graphics::primitives::Rectangle,
        color: Self::Color,
    ) -> Result<(), Self::Error> {
        let rect = Rect::from_dim(
            area.top_left.x,
            area.top_left.y,
            area.size.width as i32,
            area.size.height as i32,
        );
        self.rect(&rect, Pixel::rgb(color.r(), color.g(), color.b()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::testing::{TEST_ADVANCE, test_font};

    struct Canvas {
        pixels: Vec<Pixel>,
        width: i32,
        height: i32,
    }

    impl Canvas {
        fn new(width: i32, height: i32) -> Self {
            Self {
                pixels: vec![Pixel::ZERO; (width * height) as usize],
                width,
                height,
            }
        }

        fn draw(&mut self) -> Drawable<'_> {
            Drawable::new(&mut self.pixels, self.width as u32, Point::ZERO, self.width, self.height)
        }

        fn at(&self, x: i32, y: i32) -> Pixel {
            self.pixels[(y * self.width + x) as usize]
        }
    }

    const RED: Pixel = Pixel::rgb(255, 0, 0);
    const BLUE: Pixel = Pixel::rgb(0, 0, 255);

    #[test]
    fn rect_clips_and_accumulates_invalid() {
        let mut canvas = Canvas::new(10, 10);
        let mut draw = canvas.draw();

        draw.rect(&Rect::new(-5, -5, 3, 3), RED);
        assert_eq!(draw.invalid_rect(), Rect::new(0, 0, 3, 3));
        draw.rect(&Rect::new(8, 8, 20, 20), BLUE);
        assert_eq!(draw.invalid_rect(), Rect::new(0, 0, 10, 10));

        drop(draw);
        assert_eq!(canvas.at(0, 0), RED);
        assert_eq!(canvas.at(2, 2), RED);
        assert_eq!(canvas.at(3, 3), Pixel::ZERO);
        assert_eq!(canvas.at(9, 9), BLUE);
    }

    #[test]
    fn frame_paints_fg_top_left_and_bg_bottom_right() {
        let mut canvas = Canvas::new(10, 10);
        let mut draw = canvas.draw();
        draw.frame(&Rect::new(0, 0, 10, 10), 2, RED, BLUE);
        drop(draw);

        assert_eq!(canvas.at(0, 5), RED); // left edge
        assert_eq!(canvas.at(5, 0), RED); // top edge
        assert_eq!(canvas.at(9, 5), BLUE); // right edge
        assert_eq!(canvas.at(5, 9), BLUE); // bottom edge
        assert_eq!(canvas.at(5, 5), Pixel::ZERO); // interior untouched
        // Mitred corner: above the anti-diagonal is fg, below is bg.
        assert_eq!(canvas.at(8, 0), RED);
        assert_eq!(canvas.at(9, 1), BLUE);
    }

    #[test]
    fn gradient_interpolates_between_endpoints() {
        let mut canvas = Canvas::new(4, 8);
        let mut draw = canvas.draw();
        draw.gradient(
            &Rect::new(0, 0, 4, 8),
            Pixel::rgb(0, 0, 0),
            Pixel::rgb(80, 160, 240),
            Direction::Vertical,
            false,
        );
        drop(draw);

        assert_eq!(canvas.at(0, 0), Pixel::rgb(0, 0, 0));
        // Row y interpolates by y/height.
        assert_eq!(canvas.at(0, 4), Pixel::rgb(40, 80, 120));
        assert_eq!(canvas.at(3, 7), Pixel::rgb(70, 140, 210));
        // Gradient pixels are fully opaque.
        assert_eq!(canvas.at(1, 3).alpha(), 255);
    }

    #[test]
    fn horizontal_gradient_varies_with_x() {
        let mut canvas = Canvas::new(8, 2);
        let mut draw = canvas.draw();
        draw.gradient(
            &Rect::new(0, 0, 8, 2),
            Pixel::rgb(0, 0, 0),
            Pixel::rgb(80, 80, 80),
            Direction::Horizontal,
            false,
        );
        drop(draw);
        assert_eq!(canvas.at(4, 0), Pixel::rgb(40, 40, 40));
        assert_eq!(canvas.at(4, 1), canvas.at(4, 0));
    }

    #[test]
    fn outline_dash_pattern_repeats() {
        let mut canvas = Canvas::new(12, 6);
        let mut draw = canvas.draw();
        draw.outline(&Rect::new(0, 0, 12, 6), RED, 2, 1);
        drop(draw);

        // Top row: 2 on, 2 off.
        assert_eq!(canvas.at(0, 0), RED);
        assert_eq!(canvas.at(1, 0), RED);
        assert_eq!(canvas.at(2, 0), Pixel::ZERO);
        assert_eq!(canvas.at(3, 0), Pixel::ZERO);
        assert_eq!(canvas.at(4, 0), RED);
        // Bottom row mirrors the pattern.
        assert_eq!(canvas.at(0, 5), RED);
        // Left column starts its pattern below the horizontal band.
        assert_eq!(canvas.at(0, 1), RED);
        assert_eq!(canvas.at(0, 2), RED);
        assert_eq!(canvas.at(0, 3), Pixel::ZERO);
    }

    #[test]
    fn transfer_rejects_out_of_bounds() {
        let src_pixels = vec![RED; 4];
        let src = PixelView::new(&src_pixels, 2, 2, 2);

        let mut canvas = Canvas::new(4, 4);
        let mut draw = canvas.draw();
        // Source overrun: no-op.
        draw.transfer(&src, &Rect::new(0, 0, 3, 3), Point::ZERO);
        assert_eq!(draw.invalid_rect(), Rect::ZERO);
        // In bounds: copies.
        draw.transfer(&src, &Rect::new(1, 1, 3, 3), Point::ZERO);
        drop(draw);
        assert_eq!(canvas.at(1, 1), RED);
        assert_eq!(canvas.at(2, 2), RED);
        assert_eq!(canvas.at(0, 0), Pixel::ZERO);
    }

    #[test]
    fn transfer_within_handles_overlap() {
        let mut canvas = Canvas::new(4, 4);
        for y in 0..4 {
            for x in 0..4 {
                canvas.pixels[(y * 4 + x) as usize] = Pixel::rgb((y * 4 + x) as u8, 0, 0);
            }
        }
        let mut draw = canvas.draw();
        // Shift the top three rows down by one.
        draw.transfer_within(&Rect::new(0, 1, 4, 4), Point::new(0, 0));
        drop(draw);
        assert_eq!(canvas.at(0, 1), Pixel::rgb(0, 0, 0));
        assert_eq!(canvas.at(0, 2), Pixel::rgb(4, 0, 0));
        assert_eq!(canvas.at(3, 3), Pixel::rgb(11, 0, 0));
        // Row 0 untouched.
        assert_eq!(canvas.at(3, 0), Pixel::rgb(3, 0, 0));
    }

    #[test]
    fn string_draws_glyphs_and_invalidates_text_extent() {
        let font = Rc::new(test_font());
        let mut canvas = Canvas::new(40, 12);
        let mut draw = canvas.draw();
        draw.string(Some(&font), Point::new(2, 1), RED, "ab");

        // Invalidated x-extent equals the measured width.
        let invalid = draw.invalid_rect();
        assert_eq!(invalid.left, 2);
        assert_eq!(invalid.width(), font.width("ab"));
        drop(draw);

        // Glyph top = point.y + ascender - bearing_y = 1 + 7 - 6 = 2.
        assert_eq!(canvas.at(2, 2), RED);
        assert_eq!(canvas.at(2, 1), Pixel::ZERO);
        // Second glyph starts at advance + kerning = 2 + 5 - 1 = 6.
        assert_eq!(canvas.at(6, 2), RED);
    }

    #[test]
    fn text_that_fits_is_centered() {
        let font = Rc::new(test_font());
        let mut canvas = Canvas::new(30, 12);
        let mut draw = canvas.draw();
        // "ab" is 9 wide; centered in 30 -> x = 15 - 4 = 11 in integer math.
        draw.text(
            &Rect::new(0, 0, 30, 12),
            Some(&font),
            Align::Center,
            Align::Min,
            RED,
            "ab",
        );
        drop(draw);
        assert_eq!(canvas.at(11, 1), RED);
        assert_eq!(canvas.at(2, 1), Pixel::ZERO);
    }

    #[test]
    fn overlong_text_is_ellipsized_within_the_rect() {
        let font = Rc::new(test_font());
        let mut canvas = Canvas::new(40, 12);
        let rect = Rect::new(0, 0, 27, 12);
        let mut draw = canvas.draw();
        draw.text(&rect, Some(&font), Align::Min, Align::Min, RED, "abcdef");
        drop(draw);

        // Nothing to the right of the rect.
        for y in 0..12 {
            for x in 27..40 {
                assert_eq!(canvas.at(x, y), Pixel::ZERO, "pixel at ({x},{y})");
            }
        }
        // Head glyphs were drawn.
        assert_eq!(canvas.at(0, 2), RED);
        // The ellipsis follows the fitted head ("ab" = 9 wide).
        assert_eq!(canvas.at(9, 2), RED);
    }

    #[test]
    fn multiline_wraps_on_spaces_and_hard_newlines() {
        let font = Rc::new(test_font());
        // Each glyph is 5 wide: "aaa" = 15, fits; "aaa bbb" = 35, does not.
        let mut canvas = Canvas::new(20, 40);
        let mut draw = canvas.draw();
        draw.text_multiline(
            &Rect::new(0, 0, 20, 40),
            Some(&font),
            Align::Min,
            Align::Min,
            RED,
            "aaa bbb\nc",
        );
        drop(draw);

        let line_height = font.visual_height();
        // Line 0: "aaa", line 1: "bbb" (wrapped), line 2: "c" (hard break).
        assert_eq!(canvas.at(0, 2), RED);
        assert_eq!(canvas.at(0, 2 + line_height), RED);
        assert_eq!(canvas.at(0, 2 + 2 * line_height), RED);
        // "bbb" wrapped: nothing right of 15 on line 0.
        assert_eq!(canvas.at(16, 2), Pixel::ZERO);
    }

    #[test]
    fn wrap_places_overlong_words_alone() {
        let font = test_font();
        let lines = wrap_lines(&font, "aaaaaaaa bb", 5 * TEST_ADVANCE as i32);
        assert_eq!(lines, vec!["aaaaaaaa", "bb"]);

        let lines = wrap_lines(&font, "aa bb cc", 5 * TEST_ADVANCE as i32);
        assert_eq!(lines, vec!["aa bb", "cc"]);

        let lines = wrap_lines(&font, "a\n\nb", 100);
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    #[test]
    fn separator_splits_into_highlight_and_shadow() {
        let mut canvas = Canvas::new(10, 2);
        let mut draw = canvas.draw();
        draw.separator(&Rect::new(0, 0, 10, 2), RED, BLUE, Direction::Horizontal);
        drop(draw);
        assert_eq!(canvas.at(0, 0), RED);
        assert_eq!(canvas.at(4, 1), RED);
        assert_eq!(canvas.at(5, 0), BLUE);
        assert_eq!(canvas.at(9, 1), BLUE);
    }

    #[test]
    fn ridge_draws_nested_inverted_frames() {
        let mut canvas = Canvas::new(12, 12);
        let mut draw = canvas.draw();
        draw.ridge(&Rect::new(0, 0, 12, 12), 4, RED, BLUE);
        drop(draw);
        // Outer frame: bg (BLUE) on top/left, inner frame: fg (RED) on top/left.
        assert_eq!(canvas.at(0, 6), BLUE);
        assert_eq!(canvas.at(2, 6), RED);
    }

    #[test]
    fn draw_target_writes_through_embedded_graphics() {
        use embedded_graphics::prelude::Point as EgPoint;

        let mut canvas = Canvas::new(4, 4);
        let mut draw = canvas.draw();
        draw.draw_iter([
            EgPixel(EgPoint::new(1, 1), Rgb888::new(1, 2, 3)),
            EgPixel(EgPoint::new(99, 0), Rgb888::new(9, 9, 9)),
        ])
        .unwrap();
        assert_eq!(draw.invalid_rect(), Rect::new(1, 1, 2, 2));
        drop(draw);
        assert_eq!(canvas.at(1, 1), Pixel::rgb(1, 2, 3));
    }

    #[test]
    fn gradient_noise_stays_within_clamp() {
        let mut canvas = Canvas::new(8, 8);
        let mut draw = canvas.draw();
        draw.gradient(
            &Rect::new(0, 0, 8, 8),
            Pixel::rgb(0, 0, 0),
            Pixel::rgb(255, 255, 255),
            Direction::Diagonal,
            true,
        );
        drop(draw);
        // Noise is ±2 around the interpolated value; the corner stays dark.
        assert!(canvas.at(0, 0).red() <= 2);
        assert_eq!(canvas.at(0, 0).alpha(), 255);
    }
}
