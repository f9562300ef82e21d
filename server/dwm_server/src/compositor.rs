//! Scene composition.
//!
//! Repaints only the invalid region each frame. Paint order is topmost-first
//! (panels, then windows), with each painted surface subtracted from the
//! region so lower surfaces only draw the still-exposed parts; the wall takes
//! whatever remains. A fullscreen surface short-circuits everything and
//! writes straight to the front buffer.

use std::collections::BTreeMap;

use dwm_api_types::rect::Rect;
use dwm_api_types::surface::{SurfaceFlags, SurfaceId};
use dwm_sys::fb::Framebuffer;

use crate::region::Region;
use crate::screen::Screen;
use crate::surface::Surface;

/// Everything the compositor needs to see of the DWM's state for one frame.
pub struct Scene<'a> {
    pub surfaces: &'a BTreeMap<SurfaceId, Surface>,
    /// Bottom-to-top; the focused window sits at the back.
    pub windows: &'a [SurfaceId],
    pub panels: &'a [SurfaceId],
    pub wall: Option<SurfaceId>,
    pub cursor: Option<SurfaceId>,
    pub fullscreen: Option<SurfaceId>,
}

pub struct Compositor {
    screen_rect: Rect,
    prev_cursor_rect: Rect,
    invalid: Region,
}

impl Compositor {
    pub fn new(screen_rect: Rect) -> Self {
        Self {
            screen_rect,
            prev_cursor_rect: Rect::ZERO,
            invalid: Region::new(),
        }
    }

    /// Clips to the screen and queues the rect for the next frame.
    pub fn invalidate(&mut self, rect: &Rect) {
        let fit = rect.fitted(&self.screen_rect);
        self.invalid.add(&fit);
    }

    pub fn invalid_region(&self) -> &Region {
        &self.invalid
    }

    /// Paints the invalid pieces of one surface and subtracts its rect from
    /// the region. Returns true once the region is exhausted.
    fn draw_surface<F: Framebuffer>(&mut self, screen: &mut Screen<F>, surface: &Surface) -> bool {
        if !surface.flags.contains(SurfaceFlags::VISIBLE) {
            return false;
        }

        let surface_rect = surface.screen_rect();
        let pieces = self.invalid.intersect(&surface_rect);
        if pieces.is_empty() {
            return false;
        }

        for rect in pieces.rects() {
            screen.transfer(
                surface.pixels(),
                (surface.width, surface.height),
                surface.pos,
                rect,
            );
        }

        self.invalid.subtract(&surface_rect);
        self.invalid.is_empty()
    }

    fn draw_fullscreen<F: Framebuffer>(&mut self, screen: &mut Screen<F>, surface: &Surface) {
        if !surface.flags.contains(SurfaceFlags::VISIBLE) {
            return;
        }

        let pieces = self.invalid.intersect(&surface.screen_rect());
        if pieces.is_empty() {
            return;
        }
        for rect in pieces.rects() {
            screen.transfer_frontbuffer(
                surface.pixels(),
                (surface.width, surface.height),
                surface.pos,
                rect,
            );
        }
        self.invalid.clear();
    }

    fn draw_all<F: Framebuffer>(&mut self, screen: &mut Screen<F>, scene: &Scene) {
        // The old cursor position must be repainted underneath.
        if self.prev_cursor_rect.area() > 0 {
            let prev = self.prev_cursor_rect;
            self.invalidate(&prev);
        }

        if self.invalid.is_empty() {
            return;
        }

        'paint: {
            for id in scene.panels.iter().rev() {
                if self.draw_surface(screen, &scene.surfaces[id]) {
                    break 'paint;
                }
            }
            for id in scene.windows.iter().rev() {
                if self.draw_surface(screen, &scene.surfaces[id]) {
                    break 'paint;
                }
            }
            if let Some(wall) = scene.wall {
                self.draw_surface(screen, &scene.surfaces[&wall]);
            }
        }

        let cursor = scene.cursor.map(|id| &scene.surfaces[&id]);
        match cursor {
            Some(cursor) if cursor.flags.contains(SurfaceFlags::VISIBLE) => {
                let cursor_rect = cursor.screen_rect();
                screen.transfer_blend(
                    cursor.pixels(),
                    (cursor.width, cursor.height),
                    cursor.pos,
                    &cursor_rect,
                );
                self.prev_cursor_rect = cursor_rect;
            }
            _ => self.prev_cursor_rect = Rect::ZERO,
        }

        self.invalid.clear();
    }

    /// Draws one frame. Nothing is painted until a wall exists.
    pub fn draw<F: Framebuffer>(&mut self, screen: &mut Screen<F>, scene: &Scene) {
        if scene.wall.is_none() {
            return;
        }

        if let Some(fullscreen) = scene.fullscreen {
            let surface = &scene.surfaces[&fullscreen];
            self.draw_fullscreen(screen, surface);
        } else {
            self.draw_all(screen, scene);
            screen.swap();
        }
    }
}
