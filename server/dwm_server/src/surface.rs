//! Server-side surfaces: one shmem-backed drawable per client request.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dwm_api_types::pixel::Pixel;
use dwm_api_types::point::Point;
use dwm_api_types::rect::Rect;
use dwm_api_types::surface::{
    SurfaceFlags, SurfaceId, SurfaceInfo, SurfaceType, TIMEOUT_NEVER, TimerFlags,
};
use dwm_api_types::Name;
use dwm_sys::shmem::{self, ShmemBuffer, ShmemKey};

use crate::client::ClientId;

/// Per-surface timer. `deadline == None` means the timer never fires.
#[derive(Clone, Copy, Debug, Default)]
pub struct SurfaceTimer {
    pub flags: TimerFlags,
    pub timeout: Duration,
    pub deadline: Option<Instant>,
}

impl SurfaceTimer {
    /// Applies a `SURFACE_TIMER_SET` command relative to `now`.
    pub fn set(&mut self, flags: TimerFlags, timeout_ns: u64, now: Instant) {
        self.flags = flags;
        if timeout_ns == TIMEOUT_NEVER {
            self.timeout = Duration::ZERO;
            self.deadline = None;
        } else {
            self.timeout = Duration::from_nanos(timeout_ns);
            self.deadline = Some(now + self.timeout);
        }
    }

    /// Called when the timer fires: repeat timers rearm, one-shots disarm.
    pub fn fired(&mut self, now: Instant) {
        if self.flags.contains(TimerFlags::REPEAT) {
            self.deadline = Some(now + self.timeout);
        } else {
            self.deadline = None;
        }
    }
}

pub struct Surface {
    pub id: SurfaceId,
    pub client: ClientId,
    pub surface_type: SurfaceType,
    pub pos: Point,
    pub width: u32,
    pub height: u32,
    pub flags: SurfaceFlags,
    pub timer: SurfaceTimer,
    pub name: Name,
    shmem_key: ShmemKey,
    buffer: Arc<ShmemBuffer>,
}

impl Surface {
    /// Allocates the zero-filled shared pixel buffer and the surface record.
    /// Zero dimensions are the caller's problem; they are rejected at the
    /// command layer.
    pub fn new(
        id: SurfaceId,
        client: ClientId,
        name: Name,
        pos: Point,
        width: u32,
        height: u32,
        surface_type: SurfaceType,
    ) -> Self {
        let (shmem_key, buffer) = shmem::create((width * height) as usize);
        Self {
            id,
            client,
            surface_type,
            pos,
            width,
            height,
            flags: SurfaceFlags::empty(),
            timer: SurfaceTimer::default(),
            name,
            shmem_key,
            buffer,
        }
    }

    pub fn shmem_key(&self) -> ShmemKey {
        self.shmem_key
    }

    /// The surface's pixels as the compositor reads them. The owning client
    /// is the only writer and signals stability through invalidate commands,
    /// so reads here never race a write we could observe mid-row.
    pub fn pixels(&self) -> &[Pixel] {
        unsafe { self.buffer.pixels() }
    }

    pub fn screen_rect(&self) -> Rect {
        Rect::from_dim(self.pos.x, self.pos.y, self.width as i32, self.height as i32)
    }

    pub fn content_rect(&self) -> Rect {
        Rect::from_dim(0, 0, self.width as i32, self.height as i32)
    }

    pub fn info(&self) -> SurfaceInfo {
        SurfaceInfo {
            id: self.id,
            rect: self.screen_rect(),
            surface_type: self.surface_type,
            flags: self.flags,
            name: self.name,
        }
    }

    /// Releases the shmem registry entry; client-side mappings stay valid
    /// until dropped.
    pub fn free(&self) {
        shmem::release(self.shmem_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_surface_is_zero_filled_and_claimable() {
        let surface = Surface::new(
            1,
            7,
            Name::new("s").unwrap(),
            Point::new(5, 6),
            8,
            4,
            SurfaceType::Window,
        );
        assert_eq!(surface.pixels().len(), 32);
        assert!(surface.pixels().iter().all(|&p| p == Pixel::ZERO));
        assert!(shmem::claim(surface.shmem_key()).is_some());
        surface.free();
        assert!(shmem::claim(surface.shmem_key()).is_none());
    }

    #[test]
    fn rects_follow_position_and_dims() {
        let surface = Surface::new(
            2,
            1,
            Name::EMPTY,
            Point::new(10, 20),
            100,
            50,
            SurfaceType::Panel,
        );
        assert_eq!(surface.screen_rect(), Rect::new(10, 20, 110, 70));
        assert_eq!(surface.content_rect(), Rect::new(0, 0, 100, 50));
        surface.free();
    }

    #[test]
    fn timer_set_and_fire_semantics() {
        let now = Instant::now();
        let mut timer = SurfaceTimer::default();

        timer.set(TimerFlags::REPEAT, 1_000_000, now);
        assert_eq!(timer.deadline, Some(now + Duration::from_millis(1)));
        timer.fired(now + Duration::from_millis(2));
        assert!(timer.deadline.is_some());

        timer.set(TimerFlags::empty(), 1_000_000, now);
        timer.fired(now + Duration::from_millis(2));
        assert_eq!(timer.deadline, None);

        timer.set(TimerFlags::empty(), TIMEOUT_NEVER, now);
        assert_eq!(timer.deadline, None);
    }
}
