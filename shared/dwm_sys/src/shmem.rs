//! Keyed shared pixel buffers.
//!
//! The server creates a buffer per surface and sends the key to the owning
//! client in `EVENT_SURFACE_NEW`; the client claims the key and maps the same
//! pixels. The discipline is single-writer (client) / single-reader (server)
//! with no locking: the client promises that everything it wrote before a
//! `SURFACE_INVALIDATE` command is stable, and the server only reads inside
//! the compositor, which runs after command processing.

use std::cell::UnsafeCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use dwm_api_types::pixel::Pixel;

/// Wire token identifying a claimable buffer.
pub type ShmemKey = u64;

/// A pixel buffer shared between one writer and one reader.
pub struct ShmemBuffer {
    pixels: UnsafeCell<Box<[Pixel]>>,
}

// The buffer itself does no synchronization; the command protocol provides
// the happens-before edge between writer and reader.
unsafe impl Send for ShmemBuffer {}
unsafe impl Sync for ShmemBuffer {}

impl ShmemBuffer {
    fn new(len: usize) -> Self {
        Self {
            pixels: UnsafeCell::new(vec![Pixel::ZERO; len].into_boxed_slice()),
        }
    }

    pub fn len(&self) -> usize {
        unsafe { (&*self.pixels.get()).len() }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// # Safety
    ///
    /// The caller must not hold a mutable view of the same buffer. Under the
    /// surface protocol this is the compositor's read path, which never runs
    /// concurrently with the owning client's writes.
    pub unsafe fn pixels(&self) -> &[Pixel] {
        unsafe { &*self.pixels.get() }
    }

    /// # Safety
    ///
    /// The caller must be the single writer and no read view may be live.
    /// Under the surface protocol this is the owning client between
    /// invalidate commands.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn pixels_mut(&self) -> &mut [Pixel] {
        unsafe { &mut *self.pixels.get() }
    }
}

fn registry() -> &'static Mutex<HashMap<ShmemKey, Arc<ShmemBuffer>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<ShmemKey, Arc<ShmemBuffer>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Allocates a zero-filled buffer of `len` pixels and registers it under a
/// fresh key.
pub fn create(len: usize) -> (ShmemKey, Arc<ShmemBuffer>) {
    static NEXT_KEY: AtomicU64 = AtomicU64::new(1);
    let key = NEXT_KEY.fetch_add(1, Ordering::Relaxed);
    let buffer = Arc::new(ShmemBuffer::new(len));
    registry().lock().unwrap().insert(key, buffer.clone());
    (key, buffer)
}

/// Maps the buffer behind `key`. Fails if the key was never shared or has
/// been released.
pub fn claim(key: ShmemKey) -> Option<Arc<ShmemBuffer>> {
    registry().lock().unwrap().get(&key).cloned()
}

/// Drops the registry's reference. Existing mappings stay valid.
pub fn release(key: ShmemKey) {
    registry().lock().unwrap().remove(&key);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_claim_release_lifecycle() {
        let (key, buffer) = create(16);
        assert_eq!(buffer.len(), 16);

        let claimed = claim(key).expect("key should be claimable");
        assert!(Arc::ptr_eq(&buffer, &claimed));

        release(key);
        assert!(claim(key).is_none());
        // The mapping survives release.
        assert_eq!(claimed.len(), 16);
    }

    #[test]
    fn buffers_start_zeroed_and_writes_are_visible() {
        let (_key, buffer) = create(4);
        unsafe {
            assert!(buffer.pixels().iter().all(|&p| p == Pixel::ZERO));
            buffer.pixels_mut()[2] = Pixel::rgb(1, 2, 3);
            assert_eq!(buffer.pixels()[2], Pixel::rgb(1, 2, 3));
        }
    }
}
