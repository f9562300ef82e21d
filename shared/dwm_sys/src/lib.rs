//! Host-side seams for the kernel services the window manager consumes:
//! the local-socket transport, raw input event files, the framebuffer device,
//! and shared pixel memory. Each seam is a small trait with one production
//! implementation and one in-memory implementation used by tests.

#![feature(unix_socket_peek)]

pub mod conn;
pub mod fb;
pub mod input;
pub mod logger;
pub mod shmem;
