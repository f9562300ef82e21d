//! The desktop window manager server.
//!
//! One process owns the framebuffer and brokers shared-memory surfaces for
//! many clients: it accepts connections on a local socket, decodes framed
//! command buffers, arbitrates input and focus, tracks invalid regions, and
//! composites the visible scene to the screen each iteration.

pub mod client;
pub mod compositor;
pub mod dwm;
pub mod keymap;
pub mod region;
pub mod screen;
pub mod surface;
