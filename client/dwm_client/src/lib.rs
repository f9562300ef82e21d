//! Client runtime for the window manager.
//!
//! Turns the wire protocol into a retained-mode widget tree: a [`display`]
//! connection carries framed commands out and fixed-size events in, a
//! [`window`] wraps one surface and its mapped pixel buffer, and [`element`]s
//! form the per-window tree whose procedures draw through a software 2D
//! [`drawable`].
//!
//! Not thread safe; drive a display and its windows from one thread.

pub mod config;
pub mod display;
pub mod drawable;
pub mod element;
pub mod font;
pub mod image;
pub mod popup;
pub mod theme;
pub mod widgets;
pub mod window;
