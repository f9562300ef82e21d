#![no_std]

//! Wire-level types shared between the DWM server and its clients.
//!
//! Everything in here is plain data: geometry, pixels, surface descriptions,
//! the command and event codecs, and the per-client subscription mask. The
//! server and the client runtime both build on this crate; neither links the
//! other.

#[cfg(test)]
extern crate std;

pub mod cmd;
pub mod event;
pub mod input;
pub mod mask;
pub mod pixel;
pub mod point;
pub mod rect;
pub mod surface;
pub mod wire;

/// Bound on surface names. Chosen so a surface info snapshot (plus report
/// flags) still fits in one fixed-size event payload.
pub const MAX_NAME: usize = 32;

/// A name bounded to [`MAX_NAME`] bytes, stored with an explicit length so it
/// round-trips through the wire without a terminator scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Name {
    bytes: [u8; MAX_NAME],
    len: u8,
}

impl Name {
    pub const EMPTY: Self = Self {
        bytes: [0; MAX_NAME],
        len: 0,
    };

    /// Returns `None` if `s` does not fit.
    pub fn new(s: &str) -> Option<Self> {
        if s.len() > MAX_NAME {
            return None;
        }
        let mut bytes = [0; MAX_NAME];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Some(Self {
            bytes,
            len: s.len() as u8,
        })
    }

    pub fn from_raw(bytes: [u8; MAX_NAME], len: u8) -> Self {
        Self {
            bytes,
            len: len.min(MAX_NAME as u8),
        }
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }

    pub fn raw(&self) -> (&[u8; MAX_NAME], u8) {
        (&self.bytes, self.len)
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl core::fmt::Display for Name {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
