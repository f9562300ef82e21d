use crate::wire::{Reader, Writer};

/// A position in integer pixels. Screen space grows right and down.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ZERO: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub(crate) fn encode(&self, w: &mut Writer) {
        w.put_i32(self.x);
        w.put_i32(self.y);
    }

    pub(crate) fn decode(r: &mut Reader) -> Option<Self> {
        Some(Self {
            x: r.get_i32()?,
            y: r.get_i32()?,
        })
    }
}
