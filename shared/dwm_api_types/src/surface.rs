use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::rect::Rect;
use crate::wire::{Reader, Writer};
use crate::{MAX_NAME, Name};

/// Surface identifier, assigned monotonically by the server.
pub type SurfaceId = u64;

/// Identifier meaning "no surface"; events addressed to every window use it
/// as their target.
pub const SURFACE_ID_NONE: SurfaceId = u64::MAX;

/// Timer timeout meaning "never fires".
pub const TIMEOUT_NEVER: u64 = u64::MAX;

/// The role a surface plays in the scene. Constant for the surface's lifetime.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
pub enum SurfaceType {
    Window = 0,
    Panel = 1,
    Cursor = 2,
    Wall = 3,
    Fullscreen = 4,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SurfaceFlags: u8 {
        const VISIBLE = 1 << 0;
        const FOCUSED = 1 << 1;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct TimerFlags: u8 {
        const REPEAT = 1 << 0;
    }
}

bitflags! {
    /// Which attribute a `REPORT` event is notifying about. `NONE` (empty)
    /// marks an explicitly requested snapshot.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ReportFlags: u8 {
        const RECT = 1 << 0;
        const IS_FOCUSED = 1 << 1;
        const IS_VISIBLE = 1 << 2;
    }
}

/// Snapshot of a surface's public attributes, carried by report and
/// attach/detach events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceInfo {
    pub id: SurfaceId,
    pub rect: Rect,
    pub surface_type: SurfaceType,
    pub flags: SurfaceFlags,
    pub name: Name,
}

impl SurfaceInfo {
    pub const WIRE_SIZE: usize = 8 + 16 + 1 + 1 + 1 + MAX_NAME;

    pub(crate) fn encode(&self, w: &mut Writer) {
        w.put_u64(self.id);
        self.rect.encode(w);
        w.put_u8(self.surface_type.into());
        w.put_u8(self.flags.bits());
        let (bytes, len) = self.name.raw();
        w.put_u8(len);
        w.put_bytes(bytes);
    }

    pub(crate) fn decode(r: &mut Reader) -> Option<Self> {
        let id = r.get_u64()?;
        let rect = Rect::decode(r)?;
        let surface_type = SurfaceType::try_from(r.get_u8()?).ok()?;
        let flags = SurfaceFlags::from_bits_truncate(r.get_u8()?);
        let len = r.get_u8()?;
        let bytes = r.get_array::<MAX_NAME>()?;
        Some(Self {
            id,
            rect,
            surface_type,
            flags,
            name: Name::from_raw(bytes, len),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_type_rejects_out_of_range() {
        assert!(SurfaceType::try_from(4).is_ok());
        assert!(SurfaceType::try_from(5).is_err());
    }

    #[test]
    fn info_wire_round_trip() {
        let info = SurfaceInfo {
            id: 42,
            rect: Rect::new(1, 2, 3, 4),
            surface_type: SurfaceType::Panel,
            flags: SurfaceFlags::VISIBLE | SurfaceFlags::FOCUSED,
            name: Name::new("bar").unwrap(),
        };
        let mut buf = [0u8; SurfaceInfo::WIRE_SIZE];
        let mut w = Writer::new(&mut buf);
        info.encode(&mut w);
        assert_eq!(w.written(), SurfaceInfo::WIRE_SIZE);

        let decoded = SurfaceInfo::decode(&mut Reader::new(&buf)).unwrap();
        assert_eq!(decoded, info);
    }
}
