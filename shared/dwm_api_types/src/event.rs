use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::input::{KbdMods, Keycode, MouseButtons};
use crate::point::Point;
use crate::surface::{ReportFlags, SurfaceId, SurfaceInfo};
use crate::wire::{Reader, Writer};

pub type EventType = u16;

/// Core DWM event types, sent by the server. These occupy the low range and
/// are covered by the default subscription mask.
pub mod ev {
    use super::EventType;

    pub const SCREEN_INFO: EventType = 0;
    pub const SURFACE_NEW: EventType = 1;
    pub const KBD: EventType = 2;
    pub const MOUSE: EventType = 3;
    pub const FOCUS_IN: EventType = 4;
    pub const FOCUS_OUT: EventType = 5;
    pub const REPORT: EventType = 6;
    pub const TIMER: EventType = 7;
    pub const CURSOR_ENTER: EventType = 8;
    pub const CURSOR_LEAVE: EventType = 9;
    pub const GLOBAL_REPORT: EventType = 10;
    pub const GLOBAL_ATTACH: EventType = 11;
    pub const GLOBAL_DETACH: EventType = 12;
    pub const GLOBAL_KBD: EventType = 13;
    pub const GLOBAL_MOUSE: EventType = 14;
}

/// Library events, synthesized on the client side and never sent on the wire.
pub mod levent {
    use super::EventType;

    pub const BASE: EventType = 1 << 14;
    pub const INIT: EventType = BASE + 1;
    /// May be delivered outside of a dispatch call, during teardown.
    pub const FREE: EventType = BASE + 2;
    pub const REDRAW: EventType = BASE + 3;
    pub const ACTION: EventType = BASE + 4;
    pub const QUIT: EventType = BASE + 5;
    pub const FORCE_ACTION: EventType = BASE + 6;
}

/// First event type available for application-defined events.
pub const UEVENT_BASE: EventType = 1 << 15;

/// Payload capacity of one event.
pub const EVENT_MAX_DATA: usize = 64;

/// Size of one event on the wire: target, type, padding, payload.
pub const EVENT_WIRE_SIZE: usize = 8 + 2 + 6 + EVENT_MAX_DATA;

/// A fixed-size message from the server to a client (or synthesized locally
/// by the client runtime). Interpretation of `raw` depends on `event_type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Event {
    pub target: SurfaceId,
    pub event_type: EventType,
    pub raw: [u8; EVENT_MAX_DATA],
}

impl Event {
    pub fn new(target: SurfaceId, event_type: EventType) -> Self {
        Self {
            target,
            event_type,
            raw: [0; EVENT_MAX_DATA],
        }
    }

    pub fn with_payload<P: Payload>(target: SurfaceId, event_type: EventType, payload: &P) -> Self {
        let mut event = Self::new(target, event_type);
        let mut w = Writer::new(&mut event.raw);
        payload.encode(&mut w);
        event
    }

    /// Decodes the payload as `P`. Payload types are a convention per event
    /// type; decoding the wrong type yields garbage-but-valid data or `None`,
    /// never a panic.
    pub fn payload<P: Payload>(&self) -> Option<P> {
        P::decode(&mut Reader::new(&self.raw))
    }

    pub fn encode(&self) -> [u8; EVENT_WIRE_SIZE] {
        let mut buf = [0u8; EVENT_WIRE_SIZE];
        let mut w = Writer::new(&mut buf);
        w.put_u64(self.target);
        w.put_u16(self.event_type);
        w.put_bytes(&[0; 6]);
        w.put_bytes(&self.raw);
        buf
    }

    pub fn decode(bytes: &[u8; EVENT_WIRE_SIZE]) -> Self {
        let mut r = Reader::new(bytes);
        let target = r.get_u64().unwrap_or(0);
        let event_type = r.get_u16().unwrap_or(0);
        let _ = r.get_array::<6>();
        let raw = r.get_array::<EVENT_MAX_DATA>().unwrap_or([0; EVENT_MAX_DATA]);
        Self {
            target,
            event_type,
            raw,
        }
    }
}

/// A typed view of an event payload.
pub trait Payload: Sized {
    fn encode(&self, w: &mut Writer);
    fn decode(r: &mut Reader) -> Option<Self>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventScreenInfo {
    pub width: u64,
    pub height: u64,
}

impl Payload for EventScreenInfo {
    fn encode(&self, w: &mut Writer) {
        w.put_u64(self.width);
        w.put_u64(self.height);
    }

    fn decode(r: &mut Reader) -> Option<Self> {
        Some(Self {
            width: r.get_u64()?,
            height: r.get_u64()?,
        })
    }
}

/// Carries the key the client uses to claim the surface's pixel memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventSurfaceNew {
    pub shmem_key: u64,
}

impl Payload for EventSurfaceNew {
    fn encode(&self, w: &mut Writer) {
        w.put_u64(self.shmem_key);
    }

    fn decode(r: &mut Reader) -> Option<Self> {
        Some(Self {
            shmem_key: r.get_u64()?,
        })
    }
}

use crate::input::KbdEventKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventKbd {
    pub kind: KbdEventKind,
    pub mods: KbdMods,
    pub code: Keycode,
    pub ascii: u8,
}

impl Payload for EventKbd {
    fn encode(&self, w: &mut Writer) {
        w.put_u8(self.kind.into());
        w.put_u16(self.mods.bits());
        w.put_u16(self.code.into());
        w.put_u8(self.ascii);
    }

    fn decode(r: &mut Reader) -> Option<Self> {
        Some(Self {
            kind: KbdEventKind::try_from(r.get_u8()?).ok()?,
            mods: KbdMods::from_bits_truncate(r.get_u16()?),
            code: Keycode::try_from(r.get_u16()?).ok()?,
            ascii: r.get_u8()?,
        })
    }
}

/// Mouse payload, also used by `CURSOR_ENTER`/`CURSOR_LEAVE` (with empty edge
/// masks) and `GLOBAL_MOUSE` (with `pos` set to the screen position).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventMouse {
    pub held: MouseButtons,
    pub pressed: MouseButtons,
    pub released: MouseButtons,
    pub pos: Point,
    pub screen_pos: Point,
    pub delta: Point,
}

impl Payload for EventMouse {
    fn encode(&self, w: &mut Writer) {
        w.put_u8(self.held.bits());
        w.put_u8(self.pressed.bits());
        w.put_u8(self.released.bits());
        self.pos.encode(w);
        self.screen_pos.encode(w);
        self.delta.encode(w);
    }

    fn decode(r: &mut Reader) -> Option<Self> {
        Some(Self {
            held: MouseButtons::from_bits_truncate(r.get_u8()?),
            pressed: MouseButtons::from_bits_truncate(r.get_u8()?),
            released: MouseButtons::from_bits_truncate(r.get_u8()?),
            pos: Point::decode(r)?,
            screen_pos: Point::decode(r)?,
            delta: Point::decode(r)?,
        })
    }
}

/// Surface attribute notification. `flags` names what changed; the info is a
/// full snapshot either way. Also the payload of `GLOBAL_REPORT`,
/// `GLOBAL_ATTACH` and `GLOBAL_DETACH` (the latter two with empty flags).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventReport {
    pub flags: ReportFlags,
    pub info: SurfaceInfo,
}

impl Payload for EventReport {
    fn encode(&self, w: &mut Writer) {
        w.put_u8(self.flags.bits());
        self.info.encode(w);
    }

    fn decode(r: &mut Reader) -> Option<Self> {
        Some(Self {
            flags: ReportFlags::from_bits_truncate(r.get_u8()?),
            info: SurfaceInfo::decode(r)?,
        })
    }
}

pub type ElementId = u64;

pub const ELEMENT_ID_NONE: ElementId = u64::MAX;

#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
pub enum ActionKind {
    #[default]
    None = 0,
    Release = 1,
    Press = 2,
    Cancel = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeventInit {
    pub id: ElementId,
}

impl Payload for LeventInit {
    fn encode(&self, w: &mut Writer) {
        w.put_u64(self.id);
    }

    fn decode(r: &mut Reader) -> Option<Self> {
        Some(Self { id: r.get_u64()? })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeventRedraw {
    pub id: ElementId,
    pub propagate: bool,
}

impl Payload for LeventRedraw {
    fn encode(&self, w: &mut Writer) {
        w.put_u64(self.id);
        w.put_u8(self.propagate as u8);
    }

    fn decode(r: &mut Reader) -> Option<Self> {
        Some(Self {
            id: r.get_u64()?,
            propagate: r.get_u8()? != 0,
        })
    }
}

/// A child widget produced a user action; `source` is the widget's element id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeventAction {
    pub source: ElementId,
    pub kind: ActionKind,
}

impl Payload for LeventAction {
    fn encode(&self, w: &mut Writer) {
        w.put_u64(self.source);
        w.put_u8(self.kind.into());
    }

    fn decode(r: &mut Reader) -> Option<Self> {
        Some(Self {
            source: r.get_u64()?,
            kind: ActionKind::try_from(r.get_u8()?).ok()?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeventForceAction {
    pub dest: ElementId,
    pub action: ActionKind,
}

impl Payload for LeventForceAction {
    fn encode(&self, w: &mut Writer) {
        w.put_u64(self.dest);
        w.put_u8(self.action.into());
    }

    fn decode(r: &mut Reader) -> Option<Self> {
        Some(Self {
            dest: r.get_u64()?,
            action: ActionKind::try_from(r.get_u8()?).ok()?,
        })
    }
}
