use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::event::EventType;
use crate::rect::Rect;
use crate::surface::{SurfaceId, SurfaceType, TimerFlags};
use crate::wire::{Reader, Writer};
use crate::{MAX_NAME, Name};

/// Sentinel present on every command header.
pub const CMD_MAGIC: u32 = 0xDEAD_C0DE;

/// Maximum payload area of one command buffer frame.
pub const CMD_BUFFER_MAX_DATA: usize = 0x1000;

/// `amount: u64` + `size: u64`. `size` counts the whole frame including this
/// header, which is what lets the receiver accumulate partial reads.
pub const CMD_BUFFER_HEADER_SIZE: usize = 16;

/// `magic: u32` + `type: u32` + `size: u64`; `size` includes the header.
pub const CMD_HEADER_SIZE: usize = 16;

/// Upper bound on a full frame.
pub const CMD_FRAME_MAX_SIZE: usize = CMD_BUFFER_HEADER_SIZE + CMD_BUFFER_MAX_DATA;

/// Command discriminants. The wire order is frozen.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
pub enum CmdType {
    ScreenInfo = 0,
    SurfaceNew = 1,
    SurfaceFree = 2,
    SurfaceMove = 3,
    SurfaceTimerSet = 4,
    SurfaceInvalidate = 5,
    SurfaceFocusSet = 6,
    SurfaceVisibleSet = 7,
    SurfaceReport = 8,
    Subscribe = 9,
    Unsubscribe = 10,
}

/// A violation of the command buffer framing. Any of these is fatal for the
/// submitting client and discards the entire frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    FrameTooLarge,
    BadMagic,
    BadType,
    WalkOutOfBounds,
    AmountMismatch,
    BadPayload,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CmdScreenInfo {
    pub index: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CmdSurfaceNew {
    pub surface_type: SurfaceType,
    pub rect: Rect,
    pub name: Name,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CmdSurfaceFree {
    pub target: SurfaceId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CmdSurfaceMove {
    pub target: SurfaceId,
    pub rect: Rect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CmdSurfaceTimerSet {
    pub target: SurfaceId,
    /// Nanoseconds; `TIMEOUT_NEVER` disables the timer.
    pub timeout_ns: u64,
    pub flags: TimerFlags,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CmdSurfaceInvalidate {
    pub target: SurfaceId,
    pub rect: Rect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CmdSurfaceFocusSet {
    pub target: SurfaceId,
    pub is_global: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CmdSurfaceVisibleSet {
    pub target: SurfaceId,
    pub is_global: bool,
    pub is_visible: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CmdSurfaceReport {
    pub target: SurfaceId,
    pub is_global: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CmdSubscribe {
    pub event: EventType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CmdUnsubscribe {
    pub event: EventType,
}

/// A decoded command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cmd {
    ScreenInfo(CmdScreenInfo),
    SurfaceNew(CmdSurfaceNew),
    SurfaceFree(CmdSurfaceFree),
    SurfaceMove(CmdSurfaceMove),
    SurfaceTimerSet(CmdSurfaceTimerSet),
    SurfaceInvalidate(CmdSurfaceInvalidate),
    SurfaceFocusSet(CmdSurfaceFocusSet),
    SurfaceVisibleSet(CmdSurfaceVisibleSet),
    SurfaceReport(CmdSurfaceReport),
    Subscribe(CmdSubscribe),
    Unsubscribe(CmdUnsubscribe),
}

impl Cmd {
    pub fn cmd_type(&self) -> CmdType {
        match self {
            Cmd::ScreenInfo(_) => CmdType::ScreenInfo,
            Cmd::SurfaceNew(_) => CmdType::SurfaceNew,
            Cmd::SurfaceFree(_) => CmdType::SurfaceFree,
            Cmd::SurfaceMove(_) => CmdType::SurfaceMove,
            Cmd::SurfaceTimerSet(_) => CmdType::SurfaceTimerSet,
            Cmd::SurfaceInvalidate(_) => CmdType::SurfaceInvalidate,
            Cmd::SurfaceFocusSet(_) => CmdType::SurfaceFocusSet,
            Cmd::SurfaceVisibleSet(_) => CmdType::SurfaceVisibleSet,
            Cmd::SurfaceReport(_) => CmdType::SurfaceReport,
            Cmd::Subscribe(_) => CmdType::Subscribe,
            Cmd::Unsubscribe(_) => CmdType::Unsubscribe,
        }
    }

    fn encode_payload(&self, w: &mut Writer) {
        match self {
            Cmd::ScreenInfo(c) => w.put_u64(c.index),
            Cmd::SurfaceNew(c) => {
                c.rect.encode(w);
                w.put_u8(c.surface_type.into());
                let (bytes, len) = c.name.raw();
                w.put_u8(len);
                w.put_bytes(bytes);
            }
            Cmd::SurfaceFree(c) => w.put_u64(c.target),
            Cmd::SurfaceMove(c) => {
                w.put_u64(c.target);
                c.rect.encode(w);
            }
            Cmd::SurfaceTimerSet(c) => {
                w.put_u64(c.target);
                w.put_u64(c.timeout_ns);
                w.put_u8(c.flags.bits());
            }
            Cmd::SurfaceInvalidate(c) => {
                w.put_u64(c.target);
                c.rect.encode(w);
            }
            Cmd::SurfaceFocusSet(c) => {
                w.put_u64(c.target);
                w.put_u8(c.is_global as u8);
            }
            Cmd::SurfaceVisibleSet(c) => {
                w.put_u64(c.target);
                w.put_u8(c.is_global as u8);
                w.put_u8(c.is_visible as u8);
            }
            Cmd::SurfaceReport(c) => {
                w.put_u64(c.target);
                w.put_u8(c.is_global as u8);
            }
            Cmd::Subscribe(c) => w.put_u16(c.event),
            Cmd::Unsubscribe(c) => w.put_u16(c.event),
        }
    }

    /// Decodes one payload. The payload must be consumed exactly; trailing or
    /// missing bytes are a protocol error.
    fn decode_payload(cmd_type: CmdType, payload: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = Reader::new(payload);
        let cmd = match cmd_type {
            CmdType::ScreenInfo => Cmd::ScreenInfo(CmdScreenInfo {
                index: r.get_u64().ok_or(ProtocolError::BadPayload)?,
            }),
            CmdType::SurfaceNew => {
                let rect = Rect::decode(&mut r).ok_or(ProtocolError::BadPayload)?;
                let surface_type = r
                    .get_u8()
                    .and_then(|raw| SurfaceType::try_from(raw).ok())
                    .ok_or(ProtocolError::BadPayload)?;
                let len = r.get_u8().ok_or(ProtocolError::BadPayload)?;
                let bytes = r
                    .get_array::<MAX_NAME>()
                    .ok_or(ProtocolError::BadPayload)?;
                Cmd::SurfaceNew(CmdSurfaceNew {
                    surface_type,
                    rect,
                    name: Name::from_raw(bytes, len),
                })
            }
            CmdType::SurfaceFree => Cmd::SurfaceFree(CmdSurfaceFree {
                target: r.get_u64().ok_or(ProtocolError::BadPayload)?,
            }),
            CmdType::SurfaceMove => Cmd::SurfaceMove(CmdSurfaceMove {
                target: r.get_u64().ok_or(ProtocolError::BadPayload)?,
                rect: Rect::decode(&mut r).ok_or(ProtocolError::BadPayload)?,
            }),
            CmdType::SurfaceTimerSet => Cmd::SurfaceTimerSet(CmdSurfaceTimerSet {
                target: r.get_u64().ok_or(ProtocolError::BadPayload)?,
                timeout_ns: r.get_u64().ok_or(ProtocolError::BadPayload)?,
                flags: TimerFlags::from_bits_truncate(
                    r.get_u8().ok_or(ProtocolError::BadPayload)?,
                ),
            }),
            CmdType::SurfaceInvalidate => Cmd::SurfaceInvalidate(CmdSurfaceInvalidate {
                target: r.get_u64().ok_or(ProtocolError::BadPayload)?,
                rect: Rect::decode(&mut r).ok_or(ProtocolError::BadPayload)?,
            }),
            CmdType::SurfaceFocusSet => Cmd::SurfaceFocusSet(CmdSurfaceFocusSet {
                target: r.get_u64().ok_or(ProtocolError::BadPayload)?,
                is_global: r.get_u8().ok_or(ProtocolError::BadPayload)? != 0,
            }),
            CmdType::SurfaceVisibleSet => Cmd::SurfaceVisibleSet(CmdSurfaceVisibleSet {
                target: r.get_u64().ok_or(ProtocolError::BadPayload)?,
                is_global: r.get_u8().ok_or(ProtocolError::BadPayload)? != 0,
                is_visible: r.get_u8().ok_or(ProtocolError::BadPayload)? != 0,
            }),
            CmdType::SurfaceReport => Cmd::SurfaceReport(CmdSurfaceReport {
                target: r.get_u64().ok_or(ProtocolError::BadPayload)?,
                is_global: r.get_u8().ok_or(ProtocolError::BadPayload)? != 0,
            }),
            CmdType::Subscribe => Cmd::Subscribe(CmdSubscribe {
                event: r.get_u16().ok_or(ProtocolError::BadPayload)?,
            }),
            CmdType::Unsubscribe => Cmd::Unsubscribe(CmdUnsubscribe {
                event: r.get_u16().ok_or(ProtocolError::BadPayload)?,
            }),
        };
        if r.remaining() != 0 {
            return Err(ProtocolError::BadPayload);
        }
        Ok(cmd)
    }
}

/// Outgoing frame builder. Commands are appended until the frame is full;
/// [`CmdWriter::finish`] stamps the frame header and yields the wire bytes.
pub struct CmdWriter {
    buf: [u8; CMD_FRAME_MAX_SIZE],
    len: usize,
    amount: u64,
}

/// The frame has no room for the pushed command; flush and retry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CmdBufferFull;

impl CmdWriter {
    pub fn new() -> Self {
        Self {
            buf: [0; CMD_FRAME_MAX_SIZE],
            len: CMD_BUFFER_HEADER_SIZE,
            amount: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.amount == 0
    }

    pub fn push(&mut self, cmd: &Cmd) -> Result<(), CmdBufferFull> {
        // Largest payload (SurfaceNew) is well under this.
        let mut payload = [0u8; 128];
        let payload_len = {
            let mut w = Writer::new(&mut payload);
            cmd.encode_payload(&mut w);
            w.written()
        };

        let cmd_size = CMD_HEADER_SIZE + payload_len;
        if self.len + cmd_size > CMD_FRAME_MAX_SIZE {
            return Err(CmdBufferFull);
        }

        let mut w = Writer::new(&mut self.buf[self.len..]);
        w.put_u32(CMD_MAGIC);
        w.put_u32(cmd.cmd_type().into());
        w.put_u64(cmd_size as u64);
        w.put_bytes(&payload[..payload_len]);
        self.len += cmd_size;
        self.amount += 1;
        Ok(())
    }

    /// Stamps the header and returns the complete frame.
    pub fn finish(&mut self) -> &[u8] {
        let (amount, size) = (self.amount, self.len as u64);
        let mut w = Writer::new(&mut self.buf[..CMD_BUFFER_HEADER_SIZE]);
        w.put_u64(amount);
        w.put_u64(size);
        &self.buf[..self.len]
    }

    pub fn reset(&mut self) {
        self.len = CMD_BUFFER_HEADER_SIZE;
        self.amount = 0;
    }
}

impl Default for CmdWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads the declared frame size from the start of an accumulation buffer,
/// once enough bytes for the frame header have arrived.
pub fn frame_size(bytes: &[u8]) -> Option<u64> {
    if bytes.len() < CMD_BUFFER_HEADER_SIZE {
        return None;
    }
    let mut r = Reader::new(bytes);
    let _amount = r.get_u64()?;
    r.get_u64()
}

/// A validated frame. Construction walks every command header and checks the
/// magic, the type range, the bounds of each size, and that the walk covers
/// exactly the declared amount and byte count; iteration then decodes the
/// payloads. Nothing is handed out until the whole frame has validated, so a
/// corrupt frame is discarded without partial effect.
pub struct CmdFrame<'a> {
    frame: &'a [u8],
}

impl<'a> CmdFrame<'a> {
    pub fn parse(frame: &'a [u8]) -> Result<Self, ProtocolError> {
        if frame.len() > CMD_FRAME_MAX_SIZE {
            return Err(ProtocolError::FrameTooLarge);
        }
        let mut r = Reader::new(frame);
        let amount = r.get_u64().ok_or(ProtocolError::WalkOutOfBounds)?;
        let size = r.get_u64().ok_or(ProtocolError::WalkOutOfBounds)?;
        if size as usize != frame.len() {
            return Err(ProtocolError::WalkOutOfBounds);
        }

        let mut offset = CMD_BUFFER_HEADER_SIZE;
        let mut walked = 0u64;
        while offset < frame.len() {
            let (_, cmd_size) = Self::header_at(frame, offset)?;
            walked += 1;
            if walked > amount {
                return Err(ProtocolError::AmountMismatch);
            }
            offset += cmd_size;
        }
        if walked != amount {
            return Err(ProtocolError::AmountMismatch);
        }
        Ok(Self { frame })
    }

    fn header_at(frame: &[u8], offset: usize) -> Result<(CmdType, usize), ProtocolError> {
        let mut r = Reader::new(&frame[offset..]);
        let magic = r.get_u32().ok_or(ProtocolError::WalkOutOfBounds)?;
        let raw_type = r.get_u32().ok_or(ProtocolError::WalkOutOfBounds)?;
        let size = r.get_u64().ok_or(ProtocolError::WalkOutOfBounds)? as usize;
        if magic != CMD_MAGIC {
            return Err(ProtocolError::BadMagic);
        }
        let cmd_type = CmdType::try_from(raw_type).map_err(|_| ProtocolError::BadType)?;
        if size < CMD_HEADER_SIZE || offset + size > frame.len() {
            return Err(ProtocolError::WalkOutOfBounds);
        }
        Ok((cmd_type, size))
    }

    pub fn iter(&self) -> CmdFrameIter<'a> {
        CmdFrameIter {
            frame: self.frame,
            offset: CMD_BUFFER_HEADER_SIZE,
        }
    }
}

pub struct CmdFrameIter<'a> {
    frame: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for CmdFrameIter<'a> {
    type Item = Result<Cmd, ProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.frame.len() {
            return None;
        }
        // Bounds were validated by CmdFrame::parse.
        let (cmd_type, size) = match CmdFrame::header_at(self.frame, self.offset) {
            Ok(pair) => pair,
            Err(err) => return Some(Err(err)),
        };
        let payload = &self.frame[self.offset + CMD_HEADER_SIZE..self.offset + size];
        self.offset += size;
        Some(Cmd::decode_payload(cmd_type, payload))
    }
}
