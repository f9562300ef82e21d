//! Per-connection client sessions: command framing in, events out.

use std::io;

use dwm_api_types::cmd::{self, Cmd, CmdFrame, CMD_FRAME_MAX_SIZE, ProtocolError};
use dwm_api_types::event::Event;
use dwm_api_types::mask::EventMask;
use dwm_api_types::surface::SurfaceId;
use dwm_sys::conn::Connection;

pub type ClientId = u64;

/// Room for two maximal frames so a full frame plus a partial tail fit.
pub const RECV_BUFFER_SIZE: usize = 2 * CMD_FRAME_MAX_SIZE;

/// Why a client must be torn down.
#[derive(Debug)]
pub enum ClientError {
    /// Clean end of stream.
    Disconnected,
    /// The client violated the framing rules; the frame was discarded.
    Protocol(ProtocolError),
    /// The socket failed under us.
    Io(io::Error),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Disconnected => write!(f, "end of stream"),
            ClientError::Protocol(err) => write!(f, "protocol violation: {err:?}"),
            ClientError::Io(err) => write!(f, "socket error: {err}"),
        }
    }
}

pub struct ClientSession {
    pub id: ClientId,
    conn: Box<dyn Connection>,
    recv: Box<[u8]>,
    recv_len: usize,
    pub mask: EventMask,
    /// Ids of owned surfaces, ascending (ids are handed out monotonically).
    pub surfaces: Vec<SurfaceId>,
}

impl ClientSession {
    pub fn new(id: ClientId, conn: Box<dyn Connection>) -> Self {
        Self {
            id,
            conn,
            recv: vec![0; RECV_BUFFER_SIZE].into_boxed_slice(),
            recv_len: 0,
            mask: EventMask::DEFAULT,
            surfaces: Vec::new(),
        }
    }

    pub fn owns_surface(&self, id: SurfaceId) -> bool {
        self.surfaces.binary_search(&id).is_ok()
    }

    pub fn forget_surface(&mut self, id: SurfaceId) {
        if let Ok(index) = self.surfaces.binary_search(&id) {
            self.surfaces.remove(index);
        }
    }

    /// Writes one event if the client's subscription mask has its bit set.
    /// A masked-out event writes nothing at all.
    pub fn send_event(&mut self, event: &Event) -> io::Result<()> {
        if !self.mask.contains(event.event_type) {
            return Ok(());
        }
        self.conn.send_all(&event.encode())
    }

    /// Pulls whatever bytes are available and decodes every complete frame.
    /// Commands are only returned once their whole frame validated, so a
    /// corrupt frame yields an error and no commands.
    pub fn receive_cmds(&mut self) -> Result<Vec<Cmd>, ClientError> {
        let free = RECV_BUFFER_SIZE - self.recv_len;
        if free == 0 {
            log::warn!("client {}: receive buffer full", self.id);
            return Err(ClientError::Protocol(ProtocolError::FrameTooLarge));
        }

        match self.conn.recv(&mut self.recv[self.recv_len..]) {
            Ok(0) => return Err(ClientError::Disconnected),
            Ok(read) => self.recv_len += read,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(Vec::new()),
            Err(err) => return Err(ClientError::Io(err)),
        }

        let mut cmds = Vec::new();
        while self.recv_len > 0 {
            let Some(size) = cmd::frame_size(&self.recv[..self.recv_len]) else {
                break;
            };
            let size = size as usize;
            if size > CMD_FRAME_MAX_SIZE || size < cmd::CMD_BUFFER_HEADER_SIZE {
                return Err(ClientError::Protocol(ProtocolError::FrameTooLarge));
            }
            if self.recv_len < size {
                break;
            }

            let frame =
                CmdFrame::parse(&self.recv[..size]).map_err(ClientError::Protocol)?;
            for cmd in frame.iter() {
                cmds.push(cmd.map_err(ClientError::Protocol)?);
            }

            // Shift any trailing partial frame to the front.
            self.recv.copy_within(size..self.recv_len, 0);
            self.recv_len -= size;
        }
        Ok(cmds)
    }
}
