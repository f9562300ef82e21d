//! Byte transport between the server and its clients.
//!
//! The production transport is a local stream socket bound at a well-known
//! name. Tests use an in-memory loopback pair so a whole server/client
//! round trip runs deterministically in one thread.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

/// Well-known name the server binds its listening socket to.
pub const DWM_SOCKET_NAME: &str = "dwm";

/// Resolves the filesystem path backing a local socket name.
pub fn socket_path(name: &str) -> PathBuf {
    let dir = std::env::var_os("DWM_SOCKET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    dir.join(format!("{name}.socket"))
}

/// A bidirectional, message-agnostic byte pipe.
///
/// `recv` never blocks on the server side: it returns `WouldBlock` when no
/// bytes are available and `Ok(0)` at end of stream. `send_all` writes the
/// whole buffer, retrying interrupted writes; any other failure is final.
pub trait Connection {
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn send_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Waits up to `timeout` (forever if `None`) for readable bytes. Returns
    /// whether a subsequent `recv` will make progress.
    fn wait_readable(&mut self, timeout: Option<Duration>) -> io::Result<bool>;
}

/// Accepts inbound connections without blocking.
pub trait Listener {
    fn try_accept(&mut self) -> io::Result<Option<Box<dyn Connection>>>;
}

// ─── Production: unix sockets ──────────────────────────────────────────────

pub struct StreamConn {
    stream: UnixStream,
}

impl StreamConn {
    /// Client side: connect to the server's well-known socket. The stream
    /// stays blocking; `wait_readable` applies a read timeout around peeks.
    pub fn connect(name: &str) -> io::Result<Self> {
        let stream = UnixStream::connect(socket_path(name))?;
        Ok(Self { stream })
    }

    fn from_accepted(stream: UnixStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self { stream })
    }
}

impl Connection for StreamConn {
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    fn send_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut sent = 0;
        while sent < bytes.len() {
            match self.stream.write(&bytes[sent..]) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => sent += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn wait_readable(&mut self, timeout: Option<Duration>) -> io::Result<bool> {
        // A zero timeout is invalid for SO_RCVTIMEO; round up to the shortest
        // representable wait.
        let timeout = timeout.map(|t| t.max(Duration::from_millis(1)));
        self.stream.set_read_timeout(timeout)?;
        let mut probe = [0u8; 1];
        let result = match self.stream.peek(&mut probe) {
            Ok(_) => Ok(true),
            Err(err)
                if err.kind() == io::ErrorKind::WouldBlock
                    || err.kind() == io::ErrorKind::TimedOut =>
            {
                Ok(false)
            }
            Err(err) => Err(err),
        };
        self.stream.set_read_timeout(None)?;
        result
    }
}

pub struct SocketListener {
    listener: UnixListener,
    path: PathBuf,
}

impl SocketListener {
    /// Binds and listens at the well-known name. A stale socket file from a
    /// previous run is replaced.
    pub fn bind(name: &str) -> io::Result<Self> {
        let path = socket_path(name);
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path)?;
        listener.set_nonblocking(true)?;
        Ok(Self { listener, path })
    }
}

impl Listener for SocketListener {
    fn try_accept(&mut self) -> io::Result<Option<Box<dyn Connection>>> {
        match self.listener.accept() {
            Ok((stream, _)) => Ok(Some(Box::new(StreamConn::from_accepted(stream)?))),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl Drop for SocketListener {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

// ─── Test transport: in-memory loopback ────────────────────────────────────

#[derive(Default)]
struct PipeEnd {
    data: RefCell<VecDeque<u8>>,
    closed: Cell<bool>,
}

/// One side of an in-memory byte pipe. Cloning is shallow; a clone talks over
/// the same pipe.
#[derive(Clone)]
pub struct PipeConn {
    rx: Rc<PipeEnd>,
    tx: Rc<PipeEnd>,
}

/// Creates a connected pair of in-memory pipes.
pub fn loopback() -> (PipeConn, PipeConn) {
    let a = Rc::new(PipeEnd::default());
    let b = Rc::new(PipeEnd::default());
    (
        PipeConn {
            rx: a.clone(),
            tx: b.clone(),
        },
        PipeConn { rx: b, tx: a },
    )
}

impl PipeConn {
    /// Marks this side hung up; the peer observes end of stream.
    pub fn close(&self) {
        self.tx.closed.set(true);
        self.rx.closed.set(true);
    }
}

impl Connection for PipeConn {
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut data = self.rx.data.borrow_mut();
        if data.is_empty() {
            if self.rx.closed.get() {
                return Ok(0);
            }
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let count = buf.len().min(data.len());
        for slot in &mut buf[..count] {
            *slot = data.pop_front().unwrap();
        }
        Ok(count)
    }

    fn send_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.tx.closed.get() {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        self.tx.data.borrow_mut().extend(bytes);
        Ok(())
    }

    fn wait_readable(&mut self, _timeout: Option<Duration>) -> io::Result<bool> {
        // Loopback time is driven by the test itself; report current state.
        Ok(!self.rx.data.borrow().is_empty() || self.rx.closed.get())
    }
}

/// A listener fed directly by the test: each `connect` queues the server half
/// of a fresh pipe for the next `try_accept`.
#[derive(Clone, Default)]
pub struct LoopbackListener {
    backlog: Rc<RefCell<VecDeque<PipeConn>>>,
}

impl LoopbackListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self) -> PipeConn {
        let (client, server) = loopback();
        self.backlog.borrow_mut().push_back(server);
        client
    }
}

impl Listener for LoopbackListener {
    fn try_accept(&mut self) -> io::Result<Option<Box<dyn Connection>>> {
        Ok(self
            .backlog
            .borrow_mut()
            .pop_front()
            .map(|conn| Box::new(conn) as Box<dyn Connection>))
    }
}
