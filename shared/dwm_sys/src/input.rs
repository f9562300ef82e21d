//! Raw input device streams.
//!
//! The PS/2 driver layer exposes keyboard and mouse events as text token
//! streams (`<keycode><suffix>\n` and `<value><suffix>\n`); the server only
//! needs to pull whatever bytes are currently available.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

pub const KBD_EVENTS_PATH: &str = "/dev/kbd/0/events";
pub const MOUSE_EVENTS_PATH: &str = "/dev/mouse/0/events";

const O_NONBLOCK: i32 = 0o4000;

/// A nonblocking byte stream. `try_read` returns `WouldBlock` when no bytes
/// are pending; input devices never reach end of stream.
pub trait ByteSource {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Production source: an event file opened nonblocking.
pub struct DevSource {
    file: File,
}

impl DevSource {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(O_NONBLOCK)
            .open(path)?;
        Ok(Self { file })
    }
}

impl ByteSource for DevSource {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.file.read(buf) {
            Ok(0) => Err(io::ErrorKind::WouldBlock.into()),
            other => other,
        }
    }
}

/// Test source fed by the test itself.
#[derive(Default)]
pub struct ScriptedSource {
    data: VecDeque<u8>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str(&mut self, tokens: &str) {
        self.data.extend(tokens.bytes());
    }

    pub fn is_drained(&self) -> bool {
        self.data.is_empty()
    }
}

impl ByteSource for ScriptedSource {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.data.is_empty() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let count = buf.len().min(self.data.len());
        for slot in &mut buf[..count] {
            *slot = self.data.pop_front().unwrap();
        }
        Ok(count)
    }
}

// Lets a test keep a handle to the source it handed to the server.
impl ByteSource for std::rc::Rc<std::cell::RefCell<ScriptedSource>> {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.borrow_mut().try_read(buf)
    }
}

/// A source fed across threads, for harnesses that run the server on its own
/// thread while the test injects input from outside.
pub struct ChannelSource {
    rx: std::sync::mpsc::Receiver<Vec<u8>>,
    pending: VecDeque<u8>,
}

impl ChannelSource {
    pub fn new() -> (std::sync::mpsc::Sender<Vec<u8>>, Self) {
        let (tx, rx) = std::sync::mpsc::channel();
        (
            tx,
            Self {
                rx,
                pending: VecDeque::new(),
            },
        )
    }
}

impl ByteSource for ChannelSource {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while let Ok(chunk) = self.rx.try_recv() {
            self.pending.extend(chunk);
        }
        if self.pending.is_empty() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let count = buf.len().min(self.pending.len());
        for slot in &mut buf[..count] {
            *slot = self.pending.pop_front().unwrap();
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_source_yields_pushed_bytes_then_blocks() {
        let mut source = ScriptedSource::new();
        source.push_str("10x-3y_\n");

        let mut buf = [0u8; 4];
        assert_eq!(source.try_read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"10x-");
        assert_eq!(source.try_read(&mut buf).unwrap(), 4);
        assert!(source.is_drained());
        assert_eq!(
            source.try_read(&mut buf).unwrap_err().kind(),
            io::ErrorKind::WouldBlock
        );
    }
}
