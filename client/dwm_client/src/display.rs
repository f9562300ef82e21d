//! The client's connection to the window manager.
//!
//! Outbound commands are batched into one frame and flushed on demand or
//! when the frame fills; inbound events land in a small ring so synchronous
//! request/response helpers can stash whatever arrives in between. Any write
//! failure latches the connection dead and later calls become no-ops.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use dwm_api_types::cmd::{
    Cmd, CmdScreenInfo, CmdSubscribe, CmdSurfaceFocusSet, CmdSurfaceReport, CmdSurfaceVisibleSet,
    CmdUnsubscribe, CmdWriter,
};
use dwm_api_types::event::{EVENT_WIRE_SIZE, Event, EventReport, EventScreenInfo, EventType, ev};
use dwm_api_types::rect::Rect;
use dwm_api_types::surface::{SURFACE_ID_NONE, SurfaceId, SurfaceInfo};
use dwm_sys::conn::{Connection, DWM_SOCKET_NAME, StreamConn};

use crate::font::Font;
use crate::theme::Theme;
use crate::window::Window;

/// Capacity of the inbound event ring; the oldest event gives way.
pub const DISPLAY_MAX_EVENTS: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayError {
    /// The connection is gone (or was never established).
    Disconnected,
    /// No event arrived within the caller's timeout.
    TimedOut,
    /// The request itself failed (bad argument, missing resource).
    Failed,
}

impl std::fmt::Display for DisplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            DisplayError::Disconnected => "display disconnected",
            DisplayError::TimedOut => "timed out",
            DisplayError::Failed => "request failed",
        };
        f.write_str(text)
    }
}

/// Shared connection state. Windows hold an `Rc` of this so they can issue
/// commands and queue library events without going through the display.
pub(crate) struct DisplayLink {
    conn: RefCell<Box<dyn Connection>>,
    connected: Cell<bool>,
    cmds: RefCell<CmdWriter>,
    events: RefCell<heapless::Deque<Event, DISPLAY_MAX_EVENTS>>,
    default_font: RefCell<Option<Rc<Font>>>,
}

impl DisplayLink {
    fn new(conn: Box<dyn Connection>) -> Self {
        Self {
            conn: RefCell::new(conn),
            connected: Cell::new(true),
            cmds: RefCell::new(CmdWriter::new()),
            events: RefCell::new(heapless::Deque::new()),
            default_font: RefCell::new(None),
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.get()
    }

    pub(crate) fn disconnect(&self) {
        self.connected.set(false);
    }

    pub(crate) fn default_font(&self) -> Option<Rc<Font>> {
        self.default_font.borrow().clone()
    }

    /// Appends a command to the outgoing frame, flushing first if it would
    /// not fit.
    pub(crate) fn push_cmd(&self, cmd: &Cmd) {
        if !self.connected.get() {
            return;
        }
        if self.cmds.borrow_mut().push(cmd).is_ok() {
            return;
        }
        self.flush();
        if self.cmds.borrow_mut().push(cmd).is_err() {
            self.connected.set(false);
        }
    }

    pub(crate) fn flush(&self) {
        let mut cmds = self.cmds.borrow_mut();
        if cmds.is_empty() {
            return;
        }
        if self.connected.get() {
            let frame = cmds.finish();
            if self.conn.borrow_mut().send_all(frame).is_err() {
                self.connected.set(false);
            }
        }
        cmds.reset();
    }

    /// Queues a locally synthesized event; the oldest entry is dropped when
    /// the ring is full.
    pub(crate) fn queue_event(&self, event: Event) {
        let mut events = self.events.borrow_mut();
        if events.is_full() {
            events.pop_front();
        }
        let _ = events.push_back(event);
    }

    /// Pulls the next queued event matching `event_type` and `target`, if
    /// any, preserving the order of everything else.
    pub(crate) fn take_matching(&self, event_type: EventType, target: SurfaceId) -> Option<Event> {
        let mut events = self.events.borrow_mut();
        let mut taken = None;
        for _ in 0..events.len() {
            let event = events.pop_front()?;
            if taken.is_none() && event.event_type == event_type && event.target == target {
                taken = Some(event);
            } else {
                let _ = events.push_back(event);
            }
        }
        taken
    }

    fn recv_event(&self, timeout: Option<Duration>) -> Result<Event, DisplayError> {
        let mut buf = [0u8; EVENT_WIRE_SIZE];
        let mut filled = 0;
        let mut conn = self.conn.borrow_mut();

        // Bound the wait up front; the socket itself may be blocking.
        match conn.wait_readable(timeout) {
            Ok(true) => {}
            Ok(false) => return Err(DisplayError::TimedOut),
            Err(_) => {
                self.connected.set(false);
                return Err(DisplayError::Disconnected);
            }
        }

        while filled < EVENT_WIRE_SIZE {
            match conn.recv(&mut buf[filled..]) {
                Ok(0) => {
                    self.connected.set(false);
                    return Err(DisplayError::Disconnected);
                }
                Ok(read) => filled += read,
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    // Events are written atomically; the rest of this one is
                    // already in flight.
                    match conn.wait_readable(timeout) {
                        Ok(true) => {}
                        Ok(false) => return Err(DisplayError::TimedOut),
                        Err(_) => {
                            self.connected.set(false);
                            return Err(DisplayError::Disconnected);
                        }
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
                Err(_) => {
                    self.connected.set(false);
                    return Err(DisplayError::Disconnected);
                }
            }
        }
        Ok(Event::decode(&buf))
    }

    /// Next event: the local queue first, then the socket.
    pub(crate) fn next_event(&self, timeout: Option<Duration>) -> Result<Event, DisplayError> {
        if let Some(event) = self.events.borrow_mut().pop_front() {
            return Ok(event);
        }
        if !self.connected.get() {
            return Err(DisplayError::Disconnected);
        }
        self.recv_event(timeout)
    }

    /// Blocks until an event of `expected` type arrives; anything else read
    /// in the meantime is stashed back onto the ring.
    pub(crate) fn wait_for_event(&self, expected: EventType) -> Result<Event, DisplayError> {
        {
            let mut events = self.events.borrow_mut();
            for _ in 0..events.len() {
                let event = events.pop_front().expect("len checked");
                if event.event_type == expected {
                    return Ok(event);
                }
                let _ = events.push_back(event);
            }
        }

        loop {
            let event = self.recv_event(None)?;
            if event.event_type == expected {
                return Ok(event);
            }
            self.queue_event(event);
        }
    }
}

pub struct Display {
    link: Rc<DisplayLink>,
    windows: Vec<Option<Window>>,
}

impl Display {
    /// Connects to the server's well-known socket.
    pub fn connect() -> Result<Self, DisplayError> {
        let conn = StreamConn::connect(DWM_SOCKET_NAME).map_err(|_| DisplayError::Disconnected)?;
        Ok(Self::from_conn(Box::new(conn)))
    }

    /// Builds a display over an existing transport (tests use loopback).
    pub fn from_conn(conn: Box<dyn Connection>) -> Self {
        let link = Rc::new(DisplayLink::new(conn));

        // Missing font assets degrade text drawing to a no-op rather than
        // failing the connection; hosts without .grf files still run.
        let theme = Theme::global();
        if !theme.default_font.is_empty() {
            match Font::open_family(&theme.fonts_dir, &theme.default_font, "regular", 16) {
                Ok(font) => *link.default_font.borrow_mut() = Some(Rc::new(font)),
                Err(err) => log::warn!("default font unavailable: {err:?}"),
            }
        }

        Self {
            link,
            windows: Vec::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    pub fn default_font(&self) -> Option<Rc<Font>> {
        self.link.default_font()
    }

    pub(crate) fn link(&self) -> Rc<DisplayLink> {
        self.link.clone()
    }

    /// Queries screen geometry. Only index 0 exists today. Returns the zero
    /// rect when the display is gone.
    pub fn screen_rect(&self, index: u64) -> Rect {
        self.link.push_cmd(&Cmd::ScreenInfo(CmdScreenInfo { index }));
        self.link.flush();
        match self.link.wait_for_event(ev::SCREEN_INFO) {
            Ok(event) => {
                let info = event.payload::<EventScreenInfo>().unwrap_or_default();
                Rect::from_dim(0, 0, info.width as i32, info.height as i32)
            }
            Err(_) => Rect::ZERO,
        }
    }

    /// Snapshot of any surface on the display (not just ours).
    pub fn surface_info(&self, id: SurfaceId) -> Result<SurfaceInfo, DisplayError> {
        self.link.push_cmd(&Cmd::SurfaceReport(CmdSurfaceReport {
            target: id,
            is_global: true,
        }));
        self.link.flush();
        let event = self.link.wait_for_event(ev::REPORT)?;
        event
            .payload::<EventReport>()
            .map(|report| report.info)
            .ok_or(DisplayError::Failed)
    }

    pub fn set_focus(&self, id: SurfaceId) {
        self.link.push_cmd(&Cmd::SurfaceFocusSet(CmdSurfaceFocusSet {
            target: id,
            is_global: true,
        }));
        self.link.flush();
    }

    pub fn set_visible(&self, id: SurfaceId, visible: bool) {
        self.link
            .push_cmd(&Cmd::SurfaceVisibleSet(CmdSurfaceVisibleSet {
                target: id,
                is_global: true,
                is_visible: visible,
            }));
        self.link.flush();
    }

    pub fn subscribe(&self, event: EventType) {
        self.link.push_cmd(&Cmd::Subscribe(CmdSubscribe { event }));
        self.link.flush();
    }

    pub fn unsubscribe(&self, event: EventType) {
        self.link.push_cmd(&Cmd::Unsubscribe(CmdUnsubscribe { event }));
        self.link.flush();
    }

    /// Returns the next event for this client: queued library events first,
    /// then whatever the server sends within `timeout` (`None` blocks).
    pub fn next_event(&self, timeout: Option<Duration>) -> Result<Event, DisplayError> {
        self.link.next_event(timeout)
    }

    /// Routes an event to the window owning `event.target`, or to every
    /// window for an untargeted event, then flushes any commands the
    /// procedures produced.
    pub fn dispatch(&mut self, event: &Event) {
        for slot in self.windows.iter_mut() {
            let Some(window) = slot.as_mut() else {
                continue;
            };
            let targeted = event.target == window.surface_id();
            if !targeted && event.target != SURFACE_ID_NONE {
                continue;
            }
            if window.dispatch(event).is_err() {
                self.link.disconnect();
            }
            if targeted {
                break;
            }
        }
        self.link.flush();
    }

    /// Creates a window (and its surface) and returns the surface id used to
    /// address it from now on.
    #[allow(clippy::too_many_arguments)]
    pub fn create_window(
        &mut self,
        name: &str,
        rect: &Rect,
        surface_type: dwm_api_types::surface::SurfaceType,
        flags: crate::window::WindowFlags,
        procedure: crate::element::Procedure,
        private: Option<Box<dyn std::any::Any>>,
    ) -> Result<SurfaceId, DisplayError> {
        let window = Window::new(
            self.link.clone(),
            name,
            rect,
            surface_type,
            flags,
            procedure,
            private,
        )?;
        let id = window.surface_id();
        if let Some(slot) = self.windows.iter_mut().find(|slot| slot.is_none()) {
            *slot = Some(window);
        } else {
            self.windows.push(Some(window));
        }
        Ok(id)
    }

    pub fn window_mut(&mut self, id: SurfaceId) -> Option<&mut Window> {
        self.windows
            .iter_mut()
            .filter_map(|slot| slot.as_mut())
            .find(|window| window.surface_id() == id)
    }

    /// Drops the window, freeing its surface on the server.
    pub fn destroy_window(&mut self, id: SurfaceId) {
        for slot in self.windows.iter_mut() {
            if slot.as_ref().is_some_and(|w| w.surface_id() == id) {
                *slot = None;
                return;
            }
        }
    }
}
