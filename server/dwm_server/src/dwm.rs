//! The window manager core: accept loop, command dispatch, input pipelines,
//! focus policy, timers and the per-iteration composition step.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use dwm_api_types::cmd::{
    Cmd, CmdScreenInfo, CmdSubscribe, CmdSurfaceFocusSet, CmdSurfaceFree, CmdSurfaceInvalidate,
    CmdSurfaceMove, CmdSurfaceNew, CmdSurfaceReport, CmdSurfaceTimerSet, CmdSurfaceVisibleSet,
    CmdUnsubscribe,
};
use dwm_api_types::event::{
    Event, EventKbd, EventMouse, EventReport, EventScreenInfo, EventSurfaceNew, ev,
};
use dwm_api_types::input::{KbdEventKind, KbdMods, Keycode, MouseButtons};
use dwm_api_types::point::Point;
use dwm_api_types::surface::{
    ReportFlags, SURFACE_ID_NONE, SurfaceFlags, SurfaceId, SurfaceType,
};
use dwm_sys::conn::Listener;
use dwm_sys::fb::Framebuffer;
use dwm_sys::input::ByteSource;

use crate::client::{ClientError, ClientId, ClientSession};
use crate::compositor::{Compositor, Scene};
use crate::keymap;
use crate::screen::Screen;
use crate::surface::Surface;

/// Upper bound on one idle sleep; keeps input latency bounded.
pub const TICK: Duration = Duration::from_millis(2);

/// Why a single command failed. None of these tear the client down; the
/// framing layer already guarantees the command was well-formed on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmdError {
    InvalidArgument,
    NoSuchSurface,
    AlreadyExists,
    Unimplemented,
}

impl std::fmt::Display for CmdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            CmdError::InvalidArgument => "invalid argument",
            CmdError::NoSuchSurface => "no such surface",
            CmdError::AlreadyExists => "already exists",
            CmdError::Unimplemented => "not implemented",
        };
        f.write_str(text)
    }
}

pub struct Dwm<F: Framebuffer> {
    listener: Box<dyn Listener>,
    kbd: Box<dyn ByteSource>,
    mouse: Box<dyn ByteSource>,

    clients: Vec<ClientSession>,
    dead: Vec<ClientId>,
    next_client_id: ClientId,

    surfaces: BTreeMap<SurfaceId, Surface>,
    next_surface_id: SurfaceId,

    /// Bottom-to-top paint order; the focused window sits at the back.
    windows: Vec<SurfaceId>,
    panels: Vec<SurfaceId>,
    wall: Option<SurfaceId>,
    cursor: Option<SurfaceId>,
    fullscreen: Option<SurfaceId>,

    focus: Option<SurfaceId>,
    prev_cursor_target: Option<SurfaceId>,

    screen: Screen<F>,
    compositor: Compositor,

    mods: KbdMods,
    kbd_pending: Vec<u8>,
    mouse_buttons: MouseButtons,
    prev_held: MouseButtons,
    mouse_pending: Vec<u8>,
}

impl<F: Framebuffer> Dwm<F> {
    pub fn new(
        fb: F,
        listener: Box<dyn Listener>,
        kbd: Box<dyn ByteSource>,
        mouse: Box<dyn ByteSource>,
    ) -> Self {
        let screen = Screen::new(fb);
        let compositor = Compositor::new(screen.rect());
        log::info!(
            "screen {}x{} ready, listening for clients",
            screen.width(),
            screen.height()
        );
        Self {
            listener,
            kbd,
            mouse,
            clients: Vec::new(),
            dead: Vec::new(),
            next_client_id: 1,
            surfaces: BTreeMap::new(),
            next_surface_id: 0,
            windows: Vec::new(),
            panels: Vec::new(),
            wall: None,
            cursor: None,
            fullscreen: None,
            focus: None,
            prev_cursor_target: None,
            screen,
            compositor,
            mods: KbdMods::empty(),
            kbd_pending: Vec::new(),
            mouse_buttons: MouseButtons::empty(),
            prev_held: MouseButtons::empty(),
            mouse_pending: Vec::new(),
        }
    }

    // ─── Introspection (used by tests and the binary) ──────────────────────

    pub fn screen(&self) -> &Screen<F> {
        &self.screen
    }

    pub fn focus(&self) -> Option<SurfaceId> {
        self.focus
    }

    pub fn window_order(&self) -> &[SurfaceId] {
        &self.windows
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(&id)
    }

    // ─── Main loop ─────────────────────────────────────────────────────────

    pub fn run(&mut self) -> ! {
        loop {
            self.update();
            std::thread::sleep(self.idle_timeout());
        }
    }

    /// One iteration: timers, accept, input, client commands, composition.
    /// Accepting a client ends the iteration early.
    pub fn update(&mut self) {
        self.fire_due_timer();

        if self.accept_client() {
            return;
        }

        self.kbd_read();
        self.mouse_read();
        self.service_clients();
        self.reap_dead();

        self.compositor.draw(
            &mut self.screen,
            &Scene {
                surfaces: &self.surfaces,
                windows: &self.windows,
                panels: &self.panels,
                wall: self.wall,
                cursor: self.cursor,
                fullscreen: self.fullscreen,
            },
        );
    }

    /// How long the loop may sleep before the next timer is due.
    pub fn idle_timeout(&self) -> Duration {
        match self.next_deadline() {
            Some(deadline) => deadline
                .saturating_duration_since(Instant::now())
                .min(TICK),
            None => TICK,
        }
    }

    // ─── Clients ───────────────────────────────────────────────────────────

    fn accept_client(&mut self) -> bool {
        match self.listener.try_accept() {
            Ok(Some(conn)) => {
                let id = self.next_client_id;
                self.next_client_id += 1;
                self.clients.push(ClientSession::new(id, conn));
                log::info!("accepted client {id}, total {}", self.clients.len());
                true
            }
            Ok(None) => false,
            Err(err) => {
                log::warn!("accept failed: {err}");
                false
            }
        }
    }

    fn service_clients(&mut self) {
        let ids: Vec<ClientId> = self.clients.iter().map(|c| c.id).collect();
        for id in ids {
            if self.dead.contains(&id) {
                continue;
            }
            let Some(session) = self.clients.iter_mut().find(|c| c.id == id) else {
                continue;
            };
            let cmds = match session.receive_cmds() {
                Ok(cmds) => cmds,
                Err(err) => {
                    log::info!("client {id}: {err}");
                    self.dead.push(id);
                    continue;
                }
            };
            for cmd in cmds {
                let cmd_type = cmd.cmd_type();
                if let Err(err) = self.dispatch_cmd(id, cmd) {
                    log::warn!("client {id}: command {cmd_type:?} failed: {err}");
                }
            }
        }
    }

    fn reap_dead(&mut self) {
        while let Some(id) = self.dead.pop() {
            self.disconnect(id);
        }
    }

    fn disconnect(&mut self, id: ClientId) {
        let Some(index) = self.clients.iter().position(|c| c.id == id) else {
            return;
        };
        let session = self.clients.remove(index);
        for sid in session.surfaces {
            if let Some(surface) = self.surfaces.get(&sid) {
                let rect = surface.screen_rect();
                self.compositor.invalidate(&rect);
            }
            self.detach(sid);
            if let Some(surface) = self.surfaces.remove(&sid) {
                surface.free();
            }
        }
        log::info!("disconnected client {id}, total {}", self.clients.len());
    }

    fn send_to(&mut self, client: ClientId, event: &Event) {
        let Some(session) = self.clients.iter_mut().find(|c| c.id == client) else {
            return;
        };
        if let Err(err) = session.send_event(event) {
            log::info!("client {client}: event write failed: {err}");
            self.dead.push(client);
        }
    }

    fn broadcast(&mut self, event: &Event) {
        for index in 0..self.clients.len() {
            let session = &mut self.clients[index];
            let id = session.id;
            if let Err(err) = session.send_event(event) {
                log::info!("client {id}: event write failed: {err}");
                if !self.dead.contains(&id) {
                    self.dead.push(id);
                }
            }
        }
    }

    // ─── Surface bookkeeping ───────────────────────────────────────────────

    /// Sends a report to `to` and mirrors it to global subscribers.
    fn report_produce(&mut self, sid: SurfaceId, to: ClientId, flags: ReportFlags) {
        let Some(surface) = self.surfaces.get(&sid) else {
            return;
        };
        let report = EventReport {
            flags,
            info: surface.info(),
        };
        self.send_to(to, &Event::with_payload(sid, ev::REPORT, &report));
        self.broadcast(&Event::with_payload(
            SURFACE_ID_NONE,
            ev::GLOBAL_REPORT,
            &report,
        ));
    }

    /// Inserts a surface into the scene. Singleton slots reject duplicates.
    fn attach(&mut self, surface: Surface) -> Result<(), CmdError> {
        let id = surface.id;
        match surface.surface_type {
            SurfaceType::Window => self.windows.push(id),
            SurfaceType::Panel => self.panels.push(id),
            SurfaceType::Cursor => {
                if self.cursor.is_some() {
                    surface.free();
                    return Err(CmdError::AlreadyExists);
                }
                self.cursor = Some(id);
            }
            SurfaceType::Wall => {
                if self.wall.is_some() {
                    surface.free();
                    return Err(CmdError::AlreadyExists);
                }
                self.wall = Some(id);
            }
            SurfaceType::Fullscreen => {
                if self.fullscreen.is_some() {
                    surface.free();
                    return Err(CmdError::AlreadyExists);
                }
                self.fullscreen = Some(id);
                self.focus = Some(id);
            }
        }

        let info = surface.info();
        self.surfaces.insert(id, surface);
        self.broadcast(&Event::with_payload(
            SURFACE_ID_NONE,
            ev::GLOBAL_ATTACH,
            &EventReport {
                flags: ReportFlags::empty(),
                info,
            },
        ));
        Ok(())
    }

    fn detach(&mut self, sid: SurfaceId) {
        if self.focus == Some(sid) {
            self.focus = None;
        }
        if self.prev_cursor_target == Some(sid) {
            self.prev_cursor_target = None;
        }

        if let Some(surface) = self.surfaces.get(&sid) {
            let info = surface.info();
            self.broadcast(&Event::with_payload(
                SURFACE_ID_NONE,
                ev::GLOBAL_DETACH,
                &EventReport {
                    flags: ReportFlags::empty(),
                    info,
                },
            ));
        }

        self.windows.retain(|&id| id != sid);
        self.panels.retain(|&id| id != sid);
        if self.wall == Some(sid) {
            self.wall = None;
        }
        if self.cursor == Some(sid) {
            self.cursor = None;
        }
        if self.fullscreen == Some(sid) {
            self.fullscreen = None;
            self.focus = None;
        }
    }

    /// Focus transfer. A live fullscreen surface pins focus; re-focusing the
    /// current surface is a no-op. Focusing a window also raises it.
    pub fn focus_set(&mut self, surface: Option<SurfaceId>) {
        if self.fullscreen.is_some() {
            return;
        }
        if surface == self.focus {
            return;
        }

        if let Some(old) = self.focus.take() {
            if let Some(s) = self.surfaces.get_mut(&old) {
                s.flags.remove(SurfaceFlags::FOCUSED);
                let owner = s.client;
                self.report_produce(old, owner, ReportFlags::IS_FOCUSED);
            }
        }

        let Some(new) = surface else {
            return;
        };
        let Some(s) = self.surfaces.get_mut(&new) else {
            return;
        };
        s.flags.insert(SurfaceFlags::FOCUSED);
        let owner = s.client;
        if s.surface_type == SurfaceType::Window {
            self.windows.retain(|&id| id != new);
            self.windows.push(new);
        }
        self.focus = Some(new);
        self.report_produce(new, owner, ReportFlags::IS_FOCUSED);
    }

    fn surface_under_point(&self, point: Point) -> Option<SurfaceId> {
        if let Some(fs) = self.fullscreen {
            return Some(fs);
        }
        for &id in self.panels.iter().rev() {
            if self.surfaces[&id].screen_rect().contains_point(point) {
                return Some(id);
            }
        }
        for &id in self.windows.iter().rev() {
            if self.surfaces[&id].screen_rect().contains_point(point) {
                return Some(id);
            }
        }
        let wall = self.wall?;
        self.surfaces[&wall]
            .screen_rect()
            .contains_point(point)
            .then_some(wall)
    }

    fn client_surface(&self, client: ClientId, target: SurfaceId) -> Option<SurfaceId> {
        let session = self.clients.iter().find(|c| c.id == client)?;
        session.owns_surface(target).then_some(target)
    }

    fn resolve_surface(
        &self,
        client: ClientId,
        target: SurfaceId,
        is_global: bool,
    ) -> Option<SurfaceId> {
        if is_global {
            self.surfaces.contains_key(&target).then_some(target)
        } else {
            self.client_surface(client, target)
        }
    }

    // ─── Command dispatch ──────────────────────────────────────────────────

    fn dispatch_cmd(&mut self, client: ClientId, cmd: Cmd) -> Result<(), CmdError> {
        match cmd {
            Cmd::ScreenInfo(c) => self.action_screen_info(client, c),
            Cmd::SurfaceNew(c) => self.action_surface_new(client, c),
            Cmd::SurfaceFree(c) => self.action_surface_free(client, c),
            Cmd::SurfaceMove(c) => self.action_surface_move(client, c),
            Cmd::SurfaceTimerSet(c) => self.action_surface_timer_set(client, c),
            Cmd::SurfaceInvalidate(c) => self.action_surface_invalidate(client, c),
            Cmd::SurfaceFocusSet(c) => self.action_surface_focus_set(client, c),
            Cmd::SurfaceVisibleSet(c) => self.action_surface_visible_set(client, c),
            Cmd::SurfaceReport(c) => self.action_surface_report(client, c),
            Cmd::Subscribe(c) => self.action_subscribe(client, c),
            Cmd::Unsubscribe(c) => self.action_unsubscribe(client, c),
        }
    }

    fn action_screen_info(&mut self, client: ClientId, cmd: CmdScreenInfo) -> Result<(), CmdError> {
        if cmd.index != 0 {
            return Err(CmdError::InvalidArgument);
        }
        let info = EventScreenInfo {
            width: self.screen.width() as u64,
            height: self.screen.height() as u64,
        };
        self.send_to(
            client,
            &Event::with_payload(SURFACE_ID_NONE, ev::SCREEN_INFO, &info),
        );
        Ok(())
    }

    fn action_surface_new(&mut self, client: ClientId, cmd: CmdSurfaceNew) -> Result<(), CmdError> {
        let width = cmd.rect.width();
        let height = cmd.rect.height();
        if width <= 0 || height <= 0 {
            return Err(CmdError::InvalidArgument);
        }

        let id = self.next_surface_id;
        self.next_surface_id += 1;

        let surface = Surface::new(
            id,
            client,
            cmd.name,
            cmd.rect.top_left(),
            width as u32,
            height as u32,
            cmd.surface_type,
        );
        let shmem_key = surface.shmem_key();
        self.attach(surface)?;

        if let Some(session) = self.clients.iter_mut().find(|c| c.id == client) {
            session.surfaces.push(id);
        }
        self.send_to(
            client,
            &Event::with_payload(id, ev::SURFACE_NEW, &EventSurfaceNew { shmem_key }),
        );
        Ok(())
    }

    fn action_surface_free(
        &mut self,
        client: ClientId,
        cmd: CmdSurfaceFree,
    ) -> Result<(), CmdError> {
        let sid = self
            .client_surface(client, cmd.target)
            .ok_or(CmdError::NoSuchSurface)?;

        let rect = self.surfaces[&sid].screen_rect();
        self.compositor.invalidate(&rect);

        if let Some(session) = self.clients.iter_mut().find(|c| c.id == client) {
            session.forget_surface(sid);
        }
        self.detach(sid);
        if let Some(surface) = self.surfaces.remove(&sid) {
            surface.free();
        }
        Ok(())
    }

    fn action_surface_move(
        &mut self,
        client: ClientId,
        cmd: CmdSurfaceMove,
    ) -> Result<(), CmdError> {
        let sid = self
            .client_surface(client, cmd.target)
            .ok_or(CmdError::NoSuchSurface)?;

        let surface = self.surfaces.get_mut(&sid).ok_or(CmdError::NoSuchSurface)?;
        if surface.width as i32 != cmd.rect.width() || surface.height as i32 != cmd.rect.height() {
            return Err(CmdError::Unimplemented);
        }

        let old_rect = surface.screen_rect();
        surface.pos = cmd.rect.top_left();
        let new_rect = surface.screen_rect();
        let owner = surface.client;

        self.compositor.invalidate(&old_rect);
        self.compositor.invalidate(&new_rect);
        self.report_produce(sid, owner, ReportFlags::RECT);
        Ok(())
    }

    fn action_surface_timer_set(
        &mut self,
        client: ClientId,
        cmd: CmdSurfaceTimerSet,
    ) -> Result<(), CmdError> {
        let sid = self
            .client_surface(client, cmd.target)
            .ok_or(CmdError::NoSuchSurface)?;
        let surface = self.surfaces.get_mut(&sid).ok_or(CmdError::NoSuchSurface)?;
        surface.timer.set(cmd.flags, cmd.timeout_ns, Instant::now());
        Ok(())
    }

    fn action_surface_invalidate(
        &mut self,
        client: ClientId,
        cmd: CmdSurfaceInvalidate,
    ) -> Result<(), CmdError> {
        if cmd.rect.has_negative_dims() {
            return Err(CmdError::InvalidArgument);
        }
        let sid = self
            .client_surface(client, cmd.target)
            .ok_or(CmdError::NoSuchSurface)?;
        let surface = &self.surfaces[&sid];

        let fit = cmd.rect.fitted(&surface.content_rect());
        let screen_rect = fit.translated(surface.pos);
        self.compositor.invalidate(&screen_rect);
        Ok(())
    }

    fn action_surface_focus_set(
        &mut self,
        client: ClientId,
        cmd: CmdSurfaceFocusSet,
    ) -> Result<(), CmdError> {
        // A stale id is not an error; focus races are expected.
        let Some(sid) = self.resolve_surface(client, cmd.target, cmd.is_global) else {
            return Ok(());
        };
        self.focus_set(Some(sid));
        let rect = self.surfaces[&sid].screen_rect();
        self.compositor.invalidate(&rect);
        Ok(())
    }

    fn action_surface_visible_set(
        &mut self,
        client: ClientId,
        cmd: CmdSurfaceVisibleSet,
    ) -> Result<(), CmdError> {
        let Some(sid) = self.resolve_surface(client, cmd.target, cmd.is_global) else {
            return Ok(());
        };
        let surface = self.surfaces.get_mut(&sid).ok_or(CmdError::NoSuchSurface)?;
        let visible = surface.flags.contains(SurfaceFlags::VISIBLE);
        if visible == cmd.is_visible {
            return Ok(());
        }
        surface.flags.toggle(SurfaceFlags::VISIBLE);
        let rect = surface.screen_rect();
        let owner = surface.client;

        self.focus_set(Some(sid));
        self.compositor.invalidate(&rect);
        self.report_produce(sid, owner, ReportFlags::IS_VISIBLE);
        Ok(())
    }

    fn action_surface_report(
        &mut self,
        client: ClientId,
        cmd: CmdSurfaceReport,
    ) -> Result<(), CmdError> {
        let Some(sid) = self.resolve_surface(client, cmd.target, cmd.is_global) else {
            return Ok(());
        };
        // The snapshot goes to the requester, not the surface owner.
        self.report_produce(sid, client, ReportFlags::empty());
        Ok(())
    }

    fn action_subscribe(&mut self, client: ClientId, cmd: CmdSubscribe) -> Result<(), CmdError> {
        let session = self
            .clients
            .iter_mut()
            .find(|c| c.id == client)
            .ok_or(CmdError::NoSuchSurface)?;
        if !session.mask.subscribe(cmd.event) {
            return Err(CmdError::InvalidArgument);
        }
        Ok(())
    }

    fn action_unsubscribe(
        &mut self,
        client: ClientId,
        cmd: CmdUnsubscribe,
    ) -> Result<(), CmdError> {
        let session = self
            .clients
            .iter_mut()
            .find(|c| c.id == client)
            .ok_or(CmdError::NoSuchSurface)?;
        if !session.mask.unsubscribe(cmd.event) {
            return Err(CmdError::InvalidArgument);
        }
        Ok(())
    }

    // ─── Timers ────────────────────────────────────────────────────────────

    fn next_deadline(&self) -> Option<Instant> {
        self.surfaces
            .values()
            .filter_map(|s| s.timer.deadline)
            .min()
    }

    /// Fires the nearest due timer, if any. Repeat timers rearm relative to
    /// the fire time, one-shots disarm.
    fn fire_due_timer(&mut self) {
        let now = Instant::now();
        let due = self
            .surfaces
            .values()
            .filter_map(|s| s.timer.deadline.map(|d| (d, s.id)))
            .min();
        let Some((deadline, sid)) = due else {
            return;
        };
        if now < deadline {
            return;
        }

        let Some(surface) = self.surfaces.get_mut(&sid) else {
            return;
        };
        surface.timer.fired(now);
        let owner = surface.client;
        self.send_to(owner, &Event::new(sid, ev::TIMER));
    }

    // ─── Keyboard pipeline ─────────────────────────────────────────────────

    fn kbd_read(&mut self) {
        let mut buf = [0u8; 256];
        loop {
            match self.kbd.try_read(&mut buf) {
                Ok(read) => self.kbd_pending.extend_from_slice(&buf[..read]),
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    log::warn!("keyboard read failed: {err}");
                    return;
                }
            }
        }

        let mut offset = 0;
        while let Some((value, suffix, consumed)) = parse_token(&self.kbd_pending[offset..]) {
            offset += consumed;
            let kind = match suffix {
                b'_' => KbdEventKind::Press,
                b'^' => KbdEventKind::Release,
                _ => {
                    log::warn!("unknown keyboard event suffix '{}'", suffix as char);
                    continue;
                }
            };
            let Ok(code) = Keycode::try_from(value as u16) else {
                log::debug!("ignoring unknown keycode {value}");
                continue;
            };
            self.handle_kbd_event(code, kind);
        }
        self.kbd_pending.drain(..offset);
    }

    fn handle_kbd_event(&mut self, code: Keycode, kind: KbdEventKind) {
        keymap::update_mods(&mut self.mods, code, kind);

        let Some(focus) = self.focus else {
            return;
        };
        let Some(surface) = self.surfaces.get(&focus) else {
            return;
        };
        let owner = surface.client;
        let payload = EventKbd {
            kind,
            mods: self.mods,
            code,
            ascii: keymap::ascii(code, self.mods),
        };
        self.send_to(owner, &Event::with_payload(focus, ev::KBD, &payload));
        self.broadcast(&Event::with_payload(
            SURFACE_ID_NONE,
            ev::GLOBAL_KBD,
            &payload,
        ));
    }

    // ─── Mouse pipeline ────────────────────────────────────────────────────

    fn mouse_read(&mut self) {
        let mut buf = [0u8; 256];
        loop {
            match self.mouse.try_read(&mut buf) {
                Ok(read) => self.mouse_pending.extend_from_slice(&buf[..read]),
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    log::warn!("mouse read failed: {err}");
                    return;
                }
            }
        }

        // Batch x/y deltas; each button edge flushes accumulated motion
        // first, then lands as its own zero-delta event.
        let mut x = 0i64;
        let mut y = 0i64;
        let mut offset = 0;
        while let Some((value, suffix, consumed)) = parse_token(&self.mouse_pending[offset..]) {
            offset += consumed;
            match suffix {
                b'x' => x += value,
                b'y' => y += value,
                b'_' | b'^' => {
                    if x != 0 || y != 0 {
                        let buttons = self.mouse_buttons;
                        self.handle_mouse_event(x as i32, y as i32, buttons);
                        x = 0;
                        y = 0;
                    }
                    let button = MouseButtons::from_index(value as u8);
                    if suffix == b'_' {
                        self.mouse_buttons.insert(button);
                    } else {
                        self.mouse_buttons.remove(button);
                    }
                    let buttons = self.mouse_buttons;
                    self.handle_mouse_event(0, 0, buttons);
                }
                _ => log::warn!("unknown mouse event suffix '{}'", suffix as char),
            }
        }
        self.mouse_pending.drain(..offset);

        if x != 0 || y != 0 {
            let buttons = self.mouse_buttons;
            self.handle_mouse_event(x as i32, y as i32, buttons);
        }
    }

    fn handle_mouse_event(&mut self, dx: i32, dy: i32, buttons: MouseButtons) {
        let Some(cursor_id) = self.cursor else {
            return;
        };

        let held = buttons;
        let pressed = buttons & !self.prev_held;
        let released = self.prev_held & !buttons;

        let max_x = self.screen.width() as i32 - 1;
        let max_y = self.screen.height() as i32 - 1;
        let Some(cursor) = self.surfaces.get_mut(&cursor_id) else {
            return;
        };
        let old_pos = cursor.pos;
        cursor.pos = Point::new(
            (old_pos.x + dx).clamp(0, max_x),
            (old_pos.y + dy).clamp(0, max_y),
        );
        let pos = cursor.pos;
        let delta = Point::new(pos.x - old_pos.x, pos.y - old_pos.y);

        let hit = self.surface_under_point(pos);
        if hit != self.prev_cursor_target {
            if let Some(prev) = self.prev_cursor_target {
                if let Some(surface) = self.surfaces.get(&prev) {
                    let owner = surface.client;
                    let payload = EventMouse {
                        held,
                        pressed: MouseButtons::empty(),
                        released: MouseButtons::empty(),
                        pos: Point::new(pos.x - surface.pos.x, pos.y - surface.pos.y),
                        screen_pos: pos,
                        delta,
                    };
                    self.send_to(
                        owner,
                        &Event::with_payload(prev, ev::CURSOR_LEAVE, &payload),
                    );
                }
            }
            if let Some(entered) = hit {
                let surface = &self.surfaces[&entered];
                let owner = surface.client;
                let payload = EventMouse {
                    held,
                    pressed: MouseButtons::empty(),
                    released: MouseButtons::empty(),
                    pos: Point::new(pos.x - surface.pos.x, pos.y - surface.pos.y),
                    screen_pos: pos,
                    delta,
                };
                self.send_to(
                    owner,
                    &Event::with_payload(entered, ev::CURSOR_ENTER, &payload),
                );
            }
            self.prev_cursor_target = hit;
        }

        if !pressed.is_empty() {
            self.focus_set(hit);
            if let Some(hit_id) = hit {
                let rect = self.surfaces[&hit_id].screen_rect();
                self.compositor.invalidate(&rect);
            }
        }

        // While a button is held the focused surface captures the drag.
        let dest = if !held.is_empty() && self.focus.is_some() {
            self.focus
        } else {
            hit
        };
        if let Some(dest_id) = dest {
            if let Some(surface) = self.surfaces.get(&dest_id) {
                let owner = surface.client;
                let payload = EventMouse {
                    held,
                    pressed,
                    released,
                    pos: Point::new(pos.x - surface.pos.x, pos.y - surface.pos.y),
                    screen_pos: pos,
                    delta,
                };
                self.send_to(owner, &Event::with_payload(dest_id, ev::MOUSE, &payload));

                let mut global = payload;
                global.pos = global.screen_pos;
                self.broadcast(&Event::with_payload(
                    SURFACE_ID_NONE,
                    ev::GLOBAL_MOUSE,
                    &global,
                ));
            }
        }

        self.prev_held = held;
    }
}

/// Parses one `<integer><suffix>` token, skipping leading whitespace.
/// Returns `None` while the token is still incomplete. A lone non-numeric
/// byte is consumed and reported as suffix 0 so garbage cannot wedge the
/// stream.
fn parse_token(buf: &[u8]) -> Option<(i64, u8, usize)> {
    let mut i = 0;
    while i < buf.len() && buf[i].is_ascii_whitespace() {
        i += 1;
    }
    if i == buf.len() {
        return None;
    }

    let mut negative = false;
    let mut value = 0i64;
    let mut digits = 0;
    if buf[i] == b'-' {
        negative = true;
        i += 1;
    }
    while i < buf.len() && buf[i].is_ascii_digit() {
        value = value * 10 + (buf[i] - b'0') as i64;
        digits += 1;
        i += 1;
    }
    if i == buf.len() {
        // More digits (or the suffix) may still arrive.
        return None;
    }
    if digits == 0 {
        return Some((0, 0, i + 1));
    }
    if negative {
        value = -value;
    }
    Some((value, buf[i], i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_token_reads_value_and_suffix() {
        assert_eq!(parse_token(b"35_\n"), Some((35, b'_', 3)));
        assert_eq!(parse_token(b"\n-12x rest"), Some((-12, b'x', 5)));
    }

    #[test]
    fn parse_token_waits_for_complete_tokens() {
        assert_eq!(parse_token(b""), None);
        assert_eq!(parse_token(b"  "), None);
        assert_eq!(parse_token(b"123"), None);
        assert_eq!(parse_token(b"-"), None);
    }

    #[test]
    fn parse_token_consumes_garbage_bytes() {
        let (value, suffix, consumed) = parse_token(b"q10x").unwrap();
        assert_eq!((value, suffix, consumed), (0, 0, 1));
    }
}
