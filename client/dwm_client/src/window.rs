//! Client-side windows: one surface, its mapped pixel buffer, and the
//! element tree that draws into it.
//!
//! A decorated window gets a decoration root (titlebar, frame, close and
//! minimize buttons) with the application's client element as its child;
//! otherwise the client element is the root. Draw calls accumulate one
//! invalid rectangle that is flushed as a single `SURFACE_INVALIDATE` after
//! each dispatch round.

use std::any::Any;
use std::rc::Rc;
use std::sync::Arc;

use bitflags::bitflags;

use dwm_api_types::Name;
use dwm_api_types::cmd::{
    Cmd, CmdSurfaceFree, CmdSurfaceInvalidate, CmdSurfaceMove, CmdSurfaceNew, CmdSurfaceTimerSet,
    CmdSurfaceVisibleSet,
};
use dwm_api_types::event::{
    ActionKind, ElementId, Event, EventMouse, EventReport, EventSurfaceNew, LeventAction,
    LeventForceAction, LeventInit, LeventRedraw, ev, levent,
};
use dwm_api_types::input::MouseButtons;
use dwm_api_types::pixel::Pixel;
use dwm_api_types::point::Point;
use dwm_api_types::rect::Rect;
use dwm_api_types::surface::{
    ReportFlags, SurfaceFlags, SurfaceId, SurfaceType, TimerFlags,
};
use dwm_sys::shmem::{self, ShmemBuffer};

use crate::display::{DisplayError, DisplayLink};
use crate::drawable::{Align, Direction, Drawable};
use crate::element::{
    Element, ElementFlags, ElementKey, ElementTree, ProcError, ProcResult, Procedure,
};
use crate::image::Image;
use crate::theme::{ColorRole, ColorSetId, Theme, ThemeInt, ThemeString};
use crate::widgets::button;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct WindowFlags: u32 {
        /// Titlebar, frame and control buttons around the client area.
        const DECO = 1 << 0;
        /// Allows `move_to` to change the window's size.
        const RESIZABLE = 1 << 1;
        /// No close/minimize buttons; only meaningful with `DECO`.
        const NO_CONTROLS = 1 << 2;
    }
}

pub const CLIENT_ELEMENT_ID: ElementId = u64::MAX;
pub const DECO_ELEMENT_ID: ElementId = u64::MAX - 1;
pub const DECO_CLOSE_BUTTON_ID: ElementId = u64::MAX - 2;
pub const DECO_MINIMIZE_BUTTON_ID: ElementId = u64::MAX - 3;

pub struct Window {
    link: Rc<DisplayLink>,
    surface: SurfaceId,
    surface_type: SurfaceType,
    flags: WindowFlags,
    /// Screen rect, decorations included.
    rect: Rect,
    name: String,
    buffer: Arc<ShmemBuffer>,
    invalid: Rect,
    tree: ElementTree,
    root: ElementKey,
    client_elem: ElementKey,
}

impl Window {
    /// Creates the surface (grown to hold decorations when requested), waits
    /// for the server's reply, maps the shared pixel buffer and builds the
    /// root of the element tree.
    pub(crate) fn new(
        link: Rc<DisplayLink>,
        name: &str,
        rect: &Rect,
        surface_type: SurfaceType,
        flags: WindowFlags,
        procedure: Procedure,
        private: Option<Box<dyn Any>>,
    ) -> Result<Self, DisplayError> {
        let theme = Theme::global();
        let frame = theme.frame_size as i32;
        let titlebar = theme.titlebar_size as i32;

        let outer = if flags.contains(WindowFlags::DECO) {
            Rect::new(
                rect.left - frame,
                rect.top - frame - titlebar,
                rect.right + frame,
                rect.bottom + frame,
            )
        } else {
            *rect
        };

        let wire_name = Name::new(name).ok_or(DisplayError::Failed)?;
        link.push_cmd(&Cmd::SurfaceNew(CmdSurfaceNew {
            surface_type,
            rect: outer,
            name: wire_name,
        }));
        link.flush();

        let reply = link.wait_for_event(ev::SURFACE_NEW)?;
        let surface = reply.target;
        let key = reply
            .payload::<EventSurfaceNew>()
            .ok_or(DisplayError::Failed)?
            .shmem_key;
        let buffer = shmem::claim(key).ok_or(DisplayError::Failed)?;
        if buffer.len() < (outer.area().max(0)) as usize {
            return Err(DisplayError::Failed);
        }

        let mut window = Self {
            link,
            surface,
            surface_type,
            flags,
            rect: outer,
            name: name.to_string(),
            buffer,
            invalid: Rect::ZERO,
            tree: ElementTree::new(),
            root: 0,
            client_elem: 0,
        };

        let root_rect = Rect::from_dim(0, 0, outer.width(), outer.height());
        if flags.contains(WindowFlags::DECO) {
            let root = window.add_element(
                None,
                DECO_ELEMENT_ID,
                &root_rect,
                "deco",
                ElementFlags::empty(),
                deco_procedure,
                Some(Box::new(DecoState::default())),
            );
            window.root = root;

            let client_rect = Rect::new(
                frame,
                frame + titlebar,
                outer.width() - frame,
                outer.height() - frame,
            );
            window.client_elem = window.add_element(
                Some(root),
                CLIENT_ELEMENT_ID,
                &client_rect,
                "client",
                ElementFlags::empty(),
                procedure,
                private,
            );
        } else {
            let root = window.add_element(
                None,
                CLIENT_ELEMENT_ID,
                &root_rect,
                "client",
                ElementFlags::empty(),
                procedure,
                private,
            );
            window.root = root;
            window.client_elem = root;
        }

        Ok(window)
    }

    // ─── Introspection ─────────────────────────────────────────────────────

    pub fn surface_id(&self) -> SurfaceId {
        self.surface
    }

    pub fn surface_type(&self) -> SurfaceType {
        self.surface_type
    }

    pub fn flags(&self) -> WindowFlags {
        self.flags
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Screen rect including decorations.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn content_rect(&self) -> Rect {
        Rect::from_dim(0, 0, self.rect.width(), self.rect.height())
    }

    pub fn root_element(&self) -> ElementKey {
        self.root
    }

    /// The element applications draw to and receive events from.
    pub fn client_element(&self) -> ElementKey {
        self.client_elem
    }

    // ─── Elements ──────────────────────────────────────────────────────────

    /// Inserts an element and queues its `INIT` and first `REDRAW`.
    pub fn add_element(
        &mut self,
        parent: Option<ElementKey>,
        id: ElementId,
        rect: &Rect,
        text: &str,
        flags: ElementFlags,
        procedure: Procedure,
        private: Option<Box<dyn Any>>,
    ) -> ElementKey {
        let mut element = Element::new(id, *rect, text, flags, procedure, private);
        element.parent = parent;
        let key = self.tree.insert(element);
        if let Some(parent) = parent {
            if let Some(node) = self.tree.node_mut(parent) {
                node.children.push(key);
            }
        }

        self.link.queue_event(Event::with_payload(
            self.surface,
            levent::INIT,
            &LeventInit { id },
        ));
        self.queue_redraw_id(id, false);
        key
    }

    /// Frees an element and its subtree. Each procedure sees `LEVENT_FREE`
    /// before its node goes away.
    pub fn remove_element(&mut self, key: ElementKey) {
        let Some(node) = self.tree.node(key) else {
            return;
        };
        let procedure = node.procedure;
        let parent = node.parent;
        let children = node.children.clone();

        let free = Event::new(self.surface, levent::FREE);
        let _ = procedure(self, key, &free);

        for child in children {
            self.remove_element(child);
        }
        if let Some(parent) = parent {
            if let Some(node) = self.tree.node_mut(parent) {
                node.children.retain(|&c| c != key);
            }
        }
        self.tree.remove(key);
    }

    pub fn element(&self, key: ElementKey) -> Option<&Element> {
        self.tree.node(key)
    }

    pub fn element_mut(&mut self, key: ElementKey) -> Option<&mut Element> {
        self.tree.node_mut(key)
    }

    pub fn find_element(&self, id: ElementId) -> Option<ElementKey> {
        self.tree.find(self.root, id)
    }

    pub fn element_id(&self, key: ElementKey) -> ElementId {
        self.tree
            .node(key)
            .map(|n| n.id)
            .unwrap_or(dwm_api_types::event::ELEMENT_ID_NONE)
    }

    pub fn private_ref<T: 'static>(&self, key: ElementKey) -> Option<&T> {
        self.tree.node(key)?.private.as_ref()?.downcast_ref()
    }

    pub fn private_mut<T: 'static>(&mut self, key: ElementKey) -> Option<&mut T> {
        self.tree.node_mut(key)?.private.as_mut()?.downcast_mut()
    }

    // ─── Theme lookups (override chain first) ──────────────────────────────

    pub fn color(&self, key: ElementKey, set: ColorSetId, role: ColorRole) -> Pixel {
        let theme = Theme::global();
        match self.tree.node(key) {
            Some(node) => node.overrides.color(theme, set, role),
            None => theme.color(set, role),
        }
    }

    pub fn int(&self, key: ElementKey, name: ThemeInt) -> i64 {
        let theme = Theme::global();
        match self.tree.node(key) {
            Some(node) => node.overrides.int(theme, name),
            None => theme.int(name),
        }
    }

    pub fn string(&self, key: ElementKey, name: ThemeString) -> String {
        let theme = Theme::global();
        match self.tree.node(key) {
            Some(node) => node.overrides.string(theme, name).to_string(),
            None => theme.string(name).to_string(),
        }
    }

    // ─── Drawing ───────────────────────────────────────────────────────────

    /// A drawable clipped to `key`'s rect inside the window's pixel buffer.
    /// Finish with [`Window::draw_end`], passing the drawable's invalid rect.
    pub fn draw_begin(&mut self, key: ElementKey) -> Drawable<'_> {
        let global = self.tree.global_rect(key);
        let stride = self.rect.width().max(0) as u32;
        let font = self.link.default_font();
        // The single-writer discipline holds: procedures run on the client's
        // one thread and the server only reads after our invalidate.
        let pixels = unsafe { self.buffer.pixels_mut() };
        Drawable::new(pixels, stride, global.top_left(), global.width(), global.height())
            .with_default_font(font)
    }

    /// Folds an element's draw damage into the window and re-queues redraws
    /// for every child the damage touches.
    pub fn draw_end(&mut self, key: ElementKey, invalid: Rect) {
        let origin = self.tree.global_point(key);
        self.invalidate(&invalid.translated(origin));

        if invalid.area() == 0 {
            return;
        }
        let Some(node) = self.tree.node(key) else {
            return;
        };
        let overlapping: Vec<ElementId> = node
            .children
            .iter()
            .filter_map(|&child| self.tree.node(child))
            .filter(|child| invalid.overlaps(&child.rect))
            .map(|child| child.id)
            .collect();
        for id in overlapping {
            self.queue_redraw_id(id, false);
        }
    }

    /// Accumulates a window-local invalid rect until the next flush.
    pub fn invalidate(&mut self, rect: &Rect) {
        if self.invalid.area() == 0 {
            self.invalid = *rect;
        } else {
            self.invalid.expand_to_contain(rect);
        }
    }

    /// Sends the pending invalid rect as one `SURFACE_INVALIDATE`.
    pub fn invalidate_flush(&mut self) {
        if self.invalid.area() == 0 {
            return;
        }
        self.link
            .push_cmd(&Cmd::SurfaceInvalidate(CmdSurfaceInvalidate {
                target: self.surface,
                rect: self.invalid,
            }));
        self.link.flush();
        self.invalid = Rect::ZERO;
    }

    // ─── Commands ──────────────────────────────────────────────────────────

    /// Moves the window. Size changes require `RESIZABLE`.
    pub fn move_to(&mut self, rect: &Rect) -> Result<(), DisplayError> {
        let resized =
            rect.width() != self.rect.width() || rect.height() != self.rect.height();
        if resized && !self.flags.contains(WindowFlags::RESIZABLE) {
            return Err(DisplayError::Failed);
        }
        self.link.push_cmd(&Cmd::SurfaceMove(CmdSurfaceMove {
            target: self.surface,
            rect: *rect,
        }));
        self.link.flush();
        Ok(())
    }

    /// Arms (or disarms, with `TIMEOUT_NEVER`) the surface timer.
    pub fn set_timer(&mut self, flags: TimerFlags, timeout_ns: u64) {
        self.link.push_cmd(&Cmd::SurfaceTimerSet(CmdSurfaceTimerSet {
            target: self.surface,
            timeout_ns,
            flags,
        }));
        self.link.flush();
    }

    pub fn set_focus(&mut self) {
        self.link
            .push_cmd(&Cmd::SurfaceFocusSet(dwm_api_types::cmd::CmdSurfaceFocusSet {
                target: self.surface,
                is_global: false,
            }));
        self.link.flush();
    }

    /// Shows or hides the window. Pending redraws are dispatched first so a
    /// freshly shown surface has real content.
    pub fn set_visible(&mut self, visible: bool) -> ProcResult {
        self.dispatch_pending_redraws()?;
        self.link
            .push_cmd(&Cmd::SurfaceVisibleSet(CmdSurfaceVisibleSet {
                target: self.surface,
                is_global: false,
                is_visible: visible,
            }));
        self.link.flush();
        Ok(())
    }

    // ─── Event plumbing ────────────────────────────────────────────────────

    pub(crate) fn queue_redraw_id(&self, id: ElementId, propagate: bool) {
        self.link.queue_event(Event::with_payload(
            self.surface,
            levent::REDRAW,
            &LeventRedraw { id, propagate },
        ));
    }

    /// Queues an action event from a widget toward the application.
    pub fn queue_action(&self, source: ElementId, kind: ActionKind) {
        self.link.queue_event(Event::with_payload(
            self.surface,
            levent::ACTION,
            &LeventAction { source, kind },
        ));
    }

    pub(crate) fn queue_quit(&self) {
        self.link.queue_event(Event::new(self.surface, levent::QUIT));
    }

    /// Latches the shared connection dead; the display's event loop ends on
    /// its next read. Used by synchronous flows (popups) to unwind.
    pub fn disconnect_display(&self) {
        self.link.disconnect();
    }

    fn dispatch_pending_redraws(&mut self) -> ProcResult {
        while let Some(event) = self.link.take_matching(levent::REDRAW, self.surface) {
            self.dispatch(&event)?;
        }
        Ok(())
    }

    /// Routes one event through the tree, then flushes accumulated damage.
    pub fn dispatch(&mut self, event: &Event) -> ProcResult {
        match event.event_type {
            levent::INIT => {
                let init = event.payload::<LeventInit>().ok_or(ProcError)?;
                let key = self.tree.find(self.root, init.id).ok_or(ProcError)?;
                self.element_dispatch(key, event)?;
            }
            levent::REDRAW => {
                let redraw = event.payload::<LeventRedraw>().ok_or(ProcError)?;
                let key = self.tree.find(self.root, redraw.id).ok_or(ProcError)?;
                self.element_dispatch(key, event)?;
            }
            levent::FORCE_ACTION => {
                let force = event.payload::<LeventForceAction>().ok_or(ProcError)?;
                let key = self.tree.find(self.root, force.dest).ok_or(ProcError)?;
                self.element_dispatch(key, event)?;
            }
            ev::REPORT => {
                if let Some(report) = event.payload::<EventReport>() {
                    if report.flags.contains(ReportFlags::RECT) {
                        let new_rect = report.info.rect;
                        if new_rect.width() != self.rect.width()
                            || new_rect.height() != self.rect.height()
                        {
                            let root_id = self.element_id(self.root);
                            self.queue_redraw_id(root_id, true);
                        }
                        self.rect = new_rect;
                    }
                }
                let root = self.root;
                self.element_dispatch(root, event)?;
            }
            _ => {
                let root = self.root;
                self.element_dispatch(root, event)?;
            }
        }

        self.invalidate_flush();
        Ok(())
    }

    /// Recursive per-element dispatch. Mouse coordinates are rebased into
    /// each element's local space on the way down; redraws propagate to
    /// children when asked to.
    pub fn element_dispatch(&mut self, key: ElementKey, event: &Event) -> ProcResult {
        let Some(node) = self.tree.node(key) else {
            return Ok(());
        };
        let procedure = node.procedure;
        let rect = node.rect;
        let children = node.children.clone();

        match event.event_type {
            levent::INIT => {
                procedure(self, key, event)?;
            }
            levent::REDRAW => {
                procedure(self, key, event)?;
                let redraw = event.payload::<LeventRedraw>().ok_or(ProcError)?;
                if redraw.propagate {
                    for child in children {
                        if let Some(child_node) = self.tree.node(child) {
                            self.queue_redraw_id(child_node.id, true);
                        }
                    }
                }
            }
            ev::MOUSE => {
                let moved = match event.payload::<EventMouse>() {
                    Some(mut payload) => {
                        payload.pos.x -= rect.left;
                        payload.pos.y -= rect.top;
                        Event::with_payload(event.target, event.event_type, &payload)
                    }
                    None => *event,
                };
                procedure(self, key, &moved)?;
                for child in children {
                    self.element_dispatch(child, &moved)?;
                }
            }
            _ => {
                procedure(self, key, event)?;
                for child in children {
                    self.element_dispatch(child, event)?;
                }
            }
        }
        Ok(())
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        if self.tree.node(self.root).is_some() {
            self.remove_element(self.root);
        }
        self.link.push_cmd(&Cmd::SurfaceFree(CmdSurfaceFree {
            target: self.surface,
        }));
        self.link.flush();
    }
}

// ─── Decorations ───────────────────────────────────────────────────────────

#[derive(Default)]
struct DecoState {
    is_focused: bool,
    is_dragging: bool,
    drag_offset: Point,
}

fn deco_titlebar_rect(win: &Window, key: ElementKey) -> Rect {
    let content = win
        .element(key)
        .map(|e| e.content_rect())
        .unwrap_or(Rect::ZERO);
    let frame = win.int(key, ThemeInt::FrameSize) as i32;
    let small = win.int(key, ThemeInt::SmallPadding) as i32;
    let titlebar = win.int(key, ThemeInt::TitlebarSize) as i32;
    Rect::new(
        frame + small,
        frame + small,
        content.width() - frame - small,
        frame + titlebar,
    )
}

/// Control button rects hang off the titlebar's right edge; index 0 is the
/// rightmost (close).
fn deco_button_rect(win: &Window, key: ElementKey, index: i32) -> Rect {
    let frame = win.int(key, ThemeInt::FrameSize) as i32;
    let mut rect = deco_titlebar_rect(win, key);
    rect.shrink(frame);
    let size = rect.height();
    rect.right -= size * index;
    rect.left = rect.right - size;
    rect
}

fn deco_draw_titlebar(win: &mut Window, key: ElementKey) {
    let frame = win.int(key, ThemeInt::FrameSize) as i32;
    let big = win.int(key, ThemeInt::BigPadding) as i32;
    let panel = win.int(key, ThemeInt::PanelSize) as i32;
    let highlight = win.color(key, ColorSetId::Deco, ColorRole::Highlight);
    let shadow = win.color(key, ColorSetId::Deco, ColorRole::Shadow);
    let fg = win.color(key, ColorSetId::Deco, ColorRole::ForegroundNormal);
    let focused = win
        .private_ref::<DecoState>(key)
        .map(|s| s.is_focused)
        .unwrap_or(false);
    let (grad_start, grad_end) = if focused {
        (
            win.color(key, ColorSetId::Deco, ColorRole::BackgroundSelectedStart),
            win.color(key, ColorSetId::Deco, ColorRole::BackgroundSelectedEnd),
        )
    } else {
        (
            win.color(key, ColorSetId::Deco, ColorRole::BackgroundUnselectedStart),
            win.color(key, ColorSetId::Deco, ColorRole::BackgroundUnselectedEnd),
        )
    };

    let titlebar = deco_titlebar_rect(win, key);
    let name = win.name().to_string();

    let mut draw = win.draw_begin(key);
    draw.frame(&titlebar, frame, shadow, highlight);
    let mut inner = titlebar;
    inner.shrink(frame);
    draw.gradient(&inner, grad_start, grad_end, Direction::Horizontal, false);

    inner.left += big;
    inner.right -= panel; // room for the control buttons
    draw.text(&inner, None, Align::Min, Align::Center, fg, &name);

    let invalid = draw.invalid_rect();
    win.draw_end(key, invalid);
}

fn deco_redraw(win: &mut Window, key: ElementKey) {
    let frame = win.int(key, ThemeInt::FrameSize) as i32;
    let highlight = win.color(key, ColorSetId::Deco, ColorRole::Highlight);
    let shadow = win.color(key, ColorSetId::Deco, ColorRole::Shadow);
    let background = win.color(key, ColorSetId::Deco, ColorRole::BackgroundNormal);
    let content = win
        .element(key)
        .map(|e| e.content_rect())
        .unwrap_or(Rect::ZERO);

    let mut draw = win.draw_begin(key);
    draw.frame(&content, frame, highlight, shadow);
    draw.rect(&content.shrunk(frame), background);
    let invalid = draw.invalid_rect();
    win.draw_end(key, invalid);

    deco_draw_titlebar(win, key);
}

fn deco_init(win: &mut Window, key: ElementKey) -> ProcResult {
    if win.flags().contains(WindowFlags::NO_CONTROLS) {
        return Ok(());
    }

    let close_rect = deco_button_rect(win, key, 0);
    let close = button::button_new(
        win,
        key,
        DECO_CLOSE_BUTTON_ID,
        &close_rect,
        "",
        ElementFlags::NO_OUTLINE,
    );
    let minimize_rect = deco_button_rect(win, key, 1);
    let minimize = button::button_new(
        win,
        key,
        DECO_MINIMIZE_BUTTON_ID,
        &minimize_rect,
        "",
        ElementFlags::NO_OUTLINE,
    );

    // Icons are cosmetic; missing assets leave plain buttons.
    let close_icon = win.string(key, ThemeString::IconClose);
    if let Ok(image) = Image::load(&close_icon) {
        if let Some(elem) = win.element_mut(close) {
            elem.image = Some(Rc::new(image));
        }
    }
    let minimize_icon = win.string(key, ThemeString::IconMinimize);
    if let Ok(image) = Image::load(&minimize_icon) {
        if let Some(elem) = win.element_mut(minimize) {
            elem.image = Some(Rc::new(image));
        }
    }
    Ok(())
}

fn deco_handle_mouse(win: &mut Window, key: ElementKey, mouse: &EventMouse) {
    let mut grab_area = deco_titlebar_rect(win, key);
    if !win.flags().contains(WindowFlags::NO_CONTROLS) {
        grab_area.right = deco_button_rect(win, key, 1).left;
    }

    let (dragging, offset) = win
        .private_ref::<DecoState>(key)
        .map(|s| (s.is_dragging, s.drag_offset))
        .unwrap_or((false, Point::ZERO));

    if dragging {
        if mouse.held.contains(MouseButtons::LEFT) {
            let rect = Rect::from_dim(
                mouse.screen_pos.x - offset.x,
                mouse.screen_pos.y - offset.y,
                win.rect().width(),
                win.rect().height(),
            );
            let _ = win.move_to(&rect);
        } else if let Some(state) = win.private_mut::<DecoState>(key) {
            state.is_dragging = false;
        }
    } else if grab_area.contains_point(mouse.pos) && mouse.pressed.contains(MouseButtons::LEFT) {
        let offset = Point::new(
            mouse.screen_pos.x - win.rect().left,
            mouse.screen_pos.y - win.rect().top,
        );
        if let Some(state) = win.private_mut::<DecoState>(key) {
            state.drag_offset = offset;
            state.is_dragging = true;
        }
    }
}

fn deco_handle_action(win: &mut Window, action: &LeventAction) -> ProcResult {
    if action.kind != ActionKind::Release {
        return Ok(());
    }
    match action.source {
        DECO_CLOSE_BUTTON_ID => win.queue_quit(),
        DECO_MINIMIZE_BUTTON_ID => win.set_visible(false)?,
        _ => {}
    }
    Ok(())
}

fn deco_handle_report(win: &mut Window, key: ElementKey, report: &EventReport) {
    if !report.flags.contains(ReportFlags::IS_FOCUSED) {
        return;
    }
    if let Some(state) = win.private_mut::<DecoState>(key) {
        state.is_focused = report.info.flags.contains(SurfaceFlags::FOCUSED);
    }
    deco_draw_titlebar(win, key);
}

fn deco_procedure(win: &mut Window, key: ElementKey, event: &Event) -> ProcResult {
    match event.event_type {
        levent::INIT => deco_init(win, key),
        levent::REDRAW => {
            deco_redraw(win, key);
            Ok(())
        }
        levent::ACTION => {
            if let Some(action) = event.payload::<LeventAction>() {
                deco_handle_action(win, &action)?;
            }
            Ok(())
        }
        ev::REPORT => {
            if let Some(report) = event.payload::<EventReport>() {
                deco_handle_report(win, key, &report);
            }
            Ok(())
        }
        ev::MOUSE => {
            if let Some(mouse) = event.payload::<EventMouse>() {
                deco_handle_mouse(win, key, &mouse);
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
