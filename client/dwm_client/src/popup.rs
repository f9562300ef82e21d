//! Synchronous message popups.
//!
//! Opens a fresh display, shows a fixed-size decorated window (without
//! controls) holding a multiline message and one to three buttons, and spins
//! the event loop until a button is released or the window is asked to quit.

use dwm_api_types::event::{ActionKind, ElementId, Event, LeventAction, levent};
use dwm_api_types::rect::Rect;
use dwm_api_types::surface::SurfaceType;

use crate::display::Display;
use crate::drawable::Align;
use crate::element::{ElementFlags, ElementKey, ProcResult};
use crate::theme::{ColorRole, ColorSetId, Theme};
use crate::widgets::button::button_new;
use crate::window::{Window, WindowFlags};

pub const POPUP_WIDTH: i32 = 320;
pub const POPUP_HEIGHT: i32 = 160;
pub const POPUP_BUTTON_WIDTH: i32 = 80;
pub const POPUP_BUTTON_HEIGHT: i32 = 26;
pub const POPUP_BUTTON_AREA_HEIGHT: i32 = 48;
pub const POPUP_HORIZONTAL_PADDING: i32 = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopupKind {
    Ok,
    RetryCancel,
    YesNo,
}

/// Button element ids double as result codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopupResult {
    Error,
    Close,
    Ok,
    Retry,
    Cancel,
    Yes,
    No,
}

const RES_OK: ElementId = 1;
const RES_RETRY: ElementId = 2;
const RES_CANCEL: ElementId = 3;
const RES_YES: ElementId = 4;
const RES_NO: ElementId = 5;

fn result_from_id(id: ElementId) -> Option<PopupResult> {
    match id {
        RES_OK => Some(PopupResult::Ok),
        RES_RETRY => Some(PopupResult::Retry),
        RES_CANCEL => Some(PopupResult::Cancel),
        RES_YES => Some(PopupResult::Yes),
        RES_NO => Some(PopupResult::No),
        _ => None,
    }
}

struct PopupState {
    kind: PopupKind,
    text: String,
    result: PopupResult,
}

fn popup_button_rects(content: &Rect, big_padding: i32) -> (Rect, Rect) {
    let middle = Rect::from_dim(
        content.width() / 2 - POPUP_BUTTON_WIDTH / 2,
        content.height() - POPUP_BUTTON_AREA_HEIGHT + POPUP_BUTTON_HEIGHT / 2 - 10,
        POPUP_BUTTON_WIDTH,
        POPUP_BUTTON_HEIGHT,
    );
    let mut right = middle;
    right.left += POPUP_BUTTON_WIDTH + big_padding;
    right.right += POPUP_BUTTON_WIDTH + big_padding;
    (middle, right)
}

fn popup_init(win: &mut Window, key: ElementKey) {
    let content = win
        .element(key)
        .map(|e| e.content_rect())
        .unwrap_or(Rect::ZERO);
    let big_padding = Theme::global().big_padding as i32;
    let (middle, right) = popup_button_rects(&content, big_padding);

    let kind = match win.private_ref::<PopupState>(key) {
        Some(state) => state.kind,
        None => return,
    };
    match kind {
        PopupKind::Ok => {
            button_new(win, key, RES_OK, &right, "Ok", ElementFlags::empty());
        }
        PopupKind::RetryCancel => {
            button_new(win, key, RES_RETRY, &middle, "Retry", ElementFlags::empty());
            button_new(win, key, RES_CANCEL, &right, "Cancel", ElementFlags::empty());
        }
        PopupKind::YesNo => {
            button_new(win, key, RES_YES, &middle, "Yes", ElementFlags::empty());
            button_new(win, key, RES_NO, &right, "No", ElementFlags::empty());
        }
    }
}

fn popup_redraw(win: &mut Window, key: ElementKey) {
    let mut rect = win
        .element(key)
        .map(|e| e.content_rect())
        .unwrap_or(Rect::ZERO);
    rect.bottom -= POPUP_BUTTON_AREA_HEIGHT;
    rect.left += POPUP_HORIZONTAL_PADDING;
    rect.right -= POPUP_HORIZONTAL_PADDING;

    let background = win.color(key, ColorSetId::Deco, ColorRole::BackgroundNormal);
    let foreground = win.color(key, ColorSetId::View, ColorRole::ForegroundNormal);
    let text = win
        .private_ref::<PopupState>(key)
        .map(|s| s.text.clone())
        .unwrap_or_default();

    let mut draw = win.draw_begin(key);
    draw.rect(&rect, background);
    draw.text_multiline(&rect, None, Align::Min, Align::Center, foreground, &text);
    let invalid = draw.invalid_rect();
    win.draw_end(key, invalid);
}

fn popup_procedure(win: &mut Window, key: ElementKey, event: &Event) -> ProcResult {
    match event.event_type {
        levent::INIT => popup_init(win, key),
        levent::REDRAW => popup_redraw(win, key),
        levent::ACTION => {
            if let Some(action) = event.payload::<LeventAction>() {
                if action.kind == ActionKind::Release {
                    if let Some(result) = result_from_id(action.source) {
                        if let Some(state) = win.private_mut::<PopupState>(key) {
                            state.result = result;
                        }
                        win.disconnect_display();
                    }
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// Shows `text` in a modal popup titled `title` and blocks until the user
/// answers. The chosen button becomes the result; closing yields `Close` and
/// a display failure yields `Error`.
pub fn show(text: &str, title: &str, kind: PopupKind) -> PopupResult {
    let Ok(display) = Display::connect() else {
        return PopupResult::Error;
    };
    show_on(display, text, title, kind)
}

/// Like [`show`] but over an existing display connection (tests use this).
pub fn show_on(mut display: Display, text: &str, title: &str, kind: PopupKind) -> PopupResult {
    let screen = display.screen_rect(0);
    let rect = Rect::from_dim(
        screen.width() / 2 - POPUP_WIDTH / 2,
        screen.height() / 2 - POPUP_HEIGHT / 2,
        POPUP_WIDTH,
        POPUP_HEIGHT,
    );

    let state = PopupState {
        kind,
        text: text.to_string(),
        result: PopupResult::Close,
    };
    let Ok(id) = display.create_window(
        title,
        &rect,
        SurfaceType::Window,
        WindowFlags::DECO | WindowFlags::NO_CONTROLS,
        popup_procedure,
        Some(Box::new(state)),
    ) else {
        return PopupResult::Error;
    };
    if let Some(window) = display.window_mut(id) {
        let _ = window.set_visible(true);
        window.set_focus();
    }

    loop {
        let event = match display.next_event(None) {
            Ok(event) => event,
            Err(_) => break,
        };
        if event.event_type == levent::QUIT && event.target == id {
            break;
        }
        display.dispatch(&event);
    }

    let result = display
        .window_mut(id)
        .and_then(|window| {
            let client = window.client_element();
            window
                .private_ref::<PopupState>(client)
                .map(|state| state.result)
        })
        .unwrap_or(PopupResult::Error);
    display.destroy_window(id);
    result
}
