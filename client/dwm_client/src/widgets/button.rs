//! Push and toggle buttons.
//!
//! A button tracks `pressed`, `hovered` and `focused` and reports user
//! actions to the application as `LEVENT_ACTION` events. Momentary buttons
//! fire `Press` on the press edge inside their bounds, `Release` on the
//! release edge while pressed, and `Cancel` when the press is abandoned
//! (mouse left or pressed elsewhere). Toggle buttons latch on each press.

use dwm_api_types::event::{ActionKind, ElementId, Event, EventMouse, LeventForceAction, ev, levent};
use dwm_api_types::input::MouseButtons;
use dwm_api_types::point::Point;
use dwm_api_types::rect::Rect;

use crate::drawable::Align;
use crate::element::{ElementFlags, ElementKey, ProcResult};
use crate::theme::{ColorRole, ColorSetId, ThemeInt};
use crate::window::Window;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonState {
    pub pressed: bool,
    pub hovered: bool,
    pub focused: bool,
}

pub fn button_new(
    win: &mut Window,
    parent: ElementKey,
    id: ElementId,
    rect: &Rect,
    text: &str,
    flags: ElementFlags,
) -> ElementKey {
    win.add_element(
        Some(parent),
        id,
        rect,
        text,
        flags,
        button_procedure,
        Some(Box::new(ButtonState::default())),
    )
}

fn button_draw(win: &mut Window, key: ElementKey) {
    let state = win
        .private_ref::<ButtonState>(key)
        .copied()
        .unwrap_or_default();
    let Some(element) = win.element(key) else {
        return;
    };
    let flags = element.flags;
    let mut rect = element.content_rect();
    let text = element.text.clone();
    let font = element.text_props.font.clone();
    let image = element.image.clone();
    let image_props = element.image_props;

    let bezel_size = win.int(key, ThemeInt::BezelSize) as i32;
    let frame_size = win.int(key, ThemeInt::FrameSize) as i32;
    let small_padding = win.int(key, ThemeInt::SmallPadding) as i32;
    let bezel = win.color(key, ColorSetId::Button, ColorRole::Bezel);
    let highlight = win.color(key, ColorSetId::Button, ColorRole::Highlight);
    let shadow = win.color(key, ColorSetId::Button, ColorRole::Shadow);
    let background = win.color(key, ColorSetId::Button, ColorRole::BackgroundNormal);
    let foreground = win.color(key, ColorSetId::Button, ColorRole::ForegroundNormal);
    let selected_end = win.color(key, ColorSetId::Button, ColorRole::BackgroundSelectedEnd);
    let selected_fg = win.color(key, ColorSetId::Button, ColorRole::ForegroundSelected);

    let mut draw = win.draw_begin(key);

    if flags.contains(ElementFlags::FLAT) {
        let fill = if state.pressed || state.hovered {
            selected_end
        } else {
            background
        };
        draw.rect(&rect, fill);
    } else {
        if !flags.contains(ElementFlags::NO_BEZEL) {
            draw.bezel(&rect, bezel_size, bezel);
            rect.shrink(bezel_size);
        }
        if state.pressed {
            draw.frame(&rect, frame_size, shadow, highlight);
        } else {
            draw.frame(&rect, frame_size, highlight, shadow);
        }
        rect.shrink(frame_size);
        draw.rect(&rect, background);
    }

    if !flags.contains(ElementFlags::NO_OUTLINE) {
        rect.shrink(small_padding);
        if state.focused {
            draw.outline(&rect, bezel, 2, 2);
        }
        rect.shrink(2);
    }

    if let Some(image) = &image {
        let image_w = image.width() as i32;
        let image_h = image.height() as i32;
        let left = match image_props.x_align {
            Align::Min => rect.left,
            Align::Center => rect.left + (rect.width() - image_w) / 2,
            Align::Max => rect.left + rect.width() - image_w,
        };
        let top = match image_props.y_align {
            Align::Min => rect.top,
            Align::Center => rect.top + (rect.height() - image_h) / 2,
            Align::Max => rect.top + rect.height() - image_h,
        };
        let dest = Rect::from_dim(left, top, image_w, image_h);
        draw.image_blend(image, &dest, image_props.src_offset);
    }

    let text_color = if flags.contains(ElementFlags::FLAT) && (state.hovered || state.pressed) {
        selected_fg
    } else {
        foreground
    };
    draw.text(
        &rect,
        font.as_ref(),
        Align::Center,
        Align::Center,
        text_color,
        &text,
    );

    let invalid = draw.invalid_rect();
    win.draw_end(key, invalid);
}

fn button_handle_mouse(win: &mut Window, key: ElementKey, mouse: &EventMouse) {
    let Some(element) = win.element(key) else {
        return;
    };
    let id = element.id;
    let toggle = element.flags.contains(ElementFlags::TOGGLE);
    let bounds = element.content_rect();

    let prev = win
        .private_ref::<ButtonState>(key)
        .copied()
        .unwrap_or_default();
    let mut state = prev;

    let in_bounds = bounds.contains_point(Point::new(mouse.pos.x, mouse.pos.y));
    let left_pressed = mouse.pressed.contains(MouseButtons::LEFT);
    let left_released = mouse.released.contains(MouseButtons::LEFT);

    let mut action = None;
    if toggle {
        if in_bounds {
            state.hovered = true;
            if left_pressed {
                state.pressed = !state.pressed;
                state.focused = true;
                action = Some(if state.pressed {
                    ActionKind::Press
                } else {
                    ActionKind::Release
                });
            }
        } else {
            state.hovered = false;
            if left_pressed {
                state.focused = false;
            }
        }
    } else if in_bounds {
        state.hovered = true;
        if left_pressed && !state.pressed {
            state.pressed = true;
            state.focused = true;
            action = Some(ActionKind::Press);
        } else if left_released && state.pressed {
            state.pressed = false;
            action = Some(ActionKind::Release);
        }
    } else {
        state.hovered = false;
        if state.pressed {
            state.pressed = false;
            action = Some(ActionKind::Cancel);
        }
        if left_pressed {
            state.focused = false;
        }
    }

    if let Some(slot) = win.private_mut::<ButtonState>(key) {
        *slot = state;
    }
    if let Some(kind) = action {
        win.queue_action(id, kind);
    }
    if state != prev {
        button_draw(win, key);
    }
}

pub(crate) fn button_procedure(win: &mut Window, key: ElementKey, event: &Event) -> ProcResult {
    match event.event_type {
        levent::REDRAW => button_draw(win, key),
        ev::MOUSE => {
            if let Some(mouse) = event.payload::<EventMouse>() {
                button_handle_mouse(win, key, &mouse);
            }
        }
        ev::CURSOR_LEAVE => {
            if let Some(state) = win.private_mut::<ButtonState>(key) {
                if state.hovered {
                    state.hovered = false;
                    button_draw(win, key);
                }
            }
        }
        ev::FOCUS_OUT => {
            if let Some(state) = win.private_mut::<ButtonState>(key) {
                if state.focused {
                    state.focused = false;
                    button_draw(win, key);
                }
            }
        }
        levent::FORCE_ACTION => {
            if let Some(force) = event.payload::<LeventForceAction>() {
                if let Some(state) = win.private_mut::<ButtonState>(key) {
                    match force.action {
                        ActionKind::Press => {
                            state.pressed = true;
                            state.focused = true;
                        }
                        ActionKind::Release => {
                            state.pressed = false;
                            state.focused = false;
                        }
                        _ => {}
                    }
                }
                button_draw(win, key);
            }
        }
        _ => {}
    }
    Ok(())
}
