//! Static text labels: a framed view background or a flat fill, plus the
//! element's text drawn with its text properties.

use dwm_api_types::event::{ElementId, Event, levent};
use dwm_api_types::rect::Rect;

use crate::element::{ElementFlags, ElementKey, ProcResult};
use crate::theme::{ColorRole, ColorSetId, ThemeInt};
use crate::window::Window;

pub fn label_new(
    win: &mut Window,
    parent: ElementKey,
    id: ElementId,
    rect: &Rect,
    text: &str,
    flags: ElementFlags,
) -> ElementKey {
    win.add_element(Some(parent), id, rect, text, flags, label_procedure, None)
}

fn label_draw(win: &mut Window, key: ElementKey) {
    let Some(element) = win.element(key) else {
        return;
    };
    let flags = element.flags;
    let mut rect = element.content_rect();
    let text = element.text.clone();
    let font = element.text_props.font.clone();
    let x_align = element.text_props.x_align;
    let y_align = element.text_props.y_align;

    let frame_size = win.int(key, ThemeInt::FrameSize) as i32;
    let highlight = win.color(key, ColorSetId::View, ColorRole::Highlight);
    let shadow = win.color(key, ColorSetId::View, ColorRole::Shadow);
    let background = win.color(key, ColorSetId::View, ColorRole::BackgroundNormal);
    let foreground = win.color(key, ColorSetId::View, ColorRole::ForegroundNormal);

    let mut draw = win.draw_begin(key);
    if flags.contains(ElementFlags::FLAT) {
        draw.rect(&rect, background);
    } else {
        draw.frame(&rect, frame_size, shadow, highlight);
        rect.shrink(frame_size);
        draw.rect(&rect, background);
        rect.shrink(frame_size);
    }
    draw.text(&rect, font.as_ref(), x_align, y_align, foreground, &text);

    let invalid = draw.invalid_rect();
    win.draw_end(key, invalid);
}

fn label_procedure(win: &mut Window, key: ElementKey, event: &Event) -> ProcResult {
    if event.event_type == levent::REDRAW {
        label_draw(win, key);
    }
    Ok(())
}
