//! End-to-end server scenarios driven over loopback connections with raw
//! protocol frames, an in-memory framebuffer and scripted input devices.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use dwm_api_types::Name;
use dwm_api_types::cmd::{
    Cmd, CmdScreenInfo, CmdSubscribe, CmdSurfaceInvalidate, CmdSurfaceMove, CmdSurfaceNew,
    CmdSurfaceTimerSet, CmdSurfaceVisibleSet, CmdWriter, CmdUnsubscribe,
};
use dwm_api_types::event::{
    EVENT_WIRE_SIZE, Event, EventMouse, EventReport, EventScreenInfo, EventSurfaceNew, ev,
};
use dwm_api_types::pixel::Pixel;
use dwm_api_types::rect::Rect;
use dwm_api_types::surface::{ReportFlags, SurfaceFlags, SurfaceId, SurfaceType, TimerFlags};
use dwm_server::dwm::Dwm;
use dwm_sys::conn::{Connection, LoopbackListener, PipeConn};
use dwm_sys::fb::MemFramebuffer;
use dwm_sys::input::ScriptedSource;
use dwm_sys::shmem;

struct TestDwm {
    dwm: Dwm<MemFramebuffer>,
    listener: LoopbackListener,
    kbd: Rc<RefCell<ScriptedSource>>,
    mouse: Rc<RefCell<ScriptedSource>>,
}

impl TestDwm {
    fn new(width: u32, height: u32) -> Self {
        let listener = LoopbackListener::new();
        let kbd = Rc::new(RefCell::new(ScriptedSource::new()));
        let mouse = Rc::new(RefCell::new(ScriptedSource::new()));
        let dwm = Dwm::new(
            MemFramebuffer::new(width, height),
            Box::new(listener.clone()),
            Box::new(kbd.clone()),
            Box::new(mouse.clone()),
        );
        Self {
            dwm,
            listener,
            kbd,
            mouse,
        }
    }

    fn connect(&mut self) -> TestClient {
        let conn = self.listener.connect();
        // The accept iteration returns early by design; run another full one.
        self.dwm.update();
        TestClient {
            conn,
            pending: Vec::new(),
        }
    }

    fn type_keys(&mut self, tokens: &str) {
        self.kbd.borrow_mut().push_str(tokens);
    }

    fn move_mouse(&mut self, tokens: &str) {
        self.mouse.borrow_mut().push_str(tokens);
    }

    fn front(&self, x: i32, y: i32) -> Pixel {
        self.dwm.screen().framebuffer().pixel_at(x, y)
    }
}

struct TestClient {
    conn: PipeConn,
    pending: Vec<u8>,
}

impl TestClient {
    fn send(&mut self, cmds: &[Cmd]) {
        let mut writer = CmdWriter::new();
        for cmd in cmds {
            writer.push(cmd).unwrap();
        }
        self.conn.send_all(writer.finish()).unwrap();
    }

    /// Drains every event currently queued on the socket.
    fn events(&mut self) -> Vec<Event> {
        let mut buf = [0u8; 4096];
        while let Ok(read) = self.conn.recv(&mut buf) {
            if read == 0 {
                break;
            }
            self.pending.extend_from_slice(&buf[..read]);
        }

        let mut events = Vec::new();
        while self.pending.len() >= EVENT_WIRE_SIZE {
            let mut frame = [0u8; EVENT_WIRE_SIZE];
            frame.copy_from_slice(&self.pending[..EVENT_WIRE_SIZE]);
            self.pending.drain(..EVENT_WIRE_SIZE);
            events.push(Event::decode(&frame));
        }
        events
    }

    fn events_of(&mut self, event_type: u16) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }
}

/// Creates a visible surface and returns `(id, shmem key)`.
fn create_surface(
    fx: &mut TestDwm,
    client: &mut TestClient,
    surface_type: SurfaceType,
    rect: Rect,
    name: &str,
) -> (SurfaceId, u64) {
    client.send(&[Cmd::SurfaceNew(CmdSurfaceNew {
        surface_type,
        rect,
        name: Name::new(name).unwrap(),
    })]);
    fx.dwm.update();

    let created = client
        .events_of(ev::SURFACE_NEW)
        .pop()
        .expect("surface-new reply");
    let key = created.payload::<EventSurfaceNew>().unwrap().shmem_key;
    let id = created.target;

    client.send(&[Cmd::SurfaceVisibleSet(CmdSurfaceVisibleSet {
        target: id,
        is_global: false,
        is_visible: true,
    })]);
    fx.dwm.update();
    (id, key)
}

fn fill_surface(key: u64, pixel: Pixel) {
    let buffer = shmem::claim(key).expect("claimable surface buffer");
    unsafe { buffer.pixels_mut().fill(pixel) };
}

fn invalidate(fx: &mut TestDwm, client: &mut TestClient, id: SurfaceId, rect: Rect) {
    client.send(&[Cmd::SurfaceInvalidate(CmdSurfaceInvalidate {
        target: id,
        rect,
    })]);
    fx.dwm.update();
}

/// Most scenarios need a wall for the compositor to paint at all.
fn create_wall(fx: &mut TestDwm, client: &mut TestClient, color: Pixel) -> SurfaceId {
    let rect = Rect::from_dim(
        0,
        0,
        fx.dwm.screen().width() as i32,
        fx.dwm.screen().height() as i32,
    );
    let (id, key) = create_surface(fx, client, SurfaceType::Wall, rect, "wall");
    fill_surface(key, color);
    invalidate(fx, client, id, rect);
    id
}

fn create_cursor(fx: &mut TestDwm, client: &mut TestClient) -> SurfaceId {
    let (id, _key) = create_surface(
        fx,
        client,
        SurfaceType::Cursor,
        Rect::from_dim(0, 0, 1, 1),
        "cursor",
    );
    id
}

const WALL: Pixel = Pixel::rgb(0x11, 0x22, 0x33);
const GRAY: Pixel = Pixel(0xFF80_8080);

#[test]
fn s1_screen_info_round_trip() {
    let mut fx = TestDwm::new(1024, 768);
    let mut client = fx.connect();

    client.send(&[Cmd::ScreenInfo(CmdScreenInfo { index: 0 })]);
    fx.dwm.update();

    let info = client.events_of(ev::SCREEN_INFO).pop().unwrap();
    assert_eq!(
        info.payload::<EventScreenInfo>().unwrap(),
        EventScreenInfo {
            width: 1024,
            height: 768,
        }
    );
}

#[test]
fn s2_window_pixels_reach_the_front_buffer() {
    let mut fx = TestDwm::new(1024, 768);
    let mut client = fx.connect();
    create_wall(&mut fx, &mut client, WALL);

    let rect = Rect::new(10, 20, 110, 120);
    let (id, key) = create_surface(&mut fx, &mut client, SurfaceType::Window, rect, "w1");
    fill_surface(key, GRAY);
    invalidate(&mut fx, &mut client, id, Rect::from_dim(0, 0, 100, 100));

    for (x, y) in [(10, 20), (109, 119), (60, 70)] {
        assert_eq!(fx.front(x, y), GRAY, "at ({x},{y})");
    }
    assert_eq!(fx.front(9, 20), WALL);
    assert_eq!(fx.front(110, 20), WALL);
}

#[test]
fn s3_moving_a_window_repaints_both_rects() {
    let mut fx = TestDwm::new(1024, 768);
    let mut client = fx.connect();
    create_wall(&mut fx, &mut client, WALL);

    let rect = Rect::new(10, 20, 110, 120);
    let (id, key) = create_surface(&mut fx, &mut client, SurfaceType::Window, rect, "w1");
    fill_surface(key, GRAY);
    invalidate(&mut fx, &mut client, id, Rect::from_dim(0, 0, 100, 100));
    client.events();

    client.send(&[Cmd::SurfaceMove(CmdSurfaceMove {
        target: id,
        rect: Rect::new(200, 200, 300, 300),
    })]);
    fx.dwm.update();

    assert_eq!(fx.front(10, 20), WALL);
    assert_eq!(fx.front(109, 119), WALL);
    assert_eq!(fx.front(200, 200), GRAY);
    assert_eq!(fx.front(299, 299), GRAY);

    // The owner learns the new geometry through a rect report.
    let report = client
        .events_of(ev::REPORT)
        .into_iter()
        .find_map(|e| e.payload::<EventReport>())
        .expect("rect report");
    assert!(report.flags.contains(ReportFlags::RECT));
    assert_eq!(report.info.rect, Rect::new(200, 200, 300, 300));
}

#[test]
fn s3b_resize_is_rejected() {
    let mut fx = TestDwm::new(640, 480);
    let mut client = fx.connect();
    create_wall(&mut fx, &mut client, WALL);

    let (id, _) = create_surface(
        &mut fx,
        &mut client,
        SurfaceType::Window,
        Rect::new(0, 0, 50, 50),
        "w",
    );
    client.events();

    // Changed dimensions: unimplemented, position unchanged, no report.
    client.send(&[Cmd::SurfaceMove(CmdSurfaceMove {
        target: id,
        rect: Rect::new(10, 10, 90, 90),
    })]);
    fx.dwm.update();
    assert!(client.events_of(ev::REPORT).is_empty());
    assert_eq!(fx.dwm.surface(id).unwrap().screen_rect(), Rect::new(0, 0, 50, 50));
}

#[test]
fn s4_click_focuses_and_raises_the_window_under_the_cursor() {
    let mut fx = TestDwm::new(640, 480);
    let mut client_a = fx.connect();
    let mut client_b = fx.connect();
    create_wall(&mut fx, &mut client_a, WALL);
    create_cursor(&mut fx, &mut client_a);

    let (w1, _) = create_surface(
        &mut fx,
        &mut client_a,
        SurfaceType::Window,
        Rect::new(10, 10, 110, 110),
        "w1",
    );
    let (w2, _) = create_surface(
        &mut fx,
        &mut client_b,
        SurfaceType::Window,
        Rect::new(50, 50, 150, 150),
        "w2",
    );
    // Created later: w2 starts on top and holds focus from its visible-set.
    assert_eq!(fx.dwm.window_order(), &[w1, w2]);
    assert_eq!(fx.dwm.focus(), Some(w2));
    client_a.events();
    client_b.events();

    // Press inside w1 but outside w2: (40, 40).
    fx.move_mouse("40x40y\n0_\n");
    fx.dwm.update();

    assert_eq!(fx.dwm.focus(), Some(w1));
    assert_eq!(fx.dwm.window_order(), &[w2, w1]);

    let a_reports: Vec<EventReport> = client_a
        .events_of(ev::REPORT)
        .into_iter()
        .filter_map(|e| e.payload::<EventReport>())
        .filter(|r| r.flags.contains(ReportFlags::IS_FOCUSED))
        .collect();
    assert_eq!(a_reports.len(), 1, "w1 gains focus exactly once");
    assert_eq!(a_reports[0].info.id, w1);
    assert!(a_reports[0].info.flags.contains(SurfaceFlags::FOCUSED));

    let b_reports: Vec<EventReport> = client_b
        .events_of(ev::REPORT)
        .into_iter()
        .filter_map(|e| e.payload::<EventReport>())
        .filter(|r| r.flags.contains(ReportFlags::IS_FOCUSED))
        .collect();
    assert_eq!(b_reports.len(), 1, "w2 loses focus exactly once");
    assert_eq!(b_reports[0].info.id, w2);
}

#[test]
fn s5_global_kbd_respects_subscription() {
    let mut fx = TestDwm::new(640, 480);
    let mut subscriber = fx.connect();
    let mut other = fx.connect();
    create_wall(&mut fx, &mut subscriber, WALL);

    let (_w, _) = create_surface(
        &mut fx,
        &mut subscriber,
        SurfaceType::Window,
        Rect::new(0, 0, 100, 100),
        "w",
    );
    subscriber.events();
    other.events();

    // GLOBAL_KBD sits in the default mask; opt `other` out and `subscriber`
    // explicitly in.
    subscriber.send(&[Cmd::Subscribe(CmdSubscribe { event: ev::GLOBAL_KBD })]);
    other.send(&[Cmd::Unsubscribe(CmdUnsubscribe { event: ev::GLOBAL_KBD })]);
    fx.dwm.update();

    // Keycode 1 = 'a', press.
    fx.type_keys("1_\n");
    fx.dwm.update();

    assert_eq!(subscriber.events_of(ev::GLOBAL_KBD).len(), 1);
    assert!(other.events_of(ev::GLOBAL_KBD).is_empty());
}

#[test]
fn focused_surface_receives_typed_keys() {
    let mut fx = TestDwm::new(640, 480);
    let mut client = fx.connect();
    create_wall(&mut fx, &mut client, WALL);
    let (w, _) = create_surface(
        &mut fx,
        &mut client,
        SurfaceType::Window,
        Rect::new(0, 0, 100, 100),
        "w",
    );
    client.events();

    // Shift press, 'a' press -> 'A'.
    fx.type_keys("63_\n1_\n");
    fx.dwm.update();

    let kbd: Vec<Event> = client.events_of(ev::KBD);
    assert_eq!(kbd.len(), 2);
    assert_eq!(kbd[0].target, w);
    let key = kbd[1]
        .payload::<dwm_api_types::event::EventKbd>()
        .unwrap();
    assert_eq!(key.ascii, b'A');
}

#[test]
fn mouse_motion_batches_until_a_button_edge() {
    let mut fx = TestDwm::new(640, 480);
    let mut client = fx.connect();
    create_wall(&mut fx, &mut client, WALL);
    create_cursor(&mut fx, &mut client);
    client.events();

    // Three motion tokens then a press: one synthetic motion event with the
    // summed delta, then a zero-delta press event.
    fx.move_mouse("5x7x2y0_\n");
    fx.dwm.update();

    let mouse: Vec<EventMouse> = client
        .events_of(ev::MOUSE)
        .into_iter()
        .filter_map(|e| e.payload::<EventMouse>())
        .collect();
    assert_eq!(mouse.len(), 2);
    assert_eq!((mouse[0].delta.x, mouse[0].delta.y), (12, 2));
    assert!(mouse[0].pressed.is_empty());
    assert_eq!((mouse[1].delta.x, mouse[1].delta.y), (0, 0));
    assert!(!mouse[1].pressed.is_empty());
    assert_eq!((mouse[1].screen_pos.x, mouse[1].screen_pos.y), (12, 2));
}

#[test]
fn enter_and_leave_fire_on_surface_change() {
    let mut fx = TestDwm::new(640, 480);
    let mut wall_client = fx.connect();
    let mut win_client = fx.connect();
    create_wall(&mut fx, &mut wall_client, WALL);
    create_cursor(&mut fx, &mut wall_client);
    let (w, _) = create_surface(
        &mut fx,
        &mut win_client,
        SurfaceType::Window,
        Rect::new(100, 100, 200, 200),
        "w",
    );
    wall_client.events();
    win_client.events();

    // First motion lands on the wall, second moves into the window.
    fx.move_mouse("10x10y\n");
    fx.dwm.update();
    assert_eq!(wall_client.events_of(ev::CURSOR_ENTER).len(), 1);

    fx.move_mouse("140x140y\n");
    fx.dwm.update();

    assert_eq!(wall_client.events_of(ev::CURSOR_LEAVE).len(), 1);
    let enter = win_client.events_of(ev::CURSOR_ENTER).pop().unwrap();
    assert_eq!(enter.target, w);
    let payload = enter.payload::<EventMouse>().unwrap();
    // Local position is relative to the entered surface.
    assert_eq!((payload.pos.x, payload.pos.y), (50, 50));
}

#[test]
fn timers_fire_and_repeat_timers_rearm() {
    let mut fx = TestDwm::new(64, 64);
    let mut client = fx.connect();
    let (id, _) = create_surface(
        &mut fx,
        &mut client,
        SurfaceType::Window,
        Rect::new(0, 0, 8, 8),
        "t",
    );
    client.events();

    client.send(&[Cmd::SurfaceTimerSet(CmdSurfaceTimerSet {
        target: id,
        timeout_ns: 1_000_000,
        flags: TimerFlags::REPEAT,
    })]);
    fx.dwm.update();

    std::thread::sleep(Duration::from_millis(3));
    fx.dwm.update();
    assert_eq!(client.events_of(ev::TIMER).len(), 1);

    // Repeat timers keep firing.
    std::thread::sleep(Duration::from_millis(3));
    fx.dwm.update();
    assert_eq!(client.events_of(ev::TIMER).len(), 1);
}

#[test]
fn corrupt_frame_disconnects_only_that_client() {
    let mut fx = TestDwm::new(64, 64);
    let mut good = fx.connect();
    let mut bad = fx.connect();
    assert_eq!(fx.dwm.client_count(), 2);

    // A frame whose command magic is wrong.
    let mut writer = CmdWriter::new();
    writer
        .push(&Cmd::ScreenInfo(CmdScreenInfo { index: 0 }))
        .unwrap();
    let mut bytes = writer.finish().to_vec();
    bytes[dwm_api_types::cmd::CMD_BUFFER_HEADER_SIZE] ^= 0xFF;
    bad.conn.send_all(&bytes).unwrap();

    good.send(&[Cmd::ScreenInfo(CmdScreenInfo { index: 0 })]);
    fx.dwm.update();

    assert_eq!(fx.dwm.client_count(), 1);
    assert_eq!(good.events_of(ev::SCREEN_INFO).len(), 1);
}

#[test]
fn client_disconnect_frees_its_surfaces() {
    let mut fx = TestDwm::new(640, 480);
    let mut keeper = fx.connect();
    let mut goner = fx.connect();
    create_wall(&mut fx, &mut keeper, WALL);

    let rect = Rect::new(10, 10, 60, 60);
    let (id, key) = create_surface(&mut fx, &mut goner, SurfaceType::Window, rect, "temp");
    fill_surface(key, GRAY);
    invalidate(&mut fx, &mut goner, id, Rect::from_dim(0, 0, 50, 50));
    assert_eq!(fx.front(10, 10), GRAY);

    goner.conn.close();
    fx.dwm.update();
    // Another pass composes the now-exposed wall.
    fx.dwm.update();

    assert!(fx.dwm.surface(id).is_none());
    assert_eq!(fx.front(10, 10), WALL);
}

#[test]
fn fullscreen_surface_pins_focus() {
    let mut fx = TestDwm::new(64, 64);
    let mut client = fx.connect();
    create_wall(&mut fx, &mut client, WALL);

    let (w, _) = create_surface(
        &mut fx,
        &mut client,
        SurfaceType::Window,
        Rect::new(0, 0, 10, 10),
        "w",
    );
    let (fs, key) = create_surface(
        &mut fx,
        &mut client,
        SurfaceType::Fullscreen,
        Rect::new(0, 0, 64, 64),
        "fs",
    );
    fill_surface(key, GRAY);
    invalidate(&mut fx, &mut client, fs, Rect::from_dim(0, 0, 64, 64));

    assert_eq!(fx.dwm.focus(), Some(fs));
    assert_eq!(fx.front(0, 0), GRAY);
    assert_eq!(fx.front(63, 63), GRAY);

    // Focus changes are ignored while the fullscreen surface lives.
    client.send(&[Cmd::SurfaceFocusSet(
        dwm_api_types::cmd::CmdSurfaceFocusSet {
            target: w,
            is_global: false,
        },
    )]);
    fx.dwm.update();
    assert_eq!(fx.dwm.focus(), Some(fs));
}
