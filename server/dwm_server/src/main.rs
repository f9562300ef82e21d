use dwm_server::dwm::Dwm;
use dwm_sys::conn::{DWM_SOCKET_NAME, SocketListener};
use dwm_sys::fb::DevFramebuffer;
use dwm_sys::input::{DevSource, KBD_EVENTS_PATH, MOUSE_EVENTS_PATH};

fn main() {
    dwm_sys::logger::init();

    let fb = match DevFramebuffer::open() {
        Ok(fb) => fb,
        Err(err) => {
            log::error!("failed to open framebuffer: {err}");
            std::process::exit(1);
        }
    };

    let kbd = match DevSource::open(KBD_EVENTS_PATH) {
        Ok(kbd) => kbd,
        Err(err) => {
            log::error!("failed to open keyboard: {err}");
            std::process::exit(1);
        }
    };

    let mouse = match DevSource::open(MOUSE_EVENTS_PATH) {
        Ok(mouse) => mouse,
        Err(err) => {
            log::error!("failed to open mouse: {err}");
            std::process::exit(1);
        }
    };

    let listener = match SocketListener::bind(DWM_SOCKET_NAME) {
        Ok(listener) => listener,
        Err(err) => {
            log::error!("failed to bind '{DWM_SOCKET_NAME}' socket: {err}");
            std::process::exit(1);
        }
    };

    Dwm::new(fb, Box::new(listener), Box::new(kbd), Box::new(mouse)).run();
}
