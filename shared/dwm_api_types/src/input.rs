use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

bitflags! {
    /// Modifier set tracked by the server's keyboard pipeline.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct KbdMods: u16 {
        const SHIFT = 1 << 0;
        const CTRL = 1 << 1;
        const ALT = 1 << 2;
        const SUPER = 1 << 3;
        const CAPS = 1 << 4;
    }
}

bitflags! {
    /// Mouse button masks. The wire mouse stream reports buttons by index;
    /// bit `n` corresponds to stream value `n`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct MouseButtons: u8 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const MIDDLE = 1 << 2;
    }
}

impl MouseButtons {
    pub fn from_index(index: u8) -> Self {
        Self::from_bits_truncate(1u8.checked_shl(index as u32).unwrap_or(0))
    }
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
pub enum KbdEventKind {
    Press = 0,
    Release = 1,
}

/// Generic keycodes as emitted by the keyboard driver's event file. The
/// numbering is part of the device protocol; both ends share this table.
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
pub enum Keycode {
    None = 0,
    A = 1,
    B = 2,
    C = 3,
    D = 4,
    E = 5,
    F = 6,
    G = 7,
    H = 8,
    I = 9,
    J = 10,
    K = 11,
    L = 12,
    M = 13,
    N = 14,
    O = 15,
    P = 16,
    Q = 17,
    R = 18,
    S = 19,
    T = 20,
    U = 21,
    V = 22,
    W = 23,
    X = 24,
    Y = 25,
    Z = 26,
    Num0 = 27,
    Num1 = 28,
    Num2 = 29,
    Num3 = 30,
    Num4 = 31,
    Num5 = 32,
    Num6 = 33,
    Num7 = 34,
    Num8 = 35,
    Num9 = 36,
    Space = 37,
    Enter = 38,
    Tab = 39,
    Backspace = 40,
    Escape = 41,
    Minus = 42,
    Equal = 43,
    LeftBracket = 44,
    RightBracket = 45,
    Backslash = 46,
    Semicolon = 47,
    Apostrophe = 48,
    Grave = 49,
    Comma = 50,
    Period = 51,
    Slash = 52,
    ArrowLeft = 53,
    ArrowRight = 54,
    ArrowUp = 55,
    ArrowDown = 56,
    Home = 57,
    End = 58,
    PageUp = 59,
    PageDown = 60,
    Insert = 61,
    Delete = 62,
    LeftShift = 63,
    RightShift = 64,
    LeftCtrl = 65,
    RightCtrl = 66,
    LeftAlt = 67,
    RightAlt = 68,
    LeftSuper = 69,
    RightSuper = 70,
    CapsLock = 71,
    F1 = 72,
    F2 = 73,
    F3 = 74,
    F4 = 75,
    F5 = 76,
    F6 = 77,
    F7 = 78,
    F8 = 79,
    F9 = 80,
    F10 = 81,
    F11 = 82,
    F12 = 83,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_index_maps_to_bit() {
        assert_eq!(MouseButtons::from_index(0), MouseButtons::LEFT);
        assert_eq!(MouseButtons::from_index(1), MouseButtons::RIGHT);
        assert_eq!(MouseButtons::from_index(2), MouseButtons::MIDDLE);
        assert_eq!(MouseButtons::from_index(9), MouseButtons::empty());
    }

    #[test]
    fn keycode_round_trips_through_raw() {
        let raw: u16 = Keycode::CapsLock.into();
        assert_eq!(Keycode::try_from(raw), Ok(Keycode::CapsLock));
        assert!(Keycode::try_from(999u16).is_err());
    }
}
