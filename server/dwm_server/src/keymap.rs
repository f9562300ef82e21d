//! Modifier tracking and keycode-to-ascii translation (US layout).

use dwm_api_types::input::{KbdEventKind, KbdMods, Keycode};

/// Applies one key edge to the modifier set. Caps lock toggles on press only;
/// the other modifiers follow their key state.
pub fn update_mods(mods: &mut KbdMods, code: Keycode, kind: KbdEventKind) {
    let held = |mods: &mut KbdMods, flag| match kind {
        KbdEventKind::Press => mods.insert(flag),
        KbdEventKind::Release => mods.remove(flag),
    };
    match code {
        Keycode::LeftShift | Keycode::RightShift => held(mods, KbdMods::SHIFT),
        Keycode::LeftCtrl | Keycode::RightCtrl => held(mods, KbdMods::CTRL),
        Keycode::LeftAlt | Keycode::RightAlt => held(mods, KbdMods::ALT),
        Keycode::LeftSuper | Keycode::RightSuper => held(mods, KbdMods::SUPER),
        Keycode::CapsLock => {
            if kind == KbdEventKind::Press {
                mods.toggle(KbdMods::CAPS);
            }
        }
        _ => {}
    }
}

/// Translates a keycode under the given modifiers to its ascii character,
/// or 0 for keys with no printable mapping.
pub fn ascii(code: Keycode, mods: KbdMods) -> u8 {
    let shift = mods.contains(KbdMods::SHIFT);
    let caps = mods.contains(KbdMods::CAPS);

    let code_raw: u16 = code.into();
    let letter_base: u16 = Keycode::A.into();
    let digit_base: u16 = Keycode::Num0.into();

    if (Keycode::A as u16..=Keycode::Z as u16).contains(&code_raw) {
        let lower = b'a' + (code_raw - letter_base) as u8;
        // Shift and caps lock cancel each other for letters.
        return if shift != caps {
            lower.to_ascii_uppercase()
        } else {
            lower
        };
    }

    if (Keycode::Num0 as u16..=Keycode::Num9 as u16).contains(&code_raw) {
        let digit = (code_raw - digit_base) as u8;
        if shift {
            return b")!@#$%^&*("[digit as usize];
        }
        return b'0' + digit;
    }

    match (code, shift) {
        (Keycode::Space, _) => b' ',
        (Keycode::Enter, _) => b'\n',
        (Keycode::Tab, _) => b'\t',
        (Keycode::Backspace, _) => 0x08,
        (Keycode::Escape, _) => 0x1B,
        (Keycode::Minus, false) => b'-',
        (Keycode::Minus, true) => b'_',
        (Keycode::Equal, false) => b'=',
        (Keycode::Equal, true) => b'+',
        (Keycode::LeftBracket, false) => b'[',
        (Keycode::LeftBracket, true) => b'{',
        (Keycode::RightBracket, false) => b']',
        (Keycode::RightBracket, true) => b'}',
        (Keycode::Backslash, false) => b'\\',
        (Keycode::Backslash, true) => b'|',
        (Keycode::Semicolon, false) => b';',
        (Keycode::Semicolon, true) => b':',
        (Keycode::Apostrophe, false) => b'\'',
        (Keycode::Apostrophe, true) => b'"',
        (Keycode::Grave, false) => b'`',
        (Keycode::Grave, true) => b'~',
        (Keycode::Comma, false) => b',',
        (Keycode::Comma, true) => b'<',
        (Keycode::Period, false) => b'.',
        (Keycode::Period, true) => b'>',
        (Keycode::Slash, false) => b'/',
        (Keycode::Slash, true) => b'?',
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_is_held_caps_is_toggled() {
        let mut mods = KbdMods::empty();
        update_mods(&mut mods, Keycode::LeftShift, KbdEventKind::Press);
        assert!(mods.contains(KbdMods::SHIFT));
        update_mods(&mut mods, Keycode::LeftShift, KbdEventKind::Release);
        assert!(!mods.contains(KbdMods::SHIFT));

        update_mods(&mut mods, Keycode::CapsLock, KbdEventKind::Press);
        assert!(mods.contains(KbdMods::CAPS));
        // Release does not clear caps; the next press does.
        update_mods(&mut mods, Keycode::CapsLock, KbdEventKind::Release);
        assert!(mods.contains(KbdMods::CAPS));
        update_mods(&mut mods, Keycode::CapsLock, KbdEventKind::Press);
        assert!(!mods.contains(KbdMods::CAPS));
    }

    #[test]
    fn letters_respect_shift_and_caps() {
        assert_eq!(ascii(Keycode::A, KbdMods::empty()), b'a');
        assert_eq!(ascii(Keycode::A, KbdMods::SHIFT), b'A');
        assert_eq!(ascii(Keycode::A, KbdMods::CAPS), b'A');
        assert_eq!(ascii(Keycode::A, KbdMods::SHIFT | KbdMods::CAPS), b'a');
        assert_eq!(ascii(Keycode::Z, KbdMods::empty()), b'z');
    }

    #[test]
    fn digits_shift_to_symbols() {
        assert_eq!(ascii(Keycode::Num1, KbdMods::empty()), b'1');
        assert_eq!(ascii(Keycode::Num1, KbdMods::SHIFT), b'!');
        assert_eq!(ascii(Keycode::Num0, KbdMods::SHIFT), b')');
        // Caps lock does not shift digits.
        assert_eq!(ascii(Keycode::Num5, KbdMods::CAPS), b'5');
    }

    #[test]
    fn non_printable_keys_map_to_zero() {
        assert_eq!(ascii(Keycode::F1, KbdMods::empty()), 0);
        assert_eq!(ascii(Keycode::LeftShift, KbdMods::empty()), 0);
        assert_eq!(ascii(Keycode::ArrowLeft, KbdMods::empty()), 0);
    }
}
