//! The global theme and per-element overrides.
//!
//! One theme is lazily loaded per process from `theme/colors.ini` and
//! `theme/vars.ini`. Elements may carry a sparse override chain that shadows
//! individual colors, strings and integers; lookups walk the overrides
//! before the globals. Config files fail safely, so a missing theme yields
//! the fallback values everywhere.

use std::sync::OnceLock;

use dwm_api_types::pixel::Pixel;

use crate::config::Config;

/// Sentinel for colors absent from the config.
pub const THEME_COLOR_INVALID: Pixel = Pixel(0xFFFF_00FF);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorSetId {
    Button,
    View,
    Element,
    Panel,
    Deco,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorRole {
    BackgroundNormal,
    BackgroundSelectedStart,
    BackgroundSelectedEnd,
    BackgroundUnselectedStart,
    BackgroundUnselectedEnd,
    ForegroundNormal,
    ForegroundInactive,
    ForegroundLink,
    ForegroundSelected,
    Bezel,
    Highlight,
    Shadow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThemeString {
    Wallpaper,
    FontsDir,
    CursorArrow,
    DefaultFont,
    IconClose,
    IconMinimize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThemeInt {
    FrameSize,
    BezelSize,
    TitlebarSize,
    PanelSize,
    BigPadding,
    SmallPadding,
    SeparatorSize,
}

#[derive(Clone, Copy, Debug)]
pub struct ColorSet {
    pub background_normal: Pixel,
    pub background_selected_start: Pixel,
    pub background_selected_end: Pixel,
    pub background_unselected_start: Pixel,
    pub background_unselected_end: Pixel,
    pub foreground_normal: Pixel,
    pub foreground_inactive: Pixel,
    pub foreground_link: Pixel,
    pub foreground_selected: Pixel,
    pub bezel: Pixel,
    pub highlight: Pixel,
    pub shadow: Pixel,
}

impl ColorSet {
    fn invalid() -> Self {
        Self {
            background_normal: THEME_COLOR_INVALID,
            background_selected_start: THEME_COLOR_INVALID,
            background_selected_end: THEME_COLOR_INVALID,
            background_unselected_start: THEME_COLOR_INVALID,
            background_unselected_end: THEME_COLOR_INVALID,
            foreground_normal: THEME_COLOR_INVALID,
            foreground_inactive: THEME_COLOR_INVALID,
            foreground_link: THEME_COLOR_INVALID,
            foreground_selected: THEME_COLOR_INVALID,
            bezel: THEME_COLOR_INVALID,
            highlight: THEME_COLOR_INVALID,
            shadow: THEME_COLOR_INVALID,
        }
    }

    fn load(config: &Config, section: &str) -> Self {
        let color = |key: &str| {
            Pixel(config.int(section, key, THEME_COLOR_INVALID.0 as i64) as u32)
        };
        Self {
            background_normal: color("background_normal"),
            background_selected_start: color("background_selected_start"),
            background_selected_end: color("background_selected_end"),
            background_unselected_start: color("background_unselected_start"),
            background_unselected_end: color("background_unselected_end"),
            foreground_normal: color("foreground_normal"),
            foreground_inactive: color("foreground_inactive"),
            foreground_link: color("foreground_link"),
            foreground_selected: color("foreground_selected"),
            bezel: color("bezel"),
            highlight: color("highlight"),
            shadow: color("shadow"),
        }
    }

    pub fn role(&self, role: ColorRole) -> Pixel {
        match role {
            ColorRole::BackgroundNormal => self.background_normal,
            ColorRole::BackgroundSelectedStart => self.background_selected_start,
            ColorRole::BackgroundSelectedEnd => self.background_selected_end,
            ColorRole::BackgroundUnselectedStart => self.background_unselected_start,
            ColorRole::BackgroundUnselectedEnd => self.background_unselected_end,
            ColorRole::ForegroundNormal => self.foreground_normal,
            ColorRole::ForegroundInactive => self.foreground_inactive,
            ColorRole::ForegroundLink => self.foreground_link,
            ColorRole::ForegroundSelected => self.foreground_selected,
            ColorRole::Bezel => self.bezel,
            ColorRole::Highlight => self.highlight,
            ColorRole::Shadow => self.shadow,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Theme {
    pub button: ColorSet,
    pub view: ColorSet,
    pub element: ColorSet,
    pub panel: ColorSet,
    pub deco: ColorSet,
    pub wallpaper: String,
    pub fonts_dir: String,
    pub cursor_arrow: String,
    pub default_font: String,
    pub icon_close: String,
    pub icon_minimize: String,
    pub frame_size: i64,
    pub bezel_size: i64,
    pub titlebar_size: i64,
    pub panel_size: i64,
    pub big_padding: i64,
    pub small_padding: i64,
    pub separator_size: i64,
}

impl Theme {
    /// All-fallback theme, what a system without config files gets.
    pub fn fallback() -> Self {
        Self {
            button: ColorSet::invalid(),
            view: ColorSet::invalid(),
            element: ColorSet::invalid(),
            panel: ColorSet::invalid(),
            deco: ColorSet::invalid(),
            wallpaper: String::new(),
            fonts_dir: String::new(),
            cursor_arrow: String::new(),
            default_font: String::new(),
            icon_close: String::new(),
            icon_minimize: String::new(),
            frame_size: 1,
            bezel_size: 1,
            titlebar_size: 1,
            panel_size: 1,
            big_padding: 1,
            small_padding: 1,
            separator_size: 1,
        }
    }

    pub fn load(colors: &Config, vars: &Config) -> Self {
        Self {
            button: ColorSet::load(colors, "button"),
            view: ColorSet::load(colors, "view"),
            element: ColorSet::load(colors, "element"),
            panel: ColorSet::load(colors, "panel"),
            deco: ColorSet::load(colors, "deco"),
            wallpaper: vars.string("strings", "wallpaper", ""),
            fonts_dir: vars.string("strings", "fonts_dir", ""),
            cursor_arrow: vars.string("strings", "cursor_arrow", ""),
            default_font: vars.string("strings", "default_font", ""),
            icon_close: vars.string("strings", "icon_close", ""),
            icon_minimize: vars.string("strings", "icon_minimize", ""),
            frame_size: vars.int("integers", "frame_size", 1),
            bezel_size: vars.int("integers", "bezel_size", 1),
            titlebar_size: vars.int("integers", "titlebar_size", 1),
            panel_size: vars.int("integers", "panel_size", 1),
            big_padding: vars.int("integers", "big_padding", 1),
            small_padding: vars.int("integers", "small_padding", 1),
            separator_size: vars.int("integers", "separator_size", 1),
        }
    }

    /// The process-wide theme, loaded once on first use.
    pub fn global() -> &'static Theme {
        static THEME: OnceLock<Theme> = OnceLock::new();
        THEME.get_or_init(|| {
            let colors = Config::open("theme", "colors");
            let vars = Config::open("theme", "vars");
            Theme::load(&colors, &vars)
        })
    }

    pub fn set(&self, id: ColorSetId) -> &ColorSet {
        match id {
            ColorSetId::Button => &self.button,
            ColorSetId::View => &self.view,
            ColorSetId::Element => &self.element,
            ColorSetId::Panel => &self.panel,
            ColorSetId::Deco => &self.deco,
        }
    }

    pub fn color(&self, set: ColorSetId, role: ColorRole) -> Pixel {
        self.set(set).role(role)
    }

    pub fn string(&self, name: ThemeString) -> &str {
        match name {
            ThemeString::Wallpaper => &self.wallpaper,
            ThemeString::FontsDir => &self.fonts_dir,
            ThemeString::CursorArrow => &self.cursor_arrow,
            ThemeString::DefaultFont => &self.default_font,
            ThemeString::IconClose => &self.icon_close,
            ThemeString::IconMinimize => &self.icon_minimize,
        }
    }

    pub fn int(&self, name: ThemeInt) -> i64 {
        match name {
            ThemeInt::FrameSize => self.frame_size,
            ThemeInt::BezelSize => self.bezel_size,
            ThemeInt::TitlebarSize => self.titlebar_size,
            ThemeInt::PanelSize => self.panel_size,
            ThemeInt::BigPadding => self.big_padding,
            ThemeInt::SmallPadding => self.small_padding,
            ThemeInt::SeparatorSize => self.separator_size,
        }
    }
}

/// Sparse per-element shadowing of theme values. Empty for the vast majority
/// of elements, so lookups just fall through to the global.
#[derive(Debug, Default)]
pub struct ThemeOverrides {
    colors: Vec<(ColorSetId, ColorRole, Pixel)>,
    strings: Vec<(ThemeString, String)>,
    ints: Vec<(ThemeInt, i64)>,
}

impl ThemeOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color(&self, theme: &Theme, set: ColorSetId, role: ColorRole) -> Pixel {
        self.colors
            .iter()
            .find(|(s, r, _)| *s == set && *r == role)
            .map(|(_, _, color)| *color)
            .unwrap_or_else(|| theme.color(set, role))
    }

    pub fn set_color(&mut self, set: ColorSetId, role: ColorRole, color: Pixel) {
        if let Some(entry) = self
            .colors
            .iter_mut()
            .find(|(s, r, _)| *s == set && *r == role)
        {
            entry.2 = color;
        } else {
            self.colors.push((set, role, color));
        }
    }

    pub fn string<'a>(&'a self, theme: &'a Theme, name: ThemeString) -> &'a str {
        self.strings
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, s)| s.as_str())
            .unwrap_or_else(|| theme.string(name))
    }

    pub fn set_string(&mut self, name: ThemeString, value: impl Into<String>) {
        let value = value.into();
        if let Some(entry) = self.strings.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.strings.push((name, value));
        }
    }

    pub fn int(&self, theme: &Theme, name: ThemeInt) -> i64 {
        self.ints
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
            .unwrap_or_else(|| theme.int(name))
    }

    pub fn set_int(&mut self, name: ThemeInt, value: i64) {
        if let Some(entry) = self.ints.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.ints.push((name, value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLORS: &str = "\
[button]
background_normal = 0xFFC0C0C0
highlight = 0xFFFFFFFF
[deco]
background_selected_start = 0xFF000080
";

    const VARS: &str = "\
[strings]
default_font = sans
fonts_dir = /fonts
[integers]
frame_size = 3
titlebar_size = 22
";

    #[test]
    fn loads_sections_with_fallbacks() {
        let theme = Theme::load(&Config::parse(COLORS), &Config::parse(VARS));
        assert_eq!(
            theme.color(ColorSetId::Button, ColorRole::BackgroundNormal),
            Pixel(0xFFC0_C0C0)
        );
        assert_eq!(
            theme.color(ColorSetId::Deco, ColorRole::BackgroundSelectedStart),
            Pixel(0xFF00_0080)
        );
        // Absent entries get the sentinel / defaults.
        assert_eq!(
            theme.color(ColorSetId::View, ColorRole::Shadow),
            THEME_COLOR_INVALID
        );
        assert_eq!(theme.int(ThemeInt::FrameSize), 3);
        assert_eq!(theme.int(ThemeInt::BezelSize), 1);
        assert_eq!(theme.string(ThemeString::DefaultFont), "sans");
        assert_eq!(theme.string(ThemeString::Wallpaper), "");
    }

    #[test]
    fn overrides_shadow_the_global_theme() {
        let theme = Theme::fallback();
        let mut overrides = ThemeOverrides::new();

        assert_eq!(
            overrides.color(&theme, ColorSetId::Button, ColorRole::Bezel),
            THEME_COLOR_INVALID
        );
        overrides.set_color(ColorSetId::Button, ColorRole::Bezel, Pixel(0xFF123456));
        assert_eq!(
            overrides.color(&theme, ColorSetId::Button, ColorRole::Bezel),
            Pixel(0xFF123456)
        );
        // Other roles are untouched.
        assert_eq!(
            overrides.color(&theme, ColorSetId::Button, ColorRole::Shadow),
            THEME_COLOR_INVALID
        );

        overrides.set_int(ThemeInt::FrameSize, 9);
        assert_eq!(overrides.int(&theme, ThemeInt::FrameSize), 9);
        assert_eq!(overrides.int(&theme, ThemeInt::BezelSize), 1);

        overrides.set_string(ThemeString::DefaultFont, "mono");
        overrides.set_string(ThemeString::DefaultFont, "serif");
        assert_eq!(overrides.string(&theme, ThemeString::DefaultFont), "serif");
    }
}
