/// A packed 32-bit color, component order (MSB to LSB) A, R, G, B. Alpha is
/// straight, not premultiplied.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pixel(pub u32);

impl Pixel {
    pub const ZERO: Self = Self(0);

    pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::argb(0xFF, r, g, b)
    }

    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn blue(self) -> u8 {
        self.0 as u8
    }

    /// Destination-over blend of `src` onto `self` with straight alpha.
    /// A fully transparent result collapses to the zero pixel.
    pub fn blend(self, src: Pixel) -> Pixel {
        let src_a = src.alpha() as u32;
        let dest_a = self.alpha() as u32;
        let out_a = src_a + (dest_a * (0xFF - src_a)) / 0xFF;
        if out_a == 0 {
            return Pixel::ZERO;
        }

        let channel = |s: u8, d: u8| {
            ((s as u32 * src_a + d as u32 * dest_a * (0xFF - src_a) / 0xFF) / out_a) as u8
        };
        Pixel::argb(
            out_a as u8,
            channel(src.red(), self.red()),
            channel(src.green(), self.green()),
            channel(src.blue(), self.blue()),
        )
    }
}

impl From<u32> for Pixel {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}
