//! Frame buffer and the 2C02 system palette.

/// Visible width in pixels.
pub const WIDTH: usize = 256;
/// Visible height in pixels.
pub const HEIGHT: usize = 240;

/// NES 2C02-style 64-color palette (0xRRGGBB). Index 0 = backdrop.
pub const NES_PALETTE_RGB: [u32; 64] = [
    0x545454, 0x001E74, 0x081090, 0x300088, 0x440064, 0x5C0030, 0x540400, 0x3C1800, 0x202A00,
    0x083A00, 0x004000, 0x003C00, 0x00302C, 0x000000, 0x000000, 0x000000, 0x989698, 0x084CC4,
    0x3032EC, 0x5C1EE4, 0x8814B0, 0xA01464, 0x982220, 0x783C00, 0x545A00, 0x287200, 0x087C00,
    0x007628, 0x006678, 0x000000, 0x000000, 0x000000, 0xECEEEC, 0x3C7EEC, 0x5C5CEC, 0x8844EC,
    0xB02CEC, 0xE028B0, 0xD83C50, 0xC45400, 0xAC7000, 0x808800, 0x409C30, 0x20A458, 0x209A88,
    0x404040, 0x000000, 0x000000, 0xECEEEC, 0xA8BCEC, 0xBCACEC, 0xD4A0EC, 0xEC94EC, 0xEC90D4,
    0xEC9CB4, 0xE4B090, 0xDCC878, 0xD4DC78, 0xB8EC98, 0xA8ECBC, 0xA0E4E4, 0xA0A0A0, 0x000000,
    0x000000,
];

/// One RGBA pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Pixel {
    /// Opaque system palette color for a 6-bit color index.
    pub fn from_palette(index: u8) -> Self {
        let rgb = NES_PALETTE_RGB[(index & 0x3F) as usize];
        Self {
            r: (rgb >> 16) as u8,
            g: (rgb >> 8) as u8,
            b: rgb as u8,
            a: 0xFF,
        }
    }
}

/// 256×240 frame, row-major, top row first.
#[derive(Clone)]
pub struct Frame {
    pixels: Vec<Pixel>,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    pub fn new() -> Self {
        Self {
            pixels: vec![Pixel::default(); WIDTH * HEIGHT],
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Pixel {
        assert!(x < WIDTH && y < HEIGHT, "pixel ({x}, {y}) outside the frame");
        self.pixels[y * WIDTH + x]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, pixel: Pixel) {
        assert!(x < WIDTH && y < HEIGHT, "pixel ({x}, {y}) outside the frame");
        self.pixels[y * WIDTH + x] = pixel;
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Pixels packed as `0xRRGGBB`, the layout most framebuffer windows take.
    pub fn to_rgb_u32(&self) -> Vec<u32> {
        self.pixels
            .iter()
            .map(|p| ((p.r as u32) << 16) | ((p.g as u32) << 8) | p.b as u32)
            .collect()
    }

    /// Pixels as a flat RGBA byte stream.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|p| [p.r, p.g, p.b, p.a])
            .collect()
    }
}
