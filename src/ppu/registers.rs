//! PPU register bitfields: PPUCTRL, PPUMASK, PPUSTATUS and the loopy `v`/`t` scroll registers.

use bitflags::bitflags;

bitflags! {
    /// PPUCTRL ($2000).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Control: u8 {
        const NAMETABLE_X       = 1 << 0;
        const NAMETABLE_Y       = 1 << 1;
        /// VRAM increment per $2007 access: 0 = +1 (across), 1 = +32 (down).
        const INCREMENT_MODE    = 1 << 2;
        /// Sprite pattern table for 8x8 sprites.
        const SPRITE_PATTERN    = 1 << 3;
        const BACKGROUND_PATTERN = 1 << 4;
        const SPRITE_SIZE       = 1 << 5;
        const MASTER_SLAVE      = 1 << 6;
        const ENABLE_NMI        = 1 << 7;
    }
}

impl Control {
    pub fn increment(self) -> u16 {
        if self.contains(Control::INCREMENT_MODE) { 32 } else { 1 }
    }

    pub fn sprite_pattern_addr(self) -> u16 {
        if self.contains(Control::SPRITE_PATTERN) { 0x1000 } else { 0x0000 }
    }

    pub fn background_pattern_addr(self) -> u16 {
        if self.contains(Control::BACKGROUND_PATTERN) { 0x1000 } else { 0x0000 }
    }

    pub fn sprite_height(self) -> u8 {
        if self.contains(Control::SPRITE_SIZE) { 16 } else { 8 }
    }
}

bitflags! {
    /// PPUMASK ($2001). Emphasis bits are stored but not rendered.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Mask: u8 {
        const GREYSCALE            = 1 << 0;
        const SHOW_BACKGROUND_LEFT = 1 << 1;
        const SHOW_SPRITES_LEFT    = 1 << 2;
        const SHOW_BACKGROUND      = 1 << 3;
        const SHOW_SPRITES         = 1 << 4;
        const EMPHASIZE_RED        = 1 << 5;
        const EMPHASIZE_GREEN      = 1 << 6;
        const EMPHASIZE_BLUE       = 1 << 7;
    }
}

impl Mask {
    pub fn rendering_enabled(self) -> bool {
        self.intersects(Mask::SHOW_BACKGROUND | Mask::SHOW_SPRITES)
    }
}

bitflags! {
    /// PPUSTATUS ($2002). The low five bits read back the I/O latch.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Status: u8 {
        const SPRITE_OVERFLOW = 1 << 5;
        const SPRITE_ZERO_HIT = 1 << 6;
        const VBLANK          = 1 << 7;
    }
}

const COARSE_X: u16 = 0x001F;
const COARSE_Y: u16 = 0x03E0;
const NAMETABLE_X: u16 = 0x0400;
const NAMETABLE_Y: u16 = 0x0800;
const FINE_Y: u16 = 0x7000;

/// 15-bit VRAM address / scroll register (`v` and `t`).
///
/// ```text
/// yyy N N YYYYY XXXXX
/// |   | | |     +------ coarse X
/// |   | | +------------ coarse Y
/// |   | +-------------- nametable X
/// |   +---------------- nametable Y
/// +-------------------- fine Y
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Loopy(pub u16);

impl Loopy {
    pub fn coarse_x(self) -> u16 {
        self.0 & COARSE_X
    }

    pub fn set_coarse_x(&mut self, value: u16) {
        self.0 = (self.0 & !COARSE_X) | (value & 0x1F);
    }

    pub fn coarse_y(self) -> u16 {
        (self.0 & COARSE_Y) >> 5
    }

    pub fn set_coarse_y(&mut self, value: u16) {
        self.0 = (self.0 & !COARSE_Y) | ((value & 0x1F) << 5);
    }

    pub fn nametable_x(self) -> u16 {
        (self.0 & NAMETABLE_X) >> 10
    }

    pub fn set_nametable_x(&mut self, value: u16) {
        self.0 = (self.0 & !NAMETABLE_X) | ((value & 1) << 10);
    }

    pub fn nametable_y(self) -> u16 {
        (self.0 & NAMETABLE_Y) >> 11
    }

    pub fn set_nametable_y(&mut self, value: u16) {
        self.0 = (self.0 & !NAMETABLE_Y) | ((value & 1) << 11);
    }

    pub fn fine_y(self) -> u16 {
        (self.0 & FINE_Y) >> 12
    }

    pub fn set_fine_y(&mut self, value: u16) {
        self.0 = (self.0 & !FINE_Y) | ((value & 0x07) << 12);
    }

    /// Advance along a row of tiles, switching horizontal nametable past coarse X 31.
    pub fn increment_x(&mut self) {
        if self.coarse_x() == 31 {
            self.set_coarse_x(0);
            self.set_nametable_x(self.nametable_x() ^ 1);
        } else {
            self.set_coarse_x(self.coarse_x() + 1);
        }
    }

    /// Advance one pixel row. Coarse Y 29 is the last tile row and flips the vertical nametable;
    /// a start in attribute memory counts 30 to 31, and 31 wraps to 0 without flipping.
    pub fn increment_y(&mut self) {
        if self.fine_y() < 7 {
            self.set_fine_y(self.fine_y() + 1);
            return;
        }
        self.set_fine_y(0);
        match self.coarse_y() {
            29 => {
                self.set_coarse_y(0);
                self.set_nametable_y(self.nametable_y() ^ 1);
            }
            31 => self.set_coarse_y(0),
            y => self.set_coarse_y(y + 1),
        }
    }

    /// Copy coarse X and nametable X from `t`.
    pub fn transfer_horizontal(&mut self, t: Loopy) {
        let bits = COARSE_X | NAMETABLE_X;
        self.0 = (self.0 & !bits) | (t.0 & bits);
    }

    /// Copy fine Y, coarse Y and nametable Y from `t`.
    pub fn transfer_vertical(&mut self, t: Loopy) {
        let bits = FINE_Y | COARSE_Y | NAMETABLE_Y;
        self.0 = (self.0 & !bits) | (t.0 & bits);
    }

    /// Nametable byte address for the current tile.
    pub fn tile_addr(self) -> u16 {
        0x2000 | (self.0 & 0x0FFF)
    }

    /// Attribute byte address covering the current tile.
    pub fn attribute_addr(self) -> u16 {
        0x23C0
            | (self.nametable_y() << 11)
            | (self.nametable_x() << 10)
            | ((self.coarse_y() >> 2) << 3)
            | (self.coarse_x() >> 2)
    }
}
