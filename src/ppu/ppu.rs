//! NES PPU (Picture Processing Unit) implementation.
//!
//! Walks the 341×262 dot grid one dot per [`PPU::clock`]. Background tiles are fetched in 8-dot
//! groups into 16-bit shift registers; sprites are evaluated for the next line at dot 257 and
//! their patterns fetched at dot 340. Pattern and nametable memory is reached through
//! [`PpuBus`]; palette RAM and OAM live here.

use serde::{Deserialize, Serialize};

use crate::bus::PpuBus;
use crate::config::SpriteLimit;
use crate::error::StateError;
use crate::ppu::frame::{Frame, Pixel};
use crate::ppu::registers::{Control, Loopy, Mask, Status};
use crate::state::restore_block;

/// OAM (Object Attribute Memory): 64 sprites × 4 bytes. Each entry: Y, tile, attr, X.
pub const OAM_LEN: usize = 256;

/// Sprites the 2C02 finds per line before it raises the overflow flag.
const HARDWARE_SPRITES: usize = 8;
const MAX_SPRITES: usize = 16;

/// A sprite copied into secondary OAM for the next line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Sprite {
    y: u8,
    tile: u8,
    attr: u8,
    x: u8,
}

impl Sprite {
    fn from_oam(entry: &[u8]) -> Self {
        Self {
            y: entry[0],
            tile: entry[1],
            attr: entry[2],
            x: entry[3],
        }
    }

    fn palette(self) -> u8 {
        (self.attr & 0x03) + 4
    }

    fn in_front(self) -> bool {
        self.attr & 0x20 == 0
    }

    fn flip_horizontal(self) -> bool {
        self.attr & 0x40 != 0
    }

    fn flip_vertical(self) -> bool {
        self.attr & 0x80 != 0
    }
}

/// PPU state: registers, scroll, palette, OAM, pixel pipeline and frame buffer.
pub struct PPU {
    control: Control,
    mask: Mask,
    status: Status,
    oam_addr: u8,
    /// Delayed $2007 read value.
    read_buffer: u8,
    /// Last value written to any register; read back from write-only ones.
    io_latch: u8,

    palette: [u8; 32],
    oam: [u8; OAM_LEN],

    v: Loopy,
    t: Loopy,
    fine_x: u8,
    write_toggle: bool,

    scanline: i16,
    cycle: u16,

    bg_next_tile: u8,
    bg_next_attr: u8,
    bg_next_lo: u8,
    bg_next_hi: u8,
    bg_pattern_lo: u16,
    bg_pattern_hi: u16,
    bg_attr_lo: u16,
    bg_attr_hi: u16,

    sprite_limit: usize,
    sprites: [Sprite; MAX_SPRITES],
    sprite_count: usize,
    sprite_pattern_lo: [u8; MAX_SPRITES],
    sprite_pattern_hi: [u8; MAX_SPRITES],
    /// Sprite 0 sits in slot 0 of the line being drawn.
    sprite_zero_on_line: bool,

    nmi_pending: bool,
    frame_complete: bool,
    frame_count: u64,
    frame: Frame,
}

/// PPU registers and memories captured for save states. The frame buffer is not saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PpuState {
    control: u8,
    mask: u8,
    status: u8,
    oam_addr: u8,
    read_buffer: u8,
    io_latch: u8,
    palette: Vec<u8>,
    oam: Vec<u8>,
    v: u16,
    t: u16,
    fine_x: u8,
    write_toggle: bool,
    scanline: i16,
    cycle: u16,
    bg_next: [u8; 4],
    bg_shifters: [u16; 4],
    sprites: Vec<Sprite>,
    sprite_pattern_lo: Vec<u8>,
    sprite_pattern_hi: Vec<u8>,
    sprite_zero_on_line: bool,
    nmi_pending: bool,
    frame_count: u64,
}

impl Default for PPU {
    fn default() -> Self {
        Self::new(SpriteLimit::default())
    }
}

impl PPU {
    /// Create PPU in initial state (pre-render scanline -1, cycle 0).
    pub fn new(sprite_limit: SpriteLimit) -> Self {
        Self {
            control: Control::empty(),
            mask: Mask::empty(),
            status: Status::empty(),
            oam_addr: 0,
            read_buffer: 0,
            io_latch: 0,
            palette: [0; 32],
            oam: [0; OAM_LEN],
            v: Loopy::default(),
            t: Loopy::default(),
            fine_x: 0,
            write_toggle: false,
            scanline: -1,
            cycle: 0,
            bg_next_tile: 0,
            bg_next_attr: 0,
            bg_next_lo: 0,
            bg_next_hi: 0,
            bg_pattern_lo: 0,
            bg_pattern_hi: 0,
            bg_attr_lo: 0,
            bg_attr_hi: 0,
            sprite_limit: sprite_limit.max_sprites(),
            sprites: [Sprite::default(); MAX_SPRITES],
            sprite_count: 0,
            sprite_pattern_lo: [0; MAX_SPRITES],
            sprite_pattern_hi: [0; MAX_SPRITES],
            sprite_zero_on_line: false,
            nmi_pending: false,
            frame_complete: false,
            frame_count: 0,
            frame: Frame::new(),
        }
    }

    /// Reset registers and timing. Palette, OAM and the frame buffer keep their contents.
    pub fn reset(&mut self) {
        self.control = Control::empty();
        self.mask = Mask::empty();
        self.status = Status::empty();
        self.oam_addr = 0;
        self.read_buffer = 0;
        self.io_latch = 0;
        self.v = Loopy::default();
        self.t = Loopy::default();
        self.fine_x = 0;
        self.write_toggle = false;
        self.scanline = -1;
        self.cycle = 0;
        self.bg_next_tile = 0;
        self.bg_next_attr = 0;
        self.bg_next_lo = 0;
        self.bg_next_hi = 0;
        self.bg_pattern_lo = 0;
        self.bg_pattern_hi = 0;
        self.bg_attr_lo = 0;
        self.bg_attr_hi = 0;
        self.sprite_count = 0;
        self.sprite_zero_on_line = false;
        self.nmi_pending = false;
        self.frame_complete = false;
    }

    /// Power-on state: reset plus cleared palette, OAM and frame.
    pub fn power_up(&mut self) {
        self.reset();
        self.palette = [0; 32];
        self.oam = [0; OAM_LEN];
        self.frame = Frame::new();
        self.frame_count = 0;
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// True only for the dot on which line 260 wrapped to the pre-render line.
    pub fn is_frame_complete(&self) -> bool {
        self.frame_complete
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn scanline(&self) -> i16 {
        self.scanline
    }

    pub fn cycle(&self) -> u16 {
        self.cycle
    }

    pub fn oam(&self) -> &[u8; OAM_LEN] {
        &self.oam
    }

    /// Consume a pending NMI request.
    pub fn take_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi_pending)
    }

    /// Advance one dot.
    pub fn clock(&mut self, bus: &mut impl PpuBus) {
        self.frame_complete = false;

        if (-1..240).contains(&self.scanline) {
            self.render_dot(bus);
        }

        if self.scanline == 241 && self.cycle == 1 {
            self.status.insert(Status::VBLANK);
            if self.control.contains(Control::ENABLE_NMI) {
                self.nmi_pending = true;
            }
        }

        if (0..240).contains(&self.scanline) && (1..=256).contains(&self.cycle) {
            self.output_pixel();
        }

        self.cycle += 1;
        if self.cycle > 340 {
            self.cycle = 0;
            self.scanline += 1;
            if self.scanline > 260 {
                self.scanline = -1;
                self.frame_complete = true;
                self.frame_count += 1;
            }
        }
    }

    /// Fetch and scroll work for the pre-render and visible lines.
    fn render_dot(&mut self, bus: &mut impl PpuBus) {
        let rendering = self.mask.rendering_enabled();

        if self.scanline == -1 && self.cycle == 1 {
            self.status
                .remove(Status::VBLANK | Status::SPRITE_ZERO_HIT | Status::SPRITE_OVERFLOW);
            self.sprite_count = 0;
            self.sprite_pattern_lo = [0; MAX_SPRITES];
            self.sprite_pattern_hi = [0; MAX_SPRITES];
        }

        if !rendering {
            return;
        }

        if (2..=257).contains(&self.cycle) || (321..=337).contains(&self.cycle) {
            self.update_shifters();
            match (self.cycle - 1) % 8 {
                0 => {
                    self.load_background_shifters();
                    self.bg_next_tile = bus.ppu_read(self.v.tile_addr());
                }
                2 => {
                    let mut attr = bus.ppu_read(self.v.attribute_addr());
                    if self.v.coarse_y() & 0x02 != 0 {
                        attr >>= 4;
                    }
                    if self.v.coarse_x() & 0x02 != 0 {
                        attr >>= 2;
                    }
                    self.bg_next_attr = attr & 0x03;
                }
                4 => self.bg_next_lo = bus.ppu_read(self.background_row_addr()),
                6 => self.bg_next_hi = bus.ppu_read(self.background_row_addr() + 8),
                7 => self.v.increment_x(),
                _ => {}
            }
        }

        match self.cycle {
            256 => self.v.increment_y(),
            257 => {
                self.load_background_shifters();
                self.v.transfer_horizontal(self.t);
                if self.scanline >= 0 {
                    self.evaluate_sprites();
                }
            }
            260 => bus.scanline(),
            280..=304 if self.scanline == -1 => self.v.transfer_vertical(self.t),
            338 => self.bg_next_tile = bus.ppu_read(self.v.tile_addr()),
            340 => {
                self.bg_next_tile = bus.ppu_read(self.v.tile_addr());
                self.fetch_sprite_patterns(bus);
            }
            _ => {}
        }
    }

    fn background_row_addr(&self) -> u16 {
        self.control.background_pattern_addr() + ((self.bg_next_tile as u16) << 4) + self.v.fine_y()
    }

    fn load_background_shifters(&mut self) {
        self.bg_pattern_lo = (self.bg_pattern_lo & 0xFF00) | self.bg_next_lo as u16;
        self.bg_pattern_hi = (self.bg_pattern_hi & 0xFF00) | self.bg_next_hi as u16;
        let fill = |bit: u8| if self.bg_next_attr & bit != 0 { 0xFF } else { 0x00 };
        self.bg_attr_lo = (self.bg_attr_lo & 0xFF00) | fill(0x01);
        self.bg_attr_hi = (self.bg_attr_hi & 0xFF00) | fill(0x02);
    }

    fn update_shifters(&mut self) {
        if self.mask.contains(Mask::SHOW_BACKGROUND) {
            self.bg_pattern_lo <<= 1;
            self.bg_pattern_hi <<= 1;
            self.bg_attr_lo <<= 1;
            self.bg_attr_hi <<= 1;
        }

        if self.mask.contains(Mask::SHOW_SPRITES) && self.cycle <= 257 {
            for i in 0..self.sprite_count {
                let sprite = &mut self.sprites[i];
                if sprite.x > 0 {
                    sprite.x -= 1;
                } else {
                    self.sprite_pattern_lo[i] <<= 1;
                    self.sprite_pattern_hi[i] <<= 1;
                }
            }
        }
    }

    /// Fill secondary OAM with the sprites that cover the next line.
    fn evaluate_sprites(&mut self) {
        self.sprite_count = 0;
        self.sprite_pattern_lo = [0; MAX_SPRITES];
        self.sprite_pattern_hi = [0; MAX_SPRITES];
        self.sprite_zero_on_line = false;

        let height = self.control.sprite_height() as i16;
        let mut found = 0;
        for (index, entry) in self.oam.chunks_exact(4).enumerate() {
            let row = self.scanline - entry[0] as i16;
            if !(0..height).contains(&row) {
                continue;
            }
            found += 1;
            if found > HARDWARE_SPRITES {
                self.status.insert(Status::SPRITE_OVERFLOW);
            }
            if self.sprite_count == self.sprite_limit {
                break;
            }
            if index == 0 {
                self.sprite_zero_on_line = true;
            }
            self.sprites[self.sprite_count] = Sprite::from_oam(entry);
            self.sprite_count += 1;
        }
    }

    fn fetch_sprite_patterns(&mut self, bus: &mut impl PpuBus) {
        let height = self.control.sprite_height() as u16;
        for i in 0..self.sprite_count {
            let sprite = self.sprites[i];
            let mut row = (self.scanline - sprite.y as i16) as u16 & (height - 1);
            if sprite.flip_vertical() {
                row = height - 1 - row;
            }

            let addr = if height == 8 {
                self.control.sprite_pattern_addr() | ((sprite.tile as u16) << 4) | row
            } else {
                // 8x16: bit 0 picks the table, the top tile is even, the bottom tile follows it.
                let table = ((sprite.tile & 0x01) as u16) << 12;
                let tile = (sprite.tile & 0xFE) as u16 + (row >> 3);
                table | (tile << 4) | (row & 0x07)
            };

            let mut lo = bus.ppu_read(addr);
            let mut hi = bus.ppu_read(addr + 8);
            if sprite.flip_horizontal() {
                lo = lo.reverse_bits();
                hi = hi.reverse_bits();
            }
            self.sprite_pattern_lo[i] = lo;
            self.sprite_pattern_hi[i] = hi;
        }
    }

    /// Compose background and sprites for the dot and write it to the frame.
    fn output_pixel(&mut self) {
        let x = self.cycle - 1;
        let left_edge = x < 8;

        let mut bg_pixel = 0;
        let mut bg_palette = 0;
        if self.mask.contains(Mask::SHOW_BACKGROUND)
            && (!left_edge || self.mask.contains(Mask::SHOW_BACKGROUND_LEFT))
        {
            let bit = 0x8000 >> self.fine_x;
            let plane = |shifter: u16| (shifter & bit != 0) as u8;
            bg_pixel = (plane(self.bg_pattern_hi) << 1) | plane(self.bg_pattern_lo);
            bg_palette = (plane(self.bg_attr_hi) << 1) | plane(self.bg_attr_lo);
        }

        let mut fg_pixel = 0;
        let mut fg_palette = 0;
        let mut fg_in_front = false;
        let mut sprite_zero = false;
        if self.mask.contains(Mask::SHOW_SPRITES)
            && (!left_edge || self.mask.contains(Mask::SHOW_SPRITES_LEFT))
        {
            for i in 0..self.sprite_count {
                let sprite = self.sprites[i];
                if sprite.x != 0 {
                    continue;
                }
                let lo = self.sprite_pattern_lo[i] >> 7;
                let hi = self.sprite_pattern_hi[i] >> 7;
                let pixel = (hi << 1) | lo;
                if pixel != 0 {
                    fg_pixel = pixel;
                    fg_palette = sprite.palette();
                    fg_in_front = sprite.in_front();
                    sprite_zero = i == 0 && self.sprite_zero_on_line;
                    break;
                }
            }
        }

        let (pixel, palette) = match (bg_pixel, fg_pixel) {
            (0, 0) => (0, 0),
            (0, _) => (fg_pixel, fg_palette),
            (_, 0) => (bg_pixel, bg_palette),
            _ => {
                if sprite_zero && x != 255 {
                    self.status.insert(Status::SPRITE_ZERO_HIT);
                }
                if fg_in_front {
                    (fg_pixel, fg_palette)
                } else {
                    (bg_pixel, bg_palette)
                }
            }
        };

        let color = self.palette_color(palette, pixel);
        self.frame
            .set_pixel(x as usize, self.scanline as usize, color);
    }

    /// Resolve a palette number (0-3 background, 4-7 sprite) and 2-bit pixel to a color.
    pub fn palette_color(&self, palette: u8, pixel: u8) -> Pixel {
        let addr = 0x3F00 + ((palette as u16) << 2) + pixel as u16;
        let mut index = self.palette[palette_index(addr)];
        if self.mask.contains(Mask::GREYSCALE) {
            index &= 0x30;
        }
        Pixel::from_palette(index)
    }

    /// CPU read of $2000–$2007 (`addr` already reduced by the bus).
    pub fn cpu_read(&mut self, addr: u16, bus: &mut impl PpuBus) -> u8 {
        let data = match addr & 0x0007 {
            2 => {
                let data = (self.status.bits() & 0xE0) | (self.io_latch & 0x1F);
                self.status.remove(Status::VBLANK);
                self.write_toggle = false;
                data
            }
            4 => self.oam[self.oam_addr as usize],
            7 => self.read_data(bus),
            _ => return self.io_latch,
        };
        self.io_latch = data;
        data
    }

    /// CPU write of $2000–$2007.
    pub fn cpu_write(&mut self, addr: u16, data: u8, bus: &mut impl PpuBus) {
        self.io_latch = data;
        match addr & 0x0007 {
            0 => {
                let was_enabled = self.control.contains(Control::ENABLE_NMI);
                self.control = Control::from_bits_retain(data);
                self.t.set_nametable_x(data as u16);
                self.t.set_nametable_y((data >> 1) as u16);
                if !was_enabled
                    && self.control.contains(Control::ENABLE_NMI)
                    && self.status.contains(Status::VBLANK)
                {
                    self.nmi_pending = true;
                }
            }
            1 => self.mask = Mask::from_bits_retain(data),
            2 => {}
            3 => self.oam_addr = data,
            4 => {
                self.oam[self.oam_addr as usize] = data;
                self.oam_addr = self.oam_addr.wrapping_add(1);
            }
            5 => {
                if !self.write_toggle {
                    self.fine_x = data & 0x07;
                    self.t.set_coarse_x((data >> 3) as u16);
                } else {
                    self.t.set_fine_y(data as u16);
                    self.t.set_coarse_y((data >> 3) as u16);
                }
                self.write_toggle = !self.write_toggle;
            }
            6 => {
                if !self.write_toggle {
                    self.t.0 = (self.t.0 & 0x00FF) | (((data & 0x3F) as u16) << 8);
                } else {
                    self.t.0 = (self.t.0 & 0xFF00) | data as u16;
                    self.v = self.t;
                }
                self.write_toggle = !self.write_toggle;
            }
            _ => self.write_data(data, bus),
        }
    }

    /// Copy a 256-byte page into OAM starting at OAMADDR, wrapping.
    pub fn write_oam_dma(&mut self, page: &[u8; OAM_LEN]) {
        for &byte in page {
            self.oam[self.oam_addr as usize] = byte;
            self.oam_addr = self.oam_addr.wrapping_add(1);
        }
    }

    /// PPUDATA read. Below the palette the value comes from the read buffer; palette reads are
    /// immediate and refill the buffer with the nametable byte underneath.
    fn read_data(&mut self, bus: &mut impl PpuBus) -> u8 {
        let addr = self.v.0 & 0x3FFF;
        let data = if addr >= 0x3F00 {
            self.read_buffer = bus.ppu_read(addr - 0x1000);
            self.palette[palette_index(addr)]
        } else {
            let data = self.read_buffer;
            self.read_buffer = bus.ppu_read(addr);
            data
        };
        self.increment_vram_addr();
        data
    }

    fn write_data(&mut self, data: u8, bus: &mut impl PpuBus) {
        let addr = self.v.0 & 0x3FFF;
        if addr >= 0x3F00 {
            self.palette[palette_index(addr)] = data & 0x3F;
        } else {
            bus.ppu_write(addr, data);
        }
        self.increment_vram_addr();
    }

    fn increment_vram_addr(&mut self) {
        self.v.0 = (self.v.0 + self.control.increment()) & 0x7FFF;
    }

    pub fn save_state(&self) -> PpuState {
        PpuState {
            control: self.control.bits(),
            mask: self.mask.bits(),
            status: self.status.bits(),
            oam_addr: self.oam_addr,
            read_buffer: self.read_buffer,
            io_latch: self.io_latch,
            palette: self.palette.to_vec(),
            oam: self.oam.to_vec(),
            v: self.v.0,
            t: self.t.0,
            fine_x: self.fine_x,
            write_toggle: self.write_toggle,
            scanline: self.scanline,
            cycle: self.cycle,
            bg_next: [
                self.bg_next_tile,
                self.bg_next_attr,
                self.bg_next_lo,
                self.bg_next_hi,
            ],
            bg_shifters: [
                self.bg_pattern_lo,
                self.bg_pattern_hi,
                self.bg_attr_lo,
                self.bg_attr_hi,
            ],
            sprites: self.sprites[..self.sprite_count].to_vec(),
            sprite_pattern_lo: self.sprite_pattern_lo[..self.sprite_count].to_vec(),
            sprite_pattern_hi: self.sprite_pattern_hi[..self.sprite_count].to_vec(),
            sprite_zero_on_line: self.sprite_zero_on_line,
            nmi_pending: self.nmi_pending,
            frame_count: self.frame_count,
        }
    }

    pub fn load_state(&mut self, state: &PpuState) -> Result<(), StateError> {
        let count = state.sprites.len();
        if count > self.sprite_limit
            || state.sprite_pattern_lo.len() != count
            || state.sprite_pattern_hi.len() != count
        {
            return Err(StateError::Corrupt("PPU sprite slots"));
        }
        if state.scanline < -1 || state.scanline > 260 || state.cycle > 340 {
            return Err(StateError::Corrupt("PPU position"));
        }
        restore_block(&mut self.palette, &state.palette, "PPU palette size")?;
        restore_block(&mut self.oam, &state.oam, "OAM size")?;

        self.control = Control::from_bits_retain(state.control);
        self.mask = Mask::from_bits_retain(state.mask);
        self.status = Status::from_bits_retain(state.status);
        self.oam_addr = state.oam_addr;
        self.read_buffer = state.read_buffer;
        self.io_latch = state.io_latch;
        self.v = Loopy(state.v);
        self.t = Loopy(state.t);
        self.fine_x = state.fine_x;
        self.write_toggle = state.write_toggle;
        self.scanline = state.scanline;
        self.cycle = state.cycle;
        [
            self.bg_next_tile,
            self.bg_next_attr,
            self.bg_next_lo,
            self.bg_next_hi,
        ] = state.bg_next;
        [
            self.bg_pattern_lo,
            self.bg_pattern_hi,
            self.bg_attr_lo,
            self.bg_attr_hi,
        ] = state.bg_shifters;
        self.sprite_count = count;
        self.sprites[..count].copy_from_slice(&state.sprites);
        self.sprite_pattern_lo[..count].copy_from_slice(&state.sprite_pattern_lo);
        self.sprite_pattern_hi[..count].copy_from_slice(&state.sprite_pattern_hi);
        self.sprite_zero_on_line = state.sprite_zero_on_line;
        self.nmi_pending = state.nmi_pending;
        self.frame_count = state.frame_count;
        self.frame_complete = false;
        Ok(())
    }
}

/// Palette RAM index for $3F00–$3FFF. $3F10/$3F14/$3F18/$3F1C mirror $3F00/$3F04/$3F08/$3F0C.
fn palette_index(addr: u16) -> usize {
    let index = (addr & 0x1F) as usize;
    if index & 0x13 == 0x10 { index & 0x0F } else { index }
}
