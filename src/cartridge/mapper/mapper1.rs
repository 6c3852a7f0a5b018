//! Mapper 1 (MMC1): bank switching via 5-bit shift register.
//!
//! [MMC1](https://www.nesdev.org/wiki/MMC1): writes to $8000–$9FFF (control), $A000–$BFFF (CHR0),
//! $C000–$DFFF (CHR1), $E000–$FFFF (PRG bank). Any write with bit 7 set resets the shift register
//! and sets control bits 2–3 (PRG mode 3). Otherwise, bit 0 is shifted in (LSB first); after 5
//! writes, the value is latched to the register selected by address bits 13–14. Control bits 0–1 =
//! mirroring; bits 2–3 = PRG mode; bit 4 = CHR mode.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::cartridge::Cartridge;
use crate::cartridge::mapper::{
    MapperState, Mirroring, PRG_RAM_SIZE, bank_index, mapper::Mapper, restore_block, restore_chr,
    saved_chr,
};
use crate::error::StateError;

const CONTROL_POWER_UP: u8 = 0x1C;

/// MMC1 state: 5-bit shift register, control byte (mirroring + PRG/CHR mode), bank selects.
pub struct Mapper1 {
    cart: Cartridge,
    prg_ram: Vec<u8>,
    shift_reg: u8,
    shift_count: u8,
    control: u8,
    chr_bank0: u8,
    chr_bank1: u8,
    prg_bank: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mapper1State {
    prg_ram: Vec<u8>,
    chr_ram: Vec<u8>,
    shift_reg: u8,
    shift_count: u8,
    control: u8,
    chr_bank0: u8,
    chr_bank1: u8,
    prg_bank: u8,
}

impl Mapper1 {
    pub fn new(cart: Cartridge) -> Self {
        Self {
            cart,
            prg_ram: vec![0; PRG_RAM_SIZE],
            shift_reg: 0,
            shift_count: 0,
            control: CONTROL_POWER_UP,
            chr_bank0: 0,
            chr_bank1: 0,
            prg_bank: 0,
        }
    }

    /// PRG bank mode from control bits 2–3: 0/1 = 32 KiB mode; 2 = $8000 fixed first, $C000 switchable; 3 = $8000 switchable, $C000 fixed last.
    fn prg_bank_mode(&self) -> u8 {
        (self.control >> 2) & 0b11
    }

    /// CHR mode from control bit 4: false = one 8 KiB bank, true = two 4 KiB banks.
    fn chr_4k_mode(&self) -> bool {
        self.control & 0x10 != 0
    }

    fn prg_offset(&self, addr: u16) -> usize {
        let prg = &self.cart.prg_rom;
        let bank = (self.prg_bank & 0x0F) as usize;
        let last = self.cart.prg_banks as usize - 1;
        match (self.prg_bank_mode(), addr) {
            // 32 KiB mode ignores bit 0 of the bank number.
            (0 | 1, _) => {
                let half = ((addr >> 14) & 1) as usize;
                bank_index(prg, (bank & !1) | half, 0x4000, (addr & 0x3FFF) as usize)
            }
            (2, 0x8000..=0xBFFF) => bank_index(prg, 0, 0x4000, (addr & 0x3FFF) as usize),
            (2, _) => bank_index(prg, bank, 0x4000, (addr & 0x3FFF) as usize),
            (_, 0x8000..=0xBFFF) => bank_index(prg, bank, 0x4000, (addr & 0x3FFF) as usize),
            (_, _) => bank_index(prg, last, 0x4000, (addr & 0x3FFF) as usize),
        }
    }

    fn chr_offset(&self, addr: u16) -> usize {
        let chr = &self.cart.chr_rom;
        if self.cart.has_chr_ram() {
            return addr as usize;
        }
        if self.chr_4k_mode() {
            let bank = if addr < 0x1000 { self.chr_bank0 } else { self.chr_bank1 };
            bank_index(chr, bank as usize, 0x1000, (addr & 0x0FFF) as usize)
        } else {
            bank_index(chr, (self.chr_bank0 >> 1) as usize, 0x2000, addr as usize)
        }
    }

    /// Commit the 5 shifted bits to the register selected by address bits 13–14.
    fn commit(&mut self, addr: u16, value: u8) {
        match (addr >> 13) & 0b11 {
            0 => self.control = value,
            1 => self.chr_bank0 = value,
            2 => self.chr_bank1 = value,
            _ => self.prg_bank = value,
        }
        trace!("MMC1 register write {value:#04X} to {addr:#06X}");
    }
}

impl Mapper for Mapper1 {
    fn cpu_read(&mut self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr & 0x1FFF) as usize],
            0x8000..=0xFFFF => self.cart.prg_rom[self.prg_offset(addr)],
            _ => 0,
        }
    }

    fn cpu_write(&mut self, addr: u16, data: u8) {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr & 0x1FFF) as usize] = data,
            0x8000..=0xFFFF => {
                if data & 0x80 != 0 {
                    self.shift_reg = 0;
                    self.shift_count = 0;
                    self.control |= 0x0C;
                    return;
                }
                self.shift_reg = (self.shift_reg >> 1) | ((data & 1) << 4);
                self.shift_count += 1;
                if self.shift_count == 5 {
                    let value = self.shift_reg & 0x1F;
                    self.commit(addr, value);
                    self.shift_reg = 0;
                    self.shift_count = 0;
                }
            }
            _ => {}
        }
    }

    fn ppu_read(&mut self, addr: u16) -> u8 {
        self.cart.chr_rom[self.chr_offset(addr)]
    }

    fn ppu_write(&mut self, addr: u16, data: u8) {
        assert!(
            self.cart.has_chr_ram(),
            "MMC1 CHR ROM is read-only: write ${data:02X} to ${addr:04X}"
        );
        self.cart.chr_rom[addr as usize] = data;
    }

    fn reset(&mut self) {
        self.shift_reg = 0;
        self.shift_count = 0;
        self.control = CONTROL_POWER_UP;
        self.chr_bank0 = 0;
        self.chr_bank1 = 0;
        self.prg_bank = 0;
    }

    fn mirroring(&self) -> Mirroring {
        match self.control & 0b11 {
            0 => Mirroring::OneScreenLo,
            1 => Mirroring::OneScreenHi,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }

    fn prg_ram(&self) -> &[u8] {
        &self.prg_ram
    }

    fn prg_ram_mut(&mut self) -> &mut [u8] {
        &mut self.prg_ram
    }

    fn save_state(&self) -> MapperState {
        MapperState::Mmc1(Mapper1State {
            prg_ram: self.prg_ram.clone(),
            chr_ram: saved_chr(&self.cart),
            shift_reg: self.shift_reg,
            shift_count: self.shift_count,
            control: self.control,
            chr_bank0: self.chr_bank0,
            chr_bank1: self.chr_bank1,
            prg_bank: self.prg_bank,
        })
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), StateError> {
        let MapperState::Mmc1(state) = state else {
            return Err(StateError::Corrupt("mapper state is not MMC1"));
        };
        restore_block(&mut self.prg_ram, &state.prg_ram, "PRG RAM size")?;
        restore_chr(&mut self.cart, &state.chr_ram)?;
        self.shift_reg = state.shift_reg;
        self.shift_count = state.shift_count;
        self.control = state.control;
        self.chr_bank0 = state.chr_bank0;
        self.chr_bank1 = state.chr_bank1;
        self.prg_bank = state.prg_bank;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::mapper::test_util::numbered_cartridge;

    /// Shift `value` in LSB first over five writes to `addr`.
    fn load(mapper: &mut Mapper1, addr: u16, value: u8) {
        for bit in 0..5 {
            mapper.cpu_write(addr, (value >> bit) & 1);
        }
    }

    #[test]
    fn five_writes_update_only_the_selected_register() {
        let mut mapper = Mapper1::new(numbered_cartridge(1, 8, 4));

        load(&mut mapper, 0xA000, 0b10101);
        assert_eq!(mapper.chr_bank0, 0b10101);
        assert_eq!(mapper.control, CONTROL_POWER_UP);
        assert_eq!(mapper.chr_bank1, 0);
        assert_eq!(mapper.prg_bank, 0);

        load(&mut mapper, 0xDFFF, 0b00011);
        assert_eq!(mapper.chr_bank1, 0b00011);
        assert_eq!(mapper.prg_bank, 0);

        load(&mut mapper, 0xE000, 0b00110);
        assert_eq!(mapper.prg_bank, 0b00110);

        load(&mut mapper, 0x8000, 0b00010);
        assert_eq!(mapper.control, 0b00010);
        assert_eq!(mapper.mirroring(), Mirroring::Vertical);
    }

    #[test]
    fn reset_bit_forces_prg_mode_without_consuming_a_slot() {
        let mut mapper = Mapper1::new(numbered_cartridge(1, 8, 4));
        load(&mut mapper, 0x8000, 0b00000);
        assert_eq!(mapper.control, 0);

        mapper.cpu_write(0xE000, 1);
        mapper.cpu_write(0xE000, 1);
        mapper.cpu_write(0x8000, 0x80);
        assert_eq!(mapper.control & 0x0C, 0x0C);
        assert_eq!(mapper.shift_count, 0);

        load(&mut mapper, 0xE000, 0b00101);
        assert_eq!(mapper.prg_bank, 0b00101);
    }

    #[test]
    fn prg_modes_place_banks() {
        // 8 x 16 KiB banks; each 16 KiB bank n holds bytes 2n (low half) and 2n+1.
        let mut mapper = Mapper1::new(numbered_cartridge(1, 8, 4));
        load(&mut mapper, 0xE000, 3);

        // Mode 3 (power-up): switchable $8000, last bank fixed at $C000.
        assert_eq!(mapper.cpu_read(0x8000), 6);
        assert_eq!(mapper.cpu_read(0xC000), 14);

        // Mode 2: first bank fixed at $8000, switchable $C000.
        load(&mut mapper, 0x8000, 0b01000);
        assert_eq!(mapper.cpu_read(0x8000), 0);
        assert_eq!(mapper.cpu_read(0xC000), 6);

        // Mode 0: 32 KiB at bank >> 1.
        load(&mut mapper, 0x8000, 0b00000);
        assert_eq!(mapper.cpu_read(0x8000), 4);
        assert_eq!(mapper.cpu_read(0xC000), 6);
    }

    #[test]
    fn single_bank_cart_mirrors_in_32k_mode() {
        let mut mapper = Mapper1::new(numbered_cartridge(1, 1, 1));
        load(&mut mapper, 0x8000, 0b00000);
        assert_eq!(mapper.prg_bank_mode(), 0);

        assert_eq!(mapper.cpu_read(0x8000), 0);
        assert_eq!(mapper.cpu_read(0xA000), 1);
        assert_eq!(mapper.cpu_read(0xC000), 0);
        assert_eq!(mapper.cpu_read(0xFFFF), 1);
    }

    #[test]
    fn chr_4k_mode_switches_halves_independently() {
        let mut mapper = Mapper1::new(numbered_cartridge(1, 2, 4));
        load(&mut mapper, 0x8000, 0b11100);
        load(&mut mapper, 0xA000, 3);
        load(&mut mapper, 0xC000, 5);
        assert_eq!(mapper.ppu_read(0x0000), 12);
        assert_eq!(mapper.ppu_read(0x1000), 20);
    }
}
