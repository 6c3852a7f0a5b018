//! Mapper 4 (MMC3): bank switching, switchable mirroring, PRG RAM, scanline IRQ.
//!
//! [MMC3](https://www.nesdev.org/wiki/MMC3): Bank select at $8000–$9FFE (even), bank data at
//! $8001–$9FFF (odd). R0/R1 = 2 KiB CHR, R2–R5 = 1 KiB CHR, R6/R7 = 8 KiB PRG. Mirroring at
//! $A000–$BFFE (even). IRQ latch $C000, reload $C001, disable $E000, enable $E001. The IRQ counter
//! is clocked once per rendered scanline through [`Mapper::scanline`].

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::cartridge::Cartridge;
use crate::cartridge::mapper::{
    MapperState, Mirroring, PRG_RAM_SIZE, bank_index, mapper::Mapper, restore_block, restore_chr,
    saved_chr,
};
use crate::error::StateError;

/// MMC3 state: bank registers, mirroring, PRG RAM, IRQ counter/latch/enable.
pub struct Mapper4 {
    cart: Cartridge,
    prg_ram: Vec<u8>,
    /// Bank select ($8000): bits 0–2 = register index, bit 6 = PRG mode, bit 7 = CHR A12 invert.
    bank_select: u8,
    /// R0–R5 CHR, R6–R7 PRG.
    regs: [u8; 8],
    mirroring: Mirroring,
    /// $A001. Stored but not enforced, for MMC6 compatibility.
    prg_ram_protect: u8,
    irq_latch: u8,
    irq_counter: u8,
    irq_enabled: bool,
    irq_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mapper4State {
    prg_ram: Vec<u8>,
    chr_ram: Vec<u8>,
    bank_select: u8,
    regs: [u8; 8],
    mirroring: Mirroring,
    prg_ram_protect: u8,
    irq_latch: u8,
    irq_counter: u8,
    irq_enabled: bool,
    irq_active: bool,
}

impl Mapper4 {
    pub fn new(cart: Cartridge) -> Self {
        let mirroring = cart.mirroring;
        Self {
            cart,
            prg_ram: vec![0; PRG_RAM_SIZE],
            bank_select: 0,
            regs: [0; 8],
            mirroring,
            prg_ram_protect: 0,
            irq_latch: 0,
            irq_counter: 0,
            irq_enabled: false,
            irq_active: false,
        }
    }

    /// Number of 8 KiB PRG banks.
    fn prg_bank_count(&self) -> usize {
        self.cart.prg_banks as usize * 2
    }

    fn prg_offset(&self, addr: u16) -> usize {
        let last = self.prg_bank_count() - 1;
        let second_last = last.saturating_sub(1);
        let r6 = self.regs[6] as usize;
        let r7 = self.regs[7] as usize;
        let swap = self.bank_select & 0x40 != 0;

        let bank = match addr {
            0x8000..=0x9FFF if swap => second_last,
            0x8000..=0x9FFF => r6,
            0xA000..=0xBFFF => r7,
            0xC000..=0xDFFF if swap => r6,
            0xC000..=0xDFFF => second_last,
            _ => last,
        };
        bank_index(&self.cart.prg_rom, bank, 0x2000, (addr & 0x1FFF) as usize)
    }

    /// With bit 7 clear: two 2 KiB banks at $0000–$0FFF, four 1 KiB at $1000–$1FFF. Bit 7 swaps
    /// the halves.
    fn chr_offset(&self, addr: u16) -> usize {
        let addr = if self.bank_select & 0x80 != 0 {
            addr ^ 0x1000
        } else {
            addr
        };
        let bank = match addr {
            0x0000..=0x03FF => self.regs[0] & 0xFE,
            0x0400..=0x07FF => self.regs[0] | 0x01,
            0x0800..=0x0BFF => self.regs[1] & 0xFE,
            0x0C00..=0x0FFF => self.regs[1] | 0x01,
            0x1000..=0x13FF => self.regs[2],
            0x1400..=0x17FF => self.regs[3],
            0x1800..=0x1BFF => self.regs[4],
            _ => self.regs[5],
        };
        bank_index(
            &self.cart.chr_rom,
            bank as usize,
            0x400,
            (addr & 0x03FF) as usize,
        )
    }
}

impl Mapper for Mapper4 {
    fn cpu_read(&mut self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr & 0x1FFF) as usize],
            0x8000..=0xFFFF => self.cart.prg_rom[self.prg_offset(addr)],
            _ => 0,
        }
    }

    fn cpu_write(&mut self, addr: u16, data: u8) {
        let even = addr & 1 == 0;
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr & 0x1FFF) as usize] = data,
            0x8000..=0x9FFF if even => self.bank_select = data,
            0x8000..=0x9FFF => {
                let r = (self.bank_select & 0x07) as usize;
                self.regs[r] = data;
                trace!(register = r, value = data, "MMC3 bank data");
            }
            0xA000..=0xBFFF if even => {
                self.mirroring = if data & 1 != 0 {
                    Mirroring::Horizontal
                } else {
                    Mirroring::Vertical
                };
            }
            0xA000..=0xBFFF => self.prg_ram_protect = data,
            0xC000..=0xDFFF if even => self.irq_latch = data,
            0xC000..=0xDFFF => self.irq_counter = 0,
            0xE000..=0xFFFF if even => {
                self.irq_enabled = false;
                self.irq_clear();
            }
            0xE000..=0xFFFF => self.irq_enabled = true,
            _ => {}
        }
    }

    fn ppu_read(&mut self, addr: u16) -> u8 {
        if self.cart.has_chr_ram() {
            return self.cart.chr_rom[addr as usize];
        }
        self.cart.chr_rom[self.chr_offset(addr)]
    }

    fn ppu_write(&mut self, addr: u16, data: u8) {
        assert!(
            self.cart.has_chr_ram(),
            "MMC3 CHR ROM is read-only: write ${data:02X} to ${addr:04X}"
        );
        self.cart.chr_rom[addr as usize] = data;
    }

    fn reset(&mut self) {
        self.bank_select = 0;
        self.regs = [0; 8];
        self.mirroring = self.cart.mirroring;
        self.prg_ram_protect = 0;
        self.irq_latch = 0;
        self.irq_counter = 0;
        self.irq_enabled = false;
        self.irq_active = false;
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn irq_state(&self) -> bool {
        self.irq_active
    }

    fn irq_clear(&mut self) {
        self.irq_active = false;
    }

    fn scanline(&mut self) {
        if self.irq_counter == 0 {
            self.irq_counter = self.irq_latch;
        } else {
            self.irq_counter -= 1;
        }
        if self.irq_counter == 0 && self.irq_enabled {
            self.irq_active = true;
            trace!("MMC3 IRQ asserted");
        }
    }

    fn prg_ram(&self) -> &[u8] {
        &self.prg_ram
    }

    fn prg_ram_mut(&mut self) -> &mut [u8] {
        &mut self.prg_ram
    }

    fn save_state(&self) -> MapperState {
        MapperState::Mmc3(Mapper4State {
            prg_ram: self.prg_ram.clone(),
            chr_ram: saved_chr(&self.cart),
            bank_select: self.bank_select,
            regs: self.regs,
            mirroring: self.mirroring,
            prg_ram_protect: self.prg_ram_protect,
            irq_latch: self.irq_latch,
            irq_counter: self.irq_counter,
            irq_enabled: self.irq_enabled,
            irq_active: self.irq_active,
        })
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), StateError> {
        let MapperState::Mmc3(state) = state else {
            return Err(StateError::Corrupt("mapper state is not MMC3"));
        };
        restore_block(&mut self.prg_ram, &state.prg_ram, "PRG RAM size")?;
        restore_chr(&mut self.cart, &state.chr_ram)?;
        self.bank_select = state.bank_select;
        self.regs = state.regs;
        self.mirroring = state.mirroring;
        self.prg_ram_protect = state.prg_ram_protect;
        self.irq_latch = state.irq_latch;
        self.irq_counter = state.irq_counter;
        self.irq_enabled = state.irq_enabled;
        self.irq_active = state.irq_active;
        Ok(())
    }
}
