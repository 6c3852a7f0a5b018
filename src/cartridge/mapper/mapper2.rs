//! Mapper 2 (UxROM): switchable 16 KiB PRG bank at $8000, last bank fixed at $C000, CHR RAM.
//!
//! [UxROM](https://www.nesdev.org/wiki/UxROM): any write to $8000–$FFFF selects the low bank.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::cartridge::Cartridge;
use crate::cartridge::mapper::{
    MapperState, Mirroring, PRG_RAM_SIZE, bank_index, mapper::Mapper, restore_block, restore_chr,
    saved_chr,
};
use crate::error::StateError;

pub struct Mapper2 {
    cart: Cartridge,
    prg_ram: Vec<u8>,
    /// 16 KiB bank shown at $8000–$BFFF.
    bank_select: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mapper2State {
    prg_ram: Vec<u8>,
    chr_ram: Vec<u8>,
    bank_select: u8,
}

impl Mapper2 {
    pub fn new(cart: Cartridge) -> Self {
        Self {
            cart,
            prg_ram: vec![0; PRG_RAM_SIZE],
            bank_select: 0,
        }
    }
}

impl Mapper for Mapper2 {
    fn cpu_read(&mut self, addr: u16) -> u8 {
        let prg = &self.cart.prg_rom;
        let offset = (addr & 0x3FFF) as usize;
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr & 0x1FFF) as usize],
            0x8000..=0xBFFF => prg[bank_index(prg, self.bank_select as usize, 0x4000, offset)],
            0xC000..=0xFFFF => {
                let last = self.cart.prg_banks as usize - 1;
                prg[bank_index(prg, last, 0x4000, offset)]
            }
            _ => 0,
        }
    }

    fn cpu_write(&mut self, addr: u16, data: u8) {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr & 0x1FFF) as usize] = data,
            0x8000..=0xFFFF => {
                self.bank_select = data & 0x0F;
                trace!(bank = self.bank_select, "UxROM bank select");
            }
            _ => {}
        }
    }

    fn ppu_read(&mut self, addr: u16) -> u8 {
        self.cart.chr_rom[addr as usize]
    }

    fn ppu_write(&mut self, addr: u16, data: u8) {
        assert!(
            self.cart.has_chr_ram(),
            "UxROM CHR ROM is read-only: write ${data:02X} to ${addr:04X}"
        );
        self.cart.chr_rom[addr as usize] = data;
    }

    fn reset(&mut self) {
        self.bank_select = 0;
    }

    fn mirroring(&self) -> Mirroring {
        self.cart.mirroring
    }

    fn prg_ram(&self) -> &[u8] {
        &self.prg_ram
    }

    fn prg_ram_mut(&mut self) -> &mut [u8] {
        &mut self.prg_ram
    }

    fn save_state(&self) -> MapperState {
        MapperState::Uxrom(Mapper2State {
            prg_ram: self.prg_ram.clone(),
            chr_ram: saved_chr(&self.cart),
            bank_select: self.bank_select,
        })
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), StateError> {
        let MapperState::Uxrom(state) = state else {
            return Err(StateError::Corrupt("mapper state is not UxROM"));
        };
        restore_block(&mut self.prg_ram, &state.prg_ram, "PRG RAM size")?;
        restore_chr(&mut self.cart, &state.chr_ram)?;
        self.bank_select = state.bank_select;
        Ok(())
    }
}
