//! Mapper 3 (CNROM): fixed PRG like NROM, switchable 8 KiB CHR ROM bank.
//!
//! [CNROM](https://www.nesdev.org/wiki/INES_Mapper_003): writes to $8000–$FFFF select the CHR bank
//! (low 2 bits).

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::cartridge::Cartridge;
use crate::cartridge::mapper::{
    MapperState, Mirroring, PRG_RAM_SIZE, bank_index, mapper::Mapper, restore_block, restore_chr,
    saved_chr,
};
use crate::error::StateError;

pub struct Mapper3 {
    cart: Cartridge,
    prg_ram: Vec<u8>,
    /// 8 KiB CHR bank at $0000–$1FFF.
    chr_bank: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mapper3State {
    prg_ram: Vec<u8>,
    chr_ram: Vec<u8>,
    chr_bank: u8,
}

impl Mapper3 {
    pub fn new(cart: Cartridge) -> Self {
        Self {
            cart,
            prg_ram: vec![0; PRG_RAM_SIZE],
            chr_bank: 0,
        }
    }
}

impl Mapper for Mapper3 {
    fn cpu_read(&mut self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr & 0x1FFF) as usize],
            0x8000..=0xFFFF => {
                let mask = if self.cart.prg_banks > 1 { 0x7FFF } else { 0x3FFF };
                self.cart.prg_rom[(addr & mask) as usize]
            }
            _ => 0,
        }
    }

    fn cpu_write(&mut self, addr: u16, data: u8) {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr & 0x1FFF) as usize] = data,
            0x8000..=0xFFFF => {
                self.chr_bank = data & 0x03;
                trace!(bank = self.chr_bank, "CNROM CHR bank select");
            }
            _ => {}
        }
    }

    fn ppu_read(&mut self, addr: u16) -> u8 {
        let chr = &self.cart.chr_rom;
        chr[bank_index(chr, self.chr_bank as usize, 0x2000, addr as usize)]
    }

    fn ppu_write(&mut self, addr: u16, data: u8) {
        assert!(
            self.cart.has_chr_ram(),
            "CNROM CHR ROM is read-only: write ${data:02X} to ${addr:04X}"
        );
        self.cart.chr_rom[addr as usize] = data;
    }

    fn reset(&mut self) {
        self.chr_bank = 0;
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
        MapperState::Cnrom(Mapper3State {
            prg_ram: self.prg_ram.clone(),
            chr_ram: saved_chr(&self.cart),
            chr_bank: self.chr_bank,
        })
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), StateError> {
        let MapperState::Cnrom(state) = state else {
            return Err(StateError::Corrupt("mapper state is not CNROM"));
        };
        restore_block(&mut self.prg_ram, &state.prg_ram, "PRG RAM size")?;
        restore_chr(&mut self.cart, &state.chr_ram)?;
        self.chr_bank = state.chr_bank;
        Ok(())
    }
}
