//! Mapper 0 (NROM): no bank switching, 16/32KB PRG, 8KB CHR.

use serde::{Deserialize, Serialize};

use crate::cartridge::Cartridge;
use crate::cartridge::mapper::{
    MapperState, Mirroring, PRG_RAM_SIZE, mapper::Mapper, restore_block, restore_chr, saved_chr,
};
use crate::error::StateError;

/// NROM mapper: fixed PRG and CHR, 16KB PRG mirrored into both halves.
pub struct Mapper0 {
    cart: Cartridge,
    prg_ram: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mapper0State {
    prg_ram: Vec<u8>,
    chr_ram: Vec<u8>,
}

impl Mapper0 {
    pub fn new(cart: Cartridge) -> Self {
        Self {
            cart,
            prg_ram: vec![0; PRG_RAM_SIZE],
        }
    }

    fn prg_mask(&self) -> u16 {
        if self.cart.prg_banks > 1 { 0x7FFF } else { 0x3FFF }
    }
}

impl Mapper for Mapper0 {
    fn cpu_read(&mut self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr & 0x1FFF) as usize],
            // PRG ROM: $8000-$FFFF, mirror if 16KB
            0x8000..=0xFFFF => self.cart.prg_rom[(addr & self.prg_mask()) as usize],
            _ => 0,
        }
    }

    fn cpu_write(&mut self, addr: u16, data: u8) {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr & 0x1FFF) as usize] = data,
            0x8000..=0xFFFF => panic!("NROM PRG ROM is read-only: write ${data:02X} to ${addr:04X}"),
            _ => {}
        }
    }

    fn ppu_read(&mut self, addr: u16) -> u8 {
        self.cart.chr_rom[addr as usize]
    }

    fn ppu_write(&mut self, addr: u16, data: u8) {
        assert!(
            self.cart.has_chr_ram(),
            "NROM CHR ROM is read-only: write ${data:02X} to ${addr:04X}"
        );
        self.cart.chr_rom[addr as usize] = data;
    }

    fn reset(&mut self) {}

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
        MapperState::Nrom(Mapper0State {
            prg_ram: self.prg_ram.clone(),
            chr_ram: saved_chr(&self.cart),
        })
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), StateError> {
        let MapperState::Nrom(state) = state else {
            return Err(StateError::Corrupt("mapper state is not NROM"));
        };
        restore_block(&mut self.prg_ram, &state.prg_ram, "PRG RAM size")?;
        restore_chr(&mut self.cart, &state.chr_ram)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::mapper::test_util::numbered_cartridge;

    #[test]
    fn single_bank_mirrors_into_upper_half() {
        let mut mapper = Mapper0::new(numbered_cartridge(0, 1, 1));
        assert_eq!(mapper.cpu_read(0x8000), 0);
        assert_eq!(mapper.cpu_read(0xA000), 1);
        assert_eq!(mapper.cpu_read(0xC000), 0);
        assert_eq!(mapper.cpu_read(0xE000), 1);
    }

    #[test]
    fn two_banks_map_linearly() {
        let mut mapper = Mapper0::new(numbered_cartridge(0, 2, 1));
        assert_eq!(mapper.cpu_read(0x8000), 0);
        assert_eq!(mapper.cpu_read(0xC000), 2);
        assert_eq!(mapper.cpu_read(0xFFFF), 3);
    }

    #[test]
    #[should_panic(expected = "read-only")]
    fn prg_rom_write_panics() {
        let mut mapper = Mapper0::new(numbered_cartridge(0, 2, 1));
        mapper.cpu_write(0x9000, 0x55);
    }

    #[test]
    #[should_panic(expected = "CHR ROM is read-only")]
    fn chr_rom_write_panics() {
        let mut mapper = Mapper0::new(numbered_cartridge(0, 1, 1));
        mapper.ppu_write(0x0000, 0x55);
    }

    #[test]
    fn chr_ram_is_writable() {
        let mut mapper = Mapper0::new(numbered_cartridge(0, 1, 0));
        mapper.ppu_write(0x1234, 0xAB);
        assert_eq!(mapper.ppu_read(0x1234), 0xAB);
    }
}
