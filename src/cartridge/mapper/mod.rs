//! NES mappers for PRG/CHR memory mapping.
//!
//! [`Board`] is the closed set of supported boards. It implements [`Mapper`] by matching on the
//! variant, so the bus owns a plain value instead of a trait object.

use serde::{Deserialize, Serialize};

use crate::cartridge::Cartridge;
use crate::error::{Error, Result, StateError};
pub(crate) use crate::state::restore_block;

pub mod mapper;

pub mod mapper0;
pub mod mapper1;
pub mod mapper2;
pub mod mapper3;
pub mod mapper4;

pub use mapper::Mapper;
use mapper0::{Mapper0, Mapper0State};
use mapper1::{Mapper1, Mapper1State};
use mapper2::{Mapper2, Mapper2State};
use mapper3::{Mapper3, Mapper3State};
use mapper4::{Mapper4, Mapper4State};

/// PRG RAM size at $6000–$7FFF.
pub const PRG_RAM_SIZE: usize = 8 * 1024;

/// Nametable mirroring mode for PPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mirroring {
    /// All four nametables show the first 1 KiB of VRAM.
    OneScreenLo,
    /// All four nametables show the second 1 KiB of VRAM.
    OneScreenHi,
    Vertical,
    Horizontal,
}

/// Supported cartridge boards.
pub enum Board {
    Nrom(Mapper0),
    Mmc1(Mapper1),
    Uxrom(Mapper2),
    Cnrom(Mapper3),
    Mmc3(Mapper4),
}

/// Mapper registers and RAM captured for a save state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MapperState {
    Nrom(Mapper0State),
    Mmc1(Mapper1State),
    Uxrom(Mapper2State),
    Cnrom(Mapper3State),
    Mmc3(Mapper4State),
}

macro_rules! dispatch {
    ($board:expr, $m:ident => $body:expr) => {
        match $board {
            Board::Nrom($m) => $body,
            Board::Mmc1($m) => $body,
            Board::Uxrom($m) => $body,
            Board::Cnrom($m) => $body,
            Board::Mmc3($m) => $body,
        }
    };
}

impl Board {
    /// Pick the board for `cartridge.mapper_num`.
    pub fn new(cartridge: Cartridge) -> Result<Self> {
        let board = match cartridge.mapper_num {
            0 => Board::Nrom(Mapper0::new(cartridge)),
            1 => Board::Mmc1(Mapper1::new(cartridge)),
            2 => Board::Uxrom(Mapper2::new(cartridge)),
            3 => Board::Cnrom(Mapper3::new(cartridge)),
            4 => Board::Mmc3(Mapper4::new(cartridge)),
            n => return Err(Error::UnsupportedMapper(n)),
        };
        Ok(board)
    }

    /// iNES mapper number of this board.
    pub fn mapper_num(&self) -> u8 {
        match self {
            Board::Nrom(_) => 0,
            Board::Mmc1(_) => 1,
            Board::Uxrom(_) => 2,
            Board::Cnrom(_) => 3,
            Board::Mmc3(_) => 4,
        }
    }
}

impl Mapper for Board {
    fn cpu_read(&mut self, addr: u16) -> u8 {
        dispatch!(self, m => m.cpu_read(addr))
    }

    fn cpu_write(&mut self, addr: u16, data: u8) {
        dispatch!(self, m => m.cpu_write(addr, data))
    }

    fn ppu_read(&mut self, addr: u16) -> u8 {
        dispatch!(self, m => m.ppu_read(addr))
    }

    fn ppu_write(&mut self, addr: u16, data: u8) {
        dispatch!(self, m => m.ppu_write(addr, data))
    }

    fn reset(&mut self) {
        dispatch!(self, m => m.reset())
    }

    fn mirroring(&self) -> Mirroring {
        dispatch!(self, m => m.mirroring())
    }

    fn irq_state(&self) -> bool {
        dispatch!(self, m => m.irq_state())
    }

    fn irq_clear(&mut self) {
        dispatch!(self, m => m.irq_clear())
    }

    fn scanline(&mut self) {
        dispatch!(self, m => m.scanline())
    }

    fn prg_ram(&self) -> &[u8] {
        dispatch!(self, m => m.prg_ram())
    }

    fn prg_ram_mut(&mut self) -> &mut [u8] {
        dispatch!(self, m => m.prg_ram_mut())
    }

    fn save_state(&self) -> MapperState {
        dispatch!(self, m => m.save_state())
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), StateError> {
        dispatch!(self, m => m.load_state(state))
    }
}

/// Index of `offset` inside bank `bank` of `size` bytes. The bank number is reduced modulo the
/// banks present (the unused high address lines are not connected); an offset that still lands
/// outside `data` is a mapper bug.
pub(crate) fn bank_index(data: &[u8], bank: usize, size: usize, offset: usize) -> usize {
    let banks = (data.len() / size).max(1);
    let index = (bank % banks) * size + offset;
    assert!(
        index < data.len(),
        "mapped offset {index:#X} outside {:#X}-byte bank area",
        data.len()
    );
    index
}

/// CHR RAM contents for a save state; CHR ROM is not saved.
pub(crate) fn saved_chr(cartridge: &Cartridge) -> Vec<u8> {
    if cartridge.has_chr_ram() {
        cartridge.chr_rom.clone()
    } else {
        Vec::new()
    }
}

pub(crate) fn restore_chr(cartridge: &mut Cartridge, saved: &[u8]) -> Result<(), StateError> {
    if cartridge.has_chr_ram() {
        restore_block(&mut cartridge.chr_rom, saved, "CHR RAM size")
    } else if saved.is_empty() {
        Ok(())
    } else {
        Err(StateError::Corrupt("CHR RAM in state for a CHR ROM board"))
    }
}
