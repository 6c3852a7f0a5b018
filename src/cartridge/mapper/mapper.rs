//! Mapper trait: the capability interface every cartridge board exposes to the bus.

use crate::cartridge::mapper::{MapperState, Mirroring};
use crate::error::StateError;

/// Trait for NES cartridge mappers. The bus routes CPU `$6000–$FFFF` and PPU `$0000–$1FFF`
/// through these methods; addresses outside those windows never reach a mapper.
pub trait Mapper {
    /// Read PRG RAM ($6000–$7FFF) or PRG ROM ($8000–$FFFF).
    fn cpu_read(&mut self, addr: u16) -> u8;
    /// Write PRG RAM or a bank register. PRG ROM itself is read-only.
    fn cpu_write(&mut self, addr: u16, data: u8);
    /// Read CHR ROM/RAM ($0000–$1FFF).
    fn ppu_read(&mut self, addr: u16) -> u8;
    /// Write CHR RAM. Writing CHR ROM is a contract violation.
    fn ppu_write(&mut self, addr: u16, data: u8);
    /// Return bank registers to their power-up values. PRG RAM is kept.
    fn reset(&mut self);
    /// Current nametable mirroring for the PPU.
    fn mirroring(&self) -> Mirroring;

    /// Whether the board is asserting IRQ.
    fn irq_state(&self) -> bool {
        false
    }

    /// Acknowledge a pending IRQ.
    fn irq_clear(&mut self) {}

    /// Called by the PPU once per rendered scanline.
    fn scanline(&mut self) {}

    /// 8 KiB PRG RAM at $6000–$7FFF (battery-backed on some boards).
    fn prg_ram(&self) -> &[u8];
    fn prg_ram_mut(&mut self) -> &mut [u8];

    fn save_state(&self) -> MapperState;
    fn load_state(&mut self, state: &MapperState) -> Result<(), StateError>;
}
