//! NES cartridge images and mapper support.
//!
//! - **cartridge**: ROM image (PRG/CHR, mapper number, mirroring) and the iNES reader.
//! - **mapper**: NROM (0), MMC1 (1), UxROM (2), CNROM (3), MMC3 (4); PRG/CHR bank switching,
//!   nametable mirroring, and the MMC3 scanline IRQ.

pub mod cartridge;
pub mod mapper;

pub use self::cartridge::Cartridge;
pub use self::mapper::{Board, Mirroring};
