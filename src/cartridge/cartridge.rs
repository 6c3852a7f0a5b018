//! Cartridge image: PRG/CHR data plus the header facts a mapper needs.
//!
//! [`Cartridge::from_ines`] reads the [iNES](https://www.nesdev.org/wiki/INES) format: 16-byte
//! header (magic "NES\x1A", PRG size in 16 KiB units, CHR size in 8 KiB units, flags 6–7 for
//! mapper and mirroring), an optional 512-byte trainer, then PRG ROM, then CHR ROM. NES 2.0 header
//! fields are not interpreted.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::cartridge::mapper::Mirroring;
use crate::error::{Error, Result};

pub const PRG_BANK_SIZE: usize = 16 * 1024;
pub const CHR_BANK_SIZE: usize = 8 * 1024;

const HEADER_SIZE: usize = 16;
const TRAINER_SIZE: usize = 512;
const INES_MAGIC: [u8; 4] = *b"NES\x1A";

/// Passive ROM image owned by a mapper.
///
/// When `chr_banks == 0` the board carries 8 KiB of CHR RAM, which lives in `chr_rom` and is the
/// only part of the cartridge the PPU may write.
#[derive(Debug, Clone)]
pub struct Cartridge {
    /// PRG ROM size in 16 KiB units.
    pub prg_banks: u8,
    /// CHR ROM size in 8 KiB units; 0 means CHR RAM.
    pub chr_banks: u8,
    pub mapper_num: u8,
    /// Solder-pad mirroring from the header. Mappers with their own mirroring control override it.
    pub mirroring: Mirroring,
    /// Flags 6 bit 1: PRG RAM is battery backed.
    pub battery: bool,
    pub prg_rom: Vec<u8>,
    pub chr_rom: Vec<u8>,
}

impl Cartridge {
    /// Build a cartridge from raw banks. PRG must be `prg_banks * 16 KiB` and CHR `chr_banks * 8 KiB`
    /// (empty when `chr_banks` is 0).
    pub fn new(
        mapper_num: u8,
        mirroring: Mirroring,
        prg_banks: u8,
        chr_banks: u8,
        prg_rom: Vec<u8>,
        chr_rom: Vec<u8>,
    ) -> Result<Self> {
        if prg_banks == 0 {
            return Err(Error::NoPrgRom);
        }
        check_size("PRG", prg_banks, PRG_BANK_SIZE, prg_rom.len())?;
        check_size("CHR", chr_banks, CHR_BANK_SIZE, chr_rom.len())?;

        let chr_rom = if chr_banks == 0 {
            vec![0; CHR_BANK_SIZE]
        } else {
            chr_rom
        };

        Ok(Self {
            prg_banks,
            chr_banks,
            mapper_num,
            mirroring,
            battery: false,
            prg_rom,
            chr_rom,
        })
    }

    /// Parse an iNES image. Mapper number = high nibble of byte 7 | high nibble of byte 6.
    pub fn from_ines(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::TooShort {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }
        let magic = [data[0], data[1], data[2], data[3]];
        if magic != INES_MAGIC {
            return Err(Error::InvalidMagic(magic));
        }

        let prg_banks = data[4];
        let chr_banks = data[5];
        let flags6 = data[6];
        let flags7 = data[7];

        let mapper_num = (flags7 & 0xF0) | (flags6 >> 4);
        let mirroring = if flags6 & 0x08 != 0 {
            warn!("four-screen nametables are not supported, using vertical mirroring");
            Mirroring::Vertical
        } else if flags6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        let mut offset = HEADER_SIZE;
        if flags6 & 0x04 != 0 {
            offset += TRAINER_SIZE;
        }

        let prg_size = prg_banks as usize * PRG_BANK_SIZE;
        let chr_size = chr_banks as usize * CHR_BANK_SIZE;
        let expected = offset + prg_size + chr_size;
        if data.len() < expected {
            return Err(Error::TooShort {
                expected,
                actual: data.len(),
            });
        }

        let prg_rom = data[offset..offset + prg_size].to_vec();
        offset += prg_size;
        let chr_rom = data[offset..offset + chr_size].to_vec();

        let mut cartridge =
            Self::new(mapper_num, mirroring, prg_banks, chr_banks, prg_rom, chr_rom)?;
        cartridge.battery = flags6 & 0x02 != 0;

        info!(
            mapper = mapper_num,
            prg_banks,
            chr_banks,
            ?mirroring,
            battery = cartridge.battery,
            "loaded iNES image"
        );
        Ok(cartridge)
    }

    /// Read an iNES file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read(path)?;
        Self::from_ines(&data)
    }

    /// True when the pattern tables are RAM the PPU may write.
    pub fn has_chr_ram(&self) -> bool {
        self.chr_banks == 0
    }
}

fn check_size(section: &'static str, banks: u8, bank_size: usize, actual: usize) -> Result<()> {
    let expected = banks as usize * bank_size;
    if expected != actual {
        return Err(Error::SizeMismatch {
            section,
            banks,
            expected,
            actual,
        });
    }
    Ok(())
}
