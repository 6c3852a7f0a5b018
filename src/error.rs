//! Error types for cartridge loading and save states.
//!
//! Only recoverable failures live here. Address-decode contract violations inside the core
//! (a mapper computing an offset past the end of its ROM, a write into PRG ROM) panic instead.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures while building a cartridge or inserting it into the bus.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Header does not start with `NES\x1A`.
    #[error("invalid iNES magic: {0:02X?}")]
    InvalidMagic([u8; 4]),

    /// Image ends before the header-declared PRG/CHR data.
    #[error("image too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    /// ROM buffer length disagrees with the declared bank count.
    #[error("{section} size mismatch: {banks} banks need {expected} bytes, got {actual}")]
    SizeMismatch {
        section: &'static str,
        banks: u8,
        expected: usize,
        actual: usize,
    },

    #[error("cartridge has no PRG ROM")]
    NoPrgRom,

    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u8),
}

/// Failures while writing or restoring a save state.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("save state encoding failed: {0}")]
    Encode(#[from] postcard::Error),

    #[error("save state version {found} does not match {expected}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("save state is for mapper {found}, cartridge uses mapper {expected}")]
    MapperMismatch { expected: u8, found: u8 },

    /// A memory block in the snapshot has the wrong length.
    #[error("corrupt save state: {0}")]
    Corrupt(&'static str),
}
