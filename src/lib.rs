//! famicore: a cycle-stepped NES (Nintendo Entertainment System) emulator core.
//!
//! Implements the NES chipset as documented on the
//! [NESdev Wiki](https://www.nesdev.org/wiki/NES_reference_guide): Ricoh 2A03 (CPU+APU),
//! 2C02 PPU, cartridge mappers, and controller I/O. Windowing, audio output and input polling
//! belong to the front-end; the core hands out a frame buffer and a sample callback.
//!
//! ```no_run
//! use famicore::{Cartridge, NesBus};
//!
//! # fn main() -> famicore::Result<()> {
//! let mut nes = NesBus::new(Cartridge::load("game.nes")?)?;
//! nes.apu_mut().set_sample_callback(|_sample| {});
//! nes.run_frame();
//! let rgba = nes.ppu().frame().to_rgba_bytes();
//! # let _ = rgba;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules (NESdev references)
//!
//! - **apu** – [APU](https://www.nesdev.org/wiki/APU): pulse×2, triangle, noise, DMC, frame
//!   counter, [APU Mixer](https://www.nesdev.org/wiki/APU_Mixer)
//! - **bus** – [CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map): RAM, PPU, APU,
//!   controller, cartridge; 3 PPU cycles per CPU cycle
//! - **cartridge** – [iNES](https://www.nesdev.org/wiki/INES) loading; [Mapper](https://www.nesdev.org/wiki/Mapper) NROM (0), MMC1 (1), UxROM (2), CNROM (3), MMC3 (4)
//! - **controller** – [Controller reading](https://www.nesdev.org/wiki/Controller_reading): $4016 latch, shift-out
//! - **cpu** – [6502](https://www.nesdev.org/wiki/CPU) / 2A03: official + stable unofficial opcodes, [NMI](https://www.nesdev.org/wiki/NMI)
//! - **ppu** – [PPU](https://www.nesdev.org/wiki/PPU), [PPU registers](https://www.nesdev.org/wiki/PPU_registers), OAM, nametables, 256×240
//! - **state** – save-state snapshots

pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod config;
pub mod controller;
pub mod cpu;
pub mod error;
pub mod ppu;
pub mod state;

pub use bus::NesBus;
pub use cartridge::{Cartridge, Mirroring};
pub use config::{Config, SpriteLimit};
pub use controller::{Button, Controller};
pub use error::{Error, Result, StateError};
pub use ppu::frame::{Frame, Pixel};
