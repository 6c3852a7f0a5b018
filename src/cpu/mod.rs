//! 6502 CPU emulation for the NES.
//!
//! Official instruction set plus the stable unofficial opcodes nestest exercises.
//! Memory and I/O go through the [`Bus`](crate::bus::Bus) trait.

pub mod cpu;
pub mod flags;
pub mod opcodes;
pub mod trace;

#[cfg(test)]
mod tests;
