//! Save-state snapshot format.
//!
//! A snapshot is a postcard-encoded [`Snapshot`]. The version is the first field, so a state
//! written by an incompatible build is rejected before the rest is decoded.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::apu::apu::ApuState;
use crate::cartridge::mapper::MapperState;
use crate::controller::Controller;
use crate::cpu::cpu::CpuState;
use crate::error::StateError;
use crate::ppu::ppu::PpuState;

/// Bumped whenever a field of any saved struct changes.
pub const STATE_VERSION: u32 = 1;

/// Full machine state except the cartridge ROM and the frame buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// iNES mapper number of the cartridge the state belongs to.
    pub mapper: u8,
    pub cpu: CpuState,
    pub ppu: PpuState,
    pub apu: ApuState,
    pub board: MapperState,
    pub ram: Vec<u8>,
    pub vram: Vec<u8>,
    pub controllers: [Controller; 2],
    pub system_clock: u64,
    pub dma_page: Option<u8>,
}

impl Snapshot {
    pub fn encode<W: Write>(&self, writer: W) -> Result<(), StateError> {
        postcard::to_io(self, writer)?;
        Ok(())
    }

    pub fn decode<R: Read>(mut reader: R) -> Result<Self, StateError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let (version, _) = postcard::take_from_bytes::<u32>(&bytes)?;
        if version != STATE_VERSION {
            return Err(StateError::VersionMismatch {
                expected: STATE_VERSION,
                found: version,
            });
        }
        Ok(postcard::from_bytes(&bytes)?)
    }
}

/// Copy a saved memory block back, rejecting a length change.
pub(crate) fn restore_block(
    dst: &mut [u8],
    src: &[u8],
    what: &'static str,
) -> Result<(), StateError> {
    if dst.len() != src.len() {
        return Err(StateError::Corrupt(what));
    }
    dst.copy_from_slice(src);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_block_rejects_resize() {
        let mut dst = [0u8; 4];
        assert!(matches!(
            restore_block(&mut dst, &[1, 2, 3], "test block"),
            Err(StateError::Corrupt("test block"))
        ));
        assert_eq!(dst, [0; 4]);

        restore_block(&mut dst, &[1, 2, 3, 4], "test block").unwrap();
        assert_eq!(dst, [1, 2, 3, 4]);
    }

    #[test]
    fn foreign_version_is_rejected_before_decoding() {
        let mut bytes = postcard::to_stdvec(&(STATE_VERSION + 1)).unwrap();
        bytes.extend_from_slice(&[0xFF; 8]);

        let err = Snapshot::decode(bytes.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            StateError::VersionMismatch { expected: STATE_VERSION, found } if found == STATE_VERSION + 1
        ));
    }

    #[test]
    fn truncated_state_is_an_error() {
        let bytes = postcard::to_stdvec(&STATE_VERSION).unwrap();
        assert!(matches!(
            Snapshot::decode(bytes.as_slice()),
            Err(StateError::Encode(_))
        ));
    }
}
