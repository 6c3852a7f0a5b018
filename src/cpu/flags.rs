//! 6502 processor status register (P) flag bits.

use bitflags::bitflags;

bitflags! {
    /// Processor status. Bit layout `N V U B D I Z C`.
    ///
    /// B and U only exist on the stack copy: B distinguishes BRK/PHP (1) from IRQ/NMI (0), U always
    /// reads as 1. The live register keeps U set and B clear.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        const CARRY     = 1 << 0;
        const ZERO      = 1 << 1;
        const INTERRUPT = 1 << 2;
        /// Settable, but the 2A03 has no decimal mode.
        const DECIMAL   = 1 << 3;
        const BREAK     = 1 << 4;
        const UNUSED    = 1 << 5;
        const OVERFLOW  = 1 << 6;
        const NEGATIVE  = 1 << 7;
    }
}

impl Status {
    /// Set Z and N from a result byte.
    pub fn update_zero_and_negative(&mut self, value: u8) {
        self.set(Status::ZERO, value == 0);
        self.set(Status::NEGATIVE, value & 0x80 != 0);
    }

    /// Value restored by PLP/RTI: B dropped, U forced.
    pub fn from_stack(byte: u8) -> Self {
        (Status::from_bits_retain(byte) - Status::BREAK) | Status::UNUSED
    }
}

impl Default for Status {
    /// Power-up value: I and U set (P = $24).
    fn default() -> Self {
        Status::INTERRUPT | Status::UNUSED
    }
}
