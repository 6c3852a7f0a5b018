//! NES controller input handling.
//!
//! Implements the standard NES controller shift register protocol:
//! write $01 to $4016 to latch current state; then read $4016/$4017 repeatedly
//! to get one bit per read (A, B, Select, Start, Up, Down, Left, Right).

use serde::{Deserialize, Serialize};

/// Standard controller buttons, valued by their bit in the report byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Button {
    A = 0x01,
    B = 0x02,
    Select = 0x04,
    Start = 0x08,
    Up = 0x10,
    Down = 0x20,
    Left = 0x40,
    Right = 0x80,
}

/// One controller port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controller {
    /// Current button states: bit 0 = A, 1 = B, 2 = Select, 3 = Start, 4 = Up, 5 = Down, 6 = Left, 7 = Right.
    state: u8,
    /// Shift register: latched from `state` on write; shifted out LSB-first on read.
    shift: u8,
    /// While high, every read reloads the shifter and returns A.
    strobe: bool,
}

impl Controller {
    /// Create a new controller with no buttons pressed.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, button: Button) {
        self.state |= button as u8;
    }

    pub fn release(&mut self, button: Button) {
        self.state &= !(button as u8);
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.state & button as u8 != 0
    }

    /// Write to $4016. Bit 0 is the strobe; the current buttons are latched while it is high.
    pub fn write(&mut self, data: u8) {
        self.strobe = data & 1 != 0;
        if self.strobe {
            self.shift = self.state;
        }
    }

    /// Read one button bit. After all eight buttons the shifter returns 1s, as official pads do.
    pub fn read(&mut self) -> u8 {
        if self.strobe {
            self.shift = self.state;
        }
        let bit = self.shift & 1;
        self.shift = (self.shift >> 1) | 0x80;
        bit
    }
}
