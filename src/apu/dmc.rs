//! Delta modulation channel ($4010-$4013). APU_DMC.
//!
//! The channel cannot reach memory on its own. While its one-byte sample buffer is empty and
//! sample bytes remain, [`Dmc::fetch_address`] names the byte it wants; the bus reads it through
//! the cartridge, stalls the CPU and hands it back with [`Dmc::feed_byte`].

use serde::{Deserialize, Serialize};

use crate::apu::units::Timer;

/// NTSC rate table: 4-bit index from $4010 → CPU cycles per output bit.
const DMC_RATE_TABLE: [u16; 16] = [
    428, 380, 340, 320, 286, 254, 226, 214, 190, 160, 142, 128, 106, 84, 72, 54,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dmc {
    pub irq: bool,
    irq_enabled: bool,
    looping: bool,
    timer: Timer,
    output_level: u8,
    sample_address: u16,
    sample_length: u16,
    current_address: u16,
    bytes_remaining: u16,
    buffer: Option<u8>,
    shift: u8,
    bits_remaining: u8,
    silence: bool,
}

impl Default for Dmc {
    fn default() -> Self {
        Self {
            irq: false,
            irq_enabled: false,
            looping: false,
            timer: Timer {
                counter: 0,
                period: DMC_RATE_TABLE[0] - 1,
            },
            output_level: 0,
            sample_address: 0xC000,
            sample_length: 1,
            current_address: 0xC000,
            bytes_remaining: 0,
            buffer: None,
            shift: 0,
            bits_remaining: 0,
            silence: true,
        }
    }
}

impl Dmc {
    pub fn write(&mut self, reg: u16, data: u8) {
        match reg {
            0 => {
                self.irq_enabled = data & 0x80 != 0;
                if !self.irq_enabled {
                    self.irq = false;
                }
                self.looping = data & 0x40 != 0;
                self.timer.period = DMC_RATE_TABLE[(data & 0x0F) as usize] - 1;
            }
            1 => self.output_level = data & 0x7F,
            // Sample address = $C000 + value * 64.
            2 => self.sample_address = 0xC000 | (data as u16) << 6,
            // Sample length = value * 16 + 1 bytes.
            _ => self.sample_length = ((data as u16) << 4) + 1,
        }
    }

    /// $4015 bit 4. Enabling restarts the sample only when the previous one has finished.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.bytes_remaining = 0;
        } else if self.bytes_remaining == 0 {
            self.restart();
        }
    }

    fn restart(&mut self) {
        self.current_address = self.sample_address;
        self.bytes_remaining = self.sample_length;
    }

    /// Sample bytes still to be read; reported in $4015 bit 4.
    pub fn active(&self) -> bool {
        self.bytes_remaining > 0
    }

    /// Address of the next sample byte, while the buffer is empty and the sample is not done.
    pub fn fetch_address(&self) -> Option<u16> {
        if self.buffer.is_none() && self.bytes_remaining > 0 {
            Some(self.current_address)
        } else {
            None
        }
    }

    /// Accept the byte read from [`fetch_address`](Self::fetch_address). The address wraps from
    /// $FFFF to $8000.
    pub fn feed_byte(&mut self, byte: u8) {
        if self.bytes_remaining == 0 {
            return;
        }
        self.buffer = Some(byte);
        self.current_address = match self.current_address {
            0xFFFF => 0x8000,
            addr => addr + 1,
        };
        self.bytes_remaining -= 1;
        if self.bytes_remaining == 0 {
            if self.looping {
                self.restart();
            } else if self.irq_enabled {
                self.irq = true;
            }
        }
    }

    /// One CPU cycle of the output unit.
    pub fn clock_timer(&mut self) {
        if !self.timer.step() {
            return;
        }
        if !self.silence {
            if self.shift & 1 != 0 {
                if self.output_level <= 125 {
                    self.output_level += 2;
                }
            } else if self.output_level >= 2 {
                self.output_level -= 2;
            }
        }
        self.shift >>= 1;

        self.bits_remaining = self.bits_remaining.saturating_sub(1);
        if self.bits_remaining == 0 {
            self.bits_remaining = 8;
            match self.buffer.take() {
                Some(byte) => {
                    self.shift = byte;
                    self.silence = false;
                }
                None => self.silence = true,
            }
        }
    }

    /// 7-bit level for the mixer. Sent whether or not a sample is playing.
    pub fn output(&self) -> u8 {
        self.output_level
    }
}
