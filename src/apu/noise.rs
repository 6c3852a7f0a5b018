//! Noise channel ($400C-$400F). APU_Noise.

use serde::{Deserialize, Serialize};

use crate::apu::units::{Envelope, LengthCounter, Timer};

/// NTSC period table: 4-bit index from $400E → period in CPU cycles.
const NOISE_PERIOD_TABLE: [u16; 16] = [
    4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
];

/// Pseudo-random output from a 15-bit LFSR; mode 1 taps bit 6 for a short, metallic sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Noise {
    pub enabled: bool,
    pub timer: Timer,
    pub length: LengthCounter,
    envelope: Envelope,
    mode: bool,
    shift: u16,
}

impl Default for Noise {
    fn default() -> Self {
        Self {
            enabled: false,
            timer: Timer::default(),
            length: LengthCounter::default(),
            envelope: Envelope::default(),
            mode: false,
            shift: 1,
        }
    }
}

impl Noise {
    pub fn write(&mut self, reg: u16, data: u8) {
        match reg {
            0 => {
                self.length.halt = data & 0x20 != 0;
                self.envelope.write(data);
            }
            1 => {}
            2 => {
                self.mode = data & 0x80 != 0;
                self.timer.period = NOISE_PERIOD_TABLE[(data & 0x0F) as usize] - 1;
            }
            _ => {
                if self.enabled {
                    self.length.load(data);
                }
                self.envelope.restart();
            }
        }
    }

    pub fn clock_timer(&mut self) {
        if self.timer.step() {
            let tap = if self.mode { 6 } else { 1 };
            let feedback = (self.shift & 1) ^ ((self.shift >> tap) & 1);
            self.shift = (self.shift >> 1) | (feedback << 14);
        }
    }

    pub fn clock_envelope(&mut self) {
        self.envelope.step();
    }

    pub fn clock_length(&mut self) {
        self.length.step();
    }

    pub fn output(&self) -> u8 {
        if !self.enabled || self.length.is_zero() || self.shift & 1 != 0 {
            return 0;
        }
        self.envelope.output()
    }
}
