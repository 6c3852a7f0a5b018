//! Triangle channel ($4008-$400B). APU_Triangle.

use serde::{Deserialize, Serialize};

use crate::apu::units::{LengthCounter, Timer};

/// 32-step waveform: 15 down to 0, then 0 up to 15. No volume control.
const TRIANGLE_SEQUENCE: [u8; 32] = [
    15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12,
    13, 14, 15,
];

/// Triangle wave gated by a linear counter and a length counter. The timer runs at the CPU rate,
/// one octave below a pulse with the same period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangle {
    pub enabled: bool,
    pub timer: Timer,
    pub length: LengthCounter,
    linear_load: u8,
    linear_counter: u8,
    linear_reload: bool,
    /// Linear counter control; the same bit halts the length counter.
    control: bool,
    step: u8,
}

impl Triangle {
    pub fn write(&mut self, reg: u16, data: u8) {
        match reg {
            0 => {
                self.control = data & 0x80 != 0;
                self.length.halt = self.control;
                self.linear_load = data & 0x7F;
            }
            1 => {}
            2 => self.timer.period = (self.timer.period & 0x0700) | data as u16,
            _ => {
                self.timer.period = (self.timer.period & 0x00FF) | ((data & 7) as u16) << 8;
                if self.enabled {
                    self.length.load(data);
                }
                self.linear_reload = true;
            }
        }
    }

    pub fn clock_timer(&mut self) {
        if self.timer.step() && !self.length.is_zero() && self.linear_counter > 0 {
            self.step = (self.step + 1) & 31;
        }
    }

    /// Quarter-frame clock.
    pub fn clock_linear(&mut self) {
        if self.linear_reload {
            self.linear_counter = self.linear_load;
        } else if self.linear_counter > 0 {
            self.linear_counter -= 1;
        }
        if !self.control {
            self.linear_reload = false;
        }
    }

    pub fn clock_length(&mut self) {
        self.length.step();
    }

    /// Periods below 2 are ultrasonic and output silence instead of a popping DC level.
    pub fn output(&self) -> u8 {
        if !self.enabled || self.length.is_zero() || self.linear_counter == 0 || self.timer.period < 2
        {
            return 0;
        }
        TRIANGLE_SEQUENCE[self.step as usize]
    }
}
