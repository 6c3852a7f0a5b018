//! Pulse channels ($4000-$4003 = pulse 1, $4004-$4007 = pulse 2). APU_Pulse.

use serde::{Deserialize, Serialize};

use crate::apu::units::{Envelope, LengthCounter, Negate, Sweep, Timer};

/// Pulse channel duty cycles (8 steps). Duty 0=12.5%, 1=25%, 2=50%, 3=25% negated. Sequencer steps
/// 0→7→6→…→1. Output is volume when step is 1, else 0.
const PULSE_DUTY: [[u8; 8]; 4] = [
    [0, 0, 0, 0, 0, 0, 0, 1], // 12.5%
    [0, 0, 0, 0, 0, 0, 1, 1], // 25%
    [0, 0, 0, 0, 1, 1, 1, 1], // 50%
    [1, 1, 1, 1, 1, 1, 0, 0], // 25% negated
];

/// Square wave with duty, envelope, sweep and length counter. The timer is clocked every other
/// CPU cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pulse {
    pub enabled: bool,
    duty: u8,
    step: u8,
    pub timer: Timer,
    pub length: LengthCounter,
    envelope: Envelope,
    sweep: Sweep,
}

impl Pulse {
    /// Pulse 1 and pulse 2 differ only in how the sweep negates.
    pub fn new(negate: Negate) -> Self {
        Self {
            enabled: false,
            duty: 0,
            step: 0,
            timer: Timer::default(),
            length: LengthCounter::default(),
            envelope: Envelope::default(),
            sweep: Sweep::new(negate),
        }
    }

    /// Register write; `reg` is the address modulo 4.
    pub fn write(&mut self, reg: u16, data: u8) {
        match reg {
            0 => {
                self.duty = data >> 6;
                self.length.halt = data & 0x20 != 0;
                self.envelope.write(data);
            }
            1 => self.sweep.write(data),
            2 => self.timer.period = (self.timer.period & 0x0700) | data as u16,
            _ => {
                self.timer.period = (self.timer.period & 0x00FF) | ((data & 7) as u16) << 8;
                if self.enabled {
                    self.length.load(data);
                }
                self.envelope.restart();
                self.step = 0;
            }
        }
    }

    pub fn clock_timer(&mut self) {
        if self.timer.step() {
            self.step = self.step.wrapping_sub(1) & 7;
        }
    }

    pub fn clock_envelope(&mut self) {
        self.envelope.step();
    }

    pub fn clock_length_and_sweep(&mut self) {
        self.length.step();
        self.sweep.step(&mut self.timer.period);
    }

    pub fn output(&self) -> u8 {
        if !self.enabled
            || self.length.is_zero()
            || self.sweep.mutes(self.timer.period)
            || PULSE_DUTY[self.duty as usize][self.step as usize] == 0
        {
            return 0;
        }
        self.envelope.output()
    }
}
