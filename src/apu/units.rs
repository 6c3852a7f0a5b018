//! Building blocks shared by the channels: divider timer, length counter, volume envelope and the
//! pulse sweep unit.

use serde::{Deserialize, Serialize};

/// Length counter lookup table: 5-bit index from register → count. APU_Length_Counter.
pub const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, 12, 16, 24, 18, 48, 20, 96, 22,
    192, 24, 72, 26, 16, 28, 32, 30,
];

/// Down-counting divider. Fires and reloads from `period` when it is clocked at zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    pub counter: u16,
    pub period: u16,
}

impl Timer {
    pub fn step(&mut self) -> bool {
        if self.counter == 0 {
            self.counter = self.period;
            true
        } else {
            self.counter -= 1;
            false
        }
    }
}

/// Channel length counter; silences the channel when it reaches zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthCounter {
    pub counter: u8,
    pub halt: bool,
}

impl LengthCounter {
    /// Load from the top five bits of a channel's fourth register.
    pub fn load(&mut self, data: u8) {
        self.counter = LENGTH_TABLE[(data >> 3) as usize];
    }

    /// Half-frame clock.
    pub fn step(&mut self) {
        if self.counter > 0 && !self.halt {
            self.counter -= 1;
        }
    }

    pub fn is_zero(&self) -> bool {
        self.counter == 0
    }
}

/// Volume envelope used by the pulse and noise channels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Constant volume, or the divider period when decaying.
    volume: u8,
    constant: bool,
    /// Restart decay at 0; shares its bit with the length counter halt flag.
    looping: bool,
    start: bool,
    decay: u8,
    divider: u8,
}

impl Envelope {
    /// Bits 0-5 of $4000/$4004/$400C.
    pub fn write(&mut self, data: u8) {
        self.volume = data & 0x0F;
        self.constant = data & 0x10 != 0;
        self.looping = data & 0x20 != 0;
    }

    pub fn restart(&mut self) {
        self.start = true;
    }

    /// Quarter-frame clock.
    pub fn step(&mut self) {
        if self.start {
            self.start = false;
            self.decay = 15;
            self.divider = self.volume;
        } else if self.divider > 0 {
            self.divider -= 1;
        } else {
            self.divider = self.volume;
            if self.decay > 0 {
                self.decay -= 1;
            } else if self.looping {
                self.decay = 15;
            }
        }
    }

    pub fn output(&self) -> u8 {
        if self.constant { self.volume } else { self.decay }
    }
}

/// How a sweep unit negates its change amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Negate {
    /// Pulse 1 subtracts `delta + 1`.
    #[default]
    OnesComplement,
    /// Pulse 2 subtracts `delta`.
    TwosComplement,
}

/// Pulse frequency sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sweep {
    enabled: bool,
    period: u8,
    negate: bool,
    shift: u8,
    reload: bool,
    divider: u8,
    mode: Negate,
}

impl Sweep {
    pub fn new(mode: Negate) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// $4001/$4005.
    pub fn write(&mut self, data: u8) {
        self.enabled = data & 0x80 != 0;
        self.period = (data >> 4) & 7;
        self.negate = data & 0x08 != 0;
        self.shift = data & 7;
        self.reload = true;
    }

    /// Period the sweep would move the timer to. Computed continuously, even when disabled.
    pub fn target(&self, period: u16) -> u16 {
        let delta = period >> self.shift;
        if !self.negate {
            return period + delta;
        }
        match self.mode {
            Negate::OnesComplement => period.saturating_sub(delta + 1),
            Negate::TwosComplement => period.saturating_sub(delta),
        }
    }

    /// A channel is muted while its period is below 8 or the sweep target overflows 11 bits.
    pub fn mutes(&self, period: u16) -> bool {
        period < 8 || self.target(period) > 0x7FF
    }

    /// Half-frame clock. May rewrite the channel's timer period.
    pub fn step(&mut self, period: &mut u16) {
        if self.divider == 0 && self.enabled && self.shift > 0 && !self.mutes(*period) {
            *period = self.target(*period);
        }
        if self.divider == 0 || self.reload {
            self.divider = self.period;
            self.reload = false;
        } else {
            self.divider -= 1;
        }
    }
}
