//! NES APU (Audio Processing Unit) implementation.
//!
//! Implements the [APU](https://www.nesdev.org/wiki/APU) as in the Ricoh 2A03: five channels (pulse×2,
//! triangle, noise, DMC), [frame counter](https://www.nesdev.org/wiki/APU_Frame_Counter) (4-step or
//! 5-step), and [APU Mixer](https://www.nesdev.org/wiki/APU_Mixer) (non-linear). Registers $4000–$4013,
//! $4015, $4017. See [APU registers](https://www.nesdev.org/wiki/APU_registers).
//!
//! ## Timing
//!
//! - Pulse: timer clocked every 2 CPU cycles (APU "half cycle").
//! - Triangle, noise, DMC: timers at CPU rate. Length/envelope/sweep clocked by frame counter (~240 Hz).
//! - DMC: when the sample buffer is empty the bus reads the next byte and stalls the CPU 4 cycles.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::apu::dmc::Dmc;
use crate::apu::noise::Noise;
use crate::apu::pulse::Pulse;
use crate::apu::triangle::Triangle;
use crate::apu::units::Negate;

/// NTSC CPU clock in Hz.
pub const CPU_FREQUENCY: f64 = 1_789_773.0;

/// 4-step frame counter: resets every 29830 CPU cycles. Quarter/half frame at 7457, 14913, 22371;
/// IRQ (if not inhibited) at 29829.
const FRAME_4STEP_RESET: u32 = 29830;

/// 5-step frame counter: no IRQ; resets every 37282 cycles. Extra half-frame at 37281.
const FRAME_5STEP_RESET: u32 = 37282;

/// Which frame-rate units a frame counter step clocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameClock {
    /// Envelopes and the triangle linear counter.
    pub quarter: bool,
    /// Length counters and sweeps.
    pub half: bool,
}

impl FrameClock {
    const NONE: Self = Self { quarter: false, half: false };
    const QUARTER: Self = Self { quarter: true, half: false };
    const FULL: Self = Self { quarter: true, half: true };
}

/// The frame counter ($4017).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSequencer {
    five_step: bool,
    irq_inhibit: bool,
    cycle: u32,
    pub irq: bool,
}

impl FrameSequencer {
    /// $4017: bit 7 selects 5-step mode, bit 6 inhibits (and clears) the frame IRQ. Restarts the
    /// sequence; in 5-step mode a quarter and a half frame are clocked immediately (after 3–4
    /// cycles on real hardware; we do it at once).
    pub fn write(&mut self, data: u8) -> FrameClock {
        let five_step = data & 0x80 != 0;
        if five_step != self.five_step {
            debug!(five_step, "frame counter mode");
        }
        self.five_step = five_step;
        self.irq_inhibit = data & 0x40 != 0;
        if self.irq_inhibit {
            self.irq = false;
        }
        self.cycle = 0;
        if self.five_step { FrameClock::FULL } else { FrameClock::NONE }
    }

    /// Advance one CPU cycle.
    pub fn step(&mut self) -> FrameClock {
        self.cycle += 1;
        let clock = match (self.five_step, self.cycle) {
            (_, 7457) | (_, 22371) => FrameClock::QUARTER,
            (_, 14913) => FrameClock::FULL,
            (false, 29829) => {
                if !self.irq_inhibit {
                    self.irq = true;
                }
                FrameClock::FULL
            }
            (true, 37281) => FrameClock::FULL,
            _ => FrameClock::NONE,
        };
        let reset = if self.five_step { FRAME_5STEP_RESET } else { FRAME_4STEP_RESET };
        if self.cycle >= reset {
            self.cycle = 0;
        }
        clock
    }
}

/// Pulse output: 95.52 / (8128/n + 100), n = pulse1 + pulse2 (0–30).
fn pulse_table(n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    95.52 / (8128.0 / (n as f64) + 100.0)
}

/// TND (triangle + noise + DMC) output: 163.67 / (24329/n + 100), n = 3*tri + 2*noise + dmc.
fn tnd_table(n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    163.67 / (24329.0 / (n as f64) + 100.0)
}

/// Everything the APU needs to resume from a save state. The sample callback is not saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApuState {
    pub pulse1: Pulse,
    pub pulse2: Pulse,
    pub triangle: Triangle,
    pub noise: Noise,
    pub dmc: Dmc,
    pub frame: FrameSequencer,
    pub cycle: u64,
    pub sample_phase: f64,
}

/// Receives one mixed sample in `0.0..=1.0` at the configured rate.
pub type SampleCallback = Box<dyn FnMut(f64)>;

/// APU state: pulse×2, triangle, noise, DMC and the frame counter. `clock` advances one CPU
/// cycle and hands a sample to the callback whenever one is due.
pub struct APU {
    pulse1: Pulse,
    pulse2: Pulse,
    triangle: Triangle,
    noise: Noise,
    dmc: Dmc,
    frame: FrameSequencer,
    cycle: u64,
    cycles_per_sample: f64,
    sample_phase: f64,
    callback: Option<SampleCallback>,
}

impl Default for APU {
    fn default() -> Self {
        Self::new(44_100)
    }
}

impl APU {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            pulse1: Pulse::new(Negate::OnesComplement),
            pulse2: Pulse::new(Negate::TwosComplement),
            triangle: Triangle::default(),
            noise: Noise::default(),
            dmc: Dmc::default(),
            frame: FrameSequencer::default(),
            cycle: 0,
            cycles_per_sample: CPU_FREQUENCY / sample_rate.max(1) as f64,
            sample_phase: 0.0,
            callback: None,
        }
    }

    /// Power-up state. The sample rate and callback are kept.
    pub fn reset(&mut self) {
        let callback = self.callback.take();
        *self = Self {
            cycles_per_sample: self.cycles_per_sample,
            callback,
            ..Self::new(44_100)
        };
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.cycles_per_sample = CPU_FREQUENCY / sample_rate.max(1) as f64;
        self.sample_phase = 0.0;
    }

    pub fn set_sample_callback(&mut self, callback: impl FnMut(f64) + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Write to APU registers. $4000–$4013 = channel regs; $4015 = channel enables;
    /// $4017 = frame counter. Other addresses are ignored.
    pub fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x4000..=0x4003 => self.pulse1.write(addr & 3, data),
            0x4004..=0x4007 => self.pulse2.write(addr & 3, data),
            0x4008..=0x400B => self.triangle.write(addr & 3, data),
            0x400C..=0x400F => self.noise.write(addr & 3, data),
            0x4010..=0x4013 => self.dmc.write(addr & 3, data),
            0x4015 => {
                self.pulse1.enabled = data & 0x01 != 0;
                self.pulse2.enabled = data & 0x02 != 0;
                self.triangle.enabled = data & 0x04 != 0;
                self.noise.enabled = data & 0x08 != 0;
                if !self.pulse1.enabled {
                    self.pulse1.length.counter = 0;
                }
                if !self.pulse2.enabled {
                    self.pulse2.length.counter = 0;
                }
                if !self.triangle.enabled {
                    self.triangle.length.counter = 0;
                }
                if !self.noise.enabled {
                    self.noise.length.counter = 0;
                }
                self.dmc.set_enabled(data & 0x10 != 0);
                self.dmc.irq = false;
            }
            0x4017 => {
                let clock = self.frame.write(data);
                self.apply_frame_clock(clock);
            }
            _ => {}
        }
    }

    /// Read $4015: bits 0–3 = length counter > 0 for pulse1, pulse2, triangle, noise; bit 4 = DMC
    /// has bytes remaining; bit 6 = frame IRQ; bit 7 = DMC IRQ. Reading clears the frame IRQ.
    pub fn read_status(&mut self) -> u8 {
        let mut r = 0;
        if !self.pulse1.length.is_zero() {
            r |= 0x01;
        }
        if !self.pulse2.length.is_zero() {
            r |= 0x02;
        }
        if !self.triangle.length.is_zero() {
            r |= 0x04;
        }
        if !self.noise.length.is_zero() {
            r |= 0x08;
        }
        if self.dmc.active() {
            r |= 0x10;
        }
        if self.frame.irq {
            r |= 0x40;
        }
        if self.dmc.irq {
            r |= 0x80;
        }
        self.frame.irq = false;
        r
    }

    /// Frame counter or DMC interrupt asserted.
    pub fn irq_pending(&self) -> bool {
        self.frame.irq || self.dmc.irq
    }

    /// DMC memory reader: the PRG address the DMC wants next. The bus must read the byte, stall
    /// the CPU 4 cycles and call [`dmc_feed_byte`](Self::dmc_feed_byte).
    pub fn dmc_fetch_address(&self) -> Option<u16> {
        self.dmc.fetch_address()
    }

    pub fn dmc_feed_byte(&mut self, byte: u8) {
        self.dmc.feed_byte(byte);
    }

    fn apply_frame_clock(&mut self, clock: FrameClock) {
        if clock.quarter {
            self.pulse1.clock_envelope();
            self.pulse2.clock_envelope();
            self.noise.clock_envelope();
            self.triangle.clock_linear();
        }
        if clock.half {
            self.pulse1.clock_length_and_sweep();
            self.pulse2.clock_length_and_sweep();
            self.triangle.clock_length();
            self.noise.clock_length();
        }
    }

    /// Current mixer output in `0.0..=1.0`.
    pub fn output(&self) -> f64 {
        let pulse = (self.pulse1.output() + self.pulse2.output()) as usize;
        let tnd = 3 * self.triangle.output() as usize
            + 2 * self.noise.output() as usize
            + self.dmc.output() as usize;
        (pulse_table(pulse) + tnd_table(tnd)).clamp(0.0, 1.0)
    }

    /// Advance one CPU cycle: frame counter, channel timers, then the resampler.
    pub fn clock(&mut self) {
        let clock = self.frame.step();
        self.apply_frame_clock(clock);

        if self.cycle % 2 == 1 {
            self.pulse1.clock_timer();
            self.pulse2.clock_timer();
        }
        self.triangle.clock_timer();
        self.noise.clock_timer();
        self.dmc.clock_timer();
        self.cycle += 1;

        self.sample_phase += 1.0;
        if self.sample_phase >= self.cycles_per_sample {
            self.sample_phase -= self.cycles_per_sample;
            let sample = self.output();
            if let Some(callback) = self.callback.as_mut() {
                callback(sample);
            }
        }
    }

    pub fn save_state(&self) -> ApuState {
        ApuState {
            pulse1: self.pulse1.clone(),
            pulse2: self.pulse2.clone(),
            triangle: self.triangle.clone(),
            noise: self.noise.clone(),
            dmc: self.dmc.clone(),
            frame: self.frame.clone(),
            cycle: self.cycle,
            sample_phase: self.sample_phase,
        }
    }

    pub fn load_state(&mut self, state: &ApuState) {
        self.pulse1 = state.pulse1.clone();
        self.pulse2 = state.pulse2.clone();
        self.triangle = state.triangle.clone();
        self.noise = state.noise.clone();
        self.dmc = state.dmc.clone();
        self.frame = state.frame.clone();
        self.cycle = state.cycle;
        self.sample_phase = state.sample_phase;
    }
}
