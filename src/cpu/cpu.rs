//! Ricoh 2A03 CPU core (6502 without decimal mode).
//!
//! Table-driven: [`OPCODES`] maps each opcode byte to an instruction, an addressing mode and its
//! cycle costs. The whole instruction executes on the first of its cycles; [`CPU::clock`] then
//! counts the remaining cycles down before fetching the next one.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bus::Bus;
use crate::cpu::flags::Status;
use crate::cpu::opcodes::{Instruction, Mode, OPCODES};

const NMI_VECTOR: u16 = 0xFFFA;
const RESET_VECTOR: u16 = 0xFFFC;
const IRQ_VECTOR: u16 = 0xFFFE;

/// Cycles taken by the reset sequence.
const RESET_CYCLES: i32 = 7;
const IRQ_CYCLES: i32 = 7;
const NMI_CYCLES: i32 = 8;

/// Receives one nestest-format line per executed instruction.
pub type TraceSink = Box<dyn FnMut(&str)>;

/// Resolved operand of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    Implied,
    Accumulator,
    Address(u16),
}

pub struct CPU {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: Status,
    /// Cycles left before the next instruction is fetched.
    cycles: i32,
    /// Cycles consumed since reset, as printed in traces.
    total_cycles: u64,
    nmi_pending: bool,
    irq_line: bool,
    trace: Option<TraceSink>,
}

/// Register file captured for save states.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuState {
    a: u8,
    x: u8,
    y: u8,
    sp: u8,
    pc: u16,
    status: u8,
    cycles: i32,
    total_cycles: u64,
    nmi_pending: bool,
    irq_line: bool,
}

impl Default for CPU {
    fn default() -> Self {
        Self::new()
    }
}

impl CPU {
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            status: Status::default(),
            cycles: 0,
            total_cycles: 0,
            nmi_pending: false,
            irq_line: false,
            trace: None,
        }
    }

    /// Load PC from the reset vector and put the registers in their power-up state.
    pub fn reset(&mut self, bus: &mut impl Bus) {
        self.pc = self.read_word(bus, RESET_VECTOR);

        self.sp = 0xFD; // resets at 0xFD instead of 0xFF for some reason
        self.status = Status::default();

        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.nmi_pending = false;
        self.irq_line = false;

        self.cycles = RESET_CYCLES;
        self.total_cycles = RESET_CYCLES as u64;
    }

    /// Advance one CPU cycle. Interrupts are taken between instructions; NMI wins over IRQ.
    pub fn clock(&mut self, bus: &mut impl Bus) {
        if self.cycles == 0 {
            if self.nmi_pending {
                self.nmi_pending = false;
                self.nmi(bus);
            } else if self.irq_line && !self.status.contains(Status::INTERRUPT) {
                self.irq(bus);
            } else {
                self.step(bus);
            }
        }
        self.cycles -= 1;
    }

    /// Latch an NMI for the next instruction boundary.
    pub fn set_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Drive the level-triggered IRQ input.
    pub fn set_irq(&mut self, asserted: bool) {
        self.irq_line = asserted;
    }

    /// Delay the next fetch by `cycles` (OAM DMA, DMC sample fetch).
    pub fn stall(&mut self, cycles: u32) {
        self.cycles += cycles as i32;
        self.total_cycles += cycles as u64;
    }

    /// True when the in-flight instruction has finished.
    pub fn complete(&self) -> bool {
        self.cycles == 0
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    pub fn set_trace(&mut self, sink: Option<TraceSink>) {
        self.trace = sink;
    }

    /// Maskable interrupt. Ignored while I is set.
    pub fn irq(&mut self, bus: &mut impl Bus) {
        if self.status.contains(Status::INTERRUPT) {
            return;
        }
        self.interrupt(bus, IRQ_VECTOR, IRQ_CYCLES);
    }

    /// Non-maskable interrupt.
    pub fn nmi(&mut self, bus: &mut impl Bus) {
        self.interrupt(bus, NMI_VECTOR, NMI_CYCLES);
    }

    fn interrupt(&mut self, bus: &mut impl Bus, vector: u16, cycles: i32) {
        self.push_word(bus, self.pc);
        let pushed = (self.status - Status::BREAK) | Status::UNUSED;
        self.push(bus, pushed.bits());
        self.status.insert(Status::INTERRUPT);
        self.pc = self.read_word(bus, vector);
        self.cycles += cycles;
        self.total_cycles += cycles as u64;
    }

    /// Fetch, decode and execute one instruction, charging its cycles.
    pub fn step(&mut self, bus: &mut impl Bus) {
        let opcode = bus.read(self.pc);
        let operation = &OPCODES[opcode as usize];

        if self.trace.is_some() {
            let line = self.trace_line(opcode);
            if let Some(sink) = self.trace.as_mut() {
                sink(&line);
            }
        }

        self.pc = self.pc.wrapping_add(1);
        let (operand, page_crossed) = self.resolve(bus, operation.mode);
        let extra = self.execute(bus, operation.instruction, operand);

        let mut cycles = operation.cycles + extra;
        if page_crossed {
            cycles += operation.page_cycles;
        }
        self.cycles += cycles as i32;
        self.total_cycles += cycles as u64;
    }

    /// Trace line for the instruction at PC, nestest style.
    pub fn trace_line(&self, opcode: u8) -> String {
        format!(
            "{:04X}  {:02X} {}          A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            self.pc,
            opcode,
            OPCODES[opcode as usize].mnemonic(),
            self.a,
            self.x,
            self.y,
            self.status.bits(),
            self.sp,
            self.total_cycles
        )
    }

    pub fn save_state(&self) -> CpuState {
        CpuState {
            a: self.a,
            x: self.x,
            y: self.y,
            sp: self.sp,
            pc: self.pc,
            status: self.status.bits(),
            cycles: self.cycles,
            total_cycles: self.total_cycles,
            nmi_pending: self.nmi_pending,
            irq_line: self.irq_line,
        }
    }

    pub fn load_state(&mut self, state: &CpuState) {
        self.a = state.a;
        self.x = state.x;
        self.y = state.y;
        self.sp = state.sp;
        self.pc = state.pc;
        self.status = Status::from_bits_retain(state.status);
        self.cycles = state.cycles;
        self.total_cycles = state.total_cycles;
        self.nmi_pending = state.nmi_pending;
        self.irq_line = state.irq_line;
    }

    fn fetch_byte(&mut self, bus: &mut impl Bus) -> u8 {
        let byte = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    fn fetch_word(&mut self, bus: &mut impl Bus) -> u16 {
        let lo = self.fetch_byte(bus) as u16;
        let hi = self.fetch_byte(bus) as u16;
        (hi << 8) | lo
    }

    fn read_word(&self, bus: &mut impl Bus, addr: u16) -> u16 {
        let lo = bus.read(addr) as u16;
        let hi = bus.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Read a pointer from the zero page; the high byte wraps to $00.
    fn read_zero_page_word(&self, bus: &mut impl Bus, ptr: u8) -> u16 {
        let lo = bus.read(ptr as u16) as u16;
        let hi = bus.read(ptr.wrapping_add(1) as u16) as u16;
        (hi << 8) | lo
    }

    fn push(&mut self, bus: &mut impl Bus, data: u8) {
        bus.write(0x0100 | self.sp as u16, data);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pop(&mut self, bus: &mut impl Bus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(0x0100 | self.sp as u16)
    }

    fn push_word(&mut self, bus: &mut impl Bus, data: u16) {
        self.push(bus, (data >> 8) as u8);
        self.push(bus, data as u8);
    }

    fn pop_word(&mut self, bus: &mut impl Bus) -> u16 {
        let lo = self.pop(bus) as u16;
        let hi = self.pop(bus) as u16;
        (hi << 8) | lo
    }

    /// Resolve the operand for `mode`, advancing PC past it. Returns whether an indexed access
    /// crossed a page.
    fn resolve(&mut self, bus: &mut impl Bus, mode: Mode) -> (Operand, bool) {
        let indexed = |base: u16, index: u8| {
            let addr = base.wrapping_add(index as u16);
            (Operand::Address(addr), (base & 0xFF00) != (addr & 0xFF00))
        };

        match mode {
            Mode::Imp => (Operand::Implied, false),
            Mode::Acc => (Operand::Accumulator, false),
            Mode::Imm => {
                let addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                (Operand::Address(addr), false)
            }
            Mode::Zp0 => (Operand::Address(self.fetch_byte(bus) as u16), false),
            Mode::Zpx => {
                let addr = self.fetch_byte(bus).wrapping_add(self.x);
                (Operand::Address(addr as u16), false)
            }
            Mode::Zpy => {
                let addr = self.fetch_byte(bus).wrapping_add(self.y);
                (Operand::Address(addr as u16), false)
            }
            Mode::Rel => {
                let offset = self.fetch_byte(bus) as i8;
                let target = self.pc.wrapping_add(offset as i16 as u16);
                (Operand::Address(target), false)
            }
            Mode::Abs => (Operand::Address(self.fetch_word(bus)), false),
            Mode::Abx => {
                let base = self.fetch_word(bus);
                indexed(base, self.x)
            }
            Mode::Aby => {
                let base = self.fetch_word(bus);
                indexed(base, self.y)
            }
            Mode::Ind => {
                let ptr = self.fetch_word(bus);
                // The high byte is fetched without carrying into the pointer's page.
                let lo = bus.read(ptr) as u16;
                let hi = bus.read((ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF)) as u16;
                (Operand::Address((hi << 8) | lo), false)
            }
            Mode::Izx => {
                let ptr = self.fetch_byte(bus).wrapping_add(self.x);
                (Operand::Address(self.read_zero_page_word(bus, ptr)), false)
            }
            Mode::Izy => {
                let ptr = self.fetch_byte(bus);
                let base = self.read_zero_page_word(bus, ptr);
                indexed(base, self.y)
            }
        }
    }

    fn load(&mut self, bus: &mut impl Bus, operand: Operand) -> u8 {
        match operand {
            Operand::Accumulator => self.a,
            Operand::Address(addr) => bus.read(addr),
            Operand::Implied => 0,
        }
    }

    fn store(&mut self, bus: &mut impl Bus, operand: Operand, data: u8) {
        match operand {
            Operand::Accumulator => self.a = data,
            Operand::Address(addr) => bus.write(addr, data),
            Operand::Implied => {}
        }
    }

    fn address(operand: Operand) -> u16 {
        match operand {
            Operand::Address(addr) => addr,
            _ => 0,
        }
    }

    fn set_a(&mut self, value: u8) {
        self.a = value;
        self.status.update_zero_and_negative(value);
    }

    fn set_x(&mut self, value: u8) {
        self.x = value;
        self.status.update_zero_and_negative(value);
    }

    fn set_y(&mut self, value: u8) {
        self.y = value;
        self.status.update_zero_and_negative(value);
    }

    /// A + M + C with carry and signed overflow. SBC feeds the ones' complement of M.
    fn add_with_carry(&mut self, value: u8) {
        let carry = self.status.contains(Status::CARRY) as u16;
        let sum = self.a as u16 + value as u16 + carry;
        let result = sum as u8;
        self.status.set(Status::CARRY, sum > 0xFF);
        self.status.set(
            Status::OVERFLOW,
            (self.a ^ result) & (value ^ result) & 0x80 != 0,
        );
        self.set_a(result);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.status.set(Status::CARRY, register >= value);
        self.status
            .update_zero_and_negative(register.wrapping_sub(value));
    }

    fn shift_left(&mut self, value: u8, carry_in: bool) -> u8 {
        self.status.set(Status::CARRY, value & 0x80 != 0);
        let result = (value << 1) | carry_in as u8;
        self.status.update_zero_and_negative(result);
        result
    }

    fn shift_right(&mut self, value: u8, carry_in: bool) -> u8 {
        self.status.set(Status::CARRY, value & 0x01 != 0);
        let result = (value >> 1) | ((carry_in as u8) << 7);
        self.status.update_zero_and_negative(result);
        result
    }

    /// Taken branches cost one cycle, two when the target is on another page.
    fn branch(&mut self, condition: bool, operand: Operand) -> u8 {
        if !condition {
            return 0;
        }
        let target = Self::address(operand);
        let extra = if (target & 0xFF00) != (self.pc & 0xFF00) {
            2
        } else {
            1
        };
        self.pc = target;
        extra
    }

    /// Run one instruction and return the extra cycles it took (branches only).
    fn execute(&mut self, bus: &mut impl Bus, instruction: Instruction, operand: Operand) -> u8 {
        use Instruction::*;

        let carry = self.status.contains(Status::CARRY);
        match instruction {
            Lda => {
                let value = self.load(bus, operand);
                self.set_a(value);
            }
            Ldx => {
                let value = self.load(bus, operand);
                self.set_x(value);
            }
            Ldy => {
                let value = self.load(bus, operand);
                self.set_y(value);
            }
            Sta => self.store(bus, operand, self.a),
            Stx => self.store(bus, operand, self.x),
            Sty => self.store(bus, operand, self.y),

            Tax => self.set_x(self.a),
            Tay => self.set_y(self.a),
            Tsx => self.set_x(self.sp),
            Txa => self.set_a(self.x),
            Txs => self.sp = self.x,
            Tya => self.set_a(self.y),

            Adc => {
                let value = self.load(bus, operand);
                self.add_with_carry(value);
            }
            Sbc => {
                let value = self.load(bus, operand);
                self.add_with_carry(!value);
            }
            And => {
                let value = self.load(bus, operand);
                self.set_a(self.a & value);
            }
            Ora => {
                let value = self.load(bus, operand);
                self.set_a(self.a | value);
            }
            Eor => {
                let value = self.load(bus, operand);
                self.set_a(self.a ^ value);
            }
            Bit => {
                let value = self.load(bus, operand);
                self.status.set(Status::ZERO, self.a & value == 0);
                self.status.set(Status::OVERFLOW, value & 0x40 != 0);
                self.status.set(Status::NEGATIVE, value & 0x80 != 0);
            }
            Cmp => {
                let value = self.load(bus, operand);
                self.compare(self.a, value);
            }
            Cpx => {
                let value = self.load(bus, operand);
                self.compare(self.x, value);
            }
            Cpy => {
                let value = self.load(bus, operand);
                self.compare(self.y, value);
            }

            Asl => {
                let value = self.load(bus, operand);
                let result = self.shift_left(value, false);
                self.store(bus, operand, result);
            }
            Rol => {
                let value = self.load(bus, operand);
                let result = self.shift_left(value, carry);
                self.store(bus, operand, result);
            }
            Lsr => {
                let value = self.load(bus, operand);
                let result = self.shift_right(value, false);
                self.store(bus, operand, result);
            }
            Ror => {
                let value = self.load(bus, operand);
                let result = self.shift_right(value, carry);
                self.store(bus, operand, result);
            }
            Inc => {
                let result = self.load(bus, operand).wrapping_add(1);
                self.status.update_zero_and_negative(result);
                self.store(bus, operand, result);
            }
            Dec => {
                let result = self.load(bus, operand).wrapping_sub(1);
                self.status.update_zero_and_negative(result);
                self.store(bus, operand, result);
            }
            Inx => self.set_x(self.x.wrapping_add(1)),
            Iny => self.set_y(self.y.wrapping_add(1)),
            Dex => self.set_x(self.x.wrapping_sub(1)),
            Dey => self.set_y(self.y.wrapping_sub(1)),

            Bcc => return self.branch(!carry, operand),
            Bcs => return self.branch(carry, operand),
            Beq => return self.branch(self.status.contains(Status::ZERO), operand),
            Bne => return self.branch(!self.status.contains(Status::ZERO), operand),
            Bmi => return self.branch(self.status.contains(Status::NEGATIVE), operand),
            Bpl => return self.branch(!self.status.contains(Status::NEGATIVE), operand),
            Bvs => return self.branch(self.status.contains(Status::OVERFLOW), operand),
            Bvc => return self.branch(!self.status.contains(Status::OVERFLOW), operand),

            Jmp => self.pc = Self::address(operand),
            Jsr => {
                self.push_word(bus, self.pc.wrapping_sub(1));
                self.pc = Self::address(operand);
            }
            Rts => self.pc = self.pop_word(bus).wrapping_add(1),
            Rti => {
                let status = self.pop(bus);
                self.status = Status::from_stack(status);
                self.pc = self.pop_word(bus);
            }
            Brk => {
                // BRK skips a padding byte after the opcode.
                self.pc = self.pc.wrapping_add(1);
                self.push_word(bus, self.pc);
                let pushed = self.status | Status::BREAK | Status::UNUSED;
                self.push(bus, pushed.bits());
                self.status.insert(Status::INTERRUPT);
                self.pc = self.read_word(bus, IRQ_VECTOR);
            }

            Pha => self.push(bus, self.a),
            Php => {
                let pushed = self.status | Status::BREAK | Status::UNUSED;
                self.push(bus, pushed.bits());
            }
            Pla => {
                let value = self.pop(bus);
                self.set_a(value);
            }
            Plp => {
                let status = self.pop(bus);
                self.status = Status::from_stack(status);
            }

            Clc => self.status.remove(Status::CARRY),
            Cld => self.status.remove(Status::DECIMAL),
            Cli => self.status.remove(Status::INTERRUPT),
            Clv => self.status.remove(Status::OVERFLOW),
            Sec => self.status.insert(Status::CARRY),
            Sed => self.status.insert(Status::DECIMAL),
            Sei => self.status.insert(Status::INTERRUPT),

            Nop => {}

            Lax => {
                let value = self.load(bus, operand);
                self.set_a(value);
                self.x = value;
            }
            Sax => self.store(bus, operand, self.a & self.x),
            Dcp => {
                let result = self.load(bus, operand).wrapping_sub(1);
                self.store(bus, operand, result);
                self.compare(self.a, result);
            }
            Isb => {
                let result = self.load(bus, operand).wrapping_add(1);
                self.store(bus, operand, result);
                self.add_with_carry(!result);
            }
            Slo => {
                let value = self.load(bus, operand);
                let result = self.shift_left(value, false);
                self.store(bus, operand, result);
                self.set_a(self.a | result);
            }
            Rla => {
                let value = self.load(bus, operand);
                let result = self.shift_left(value, carry);
                self.store(bus, operand, result);
                self.set_a(self.a & result);
            }
            Sre => {
                let value = self.load(bus, operand);
                let result = self.shift_right(value, false);
                self.store(bus, operand, result);
                self.set_a(self.a ^ result);
            }
            Rra => {
                let value = self.load(bus, operand);
                let result = self.shift_right(value, carry);
                self.store(bus, operand, result);
                self.add_with_carry(result);
            }

            Xxx => debug!("undefined opcode before {:#06X}", self.pc),
        }
        0
    }
}
