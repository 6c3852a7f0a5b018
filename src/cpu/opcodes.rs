//! 256-entry opcode table: instruction, addressing mode, base cycles, page-cross penalty.
//!
//! Cycle counts follow the [6502 instruction reference](https://www.nesdev.org/obelisk-6502-guide/reference.html)
//! and [CPU unofficial opcodes](https://www.nesdev.org/wiki/CPU_unofficial_opcodes). Branch
//! penalties are added by the branch itself, so branches carry no page-cross entry here.

/// Addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Implied
    Imp,
    /// Accumulator
    Acc,
    /// Immediate
    Imm,
    /// Zero page
    Zp0,
    /// Zero page,X
    Zpx,
    /// Zero page,Y
    Zpy,
    /// Relative (branches)
    Rel,
    /// Absolute
    Abs,
    /// Absolute,X
    Abx,
    /// Absolute,Y
    Aby,
    /// Indirect (JMP only)
    Ind,
    /// (Indirect,X)
    Izx,
    /// (Indirect),Y
    Izy,
}

/// Instruction handlers. `Xxx` covers the undefined opcodes, which do nothing.
#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    // Stable unofficial instructions.
    Lax, Sax, Dcp, Isb, Slo, Rla, Sre, Rra,
    Xxx,
}

impl Instruction {
    #[rustfmt::skip]
    pub fn mnemonic(self) -> &'static str {
        use Instruction::*;
        match self {
            Adc => "ADC", And => "AND", Asl => "ASL", Bcc => "BCC", Bcs => "BCS",
            Beq => "BEQ", Bit => "BIT", Bmi => "BMI", Bne => "BNE", Bpl => "BPL",
            Brk => "BRK", Bvc => "BVC", Bvs => "BVS", Clc => "CLC", Cld => "CLD",
            Cli => "CLI", Clv => "CLV", Cmp => "CMP", Cpx => "CPX", Cpy => "CPY",
            Dec => "DEC", Dex => "DEX", Dey => "DEY", Eor => "EOR", Inc => "INC",
            Inx => "INX", Iny => "INY", Jmp => "JMP", Jsr => "JSR", Lda => "LDA",
            Ldx => "LDX", Ldy => "LDY", Lsr => "LSR", Nop => "NOP", Ora => "ORA",
            Pha => "PHA", Php => "PHP", Pla => "PLA", Plp => "PLP", Rol => "ROL",
            Ror => "ROR", Rti => "RTI", Rts => "RTS", Sbc => "SBC", Sec => "SEC",
            Sed => "SED", Sei => "SEI", Sta => "STA", Stx => "STX", Sty => "STY",
            Tax => "TAX", Tay => "TAY", Tsx => "TSX", Txa => "TXA", Txs => "TXS",
            Tya => "TYA", Lax => "LAX", Sax => "SAX", Dcp => "DCP", Isb => "ISB",
            Slo => "SLO", Rla => "RLA", Sre => "SRE", Rra => "RRA", Xxx => "???",
        }
    }
}

/// One opcode table entry.
#[derive(Debug, Clone, Copy)]
pub struct Operation {
    pub instruction: Instruction,
    pub mode: Mode,
    /// Base cycle count.
    pub cycles: u8,
    /// Extra cycle when indexed addressing crosses a page.
    pub page_cycles: u8,
}

impl Operation {
    pub fn mnemonic(&self) -> &'static str {
        self.instruction.mnemonic()
    }
}

const fn op(instruction: Instruction, mode: Mode, cycles: u8, page_cycles: u8) -> Operation {
    Operation {
        instruction,
        mode,
        cycles,
        page_cycles,
    }
}

use Instruction::*;
use Mode::*;

#[rustfmt::skip]
pub static OPCODES: [Operation; 256] = [
    // 0x00
    op(Brk, Imp, 7, 0), op(Ora, Izx, 6, 0), op(Xxx, Imp, 2, 0), op(Slo, Izx, 8, 0),
    op(Nop, Zp0, 3, 0), op(Ora, Zp0, 3, 0), op(Asl, Zp0, 5, 0), op(Slo, Zp0, 5, 0),
    op(Php, Imp, 3, 0), op(Ora, Imm, 2, 0), op(Asl, Acc, 2, 0), op(Xxx, Imm, 2, 0),
    op(Nop, Abs, 4, 0), op(Ora, Abs, 4, 0), op(Asl, Abs, 6, 0), op(Slo, Abs, 6, 0),
    // 0x10
    op(Bpl, Rel, 2, 0), op(Ora, Izy, 5, 1), op(Xxx, Imp, 2, 0), op(Slo, Izy, 8, 0),
    op(Nop, Zpx, 4, 0), op(Ora, Zpx, 4, 0), op(Asl, Zpx, 6, 0), op(Slo, Zpx, 6, 0),
    op(Clc, Imp, 2, 0), op(Ora, Aby, 4, 1), op(Nop, Imp, 2, 0), op(Slo, Aby, 7, 0),
    op(Nop, Abx, 4, 1), op(Ora, Abx, 4, 1), op(Asl, Abx, 7, 0), op(Slo, Abx, 7, 0),
    // 0x20
    op(Jsr, Abs, 6, 0), op(And, Izx, 6, 0), op(Xxx, Imp, 2, 0), op(Rla, Izx, 8, 0),
    op(Bit, Zp0, 3, 0), op(And, Zp0, 3, 0), op(Rol, Zp0, 5, 0), op(Rla, Zp0, 5, 0),
    op(Plp, Imp, 4, 0), op(And, Imm, 2, 0), op(Rol, Acc, 2, 0), op(Xxx, Imm, 2, 0),
    op(Bit, Abs, 4, 0), op(And, Abs, 4, 0), op(Rol, Abs, 6, 0), op(Rla, Abs, 6, 0),
    // 0x30
    op(Bmi, Rel, 2, 0), op(And, Izy, 5, 1), op(Xxx, Imp, 2, 0), op(Rla, Izy, 8, 0),
    op(Nop, Zpx, 4, 0), op(And, Zpx, 4, 0), op(Rol, Zpx, 6, 0), op(Rla, Zpx, 6, 0),
    op(Sec, Imp, 2, 0), op(And, Aby, 4, 1), op(Nop, Imp, 2, 0), op(Rla, Aby, 7, 0),
    op(Nop, Abx, 4, 1), op(And, Abx, 4, 1), op(Rol, Abx, 7, 0), op(Rla, Abx, 7, 0),
    // 0x40
    op(Rti, Imp, 6, 0), op(Eor, Izx, 6, 0), op(Xxx, Imp, 2, 0), op(Sre, Izx, 8, 0),
    op(Nop, Zp0, 3, 0), op(Eor, Zp0, 3, 0), op(Lsr, Zp0, 5, 0), op(Sre, Zp0, 5, 0),
    op(Pha, Imp, 3, 0), op(Eor, Imm, 2, 0), op(Lsr, Acc, 2, 0), op(Xxx, Imm, 2, 0),
    op(Jmp, Abs, 3, 0), op(Eor, Abs, 4, 0), op(Lsr, Abs, 6, 0), op(Sre, Abs, 6, 0),
    // 0x50
    op(Bvc, Rel, 2, 0), op(Eor, Izy, 5, 1), op(Xxx, Imp, 2, 0), op(Sre, Izy, 8, 0),
    op(Nop, Zpx, 4, 0), op(Eor, Zpx, 4, 0), op(Lsr, Zpx, 6, 0), op(Sre, Zpx, 6, 0),
    op(Cli, Imp, 2, 0), op(Eor, Aby, 4, 1), op(Nop, Imp, 2, 0), op(Sre, Aby, 7, 0),
    op(Nop, Abx, 4, 1), op(Eor, Abx, 4, 1), op(Lsr, Abx, 7, 0), op(Sre, Abx, 7, 0),
    // 0x60
    op(Rts, Imp, 6, 0), op(Adc, Izx, 6, 0), op(Xxx, Imp, 2, 0), op(Rra, Izx, 8, 0),
    op(Nop, Zp0, 3, 0), op(Adc, Zp0, 3, 0), op(Ror, Zp0, 5, 0), op(Rra, Zp0, 5, 0),
    op(Pla, Imp, 4, 0), op(Adc, Imm, 2, 0), op(Ror, Acc, 2, 0), op(Xxx, Imm, 2, 0),
    op(Jmp, Ind, 5, 0), op(Adc, Abs, 4, 0), op(Ror, Abs, 6, 0), op(Rra, Abs, 6, 0),
    // 0x70
    op(Bvs, Rel, 2, 0), op(Adc, Izy, 5, 1), op(Xxx, Imp, 2, 0), op(Rra, Izy, 8, 0),
    op(Nop, Zpx, 4, 0), op(Adc, Zpx, 4, 0), op(Ror, Zpx, 6, 0), op(Rra, Zpx, 6, 0),
    op(Sei, Imp, 2, 0), op(Adc, Aby, 4, 1), op(Nop, Imp, 2, 0), op(Rra, Aby, 7, 0),
    op(Nop, Abx, 4, 1), op(Adc, Abx, 4, 1), op(Ror, Abx, 7, 0), op(Rra, Abx, 7, 0),
    // 0x80
    op(Nop, Imm, 2, 0), op(Sta, Izx, 6, 0), op(Nop, Imm, 2, 0), op(Sax, Izx, 6, 0),
    op(Sty, Zp0, 3, 0), op(Sta, Zp0, 3, 0), op(Stx, Zp0, 3, 0), op(Sax, Zp0, 3, 0),
    op(Dey, Imp, 2, 0), op(Nop, Imm, 2, 0), op(Txa, Imp, 2, 0), op(Xxx, Imm, 2, 0),
    op(Sty, Abs, 4, 0), op(Sta, Abs, 4, 0), op(Stx, Abs, 4, 0), op(Sax, Abs, 4, 0),
    // 0x90
    op(Bcc, Rel, 2, 0), op(Sta, Izy, 6, 0), op(Xxx, Imp, 2, 0), op(Xxx, Izy, 6, 0),
    op(Sty, Zpx, 4, 0), op(Sta, Zpx, 4, 0), op(Stx, Zpy, 4, 0), op(Sax, Zpy, 4, 0),
    op(Tya, Imp, 2, 0), op(Sta, Aby, 5, 0), op(Txs, Imp, 2, 0), op(Xxx, Aby, 5, 0),
    op(Xxx, Abx, 5, 0), op(Sta, Abx, 5, 0), op(Xxx, Aby, 5, 0), op(Xxx, Aby, 5, 0),
    // 0xA0
    op(Ldy, Imm, 2, 0), op(Lda, Izx, 6, 0), op(Ldx, Imm, 2, 0), op(Lax, Izx, 6, 0),
    op(Ldy, Zp0, 3, 0), op(Lda, Zp0, 3, 0), op(Ldx, Zp0, 3, 0), op(Lax, Zp0, 3, 0),
    op(Tay, Imp, 2, 0), op(Lda, Imm, 2, 0), op(Tax, Imp, 2, 0), op(Xxx, Imm, 2, 0),
    op(Ldy, Abs, 4, 0), op(Lda, Abs, 4, 0), op(Ldx, Abs, 4, 0), op(Lax, Abs, 4, 0),
    // 0xB0
    op(Bcs, Rel, 2, 0), op(Lda, Izy, 5, 1), op(Xxx, Imp, 2, 0), op(Lax, Izy, 5, 1),
    op(Ldy, Zpx, 4, 0), op(Lda, Zpx, 4, 0), op(Ldx, Zpy, 4, 0), op(Lax, Zpy, 4, 0),
    op(Clv, Imp, 2, 0), op(Lda, Aby, 4, 1), op(Tsx, Imp, 2, 0), op(Xxx, Aby, 4, 1),
    op(Ldy, Abx, 4, 1), op(Lda, Abx, 4, 1), op(Ldx, Aby, 4, 1), op(Lax, Aby, 4, 1),
    // 0xC0
    op(Cpy, Imm, 2, 0), op(Cmp, Izx, 6, 0), op(Nop, Imm, 2, 0), op(Dcp, Izx, 8, 0),
    op(Cpy, Zp0, 3, 0), op(Cmp, Zp0, 3, 0), op(Dec, Zp0, 5, 0), op(Dcp, Zp0, 5, 0),
    op(Iny, Imp, 2, 0), op(Cmp, Imm, 2, 0), op(Dex, Imp, 2, 0), op(Xxx, Imm, 2, 0),
    op(Cpy, Abs, 4, 0), op(Cmp, Abs, 4, 0), op(Dec, Abs, 6, 0), op(Dcp, Abs, 6, 0),
    // 0xD0
    op(Bne, Rel, 2, 0), op(Cmp, Izy, 5, 1), op(Xxx, Imp, 2, 0), op(Dcp, Izy, 8, 0),
    op(Nop, Zpx, 4, 0), op(Cmp, Zpx, 4, 0), op(Dec, Zpx, 6, 0), op(Dcp, Zpx, 6, 0),
    op(Cld, Imp, 2, 0), op(Cmp, Aby, 4, 1), op(Nop, Imp, 2, 0), op(Dcp, Aby, 7, 0),
    op(Nop, Abx, 4, 1), op(Cmp, Abx, 4, 1), op(Dec, Abx, 7, 0), op(Dcp, Abx, 7, 0),
    // 0xE0
    op(Cpx, Imm, 2, 0), op(Sbc, Izx, 6, 0), op(Nop, Imm, 2, 0), op(Isb, Izx, 8, 0),
    op(Cpx, Zp0, 3, 0), op(Sbc, Zp0, 3, 0), op(Inc, Zp0, 5, 0), op(Isb, Zp0, 5, 0),
    op(Inx, Imp, 2, 0), op(Sbc, Imm, 2, 0), op(Nop, Imp, 2, 0), op(Sbc, Imm, 2, 0),
    op(Cpx, Abs, 4, 0), op(Sbc, Abs, 4, 0), op(Inc, Abs, 6, 0), op(Isb, Abs, 6, 0),
    // 0xF0
    op(Beq, Rel, 2, 0), op(Sbc, Izy, 5, 1), op(Xxx, Imp, 2, 0), op(Isb, Izy, 8, 0),
    op(Nop, Zpx, 4, 0), op(Sbc, Zpx, 4, 0), op(Inc, Zpx, 6, 0), op(Isb, Zpx, 6, 0),
    op(Sed, Imp, 2, 0), op(Sbc, Aby, 4, 1), op(Nop, Imp, 2, 0), op(Isb, Aby, 7, 0),
    op(Nop, Abx, 4, 1), op(Sbc, Abx, 4, 1), op(Inc, Abx, 7, 0), op(Isb, Abx, 7, 0),
];
