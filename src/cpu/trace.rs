//! Comparing CPU traces against a nestest-style reference log.
//!
//! Reference logs carry disassembly and PPU columns the CPU does not print, so lines are compared
//! on the fields both formats share: PC, opcode, registers and the cycle counter.

use std::fmt;

use ansi_term::Colour::{Green, Red};

/// Fields shared by a reference log line and a [`CPU::trace_line`](crate::cpu::cpu::CPU::trace_line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFields {
    pub pc: u16,
    pub opcode: u8,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub p: u8,
    pub sp: u8,
    pub cycles: u64,
}

impl TraceFields {
    /// Parse a trace line. Returns `None` if a field is missing or malformed.
    pub fn parse(line: &str) -> Option<Self> {
        let pc = u16::from_str_radix(line.get(0..4)?, 16).ok()?;
        let opcode = u8::from_str_radix(line.get(6..8)?, 16).ok()?;

        let field = |name: &str| -> Option<&str> {
            line.split_whitespace()
                .find_map(|token| token.strip_prefix(name))
        };
        let register = |name: &str| field(name).and_then(|hex| u8::from_str_radix(hex, 16).ok());

        Some(Self {
            pc,
            opcode,
            a: register("A:")?,
            x: register("X:")?,
            y: register("Y:")?,
            p: register("P:")?,
            sp: register("SP:")?,
            cycles: field("CYC:")?.parse().ok()?,
        })
    }
}

/// First line where an emulator trace disagrees with the reference.
#[derive(Debug, Clone)]
pub struct Divergence {
    /// Zero-based line number.
    pub line: usize,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "trace diverges at line {}", self.line + 1)?;
        writeln!(f, "{} {}", Green.bold().paint("expected"), self.expected)?;
        write!(f, "{} {}", Red.bold().paint("actual  "), self.actual)
    }
}

/// Compare line by line, stopping at the shorter of the two traces.
pub fn first_divergence<E, A>(expected: &[E], actual: &[A]) -> Option<Divergence>
where
    E: AsRef<str>,
    A: AsRef<str>,
{
    expected
        .iter()
        .zip(actual)
        .enumerate()
        .find(|(_, (want, got))| {
            let want = TraceFields::parse(want.as_ref());
            want.is_none() || want != TraceFields::parse(got.as_ref())
        })
        .map(|(line, (want, got))| Divergence {
            line,
            expected: want.as_ref().to_string(),
            actual: got.as_ref().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTEST_LINE: &str = "C000  4C F5 C5  JMP $C5F5                       A:00 X:00 Y:00 P:24 SP:FD PPU:  0, 21 CYC:7";

    #[test]
    fn parses_reference_and_emulator_lines_alike() {
        let reference = TraceFields::parse(NESTEST_LINE).unwrap();
        let emulator =
            TraceFields::parse("C000  4C JMP          A:00 X:00 Y:00 P:24 SP:FD CYC:7").unwrap();

        assert_eq!(reference, emulator);
        assert_eq!(reference.pc, 0xC000);
        assert_eq!(reference.cycles, 7);
    }

    #[test]
    fn reports_first_mismatch() {
        let expected = [
            NESTEST_LINE,
            "C5F5  A2 00     LDX #$00                        A:00 X:00 Y:00 P:24 SP:FD PPU:  0, 30 CYC:10",
        ];
        let actual = [
            "C000  4C JMP          A:00 X:00 Y:00 P:24 SP:FD CYC:7",
            "C5F5  A2 LDX          A:00 X:00 Y:00 P:26 SP:FD CYC:10",
        ];

        let divergence = first_divergence(&expected, &actual).unwrap();
        assert_eq!(divergence.line, 1);
        assert!(divergence.to_string().contains("line 2"));
    }

    #[test]
    fn matching_traces_have_no_divergence() {
        let actual = ["C000  4C JMP          A:00 X:00 Y:00 P:24 SP:FD CYC:7"];
        assert!(first_divergence(&[NESTEST_LINE], &actual).is_none());
    }
}
