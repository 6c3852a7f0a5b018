use crate::{
    bus::Bus,
    cpu::{cpu::CPU, flags::Status},
};

struct TestBus {
    mem: [u8; 65536],
}

impl TestBus {
    fn new() -> Self {
        let mut bus = Self { mem: [0; 65536] };
        bus.mem[0xFFFC] = 0x00;
        bus.mem[0xFFFD] = 0x80;
        bus
    }

    /// Copy `program` to $8000 (the reset vector target).
    fn with_program(program: &[u8]) -> Self {
        let mut bus = Self::new();
        bus.mem[0x8000..0x8000 + program.len()].copy_from_slice(program);
        bus
    }
}

impl Bus for TestBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.mem[addr as usize] = data;
    }
}

fn new_cpu(bus: &mut TestBus) -> CPU {
    let mut cpu = CPU::new();
    cpu.reset(bus);
    cpu
}

/// Execute one instruction and return the cycles it cost.
fn step(cpu: &mut CPU, bus: &mut TestBus) -> u64 {
    let before = cpu.total_cycles();
    cpu.step(bus);
    cpu.total_cycles() - before
}

#[test]
fn lda_immediate_loads_value() {
    let mut bus = TestBus::with_program(&[0xA9, 0x42]); // LDA #$42
    let mut cpu = new_cpu(&mut bus);

    cpu.step(&mut bus);

    assert_eq!(cpu.a, 0x42)
}

#[test]
fn lda_sets_zero_flag() {
    let mut bus = TestBus::with_program(&[0xA9, 0x00]); // LDA #$00
    let mut cpu = new_cpu(&mut bus);

    cpu.step(&mut bus);
    assert!(cpu.status.contains(Status::ZERO))
}

#[test]
fn lda_sets_negative_flag() {
    let mut bus = TestBus::with_program(&[0xA9, 0x80]); // LDA #$80
    let mut cpu = new_cpu(&mut bus);

    cpu.step(&mut bus); // LDA

    assert!(cpu.status.contains(Status::NEGATIVE))
}

#[test]
fn tax_transfers_a_to_x() {
    let mut bus = TestBus::with_program(&[
        0xA9, 0x10, // LDA #$10
        0xAA, // TAX
    ]);
    let mut cpu = new_cpu(&mut bus);

    cpu.step(&mut bus); // LDA
    cpu.step(&mut bus); // TAX

    assert_eq!(cpu.x, 0x10)
}

#[test]
fn sta_writes_to_memory() {
    let mut bus = TestBus::with_program(&[
        0xA9, 0x33, // LDA #$33
        0x8D, 0x00, 0x02, // STA $0200
    ]);
    let mut cpu = new_cpu(&mut bus);

    cpu.step(&mut bus); // LDA
    cpu.step(&mut bus); // STA

    assert_eq!(bus.mem[0x0200], 0x33);
}

#[test]
fn jmp_changes_program_counter() {
    let mut bus = TestBus::with_program(&[0x4C, 0x00, 0x90]); // JMP $9000
    bus.mem[0x9000] = 0xA9; // LDA #$55
    bus.mem[0x9001] = 0x55;
    let mut cpu = new_cpu(&mut bus);

    cpu.step(&mut bus); // JMP
    cpu.step(&mut bus); // LDA

    assert_eq!(cpu.a, 0x55);
}

#[test]
fn jmp_indirect_wraps_within_page() {
    let mut bus = TestBus::with_program(&[0x6C, 0xFF, 0x02]); // JMP ($02FF)
    bus.mem[0x02FF] = 0x34;
    bus.mem[0x0200] = 0x12;
    bus.mem[0x0300] = 0x99;
    let mut cpu = new_cpu(&mut bus);

    assert_eq!(step(&mut cpu, &mut bus), 5);
    assert_eq!(cpu.pc, 0x1234);
}

#[test]
fn zero_page_x_wraps_within_page_zero() {
    let mut bus = TestBus::with_program(&[
        0xA2, 0x10, // LDX #$10
        0xB5, 0xF8, // LDA $F8,X
    ]);
    bus.mem[0x0008] = 0x77;
    bus.mem[0x0108] = 0x11;
    let mut cpu = new_cpu(&mut bus);

    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.a, 0x77);
}

#[test]
fn indexed_indirect_pointer_wraps() {
    let mut bus = TestBus::with_program(&[
        0xA2, 0x01, // LDX #$01
        0xA1, 0xFE, // LDA ($FE,X)
    ]);
    bus.mem[0x00FF] = 0x00;
    bus.mem[0x0000] = 0x03;
    bus.mem[0x0300] = 0x5A;
    let mut cpu = new_cpu(&mut bus);

    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.a, 0x5A);
}

#[test]
fn indirect_indexed_pointer_wraps_and_pays_for_page_cross() {
    let mut bus = TestBus::with_program(&[
        0xA0, 0x10, // LDY #$10
        0xB1, 0xFF, // LDA ($FF),Y
    ]);
    bus.mem[0x00FF] = 0xF8;
    bus.mem[0x0000] = 0x02;
    bus.mem[0x0308] = 0x66;
    let mut cpu = new_cpu(&mut bus);

    cpu.step(&mut bus);
    assert_eq!(step(&mut cpu, &mut bus), 6);
    assert_eq!(cpu.a, 0x66);
}

#[test]
fn absolute_x_page_cross_adds_one_cycle() {
    let mut bus = TestBus::with_program(&[
        0xA2, 0x01, // LDX #$01
        0xBD, 0xFE, 0x02, // LDA $02FE,X
        0xBD, 0xFF, 0x02, // LDA $02FF,X
        0x9D, 0xFF, 0x02, // STA $02FF,X
    ]);
    let mut cpu = new_cpu(&mut bus);

    cpu.step(&mut bus);
    assert_eq!(step(&mut cpu, &mut bus), 4);
    assert_eq!(step(&mut cpu, &mut bus), 5);
    // Stores always take the fixed cost.
    assert_eq!(step(&mut cpu, &mut bus), 5);
}

#[test]
fn branch_cycles() {
    let mut bus = TestBus::with_program(&[
        0x18, // CLC
        0xB0, 0x10, // BCS +16 (not taken)
        0x90, 0x02, // BCC +2 (taken, same page)
        0xEA, 0xEA, //
        0x90, 0x7F, // BCC +127 (taken, lands on $8088)
    ]);
    let mut cpu = new_cpu(&mut bus);

    cpu.step(&mut bus);
    assert_eq!(step(&mut cpu, &mut bus), 2);
    assert_eq!(step(&mut cpu, &mut bus), 3);
    assert_eq!(cpu.pc, 0x8007);
    assert_eq!(step(&mut cpu, &mut bus), 3);
    assert_eq!(cpu.pc, 0x8088);
}

#[test]
fn branch_to_another_page_costs_two_extra() {
    let mut bus = TestBus::new();
    bus.mem[0xFFFC] = 0xF0;
    bus.mem[0xFFFD] = 0x80;
    bus.mem[0x80F0] = 0xD0; // BNE +$20 -> $8112
    bus.mem[0x80F1] = 0x20;
    let mut cpu = new_cpu(&mut bus);
    cpu.status.remove(Status::ZERO);

    assert_eq!(step(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.pc, 0x8112);
}

#[test]
fn inx_increments_x() {
    let mut bus = TestBus::with_program(&[
        0xA2, 0x01, // LDX #$01
        0xE8, // INX
    ]);
    let mut cpu = new_cpu(&mut bus);

    cpu.step(&mut bus); // LDX
    cpu.step(&mut bus); // INX

    assert_eq!(cpu.x, 0x02);
}

#[test]
fn dex_sets_zero_flag() {
    let mut bus = TestBus::with_program(&[
        0xA2, 0x01, // LDX #$01
        0xCA, // DEX
    ]);
    let mut cpu = new_cpu(&mut bus);

    cpu.step(&mut bus); // LDX
    cpu.step(&mut bus); // DEX

    assert!(cpu.status.contains(Status::ZERO));
}

#[test]
fn bne_loops_until_zero() {
    let mut bus = TestBus::with_program(&[
        0xA2, 0x03, // LDX #$03
        0xCA, // DEX
        0xD0, 0xFD, // BNE -3
        0xEA, // NOP
    ]);
    let mut cpu = new_cpu(&mut bus);

    for _ in 0..7 {
        cpu.step(&mut bus);
    }

    assert_eq!(cpu.x, 0);
    assert_eq!(cpu.pc, 0x8005);
}

#[test]
fn adc_sets_overflow_and_carry() {
    let mut bus = TestBus::with_program(&[
        0xA9, 0x50, // LDA #$50
        0x69, 0x50, // ADC #$50
        0x69, 0x60, // ADC #$60
    ]);
    let mut cpu = new_cpu(&mut bus);

    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0xA0);
    assert!(cpu.status.contains(Status::OVERFLOW));
    assert!(!cpu.status.contains(Status::CARRY));

    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x00);
    assert!(cpu.status.contains(Status::CARRY));
    assert!(cpu.status.contains(Status::ZERO));
    assert!(!cpu.status.contains(Status::OVERFLOW));
}

#[test]
fn sbc_borrows() {
    let mut bus = TestBus::with_program(&[
        0x38, // SEC
        0xA9, 0x10, // LDA #$10
        0xE9, 0x20, // SBC #$20
    ]);
    let mut cpu = new_cpu(&mut bus);

    for _ in 0..3 {
        cpu.step(&mut bus);
    }

    assert_eq!(cpu.a, 0xF0);
    assert!(!cpu.status.contains(Status::CARRY));
    assert!(cpu.status.contains(Status::NEGATIVE));
}

#[test]
fn decimal_flag_does_not_change_arithmetic() {
    let mut bus = TestBus::with_program(&[
        0xF8, // SED
        0xA9, 0x09, // LDA #$09
        0x69, 0x01, // ADC #$01
    ]);
    let mut cpu = new_cpu(&mut bus);

    for _ in 0..3 {
        cpu.step(&mut bus);
    }

    assert_eq!(cpu.a, 0x0A);
}

#[test]
fn jsr_rts_round_trip() {
    let mut bus = TestBus::with_program(&[
        0x20, 0x00, 0x90, // JSR $9000
        0xA9, 0x01, // LDA #$01
    ]);
    bus.mem[0x9000] = 0x60; // RTS
    let mut cpu = new_cpu(&mut bus);

    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x9000);
    assert_eq!(bus.mem[0x01FD], 0x80);
    assert_eq!(bus.mem[0x01FC], 0x02);

    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x8003);
    assert_eq!(cpu.sp, 0xFD);
}

#[test]
fn php_pushes_break_and_unused() {
    let mut bus = TestBus::with_program(&[
        0x08, // PHP
        0x28, // PLP
    ]);
    let mut cpu = new_cpu(&mut bus);

    cpu.step(&mut bus);
    assert_eq!(bus.mem[0x01FD], 0x34);

    cpu.step(&mut bus);
    assert_eq!(cpu.status.bits(), 0x24);
}

#[test]
fn brk_pushes_break_and_skips_padding() {
    let mut bus = TestBus::with_program(&[0x00, 0xFF]); // BRK
    bus.mem[0xFFFE] = 0x00;
    bus.mem[0xFFFF] = 0x90;
    let mut cpu = new_cpu(&mut bus);
    cpu.status.remove(Status::INTERRUPT);

    assert_eq!(step(&mut cpu, &mut bus), 7);
    assert_eq!(cpu.pc, 0x9000);
    assert_eq!(bus.mem[0x01FD], 0x80);
    assert_eq!(bus.mem[0x01FC], 0x02);
    assert_eq!(bus.mem[0x01FB], 0x30);
    assert!(cpu.status.contains(Status::INTERRUPT));
}

#[test]
fn irq_is_ignored_while_interrupts_disabled() {
    let mut bus = TestBus::new();
    bus.mem[0xFFFE] = 0x00;
    bus.mem[0xFFFF] = 0x90;
    let mut cpu = new_cpu(&mut bus);

    cpu.irq(&mut bus);
    assert_eq!(cpu.pc, 0x8000);
    assert_eq!(cpu.sp, 0xFD);
}

#[test]
fn irq_pushes_status_without_break() {
    let mut bus = TestBus::new();
    bus.mem[0xFFFE] = 0x00;
    bus.mem[0xFFFF] = 0x90;
    let mut cpu = new_cpu(&mut bus);
    cpu.status = Status::UNUSED | Status::CARRY;

    let before = cpu.total_cycles();
    cpu.irq(&mut bus);

    assert_eq!(cpu.total_cycles() - before, 7);
    assert_eq!(cpu.pc, 0x9000);
    assert_eq!(bus.mem[0x01FB], 0x21);
    assert!(cpu.status.contains(Status::INTERRUPT));
}

#[test]
fn nmi_ignores_interrupt_disable() {
    let mut bus = TestBus::new();
    bus.mem[0xFFFA] = 0x00;
    bus.mem[0xFFFB] = 0xA0;
    let mut cpu = new_cpu(&mut bus);

    let before = cpu.total_cycles();
    cpu.nmi(&mut bus);

    assert_eq!(cpu.total_cycles() - before, 8);
    assert_eq!(cpu.pc, 0xA000);
    assert_eq!(bus.mem[0x01FB] & 0x30, 0x20);
}

#[test]
fn rti_restores_status_and_pc() {
    let mut bus = TestBus::new();
    bus.mem[0xFFFA] = 0x00;
    bus.mem[0xFFFB] = 0xA0;
    bus.mem[0xA000] = 0x40; // RTI
    let mut cpu = new_cpu(&mut bus);
    cpu.status = Status::UNUSED | Status::CARRY;

    cpu.nmi(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.pc, 0x8000);
    assert_eq!(cpu.status, Status::UNUSED | Status::CARRY);
}

#[test]
fn clock_counts_down_before_next_fetch() {
    let mut bus = TestBus::with_program(&[
        0xA9, 0x01, // LDA #$01
        0xA9, 0x02, // LDA #$02
    ]);
    let mut cpu = new_cpu(&mut bus);

    // Seven reset cycles, then LDA executes on the first of its two cycles.
    for _ in 0..7 {
        cpu.clock(&mut bus);
    }
    assert_eq!(cpu.a, 0);
    cpu.clock(&mut bus);
    assert_eq!(cpu.a, 1);
    cpu.clock(&mut bus);
    assert_eq!(cpu.a, 1);
    assert!(cpu.complete());
    cpu.clock(&mut bus);
    assert_eq!(cpu.a, 2);
}

#[test]
fn pending_nmi_is_taken_at_instruction_boundary() {
    let mut bus = TestBus::with_program(&[0xEA, 0xEA]);
    bus.mem[0xFFFA] = 0x00;
    bus.mem[0xFFFB] = 0xA0;
    let mut cpu = new_cpu(&mut bus);
    for _ in 0..7 {
        cpu.clock(&mut bus);
    }

    cpu.clock(&mut bus); // NOP
    cpu.set_nmi();
    assert_eq!(cpu.pc, 0x8001);
    cpu.clock(&mut bus); // NOP finishing
    assert_eq!(cpu.pc, 0x8001);
    cpu.clock(&mut bus); // NMI
    assert_eq!(cpu.pc, 0xA000);
}

#[test]
fn irq_line_is_level_triggered() {
    let mut bus = TestBus::with_program(&[0x58, 0xEA]); // CLI; NOP
    bus.mem[0xFFFE] = 0x00;
    bus.mem[0xFFFF] = 0x90;
    let mut cpu = new_cpu(&mut bus);
    cpu.set_irq(true);
    for _ in 0..7 {
        cpu.clock(&mut bus);
    }

    cpu.clock(&mut bus); // CLI, I still set when it was fetched
    cpu.clock(&mut bus);
    assert_eq!(cpu.pc, 0x8001);
    cpu.clock(&mut bus); // IRQ
    assert_eq!(cpu.pc, 0x9000);
}

#[test]
fn unofficial_lax_and_dcp() {
    let mut bus = TestBus::with_program(&[
        0xA7, 0x10, // LAX $10
        0xC7, 0x11, // DCP $11
    ]);
    bus.mem[0x0010] = 0x42;
    bus.mem[0x0011] = 0x43;
    let mut cpu = new_cpu(&mut bus);

    cpu.step(&mut bus);
    assert_eq!((cpu.a, cpu.x), (0x42, 0x42));

    cpu.step(&mut bus);
    assert_eq!(bus.mem[0x0011], 0x42);
    assert!(cpu.status.contains(Status::ZERO));
    assert!(cpu.status.contains(Status::CARRY));
}

#[test]
fn undefined_opcode_skips_its_operand() {
    let mut bus = TestBus::with_program(&[
        0x0B, 0xFF, // ANC #$FF (undefined here)
        0xA9, 0x01, // LDA #$01
    ]);
    let mut cpu = new_cpu(&mut bus);

    assert_eq!(step(&mut cpu, &mut bus), 2);
    assert_eq!(cpu.a, 0);
    cpu.step(&mut bus);
    assert_eq!(cpu.a, 1);
}

#[test]
fn trace_line_matches_nestest_layout() {
    let mut bus = TestBus::new();
    bus.mem[0xC000] = 0x4C;
    let mut cpu = new_cpu(&mut bus);
    cpu.pc = 0xC000;

    assert_eq!(
        cpu.trace_line(0x4C),
        "C000  4C JMP          A:00 X:00 Y:00 P:24 SP:FD CYC:7"
    );
}
