mod common;

use anyhow::Result;
use common::{Vectors, boot, capture_trace, program_image, run_frames};
use famicore::{Button, StateError};

/// Busy program: counts in RAM, reads the pad, pokes the APU and the PPU, and takes NMIs.
fn busy_image() -> Vec<u8> {
    let program = [
        0xA9, 0x80, // E000 LDA #$80
        0x8D, 0x00, 0x20, // E002 STA $2000
        0xA9, 0x1E, // E005 LDA #$1E
        0x8D, 0x01, 0x20, // E007 STA $2001
        0xA9, 0x0F, // E00A LDA #$0F
        0x8D, 0x15, 0x40, // E00C STA $4015
        0xE6, 0x10, // E00F INC $10          ; loop
        0xA5, 0x10, // E011 LDA $10
        0x8D, 0x02, 0x40, // E013 STA $4002
        0x8D, 0x03, 0x40, // E016 STA $4003
        0xA9, 0x01, // E019 LDA #$01
        0x8D, 0x16, 0x40, // E01B STA $4016
        0xA9, 0x00, // E01E LDA #$00
        0x8D, 0x16, 0x40, // E020 STA $4016
        0xAD, 0x16, 0x40, // E023 LDA $4016
        0x85, 0x11, // E026 STA $11
        0x4C, 0x0F, 0xE0, // E028 JMP $E00F
        0xE6, 0x12, // E02B INC $12          ; NMI
        0xA5, 0x12, // E02D LDA $12
        0x8D, 0x06, 0x20, // E02F STA $2006
        0x8D, 0x06, 0x20, // E032 STA $2006
        0x8D, 0x07, 0x20, // E035 STA $2007
        0x40, // E038 RTI
    ];
    let vectors = Vectors {
        nmi: 0xE02B,
        ..Vectors::default()
    };
    program_image(4, 2, 0, &program, vectors)
}

#[test]
fn restored_state_replays_identically() -> Result<()> {
    let image = busy_image();
    let mut original = boot(&image)?;
    run_frames(&mut original, 2);
    original.controller1().press(Button::A);

    let mut state = Vec::new();
    original.serialize(&mut state)?;

    let mut restored = boot(&image)?;
    restored.deserialize(state.as_slice())?;

    let trace_a = capture_trace(&mut original);
    let trace_b = capture_trace(&mut restored);
    run_frames(&mut original, 3);
    run_frames(&mut restored, 3);

    assert!(!trace_a.borrow().is_empty());
    assert_eq!(*trace_a.borrow(), *trace_b.borrow());
    assert_eq!(original.system_clock(), restored.system_clock());
    assert_eq!(original.ppu().frame().pixels(), restored.ppu().frame().pixels());
    for addr in [0x10, 0x11, 0x12] {
        assert_eq!(original.cpu_read(addr), restored.cpu_read(addr));
    }
    assert_eq!(original.cpu_read(0x11) & 0x01, 0x01, "pad state was restored");
    Ok(())
}

#[test]
fn state_survives_reset_of_the_target() -> Result<()> {
    let image = busy_image();
    let mut nes = boot(&image)?;
    run_frames(&mut nes, 1);
    let mut state = Vec::new();
    nes.serialize(&mut state)?;
    let counter = nes.cpu_read(0x10);

    run_frames(&mut nes, 2);
    nes.reset();
    nes.deserialize(state.as_slice())?;

    assert_eq!(nes.cpu_read(0x10), counter);
    Ok(())
}

#[test]
fn foreign_version_leaves_console_untouched() -> Result<()> {
    let mut nes = boot(&busy_image())?;
    run_frames(&mut nes, 1);
    let mut state = Vec::new();
    nes.serialize(&mut state)?;
    // The version is the first varint; STATE_VERSION is small enough to fit one byte.
    state[0] = state[0].wrapping_add(1);

    let clock = nes.system_clock();
    let pc = nes.cpu().pc;
    let err = nes.deserialize(state.as_slice()).unwrap_err();

    assert!(matches!(err, StateError::VersionMismatch { .. }));
    assert_eq!(nes.system_clock(), clock);
    assert_eq!(nes.cpu().pc, pc);
    Ok(())
}

#[test]
fn truncated_state_is_rejected() -> Result<()> {
    let mut nes = boot(&busy_image())?;
    let mut state = Vec::new();
    nes.serialize(&mut state)?;
    state.truncate(state.len() / 2);

    assert!(nes.deserialize(state.as_slice()).is_err());
    Ok(())
}
