#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use ctor::ctor;
use famicore::{Cartridge, NesBus};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Where [`program_image`] places the program. $E000–$FFFF is fixed to the last 8 KiB of PRG on
/// every supported board at power-up, so the same image layout works for mappers 0–4.
pub const PROGRAM_ORIGIN: u16 = 0xE000;

#[ctor]
fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_file(true)
        .with_line_number(true)
        .with_max_level(Level::DEBUG)
        .pretty()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

/// Interrupt vectors written at the top of PRG.
#[derive(Debug, Clone, Copy)]
pub struct Vectors {
    pub nmi: u16,
    pub reset: u16,
    pub irq: u16,
}

impl Default for Vectors {
    fn default() -> Self {
        Self {
            nmi: PROGRAM_ORIGIN,
            reset: PROGRAM_ORIGIN,
            irq: PROGRAM_ORIGIN,
        }
    }
}

/// Raw iNES 1.0 file: header, PRG, CHR. `flags6` low nibble carries mirroring/battery/trainer bits.
pub fn ines(mapper: u8, flags6: u8, prg: &[u8], chr: &[u8]) -> Vec<u8> {
    let mut image = Vec::with_capacity(16 + prg.len() + chr.len());
    image.extend_from_slice(b"NES\x1A");
    image.push((prg.len() / 0x4000) as u8);
    image.push((chr.len() / 0x2000) as u8);
    image.push((mapper << 4) | (flags6 & 0x0F));
    image.push(mapper & 0xF0);
    image.extend_from_slice(&[0; 8]);
    image.extend_from_slice(prg);
    image.extend_from_slice(chr);
    image
}

/// PRG filled with a position-dependent pattern, `program` at [`PROGRAM_ORIGIN`] and the given vectors.
pub fn program_prg(prg_banks: u8, program: &[u8], vectors: Vectors) -> Vec<u8> {
    let mut prg: Vec<u8> = (0..prg_banks as usize * 0x4000)
        .map(|i| (i % 251) as u8)
        .collect();
    let origin = prg.len() - 0x2000;
    prg[origin..origin + program.len()].copy_from_slice(program);
    let top = prg.len();
    for (offset, vector) in [(6, vectors.nmi), (4, vectors.reset), (2, vectors.irq)] {
        prg[top - offset..top - offset + 2].copy_from_slice(&vector.to_le_bytes());
    }
    prg
}

/// iNES image with vertical mirroring whose PRG runs `program` from reset.
pub fn program_image(mapper: u8, prg_banks: u8, chr_banks: u8, program: &[u8], vectors: Vectors) -> Vec<u8> {
    let prg = program_prg(prg_banks, program, vectors);
    let chr = vec![0; chr_banks as usize * 0x2000];
    ines(mapper, 0x01, &prg, &chr)
}

pub fn boot(image: &[u8]) -> Result<NesBus> {
    let cartridge = Cartridge::from_ines(image)?;
    Ok(NesBus::new(cartridge)?)
}

/// Collect every CPU trace line into a shared buffer.
pub fn capture_trace(nes: &mut NesBus) -> Rc<RefCell<Vec<String>>> {
    let lines = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&lines);
    nes.cpu_mut()
        .set_trace(Some(Box::new(move |line: &str| sink.borrow_mut().push(line.to_string()))));
    lines
}

pub fn run_frames(nes: &mut NesBus, frames: usize) {
    for _ in 0..frames {
        nes.run_frame();
    }
}
