//! Memory bus and master clock for the NES.
//!
//! [`NesBus`] owns every chip and is the only place that knows the address maps. Chips never
//! hold a reference back to it: for each access the bus lends the CPU a [`CpuView`] and the PPU a
//! [`PpuView`], each built from disjoint borrows of its own fields.
//!
//! CPU map ([CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map)):
//!
//! | Range         | Target                                   |
//! |---------------|------------------------------------------|
//! | $0000–$1FFF   | 2 KiB RAM, mirrored 4×                   |
//! | $2000–$3FFF   | PPU registers, mirrored every 8 bytes    |
//! | $4000–$4017   | APU, OAM DMA, controllers                |
//! | $4018–$5FFF   | unmapped, reads 0                        |
//! | $6000–$FFFF   | cartridge                                |

use std::io::{Read, Write};

use tracing::{debug, info};

use crate::apu::apu::APU;
use crate::cartridge::mapper::{Board, Mapper, Mirroring};
use crate::cartridge::Cartridge;
use crate::config::Config;
use crate::controller::Controller;
use crate::cpu::cpu::CPU;
use crate::error::{Result, StateError};
use crate::ppu::ppu::{OAM_LEN, PPU};
use crate::state::{STATE_VERSION, Snapshot, restore_block};

/// CPU work RAM.
pub const RAM_SIZE: usize = 2048;
/// Nametable RAM inside the console; the cartridge decides how the four tables share it.
pub const VRAM_SIZE: usize = 2048;

/// CPU stall for an OAM DMA, plus one when it starts on an odd cycle.
const OAM_DMA_CYCLES: u32 = 513;
/// CPU stall for a DMC sample fetch.
const DMC_FETCH_CYCLES: u32 = 4;

/// Memory access used by the CPU.
pub trait Bus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);
}

/// The PPU's view of its $0000–$3EFF address space (pattern tables and nametables).
pub trait PpuBus {
    fn ppu_read(&mut self, addr: u16) -> u8;
    fn ppu_write(&mut self, addr: u16, data: u8);
    /// Scanline boundary; drives the MMC3 IRQ counter.
    fn scanline(&mut self);
}

/// Offset into nametable RAM for a PPU address in $2000–$3EFF.
pub fn nametable_index(mirroring: Mirroring, addr: u16) -> usize {
    let addr = (addr & 0x0FFF) as usize;
    let table = addr / 0x400;
    let base = match (mirroring, table) {
        (Mirroring::Vertical, 0 | 2) => 0,
        (Mirroring::Vertical, _) => 0x400,
        (Mirroring::Horizontal, 0 | 1) => 0,
        (Mirroring::Horizontal, _) => 0x400,
        (Mirroring::OneScreenLo, _) => 0,
        (Mirroring::OneScreenHi, _) => 0x400,
    };
    base + (addr & 0x3FF)
}

/// Cartridge CHR and nametable RAM, lent to the PPU.
pub struct PpuView<'a> {
    board: &'a mut Board,
    vram: &'a mut [u8; VRAM_SIZE],
}

impl PpuBus for PpuView<'_> {
    fn ppu_read(&mut self, addr: u16) -> u8 {
        match addr & 0x3FFF {
            addr @ 0x0000..=0x1FFF => self.board.ppu_read(addr),
            addr => self.vram[nametable_index(self.board.mirroring(), addr)],
        }
    }

    fn ppu_write(&mut self, addr: u16, data: u8) {
        match addr & 0x3FFF {
            addr @ 0x0000..=0x1FFF => self.board.ppu_write(addr, data),
            addr => self.vram[nametable_index(self.board.mirroring(), addr)] = data,
        }
    }

    fn scanline(&mut self) {
        self.board.scanline();
    }
}

/// Everything on the CPU side of the bus, lent to the CPU for one cycle.
pub struct CpuView<'a> {
    ram: &'a mut [u8; RAM_SIZE],
    ppu: &'a mut PPU,
    apu: &'a mut APU,
    board: &'a mut Board,
    vram: &'a mut [u8; VRAM_SIZE],
    controllers: &'a mut [Controller; 2],
    dma_page: &'a mut Option<u8>,
}

impl Bus for CpuView<'_> {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            // Internal RAM (mirrored 4x in 0x0000-0x1FFF)
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],
            // PPU registers $2000-$3FFF (mirrored every 8 bytes)
            0x2000..=0x3FFF => {
                let mut view = PpuView {
                    board: &mut *self.board,
                    vram: &mut *self.vram,
                };
                self.ppu.cpu_read(addr & 0x2007, &mut view)
            }
            0x4015 => self.apu.read_status(),
            // Upper bits are open bus; most games only look at bit 0.
            0x4016 => self.controllers[0].read() | 0x40,
            0x4017 => self.controllers[1].read() | 0x40,
            // Write-only APU registers, test registers and expansion space
            0x4000..=0x5FFF => 0,
            0x6000..=0xFFFF => self.board.cpu_read(addr),
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize] = data,
            0x2000..=0x3FFF => {
                let mut view = PpuView {
                    board: &mut *self.board,
                    vram: &mut *self.vram,
                };
                self.ppu.cpu_write(addr & 0x2007, data, &mut view);
            }
            0x4014 => *self.dma_page = Some(data),
            0x4016 => {
                for pad in self.controllers.iter_mut() {
                    pad.write(data);
                }
            }
            0x4000..=0x4013 | 0x4015 | 0x4017 => self.apu.write(addr, data),
            0x4018..=0x5FFF => {}
            0x6000..=0xFFFF => self.board.cpu_write(addr, data),
        }
    }
}

/// The console: CPU, PPU, APU, cartridge board, RAM and controllers, clocked together.
pub struct NesBus {
    cpu: CPU,
    ppu: PPU,
    apu: APU,
    board: Board,
    ram: [u8; RAM_SIZE],
    vram: [u8; VRAM_SIZE],
    controllers: [Controller; 2],
    config: Config,
    /// PPU dots since power-up.
    system_clock: u64,
    /// Page written to $4014, copied to OAM after the current CPU cycle.
    dma_page: Option<u8>,
}

impl NesBus {
    /// Power up a console with `cartridge` inserted and the default [`Config`].
    pub fn new(cartridge: Cartridge) -> Result<Self> {
        Self::with_config(cartridge, Config::default())
    }

    pub fn with_config(cartridge: Cartridge, config: Config) -> Result<Self> {
        let board = Board::new(cartridge)?;
        let mut bus = Self {
            cpu: CPU::new(),
            ppu: PPU::new(config.sprite_limit),
            apu: APU::new(config.sample_rate),
            board,
            ram: [0; RAM_SIZE],
            vram: [0; VRAM_SIZE],
            controllers: Default::default(),
            config,
            system_clock: 0,
            dma_page: None,
        };
        bus.power_up();
        Ok(bus)
    }

    /// Swap cartridges and power-cycle. On error the old cartridge stays in.
    pub fn insert(&mut self, cartridge: Cartridge) -> Result<()> {
        self.board = Board::new(cartridge)?;
        debug!(mapper = self.board.mapper_num(), "cartridge inserted");
        self.power_up();
        Ok(())
    }

    /// Cold boot: clears RAM and nametables, then resets every chip.
    pub fn power_up(&mut self) {
        self.ram.fill(0);
        self.vram.fill(0);
        self.controllers = Default::default();
        self.board.reset();
        self.ppu.power_up();
        self.apu.reset();
        self.dma_page = None;
        self.system_clock = 0;
        let (cpu, mut view) = self.split_cpu();
        cpu.reset(&mut view);
        info!(
            mapper = self.board.mapper_num(),
            pc = self.cpu.pc,
            "power up"
        );
    }

    /// Reset button: chips and mapper registers return to their reset state, memory is kept.
    pub fn reset(&mut self) {
        self.board.reset();
        self.ppu.reset();
        self.apu.reset();
        self.dma_page = None;
        let (cpu, mut view) = self.split_cpu();
        cpu.reset(&mut view);
        debug!(pc = self.cpu.pc, "reset");
    }

    fn split_cpu(&mut self) -> (&mut CPU, CpuView<'_>) {
        (
            &mut self.cpu,
            CpuView {
                ram: &mut self.ram,
                ppu: &mut self.ppu,
                apu: &mut self.apu,
                board: &mut self.board,
                vram: &mut self.vram,
                controllers: &mut self.controllers,
                dma_page: &mut self.dma_page,
            },
        )
    }

    fn split_ppu(&mut self) -> (&mut PPU, PpuView<'_>) {
        (
            &mut self.ppu,
            PpuView {
                board: &mut self.board,
                vram: &mut self.vram,
            },
        )
    }

    /// Advance one PPU dot. Every third dot also clocks the CPU and the APU.
    pub fn clock(&mut self) {
        let (ppu, mut view) = self.split_ppu();
        ppu.clock(&mut view);

        if self.system_clock % 3 == 0 {
            self.cpu
                .set_irq(self.board.irq_state() || self.apu.irq_pending());
            let (cpu, mut view) = self.split_cpu();
            cpu.clock(&mut view);
            self.apu.clock();
            self.service_dma();
        }

        if self.ppu.take_nmi() {
            self.cpu.set_nmi();
        }

        self.system_clock += 1;
    }

    /// OAM DMA requested through $4014 and DMC sample fetches, both of which halt the CPU.
    fn service_dma(&mut self) {
        if let Some(page) = self.dma_page.take() {
            let base = (page as u16) << 8;
            let mut data = [0u8; OAM_LEN];
            let (_, mut view) = self.split_cpu();
            for (offset, byte) in data.iter_mut().enumerate() {
                *byte = view.read(base | offset as u16);
            }
            self.ppu.write_oam_dma(&data);
            let odd = self.cpu.total_cycles() % 2 == 1;
            self.cpu.stall(OAM_DMA_CYCLES + odd as u32);
        }

        if let Some(addr) = self.apu.dmc_fetch_address() {
            let byte = self.board.cpu_read(addr);
            self.apu.dmc_feed_byte(byte);
            self.cpu.stall(DMC_FETCH_CYCLES);
        }
    }

    /// Clock until the PPU finishes the current frame.
    pub fn run_frame(&mut self) {
        loop {
            self.clock();
            if self.ppu.is_frame_complete() {
                break;
            }
        }
    }

    /// Read the CPU address space with the same side effects a CPU read has.
    pub fn cpu_read(&mut self, addr: u16) -> u8 {
        let (_, mut view) = self.split_cpu();
        view.read(addr)
    }

    pub fn cpu_write(&mut self, addr: u16, data: u8) {
        let (_, mut view) = self.split_cpu();
        view.write(addr, data);
    }

    /// Little-endian word at `addr`.
    pub fn cpu_read16(&mut self, addr: u16) -> u16 {
        let lo = self.cpu_read(addr) as u16;
        let hi = self.cpu_read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    pub fn cpu(&self) -> &CPU {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut CPU {
        &mut self.cpu
    }

    pub fn ppu(&self) -> &PPU {
        &self.ppu
    }

    pub fn apu(&self) -> &APU {
        &self.apu
    }

    pub fn apu_mut(&mut self) -> &mut APU {
        &mut self.apu
    }

    pub fn controller1(&mut self) -> &mut Controller {
        &mut self.controllers[0]
    }

    pub fn controller2(&mut self) -> &mut Controller {
        &mut self.controllers[1]
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn mapper_num(&self) -> u8 {
        self.board.mapper_num()
    }

    /// PPU dots since power-up.
    pub fn system_clock(&self) -> u64 {
        self.system_clock
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: STATE_VERSION,
            mapper: self.board.mapper_num(),
            cpu: self.cpu.save_state(),
            ppu: self.ppu.save_state(),
            apu: self.apu.save_state(),
            board: self.board.save_state(),
            ram: self.ram.to_vec(),
            vram: self.vram.to_vec(),
            controllers: self.controllers.clone(),
            system_clock: self.system_clock,
            dma_page: self.dma_page,
        }
    }

    /// Write a save state. The cartridge ROM and the frame buffer are not included.
    pub fn serialize(&self, writer: impl Write) -> Result<(), StateError> {
        self.snapshot().encode(writer)?;
        debug!(clock = self.system_clock, "save state written");
        Ok(())
    }

    /// Restore a save state written by [`serialize`](Self::serialize) for the same board. On any
    /// error the console is left as it was.
    pub fn deserialize(&mut self, reader: impl Read) -> Result<(), StateError> {
        let snapshot = Snapshot::decode(reader)?;
        if snapshot.mapper != self.board.mapper_num() {
            return Err(StateError::MapperMismatch {
                expected: self.board.mapper_num(),
                found: snapshot.mapper,
            });
        }

        let backup = self.snapshot();
        if let Err(err) = self.restore(&snapshot) {
            self.restore(&backup)?;
            return Err(err);
        }
        debug!(clock = self.system_clock, "save state restored");
        Ok(())
    }

    fn restore(&mut self, snapshot: &Snapshot) -> Result<(), StateError> {
        restore_block(&mut self.ram, &snapshot.ram, "CPU RAM size")?;
        restore_block(&mut self.vram, &snapshot.vram, "nametable RAM size")?;
        self.board.load_state(&snapshot.board)?;
        self.ppu.load_state(&snapshot.ppu)?;
        self.cpu.load_state(&snapshot.cpu);
        self.apu.load_state(&snapshot.apu);
        self.controllers = snapshot.controllers.clone();
        self.system_clock = snapshot.system_clock;
        self.dma_page = snapshot.dma_page;
        Ok(())
    }

    /// PRG RAM at $6000–$7FFF, for persisting battery saves.
    pub fn battery_ram(&self) -> &[u8] {
        self.board.prg_ram()
    }

    pub fn load_battery_ram(&mut self, data: &[u8]) -> Result<(), StateError> {
        restore_block(self.board.prg_ram_mut(), data, "battery RAM size")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::cartridge::{CHR_BANK_SIZE, PRG_BANK_SIZE};

    /// 32 KiB NROM whose reset vector points at an endless `JMP $8000`.
    fn test_bus(mapper: u8) -> NesBus {
        let mut prg = vec![0xEA; 2 * PRG_BANK_SIZE];
        prg[..3].copy_from_slice(&[0x4C, 0x00, 0x80]);
        prg[0x7FFC] = 0x00;
        prg[0x7FFD] = 0x80;
        let chr = if mapper == 0 { vec![0; CHR_BANK_SIZE] } else { Vec::new() };
        let chr_banks = if mapper == 0 { 1 } else { 0 };
        let cart = Cartridge::new(mapper, Mirroring::Vertical, 2, chr_banks, prg, chr).unwrap();
        NesBus::new(cart).unwrap()
    }

    #[test]
    fn power_up_loads_reset_vector() {
        let bus = test_bus(0);
        assert_eq!(bus.cpu().pc, 0x8000);
        assert_eq!(bus.system_clock(), 0);
    }

    #[test]
    fn ram_is_mirrored() {
        let mut bus = test_bus(0);
        bus.cpu_write(0x0001, 0xAB);
        assert_eq!(bus.cpu_read(0x0801), 0xAB);
        assert_eq!(bus.cpu_read(0x1801), 0xAB);
        bus.cpu_write(0x17FF, 0xCD);
        assert_eq!(bus.cpu_read(0x07FF), 0xCD);
    }

    #[test]
    fn unmapped_ranges_read_zero() {
        let mut bus = test_bus(0);
        assert_eq!(bus.cpu_read(0x4018), 0);
        assert_eq!(bus.cpu_read(0x401F), 0);
        assert_eq!(bus.cpu_read(0x5000), 0);
        bus.cpu_write(0x5000, 0xFF);
        assert_eq!(bus.cpu_read(0x5000), 0);
    }

    #[test]
    fn reads_word_little_endian() {
        let mut bus = test_bus(0);
        assert_eq!(bus.cpu_read16(0xFFFC), 0x8000);
        assert_eq!(bus.cpu_read16(0x8001), 0x8000);
    }

    #[test]
    fn controller_ports_set_open_bus_bit() {
        let mut bus = test_bus(0);
        bus.controller1().press(crate::controller::Button::A);
        bus.controller2().press(crate::controller::Button::B);
        bus.cpu_write(0x4016, 1);
        bus.cpu_write(0x4016, 0);

        assert_eq!(bus.cpu_read(0x4016), 0x41);
        assert_eq!(bus.cpu_read(0x4016), 0x40);
        assert_eq!(bus.cpu_read(0x4017), 0x40);
        assert_eq!(bus.cpu_read(0x4017), 0x41);
    }

    #[test]
    fn nametable_mirroring_modes() {
        use Mirroring::*;
        let tables = [0x2000, 0x2400, 0x2800, 0x2C00];
        let base = |m| tables.map(|a| nametable_index(m, a + 5));

        assert_eq!(base(Vertical), [5, 0x405, 5, 0x405]);
        assert_eq!(base(Horizontal), [5, 5, 0x405, 0x405]);
        assert_eq!(base(OneScreenLo), [5; 4]);
        assert_eq!(base(OneScreenHi), [0x405; 4]);
        // $3000-$3EFF mirrors $2000-$2EFF.
        assert_eq!(nametable_index(Vertical, 0x3405), 0x405);
    }

    #[test]
    fn ppu_registers_mirror_every_eight_bytes() {
        let mut bus = test_bus(0);
        bus.cpu_write(0x3FFE, 0x29); // $2006 high
        bus.cpu_write(0x2006, 0x00);
        bus.cpu_write(0x200F, 0x55); // $2007

        // Vertical mirroring: $2900 is $2100.
        bus.cpu_write(0x2006, 0x21);
        bus.cpu_write(0x2006, 0x00);
        bus.cpu_read(0x2007);
        assert_eq!(bus.cpu_read(0x2007), 0x55);
    }

    #[test]
    fn oam_dma_copies_page_and_stalls() {
        let mut bus = test_bus(0);
        for i in 0..256u16 {
            bus.cpu_write(0x0200 + i, i as u8);
        }
        let before = bus.cpu().total_cycles();

        bus.cpu_write(0x4014, 0x02);
        bus.clock();

        assert_eq!(bus.ppu().oam()[0x10], 0x10);
        assert_eq!(bus.ppu().oam()[0xFF], 0xFF);
        assert!(bus.cpu().total_cycles() - before >= 513);
    }

    #[test]
    fn dmc_fetch_reads_cartridge() {
        let mut bus = test_bus(0);
        bus.cpu_write(0x4010, 0x80);
        bus.cpu_write(0x4012, 0x00);
        bus.cpu_write(0x4013, 0x00);
        bus.cpu_write(0x4015, 0x10);
        assert_eq!(bus.apu().dmc_fetch_address(), Some(0xC000));
        let before = bus.cpu().total_cycles();

        bus.clock();

        assert_eq!(bus.apu().dmc_fetch_address(), None);
        assert!(bus.apu().irq_pending());
        assert!(bus.cpu().total_cycles() - before >= 4);
    }

    #[test]
    fn servicing_an_interrupt_leaves_the_mapper_irq_to_the_mapper() {
        let mut bus = test_bus(4);
        bus.cpu_write(0x4017, 0x40);
        bus.cpu_write(0xC000, 0); // latch 0: every scanline raises the IRQ
        bus.cpu_write(0xC001, 0);
        bus.cpu_write(0xE001, 0);
        bus.board.scanline();
        assert!(bus.board.irq_state());

        bus.cpu_mut().status.remove(crate::cpu::flags::Status::INTERRUPT);
        for _ in 0..30 {
            bus.clock();
        }
        assert!(bus.cpu().status.contains(crate::cpu::flags::Status::INTERRUPT));
        assert!(bus.board.irq_state(), "taking the interrupt does not acknowledge it");

        bus.cpu_write(0xE000, 0);
        assert!(!bus.board.irq_state());
    }

    #[test]
    fn frames_are_89342_dots() {
        let mut bus = test_bus(0);
        bus.run_frame();
        let first = bus.system_clock();
        bus.run_frame();
        assert_eq!(bus.system_clock() - first, 89_342);
        assert_eq!(bus.ppu().frame_count(), 2);
    }

    #[test]
    fn state_for_another_mapper_is_rejected() {
        let mut nrom = test_bus(0);
        nrom.cpu_write(0x0000, 0x77);
        let mut state = Vec::new();
        nrom.serialize(&mut state).unwrap();

        let mut uxrom = test_bus(2);
        let err = uxrom.deserialize(state.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            StateError::MapperMismatch { expected: 2, found: 0 }
        ));
        assert_eq!(uxrom.cpu_read(0x0000), 0);
    }

    #[test]
    fn battery_ram_round_trips() {
        let mut bus = test_bus(0);
        bus.cpu_write(0x6000, 0x42);
        let saved = bus.battery_ram().to_vec();

        let mut other = test_bus(0);
        other.load_battery_ram(&saved).unwrap();
        assert_eq!(other.cpu_read(0x6000), 0x42);
        assert!(other.load_battery_ram(&[0; 16]).is_err());
    }
}
