use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::constants::{AUDIO_BUFFER_SIZE, DEFAULT_CYCLES_PER_FRAME, PLANE_COUNT, PROGRAM_START};
use crate::cpu::{Breakpoint, Cpu, Interrupt, Registers};
use crate::disassembly::Disassembly;
use crate::display::{Color, Display, Palette, PlaneBuffer};
use crate::error::Result;
use crate::events::Events;
use crate::instruction::{decode, extract_operands, invalid, LONG_LOAD};
use crate::memory::Memory;
use crate::quirks::{Profile, Quirk, Quirks};

/// # Chip-8
/// A CHIP-8 / SCHIP / XO-CHIP virtual machine.
///
/// Owns:
///  - the `Cpu` (registers, wait states, breakpoints)
///  - `Memory` (RAM, call stack, audio pattern)
///  - the two-plane `Display`
///  - a `Disassembly` of every instruction reached so far
///
/// Supplies interfaces for:
/// - loading, resetting and unloading roms
/// - pressing and releasing keys
/// - advancing the CPU a step or a frame at a time
/// - advancing its timers
/// - inspecting registers, planes, palette and audio state
pub struct Chip8 {
    pub(crate) cpu: Cpu,
    pub(crate) memory: Memory,
    pub(crate) display: Display,
    pub(crate) disassembly: Disassembly,
    pub(crate) rng: StdRng,
    rom: Vec<u8>,
    rom_path: Option<PathBuf>,
    profile: Profile,
    cycles_per_frame: u32,
    breakpoint_hit: Option<Breakpoint>,
}

impl Chip8 {
    pub fn new() -> Self {
        Chip8::with_rng(StdRng::from_entropy())
    }

    /// A machine whose CXNN results are reproducible
    pub fn with_seed(seed: u64) -> Self {
        Chip8::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Chip8 {
            cpu: Cpu::new(),
            memory: Memory::new(),
            display: Display::new(),
            disassembly: Disassembly::new(),
            rng,
            rom: Vec::new(),
            rom_path: None,
            profile: Profile::default(),
            cycles_per_frame: DEFAULT_CYCLES_PER_FRAME,
            breakpoint_hit: None,
        }
    }

    /// Routes stack underflows and rejected writes to `events`
    pub fn with_events(mut self, events: Box<dyn Events>) -> Self {
        self.memory.set_events(events);
        self
    }

    pub fn set_events(&mut self, events: Box<dyn Events>) {
        self.memory.set_events(events);
    }

    /// Load a rom from a file and start running it.
    /// The path is remembered for FX75/FX85 flag files.
    pub fn load_rom<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        self.load(&mut file)?;
        self.rom_path = Some(path.to_path_buf());
        debug!("running {}", path.display());
        Ok(())
    }

    /// Load a rom image that has no file behind it, e.g. assembler output
    pub fn load_rom_bytes(&mut self, rom: &[u8]) -> Result<()> {
        self.load(&mut &rom[..])?;
        self.rom_path = None;
        Ok(())
    }

    fn load(&mut self, reader: &mut dyn Read) -> Result<()> {
        self.memory.load_rom(reader)?;
        let start = PROGRAM_START as usize;
        self.rom = self.memory.ram()[start..start + self.memory.rom_size()].to_vec();
        self.restart();
        self.cpu.set_halted(false);
        Ok(())
    }

    /// Returns to the freshly loaded state of the current rom, halted
    pub fn reset(&mut self) {
        if let Err(err) = self.memory.load_rom(&mut &self.rom[..]) {
            warn!("unable to reload rom: {}", err);
            self.memory.reset();
        }
        self.restart();
    }

    /// Forgets the current rom entirely
    pub fn unload(&mut self) {
        self.rom.clear();
        self.rom_path = None;
        self.memory.reset();
        self.restart();
    }

    fn restart(&mut self) {
        self.cpu.reset();
        self.display.reset();
        self.disassembly.clear();
        self.breakpoint_hit = None;
        self.cpu.registers.quirks = self.profile.quirks();
    }

    pub fn rom_path(&self) -> Option<&Path> {
        self.rom_path.as_deref()
    }

    /// Runs `cycles` instructions unless halted or waiting for a key.
    /// An enabled breakpoint reached along the way halts the machine.
    pub fn tick(&mut self, cycles: u32) {
        if self.cpu.halted() || self.cpu.waiting_for_key() {
            return;
        }

        for _ in 0..cycles {
            let addr = self.cpu.registers.pc;
            self.step();
            if self.cpu.halted() || self.cpu.waiting_for_key() {
                break;
            }
            // A draw held back for vblank has not left its address yet
            let held = self.cpu.interrupt != Interrupt::Idle && self.cpu.registers.pc == addr;
            if held {
                continue;
            }
            if let Some(breakpoint) = self.cpu.breakpoint_hit().cloned() {
                self.set_halted(true);
                self.breakpoint_hit = Some(breakpoint);
                break;
            }
        }

        if self.cpu.interrupt == Interrupt::Pending {
            self.cpu.interrupt = Interrupt::Ready;
        }
    }

    /// One tick of `cycles_per_frame` instructions
    pub fn frame(&mut self) {
        self.tick(self.cycles_per_frame);
    }

    /// Fetches, decodes and executes the instruction at the pc.
    /// Runs even while halted so a debugger can step; does nothing while
    /// waiting for a key.
    pub fn step(&mut self) {
        if self.cpu.waiting_for_key() {
            return;
        }

        self.disassembly
            .disassemble_next(&self.memory, self.cpu.registers.pc);

        let addr = self.cpu.registers.pc;
        let op = self.fetch();
        let instruction = match decode(op) {
            Some(instruction) => instruction,
            None => {
                warn!("Invalid opcode at 0x{:04X}: 0x{:04X}", addr, op);
                invalid()
            }
        };

        let operands = extract_operands(op, instruction, &self.memory, self.cpu.registers.pc);
        if instruction.code == LONG_LOAD {
            self.cpu.registers.pc = self.cpu.registers.pc.wrapping_add(2);
        }

        trace!("{:04X}: {:04X} {}", addr, op, instruction.encoding);
        (instruction.handler)(self, &operands);
        self.cpu.cycles += 1;
    }

    /// Reads the word at the pc into the latch and moves past it
    fn fetch(&mut self) -> u16 {
        let pc = self.cpu.registers.pc;
        let high = u16::from(self.memory.read(pc));
        let low = u16::from(self.memory.read(pc.wrapping_add(1)));
        self.cpu.registers.latch = high << 8 | low;
        self.cpu.registers.pc = pc.wrapping_add(2);
        self.cpu.registers.latch
    }

    /// Moves past the next instruction if `condition` holds.
    /// A skipped `F000 NNNN` is four bytes long.
    pub(crate) fn skip_if(&mut self, condition: bool) {
        if !condition {
            return;
        }
        let pc = self.cpu.registers.pc;
        let next =
            u16::from(self.memory.read(pc)) << 8 | u16::from(self.memory.read(pc.wrapping_add(1)));
        let size = if next == LONG_LOAD { 4 } else { 2 };
        self.cpu.registers.pc = pc.wrapping_add(size);
    }

    /// Decrements the delay and sound timers; call at 60Hz
    pub fn tick_timers(&mut self) {
        self.cpu.tick_timers();
    }

    pub fn halted(&self) -> bool {
        self.cpu.halted()
    }

    pub fn set_halted(&mut self, halted: bool) {
        debug!("{}", if halted { "halted" } else { "resumed" });
        self.cpu.set_halted(halted);
        if !halted {
            self.breakpoint_hit = None;
        }
    }

    /// True while a rom is loaded and not halted
    pub fn running(&self) -> bool {
        !self.rom.is_empty() && !self.cpu.halted()
    }

    pub fn waiting_for_key(&self) -> bool {
        self.cpu.waiting_for_key()
    }

    pub fn cycles_per_frame(&self) -> u32 {
        self.cycles_per_frame
    }

    pub fn set_cycles_per_frame(&mut self, cycles: u32) {
        self.cycles_per_frame = cycles;
    }

    /// Switches resolution, blanking both planes whatever the plane mask
    pub fn set_high_res(&mut self, high_res: bool) {
        self.display.set_high_res(high_res);
        let mask = self.display.plane_mask();
        self.display.set_plane_mask(0x3);
        self.display.clear();
        self.display.set_plane_mask(mask);
    }

    pub fn high_res(&self) -> bool {
        self.display.high_res()
    }

    pub fn set_key_state(&mut self, key: u8, pressed: bool) {
        self.cpu.set_key_state(key, pressed);
    }

    pub fn key_pressed(&mut self, key: u8) {
        self.cpu.key_pressed(key);
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Replaces every quirk with the profile's set
    pub fn set_profile(&mut self, profile: Profile) {
        debug!("profile {:?}", profile);
        self.profile = profile;
        self.cpu.registers.quirks = profile.quirks();
    }

    pub fn quirks(&self) -> Quirks {
        self.cpu.registers.quirks
    }

    pub fn set_quirks(&mut self, quirks: &[Quirk], set: bool) {
        self.cpu.set_quirks(quirks, set);
    }

    pub fn registers(&self) -> &Registers {
        &self.cpu.registers
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        self.cpu.breakpoints()
    }

    pub fn add_breakpoint(&mut self, label: &str, addr: u16) {
        self.cpu.add_breakpoint(Breakpoint {
            label: label.to_string(),
            addr,
            enabled: true,
        });
    }

    pub fn toggle_breakpoint(&mut self, label: &str) {
        self.cpu.toggle_breakpoint(label);
    }

    pub fn remove_breakpoint(&mut self, label: &str) {
        self.cpu.remove_breakpoint(label);
    }

    pub fn clear_breakpoints(&mut self) {
        self.cpu.clear_breakpoints();
    }

    /// The breakpoint that last halted `tick`, until execution resumes
    pub fn breakpoint_hit(&self) -> Option<&Breakpoint> {
        self.breakpoint_hit.as_ref()
    }

    /// Every instruction reached since the last reset, with current indexes
    pub fn disassembly(&mut self) -> &Disassembly {
        self.disassembly.renumber();
        &self.disassembly
    }

    pub fn palette(&self) -> &Palette {
        self.display.palette()
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.display.set_palette(palette);
    }

    pub fn set_color(&mut self, index: usize, color: Color) {
        self.display.set_color(index, color);
    }

    pub fn buffers(&self) -> &[PlaneBuffer; PLANE_COUNT] {
        self.display.buffers()
    }

    pub fn audio_buffer(&self) -> &[u8; AUDIO_BUFFER_SIZE] {
        self.memory.audio_buffer()
    }

    pub fn pitch(&self) -> f64 {
        self.cpu.registers.pitch
    }

    /// False once the rom supplies its own audio pattern or pitch
    pub fn use_beep_buffer(&self) -> bool {
        self.memory.use_beep()
    }

    /// True once after FX3A has changed the pitch
    pub fn take_pitch_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.cpu.pitch_dirty, false)
    }

    /// Whether the sound timer is running
    pub fn sound_active(&self) -> bool {
        self.cpu.registers.sound_timer > 0
    }

    fn flags_path(&self) -> Option<PathBuf> {
        self.rom_path.as_ref().map(|path| {
            let mut flags = path.clone().into_os_string();
            flags.push(".flags");
            PathBuf::from(flags)
        })
    }

    /// Writes v0..=vX to the rom's flag file, padded to 16 bytes
    pub(crate) fn save_flags(&mut self, x: usize) {
        let path = match self.flags_path() {
            Some(path) => path,
            None => {
                warn!("no rom path to save flags against");
                return;
            }
        };

        let mut flags = [0u8; 16];
        flags[..=x].copy_from_slice(&self.cpu.registers.v[..=x]);
        if let Err(err) = fs::write(&path, flags) {
            warn!("unable to save flags to {}: {}", path.display(), err);
        }
    }

    /// Reads v0..=vX from the rom's flag file; zeroes every register on failure
    pub(crate) fn load_flags(&mut self, x: usize) {
        let path = match self.flags_path() {
            Some(path) => path,
            None => {
                warn!("no rom path to load flags from");
                self.cpu.registers.v = [0; 16];
                return;
            }
        };

        match fs::read(&path) {
            Ok(flags) => {
                for (r, register) in self.cpu.registers.v[..=x].iter_mut().enumerate() {
                    *register = flags.get(r).copied().unwrap_or(0);
                }
            }
            Err(err) => {
                warn!("unable to load flags from {}: {}", path.display(), err);
                self.cpu.registers.v = [0; 16];
            }
        }
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}
