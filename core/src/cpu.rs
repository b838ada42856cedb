use log::debug;

use crate::constants::{DEFAULT_PITCH, PROGRAM_START};
use crate::quirks::{Quirk, Quirks};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    pub label: String,
    pub addr: u16,
    pub enabled: bool,
}

/// # Registers
/// - (v) 16 primary 8-bit registers (V0..VF)
///     - the first 15 (V0..VE) are general purpose registers
///     - the 16th (VF) is the carry, borrow and collision flag
/// - (i) a 16-bit index register
/// - (pc) a 16-bit program counter
/// - (latch) the last word fetched
/// - 2 8-bit timers (delay & sound), decremented by `tick_timers`
/// - the audio pattern playback pitch in Hz
/// - the pressed status of keys 0..F
/// - the active quirks and the breakpoint list
#[derive(Debug, Clone, PartialEq)]
pub struct Registers {
    pub v: [u8; 16],
    pub pc: u16,
    pub latch: u16,
    pub i: u16,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub pitch: f64,
    pub keys: [bool; 16],
    pub quirks: Quirks,
    pub breakpoints: Vec<Breakpoint>,
}

impl Registers {
    pub fn new() -> Self {
        Registers {
            v: [0; 16],
            pc: PROGRAM_START,
            latch: 0,
            i: 0,
            delay_timer: 0,
            sound_timer: 0,
            pitch: DEFAULT_PITCH,
            keys: [false; 16],
            quirks: Quirks::empty(),
            breakpoints: Vec::new(),
        }
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress of a VBlank-synchronised sprite draw.
/// `Chip8::tick` moves `Pending` to `Ready` once its batch completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Idle,
    Pending,
    Ready,
}

/// # CPU
/// The register file plus the execution state around it:
/// - `halted` an explicit pause; nothing runs until it is cleared
/// - `register_needing_key` set by FX0A; execution waits for `key_pressed`
/// - `interrupt` the VBlank wait used by DXYN when that quirk is active
#[derive(Debug, Clone)]
pub struct Cpu {
    pub registers: Registers,
    pub(crate) halted: bool,
    pub(crate) register_needing_key: Option<u8>,
    pub(crate) interrupt: Interrupt,
    pub(crate) pitch_dirty: bool,
    pub(crate) cycles: u64,
}

impl Cpu {
    pub fn new() -> Self {
        Cpu {
            registers: Registers::new(),
            halted: true,
            register_needing_key: None,
            interrupt: Interrupt::Idle,
            pitch_dirty: false,
            cycles: 0,
        }
    }

    /// Restores power-on state. Quirks are cleared; breakpoints survive.
    pub fn reset(&mut self) {
        let breakpoints = std::mem::take(&mut self.registers.breakpoints);
        self.registers = Registers {
            breakpoints,
            ..Registers::new()
        };
        self.halted = true;
        self.register_needing_key = None;
        self.interrupt = Interrupt::Idle;
        self.pitch_dirty = false;
        self.cycles = 0;
    }

    pub fn halted(&self) -> bool {
        self.halted
    }

    /// Pausing or resuming always abandons any key or VBlank wait
    pub fn set_halted(&mut self, halted: bool) {
        self.halted = halted;
        self.register_needing_key = None;
        self.interrupt = Interrupt::Idle;
    }

    pub fn waiting_for_key(&self) -> bool {
        self.register_needing_key.is_some()
    }

    /// Instructions executed since the last reset
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Decrements both timers towards zero
    pub fn tick_timers(&mut self) {
        if self.registers.sound_timer > 0 {
            self.registers.sound_timer -= 1;
        }
        if self.registers.delay_timer > 0 {
            self.registers.delay_timer -= 1;
        }
    }

    /// Set the pressed status of a key
    ///
    /// # Arguments
    /// * `key` the key index; only the low nibble is used
    /// * `pressed` whether it is held down
    pub fn set_key_state(&mut self, key: u8, pressed: bool) {
        self.registers.keys[(key & 0xF) as usize] = pressed;
    }

    /// A key was pressed and released; resolves a pending FX0A
    pub fn key_pressed(&mut self, key: u8) {
        if let Some(register) = self.register_needing_key.take() {
            self.registers.v[register as usize] = key;
        }
    }

    pub fn quirk_set(&self, quirk: Quirks) -> bool {
        self.registers.quirks.contains(quirk)
    }

    pub fn set_quirks(&mut self, quirks: &[Quirk], set: bool) {
        for quirk in quirks {
            self.registers.quirks.set(quirk.flag(), set);
        }
    }

    /// True while a VBlank-synchronised draw must keep waiting.
    /// The caller rewinds the program counter so the draw is retried.
    pub(crate) fn wait_for_interrupt(&mut self) -> bool {
        if !self.quirk_set(Quirks::VBLANK) {
            return false;
        }
        match self.interrupt {
            Interrupt::Idle => {
                self.interrupt = Interrupt::Pending;
                true
            }
            Interrupt::Pending => true,
            Interrupt::Ready => {
                self.interrupt = Interrupt::Idle;
                false
            }
        }
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.registers.breakpoints
    }

    pub fn add_breakpoint(&mut self, breakpoint: Breakpoint) {
        self.registers.breakpoints.push(breakpoint);
    }

    /// Flips the first breakpoint carrying `label`
    pub fn toggle_breakpoint(&mut self, label: &str) {
        if let Some(bp) = self
            .registers
            .breakpoints
            .iter_mut()
            .find(|bp| bp.label == label)
        {
            bp.enabled = !bp.enabled;
        }
    }

    /// Drops every breakpoint carrying `label`
    pub fn remove_breakpoint(&mut self, label: &str) {
        self.registers.breakpoints.retain(|bp| bp.label != label);
    }

    pub fn clear_breakpoints(&mut self) {
        self.registers.breakpoints.clear();
    }

    /// The enabled breakpoint at the current program counter, if any
    pub fn breakpoint_hit(&self) -> Option<&Breakpoint> {
        let pc = self.registers.pc;
        let hit = self
            .registers
            .breakpoints
            .iter()
            .find(|bp| bp.enabled && bp.addr == pc);
        if let Some(bp) = hit {
            debug!("breakpoint {} hit at 0x{:04X}", bp.label, pc);
        }
        hit
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breakpoint(label: &str, addr: u16) -> Breakpoint {
        Breakpoint {
            label: label.to_string(),
            addr,
            enabled: true,
        }
    }

    #[test]
    fn test_new_cpu_is_halted_at_0x200() {
        let cpu = Cpu::new();
        assert!(cpu.halted());
        assert_eq!(cpu.registers.pc, 0x200);
        assert_eq!(cpu.registers.pitch, 4000.0);
    }

    #[test]
    fn test_timers_stop_at_zero() {
        let mut cpu = Cpu::new();
        cpu.registers.delay_timer = 1;
        cpu.registers.sound_timer = 2;
        cpu.tick_timers();
        cpu.tick_timers();
        cpu.tick_timers();
        assert_eq!(cpu.registers.delay_timer, 0);
        assert_eq!(cpu.registers.sound_timer, 0);
    }

    #[test]
    fn test_captures_key_presses() {
        let mut cpu = Cpu::new();
        cpu.register_needing_key = Some(0x1);
        cpu.key_pressed(0xE);
        assert_eq!(cpu.register_needing_key, None);
        assert_eq!(cpu.registers.v[0x1], 0xE);
    }

    #[test]
    fn test_key_press_without_wait_leaves_registers() {
        let mut cpu = Cpu::new();
        cpu.key_pressed(0xE);
        assert_eq!(cpu.registers.v, [0; 16]);
    }

    #[test]
    fn test_key_state_masks_index() {
        let mut cpu = Cpu::new();
        cpu.set_key_state(0x13, true);
        assert!(cpu.registers.keys[0x3]);
    }

    #[test]
    fn test_set_quirks() {
        let mut cpu = Cpu::new();
        cpu.set_quirks(&[Quirk::Shift, Quirk::Clip], true);
        assert!(cpu.quirk_set(Quirks::SHIFT | Quirks::CLIP));
        cpu.set_quirks(&[Quirk::Shift], false);
        assert!(!cpu.quirk_set(Quirks::SHIFT));
        assert!(cpu.quirk_set(Quirks::CLIP));
    }

    #[test]
    fn test_wait_for_interrupt_cycle() {
        let mut cpu = Cpu::new();
        assert!(!cpu.wait_for_interrupt());
        cpu.set_quirks(&[Quirk::VBlank], true);
        assert!(cpu.wait_for_interrupt());
        assert!(cpu.wait_for_interrupt());
        cpu.interrupt = Interrupt::Ready;
        assert!(!cpu.wait_for_interrupt());
        assert_eq!(cpu.interrupt, Interrupt::Idle);
    }

    #[test]
    fn test_breakpoint_toggle_and_remove() {
        let mut cpu = Cpu::new();
        cpu.add_breakpoint(breakpoint("loop", 0x204));
        cpu.add_breakpoint(breakpoint("draw", 0x210));
        cpu.toggle_breakpoint("loop");
        assert!(!cpu.breakpoints()[0].enabled);
        cpu.remove_breakpoint("loop");
        assert_eq!(cpu.breakpoints().len(), 1);
        assert_eq!(cpu.breakpoints()[0].label, "draw");
        cpu.clear_breakpoints();
        assert!(cpu.breakpoints().is_empty());
    }

    #[test]
    fn test_breakpoint_hit_ignores_disabled() {
        let mut cpu = Cpu::new();
        cpu.add_breakpoint(breakpoint("start", 0x200));
        assert!(cpu.breakpoint_hit().is_some());
        cpu.toggle_breakpoint("start");
        assert!(cpu.breakpoint_hit().is_none());
    }

    #[test]
    fn test_reset_keeps_breakpoints() {
        let mut cpu = Cpu::new();
        cpu.add_breakpoint(breakpoint("start", 0x200));
        cpu.registers.v[0x3] = 0x9;
        cpu.set_quirks(&[Quirk::Jump], true);
        cpu.reset();
        assert_eq!(cpu.breakpoints().len(), 1);
        assert_eq!(cpu.registers.v[0x3], 0);
        assert!(cpu.registers.quirks.is_empty());
    }
}
