use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use xo8_core::constants::{DISPLAY_WIDTH, MAX_ROM_SIZE};
use xo8_core::{Chip8, Error, Events, Profile, Quirk};

/// A rom file under the temp dir, removed along with its flags when dropped
struct TempRom(PathBuf);

impl TempRom {
    fn new(name: &str, program: &[u8]) -> Self {
        let path = std::env::temp_dir().join(format!("xo8-{}-{}.ch8", name, std::process::id()));
        fs::write(&path, program).unwrap();
        TempRom(path)
    }

    fn flags(&self) -> PathBuf {
        let mut flags = self.0.clone().into_os_string();
        flags.push(".flags");
        PathBuf::from(flags)
    }
}

impl Drop for TempRom {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
        let _ = fs::remove_file(self.flags());
    }
}

#[derive(Default)]
struct Counts {
    underflows: usize,
    writes: Vec<u16>,
}

struct Recorder(Rc<RefCell<Counts>>);

impl Events for Recorder {
    fn on_stack_underflow(&mut self) {
        self.0.borrow_mut().underflows += 1;
    }

    fn on_out_of_range_write(&mut self, addr: u16) {
        self.0.borrow_mut().writes.push(addr);
    }
}

#[test]
fn test_flags_round_trip_through_sidecar_file() {
    let program = [
        0x60, 0x11, // v0 := 0x11
        0x61, 0x22, // v1 := 0x22
        0x62, 0x33, // v2 := 0x33
        0xF2, 0x75, // saveflags v2
        0x60, 0x00, // v0 := 0
        0x61, 0x00, // v1 := 0
        0x62, 0x00, // v2 := 0
        0xF2, 0x85, // loadflags v2
    ];
    let rom = TempRom::new("flags", &program);

    let mut chip8 = Chip8::with_seed(1);
    chip8.load_rom(&rom.0).unwrap();
    chip8.tick(4);

    let saved = fs::read(rom.flags()).unwrap();
    assert_eq!(saved.len(), 16);
    assert_eq!(saved[..4], [0x11, 0x22, 0x33, 0x00]);

    chip8.tick(4);
    assert_eq!(chip8.registers().v[..3], [0x11, 0x22, 0x33]);
}

#[test]
fn test_missing_flags_file_zeroes_registers() {
    let program = [0x65, 0x55, 0xF2, 0x85];
    let rom = TempRom::new("no-flags", &program);

    let mut chip8 = Chip8::with_seed(1);
    chip8.load_rom(&rom.0).unwrap();
    chip8.tick(2);
    assert_eq!(chip8.registers().v, [0; 16]);
}

#[test]
fn test_load_rom_reports_missing_file() {
    let mut chip8 = Chip8::new();
    let result = chip8.load_rom(std::env::temp_dir().join("xo8-does-not-exist.ch8"));
    assert!(matches!(result, Err(Error::Io(_))));
    assert!(!chip8.running());
}

#[test]
fn test_load_rom_rejects_oversized_image() {
    let mut chip8 = Chip8::new();
    let rom = vec![0x00; MAX_ROM_SIZE + 1];
    let result = chip8.load_rom_bytes(&rom);
    assert!(matches!(result, Err(Error::RomTooLarge { .. })));
}

#[test]
fn test_events_receive_underflow_and_rejected_write() {
    let counts = Rc::new(RefCell::new(Counts::default()));
    let mut chip8 = Chip8::with_seed(1).with_events(Box::new(Recorder(counts.clone())));
    let program = [
        0xA1, 0x00, // i := 0x100
        0xF0, 0x55, // save v0
        0x00, 0xEE, // return
    ];
    chip8.load_rom_bytes(&program).unwrap();
    chip8.tick(3);

    assert_eq!(counts.borrow().writes, vec![0x100]);
    assert_eq!(counts.borrow().underflows, 1);
    assert_eq!(chip8.registers().pc, 0x000);
}

#[test]
fn test_draws_hex_digit_in_hires() {
    let program = [
        0x00, 0xFF, // hires
        0x60, 0x0A, // v0 := 0xA
        0xF0, 0x29, // i := hex v0
        0x61, 0x08, // v1 := 8
        0x62, 0x04, // v2 := 4
        0xD1, 0x25, // sprite v1 v2 5
        0x12, 0x0C, // jump 0x20C
    ];
    let mut chip8 = Chip8::with_seed(1);
    chip8.load_rom_bytes(&program).unwrap();
    chip8.frame();

    assert!(chip8.high_res());
    let plane = &chip8.buffers()[0];
    // "A" glyph top row is 0xF0
    let top: Vec<u8> = (8..16).map(|x| plane[4 * DISPLAY_WIDTH + x]).collect();
    assert_eq!(top, vec![1, 1, 1, 1, 0, 0, 0, 0]);
    assert_eq!(chip8.registers().v[0xF], 0);
    assert_eq!(chip8.registers().pc, 0x20C);
}

#[test]
fn test_vip_profile_waits_for_vblank() {
    let program = [
        0xD0, 0x15, // sprite v0 v0 5
        0x70, 0x01, // v0 += 1
        0x12, 0x00, // jump 0x200
    ];
    let mut chip8 = Chip8::with_seed(1);
    chip8.set_profile(Profile::Vip);
    chip8.load_rom_bytes(&program).unwrap();

    // The first frame only arms the wait; each later frame lets one sprite through
    for _ in 0..3 {
        chip8.tick(50);
    }
    assert_eq!(chip8.registers().v[0x0], 2);
}

#[test]
fn test_extra_quirks_layer_on_profile() {
    let mut chip8 = Chip8::with_seed(1);
    chip8.set_profile(Profile::Schip);
    chip8.load_rom_bytes(&[0x00, 0xE0]).unwrap();
    chip8.set_quirks(&[Quirk::IRegCarry], true);
    assert!(chip8.quirks().contains(Quirk::IRegCarry.flag()));
    assert!(chip8.quirks().contains(Quirk::Jump.flag()));
}

#[test]
fn test_disassembly_follows_execution() {
    let program = [
        0x60, 0x05, // v0 := 5
        0x22, 0x06, // call 0x206
        0x12, 0x04, // jump 0x204
        0x70, 0x01, // v0 += 1
        0x00, 0xEE, // return
    ];
    let mut chip8 = Chip8::with_seed(1);
    chip8.load_rom_bytes(&program).unwrap();
    chip8.tick(6);

    let disassembly = chip8.disassembly();
    let addrs: Vec<u16> = disassembly.lines().map(|line| line.addr).collect();
    assert_eq!(addrs, vec![0x200, 0x202, 0x204, 0x206, 0x208]);
    let indexes: Vec<usize> = disassembly.lines().map(|line| line.index).collect();
    assert_eq!(indexes, vec![0, 1, 2, 3, 4]);
    assert_eq!(disassembly.newest().map(|line| line.addr), Some(0x204));
    assert_eq!(disassembly.get(0x202).map(|line| line.text.as_str()), Some("call 0x206 (518)"));
}
