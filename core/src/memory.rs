use std::io::Read;

use log::{debug, warn};

use crate::constants::{
    AUDIO_BUFFER_SIZE, BIG_FONT, BIG_FONT_GLYPH_SIZE, FONT, FONT_GLYPH_SIZE, MAX_ROM_SIZE,
    MEMORY_SIZE, PROGRAM_START,
};
use crate::error::{Error, Result};
use crate::events::{Events, NullEvents};

/// # Memory
/// - 64KB of byte addressable RAM
///     - 0x000..0x200 holds the two font tables and is read-only to programs
///     - ROMs are loaded at 0x200
/// - an unbounded call stack of return addresses
/// - the 16 byte XO-CHIP audio pattern buffer
///
/// Rejected writes and stack underflows are reported to the `Events` sink.
pub struct Memory {
    ram: Vec<u8>,
    stack: Vec<u16>,
    audio: [u8; AUDIO_BUFFER_SIZE],
    rom_size: usize,
    use_beep: bool,
    events: Box<dyn Events>,
}

impl Memory {
    pub fn new() -> Self {
        Memory::with_events(Box::new(NullEvents))
    }

    /// Creates memory that reports exceptional conditions to `events`
    pub fn with_events(events: Box<dyn Events>) -> Self {
        let mut memory = Memory {
            ram: vec![0; MEMORY_SIZE],
            stack: Vec::new(),
            audio: [0; AUDIO_BUFFER_SIZE],
            rom_size: 0,
            use_beep: true,
            events,
        };
        memory.reset();
        memory
    }

    /// Replaces the notification sink
    pub fn set_events(&mut self, events: Box<dyn Events>) {
        self.events = events;
    }

    /// Zeroes RAM and the audio buffer, empties the stack and reloads the fonts
    pub fn reset(&mut self) {
        self.ram.iter_mut().for_each(|b| *b = 0);
        self.audio = [0; AUDIO_BUFFER_SIZE];
        self.stack.clear();
        self.rom_size = 0;
        self.use_beep = true;
        self.load_fonts();
    }

    fn load_fonts(&mut self) {
        self.ram[..FONT.len()].copy_from_slice(&FONT);
        self.ram[FONT.len()..FONT.len() + BIG_FONT.len()].copy_from_slice(&BIG_FONT);
    }

    /// Resets memory then copies a ROM in starting at `PROGRAM_START`
    ///
    /// # Arguments
    /// * `reader` a source that yields the raw ROM image
    pub fn load_rom(&mut self, reader: &mut dyn Read) -> Result<()> {
        let mut rom = Vec::new();
        reader.read_to_end(&mut rom)?;
        if rom.len() > MAX_ROM_SIZE {
            return Err(Error::RomTooLarge {
                size: rom.len(),
                max: MAX_ROM_SIZE,
            });
        }

        self.reset();
        let start = PROGRAM_START as usize;
        self.ram[start..start + rom.len()].copy_from_slice(&rom);
        self.rom_size = rom.len();
        debug!("loaded {} byte ROM at 0x{:04X}", rom.len(), PROGRAM_START);
        Ok(())
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    /// Writes a byte unless `addr` falls inside the reserved font area
    pub fn write(&mut self, addr: u16, data: u8) {
        if addr < PROGRAM_START {
            warn!("rejected write of 0x{:02X} to 0x{:04X}", data, addr);
            self.events.on_out_of_range_write(addr);
            return;
        }
        self.ram[addr as usize] = data;
    }

    pub fn push(&mut self, addr: u16) {
        self.stack.push(addr);
    }

    /// Pops a return address, or reports an underflow and returns 0
    pub fn pop(&mut self) -> u16 {
        match self.stack.pop() {
            Some(addr) => addr,
            None => {
                warn!("stack underflow");
                self.events.on_stack_underflow();
                0
            }
        }
    }

    /// Writes into the audio pattern buffer; `position` wraps at 16
    pub fn write_audio(&mut self, position: u8, data: u8) {
        self.audio[(position & 0xF) as usize] = data;
    }

    /// Address of the small font glyph for the low nibble of `character`
    pub fn character_address(character: u8) -> u16 {
        u16::from(character & 0xF) * FONT_GLYPH_SIZE
    }

    /// Address of the big font glyph for `character`
    pub fn big_character_address(character: u8) -> u16 {
        FONT.len() as u16 + BIG_FONT_GLYPH_SIZE * u16::from(character)
    }

    pub fn audio_buffer(&self) -> &[u8; AUDIO_BUFFER_SIZE] {
        &self.audio
    }

    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    pub fn rom_size(&self) -> usize {
        self.rom_size
    }

    /// Whether the audio layer should play the plain beep rather than the
    /// pattern buffer
    pub fn use_beep(&self) -> bool {
        self.use_beep
    }

    pub fn set_use_beep(&mut self, use_beep: bool) {
        self.use_beep = use_beep;
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        underflows: usize,
        writes: Vec<u16>,
    }

    struct Shared(Rc<RefCell<Recorder>>);

    impl Events for Shared {
        fn on_stack_underflow(&mut self) {
            self.0.borrow_mut().underflows += 1;
        }

        fn on_out_of_range_write(&mut self, addr: u16) {
            self.0.borrow_mut().writes.push(addr);
        }
    }

    fn recorded() -> (Memory, Rc<RefCell<Recorder>>) {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let memory = Memory::with_events(Box::new(Shared(recorder.clone())));
        (memory, recorder)
    }

    #[test]
    fn test_reset_loads_fonts() {
        let memory = Memory::new();
        assert_eq!(memory.ram()[0..5], FONT[0..5]);
        assert_eq!(memory.ram()[80..90], BIG_FONT[0..10]);
        assert_eq!(memory.read(0x200), 0);
    }

    #[test]
    fn test_loads_rom_at_0x200() {
        let mut memory = Memory::new();
        let rom: &[u8] = &[0x00, 0xE0, 0x12, 0x00];
        memory.load_rom(&mut &rom[..]).unwrap();
        assert_eq!(memory.ram()[0x200..0x204], [0x00, 0xE0, 0x12, 0x00]);
        assert_eq!(memory.rom_size(), 4);
    }

    #[test]
    fn test_rejects_oversized_rom() {
        let mut memory = Memory::new();
        let rom = vec![0xAA; MAX_ROM_SIZE + 1];
        let result = memory.load_rom(&mut &rom[..]);
        assert!(matches!(result, Err(Error::RomTooLarge { .. })));
    }

    #[test]
    fn test_write_below_0x200_is_rejected() {
        let (mut memory, recorder) = recorded();
        let before = memory.read(0x1FF);
        memory.write(0x1FF, 0xAB);
        assert_eq!(memory.read(0x1FF), before);
        assert_eq!(recorder.borrow().writes, vec![0x1FF]);
    }

    #[test]
    fn test_write_at_0x200_succeeds() {
        let (mut memory, recorder) = recorded();
        memory.write(0x200, 0xAB);
        assert_eq!(memory.read(0x200), 0xAB);
        assert!(recorder.borrow().writes.is_empty());
    }

    #[test]
    fn test_stack_is_lifo() {
        let mut memory = Memory::new();
        memory.push(0x202);
        memory.push(0x404);
        assert_eq!(memory.pop(), 0x404);
        assert_eq!(memory.pop(), 0x202);
    }

    #[test]
    fn test_pop_on_empty_stack_underflows() {
        let (mut memory, recorder) = recorded();
        memory.reset();
        assert_eq!(memory.pop(), 0);
        assert_eq!(recorder.borrow().underflows, 1);
    }

    #[test]
    fn test_write_audio_wraps_position() {
        let mut memory = Memory::new();
        memory.write_audio(0x13, 0xFF);
        assert_eq!(memory.audio_buffer()[0x3], 0xFF);
    }

    #[test]
    fn test_character_addresses() {
        assert_eq!(Memory::character_address(0x2), 10);
        assert_eq!(Memory::character_address(0x12), 10);
        assert_eq!(Memory::big_character_address(0x1), 90);
    }
}
