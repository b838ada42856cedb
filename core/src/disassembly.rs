use std::collections::BTreeMap;

use crate::instruction::{decode, extract_operands, invalid, Operand, OperandType, LONG_LOAD};
use crate::memory::Memory;

/// One rendered instruction.
///
/// - `addr` where the instruction starts
/// - `index` its position among all cached lines, in address order
/// - `visit` when it was first reached; larger is newer
/// - `text` the mnemonic with its operands filled in, e.g. `vA += 0x12 (18)`
/// - `bytes` the raw instruction bytes, e.g. `7A 12`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisassemblyLine {
    pub addr: u16,
    pub index: usize,
    pub visit: u64,
    pub text: String,
    pub bytes: String,
}

/// # Disassembly
/// Lines are added as the program counter reaches new addresses and are
/// only dropped by `clear`. Line indexes go stale when a line is inserted
/// and are renumbered on the next call to `renumber`.
#[derive(Debug, Clone, Default)]
pub struct Disassembly {
    lines: BTreeMap<u16, DisassemblyLine>,
    visits: u64,
    stale: bool,
}

impl Disassembly {
    pub fn new() -> Self {
        Disassembly::default()
    }

    /// Caches the instruction at `pc` unless it has been seen before
    pub fn disassemble_next(&mut self, memory: &Memory, pc: u16) {
        if self.lines.contains_key(&pc) {
            return;
        }

        let line = DisassemblyLine {
            addr: pc,
            index: self.lines.len(),
            visit: self.visits,
            ..render(memory, pc)
        };
        self.visits += 1;
        self.lines.insert(pc, line);
        self.stale = true;
    }

    /// Brings every line's `index` up to date
    pub fn renumber(&mut self) {
        if !self.stale {
            return;
        }
        for (index, line) in self.lines.values_mut().enumerate() {
            line.index = index;
        }
        self.stale = false;
    }

    /// Lines in address order
    pub fn lines(&self) -> impl Iterator<Item = &DisassemblyLine> + '_ {
        self.lines.values()
    }

    pub fn get(&self, addr: u16) -> Option<&DisassemblyLine> {
        self.lines.get(&addr)
    }

    /// The most recently reached line
    pub fn newest(&self) -> Option<&DisassemblyLine> {
        self.lines.values().max_by_key(|line| line.visit)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.visits = 0;
        self.stale = false;
    }
}

fn render(memory: &Memory, pc: u16) -> DisassemblyLine {
    let high = memory.read(pc);
    let low = memory.read(pc.wrapping_add(1));
    let op = u16::from(high) << 8 | u16::from(low);
    let next = pc.wrapping_add(2);

    let instruction = decode(op).unwrap_or_else(invalid);
    let operands = extract_operands(op, instruction, memory, next);

    let mut bytes = format!("{:02X} {:02X}", high, low);
    if instruction.code == LONG_LOAD {
        bytes.push_str(&format!(
            " {:02X} {:02X}",
            memory.read(next),
            memory.read(next.wrapping_add(1))
        ));
    }

    DisassemblyLine {
        addr: pc,
        index: 0,
        visit: 0,
        text: format_label(instruction.label, &operands[..instruction.operands.len()]),
        bytes,
    }
}

/// Fills the placeholders of `label` in operand order. The first register
/// replaces `X` and the second `Y`.
fn format_label(label: &str, operands: &[Operand]) -> String {
    let mut text = label.to_string();
    let mut registers = ["X", "Y"].iter();

    for operand in operands {
        let value = operand.value;
        let (placeholder, formatted) = match operand.kind {
            OperandType::Register => match registers.next() {
                Some(placeholder) => (*placeholder, format!("{:X}", value)),
                None => continue,
            },
            OperandType::Number4bit => ("N", format!("{:X}", value)),
            OperandType::Number8bit => ("NN", format!("0x{:02X} ({})", value, value)),
            OperandType::Number12bit => ("NNN", format!("0x{:03X} ({})", value, value)),
            OperandType::Number16bit => ("NNNN", format!("0x{:04X} ({})", value, value)),
        };
        text = text.replacen(placeholder, &formatted, 1);
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_with(program: &[u8]) -> Memory {
        let mut memory = Memory::new();
        memory.load_rom(&mut &program[..]).unwrap();
        memory
    }

    #[test]
    fn test_renders_register_and_byte() {
        let memory = memory_with(&[0x7A, 0x12]);
        let mut disassembly = Disassembly::new();
        disassembly.disassemble_next(&memory, 0x200);
        let line = disassembly.get(0x200).unwrap();
        assert_eq!(line.text, "vA += 0x12 (18)");
        assert_eq!(line.bytes, "7A 12");
    }

    #[test]
    fn test_renders_two_registers() {
        let memory = memory_with(&[0x81, 0x24]);
        let mut disassembly = Disassembly::new();
        disassembly.disassemble_next(&memory, 0x200);
        assert_eq!(disassembly.get(0x200).unwrap().text, "v1 += v2");
    }

    #[test]
    fn test_renders_address_and_sprite() {
        let memory = memory_with(&[0xA1, 0x23, 0xD1, 0x25]);
        let mut disassembly = Disassembly::new();
        disassembly.disassemble_next(&memory, 0x200);
        disassembly.disassemble_next(&memory, 0x202);
        assert_eq!(disassembly.get(0x200).unwrap().text, "i := 0x123 (291)");
        assert_eq!(disassembly.get(0x202).unwrap().text, "sprite v1 v2 5");
    }

    #[test]
    fn test_renders_long_load_with_four_bytes() {
        let memory = memory_with(&[0xF0, 0x00, 0x12, 0x34]);
        let mut disassembly = Disassembly::new();
        disassembly.disassemble_next(&memory, 0x200);
        let line = disassembly.get(0x200).unwrap();
        assert_eq!(line.text, "i := long 0x1234 (4660)");
        assert_eq!(line.bytes, "F0 00 12 34");
    }

    #[test]
    fn test_renders_unmatched_word_as_invalid() {
        let memory = memory_with(&[0x99, 0x99]);
        let mut disassembly = Disassembly::new();
        disassembly.disassemble_next(&memory, 0x200);
        assert_eq!(disassembly.get(0x200).unwrap().text, "invalid");
    }

    #[test]
    fn test_disassemble_next_is_idempotent() {
        let mut memory = memory_with(&[0x60, 0x01]);
        let mut disassembly = Disassembly::new();
        disassembly.disassemble_next(&memory, 0x200);
        memory.write(0x201, 0x02);
        disassembly.disassemble_next(&memory, 0x200);
        assert_eq!(disassembly.len(), 1);
        assert_eq!(disassembly.get(0x200).unwrap().text, "v0 := 0x01 (1)");
    }

    #[test]
    fn test_renumbers_in_address_order_and_tracks_visits() {
        let memory = memory_with(&[0x00, 0xE0, 0x00, 0xE0, 0x00, 0xE0]);
        let mut disassembly = Disassembly::new();
        disassembly.disassemble_next(&memory, 0x204);
        disassembly.disassemble_next(&memory, 0x200);
        disassembly.disassemble_next(&memory, 0x202);
        disassembly.renumber();

        let indexes: Vec<(u16, usize)> = disassembly.lines().map(|l| (l.addr, l.index)).collect();
        assert_eq!(indexes, vec![(0x200, 0), (0x202, 1), (0x204, 2)]);
        assert_eq!(disassembly.newest().unwrap().addr, 0x202);
        assert_eq!(disassembly.get(0x204).unwrap().visit, 0);
    }

    #[test]
    fn test_clear_forgets_everything() {
        let memory = memory_with(&[0x00, 0xE0]);
        let mut disassembly = Disassembly::new();
        disassembly.disassemble_next(&memory, 0x200);
        disassembly.clear();
        assert!(disassembly.is_empty());
        assert!(disassembly.newest().is_none());
    }
}
