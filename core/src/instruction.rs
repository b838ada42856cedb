use crate::chip8::Chip8;
use crate::memory::Memory;
use crate::opcode::Opcode;
use crate::operations::*;

/// Executes a decoded instruction against the machine
pub type Handler = fn(machine: &mut Chip8, operands: &Operands);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    Register,
    Number4bit,
    Number8bit,
    Number12bit,
    Number16bit,
}

impl Default for OperandType {
    fn default() -> Self {
        OperandType::Register
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    pub kind: OperandType,
    pub value: u16,
}

/// Operands in declaration order; slots past the instruction's operand
/// count are zero
pub type Operands = [Operand; 3];

/// # Instruction
/// An immutable entry of the instruction table.
///
/// - `code` the opcode bits that identify the instruction once decoded
/// - `encoding` the printable bit pattern, e.g. `8XY4`
/// - `label` mnemonic template whose `X`/`Y`/`N`/`NN`/`NNN`/`NNNN`
///   placeholders are filled in by the disassembler
/// - `operands` the shape of the operand field
/// - `handler` what executing it does
#[derive(Debug)]
pub struct Instruction {
    pub code: u16,
    pub encoding: &'static str,
    pub label: &'static str,
    pub operands: &'static [OperandType],
    pub handler: Handler,
}

/// `F000 NNNN` is the only instruction followed by an immediate word
pub const LONG_LOAD: u16 = 0xF000;

/// Key of the descriptor every unmatched word decodes to
pub const INVALID: u16 = 0xFFFF;

impl Instruction {
    /// Size in bytes including any trailing immediate
    pub fn size(&self) -> u16 {
        if self.code == LONG_LOAD {
            4
        } else {
            2
        }
    }
}

use OperandType::*;

macro_rules! instruction {
    ($code:expr, $encoding:expr, $label:expr, [$($operand:expr),*], $handler:expr) => {
        Instruction {
            code: $code,
            encoding: $encoding,
            label: $label,
            operands: &[$($operand),*],
            handler: $handler,
        }
    };
}

/// Every instruction the machine understands, sorted by `code`
pub static INSTRUCTIONS: &[Instruction] = &[
    instruction!(0x00C0, "00CN", "scroll-down N", [Number4bit], scroll_down),
    instruction!(0x00D0, "00DN", "scroll-up N", [Number4bit], scroll_up),
    instruction!(0x00E0, "00E0", "clear", [], clear),
    instruction!(0x00EE, "00EE", "return", [], ret),
    instruction!(0x00FB, "00FB", "scroll-right", [], scroll_right),
    instruction!(0x00FC, "00FC", "scroll-left", [], scroll_left),
    instruction!(0x00FD, "00FD", "exit", [], exit),
    instruction!(0x00FE, "00FE", "lores", [], lores),
    instruction!(0x00FF, "00FF", "hires", [], hires),
    instruction!(0x1000, "1NNN", "jump NNN", [Number12bit], jump),
    instruction!(0x2000, "2NNN", "call NNN", [Number12bit], call),
    instruction!(0x3000, "3XNN", "skip vX == NN", [Register, Number8bit], ske),
    instruction!(0x4000, "4XNN", "skip vX != NN", [Register, Number8bit], skne),
    instruction!(0x5000, "5XY0", "skip vX == vY", [Register, Register], skre),
    instruction!(0x5002, "5XY2", "save vX - vY", [Register, Register], save_range),
    instruction!(0x5003, "5XY3", "load vX - vY", [Register, Register], load_range),
    instruction!(0x6000, "6XNN", "vX := NN", [Register, Number8bit], load),
    instruction!(0x7000, "7XNN", "vX += NN", [Register, Number8bit], add),
    instruction!(0x8000, "8XY0", "vX := vY", [Register, Register], mv),
    instruction!(0x8001, "8XY1", "vX |= vY", [Register, Register], or),
    instruction!(0x8002, "8XY2", "vX &= vY", [Register, Register], and),
    instruction!(0x8003, "8XY3", "vX ^= vY", [Register, Register], xor),
    instruction!(0x8004, "8XY4", "vX += vY", [Register, Register], addr),
    instruction!(0x8005, "8XY5", "vX -= vY", [Register, Register], sub),
    instruction!(0x8006, "8XY6", "vX := vY >> 1", [Register, Register], shr),
    instruction!(0x8007, "8XY7", "vX =- vY", [Register, Register], subn),
    instruction!(0x800E, "8XYE", "vX := vY << 1", [Register, Register], shl),
    instruction!(0x9000, "9XY0", "skip vX != vY", [Register, Register], skrne),
    instruction!(0xA000, "ANNN", "i := NNN", [Number12bit], loadi),
    instruction!(0xB000, "BNNN", "jump v0 + NNN", [Number12bit], jumpi),
    instruction!(0xC000, "CXNN", "vX := random & NN", [Register, Number8bit], random),
    instruction!(0xD000, "DXYN", "sprite vX vY N", [Register, Register, Number4bit], draw),
    instruction!(0xE09E, "EX9E", "skip vX == key pressed", [Register], skpr),
    instruction!(0xE0A1, "EXA1", "skip vX != key pressed", [Register], skup),
    instruction!(0xF000, "F000", "i := long NNNN", [Number16bit], loadi_long),
    instruction!(0xF001, "FN01", "plane N", [Number4bit], plane),
    instruction!(0xF002, "F002", "audio", [], audio),
    instruction!(0xF007, "FX07", "vX := delay", [Register], moved),
    instruction!(0xF00A, "FX0A", "vX := key", [Register], keyd),
    instruction!(0xF015, "FX15", "delay := vX", [Register], set_delay),
    instruction!(0xF018, "FX18", "buzzer := vX", [Register], set_buzzer),
    instruction!(0xF01E, "FX1E", "i += vX", [Register], addi),
    instruction!(0xF029, "FX29", "i := hex vX", [Register], ldspr),
    instruction!(0xF030, "FX30", "i := bighex vX", [Register], ldbigspr),
    instruction!(0xF033, "FX33", "bcd vX", [Register], bcd),
    instruction!(0xF03A, "FX3A", "pitch := vX", [Register], pitch),
    instruction!(0xF055, "FX55", "save vX", [Register], stor),
    instruction!(0xF065, "FX65", "load vX", [Register], read),
    instruction!(0xF075, "FX75", "saveflags vX", [Register], save_flags),
    instruction!(0xF085, "FX85", "loadflags vX", [Register], load_flags),
];

static INVALID_INSTRUCTION: Instruction = instruction!(INVALID, "FFFF", "invalid", [], nop);

/// Looks up a descriptor by its decoded `code`
fn lookup(code: u16) -> Option<&'static Instruction> {
    INSTRUCTIONS
        .binary_search_by_key(&code, |instruction| instruction.code)
        .ok()
        .map(|index| &INSTRUCTIONS[index])
}

/// The no-op descriptor unmatched words decode to
pub fn invalid() -> &'static Instruction {
    &INVALID_INSTRUCTION
}

/// Selects the Instruction for an opcode, or None if no family matches.
///
/// Most families are identified by their leading nibble alone; the rest
/// are masked down further before the lookup.
pub fn decode(op: u16) -> Option<&'static Instruction> {
    let code = match op.nibbles() {
        (0x0, _, 0xE, 0x0) | (0x0, _, 0xE, 0xE) | (0x0, _, 0xF, 0xB..=0xF) => op & 0x00FF,
        (0x0, _, 0xC, _) | (0x0, _, 0xD, _) => op & 0x00F0,
        (0x1..=0x4, ..) | (0x6, ..) | (0x7, ..) | (0xA..=0xD, ..) => op & 0xF000,
        (0x5, .., 0x0) | (0x5, .., 0x2) | (0x5, .., 0x3) => op & 0xF00F,
        (0x8, .., 0x0..=0x7) | (0x8, .., 0xE) => op & 0xF00F,
        (0x9, .., 0x0) => op & 0xF000,
        (0xE, _, 0x9, 0xE) | (0xE, _, 0xA, 0x1) => op & 0xF0FF,
        (0xF, ..) => op & 0xF0FF,
        _ => return None,
    };
    lookup(code)
}

/// Slices an instruction's operands out of its opcode.
///
/// # Arguments
/// * `op` the raw opcode
/// * `instruction` its decoded descriptor
/// * `memory` source of the immediate word of `F000 NNNN`
/// * `next` address of the word following `op`
pub fn extract_operands(
    op: u16,
    instruction: &Instruction,
    memory: &Memory,
    next: u16,
) -> Operands {
    let mut operands = Operands::default();

    // These keep their nibble somewhere the positional walk below wouldn't look
    match instruction.code {
        0x00C0 | 0x00D0 => {
            operands[0] = Operand {
                kind: Number4bit,
                value: u16::from(op.n()),
            };
            return operands;
        }
        0xF001 => {
            operands[0] = Operand {
                kind: Number4bit,
                value: u16::from(op.x()),
            };
            return operands;
        }
        _ => {}
    }

    for (index, kind) in instruction.operands.iter().enumerate() {
        let position = 2 - index as u8;
        let value = match kind {
            Register | Number4bit => u16::from(op.operand_nibble(position)),
            Number8bit => {
                let high = op.operand_nibble(position);
                let low = op.operand_nibble(position.saturating_sub(1));
                u16::from(high << 4 | low)
            }
            Number12bit => op.addr(),
            Number16bit => {
                let high = u16::from(memory.read(next));
                let low = u16::from(memory.read(next.wrapping_add(1)));
                high << 8 | low
            }
        };
        operands[index] = Operand { kind: *kind, value };
    }

    operands
}
