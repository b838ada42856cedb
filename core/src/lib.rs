pub use chip8::Chip8;
pub use cpu::{Breakpoint, Cpu, Registers};
pub use disassembly::{Disassembly, DisassemblyLine};
pub use display::{Color, Display, Palette, PlaneBuffer, DEFAULT_PALETTE};
pub use error::{Error, Result};
pub use events::{Events, NullEvents};
pub use memory::Memory;
pub use quirks::{Profile, Quirk, Quirks};

mod chip8;
pub mod constants;
mod cpu;
mod disassembly;
mod display;
mod error;
mod events;
pub mod instruction;
mod memory;
mod opcode;
mod operations;
mod quirks;
