use rand::Rng;

use crate::chip8::Chip8;
use crate::constants::{DEFAULT_PITCH, HORIZONTAL_SCROLL, PLANE_COUNT};
use crate::instruction::Operands;
use crate::memory::Memory;
use crate::quirks::Quirks;

/// The register named by operand `index`
fn reg(operands: &Operands, index: usize) -> usize {
    (operands[index].value & 0xF) as usize
}

fn byte(operands: &Operands, index: usize) -> u8 {
    operands[index].value as u8
}

/// scroll_down(N)
pub fn scroll_down(machine: &mut Chip8, operands: &Operands) {
    machine.display.scroll_down(byte(operands, 0));
}

/// scroll_up(N)
pub fn scroll_up(machine: &mut Chip8, operands: &Operands) {
    machine.display.scroll_up(byte(operands, 0));
}

/// clear
pub fn clear(machine: &mut Chip8, _operands: &Operands) {
    machine.display.clear();
}

/// PC = STACK.pop()
/// An empty stack sends execution to 0
pub fn ret(machine: &mut Chip8, _operands: &Operands) {
    machine.cpu.registers.pc = machine.memory.pop();
}

/// scroll_right(4)
pub fn scroll_right(machine: &mut Chip8, _operands: &Operands) {
    machine.display.scroll_right(HORIZONTAL_SCROLL);
}

/// scroll_left(4)
pub fn scroll_left(machine: &mut Chip8, _operands: &Operands) {
    machine.display.scroll_left(HORIZONTAL_SCROLL);
}

/// halt
pub fn exit(machine: &mut Chip8, _operands: &Operands) {
    machine.set_halted(true);
}

/// 64x32
pub fn lores(machine: &mut Chip8, _operands: &Operands) {
    machine.set_high_res(false);
}

/// 128x64
pub fn hires(machine: &mut Chip8, _operands: &Operands) {
    machine.set_high_res(true);
}

/// PC = addr
pub fn jump(machine: &mut Chip8, operands: &Operands) {
    machine.cpu.registers.pc = operands[0].value;
}

/// STACK.push(PC); PC = addr
pub fn call(machine: &mut Chip8, operands: &Operands) {
    machine.memory.push(machine.cpu.registers.pc);
    machine.cpu.registers.pc = operands[0].value;
}

/// if Vx == kk then skip
pub fn ske(machine: &mut Chip8, operands: &Operands) {
    let v = &machine.cpu.registers.v;
    let condition = v[reg(operands, 0)] == byte(operands, 1);
    machine.skip_if(condition);
}

/// if Vx != kk then skip
pub fn skne(machine: &mut Chip8, operands: &Operands) {
    let v = &machine.cpu.registers.v;
    let condition = v[reg(operands, 0)] != byte(operands, 1);
    machine.skip_if(condition);
}

/// if Vx == Vy then skip
pub fn skre(machine: &mut Chip8, operands: &Operands) {
    let v = &machine.cpu.registers.v;
    let condition = v[reg(operands, 0)] == v[reg(operands, 1)];
    machine.skip_if(condition);
}

/// Register indexes from x to y inclusive, descending when x > y
fn register_range(x: usize, y: usize) -> impl Iterator<Item = usize> {
    let count = if x <= y { y - x } else { x - y };
    (0..=count).map(move |offset| if x <= y { x + offset } else { x - offset })
}

/// mem[I..] = Vx..Vy
pub fn save_range(machine: &mut Chip8, operands: &Operands) {
    let i = machine.cpu.registers.i;
    for (offset, r) in register_range(reg(operands, 0), reg(operands, 1)).enumerate() {
        let value = machine.cpu.registers.v[r];
        machine.memory.write(i.wrapping_add(offset as u16), value);
    }
}

/// Vx..Vy = mem[I..]
pub fn load_range(machine: &mut Chip8, operands: &Operands) {
    let i = machine.cpu.registers.i;
    for (offset, r) in register_range(reg(operands, 0), reg(operands, 1)).enumerate() {
        machine.cpu.registers.v[r] = machine.memory.read(i.wrapping_add(offset as u16));
    }
}

/// Vx = kk
pub fn load(machine: &mut Chip8, operands: &Operands) {
    machine.cpu.registers.v[reg(operands, 0)] = byte(operands, 1);
}

/// Vx += kk
/// Add kk to Vx; allow for overflow but implicitly drop it
pub fn add(machine: &mut Chip8, operands: &Operands) {
    let x = reg(operands, 0);
    let v = &mut machine.cpu.registers.v;
    v[x] = v[x].wrapping_add(byte(operands, 1));
}

/// Vx = Vy
pub fn mv(machine: &mut Chip8, operands: &Operands) {
    let v = &mut machine.cpu.registers.v;
    v[reg(operands, 0)] = v[reg(operands, 1)];
}

/// Clears VF after a bitwise operation when the logic quirk is set
fn logic_quirk(machine: &mut Chip8) {
    if machine.cpu.quirk_set(Quirks::LOGIC) {
        machine.cpu.registers.v[0xF] = 0;
    }
}

/// Vx |= Vy
pub fn or(machine: &mut Chip8, operands: &Operands) {
    let v = &mut machine.cpu.registers.v;
    v[reg(operands, 0)] |= v[reg(operands, 1)];
    logic_quirk(machine);
}

/// Vx &= Vy
pub fn and(machine: &mut Chip8, operands: &Operands) {
    let v = &mut machine.cpu.registers.v;
    v[reg(operands, 0)] &= v[reg(operands, 1)];
    logic_quirk(machine);
}

/// Vx ^= Vy
pub fn xor(machine: &mut Chip8, operands: &Operands) {
    let v = &mut machine.cpu.registers.v;
    v[reg(operands, 0)] ^= v[reg(operands, 1)];
    logic_quirk(machine);
}

/// Vx += Vy
/// Set VF to 1 if there's a carry
pub fn addr(machine: &mut Chip8, operands: &Operands) {
    let (x, y) = (reg(operands, 0), reg(operands, 1));
    let v = &mut machine.cpu.registers.v;
    let (res, carry) = v[x].overflowing_add(v[y]);
    v[x] = res;
    v[0xF] = carry as u8;
}

/// Vx -= Vy
/// Set VF to 1 if there's no borrow
pub fn sub(machine: &mut Chip8, operands: &Operands) {
    let (x, y) = (reg(operands, 0), reg(operands, 1));
    let v = &mut machine.cpu.registers.v;
    let no_borrow = v[x] >= v[y];
    v[x] = v[x].wrapping_sub(v[y]);
    v[0xF] = no_borrow as u8;
}

/// Vx = Vy - Vx
/// Set VF to 1 if there's no borrow
pub fn subn(machine: &mut Chip8, operands: &Operands) {
    let (x, y) = (reg(operands, 0), reg(operands, 1));
    let v = &mut machine.cpu.registers.v;
    let no_borrow = v[y] >= v[x];
    v[x] = v[y].wrapping_sub(v[x]);
    v[0xF] = no_borrow as u8;
}

/// The register a shift reads: Vx under the shift quirk, otherwise Vy
fn shift_source(machine: &Chip8, operands: &Operands) -> u8 {
    let source = if machine.cpu.quirk_set(Quirks::SHIFT) {
        reg(operands, 0)
    } else {
        reg(operands, 1)
    };
    machine.cpu.registers.v[source]
}

/// Vx = Vy >> 1
/// Set VF to the bit shifted out
pub fn shr(machine: &mut Chip8, operands: &Operands) {
    let source = shift_source(machine, operands);
    let v = &mut machine.cpu.registers.v;
    v[reg(operands, 0)] = source >> 1;
    v[0xF] = source & 0x1;
}

/// Vx = Vy << 1
/// Set VF to the bit shifted out
pub fn shl(machine: &mut Chip8, operands: &Operands) {
    let source = shift_source(machine, operands);
    let v = &mut machine.cpu.registers.v;
    v[reg(operands, 0)] = source << 1;
    v[0xF] = source >> 7;
}

/// if Vx != Vy then skip
pub fn skrne(machine: &mut Chip8, operands: &Operands) {
    let v = &machine.cpu.registers.v;
    let condition = v[reg(operands, 0)] != v[reg(operands, 1)];
    machine.skip_if(condition);
}

/// I = addr
pub fn loadi(machine: &mut Chip8, operands: &Operands) {
    machine.cpu.registers.i = operands[0].value;
}

/// PC = V0 + addr
/// Under the jump quirk the addr's high nibble picks the register instead of V0
pub fn jumpi(machine: &mut Chip8, operands: &Operands) {
    let addr = operands[0].value;
    let r = if machine.cpu.quirk_set(Quirks::JUMP) {
        ((addr & 0xF00) >> 8) as usize
    } else {
        0x0
    };
    machine.cpu.registers.pc = addr.wrapping_add(u16::from(machine.cpu.registers.v[r]));
}

/// Vx = rand_byte & kk
pub fn random(machine: &mut Chip8, operands: &Operands) {
    let rand_byte: u8 = machine.rng.gen();
    machine.cpu.registers.v[reg(operands, 0)] = rand_byte & byte(operands, 1);
}

/// draw_sprite(x=Vx y=Vy size=n)
/// XORs a sprite from memory at I onto each plane selected by the plane mask.
/// The origin wraps; pixels past the edge wrap too unless the clip quirk is set.
/// Sets VF if any pixels were erased.
pub fn draw(machine: &mut Chip8, operands: &Operands) {
    if machine.cpu.wait_for_interrupt() {
        machine.cpu.registers.pc = machine.cpu.registers.pc.wrapping_sub(2);
        return;
    }

    let n = operands[2].value as usize;
    let display = &mut machine.display;
    let memory = &machine.memory;
    let cpu = &mut machine.cpu;

    let width = display.width();
    let height = display.height();
    let origin_x = cpu.registers.v[reg(operands, 0)] as usize % width;
    let origin_y = cpu.registers.v[reg(operands, 1)] as usize % height;

    let big = n == 0;
    let narrow = cpu.quirk_set(Quirks::LORES_SPRITES) && !display.high_res();
    let rows = if big { 16 } else { n };
    let columns = if big && !narrow { 16 } else { 8 };
    let bits = if big { 16 } else { 8 };
    let clip = cpu.quirk_set(Quirks::CLIP);

    let mut collision = false;
    let mut i = cpu.registers.i;
    cpu.registers.v[0xF] = 0;

    for plane in 0..PLANE_COUNT {
        if display.plane_mask() & (1 << plane) == 0 {
            continue;
        }

        for row in 0..rows {
            let sprite_row = sprite_row(memory, i, row, big, narrow);
            let y = origin_y + row;
            if clip && y >= height {
                break;
            }

            for column in 0..columns {
                if (sprite_row >> (bits - 1 - column)) & 0x1 == 0 {
                    continue;
                }
                let x = origin_x + column;
                if clip && x >= width {
                    break;
                }
                collision |= display.plot(plane, x, y);
            }
        }

        i = i.wrapping_add(if big { 32 } else { n as u16 });
    }

    cpu.registers.v[0xF] = collision as u8;
}

/// One row of sprite data, left-aligned in 16 bits for big sprites
fn sprite_row(memory: &Memory, i: u16, row: usize, big: bool, narrow: bool) -> u16 {
    let row = row as u16;
    if !big {
        return u16::from(memory.read(i.wrapping_add(row)));
    }
    let start = if narrow { i.wrapping_add(row) } else { i.wrapping_add(row * 2) };
    u16::from(memory.read(start)) << 8 | u16::from(memory.read(start.wrapping_add(1)))
}

/// if Vx.pressed then skip
pub fn skpr(machine: &mut Chip8, operands: &Operands) {
    let key = machine.cpu.registers.v[reg(operands, 0)] & 0xF;
    let condition = machine.cpu.registers.keys[key as usize];
    machine.skip_if(condition);
}

/// if !Vx.pressed then skip
pub fn skup(machine: &mut Chip8, operands: &Operands) {
    let key = machine.cpu.registers.v[reg(operands, 0)] & 0xF;
    let condition = !machine.cpu.registers.keys[key as usize];
    machine.skip_if(condition);
}

/// I = nnnn
pub fn loadi_long(machine: &mut Chip8, operands: &Operands) {
    machine.cpu.registers.i = operands[0].value;
}

/// plane_mask = n
pub fn plane(machine: &mut Chip8, operands: &Operands) {
    machine.display.set_plane_mask(byte(operands, 0));
}

/// audio_buffer = mem[I..I+16]
pub fn audio(machine: &mut Chip8, _operands: &Operands) {
    let i = machine.cpu.registers.i;
    for position in 0..16u8 {
        let data = machine.memory.read(i.wrapping_add(u16::from(position)));
        machine.memory.write_audio(position, data);
    }
    machine.memory.set_use_beep(false);
}

/// Vx = DT
pub fn moved(machine: &mut Chip8, operands: &Operands) {
    machine.cpu.registers.v[reg(operands, 0)] = machine.cpu.registers.delay_timer;
}

/// await keypress for Vx
pub fn keyd(machine: &mut Chip8, operands: &Operands) {
    machine.cpu.register_needing_key = Some(reg(operands, 0) as u8);
}

/// DT = Vx
pub fn set_delay(machine: &mut Chip8, operands: &Operands) {
    machine.cpu.registers.delay_timer = machine.cpu.registers.v[reg(operands, 0)];
}

/// ST = Vx
pub fn set_buzzer(machine: &mut Chip8, operands: &Operands) {
    machine.cpu.registers.sound_timer = machine.cpu.registers.v[reg(operands, 0)];
}

/// I += Vx
/// Under the I register carry quirk I wraps at 12 bits and VF reports the overflow
pub fn addi(machine: &mut Chip8, operands: &Operands) {
    let registers = &mut machine.cpu.registers;
    let vx = u16::from(registers.v[reg(operands, 0)]);
    if registers.quirks.contains(Quirks::I_REG_CARRY) {
        let sum = registers.i.wrapping_add(vx);
        registers.i = sum & 0xFFF;
        registers.v[0xF] = (sum > 0xFFF) as u8;
    } else {
        registers.i = registers.i.wrapping_add(vx);
    }
}

/// I = Vx * 5
/// Set I to the memory address of the small font glyph for Vx
pub fn ldspr(machine: &mut Chip8, operands: &Operands) {
    let vx = machine.cpu.registers.v[reg(operands, 0)];
    machine.cpu.registers.i = Memory::character_address(vx);
}

/// Set I to the memory address of the big font glyph for Vx
pub fn ldbigspr(machine: &mut Chip8, operands: &Operands) {
    let vx = machine.cpu.registers.v[reg(operands, 0)];
    machine.cpu.registers.i = Memory::big_character_address(vx & 0xF);
}

/// mem[I..I+3] = bcd(Vx)
/// Store BCD repr of Vx in memory starting at address i
pub fn bcd(machine: &mut Chip8, operands: &Operands) {
    let vx = machine.cpu.registers.v[reg(operands, 0)];
    let i = machine.cpu.registers.i;
    let digits = [vx / 100 % 10, vx / 10 % 10, vx % 10];
    for (offset, digit) in digits.iter().enumerate() {
        machine.memory.write(i.wrapping_add(offset as u16), *digit);
    }
}

/// pitch = 4000 * 2^((Vx - 64) / 48)
pub fn pitch(machine: &mut Chip8, operands: &Operands) {
    let vx = f64::from(machine.cpu.registers.v[reg(operands, 0)]);
    machine.cpu.registers.pitch = DEFAULT_PITCH * 2f64.powf((vx - 64.0) / 48.0);
    machine.cpu.pitch_dirty = true;
    machine.memory.set_use_beep(false);
}

/// Moves I past the register range unless the load/store quirk is set
fn advance_i(machine: &mut Chip8, x: usize) {
    if !machine.cpu.quirk_set(Quirks::LOAD_STORE) {
        let i = machine.cpu.registers.i;
        machine.cpu.registers.i = i.wrapping_add(x as u16 + 1);
    }
}

/// mem[I..=I+x] = V0..=Vx
pub fn stor(machine: &mut Chip8, operands: &Operands) {
    let x = reg(operands, 0);
    let i = machine.cpu.registers.i;
    for r in 0..=x {
        let value = machine.cpu.registers.v[r];
        machine.memory.write(i.wrapping_add(r as u16), value);
    }
    advance_i(machine, x);
}

/// V0..=Vx = mem[I..=I+x]
pub fn read(machine: &mut Chip8, operands: &Operands) {
    let x = reg(operands, 0);
    let i = machine.cpu.registers.i;
    for r in 0..=x {
        machine.cpu.registers.v[r] = machine.memory.read(i.wrapping_add(r as u16));
    }
    advance_i(machine, x);
}

/// flags = V0..=Vx
pub fn save_flags(machine: &mut Chip8, operands: &Operands) {
    machine.save_flags(reg(operands, 0));
}

/// V0..=Vx = flags
pub fn load_flags(machine: &mut Chip8, operands: &Operands) {
    machine.load_flags(reg(operands, 0));
}

/// Does nothing; unmatched opcodes land here
pub fn nop(_machine: &mut Chip8, _operands: &Operands) {}
