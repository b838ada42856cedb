/// # Opcodes
///
/// XO-CHIP opcodes are 16 bits each (`F000` is followed by a second 16-bit word).
/// The leading nibble selects a family; families 0, 5, 8, E and F need more
/// of the word to tell their members apart:
/// - `(n, _, _, _)` family; enough for 1, 2, 3, 4, 6, 7, 9, A, B, C and D
/// - `(n, _, _, n)` families 5 and 8
/// - `(n, _, n, n)` families E and F
/// - `(0, _, n, n)` and `(0, _, n, _)` family 0
///
/// The remaining twelve bits are the operand field, sliced up by
/// `operand_nibble` according to each instruction's operand types.
pub trait Opcode {
    /// Family, x, y and n, most significant first.
    fn nibbles(&self) -> (u8, u8, u8, u8);

    /// `[f___]`
    fn family(&self) -> u8;

    /// `[_x__]` the register vX, a scroll count, or a plane mask
    fn x(&self) -> u8;

    /// `[__y_]` the register vY
    fn y(&self) -> u8;

    /// `[___n]`
    fn n(&self) -> u8;

    /// `[_nnn]` the operand field
    fn addr(&self) -> u16;

    /// Nibble `position` of the operand field, counting from the right.
    /// `[_210]`
    fn operand_nibble(&self, position: u8) -> u8;
}

impl Opcode for u16 {
    fn nibbles(&self) -> (u8, u8, u8, u8) {
        (self.family(), self.x(), self.y(), self.n())
    }

    fn family(&self) -> u8 {
        (self >> 12) as u8
    }

    fn x(&self) -> u8 {
        self.operand_nibble(2)
    }

    fn y(&self) -> u8 {
        self.operand_nibble(1)
    }

    fn n(&self) -> u8 {
        self.operand_nibble(0)
    }

    fn addr(&self) -> u16 {
        self & 0x0FFF
    }

    fn operand_nibble(&self, position: u8) -> u8 {
        let shift = u16::from(position & 0x3) * 4;
        ((self.addr() >> shift) & 0xF) as u8
    }
}
