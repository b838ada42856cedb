use bitflags::bitflags;

bitflags! {
    /// Compatibility toggles, each altering one instruction family to match
    /// a historical interpreter. Any combination is legal.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Quirks: u8 {
        /// 8XY6/8XYE shift vX in place instead of shifting vY into vX
        const SHIFT = 0b0000_0001;
        /// FX55/FX65 leave i unchanged
        const LOAD_STORE = 0b0000_0010;
        /// Sprite pixels past the display edge are dropped instead of wrapped
        const CLIP = 0b0000_0100;
        /// BNNN jumps to NNN + vN where N is the high nibble of NNN
        const JUMP = 0b0000_1000;
        /// 8XY1/8XY2/8XY3 clear vF
        const LOGIC = 0b0001_0000;
        /// 16x16 sprites are drawn 8 pixels wide in lores mode
        const LORES_SPRITES = 0b0010_0000;
        /// DXYN waits for the next frame before drawing
        const VBLANK = 0b0100_0000;
        /// FX1E wraps i at 12 bits and reports the overflow in vF
        const I_REG_CARRY = 0b1000_0000;
    }
}

/// Names a single quirk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quirk {
    Shift,
    LoadStore,
    Clip,
    Jump,
    Logic,
    LoresSprites,
    VBlank,
    IRegCarry,
}

impl Quirk {
    pub const ALL: [Quirk; 8] = [
        Quirk::Shift,
        Quirk::LoadStore,
        Quirk::Clip,
        Quirk::Jump,
        Quirk::Logic,
        Quirk::LoresSprites,
        Quirk::VBlank,
        Quirk::IRegCarry,
    ];

    pub fn flag(self) -> Quirks {
        match self {
            Quirk::Shift => Quirks::SHIFT,
            Quirk::LoadStore => Quirks::LOAD_STORE,
            Quirk::Clip => Quirks::CLIP,
            Quirk::Jump => Quirks::JUMP,
            Quirk::Logic => Quirks::LOGIC,
            Quirk::LoresSprites => Quirks::LORES_SPRITES,
            Quirk::VBlank => Quirks::VBLANK,
            Quirk::IRegCarry => Quirks::I_REG_CARRY,
        }
    }

    /// Parses the kebab-case name used on the command line
    pub fn from_name(name: &str) -> Option<Quirk> {
        match name {
            "shift" => Some(Quirk::Shift),
            "load-store" => Some(Quirk::LoadStore),
            "clip" => Some(Quirk::Clip),
            "jump" => Some(Quirk::Jump),
            "logic" => Some(Quirk::Logic),
            "lores-sprites" => Some(Quirk::LoresSprites),
            "vblank" => Some(Quirk::VBlank),
            "i-reg-carry" => Some(Quirk::IRegCarry),
            _ => None,
        }
    }
}

/// # Profiles
/// Named bundles of quirks applied all at once.
///
/// | Profile | Quirks |
/// |---------|--------|
/// | VIP     | Logic, Clip, VBlank |
/// | SCHIP   | Shift, LoadStore, Jump, Clip |
/// | XO-CHIP | none |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    Vip,
    Schip,
    XoChip,
}

impl Profile {
    pub fn quirks(self) -> Quirks {
        match self {
            Profile::Vip => Quirks::LOGIC | Quirks::CLIP | Quirks::VBLANK,
            Profile::Schip => Quirks::SHIFT | Quirks::LOAD_STORE | Quirks::JUMP | Quirks::CLIP,
            Profile::XoChip => Quirks::empty(),
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Profile::XoChip
    }
}
