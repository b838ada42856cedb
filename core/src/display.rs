use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, LORES_HEIGHT, LORES_WIDTH, PLANE_COUNT,
};

/// One plane's backing store, indexed as `y * DISPLAY_WIDTH + x`
pub type PlaneBuffer = Vec<u8>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }
}

/// Background, plane 1, plane 2 and both-planes colors, in that order
pub type Palette = [Color; 4];

pub const DEFAULT_PALETTE: Palette = [
    Color::rgba(0x99, 0x66, 0x00, 0xFF),
    Color::rgba(0xFF, 0xCC, 0x00, 0xFF),
    Color::rgba(0xFF, 0x66, 0x00, 0xFF),
    Color::rgba(0x66, 0x22, 0x00, 0xFF),
];

/// # Display
/// Two independent 128x64 bit planes. The plane mask selects which of them
/// clear, scroll and sprite drawing touch.
///
/// In lores mode the logical display is 64x32 and every logical pixel is
/// stored as a 2x2 block, so renderers can always read a 128x64 image.
///
/// The display never wraps or clips sprites itself; that is decided by the
/// CPU when it draws.
#[derive(Debug, Clone)]
pub struct Display {
    buffers: [PlaneBuffer; PLANE_COUNT],
    plane_mask: u8,
    high_res: bool,
    palette: Palette,
}

impl Display {
    pub fn new() -> Self {
        Display {
            buffers: [
                vec![0; DISPLAY_WIDTH * DISPLAY_HEIGHT],
                vec![0; DISPLAY_WIDTH * DISPLAY_HEIGHT],
            ],
            plane_mask: 0x1,
            high_res: false,
            palette: DEFAULT_PALETTE,
        }
    }

    /// Blanks both planes, selects plane 1 and drops back to lores.
    /// The palette is left alone.
    pub fn reset(&mut self) {
        self.plane_mask = 0x1;
        self.high_res = false;
        for buffer in self.buffers.iter_mut() {
            buffer.iter_mut().for_each(|p| *p = 0);
        }
    }

    pub fn high_res(&self) -> bool {
        self.high_res
    }

    pub fn set_high_res(&mut self, high_res: bool) {
        self.high_res = high_res;
    }

    pub fn plane_mask(&self) -> u8 {
        self.plane_mask
    }

    pub fn set_plane_mask(&mut self, mask: u8) {
        self.plane_mask = mask & 0x3;
    }

    /// Logical width for the current resolution
    pub fn width(&self) -> usize {
        if self.high_res {
            DISPLAY_WIDTH
        } else {
            LORES_WIDTH
        }
    }

    /// Logical height for the current resolution
    pub fn height(&self) -> usize {
        if self.high_res {
            DISPLAY_HEIGHT
        } else {
            LORES_HEIGHT
        }
    }

    pub fn buffers(&self) -> &[PlaneBuffer; PLANE_COUNT] {
        &self.buffers
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    pub fn set_color(&mut self, index: usize, color: Color) {
        if let Some(slot) = self.palette.get_mut(index) {
            *slot = color;
        }
    }

    /// Indexes of the planes selected by the plane mask
    fn active_planes(&self) -> impl Iterator<Item = usize> {
        let mask = self.plane_mask;
        (0..PLANE_COUNT).filter(move |plane| mask & (1 << plane) != 0)
    }

    /// Zeroes every plane selected by the plane mask
    pub fn clear(&mut self) {
        for plane in self.active_planes() {
            self.buffers[plane].iter_mut().for_each(|p| *p = 0);
        }
    }

    /// Toggles a logical pixel on `plane`.
    /// Returns true if the pixel was set and has now been erased.
    ///
    /// # Arguments
    /// * `plane` 0 or 1
    /// * `x` logical column; wraps at the backing width
    /// * `y` logical row; wraps at the backing height
    pub fn plot(&mut self, plane: usize, x: usize, y: usize) -> bool {
        let (x, y) = if self.high_res { (x, y) } else { (x * 2, y * 2) };
        self.set_pixel(plane, x, y)
    }

    fn set_pixel(&mut self, plane: usize, x: usize, y: usize) -> bool {
        let x = x % DISPLAY_WIDTH;
        let y = y % DISPLAY_HEIGHT;

        let top_left = y * DISPLAY_WIDTH + x;
        let right = if x + 1 < DISPLAY_WIDTH { x + 1 } else { x };
        let below = if y + 1 < DISPLAY_HEIGHT { y + 1 } else { y };

        let buffer = &mut self.buffers[plane];
        let erased = buffer[top_left] != 0;
        buffer[top_left] = if erased { 0 } else { 1 };

        if !self.high_res {
            let value = buffer[top_left];
            buffer[y * DISPLAY_WIDTH + right] = value;
            buffer[below * DISPLAY_WIDTH + x] = value;
            buffer[below * DISPLAY_WIDTH + right] = value;
        }

        erased
    }

    fn copy_row(&mut self, source: usize, destination: usize) {
        for plane in self.active_planes() {
            let start = source * DISPLAY_WIDTH;
            self.buffers[plane].copy_within(start..start + DISPLAY_WIDTH, destination * DISPLAY_WIDTH);
        }
    }

    fn copy_column(&mut self, source: usize, destination: usize) {
        for plane in self.active_planes() {
            let buffer = &mut self.buffers[plane];
            for row in 0..DISPLAY_HEIGHT {
                let offset = row * DISPLAY_WIDTH;
                buffer[offset + destination] = buffer[offset + source];
            }
        }
    }

    fn clear_row(&mut self, row: usize) {
        for plane in self.active_planes() {
            let start = row * DISPLAY_WIDTH;
            self.buffers[plane][start..start + DISPLAY_WIDTH]
                .iter_mut()
                .for_each(|p| *p = 0);
        }
    }

    fn clear_column(&mut self, column: usize) {
        for plane in self.active_planes() {
            for row in 0..DISPLAY_HEIGHT {
                self.buffers[plane][row * DISPLAY_WIDTH + column] = 0;
            }
        }
    }

    /// Moves every row of the active planes down by `count` backing rows
    pub fn scroll_down(&mut self, count: u8) {
        let count = (count as usize).min(DISPLAY_HEIGHT);
        for y in (0..DISPLAY_HEIGHT - count).rev() {
            self.copy_row(y, y + count);
        }
        for y in 0..count {
            self.clear_row(y);
        }
    }

    /// Moves every row of the active planes up by `count` backing rows
    pub fn scroll_up(&mut self, count: u8) {
        let count = (count as usize).min(DISPLAY_HEIGHT);
        for y in 0..DISPLAY_HEIGHT - count {
            self.copy_row(y + count, y);
        }
        for y in 0..count {
            self.clear_row(DISPLAY_HEIGHT - y - 1);
        }
    }

    /// Moves every column of the active planes left by `count` backing columns
    pub fn scroll_left(&mut self, count: u8) {
        let count = (count as usize).min(DISPLAY_WIDTH);
        for x in 0..DISPLAY_WIDTH - count {
            self.copy_column(x + count, x);
        }
        for x in 0..count {
            self.clear_column(DISPLAY_WIDTH - x - 1);
        }
    }

    /// Moves every column of the active planes right by `count` backing columns
    pub fn scroll_right(&mut self, count: u8) {
        let count = (count as usize).min(DISPLAY_WIDTH);
        for x in (0..DISPLAY_WIDTH - count).rev() {
            self.copy_column(x, x + count);
        }
        for x in 0..count {
            self.clear_column(x);
        }
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}
