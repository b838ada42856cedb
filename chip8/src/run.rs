use std::error::Error;

use log::info;

use xo8_core::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use xo8_core::Chip8;

use crate::Args;

pub fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut chip8 = Chip8::new();
    chip8.set_profile(args.profile.into());
    chip8.set_cycles_per_frame(args.cycles);
    chip8.load_rom(&args.rom)?;
    chip8.set_quirks(&args.quirks, true);
    for (n, addr) in args.breakpoints.iter().enumerate() {
        chip8.add_breakpoint(&format!("break{}", n), *addr);
    }
    info!("loaded {} with quirks {:?}", args.rom.display(), chip8.quirks());

    // One iteration per 60Hz frame; the timers tick at the same rate
    let mut frames = 0;
    while frames < args.frames && chip8.running() {
        chip8.frame();
        chip8.tick_timers();
        frames += 1;
    }

    if let Some(breakpoint) = chip8.breakpoint_hit() {
        println!("stopped at {} (0x{:04X})", breakpoint.label, breakpoint.addr);
    }
    if chip8.waiting_for_key() {
        println!("waiting for a key press");
    }
    println!("ran {} frames, {} instructions", frames, chip8.cpu().cycles());
    print!("{}", render(&chip8));

    if args.disassemble {
        for line in chip8.disassembly().lines() {
            println!("{:04X}  {:<11}  {}", line.addr, line.bytes, line.text);
        }
    }

    Ok(())
}

/// Draws both planes as text, two backing rows per line.
/// ' ' is blank, '1' plane 1 only, '2' plane 2 only, '#' both.
fn render(chip8: &Chip8) -> String {
    let [plane1, plane2] = chip8.buffers();
    let mut screen = String::with_capacity((DISPLAY_WIDTH + 1) * DISPLAY_HEIGHT / 2);
    for y in (0..DISPLAY_HEIGHT).step_by(2) {
        for x in 0..DISPLAY_WIDTH {
            let offset = y * DISPLAY_WIDTH + x;
            screen.push(match (plane1[offset], plane2[offset]) {
                (0, 0) => ' ',
                (_, 0) => '1',
                (0, _) => '2',
                _ => '#',
            });
        }
        screen.push('\n');
    }
    screen
}
