use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use xo8_core::{Profile, Quirk};

mod run;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileArg {
    Vip,
    Schip,
    XoChip,
}

impl From<ProfileArg> for Profile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Vip => Profile::Vip,
            ProfileArg::Schip => Profile::Schip,
            ProfileArg::XoChip => Profile::XoChip,
        }
    }
}

fn parse_quirk(name: &str) -> Result<Quirk, String> {
    Quirk::from_name(name).ok_or_else(|| format!("unknown quirk '{}'", name))
}

/// Accepts `0x2A0`, `$2A0` or bare hex
fn parse_addr(s: &str) -> Result<u16, String> {
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .or_else(|| s.strip_prefix('$'))
        .unwrap_or(s);
    u16::from_str_radix(hex, 16).map_err(|e| format!("bad address '{}': {}", s, e))
}

#[derive(Parser, Debug)]
#[command(
    name = "xo8",
    about = "Runs a CHIP-8 / SCHIP / XO-CHIP rom headlessly and prints the final screen."
)]
pub struct Args {
    /// Rom image to load at 0x200.
    rom: PathBuf,

    /// Compatibility profile whose quirks are applied on load.
    #[arg(long, value_enum, default_value_t = ProfileArg::XoChip)]
    profile: ProfileArg,

    /// Instructions executed per frame.
    #[arg(long, default_value_t = xo8_core::constants::DEFAULT_CYCLES_PER_FRAME)]
    cycles: u32,

    /// Frames to run before printing the screen.
    #[arg(long, default_value_t = 60)]
    frames: u32,

    /// Extra quirk to set on top of the profile (can repeat).
    #[arg(long = "quirk", value_name = "NAME", value_parser = parse_quirk)]
    quirks: Vec<Quirk>,

    /// Halt when the pc reaches this address (hex, can repeat).
    #[arg(long = "break", value_name = "ADDR", value_parser = parse_addr)]
    breakpoints: Vec<u16>,

    /// Print every instruction reached after the screen.
    #[arg(long, default_value_t = false)]
    disassemble: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    run::run(args)
}
