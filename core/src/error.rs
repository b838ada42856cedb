use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that escape the machine. Everything an instruction can do wrong
/// degrades to a documented default instead, see `Events`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unable to read ROM: {0}")]
    Io(#[from] std::io::Error),

    #[error("ROM is {size} bytes but at most {max} fit in memory")]
    RomTooLarge { size: usize, max: usize },
}
