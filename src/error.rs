use std::fmt;

#[derive(Debug, Clone)]
pub enum Error {
    /// The layer-width list cannot describe a usable network, or a loaded
    /// model record is structurally inconsistent.
    InvalidTopology(String),
    /// Two matrices (or an index and a matrix) disagree on shape.
    DimensionMismatch(String),
    /// A persistence path has no known model format.
    UnsupportedFormat(String),
    /// A read, write, or open failed, or a model file is truncated/corrupt.
    Io(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidTopology(msg) => write!(f, "invalid topology: {msg}"),
            Error::DimensionMismatch(msg) => write!(f, "dimension mismatch: {msg}"),
            Error::UnsupportedFormat(msg) => write!(f, "unsupported format: {msg}"),
            Error::Io(msg) => write!(f, "i/o failure: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
