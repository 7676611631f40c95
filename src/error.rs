//! Error types for configuration loading, GPU readback and GIF export.

use std::fmt;

/// Errors surfaced by the library.
#[derive(Debug)]
pub enum Error {
    /// Failed to read or write a file.
    Io(std::io::Error),
    /// The configuration file is not valid TOML or has unknown keys.
    Config(toml::de::Error),
    /// GIF encoding failed.
    Encode(image::ImageError),
    /// A buffer did not fit the data encase tried to write into it.
    Layout(encase::internal::Error),
    /// A capture produced no frames.
    EmptyCapture,
    /// A captured frame does not match the size of the first one.
    FrameSizeMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },
    /// Failed to map a GPU buffer for reading.
    BufferMapping(String),
    /// The render target cannot be read back as 8-bit RGBA.
    UnsupportedFormat(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Config(e) => write!(f, "Invalid configuration: {e}"),
            Error::Encode(e) => write!(f, "Failed to encode GIF: {e}"),
            Error::Layout(e) => write!(f, "Failed to lay out GPU data: {e}"),
            Error::EmptyCapture => write!(f, "Capture produced no frames"),
            Error::FrameSizeMismatch { expected, found } => write!(
                f,
                "Captured frame is {}x{}, expected {}x{}",
                found.0, found.1, expected.0, expected.1
            ),
            Error::BufferMapping(msg) => write!(f, "Failed to map GPU buffer: {msg}"),
            Error::UnsupportedFormat(format) => write!(f, "Cannot capture frames in {format} format"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Config(e) => Some(e),
            Error::Encode(e) => Some(e),
            Error::Layout(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e)
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Encode(e)
    }
}

impl From<encase::internal::Error> for Error {
    fn from(e: encase::internal::Error) -> Self {
        Error::Layout(e)
    }
}
