// error.rs - Typed failures for the conversion pipeline
//
// Every variant is fatal to the current conversion. `kind()` folds the
// variants into the four failure classes callers branch on.

use std::path::PathBuf;
use thiserror::Error;

/// Failure class of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Source path could not be opened or read.
    File,
    /// Signature mismatch or unrecognized file extension.
    Format,
    /// Malformed stream or a color/depth combination we don't handle.
    Decode,
    /// Image exceeds a fixed capacity bound.
    Capacity,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("unable to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("unsupported file format {extension:?}, only .tga and .png are supported")]
    UnsupportedFormat { extension: String },

    #[error("not recognized as a {format} file")]
    NotRecognized { format: &'static str },

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("image too large: {width}x{height}x{channels} exceeds capacity of {capacity}")]
    TooLarge {
        width: u32,
        height: u32,
        channels: usize,
        capacity: usize,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Open { .. } | Error::Read(_) => ErrorKind::File,
            Error::UnsupportedFormat { .. } | Error::NotRecognized { .. } => ErrorKind::Format,
            Error::Decode(_) => ErrorKind::Decode,
            Error::TooLarge { .. } => ErrorKind::Capacity,
        }
    }

    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        Error::Decode(msg.into())
    }
}

impl From<png::DecodingError> for Error {
    fn from(err: png::DecodingError) -> Self {
        match err {
            // A stream that ends early is malformed, not unreadable
            png::DecodingError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Error::decode(format!("truncated stream: {e}"))
            }
            png::DecodingError::IoError(e) => Error::Read(e),
            png::DecodingError::LimitsExceeded => Error::decode("decoder memory limit exceeded"),
            other => Error::decode(other.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Error::decode(format!("truncated stream: {e}"))
            }
            image::ImageError::IoError(e) => Error::Read(e),
            other => Error::decode(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let open = Error::Open {
            path: PathBuf::from("x.png"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(open.kind(), ErrorKind::File);
        assert_eq!(
            Error::UnsupportedFormat { extension: "bmp".into() }.kind(),
            ErrorKind::Format
        );
        assert_eq!(Error::NotRecognized { format: "PNG" }.kind(), ErrorKind::Format);
        assert_eq!(Error::decode("bad").kind(), ErrorKind::Decode);
        let big = Error::TooLarge { width: 1, height: 1, channels: 4, capacity: 0 };
        assert_eq!(big.kind(), ErrorKind::Capacity);
    }

    #[test]
    fn eof_is_a_decode_failure() {
        let eof = std::io::Error::from(std::io::ErrorKind::UnexpectedEof);
        let err: Error = png::DecodingError::IoError(eof).into();
        assert_eq!(err.kind(), ErrorKind::Decode);

        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let err: Error = png::DecodingError::IoError(denied).into();
        assert_eq!(err.kind(), ErrorKind::File);
    }
}
