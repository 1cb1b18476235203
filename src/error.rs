use std::{fmt, io};

use serde::{de, ser};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Which stage of the pipeline an [`Error`] came from.
///
/// Every error variant belongs to exactly one kind, so callers can tell "the bytes weren't valid
/// gzip" apart from "the gzip payload wasn't a valid report".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The value could not be serialized.
    Encoding,
    /// The raw bytes did not parse into the expected structure.
    Decoding,
    /// The gzip stream could not be written.
    Compression,
    /// The input was not a valid, complete gzip container.
    Decompression,
}

#[derive(Debug)]
pub enum Error {
    /// Occurs when serde serialization fails, a map key isn't a string, or nesting is too deep.
    Encode(String),
    /// Occurs when serde deserialization fails or the encoded data is malformed.
    Decode(String),
    /// Encoded data ended too early.
    LengthTooShort {
        step: &'static str,
        actual: usize,
        expected: usize,
    },
    /// Decoding hit the nesting limit.
    ParseLimit(String),
    /// The encoded report carries a version byte this build doesn't understand.
    UnsupportedVersion(u8),
    /// Writing to the gzip encoder failed.
    Compress(io::Error),
    /// The gzip decoder rejected the stream (bad header, corrupt data, checksum mismatch, early
    /// end of stream).
    Decompress(io::Error),
    /// Compressed input is shorter than the smallest possible gzip header.
    TooShort { actual: usize, minimum: usize },
    /// Data follows the end of the gzip member.
    TrailingBytes(usize),
    /// Decompressed data was larger than the configured maximum.
    LengthTooLong { max: usize, actual: usize },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Encode(_) => ErrorKind::Encoding,
            Error::Decode(_)
            | Error::LengthTooShort { .. }
            | Error::ParseLimit(_)
            | Error::UnsupportedVersion(_) => ErrorKind::Decoding,
            Error::Compress(_) => ErrorKind::Compression,
            Error::Decompress(_)
            | Error::TooShort { .. }
            | Error::TrailingBytes(_)
            | Error::LengthTooLong { .. } => ErrorKind::Decompression,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Encode(ref msg) => write!(f, "Encoding failure: {}", msg),
            Error::Decode(ref msg) => write!(f, "Decoding failure: {}", msg),
            Error::LengthTooShort {
                step,
                actual,
                expected,
            } => write!(
                f,
                "Expected data length {}, but got {} on step [{}]",
                expected, actual, step
            ),
            Error::ParseLimit(ref msg) => write!(f, "Hit parsing limit: {}", msg),
            Error::UnsupportedVersion(v) => write!(f, "Unsupported encoding version {}", v),
            Error::Compress(ref err) => write!(f, "Failed compression step: {}", err),
            Error::Decompress(ref err) => write!(f, "Failed decompression step: {}", err),
            Error::TooShort { actual, minimum } => write!(
                f,
                "Compressed data is {} bytes, shorter than the {} byte gzip header",
                actual, minimum
            ),
            Error::TrailingBytes(len) => {
                write!(f, "Found {} trailing bytes after the gzip stream", len)
            }
            Error::LengthTooLong { max, actual } => write!(
                f,
                "Decompressed data too long: was at least {} bytes, maximum allowed is {}",
                actual, max
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::Compress(ref err) | Error::Decompress(ref err) => Some(err),
            _ => None,
        }
    }
}

impl ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Encode(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Decode(msg.to_string())
    }
}
