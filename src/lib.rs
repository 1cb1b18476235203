//! pgcr-pack stores Post Game Carnage Reports compactly and losslessly.
//!
//! A report goes through two steps on the way out:
//!
//! 1. It's encoded into a canonical, self-describing binary form. This is MessagePack with the
//!    extension types dropped, plus a few rules that make every value encode to exactly one byte
//!    sequence: integers use their shortest form, struct fields and map keys are written in sorted
//!    order, and a one-byte format version leads the payload.
//! 2. The encoding is wrapped in a single plain gzip member, so `zcat` or any other gzip tool can
//!    unpack a stored report for inspection.
//!
//! The way back undoes both, and the two halves fail differently: a bad gzip container is an
//! [`ErrorKind::Decompression`] error, while a good container holding a bad payload is an
//! [`ErrorKind::Decoding`] error.
//!
//! ```
//! use pgcr_pack::{compress, decompress, PostGameCarnageReport};
//!
//! let report = PostGameCarnageReport::default();
//! let bytes = compress(&report).unwrap();
//! assert_eq!(decompress(&bytes).unwrap(), report);
//! ```

mod codec;
mod compress;
mod de;
mod depth_tracking;
mod element;
mod error;
mod marker;
mod report;
mod ser;

pub use codec::{compress, decode, decompress, encode, Codec, ENCODING_VERSION, MAX_LEVEL};
pub use compress::{
    compress_bytes, decompress_bytes, CompressOptions, DEFAULT_LEVEL,
    DEFAULT_MAX_DECOMPRESSED_SIZE, GZIP_HEADER_LEN,
};
pub use de::from_slice;
pub use error::{Error, ErrorKind, Result};
pub use report::{
    ActivityDetails, ActivityMode, DestinyUserInfo, Metric, MetricValue, PlayerInformation,
    PostGameCarnageReport, PostGameCarnageReportEntry,
};
pub use ser::{to_vec, to_vec_with};

/// Maximum nesting depth of arrays and maps, on both encode and decode.
pub const MAX_DEPTH: usize = 100;
