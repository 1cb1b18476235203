use std::io::{Read, Write};

use flate2::{bufread::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Smallest possible gzip header: magic, method, flags, mtime, extra flags, OS.
pub const GZIP_HEADER_LEN: usize = 10;

/// Default cap on decompressed output, 16 MiB. A report is usually a few tens of kiB.
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 1usize << 24;

/// Default gzip compression level.
pub const DEFAULT_LEVEL: u32 = 6;

/// Compression settings for reports.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CompressOptions {
    /// Gzip compression level, 0 (store only) to 9 (best).
    pub level: u32,
    /// Maximum number of bytes decompression is allowed to produce.
    pub max_decompressed_size: usize,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
        }
    }
}

impl CompressOptions {
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_max_decompressed_size(mut self, max: usize) -> Self {
        self.max_decompressed_size = max;
        self
    }

    /// Compress `raw` into a single gzip member. Always compresses, even when the input is empty.
    pub(crate) fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        // The encoder is dropped on every exit path, which releases its deflate state
        let mut encoder = GzEncoder::new(
            Vec::with_capacity(raw.len() / 2 + GZIP_HEADER_LEN + 8),
            Compression::new(self.level),
        );
        encoder.write_all(raw).map_err(Error::Compress)?;
        encoder.finish().map_err(Error::Compress)
    }

    /// Decompress a single gzip member, draining the stream and verifying the CRC and length
    /// trailer. Anything after the member is rejected.
    pub(crate) fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        if compressed.len() < GZIP_HEADER_LEN {
            return Err(Error::TooShort {
                actual: compressed.len(),
                minimum: GZIP_HEADER_LEN,
            });
        }

        let max = self.max_decompressed_size;
        let mut decoder = GzDecoder::new(compressed);
        let mut raw = Vec::with_capacity(compressed.len().saturating_mul(4).min(max));
        // Read one byte past the limit so we can tell "exactly max" apart from "too long". Short
        // of the limit, read_to_end only returns once the decoder has checked the trailer.
        let limit = (max as u64).saturating_add(1);
        (&mut decoder)
            .take(limit)
            .read_to_end(&mut raw)
            .map_err(Error::Decompress)?;
        if raw.len() > max {
            return Err(Error::LengthTooLong {
                max,
                actual: raw.len(),
            });
        }

        let rest = decoder.into_inner();
        if !rest.is_empty() {
            return Err(Error::TrailingBytes(rest.len()));
        }
        Ok(raw)
    }
}

/// Compress raw bytes with the default settings.
pub fn compress_bytes(raw: &[u8]) -> Result<Vec<u8>> {
    CompressOptions::default().compress(raw)
}

/// Decompress raw bytes with the default settings.
pub fn decompress_bytes(compressed: &[u8]) -> Result<Vec<u8>> {
    CompressOptions::default().decompress(compressed)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;
    use rand::Rng;

    fn sample() -> Vec<u8> {
        let mut data = Vec::new();
        for i in 0..200u32 {
            data.extend_from_slice(b"killsDeathsAssists");
            data.extend_from_slice(&i.to_le_bytes());
        }
        data
    }

    #[test]
    fn roundtrip() {
        let data = sample();
        let compressed = compress_bytes(&data).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(decompress_bytes(&compressed).unwrap(), data);
    }

    #[test]
    fn empty_input_still_compressed() {
        let compressed = compress_bytes(&[]).unwrap();
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
        assert!(compressed.len() >= GZIP_HEADER_LEN + 8);
        assert!(decompress_bytes(&compressed).unwrap().is_empty());
    }

    #[test]
    fn tiny_input_still_compressed() {
        let compressed = compress_bytes(b"x").unwrap();
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
        assert_eq!(decompress_bytes(&compressed).unwrap(), b"x");
    }

    #[test]
    fn all_levels() {
        let data = sample();
        for level in 0..=9 {
            let opts = CompressOptions::default().with_level(level);
            let compressed = opts.compress(&data).unwrap();
            assert_eq!(opts.decompress(&compressed).unwrap(), data);
        }
    }

    #[test]
    fn plain_gzip_reader_accepts_output() {
        let data = sample();
        let compressed = compress_bytes(&data).unwrap();
        let mut out = Vec::new();
        flate2::read::GzDecoder::new(&compressed[..])
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn accepts_foreign_gzip() {
        // Compressed by a different encoder configuration, with a file name in the header
        let data = sample();
        let mut encoder = flate2::GzBuilder::new()
            .filename("pgcr.bin")
            .write(Vec::new(), Compression::best());
        encoder.write_all(&data).unwrap();
        let compressed = encoder.finish().unwrap();
        assert_eq!(decompress_bytes(&compressed).unwrap(), data);
    }

    #[test]
    fn short_header() {
        let compressed = compress_bytes(&sample()).unwrap();
        for len in 0..GZIP_HEADER_LEN {
            let err = decompress_bytes(&compressed[..len]).unwrap_err();
            assert!(matches!(err, Error::TooShort { .. }));
            assert_eq!(err.kind(), ErrorKind::Decompression);
        }
    }

    #[test]
    fn every_truncation_fails() {
        let compressed = compress_bytes(&sample()).unwrap();
        for len in 0..compressed.len() {
            let err = decompress_bytes(&compressed[..len]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Decompression, "len {}: {}", len, err);
        }
    }

    #[test]
    fn bad_magic() {
        let mut compressed = compress_bytes(&sample()).unwrap();
        compressed[0] = 0x1e;
        let err = decompress_bytes(&compressed).unwrap_err();
        assert!(matches!(err, Error::Decompress(_)));
    }

    #[test]
    fn checksum_mismatch() {
        let mut compressed = compress_bytes(&sample()).unwrap();
        let crc_pos = compressed.len() - 8;
        compressed[crc_pos] ^= 0x01;
        let err = decompress_bytes(&compressed).unwrap_err();
        assert!(matches!(err, Error::Decompress(_)));
    }

    #[test]
    fn size_mismatch() {
        let mut compressed = compress_bytes(&sample()).unwrap();
        let size_pos = compressed.len() - 4;
        compressed[size_pos] ^= 0x01;
        let err = decompress_bytes(&compressed).unwrap_err();
        assert!(matches!(err, Error::Decompress(_)));
    }

    #[test]
    fn trailing_bytes() {
        let mut compressed = compress_bytes(&sample()).unwrap();
        compressed.extend_from_slice(&[0, 1, 2]);
        let err = decompress_bytes(&compressed).unwrap_err();
        assert!(matches!(err, Error::TrailingBytes(3)));

        // A second gzip member is still trailing data
        let mut doubled = compress_bytes(b"a").unwrap();
        let second = compress_bytes(b"b").unwrap();
        doubled.extend_from_slice(&second);
        let err = decompress_bytes(&doubled).unwrap_err();
        assert!(matches!(err, Error::TrailingBytes(n) if n == second.len()));
    }

    #[test]
    fn random_payload_corruption() {
        let data = sample();
        let compressed = compress_bytes(&data).unwrap();
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let mut corrupt = compressed.clone();
            let pos = rng.gen_range(GZIP_HEADER_LEN..corrupt.len());
            corrupt[pos] ^= rng.gen_range(1..=u8::MAX);
            // Flips in the deflate padding bits of the last block are harmless
            match decompress_bytes(&corrupt) {
                Ok(out) => assert_eq!(out, data, "corruption at {} went undetected", pos),
                Err(e) => assert_eq!(e.kind(), ErrorKind::Decompression),
            }
        }
    }

    #[test]
    fn size_limit() {
        let data = sample();
        let compressed = compress_bytes(&data).unwrap();

        let exact = CompressOptions::default().with_max_decompressed_size(data.len());
        assert_eq!(exact.decompress(&compressed).unwrap(), data);

        let short = CompressOptions::default().with_max_decompressed_size(data.len() - 1);
        let err = short.decompress(&compressed).unwrap_err();
        assert!(matches!(err, Error::LengthTooLong { .. }));
        assert_eq!(err.kind(), ErrorKind::Decompression);
    }

    #[test]
    fn options_defaults_fill_in() {
        use std::collections::BTreeMap;
        let mut map = BTreeMap::new();
        map.insert("level", 9u32);
        let enc = crate::ser::to_vec(&map).unwrap();
        let opts: CompressOptions = crate::de::from_slice(&enc).unwrap();
        assert_eq!(opts.level, 9);
        assert_eq!(opts.max_decompressed_size, DEFAULT_MAX_DECOMPRESSED_SIZE);

        map.insert("dictionary", 1);
        let enc = crate::ser::to_vec(&map).unwrap();
        crate::de::from_slice::<CompressOptions>(&enc).unwrap_err();
    }
}
