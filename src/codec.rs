use log::{debug, trace};

use crate::{
    compress::CompressOptions,
    de::from_slice,
    error::{Error, Result},
    report::PostGameCarnageReport,
    ser::to_vec_with,
};

/// Leading byte of every encoded report. Bumped whenever any record's field list changes;
/// payloads with a different version are rejected rather than migrated.
pub const ENCODING_VERSION: u8 = 1;

/// Highest gzip level the encoder accepts.
pub const MAX_LEVEL: u32 = 9;

/// Encode a report into its canonical byte form.
pub fn encode(report: &PostGameCarnageReport) -> Result<Vec<u8>> {
    let encoded = to_vec_with(vec![ENCODING_VERSION], report)?;
    trace!(
        "encoded report with {} entries into {} bytes",
        report.entries.len(),
        encoded.len()
    );
    Ok(encoded)
}

/// Decode a report produced by [`encode`]. The whole slice must be consumed.
pub fn decode(data: &[u8]) -> Result<PostGameCarnageReport> {
    let (&version, body) = data.split_first().ok_or(Error::LengthTooShort {
        step: "read encoding version",
        actual: 0,
        expected: 1,
    })?;
    if version != ENCODING_VERSION {
        return Err(Error::UnsupportedVersion(version));
    }
    from_slice(body)
}

/// Compresses and decompresses reports with a fixed set of options.
///
/// Holds no state between calls, so one `Codec` can be shared freely across threads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Codec {
    options: CompressOptions,
}

impl Codec {
    /// Fails if the compression level is outside `0..=9`.
    pub fn new(options: CompressOptions) -> Result<Self> {
        if options.level > MAX_LEVEL {
            return Err(Error::Compress(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "compression level {} is out of range 0..={}",
                    options.level, MAX_LEVEL
                ),
            )));
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> &CompressOptions {
        &self.options
    }

    /// Encode, then gzip, a report.
    pub fn compress(&self, report: &PostGameCarnageReport) -> Result<Vec<u8>> {
        let encoded = encode(report).map_err(|e| {
            debug!("report encoding failed: {}", e);
            e
        })?;
        let compressed = self.compress_bytes(&encoded)?;
        trace!(
            "compressed report {} from {} to {} bytes",
            report.activity_details.instance_id,
            encoded.len(),
            compressed.len()
        );
        Ok(compressed)
    }

    /// Gunzip, then decode, a report.
    pub fn decompress(&self, compressed: &[u8]) -> Result<PostGameCarnageReport> {
        let encoded = self.decompress_bytes(compressed)?;
        let report = decode(&encoded).map_err(|e| {
            debug!("decoding {} decompressed bytes failed: {}", encoded.len(), e);
            e
        })?;
        trace!(
            "decompressed report {} from {} to {} bytes",
            report.activity_details.instance_id,
            compressed.len(),
            encoded.len()
        );
        Ok(report)
    }

    pub fn compress_bytes(&self, raw: &[u8]) -> Result<Vec<u8>> {
        self.options.compress(raw).map_err(|e| {
            debug!("gzip compression of {} bytes failed: {}", raw.len(), e);
            e
        })
    }

    pub fn decompress_bytes(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        self.options.decompress(compressed).map_err(|e| {
            debug!("gzip decompression of {} bytes failed: {}", compressed.len(), e);
            e
        })
    }
}

/// Encode and gzip a report with the default options.
pub fn compress(report: &PostGameCarnageReport) -> Result<Vec<u8>> {
    Codec::default().compress(report)
}

/// Gunzip and decode a report with the default options.
pub fn decompress(compressed: &[u8]) -> Result<PostGameCarnageReport> {
    Codec::default().decompress(compressed)
}
