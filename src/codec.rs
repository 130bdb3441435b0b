use std::fs::File;
use std::io::{self, BufReader, BufWriter};

use camino::Utf8Path;
use flate2::read::MultiGzDecoder;

use crate::error::MirrorError;

/// Compression level passed to the lz4 encoder. High ratio, and decompression
/// stays cheap for downstream consumers that re-download the data often.
const LZ4_LEVEL: u32 = 9;

pub trait Codec: Send + Sync {
    /// Decompress a gzip file into `dest`. The source is left in place.
    fn gunzip(&self, src: &Utf8Path, dest: &Utf8Path) -> Result<(), MirrorError>;

    /// Compress a file into an lz4 frame at `dest`.
    fn lz4_compress(&self, src: &Utf8Path, dest: &Utf8Path) -> Result<(), MirrorError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GzipLz4Codec;

impl Codec for GzipLz4Codec {
    fn gunzip(&self, src: &Utf8Path, dest: &Utf8Path) -> Result<(), MirrorError> {
        let gunzip_err = |err: io::Error| MirrorError::Gunzip {
            path: src.to_string(),
            message: err.to_string(),
        };
        let input = File::open(src.as_std_path()).map_err(gunzip_err)?;
        let mut decoder = MultiGzDecoder::new(BufReader::new(input));
        let output = File::create(dest.as_std_path()).map_err(gunzip_err)?;
        let mut writer = BufWriter::new(output);
        io::copy(&mut decoder, &mut writer).map_err(gunzip_err)?;
        Ok(())
    }

    fn lz4_compress(&self, src: &Utf8Path, dest: &Utf8Path) -> Result<(), MirrorError> {
        let lz4_err = |err: io::Error| MirrorError::Lz4 {
            path: src.to_string(),
            message: err.to_string(),
        };
        let input = File::open(src.as_std_path()).map_err(lz4_err)?;
        let mut reader = BufReader::new(input);
        let output = File::create(dest.as_std_path()).map_err(lz4_err)?;
        let mut encoder = lz4::EncoderBuilder::new()
            .level(LZ4_LEVEL)
            .build(BufWriter::new(output))
            .map_err(lz4_err)?;
        io::copy(&mut reader, &mut encoder).map_err(lz4_err)?;
        let (_, result) = encoder.finish();
        result.map_err(lz4_err)?;
        Ok(())
    }
}
