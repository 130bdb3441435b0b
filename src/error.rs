use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MirrorError {
    #[error("marker check failed for {key}: {message}")]
    MarkerCheck { key: String, message: String },

    #[error("fetch request failed: {0}")]
    FetchHttp(String),

    #[error("remote returned status {status} for {url}")]
    FetchStatus { status: u16, url: String },

    #[error("directory listing failed for {url}: {message}")]
    Listing { url: String, message: String },

    #[error("upload failed for {key}: {message}")]
    Upload { key: String, message: String },

    #[error("object store error: {0}")]
    Storage(String),

    #[error("gzip decompression failed for {path}: {message}")]
    Gunzip { path: String, message: String },

    #[error("lz4 compression failed for {path}: {message}")]
    Lz4 { path: String, message: String },

    #[error("cannot derive unpacked name from {0}: expected a .gz suffix")]
    UnpackedName(String),

    #[error("invalid snapshot date: {0}")]
    InvalidSnapshotDate(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
