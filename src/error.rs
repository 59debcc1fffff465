//! Error taxonomy for the extraction and media pipeline.
//!
//! Validation errors surface immediately and are never retried. Transport
//! errors are fatal for the page fetch but per-asset inside a download
//! batch. Parse errors are scoped to a single structured-data block.
//! No kind triggers a retry inside this crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Bad caller input: empty/malformed URL, unsupported media type.
    #[error("invalid input: {0}")]
    Validation(String),
    /// Network failure, non-2xx status, or an empty document.
    #[error("fetch failed: {0}")]
    Transport(String),
    /// Malformed structured-data block.
    #[error("malformed structured data: {0}")]
    Parse(String),
    /// Wrong content type, oversized payload, or likely-icon image.
    #[error("content policy: {0}")]
    ContentPolicy(String),
    /// The page fetched fine but no product data could be recovered.
    #[error("extraction failed: {0}")]
    Extraction(String),
}

pub type Result<T> = std::result::Result<T, Error>;
