//! Error taxonomy for the scrape pipeline.
//!
//! Two failures are fatal: a page that does not contain a decodable state
//! blob ([`ExtractionError`]) and a manifest that cannot be written
//! ([`PersistenceError`]). Per-file download failures are deliberately *not*
//! errors — they are recorded in the fetch report and surface through
//! `incomplete.json` instead.

/// The page did not yield a usable state blob. Aborts the whole pipeline —
/// nothing downstream is meaningful without a state root.
#[derive(thiserror::Error, Debug)]
pub enum ExtractionError {
    #[error("state blob markers not found in page markup")]
    MarkerNotFound,

    #[error("state literal parse error at byte {offset}: {message}")]
    Literal { offset: usize, message: String },

    #[error("state blob does not match the expected shape: {0}")]
    Shape(#[from] serde_json::Error),
}

/// A manifest or directory write failed. Fatal for the manifest stage;
/// temp-then-rename writing guarantees no partial manifest is left behind.
#[derive(thiserror::Error, Debug)]
pub enum PersistenceError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Top-level pipeline error.
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    #[error("page request failed: {0}")]
    Page(#[from] reqwest::Error),

    #[error("page request for {url} returned status {status}")]
    PageStatus { url: String, status: u16 },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Convenience result type.
pub type ScrapeResult<T> = Result<T, ScrapeError>;
